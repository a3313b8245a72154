use odoo_inithook::cli::{self, CliAction};

fn main() {
    let argv: Vec<String> = std::env::args().collect();
    let program = argv
        .first()
        .cloned()
        .unwrap_or_else(|| "odoo-inithook".to_string());

    let args = match cli::parse_from(&argv) {
        CliAction::Run(args) => args,
        CliAction::Usage(error) => std::process::exit(cli::usage(&program, error.as_deref())),
    };

    // Stages run strictly in sequence.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {}", e);
            std::process::exit(1);
        }
    };

    let code = runtime.block_on(odoo_inithook::run(args));
    std::process::exit(code);
}
