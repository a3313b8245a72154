// Odoo first-boot provisioning inithook
// Library entry point

pub mod addons;
pub mod application;
pub mod cli;
pub mod config_store;
pub mod credentials;
pub mod database;
pub mod error;
pub mod installation;
pub mod models;
pub mod orchestrator;
pub mod prompt;
pub mod settings;
pub mod utils;

#[cfg(test)]
mod testing;

use log::{error, info};
use uuid::Uuid;

use crate::addons::source::{GitSource, PipInstaller};
use crate::application::OdooControl;
use crate::cli::CliArgs;
use crate::database::connection::{PgAdmin, PgEndpoint};
use crate::error::ProvisionError;
use crate::models::report::RunReport;
use crate::orchestrator::{Provisioner, Services};
use crate::prompt::terminal::TerminalPrompter;
use crate::utils::logging::{init_console_logging, init_logging};

const PROMPT_BANNER: &str = "TurnKey Linux - First boot configuration";

/// Run one provisioning pass and return the process exit status.
pub async fn run(args: CliArgs) -> i32 {
    match provision(args).await {
        Ok(report) => report.exit_code(),
        Err(e) => {
            error!("[PHASE: orchestrator] [STEP: abort] {}", e);
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

async fn provision(args: CliArgs) -> Result<RunReport, ProvisionError> {
    let settings_path = settings::resolve_settings_path(args.config.as_deref());
    let settings = settings::load(&settings_path).map_err(ProvisionError::Settings)?;

    let run_id = Uuid::new_v4().to_string();
    if let Err(e) = init_logging(&settings.paths.log_dir, &run_id) {
        eprintln!(
            "Warning: file logging unavailable ({}); logging to console only",
            e
        );
        if let Err(e) = init_console_logging() {
            eprintln!("Warning: console logging unavailable: {}", e);
        }
    }
    info!(
        "[PHASE: startup] [STEP: init] odoo-inithook {} run_id={} settings={:?}",
        env!("CARGO_PKG_VERSION"),
        run_id,
        settings_path
    );

    let mut prompter = TerminalPrompter::new(PROMPT_BANNER);
    let intent = Provisioner::collect(
        &settings.database.default_name,
        &mut prompter,
        &args.overrides(),
    )?;

    let database = PgAdmin::new(PgEndpoint::from_settings(
        &settings.database,
        &intent.password,
    ));
    let application = OdooControl::new(&settings.application);
    let source = GitSource::new(&settings.addons);
    let installer = PipInstaller::new(&settings.addons);

    let provisioner = Provisioner::new(
        &settings,
        Services {
            database: &database,
            application: &application,
            source: &source,
            installer: &installer,
        },
    );
    provisioner.execute(&intent).await
}
