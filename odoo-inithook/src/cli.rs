// Command-line surface
//
// clap's built-in help is disabled: `-h/--help` prints the usage text and exits 1,
// the same as a usage error, which is what the first-boot runner expects.

use clap::{ArgAction, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::models::intent::CliOverrides;

#[derive(Parser, Debug, Default, Clone)]
#[command(
    name = "odoo-inithook",
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct CliArgs {
    /// Admin password; asked interactively when absent
    #[arg(long = "pass", value_name = "PASSWORD")]
    pub password: Option<String>,

    /// Custom database name; skips the database name prompts
    #[arg(long, value_name = "NAME")]
    pub dbname: Option<String>,

    /// Provisioner settings file (TOML)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[arg(short = 'h', long = "help", action = ArgAction::SetTrue)]
    pub help: bool,
}

impl CliArgs {
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            password: self.password.clone(),
            db_name: self.dbname.clone(),
        }
    }
}

#[derive(Debug)]
pub enum CliAction {
    Run(CliArgs),
    /// Print usage (with an optional error line) and exit 1.
    Usage(Option<String>),
}

pub fn parse_from<I, T>(args: I) -> CliAction
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match CliArgs::try_parse_from(args) {
        Ok(args) if args.help => CliAction::Usage(None),
        Ok(args) => CliAction::Run(args),
        Err(e) => {
            let rendered = e.to_string();
            let first = rendered.lines().next().unwrap_or_default();
            let message = first.strip_prefix("error: ").unwrap_or(first).to_string();
            CliAction::Usage(Some(message))
        }
    }
}

pub fn usage_text(program: &str) -> String {
    format!(
        "Syntax: {} [options]\n\
         Set Odoo database name, admin password and optional localization add-ons\n\
         \n\
         Options:\n\
         \x20   --pass=       unless provided, will ask interactively\n\
         \x20   --dbname=     custom database name; unless provided, will ask interactively\n\
         \x20   --config=     provisioner settings file (default {})\n\
         \x20   -h, --help    show this text\n",
        program,
        crate::settings::DEFAULT_SETTINGS_PATH
    )
}

/// Print usage to stderr and return the exit status for it.
pub fn usage(program: &str, error: Option<&str>) -> i32 {
    if let Some(error) = error {
        eprintln!("Error: {}", error);
    }
    eprint!("{}", usage_text(program));
    1
}
