// Operator intent for one provisioning run
//
// Collected once, before anything is changed, from CLI values and prompt
// answers. Immutable afterwards.

use log::info;

use crate::addons::catalog;
use crate::database::provisioning::validate_db_name;
use crate::error::ProvisionError;
use crate::prompt::Prompter;
use crate::utils::validation::{is_yes, validate_password, PASSWORD_BLACKLIST};

pub const PRODUCTION_FALLBACK_DB: &str = "production_db";
pub const DEVELOPMENT_FALLBACK_DB: &str = "development_db";

#[derive(Clone, PartialEq, Eq)]
pub struct ProvisioningIntent {
    pub password: String,
    pub use_custom_db_name: bool,
    pub db_name: String,
    pub is_production: bool,
    pub install_localization: bool,
    /// Selection order, no duplicates.
    pub selected_top_level_addons: Vec<String>,
}

impl std::fmt::Debug for ProvisioningIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisioningIntent")
            .field("password", &"***")
            .field("use_custom_db_name", &self.use_custom_db_name)
            .field("db_name", &self.db_name)
            .field("is_production", &self.is_production)
            .field("install_localization", &self.install_localization)
            .field("selected_top_level_addons", &self.selected_top_level_addons)
            .finish()
    }
}

/// Values supplied on the command line. Empty values count as absent.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub password: Option<String>,
    pub db_name: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn prompt_err(e: anyhow::Error) -> ProvisionError {
    ProvisionError::Prompt(e)
}

/// Ask for everything the run needs, in the order the operator sees it:
/// password, custom database name, environment class, localization add-ons.
pub fn collect_intent(
    prompter: &mut dyn Prompter,
    overrides: &CliOverrides,
    default_db_name: &str,
) -> Result<ProvisioningIntent, ProvisionError> {
    let password = match non_empty(&overrides.password) {
        Some(p) => {
            validate_password(p).map_err(|e| ProvisionError::Input(e.to_string()))?;
            p.to_string()
        }
        None => prompter
            .password(
                "Odoo Database Management & 'admin' Password",
                "Enter new password for Odoo Database Management and 'admin' account:",
                &PASSWORD_BLACKLIST,
            )
            .map_err(prompt_err)?,
    };

    let (use_custom_db_name, custom_name) = match non_empty(&overrides.db_name) {
        Some(name) => {
            validate_db_name(name).map_err(|reason| {
                ProvisionError::Input(format!("Invalid --dbname '{}': {}", name, reason))
            })?;
            (true, name.to_string())
        }
        None => {
            let answer = prompter
                .input(
                    "Use Custom Database Name?",
                    "Do you want to use a custom database name? (yes/no):",
                )
                .map_err(prompt_err)?;
            if is_yes(&answer) {
                (true, ask_custom_name(prompter)?)
            } else {
                (false, String::new())
            }
        }
    };

    let is_production = is_yes(
        &prompter
            .input(
                "Provisioning Type",
                "Is this provisioning for production? (yes/no):",
            )
            .map_err(prompt_err)?,
    );

    let db_name = if !use_custom_db_name {
        default_db_name.to_string()
    } else if custom_name.is_empty() {
        let fallback = if is_production {
            PRODUCTION_FALLBACK_DB
        } else {
            DEVELOPMENT_FALLBACK_DB
        };
        info!(
            "[PHASE: intent] [STEP: db_name] No custom name entered; using '{}'",
            fallback
        );
        fallback.to_string()
    } else {
        custom_name
    };

    let install_localization = is_yes(
        &prompter
            .input(
                "Install OCA Localization Modules?",
                "Do you want to install OCA localization modules? (yes/no):",
            )
            .map_err(prompt_err)?,
    );

    let selected_top_level_addons = if install_localization {
        select_localizations(prompter)?
    } else {
        Vec::new()
    };

    Ok(ProvisioningIntent {
        password,
        use_custom_db_name,
        db_name,
        is_production,
        install_localization,
        selected_top_level_addons,
    })
}

/// Blank is accepted here and resolved to a fallback name later.
fn ask_custom_name(prompter: &mut dyn Prompter) -> Result<String, ProvisionError> {
    loop {
        let name = prompter
            .input("Odoo Database Name", "Enter the name for the Odoo database:")
            .map_err(prompt_err)?
            .trim()
            .to_string();
        if name.is_empty() {
            return Ok(name);
        }
        match validate_db_name(&name) {
            Ok(()) => return Ok(name),
            Err(reason) => prompter.notice(&format!("Invalid database name '{}': {}", name, reason)),
        }
    }
}

fn select_localizations(prompter: &mut dyn Prompter) -> Result<Vec<String>, ProvisionError> {
    let menu = catalog::selection_menu();
    let mut selected: Vec<String> = Vec::new();
    loop {
        let answer = prompter
            .input("Select Localization Module", &menu)
            .map_err(prompt_err)?
            .trim()
            .to_ascii_lowercase();
        if answer == catalog::DONE {
            break;
        }
        if !catalog::is_known(&answer) {
            prompter.notice(
                "Invalid module name. Please enter a valid module name or 'done' to finish.",
            );
            continue;
        }
        if !selected.contains(&answer) {
            selected.push(answer);
        }
    }
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedPrompter;

    const DEFAULT_DB: &str = "TurnkeylinuxExample";

    #[test]
    fn custom_production_name_from_prompts() {
        let mut p = ScriptedPrompter::new(&["s3cret", "yes", "acme_prod", "yes", "no"]);
        let intent = collect_intent(&mut p, &CliOverrides::default(), DEFAULT_DB).unwrap();
        assert_eq!(intent.password, "s3cret");
        assert!(intent.use_custom_db_name);
        assert_eq!(intent.db_name, "acme_prod");
        assert!(intent.is_production);
        assert!(!intent.install_localization);
        assert!(p.is_exhausted());
    }

    #[test]
    fn declining_custom_name_keeps_default() {
        let mut p = ScriptedPrompter::new(&["s3cret", "no", "no", "no"]);
        let intent = collect_intent(&mut p, &CliOverrides::default(), DEFAULT_DB).unwrap();
        assert!(!intent.use_custom_db_name);
        assert_eq!(intent.db_name, DEFAULT_DB);
        assert!(!intent.is_production);
    }

    #[test]
    fn blank_custom_name_falls_back_by_environment() {
        let mut p = ScriptedPrompter::new(&["s3cret", "yes", "", "yes", "no"]);
        let intent = collect_intent(&mut p, &CliOverrides::default(), DEFAULT_DB).unwrap();
        assert_eq!(intent.db_name, PRODUCTION_FALLBACK_DB);

        let mut p = ScriptedPrompter::new(&["s3cret", "yes", "  ", "no", "no"]);
        let intent = collect_intent(&mut p, &CliOverrides::default(), DEFAULT_DB).unwrap();
        assert_eq!(intent.db_name, DEVELOPMENT_FALLBACK_DB);
    }

    #[test]
    fn invalid_typed_name_is_asked_again() {
        let mut p = ScriptedPrompter::new(&["s3cret", "yes", "acme prod;", "acme_prod", "no", "no"]);
        let intent = collect_intent(&mut p, &CliOverrides::default(), DEFAULT_DB).unwrap();
        assert_eq!(intent.db_name, "acme_prod");
        assert_eq!(p.notices().len(), 1);
    }

    #[test]
    fn cli_values_skip_their_prompts() {
        let overrides = CliOverrides {
            password: Some("fromcli".to_string()),
            db_name: Some("acme_prod".to_string()),
        };
        let mut p = ScriptedPrompter::new(&["no", "no"]);
        let intent = collect_intent(&mut p, &overrides, DEFAULT_DB).unwrap();
        assert_eq!(intent.password, "fromcli");
        assert!(intent.use_custom_db_name);
        assert_eq!(intent.db_name, "acme_prod");
        assert!(p.is_exhausted());
    }

    #[test]
    fn bad_cli_values_are_input_errors() {
        let mut p = ScriptedPrompter::new(&[]);
        let overrides = CliOverrides {
            password: Some("a/b".to_string()),
            db_name: None,
        };
        assert!(matches!(
            collect_intent(&mut p, &overrides, DEFAULT_DB),
            Err(ProvisionError::Input(_))
        ));

        let overrides = CliOverrides {
            password: Some("ok".to_string()),
            db_name: Some("drop table".to_string()),
        };
        assert!(matches!(
            collect_intent(&mut p, &overrides, DEFAULT_DB),
            Err(ProvisionError::Input(_))
        ));
    }

    #[test]
    fn selection_loop_dedupes_and_rejects_unknown_names() {
        let mut p = ScriptedPrompter::new(&[
            "s3cret", "no", "no", "yes", "Brazil", "atlantis", "spain", "brazil", "done",
        ]);
        let intent = collect_intent(&mut p, &CliOverrides::default(), DEFAULT_DB).unwrap();
        assert!(intent.install_localization);
        assert_eq!(intent.selected_top_level_addons, vec!["brazil", "spain"]);
        assert_eq!(p.notices().len(), 1);
        assert!(p.notices()[0].starts_with("Invalid module name"));
    }

    #[test]
    fn exhausted_input_is_a_prompt_error() {
        let mut p = ScriptedPrompter::new(&["s3cret"]);
        assert!(matches!(
            collect_intent(&mut p, &CliOverrides::default(), DEFAULT_DB),
            Err(ProvisionError::Prompt(_))
        ));
    }

    #[test]
    fn debug_output_hides_password() {
        let mut p = ScriptedPrompter::new(&["s3cret", "no", "no", "no"]);
        let intent = collect_intent(&mut p, &CliOverrides::default(), DEFAULT_DB).unwrap();
        assert!(!format!("{:?}", intent).contains("s3cret"));
    }
}
