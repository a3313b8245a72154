// Outcome of a run that reached the end of the stage sequence

use crate::addons::resolver::ResolutionReport;
use crate::credentials::sync::LegacyOutcome;
use crate::database::lifecycle::{AbsentOutcome, ExistsOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    Restarted,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub db_name: String,
    /// `None` when the default database was not reconciled (no custom name).
    pub default_database: Option<AbsentOutcome>,
    pub target_database: ExistsOutcome,
    /// `None` when localization add-ons were not requested.
    pub addons: Option<ResolutionReport>,
    pub legacy: LegacyOutcome,
    pub reload: ReloadOutcome,
}

impl RunReport {
    /// 0 only when the legacy sink was updated and the reload succeeded.
    /// Add-on fetch failures are reported but do not affect the status.
    pub fn exit_code(&self) -> i32 {
        if self.legacy.reachable() && self.reload == ReloadOutcome::Restarted {
            0
        } else {
            1
        }
    }

    pub fn failed_addons(&self) -> Vec<&str> {
        self.addons
            .as_ref()
            .map(|r| r.failed().map(|d| d.name.as_str()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(legacy: LegacyOutcome, reload: ReloadOutcome) -> RunReport {
        RunReport {
            db_name: "acme_prod".to_string(),
            default_database: None,
            target_database: ExistsOutcome::Created,
            addons: None,
            legacy,
            reload,
        }
    }

    #[test]
    fn exit_code_requires_legacy_update_and_reload() {
        assert_eq!(
            report(LegacyOutcome::Updated { rows: 1 }, ReloadOutcome::Restarted).exit_code(),
            0
        );
        assert_eq!(
            report(LegacyOutcome::DatabaseAbsent, ReloadOutcome::Restarted).exit_code(),
            1
        );
        assert_eq!(
            report(
                LegacyOutcome::NoAdminRow {
                    database: "TurnkeylinuxExample".to_string()
                },
                ReloadOutcome::Restarted
            )
            .exit_code(),
            1
        );
        assert_eq!(
            report(
                LegacyOutcome::Updated { rows: 1 },
                ReloadOutcome::Failed("inactive".to_string())
            )
            .exit_code(),
            1
        );
    }

    #[test]
    fn no_failed_addons_without_resolution() {
        let r = report(LegacyOutcome::Updated { rows: 1 }, ReloadOutcome::Restarted);
        assert!(r.failed_addons().is_empty());
    }
}
