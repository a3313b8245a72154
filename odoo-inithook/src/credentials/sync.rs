// Credential Synchronizer
//
// One hash, two sinks:
// - legacy: the admin row in the factory-default database (best-effort; any
//   failure is caught and reported as a LegacyOutcome, never raised)
// - primary: the application's own config-managed admin credential (fatal on failure)
//
// There is no transaction spanning both sinks; an interrupted run can leave
// them disagreeing until the next run.

use anyhow::{Context, Result};
use log::{info, warn};
use std::path::Path;

use crate::application::ApplicationControl;
use crate::credentials::hash::{self, CredentialHash};
use crate::database::connection::{DatabaseAdmin, NameMatch};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegacyOutcome {
    Updated { rows: u64 },
    /// The statement ran but matched no admin row.
    NoAdminRow { database: String },
    DatabaseAbsent,
    Failed(String),
}

impl LegacyOutcome {
    /// Whether the legacy sink received the hash.
    pub fn reachable(&self) -> bool {
        matches!(self, LegacyOutcome::Updated { .. })
    }
}

pub struct CredentialSync<'a> {
    admin: &'a dyn DatabaseAdmin,
    app: &'a dyn ApplicationControl,
    legacy_database: &'a str,
    config_path: &'a Path,
    rounds: u32,
}

impl<'a> CredentialSync<'a> {
    pub fn new(
        admin: &'a dyn DatabaseAdmin,
        app: &'a dyn ApplicationControl,
        legacy_database: &'a str,
        config_path: &'a Path,
        rounds: u32,
    ) -> Self {
        Self {
            admin,
            app,
            legacy_database,
            config_path,
            rounds,
        }
    }

    pub fn derive(&self, password: &str) -> Result<CredentialHash> {
        hash::derive(password, self.rounds).context("Failed to derive admin credential hash")
    }

    /// Update the legacy admin row if its database exists. Never fails.
    pub async fn push_legacy(&self, hash: &CredentialHash) -> LegacyOutcome {
        let stored = match self
            .admin
            .find_database(self.legacy_database, NameMatch::CaseInsensitive)
            .await
        {
            Ok(Some(stored)) => stored,
            Ok(None) => {
                info!(
                    "[PHASE: credentials] [STEP: legacy] Default DB ({}) not found - skipping setting password for that",
                    self.legacy_database
                );
                return LegacyOutcome::DatabaseAbsent;
            }
            Err(e) => {
                warn!(
                    "[PHASE: credentials] [STEP: legacy] Could not check for default DB ({}): {}",
                    self.legacy_database, e
                );
                return LegacyOutcome::Failed(e.to_string());
            }
        };

        match self.admin.update_legacy_password(&stored, hash.as_str()).await {
            Ok(0) => {
                warn!(
                    "[PHASE: credentials] [STEP: legacy] No admin row found in '{}'; nothing updated",
                    stored
                );
                LegacyOutcome::NoAdminRow { database: stored }
            }
            Ok(rows) => {
                info!(
                    "[PHASE: credentials] [STEP: legacy] Admin password updated in '{}' (fingerprint={})",
                    stored,
                    hash.fingerprint()
                );
                LegacyOutcome::Updated { rows }
            }
            Err(e) => {
                warn!(
                    "[PHASE: credentials] [STEP: legacy] Legacy credential update failed: {}",
                    e
                );
                LegacyOutcome::Failed(e.to_string())
            }
        }
    }

    pub async fn push_primary(&self, hash: &CredentialHash) -> Result<()> {
        self.app
            .set_admin_credential(self.config_path, hash)
            .await
            .context("Failed to set admin credential through the application config")
    }

    /// Derive once, push legacy (caught), then primary (propagated).
    pub async fn sync(&self, password: &str) -> Result<LegacyOutcome> {
        let hash = self.derive(password)?;
        let legacy = self.push_legacy(&hash).await;
        self.push_primary(&hash).await?;
        Ok(legacy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeApplication, FakeDatabase};
    use std::path::PathBuf;

    fn conf() -> PathBuf {
        PathBuf::from("/etc/odoo/odoo.conf")
    }

    #[tokio::test]
    async fn both_sinks_receive_the_same_hash() {
        let db = FakeDatabase::new(&["turnkeylinuxexample"]);
        let app = FakeApplication::default();
        let conf = conf();
        let sync = CredentialSync::new(&db, &app, "TurnkeylinuxExample", &conf, 10);

        let legacy = sync.sync("s3cret").await.unwrap();
        assert_eq!(legacy, LegacyOutcome::Updated { rows: 1 });

        let primary = app.admin_hash().expect("primary sink written");
        let legacy_hash = db.legacy_hash("turnkeylinuxexample").expect("legacy row written");
        assert_eq!(primary, legacy_hash);
        assert!(hash::verify("s3cret", &primary));
    }

    #[tokio::test]
    async fn absent_legacy_database_still_writes_primary() {
        let db = FakeDatabase::new(&["acme_prod"]);
        let app = FakeApplication::default();
        let conf = conf();
        let sync = CredentialSync::new(&db, &app, "TurnkeylinuxExample", &conf, 10);

        let legacy = sync.sync("s3cret").await.unwrap();
        assert_eq!(legacy, LegacyOutcome::DatabaseAbsent);
        assert!(!legacy.reachable());
        assert!(app.admin_hash().is_some());
    }

    #[tokio::test]
    async fn missing_admin_row_is_not_an_update() {
        let db = FakeDatabase::new(&["TurnkeylinuxExample"]).without_admin_row();
        let app = FakeApplication::default();
        let conf = conf();
        let sync = CredentialSync::new(&db, &app, "TurnkeylinuxExample", &conf, 10);

        let legacy = sync.sync("s3cret").await.unwrap();
        assert_eq!(
            legacy,
            LegacyOutcome::NoAdminRow {
                database: "TurnkeylinuxExample".to_string()
            }
        );
        assert!(!legacy.reachable());
        assert!(app.admin_hash().is_some());
    }

    #[tokio::test]
    async fn legacy_update_failure_is_caught() {
        let db = FakeDatabase::new(&["TurnkeylinuxExample"]).failing_legacy_update();
        let app = FakeApplication::default();
        let conf = conf();
        let sync = CredentialSync::new(&db, &app, "TurnkeylinuxExample", &conf, 10);

        let legacy = sync.sync("s3cret").await.unwrap();
        assert!(matches!(legacy, LegacyOutcome::Failed(_)));
        assert!(app.admin_hash().is_some());
    }

    #[tokio::test]
    async fn primary_failure_propagates_after_legacy_attempt() {
        let db = FakeDatabase::new(&["TurnkeylinuxExample"]);
        let app = FakeApplication::failing_credential();
        let conf = conf();
        let sync = CredentialSync::new(&db, &app, "TurnkeylinuxExample", &conf, 10);

        assert!(sync.sync("s3cret").await.is_err());
        assert!(db.legacy_hash("TurnkeylinuxExample").is_some());
    }
}
