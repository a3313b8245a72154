// Provisioning Orchestrator
//
// Stages run in strict order:
//   CollectIntent -> ReconcileDefaultDatabase? -> PersistBaseConfig -> ResolveAddons?
//   -> EnsureTargetDatabase -> SyncCredential -> Reload -> Done
//
// Database, config-write and primary-credential errors end the run at once with
// nothing undone. Add-on failures, the legacy sink and the reload are recorded in
// the RunReport and decide the exit status at the end.

use log::{error, info, warn};
use std::path::PathBuf;

use crate::addons::resolver::{AddonLayout, AddonResolver};
use crate::addons::source::{AddonSource, RequirementsInstaller};
use crate::application::ApplicationControl;
use crate::config_store;
use crate::credentials::sync::{CredentialSync, LegacyOutcome};
use crate::database::connection::{DatabaseAdmin, NameMatch};
use crate::database::lifecycle::DatabaseLifecycle;
use crate::error::ProvisionError;
use crate::models::intent::{collect_intent, CliOverrides, ProvisioningIntent};
use crate::models::report::{ReloadOutcome, RunReport};
use crate::prompt::Prompter;
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CollectIntent,
    ReconcileDefaultDatabase,
    PersistBaseConfig,
    ResolveAddons,
    EnsureTargetDatabase,
    SyncCredential,
    Reload,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::CollectIntent => "collect_intent",
            Stage::ReconcileDefaultDatabase => "reconcile_default_database",
            Stage::PersistBaseConfig => "persist_base_config",
            Stage::ResolveAddons => "resolve_addons",
            Stage::EnsureTargetDatabase => "ensure_target_database",
            Stage::SyncCredential => "sync_credential",
            Stage::Reload => "reload",
            Stage::Done => "done",
        }
    }
}

/// External collaborators a run drives.
pub struct Services<'a> {
    pub database: &'a dyn DatabaseAdmin,
    pub application: &'a dyn ApplicationControl,
    pub source: &'a dyn AddonSource,
    pub installer: &'a dyn RequirementsInstaller,
}

pub struct Provisioner<'a> {
    services: Services<'a>,
    odoo_conf: PathBuf,
    default_db_name: String,
    legacy_database: String,
    pbkdf2_rounds: u32,
    layout: AddonLayout,
}

fn enter(stage: Stage) {
    info!("[PHASE: orchestrator] [STEP: {}] Entering stage", stage.as_str());
}

impl<'a> Provisioner<'a> {
    pub fn new(settings: &Settings, services: Services<'a>) -> Self {
        Self {
            services,
            odoo_conf: settings.paths.odoo_conf.clone(),
            default_db_name: settings.database.default_name.clone(),
            legacy_database: settings.database.legacy_database.clone(),
            pbkdf2_rounds: settings.credentials.pbkdf2_rounds,
            layout: AddonLayout::from_settings(&settings.paths, &settings.addons),
        }
    }

    pub fn collect(
        default_db_name: &str,
        prompter: &mut dyn Prompter,
        overrides: &CliOverrides,
    ) -> Result<ProvisioningIntent, ProvisionError> {
        enter(Stage::CollectIntent);
        let intent = collect_intent(prompter, overrides, default_db_name)?;
        info!(
            "[PHASE: orchestrator] [STEP: collect_intent] db_name={} custom={} production={} localizations=[{}]",
            intent.db_name,
            intent.use_custom_db_name,
            intent.is_production,
            intent.selected_top_level_addons.join(", ")
        );
        Ok(intent)
    }

    /// Run every stage after intent collection.
    pub async fn execute(&self, intent: &ProvisioningIntent) -> Result<RunReport, ProvisionError> {
        let lifecycle = DatabaseLifecycle::new(self.services.database);

        let default_database = if intent.use_custom_db_name {
            enter(Stage::ReconcileDefaultDatabase);
            if intent.db_name.eq_ignore_ascii_case(&self.default_db_name) {
                info!(
                    "[PHASE: orchestrator] [STEP: reconcile_default_database] Custom name '{}' is the default database; keeping it",
                    intent.db_name
                );
                None
            } else {
                Some(
                    lifecycle
                        .ensure_absent(&self.default_db_name, NameMatch::CaseInsensitive)
                        .await?,
                )
            }
        } else {
            None
        };

        enter(Stage::PersistBaseConfig);
        let mut options = vec![("db_name", intent.db_name.clone())];
        if intent.is_production {
            options.push(("without_demo", "True".to_string()));
        }
        config_store::update_options(&self.odoo_conf, &options).await?;

        let addons = if intent.install_localization {
            enter(Stage::ResolveAddons);
            let resolver = AddonResolver::new(
                self.services.source,
                self.services.installer,
                self.layout.clone(),
            );
            let report = resolver
                .resolve(&intent.selected_top_level_addons)
                .await;
            config_store::update_options(
                &self.odoo_conf,
                &[("addons_path", report.addons_path.to_config_value())],
            )
            .await?;
            Some(report)
        } else {
            None
        };

        enter(Stage::EnsureTargetDatabase);
        let target_database = lifecycle.ensure_exists(&intent.db_name).await?;

        enter(Stage::SyncCredential);
        let sync = CredentialSync::new(
            self.services.database,
            self.services.application,
            &self.legacy_database,
            &self.odoo_conf,
            self.pbkdf2_rounds,
        );
        let legacy = sync
            .sync(&intent.password)
            .await
            .map_err(ProvisionError::Credential)?;

        enter(Stage::Reload);
        let reload = match self.services.application.reload().await {
            Ok(()) => {
                info!("[PHASE: orchestrator] [STEP: reload] Application restarted");
                ReloadOutcome::Restarted
            }
            Err(e) => {
                error!(
                    "[PHASE: orchestrator] [STEP: reload] Application restart failed: {:#}",
                    e
                );
                ReloadOutcome::Failed(format!("{:#}", e))
            }
        };

        enter(Stage::Done);
        let report = RunReport {
            db_name: intent.db_name.clone(),
            default_database,
            target_database,
            addons,
            legacy,
            reload,
        };
        log_summary(&report);
        Ok(report)
    }
}

fn log_summary(report: &RunReport) {
    let failed = report.failed_addons();
    if !failed.is_empty() {
        warn!(
            "[PHASE: orchestrator] [STEP: done] Add-ons not installed: {}",
            failed.join(", ")
        );
    }
    match &report.legacy {
        LegacyOutcome::Updated { .. } => {}
        LegacyOutcome::NoAdminRow { database } => warn!(
            "[PHASE: orchestrator] [STEP: done] Legacy admin credential not updated (no admin row in '{}')",
            database
        ),
        LegacyOutcome::DatabaseAbsent => warn!(
            "[PHASE: orchestrator] [STEP: done] Legacy admin credential not updated (database absent)"
        ),
        LegacyOutcome::Failed(reason) => warn!(
            "[PHASE: orchestrator] [STEP: done] Legacy admin credential not updated: {}",
            reason
        ),
    }
    info!(
        "[PHASE: orchestrator] [STEP: done] Provisioning finished for '{}' (exit_code={})",
        report.db_name,
        report.exit_code()
    );
}
