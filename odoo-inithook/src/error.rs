// Fatal error classes for a provisioning run
//
// Every variant ends the run with exit status 1. Non-fatal conditions (add-on
// fetch failures, an absent legacy database, a failed reload) are carried in
// RunReport instead.

use thiserror::Error;

use crate::config_store::ConfigError;
use crate::database::connection::DatabaseError;

#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Bad CLI value or unusable operator answer. Nothing has been changed yet.
    #[error("{0}")]
    Input(String),

    #[error("Unable to load provisioner settings: {0:#}")]
    Settings(anyhow::Error),

    #[error("Prompt failed: {0:#}")]
    Prompt(anyhow::Error),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Credential synchronization failed: {0:#}")]
    Credential(anyhow::Error),
}

impl ProvisionError {
    pub fn exit_code(&self) -> i32 {
        1
    }
}
