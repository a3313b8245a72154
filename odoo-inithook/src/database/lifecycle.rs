// Database Lifecycle Manager
//
// ensure_absent / ensure_exists are idempotent: an already-satisfied state is
// reported, not treated as an error. Any server error is returned to the caller,
// which treats it as fatal for the run.

use log::info;

use crate::database::connection::{DatabaseAdmin, DatabaseError, NameMatch};
use crate::database::provisioning::validate_db_name;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbsentOutcome {
    /// Dropped; carries the name as it was stored on the server.
    Dropped(String),
    AlreadyAbsent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistsOutcome {
    Created,
    AlreadyExists,
}

pub struct DatabaseLifecycle<'a> {
    admin: &'a dyn DatabaseAdmin,
}

impl<'a> DatabaseLifecycle<'a> {
    pub fn new(admin: &'a dyn DatabaseAdmin) -> Self {
        Self { admin }
    }

    /// Drop `name` if it exists. With `CaseInsensitive`, whichever spelling the
    /// server holds is the one dropped.
    pub async fn ensure_absent(
        &self,
        name: &str,
        matching: NameMatch,
    ) -> Result<AbsentOutcome, DatabaseError> {
        match self.admin.find_database(name, matching).await? {
            Some(stored) => {
                self.admin.drop_database(&stored).await?;
                info!(
                    "[PHASE: database] [STEP: ensure_absent] Database '{}' removed.",
                    stored
                );
                Ok(AbsentOutcome::Dropped(stored))
            }
            None => {
                info!(
                    "[PHASE: database] [STEP: ensure_absent] Database '{}' not present; nothing to remove.",
                    name
                );
                Ok(AbsentOutcome::AlreadyAbsent)
            }
        }
    }

    /// Create `name` unless a database with exactly that name exists.
    pub async fn ensure_exists(&self, name: &str) -> Result<ExistsOutcome, DatabaseError> {
        validate_db_name(name).map_err(|reason| DatabaseError::InvalidName {
            name: name.to_string(),
            reason,
        })?;

        if self
            .admin
            .find_database(name, NameMatch::Exact)
            .await?
            .is_some()
        {
            info!(
                "[PHASE: database] [STEP: ensure_exists] Database '{}' already exists. Skipping database creation.",
                name
            );
            return Ok(ExistsOutcome::AlreadyExists);
        }

        self.admin.create_database(name).await?;
        info!(
            "[PHASE: database] [STEP: ensure_exists] Database '{}' created successfully.",
            name
        );
        Ok(ExistsOutcome::Created)
    }
}
