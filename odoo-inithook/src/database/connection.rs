// Administrative database access
//
// DatabaseAdmin is the seam between the lifecycle/credential logic and the
// PostgreSQL server. Production code uses PgAdmin; tests use in-memory fakes.
//
// Every operation opens its own connection and closes it before returning, so
// no connection is held across prompts or fetches. Statements run outside any
// transaction (autocommit), which CREATE/DROP DATABASE require.

use async_trait::async_trait;
use log::debug;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Connection, Executor};
use thiserror::Error;

use crate::database::provisioning::{
    create_db_stmt, drop_db_stmt, FIND_DB_CASE_INSENSITIVE_QUERY, FIND_DB_EXACT_QUERY,
    LEGACY_ADMIN_USER_ID, LEGACY_PASSWORD_UPDATE,
};
use crate::settings::DatabaseSettings;
use crate::utils::logging::describe_endpoint;

/// Errors from the database server. Messages never include credentials.
#[derive(Debug, Clone, Error)]
pub enum DatabaseError {
    #[error("Unable to connect to {endpoint}: {details}")]
    Connect { endpoint: String, details: String },

    #[error("{operation} failed on {endpoint}: {details}")]
    Statement {
        operation: String,
        endpoint: String,
        details: String,
    },

    #[error("Invalid database name '{name}': {reason}")]
    InvalidName { name: String, reason: String },
}

/// How a database name is compared against `pg_database.datname`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMatch {
    Exact,
    CaseInsensitive,
}

/// Administrative operations against the local database server.
#[async_trait]
pub trait DatabaseAdmin: Send + Sync {
    /// Look a database up; returns the name as stored on the server.
    async fn find_database(
        &self,
        name: &str,
        matching: NameMatch,
    ) -> Result<Option<String>, DatabaseError>;

    async fn drop_database(&self, name: &str) -> Result<(), DatabaseError>;

    async fn create_database(&self, name: &str) -> Result<(), DatabaseError>;

    /// Write `hash` into the admin row of the users table inside `database`.
    /// Returns the number of rows updated.
    async fn update_legacy_password(&self, database: &str, hash: &str)
        -> Result<u64, DatabaseError>;
}

/// Connection parameters for the admin role.
#[derive(Clone)]
pub struct PgEndpoint {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub bootstrap_database: String,
}

impl std::fmt::Debug for PgEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgEndpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("bootstrap_database", &self.bootstrap_database)
            .finish()
    }
}

impl PgEndpoint {
    /// Build from settings; `fallback_password` is used when no admin password is configured.
    pub fn from_settings(settings: &DatabaseSettings, fallback_password: &str) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            user: settings.admin_user.clone(),
            password: settings
                .admin_password
                .clone()
                .unwrap_or_else(|| fallback_password.to_string()),
            bootstrap_database: settings.bootstrap_database.clone(),
        }
    }

    pub fn describe(&self, database: &str) -> String {
        describe_endpoint(&self.user, &self.host, self.port, database)
    }

    fn options(&self, database: &str) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(database)
            .application_name("odoo-inithook")
    }
}

/// Production admin backed by sqlx.
pub struct PgAdmin {
    endpoint: PgEndpoint,
}

impl PgAdmin {
    pub fn new(endpoint: PgEndpoint) -> Self {
        Self { endpoint }
    }

    async fn connect(&self, database: &str) -> Result<PgConnection, DatabaseError> {
        let target = self.endpoint.describe(database);
        debug!("[PHASE: database] [STEP: connect] Connecting to {}", target);
        PgConnection::connect_with(&self.endpoint.options(database))
            .await
            .map_err(|e| DatabaseError::Connect {
                endpoint: target,
                details: e.to_string(),
            })
    }

    fn statement_error(&self, operation: &str, database: &str, e: sqlx::Error) -> DatabaseError {
        DatabaseError::Statement {
            operation: operation.to_string(),
            endpoint: self.endpoint.describe(database),
            details: e.to_string(),
        }
    }

    async fn execute_ddl(&self, operation: &str, stmt: &str) -> Result<(), DatabaseError> {
        let bootstrap = self.endpoint.bootstrap_database.as_str();
        let mut conn = self.connect(bootstrap).await?;
        // Simple-query protocol: no implicit transaction block around the DDL.
        let result = conn.execute(sqlx::raw_sql(stmt)).await;
        let _ = conn.close().await;
        result
            .map(|_| ())
            .map_err(|e| self.statement_error(operation, bootstrap, e))
    }
}

#[async_trait]
impl DatabaseAdmin for PgAdmin {
    async fn find_database(
        &self,
        name: &str,
        matching: NameMatch,
    ) -> Result<Option<String>, DatabaseError> {
        let bootstrap = self.endpoint.bootstrap_database.as_str();
        let query = match matching {
            NameMatch::Exact => FIND_DB_EXACT_QUERY,
            NameMatch::CaseInsensitive => FIND_DB_CASE_INSENSITIVE_QUERY,
        };

        let mut conn = self.connect(bootstrap).await?;
        let result = sqlx::query_scalar::<_, String>(query)
            .bind(name)
            .fetch_optional(&mut conn)
            .await;
        let _ = conn.close().await;

        result.map_err(|e| self.statement_error("Database lookup", bootstrap, e))
    }

    async fn drop_database(&self, name: &str) -> Result<(), DatabaseError> {
        self.execute_ddl("DROP DATABASE", &drop_db_stmt(name)).await
    }

    async fn create_database(&self, name: &str) -> Result<(), DatabaseError> {
        self.execute_ddl("CREATE DATABASE", &create_db_stmt(name)).await
    }

    async fn update_legacy_password(
        &self,
        database: &str,
        hash: &str,
    ) -> Result<u64, DatabaseError> {
        let mut conn = self.connect(database).await?;
        let result = sqlx::query(LEGACY_PASSWORD_UPDATE)
            .bind(hash)
            .bind(LEGACY_ADMIN_USER_ID)
            .execute(&mut conn)
            .await;
        let _ = conn.close().await;

        result
            .map(|r| r.rows_affected())
            .map_err(|e| self.statement_error("Legacy credential update", database, e))
    }
}
