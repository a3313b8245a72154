// In-memory stand-ins for the external collaborators, shared by unit tests.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::addons::source::{AddonSource, RequirementsInstaller};
use crate::application::ApplicationControl;
use crate::credentials::hash::CredentialHash;
use crate::database::connection::{DatabaseAdmin, DatabaseError, NameMatch};
use crate::prompt::Prompter;

const FAKE_ENDPOINT: &str = "postgres@localhost:5432/template1";

#[derive(Default)]
struct DbState {
    databases: Vec<String>,
    /// Databases carrying the application schema (the seeded ones).
    with_schema: Vec<String>,
    legacy_hashes: HashMap<String, String>,
    lookups: usize,
    creates: usize,
    drops: usize,
}

/// Database server holding a list of database names. Only the databases passed
/// to `new` have a users table; databases created later are empty.
#[derive(Default)]
pub struct FakeDatabase {
    state: Mutex<DbState>,
    unreachable: bool,
    fail_legacy_update: bool,
    no_admin_row: bool,
}

impl FakeDatabase {
    pub fn new(databases: &[&str]) -> Self {
        let names: Vec<String> = databases.iter().map(|d| d.to_string()).collect();
        Self {
            state: Mutex::new(DbState {
                with_schema: names.clone(),
                databases: names,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Default::default()
        }
    }

    pub fn failing_legacy_update(mut self) -> Self {
        self.fail_legacy_update = true;
        self
    }

    pub fn without_admin_row(mut self) -> Self {
        self.no_admin_row = true;
        self
    }

    pub fn databases(&self) -> Vec<String> {
        let mut dbs = self.state.lock().unwrap().databases.clone();
        dbs.sort();
        dbs
    }

    pub fn lookup_calls(&self) -> usize {
        self.state.lock().unwrap().lookups
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().unwrap().creates
    }

    pub fn drop_calls(&self) -> usize {
        self.state.lock().unwrap().drops
    }

    pub fn legacy_hash(&self, database: &str) -> Option<String> {
        self.state.lock().unwrap().legacy_hashes.get(database).cloned()
    }

    fn check_reachable(&self) -> Result<(), DatabaseError> {
        if self.unreachable {
            return Err(DatabaseError::Connect {
                endpoint: FAKE_ENDPOINT.to_string(),
                details: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DatabaseAdmin for FakeDatabase {
    async fn find_database(
        &self,
        name: &str,
        matching: NameMatch,
    ) -> Result<Option<String>, DatabaseError> {
        self.check_reachable()?;
        let mut state = self.state.lock().unwrap();
        state.lookups += 1;
        let found = state.databases.iter().find(|d| match matching {
            NameMatch::Exact => d.as_str() == name,
            NameMatch::CaseInsensitive => d.eq_ignore_ascii_case(name),
        });
        Ok(found.cloned())
    }

    async fn drop_database(&self, name: &str) -> Result<(), DatabaseError> {
        self.check_reachable()?;
        let mut state = self.state.lock().unwrap();
        state.drops += 1;
        let before = state.databases.len();
        state.databases.retain(|d| d != name);
        if state.databases.len() == before {
            return Err(DatabaseError::Statement {
                operation: "DROP DATABASE".to_string(),
                endpoint: FAKE_ENDPOINT.to_string(),
                details: format!("database \"{}\" does not exist", name),
            });
        }
        Ok(())
    }

    async fn create_database(&self, name: &str) -> Result<(), DatabaseError> {
        self.check_reachable()?;
        let mut state = self.state.lock().unwrap();
        state.creates += 1;
        if state.databases.iter().any(|d| d == name) {
            return Err(DatabaseError::Statement {
                operation: "CREATE DATABASE".to_string(),
                endpoint: FAKE_ENDPOINT.to_string(),
                details: format!("database \"{}\" already exists", name),
            });
        }
        state.databases.push(name.to_string());
        Ok(())
    }

    async fn update_legacy_password(
        &self,
        database: &str,
        hash: &str,
    ) -> Result<u64, DatabaseError> {
        self.check_reachable()?;
        let mut state = self.state.lock().unwrap();
        let has_table = state.databases.iter().any(|d| d == database)
            && state.with_schema.iter().any(|d| d == database);
        if self.fail_legacy_update || !has_table {
            return Err(DatabaseError::Statement {
                operation: "UPDATE res_users".to_string(),
                endpoint: format!("postgres@localhost:5432/{}", database),
                details: "relation \"res_users\" does not exist".to_string(),
            });
        }
        if self.no_admin_row {
            return Ok(0);
        }
        state
            .legacy_hashes
            .insert(database.to_string(), hash.to_string());
        Ok(1)
    }
}

/// Application control surface that records what it was asked to do.
#[derive(Default)]
pub struct FakeApplication {
    admin_hash: Mutex<Option<String>>,
    reloads: Mutex<usize>,
    fail_credential: bool,
    fail_reload: bool,
}

impl FakeApplication {
    pub fn failing_credential() -> Self {
        Self {
            fail_credential: true,
            ..Default::default()
        }
    }

    pub fn failing_reload() -> Self {
        Self {
            fail_reload: true,
            ..Default::default()
        }
    }

    pub fn admin_hash(&self) -> Option<String> {
        self.admin_hash.lock().unwrap().clone()
    }

    pub fn reload_calls(&self) -> usize {
        *self.reloads.lock().unwrap()
    }
}

#[async_trait]
impl ApplicationControl for FakeApplication {
    async fn set_admin_credential(&self, _config_path: &Path, hash: &CredentialHash) -> Result<()> {
        if self.fail_credential {
            return Err(anyhow::anyhow!("config.save() failed: permission denied"));
        }
        *self.admin_hash.lock().unwrap() = Some(hash.as_str().to_string());
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        *self.reloads.lock().unwrap() += 1;
        if self.fail_reload {
            return Err(anyhow::anyhow!("odoo.service is not active after restart"));
        }
        Ok(())
    }
}

/// Package source serving a fixed set of repositories. Fetching writes the
/// repository's files into the destination.
#[derive(Default)]
pub struct FakeAddonSource {
    repos: HashMap<String, Vec<(String, String)>>,
    /// Repositories whose fetch writes into the destination and then fails.
    partial: Vec<String>,
    no_tooling: bool,
    fetched: Mutex<Vec<String>>,
}

impl FakeAddonSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repo(mut self, url: &str, files: &[(&str, &str)]) -> Self {
        self.repos.insert(
            url.to_string(),
            files
                .iter()
                .map(|(name, body)| (name.to_string(), body.to_string()))
                .collect(),
        );
        self
    }

    pub fn with_partial_failure(mut self, url: &str) -> Self {
        self.partial.push(url.to_string());
        self
    }

    pub fn without_tooling(mut self) -> Self {
        self.no_tooling = true;
        self
    }

    /// URLs passed to `fetch`, in call order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl AddonSource for FakeAddonSource {
    async fn preflight(&self) -> Result<()> {
        if self.no_tooling {
            return Err(anyhow::anyhow!("git is not installed or not on PATH"));
        }
        Ok(())
    }

    async fn fetch(&self, url: &str, _branch: Option<&str>, dest: &Path) -> Result<()> {
        self.fetched.lock().unwrap().push(url.to_string());
        if self.partial.iter().any(|u| u == url) {
            tokio::fs::create_dir_all(dest.join(".git")).await?;
            return Err(anyhow::anyhow!("git_clone timed out after 600s"));
        }
        let files = self
            .repos
            .get(url)
            .ok_or_else(|| anyhow::anyhow!("git_clone failed (exit code 128: repository '{}' not found)", url))?;
        tokio::fs::create_dir_all(dest).await?;
        for (name, body) in files {
            tokio::fs::write(dest.join(name), body).await?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeRequirementsInstaller {
    installed: Mutex<Vec<PathBuf>>,
    fail: bool,
}

impl FakeRequirementsInstaller {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn installed(&self) -> Vec<PathBuf> {
        self.installed.lock().unwrap().clone()
    }
}

#[async_trait]
impl RequirementsInstaller for FakeRequirementsInstaller {
    async fn install(&self, manifest: &Path) -> Result<()> {
        self.installed.lock().unwrap().push(manifest.to_path_buf());
        if self.fail {
            return Err(anyhow::anyhow!("pip_install failed (exit code 1)"));
        }
        Ok(())
    }
}

/// Prompter answering from a fixed script, in order.
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    notices: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            notices: Vec::new(),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    fn next(&mut self, title: &str) -> Result<String> {
        self.answers
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("no scripted answer left for '{}'", title))
    }
}

impl Prompter for ScriptedPrompter {
    fn password(&mut self, title: &str, _text: &str, _blacklist: &[char]) -> Result<String> {
        self.next(title)
    }

    fn input(&mut self, title: &str, _text: &str) -> Result<String> {
        self.next(title)
    }

    fn notice(&mut self, text: &str) {
        self.notices.push(text.to_string());
    }
}
