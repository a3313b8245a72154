// Add-on fetch and requirements installation seams
//
// Production implementations shell out to git and pip through run_cmd_with_timeout.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;
use std::path::{Path, PathBuf};
use tokio::time::Duration;

use crate::installation::run_checked;
use crate::settings::AddonSettings;

#[async_trait]
pub trait AddonSource: Send + Sync {
    /// Check the fetch tooling once before any add-on is processed.
    async fn preflight(&self) -> Result<()> {
        Ok(())
    }

    /// Materialize the repository at `url` into `dest`. `dest` must not exist yet.
    async fn fetch(&self, url: &str, branch: Option<&str>, dest: &Path) -> Result<()>;
}

#[async_trait]
pub trait RequirementsInstaller: Send + Sync {
    /// Install the packages listed in a requirements manifest.
    async fn install(&self, manifest: &Path) -> Result<()>;
}

/// Shallow `git clone` fetcher.
pub struct GitSource {
    timeout: Duration,
}

impl GitSource {
    pub fn new(settings: &AddonSettings) -> Self {
        Self {
            timeout: Duration::from_secs(settings.fetch_timeout_secs),
        }
    }
}

pub fn git_clone_args(url: &str, branch: Option<&str>, dest: &Path) -> Vec<String> {
    let mut args = vec![
        "clone".to_string(),
        "--depth".to_string(),
        "1".to_string(),
    ];
    if let Some(branch) = branch {
        args.push("--branch".to_string());
        args.push(branch.to_string());
    }
    args.push("--".to_string());
    args.push(url.to_string());
    args.push(dest.to_string_lossy().into_owned());
    args
}

#[async_trait]
impl AddonSource for GitSource {
    async fn preflight(&self) -> Result<()> {
        let git = which::which("git").context("git is not installed or not on PATH")?;
        info!("[PHASE: addons] [STEP: preflight] Using git at {:?}", git);
        Ok(())
    }

    async fn fetch(&self, url: &str, branch: Option<&str>, dest: &Path) -> Result<()> {
        let args = git_clone_args(url, branch, dest);
        // git refuses to prompt for credentials; an unknown repository fails instead of hanging.
        let envs = [("GIT_TERMINAL_PROMPT", "0")];
        run_checked("git", &args, &envs, self.timeout, "git_clone").await?;
        Ok(())
    }
}

/// `pip install -r` into the system interpreter.
pub struct PipInstaller {
    pip: PathBuf,
    timeout: Duration,
}

impl PipInstaller {
    pub fn new(settings: &AddonSettings) -> Self {
        Self {
            pip: PathBuf::from(&settings.pip),
            timeout: Duration::from_secs(settings.requirements_timeout_secs),
        }
    }
}

pub fn pip_install_args(manifest: &Path) -> Vec<String> {
    vec![
        "install".to_string(),
        "-r".to_string(),
        manifest.to_string_lossy().into_owned(),
        "--break-system-packages".to_string(),
    ]
}

#[async_trait]
impl RequirementsInstaller for PipInstaller {
    async fn install(&self, manifest: &Path) -> Result<()> {
        let pip = self.pip.to_string_lossy();
        let args = pip_install_args(manifest);
        run_checked(&pip, &args, &[], self.timeout, "pip_install").await?;
        Ok(())
    }
}
