// Provisioner settings
//
// Layered with the `config` crate:
//   1. serde defaults (the stock appliance layout)
//   2. optional TOML file (`/etc/odoo-inithook/settings.toml`, `--config`, or ODOO_INITHOOK_CONFIG)
//   3. environment overrides: ODOO_INITHOOK__<SECTION>__<KEY>, e.g. ODOO_INITHOOK__DATABASE__PORT=5433

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_SETTINGS_PATH: &str = "/etc/odoo-inithook/settings.toml";
pub const SETTINGS_PATH_ENV: &str = "ODOO_INITHOOK_CONFIG";
const ENV_PREFIX: &str = "ODOO_INITHOOK";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: PathSettings,
    pub database: DatabaseSettings,
    pub addons: AddonSettings,
    pub application: ApplicationSettings,
    pub credentials: CredentialSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// The application's INI config file.
    pub odoo_conf: PathBuf,
    /// Add-ons shipped with the application; always first in `addons_path`.
    pub builtin_addons: PathBuf,
    /// Destination root for operator-selected localization add-ons.
    pub localization_dir: PathBuf,
    /// Shared destination for dependency add-ons.
    pub custom_addons_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            odoo_conf: PathBuf::from("/etc/odoo/odoo.conf"),
            builtin_addons: PathBuf::from("/usr/lib/python3/dist-packages/odoo/addons"),
            localization_dir: PathBuf::from("/usr/lib/python3/dist-packages/odoo/l10n"),
            custom_addons_dir: PathBuf::from("/usr/lib/python3/dist-packages/odoo/custom-addons"),
            log_dir: PathBuf::from("/var/log/odoo-inithook"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub admin_user: String,
    /// When unset the operator password is used for the admin connection.
    pub admin_password: Option<String>,
    /// Neutral database the admin connection attaches to.
    pub bootstrap_database: String,
    /// Factory-default database shipped with the image.
    pub default_name: String,
    /// Database holding the legacy admin credential row.
    pub legacy_database: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            admin_user: "postgres".to_string(),
            admin_password: None,
            bootstrap_database: "template1".to_string(),
            default_name: "TurnkeylinuxExample".to_string(),
            legacy_database: "TurnkeylinuxExample".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AddonSettings {
    /// `{name}` is replaced with the selected localization name.
    pub localization_url_template: String,
    /// `{name}` is replaced with the dependency name.
    pub dependency_url_template: String,
    /// Branch to check out; the repository default branch when unset.
    pub branch: Option<String>,
    pub fetch_timeout_secs: u64,
    pub requirements_timeout_secs: u64,
    pub pip: String,
}

impl Default for AddonSettings {
    fn default() -> Self {
        Self {
            localization_url_template: "https://github.com/oca/l10n-{name}".to_string(),
            dependency_url_template: "https://github.com/oca/{name}".to_string(),
            branch: None,
            fetch_timeout_secs: 900,
            requirements_timeout_secs: 900,
            pip: "pip3".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    pub service_name: String,
    pub python: String,
    /// Directory holding the application's Python package.
    pub python_path: PathBuf,
    pub command_timeout_secs: u64,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            service_name: "odoo".to_string(),
            python: "python3".to_string(),
            python_path: PathBuf::from("/usr/lib/python3/dist-packages"),
            command_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CredentialSettings {
    pub pbkdf2_rounds: u32,
}

impl Default for CredentialSettings {
    fn default() -> Self {
        Self {
            pbkdf2_rounds: crate::credentials::hash::DEFAULT_ROUNDS,
        }
    }
}

/// Resolve which settings file to read: explicit path, then env var, then the default location.
pub fn resolve_settings_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    match std::env::var_os(SETTINGS_PATH_ENV).filter(|v| !v.is_empty()) {
        Some(p) => PathBuf::from(p),
        None => PathBuf::from(DEFAULT_SETTINGS_PATH),
    }
}

/// Load settings. A missing file is fine; a malformed one is an error.
pub fn load(path: &Path) -> Result<Settings> {
    let built = config::Config::builder()
        .add_source(
            config::File::from(path)
                .format(config::FileFormat::Toml)
                .required(false),
        )
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("Failed to read settings from {:?}", path))?;

    built
        .try_deserialize::<Settings>()
        .with_context(|| format!("Invalid settings in {:?}", path))
}
