// Application control surface
//
// The application owns its config object model and its reload path. This hook
// only invokes them: the admin credential is set through the application's own
// config API (run under its Python interpreter) and the reload is a service
// restart.

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use std::path::{Path, PathBuf};
use tokio::time::Duration;

use crate::credentials::hash::CredentialHash;
use crate::installation::{run_checked, service};
use crate::settings::ApplicationSettings;

#[async_trait]
pub trait ApplicationControl: Send + Sync {
    /// Load the application config, set the admin credential, persist it.
    async fn set_admin_credential(&self, config_path: &Path, hash: &CredentialHash) -> Result<()>;

    /// Ask the application to pick up its new configuration.
    async fn reload(&self) -> Result<()>;
}

const CONF_ENV: &str = "ODOO_INITHOOK_CONF";
const HASH_ENV: &str = "ODOO_INITHOOK_ADMIN_HASH";
const PYTHONPATH_ENV: &str = "ODOO_INITHOOK_PYTHONPATH";

// Values arrive through the environment so nothing secret is on the command line.
const SET_ADMIN_SCRIPT: &str = r#"
import os, sys
sys.path.insert(0, os.environ['ODOO_INITHOOK_PYTHONPATH'])
import odoo
odoo.tools.config.parse_config(['--config=' + os.environ['ODOO_INITHOOK_CONF']])
odoo.tools.config['admin_passwd'] = os.environ['ODOO_INITHOOK_ADMIN_HASH']
odoo.tools.config.save()
"#;

/// Production control surface for the Odoo service.
pub struct OdooControl {
    python: String,
    python_path: PathBuf,
    service_name: String,
    timeout: Duration,
}

impl OdooControl {
    pub fn new(settings: &ApplicationSettings) -> Self {
        Self {
            python: settings.python.clone(),
            python_path: settings.python_path.clone(),
            service_name: settings.service_name.clone(),
            timeout: Duration::from_secs(settings.command_timeout_secs),
        }
    }
}

#[async_trait]
impl ApplicationControl for OdooControl {
    async fn set_admin_credential(&self, config_path: &Path, hash: &CredentialHash) -> Result<()> {
        let conf = config_path.to_string_lossy();
        let python_path = self.python_path.to_string_lossy();
        let args = vec!["-c".to_string(), SET_ADMIN_SCRIPT.to_string()];
        let envs = [
            (CONF_ENV, &*conf),
            (HASH_ENV, hash.as_str()),
            (PYTHONPATH_ENV, &*python_path),
        ];

        run_checked(&self.python, &args, &envs, self.timeout, "set_admin_credential").await?;
        info!(
            "[PHASE: credentials] [STEP: primary] Admin credential saved through application config (fingerprint={})",
            hash.fingerprint()
        );
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        service::restart_service(&self.service_name, self.timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_reads_every_value_from_environment() {
        for key in [CONF_ENV, HASH_ENV, PYTHONPATH_ENV] {
            assert!(SET_ADMIN_SCRIPT.contains(key), "script must read {}", key);
        }
        assert!(SET_ADMIN_SCRIPT.contains("config.save()"));
    }

    #[tokio::test]
    async fn missing_interpreter_is_an_error() {
        let control = OdooControl {
            python: "definitely-not-a-python-xyz".to_string(),
            python_path: PathBuf::from("/nowhere"),
            service_name: "odoo".to_string(),
            timeout: Duration::from_secs(5),
        };
        let hash = crate::credentials::hash::derive("pw", 10).unwrap();
        let res = control
            .set_admin_credential(Path::new("/etc/odoo/odoo.conf"), &hash)
            .await;
        assert!(res.is_err());
    }
}
