// Config Store Adapter
//
// Reads and rewrites the application's INI config file as an ordered
// section -> key -> value document. Sections and keys that are not touched
// during a run are written back unchanged and in their original order.
//
// Accepted syntax (what the application itself reads):
// - `[section]` headers
// - `key = value` or `key: value`
// - full-line `#` / `;` comments (not preserved on write)
// - indented continuation lines, appended to the previous value with '\n'

use log::debug;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The section holding every key this hook manages.
pub const OPTIONS_SECTION: &str = "options";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config file {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config file {path:?} line {line}: {reason}")]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Section {
    name: String,
    entries: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDocument {
    sections: Vec<Section>,
}

impl ConfigDocument {
    /// Parse INI text. `origin` only labels parse errors.
    pub fn parse(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let mut doc = ConfigDocument::default();
        let mut last_key: Option<(usize, usize)> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = raw.trim();

            if trimmed.is_empty() {
                last_key = None;
                continue;
            }
            if trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            let indented = raw.starts_with(' ') || raw.starts_with('\t');
            if indented {
                if let Some((s, e)) = last_key {
                    let value = &mut doc.sections[s].entries[e].1;
                    value.push('\n');
                    value.push_str(trimmed);
                    continue;
                }
            }

            if trimmed.starts_with('[') {
                let Some(name) = trimmed.strip_prefix('[').and_then(|t| t.strip_suffix(']')) else {
                    return Err(parse_error(origin, line_no, "unterminated section header"));
                };
                let name = name.trim();
                if name.is_empty() {
                    return Err(parse_error(origin, line_no, "empty section name"));
                }
                doc.ensure_section(name);
                last_key = None;
                continue;
            }

            if doc.sections.is_empty() {
                return Err(parse_error(origin, line_no, "key found before any section header"));
            }

            let Some(split_at) = trimmed.find(['=', ':']) else {
                return Err(parse_error(origin, line_no, "expected `key = value`"));
            };
            let key = trimmed[..split_at].trim();
            let value = trimmed[split_at + 1..].trim();
            if key.is_empty() {
                return Err(parse_error(origin, line_no, "empty key"));
            }

            let s = doc.sections.len() - 1;
            let e = doc.sections[s].upsert(key, value);
            last_key = Some((s, e));
        }

        Ok(doc)
    }

    /// Serialize the whole document.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            out.push_str(&format!("[{}]\n", section.name));
            for (key, value) in &section.entries {
                let value = value.replace('\n', "\n\t");
                if value.is_empty() {
                    out.push_str(&format!("{} =\n", key));
                } else {
                    out.push_str(&format!("{} = {}\n", key, value));
                }
            }
            out.push('\n');
        }
        out
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.name == section)?
            .entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.sections.iter().any(|s| s.name == section)
    }

    /// Set `key` in `section`, creating the section first if it is missing.
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        let idx = self.ensure_section(section);
        self.sections[idx].upsert(key, &value.into());
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }

    fn ensure_section(&mut self, name: &str) -> usize {
        if let Some(idx) = self.sections.iter().position(|s| s.name == name) {
            return idx;
        }
        self.sections.push(Section {
            name: name.to_string(),
            entries: Vec::new(),
        });
        self.sections.len() - 1
    }
}

impl Section {
    fn upsert(&mut self, key: &str, value: &str) -> usize {
        if let Some(idx) = self.entries.iter().position(|(k, _)| k == key) {
            self.entries[idx].1 = value.to_string();
            return idx;
        }
        self.entries.push((key.to_string(), value.to_string()));
        self.entries.len() - 1
    }
}

fn parse_error(path: &Path, line: usize, reason: &str) -> ConfigError {
    ConfigError::Parse {
        path: path.to_path_buf(),
        line,
        reason: reason.to_string(),
    }
}

/// Load the document at `path`. A missing file loads as an empty document.
pub async fn load(path: &Path) -> Result<ConfigDocument, ConfigError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => {
            let doc = ConfigDocument::parse(&text, path)?;
            debug!(
                "[PHASE: config] [STEP: load] Loaded {:?} (sections={})",
                path,
                doc.sections.len()
            );
            Ok(doc)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("[PHASE: config] [STEP: load] {:?} not found; starting empty", path);
            Ok(ConfigDocument::default())
        }
        Err(source) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Write the full document back to `path`.
///
/// Plain overwrite (truncate + write) keeps the existing file's owner and mode,
/// which the application service relies on to read it.
pub async fn save(doc: &ConfigDocument, path: &Path) -> Result<(), ConfigError> {
    tokio::fs::write(path, doc.render())
        .await
        .map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    debug!("[PHASE: config] [STEP: save] Wrote {:?}", path);
    Ok(())
}

/// Load, apply `(key, value)` pairs to the `options` section, save.
pub async fn update_options(path: &Path, pairs: &[(&str, String)]) -> Result<(), ConfigError> {
    let mut doc = load(path).await?;
    for (key, value) in pairs {
        doc.set(OPTIONS_SECTION, key, value.clone());
    }
    save(&doc, path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# managed by the appliance
[options]
admin_passwd = $pbkdf2-sha512$25000$abc$def
db_host = False
db_port: 5432
addons_path = /usr/lib/python3/dist-packages/odoo/addons

[logging]
log_level = info
log_handler = :INFO
    werkzeug:WARNING
";

    fn origin() -> PathBuf {
        PathBuf::from("odoo.conf")
    }

    #[test]
    fn parse_reads_both_delimiters_and_continuations() {
        let doc = ConfigDocument::parse(SAMPLE, &origin()).unwrap();
        assert_eq!(doc.get("options", "db_host"), Some("False"));
        assert_eq!(doc.get("options", "db_port"), Some("5432"));
        assert_eq!(doc.get("logging", "log_handler"), Some(":INFO\nwerkzeug:WARNING"));
        assert_eq!(doc.section_names().collect::<Vec<_>>(), vec!["options", "logging"]);
    }

    #[test]
    fn key_before_section_is_rejected() {
        let err = ConfigDocument::parse("db_name = x\n[options]\n", &origin()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { line: 1, .. }));
    }

    #[test]
    fn unterminated_header_is_rejected() {
        assert!(ConfigDocument::parse("[options\n", &origin()).is_err());
    }

    #[test]
    fn set_creates_missing_section() {
        let mut doc = ConfigDocument::default();
        assert!(!doc.has_section(OPTIONS_SECTION));
        doc.set(OPTIONS_SECTION, "db_name", "acme_prod");
        assert!(doc.has_section(OPTIONS_SECTION));
        assert_eq!(doc.get(OPTIONS_SECTION, "db_name"), Some("acme_prod"));
    }

    #[test]
    fn set_overwrites_in_place_keeping_order() {
        let mut doc = ConfigDocument::parse(SAMPLE, &origin()).unwrap();
        doc.set("options", "db_host", "localhost");
        let rendered = doc.render();
        let host = rendered.find("db_host = localhost").unwrap();
        let port = rendered.find("db_port = 5432").unwrap();
        assert!(host < port);
    }

    #[tokio::test]
    async fn round_trip_keeps_unrelated_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("odoo.conf");
        tokio::fs::write(&path, SAMPLE).await.unwrap();

        let mut doc = load(&path).await.unwrap();
        doc.set(OPTIONS_SECTION, "db_name", "acme_prod");
        save(&doc, &path).await.unwrap();

        let reloaded = load(&path).await.unwrap();
        let original = ConfigDocument::parse(SAMPLE, &path).unwrap();
        for section in ["options", "logging"] {
            for key in ["admin_passwd", "db_host", "db_port", "addons_path", "log_level", "log_handler"] {
                assert_eq!(reloaded.get(section, key), original.get(section, key), "{section}.{key}");
            }
        }
        assert_eq!(reloaded.get(OPTIONS_SECTION, "db_name"), Some("acme_prod"));
    }

    #[tokio::test]
    async fn load_missing_file_is_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let doc = load(&dir.path().join("missing.conf")).await.unwrap();
        assert_eq!(doc, ConfigDocument::default());
    }

    #[tokio::test]
    async fn save_into_missing_directory_is_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("odoo.conf");
        let err = save(&ConfigDocument::default(), &path).await.unwrap_err();
        assert!(matches!(err, ConfigError::Write { .. }));
    }

    #[tokio::test]
    async fn update_options_sets_several_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("odoo.conf");
        update_options(
            &path,
            &[("db_name", "x".to_string()), ("without_demo", "True".to_string())],
        )
        .await
        .unwrap();
        let doc = load(&path).await.unwrap();
        assert_eq!(doc.get("options", "db_name"), Some("x"));
        assert_eq!(doc.get("options", "without_demo"), Some("True"));
    }
}
