// Dependency manifest parsing
//
// Layout of `oca_dependencies.txt`:
//   line 1        header/comment, always skipped
//   other lines   `<name> [<repository url> [<branch>]]`, blank and `#` lines ignored

use anyhow::{Context, Result};
use log::debug;
use std::path::Path;

use crate::addons::DEPENDENCY_MANIFEST;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySpec {
    pub name: String,
    pub source_override: Option<String>,
    pub branch: Option<String>,
}

pub fn parse_dependency_manifest(text: &str) -> Vec<DependencySpec> {
    text.lines()
        .skip(1)
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let name = tokens.next()?.to_string();
            Some(DependencySpec {
                name,
                source_override: tokens.next().map(str::to_string),
                branch: tokens.next().map(str::to_string),
            })
        })
        .collect()
}

/// Read the manifest inside `addon_dir`. A missing manifest means no dependencies.
pub async fn read_dependency_manifest(addon_dir: &Path) -> Result<Vec<DependencySpec>> {
    let path = addon_dir.join(DEPENDENCY_MANIFEST);
    match tokio::fs::read_to_string(&path).await {
        Ok(text) => Ok(parse_dependency_manifest(&text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(
                "[PHASE: addons] [STEP: manifest] No {} in {:?}",
                DEPENDENCY_MANIFEST, addon_dir
            );
            Ok(Vec::new())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to read {:?}", path)),
    }
}
