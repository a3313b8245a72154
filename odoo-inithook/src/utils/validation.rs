// Input validation utilities

use anyhow::Result;
use regex::Regex;

/// Characters the application's admin password must not contain.
pub const PASSWORD_BLACKLIST: [char; 2] = ['\\', '/'];

/// Validate an add-on name before it is used as a directory name or URL segment.
///
/// Security: names come from operator input and from manifests inside fetched repositories,
/// so anything that could escape the add-ons tree (`..`, `/`) is rejected.
pub fn validate_addon_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(anyhow::anyhow!("Add-on name cannot be empty"));
    }
    if name.len() > 100 {
        return Err(anyhow::anyhow!("Add-on name cannot exceed 100 characters"));
    }

    let re = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").map_err(|e| {
        anyhow::anyhow!("Internal error: failed to compile add-on name regex: {}", e)
    })?;
    if !re.is_match(name) || name.contains("..") {
        return Err(anyhow::anyhow!("Add-on name contains invalid characters: '{}'", name));
    }
    Ok(())
}

/// Validate a repository locator before it reaches `git clone`.
///
/// Security: override URLs come from manifests inside fetched repositories. Only
/// remote transports are accepted, so nothing can be read as a git option.
pub fn validate_source_url(url: &str) -> Result<()> {
    let re = Regex::new(r"^(https?://|ssh://|git@)[A-Za-z0-9._~:/@%+=-]+$").map_err(|e| {
        anyhow::anyhow!("Internal error: failed to compile source URL regex: {}", e)
    })?;
    if !re.is_match(url) {
        return Err(anyhow::anyhow!("Unsupported repository URL: '{}'", url));
    }
    Ok(())
}

/// Validate a branch name taken from a dependency manifest.
pub fn validate_branch_name(branch: &str) -> Result<()> {
    let re = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._/-]*$").map_err(|e| {
        anyhow::anyhow!("Internal error: failed to compile branch regex: {}", e)
    })?;
    if !re.is_match(branch) || branch.contains("..") {
        return Err(anyhow::anyhow!("Invalid branch name: '{}'", branch));
    }
    Ok(())
}

/// Validate the operator password (non-empty, no blacklisted characters).
pub fn validate_password(password: &str) -> Result<()> {
    validate_password_with(password, &PASSWORD_BLACKLIST)
}

pub fn validate_password_with(password: &str, blacklist: &[char]) -> Result<()> {
    if password.is_empty() {
        return Err(anyhow::anyhow!("Password cannot be empty"));
    }
    if let Some(c) = password.chars().find(|c| blacklist.contains(c)) {
        return Err(anyhow::anyhow!("Password cannot contain '{}'", c));
    }
    Ok(())
}

/// Interpret a yes/no answer. Anything other than yes/y is a no.
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "yes" | "y")
}
