// Add-on acquisition
//
// - catalog:  the localization add-ons offered to the operator
// - manifest: per-add-on dependency manifest parsing
// - source:   fetching (git) and requirements installation (pip) seams
// - resolver: worklist-driven fetch + one-level dependency expansion -> AddonsPath

pub mod catalog;
pub mod manifest;
pub mod resolver;
pub mod source;

use std::path::PathBuf;

/// Dependency manifest file inside a fetched add-on tree.
pub const DEPENDENCY_MANIFEST: &str = "oca_dependencies.txt";
/// Runtime requirements manifest inside a fetched add-on tree.
pub const REQUIREMENTS_MANIFEST: &str = "requirements.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddonKind {
    /// Selected by the operator.
    TopLevel,
    /// Declared in a top-level add-on's dependency manifest.
    Dependency,
}

/// Per-name progress. Terminal states are `DependenciesExpanded` and `FetchFailed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddonState {
    Unvisited,
    Fetching,
    Fetched,
    DependenciesExpanded,
    FetchFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddonDescriptor {
    pub name: String,
    pub kind: AddonKind,
    /// Fetch locator (repository URL).
    pub source_ref: String,
    /// Names declared in the dependency manifest, in file order.
    pub dependencies: Vec<String>,
    /// Set once the add-on is present on disk.
    pub local_path: Option<PathBuf>,
    pub state: AddonState,
}

impl AddonDescriptor {
    pub fn succeeded(&self) -> bool {
        self.state == AddonState::DependenciesExpanded && self.local_path.is_some()
    }
}

/// Ordered add-on search path. The application resolves names first-match-wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddonsPath(Vec<PathBuf>);

impl AddonsPath {
    pub fn new(builtin: PathBuf) -> Self {
        Self(vec![builtin])
    }

    /// Append unless already present.
    pub fn push(&mut self, location: PathBuf) {
        if !self.0.contains(&location) {
            self.0.push(location);
        }
    }

    pub fn locations(&self) -> &[PathBuf] {
        &self.0
    }

    /// Comma-joined form stored in the `addons_path` config key.
    pub fn to_config_value(&self) -> String {
        self.0
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(",")
    }
}
