// Add-on Dependency Resolver & Fetcher
//
// Worklist + visited set:
//   1. enqueue selected top-level names (selection order)
//   2. pop; skip if its name was already visited in its tree; mark visited
//   3. materialize: reuse an existing destination, otherwise fetch
//   4. fresh dependency with requirements.txt -> requirements installer
//   5. depth < EXPANSION_DEPTH -> enqueue names from oca_dependencies.txt
//
// Failures are per item: logged, recorded as FetchFailed, left out of AddonsPath.

use log::{debug, info, warn};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use crate::addons::manifest::{read_dependency_manifest, DependencySpec};
use crate::addons::source::{AddonSource, RequirementsInstaller};
use crate::addons::{
    AddonDescriptor, AddonKind, AddonState, AddonsPath, REQUIREMENTS_MANIFEST,
};
use crate::settings::{AddonSettings, PathSettings};
use crate::utils::validation::{validate_addon_name, validate_branch_name, validate_source_url};

/// Top-level add-ons are depth 0; only their manifests are scanned.
const EXPANSION_DEPTH: usize = 1;

/// Where add-ons come from and where they land.
#[derive(Debug, Clone)]
pub struct AddonLayout {
    pub builtin: PathBuf,
    pub localization_dir: PathBuf,
    pub custom_addons_dir: PathBuf,
    pub localization_url_template: String,
    pub dependency_url_template: String,
    pub branch: Option<String>,
}

impl AddonLayout {
    pub fn from_settings(paths: &PathSettings, addons: &AddonSettings) -> Self {
        Self {
            builtin: paths.builtin_addons.clone(),
            localization_dir: paths.localization_dir.clone(),
            custom_addons_dir: paths.custom_addons_dir.clone(),
            localization_url_template: addons.localization_url_template.clone(),
            dependency_url_template: addons.dependency_url_template.clone(),
            branch: addons.branch.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolutionReport {
    /// One entry per visited repository, in processing order.
    pub descriptors: Vec<AddonDescriptor>,
    pub addons_path: AddonsPath,
}

impl ResolutionReport {
    pub fn failed(&self) -> impl Iterator<Item = &AddonDescriptor> {
        self.descriptors
            .iter()
            .filter(|d| matches!(d.state, AddonState::FetchFailed(_)))
    }
}

struct WorkItem {
    name: String,
    kind: AddonKind,
    depth: usize,
    source_override: Option<String>,
    branch: Option<String>,
}

impl WorkItem {
    fn top_level(name: &str, branch: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            kind: AddonKind::TopLevel,
            depth: 0,
            source_override: None,
            branch,
        }
    }

    fn dependency(spec: DependencySpec, depth: usize, default_branch: Option<String>) -> Self {
        Self {
            name: spec.name,
            kind: AddonKind::Dependency,
            depth,
            source_override: spec.source_override,
            branch: spec.branch.or(default_branch),
        }
    }
}

fn fill_template(template: &str, name: &str) -> String {
    template.replace("{name}", name)
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

fn mark_failed(desc: &mut AddonDescriptor, reason: String) {
    warn!(
        "[PHASE: addons] [STEP: fetch] {} '{}' not installed: {}",
        kind_label(desc.kind),
        desc.name,
        reason
    );
    desc.state = AddonState::FetchFailed(reason);
}

fn kind_label(kind: AddonKind) -> &'static str {
    match kind {
        AddonKind::TopLevel => "Localization module",
        AddonKind::Dependency => "Dependency",
    }
}

pub struct AddonResolver<'a> {
    source: &'a dyn AddonSource,
    installer: &'a dyn RequirementsInstaller,
    layout: AddonLayout,
}

impl<'a> AddonResolver<'a> {
    pub fn new(
        source: &'a dyn AddonSource,
        installer: &'a dyn RequirementsInstaller,
        layout: AddonLayout,
    ) -> Self {
        Self {
            source,
            installer,
            layout,
        }
    }

    fn source_url(&self, item: &WorkItem) -> String {
        if let Some(url) = &item.source_override {
            return url.clone();
        }
        match item.kind {
            AddonKind::TopLevel => fill_template(&self.layout.localization_url_template, &item.name),
            AddonKind::Dependency => fill_template(&self.layout.dependency_url_template, &item.name),
        }
    }

    fn destination(&self, item: &WorkItem) -> PathBuf {
        match item.kind {
            AddonKind::TopLevel => self.layout.localization_dir.join(&item.name),
            AddonKind::Dependency => self.layout.custom_addons_dir.join(&item.name),
        }
    }

    /// Fetch every selected add-on plus one level of declared dependencies.
    pub async fn resolve(&self, selected: &[String]) -> ResolutionReport {
        info!(
            "[PHASE: addons] [STEP: resolve] Resolving {} localization module(s): {}",
            selected.len(),
            selected.join(", ")
        );

        let tooling = self
            .source
            .preflight()
            .await
            .map_err(|e| format!("{:#}", e));
        if let Err(reason) = &tooling {
            warn!(
                "[PHASE: addons] [STEP: preflight] Add-on fetching unavailable: {}",
                reason
            );
        }

        let mut queue: VecDeque<WorkItem> = selected
            .iter()
            .map(|name| WorkItem::top_level(name, self.layout.branch.clone()))
            .collect();
        // Keyed by destination: one entry per name within its add-ons tree.
        let mut visited: HashSet<PathBuf> = HashSet::new();
        let mut descriptors = Vec::new();

        while let Some(item) = queue.pop_front() {
            let url = self.source_url(&item);
            if !visited.insert(self.destination(&item)) {
                debug!(
                    "[PHASE: addons] [STEP: resolve] '{}' already visited; skipping",
                    item.name
                );
                continue;
            }

            let mut desc = AddonDescriptor {
                name: item.name.clone(),
                kind: item.kind,
                source_ref: url,
                dependencies: Vec::new(),
                local_path: None,
                state: AddonState::Unvisited,
            };

            let fresh = match self.materialize(&item, &mut desc, &tooling).await {
                Some(fresh) => fresh,
                None => {
                    descriptors.push(desc);
                    continue;
                }
            };

            if item.kind == AddonKind::Dependency && fresh {
                self.install_requirements(&desc).await;
            }

            if item.depth < EXPANSION_DEPTH {
                for spec in self.declared_dependencies(&desc).await {
                    desc.dependencies.push(spec.name.clone());
                    queue.push_back(WorkItem::dependency(
                        spec,
                        item.depth + 1,
                        self.layout.branch.clone(),
                    ));
                }
            }
            desc.state = AddonState::DependenciesExpanded;
            descriptors.push(desc);
        }

        let addons_path = self.build_addons_path(&descriptors);
        info!(
            "[PHASE: addons] [STEP: resolve] addons_path = {}",
            addons_path.to_config_value()
        );
        ResolutionReport {
            descriptors,
            addons_path,
        }
    }

    /// Make the add-on present on disk. Returns `Some(true)` when freshly fetched,
    /// `Some(false)` when an existing destination was reused, `None` on failure.
    async fn materialize(
        &self,
        item: &WorkItem,
        desc: &mut AddonDescriptor,
        tooling: &Result<(), String>,
    ) -> Option<bool> {
        if let Err(e) = validate_addon_name(&item.name) {
            mark_failed(desc, e.to_string());
            return None;
        }
        if let Err(e) = validate_source_url(&desc.source_ref) {
            mark_failed(desc, e.to_string());
            return None;
        }
        if let Some(Err(e)) = item.branch.as_deref().map(validate_branch_name) {
            mark_failed(desc, e.to_string());
            return None;
        }

        let dest = self.destination(item);
        if is_dir(&dest).await {
            info!(
                "[PHASE: addons] [STEP: fetch] {} '{}' already present at {:?}",
                kind_label(item.kind),
                item.name,
                dest
            );
            desc.local_path = Some(dest);
            desc.state = AddonState::Fetched;
            return Some(false);
        }

        if let Err(reason) = tooling {
            mark_failed(desc, reason.clone());
            return None;
        }

        if let Some(parent) = dest.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                mark_failed(desc, format!("cannot create {:?}: {}", parent, e));
                return None;
            }
        }

        desc.state = AddonState::Fetching;
        info!(
            "[PHASE: addons] [STEP: fetch] Fetching {} '{}' from {}",
            kind_label(item.kind).to_ascii_lowercase(),
            item.name,
            desc.source_ref
        );
        match self
            .source
            .fetch(&desc.source_ref, item.branch.as_deref(), &dest)
            .await
        {
            Ok(()) => {
                desc.local_path = Some(dest);
                desc.state = AddonState::Fetched;
                Some(true)
            }
            Err(e) => {
                mark_failed(desc, format!("{:#}", e));
                // A killed clone leaves a partial tree that would pass as present next run.
                if is_dir(&dest).await {
                    match tokio::fs::remove_dir_all(&dest).await {
                        Ok(()) => debug!(
                            "[PHASE: addons] [STEP: fetch] Removed partial checkout {:?}",
                            dest
                        ),
                        Err(e) => warn!(
                            "[PHASE: addons] [STEP: fetch] Could not remove partial checkout {:?}: {}",
                            dest, e
                        ),
                    }
                }
                None
            }
        }
    }

    async fn declared_dependencies(&self, desc: &AddonDescriptor) -> Vec<DependencySpec> {
        let Some(dir) = desc.local_path.as_deref() else {
            return Vec::new();
        };
        match read_dependency_manifest(dir).await {
            Ok(specs) => {
                if !specs.is_empty() {
                    info!(
                        "[PHASE: addons] [STEP: manifest] '{}' declares {} dependenc(ies)",
                        desc.name,
                        specs.len()
                    );
                }
                specs
            }
            Err(e) => {
                warn!(
                    "[PHASE: addons] [STEP: manifest] Ignoring dependencies of '{}': {:#}",
                    desc.name, e
                );
                Vec::new()
            }
        }
    }

    async fn install_requirements(&self, desc: &AddonDescriptor) {
        let Some(dir) = desc.local_path.as_deref() else {
            return;
        };
        let manifest = dir.join(REQUIREMENTS_MANIFEST);
        if tokio::fs::metadata(&manifest).await.is_err() {
            debug!(
                "[PHASE: addons] [STEP: requirements] No {} in '{}'",
                REQUIREMENTS_MANIFEST, desc.name
            );
            return;
        }
        info!(
            "[PHASE: addons] [STEP: requirements] Installing requirements for '{}'",
            desc.name
        );
        if let Err(e) = self.installer.install(&manifest).await {
            warn!(
                "[PHASE: addons] [STEP: requirements] Requirements for '{}' failed: {:#}",
                desc.name, e
            );
        }
    }

    /// Built-in first, then top-level add-ons, then dependencies; failures omitted.
    fn build_addons_path(&self, descriptors: &[AddonDescriptor]) -> AddonsPath {
        let mut path = AddonsPath::new(self.layout.builtin.clone());
        for kind in [AddonKind::TopLevel, AddonKind::Dependency] {
            for desc in descriptors.iter().filter(|d| d.kind == kind && d.succeeded()) {
                if let Some(location) = &desc.local_path {
                    path.push(location.clone());
                }
            }
        }
        path
    }
}
