//! Extension registry.
//!
//! # Responsibility
//! - Drive the walker and the loader over every root in order.
//! - Partition outcomes into loaded and failed sets for composition.
//!
//! # Invariants
//! - Discovery order is preserved in every sequence of the report.
//! - A path is attempted at most once per pass; no retries.
//! - Load failures are absorbed here and never returned as errors.

use crate::extension::loader::{display_path, LoadOutcome, ModuleLoadError, ModuleLoader};
use crate::extension::module::ExtensionModule;
use crate::extension::walker::PathWalker;
use log::{debug, info};
use std::collections::HashSet;
use std::path::PathBuf;

/// Root used when the caller passes no roots.
pub const DEFAULT_ROOT: &str = "demos";

/// A module together with the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedExtension {
    pub path: PathBuf,
    pub module: ExtensionModule,
}

/// A candidate file that did not load.
#[derive(Debug)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub cause: ModuleLoadError,
}

/// Output of one registry pass.
#[derive(Debug, Default)]
pub struct RegistryReport {
    pub loaded: Vec<LoadedExtension>,
    pub loaded_paths: Vec<String>,
    pub failed_paths: Vec<String>,
    pub failures: Vec<LoadFailure>,
}

impl RegistryReport {
    /// Number of candidate files attempted.
    pub fn attempted(&self) -> usize {
        self.loaded.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }

    fn record(&mut self, outcome: LoadOutcome, path: PathBuf) {
        match outcome {
            LoadOutcome::Loaded(module) => {
                self.loaded_paths.push(path.display().to_string());
                self.loaded.push(LoadedExtension { path, module });
            }
            LoadOutcome::Failed { path, cause } => {
                self.failed_paths.push(path.display().to_string());
                self.failures.push(LoadFailure { path, cause });
            }
        }
    }
}

/// Orchestrates discovery and isolated loading.
pub struct ExtensionRegistry<L: ModuleLoader> {
    walker: PathWalker,
    loader: L,
}

impl<L: ModuleLoader> ExtensionRegistry<L> {
    pub fn new(walker: PathWalker, loader: L) -> Self {
        Self { walker, loader }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Flattens walker output across `roots`, dropping duplicate paths.
    ///
    /// An empty root list falls back to [`DEFAULT_ROOT`]. Blank roots are
    /// ignored.
    pub fn discover<S: AsRef<str>>(&self, roots: &[S]) -> Vec<PathBuf> {
        let roots: Vec<&str> = if roots.is_empty() {
            vec![DEFAULT_ROOT]
        } else {
            roots
                .iter()
                .map(|root| root.as_ref())
                .filter(|root| !root.trim().is_empty())
                .collect()
        };

        let mut seen = HashSet::new();
        roots
            .into_iter()
            .flat_map(|root| self.walker.walk(root))
            .filter(|path| seen.insert(path.clone()))
            .collect()
    }

    /// Loads every discovered candidate, in discovery order.
    pub fn load_all<S: AsRef<str>>(&self, roots: &[S]) -> RegistryReport {
        let candidates = self.discover(roots);
        let total = candidates.len();
        let mut report = RegistryReport::default();

        for (index, path) in candidates.into_iter().enumerate() {
            debug!(
                "event=registry_load module=registry status=progress step={}/{} path={}",
                index + 1,
                total,
                display_path(&path, self.walker.base_dir())
            );
            let outcome = self.loader.load(&path);
            report.record(outcome, path);
        }

        if !report.failures.is_empty() {
            info!(
                "event=registry_summary module=registry status=partial loaded={} total={} message=\"Loaded {}/{} schemas\"",
                report.loaded.len(),
                total,
                report.loaded.len(),
                total
            );
        }
        report
    }
}
