//! Candidate file discovery.
//!
//! # Responsibility
//! - Expand each root (file or directory) into candidate file paths.
//! - Skip dependency-cache directories by name marker.
//!
//! # Invariants
//! - Output is lazy and sorted by file name within each directory.
//! - A missing root yields nothing and never aborts other roots.
//! - The root itself is never excluded, even when its name has the marker.

use log::{debug, warn};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Directory-name marker of installed third-party packages.
pub const DEFAULT_EXCLUDE_MARKER: &str = "node_modules";

/// Recursive root walker bound to one base directory.
#[derive(Debug, Clone)]
pub struct PathWalker {
    base_dir: PathBuf,
    exclude_marker: String,
}

impl PathWalker {
    /// Creates a walker resolving relative roots against `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            exclude_marker: DEFAULT_EXCLUDE_MARKER.to_string(),
        }
    }

    /// Replaces the exclusion marker; an empty marker disables exclusion.
    pub fn with_exclude_marker(mut self, marker: impl Into<String>) -> Self {
        self.exclude_marker = marker.into();
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn exclude_marker(&self) -> &str {
        &self.exclude_marker
    }

    /// Resolves `root` to an absolute path.
    pub fn resolve(&self, root: &str) -> PathBuf {
        let path = Path::new(root);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Lazily enumerates candidate files under `root`.
    pub fn walk(&self, root: &str) -> Box<dyn Iterator<Item = PathBuf>> {
        let path = self.resolve(root);
        if !path.exists() {
            debug!(
                "event=walk_root module=walker status=not_found path={}",
                path.display()
            );
            return Box::new(std::iter::empty());
        }

        let marker = self.exclude_marker.clone();
        let root_label = path.display().to_string();
        let entries = WalkDir::new(&path)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| entry.depth() == 0 || !is_excluded(entry, &marker))
            .filter_map(move |entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) if err.depth() == 0 => {
                    debug!(
                        "event=walk_root module=walker status=not_found path={} error={}",
                        root_label, err
                    );
                    None
                }
                Err(err) => {
                    warn!(
                        "event=walk_entry module=walker status=skipped root={} error={}",
                        root_label, err
                    );
                    None
                }
            })
            .filter(|entry| !entry.file_type().is_dir())
            .map(DirEntry::into_path);
        Box::new(entries)
    }
}

fn is_excluded(entry: &DirEntry, marker: &str) -> bool {
    !marker.is_empty()
        && entry.file_type().is_dir()
        && entry.file_name().to_string_lossy().contains(marker)
}
