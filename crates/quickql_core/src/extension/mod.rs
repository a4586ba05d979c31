//! Extension discovery, isolated loading and registration.
//!
//! Walker yields candidate paths, loader turns each path into a tagged
//! outcome, registry partitions the outcomes in discovery order.

pub mod loader;
pub mod manifest;
pub mod module;
pub mod registry;
pub mod walker;

pub use loader::{
    display_path, FileModuleLoader, JsonFormat, LoadOutcome, ModuleFormat, ModuleLoadError,
    ModuleLoader, TomlFormat,
};
pub use manifest::{ExtensionManifest, ManifestValidationError};
pub use module::{
    is_graphql_name, Contribution, ExtensionModule, ExtensionModuleBuilder, ModuleShapeError,
};
pub use registry::{
    ExtensionRegistry, LoadFailure, LoadedExtension, RegistryReport, DEFAULT_ROOT,
};
pub use walker::{PathWalker, DEFAULT_EXCLUDE_MARKER};
