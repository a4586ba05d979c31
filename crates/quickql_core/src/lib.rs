//! Extension discovery, isolated loading and schema composition for QuickQL.
//!
//! The pipeline runs once at startup: roots are walked, each candidate file
//! is loaded in isolation, and the loaded modules are composed into one
//! schema plus handler tables. The server crate serves the result.

pub mod compose;
pub mod config;
pub mod extension;
pub mod handler;
pub mod logging;
pub mod schema;
pub mod store;

pub use compose::{
    compose, merge_handlers, CompositionResult, DiagnosticReport, HandlerOverride,
    BASELINE_SCHEMA,
};
pub use config::{ConfigError, RuntimeMode, ServerOptions, Settings};
pub use extension::{
    Contribution, ExtensionModule, ExtensionRegistry, FileModuleLoader, LoadOutcome,
    ModuleLoadError, ModuleLoader, PathWalker, RegistryReport,
};
pub use handler::{
    HandlerContext, HandlerError, HandlerMap, HandlerResult, MutationHandler, OperationKind,
    QueryHandler,
};
pub use logging::{init_logging, logging_status};
pub use schema::{merge_type_defs, CompositionError, MergedSchema};
pub use store::{RecordStore, StoreError};

/// Builds the default file-backed registry for `settings`.
pub fn file_registry(settings: &Settings) -> ExtensionRegistry<FileModuleLoader> {
    let walker = PathWalker::new(&settings.base_dir)
        .with_exclude_marker(settings.exclude_marker.as_str());
    ExtensionRegistry::new(walker, FileModuleLoader::new(&settings.base_dir))
}

/// Runs discovery, loading and composition over `roots`.
pub fn load_and_compose<S: AsRef<str>>(settings: &Settings, roots: &[S]) -> CompositionResult {
    let report = file_registry(settings).load_all(roots);
    compose(&report)
}
