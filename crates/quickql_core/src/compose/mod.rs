//! Schema composition.
//!
//! # Responsibility
//! - Concatenate loaded schema fragments after the baseline scalars.
//! - Layer handler tables in discovery order.
//! - Fall back to the diagnostic schema when nothing loaded.
//!
//! # Invariants
//! - Composition is pure: one report always yields byte-identical schema
//!   text and the same handler bindings.
//! - On a handler name clash the later module wins (`merge_handlers`), and
//!   every clash is recorded in `overrides`.

use crate::extension::RegistryReport;
use crate::handler::{HandlerMap, MutationHandler, OperationKind, QueryHandler};
use crate::schema::{merge_type_defs, CompositionError, MergedSchema};
use log::{info, warn};
use std::fmt::{Debug, Formatter};

mod fallback;

pub use fallback::{
    DiagnosticReport, FALLBACK_ERROR_MESSAGE, FALLBACK_GREETING, FALLBACK_SCHEMA,
};

/// Scalars every composed schema declares before any fragment.
pub const BASELINE_SCHEMA: &str = "scalar JSON\nscalar UUID\n";

/// Tie-break rule for two handlers bound to one name: the incoming one wins.
pub fn merge_handlers<H>(_existing: H, incoming: H) -> H {
    incoming
}

/// One handler binding replaced by a later module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerOverride {
    pub operation: OperationKind,
    pub name: String,
    pub replaced_path: String,
    pub winner_path: String,
}

/// Schema text plus handler tables handed to the server.
#[derive(Clone)]
pub struct CompositionResult {
    pub schema: String,
    pub query_handlers: HandlerMap<QueryHandler>,
    pub mutation_handlers: HandlerMap<MutationHandler>,
    /// Set only when the diagnostic schema was composed.
    pub diagnostic: Option<DiagnosticReport>,
    pub overrides: Vec<HandlerOverride>,
}

impl CompositionResult {
    pub fn is_fallback(&self) -> bool {
        self.diagnostic.is_some()
    }

    /// Runs the schema-merge step; type collisions surface here.
    pub fn merged_schema(&self) -> Result<MergedSchema, CompositionError> {
        let merged = merge_type_defs(&self.schema)?;
        merged.require_query_root()?;
        Ok(merged)
    }
}

impl Debug for CompositionResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositionResult")
            .field("schema", &self.schema)
            .field("query_handlers", &self.query_handlers.keys())
            .field("mutation_handlers", &self.mutation_handlers.keys())
            .field("diagnostic", &self.diagnostic)
            .field("overrides", &self.overrides)
            .finish()
    }
}

/// Composes the registry output into one servable description.
pub fn compose(report: &RegistryReport) -> CompositionResult {
    if report.loaded.is_empty() {
        return compose_fallback(report);
    }

    let mut schema = BASELINE_SCHEMA.to_string();
    let mut query_handlers = HandlerMap::new();
    let mut mutation_handlers = HandlerMap::new();
    let mut query_owners = HandlerMap::new();
    let mut mutation_owners = HandlerMap::new();
    let mut overrides = Vec::new();

    for extension in &report.loaded {
        let fragment = extension.module.schema_fragment();
        schema.push_str(fragment);
        if !fragment.ends_with('\n') {
            schema.push('\n');
        }

        let path = extension.path.display().to_string();
        let contribution = extension.module.contribution();
        for (name, handler) in contribution.query_handlers().into_iter().flatten() {
            layer(
                OperationKind::Query,
                name,
                handler.clone(),
                &path,
                &mut query_handlers,
                &mut query_owners,
                &mut overrides,
            );
        }
        for (name, handler) in contribution.mutation_handlers().into_iter().flatten() {
            layer(
                OperationKind::Mutation,
                name,
                handler.clone(),
                &path,
                &mut mutation_handlers,
                &mut mutation_owners,
                &mut overrides,
            );
        }
    }

    info!(
        "event=compose module=compose status=ok extensions={} queries={} mutations={} overrides={}",
        report.loaded.len(),
        query_handlers.len(),
        mutation_handlers.len(),
        overrides.len()
    );

    CompositionResult {
        schema,
        query_handlers,
        mutation_handlers,
        diagnostic: None,
        overrides,
    }
}

fn compose_fallback(report: &RegistryReport) -> CompositionResult {
    let diagnostic = DiagnosticReport {
        attempted_paths: report.failed_paths.clone(),
    };
    warn!(
        "event=compose module=compose status=fallback attempted={} failed={}",
        report.attempted(),
        diagnostic.attempted_paths.len()
    );

    CompositionResult {
        schema: format!("{BASELINE_SCHEMA}{FALLBACK_SCHEMA}"),
        query_handlers: fallback::fallback_query_handlers(&diagnostic),
        mutation_handlers: HandlerMap::new(),
        diagnostic: Some(diagnostic),
        overrides: Vec::new(),
    }
}

fn layer<H>(
    operation: OperationKind,
    name: &str,
    incoming: H,
    path: &str,
    handlers: &mut HandlerMap<H>,
    owners: &mut HandlerMap<String>,
    overrides: &mut Vec<HandlerOverride>,
) {
    let winner = match handlers.remove(name) {
        Some(existing) => {
            let replaced_path = owners.get(name).cloned().unwrap_or_default();
            warn!(
                "event=handler_override module=compose status=replaced operation={} name={} replaced={} winner={}",
                operation, name, replaced_path, path
            );
            overrides.push(HandlerOverride {
                operation,
                name: name.to_string(),
                replaced_path,
                winner_path: path.to_string(),
            });
            merge_handlers(existing, incoming)
        }
        None => incoming,
    };
    handlers.insert(name.to_string(), winner);
    owners.insert(name.to_string(), path.to_string());
}

#[cfg(test)]
mod tests {
    use super::{compose, merge_handlers, BASELINE_SCHEMA, FALLBACK_ERROR_MESSAGE};
    use crate::extension::{ExtensionModule, LoadFailure, LoadedExtension, ModuleLoadError, RegistryReport};
    use crate::handler::{HandlerContext, OperationKind};
    use crate::store::RecordStore;
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn context() -> HandlerContext {
        HandlerContext::new(Arc::new(RecordStore::open_in_memory().expect("store")))
    }

    fn loaded(path: &str, module: ExtensionModule) -> LoadedExtension {
        LoadedExtension {
            path: PathBuf::from(path),
            module,
        }
    }

    fn report(extensions: Vec<LoadedExtension>) -> RegistryReport {
        RegistryReport {
            loaded_paths: extensions
                .iter()
                .map(|ext| ext.path.display().to_string())
                .collect(),
            loaded: extensions,
            ..RegistryReport::default()
        }
    }

    #[test]
    fn merge_policy_prefers_incoming() {
        assert_eq!(merge_handlers("first", "second"), "second");
    }

    #[test]
    fn later_module_overrides_handler_and_is_recorded() {
        let first = ExtensionModule::builder("type Query { who: String }")
            .query("who", |_| Ok(json!("first")))
            .build()
            .expect("first");
        let second = ExtensionModule::builder("extend type Query { who: String }")
            .query("who", |_| Ok(json!("second")))
            .build()
            .expect("second");

        let composed = compose(&report(vec![loaded("/x/a", first), loaded("/x/b", second)]));
        let who = composed.query_handlers.get("who").expect("who handler");
        assert_eq!(who(&context()).expect("call"), json!("second"));

        assert_eq!(composed.overrides.len(), 1);
        let record = &composed.overrides[0];
        assert_eq!(record.operation, OperationKind::Query);
        assert_eq!(record.replaced_path, "/x/a");
        assert_eq!(record.winner_path, "/x/b");
    }

    #[test]
    fn schema_starts_with_baseline_and_keeps_fragment_order() {
        let books = ExtensionModule::builder("type Query { books: Int }")
            .query("books", |_| Ok(json!(0)))
            .build()
            .expect("books");
        let movies = ExtensionModule::builder("extend type Query { movies: Int }\n")
            .query("movies", |_| Ok(json!(0)))
            .build()
            .expect("movies");

        let composed = compose(&report(vec![loaded("/a", books), loaded("/b", movies)]));
        assert_eq!(
            composed.schema,
            format!(
                "{BASELINE_SCHEMA}type Query {{ books: Int }}\nextend type Query {{ movies: Int }}\n"
            )
        );
        assert!(!composed.is_fallback());
        composed.merged_schema().expect("schema merges");
    }

    #[test]
    fn empty_report_composes_diagnostic_schema() {
        let failed = RegistryReport {
            failed_paths: vec!["/x/broken.toml".to_string()],
            failures: vec![LoadFailure {
                path: PathBuf::from("/x/broken.toml"),
                cause: ModuleLoadError::UnsupportedFormat("x".to_string()),
            }],
            ..RegistryReport::default()
        };

        let composed = compose(&failed);
        assert!(composed.is_fallback());
        assert!(composed.schema.starts_with(BASELINE_SCHEMA));
        assert!(composed.mutation_handlers.is_empty());

        let ctx = context();
        let hello = composed.query_handlers.get("hello").expect("hello");
        assert_eq!(hello(&ctx).expect("hello"), json!("world!"));
        let error = composed.query_handlers.get("error").expect("error");
        assert_eq!(
            error(&ctx).expect("error"),
            json!({ "message": FALLBACK_ERROR_MESSAGE, "files": ["/x/broken.toml"] })
        );
        composed.merged_schema().expect("fallback schema merges");
    }
}
