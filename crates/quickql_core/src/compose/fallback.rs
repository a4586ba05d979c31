//! Diagnostic schema served when no extension loaded.

use crate::handler::{query_handler, HandlerMap, QueryHandler};
use serde_json::{json, Value};

/// SDL of the diagnostic schema, appended after the baseline scalars.
pub const FALLBACK_SCHEMA: &str = "type Error {\n  message: String\n  files: [String]\n}\n\ntype Query {\n  hello: String!\n  error: Error\n}\n";

/// Greeting returned by the diagnostic `hello` query.
pub const FALLBACK_GREETING: &str = "world!";

/// Message returned by the diagnostic `error` query.
pub const FALLBACK_ERROR_MESSAGE: &str = "Couldn't load any schema files.";

/// Paths that were attempted and failed, surfaced as `error.files`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticReport {
    pub attempted_paths: Vec<String>,
}

impl DiagnosticReport {
    pub fn to_value(&self) -> Value {
        json!({
            "message": FALLBACK_ERROR_MESSAGE,
            "files": self.attempted_paths,
        })
    }
}

pub(crate) fn fallback_query_handlers(report: &DiagnosticReport) -> HandlerMap<QueryHandler> {
    let error = report.to_value();
    HandlerMap::from([
        (
            "hello".to_string(),
            query_handler(|_| Ok(Value::from(FALLBACK_GREETING))),
        ),
        (
            "error".to_string(),
            query_handler(move |_| Ok(error.clone())),
        ),
    ])
}
