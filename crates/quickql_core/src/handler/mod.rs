//! Handler contracts shared by extensions, the composer and the server.
//!
//! # Responsibility
//! - Define the callable shapes of query and mutation handlers.
//! - Carry the ambient request context handed to every handler.
//!
//! # Invariants
//! - Handlers are shared behind `Arc`, so one binding keeps one identity
//!   from load through composition.
//! - Handler failures are values, never panics across the server boundary.

use crate::store::{RecordStore, StoreError};
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub mod builtin;

pub use builtin::{MutationSpec, QuerySpec};

pub type HandlerResult<T> = Result<T, HandlerError>;

/// Query handler: no caller arguments beyond the ambient context.
pub type QueryHandler = Arc<dyn Fn(&HandlerContext) -> HandlerResult<Value> + Send + Sync>;

/// Mutation handler: ambient context plus the single `input` argument.
pub type MutationHandler =
    Arc<dyn Fn(&HandlerContext, Value) -> HandlerResult<Value> + Send + Sync>;

/// Handler table keyed by GraphQL field name.
pub type HandlerMap<H> = BTreeMap<String, H>;

/// Root operation a handler is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperationKind {
    Query,
    Mutation,
}

impl OperationKind {
    /// GraphQL root type name for this operation.
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Query => "Query",
            Self::Mutation => "Mutation",
        }
    }
}

impl Display for OperationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Ambient request context passed to every handler invocation.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    store: Arc<RecordStore>,
}

impl HandlerContext {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }
}

/// Errors returned by handler invocations.
#[derive(Debug)]
pub enum HandlerError {
    InvalidInput(String),
    Store(StoreError),
}

impl Display for HandlerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(message) => write!(f, "invalid handler input: {message}"),
            Self::Store(err) => write!(f, "record store failure: {err}"),
        }
    }
}

impl Error for HandlerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput(_) => None,
            Self::Store(err) => Some(err),
        }
    }
}

impl From<StoreError> for HandlerError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Wraps a closure as a shared query handler.
pub fn query_handler<F>(handler: F) -> QueryHandler
where
    F: Fn(&HandlerContext) -> HandlerResult<Value> + Send + Sync + 'static,
{
    Arc::new(handler)
}

/// Wraps a closure as a shared mutation handler.
pub fn mutation_handler<F>(handler: F) -> MutationHandler
where
    F: Fn(&HandlerContext, Value) -> HandlerResult<Value> + Send + Sync + 'static,
{
    Arc::new(handler)
}
