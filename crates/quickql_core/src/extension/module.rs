//! Extension module model and shape validation.
//!
//! # Responsibility
//! - Define the validated unit every loader produces.
//! - Enforce the contribution shape before a module can be registered.
//!
//! # Invariants
//! - `schema_fragment` is non-blank and parses as SDL on its own.
//! - A contribution carries at least one non-empty handler map.
//! - Every handler is declared as a field of the fragment's own root type.
//! - A module is immutable once built.

use crate::handler::{
    mutation_handler, query_handler, HandlerContext, HandlerMap, HandlerResult, MutationHandler,
    OperationKind, QueryHandler,
};
use crate::schema::merge_type_defs;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

static GRAPHQL_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[_A-Za-z][_0-9A-Za-z]*$").expect("GraphQL name pattern is valid")
});

/// Returns whether `value` is a valid GraphQL field name.
pub fn is_graphql_name(value: &str) -> bool {
    GRAPHQL_NAME.is_match(value)
}

/// Handlers contributed by one module, tagged by which roots they cover.
#[derive(Clone)]
pub enum Contribution {
    QueryOnly(HandlerMap<QueryHandler>),
    MutationOnly(HandlerMap<MutationHandler>),
    Both {
        query: HandlerMap<QueryHandler>,
        mutation: HandlerMap<MutationHandler>,
    },
}

impl Contribution {
    /// Builds the tagged contribution; empty maps count as absent.
    pub fn from_maps(
        query: HandlerMap<QueryHandler>,
        mutation: HandlerMap<MutationHandler>,
    ) -> Result<Self, ModuleShapeError> {
        match (query.is_empty(), mutation.is_empty()) {
            (true, true) => Err(ModuleShapeError::MissingHandlers),
            (false, true) => Ok(Self::QueryOnly(query)),
            (true, false) => Ok(Self::MutationOnly(mutation)),
            (false, false) => Ok(Self::Both { query, mutation }),
        }
    }

    pub fn query_handlers(&self) -> Option<&HandlerMap<QueryHandler>> {
        match self {
            Self::QueryOnly(query) | Self::Both { query, .. } => Some(query),
            Self::MutationOnly(_) => None,
        }
    }

    pub fn mutation_handlers(&self) -> Option<&HandlerMap<MutationHandler>> {
        match self {
            Self::MutationOnly(mutation) | Self::Both { mutation, .. } => Some(mutation),
            Self::QueryOnly(_) => None,
        }
    }

    /// Handler names per operation, sorted within each operation.
    pub fn handler_names(&self) -> Vec<(OperationKind, &str)> {
        let queries = self
            .query_handlers()
            .into_iter()
            .flat_map(|map| map.keys())
            .map(|name| (OperationKind::Query, name.as_str()));
        let mutations = self
            .mutation_handlers()
            .into_iter()
            .flat_map(|map| map.keys())
            .map(|name| (OperationKind::Mutation, name.as_str()));
        queries.chain(mutations).collect()
    }
}

impl Debug for Contribution {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Contribution")
            .field("query", &handler_keys(self.query_handlers()))
            .field("mutation", &handler_keys(self.mutation_handlers()))
            .finish()
    }
}

fn handler_keys<H>(map: Option<&HandlerMap<H>>) -> Vec<&str> {
    map.map(|map| map.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

/// A successfully validated extension module.
#[derive(Debug, Clone)]
pub struct ExtensionModule {
    schema_fragment: String,
    contribution: Contribution,
}

impl ExtensionModule {
    /// Validates the fragment/contribution pair.
    pub fn new(
        schema_fragment: impl Into<String>,
        contribution: Contribution,
    ) -> Result<Self, ModuleShapeError> {
        let schema_fragment = schema_fragment.into();
        if schema_fragment.trim().is_empty() {
            return Err(ModuleShapeError::EmptySchema);
        }

        let fragment = merge_type_defs(&schema_fragment)
            .map_err(|err| ModuleShapeError::InvalidSchema(err.to_string()))?;

        for (operation, name) in contribution.handler_names() {
            if !is_graphql_name(name) {
                return Err(ModuleShapeError::InvalidHandlerName(name.to_string()));
            }
            if !fragment
                .field_names(operation.type_name())
                .contains(&name)
            {
                return Err(ModuleShapeError::UndeclaredHandler {
                    operation,
                    name: name.to_string(),
                });
            }
        }

        Ok(Self {
            schema_fragment,
            contribution,
        })
    }

    /// Starts a programmatic module definition.
    pub fn builder(schema_fragment: impl Into<String>) -> ExtensionModuleBuilder {
        ExtensionModuleBuilder {
            schema_fragment: schema_fragment.into(),
            query: HandlerMap::new(),
            mutation: HandlerMap::new(),
        }
    }

    pub fn schema_fragment(&self) -> &str {
        &self.schema_fragment
    }

    pub fn contribution(&self) -> &Contribution {
        &self.contribution
    }
}

/// Builder for modules defined in Rust rather than loaded from disk.
pub struct ExtensionModuleBuilder {
    schema_fragment: String,
    query: HandlerMap<QueryHandler>,
    mutation: HandlerMap<MutationHandler>,
}

impl ExtensionModuleBuilder {
    pub fn query<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&HandlerContext) -> HandlerResult<Value> + Send + Sync + 'static,
    {
        self.query.insert(name.into(), query_handler(handler));
        self
    }

    pub fn mutation<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&HandlerContext, Value) -> HandlerResult<Value> + Send + Sync + 'static,
    {
        self.mutation.insert(name.into(), mutation_handler(handler));
        self
    }

    /// Registers an already shared query handler, keeping its identity.
    pub fn query_shared(mut self, name: impl Into<String>, handler: QueryHandler) -> Self {
        self.query.insert(name.into(), handler);
        self
    }

    /// Registers an already shared mutation handler, keeping its identity.
    pub fn mutation_shared(mut self, name: impl Into<String>, handler: MutationHandler) -> Self {
        self.mutation.insert(name.into(), handler);
        self
    }

    pub fn build(self) -> Result<ExtensionModule, ModuleShapeError> {
        let contribution = Contribution::from_maps(self.query, self.mutation)?;
        ExtensionModule::new(self.schema_fragment, contribution)
    }
}

/// Shape violations that turn a candidate file into a load failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleShapeError {
    EmptySchema,
    InvalidSchema(String),
    MissingHandlers,
    InvalidHandlerName(String),
    UndeclaredHandler {
        operation: OperationKind,
        name: String,
    },
}

impl Display for ModuleShapeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptySchema => write!(f, "schema fragment must not be empty"),
            Self::InvalidSchema(message) => write!(f, "schema fragment is invalid: {message}"),
            Self::MissingHandlers => {
                write!(f, "module must declare at least one Query or Mutation handler")
            }
            Self::InvalidHandlerName(name) => write!(f, "handler name is invalid: {name}"),
            Self::UndeclaredHandler { operation, name } => write!(
                f,
                "handler `{operation}.{name}` is not declared in the module's schema fragment"
            ),
        }
    }
}

impl Error for ModuleShapeError {}
