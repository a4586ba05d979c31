//! Extension document declaration and validation.
//!
//! An extension document is the on-disk form of one module: a `schema`
//! string plus `Query` / `Mutation` tables naming declarative handlers.
//!
//! ```toml
//! schema = """
//! type Book { id: UUID! name: String! }
//! type Query { books: [Book] }
//! """
//!
//! [Query.books]
//! kind = "list"
//! collection = "books"
//! ```

use crate::extension::module::{Contribution, ExtensionModule, ModuleShapeError};
use crate::handler::{HandlerMap, MutationSpec, QuerySpec};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

static COLLECTION_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("collection pattern is valid")
});

/// Declarative extension document as written on disk.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtensionManifest {
    /// GraphQL SDL fragment contributed by this extension.
    #[serde(default)]
    pub schema: Option<String>,
    /// Query handlers keyed by `Query` field name.
    #[serde(rename = "Query", default)]
    pub query: Option<BTreeMap<String, QuerySpec>>,
    /// Mutation handlers keyed by `Mutation` field name.
    #[serde(rename = "Mutation", default)]
    pub mutation: Option<BTreeMap<String, MutationSpec>>,
}

impl ExtensionManifest {
    /// Validates declaration-level invariants that do not need the schema.
    pub fn validate(&self) -> Result<(), ManifestValidationError> {
        match self.schema.as_deref() {
            None => return Err(ManifestValidationError::MissingSchema),
            Some(schema) if schema.trim().is_empty() => {
                return Err(ManifestValidationError::MissingSchema)
            }
            Some(_) => {}
        }

        let queries = self
            .query
            .iter()
            .flatten()
            .filter_map(|(name, spec)| spec.collection().map(|collection| (name, collection)));
        let mutations = self
            .mutation
            .iter()
            .flatten()
            .map(|(name, spec)| (name, spec.collection()));
        for (handler, collection) in queries.chain(mutations) {
            if !COLLECTION_NAME.is_match(collection) {
                return Err(ManifestValidationError::InvalidCollection {
                    handler: handler.clone(),
                    collection: collection.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Validates and turns the document into an executable module.
    pub fn into_module(self) -> Result<ExtensionModule, ManifestValidationError> {
        self.validate()?;

        let query: HandlerMap<_> = self
            .query
            .unwrap_or_default()
            .into_iter()
            .map(|(name, spec)| (name, spec.into_handler()))
            .collect();
        let mutation: HandlerMap<_> = self
            .mutation
            .unwrap_or_default()
            .into_iter()
            .map(|(name, spec)| (name, spec.into_handler()))
            .collect();

        let contribution = Contribution::from_maps(query, mutation)?;
        Ok(ExtensionModule::new(
            self.schema.unwrap_or_default(),
            contribution,
        )?)
    }
}

/// Extension document validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestValidationError {
    MissingSchema,
    InvalidCollection { handler: String, collection: String },
    Shape(ModuleShapeError),
}

impl Display for ManifestValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingSchema => write!(f, "extension document must declare a `schema` string"),
            Self::InvalidCollection {
                handler,
                collection,
            } => write!(
                f,
                "handler `{handler}` uses an invalid collection name: `{collection}`"
            ),
            Self::Shape(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ManifestValidationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Shape(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ModuleShapeError> for ManifestValidationError {
    fn from(value: ModuleShapeError) -> Self {
        Self::Shape(value)
    }
}
