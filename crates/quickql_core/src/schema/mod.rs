//! Schema merge and merged-schema model.
//!
//! # Responsibility
//! - Turn composed SDL text into one validated type table.
//! - Report type collisions as fatal composition errors.
//!
//! # Invariants
//! - Merge is pure: the same text always yields the same table.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod merge;
pub mod types;

pub use merge::{merge_type_defs, ROOT_OPERATION_TYPES};
pub use types::{FieldDef, InputValueDef, MergedSchema, TypeDef, TypeDefKind, TypeExpr};

/// Fatal errors raised while merging schema fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompositionError {
    Syntax(String),
    Conflict { type_name: String, reason: String },
    UnsupportedDefinition(String),
    MissingQueryRoot,
}

impl Display for CompositionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Syntax(message) => write!(f, "schema syntax error: {message}"),
            Self::Conflict { type_name, reason } => {
                write!(f, "conflicting definitions of type `{type_name}`: {reason}")
            }
            Self::UnsupportedDefinition(what) => {
                write!(f, "unsupported schema definition: {what}")
            }
            Self::MissingQueryRoot => {
                write!(f, "composed schema does not declare a `Query` type")
            }
        }
    }
}

impl Error for CompositionError {}

impl MergedSchema {
    /// Fails when no extension contributed a `Query` root.
    pub fn require_query_root(&self) -> Result<(), CompositionError> {
        if self.contains("Query") {
            Ok(())
        } else {
            Err(CompositionError::MissingQueryRoot)
        }
    }
}
