//! Declarative handler kinds available to extension documents.
//!
//! Extension files cannot ship code, so each handler entry names one of the
//! kinds below and the loader turns it into a closure over the record store.

use super::{
    mutation_handler, query_handler, HandlerError, HandlerResult, MutationHandler, QueryHandler,
};
use crate::store::RECORD_ID_FIELD;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Declarative query handler entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuerySpec {
    /// Returns every record of `collection` in insertion order.
    List { collection: String },
    /// Returns the number of records in `collection`.
    Count { collection: String },
    /// Returns a fixed value.
    Constant { value: Value },
}

/// Declarative mutation handler entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MutationSpec {
    /// Stores `input` with a fresh UUID `id` and returns the record.
    Insert { collection: String },
    /// Merges `input` into the record named by `input.id`.
    Update { collection: String },
    /// Deletes the record named by `input.id` and returns it.
    Remove { collection: String },
}

impl QuerySpec {
    /// Collection touched by this handler, if any.
    pub fn collection(&self) -> Option<&str> {
        match self {
            Self::List { collection } | Self::Count { collection } => Some(collection),
            Self::Constant { .. } => None,
        }
    }

    /// Builds the shared handler closure.
    pub fn into_handler(self) -> QueryHandler {
        match self {
            Self::List { collection } => {
                query_handler(move |ctx| Ok(Value::Array(ctx.store().list(&collection)?)))
            }
            Self::Count { collection } => {
                query_handler(move |ctx| Ok(Value::from(ctx.store().count(&collection)?)))
            }
            Self::Constant { value } => query_handler(move |_| Ok(value.clone())),
        }
    }
}

impl MutationSpec {
    /// Collection touched by this handler.
    pub fn collection(&self) -> &str {
        match self {
            Self::Insert { collection } | Self::Update { collection } | Self::Remove { collection } => {
                collection
            }
        }
    }

    /// Builds the shared handler closure.
    pub fn into_handler(self) -> MutationHandler {
        match self {
            Self::Insert { collection } => mutation_handler(move |ctx, input| {
                let fields = input_object(input)?;
                Ok(ctx.store().insert(&collection, fields)?)
            }),
            Self::Update { collection } => mutation_handler(move |ctx, input| {
                let fields = input_object(input)?;
                let id = record_id(&fields)?;
                let updated = ctx.store().update(&collection, &id, fields)?;
                Ok(updated.unwrap_or(Value::Null))
            }),
            Self::Remove { collection } => mutation_handler(move |ctx, input| {
                let fields = input_object(input)?;
                let id = record_id(&fields)?;
                let removed = ctx.store().remove(&collection, &id)?;
                Ok(removed.unwrap_or(Value::Null))
            }),
        }
    }
}

fn input_object(input: Value) -> HandlerResult<Map<String, Value>> {
    match input {
        Value::Object(fields) => Ok(fields),
        Value::Null => Err(HandlerError::InvalidInput(
            "mutation requires an `input` argument".to_string(),
        )),
        other => Err(HandlerError::InvalidInput(format!(
            "`input` must be an object, got {other}"
        ))),
    }
}

fn record_id(fields: &Map<String, Value>) -> HandlerResult<String> {
    match fields.get(RECORD_ID_FIELD) {
        Some(Value::String(id)) if !id.trim().is_empty() => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(HandlerError::InvalidInput(format!(
            "`input.{RECORD_ID_FIELD}` is required"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::{MutationSpec, QuerySpec};
    use crate::handler::{HandlerContext, HandlerError};
    use crate::store::RecordStore;
    use serde_json::json;
    use std::sync::Arc;

    fn context() -> HandlerContext {
        HandlerContext::new(Arc::new(
            RecordStore::open_in_memory().expect("in-memory store"),
        ))
    }

    fn books() -> String {
        "books".to_string()
    }

    #[test]
    fn insert_then_list_round_trips_through_store() {
        let ctx = context();
        let add = MutationSpec::Insert { collection: books() }.into_handler();
        let list = QuerySpec::List { collection: books() }.into_handler();

        let added = add(&ctx, json!({ "name": "Dune" })).expect("insert handler");
        let listed = list(&ctx).expect("list handler");
        assert_eq!(listed, json!([added]));
    }

    #[test]
    fn update_and_remove_require_an_id() {
        let ctx = context();
        let update = MutationSpec::Update { collection: books() }.into_handler();
        let err = update(&ctx, json!({ "name": "x" })).expect_err("missing id must fail");
        assert!(matches!(err, HandlerError::InvalidInput(_)));

        let remove = MutationSpec::Remove { collection: books() }.into_handler();
        let err = remove(&ctx, json!(null)).expect_err("missing input must fail");
        assert!(matches!(err, HandlerError::InvalidInput(_)));
    }

    #[test]
    fn remove_of_unknown_record_yields_null() {
        let ctx = context();
        let remove = MutationSpec::Remove { collection: books() }.into_handler();
        assert_eq!(
            remove(&ctx, json!({ "id": "missing" })).expect("remove handler"),
            json!(null)
        );
    }

    #[test]
    fn count_and_constant_kinds() {
        let ctx = context();
        let add = MutationSpec::Insert { collection: books() }.into_handler();
        add(&ctx, json!({ "name": "Dune" })).expect("insert");
        add(&ctx, json!({ "name": "Emma" })).expect("insert");

        let count = QuerySpec::Count { collection: books() }.into_handler();
        assert_eq!(count(&ctx).expect("count"), json!(2));

        let constant = QuerySpec::Constant {
            value: json!(["a", "b"]),
        }
        .into_handler();
        assert_eq!(constant(&ctx).expect("constant"), json!(["a", "b"]));
    }

    #[test]
    fn deserializes_tagged_specs() {
        let spec: QuerySpec =
            serde_json::from_value(json!({ "kind": "list", "collection": "books" }))
                .expect("list spec");
        assert_eq!(spec.collection(), Some("books"));

        let spec: MutationSpec =
            serde_json::from_value(json!({ "kind": "insert", "collection": "books" }))
                .expect("insert spec");
        assert_eq!(spec.collection(), "books");

        let err = serde_json::from_value::<QuerySpec>(json!({ "kind": "teleport" }));
        assert!(err.is_err());
    }
}
