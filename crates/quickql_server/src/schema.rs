//! Executable schema construction.
//!
//! # Responsibility
//! - Turn a composition into an `async-graphql` dynamic schema.
//! - Bind root fields to composed handlers and resolve nested fields from
//!   the parent JSON value.
//!
//! # Invariants
//! - Handler failures become GraphQL field errors, never panics.
//! - Root fields without a bound handler resolve to `null`.

use crate::error::BootstrapError;
use async_graphql::dynamic::{
    Enum, EnumItem, Field, FieldFuture, FieldValue, InputObject, InputValue, Object, Scalar,
    Schema, TypeRef,
};
use async_graphql::{ErrorExtensions, Name, Value as GqlValue};
use log::info;
use quickql_core::schema::{FieldDef, InputValueDef, TypeDefKind, TypeExpr};
use quickql_core::{
    CompositionResult, HandlerContext, HandlerError, MergedSchema, MutationHandler, QueryHandler,
    ServerOptions,
};
use serde_json::Value;
use std::error::Error as StdError;
use std::sync::Arc;

const BUILTIN_SCALARS: &[&str] = &["Int", "Float", "String", "Boolean", "ID"];
const QUERY_ROOT: &str = "Query";
const MUTATION_ROOT: &str = "Mutation";
/// Argument mutation handlers receive as their input.
pub const MUTATION_INPUT_ARG: &str = "input";

/// Builds the executable schema for `composition`.
///
/// # Errors
/// - The composed SDL does not merge (type conflict, missing `Query`).
/// - `async-graphql` rejects the resulting type graph.
pub fn build_schema(
    composition: &CompositionResult,
    options: &ServerOptions,
    context: HandlerContext,
) -> Result<Schema, BootstrapError> {
    let merged = Arc::new(composition.merged_schema()?);
    let binder = Binder {
        merged: merged.clone(),
        debug: options.debug,
    };

    let has_mutation = merged
        .get(MUTATION_ROOT)
        .is_some_and(|def| !def.fields().is_empty());
    let mut builder = Schema::build(
        QUERY_ROOT,
        has_mutation.then_some(MUTATION_ROOT),
        None,
    );

    for def in merged.types() {
        builder = match &def.kind {
            TypeDefKind::Scalar if BUILTIN_SCALARS.contains(&def.name.as_str()) => builder,
            TypeDefKind::Scalar => builder.register(scalar(&def.name)),
            TypeDefKind::Enum(values) => builder.register(
                values
                    .iter()
                    .fold(Enum::new(def.name.as_str()), |item, value| {
                        item.item(EnumItem::new(value.as_str()))
                    }),
            ),
            TypeDefKind::InputObject(fields) => builder.register(
                fields
                    .iter()
                    .fold(InputObject::new(def.name.as_str()), |object, field| {
                        object.field(input_value(field))
                    }),
            ),
            TypeDefKind::Object(fields) => {
                let object = fields
                    .iter()
                    .fold(Object::new(def.name.as_str()), |object, field| {
                        let resolved = match def.name.as_str() {
                            QUERY_ROOT => binder.query_field(
                                field,
                                composition.query_handlers.get(&field.name).cloned(),
                            ),
                            MUTATION_ROOT if has_mutation => binder.mutation_field(
                                field,
                                composition.mutation_handlers.get(&field.name).cloned(),
                            ),
                            _ => binder.nested_field(field),
                        };
                        object.field(resolved)
                    });
                if def.name == MUTATION_ROOT && !has_mutation {
                    builder
                } else {
                    builder.register(object)
                }
            }
        };
    }

    if !options.introspection {
        builder = builder.disable_introspection();
    }

    let schema = builder
        .data(context)
        .finish()
        .map_err(|err| BootstrapError::Schema(err.to_string()))?;

    info!(
        "event=schema_build module=server status=ok types={} fallback={} introspection={}",
        merged.types().len(),
        composition.is_fallback(),
        options.introspection
    );
    Ok(schema)
}

fn scalar(name: &str) -> Scalar {
    match name {
        "UUID" => Scalar::new(name)
            .description("RFC 4122 UUID in hyphenated string form")
            .validator(|value| matches!(value, GqlValue::String(raw) if uuid::Uuid::parse_str(raw).is_ok())),
        "JSON" => Scalar::new(name).description("Arbitrary JSON value"),
        _ => Scalar::new(name),
    }
}

fn type_ref(expr: &TypeExpr) -> TypeRef {
    match expr {
        TypeExpr::Named(name) => TypeRef::Named(name.clone().into()),
        TypeExpr::List(inner) => TypeRef::List(Box::new(type_ref(inner))),
        TypeExpr::NonNull(inner) => TypeRef::NonNull(Box::new(type_ref(inner))),
    }
}

fn input_value(def: &InputValueDef) -> InputValue {
    let input = InputValue::new(def.name.as_str(), type_ref(&def.ty));
    match def.default_value.clone() {
        Some(default) => input.default_value(default),
        None => input,
    }
}

fn with_arguments(field: Field, def: &FieldDef) -> Field {
    def.arguments
        .iter()
        .fold(field, |field, argument| field.argument(input_value(argument)))
}

/// Shared state every resolver closure captures.
#[derive(Clone)]
struct Binder {
    merged: Arc<MergedSchema>,
    debug: bool,
}

impl Binder {
    fn query_field(&self, def: &FieldDef, handler: Option<QueryHandler>) -> Field {
        let binder = self.clone();
        let ty = def.ty.clone();
        let field = Field::new(def.name.as_str(), type_ref(&def.ty), move |ctx| {
            let binder = binder.clone();
            let handler = handler.clone();
            let ty = ty.clone();
            FieldFuture::new(async move {
                let Some(handler) = handler else {
                    return Ok(None);
                };
                let context = ctx.data::<HandlerContext>()?;
                let value = handler(context).map_err(|err| binder.field_error(&err))?;
                binder.shape(&ty, value)
            })
        });
        with_arguments(field, def)
    }

    fn mutation_field(&self, def: &FieldDef, handler: Option<MutationHandler>) -> Field {
        let binder = self.clone();
        let ty = def.ty.clone();
        let field = Field::new(def.name.as_str(), type_ref(&def.ty), move |ctx| {
            let binder = binder.clone();
            let handler = handler.clone();
            let ty = ty.clone();
            FieldFuture::new(async move {
                let Some(handler) = handler else {
                    return Ok(None);
                };
                let context = ctx.data::<HandlerContext>()?;
                let input = match ctx.args.get(MUTATION_INPUT_ARG) {
                    Some(argument) => argument.as_value().clone().into_json()?,
                    None => Value::Null,
                };
                let value = handler(context, input).map_err(|err| binder.field_error(&err))?;
                binder.shape(&ty, value)
            })
        });
        with_arguments(field, def)
    }

    fn nested_field(&self, def: &FieldDef) -> Field {
        let binder = self.clone();
        let ty = def.ty.clone();
        let name = def.name.clone();
        let field = Field::new(def.name.as_str(), type_ref(&def.ty), move |ctx| {
            let binder = binder.clone();
            let ty = ty.clone();
            let name = name.clone();
            FieldFuture::new(async move {
                let parent = ctx.parent_value.try_downcast_ref::<Value>()?;
                let value = parent.get(&name).cloned().unwrap_or(Value::Null);
                binder.shape(&ty, value)
            })
        });
        with_arguments(field, def)
    }

    /// Converts a handler result into the field value shape `ty` expects.
    fn shape<'a>(
        &self,
        ty: &TypeExpr,
        value: Value,
    ) -> async_graphql::Result<Option<FieldValue<'a>>> {
        if value.is_null() {
            return Ok(None);
        }
        match ty {
            TypeExpr::NonNull(inner) => self.shape(inner, value),
            TypeExpr::List(inner) => {
                let Value::Array(items) = value else {
                    return Err(async_graphql::Error::new(format!(
                        "expected a list for `{ty}`, got {}",
                        json_kind(&value)
                    )));
                };
                let items = items
                    .into_iter()
                    .map(|item| Ok(self.shape(inner, item)?.unwrap_or(FieldValue::NULL)))
                    .collect::<async_graphql::Result<Vec<_>>>()?;
                Ok(Some(FieldValue::list(items)))
            }
            TypeExpr::Named(name) => match self.merged.get(name).map(|def| &def.kind) {
                Some(TypeDefKind::Object(_)) => Ok(Some(FieldValue::owned_any(value))),
                Some(TypeDefKind::Enum(_)) => match value {
                    Value::String(item) => {
                        Ok(Some(FieldValue::value(GqlValue::Enum(Name::new(item)))))
                    }
                    other => Err(async_graphql::Error::new(format!(
                        "expected an enum value for `{name}`, got {}",
                        json_kind(&other)
                    ))),
                },
                _ => Ok(Some(FieldValue::value(GqlValue::from_json(value)?))),
            },
        }
    }

    fn field_error(&self, err: &HandlerError) -> async_graphql::Error {
        let error = async_graphql::Error::new(err.to_string());
        if !self.debug {
            return error;
        }
        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(GqlValue::from(cause.to_string()));
            source = cause.source();
        }
        error.extend_with(|_, extensions| {
            extensions.set("detail", format!("{err:?}"));
            extensions.set("causes", GqlValue::List(chain));
        })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
