//! SDL merge step.
//!
//! # Responsibility
//! - Parse composed SDL text into a `MergedSchema`.
//! - Fold root operation types and `extend type` blocks field-wise.
//!
//! # Invariants
//! - A field declared twice with different signatures is a conflict.
//! - Any other type defined twice must be identical, otherwise conflict.
//! - Type order follows first definition in the source text.

use super::types::{FieldDef, InputValueDef, MergedSchema, TypeDef, TypeDefKind, TypeExpr};
use super::CompositionError;
use async_graphql_parser::types::{
    BaseType, FieldDefinition, InputValueDefinition, Type, TypeDefinition, TypeKind,
    TypeSystemDefinition,
};
use async_graphql_parser::{parse_schema, Positioned};

/// Root operation types whose fields are unioned across fragments.
pub const ROOT_OPERATION_TYPES: &[&str] = &["Query", "Mutation"];

/// Parses and merges every definition in `sdl`.
pub fn merge_type_defs(sdl: &str) -> Result<MergedSchema, CompositionError> {
    let document = parse_schema(sdl).map_err(|err| CompositionError::Syntax(err.to_string()))?;

    let mut merged = MergedSchema::default();
    for definition in document.definitions {
        match definition {
            TypeSystemDefinition::Type(definition) => {
                let extend = definition.node.extend;
                let def = convert_definition(definition.node)?;
                absorb(&mut merged, def, extend)?;
            }
            TypeSystemDefinition::Schema(_) => {
                return Err(CompositionError::UnsupportedDefinition(
                    "schema definition".to_string(),
                ));
            }
            TypeSystemDefinition::Directive(directive) => {
                return Err(CompositionError::UnsupportedDefinition(format!(
                    "directive @{}",
                    directive.node.name.node
                )));
            }
        }
    }
    Ok(merged)
}

fn absorb(merged: &mut MergedSchema, incoming: TypeDef, extend: bool) -> Result<(), CompositionError> {
    let Some(&position) = merged.index.get(&incoming.name) else {
        merged.index.insert(incoming.name.clone(), merged.types.len());
        merged.types.push(incoming);
        return Ok(());
    };

    let existing = &mut merged.types[position];
    if extend || ROOT_OPERATION_TYPES.contains(&incoming.name.as_str()) {
        return fold_fields(existing, incoming);
    }
    if *existing == incoming {
        return Ok(());
    }
    Err(CompositionError::Conflict {
        type_name: incoming.name,
        reason: "defined more than once with different shapes".to_string(),
    })
}

fn fold_fields(existing: &mut TypeDef, incoming: TypeDef) -> Result<(), CompositionError> {
    match (&mut existing.kind, incoming.kind) {
        (TypeDefKind::Object(fields), TypeDefKind::Object(extra)) => {
            for field in extra {
                match fields.iter().find(|known| known.name == field.name) {
                    Some(known) if *known == field => {}
                    Some(known) => {
                        return Err(CompositionError::Conflict {
                            type_name: existing.name.clone(),
                            reason: format!(
                                "field `{}` declared as `{}` and `{}`",
                                field.name, known.ty, field.ty
                            ),
                        });
                    }
                    None => fields.push(field),
                }
            }
            Ok(())
        }
        (TypeDefKind::InputObject(fields), TypeDefKind::InputObject(extra)) => {
            for field in extra {
                match fields.iter().find(|known| known.name == field.name) {
                    Some(known) if *known == field => {}
                    Some(_) => {
                        return Err(CompositionError::Conflict {
                            type_name: existing.name.clone(),
                            reason: format!("input field `{}` declared twice", field.name),
                        });
                    }
                    None => fields.push(field),
                }
            }
            Ok(())
        }
        (TypeDefKind::Enum(values), TypeDefKind::Enum(extra)) => {
            for value in extra {
                if !values.contains(&value) {
                    values.push(value);
                }
            }
            Ok(())
        }
        (current, other) => Err(CompositionError::Conflict {
            type_name: existing.name.clone(),
            reason: format!(
                "cannot merge `{}` definition into `{}` definition",
                other.label(),
                current.label()
            ),
        }),
    }
}

fn convert_definition(definition: TypeDefinition) -> Result<TypeDef, CompositionError> {
    let name = definition.name.node.to_string();
    let kind = match definition.kind {
        TypeKind::Scalar => TypeDefKind::Scalar,
        TypeKind::Object(object) => {
            if !object.implements.is_empty() {
                return Err(CompositionError::UnsupportedDefinition(format!(
                    "type {name} implements an interface"
                )));
            }
            TypeDefKind::Object(
                object
                    .fields
                    .into_iter()
                    .map(|field| convert_field(field.node))
                    .collect::<Result<_, _>>()?,
            )
        }
        TypeKind::InputObject(input) => TypeDefKind::InputObject(
            input
                .fields
                .into_iter()
                .map(convert_input_value)
                .collect(),
        ),
        TypeKind::Enum(enumeration) => TypeDefKind::Enum(
            enumeration
                .values
                .into_iter()
                .map(|value| value.node.value.node.to_string())
                .collect(),
        ),
        TypeKind::Interface(_) => {
            return Err(CompositionError::UnsupportedDefinition(format!(
                "interface {name}"
            )));
        }
        TypeKind::Union(_) => {
            return Err(CompositionError::UnsupportedDefinition(format!("union {name}")));
        }
    };
    Ok(TypeDef { name, kind })
}

fn convert_field(field: FieldDefinition) -> Result<FieldDef, CompositionError> {
    Ok(FieldDef {
        name: field.name.node.to_string(),
        ty: convert_type(&field.ty.node),
        arguments: field
            .arguments
            .into_iter()
            .map(convert_input_value)
            .collect(),
    })
}

fn convert_input_value(value: Positioned<InputValueDefinition>) -> InputValueDef {
    let value = value.node;
    InputValueDef {
        name: value.name.node.to_string(),
        ty: convert_type(&value.ty.node),
        default_value: value.default_value.map(|default| default.node),
    }
}

fn convert_type(ty: &Type) -> TypeExpr {
    let inner = match &ty.base {
        BaseType::Named(name) => TypeExpr::Named(name.to_string()),
        BaseType::List(item) => TypeExpr::List(Box::new(convert_type(item))),
    };
    if ty.nullable {
        inner
    } else {
        TypeExpr::NonNull(Box::new(inner))
    }
}

#[cfg(test)]
mod tests {
    use super::merge_type_defs;
    use crate::schema::types::{TypeDefKind, TypeExpr};
    use crate::schema::CompositionError;
    use async_graphql_value::{ConstValue, Name};

    #[test]
    fn folds_query_fields_across_fragments() {
        let merged = merge_type_defs(
            "type Query { books: [String] }\n type Query { movies: [String] books: [String] }",
        )
        .expect("root types merge");
        assert_eq!(merged.field_names("Query"), vec!["books", "movies"]);
    }

    #[test]
    fn rejects_conflicting_root_field_signatures() {
        let err = merge_type_defs("type Query { books: [String] }\n type Query { books: Int }")
            .expect_err("field conflict must fail");
        assert!(matches!(err, CompositionError::Conflict { ref type_name, .. } if type_name == "Query"));
    }

    #[test]
    fn tolerates_identical_duplicates_but_rejects_different_ones() {
        merge_type_defs("type Book { id: ID! }\n type Book { id: ID! }")
            .expect("identical duplicates are tolerated");

        let err = merge_type_defs("type Book { id: ID! }\n type Book { id: ID! name: String }")
            .expect_err("different duplicates must fail");
        assert!(matches!(err, CompositionError::Conflict { ref type_name, .. } if type_name == "Book"));
    }

    #[test]
    fn extend_type_appends_fields() {
        let merged =
            merge_type_defs("type Book { id: ID! }\n extend type Book { name: String! }")
                .expect("extension merges");
        assert_eq!(merged.field_names("Book"), vec!["id", "name"]);
    }

    #[test]
    fn converts_arguments_and_defaults() {
        let merged = merge_type_defs(
            "input Page { size: Int = 10 }\n type Query { books(page: Page, tags: [String!]!): [Book] }",
        )
        .expect("merge");
        let query = merged.get("Query").expect("query type");
        let books = &query.fields()[0];
        assert_eq!(books.arguments.len(), 2);
        assert_eq!(books.arguments[1].ty.to_string(), "[String!]!");
        assert_eq!(books.ty, TypeExpr::List(Box::new(TypeExpr::Named("Book".into()))));

        let page = merged.get("Page").expect("input type");
        match &page.kind {
            TypeDefKind::InputObject(fields) => {
                assert_eq!(fields[0].default_value, Some(ConstValue::Number(10.into())));
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn rejects_interfaces_and_syntax_errors() {
        assert!(matches!(
            merge_type_defs("interface Node { id: ID! }"),
            Err(CompositionError::UnsupportedDefinition(_))
        ));
        assert!(matches!(
            merge_type_defs("type Query {"),
            Err(CompositionError::Syntax(_))
        ));
    }

    #[test]
    fn renders_canonical_sdl() {
        let merged = merge_type_defs(
            "scalar UUID\n type Query { hello: String! }\n enum Genre { SCIFI DRAMA }",
        )
        .expect("merge");
        assert_eq!(
            merged.to_sdl(),
            "scalar UUID\n\ntype Query {\n  hello: String!\n}\n\nenum Genre {\n  SCIFI\n  DRAMA\n}\n"
        );

        let defaults = merge_type_defs(
            "enum G { A B }\n type Query { f(g: G = A, tags: [G!] = [A, B], name: String = \"A\"): Int }",
        )
        .expect("merge");
        let query = defaults.get("Query").expect("query type");
        assert_eq!(
            query.fields()[0].arguments[0].default_value,
            Some(ConstValue::Enum(Name::new("A")))
        );
        assert!(defaults
            .to_sdl()
            .contains("  f(g: G = A, tags: [G!] = [A, B], name: String = \"A\"): Int\n"));
        assert_eq!(
            merge_type_defs(&defaults.to_sdl()).expect("rendered SDL parses"),
            defaults
        );
    }
}
