//! Merged schema model.
//!
//! A parser-independent view of the type definitions that survive the merge
//! step. The server turns it into an executable schema; `to_sdl` renders it
//! back to canonical SDL.

use async_graphql_value::ConstValue;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Write};

/// GraphQL type reference, e.g. `[Book!]!`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Named(String),
    List(Box<TypeExpr>),
    NonNull(Box<TypeExpr>),
}

impl TypeExpr {
    /// Innermost named type.
    pub fn base_name(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::List(inner) | Self::NonNull(inner) => inner.base_name(),
        }
    }
}

impl Display for TypeExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::List(inner) => write!(f, "[{inner}]"),
            Self::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

/// Argument or input-object field.
#[derive(Debug, Clone, PartialEq)]
pub struct InputValueDef {
    pub name: String,
    pub ty: TypeExpr,
    /// Parsed literal, rendered back as written (enum values stay bare).
    pub default_value: Option<ConstValue>,
}

/// Output field of an object type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeExpr,
    pub arguments: Vec<InputValueDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDefKind {
    Scalar,
    Object(Vec<FieldDef>),
    InputObject(Vec<InputValueDef>),
    Enum(Vec<String>),
}

impl TypeDefKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Object(_) => "type",
            Self::InputObject(_) => "input",
            Self::Enum(_) => "enum",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    pub name: String,
    pub kind: TypeDefKind,
}

impl TypeDef {
    /// Object fields, empty for every other kind.
    pub fn fields(&self) -> &[FieldDef] {
        match &self.kind {
            TypeDefKind::Object(fields) => fields,
            _ => &[],
        }
    }
}

/// Type table produced by the merge step, in first-definition order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedSchema {
    pub(crate) types: Vec<TypeDef>,
    pub(crate) index: BTreeMap<String, usize>,
}

impl MergedSchema {
    pub fn types(&self) -> &[TypeDef] {
        &self.types
    }

    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.index.get(name).map(|position| &self.types[*position])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Field names declared on one object type.
    pub fn field_names(&self, type_name: &str) -> Vec<&str> {
        self.get(type_name)
            .map(|def| def.fields().iter().map(|field| field.name.as_str()).collect())
            .unwrap_or_default()
    }

    /// Renders canonical SDL, one definition per block.
    pub fn to_sdl(&self) -> String {
        let mut out = String::new();
        for (position, def) in self.types.iter().enumerate() {
            if position > 0 {
                out.push('\n');
            }
            render_type(&mut out, def);
        }
        out
    }
}

fn render_type(out: &mut String, def: &TypeDef) {
    match &def.kind {
        TypeDefKind::Scalar => {
            let _ = writeln!(out, "scalar {}", def.name);
        }
        TypeDefKind::Object(fields) => {
            let _ = writeln!(out, "type {} {{", def.name);
            for field in fields {
                out.push_str("  ");
                out.push_str(&field.name);
                if !field.arguments.is_empty() {
                    let arguments: Vec<String> =
                        field.arguments.iter().map(render_input_value).collect();
                    let _ = write!(out, "({})", arguments.join(", "));
                }
                let _ = writeln!(out, ": {}", field.ty);
            }
            out.push_str("}\n");
        }
        TypeDefKind::InputObject(fields) => {
            let _ = writeln!(out, "input {} {{", def.name);
            for field in fields {
                let _ = writeln!(out, "  {}", render_input_value(field));
            }
            out.push_str("}\n");
        }
        TypeDefKind::Enum(values) => {
            let _ = writeln!(out, "enum {} {{", def.name);
            for value in values {
                let _ = writeln!(out, "  {value}");
            }
            out.push_str("}\n");
        }
    }
}

fn render_input_value(value: &InputValueDef) -> String {
    match &value.default_value {
        Some(default) => format!("{}: {} = {default}", value.name, value.ty),
        None => format!("{}: {}", value.name, value.ty),
    }
}

#[cfg(test)]
mod tests {
    use super::TypeExpr;

    #[test]
    fn type_expr_renders_graphql_notation() {
        let ty = TypeExpr::NonNull(Box::new(TypeExpr::List(Box::new(TypeExpr::NonNull(
            Box::new(TypeExpr::Named("Book".to_string())),
        )))));
        assert_eq!(ty.to_string(), "[Book!]!");
        assert_eq!(ty.base_name(), "Book");
    }
}
