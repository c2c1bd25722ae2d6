// Strongly-typed schema IR. This is what downstream protocol translators consume.

use std::collections::BTreeSet;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ————————————————————————————————————————————————————————————————————————————
// SCHEMA
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionsSchema {
    pub functions: IndexMap<String, FunctionDefinition>,
    pub object_types: IndexMap<String, ObjectTypeDefinition>,
    pub scalar_types: BTreeSet<ScalarTypeName>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub kind: FunctionKind,
    pub arguments: Vec<ArgumentDefinition>,     // declaration order
    pub result_type: TypeDefinition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionKind {
    Query,       // marked pure
    Mutation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub ty: TypeDefinition,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectTypeDefinition {
    pub properties: Vec<ObjectPropertyDefinition>,     // declaration order
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectPropertyDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeDefinition,
}

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TypeDefinition {
    Named {
        name: String,
        kind: NamedTypeKind,
    },
    /// Never wraps another `Nullable` directly.
    Nullable {
        underlying_type: Box<TypeDefinition>,
        null_or_undefinability: NullOrUndefinability,
    },
    Array {
        element_type: Box<TypeDefinition>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamedTypeKind {
    Scalar,
    Object,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullOrUndefinability {
    AcceptsNullOnly,
    AcceptsUndefinedOnly,
    AcceptsEither,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ScalarTypeName {
    Boolean,
    String,
    Float,
}

impl ScalarTypeName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarTypeName::Boolean => "Boolean",
            ScalarTypeName::String => "String",
            ScalarTypeName::Float => "Float",
        }
    }
}

impl std::fmt::Display for ScalarTypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl NullOrUndefinability {
    pub fn from_flags(saw_null: bool, saw_undefined: bool) -> Option<Self> {
        match (saw_null, saw_undefined) {
            (true, true) => Some(NullOrUndefinability::AcceptsEither),
            (true, false) => Some(NullOrUndefinability::AcceptsNullOnly),
            (false, true) => Some(NullOrUndefinability::AcceptsUndefinedOnly),
            (false, false) => None,
        }
    }

    /// Widen two acceptance flags into one (used when collapsing nested nullables).
    pub fn union(self, other: Self) -> Self {
        if self == other { self } else { NullOrUndefinability::AcceptsEither }
    }
}

impl TypeDefinition {
    pub fn scalar(name: ScalarTypeName) -> Self {
        TypeDefinition::Named { name: name.as_str().to_string(), kind: NamedTypeKind::Scalar }
    }

    pub fn object(name: impl Into<String>) -> Self {
        TypeDefinition::Named { name: name.into(), kind: NamedTypeKind::Object }
    }

    pub fn array(element: TypeDefinition) -> Self {
        TypeDefinition::Array { element_type: Box::new(element) }
    }

    /// Wrap in `Nullable`, merging with an existing nullable wrapper instead of nesting.
    pub fn nullable(underlying: TypeDefinition, acceptance: NullOrUndefinability) -> Self {
        match underlying {
            TypeDefinition::Nullable { underlying_type, null_or_undefinability } => {
                TypeDefinition::Nullable {
                    underlying_type,
                    null_or_undefinability: null_or_undefinability.union(acceptance),
                }
            }
            other => TypeDefinition::Nullable {
                underlying_type: Box::new(other),
                null_or_undefinability: acceptance,
            },
        }
    }

    /// Visit every named reference in this tree.
    pub fn named_references(&self) -> Vec<(&str, NamedTypeKind)> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(t) = stack.pop() {
            match t {
                TypeDefinition::Named { name, kind } => out.push((name.as_str(), *kind)),
                TypeDefinition::Nullable { underlying_type, .. } => stack.push(underlying_type),
                TypeDefinition::Array { element_type } => stack.push(element_type),
            }
        }
        out
    }
}

impl FunctionsSchema {
    /// Names referenced by any function or object type that the registry does not define.
    /// Empty for every schema produced by a completed pass.
    pub fn dangling_references(&self) -> Vec<String> {
        let defs = self.functions.values().flat_map(|f| {
            f.arguments.iter().map(|a| &a.ty).chain(std::iter::once(&f.result_type))
        });
        let props = self.object_types.values().flat_map(|o| o.properties.iter().map(|p| &p.ty));
        let mut missing = Vec::new();
        for ty in defs.chain(props) {
            for (name, kind) in ty.named_references() {
                let known = match kind {
                    NamedTypeKind::Object => self.object_types.contains_key(name),
                    NamedTypeKind::Scalar => self.scalar_types.iter().any(|s| s.as_str() == name),
                };
                if !known && !missing.iter().any(|m| m == name) {
                    missing.push(name.to_string());
                }
            }
        }
        missing
    }
}
