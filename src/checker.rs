//! The type-checking service boundary.
//!
//! Derivation never looks at source text. Everything it knows about a program
//! comes through [`TypeChecker`]: exported declarations, and a handful of
//! queries over opaque [`TypeId`] handles.

use std::fmt;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

/// Opaque handle to a type owned by the checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(pub u32);

/// Built-in, structureless types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intrinsic {
    Boolean,
    String,
    Number,
    Null,
    Undefined,
    Void,
    Any,
    Unknown,
    Never,
}

impl Intrinsic {
    pub fn keyword(&self) -> &'static str {
        match self {
            Intrinsic::Boolean => "boolean",
            Intrinsic::String => "string",
            Intrinsic::Number => "number",
            Intrinsic::Null => "null",
            Intrinsic::Undefined => "undefined",
            Intrinsic::Void => "void",
            Intrinsic::Any => "any",
            Intrinsic::Unknown => "unknown",
            Intrinsic::Never => "never",
        }
    }
}

/// Symbol attached to a type. Anonymous literals are named `__type` or `__object`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSymbol {
    pub name: String,
    /// Files holding the declarations of this symbol.
    pub declarations: Vec<PathBuf>,
}

impl TypeSymbol {
    pub fn is_anonymous(&self) -> bool {
        matches!(self.name.as_str(), "__type" | "__object")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySignature {
    pub name: String,
    pub ty: TypeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocTag {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDeclaration {
    pub name: String,
    pub documentation: Option<String>,
    pub ty: TypeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDeclaration {
    pub name: String,
    pub documentation: Option<String>,
    pub tags: Vec<DocTag>,
    pub parameters: Vec<ParameterDeclaration>,
    pub return_type: TypeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// A compile-level diagnostic reported by the checker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub message: String,
    #[serde(default = "default_severity")]
    pub severity: Severity,
}

fn default_severity() -> Severity { Severity::Error }

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, "{}:{line}: {}", file.display(), self.message),
            (Some(file), None) => write!(f, "{}: {}", file.display(), self.message),
            _ => f.write_str(&self.message),
        }
    }
}

pub trait TypeChecker {
    /// Compile diagnostics for the whole program.
    fn diagnostics(&self) -> Vec<Diagnostic>;

    fn has_source_file(&self, path: &Path) -> bool;

    /// Top-level exported function declarations of `path`, in source order.
    fn exported_functions(&self, path: &Path) -> Vec<FunctionDeclaration>;

    fn intrinsic(&self, ty: TypeId) -> Option<Intrinsic>;

    fn is_array(&self, ty: TypeId) -> bool;

    fn is_class_instance(&self, ty: TypeId) -> bool;

    /// Object-shaped: interfaces, literals, and instantiated generic interfaces.
    fn is_object(&self, ty: TypeId) -> bool;

    /// Members of a union type, or `None` when `ty` is not a union.
    fn union_members(&self, ty: TypeId) -> Option<Vec<TypeId>>;

    fn type_arguments(&self, ty: TypeId) -> Vec<TypeId>;

    fn properties(&self, ty: TypeId) -> Vec<PropertySignature>;

    fn symbol(&self, ty: TypeId) -> Option<TypeSymbol>;

    fn alias_symbol(&self, ty: TypeId) -> Option<TypeSymbol>;

    /// Render `ty` the way the checker prints it in messages.
    fn display(&self, ty: TypeId) -> String;
}
