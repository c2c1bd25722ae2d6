//! A [`TypeChecker`] backed by a declarative program manifest.
//!
//! The manifest is what a language front-end exports after type-checking:
//! the exported functions of each file and the graph of types they mention.
//! Types are keyed by id; intrinsic ids (`string`, `number`, `null`, ...) are
//! always available without being declared.
//!
//! ```json
//! {
//!   "entry": "functions/index.ts",
//!   "files": ["functions/index.ts"],
//!   "functions": [
//!     { "name": "hello", "tags": [{ "name": "pure" }],
//!       "parameters": [{ "name": "who", "type": "string" }], "returns": "string" }
//!   ],
//!   "types": {}
//! }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::checker::{
    Diagnostic, DocTag, FunctionDeclaration, Intrinsic, ParameterDeclaration, PropertySignature,
    TypeChecker, TypeId, TypeSymbol,
};
use crate::path_de::{self, PathError};
use crate::qualify::normalize_path;

// ————————————————————————————————————————————————————————————————————————————
// MANIFEST
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramManifest {
    pub entry: PathBuf,
    #[serde(default)]
    pub files: Vec<PathBuf>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
    #[serde(default)]
    pub functions: Vec<FunctionNode>,
    #[serde(default)]
    pub types: IndexMap<String, TypeNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionNode {
    pub name: String,
    #[serde(default)]
    pub documentation: Option<String>,
    #[serde(default)]
    pub tags: Vec<DocTag>,
    #[serde(default)]
    pub parameters: Vec<ParameterNode>,
    pub returns: String,
    #[serde(default = "default_true")]
    pub exported: bool,
    /// Defaults to the entry file.
    #[serde(default)]
    pub declared_in: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterNode {
    pub name: String,
    #[serde(default)]
    pub documentation: Option<String>,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeNode {
    Boolean,
    String,
    Number,
    Null,
    Undefined,
    Void,
    Any,
    Unknown,
    Never,
    Array {
        element: String,
    },
    Union {
        members: Vec<String>,
    },
    /// Interfaces, object literals, and generic instantiations (including `Promise<T>`).
    Object {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        alias: Option<String>,
        #[serde(default)]
        declared_in: Option<PathBuf>,
        #[serde(default)]
        type_arguments: Vec<String>,
        #[serde(default)]
        properties: Vec<PropertyNode>,
    },
    Class {
        name: String,
        #[serde(default)]
        declared_in: Option<PathBuf>,
        #[serde(default)]
        properties: Vec<PropertyNode>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyNode {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    /// `name?: T`: the property type becomes `T | undefined`.
    #[serde(default)]
    pub optional: bool,
}

fn default_true() -> bool { true }

const INTRINSICS: [Intrinsic; 9] = [
    Intrinsic::Boolean,
    Intrinsic::String,
    Intrinsic::Number,
    Intrinsic::Null,
    Intrinsic::Undefined,
    Intrinsic::Void,
    Intrinsic::Any,
    Intrinsic::Unknown,
    Intrinsic::Never,
];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read program manifest {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid program manifest: {0}")]
    Syntax(#[from] PathError),
    #[error("unknown type '{key}' referenced by {referrer}")]
    UnknownType { key: String, referrer: String },
}

// ————————————————————————————————————————————————————————————————————————————
// PROGRAM
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone)]
enum Node {
    Intrinsic(Intrinsic),
    Array(TypeId),
    Union(Vec<TypeId>),
    Object {
        name: Option<String>,
        alias: Option<String>,
        declared_in: Option<PathBuf>,
        type_arguments: Vec<TypeId>,
        properties: Vec<PropertySignature>,
    },
    Class {
        name: String,
        declared_in: Option<PathBuf>,
        properties: Vec<PropertySignature>,
    },
}

#[derive(Debug, Clone)]
struct Function {
    declaration: FunctionDeclaration,
    declared_in: PathBuf,
    exported: bool,
}

#[derive(Debug, Clone)]
pub struct Program {
    entry: PathBuf,
    files: Vec<PathBuf>,
    diagnostics: Vec<Diagnostic>,
    functions: Vec<Function>,
    nodes: Vec<Node>,
    ids: IndexMap<String, TypeId>,
}

impl Program {
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let source = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_manifest(path_de::from_str_with_path(&source)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, LoadError> {
        Self::from_manifest(path_de::from_value_with_path(value)?)
    }

    pub fn from_manifest(manifest: ProgramManifest) -> Result<Self, LoadError> {
        let ProgramManifest { entry, files, diagnostics, functions, types } = manifest;

        // 1) assign ids: implicit intrinsics first, then declared types
        let mut ids: IndexMap<String, TypeId> = IndexMap::new();
        let keys = INTRINSICS
            .iter()
            .map(|i| i.keyword().to_string())
            .filter(|k| !types.contains_key(k))
            .chain(types.keys().cloned());
        for key in keys {
            let next = TypeId(ids.len() as u32);
            ids.insert(key, next);
        }

        // 2) resolve nodes
        let mut nodes: Vec<Node> = INTRINSICS
            .iter()
            .filter(|i| !types.contains_key(i.keyword()))
            .map(|i| Node::Intrinsic(*i))
            .collect();
        let mut optional_unions: Vec<Node> = Vec::new();
        let undefined = resolve(&ids, "undefined", &|| "an optional property".to_string())?;
        let next_synthetic = ids.len();

        for (key, node) in &types {
            let resolved = match node {
                TypeNode::Boolean => Node::Intrinsic(Intrinsic::Boolean),
                TypeNode::String => Node::Intrinsic(Intrinsic::String),
                TypeNode::Number => Node::Intrinsic(Intrinsic::Number),
                TypeNode::Null => Node::Intrinsic(Intrinsic::Null),
                TypeNode::Undefined => Node::Intrinsic(Intrinsic::Undefined),
                TypeNode::Void => Node::Intrinsic(Intrinsic::Void),
                TypeNode::Any => Node::Intrinsic(Intrinsic::Any),
                TypeNode::Unknown => Node::Intrinsic(Intrinsic::Unknown),
                TypeNode::Never => Node::Intrinsic(Intrinsic::Never),
                TypeNode::Array { element } => {
                    Node::Array(resolve(&ids, element, &|| format!("array type '{key}'"))?)
                }
                TypeNode::Union { members } => Node::Union(
                    members
                        .iter()
                        .map(|m| resolve(&ids, m, &|| format!("union type '{key}'")))
                        .collect::<Result<_, _>>()?,
                ),
                TypeNode::Object { name, alias, declared_in, type_arguments, properties } => {
                    Node::Object {
                        name: name.clone(),
                        alias: alias.clone(),
                        declared_in: declared_in.as_deref().map(normalize_path),
                        type_arguments: type_arguments
                            .iter()
                            .map(|a| resolve(&ids, a, &|| format!("type arguments of '{key}'")))
                            .collect::<Result<_, _>>()?,
                        properties: resolve_properties(
                            key,
                            properties,
                            &ids,
                            undefined,
                            next_synthetic,
                            &mut optional_unions,
                        )?,
                    }
                }
                TypeNode::Class { name, declared_in, properties } => Node::Class {
                    name: name.clone(),
                    declared_in: declared_in.as_deref().map(normalize_path),
                    properties: resolve_properties(
                        key,
                        properties,
                        &ids,
                        undefined,
                        next_synthetic,
                        &mut optional_unions,
                    )?,
                },
            };
            nodes.push(resolved);
        }
        nodes.extend(optional_unions);

        // 3) functions
        let entry = normalize_path(&entry);
        let functions = functions
            .iter()
            .map(|f| {
                let parameters = f
                    .parameters
                    .iter()
                    .map(|p| {
                        Ok(ParameterDeclaration {
                            name: p.name.clone(),
                            documentation: p.documentation.clone(),
                            ty: resolve(&ids, &p.ty, &|| format!("function '{}' parameter '{}'", f.name, p.name))?,
                        })
                    })
                    .collect::<Result<Vec<_>, LoadError>>()?;
                let return_type = resolve(&ids, &f.returns, &|| format!("function '{}' return value", f.name))?;
                Ok(Function {
                    declaration: FunctionDeclaration {
                        name: f.name.clone(),
                        documentation: f.documentation.clone(),
                        tags: f.tags.clone(),
                        parameters,
                        return_type,
                    },
                    declared_in: f.declared_in.as_deref().map(normalize_path).unwrap_or_else(|| entry.clone()),
                    exported: f.exported,
                })
            })
            .collect::<Result<Vec<_>, LoadError>>()?;

        let mut program = Program {
            files: files.iter().map(|f| normalize_path(f)).collect(),
            entry,
            diagnostics,
            functions,
            nodes,
            ids,
        };
        program.flatten_unions();
        Ok(program)
    }

    pub fn entry(&self) -> &Path {
        &self.entry
    }

    pub fn type_id(&self, key: &str) -> Option<TypeId> {
        self.ids.get(key).copied()
    }

    fn node(&self, ty: TypeId) -> Option<&Node> {
        self.nodes.get(ty.0 as usize)
    }

    /// Unions of unions are flattened and de-duplicated, as a checker would.
    fn flatten_unions(&mut self) {
        for index in 0..self.nodes.len() {
            if !matches!(self.nodes[index], Node::Union(_)) {
                continue;
            }
            let mut seen = HashSet::new();
            let mut flat = Vec::new();
            let mut stack = vec![TypeId(index as u32)];
            while let Some(ty) = stack.pop() {
                if !seen.insert(ty) {
                    continue;
                }
                match self.node(ty) {
                    Some(Node::Union(members)) => stack.extend(members.iter().rev().copied()),
                    _ => {
                        if !flat.contains(&ty) {
                            flat.push(ty);
                        }
                    }
                }
            }
            self.nodes[index] = Node::Union(flat);
        }
    }

    fn render(&self, ty: TypeId, depth: usize) -> String {
        if depth > 4 {
            return "...".to_string();
        }
        match self.node(ty) {
            None => "<unknown>".to_string(),
            Some(Node::Intrinsic(i)) => i.keyword().to_string(),
            Some(Node::Array(element)) => match self.node(*element) {
                Some(Node::Union(_)) => format!("({})[]", self.render(*element, depth + 1)),
                _ => format!("{}[]", self.render(*element, depth + 1)),
            },
            Some(Node::Union(members)) => members
                .iter()
                .map(|m| self.render(*m, depth + 1))
                .collect::<Vec<_>>()
                .join(" | "),
            Some(Node::Object { name, alias, type_arguments, properties, .. }) => {
                match alias.as_ref().or(name.as_ref()) {
                    Some(label) if type_arguments.is_empty() => label.clone(),
                    Some(label) => format!(
                        "{label}<{}>",
                        type_arguments
                            .iter()
                            .map(|a| self.render(*a, depth + 1))
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                    None if properties.is_empty() => "{}".to_string(),
                    None => format!(
                        "{{ {} }}",
                        properties
                            .iter()
                            .map(|p| format!("{}: {};", p.name, self.render(p.ty, depth + 1)))
                            .collect::<Vec<_>>()
                            .join(" ")
                    ),
                }
            }
            Some(Node::Class { name, .. }) => name.clone(),
        }
    }
}

fn resolve(ids: &IndexMap<String, TypeId>, key: &str, referrer: &dyn Fn() -> String) -> Result<TypeId, LoadError> {
    ids.get(key).copied().ok_or_else(|| LoadError::UnknownType {
        key: key.to_string(),
        referrer: referrer(),
    })
}

fn resolve_properties(
    owner: &str,
    properties: &[PropertyNode],
    ids: &IndexMap<String, TypeId>,
    undefined: TypeId,
    next_synthetic: usize,
    optional_unions: &mut Vec<Node>,
) -> Result<Vec<PropertySignature>, LoadError> {
    properties
        .iter()
        .map(|p| {
            let ty = resolve(ids, &p.ty, &|| format!("type '{owner}' property '{}'", p.name))?;
            let ty = if p.optional {
                optional_unions.push(Node::Union(vec![ty, undefined]));
                TypeId((next_synthetic + optional_unions.len() - 1) as u32)
            } else {
                ty
            };
            Ok(PropertySignature { name: p.name.clone(), ty })
        })
        .collect()
}

// ————————————————————————————————————————————————————————————————————————————
// TYPE CHECKER
// ————————————————————————————————————————————————————————————————————————————

impl TypeChecker for Program {
    fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.clone()
    }

    fn has_source_file(&self, path: &Path) -> bool {
        let path = normalize_path(path);
        path == self.entry || self.files.contains(&path)
    }

    fn exported_functions(&self, path: &Path) -> Vec<FunctionDeclaration> {
        let path = normalize_path(path);
        self.functions
            .iter()
            .filter(|f| f.exported && f.declared_in == path)
            .map(|f| f.declaration.clone())
            .collect()
    }

    fn intrinsic(&self, ty: TypeId) -> Option<Intrinsic> {
        match self.node(ty)? {
            Node::Intrinsic(i) => Some(*i),
            _ => None,
        }
    }

    fn is_array(&self, ty: TypeId) -> bool {
        matches!(self.node(ty), Some(Node::Array(_)))
    }

    fn is_class_instance(&self, ty: TypeId) -> bool {
        matches!(self.node(ty), Some(Node::Class { .. }))
    }

    fn is_object(&self, ty: TypeId) -> bool {
        matches!(self.node(ty), Some(Node::Object { .. }))
    }

    fn union_members(&self, ty: TypeId) -> Option<Vec<TypeId>> {
        match self.node(ty)? {
            Node::Union(members) => Some(members.clone()),
            _ => None,
        }
    }

    fn type_arguments(&self, ty: TypeId) -> Vec<TypeId> {
        match self.node(ty) {
            Some(Node::Array(element)) => vec![*element],
            Some(Node::Object { type_arguments, .. }) => type_arguments.clone(),
            _ => Vec::new(),
        }
    }

    fn properties(&self, ty: TypeId) -> Vec<PropertySignature> {
        match self.node(ty) {
            Some(Node::Object { properties, .. } | Node::Class { properties, .. }) => properties.clone(),
            _ => Vec::new(),
        }
    }

    fn symbol(&self, ty: TypeId) -> Option<TypeSymbol> {
        match self.node(ty)? {
            Node::Array(_) => Some(TypeSymbol { name: "Array".to_string(), declarations: Vec::new() }),
            Node::Object { name, declared_in, .. } => Some(TypeSymbol {
                name: name.clone().unwrap_or_else(|| "__type".to_string()),
                declarations: declared_in.iter().cloned().collect(),
            }),
            Node::Class { name, declared_in, .. } => Some(TypeSymbol {
                name: name.clone(),
                declarations: declared_in.iter().cloned().collect(),
            }),
            Node::Intrinsic(_) | Node::Union(_) => None,
        }
    }

    fn alias_symbol(&self, ty: TypeId) -> Option<TypeSymbol> {
        match self.node(ty)? {
            Node::Object { alias: Some(alias), declared_in, .. } => Some(TypeSymbol {
                name: alias.clone(),
                declarations: declared_in.iter().cloned().collect(),
            }),
            _ => None,
        }
    }

    fn display(&self, ty: TypeId) -> String {
        self.render(ty, 0)
    }
}
