//! Object type naming.
//!
//! Names must be unique across every module reachable from the entry file and
//! must be valid schema identifiers (`[_A-Za-z][_0-9A-Za-z]*`).

use std::path::{Component, Path, PathBuf};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::checker::{TypeChecker, TypeId};
use crate::error::SchemaError;
use crate::type_path::TypePath;

static LEADING_INVALID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^_A-Za-z]+").expect("static regex"));
static INVALID: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^_0-9A-Za-z]").expect("static regex"));
static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[_A-Za-z][_0-9A-Za-z]*$").expect("static regex"));

/// Strip characters that cannot start an identifier, then replace the rest of
/// the invalid characters with `_`.
pub fn sanitize_identifier(raw: &str) -> String {
    let stripped = LEADING_INVALID.replace(raw, "");
    let out = INVALID.replace_all(&stripped, "_").into_owned();
    if out.is_empty() { "_".to_string() } else { out }
}

pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Lexically normalize a path: drop `.` and fold `name/..`.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => { out.pop(); }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().collect()
}

/// Where a qualified name came from. Two distinct types that sanitize to the
/// same name differ here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeOrigin {
    pub declared_in: PathBuf,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    pub name: String,
    pub origin: TypeOrigin,
}

/// Produce the registry name for an object type.
///
/// The outer `Result` carries internal errors (no symbol, no declaration).
/// The inner `Err` is a per-type error: the type is declared outside the
/// entry file's directory.
pub fn qualify_type_name<C: TypeChecker + ?Sized>(
    checker: &C,
    ty: TypeId,
    type_path: &TypePath,
    entry_file: &Path,
) -> Result<Result<QualifiedName, String>, SchemaError> {
    let alias = checker.alias_symbol(ty);
    let symbol = checker.symbol(ty);

    let declared_name = match (&alias, &symbol) {
        (Some(_), _) => Some(checker.display(ty)),
        (None, Some(s)) if !s.is_anonymous() => Some(checker.display(ty)),
        (None, Some(_)) => None,
        (None, None) => {
            return Err(SchemaError::MissingSymbol {
                type_name: checker.display(ty),
                path: type_path.to_string(),
            });
        }
    };
    let base = declared_name.unwrap_or_else(|| type_path.to_type_name());

    let declarations = alias
        .or(symbol)
        .map(|s| s.declarations)
        .unwrap_or_default();
    let Some(declared_in) = declarations.first() else {
        return Err(SchemaError::MissingDeclaration {
            type_name: base,
            path: type_path.to_string(),
        });
    };

    let entry = normalize_path(entry_file);
    let entry_dir = entry.parent().map(Path::to_path_buf).unwrap_or_default();
    let declared_in = normalize_path(declared_in);
    let qualified = |name: String| QualifiedName {
        name,
        origin: TypeOrigin { declared_in: declared_in.clone(), display: checker.display(ty) },
    };

    if declared_in == entry {
        return Ok(Ok(qualified(sanitize_identifier(&base))));
    }
    let relative = declared_in
        .strip_prefix(&entry_dir)
        .ok()
        .filter(|relative| declared_in.is_absolute() == entry.is_absolute() && is_plain_relative(relative));
    match relative {
        Some(relative) => {
            let module = relative
                .with_extension("")
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            Ok(Ok(qualified(sanitize_identifier(&format!("{module}_{base}")))))
        }
        None => Ok(Err(format!(
            "Unsupported location for type '{base}' in {type_path}: it is declared in '{}', \
             which is outside of '{}'",
            declared_in.display(),
            if entry_dir.as_os_str().is_empty() { ".".into() } else { entry_dir.display().to_string() },
        ))),
    }
}

/// Only named components: no root, prefix or `..`.
fn is_plain_relative(path: &Path) -> bool {
    path.components().all(|c| matches!(c, Component::Normal(_)))
}
