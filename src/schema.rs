//! Whole-file schema assembly.

use std::path::Path;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{error, info, info_span};

use crate::checker::{Severity, TypeChecker};
use crate::derive::{DerivationContext, DeriveOptions};
use crate::error::SchemaError;
use crate::function::derive_function;
use crate::ir::{FunctionDefinition, FunctionsSchema};

/// Function name → issues (errors for unusable functions, warnings otherwise).
pub type FunctionIssues = IndexMap<String, Vec<String>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDerivation {
    pub schema: FunctionsSchema,
    pub issues: FunctionIssues,
}

impl SchemaDerivation {
    /// Functions that have issues and no schema entry.
    pub fn broken_functions(&self) -> impl Iterator<Item = &str> {
        self.issues
            .keys()
            .filter(|name| !self.schema.functions.contains_key(name.as_str()))
            .map(String::as_str)
    }

    pub fn has_broken_functions(&self) -> bool {
        self.broken_functions().next().is_some()
    }
}

/// Derive the schema of every exported function in `entry_file`.
///
/// One registry is shared by all functions of the pass, so a type used by
/// several functions is registered once.
pub fn derive_schema<C: TypeChecker + ?Sized>(
    checker: &C,
    entry_file: &Path,
    options: DeriveOptions,
) -> Result<SchemaDerivation, SchemaError> {
    let _span = info_span!("derive_schema", entry = %entry_file.display()).entered();

    if !checker.has_source_file(entry_file) {
        return Err(SchemaError::EntryNotFound(entry_file.to_path_buf()));
    }
    let errors: Vec<_> = checker
        .diagnostics()
        .into_iter()
        .filter(|d| d.severity == Severity::Error)
        .collect();
    if !errors.is_empty() {
        return Err(SchemaError::Compile(errors));
    }

    let mut cx = DerivationContext::new(checker, entry_file, options);
    let mut functions: IndexMap<String, FunctionDefinition> = IndexMap::new();
    let mut issues = FunctionIssues::new();

    for declaration in checker.exported_functions(entry_file) {
        if functions.contains_key(&declaration.name) || issues.contains_key(&declaration.name) {
            issues
                .entry(declaration.name.clone())
                .or_insert_with(Vec::new)
                .push(format!("Function '{}' is declared more than once; only the first declaration is used.", declaration.name));
            continue;
        }
        let derived = derive_function(&mut cx, &declaration)?;
        if !derived.issues.is_empty() {
            issues.insert(derived.name.clone(), derived.issues);
        }
        if let Some(definition) = derived.definition {
            functions.insert(derived.name, definition);
        }
    }

    let (object_types, scalar_types) = cx.into_registry().into_parts();
    let derivation = SchemaDerivation {
        schema: FunctionsSchema { functions, object_types, scalar_types },
        issues,
    };
    let dangling = derivation.schema.dangling_references();
    if !dangling.is_empty() {
        error!(?dangling, "schema references unregistered types");
    }
    info!(
        functions = derivation.schema.functions.len(),
        object_types = derivation.schema.object_types.len(),
        broken = derivation.broken_functions().count(),
        "derived schema"
    );
    Ok(derivation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{NamedTypeKind, ScalarTypeName, TypeDefinition};
    use crate::program::Program;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const ENTRY: &str = "functions/index.ts";

    fn run(manifest: serde_json::Value) -> Result<SchemaDerivation, SchemaError> {
        let p = Program::from_value(manifest).unwrap();
        derive_schema(&p, Path::new(ENTRY), DeriveOptions::default())
    }

    #[test]
    fn shared_types_are_registered_once() {
        let out = run(json!({
            "entry": ENTRY,
            "files": [ENTRY],
            "functions": [
                { "name": "create", "parameters": [{ "name": "user", "type": "user" }], "returns": "user" },
                { "name": "update", "parameters": [{ "name": "user", "type": "user" }], "returns": "boolean" }
            ],
            "types": {
                "user": { "kind": "object", "name": "User", "declared_in": ENTRY, "properties": [
                    { "name": "name", "type": "string" }
                ]}
            }
        }))
        .unwrap();
        assert_eq!(out.schema.object_types.keys().collect::<Vec<_>>(), vec!["User"]);
        for f in out.schema.functions.values() {
            assert_eq!(f.arguments[0].ty, TypeDefinition::object("User"));
        }
        assert_eq!(
            out.schema.scalar_types.iter().copied().collect::<Vec<_>>(),
            vec![ScalarTypeName::Boolean, ScalarTypeName::String]
        );
        assert!(out.issues.is_empty());
        assert!(out.schema.dangling_references().is_empty());
    }

    #[test]
    fn inline_record_scenario() {
        let out = run(json!({
            "entry": ENTRY,
            "files": [ENTRY],
            "functions": [{ "name": "describe", "parameters": [{ "name": "input", "type": "rec" }], "returns": "string" }],
            "types": {
                "maybe_string": { "kind": "union", "members": ["string", "null"] },
                "rec": { "kind": "object", "declared_in": ENTRY, "properties": [
                    { "name": "a", "type": "number" },
                    { "name": "b", "type": "maybe_string" }
                ]}
            }
        }))
        .unwrap();
        let f = &out.schema.functions["describe"];
        assert_eq!(f.arguments.len(), 1);
        assert_eq!(f.arguments[0].ty, TypeDefinition::Named {
            name: "describe_arguments_input".into(),
            kind: NamedTypeKind::Object,
        });
        let props = &out.schema.object_types["describe_arguments_input"].properties;
        assert_eq!(props.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn broken_functions_are_excluded_but_explained() {
        let out = run(json!({
            "entry": ENTRY,
            "files": [ENTRY, "shared/config.ts"],
            "functions": [
                { "name": "good", "returns": "string" },
                { "name": "configure", "parameters": [{ "name": "config", "type": "config" }], "returns": "string" }
            ],
            "types": {
                "config": { "kind": "object", "name": "Config", "declared_in": "shared/config.ts", "properties": [] }
            }
        }))
        .unwrap();
        assert!(out.schema.functions.contains_key("good"));
        assert!(!out.schema.functions.contains_key("configure"));
        assert_eq!(out.broken_functions().collect::<Vec<_>>(), vec!["configure"]);
        assert!(out.issues["configure"][0].contains("Unsupported location"));
        assert!(out.schema.object_types.is_empty());
    }

    #[test]
    fn types_evicted_with_a_failed_parent_are_derived_again() {
        let out = run(json!({
            "entry": ENTRY,
            "files": [ENTRY],
            "functions": [
                { "name": "publish", "parameters": [{ "name": "post", "type": "post" }], "returns": "boolean" },
                { "name": "follow", "parameters": [{ "name": "author", "type": "author" }], "returns": "boolean" }
            ],
            "types": {
                "author": { "kind": "object", "name": "Author", "declared_in": ENTRY, "properties": [
                    { "name": "handle", "type": "string" }
                ]},
                "post": { "kind": "object", "name": "Post", "declared_in": ENTRY, "properties": [
                    { "name": "author", "type": "author" },
                    { "name": "payload", "type": "any" }
                ]}
            }
        }))
        .unwrap();
        assert_eq!(out.broken_functions().collect::<Vec<_>>(), vec!["publish"]);
        assert_eq!(out.schema.functions["follow"].arguments[0].ty, TypeDefinition::object("Author"));
        assert_eq!(out.schema.object_types.keys().collect::<Vec<_>>(), vec!["Author"]);
        assert_eq!(out.schema.object_types["Author"].properties[0].name, "handle");
        assert!(out.schema.dangling_references().is_empty());
    }

    #[test]
    fn compile_errors_abort_the_pass() {
        let err = run(json!({
            "entry": ENTRY,
            "files": [ENTRY],
            "diagnostics": [
                { "file": ENTRY, "line": 4, "message": "Cannot find name 'x'." },
                { "message": "Unused variable.", "severity": "warning" }
            ],
            "functions": [{ "name": "f", "returns": "string" }]
        }))
        .unwrap_err();
        match err {
            SchemaError::Compile(diagnostics) => assert_eq!(diagnostics.len(), 1),
            other => panic!("expected compile error, got {other:?}"),
        }
    }

    #[test]
    fn missing_entry_aborts_the_pass() {
        let p = Program::from_value(json!({ "entry": ENTRY, "files": [ENTRY] })).unwrap();
        let err = derive_schema(&p, Path::new("functions/other.ts"), DeriveOptions::default()).unwrap_err();
        assert!(matches!(err, SchemaError::EntryNotFound(_)));
    }

    #[test]
    fn rederivation_is_idempotent() {
        let manifest = json!({
            "entry": ENTRY,
            "files": [ENTRY, "functions/models/user.ts"],
            "functions": [
                { "name": "list", "tags": [{ "name": "pure" }], "returns": "users" },
                { "name": "broken", "returns": "void" }
            ],
            "types": {
                "users": { "kind": "array", "element": "user" },
                "user": { "kind": "object", "name": "User", "declared_in": "functions/models/user.ts", "properties": [
                    { "name": "friends", "type": "users" }
                ]}
            }
        });
        let first = run(manifest.clone()).unwrap();
        let second = run(manifest).unwrap();
        assert_eq!(first, second);
        assert!(first.schema.object_types.contains_key("models_user_User"));
    }

    #[test]
    fn duplicate_declarations_keep_the_first() {
        let out = run(json!({
            "entry": ENTRY,
            "files": [ENTRY],
            "functions": [
                { "name": "f", "returns": "string" },
                { "name": "f", "returns": "number" }
            ]
        }))
        .unwrap();
        assert_eq!(
            out.schema.functions["f"].result_type,
            TypeDefinition::scalar(ScalarTypeName::String)
        );
        assert_eq!(out.issues["f"].len(), 1);
        assert!(!out.has_broken_functions());
    }
}
