//! Type derivation: opaque checker types → schema [`TypeDefinition`]s.
//!
//! Depth-first and single-threaded. Each call returns either a definition
//! (plus warnings raised beneath it) or the full list of problems found in
//! that subtree. Internal failures (depth ceiling, missing symbols) abort the
//! pass through the outer `Result`.
//!
//! Termination: object types are cycle-broken by the registry placeholder;
//! array/nullable unwrapping has no such guard and is bounded only by
//! [`DeriveOptions::max_depth`].

use std::path::Path;
use tracing::trace;

use crate::checker::{TypeChecker, TypeId};
use crate::classify::{classify, TypeShape};
use crate::error::SchemaError;
use crate::ir::{ObjectPropertyDefinition, ObjectTypeDefinition, TypeDefinition};
use crate::qualify::{is_valid_identifier, qualify_type_name, QualifiedName};
use crate::registry::TypeRegistry;
use crate::type_path::{TypePath, TypePathSegment};

// ------------------------------- Policy ---------------------------------- //

pub const DEFAULT_MAX_DEPTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeriveOptions {
    /// Nested array/nullable/object levels allowed along one path.
    pub max_depth: usize,
}

impl Default for DeriveOptions {
    fn default() -> Self {
        Self { max_depth: DEFAULT_MAX_DEPTH }
    }
}

// ------------------------------- Outcomes -------------------------------- //

#[derive(Debug, Clone, PartialEq)]
pub struct Derived<T> {
    pub value: T,
    pub warnings: Vec<String>,
}

impl<T> Derived<T> {
    pub fn new(value: T) -> Self {
        Self { value, warnings: Vec::new() }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Derived<U> {
        Derived { value: f(self.value), warnings: self.warnings }
    }
}

/// Success with warnings, or every fatal problem in the subtree.
pub type Outcome<T> = Result<Derived<T>, Vec<String>>;

// ------------------------------- Context --------------------------------- //

/// State for one derivation pass over one entry file.
pub struct DerivationContext<'a, C: ?Sized> {
    checker: &'a C,
    entry_file: &'a Path,
    options: DeriveOptions,
    registry: TypeRegistry,
}

impl<'a, C: TypeChecker + ?Sized> DerivationContext<'a, C> {
    pub fn new(checker: &'a C, entry_file: &'a Path, options: DeriveOptions) -> Self {
        Self { checker, entry_file, options, registry: TypeRegistry::new() }
    }

    pub fn into_registry(self) -> TypeRegistry {
        self.registry
    }

    pub fn derive_type(&mut self, ty: TypeId, path: &TypePath) -> Result<Outcome<TypeDefinition>, SchemaError> {
        self.derive_at(ty, path, 0)
    }

    fn derive_at(&mut self, ty: TypeId, path: &TypePath, depth: usize) -> Result<Outcome<TypeDefinition>, SchemaError> {
        if depth > self.options.max_depth {
            return Err(SchemaError::DepthExceeded {
                max_depth: self.options.max_depth,
                path: path.to_string(),
            });
        }
        let shape = classify(self.checker, ty);
        trace!(depth, ?shape, %path, "deriving type");

        match shape {
            TypeShape::AsyncWrapper => Ok(Err(vec![format!(
                "Promise types are not supported, but one was encountered in {path} (type: {}).",
                self.checker.display(ty)
            )])),
            TypeShape::ClassInstance => Ok(Err(vec![format!(
                "Class types are not supported, but one was encountered in {path} (type: {}).",
                self.checker.display(ty)
            )])),
            TypeShape::Void => Ok(Err(vec![format!(
                "The void type is not supported, but one was encountered in {path}."
            )])),
            TypeShape::Array { element } => {
                let element = self.derive_at(element, &path.child(TypePathSegment::Array), depth + 1)?;
                Ok(element.map(|d| d.map(TypeDefinition::array)))
            }
            TypeShape::Scalar(scalar) => {
                self.registry.register_scalar(scalar);
                Ok(Ok(Derived::new(TypeDefinition::scalar(scalar))))
            }
            TypeShape::Nullable { underlying, acceptance } => {
                let underlying = self.derive_at(underlying, path, depth + 1)?;
                Ok(underlying.map(|d| d.map(|t| TypeDefinition::nullable(t, acceptance))))
            }
            TypeShape::Object => self.derive_object(ty, path, depth),
            TypeShape::Unsupported => Ok(Err(vec![format!(
                "Unable to derive a schema type for {path} (type: {}).",
                self.checker.display(ty)
            )])),
        }
    }

    fn derive_object(&mut self, ty: TypeId, path: &TypePath, depth: usize) -> Result<Outcome<TypeDefinition>, SchemaError> {
        let QualifiedName { name, origin } = match qualify_type_name(self.checker, ty, path, self.entry_file)? {
            Ok(qualified) => qualified,
            Err(error) => return Ok(Err(vec![error])),
        };

        // Already named (or in progress further up this path).
        match self.registry.origin(&name) {
            Some(existing) if *existing == origin => {
                return Ok(Ok(Derived::new(TypeDefinition::object(name))));
            }
            Some(existing) => {
                return Ok(Err(vec![format!(
                    "Type name collision in {path}: '{}' declared in '{}' and '{}' declared in '{}' both map to '{name}'.",
                    origin.display,
                    origin.declared_in.display(),
                    existing.display,
                    existing.declared_in.display(),
                )]));
            }
            None => {}
        }

        let mark = self.registry.reserve(&name, origin);
        let mut properties = Vec::new();
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        for property in self.checker.properties(ty) {
            if !is_valid_identifier(&property.name) {
                warnings.push(format!(
                    "Property '{}' of type '{name}' is not a valid schema identifier.",
                    property.name
                ));
            }
            let property_path = path.child(TypePathSegment::ObjectProperty {
                type_name: name.clone(),
                property_name: property.name.clone(),
            });
            match self.derive_at(property.ty, &property_path, depth + 1)? {
                Ok(derived) => {
                    warnings.extend(derived.warnings);
                    properties.push(ObjectPropertyDefinition { name: property.name, ty: derived.value });
                }
                Err(property_errors) => errors.extend(property_errors),
            }
        }

        if !errors.is_empty() {
            self.registry.rollback(mark);
            return Ok(Err(errors));
        }
        if properties.is_empty() {
            warnings.push(format!("Object type '{name}' has no properties."));
        }
        self.registry.commit(&name, ObjectTypeDefinition { properties });
        Ok(Ok(Derived { value: TypeDefinition::object(name), warnings }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{NullOrUndefinability, ScalarTypeName};
    use crate::program::Program;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const ENTRY: &str = "functions/index.ts";

    fn program(types: serde_json::Value) -> Program {
        Program::from_value(json!({ "entry": ENTRY, "files": [ENTRY], "types": types })).unwrap()
    }

    fn param_path() -> TypePath {
        TypePath::root(TypePathSegment::FunctionParameter {
            function_name: "f".into(),
            parameter_name: "x".into(),
        })
    }

    fn derive(p: &Program, key: &str) -> (Result<Outcome<TypeDefinition>, SchemaError>, TypeRegistry) {
        let mut cx = DerivationContext::new(p, Path::new(ENTRY), DeriveOptions::default());
        let out = cx.derive_type(p.type_id(key).unwrap(), &param_path());
        (out, cx.into_registry())
    }

    #[test]
    fn scalars_register_their_fixed_name() {
        let p = program(json!({}));
        for (key, scalar) in [
            ("boolean", ScalarTypeName::Boolean),
            ("string", ScalarTypeName::String),
            ("number", ScalarTypeName::Float),
        ] {
            let (out, registry) = derive(&p, key);
            let derived = out.unwrap().unwrap();
            assert_eq!(derived.value, TypeDefinition::scalar(scalar));
            assert!(derived.warnings.is_empty());
            assert_eq!(registry.scalar_types().iter().copied().collect::<Vec<_>>(), vec![scalar]);
            assert!(registry.object_types().is_empty());
        }
    }

    #[test]
    fn inline_record_gets_a_path_name() {
        let p = program(json!({
            "maybe_string": { "kind": "union", "members": ["string", "null"] },
            "rec": { "kind": "object", "declared_in": ENTRY, "properties": [
                { "name": "a", "type": "number" },
                { "name": "b", "type": "maybe_string" }
            ]}
        }));
        let (out, registry) = derive(&p, "rec");
        assert_eq!(out.unwrap().unwrap().value, TypeDefinition::object("f_arguments_x"));
        let def = registry.object_type("f_arguments_x").unwrap();
        assert_eq!(def.properties, vec![
            ObjectPropertyDefinition { name: "a".into(), ty: TypeDefinition::scalar(ScalarTypeName::Float) },
            ObjectPropertyDefinition {
                name: "b".into(),
                ty: TypeDefinition::nullable(
                    TypeDefinition::scalar(ScalarTypeName::String),
                    NullOrUndefinability::AcceptsNullOnly,
                ),
            },
        ]);
    }

    #[test]
    fn self_reference_resolves_to_the_placeholder() {
        let p = program(json!({
            "maybe_node": { "kind": "union", "members": ["node", "undefined"] },
            "nodes": { "kind": "array", "element": "node" },
            "node": { "kind": "object", "name": "Node", "declared_in": ENTRY, "properties": [
                { "name": "next", "type": "maybe_node" },
                { "name": "children", "type": "nodes" }
            ]}
        }));
        let (out, registry) = derive(&p, "node");
        assert_eq!(out.unwrap().unwrap().value, TypeDefinition::object("Node"));
        assert_eq!(registry.object_types().len(), 1);
        let node = registry.object_type("Node").unwrap();
        assert_eq!(node.properties[0].ty, TypeDefinition::nullable(
            TypeDefinition::object("Node"),
            NullOrUndefinability::AcceptsUndefinedOnly,
        ));
        assert_eq!(node.properties[1].ty, TypeDefinition::array(TypeDefinition::object("Node")));
    }

    #[test]
    fn failed_objects_are_evicted_with_their_descendants() {
        let p = program(json!({
            "child": { "kind": "object", "name": "Child", "declared_in": ENTRY, "properties": [
                { "name": "ok", "type": "string" }
            ]},
            "parent": { "kind": "object", "name": "Parent", "declared_in": ENTRY, "properties": [
                { "name": "child", "type": "child" },
                { "name": "bad", "type": "any" },
                { "name": "worse", "type": "void" }
            ]}
        }));
        let (out, registry) = derive(&p, "parent");
        let errors = out.unwrap().unwrap_err();
        assert_eq!(errors.len(), 2, "{errors:?}");
        assert!(errors[0].contains("type 'Parent' property 'bad'"));
        assert!(errors[1].contains("void"));
        assert!(registry.object_types().is_empty());
    }

    #[test]
    fn colliding_module_names_are_reported() {
        let p = Program::from_value(json!({
            "entry": ENTRY,
            "files": [ENTRY, "functions/models/user.ts", "functions/models_user.ts"],
            "types": {
                "nested": { "kind": "object", "name": "User", "declared_in": "functions/models/user.ts", "properties": [
                    { "name": "id", "type": "string" }
                ]},
                "flat": { "kind": "object", "name": "User", "declared_in": "functions/models_user.ts", "properties": [
                    { "name": "age", "type": "number" }
                ]}
            }
        }))
        .unwrap();
        let mut cx = DerivationContext::new(&p, Path::new(ENTRY), DeriveOptions::default());
        let first = cx.derive_type(p.type_id("nested").unwrap(), &param_path()).unwrap().unwrap();
        assert_eq!(first.value, TypeDefinition::object("models_user_User"));
        let again = cx.derive_type(p.type_id("nested").unwrap(), &param_path()).unwrap().unwrap();
        assert_eq!(again.value, TypeDefinition::object("models_user_User"));

        let errors = cx.derive_type(p.type_id("flat").unwrap(), &param_path()).unwrap().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Type name collision"), "{}", errors[0]);
        assert!(errors[0].contains("functions/models_user.ts"), "{}", errors[0]);

        let registry = cx.into_registry();
        assert_eq!(registry.object_types().len(), 1);
        assert_eq!(registry.object_type("models_user_User").unwrap().properties[0].name, "id");
    }

    #[test]
    fn unsupported_forms_name_the_type_and_path() {
        let p = program(json!({
            "promise": { "kind": "object", "name": "Promise", "declared_in": "lib.es5.d.ts", "type_arguments": ["string"] },
            "clock": { "kind": "class", "name": "Clock", "declared_in": ENTRY }
        }));
        let (out, _) = derive(&p, "promise");
        let errors = out.unwrap().unwrap_err();
        assert_eq!(errors, vec![
            "Promise types are not supported, but one was encountered in function 'f' parameter 'x' (type: Promise<string>).".to_string()
        ]);
        let (out, _) = derive(&p, "clock");
        assert!(out.unwrap().unwrap_err()[0].starts_with("Class types are not supported"));
    }

    #[test]
    fn unbroken_array_cycles_hit_the_depth_ceiling() {
        let p = program(json!({
            "forever": { "kind": "array", "element": "forever" }
        }));
        let (out, _) = derive(&p, "forever");
        let err = out.unwrap_err();
        assert!(matches!(err, SchemaError::DepthExceeded { max_depth: 20, .. }));
        assert!(err.is_internal());
    }

    #[test]
    fn depth_ceiling_is_configurable() {
        let p = program(json!({
            "a1": { "kind": "array", "element": "string" },
            "a2": { "kind": "array", "element": "a1" },
            "a3": { "kind": "array", "element": "a2" }
        }));
        let mut cx = DerivationContext::new(&p, Path::new(ENTRY), DeriveOptions { max_depth: 2 });
        assert!(cx.derive_type(p.type_id("a2").unwrap(), &param_path()).is_ok());
        assert!(cx.derive_type(p.type_id("a3").unwrap(), &param_path()).is_err());
    }

    #[test]
    fn quirks_are_warnings_not_errors() {
        let p = program(json!({
            "empty": { "kind": "object", "name": "Empty", "declared_in": ENTRY },
            "headers": { "kind": "object", "name": "Headers", "declared_in": ENTRY, "properties": [
                { "name": "content-type", "type": "string" },
                { "name": "meta", "type": "empty" }
            ]}
        }));
        let (out, registry) = derive(&p, "headers");
        let derived = out.unwrap().unwrap();
        assert_eq!(derived.warnings, vec![
            "Property 'content-type' of type 'Headers' is not a valid schema identifier.".to_string(),
            "Object type 'Empty' has no properties.".to_string(),
        ]);
        assert!(registry.object_type("Empty").is_some());
    }
}
