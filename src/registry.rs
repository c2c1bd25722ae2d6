//! Pass-scoped registry of named object and scalar types.
//!
//! An object type under derivation is provisionally owned by the call that
//! reserved it: that call either commits the final definition or rolls the
//! registry back to the mark it took, which also drops every object type
//! registered beneath the failed one.

use std::collections::BTreeSet;
use indexmap::IndexMap;
use tracing::debug;

use crate::ir::{ObjectTypeDefinition, ScalarTypeName};
use crate::qualify::TypeOrigin;

#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    object_types: IndexMap<String, ObjectTypeDefinition>,
    /// Parallel to `object_types`, index for index.
    origins: Vec<TypeOrigin>,
    scalar_types: BTreeSet<ScalarTypeName>,
}

/// Registry position taken before reserving a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryMark(usize);

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The type that claimed `name`.
    pub fn origin(&self, name: &str) -> Option<&TypeOrigin> {
        self.object_types.get_index_of(name).and_then(|i| self.origins.get(i))
    }

    pub fn register_scalar(&mut self, scalar: ScalarTypeName) {
        self.scalar_types.insert(scalar);
    }

    /// Insert an empty placeholder for `name` so self-references resolve to it.
    pub fn reserve(&mut self, name: &str, origin: TypeOrigin) -> RegistryMark {
        let mark = RegistryMark(self.object_types.len());
        self.object_types.insert(name.to_string(), ObjectTypeDefinition::default());
        self.origins.push(origin);
        debug!(name, "reserved object type placeholder");
        mark
    }

    /// Replace a reserved placeholder with its final definition. Keeps its position.
    pub fn commit(&mut self, name: &str, definition: ObjectTypeDefinition) {
        self.object_types.insert(name.to_string(), definition);
    }

    /// Drop everything registered at or after `mark`.
    pub fn rollback(&mut self, mark: RegistryMark) {
        let evicted: Vec<&String> = self.object_types.keys().skip(mark.0).collect();
        debug!(?evicted, "rolling back object types");
        self.object_types.truncate(mark.0);
        self.origins.truncate(mark.0);
    }

    pub fn into_parts(self) -> (IndexMap<String, ObjectTypeDefinition>, BTreeSet<ScalarTypeName>) {
        (self.object_types, self.scalar_types)
    }
}

#[cfg(test)]
impl TypeRegistry {
    pub(crate) fn object_type(&self, name: &str) -> Option<&ObjectTypeDefinition> {
        self.object_types.get(name)
    }

    pub(crate) fn object_types(&self) -> &IndexMap<String, ObjectTypeDefinition> {
        &self.object_types
    }

    pub(crate) fn scalar_types(&self) -> &BTreeSet<ScalarTypeName> {
        &self.scalar_types
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ObjectPropertyDefinition, TypeDefinition};
    use std::path::PathBuf;

    fn origin(display: &str) -> TypeOrigin {
        TypeOrigin { declared_in: PathBuf::from("index.ts"), display: display.to_string() }
    }

    fn def(prop: &str) -> ObjectTypeDefinition {
        ObjectTypeDefinition {
            properties: vec![ObjectPropertyDefinition {
                name: prop.to_string(),
                ty: TypeDefinition::scalar(ScalarTypeName::String),
            }],
        }
    }

    #[test]
    fn commit_replaces_placeholder_in_place() {
        let mut r = TypeRegistry::new();
        r.reserve("A", origin("A"));
        r.reserve("B", origin("B"));
        r.commit("A", def("x"));
        let names: Vec<&String> = r.object_types().keys().collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(r.object_type("A").unwrap().properties.len(), 1);
    }

    #[test]
    fn rollback_evicts_placeholder_and_descendants() {
        let mut r = TypeRegistry::new();
        r.reserve("Keep", origin("Keep"));
        r.commit("Keep", def("k"));
        let mark = r.reserve("Broken", origin("Broken"));
        r.reserve("Child", origin("Child"));
        r.commit("Child", def("c"));
        r.rollback(mark);
        assert!(r.object_type("Keep").is_some());
        assert!(r.object_type("Broken").is_none());
        assert!(r.object_type("Child").is_none());
        assert_eq!(r.origin("Keep"), Some(&origin("Keep")));
        assert_eq!(r.origin("Child"), None);
        r.reserve("Child", origin("Other"));
        assert_eq!(r.origin("Child"), Some(&origin("Other")));
    }

    #[test]
    fn scalars_are_a_set() {
        let mut r = TypeRegistry::new();
        r.register_scalar(ScalarTypeName::String);
        r.register_scalar(ScalarTypeName::String);
        r.register_scalar(ScalarTypeName::Boolean);
        assert_eq!(r.scalar_types().len(), 2);
    }
}
