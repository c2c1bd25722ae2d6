//! Traversal paths from a function signature down to the type being derived.
//!
//! Used for diagnostics and for naming anonymous object types.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypePathSegment {
    FunctionParameter { function_name: String, parameter_name: String },
    FunctionReturn { function_name: String },
    ObjectProperty { type_name: String, property_name: String },
    Array,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypePath(Vec<TypePathSegment>);

impl TypePath {
    pub fn root(segment: TypePathSegment) -> Self {
        Self(vec![segment])
    }

    /// A new path with `segment` appended; `self` is left as-is.
    pub fn child(&self, segment: TypePathSegment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }

    /// Synthesized name for types that carry no declared name,
    /// e.g. `getUser_arguments_filter_field_range`.
    pub fn to_type_name(&self) -> String {
        self.0.iter().map(TypePathSegment::name_fragment).collect::<Vec<_>>().join("_")
    }
}

impl TypePathSegment {
    fn name_fragment(&self) -> String {
        match self {
            TypePathSegment::FunctionParameter { function_name, parameter_name } => {
                format!("{function_name}_arguments_{parameter_name}")
            }
            TypePathSegment::FunctionReturn { function_name } => format!("{function_name}_output"),
            TypePathSegment::ObjectProperty { property_name, .. } => format!("field_{property_name}"),
            TypePathSegment::Array => "array".to_string(),
        }
    }
}

impl fmt::Display for TypePathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypePathSegment::FunctionParameter { function_name, parameter_name } => {
                write!(f, "function '{function_name}' parameter '{parameter_name}'")
            }
            TypePathSegment::FunctionReturn { function_name } => {
                write!(f, "function '{function_name}' return value")
            }
            TypePathSegment::ObjectProperty { type_name, property_name } => {
                write!(f, "type '{type_name}' property '{property_name}'")
            }
            TypePathSegment::Array => write!(f, "array type"),
        }
    }
}

impl fmt::Display for TypePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 { f.write_str(", ")?; }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}
