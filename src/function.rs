use tracing::{debug, warn};

use crate::checker::{FunctionDeclaration, TypeChecker};
use crate::derive::DerivationContext;
use crate::error::SchemaError;
use crate::ir::{ArgumentDefinition, FunctionDefinition, FunctionKind};
use crate::type_path::{TypePath, TypePathSegment};

/// Documentation tag marking a function free of side effects.
pub const PURE_TAG: &str = "pure";

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedFunction {
    pub name: String,
    /// `None` when any parameter or the return type could not be derived.
    pub definition: Option<FunctionDefinition>,
    /// Fatal errors for an unusable function, warnings otherwise.
    pub issues: Vec<String>,
}

impl DerivedFunction {
    pub fn is_usable(&self) -> bool {
        self.definition.is_some()
    }
}

pub fn derive_function<C: TypeChecker + ?Sized>(
    cx: &mut DerivationContext<'_, C>,
    declaration: &FunctionDeclaration,
) -> Result<DerivedFunction, SchemaError> {
    let name = declaration.name.clone();
    let kind = if declaration.tags.iter().any(|t| t.name == PURE_TAG) {
        FunctionKind::Query
    } else {
        FunctionKind::Mutation
    };

    let mut issues = Vec::new();
    let mut broken = false;
    let mut arguments = Vec::with_capacity(declaration.parameters.len());

    for parameter in &declaration.parameters {
        let path = TypePath::root(TypePathSegment::FunctionParameter {
            function_name: name.clone(),
            parameter_name: parameter.name.clone(),
        });
        match cx.derive_type(parameter.ty, &path)? {
            Ok(derived) => {
                issues.extend(derived.warnings);
                arguments.push(ArgumentDefinition {
                    name: parameter.name.clone(),
                    description: description(parameter.documentation.as_deref()),
                    ty: derived.value,
                });
            }
            Err(errors) => {
                issues.extend(errors);
                broken = true;
            }
        }
    }

    let path = TypePath::root(TypePathSegment::FunctionReturn { function_name: name.clone() });
    let result_type = match cx.derive_type(declaration.return_type, &path)? {
        Ok(derived) => {
            issues.extend(derived.warnings);
            Some(derived.value)
        }
        Err(errors) => {
            issues.extend(errors);
            None
        }
    };

    let definition = match result_type {
        Some(result_type) if !broken => Some(FunctionDefinition {
            description: description(declaration.documentation.as_deref()),
            kind,
            arguments,
            result_type,
        }),
        _ => None,
    };

    let derived = DerivedFunction { name, definition, issues };
    if derived.is_usable() {
        debug!(function = %derived.name, ?kind, warnings = derived.issues.len(), "derived function");
    } else {
        warn!(function = %derived.name, issues = derived.issues.len(), "function cannot be exposed");
    }
    Ok(derived)
}

fn description(documentation: Option<&str>) -> Option<String> {
    documentation
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}
