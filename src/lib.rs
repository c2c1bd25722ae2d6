//! Derive a portable API schema from the exported functions of a program.
//!
//! The pipeline: [`schema::derive_schema`] walks every exported function of an
//! entry file, [`function::derive_function`] derives its parameters and result,
//! and [`derive::DerivationContext`] turns each checker type into a
//! [`ir::TypeDefinition`], registering the named object and scalar types it meets.
//!
//! Source parsing and type-checking are outside this crate; they come in
//! through the [`checker::TypeChecker`] trait. [`program::Program`] implements
//! it over a JSON program manifest.
pub mod checker;
pub mod classify;
pub mod derive;
pub mod error;
pub mod function;
pub mod ir;
pub mod path_de;
pub mod program;
pub mod qualify;
pub mod registry;
pub mod report;
pub mod schema;
pub mod type_path;

pub use checker::{TypeChecker, TypeId};
pub use derive::{DeriveOptions, DEFAULT_MAX_DEPTH};
pub use error::SchemaError;
pub use ir::{FunctionsSchema, TypeDefinition};
pub use program::Program;
pub use schema::{derive_schema, SchemaDerivation};
