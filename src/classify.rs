//! Type shape classification.
//!
//! Several shapes overlap (a generic interface can also be an array, a union
//! can also be object-like), so classification is an ordered list of
//! matchers and the first hit wins:
//!
//! 1. unsupported forms: async wrapper, class instance, void
//! 2. array
//! 3. scalar
//! 4. nullable union
//! 5. object
//!
//! Anything else is [`TypeShape::Unsupported`].

use crate::checker::{Intrinsic, TypeChecker, TypeId};
use crate::ir::{NullOrUndefinability, ScalarTypeName};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeShape {
    AsyncWrapper,
    ClassInstance,
    Void,
    Array { element: TypeId },
    Scalar(ScalarTypeName),
    Nullable { underlying: TypeId, acceptance: NullOrUndefinability },
    Object,
    Unsupported,
}

pub fn classify<C: TypeChecker + ?Sized>(checker: &C, ty: TypeId) -> TypeShape {
    as_async_wrapper(checker, ty)
        .or_else(|| as_class_instance(checker, ty))
        .or_else(|| as_void(checker, ty))
        .or_else(|| as_array(checker, ty))
        .or_else(|| as_scalar(checker, ty))
        .or_else(|| as_nullable_union(checker, ty))
        .or_else(|| as_object(checker, ty))
        .unwrap_or(TypeShape::Unsupported)
}

// ------------------------------- Unsupported ------------------------------ //

fn as_async_wrapper<C: TypeChecker + ?Sized>(checker: &C, ty: TypeId) -> Option<TypeShape> {
    let symbol = checker.symbol(ty)?;
    (symbol.name == "Promise" && checker.type_arguments(ty).len() == 1)
        .then_some(TypeShape::AsyncWrapper)
}

fn as_class_instance<C: TypeChecker + ?Sized>(checker: &C, ty: TypeId) -> Option<TypeShape> {
    checker.is_class_instance(ty).then_some(TypeShape::ClassInstance)
}

fn as_void<C: TypeChecker + ?Sized>(checker: &C, ty: TypeId) -> Option<TypeShape> {
    (checker.intrinsic(ty) == Some(Intrinsic::Void)).then_some(TypeShape::Void)
}

// ------------------------------- Supported -------------------------------- //

fn as_array<C: TypeChecker + ?Sized>(checker: &C, ty: TypeId) -> Option<TypeShape> {
    if !checker.is_array(ty) {
        return None;
    }
    match checker.type_arguments(ty).as_slice() {
        [element] => Some(TypeShape::Array { element: *element }),
        _ => None,
    }
}

fn as_scalar<C: TypeChecker + ?Sized>(checker: &C, ty: TypeId) -> Option<TypeShape> {
    let scalar = match checker.intrinsic(ty)? {
        Intrinsic::Boolean => ScalarTypeName::Boolean,
        Intrinsic::String => ScalarTypeName::String,
        Intrinsic::Number => ScalarTypeName::Float,
        _ => return None,
    };
    Some(TypeShape::Scalar(scalar))
}

/// `T | null`, `T | undefined`, `T | null | undefined` with exactly one `T`.
fn as_nullable_union<C: TypeChecker + ?Sized>(checker: &C, ty: TypeId) -> Option<TypeShape> {
    let members = checker.union_members(ty)?;
    let mut saw_null = false;
    let mut saw_undefined = false;
    let mut rest = Vec::with_capacity(members.len());
    for member in members {
        match checker.intrinsic(member) {
            Some(Intrinsic::Null) => saw_null = true,
            Some(Intrinsic::Undefined | Intrinsic::Void) => saw_undefined = true,
            _ => rest.push(member),
        }
    }
    let acceptance = NullOrUndefinability::from_flags(saw_null, saw_undefined)?;
    match rest.as_slice() {
        [underlying] => Some(TypeShape::Nullable { underlying: *underlying, acceptance }),
        _ => None,
    }
}

fn as_object<C: TypeChecker + ?Sized>(checker: &C, ty: TypeId) -> Option<TypeShape> {
    checker.is_object(ty).then_some(TypeShape::Object)
}
