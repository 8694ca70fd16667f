//! Runtime type information
//!
//! [`TypeInfo`] is the static per-class descriptor; [`ClassDb`] holds what
//! each class registers for reflection.

mod registry;
mod type_info;

pub use registry::{
    Bind, ClassBuilder, ClassData, ClassDb, ClassDbBuilder, Constructor, MethodBind, MethodFn,
    PropertyBinding,
};
pub use type_info::{Ancestors, BaseFn, TypeInfo};
