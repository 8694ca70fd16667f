//! Marionette Core Runtime
//!
//! This crate provides a reflective object runtime including:
//! - Static class descriptors and a class database (`types`)
//! - Dynamic property access through per-class hooks (`object`)
//! - Shared dictionaries and arrays of dynamically-typed values
//! - Signals with a connection graph (`signal`)
//! - A deferred-call queue pumped by the owning thread (`queue`)

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod collections;
pub mod config;
pub mod error;
pub mod object;
pub mod property;
pub mod queue;
pub mod signal;
pub mod types;
pub mod value;

pub use collections::{Array, Dictionary};
pub use config::{ConfigError, RuntimeConfig};
pub use error::{CallError, ClassDbError, ObjectError, ObjectResult};
pub use object::{
    object_cast, object_cast_mut, Class, ClassLevel, Context, Object, ObjectDb, ObjectId,
    ScriptInstance, StaticClass, Translator, NOTIFICATION_POSTINITIALIZE, NOTIFICATION_PREDELETE,
};
pub use property::{MethodInfo, PropertyHint, PropertyInfo, PropertyUsage};
pub use queue::{DeferredCall, DeferredSender};
pub use signal::{ConnectFlags, Connection, EmitStatus, HandlerFn, SignalHandler};
pub use types::{Bind, ClassBuilder, ClassDb, ClassDbBuilder, PropertyBinding, TypeInfo};
pub use value::{arg, check_arg_count, FromVariant, Variant, VariantType};
