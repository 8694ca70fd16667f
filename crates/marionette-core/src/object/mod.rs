//! Object model
//!
//! - [`Class`] and [`declare_class!`](crate::declare_class): class levels and
//!   their reflection hooks
//! - [`ObjectDb`]: ownership, identity, metadata and flags
//! - dynamic `set`/`get`/`call` dispatch (see `reflect`)
//! - [`ScriptInstance`] and [`Translator`]: optional per-object extensions

mod builtin;
mod class;
mod context;
mod db;
mod id;
mod reflect;
mod script;
mod state;

pub use class::{
    is_instance_of, object_cast, object_cast_mut, AsAny, Class, ClassLevel, Object, StaticClass,
};
pub use context::Context;
pub use db::ObjectDb;
pub use id::ObjectId;
pub use reflect::{META_PREFIX, META_PROPERTY};
pub use script::{ScriptInstance, Translator};
pub use state::MAX_SCRIPT_INSTANCE_BINDINGS;

/// Sent once right after an object is inserted into its database
pub const NOTIFICATION_POSTINITIALIZE: i32 = 0;

/// Sent most-derived first right before an object is destroyed
pub const NOTIFICATION_PREDELETE: i32 = 1;
