//! Shared container types held by variants

mod array;
mod dictionary;

pub use array::Array;
pub use dictionary::Dictionary;
