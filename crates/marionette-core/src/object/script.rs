//! Script bridge and translation hooks

use super::Context;
use crate::error::CallError;
use crate::property::PropertyInfo;
use crate::value::Variant;
use std::collections::HashMap;
use std::hash::BuildHasher;

/// Dynamic behaviour attached to an object after construction.
///
/// A script instance sees property and method requests before the class
/// chain does. It is shared, not owned: several objects may reference the
/// same instance.
pub trait ScriptInstance {
    /// Assign a script property; return `true` when handled
    fn set(&mut self, _name: &str, _value: &Variant) -> bool {
        false
    }

    /// Read a script property
    fn get(&self, _name: &str) -> Option<Variant> {
        None
    }

    /// Append script-declared properties
    fn get_property_list(&self, _list: &mut Vec<PropertyInfo>) {}

    /// Check if the script implements `method`
    fn has_method(&self, _method: &str) -> bool {
        false
    }

    /// Invoke a script method. Only called when `has_method` is true.
    fn call(
        &mut self,
        ctx: &mut Context<'_>,
        method: &str,
        args: &[Variant],
    ) -> Result<Variant, CallError>;

    /// React to a notification sent to the owning object
    fn notification(&mut self, _what: i32) {}
}

/// Message catalogue used by [`ObjectDb::tr`](super::ObjectDb::tr)
pub trait Translator {
    /// Translated form of `message`, if the catalogue has one
    fn translate(&self, message: &str) -> Option<String>;
}

impl<S: BuildHasher> Translator for HashMap<String, String, S> {
    fn translate(&self, message: &str) -> Option<String> {
        self.get(message).cloned()
    }
}
