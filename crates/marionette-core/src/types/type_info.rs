//! Static class descriptors

use std::fmt;
use std::ptr;

/// Accessor for a base class descriptor.
///
/// A function pointer rather than a reference so descriptors can be built in
/// `static` items that name each other.
pub type BaseFn = fn() -> &'static TypeInfo;

/// Per-class runtime type descriptor.
///
/// Exactly one lives in a `static` for each class (see
/// [`declare_class!`](crate::declare_class)); identity is pointer identity.
pub struct TypeInfo {
    name: &'static str,
    base: Option<BaseFn>,
}

impl TypeInfo {
    /// Create a descriptor; `base` is `None` only for the root class
    pub const fn new(name: &'static str, base: Option<BaseFn>) -> Self {
        Self { name, base }
    }

    /// Class name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Parent descriptor
    pub fn base(&self) -> Option<&'static TypeInfo> {
        self.base.map(|base| base())
    }

    /// Walk from this class to the root, inclusive
    pub fn ancestors(&'static self) -> Ancestors {
        Ancestors { next: Some(self) }
    }

    /// Check if `other` is this class or one of its ancestors
    pub fn is_type_of(&'static self, other: &TypeInfo) -> bool {
        self.ancestors().any(|info| ptr::eq(info, other))
    }

    /// Check by name if this class is `name` or inherits from it
    pub fn is_class(&'static self, name: &str) -> bool {
        self.ancestors().any(|info| info.name == name)
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("name", &self.name)
            .field("base", &self.base().map(TypeInfo::name))
            .finish()
    }
}

/// Iterator over a descriptor chain, most-derived first
pub struct Ancestors {
    next: Option<&'static TypeInfo>,
}

impl Iterator for Ancestors {
    type Item = &'static TypeInfo;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.base();
        Some(current)
    }
}
