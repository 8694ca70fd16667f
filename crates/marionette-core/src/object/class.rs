//! Class levels and the virtual hook chain
//!
//! An object is a stack of *levels*: the most-derived struct embeds its base
//! class struct in a field, which embeds its own base, down to the root
//! [`Object`]. [`ClassLevel`] exposes that chain; [`Class`] carries the hooks
//! the reflection layer walks level by level.

use crate::property::PropertyInfo;
use crate::types::TypeInfo;
use crate::value::Variant;
use std::any::Any;

/// Upcast to `Any` for downcasting through a trait object
pub trait AsAny: Any {
    /// Borrow as `Any`
    fn as_any(&self) -> &dyn Any;

    /// Mutably borrow as `Any`
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Link from one level to the next; generated by [`declare_class!`](crate::declare_class)
pub trait ClassLevel {
    /// Descriptor of this level's class
    fn type_info(&self) -> &'static TypeInfo;

    /// Embedded base level, `None` at the root
    fn base(&self) -> Option<&(dyn Class + 'static)>;

    /// Mutable embedded base level
    fn base_mut(&mut self) -> Option<&mut (dyn Class + 'static)>;
}

/// Compile-time access to a class descriptor
pub trait StaticClass {
    /// Descriptor shared by every instance of the class
    fn static_type() -> &'static TypeInfo;
}

/// Reflection hooks for one class level.
///
/// Every hook has a no-op default. The runtime calls them level by level;
/// a hook only handles names its own level declares.
pub trait Class: ClassLevel + AsAny {
    /// Assign a dynamic property; return `true` when handled
    fn on_set(&mut self, _name: &str, _value: &Variant) -> bool {
        false
    }

    /// Read a dynamic property
    fn on_get(&self, _name: &str) -> Option<Variant> {
        None
    }

    /// Append this level's dynamic properties
    fn on_get_property_list(&self, _list: &mut Vec<PropertyInfo>) {}

    /// React to a notification
    fn on_notification(&mut self, _what: i32) {}

    /// List this level's properties before its base's
    fn property_list_reversed(&self) -> bool {
        false
    }
}

/// Root of every class chain
#[derive(Debug, Default)]
pub struct Object;

crate::declare_class!(Object);

impl Class for Object {}

/// Declare the static descriptor and level links of a class.
///
/// The root form takes only the type. Every other class names its base type
/// and the field embedding the base level:
///
/// ```
/// use marionette_core::{declare_class, Class, Object};
///
/// #[derive(Default)]
/// struct Node {
///     base: Object,
/// }
///
/// declare_class!(Node: Object => base);
/// impl Class for Node {}
/// ```
#[macro_export]
macro_rules! declare_class {
    ($name:ident) => {
        impl $crate::object::StaticClass for $name {
            fn static_type() -> &'static $crate::types::TypeInfo {
                static TYPE: $crate::types::TypeInfo =
                    $crate::types::TypeInfo::new(stringify!($name), None);
                &TYPE
            }
        }

        impl $crate::object::ClassLevel for $name {
            fn type_info(&self) -> &'static $crate::types::TypeInfo {
                <Self as $crate::object::StaticClass>::static_type()
            }

            fn base(&self) -> Option<&(dyn $crate::object::Class + 'static)> {
                None
            }

            fn base_mut(&mut self) -> Option<&mut (dyn $crate::object::Class + 'static)> {
                None
            }
        }
    };
    ($name:ident : $base:ty => $field:ident) => {
        impl $crate::object::StaticClass for $name {
            fn static_type() -> &'static $crate::types::TypeInfo {
                static TYPE: $crate::types::TypeInfo = $crate::types::TypeInfo::new(
                    stringify!($name),
                    Some(<$base as $crate::object::StaticClass>::static_type),
                );
                &TYPE
            }
        }

        impl $crate::object::ClassLevel for $name {
            fn type_info(&self) -> &'static $crate::types::TypeInfo {
                <Self as $crate::object::StaticClass>::static_type()
            }

            fn base(&self) -> Option<&(dyn $crate::object::Class + 'static)> {
                Some(&self.$field)
            }

            fn base_mut(&mut self) -> Option<&mut (dyn $crate::object::Class + 'static)> {
                Some(&mut self.$field)
            }
        }
    };
}

/// Downcast to the level of class `T`, if the object is a `T`
pub fn object_cast<T: Class>(object: &dyn Class) -> Option<&T> {
    let mut level = Some(object);
    while let Some(current) = level {
        if let Some(found) = current.as_any().downcast_ref::<T>() {
            return Some(found);
        }
        level = current.base();
    }
    None
}

/// Mutable form of [`object_cast`]
pub fn object_cast_mut<T: Class>(object: &mut dyn Class) -> Option<&mut T> {
    // Deref first so the call dispatches on the level, not on the reference
    if (*object).as_any().is::<T>() {
        return (*object).as_any_mut().downcast_mut::<T>();
    }
    object.base_mut().and_then(object_cast_mut::<T>)
}

/// Check whether the object's runtime class is `T` or derives from it
pub fn is_instance_of<T: Class + StaticClass>(object: &dyn Class) -> bool {
    object.type_info().is_type_of(T::static_type())
}
