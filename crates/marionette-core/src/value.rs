//! Dynamically-typed values
//!
//! `Variant` is the currency of the reflective API: property values, method
//! arguments, signal payloads and dictionary keys are all variants.
//!
//! # Equality and hashing
//!
//! Equality is strict and structural: `Int(1)` and `Float(1.0)` are different
//! values, containers compare by content, and `NaN` equals `NaN` so that floats
//! can be used as dictionary keys. `hash_value` is consistent with equality.

use crate::collections::{Array, Dictionary};
use crate::error::CallError;
use crate::object::ObjectId;
use rustc_hash::FxHasher;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Maximum container nesting followed when hashing, comparing, copying or
/// printing. Deeper levels (including a container that holds itself) are cut
/// off with an error log.
pub(crate) const MAX_RECURSION: usize = 64;

/// Type tag of a [`Variant`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum VariantType {
    /// No value
    #[default]
    Nil,
    /// Boolean
    Bool,
    /// 64-bit signed integer
    Int,
    /// 64-bit float
    Float,
    /// UTF-8 string
    String,
    /// Shared array
    Array,
    /// Shared dictionary
    Dictionary,
    /// Object handle
    Object,
}

impl VariantType {
    /// Human-readable type name
    pub const fn name(self) -> &'static str {
        match self {
            VariantType::Nil => "Nil",
            VariantType::Bool => "bool",
            VariantType::Int => "int",
            VariantType::Float => "float",
            VariantType::String => "String",
            VariantType::Array => "Array",
            VariantType::Dictionary => "Dictionary",
            VariantType::Object => "Object",
        }
    }
}

impl fmt::Display for VariantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Dynamically-typed value
#[derive(Debug, Clone, Default)]
pub enum Variant {
    /// No value
    #[default]
    Nil,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// String
    String(String),
    /// Shared array handle
    Array(Array),
    /// Shared dictionary handle
    Dictionary(Dictionary),
    /// Weak object handle
    Object(ObjectId),
}

impl Variant {
    /// Get the type tag
    pub fn get_type(&self) -> VariantType {
        match self {
            Variant::Nil => VariantType::Nil,
            Variant::Bool(_) => VariantType::Bool,
            Variant::Int(_) => VariantType::Int,
            Variant::Float(_) => VariantType::Float,
            Variant::String(_) => VariantType::String,
            Variant::Array(_) => VariantType::Array,
            Variant::Dictionary(_) => VariantType::Dictionary,
            Variant::Object(_) => VariantType::Object,
        }
    }

    /// Check if this value is nil
    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Variant::Nil)
    }

    /// Extract a boolean
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Variant::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Extract an integer
    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Variant::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Extract a float, widening integers
    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Variant::Float(f) => Some(*f),
            Variant::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Borrow the string payload
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variant::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the array handle (shares storage)
    pub fn as_array(&self) -> Option<Array> {
        match self {
            Variant::Array(a) => Some(a.clone()),
            _ => None,
        }
    }

    /// Get the dictionary handle (shares storage)
    pub fn as_dictionary(&self) -> Option<Dictionary> {
        match self {
            Variant::Dictionary(d) => Some(d.clone()),
            _ => None,
        }
    }

    /// Extract an object handle
    #[inline]
    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Variant::Object(id) => Some(*id),
            _ => None,
        }
    }

    /// Truthiness used when a value is coerced to a condition
    pub fn is_truthy(&self) -> bool {
        match self {
            Variant::Nil => false,
            Variant::Bool(b) => *b,
            Variant::Int(i) => *i != 0,
            Variant::Float(f) => *f != 0.0,
            Variant::String(s) => !s.is_empty(),
            Variant::Array(a) => !a.is_empty(),
            Variant::Dictionary(d) => !d.is_empty(),
            Variant::Object(id) => !id.is_null(),
        }
    }

    /// Copy this value; containers get a fresh backing store
    pub fn duplicate(&self, deep: bool) -> Variant {
        self.duplicate_recursive(deep, 0)
    }

    pub(crate) fn duplicate_recursive(&self, deep: bool, depth: usize) -> Variant {
        match self {
            Variant::Array(a) => Variant::Array(a.duplicate_recursive(deep, depth + 1)),
            Variant::Dictionary(d) => Variant::Dictionary(d.duplicate_recursive(deep, depth + 1)),
            other => other.clone(),
        }
    }

    /// Structural hash, consistent with `==`
    pub fn hash_value(&self) -> u64 {
        self.hash_recursive(0)
    }

    pub(crate) fn hash_recursive(&self, depth: usize) -> u64 {
        let mut hasher = FxHasher::default();
        match self {
            Variant::Nil => 0u8.hash(&mut hasher),
            Variant::Bool(b) => {
                1u8.hash(&mut hasher);
                b.hash(&mut hasher);
            }
            Variant::Int(i) => {
                2u8.hash(&mut hasher);
                i.hash(&mut hasher);
            }
            Variant::Float(f) => {
                3u8.hash(&mut hasher);
                canonical_bits(*f).hash(&mut hasher);
            }
            Variant::String(s) => {
                4u8.hash(&mut hasher);
                s.hash(&mut hasher);
            }
            Variant::Array(a) => {
                5u8.hash(&mut hasher);
                a.hash_recursive(depth + 1).hash(&mut hasher);
            }
            Variant::Dictionary(d) => {
                6u8.hash(&mut hasher);
                d.hash_recursive(depth + 1).hash(&mut hasher);
            }
            Variant::Object(id) => {
                7u8.hash(&mut hasher);
                id.as_u64().hash(&mut hasher);
            }
        }
        hasher.finish()
    }

    /// Total order used by `Dictionary::sort`: by type tag first, then by value.
    ///
    /// Containers of the same type compare by length only.
    pub fn sort_cmp(&self, other: &Variant) -> Ordering {
        match (self, other) {
            (Variant::Bool(a), Variant::Bool(b)) => a.cmp(b),
            (Variant::Int(a), Variant::Int(b)) => a.cmp(b),
            (Variant::Float(a), Variant::Float(b)) => a.total_cmp(b),
            (Variant::String(a), Variant::String(b)) => a.cmp(b),
            (Variant::Array(a), Variant::Array(b)) => a.len().cmp(&b.len()),
            (Variant::Dictionary(a), Variant::Dictionary(b)) => a.len().cmp(&b.len()),
            (Variant::Object(a), Variant::Object(b)) => a.cmp(b),
            _ => self.get_type().cmp(&other.get_type()),
        }
    }
}

fn canonical_bits(f: f64) -> u64 {
    if f.is_nan() {
        f64::NAN.to_bits()
    } else if f == 0.0 {
        0
    } else {
        f.to_bits()
    }
}

impl Variant {
    pub(crate) fn eq_recursive(&self, other: &Variant, depth: usize) -> bool {
        match (self, other) {
            (Variant::Array(a), Variant::Array(b)) => a.eq_recursive(b, depth + 1),
            (Variant::Dictionary(a), Variant::Dictionary(b)) => a.eq_recursive(b, depth + 1),
            _ => self.eq_scalar(other),
        }
    }

    fn eq_scalar(&self, other: &Variant) -> bool {
        match (self, other) {
            (Variant::Nil, Variant::Nil) => true,
            (Variant::Bool(a), Variant::Bool(b)) => a == b,
            (Variant::Int(a), Variant::Int(b)) => a == b,
            (Variant::Float(a), Variant::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Variant::String(a), Variant::String(b)) => a == b,
            (Variant::Object(a), Variant::Object(b)) => a == b,
            _ => false,
        }
    }

    pub(crate) fn fmt_recursive(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        match self {
            Variant::Array(a) => a.fmt_recursive(f, depth + 1),
            Variant::Dictionary(d) => d.fmt_recursive(f, depth + 1),
            other => other.fmt_scalar(f),
        }
    }

    fn fmt_scalar(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Nil => write!(f, "null"),
            Variant::Bool(b) => write!(f, "{}", b),
            Variant::Int(i) => write!(f, "{}", i),
            Variant::Float(x) => {
                if x.fract() == 0.0 && x.is_finite() {
                    write!(f, "{:.1}", x)
                } else {
                    write!(f, "{}", x)
                }
            }
            Variant::String(s) => write!(f, "{}", s),
            Variant::Object(id) => write!(f, "[Object:{}]", id.as_u64()),
            Variant::Array(_) => write!(f, "[...]"),
            Variant::Dictionary(_) => write!(f, "{{...}}"),
        }
    }
}

impl PartialEq for Variant {
    fn eq(&self, other: &Self) -> bool {
        self.eq_recursive(other, 0)
    }
}

impl Eq for Variant {}

impl Hash for Variant {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_value());
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_recursive(f, 0)
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident($conv:expr)),* $(,)?) => {
        $(
            impl From<$ty> for Variant {
                fn from(value: $ty) -> Self {
                    Variant::$variant($conv(value))
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool(|v| v),
    i64 => Int(|v| v),
    i32 => Int(i64::from),
    u32 => Int(i64::from),
    f64 => Float(|v| v),
    f32 => Float(f64::from),
    String => String(|v| v),
    &str => String(str::to_string),
    Array => Array(|v| v),
    Dictionary => Dictionary(|v| v),
    ObjectId => Object(|v| v),
}

impl From<Vec<Variant>> for Variant {
    fn from(values: Vec<Variant>) -> Self {
        Variant::Array(Array::from(values))
    }
}

impl<T: Into<Variant>> From<Option<T>> for Variant {
    fn from(value: Option<T>) -> Self {
        value.map_or(Variant::Nil, Into::into)
    }
}

/// Conversion out of a [`Variant`] for method arguments
pub trait FromVariant: Sized {
    /// Type tag reported when conversion fails
    fn variant_type() -> VariantType;

    /// Convert, returning `None` on type mismatch
    fn from_variant(value: &Variant) -> Option<Self>;
}

macro_rules! impl_from_variant {
    ($($ty:ty => $tag:ident, $extract:expr;)*) => {
        $(
            impl FromVariant for $ty {
                fn variant_type() -> VariantType {
                    VariantType::$tag
                }

                fn from_variant(value: &Variant) -> Option<Self> {
                    $extract(value)
                }
            }
        )*
    };
}

impl_from_variant! {
    bool => Bool, Variant::as_bool;
    i64 => Int, Variant::as_int;
    f64 => Float, Variant::as_float;
    String => String, |v: &Variant| v.as_str().map(str::to_string);
    Array => Array, Variant::as_array;
    Dictionary => Dictionary, Variant::as_dictionary;
    ObjectId => Object, Variant::as_object;
}

impl FromVariant for Variant {
    fn variant_type() -> VariantType {
        VariantType::Nil
    }

    fn from_variant(value: &Variant) -> Option<Self> {
        Some(value.clone())
    }
}

/// Fetch and convert the argument at `index`
pub fn arg<T: FromVariant>(args: &[Variant], index: usize) -> Result<T, CallError> {
    let value = args.get(index).ok_or(CallError::TooFewArguments {
        expected: index + 1,
        got: args.len(),
    })?;
    T::from_variant(value).ok_or(CallError::InvalidArgument {
        index,
        expected: T::variant_type(),
        got: value.get_type(),
    })
}

/// Reject calls with more than `max` arguments
pub fn check_arg_count(args: &[Variant], max: usize) -> Result<(), CallError> {
    if args.len() > max {
        return Err(CallError::TooManyArguments {
            expected: max,
            got: args.len(),
        });
    }
    Ok(())
}
