//! Property and method descriptors for reflection

use crate::value::VariantType;
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Editing hint attached to a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PropertyHint {
    /// No hint
    #[default]
    None,
    /// Numeric range, hint string `"min,max[,step]"`
    Range,
    /// Enumerated values, hint string `"A,B,C"`
    Enum,
    /// Bit flags, hint string `"A,B,C"`
    Flags,
    /// Multi-line text
    MultilineText,
    /// Placeholder text shown when empty
    PlaceholderText,
    /// Object of the class named in the hint string
    ObjectType,
}

/// Bit set describing where a property is used
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PropertyUsage(u32);

impl PropertyUsage {
    /// No usage bits
    pub const NONE: Self = Self(0);
    /// Saved and restored
    pub const STORAGE: Self = Self(1);
    /// Shown in an inspector
    pub const EDITOR: Self = Self(2);
    /// Replicated
    pub const NETWORK: Self = Self(4);
    /// Value is translatable text
    pub const INTERNATIONALIZED: Self = Self(64);
    /// Group header entry
    pub const GROUP: Self = Self(128);
    /// Class category entry
    pub const CATEGORY: Self = Self(256);
    /// Declared by a script
    pub const SCRIPT_VARIABLE: Self = Self(8192);
    /// Storage, editor and network
    pub const DEFAULT: Self = Self(7);
    /// Storage and network
    pub const NO_EDITOR: Self = Self(5);

    /// Raw bits
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Check if every bit of `other` is set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for PropertyUsage {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for PropertyUsage {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for PropertyUsage {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Debug for PropertyUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyUsage({:#x})", self.0)
    }
}

/// Describes one reflected property
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyInfo {
    /// Property name
    pub name: String,
    /// Declared type
    pub ty: VariantType,
    /// Editing hint
    pub hint: PropertyHint,
    /// Hint payload
    pub hint_string: String,
    /// Usage flags
    pub usage: PropertyUsage,
}

impl PropertyInfo {
    /// Create a property with default usage and no hint
    pub fn new(name: impl Into<String>, ty: VariantType) -> Self {
        Self {
            name: name.into(),
            ty,
            hint: PropertyHint::None,
            hint_string: String::new(),
            usage: PropertyUsage::DEFAULT,
        }
    }

    /// Category entry introducing a class's properties
    pub fn category(class: &str) -> Self {
        Self {
            name: class.to_string(),
            ty: VariantType::Nil,
            hint: PropertyHint::None,
            hint_string: String::new(),
            usage: PropertyUsage::CATEGORY,
        }
    }

    /// Set the hint and hint string
    pub fn with_hint(mut self, hint: PropertyHint, hint_string: impl Into<String>) -> Self {
        self.hint = hint;
        self.hint_string = hint_string.into();
        self
    }

    /// Replace the usage flags
    pub fn with_usage(mut self, usage: PropertyUsage) -> Self {
        self.usage = usage;
        self
    }

    /// Check if this entry is a category header
    pub fn is_category(&self) -> bool {
        self.usage.contains(PropertyUsage::CATEGORY)
    }
}

/// Describes a method or a signal
#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    /// Method or signal name
    pub name: String,
    /// Declared arguments
    pub arguments: Vec<PropertyInfo>,
    /// Declared return type; `Nil` for none
    pub return_type: VariantType,
}

impl MethodInfo {
    /// Create a descriptor without arguments
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
            return_type: VariantType::Nil,
        }
    }

    /// Append an argument
    pub fn with_arg(mut self, name: impl Into<String>, ty: VariantType) -> Self {
        self.arguments.push(PropertyInfo::new(name, ty));
        self
    }

    /// Set the return type
    pub fn returning(mut self, ty: VariantType) -> Self {
        self.return_type = ty;
        self
    }
}

impl From<&str> for MethodInfo {
    fn from(name: &str) -> Self {
        MethodInfo::new(name)
    }
}

impl fmt::Display for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.arguments.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", arg.name, arg.ty)?;
        }
        write!(f, ")")?;
        if self.return_type != VariantType::Nil {
            write!(f, " -> {}", self.return_type)?;
        }
        Ok(())
    }
}
