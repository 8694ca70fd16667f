//! Signals and the connection graph
//!
//! Each object owns a table of named signals; each signal owns its
//! connections in registration order. Connections reference their target by
//! [`ObjectId`], so a destroyed target is detected at emission and skipped.
//! A connection either names a method on the target or carries a closure
//! (see [`ObjectDb::connect_fn`](crate::ObjectDb::connect_fn)).

mod graph;

use crate::error::CallError;
use crate::object::{Context, ObjectId};
use crate::property::MethodInfo;
use crate::value::Variant;
use std::cell::RefCell;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::rc::Rc;

/// Delivery flags for a connection
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ConnectFlags(u32);

impl ConnectFlags {
    /// Synchronous delivery
    pub const NONE: Self = Self(0);
    /// Deliver through the deferred queue
    pub const QUEUED: Self = Self(1);
    /// Saved with the source object
    pub const PERSIST: Self = Self(2);
    /// Disconnect after the first delivery
    pub const ONE_SHOT: Self = Self(4);
    /// Count repeated connects instead of rejecting them
    pub const REFERENCE_COUNTED: Self = Self(8);

    /// Raw bits
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Rebuild from raw bits, dropping unknown ones
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & 0xF)
    }

    /// Check if every bit of `other` is set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ConnectFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ConnectFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for ConnectFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::QUEUED, "QUEUED"),
            (Self::PERSIST, "PERSIST"),
            (Self::ONE_SHOT, "ONE_SHOT"),
            (Self::REFERENCE_COUNTED, "REFERENCE_COUNTED"),
        ];
        let set: Vec<&str> = names
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        if set.is_empty() {
            write!(f, "ConnectFlags(NONE)")
        } else {
            write!(f, "ConnectFlags({})", set.join(" | "))
        }
    }
}

/// Closure body of a connection made with
/// [`ObjectDb::connect_fn`](crate::ObjectDb::connect_fn)
pub type HandlerFn = dyn FnMut(&mut Context<'_>, &[Variant]) -> Result<(), CallError>;

/// Shared handle to a connected closure.
///
/// Clones refer to the same closure; equality is identity.
#[derive(Clone)]
pub struct SignalHandler {
    id: u64,
    func: Rc<RefCell<HandlerFn>>,
}

impl SignalHandler {
    pub(crate) fn new(id: u64, func: Rc<RefCell<HandlerFn>>) -> Self {
        Self { id, func }
    }

    /// Label used as the connection's method name
    pub fn label(&self) -> String {
        format!("<fn#{}>", self.id)
    }

    pub(crate) fn func(&self) -> &Rc<RefCell<HandlerFn>> {
        &self.func
    }
}

impl PartialEq for SignalHandler {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for SignalHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SignalHandler").field(&self.id).finish()
    }
}

/// One edge of the connection graph
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    /// Emitting object
    pub source: ObjectId,
    /// Signal name on the source
    pub signal: String,
    /// Receiving object
    pub target: ObjectId,
    /// Method invoked on the target, or the closure's label
    pub method: String,
    /// Arguments placed before the emission arguments
    pub binds: Vec<Variant>,
    /// Delivery flags
    pub flags: ConnectFlags,
    /// Closure run instead of `method`
    pub handler: Option<SignalHandler>,
}

impl Connection {
    fn matches(&self, target: ObjectId, method: &str) -> bool {
        self.target == target && self.method == method
    }
}

/// Outcome of [`ObjectDb::emit_signal`](crate::ObjectDb::emit_signal)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitStatus {
    /// Signal went out; `delivered` counts invoked and enqueued connections
    Emitted {
        /// Connections that were invoked or enqueued
        delivered: usize,
    },
    /// Source has signals blocked; nothing was delivered
    Blocked,
}

#[derive(Debug, Clone)]
pub(crate) struct SignalSlot {
    pub(crate) connection: Connection,
    pub(crate) reference_count: u32,
}

/// Per-signal state held by the source object
#[derive(Debug, Default)]
pub(crate) struct SignalData {
    /// Present for signals added with `add_user_signal`
    pub(crate) user: Option<MethodInfo>,
    pub(crate) slots: Vec<SignalSlot>,
}

impl SignalData {
    pub(crate) fn position(&self, target: ObjectId, method: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.connection.matches(target, method))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_values() {
        assert_eq!(ConnectFlags::QUEUED.bits(), 1);
        assert_eq!(ConnectFlags::PERSIST.bits(), 2);
        assert_eq!(ConnectFlags::ONE_SHOT.bits(), 4);
        assert_eq!(ConnectFlags::REFERENCE_COUNTED.bits(), 8);
        let flags = ConnectFlags::QUEUED | ConnectFlags::ONE_SHOT;
        assert!(flags.contains(ConnectFlags::ONE_SHOT));
        assert!(!flags.contains(ConnectFlags::PERSIST));
        assert_eq!(format!("{:?}", flags), "ConnectFlags(QUEUED | ONE_SHOT)");
        assert_eq!(ConnectFlags::from_bits_truncate(0xFF).bits(), 0xF);
    }
}
