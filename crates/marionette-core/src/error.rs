//! Error types for the object runtime

use crate::object::ObjectId;
use crate::value::VariantType;
use thiserror::Error;

/// Failure of a single dynamic method invocation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallError {
    /// No method of that name on the class chain or attached script
    #[error("Invalid method '{method}' on class {class}")]
    InvalidMethod {
        /// Leaf class of the receiver
        class: String,
        /// Method looked up
        method: String,
    },

    /// Argument had the wrong type
    #[error("Invalid argument {index}: expected {expected}, got {got}")]
    InvalidArgument {
        /// Zero-based argument position
        index: usize,
        /// Type the method accepts
        expected: VariantType,
        /// Type that was passed
        got: VariantType,
    },

    /// More arguments than the method accepts
    #[error("Too many arguments: expected at most {expected}, got {got}")]
    TooManyArguments {
        /// Maximum accepted
        expected: usize,
        /// Number passed
        got: usize,
    },

    /// Fewer arguments than the method needs
    #[error("Too few arguments: expected at least {expected}, got {got}")]
    TooFewArguments {
        /// Minimum needed
        expected: usize,
        /// Number passed
        got: usize,
    },

    /// Receiver id does not name a live object
    #[error("Instance is null")]
    InstanceIsNull,

    /// Receiver is already executing a method further up the stack
    #[error("Instance {0} is busy")]
    InstanceBusy(ObjectId),

    /// Method ran and reported failure
    #[error("Call failed: {0}")]
    Failed(String),
}

/// Errors from object and connection-graph operations
#[derive(Debug, Error)]
pub enum ObjectError {
    /// Id is null, stale or out of range
    #[error("Invalid instance: {0}")]
    InvalidInstance(ObjectId),

    /// Class name not registered
    #[error("Unknown class: {0}")]
    UnknownClass(String),

    /// Registered class of that name is a different Rust type
    #[error("Class {0} is registered by a different type")]
    ClassMismatch(String),

    /// Class has no constructor registered
    #[error("Class cannot be instantiated: {0}")]
    NotInstantiable(String),

    /// `max_objects` reached
    #[error("Object limit reached ({limit})")]
    Capacity {
        /// Configured cap
        limit: usize,
    },

    /// Object already scheduled for deletion
    #[error("Object {0} is already queued for deletion")]
    QueuedForDeletion(ObjectId),

    /// Signal is neither declared by the class nor added at runtime
    #[error("Unknown signal '{signal}' on class {class}")]
    UnknownSignal {
        /// Leaf class of the source
        class: String,
        /// Signal looked up
        signal: String,
    },

    /// Target does not expose the method a connection names
    #[error("Unknown method '{method}' on class {class}")]
    UnknownMethod {
        /// Leaf class of the target
        class: String,
        /// Method looked up
        method: String,
    },

    /// Same (target, method) pair already connected
    #[error("Signal '{signal}' is already connected to '{method}'")]
    AlreadyConnected {
        /// Signal name
        signal: String,
        /// Target method
        method: String,
    },

    /// No such connection
    #[error("Signal '{signal}' is not connected to '{method}'")]
    NotConnected {
        /// Signal name
        signal: String,
        /// Target method
        method: String,
    },

    /// Deferred queue is at capacity
    #[error("Deferred queue is full ({capacity} pending)")]
    QueueFull {
        /// Configured capacity
        capacity: usize,
    },

    /// The database owning the queue was dropped
    #[error("Deferred queue is closed")]
    QueueClosed,

    /// Script binding slot out of range
    #[error("Invalid script binding index: {0}")]
    InvalidBindingIndex(usize),

    /// Dynamic call failed
    #[error(transparent)]
    Call(#[from] CallError),
}

impl From<ObjectError> for CallError {
    fn from(err: ObjectError) -> Self {
        match err {
            ObjectError::Call(inner) => inner,
            ObjectError::InvalidInstance(_) => CallError::InstanceIsNull,
            other => CallError::Failed(other.to_string()),
        }
    }
}

/// Errors raised while building a [`ClassDb`](crate::types::ClassDb)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassDbError {
    /// Class name registered twice
    #[error("Class already registered: {0}")]
    AlreadyRegistered(&'static str),

    /// Base class must be registered before its subclasses
    #[error("Base class {base} of {class} is not registered")]
    BaseNotRegistered {
        /// Class being registered
        class: &'static str,
        /// Missing base
        base: &'static str,
    },

    /// Property names a setter or getter that the class does not bind
    #[error("Property '{property}' of {class} names unknown accessor '{method}'")]
    UnknownAccessor {
        /// Class being registered
        class: &'static str,
        /// Property being registered
        property: String,
        /// Missing accessor method
        method: String,
    },

    /// Property names a change signal that the class does not declare
    #[error("Property '{property}' of {class} names unknown signal '{signal}'")]
    UnknownChangeSignal {
        /// Class being registered
        class: &'static str,
        /// Property being registered
        property: String,
        /// Missing signal
        signal: String,
    },
}

/// Result alias for object operations
pub type ObjectResult<T> = Result<T, ObjectError>;
