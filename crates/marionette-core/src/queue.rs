//! Deferred-call queue
//!
//! Requests are queued in submission order and executed by
//! [`ObjectDb::flush_deferred`]. A pump runs exactly the requests that were
//! pending when it started; anything queued while it runs waits for the next
//! pump, so a handler that re-queues itself cannot starve the caller.
//!
//! Other threads submit through a [`DeferredSender`]. Their requests sit in a
//! channel until the owning thread pumps.

use crate::error::{ObjectError, ObjectResult};
use crate::object::{ObjectDb, ObjectId};
use crate::signal::Connection;
use crate::value::Variant;
use crossbeam::channel::{self, Receiver, Sender};
use std::collections::VecDeque;
use std::fmt;
use tracing::{error, trace};

/// Callback run against the database at the next pump
pub type DeferredFn = Box<dyn FnOnce(&mut ObjectDb) + Send>;

/// One postponed request
pub enum DeferredCall {
    /// Invoke a method
    Call {
        /// Receiver
        target: ObjectId,
        /// Method name
        method: String,
        /// Arguments
        args: Vec<Variant>,
    },
    /// Assign a property
    Set {
        /// Receiver
        target: ObjectId,
        /// Property name
        property: String,
        /// New value
        value: Variant,
    },
    /// Send a notification
    Notify {
        /// Receiver
        target: ObjectId,
        /// Notification code
        what: i32,
    },
    /// Destroy an object
    Free(ObjectId),
    /// Run arbitrary code with the database
    Callback(DeferredFn),
}

impl DeferredCall {
    fn target(&self) -> Option<ObjectId> {
        match self {
            DeferredCall::Call { target, .. }
            | DeferredCall::Set { target, .. }
            | DeferredCall::Notify { target, .. } => Some(*target),
            DeferredCall::Free(target) => Some(*target),
            DeferredCall::Callback(_) => None,
        }
    }
}

impl fmt::Debug for DeferredCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeferredCall::Call {
                target,
                method,
                args,
            } => f
                .debug_struct("Call")
                .field("target", target)
                .field("method", method)
                .field("args", args)
                .finish(),
            DeferredCall::Set {
                target,
                property,
                value,
            } => f
                .debug_struct("Set")
                .field("target", target)
                .field("property", property)
                .field("value", value)
                .finish(),
            DeferredCall::Notify { target, what } => f
                .debug_struct("Notify")
                .field("target", target)
                .field("what", what)
                .finish(),
            DeferredCall::Free(target) => f.debug_tuple("Free").field(target).finish(),
            DeferredCall::Callback(_) => f.write_str("Callback"),
        }
    }
}

/// Local queue entry; closure deliveries never leave the owning thread
pub(crate) enum Pending {
    Request(DeferredCall),
    Handler {
        connection: Connection,
        args: Vec<Variant>,
    },
}

impl Pending {
    fn target(&self) -> Option<ObjectId> {
        match self {
            Pending::Request(call) => call.target(),
            Pending::Handler { connection, .. } => Some(connection.target),
        }
    }
}

/// FIFO of deferred requests owned by an [`ObjectDb`]
pub(crate) struct MessageQueue {
    pending: VecDeque<Pending>,
    max_pending: usize,
    sender: Sender<DeferredCall>,
    receiver: Receiver<DeferredCall>,
}

impl MessageQueue {
    pub(crate) fn new(max_pending: usize) -> Self {
        let (sender, receiver) = channel::unbounded();
        Self {
            pending: VecDeque::new(),
            max_pending,
            sender,
            receiver,
        }
    }

    pub(crate) fn push(&mut self, call: DeferredCall) -> ObjectResult<()> {
        self.push_pending(Pending::Request(call))
    }

    pub(crate) fn push_pending(&mut self, item: Pending) -> ObjectResult<()> {
        if self.pending.len() >= self.max_pending {
            return Err(ObjectError::QueueFull {
                capacity: self.max_pending,
            });
        }
        self.pending.push_back(item);
        Ok(())
    }

    /// Move remote submissions into the local queue, up to capacity
    pub(crate) fn collect_remote(&mut self) {
        while self.pending.len() < self.max_pending {
            match self.receiver.try_recv() {
                Ok(call) => self.pending.push_back(Pending::Request(call)),
                Err(_) => break,
            }
        }
    }

    pub(crate) fn take_batch(&mut self) -> VecDeque<Pending> {
        std::mem::take(&mut self.pending)
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len() + self.receiver.len()
    }

    pub(crate) fn sender(&self) -> DeferredSender {
        DeferredSender {
            sender: self.sender.clone(),
        }
    }
}

/// Thread-safe handle for submitting deferred requests
#[derive(Clone)]
pub struct DeferredSender {
    sender: Sender<DeferredCall>,
}

impl DeferredSender {
    /// Queue a method call
    pub fn call(&self, target: ObjectId, method: &str, args: Vec<Variant>) -> ObjectResult<()> {
        self.send(DeferredCall::Call {
            target,
            method: method.to_string(),
            args,
        })
    }

    /// Queue a property assignment
    pub fn set(&self, target: ObjectId, property: &str, value: impl Into<Variant>) -> ObjectResult<()> {
        self.send(DeferredCall::Set {
            target,
            property: property.to_string(),
            value: value.into(),
        })
    }

    /// Queue a notification
    pub fn notify(&self, target: ObjectId, what: i32) -> ObjectResult<()> {
        self.send(DeferredCall::Notify { target, what })
    }

    /// Queue any request
    pub fn send(&self, call: DeferredCall) -> ObjectResult<()> {
        self.sender
            .send(call)
            .map_err(|_| ObjectError::QueueClosed)
    }
}

impl fmt::Debug for DeferredSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredSender")
            .field("pending", &self.sender.len())
            .finish()
    }
}

impl ObjectDb {
    /// Queue a method call for the next pump
    pub fn call_deferred(
        &mut self,
        target: ObjectId,
        method: &str,
        args: Vec<Variant>,
    ) -> ObjectResult<()> {
        if !self.is_alive(target) {
            return Err(ObjectError::InvalidInstance(target));
        }
        self.queue.push(DeferredCall::Call {
            target,
            method: method.to_string(),
            args,
        })
    }

    /// Queue a property assignment for the next pump
    pub fn set_deferred(
        &mut self,
        target: ObjectId,
        property: &str,
        value: impl Into<Variant>,
    ) -> ObjectResult<()> {
        if !self.is_alive(target) {
            return Err(ObjectError::InvalidInstance(target));
        }
        self.queue.push(DeferredCall::Set {
            target,
            property: property.to_string(),
            value: value.into(),
        })
    }

    /// Queue a notification for the next pump
    pub fn notify_deferred(&mut self, target: ObjectId, what: i32) -> ObjectResult<()> {
        if !self.is_alive(target) {
            return Err(ObjectError::InvalidInstance(target));
        }
        self.queue.push(DeferredCall::Notify { target, what })
    }

    /// Queue a callback for the next pump
    pub fn call_deferred_fn(
        &mut self,
        f: impl FnOnce(&mut ObjectDb) + Send + 'static,
    ) -> ObjectResult<()> {
        self.queue.push(DeferredCall::Callback(Box::new(f)))
    }

    /// Handle for submitting requests from other threads
    pub fn deferred_sender(&self) -> DeferredSender {
        self.queue.sender()
    }

    /// Requests waiting for the next pump, remote submissions included
    pub fn pending_deferred(&self) -> usize {
        self.queue.len()
    }

    /// Run every request queued before this call, in submission order.
    ///
    /// Requests addressed to freed objects are skipped. Returns how many
    /// requests ran.
    pub fn flush_deferred(&mut self) -> usize {
        self.queue.collect_remote();
        let batch = self.queue.take_batch();
        if batch.is_empty() {
            return 0;
        }
        trace!(requests = batch.len(), "flushing deferred queue");

        let mut executed = 0;
        for item in batch {
            if let Some(target) = item.target() {
                if !self.is_alive(target) {
                    trace!(%target, "skipping deferred request for freed object");
                    continue;
                }
            }
            match item {
                Pending::Request(call) => self.run_deferred(call),
                Pending::Handler { connection, args } => {
                    self.run_queued_handler(&connection, &args)
                }
            }
            executed += 1;
        }
        executed
    }

    fn run_deferred(&mut self, call: DeferredCall) {
        match call {
            DeferredCall::Call {
                target,
                method,
                args,
            } => {
                if let Err(err) = self.call(target, &method, &args) {
                    error!(%target, method = method.as_str(), error = %err, "deferred call failed");
                }
            }
            DeferredCall::Set {
                target,
                property,
                value,
            } => {
                if !self.set(target, &property, value) {
                    error!(%target, property = property.as_str(), "deferred set found no property");
                }
            }
            DeferredCall::Notify { target, what } => {
                if let Err(err) = self.notification(target, what, false) {
                    error!(%target, what, error = %err, "deferred notification failed");
                }
            }
            DeferredCall::Free(target) => self.run_queued_free(target),
            DeferredCall::Callback(f) => f(self),
        }
    }
}
