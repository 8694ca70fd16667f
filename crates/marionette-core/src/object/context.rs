use super::{ObjectDb, ObjectId};
use crate::error::ObjectResult;
use crate::signal::EmitStatus;
use crate::value::Variant;
use std::ops::{Deref, DerefMut};

/// Handle passed to method binds while a call is in progress.
///
/// Dereferences to the owning [`ObjectDb`], so a method can reach any other
/// object. The receiver itself is borrowed for the duration of the call; a
/// synchronous call back into it fails with
/// [`CallError::InstanceBusy`](crate::CallError::InstanceBusy).
pub struct Context<'a> {
    db: &'a mut ObjectDb,
    this: ObjectId,
}

impl<'a> Context<'a> {
    pub(crate) fn new(db: &'a mut ObjectDb, this: ObjectId) -> Self {
        Self { db, this }
    }

    /// Id of the receiver
    pub fn this(&self) -> ObjectId {
        self.this
    }

    /// Emit a signal from the receiver
    pub fn emit(&mut self, signal: &str, args: &[Variant]) -> ObjectResult<EmitStatus> {
        let this = self.this;
        self.db.emit_signal(this, signal, args)
    }
}

impl Deref for Context<'_> {
    type Target = ObjectDb;

    fn deref(&self) -> &ObjectDb {
        self.db
    }
}

impl DerefMut for Context<'_> {
    fn deref_mut(&mut self) -> &mut ObjectDb {
        self.db
    }
}
