use super::ScriptInstance;
use crate::collections::Dictionary;
use crate::signal::{Connection, SignalData};
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

/// Number of script-instance binding slots per object
pub const MAX_SCRIPT_INSTANCE_BINDINGS: usize = 8;

/// Runtime state every object carries independent of its class
pub(crate) struct ObjectCore {
    pub(crate) metadata: Dictionary,
    /// Outgoing signals in first-use order
    pub(crate) signals: Vec<(String, SignalData)>,
    /// Connections whose target is this object
    pub(crate) incoming: Vec<Connection>,
    pub(crate) bindings: [Option<Box<dyn Any>>; MAX_SCRIPT_INSTANCE_BINDINGS],
    pub(crate) script: Option<Rc<RefCell<dyn ScriptInstance>>>,
    pub(crate) block_signals: bool,
    pub(crate) can_translate: bool,
    pub(crate) emitting: bool,
    pub(crate) queued_for_deletion: bool,
    /// Queued `Free` requests the pump must skip
    pub(crate) withdrawn_deletions: u32,
}

impl ObjectCore {
    pub(crate) fn new() -> Self {
        Self {
            metadata: Dictionary::new(),
            signals: Vec::new(),
            incoming: Vec::new(),
            bindings: Default::default(),
            script: None,
            block_signals: false,
            can_translate: true,
            emitting: false,
            queued_for_deletion: false,
            withdrawn_deletions: 0,
        }
    }

    pub(crate) fn signal(&self, name: &str) -> Option<&SignalData> {
        self.signals
            .iter()
            .find(|(signal, _)| signal == name)
            .map(|(_, data)| data)
    }

    pub(crate) fn signal_mut(&mut self, name: &str) -> Option<&mut SignalData> {
        self.signals
            .iter_mut()
            .find(|(signal, _)| signal == name)
            .map(|(_, data)| data)
    }

    /// Signal entry, created on first use
    pub(crate) fn signal_entry(&mut self, name: &str) -> &mut SignalData {
        let index = match self.signals.iter().position(|(signal, _)| signal == name) {
            Some(index) => index,
            None => {
                self.signals.push((name.to_string(), SignalData::default()));
                self.signals.len() - 1
            }
        };
        &mut self.signals[index].1
    }

    pub(crate) fn has_user_signal(&self, name: &str) -> bool {
        self.signal(name).map_or(false, |data| data.user.is_some())
    }
}
