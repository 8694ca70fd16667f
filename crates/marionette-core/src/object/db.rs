//! Object database: ownership, identity and per-object state

use super::state::{ObjectCore, MAX_SCRIPT_INSTANCE_BINDINGS};
use super::{
    object_cast, object_cast_mut, Class, ObjectId, ScriptInstance, StaticClass, Translator,
    NOTIFICATION_POSTINITIALIZE, NOTIFICATION_PREDELETE,
};
use crate::collections::Dictionary;
use crate::config::RuntimeConfig;
use crate::error::{CallError, ObjectError, ObjectResult};
use crate::queue::{DeferredCall, MessageQueue};
use crate::types::{ClassDb, TypeInfo};
use crate::value::Variant;
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, warn};

/// Live object: the class chain plus runtime state
pub(crate) struct Entry {
    pub(crate) type_info: &'static TypeInfo,
    pub(crate) instance: Rc<RefCell<Box<dyn Class>>>,
    pub(crate) core: ObjectCore,
}

struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

/// Owner of every object and of the deferred queue.
///
/// One database is driven by one thread. Objects are addressed by
/// generation-checked [`ObjectId`]s; an id whose object was destroyed simply
/// stops resolving.
pub struct ObjectDb {
    pub(crate) classes: Arc<ClassDb>,
    slots: Vec<Slot>,
    free_indices: Vec<u32>,
    live: usize,
    pub(crate) queue: MessageQueue,
    /// Source of closure connection labels
    pub(crate) next_handler: u64,
    config: RuntimeConfig,
    translator: Option<Box<dyn Translator>>,
}

impl ObjectDb {
    /// Create a database resolving classes against `classes`
    pub fn new(classes: Arc<ClassDb>) -> Self {
        Self::with_config(classes, RuntimeConfig::default())
    }

    /// Create a database with explicit limits
    pub fn with_config(classes: Arc<ClassDb>, config: RuntimeConfig) -> Self {
        Self {
            classes,
            slots: Vec::new(),
            free_indices: Vec::new(),
            live: 0,
            queue: MessageQueue::new(config.queue.max_pending),
            next_handler: 0,
            config,
            translator: None,
        }
    }

    /// Class registry this database resolves against
    pub fn class_db(&self) -> &Arc<ClassDb> {
        &self.classes
    }

    /// Active configuration
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Number of live objects
    pub fn object_count(&self) -> usize {
        self.live
    }

    /// Ids of all live objects in slot order
    pub fn object_ids(&self) -> Vec<ObjectId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.entry.is_some())
            .map(|(index, slot)| ObjectId::new(index as u32, slot.generation))
            .collect()
    }

    pub(crate) fn entry(&self, id: ObjectId) -> Option<&Entry> {
        let slot = self.slots.get(id.index())?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.entry.as_ref()
    }

    pub(crate) fn entry_mut(&mut self, id: ObjectId) -> Option<&mut Entry> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.entry.as_mut()
    }

    pub(crate) fn core(&self, id: ObjectId) -> ObjectResult<&ObjectCore> {
        self.entry(id)
            .map(|entry| &entry.core)
            .ok_or(ObjectError::InvalidInstance(id))
    }

    pub(crate) fn core_mut(&mut self, id: ObjectId) -> ObjectResult<&mut ObjectCore> {
        self.entry_mut(id)
            .map(|entry| &mut entry.core)
            .ok_or(ObjectError::InvalidInstance(id))
    }

    // ===== Lifecycle =====

    /// Take ownership of an object of a registered class
    pub fn instantiate<T: Class + StaticClass>(&mut self, object: T) -> ObjectResult<ObjectId> {
        let info = T::static_type();
        match self.classes.type_info(info.name()) {
            Some(registered) if std::ptr::eq(registered, info) => {}
            Some(_) => return Err(ObjectError::ClassMismatch(info.name().to_string())),
            None => return Err(ObjectError::UnknownClass(info.name().to_string())),
        }
        self.insert(Box::new(object))
    }

    /// Construct a registered instantiable class by name
    pub fn instantiate_class(&mut self, class: &str) -> ObjectResult<ObjectId> {
        let object = self.classes.instantiate(class)?;
        self.insert(object)
    }

    fn insert(&mut self, object: Box<dyn Class>) -> ObjectResult<ObjectId> {
        if let Some(limit) = self.config.objects.max_objects {
            if self.live >= limit {
                warn!(limit, "object limit reached");
                return Err(ObjectError::Capacity { limit });
            }
        }

        let type_info = object.type_info();
        let entry = Entry {
            type_info,
            instance: Rc::new(RefCell::new(object)),
            core: ObjectCore::new(),
        };
        let id = match self.free_indices.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.entry = Some(entry);
                ObjectId::new(index, slot.generation)
            }
            None => {
                let index = u32::try_from(self.slots.len()).map_err(|_| ObjectError::Capacity {
                    limit: u32::MAX as usize,
                })?;
                self.slots.push(Slot {
                    generation: 1,
                    entry: Some(entry),
                });
                ObjectId::new(index, 1)
            }
        };
        self.live += 1;

        debug!(%id, class = type_info.name(), "instantiated object");
        self.notification(id, NOTIFICATION_POSTINITIALIZE, false)?;
        Ok(id)
    }

    /// Check if `id` names a live object
    pub fn is_alive(&self, id: ObjectId) -> bool {
        self.entry(id).is_some()
    }

    /// Destroy an object now.
    ///
    /// An object that is executing a method or emitting a signal cannot be
    /// destroyed under its own feet; it is queued for deletion instead. An
    /// object already queued rejects the request until the pump destroys it.
    pub fn free(&mut self, id: ObjectId) -> ObjectResult<()> {
        let entry = self.entry(id).ok_or(ObjectError::InvalidInstance(id))?;
        if entry.core.queued_for_deletion {
            return Err(ObjectError::QueuedForDeletion(id));
        }
        let in_use = entry.core.emitting || entry.instance.try_borrow_mut().is_err();
        if in_use {
            warn!(%id, "object freed while in use, deferring deletion");
            return self.queue_delete(id);
        }
        self.destroy(id);
        Ok(())
    }

    /// Destroy the object at the next pump
    pub fn queue_delete(&mut self, id: ObjectId) -> ObjectResult<()> {
        let core = self.core_mut(id)?;
        if core.queued_for_deletion {
            return Err(ObjectError::QueuedForDeletion(id));
        }
        core.queued_for_deletion = true;
        if let Err(err) = self.queue.push(DeferredCall::Free(id)) {
            if let Ok(core) = self.core_mut(id) {
                core.queued_for_deletion = false;
            }
            return Err(err);
        }
        debug!(%id, "queued object for deletion");
        Ok(())
    }

    /// Withdraw a pending [`queue_delete`](Self::queue_delete).
    ///
    /// Returns `false` when no deletion was pending. The already queued
    /// request stays in the queue and is skipped by the pump.
    pub fn cancel_delete(&mut self, id: ObjectId) -> ObjectResult<bool> {
        let core = self.core_mut(id)?;
        if !core.queued_for_deletion {
            return Ok(false);
        }
        core.queued_for_deletion = false;
        core.withdrawn_deletions += 1;
        debug!(%id, "cancelled queued deletion");
        Ok(true)
    }

    /// Check if the object awaits deferred deletion
    pub fn is_queued_for_deletion(&self, id: ObjectId) -> bool {
        self.core(id).map_or(false, |core| core.queued_for_deletion)
    }

    /// Deferred deletion request reached the pump
    pub(crate) fn run_queued_free(&mut self, id: ObjectId) {
        if let Ok(core) = self.core_mut(id) {
            if core.withdrawn_deletions > 0 {
                core.withdrawn_deletions -= 1;
                debug!(%id, "skipping withdrawn deletion");
                return;
            }
        }
        self.destroy(id);
    }

    pub(crate) fn destroy(&mut self, id: ObjectId) {
        if !self.is_alive(id) {
            return;
        }
        if let Err(err) = self.notification(id, NOTIFICATION_PREDELETE, true) {
            warn!(%id, error = %err, "predelete notification failed");
        }

        let index = id.index();
        let Some(slot) = self.slots.get_mut(index) else {
            return;
        };
        if slot.generation != id.generation() {
            return;
        }
        let Some(entry) = slot.entry.take() else {
            return;
        };
        slot.generation = slot.generation.wrapping_add(1).max(1);
        self.free_indices.push(index as u32);
        self.live -= 1;

        self.sever_connections(id, &entry.core);
        debug!(%id, class = entry.type_info.name(), "destroyed object");
    }

    /// Remove every edge touching a destroyed object from its peers
    fn sever_connections(&mut self, id: ObjectId, core: &ObjectCore) {
        for (signal, data) in &core.signals {
            for slot in &data.slots {
                let connection = &slot.connection;
                if let Some(peer) = self.entry_mut(connection.target) {
                    peer.core.incoming.retain(|incoming| {
                        !(incoming.source == id
                            && incoming.signal == *signal
                            && incoming.method == connection.method)
                    });
                }
            }
        }
        for incoming in &core.incoming {
            if let Some(peer) = self.entry_mut(incoming.source) {
                if let Some(data) = peer.core.signal_mut(&incoming.signal) {
                    data.slots.retain(|slot| {
                        !(slot.connection.target == id && slot.connection.method == incoming.method)
                    });
                }
            }
        }
    }

    // ===== Class access =====

    /// Borrow the object's class chain
    pub fn with<R>(&self, id: ObjectId, f: impl FnOnce(&dyn Class) -> R) -> ObjectResult<R> {
        let entry = self.entry(id).ok_or(ObjectError::InvalidInstance(id))?;
        let object = entry
            .instance
            .try_borrow()
            .map_err(|_| CallError::InstanceBusy(id))?;
        let result = f(&**object);
        Ok(result)
    }

    /// Mutably borrow the object's class chain
    pub fn with_mut<R>(
        &self,
        id: ObjectId,
        f: impl FnOnce(&mut dyn Class) -> R,
    ) -> ObjectResult<R> {
        let entry = self.entry(id).ok_or(ObjectError::InvalidInstance(id))?;
        let mut object = entry
            .instance
            .try_borrow_mut()
            .map_err(|_| CallError::InstanceBusy(id))?;
        let result = f(&mut **object);
        Ok(result)
    }

    /// Borrow the `T` level of the object, if it is a `T`
    pub fn with_cast<T: Class, R>(&self, id: ObjectId, f: impl FnOnce(&T) -> R) -> Option<R> {
        let entry = self.entry(id)?;
        let object = entry.instance.try_borrow().ok()?;
        let result = object_cast::<T>(&**object).map(f);
        result
    }

    /// Mutably borrow the `T` level of the object, if it is a `T`
    pub fn with_cast_mut<T: Class, R>(
        &self,
        id: ObjectId,
        f: impl FnOnce(&mut T) -> R,
    ) -> Option<R> {
        let entry = self.entry(id)?;
        let mut object = entry.instance.try_borrow_mut().ok()?;
        let result = object_cast_mut::<T>(&mut **object).map(f);
        result
    }

    /// Leaf class name
    pub fn get_class(&self, id: ObjectId) -> Option<&'static str> {
        self.entry(id).map(|entry| entry.type_info.name())
    }

    /// Leaf class descriptor
    pub fn get_type_info(&self, id: ObjectId) -> Option<&'static TypeInfo> {
        self.entry(id).map(|entry| entry.type_info)
    }

    /// Check if the object's class is `class` or inherits from it
    pub fn is_class(&self, id: ObjectId, class: &str) -> bool {
        self.entry(id)
            .map_or(false, |entry| entry.type_info.is_class(class))
    }

    /// Check if the object is a `T`
    pub fn is_instance_of<T: StaticClass>(&self, id: ObjectId) -> bool {
        self.entry(id)
            .map_or(false, |entry| entry.type_info.is_type_of(T::static_type()))
    }

    // ===== Metadata =====

    /// Set a metadata entry; `Nil` removes it
    pub fn set_meta(&self, id: ObjectId, name: &str, value: impl Into<Variant>) -> ObjectResult<()> {
        let core = self.core(id)?;
        let value = value.into();
        if value.is_nil() {
            core.metadata.erase(&Variant::from(name));
        } else {
            core.metadata.set(name, value);
        }
        Ok(())
    }

    /// Read a metadata entry
    pub fn get_meta(&self, id: ObjectId, name: &str) -> Option<Variant> {
        self.core(id).ok()?.metadata.get(&Variant::from(name))
    }

    /// Check for a metadata entry
    pub fn has_meta(&self, id: ObjectId, name: &str) -> bool {
        self.core(id)
            .map_or(false, |core| core.metadata.has(&Variant::from(name)))
    }

    /// Remove a metadata entry, returning whether it existed
    pub fn remove_meta(&self, id: ObjectId, name: &str) -> bool {
        self.core(id)
            .map_or(false, |core| core.metadata.erase(&Variant::from(name)))
    }

    /// Metadata keys in insertion order
    pub fn get_meta_list(&self, id: ObjectId) -> Vec<String> {
        self.core(id).map_or_else(
            |_| Vec::new(),
            |core| {
                core.metadata
                    .key_list()
                    .iter()
                    .map(|key| key.to_string())
                    .collect()
            },
        )
    }

    /// Shared handle to the metadata dictionary
    pub fn metadata(&self, id: ObjectId) -> Option<Dictionary> {
        self.core(id).ok().map(|core| core.metadata.clone())
    }

    pub(crate) fn replace_metadata(&mut self, id: ObjectId, metadata: Dictionary) -> bool {
        match self.core_mut(id) {
            Ok(core) => {
                core.metadata = metadata;
                true
            }
            Err(_) => false,
        }
    }

    // ===== Flags =====

    /// Suppress or restore signal emission from the object
    pub fn set_block_signals(&mut self, id: ObjectId, block: bool) -> ObjectResult<()> {
        self.core_mut(id)?.block_signals = block;
        Ok(())
    }

    /// Check if the object's signals are blocked
    pub fn is_blocking_signals(&self, id: ObjectId) -> bool {
        self.core(id).map_or(false, |core| core.block_signals)
    }

    /// Check if the object is emitting a signal further up the stack
    pub fn is_emitting(&self, id: ObjectId) -> bool {
        self.core(id).map_or(false, |core| core.emitting)
    }

    // ===== Translation =====

    /// Install the message catalogue used by [`ObjectDb::tr`]
    pub fn set_translator(&mut self, translator: Option<Box<dyn Translator>>) {
        self.translator = translator;
    }

    /// Enable or disable translation for one object
    pub fn set_message_translation(&mut self, id: ObjectId, enable: bool) -> ObjectResult<()> {
        self.core_mut(id)?.can_translate = enable;
        Ok(())
    }

    /// Check if the object translates its messages
    pub fn can_translate_messages(&self, id: ObjectId) -> bool {
        self.core(id).map_or(false, |core| core.can_translate)
    }

    /// Translate `message` for the object, falling back to the input
    pub fn tr(&self, id: ObjectId, message: &str) -> String {
        if !self.can_translate_messages(id) {
            return message.to_string();
        }
        self.translator
            .as_ref()
            .and_then(|translator| translator.translate(message))
            .unwrap_or_else(|| message.to_string())
    }

    // ===== Script =====

    /// Attach or detach a script instance; emits `script_changed`
    pub fn set_script_instance(
        &mut self,
        id: ObjectId,
        script: Option<Rc<RefCell<dyn ScriptInstance>>>,
    ) -> ObjectResult<()> {
        self.core_mut(id)?.script = script;
        self.emit_signal(id, "script_changed", &[])?;
        Ok(())
    }

    /// Attached script instance
    pub fn get_script_instance(&self, id: ObjectId) -> Option<Rc<RefCell<dyn ScriptInstance>>> {
        self.core(id).ok()?.script.clone()
    }

    /// Store language-bridge data in a binding slot
    pub fn set_script_instance_binding(
        &mut self,
        id: ObjectId,
        index: usize,
        data: Box<dyn Any>,
    ) -> ObjectResult<()> {
        if index >= MAX_SCRIPT_INSTANCE_BINDINGS {
            return Err(ObjectError::InvalidBindingIndex(index));
        }
        self.core_mut(id)?.bindings[index] = Some(data);
        Ok(())
    }

    /// Read a binding slot
    pub fn get_script_instance_binding(&self, id: ObjectId, index: usize) -> Option<&dyn Any> {
        self.core(id).ok()?.bindings.get(index)?.as_deref()
    }

    /// Check if a binding slot is occupied
    pub fn has_script_instance_binding(&self, id: ObjectId, index: usize) -> bool {
        self.get_script_instance_binding(id, index).is_some()
    }
}

impl fmt::Debug for ObjectDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectDb")
            .field("live", &self.live)
            .field("slots", &self.slots.len())
            .field("pending_deferred", &self.queue.len())
            .finish()
    }
}
