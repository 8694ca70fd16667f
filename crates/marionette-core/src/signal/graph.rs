use super::{ConnectFlags, Connection, EmitStatus, HandlerFn, SignalHandler, SignalSlot};
use crate::error::{CallError, ObjectError, ObjectResult};
use crate::object::{Context, ObjectDb, ObjectId};
use crate::property::MethodInfo;
use crate::queue::{DeferredCall, Pending};
use crate::value::Variant;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, error, trace, warn};

impl ObjectDb {
    /// Declare a signal on one object at runtime.
    ///
    /// Returns `false` without changes when the class or the object already
    /// declares a signal of that name.
    pub fn add_user_signal(&mut self, id: ObjectId, info: MethodInfo) -> bool {
        let Some(entry) = self.entry(id) else {
            return false;
        };
        let class = entry.type_info.name();
        if self.classes.has_signal(class, &info.name) || entry.core.has_user_signal(&info.name) {
            warn!(%id, signal = info.name.as_str(), "signal already exists");
            return false;
        }
        let Some(entry) = self.entry_mut(id) else {
            return false;
        };
        let name = info.name.clone();
        entry.core.signal_entry(&name).user = Some(info);
        debug!(%id, signal = name.as_str(), "added user signal");
        true
    }

    /// Check for a signal added with [`ObjectDb::add_user_signal`]
    pub fn has_user_signal(&self, id: ObjectId, signal: &str) -> bool {
        self.entry(id)
            .map_or(false, |entry| entry.core.has_user_signal(signal))
    }

    /// Check if the object's class or the object itself declares `signal`
    pub fn has_signal(&self, id: ObjectId, signal: &str) -> bool {
        self.entry(id).map_or(false, |entry| {
            entry.core.has_user_signal(signal)
                || self.classes.has_signal(entry.type_info.name(), signal)
        })
    }

    /// Class signals followed by user signals
    pub fn get_signal_list(&self, id: ObjectId) -> Vec<MethodInfo> {
        let Some(entry) = self.entry(id) else {
            return Vec::new();
        };
        let mut list = self.classes.get_signal_list(entry.type_info.name(), true);
        list.extend(
            entry
                .core
                .signals
                .iter()
                .filter_map(|(_, data)| data.user.clone()),
        );
        list
    }

    fn unknown_signal(&self, id: ObjectId, signal: &str) -> ObjectError {
        ObjectError::UnknownSignal {
            class: self.get_class(id).unwrap_or("<freed>").to_string(),
            signal: signal.to_string(),
        }
    }

    /// Connect `signal` on `source` to `method` on `target`.
    ///
    /// A repeated (target, method) pair is rejected unless the connection is
    /// reference-counted, in which case its count goes up.
    pub fn connect(
        &mut self,
        source: ObjectId,
        signal: &str,
        target: ObjectId,
        method: &str,
        binds: Vec<Variant>,
        flags: ConnectFlags,
    ) -> ObjectResult<()> {
        if !self.is_alive(source) {
            return Err(ObjectError::InvalidInstance(source));
        }
        if !self.is_alive(target) {
            return Err(ObjectError::InvalidInstance(target));
        }
        if !self.has_signal(source, signal) {
            return Err(self.unknown_signal(source, signal));
        }
        if !self.has_method(target, method) {
            return Err(ObjectError::UnknownMethod {
                class: self.get_class(target).unwrap_or_default().to_string(),
                method: method.to_string(),
            });
        }

        self.add_connection(Connection {
            source,
            signal: signal.to_string(),
            target,
            method: method.to_string(),
            binds,
            flags,
            handler: None,
        })
    }

    /// Connect `signal` on `source` to a closure run on behalf of `target`.
    ///
    /// The closure gets a [`Context`] for `target` and the emission
    /// arguments. The connection lives and dies with `target` like a method
    /// connection; its method name is the returned handler's label.
    pub fn connect_fn<F>(
        &mut self,
        source: ObjectId,
        signal: &str,
        target: ObjectId,
        flags: ConnectFlags,
        f: F,
    ) -> ObjectResult<SignalHandler>
    where
        F: FnMut(&mut Context<'_>, &[Variant]) -> Result<(), CallError> + 'static,
    {
        if !self.is_alive(source) {
            return Err(ObjectError::InvalidInstance(source));
        }
        if !self.is_alive(target) {
            return Err(ObjectError::InvalidInstance(target));
        }
        if !self.has_signal(source, signal) {
            return Err(self.unknown_signal(source, signal));
        }

        self.next_handler += 1;
        let func: Rc<RefCell<HandlerFn>> = Rc::new(RefCell::new(f));
        let handler = SignalHandler::new(self.next_handler, func);
        self.add_connection(Connection {
            source,
            signal: signal.to_string(),
            target,
            method: handler.label(),
            binds: Vec::new(),
            flags,
            handler: Some(handler.clone()),
        })?;
        Ok(handler)
    }

    fn add_connection(&mut self, connection: Connection) -> ObjectResult<()> {
        let Connection {
            source,
            target,
            flags,
            ..
        } = connection;
        let signal = connection.signal.as_str();
        let method = connection.method.as_str();

        let core = self.core_mut(source)?;
        let data = core.signal_entry(signal);
        if let Some(index) = data.position(target, method) {
            if flags.contains(ConnectFlags::REFERENCE_COUNTED) {
                data.slots[index].reference_count += 1;
                trace!(%source, signal, %target, method, "connection reference added");
                return Ok(());
            }
            return Err(ObjectError::AlreadyConnected {
                signal: signal.to_string(),
                method: method.to_string(),
            });
        }

        data.slots.push(SignalSlot {
            connection: connection.clone(),
            reference_count: 1,
        });
        debug!(%source, signal, %target, method, ?flags, "connected");
        self.core_mut(target)?.incoming.push(connection);
        Ok(())
    }

    /// Remove a connection.
    ///
    /// A reference-counted connection is only removed once its count drops
    /// to zero.
    pub fn disconnect(
        &mut self,
        source: ObjectId,
        signal: &str,
        target: ObjectId,
        method: &str,
    ) -> ObjectResult<()> {
        if !self.is_alive(source) {
            return Err(ObjectError::InvalidInstance(source));
        }
        if !self.has_signal(source, signal) {
            return Err(self.unknown_signal(source, signal));
        }
        if self.remove_connection(source, signal, target, method, false) {
            Ok(())
        } else {
            Err(ObjectError::NotConnected {
                signal: signal.to_string(),
                method: method.to_string(),
            })
        }
    }

    /// Remove a closure connection made with [`ObjectDb::connect_fn`]
    pub fn disconnect_fn(
        &mut self,
        source: ObjectId,
        signal: &str,
        handler: &SignalHandler,
    ) -> ObjectResult<()> {
        let target = self
            .entry(source)
            .ok_or(ObjectError::InvalidInstance(source))?
            .core
            .signal(signal)
            .and_then(|data| {
                data.slots
                    .iter()
                    .find(|slot| slot.connection.handler.as_ref() == Some(handler))
            })
            .map(|slot| slot.connection.target);
        match target {
            Some(target) => self.disconnect(source, signal, target, &handler.label()),
            None => Err(ObjectError::NotConnected {
                signal: signal.to_string(),
                method: handler.label(),
            }),
        }
    }

    /// Drop one reference (or the whole edge when `force`); `false` if absent
    fn remove_connection(
        &mut self,
        source: ObjectId,
        signal: &str,
        target: ObjectId,
        method: &str,
        force: bool,
    ) -> bool {
        let Some(data) = self
            .entry_mut(source)
            .and_then(|entry| entry.core.signal_mut(signal))
        else {
            return false;
        };
        let Some(index) = data.position(target, method) else {
            return false;
        };

        let slot = &mut data.slots[index];
        if !force && slot.connection.flags.contains(ConnectFlags::REFERENCE_COUNTED) {
            slot.reference_count -= 1;
            if slot.reference_count > 0 {
                trace!(%source, signal, %target, method, "connection reference dropped");
                return true;
            }
        }
        data.slots.remove(index);

        if let Some(peer) = self.entry_mut(target) {
            peer.core.incoming.retain(|incoming| {
                !(incoming.source == source && incoming.signal == signal && incoming.method == method)
            });
        }
        debug!(%source, signal, %target, method, "disconnected");
        true
    }

    /// Check for a connection
    pub fn is_connected(
        &self,
        source: ObjectId,
        signal: &str,
        target: ObjectId,
        method: &str,
    ) -> bool {
        self.entry(source)
            .and_then(|entry| entry.core.signal(signal))
            .map_or(false, |data| data.position(target, method).is_some())
    }

    /// Connections of one signal in firing order
    pub fn get_signal_connection_list(&self, source: ObjectId, signal: &str) -> Vec<Connection> {
        self.entry(source)
            .and_then(|entry| entry.core.signal(signal))
            .map_or_else(Vec::new, |data| {
                data.slots.iter().map(|slot| slot.connection.clone()).collect()
            })
    }

    /// Every outgoing connection of the object
    pub fn get_all_signal_connections(&self, source: ObjectId) -> Vec<Connection> {
        self.entry(source).map_or_else(Vec::new, |entry| {
            entry
                .core
                .signals
                .iter()
                .flat_map(|(_, data)| data.slots.iter().map(|slot| slot.connection.clone()))
                .collect()
        })
    }

    /// Connections whose target is the object
    pub fn get_incoming_connections(&self, target: ObjectId) -> Vec<Connection> {
        self.entry(target)
            .map_or_else(Vec::new, |entry| entry.core.incoming.clone())
    }

    /// Number of outgoing connections flagged `PERSIST`
    pub fn get_persistent_signal_connection_count(&self, source: ObjectId) -> usize {
        self.get_all_signal_connections(source)
            .iter()
            .filter(|connection| connection.flags.contains(ConnectFlags::PERSIST))
            .count()
    }

    /// Reference count of a connection, `0` when absent
    pub fn connection_reference_count(
        &self,
        source: ObjectId,
        signal: &str,
        target: ObjectId,
        method: &str,
    ) -> u32 {
        self.entry(source)
            .and_then(|entry| entry.core.signal(signal))
            .and_then(|data| {
                data.position(target, method)
                    .map(|index| data.slots[index].reference_count)
            })
            .unwrap_or(0)
    }

    /// Emit a signal.
    ///
    /// Connections are snapshotted first, so handlers may connect and
    /// disconnect freely; changes apply to the next emission. Each handler
    /// receives the connection's bound arguments followed by `args`. Handler
    /// failures are logged and do not stop the remaining deliveries.
    pub fn emit_signal(
        &mut self,
        source: ObjectId,
        signal: &str,
        args: &[Variant],
    ) -> ObjectResult<EmitStatus> {
        let entry = self
            .entry(source)
            .ok_or(ObjectError::InvalidInstance(source))?;
        if entry.core.block_signals {
            trace!(%source, signal, "emission blocked");
            return Ok(EmitStatus::Blocked);
        }
        let declared = entry.core.has_user_signal(signal)
            || self.classes.has_signal(entry.type_info.name(), signal);
        if !declared {
            return Err(self.unknown_signal(source, signal));
        }
        let snapshot: Vec<Connection> = match entry.core.signal(signal) {
            Some(data) if !data.slots.is_empty() => data
                .slots
                .iter()
                .map(|slot| slot.connection.clone())
                .collect(),
            _ => return Ok(EmitStatus::Emitted { delivered: 0 }),
        };
        trace!(%source, signal, connections = snapshot.len(), "emit");

        let was_emitting = self
            .core_mut(source)
            .map(|core| std::mem::replace(&mut core.emitting, true))
            .unwrap_or(false);

        let mut delivered = 0;
        for connection in snapshot {
            if self.deliver(&connection, args) {
                delivered += 1;
            }
        }

        if let Ok(core) = self.core_mut(source) {
            core.emitting = was_emitting;
        }
        Ok(EmitStatus::Emitted { delivered })
    }

    fn deliver(&mut self, connection: &Connection, args: &[Variant]) -> bool {
        let Connection {
            source,
            signal,
            target,
            method,
            binds,
            flags,
            handler,
        } = connection;

        if !self.is_alive(*target) {
            trace!(%source, signal = signal.as_str(), %target, "skipping freed target");
            return false;
        }
        if flags.contains(ConnectFlags::ONE_SHOT) {
            if !self.is_connected(*source, signal, *target, method) {
                return false;
            }
            self.remove_connection(*source, signal, *target, method, true);
        }

        let mut call_args = Vec::with_capacity(binds.len() + args.len());
        call_args.extend_from_slice(binds);
        call_args.extend_from_slice(args);

        if flags.contains(ConnectFlags::QUEUED) {
            return self.enqueue_delivery(connection, call_args);
        }

        let result = match handler {
            Some(handler) => self.invoke_handler(*target, handler, &call_args),
            None => self.call(*target, method, &call_args).map(drop),
        };
        match result {
            Ok(()) => true,
            Err(CallError::InstanceBusy(_)) => {
                warn!(
                    %source,
                    signal = signal.as_str(),
                    %target,
                    method = method.as_str(),
                    "target is busy, deferring delivery"
                );
                self.enqueue_delivery(connection, call_args)
            }
            Err(err) => {
                error!(
                    %source,
                    signal = signal.as_str(),
                    %target,
                    method = method.as_str(),
                    error = %err,
                    "signal handler failed"
                );
                false
            }
        }
    }

    /// Run a connected closure; a closure already on the stack is busy
    fn invoke_handler(
        &mut self,
        target: ObjectId,
        handler: &SignalHandler,
        args: &[Variant],
    ) -> Result<(), CallError> {
        let func = Rc::clone(handler.func());
        let mut func = func
            .try_borrow_mut()
            .map_err(|_| CallError::InstanceBusy(target))?;
        let mut ctx = Context::new(self, target);
        (&mut *func)(&mut ctx, args)
    }

    pub(crate) fn run_queued_handler(&mut self, connection: &Connection, args: &[Variant]) {
        let Some(handler) = &connection.handler else {
            return;
        };
        if let Err(err) = self.invoke_handler(connection.target, handler, args) {
            error!(
                source = %connection.source,
                signal = connection.signal.as_str(),
                target = %connection.target,
                method = connection.method.as_str(),
                error = %err,
                "deferred signal handler failed"
            );
        }
    }

    fn enqueue_delivery(&mut self, connection: &Connection, args: Vec<Variant>) -> bool {
        let item = match connection.handler {
            Some(_) => Pending::Handler {
                connection: connection.clone(),
                args,
            },
            None => Pending::Request(DeferredCall::Call {
                target: connection.target,
                method: connection.method.clone(),
                args,
            }),
        };
        match self.queue.push_pending(item) {
            Ok(()) => true,
            Err(err) => {
                error!(
                    source = %connection.source,
                    signal = connection.signal.as_str(),
                    error = %err,
                    "dropping queued delivery"
                );
                false
            }
        }
    }
}
