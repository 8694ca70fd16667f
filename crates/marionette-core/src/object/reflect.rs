//! Dynamic property access, method calls and notifications
//!
//! Lookups run in a fixed order: the attached script instance, then each
//! class level's hooks from most-derived to root, then the properties and
//! methods registered in the [`ClassDb`](crate::ClassDb), then metadata.

use super::{Class, Context, ObjectDb, ObjectId};
use crate::collections::{Array, Dictionary};
use crate::error::{CallError, ObjectError, ObjectResult};
use crate::property::{PropertyInfo, PropertyUsage};
use crate::signal::EmitStatus;
use crate::value::{Variant, VariantType};
use std::rc::Rc;
use std::slice;
use std::sync::Arc;
use tracing::{trace, warn};

/// Property exposing the whole metadata dictionary
pub const META_PROPERTY: &str = "__meta__";

/// Prefix addressing a single metadata entry as a property
pub const META_PREFIX: &str = "metadata/";

fn set_level(level: &mut dyn Class, name: &str, value: &Variant) -> bool {
    if level.on_set(name, value) {
        return true;
    }
    match level.base_mut() {
        Some(base) => set_level(base, name, value),
        None => false,
    }
}

fn get_level(level: &dyn Class, name: &str) -> Option<Variant> {
    level
        .on_get(name)
        .or_else(|| level.base().and_then(|base| get_level(base, name)))
}

fn notify_level(level: &mut dyn Class, what: i32, reversed: bool) {
    if reversed {
        level.on_notification(what);
        if let Some(base) = level.base_mut() {
            notify_level(base, what, reversed);
        }
    } else {
        if let Some(base) = level.base_mut() {
            notify_level(base, what, reversed);
        }
        level.on_notification(what);
    }
}

impl ObjectDb {
    /// Assign a property by name.
    ///
    /// Returns `false` when nothing handles the name or the object is gone.
    pub fn set(&mut self, id: ObjectId, name: &str, value: impl Into<Variant>) -> bool {
        let value = value.into();
        let Some(entry) = self.entry(id) else {
            return false;
        };
        let class = entry.type_info.name();
        let script = entry.core.script.clone();
        let instance = Rc::clone(&entry.instance);

        if let Some(script) = script {
            match script.try_borrow_mut() {
                Ok(mut script) => {
                    if script.set(name, &value) {
                        return true;
                    }
                }
                Err(_) => warn!(%id, name, "script instance busy during set"),
            }
        }

        {
            let Ok(mut object) = instance.try_borrow_mut() else {
                warn!(%id, name, "set on an instance that is executing a method");
                return false;
            };
            if set_level(&mut **object, name, &value) {
                return true;
            }
        }

        let classes = Arc::clone(&self.classes);
        if let Some(binding) = classes.find_property(class, name) {
            let Some(setter) = &binding.setter else {
                return false;
            };
            return match self.call(id, setter, slice::from_ref(&value)) {
                Ok(_) => {
                    if let Some(signal) = &binding.changed_signal {
                        if let Err(err) = self.emit_signal(id, signal, slice::from_ref(&value)) {
                            warn!(%id, signal = signal.as_str(), error = %err, "change signal failed");
                        }
                    }
                    true
                }
                Err(err) => {
                    warn!(%id, name, error = %err, "property setter failed");
                    false
                }
            };
        }

        self.set_meta_property(id, name, value)
    }

    fn set_meta_property(&mut self, id: ObjectId, name: &str, value: Variant) -> bool {
        if name == META_PROPERTY {
            return match value {
                Variant::Dictionary(dict) => self.replace_metadata(id, dict.duplicate(false)),
                Variant::Nil => self.replace_metadata(id, Dictionary::new()),
                _ => false,
            };
        }
        match name.strip_prefix(META_PREFIX) {
            Some(key) if !key.is_empty() => self.set_meta(id, key, value).is_ok(),
            _ => false,
        }
    }

    /// Read a property by name.
    ///
    /// Takes `&mut self` because registered getters are method binds.
    pub fn get(&mut self, id: ObjectId, name: &str) -> Option<Variant> {
        let entry = self.entry(id)?;
        let class = entry.type_info.name();

        if let Some(script) = &entry.core.script {
            if let Ok(script) = script.try_borrow() {
                if let Some(value) = script.get(name) {
                    return Some(value);
                }
            }
        }

        {
            let Ok(object) = entry.instance.try_borrow() else {
                warn!(%id, name, "get on an instance that is executing a method");
                return None;
            };
            if let Some(value) = get_level(&**object, name) {
                return Some(value);
            }
        }

        let classes = Arc::clone(&self.classes);
        if let Some(binding) = classes.find_property(class, name) {
            let getter = binding.getter.as_ref()?;
            return match self.call(id, getter, &[]) {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!(%id, name, error = %err, "property getter failed");
                    None
                }
            };
        }

        if name == META_PROPERTY {
            return self.metadata(id).map(Variant::from);
        }
        let key = name.strip_prefix(META_PREFIX)?;
        self.get_meta(id, key)
    }

    /// Flattened property list of the object.
    ///
    /// Each class level contributes a category entry, its registered
    /// properties and its hook output, after its base's contribution (or
    /// before it, for classes that list in reverse).
    pub fn get_property_list(&self, id: ObjectId) -> Vec<PropertyInfo> {
        let Some(entry) = self.entry(id) else {
            return Vec::new();
        };
        let mut list = Vec::new();
        match entry.instance.try_borrow() {
            Ok(object) => self.list_level(&**object, &mut list),
            Err(_) => warn!(%id, "property list requested while instance is busy"),
        }
        if let Some(script) = &entry.core.script {
            if let Ok(script) = script.try_borrow() {
                script.get_property_list(&mut list);
            }
        }
        if !entry.core.metadata.is_empty() {
            list.push(
                PropertyInfo::new(META_PROPERTY, VariantType::Dictionary)
                    .with_usage(PropertyUsage::NO_EDITOR),
            );
        }
        list
    }

    fn list_level(&self, level: &dyn Class, list: &mut Vec<PropertyInfo>) {
        let class = level.type_info().name();
        let mut own = vec![PropertyInfo::category(class)];
        if let Some(data) = self.classes.class_data(class) {
            own.extend(data.properties().iter().map(|binding| binding.info.clone()));
        }
        level.on_get_property_list(&mut own);

        if level.property_list_reversed() {
            list.append(&mut own);
            if let Some(base) = level.base() {
                self.list_level(base, list);
            }
        } else {
            if let Some(base) = level.base() {
                self.list_level(base, list);
            }
            list.append(&mut own);
        }
    }

    /// Declared type of a listed property
    pub fn get_static_property_type(&self, id: ObjectId, name: &str) -> Option<VariantType> {
        self.get_property_list(id)
            .into_iter()
            .find(|info| !info.is_category() && info.name == name)
            .map(|info| info.ty)
    }

    /// Declared type of the first path element, or the runtime type of the
    /// value the whole path resolves to.
    ///
    /// `None` when the first element is not a listed property or the path
    /// does not resolve.
    pub fn get_static_property_type_indexed(
        &mut self,
        id: ObjectId,
        path: &[&str],
    ) -> Option<VariantType> {
        let (first, rest) = path.split_first()?;
        let declared = self.get_static_property_type(id, first)?;
        if rest.is_empty() {
            return Some(declared);
        }
        self.get_indexed(id, path).map(|value| value.get_type())
    }

    /// Follow `path` through nested dictionaries and object handles
    pub fn get_indexed(&mut self, id: ObjectId, path: &[&str]) -> Option<Variant> {
        let (first, rest) = path.split_first()?;
        let mut current = self.get(id, first)?;
        for name in rest {
            current = match current {
                Variant::Dictionary(dict) => dict.get(&Variant::from(*name))?,
                Variant::Object(object) => self.get(object, name)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Assign the value at the end of `path`.
    ///
    /// Intermediate dictionaries are shared handles, so the write lands in
    /// place without writing the parents back.
    pub fn set_indexed(&mut self, id: ObjectId, path: &[&str], value: impl Into<Variant>) -> bool {
        let Some((last, parents)) = path.split_last() else {
            return false;
        };
        if parents.is_empty() {
            return self.set(id, last, value);
        }
        match self.get_indexed(id, parents) {
            Some(Variant::Dictionary(dict)) => {
                dict.set(*last, value);
                true
            }
            Some(Variant::Object(object)) => self.set(object, last, value),
            _ => false,
        }
    }

    /// Check if the script or class chain implements `method`
    pub fn has_method(&self, id: ObjectId, method: &str) -> bool {
        let Some(entry) = self.entry(id) else {
            return false;
        };
        let in_script = entry
            .core
            .script
            .as_ref()
            .and_then(|script| script.try_borrow().ok().map(|s| s.has_method(method)))
            .unwrap_or(false);
        in_script || self.classes.has_method(entry.type_info.name(), method)
    }

    /// Invoke a method by name
    pub fn call(
        &mut self,
        id: ObjectId,
        method: &str,
        args: &[Variant],
    ) -> Result<Variant, CallError> {
        let entry = self.entry(id).ok_or(CallError::InstanceIsNull)?;
        let class = entry.type_info.name();
        let script = entry.core.script.clone();
        let instance = Rc::clone(&entry.instance);
        trace!(%id, class, method, argc = args.len(), "call");

        if let Some(script) = script {
            let handles = script
                .try_borrow()
                .map_err(|_| CallError::InstanceBusy(id))?
                .has_method(method);
            if handles {
                let mut script = script
                    .try_borrow_mut()
                    .map_err(|_| CallError::InstanceBusy(id))?;
                let mut ctx = Context::new(self, id);
                return script.call(&mut ctx, method, args);
            }
        }

        let bind = self
            .classes
            .find_method(class, method)
            .cloned()
            .ok_or_else(|| CallError::InvalidMethod {
                class: class.to_string(),
                method: method.to_string(),
            })?;
        let mut object = instance
            .try_borrow_mut()
            .map_err(|_| CallError::InstanceBusy(id))?;
        let mut ctx = Context::new(self, id);
        bind.call(&mut **object, &mut ctx, args)
    }

    /// Invoke a method with arguments packed in an array
    pub fn callv(&mut self, id: ObjectId, method: &str, args: &Array) -> Result<Variant, CallError> {
        self.call(id, method, &args.to_vec())
    }

    /// Run every class level's bind of `method`, base first, then the script.
    ///
    /// Return values are dropped. The first failing level stops the walk.
    pub fn call_multilevel(
        &mut self,
        id: ObjectId,
        method: &str,
        args: &[Variant],
    ) -> Result<(), CallError> {
        self.call_levels(id, method, args, false)
    }

    /// Like [`ObjectDb::call_multilevel`], but the script and the most-derived
    /// level run first
    pub fn call_multilevel_reversed(
        &mut self,
        id: ObjectId,
        method: &str,
        args: &[Variant],
    ) -> Result<(), CallError> {
        self.call_levels(id, method, args, true)
    }

    fn call_levels(
        &mut self,
        id: ObjectId,
        method: &str,
        args: &[Variant],
        reversed: bool,
    ) -> Result<(), CallError> {
        let entry = self.entry(id).ok_or(CallError::InstanceIsNull)?;
        let class = entry.type_info.name();
        let script = entry
            .core
            .script
            .clone()
            .filter(|script| script.try_borrow().map_or(false, |s| s.has_method(method)));
        let instance = Rc::clone(&entry.instance);
        let mut levels = self.classes.find_method_levels(class, method);
        if levels.is_empty() && script.is_none() {
            return Err(CallError::InvalidMethod {
                class: class.to_string(),
                method: method.to_string(),
            });
        }
        trace!(%id, class, method, levels = levels.len(), reversed, "multilevel call");
        if !reversed {
            levels.reverse();
        }

        let call_script = |db: &mut ObjectDb| -> Result<(), CallError> {
            if let Some(script) = &script {
                let mut script = script
                    .try_borrow_mut()
                    .map_err(|_| CallError::InstanceBusy(id))?;
                let mut ctx = Context::new(db, id);
                script.call(&mut ctx, method, args)?;
            }
            Ok(())
        };

        if reversed {
            call_script(self)?;
        }
        {
            let mut object = instance
                .try_borrow_mut()
                .map_err(|_| CallError::InstanceBusy(id))?;
            for bind in &levels {
                let mut ctx = Context::new(self, id);
                bind.call(&mut **object, &mut ctx, args)?;
            }
        }
        if !reversed {
            call_script(self)?;
        }
        Ok(())
    }

    /// Send a notification to every class level and the script.
    ///
    /// Levels run base-first, or most-derived first when `reversed`; the
    /// script counts as the most-derived level.
    pub fn notification(&mut self, id: ObjectId, what: i32, reversed: bool) -> ObjectResult<()> {
        let entry = self.entry(id).ok_or(ObjectError::InvalidInstance(id))?;
        let script = entry.core.script.clone();
        let instance = Rc::clone(&entry.instance);
        trace!(%id, what, reversed, "notification");

        let notify_script = || {
            if let Some(script) = &script {
                match script.try_borrow_mut() {
                    Ok(mut script) => script.notification(what),
                    Err(_) => warn!(%id, what, "script instance busy during notification"),
                }
            }
        };

        if reversed {
            notify_script();
        }
        {
            let mut object = instance
                .try_borrow_mut()
                .map_err(|_| CallError::InstanceBusy(id))?;
            notify_level(&mut **object, what, reversed);
        }
        if !reversed {
            notify_script();
        }
        Ok(())
    }

    /// Emit `property_list_changed`
    pub fn property_list_changed_notify(&mut self, id: ObjectId) -> ObjectResult<EmitStatus> {
        self.emit_signal(id, "property_list_changed", &[])
    }
}
