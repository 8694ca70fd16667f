//! Fixture classes shared by the integration tests
//!
//! Object <- Counter <- Sprite
//! Object <- Recorder
//! Object <- Panel (lists its properties before its base's)

#![allow(dead_code)]

use marionette_core::{
    arg, check_arg_count, declare_class, Bind, CallError, Class, ClassBuilder, ClassDb,
    MethodInfo, Object, ObjectDb, ObjectId, PropertyBinding, PropertyInfo, Variant, VariantType,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

/// Notifications observed by every level of an object, in arrival order
pub type NotificationLog = Rc<RefCell<Vec<(&'static str, i32)>>>;

/// Log code written by the `touch` methods
pub const TOUCHED: i32 = 100;

// ===== Counter =====

#[derive(Default)]
pub struct Counter {
    base: Object,
    pub value: i64,
    pub tag: String,
    pub log: NotificationLog,
}

declare_class!(Counter: Object => base);

impl Class for Counter {
    fn on_set(&mut self, name: &str, value: &Variant) -> bool {
        match (name, value.as_str()) {
            ("tag", Some(tag)) => {
                self.tag = tag.to_string();
                true
            }
            _ => false,
        }
    }

    fn on_get(&self, name: &str) -> Option<Variant> {
        match name {
            "tag" => Some(self.tag.clone().into()),
            _ => None,
        }
    }

    fn on_get_property_list(&self, list: &mut Vec<PropertyInfo>) {
        list.push(PropertyInfo::new("tag", VariantType::String));
    }

    fn on_notification(&mut self, what: i32) {
        self.log.borrow_mut().push(("Counter", what));
    }
}

impl Bind for Counter {
    fn bind(class: &mut ClassBuilder<'_, Self>) {
        class
            .method(
                MethodInfo::new("increment").returning(VariantType::Int),
                |counter, _, args| {
                    check_arg_count(args, 0)?;
                    counter.value += 1;
                    Ok(counter.value.into())
                },
            )
            .method(
                MethodInfo::new("add")
                    .with_arg("amount", VariantType::Int)
                    .returning(VariantType::Int),
                |counter, _, args| {
                    counter.value += arg::<i64>(args, 0)?;
                    Ok(counter.value.into())
                },
            )
            .method(
                MethodInfo::new("set_value").with_arg("value", VariantType::Int),
                |counter, _, args| {
                    counter.value = arg(args, 0)?;
                    Ok(Variant::Nil)
                },
            )
            .method(
                MethodInfo::new("get_value").returning(VariantType::Int),
                |counter, _, _| Ok(counter.value.into()),
            )
            .method(MethodInfo::new("fail"), |_, _, _| {
                Err(CallError::Failed("always fails".to_string()))
            })
            .method(MethodInfo::new("emit_done"), |_, ctx, _| {
                ctx.emit("done", &[])?;
                Ok(Variant::Nil)
            })
            .method(MethodInfo::new("free_self"), |_, ctx, _| {
                let this = ctx.this();
                ctx.free(this)?;
                Ok(Variant::Nil)
            })
            .method(MethodInfo::new("touch"), |counter, _, _| {
                counter.log.borrow_mut().push(("Counter", TOUCHED));
                Ok(Variant::Nil)
            })
            .signal("done")
            .signal(MethodInfo::new("value_changed").with_arg("value", VariantType::Int))
            .property(
                PropertyBinding::new(PropertyInfo::new("value", VariantType::Int))
                    .setter("set_value")
                    .getter("get_value")
                    .changed_signal("value_changed"),
            )
            .property(
                PropertyBinding::new(PropertyInfo::new("read_only", VariantType::Int))
                    .getter("get_value"),
            );
    }
}

// ===== Sprite =====

#[derive(Default)]
pub struct Sprite {
    pub counter: Counter,
    pub label: String,
    pub tag: String,
}

declare_class!(Sprite: Counter => counter);

impl Sprite {
    pub fn with_log(log: NotificationLog) -> Self {
        Self {
            counter: Counter {
                log,
                ..Counter::default()
            },
            ..Sprite::default()
        }
    }
}

impl Class for Sprite {
    fn on_set(&mut self, name: &str, value: &Variant) -> bool {
        match (name, value.as_str()) {
            ("label", Some(label)) => {
                self.label = label.to_string();
                true
            }
            ("tag", Some(tag)) => {
                self.tag = tag.to_string();
                true
            }
            _ => false,
        }
    }

    fn on_get(&self, name: &str) -> Option<Variant> {
        match name {
            "label" => Some(self.label.clone().into()),
            _ => None,
        }
    }

    fn on_get_property_list(&self, list: &mut Vec<PropertyInfo>) {
        list.push(PropertyInfo::new("label", VariantType::String));
    }

    fn on_notification(&mut self, what: i32) {
        self.counter.log.borrow_mut().push(("Sprite", what));
    }
}

impl Bind for Sprite {
    fn bind(class: &mut ClassBuilder<'_, Self>) {
        class
            .method(
                MethodInfo::new("get_label").returning(VariantType::String),
                |sprite, _, _| Ok(sprite.label.clone().into()),
            )
            .method(MethodInfo::new("touch"), |sprite, _, _| {
                sprite.counter.log.borrow_mut().push(("Sprite", TOUCHED));
                Ok(Variant::Nil)
            });
    }
}

// ===== Recorder =====

/// Remembers the arguments of every `record` call
#[derive(Default)]
pub struct Recorder {
    base: Object,
    pub calls: Vec<Vec<Variant>>,
}

declare_class!(Recorder: Object => base);

impl Class for Recorder {}

impl Bind for Recorder {
    fn bind(class: &mut ClassBuilder<'_, Self>) {
        class
            .method(MethodInfo::new("record"), |recorder, _, args| {
                recorder.calls.push(args.to_vec());
                Ok(Variant::Nil)
            })
            .method(MethodInfo::new("fail"), |_, _, _| {
                Err(CallError::Failed("recorder failure".to_string()))
            })
            .method(MethodInfo::new("ping"), |recorder, ctx, args| {
                recorder.calls.push(args.to_vec());
                ctx.emit("pinged", args)?;
                Ok(Variant::Nil)
            })
            // (next source, ...) : re-emit "pinged" from `next` with the rest
            .method(MethodInfo::new("relay"), |recorder, ctx, args| {
                recorder.calls.push(args.to_vec());
                let next: ObjectId = arg(args, 0)?;
                ctx.emit_signal(next, "pinged", &args[1..])?;
                Ok(Variant::Nil)
            })
            // (source, signal, target, method) : drop that connection
            .method(MethodInfo::new("disconnect_peer"), |recorder, ctx, args| {
                recorder.calls.push(args.to_vec());
                let source: ObjectId = arg(args, 0)?;
                let signal: String = arg(args, 1)?;
                let target: ObjectId = arg(args, 2)?;
                let method: String = arg(args, 3)?;
                ctx.disconnect(source, &signal, target, &method)?;
                Ok(Variant::Nil)
            })
            .signal("pinged");
    }
}

// ===== Panel =====

#[derive(Default)]
pub struct Panel {
    base: Object,
}

declare_class!(Panel: Object => base);

impl Class for Panel {
    fn on_get_property_list(&self, list: &mut Vec<PropertyInfo>) {
        list.push(PropertyInfo::new("panel_size", VariantType::Int));
    }

    fn property_list_reversed(&self) -> bool {
        true
    }
}

impl Bind for Panel {}

// ===== Helpers =====

pub fn class_db() -> Arc<ClassDb> {
    let mut builder = ClassDb::builder();
    builder
        .register_instantiable::<Counter>()
        .unwrap()
        .register_instantiable::<Sprite>()
        .unwrap()
        .register_instantiable::<Recorder>()
        .unwrap()
        .register::<Panel>()
        .unwrap();
    builder.build()
}

pub fn object_db() -> ObjectDb {
    ObjectDb::new(class_db())
}

/// Names of a property list, categories included
pub fn names(list: &[PropertyInfo]) -> Vec<&str> {
    list.iter().map(|info| info.name.as_str()).collect()
}

/// Calls seen by a recorder
pub fn recorded(db: &ObjectDb, recorder: ObjectId) -> Vec<Vec<Variant>> {
    db.with_cast::<Recorder, _>(recorder, |r| r.calls.clone())
        .unwrap_or_default()
}

pub fn counter_value(db: &ObjectDb, id: ObjectId) -> Option<i64> {
    db.with_cast::<Counter, _>(id, |c| c.value)
}
