//! Sample classes available to scenarios
//!
//! ```text
//! Object
//! └── Node          name (hook)
//!     ├── Counter   value, step; increment/add/reset; value_changed, limit_reached
//!     └── Logger    record(...); entries
//! ```

use marionette_core::{
    arg, check_arg_count, declare_class, Array, Bind, CallError, Class, ClassBuilder, ClassDb,
    ClassDbError, MethodInfo, Object, PropertyBinding, PropertyInfo, PropertyUsage, Variant,
    VariantType, NOTIFICATION_POSTINITIALIZE, NOTIFICATION_PREDELETE,
};
use std::sync::Arc;

/// Named base for every sample class
#[derive(Default)]
pub struct Node {
    base: Object,
    name: String,
}

declare_class!(Node: Object => base);

impl Class for Node {
    fn on_set(&mut self, name: &str, value: &Variant) -> bool {
        match (name, value.as_str()) {
            ("name", Some(text)) => {
                self.name = text.to_string();
                true
            }
            _ => false,
        }
    }

    fn on_get(&self, name: &str) -> Option<Variant> {
        (name == "name").then(|| self.name.clone().into())
    }

    fn on_get_property_list(&self, list: &mut Vec<PropertyInfo>) {
        list.push(PropertyInfo::new("name", VariantType::String));
    }

    fn on_notification(&mut self, what: i32) {
        match what {
            NOTIFICATION_POSTINITIALIZE => tracing::trace!("node initialized"),
            NOTIFICATION_PREDELETE => tracing::debug!(name = self.name.as_str(), "node deleted"),
            _ => {}
        }
    }
}

impl Bind for Node {
    fn bind(class: &mut ClassBuilder<'_, Self>) {
        class.method(
            MethodInfo::new("get_name").returning(VariantType::String),
            |node, _, args| {
                check_arg_count(args, 0)?;
                Ok(node.name.clone().into())
            },
        );
    }
}

/// Integer counter that reports changes and a reached limit
#[derive(Default)]
pub struct Counter {
    node: Node,
    value: i64,
    limit: Option<i64>,
}

declare_class!(Counter: Node => node);

impl Counter {
    fn update(&mut self, value: i64) -> Variant {
        self.value = value;
        value.into()
    }
}

impl Class for Counter {
    fn on_set(&mut self, name: &str, value: &Variant) -> bool {
        if name != "limit" {
            return false;
        }
        match value {
            Variant::Nil => self.limit = None,
            other => match other.as_int() {
                Some(limit) => self.limit = Some(limit),
                None => return false,
            },
        }
        true
    }

    fn on_get(&self, name: &str) -> Option<Variant> {
        (name == "limit").then(|| self.limit.into())
    }

    fn on_get_property_list(&self, list: &mut Vec<PropertyInfo>) {
        list.push(PropertyInfo::new("limit", VariantType::Int));
    }
}

impl Bind for Counter {
    fn bind(class: &mut ClassBuilder<'_, Self>) {
        class
            .method(
                MethodInfo::new("increment").returning(VariantType::Int),
                |counter, ctx, args| {
                    check_arg_count(args, 0)?;
                    let value = counter.update(counter.value + 1);
                    ctx.emit("value_changed", &[value.clone()])?;
                    if counter.limit == Some(counter.value) {
                        ctx.emit("limit_reached", &[])?;
                    }
                    Ok(value)
                },
            )
            .method(
                MethodInfo::new("add")
                    .with_arg("amount", VariantType::Int)
                    .returning(VariantType::Int),
                |counter, ctx, args| {
                    check_arg_count(args, 1)?;
                    let amount: i64 = arg(args, 0)?;
                    let value = counter.update(counter.value + amount);
                    ctx.emit("value_changed", &[value.clone()])?;
                    Ok(value)
                },
            )
            .method(MethodInfo::new("reset"), |counter, _, args| {
                check_arg_count(args, 0)?;
                counter.value = 0;
                Ok(Variant::Nil)
            })
            .method(
                MethodInfo::new("set_value").with_arg("value", VariantType::Int),
                |counter, _, args| {
                    check_arg_count(args, 1)?;
                    counter.value = arg(args, 0)?;
                    Ok(Variant::Nil)
                },
            )
            .method(
                MethodInfo::new("get_value").returning(VariantType::Int),
                |counter, _, _| Ok(counter.value.into()),
            )
            .signal(MethodInfo::new("value_changed").with_arg("value", VariantType::Int))
            .signal("limit_reached")
            .property(
                PropertyBinding::new(PropertyInfo::new("value", VariantType::Int))
                    .setter("set_value")
                    .getter("get_value")
                    .changed_signal("value_changed"),
            );
    }
}

/// Collects every call to `record` as a printable line
#[derive(Default)]
pub struct Logger {
    node: Node,
    entries: Vec<String>,
}

declare_class!(Logger: Node => node);

impl Logger {
    fn format_entry(args: &[Variant]) -> String {
        args.iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Class for Logger {
    fn on_get(&self, name: &str) -> Option<Variant> {
        (name == "entries").then(|| {
            self.entries
                .iter()
                .map(String::as_str)
                .collect::<Array>()
                .into()
        })
    }

    fn on_get_property_list(&self, list: &mut Vec<PropertyInfo>) {
        list.push(
            PropertyInfo::new("entries", VariantType::Array).with_usage(PropertyUsage::EDITOR),
        );
    }
}

impl Bind for Logger {
    fn bind(class: &mut ClassBuilder<'_, Self>) {
        class
            .method(MethodInfo::new("record"), |logger, ctx, args| {
                let line = Logger::format_entry(args);
                tracing::info!(logger = %ctx.this(), "{}", line);
                logger.entries.push(line);
                Ok(Variant::Nil)
            })
            .method(MethodInfo::new("clear"), |logger, _, args| {
                check_arg_count(args, 0)?;
                logger.entries.clear();
                Ok(Variant::Nil)
            })
            .method(
                MethodInfo::new("fail").with_arg("reason", VariantType::String),
                |_, _, args| {
                    let reason: String = arg(args, 0)?;
                    Err(CallError::Failed(reason))
                },
            );
    }
}

/// Register the sample classes
pub fn class_db() -> Result<Arc<ClassDb>, ClassDbError> {
    let mut builder = ClassDb::builder();
    builder
        .register_instantiable::<Node>()?
        .register_instantiable::<Counter>()?
        .register_instantiable::<Logger>()?;
    Ok(builder.build())
}
