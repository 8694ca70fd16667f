//! Built-in binds of the root `Object` class
//!
//! Every class inherits these, so a script bridge can drive the object API
//! through `call` alone.

use super::Object;
use crate::property::MethodInfo;
use crate::types::{Bind, ClassBuilder};
use crate::value::{arg, check_arg_count, Variant, VariantType};

impl Bind for Object {
    fn bind(class: &mut ClassBuilder<'_, Self>) {
        class
            // `get_class()` - Leaf class name
            .method(
                MethodInfo::new("get_class").returning(VariantType::String),
                |_, ctx, args| {
                    check_arg_count(args, 0)?;
                    let this = ctx.this();
                    Ok(ctx.get_class(this).unwrap_or_default().into())
                },
            )
            // `is_class(name)` - Class or ancestor check
            .method(
                MethodInfo::new("is_class")
                    .with_arg("class", VariantType::String)
                    .returning(VariantType::Bool),
                |_, ctx, args| {
                    check_arg_count(args, 1)?;
                    let class: String = arg(args, 0)?;
                    let this = ctx.this();
                    Ok(ctx.is_class(this, &class).into())
                },
            )
            // `get_instance_id()` - Numeric id of the receiver
            .method(
                MethodInfo::new("get_instance_id").returning(VariantType::Int),
                |_, ctx, args| {
                    check_arg_count(args, 0)?;
                    Ok(Variant::Int(ctx.this().as_u64() as i64))
                },
            )
            // `set_meta(name, value)` - Store metadata; nil erases
            .method(
                MethodInfo::new("set_meta")
                    .with_arg("name", VariantType::String)
                    .with_arg("value", VariantType::Nil),
                |_, ctx, args| {
                    check_arg_count(args, 2)?;
                    let name: String = arg(args, 0)?;
                    let value: Variant = arg(args, 1)?;
                    let this = ctx.this();
                    ctx.set_meta(this, &name, value)?;
                    Ok(Variant::Nil)
                },
            )
            // `get_meta(name)` - Read metadata, nil when absent
            .method(
                MethodInfo::new("get_meta").with_arg("name", VariantType::String),
                |_, ctx, args| {
                    check_arg_count(args, 1)?;
                    let name: String = arg(args, 0)?;
                    let this = ctx.this();
                    Ok(ctx.get_meta(this, &name).unwrap_or_default())
                },
            )
            // `has_meta(name)`
            .method(
                MethodInfo::new("has_meta")
                    .with_arg("name", VariantType::String)
                    .returning(VariantType::Bool),
                |_, ctx, args| {
                    check_arg_count(args, 1)?;
                    let name: String = arg(args, 0)?;
                    let this = ctx.this();
                    Ok(ctx.has_meta(this, &name).into())
                },
            )
            // `remove_meta(name)`
            .method(
                MethodInfo::new("remove_meta").with_arg("name", VariantType::String),
                |_, ctx, args| {
                    check_arg_count(args, 1)?;
                    let name: String = arg(args, 0)?;
                    let this = ctx.this();
                    ctx.remove_meta(this, &name);
                    Ok(Variant::Nil)
                },
            )
            // `set_block_signals(enable)`
            .method(
                MethodInfo::new("set_block_signals").with_arg("enable", VariantType::Bool),
                |_, ctx, args| {
                    check_arg_count(args, 1)?;
                    let enable: bool = arg(args, 0)?;
                    let this = ctx.this();
                    ctx.set_block_signals(this, enable)?;
                    Ok(Variant::Nil)
                },
            )
            // `is_blocking_signals()`
            .method(
                MethodInfo::new("is_blocking_signals").returning(VariantType::Bool),
                |_, ctx, args| {
                    check_arg_count(args, 0)?;
                    let this = ctx.this();
                    Ok(ctx.is_blocking_signals(this).into())
                },
            )
            // `emit_signal(name, ...)` - Remaining arguments are forwarded
            .method(
                MethodInfo::new("emit_signal").with_arg("signal", VariantType::String),
                |_, ctx, args| {
                    let signal: String = arg(args, 0)?;
                    ctx.emit(&signal, &args[1..])?;
                    Ok(Variant::Nil)
                },
            )
            // `queue_delete()` - Destroy at the next pump
            .method(MethodInfo::new("queue_delete"), |_, ctx, args| {
                check_arg_count(args, 0)?;
                let this = ctx.this();
                ctx.queue_delete(this)?;
                Ok(Variant::Nil)
            })
            // `cancel_delete()` - Withdraw a pending queue_delete
            .method(
                MethodInfo::new("cancel_delete").returning(VariantType::Bool),
                |_, ctx, args| {
                    check_arg_count(args, 0)?;
                    let this = ctx.this();
                    Ok(ctx.cancel_delete(this)?.into())
                },
            )
            // `property_list_changed_notify()`
            .method(
                MethodInfo::new("property_list_changed_notify"),
                |_, ctx, args| {
                    check_arg_count(args, 0)?;
                    let this = ctx.this();
                    ctx.property_list_changed_notify(this)?;
                    Ok(Variant::Nil)
                },
            )
            .signal("script_changed")
            .signal("property_list_changed");
    }
}
