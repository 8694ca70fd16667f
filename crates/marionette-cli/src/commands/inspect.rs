//! `marionette inspect <Class>`: show a class's reflection data.

use crate::classes::class_db;
use crate::output::StyledOutput;
use anyhow::bail;
use marionette_core::{ObjectDb, PropertyInfo};

pub fn execute(out: &mut StyledOutput, class: &str, own: bool) -> anyhow::Result<()> {
    let classes = class_db()?;
    if !classes.class_exists(class) {
        bail!("unknown class '{}'", class);
    }
    let inherited = !own;

    out.class_name(class);
    let ancestors: Vec<&str> = classes
        .type_info(class)
        .map(|info| info.ancestors().skip(1).map(|a| a.name()).collect())
        .unwrap_or_default();
    if !ancestors.is_empty() {
        out.dim(&format!(" : {}", ancestors.join(" : ")));
    }
    out.newline();
    out.newline();

    // Hook-provided properties only show up on a live instance
    let properties = if classes.can_instantiate(class) {
        let mut db = ObjectDb::new(classes.clone());
        let id = db.instantiate_class(class)?;
        let mut list = db.get_property_list(id);
        if own {
            list = own_section(list, class);
        }
        list
    } else {
        classes.class_property_list(class, inherited)
    };

    out.heading("Properties");
    for info in &properties {
        if info.is_category() {
            out.dim(&format!("  [{}]", info.name));
            out.newline();
            continue;
        }
        out.plain(&format!("  {}", info.name));
        out.info(&format!(": {}", info.ty));
        out.newline();
    }
    out.newline();

    out.heading("Methods");
    for method in classes.get_method_list(class, inherited) {
        out.plain(&format!("  {}", method));
        out.newline();
    }
    out.newline();

    out.heading("Signals");
    for signal in classes.get_signal_list(class, inherited) {
        out.warning(&format!("  {}", signal));
        out.newline();
    }
    out.flush();
    Ok(())
}

/// Entries listed under the class's own category header
fn own_section(list: Vec<PropertyInfo>, class: &str) -> Vec<PropertyInfo> {
    list.into_iter()
        .skip_while(|info| !(info.is_category() && info.name == class))
        .take_while({
            let mut seen_header = false;
            move |info| {
                if info.is_category() {
                    let first = !seen_header;
                    seen_header = true;
                    first
                } else {
                    true
                }
            }
        })
        .collect()
}
