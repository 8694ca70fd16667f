//! `marionette classes`: print the registered class tree.

use crate::classes::class_db;
use crate::output::StyledOutput;
use marionette_core::ClassDb;

pub fn execute(out: &mut StyledOutput) -> anyhow::Result<()> {
    let classes = class_db()?;
    for root in classes
        .get_class_list()
        .into_iter()
        .filter(|class| classes.get_parent_class(class).is_none())
    {
        print_tree(out, &classes, root, 0);
    }
    out.flush();
    Ok(())
}

fn print_tree(out: &mut StyledOutput, classes: &ClassDb, class: &str, depth: usize) {
    out.plain(&"  ".repeat(depth));
    out.class_name(class);
    if !classes.can_instantiate(class) {
        out.dim(" (abstract)");
    }
    out.newline();

    for child in classes
        .get_class_list()
        .into_iter()
        .filter(|child| classes.get_parent_class(child) == Some(class))
    {
        print_tree(out, classes, child, depth + 1);
    }
}
