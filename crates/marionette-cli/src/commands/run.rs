//! `marionette run <scenario.toml>`: execute a scenario and print its trace.

use crate::classes::class_db;
use crate::output::StyledOutput;
use crate::scenario::{Runner, Scenario, Trace};
use anyhow::Context;
use marionette_core::{ObjectDb, RuntimeConfig};
use std::path::Path;

/// Load `--config`, naming the file in the error
pub fn load_config(path: &Path) -> anyhow::Result<RuntimeConfig> {
    RuntimeConfig::from_file(path)
        .with_context(|| format!("Failed to load config {}", path.display()))
}

pub fn execute(out: &mut StyledOutput, path: &Path, config: RuntimeConfig) -> anyhow::Result<()> {
    let scenario = Scenario::from_file(path)?;
    let mut db = ObjectDb::with_config(class_db()?, config);
    tracing::debug!(
        objects = scenario.objects.len(),
        connections = scenario.connections.len(),
        steps = scenario.steps.len(),
        "loaded scenario"
    );

    let mut runner = Runner::setup(&mut db, &scenario)?;
    let mut trace = TerminalTrace { out: &mut *out };
    runner.run(&scenario.steps, &mut trace)?;

    let pending = db.pending_deferred();
    if pending > 0 {
        out.warning(&format!("{} deferred request(s) left unflushed", pending));
        out.newline();
    }
    out.success("done");
    out.plain(&format!(" ({} live objects)", db.object_count()));
    out.newline();
    out.flush();
    Ok(())
}

struct TerminalTrace<'a> {
    out: &'a mut StyledOutput,
}

impl Trace for TerminalTrace<'_> {
    fn step(&mut self, index: usize, action: &str, detail: &str) {
        self.out.dim(&format!("{:>3} ", index));
        self.out.plain(action);
        self.out.info(&format!("  {}", detail));
        self.out.newline();
    }

    fn property(&mut self, name: &str, value: &str) {
        self.out.plain(&format!("      {} = ", name));
        self.out.info(value);
        self.out.newline();
    }

    fn category(&mut self, class: &str) {
        self.out.dim(&format!("    [{}]", class));
        self.out.newline();
    }
}
