//! Scenario files
//!
//! A scenario declares named objects, wires their signals and then runs a
//! list of steps against the object database:
//!
//! ```toml
//! [[object]]
//! name = "counter"
//! class = "Counter"
//! properties = { name = "main", limit = 3 }
//!
//! [[connect]]
//! source = "counter"
//! signal = "limit_reached"
//! target = "log"
//! method = "record"
//! binds = ["limit"]
//! flags = ["one_shot"]
//!
//! [[step]]
//! op = "call"
//! object = "counter"
//! method = "increment"
//! ```
//!
//! Arguments and values are TOML values. A string of the form `"@name"`
//! refers to a declared object.

use anyhow::{anyhow, bail, Context, Result};
use marionette_core::{Array, ConnectFlags, Dictionary, EmitStatus, ObjectDb, ObjectId, Variant};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Parsed scenario file
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Objects created before any connection
    #[serde(default, rename = "object")]
    pub objects: Vec<ObjectSpec>,

    /// Connections made after every object exists
    #[serde(default, rename = "connect")]
    pub connections: Vec<ConnectSpec>,

    /// Steps run in order
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectSpec {
    pub name: String,
    pub class: String,
    #[serde(default)]
    pub properties: toml::Table,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectSpec {
    pub source: String,
    pub signal: String,
    pub target: String,
    pub method: String,
    #[serde(default)]
    pub binds: Vec<toml::Value>,
    #[serde(default)]
    pub flags: Vec<String>,
}

/// One scenario action
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Invoke a method and print its result
    Call {
        object: String,
        method: String,
        #[serde(default)]
        args: Vec<toml::Value>,
    },
    /// Queue a method call for the next flush
    CallDeferred {
        object: String,
        method: String,
        #[serde(default)]
        args: Vec<toml::Value>,
    },
    /// Emit a signal
    Emit {
        object: String,
        signal: String,
        #[serde(default)]
        args: Vec<toml::Value>,
    },
    /// Assign a property
    Set {
        object: String,
        property: String,
        value: toml::Value,
    },
    /// Read a property and print it
    Get { object: String, property: String },
    /// Remove a connection
    Disconnect {
        source: String,
        signal: String,
        target: String,
        method: String,
    },
    /// Pump the deferred queue
    Flush,
    /// Destroy an object now
    Free { object: String },
    /// Destroy an object at the next flush
    QueueFree { object: String },
    /// Print the object's property list with current values
    Dump { object: String },
}

impl Scenario {
    /// Load and parse a scenario file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse scenario {}", path.display()))
    }

    /// Parse a scenario from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Line-oriented record of what a scenario did
pub trait Trace {
    /// A step ran; `detail` describes its outcome
    fn step(&mut self, index: usize, action: &str, detail: &str);

    /// A property line printed by `dump`
    fn property(&mut self, name: &str, value: &str);

    /// A category header printed by `dump`
    fn category(&mut self, class: &str);
}

/// Runs scenario steps against an object database
pub struct Runner<'a> {
    db: &'a mut ObjectDb,
    names: HashMap<String, ObjectId>,
}

impl<'a> Runner<'a> {
    /// Create the scenario's objects and connections
    pub fn setup(db: &'a mut ObjectDb, scenario: &Scenario) -> Result<Self> {
        let mut runner = Self {
            db,
            names: HashMap::new(),
        };

        for spec in &scenario.objects {
            if runner.names.contains_key(&spec.name) {
                bail!("object '{}' declared twice", spec.name);
            }
            let id = runner
                .db
                .instantiate_class(&spec.class)
                .with_context(|| format!("Failed to create object '{}'", spec.name))?;
            runner.names.insert(spec.name.clone(), id);
        }

        for spec in &scenario.objects {
            let id = runner.lookup(&spec.name)?;
            for (property, value) in &spec.properties {
                let value = runner.to_variant(value)?;
                if !runner.db.set(id, property, value) {
                    bail!("object '{}' has no property '{}'", spec.name, property);
                }
            }
        }

        for spec in &scenario.connections {
            let source = runner.lookup(&spec.source)?;
            let target = runner.lookup(&spec.target)?;
            let binds = runner.to_variants(&spec.binds)?;
            let flags = parse_flags(&spec.flags)?;
            runner
                .db
                .connect(source, &spec.signal, target, &spec.method, binds, flags)
                .with_context(|| {
                    format!(
                        "Failed to connect {}.{} to {}.{}",
                        spec.source, spec.signal, spec.target, spec.method
                    )
                })?;
        }

        Ok(runner)
    }

    /// Id of a declared object
    pub fn lookup(&self, name: &str) -> Result<ObjectId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| anyhow!("unknown object '{}'", name))
    }

    /// Run every step, stopping at the first hard error
    pub fn run(&mut self, steps: &[Step], trace: &mut dyn Trace) -> Result<()> {
        for (index, step) in steps.iter().enumerate() {
            self.run_step(index + 1, step, trace)
                .with_context(|| format!("step {} failed", index + 1))?;
        }
        Ok(())
    }

    fn run_step(&mut self, index: usize, step: &Step, trace: &mut dyn Trace) -> Result<()> {
        match step {
            Step::Call {
                object,
                method,
                args,
            } => {
                let id = self.lookup(object)?;
                let args = self.to_variants(args)?;
                let action = format!("call {}.{}", object, method);
                match self.db.call(id, method, &args) {
                    Ok(result) => trace.step(index, &action, &format!("-> {}", result)),
                    Err(err) => trace.step(index, &action, &format!("failed: {}", err)),
                }
            }
            Step::CallDeferred {
                object,
                method,
                args,
            } => {
                let id = self.lookup(object)?;
                let args = self.to_variants(args)?;
                self.db.call_deferred(id, method, args)?;
                trace.step(index, &format!("call_deferred {}.{}", object, method), "queued");
            }
            Step::Emit {
                object,
                signal,
                args,
            } => {
                let id = self.lookup(object)?;
                let args = self.to_variants(args)?;
                let detail = match self.db.emit_signal(id, signal, &args)? {
                    EmitStatus::Emitted { delivered } => format!("{} delivered", delivered),
                    EmitStatus::Blocked => "blocked".to_string(),
                };
                trace.step(index, &format!("emit {}.{}", object, signal), &detail);
            }
            Step::Set {
                object,
                property,
                value,
            } => {
                let id = self.lookup(object)?;
                let value = self.to_variant(value)?;
                let detail = if self.db.set(id, property, value.clone()) {
                    format!("= {}", value)
                } else {
                    "not handled".to_string()
                };
                trace.step(index, &format!("set {}.{}", object, property), &detail);
            }
            Step::Get { object, property } => {
                let id = self.lookup(object)?;
                let detail = match self.db.get(id, property) {
                    Some(value) => format!("= {}", value),
                    None => "not found".to_string(),
                };
                trace.step(index, &format!("get {}.{}", object, property), &detail);
            }
            Step::Disconnect {
                source,
                signal,
                target,
                method,
            } => {
                let source_id = self.lookup(source)?;
                let target_id = self.lookup(target)?;
                self.db.disconnect(source_id, signal, target_id, method)?;
                trace.step(
                    index,
                    &format!("disconnect {}.{}", source, signal),
                    &format!("from {}.{}", target, method),
                );
            }
            Step::Flush => {
                let executed = self.db.flush_deferred();
                trace.step(index, "flush", &format!("{} executed", executed));
            }
            Step::Free { object } => {
                let id = self.lookup(object)?;
                self.db.free(id)?;
                let detail = if self.db.is_alive(id) {
                    "deferred"
                } else {
                    "destroyed"
                };
                trace.step(index, &format!("free {}", object), detail);
            }
            Step::QueueFree { object } => {
                let id = self.lookup(object)?;
                self.db.queue_delete(id)?;
                trace.step(index, &format!("queue_free {}", object), "queued");
            }
            Step::Dump { object } => {
                let id = self.lookup(object)?;
                if !self.db.is_alive(id) {
                    trace.step(index, &format!("dump {}", object), "freed");
                    return Ok(());
                }
                let class = self.db.get_class(id).unwrap_or_default();
                trace.step(index, &format!("dump {}", object), class);
                for info in self.db.get_property_list(id) {
                    if info.is_category() {
                        trace.category(&info.name);
                        continue;
                    }
                    let value = self
                        .db
                        .get(id, &info.name)
                        .map_or_else(|| "<unreadable>".to_string(), |v| v.to_string());
                    trace.property(&info.name, &value);
                }
            }
        }
        Ok(())
    }

    fn to_variants(&self, values: &[toml::Value]) -> Result<Vec<Variant>> {
        values.iter().map(|value| self.to_variant(value)).collect()
    }

    fn to_variant(&self, value: &toml::Value) -> Result<Variant> {
        Ok(match value {
            toml::Value::String(text) => match text.strip_prefix('@') {
                Some(name) => Variant::Object(self.lookup(name)?),
                None => Variant::from(text.as_str()),
            },
            toml::Value::Integer(i) => Variant::Int(*i),
            toml::Value::Float(x) => Variant::Float(*x),
            toml::Value::Boolean(b) => Variant::Bool(*b),
            toml::Value::Datetime(dt) => Variant::from(dt.to_string()),
            toml::Value::Array(items) => {
                let array = Array::new();
                for item in items {
                    array.push(self.to_variant(item)?);
                }
                Variant::Array(array)
            }
            toml::Value::Table(table) => {
                let dict = Dictionary::new();
                for (key, item) in table {
                    dict.set(key.as_str(), self.to_variant(item)?);
                }
                Variant::Dictionary(dict)
            }
        })
    }
}

/// Parse connection flag names
pub fn parse_flags(names: &[String]) -> Result<ConnectFlags> {
    let mut flags = ConnectFlags::NONE;
    for name in names {
        flags |= match name.as_str() {
            "queued" | "deferred" => ConnectFlags::QUEUED,
            "persist" => ConnectFlags::PERSIST,
            "one_shot" | "oneshot" => ConnectFlags::ONE_SHOT,
            "reference_counted" => ConnectFlags::REFERENCE_COUNTED,
            other => bail!("unknown connection flag '{}'", other),
        };
    }
    Ok(flags)
}
