//! Simple Test Framework scripts, as consumed by the bmv2 `stf` runner.

use std::fmt::Write as _;

use testgen_model::object::{TableConfig, TableMatch};
use testgen_model::{TestObject, Value};

use super::{masked_hex, test_name, value_hex, WriteTest, WriterError};
use crate::config::TestBackendConfiguration;
use crate::registry::BackendKind;
use crate::spec::TestSpec;

#[derive(Debug, Clone)]
pub struct StfWriter {
    pub(crate) config: TestBackendConfiguration,
}

impl StfWriter {
    pub fn new(config: TestBackendConfiguration) -> Self {
        Self { config }
    }
}

impl WriteTest for StfWriter {
    fn kind(&self) -> BackendKind {
        BackendKind::Stf
    }

    fn file_extension(&self) -> &'static str {
        "stf"
    }

    fn render(&self, spec: &TestSpec, test_id: u64) -> Result<String, WriterError> {
        let mut out = String::new();
        writeln!(out, "# {}", test_name(&self.config, test_id))?;
        if let Some(seed) = self.config.seed {
            writeln!(out, "# seed {seed}")?;
        }
        for event in spec.traces() {
            writeln!(out, "# {event}")?;
        }
        writeln!(out)?;

        for objects in spec.test_objects().values() {
            for (name, object) in objects {
                write_object(&mut out, name, object)?;
            }
        }

        let ingress = spec.ingress_packet();
        writeln!(out, "packet {} {}", ingress.port(), masked_hex(ingress))?;
        match spec.egress_packet() {
            Some(egress) => writeln!(out, "expect {} {}$", egress.port(), masked_hex(egress))?,
            None => writeln!(out, "# packet dropped")?,
        }
        Ok(out)
    }
}

fn write_object(out: &mut String, name: &str, object: &TestObject) -> std::fmt::Result {
    match object {
        TestObject::Table(table) => write_table(out, table),
        TestObject::CloneSpec(clone) if clone.is_clone => {
            writeln!(out, "mirroring_add {} {}", clone.session_id, clone.clone_port)
        }
        TestObject::CloneSpec(_) => Ok(()),
        TestObject::ActionProfile(profile) => {
            writeln!(out, "# action profile {name}: {} member(s)", profile.actions.len())
        }
        TestObject::ActionSelector(selector) => writeln!(
            out,
            "# action selector {name} over {}",
            selector.action_profile.profile_name
        ),
        TestObject::Meter(meter) => {
            for entry in &meter.entries {
                writeln!(out, "# meter {}[{}] = {}", meter.meter_name, entry.index, entry.color)?;
            }
            Ok(())
        }
        TestObject::MetadataCollection(collection) => {
            for (field, value) in collection.fields() {
                writeln!(out, "# {field} = {}", value_hex(value))?;
            }
            Ok(())
        }
    }
}

fn write_table(out: &mut String, table: &TableConfig<Value>) -> std::fmt::Result {
    for rule in &table.rules {
        write!(out, "add {}", table.table_name)?;
        if rule.priority != 0 {
            write!(out, " {}", rule.priority)?;
        }
        for (field, m) in &rule.matches {
            match m {
                TableMatch::Exact { key } => write!(out, " {field}:{}", value_hex(key))?,
                TableMatch::Ternary { key, mask } => {
                    write!(out, " {field}:{}&&&{}", value_hex(key), value_hex(mask))?
                }
                TableMatch::Lpm { key, prefix_len } => {
                    write!(out, " {field}:{}/{}", value_hex(key), prefix_len)?
                }
                TableMatch::Range { low, high } => {
                    write!(out, " {field}:{}->{}", value_hex(low), value_hex(high))?
                }
                TableMatch::Optional { key, add_match } => {
                    if *add_match {
                        write!(out, " {field}:{}", value_hex(key))?
                    }
                }
            }
        }
        let args: Vec<String> = rule
            .action
            .args
            .iter()
            .map(|arg| format!("{}:{}", arg.name, value_hex(&arg.value)))
            .collect();
        writeln!(out, " {}({})", rule.action.action_name, args.join(","))?;
    }
    Ok(())
}
