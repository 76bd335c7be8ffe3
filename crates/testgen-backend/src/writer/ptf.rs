//! PTF test classes for the bmv2 `simple_switch_grpc` harness.

use std::fmt::Write as _;

use testgen_model::object::{ActionCall, TableMatch};
use testgen_model::{TestObject, Value};

use super::{constant_bytes, dont_care_runs, hex_string, test_name, value_hex, WriteTest, WriterError};
use crate::config::TestBackendConfiguration;
use crate::registry::BackendKind;
use crate::spec::TestSpec;

const INDENT: &str = "    ";

#[derive(Debug, Clone)]
pub struct PtfWriter {
    pub(crate) config: TestBackendConfiguration,
}

impl PtfWriter {
    pub fn new(config: TestBackendConfiguration) -> Self {
        Self { config }
    }
}

impl WriteTest for PtfWriter {
    fn kind(&self) -> BackendKind {
        BackendKind::Ptf
    }

    fn file_extension(&self) -> &'static str {
        "py"
    }

    fn render(&self, spec: &TestSpec, test_id: u64) -> Result<String, WriterError> {
        let mut out = String::new();
        writeln!(out, "import ptf.testutils as testutils")?;
        writeln!(out, "from ptf.mask import Mask")?;
        writeln!(out, "from bmv2_base import AbstractTest")?;
        writeln!(out)?;
        writeln!(out)?;
        writeln!(out, "class Test{test_id}(AbstractTest):")?;
        writeln!(out, "{INDENT}\"\"\"{}\"\"\"", test_name(&self.config, test_id))?;
        if let Some(seed) = self.config.seed {
            writeln!(out, "{INDENT}# seed {seed}")?;
        }
        for event in spec.traces() {
            writeln!(out, "{INDENT}# {event}")?;
        }

        writeln!(out)?;
        writeln!(out, "{INDENT}def setupCtrlPlane(self):")?;
        let before = out.len();
        for objects in spec.test_objects().values() {
            for (name, object) in objects {
                write_object(&mut out, name, object)?;
            }
        }
        if out.len() == before {
            writeln!(out, "{INDENT}{INDENT}pass")?;
        }

        let ingress = spec.ingress_packet();
        writeln!(out)?;
        writeln!(out, "{INDENT}def sendPacket(self):")?;
        writeln!(
            out,
            "{INDENT}{INDENT}testutils.send_packet(self, {}, bytes.fromhex(\"{}\"))",
            ingress.port(),
            hex_string(&constant_bytes(ingress.payload()))
        )?;

        writeln!(out)?;
        writeln!(out, "{INDENT}def verifyPackets(self):")?;
        match spec.egress_packet() {
            Some(egress) => {
                writeln!(
                    out,
                    "{INDENT}{INDENT}exp_pkt = Mask(bytes.fromhex(\"{}\"))",
                    hex_string(&constant_bytes(egress.payload()))
                )?;
                for (offset, len) in dont_care_runs(egress) {
                    writeln!(out, "{INDENT}{INDENT}exp_pkt.set_do_not_care({offset}, {len})")?;
                }
                writeln!(out, "{INDENT}{INDENT}testutils.verify_packet(self, exp_pkt, {})", egress.port())?;
            }
            None => writeln!(out, "{INDENT}{INDENT}testutils.verify_no_other_packets(self)")?,
        }

        writeln!(out)?;
        writeln!(out, "{INDENT}def runTest(self):")?;
        writeln!(out, "{INDENT}{INDENT}self.setupCtrlPlane()")?;
        writeln!(out, "{INDENT}{INDENT}self.sendPacket()")?;
        writeln!(out, "{INDENT}{INDENT}self.verifyPackets()")?;
        Ok(out)
    }
}

fn action_tuple(action: &ActionCall<Value>) -> String {
    let args: Vec<String> = action
        .args
        .iter()
        .map(|arg| format!("(\"{}\", {})", arg.name, value_hex(&arg.value)))
        .collect();
    format!("(\"{}\", [{}])", action.action_name, args.join(", "))
}

fn match_expr(field: &str, m: &TableMatch<Value>) -> Option<String> {
    let rendered = match m {
        TableMatch::Exact { key } => format!("self.Exact(\"{field}\", {})", value_hex(key)),
        TableMatch::Ternary { key, mask } => {
            format!("self.Ternary(\"{field}\", {}, {})", value_hex(key), value_hex(mask))
        }
        TableMatch::Lpm { key, prefix_len } => {
            format!("self.Lpm(\"{field}\", {}, {})", value_hex(key), prefix_len)
        }
        TableMatch::Range { low, high } => {
            format!("self.Range(\"{field}\", {}, {})", value_hex(low), value_hex(high))
        }
        TableMatch::Optional { key, add_match } => {
            if !add_match {
                return None;
            }
            format!("self.Optional(\"{field}\", {})", value_hex(key))
        }
    };
    Some(rendered)
}

fn write_object(out: &mut String, name: &str, object: &TestObject) -> std::fmt::Result {
    let body = format!("{INDENT}{INDENT}");
    match object {
        TestObject::Table(table) => {
            for rule in &table.rules {
                let matches: Vec<String> = rule
                    .matches
                    .iter()
                    .filter_map(|(field, m)| match_expr(field, m))
                    .collect();
                writeln!(
                    out,
                    "{body}self.table_add((\"{}\", [{}]), {}, {})",
                    table.table_name,
                    matches.join(", "),
                    action_tuple(&rule.action),
                    rule.priority
                )?;
            }
        }
        TestObject::ActionProfile(profile) => {
            for (member, action) in profile.actions.iter().enumerate() {
                writeln!(
                    out,
                    "{body}self.action_profile_member_add(\"{}\", {member}, {})",
                    profile.profile_name,
                    action_tuple(action)
                )?;
            }
        }
        TestObject::ActionSelector(selector) => {
            let members: Vec<String> = (0..selector.action_profile.actions.len())
                .map(|m| m.to_string())
                .collect();
            writeln!(
                out,
                "{body}self.action_selector_group_add(\"{}\", \"{}\", [{}])",
                selector.selector_name,
                selector.action_profile.profile_name,
                members.join(", ")
            )?;
        }
        TestObject::CloneSpec(clone) => {
            if clone.is_clone {
                writeln!(
                    out,
                    "{body}self.insert_pre_clone_session({}, [{}])",
                    clone.session_id, clone.clone_port
                )?;
            }
        }
        TestObject::Meter(meter) => {
            for entry in &meter.entries {
                writeln!(
                    out,
                    "{body}self.meter_set_color(\"{}\", {}, {})",
                    meter.meter_name, entry.index, entry.color
                )?;
            }
        }
        TestObject::MetadataCollection(_) => {
            writeln!(out, "{body}# {name} is checked by the metadata back end")?;
        }
    }
    Ok(())
}
