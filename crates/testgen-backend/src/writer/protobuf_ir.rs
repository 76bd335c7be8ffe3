//! Protobuf text format addressed by P4 names instead of P4Runtime ids.
//! Values are hex strings sized to their P4 type.

use testgen_model::object::{ActionCall, TableConfig, TableMatch};
use testgen_model::{TestObject, Value};

use super::{constant_hex, hex_string, mask_bytes, test_name, value_hex, ProtoText, WriteTest, WriterError};
use crate::config::TestBackendConfiguration;
use crate::program_info::P4RuntimeApi;
use crate::registry::BackendKind;
use crate::spec::TestSpec;

#[derive(Debug, Clone)]
pub struct ProtobufIrWriter {
    pub(crate) config: TestBackendConfiguration,
    runtime_api: P4RuntimeApi,
}

impl ProtobufIrWriter {
    pub fn new(config: TestBackendConfiguration, runtime_api: P4RuntimeApi) -> Self {
        Self { config, runtime_api }
    }

    pub fn runtime_api(&self) -> &P4RuntimeApi {
        &self.runtime_api
    }

    fn write_action(proto: &mut ProtoText, action: &ActionCall<Value>) {
        proto.open("action");
        proto.string("name", &action.action_name);
        for arg in &action.args {
            proto.open("params");
            proto.string("name", &arg.name);
            proto.string("value", &value_hex(&arg.value));
            proto.close();
        }
        proto.close();
    }

    fn write_table(&self, proto: &mut ProtoText, table: &TableConfig<Value>) -> Result<(), WriterError> {
        if self.runtime_api.table(&table.table_name).is_none() && !self.runtime_api.tables.is_empty() {
            return Err(WriterError::UnknownEntity {
                writer: BackendKind::ProtobufIr,
                entity: "table",
                name: table.table_name.clone(),
            });
        }
        for rule in &table.rules {
            proto.open("entities");
            proto.open("table_entry");
            proto.string("table_name", &table.table_name);
            for (field, m) in &rule.matches {
                write_match(proto, field, m);
            }
            Self::write_action(proto, &rule.action);
            if rule.priority != 0 {
                proto.scalar("priority", rule.priority);
            }
            proto.close();
            proto.close();
        }
        Ok(())
    }
}

fn write_match(proto: &mut ProtoText, field: &str, m: &TableMatch<Value>) {
    if matches!(m, TableMatch::Optional { add_match: false, .. }) {
        return;
    }
    proto.open("matches");
    proto.string("name", field);
    match m {
        TableMatch::Exact { key } => {
            proto.open("exact");
            proto.string("value", &value_hex(key));
        }
        TableMatch::Ternary { key, mask } => {
            proto.open("ternary");
            proto.string("value", &value_hex(key));
            proto.string("mask", &value_hex(mask));
        }
        TableMatch::Lpm { key, prefix_len } => {
            proto.open("lpm");
            proto.string("value", &value_hex(key));
            proto.scalar("prefix_length", prefix_len);
        }
        TableMatch::Range { low, high } => {
            proto.open("range");
            proto.string("low", &value_hex(low));
            proto.string("high", &value_hex(high));
        }
        TableMatch::Optional { key, .. } => {
            proto.open("optional");
            proto.string("value", &value_hex(key));
        }
    }
    proto.close();
    proto.close();
}

impl WriteTest for ProtobufIrWriter {
    fn kind(&self) -> BackendKind {
        BackendKind::ProtobufIr
    }

    fn file_extension(&self) -> &'static str {
        "txtpb"
    }

    fn render(&self, spec: &TestSpec, test_id: u64) -> Result<String, WriterError> {
        let mut proto = ProtoText::new();
        proto.comment("proto-file: p4testgen_ir.proto");
        proto.comment("proto-message: p4testgen_ir.TestCase");
        proto.blank();
        proto.comment(&test_name(&self.config, test_id));

        let ingress = spec.ingress_packet();
        proto.open("input_packet");
        proto.string("packet", &constant_hex(ingress.payload()));
        proto.scalar("port", ingress.port());
        proto.close();

        if let Some(egress) = spec.egress_packet() {
            proto.open("expected_output_packet");
            proto.string("packet", &constant_hex(egress.payload()));
            proto.scalar("port", egress.port());
            proto.string("packet_mask", &format!("0x{}", hex_string(&mask_bytes(egress))));
            proto.close();
        }

        for objects in spec.test_objects().values() {
            for (name, object) in objects {
                match object {
                    TestObject::Table(table) => self.write_table(&mut proto, table)?,
                    TestObject::ActionProfile(profile) => {
                        proto.open("entities");
                        proto.open("action_profile");
                        proto.string("name", &profile.profile_name);
                        for action in &profile.actions {
                            Self::write_action(&mut proto, action);
                        }
                        proto.close();
                        proto.close();
                    }
                    TestObject::ActionSelector(selector) => {
                        proto.open("entities");
                        proto.open("action_selector");
                        proto.string("name", &selector.selector_name);
                        proto.string("action_profile", &selector.action_profile.profile_name);
                        proto.close();
                        proto.close();
                    }
                    TestObject::CloneSpec(clone) => {
                        if clone.is_clone {
                            proto.open("entities");
                            proto.open("clone_session");
                            proto.string("session_id", &value_hex(&clone.session_id));
                            proto.string("egress_port", &value_hex(&clone.clone_port));
                            proto.close();
                            proto.close();
                        }
                    }
                    TestObject::Meter(meter) => {
                        for entry in &meter.entries {
                            proto.open("entities");
                            proto.open("meter_entry");
                            proto.string("name", &meter.meter_name);
                            proto.string("index", &value_hex(&entry.index));
                            proto.string("color", &value_hex(&entry.color));
                            proto.close();
                            proto.close();
                        }
                    }
                    TestObject::MetadataCollection(_) => proto.comment(&format!("{name} omitted")),
                }
            }
        }

        for event in spec.traces() {
            proto.string("traces", &event.to_string());
        }
        Ok(proto.finish())
    }
}
