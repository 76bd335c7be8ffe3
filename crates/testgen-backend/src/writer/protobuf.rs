//! `p4testgen.TestCase` messages in protobuf text format, with P4Runtime
//! entities addressed by numeric id.

use testgen_model::object::{ActionCall, TableConfig, TableMatch};
use testgen_model::{TestObject, Value};

use super::{constant_bytes, mask_bytes, test_name, ProtoText, WriteTest, WriterError};
use crate::config::TestBackendConfiguration;
use crate::program_info::{P4RuntimeApi, P4RuntimeEntity};
use crate::registry::BackendKind;
use crate::spec::TestSpec;

#[derive(Debug, Clone)]
pub struct ProtobufWriter {
    pub(crate) config: TestBackendConfiguration,
    runtime_api: P4RuntimeApi,
}

impl ProtobufWriter {
    pub fn new(config: TestBackendConfiguration, runtime_api: P4RuntimeApi) -> Self {
        Self { config, runtime_api }
    }

    pub fn runtime_api(&self) -> &P4RuntimeApi {
        &self.runtime_api
    }

    fn unknown(&self, entity: &'static str, name: &str) -> WriterError {
        WriterError::UnknownEntity {
            writer: BackendKind::Protobuf,
            entity,
            name: name.to_string(),
        }
    }

    fn write_action(&self, proto: &mut ProtoText, action: &ActionCall<Value>) -> Result<(), WriterError> {
        let info = self
            .runtime_api
            .action(&action.action_name)
            .ok_or_else(|| self.unknown("action", &action.action_name))?;
        proto.open("action");
        proto.scalar("action_id", info.id);
        for arg in &action.args {
            let param_id = info
                .member_id(&arg.name)
                .ok_or_else(|| self.unknown("action parameter", &arg.name))?;
            proto.open("params");
            proto.scalar("param_id", param_id);
            proto.bytes("value", &constant_bytes(&arg.value.clone().into_bits()));
            proto.close();
        }
        proto.close();
        Ok(())
    }

    fn write_table(&self, proto: &mut ProtoText, table: &TableConfig<Value>) -> Result<(), WriterError> {
        let info = self
            .runtime_api
            .table(&table.table_name)
            .ok_or_else(|| self.unknown("table", &table.table_name))?;
        for rule in &table.rules {
            proto.open("entities");
            proto.open("table_entry");
            proto.scalar("table_id", info.id);
            for (field, m) in &rule.matches {
                self.write_match(proto, info, field, m)?;
            }
            proto.open("action");
            self.write_action(proto, &rule.action)?;
            proto.close();
            if rule.priority != 0 {
                proto.scalar("priority", rule.priority);
            }
            proto.close();
            proto.close();
        }
        Ok(())
    }

    fn write_match(
        &self,
        proto: &mut ProtoText,
        table: &P4RuntimeEntity,
        field: &str,
        m: &TableMatch<Value>,
    ) -> Result<(), WriterError> {
        if matches!(m, TableMatch::Optional { add_match: false, .. }) {
            return Ok(());
        }
        let field_id = table
            .member_id(field)
            .ok_or_else(|| self.unknown("match field", field))?;
        let bytes = |v: &Value| constant_bytes(&v.clone().into_bits());
        proto.open("match");
        proto.scalar("field_id", field_id);
        match m {
            TableMatch::Exact { key } => {
                proto.open("exact");
                proto.bytes("value", &bytes(key));
            }
            TableMatch::Ternary { key, mask } => {
                proto.open("ternary");
                proto.bytes("value", &bytes(key));
                proto.bytes("mask", &bytes(mask));
            }
            TableMatch::Lpm { key, prefix_len } => {
                proto.open("lpm");
                proto.bytes("value", &bytes(key));
                proto.scalar("prefix_len", prefix_len);
            }
            TableMatch::Range { low, high } => {
                proto.open("range");
                proto.bytes("low", &bytes(low));
                proto.bytes("high", &bytes(high));
            }
            TableMatch::Optional { key, .. } => {
                proto.open("optional");
                proto.bytes("value", &bytes(key));
            }
        }
        proto.close();
        proto.close();
        Ok(())
    }

    fn write_object(&self, proto: &mut ProtoText, name: &str, object: &TestObject) -> Result<(), WriterError> {
        match object {
            TestObject::Table(table) => self.write_table(proto, table)?,
            TestObject::ActionProfile(profile) => {
                let info = self
                    .runtime_api
                    .action_profile(&profile.profile_name)
                    .ok_or_else(|| self.unknown("action profile", &profile.profile_name))?;
                for (member, action) in profile.actions.iter().enumerate() {
                    proto.open("entities");
                    proto.open("action_profile_member");
                    proto.scalar("action_profile_id", info.id);
                    proto.scalar("member_id", member);
                    self.write_action(proto, action)?;
                    proto.close();
                    proto.close();
                }
            }
            TestObject::ActionSelector(selector) => {
                let profile = &selector.action_profile.profile_name;
                let info = self
                    .runtime_api
                    .action_profile(profile)
                    .ok_or_else(|| self.unknown("action profile", profile))?;
                proto.open("entities");
                proto.open("action_profile_group");
                proto.scalar("action_profile_id", info.id);
                for member in 0..selector.action_profile.actions.len() {
                    proto.open("members");
                    proto.scalar("member_id", member);
                    proto.scalar("weight", 1);
                    proto.close();
                }
                proto.close();
                proto.close();
            }
            TestObject::CloneSpec(clone) => {
                if clone.is_clone {
                    proto.open("entities");
                    proto.open("packet_replication_engine_entry");
                    proto.open("clone_session_entry");
                    proto.scalar("session_id", &clone.session_id);
                    proto.open("replicas");
                    proto.scalar("egress_port", &clone.clone_port);
                    proto.scalar("instance", 1);
                    proto.close();
                    proto.close();
                    proto.close();
                    proto.close();
                }
            }
            TestObject::Meter(meter) => {
                for entry in &meter.entries {
                    proto.comment(&format!("meter {}[{}] color {}", meter.meter_name, entry.index, entry.color));
                }
            }
            TestObject::MetadataCollection(_) => proto.comment(&format!("{name} omitted")),
        }
        Ok(())
    }
}

impl WriteTest for ProtobufWriter {
    fn kind(&self) -> BackendKind {
        BackendKind::Protobuf
    }

    fn file_extension(&self) -> &'static str {
        "txtpb"
    }

    fn render(&self, spec: &TestSpec, test_id: u64) -> Result<String, WriterError> {
        let mut proto = ProtoText::new();
        proto.comment("proto-file: p4testgen.proto");
        proto.comment("proto-message: p4testgen.TestCase");
        proto.blank();
        proto.comment(&test_name(&self.config, test_id));
        if let Some(seed) = self.config.seed {
            proto.comment(&format!("seed {seed}"));
        }

        let ingress = spec.ingress_packet();
        proto.open("input_packet");
        proto.bytes("packet", &constant_bytes(ingress.payload()));
        proto.scalar("port", ingress.port());
        proto.close();

        if let Some(egress) = spec.egress_packet() {
            proto.open("expected_output_packet");
            proto.bytes("packet", &constant_bytes(egress.payload()));
            proto.scalar("port", egress.port());
            proto.bytes("packet_mask", &mask_bytes(egress));
            proto.close();
        }

        for objects in spec.test_objects().values() {
            for (name, object) in objects {
                self.write_object(&mut proto, name, object)?;
            }
        }

        for event in spec.traces() {
            proto.string("traces", &event.to_string());
        }
        Ok(proto.finish())
    }
}
