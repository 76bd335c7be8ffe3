//! JSON documents listing the concrete local metadata of each test.

use std::collections::BTreeMap;

use serde::Serialize;
use testgen_model::object::METADATA_COLLECTION;
use testgen_model::TestObject;

use super::{constant_bytes, hex_string, test_name, value_hex, WriteTest, WriterError};
use crate::config::TestBackendConfiguration;
use crate::registry::BackendKind;
use crate::spec::TestSpec;

#[derive(Debug, Clone)]
pub struct MetadataWriter {
    pub(crate) config: TestBackendConfiguration,
}

impl MetadataWriter {
    pub fn new(config: TestBackendConfiguration) -> Self {
        Self { config }
    }
}

#[derive(Serialize)]
struct MetadataDocument<'a> {
    test_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    input_port: u64,
    input_packet: String,
    dropped: bool,
    metadata: BTreeMap<&'a str, String>,
    traces: Vec<String>,
}

impl WriteTest for MetadataWriter {
    fn kind(&self) -> BackendKind {
        BackendKind::Metadata
    }

    fn file_extension(&self) -> &'static str {
        "json"
    }

    fn render(&self, spec: &TestSpec, test_id: u64) -> Result<String, WriterError> {
        let ingress = spec.ingress_packet();
        let metadata = match spec.test_object(METADATA_COLLECTION, METADATA_COLLECTION) {
            Some(TestObject::MetadataCollection(collection)) => collection
                .fields()
                .iter()
                .map(|(name, value)| (name.as_str(), value_hex(value)))
                .collect(),
            _ => BTreeMap::new(),
        };
        let doc = MetadataDocument {
            test_name: test_name(&self.config, test_id),
            seed: self.config.seed,
            input_port: ingress.port().as_u64().unwrap_or_default(),
            input_packet: hex_string(&constant_bytes(ingress.payload())),
            dropped: spec.egress_packet().is_none(),
            metadata,
            traces: spec.traces().iter().map(ToString::to_string).collect(),
        };
        Ok(serde_json::to_string_pretty(&doc)?)
    }
}
