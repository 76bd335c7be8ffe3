use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use testgen_ir::Constant;
use testgen_model::{TestObject, TraceEvent};

/// A packet on a port, with a care mask over its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    port: Constant,
    payload: Constant,
    mask: Constant,
}

impl Packet {
    pub fn new(port: Constant, payload: Constant, mask: Constant) -> Self {
        Self { port, payload, mask }
    }

    pub fn port(&self) -> &Constant {
        &self.port
    }

    pub fn payload(&self) -> &Constant {
        &self.payload
    }

    pub fn mask(&self) -> &Constant {
        &self.mask
    }

    /// Whether payload bit `index` must match. A mask narrower than the
    /// payload, like the 1-bit ingress mask, asserts every bit.
    pub fn is_asserted(&self, index: u32) -> bool {
        if self.mask.width() != self.payload.width() {
            return !self.mask.is_zero();
        }
        self.mask.bit(index)
    }
}

/// One concrete test: what to send, what to expect, and the control-plane
/// objects to install first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSpec {
    ingress: Packet,
    egress: Option<Packet>,
    traces: Vec<TraceEvent>,
    /// Category key to object name to object.
    test_objects: BTreeMap<String, BTreeMap<String, TestObject>>,
}

impl TestSpec {
    pub fn new(ingress: Packet, egress: Option<Packet>, traces: Vec<TraceEvent>) -> Self {
        Self {
            ingress,
            egress,
            traces,
            test_objects: BTreeMap::new(),
        }
    }

    /// Insert or replace an object. Only synthesis populates a spec.
    pub(crate) fn add_test_object(&mut self, category: &str, name: &str, object: TestObject) {
        self.test_objects
            .entry(category.to_string())
            .or_default()
            .insert(name.to_string(), object);
    }

    pub fn ingress_packet(&self) -> &Packet {
        &self.ingress
    }

    /// `None` when the program drops the packet.
    pub fn egress_packet(&self) -> Option<&Packet> {
        self.egress.as_ref()
    }

    pub fn traces(&self) -> &[TraceEvent] {
        &self.traces
    }

    pub fn test_object(&self, category: &str, name: &str) -> Option<&TestObject> {
        self.test_objects.get(category)?.get(name)
    }

    pub fn test_object_category(&self, category: &str) -> Option<&BTreeMap<String, TestObject>> {
        self.test_objects.get(category)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.test_objects.keys().map(String::as_str)
    }

    pub fn test_objects(&self) -> &BTreeMap<String, BTreeMap<String, TestObject>> {
        &self.test_objects
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
