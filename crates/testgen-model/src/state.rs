use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use testgen_ir::{Expr, StateRef};

use crate::object::{TestObjectCategory, UninterpretedObject};
use crate::trace::TraceEvent;

/// Property set when a path drops its packet.
pub const DROP_PROPERTY: &str = "drop";

/// Width of a bmv2 port.
pub const PORT_WIDTH: u32 = 9;

static EMPTY_CATEGORY: BTreeMap<String, UninterpretedObject> = BTreeMap::new();

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StateError {
    #[error("Unknown state reference: {0}")]
    UnknownReference(String),
}

/// The symbolic state of one finished path.
///
/// Exploration builds it up; once handed to test generation it is only read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StateDocument", into = "StateDocument")]
pub struct ExecutionState {
    /// Current expression of every scalar variable or field.
    env: BTreeMap<StateRef, Expr>,
    input_packet: Expr,
    input_port: Expr,
    /// Concrete path properties such as `drop`.
    properties: BTreeMap<String, bool>,
    trace: Vec<TraceEvent>,
    /// Uninterpreted objects keyed by category, then by name.
    test_objects: BTreeMap<TestObjectCategory, BTreeMap<String, UninterpretedObject>>,
}

impl ExecutionState {
    /// An empty state with a zero-length input packet on port 0.
    pub fn new() -> Self {
        Self {
            env: BTreeMap::new(),
            input_packet: Expr::Concat(Vec::new()),
            input_port: Expr::constant(PORT_WIDTH, 0),
            properties: BTreeMap::new(),
            trace: Vec::new(),
            test_objects: BTreeMap::new(),
        }
    }

    /// Current expression of `var`.
    pub fn get(&self, var: &StateRef) -> Result<&Expr, StateError> {
        self.env
            .get(var)
            .ok_or_else(|| StateError::UnknownReference(var.to_string()))
    }

    pub fn set(&mut self, var: StateRef, value: Expr) {
        self.env.insert(var, value);
    }

    /// All scalar field references below `root`, in reference order.
    ///
    /// Intermediate composites are skipped: only references without
    /// descendants of their own are returned.
    pub fn flat_fields(&self, root: &StateRef) -> Vec<StateRef> {
        let candidates: Vec<&StateRef> = self
            .env
            .keys()
            .filter(|field| field.is_rooted_at(root))
            .collect();
        candidates
            .iter()
            .filter(|field| !candidates.iter().any(|other| other.is_rooted_at(field)))
            .map(|field| (*field).clone())
            .collect()
    }

    pub fn input_packet(&self) -> &Expr {
        &self.input_packet
    }

    pub fn set_input_packet(&mut self, packet: Expr) {
        self.input_packet = packet;
    }

    pub fn input_port(&self) -> &Expr {
        &self.input_port
    }

    pub fn set_input_port(&mut self, port: Expr) {
        self.input_port = port;
    }

    pub fn property(&self, name: &str) -> Option<bool> {
        self.properties.get(name).copied()
    }

    pub fn set_property(&mut self, name: &str, value: bool) {
        self.properties.insert(name.to_string(), value);
    }

    pub fn is_dropped(&self) -> bool {
        self.property(DROP_PROPERTY).unwrap_or(false)
    }

    pub fn trace_events(&self) -> &[TraceEvent] {
        &self.trace
    }

    pub fn add_trace_event(&mut self, event: TraceEvent) {
        self.trace.push(event);
    }

    /// File `object` under `name` in the category its variant belongs to.
    /// Returns the object previously stored under that name, if any.
    pub fn add_test_object(&mut self, name: &str, object: UninterpretedObject) -> Option<UninterpretedObject> {
        self.test_objects
            .entry(object.category())
            .or_default()
            .insert(name.to_string(), object)
    }

    /// All objects of `category`, ordered by name. Empty when none were recorded.
    pub fn test_object_category(&self, category: TestObjectCategory) -> &BTreeMap<String, UninterpretedObject> {
        self.test_objects.get(&category).unwrap_or(&EMPTY_CATEGORY)
    }

    pub fn test_object_count(&self) -> usize {
        self.test_objects.values().map(BTreeMap::len).sum()
    }
}

impl Default for ExecutionState {
    fn default() -> Self {
        Self::new()
    }
}

// ── Serialized form ──────────────────────────────────────────────────

/// On-disk form. Objects are listed flat and re-filed through
/// `add_test_object` on load, so their category always follows the variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StateDocument {
    #[serde(default)]
    env: BTreeMap<StateRef, Expr>,
    input_packet: Expr,
    input_port: Expr,
    #[serde(default)]
    properties: BTreeMap<String, bool>,
    #[serde(default)]
    trace: Vec<TraceEvent>,
    #[serde(default)]
    test_objects: Vec<NamedObject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NamedObject {
    name: String,
    object: UninterpretedObject,
}

impl From<StateDocument> for ExecutionState {
    fn from(doc: StateDocument) -> Self {
        let mut state = ExecutionState {
            env: doc.env,
            input_packet: doc.input_packet,
            input_port: doc.input_port,
            properties: doc.properties,
            trace: doc.trace,
            test_objects: BTreeMap::new(),
        };
        for named in doc.test_objects {
            state.add_test_object(&named.name, named.object);
        }
        state
    }
}

impl From<ExecutionState> for StateDocument {
    fn from(state: ExecutionState) -> Self {
        let test_objects = state
            .test_objects
            .into_values()
            .flat_map(|objects| objects.into_iter())
            .map(|(name, object)| NamedObject { name, object })
            .collect();
        StateDocument {
            env: state.env,
            input_packet: state.input_packet,
            input_port: state.input_port,
            properties: state.properties,
            trace: state.trace,
            test_objects,
        }
    }
}
