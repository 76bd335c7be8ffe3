//! Test objects gathered along a path.
//!
//! Every object type is generic over the value it carries. With the default
//! `Expr` parameter it is the uninterpreted form recorded during exploration;
//! `Evaluate` turns it into the same shape over `Value`, which by
//! construction holds no symbolic content.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use testgen_ir::Expr;

use crate::model::{Completion, Model, ModelEvalError, Value};

/// Category and object name of the single metadata collection.
pub const METADATA_COLLECTION: &str = "metadata_collection";

// ── Categories ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TestObjectCategory {
    #[serde(rename = "tableconfigs")]
    TableConfigs,
    #[serde(rename = "action_profile")]
    ActionProfile,
    #[serde(rename = "action_selector")]
    ActionSelector,
    #[serde(rename = "clone_specs")]
    CloneSpecs,
    #[serde(rename = "meter_values")]
    MeterValues,
}

impl TestObjectCategory {
    /// Evaluation order used when building a test spec.
    pub const ALL: [TestObjectCategory; 5] = [
        TestObjectCategory::TableConfigs,
        TestObjectCategory::ActionProfile,
        TestObjectCategory::ActionSelector,
        TestObjectCategory::CloneSpecs,
        TestObjectCategory::MeterValues,
    ];

    /// Key under which exploration files objects of this category.
    pub fn state_key(self) -> &'static str {
        match self {
            TestObjectCategory::TableConfigs => "tableconfigs",
            TestObjectCategory::ActionProfile => "action_profile",
            TestObjectCategory::ActionSelector => "action_selector",
            TestObjectCategory::CloneSpecs => "clone_specs",
            TestObjectCategory::MeterValues => "meter_values",
        }
    }

    /// Key under which the concrete objects appear in a test spec.
    pub fn spec_key(self) -> &'static str {
        match self {
            TestObjectCategory::TableConfigs => "tables",
            TestObjectCategory::ActionProfile => "action_profiles",
            TestObjectCategory::ActionSelector => "action_selectors",
            TestObjectCategory::CloneSpecs => "clone_specs",
            TestObjectCategory::MeterValues => "meter_values",
        }
    }
}

impl fmt::Display for TestObjectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TestObjectCategory::TableConfigs => "table configurations",
            TestObjectCategory::ActionProfile => "action-profile groups",
            TestObjectCategory::ActionSelector => "action-selector groups",
            TestObjectCategory::CloneSpecs => "clone-session specs",
            TestObjectCategory::MeterValues => "meter configurations",
        };
        f.write_str(name)
    }
}

// ── Evaluation ───────────────────────────────────────────────────────

/// Resolve an uninterpreted object against a solved model.
pub trait Evaluate {
    type Concrete;

    fn evaluate(&self, model: &Model, completion: Completion) -> Result<Self::Concrete, ModelEvalError>;
}

impl Evaluate for Expr {
    type Concrete = Value;

    fn evaluate(&self, model: &Model, completion: Completion) -> Result<Value, ModelEvalError> {
        model.evaluate(self, completion)
    }
}

fn evaluate_all<T: Evaluate>(
    items: &[T],
    model: &Model,
    completion: Completion,
) -> Result<Vec<T::Concrete>, ModelEvalError> {
    items.iter().map(|item| item.evaluate(model, completion)).collect()
}

// ── Tables ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TableMatch<V = Expr> {
    Exact { key: V },
    Ternary { key: V, mask: V },
    Lpm { key: V, prefix_len: V },
    Range { low: V, high: V },
    Optional { key: V, add_match: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionArg<V = Expr> {
    pub name: String,
    pub value: V,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionCall<V = Expr> {
    pub action_name: String,
    #[serde(default = "Vec::new")]
    pub args: Vec<ActionArg<V>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRule<V = Expr> {
    /// Key field name to match.
    pub matches: BTreeMap<String, TableMatch<V>>,
    pub priority: i32,
    pub action: ActionCall<V>,
    #[serde(default)]
    pub ttl: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableConfig<V = Expr> {
    pub table_name: String,
    pub rules: Vec<TableRule<V>>,
}

impl Evaluate for TableMatch {
    type Concrete = TableMatch<Value>;

    fn evaluate(&self, model: &Model, completion: Completion) -> Result<Self::Concrete, ModelEvalError> {
        let eval = |e: &Expr| model.evaluate(e, completion);
        let concrete = match self {
            TableMatch::Exact { key } => TableMatch::Exact { key: eval(key)? },
            TableMatch::Ternary { key, mask } => TableMatch::Ternary {
                key: eval(key)?,
                mask: eval(mask)?,
            },
            TableMatch::Lpm { key, prefix_len } => TableMatch::Lpm {
                key: eval(key)?,
                prefix_len: eval(prefix_len)?,
            },
            TableMatch::Range { low, high } => TableMatch::Range {
                low: eval(low)?,
                high: eval(high)?,
            },
            TableMatch::Optional { key, add_match } => TableMatch::Optional {
                key: eval(key)?,
                add_match: *add_match,
            },
        };
        Ok(concrete)
    }
}

impl Evaluate for ActionArg {
    type Concrete = ActionArg<Value>;

    fn evaluate(&self, model: &Model, completion: Completion) -> Result<Self::Concrete, ModelEvalError> {
        Ok(ActionArg {
            name: self.name.clone(),
            value: model.evaluate(&self.value, completion)?,
        })
    }
}

impl Evaluate for ActionCall {
    type Concrete = ActionCall<Value>;

    fn evaluate(&self, model: &Model, completion: Completion) -> Result<Self::Concrete, ModelEvalError> {
        Ok(ActionCall {
            action_name: self.action_name.clone(),
            args: evaluate_all(&self.args, model, completion)?,
        })
    }
}

impl Evaluate for TableRule {
    type Concrete = TableRule<Value>;

    fn evaluate(&self, model: &Model, completion: Completion) -> Result<Self::Concrete, ModelEvalError> {
        let mut matches = BTreeMap::new();
        for (field, m) in &self.matches {
            matches.insert(field.clone(), m.evaluate(model, completion)?);
        }
        Ok(TableRule {
            matches,
            priority: self.priority,
            action: self.action.evaluate(model, completion)?,
            ttl: self.ttl,
        })
    }
}

impl Evaluate for TableConfig {
    type Concrete = TableConfig<Value>;

    fn evaluate(&self, model: &Model, completion: Completion) -> Result<Self::Concrete, ModelEvalError> {
        Ok(TableConfig {
            table_name: self.table_name.clone(),
            rules: evaluate_all(&self.rules, model, completion)?,
        })
    }
}

// ── Action profiles and selectors ────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionProfile<V = Expr> {
    pub profile_name: String,
    pub actions: Vec<ActionCall<V>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSelector<V = Expr> {
    pub selector_name: String,
    pub action_profile: ActionProfile<V>,
}

impl Evaluate for ActionProfile {
    type Concrete = ActionProfile<Value>;

    fn evaluate(&self, model: &Model, completion: Completion) -> Result<Self::Concrete, ModelEvalError> {
        Ok(ActionProfile {
            profile_name: self.profile_name.clone(),
            actions: evaluate_all(&self.actions, model, completion)?,
        })
    }
}

impl Evaluate for ActionSelector {
    type Concrete = ActionSelector<Value>;

    fn evaluate(&self, model: &Model, completion: Completion) -> Result<Self::Concrete, ModelEvalError> {
        Ok(ActionSelector {
            selector_name: self.selector_name.clone(),
            action_profile: self.action_profile.evaluate(model, completion)?,
        })
    }
}

// ── Clone sessions ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloneSpec<V = Expr> {
    pub session_id: V,
    pub clone_port: V,
    /// False when the session exists but the path did not clone.
    pub is_clone: bool,
}

impl Evaluate for CloneSpec {
    type Concrete = CloneSpec<Value>;

    fn evaluate(&self, model: &Model, completion: Completion) -> Result<Self::Concrete, ModelEvalError> {
        Ok(CloneSpec {
            session_id: model.evaluate(&self.session_id, completion)?,
            clone_port: model.evaluate(&self.clone_port, completion)?,
            is_clone: self.is_clone,
        })
    }
}

// ── Meters ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterEntry<V = Expr> {
    pub index: V,
    pub color: V,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterValue<V = Expr> {
    pub meter_name: String,
    pub is_direct: bool,
    pub entries: Vec<MeterEntry<V>>,
}

impl Evaluate for MeterEntry {
    type Concrete = MeterEntry<Value>;

    fn evaluate(&self, model: &Model, completion: Completion) -> Result<Self::Concrete, ModelEvalError> {
        Ok(MeterEntry {
            index: model.evaluate(&self.index, completion)?,
            color: model.evaluate(&self.color, completion)?,
        })
    }
}

impl Evaluate for MeterValue {
    type Concrete = MeterValue<Value>;

    fn evaluate(&self, model: &Model, completion: Completion) -> Result<Self::Concrete, ModelEvalError> {
        Ok(MeterValue {
            meter_name: self.meter_name.clone(),
            is_direct: self.is_direct,
            entries: evaluate_all(&self.entries, model, completion)?,
        })
    }
}

// ── Metadata ─────────────────────────────────────────────────────────

/// Concrete values of the local metadata fields, keyed by display name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataCollection {
    fields: BTreeMap<String, Value>,
}

impl MetadataCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_field(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// ── Tagged unions ────────────────────────────────────────────────────

/// An object recorded during exploration, still holding symbolic fields.
///
/// The variant fixes the category, so the store can never file an object
/// under a category it does not belong to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UninterpretedObject {
    Table(TableConfig),
    ActionProfile(ActionProfile),
    ActionSelector(ActionSelector),
    CloneSpec(CloneSpec),
    Meter(MeterValue),
}

impl UninterpretedObject {
    pub fn category(&self) -> TestObjectCategory {
        match self {
            UninterpretedObject::Table(_) => TestObjectCategory::TableConfigs,
            UninterpretedObject::ActionProfile(_) => TestObjectCategory::ActionProfile,
            UninterpretedObject::ActionSelector(_) => TestObjectCategory::ActionSelector,
            UninterpretedObject::CloneSpec(_) => TestObjectCategory::CloneSpecs,
            UninterpretedObject::Meter(_) => TestObjectCategory::MeterValues,
        }
    }
}

impl Evaluate for UninterpretedObject {
    type Concrete = TestObject;

    fn evaluate(&self, model: &Model, completion: Completion) -> Result<TestObject, ModelEvalError> {
        let concrete = match self {
            UninterpretedObject::Table(t) => TestObject::Table(t.evaluate(model, completion)?),
            UninterpretedObject::ActionProfile(p) => {
                TestObject::ActionProfile(p.evaluate(model, completion)?)
            }
            UninterpretedObject::ActionSelector(s) => {
                TestObject::ActionSelector(s.evaluate(model, completion)?)
            }
            UninterpretedObject::CloneSpec(c) => TestObject::CloneSpec(c.evaluate(model, completion)?),
            UninterpretedObject::Meter(m) => TestObject::Meter(m.evaluate(model, completion)?),
        };
        Ok(concrete)
    }
}

/// A fully concrete test object, ready for a writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TestObject {
    Table(TableConfig<Value>),
    ActionProfile(ActionProfile<Value>),
    ActionSelector(ActionSelector<Value>),
    CloneSpec(CloneSpec<Value>),
    Meter(MeterValue<Value>),
    MetadataCollection(MetadataCollection),
}

impl TestObject {
    pub fn as_table(&self) -> Option<&TableConfig<Value>> {
        match self {
            TestObject::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_action_profile(&self) -> Option<&ActionProfile<Value>> {
        match self {
            TestObject::ActionProfile(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_action_selector(&self) -> Option<&ActionSelector<Value>> {
        match self {
            TestObject::ActionSelector(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_clone_spec(&self) -> Option<&CloneSpec<Value>> {
        match self {
            TestObject::CloneSpec(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_meter(&self) -> Option<&MeterValue<Value>> {
        match self {
            TestObject::Meter(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_metadata_collection(&self) -> Option<&MetadataCollection> {
        match self {
            TestObject::MetadataCollection(m) => Some(m),
            _ => None,
        }
    }
}
