use serde::{Deserialize, Serialize};
use testgen_ir::Expr;

use crate::model::{Completion, Model, ModelEvalError, Value};

/// One step of the explanation for why a path behaves the way it does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceEvent {
    /// Free-form marker.
    Generic { label: String },
    /// A named expression, concrete once the event has been evaluated.
    Expression { label: String, value: Expr },
    /// The parser entered a state.
    ParserState { state: String },
    /// A table was applied.
    TableHit {
        table: String,
        action: String,
        hit: bool,
    },
    /// An action body was executed.
    ActionCall { action: String },
    /// The packet was marked for drop.
    Drop { reason: String },
}

impl TraceEvent {
    /// Resolve any expression carried by the event under `model`.
    pub fn evaluate(&self, model: &Model) -> Result<TraceEvent, ModelEvalError> {
        match self {
            TraceEvent::Expression { label, value } => {
                let concrete = match model.evaluate(value, Completion::Complete)? {
                    Value::Bool(b) => Expr::Bool(b),
                    Value::Bits(c) => Expr::Constant(c),
                };
                Ok(TraceEvent::Expression {
                    label: label.clone(),
                    value: concrete,
                })
            }
            other => Ok(other.clone()),
        }
    }

    pub fn is_concrete(&self) -> bool {
        match self {
            TraceEvent::Expression { value, .. } => value.is_concrete(),
            _ => true,
        }
    }
}

impl std::fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraceEvent::Generic { label } => write!(f, "{label}"),
            TraceEvent::Expression { label, value } => write!(f, "{label}: {}", value.to_json()),
            TraceEvent::ParserState { state } => write!(f, "parser state {state}"),
            TraceEvent::TableHit { table, action, hit } => {
                let outcome = if *hit { "hit" } else { "miss" };
                write!(f, "table {table} {outcome}, action {action}")
            }
            TraceEvent::ActionCall { action } => write!(f, "action {action}"),
            TraceEvent::Drop { reason } => write!(f, "drop: {reason}"),
        }
    }
}
