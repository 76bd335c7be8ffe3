//! Solver models, path state and the test objects recorded along a path.

pub mod model;
pub mod object;
pub mod state;
pub mod taint;
pub mod trace;

pub use model::{Completion, Model, ModelEvalError, Value};
pub use object::{Evaluate, TestObject, TestObjectCategory, UninterpretedObject};
pub use state::{ExecutionState, StateError};
pub use trace::TraceEvent;
