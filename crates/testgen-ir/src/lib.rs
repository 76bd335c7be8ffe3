//! Symbolic expressions, bit-vector constants and state references shared
//! by the model and backend crates.

pub mod constant;
pub mod expr;
pub mod parse;
pub mod state_ref;

pub use constant::Constant;
pub use expr::{Expr, OpKind};
pub use state_ref::StateRef;
