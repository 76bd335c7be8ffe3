use crate::expr::{parse_expr, Expr};
use crate::state_ref::{InvalidStateRef, StateRef};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Expression error: {0}")]
    Expr(String),

    #[error(transparent)]
    StateRef(#[from] InvalidStateRef),
}

pub fn parse_expr_json(json: &str) -> Result<Expr, ParseError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    parse_expr(&value).map_err(ParseError::Expr)
}

pub fn parse_state_ref(s: &str) -> Result<StateRef, ParseError> {
    Ok(StateRef::parse(s)?)
}
