use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use testgen_ir::{Constant, Expr, OpKind};

/// How symbolic content the model leaves open is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Free symbols and taint default to zero. The result is always concrete.
    Complete,
    /// Free symbols are reported as unconstrained instead of being invented.
    Partial,
}

/// A concrete value produced by evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Bits(Constant),
}

impl Value {
    /// Booleans become `bit<1>`.
    pub fn into_bits(self) -> Constant {
        match self {
            Value::Bool(b) => Constant::from_bool(b),
            Value::Bits(c) => c,
        }
    }

    pub fn width(&self) -> u32 {
        match self {
            Value::Bool(_) => 1,
            Value::Bits(c) => c.width(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Bits(c) => write!(f, "{c}"),
        }
    }
}

impl From<Constant> for Value {
    fn from(c: Constant) -> Self {
        Value::Bits(c)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelEvalError {
    #[error("Symbol '{symbol}' is not constrained by the model")]
    Unconstrained { symbol: String },

    #[error("Type error: expected {expected}, got {actual}")]
    TypeError { expected: String, actual: String },

    #[error("Width mismatch in '{op}': {left} vs {right}")]
    WidthMismatch { op: String, left: u32, right: u32 },

    #[error("Operator '{op}' expects {expected} argument(s), got {actual}")]
    Arity {
        op: String,
        expected: usize,
        actual: usize,
    },

    #[error("Slice [{hi}:{lo}] out of range for a {width}-bit value")]
    SliceOutOfRange { hi: u32, lo: u32, width: u32 },
}

/// A solved assignment of symbolic variables to concrete values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    assignments: BTreeMap<String, Constant>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, symbol: &str, value: Constant) {
        self.assignments.insert(symbol.to_string(), value);
    }

    pub fn with(mut self, symbol: &str, value: Constant) -> Self {
        self.assign(symbol, value);
        self
    }

    pub fn get(&self, symbol: &str) -> Option<&Constant> {
        self.assignments.get(symbol)
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Evaluate `expr` to a concrete value under this model.
    pub fn evaluate(&self, expr: &Expr, completion: Completion) -> Result<Value, ModelEvalError> {
        match expr {
            Expr::Constant(c) => Ok(Value::Bits(c.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Symbol { name, width } => match self.assignments.get(name) {
                Some(c) if c.width() == *width => Ok(Value::Bits(c.clone())),
                Some(c) => Err(ModelEvalError::WidthMismatch {
                    op: format!("symbol {name}"),
                    left: *width,
                    right: c.width(),
                }),
                None => match completion {
                    Completion::Complete => Ok(Value::Bits(Constant::zero(*width))),
                    Completion::Partial => Err(ModelEvalError::Unconstrained {
                        symbol: name.clone(),
                    }),
                },
            },
            Expr::Taint { width } => match completion {
                Completion::Complete => Ok(Value::Bits(Constant::zero(*width))),
                Completion::Partial => Err(ModelEvalError::Unconstrained {
                    symbol: format!("<taint:{width}>"),
                }),
            },
            Expr::Concat(parts) => {
                let mut acc = Constant::zero(0);
                for part in parts {
                    let bits = self.evaluate_bits(part, completion)?;
                    acc = acc.concat(&bits);
                }
                Ok(Value::Bits(acc))
            }
            Expr::Slice { expr, hi, lo } => {
                let bits = self.evaluate_bits(expr, completion)?;
                if *hi >= bits.width() || lo > hi {
                    return Err(ModelEvalError::SliceOutOfRange {
                        hi: *hi,
                        lo: *lo,
                        width: bits.width(),
                    });
                }
                Ok(Value::Bits(bits.slice(*hi, *lo)))
            }
            Expr::Op { op, args } => self.evaluate_op(*op, args, completion),
        }
    }

    /// Evaluate and coerce the result to a bit-vector.
    pub fn evaluate_bits(&self, expr: &Expr, completion: Completion) -> Result<Constant, ModelEvalError> {
        self.evaluate(expr, completion).map(Value::into_bits)
    }

    pub fn evaluate_bool(&self, expr: &Expr, completion: Completion) -> Result<bool, ModelEvalError> {
        truthy(self.evaluate(expr, completion)?)
    }

    fn evaluate_op(&self, op: OpKind, args: &[Expr], completion: Completion) -> Result<Value, ModelEvalError> {
        match op {
            OpKind::Add | OpKind::Sub | OpKind::BitAnd | OpKind::BitOr | OpKind::BitXor => {
                expect_arity(op, args, 2)?;
                let left = self.evaluate_bits(&args[0], completion)?;
                let right = self.evaluate_bits(&args[1], completion)?;
                same_width(op, &left, &right)?;
                let result = match op {
                    OpKind::Add => left.wrapping_add(&right),
                    OpKind::Sub => left.wrapping_sub(&right),
                    OpKind::BitAnd => left.bitand(&right),
                    OpKind::BitOr => left.bitor(&right),
                    _ => left.bitxor(&right),
                };
                Ok(Value::Bits(result))
            }
            OpKind::BitNot => {
                expect_arity(op, args, 1)?;
                Ok(Value::Bits(self.evaluate_bits(&args[0], completion)?.bitnot()))
            }
            OpKind::Eq | OpKind::Neq => {
                expect_arity(op, args, 2)?;
                let left = self.evaluate(&args[0], completion)?;
                let right = self.evaluate(&args[1], completion)?;
                let equal = match (left, right) {
                    (Value::Bool(a), Value::Bool(b)) => a == b,
                    (a, b) => {
                        let (a, b) = (a.into_bits(), b.into_bits());
                        same_width(op, &a, &b)?;
                        a == b
                    }
                };
                Ok(Value::Bool(if op == OpKind::Eq { equal } else { !equal }))
            }
            OpKind::LNot => {
                expect_arity(op, args, 1)?;
                Ok(Value::Bool(!self.evaluate_bool(&args[0], completion)?))
            }
            OpKind::LAnd | OpKind::LOr => {
                // Every operand is evaluated so that errors surface regardless of order.
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.evaluate_bool(arg, completion)?);
                }
                let result = if op == OpKind::LAnd {
                    values.iter().all(|v| *v)
                } else {
                    values.iter().any(|v| *v)
                };
                Ok(Value::Bool(result))
            }
            OpKind::Mux => {
                expect_arity(op, args, 3)?;
                let cond = self.evaluate_bool(&args[0], completion)?;
                let then_val = self.evaluate(&args[1], completion)?;
                let else_val = self.evaluate(&args[2], completion)?;
                Ok(if cond { then_val } else { else_val })
            }
        }
    }
}

fn truthy(value: Value) -> Result<bool, ModelEvalError> {
    match value {
        Value::Bool(b) => Ok(b),
        Value::Bits(c) if c.width() == 1 => Ok(c.bit(0)),
        other => Err(ModelEvalError::TypeError {
            expected: "bool".to_string(),
            actual: format!("{other:?}"),
        }),
    }
}

fn expect_arity(op: OpKind, args: &[Expr], expected: usize) -> Result<(), ModelEvalError> {
    if args.len() != expected {
        return Err(ModelEvalError::Arity {
            op: op.tag().to_string(),
            expected,
            actual: args.len(),
        });
    }
    Ok(())
}

fn same_width(op: OpKind, left: &Constant, right: &Constant) -> Result<(), ModelEvalError> {
    if left.width() != right.width() {
        return Err(ModelEvalError::WidthMismatch {
            op: op.tag().to_string(),
            left: left.width(),
            right: right.width(),
        });
    }
    Ok(())
}
