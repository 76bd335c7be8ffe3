use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::constant::Constant;

/// A symbolic expression over bit-vectors and booleans.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Constant(Constant),
    Bool(bool),
    /// A free variable introduced by the exploration engine.
    Symbol {
        name: String,
        width: u32,
    },
    /// Bits whose value no one controls (e.g. a random or uninitialised source).
    Taint {
        width: u32,
    },
    /// First element ends up in the most significant bits.
    Concat(Vec<Expr>),
    Slice {
        expr: Box<Expr>,
        hi: u32,
        lo: u32,
    },
    Op {
        op: OpKind,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Add,
    Sub,
    BitAnd,
    BitOr,
    BitXor,
    BitNot,
    Eq,
    Neq,
    LNot,
    LAnd,
    LOr,
    /// `mux(cond, then, else)`
    Mux,
}

impl OpKind {
    pub fn tag(self) -> &'static str {
        match self {
            OpKind::Add => "add",
            OpKind::Sub => "sub",
            OpKind::BitAnd => "band",
            OpKind::BitOr => "bor",
            OpKind::BitXor => "bxor",
            OpKind::BitNot => "bnot",
            OpKind::Eq => "eq",
            OpKind::Neq => "neq",
            OpKind::LNot => "lnot",
            OpKind::LAnd => "land",
            OpKind::LOr => "lor",
            OpKind::Mux => "mux",
        }
    }

    fn from_tag(tag: &str) -> Option<OpKind> {
        let op = match tag {
            "add" => OpKind::Add,
            "sub" => OpKind::Sub,
            "band" => OpKind::BitAnd,
            "bor" => OpKind::BitOr,
            "bxor" => OpKind::BitXor,
            "bnot" => OpKind::BitNot,
            "eq" => OpKind::Eq,
            "neq" => OpKind::Neq,
            "lnot" => OpKind::LNot,
            "land" => OpKind::LAnd,
            "lor" => OpKind::LOr,
            "mux" => OpKind::Mux,
            _ => return None,
        };
        Some(op)
    }

    /// Operators whose result is a boolean regardless of operand width.
    pub fn is_predicate(self) -> bool {
        matches!(
            self,
            OpKind::Eq | OpKind::Neq | OpKind::LNot | OpKind::LAnd | OpKind::LOr
        )
    }
}

impl Expr {
    pub fn constant(width: u32, value: u64) -> Expr {
        Expr::Constant(Constant::from_u64(width, value))
    }

    pub fn symbol(name: &str, width: u32) -> Expr {
        Expr::Symbol {
            name: name.to_string(),
            width,
        }
    }

    pub fn taint(width: u32) -> Expr {
        Expr::Taint { width }
    }

    pub fn op(op: OpKind, args: Vec<Expr>) -> Expr {
        Expr::Op { op, args }
    }

    /// Width in bits. Booleans count as one bit.
    pub fn width(&self) -> u32 {
        match self {
            Expr::Constant(c) => c.width(),
            Expr::Bool(_) => 1,
            Expr::Symbol { width, .. } | Expr::Taint { width } => *width,
            Expr::Concat(parts) => parts.iter().map(Expr::width).sum(),
            Expr::Slice { hi, lo, .. } => hi.saturating_sub(*lo) + 1,
            Expr::Op { op, args } => {
                if op.is_predicate() {
                    1
                } else if *op == OpKind::Mux {
                    args.get(1).map(Expr::width).unwrap_or(0)
                } else {
                    args.first().map(Expr::width).unwrap_or(0)
                }
            }
        }
    }

    /// True when no symbol or taint occurs anywhere in the expression.
    pub fn is_concrete(&self) -> bool {
        match self {
            Expr::Constant(_) | Expr::Bool(_) => true,
            Expr::Symbol { .. } | Expr::Taint { .. } => false,
            Expr::Concat(parts) => parts.iter().all(Expr::is_concrete),
            Expr::Slice { expr, .. } => expr.is_concrete(),
            Expr::Op { args, .. } => args.iter().all(Expr::is_concrete),
        }
    }

    /// Names of all free symbols, sorted.
    pub fn symbols(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Symbol { name, .. } => {
                out.insert(name.clone());
            }
            Expr::Concat(parts) => parts.iter().for_each(|p| p.collect_symbols(out)),
            Expr::Slice { expr, .. } => expr.collect_symbols(out),
            Expr::Op { args, .. } => args.iter().for_each(|a| a.collect_symbols(out)),
            Expr::Constant(_) | Expr::Bool(_) | Expr::Taint { .. } => {}
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Expr::Constant(c) => json!(["const", c.width(), format!("0x{}", c.to_hex())]),
            Expr::Bool(b) => json!(b),
            Expr::Symbol { name, width } => json!(["sym", name, width]),
            Expr::Taint { width } => json!(["taint", width]),
            Expr::Concat(parts) => {
                let mut arr = vec![json!("concat")];
                arr.extend(parts.iter().map(Expr::to_json));
                serde_json::Value::Array(arr)
            }
            Expr::Slice { expr, hi, lo } => json!(["slice", expr.to_json(), hi, lo]),
            Expr::Op { op, args } => {
                let mut arr = vec![json!(op.tag())];
                arr.extend(args.iter().map(Expr::to_json));
                serde_json::Value::Array(arr)
            }
        }
    }
}

impl From<Constant> for Expr {
    fn from(c: Constant) -> Self {
        Expr::Constant(c)
    }
}

impl Serialize for Expr {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Expr {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        parse_expr(&value).map_err(serde::de::Error::custom)
    }
}

pub(crate) fn parse_expr(value: &serde_json::Value) -> Result<Expr, String> {
    match value {
        serde_json::Value::Bool(b) => Ok(Expr::Bool(*b)),

        // Array forms: ["tag", ...args]
        serde_json::Value::Array(arr) => {
            if arr.is_empty() {
                return Err("empty expression array".to_string());
            }
            let tag = arr[0].as_str().ok_or_else(|| {
                format!("first element of expression array must be a string, got: {:?}", arr[0])
            })?;

            match tag {
                // ["const", width, "0x.."]
                "const" => {
                    if arr.len() != 3 {
                        return Err(format!("const expression requires 3 elements, got {}", arr.len()));
                    }
                    let width = as_width(&arr[1])?;
                    let literal = match &arr[2] {
                        serde_json::Value::String(s) => s.clone(),
                        serde_json::Value::Number(n) => n.to_string(),
                        other => return Err(format!("const value must be a string or number, got: {other}")),
                    };
                    Constant::parse(width, &literal)
                        .map(Expr::Constant)
                        .ok_or_else(|| format!("invalid bit-vector literal: {literal}"))
                }

                // ["sym", name, width]
                "sym" => {
                    if arr.len() != 3 {
                        return Err(format!("sym expression requires 3 elements, got {}", arr.len()));
                    }
                    let name = arr[1].as_str().ok_or("symbol name must be a string")?.to_string();
                    let width = as_width(&arr[2])?;
                    Ok(Expr::Symbol { name, width })
                }

                // ["taint", width]
                "taint" => {
                    if arr.len() != 2 {
                        return Err(format!("taint expression requires 2 elements, got {}", arr.len()));
                    }
                    Ok(Expr::Taint { width: as_width(&arr[1])? })
                }

                "concat" => {
                    let parts = arr[1..]
                        .iter()
                        .map(parse_expr)
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Expr::Concat(parts))
                }

                // ["slice", expr, hi, lo]
                "slice" => {
                    if arr.len() != 4 {
                        return Err(format!("slice expression requires 4 elements, got {}", arr.len()));
                    }
                    let expr = Box::new(parse_expr(&arr[1])?);
                    let hi = as_width(&arr[2])?;
                    let lo = as_width(&arr[3])?;
                    if lo > hi {
                        return Err(format!("slice bounds reversed: [{hi}:{lo}]"));
                    }
                    Ok(Expr::Slice { expr, hi, lo })
                }

                other => {
                    let op = OpKind::from_tag(other)
                        .ok_or_else(|| format!("unknown expression operator: {other}"))?;
                    let args = arr[1..]
                        .iter()
                        .map(parse_expr)
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Expr::Op { op, args })
                }
            }
        }

        other => Err(format!("unsupported expression value: {other}")),
    }
}

fn as_width(value: &serde_json::Value) -> Result<u32, String> {
    value
        .as_u64()
        .and_then(|w| u32::try_from(w).ok())
        .ok_or_else(|| format!("expected a bit width, got: {value}"))
}
