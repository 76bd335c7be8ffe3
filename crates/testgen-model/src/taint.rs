//! Don't-care masks for values that contain tainted bits.
//!
//! A mask has one bit per bit of the expression: `1` means the bit is
//! asserted and must match, `0` means a comparison has to ignore it.

use testgen_ir::{Constant, Expr, OpKind};

/// Build the care mask of `expr`.
///
/// Taint is tracked precisely through concatenation, slicing and bitwise
/// operators. Any other operator with a tainted operand taints its whole
/// result, since carries and comparisons mix every input bit.
pub fn care_mask(expr: &Expr) -> Constant {
    let width = expr.width();
    match expr {
        Expr::Taint { width } => Constant::zero(*width),
        Expr::Constant(_) | Expr::Bool(_) | Expr::Symbol { .. } => Constant::ones(width),
        Expr::Concat(parts) => parts
            .iter()
            .fold(Constant::zero(0), |acc, part| acc.concat(&care_mask(part))),
        Expr::Slice { expr: inner, hi, lo } => {
            let inner_mask = care_mask(inner);
            if *hi < inner_mask.width() && lo <= hi {
                inner_mask.slice(*hi, *lo)
            } else {
                Constant::zero(width)
            }
        }
        Expr::Op { op, args } => match op {
            OpKind::BitAnd | OpKind::BitOr | OpKind::BitXor | OpKind::BitNot => args
                .iter()
                .map(care_mask)
                .filter(|m| m.width() == width)
                .fold(Constant::ones(width), |acc, m| acc.bitand(&m)),
            _ if args.iter().any(has_taint) => Constant::zero(width),
            _ => Constant::ones(width),
        },
    }
}

/// True when any taint placeholder occurs in `expr`.
pub fn has_taint(expr: &Expr) -> bool {
    match expr {
        Expr::Taint { .. } => true,
        Expr::Constant(_) | Expr::Bool(_) | Expr::Symbol { .. } => false,
        Expr::Concat(parts) => parts.iter().any(has_taint),
        Expr::Slice { expr, .. } => has_taint(expr),
        Expr::Op { args, .. } => args.iter().any(has_taint),
    }
}
