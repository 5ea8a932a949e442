//! Evaluation of `[?...]` filter expressions.

use std::cmp::Ordering;

use serde_json::Value;

use super::ast::{CompareOp, Expr, Operand};

/// `true` when `candidate` satisfies `expr`.
pub fn matches(expr: &Expr, candidate: &Value) -> bool {
    match expr {
        Expr::Compare { lhs, op, rhs } => {
            compare(resolve(lhs, candidate), *op, resolve(rhs, candidate))
        }
        Expr::And(a, b) => matches(a, candidate) && matches(b, candidate),
        Expr::Or(a, b) => matches(a, candidate) || matches(b, candidate),
        Expr::Not(inner) => !matches(inner, candidate),
        Expr::Exists(path) => path.resolve(candidate).is_some(),
    }
}

fn resolve<'a>(operand: &'a Operand, candidate: &'a Value) -> Option<&'a Value> {
    match operand {
        Operand::Current(path) => path.resolve(candidate),
        Operand::Literal(value) => Some(value),
    }
}

// A missing operand only equals another missing operand; ordering against a
// missing operand is always false.
fn compare(lhs: Option<&Value>, op: CompareOp, rhs: Option<&Value>) -> bool {
    let (lhs, rhs) = match (lhs, rhs) {
        (Some(lhs), Some(rhs)) => (lhs, rhs),
        (None, None) => return matches!(op, CompareOp::Eq | CompareOp::Le | CompareOp::Ge),
        _ => return op == CompareOp::Ne,
    };

    match op {
        CompareOp::Eq => equal(lhs, rhs),
        CompareOp::Ne => !equal(lhs, rhs),
        CompareOp::Lt => order(lhs, rhs) == Some(Ordering::Less),
        CompareOp::Le => matches!(order(lhs, rhs), Some(Ordering::Less | Ordering::Equal)),
        CompareOp::Gt => order(lhs, rhs) == Some(Ordering::Greater),
        CompareOp::Ge => matches!(order(lhs, rhs), Some(Ordering::Greater | Ordering::Equal)),
    }
}

fn equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => a == b,
            _ => a.as_f64() == b.as_f64(),
        },
        _ => lhs == rhs,
    }
}

fn order(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
        },
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ if equal(lhs, rhs) => Some(Ordering::Equal),
        _ => None,
    }
}
