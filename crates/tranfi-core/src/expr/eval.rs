//! Row-at-a-time evaluation. Evaluation never fails; invalid operations
//! (type mismatch, divide by zero, overflow) yield Null.

use std::cmp::Ordering;

use chrono::Duration;

use crate::row::Row;
use crate::value::Value;

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::functions::modulo;

pub fn eval(expr: &Expr, row: &Row) -> Value {
    match expr {
        Expr::Literal(v) => v.clone(),
        Expr::Column(name) => row.value(name).clone(),
        Expr::Unary(UnaryOp::Not, e) => Value::Bool(!is_true(&eval(e, row))),
        Expr::Unary(UnaryOp::Neg, e) => match eval(e, row) {
            Value::Int(i) => i.checked_neg().map(Value::Int).unwrap_or(Value::Null),
            Value::Float(f) => Value::Float(-f),
            _ => Value::Null,
        },
        Expr::Binary(BinaryOp::And, l, r) => {
            Value::Bool(is_true(&eval(l, row)) && is_true(&eval(r, row)))
        }
        Expr::Binary(BinaryOp::Or, l, r) => {
            Value::Bool(is_true(&eval(l, row)) || is_true(&eval(r, row)))
        }
        Expr::Binary(op, l, r) => {
            let a = eval(l, row);
            let b = eval(r, row);
            binary(*op, &a, &b)
        }
        Expr::Call(func, args) => {
            let vals: Vec<Value> = args.iter().map(|a| eval(a, row)).collect();
            func.call(&vals)
        }
    }
}

/// Filter truthiness: Bool is itself; Null, `0`, `0.0` and `""` are false;
/// anything else is true.
pub fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::Str(s) => !s.is_empty(),
        Value::Date(_) => true,
    }
}

/// Logical operands: only `Bool(true)` counts as true.
fn is_true(v: &Value) -> bool {
    matches!(v, Value::Bool(true))
}

fn binary(op: BinaryOp, a: &Value, b: &Value) -> Value {
    let ord = || a.compare(b);
    match op {
        BinaryOp::Eq => Value::Bool(ord() == Some(Ordering::Equal)),
        BinaryOp::Ne => Value::Bool(ord() != Some(Ordering::Equal)),
        BinaryOp::Lt => Value::Bool(ord() == Some(Ordering::Less)),
        BinaryOp::Le => Value::Bool(matches!(ord(), Some(Ordering::Less | Ordering::Equal))),
        BinaryOp::Gt => Value::Bool(ord() == Some(Ordering::Greater)),
        BinaryOp::Ge => Value::Bool(matches!(
            ord(),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOp::Add => add(a, b),
        BinaryOp::Sub => sub(a, b),
        BinaryOp::Mul => match (a, b) {
            (Value::Int(x), Value::Int(y)) => x.checked_mul(*y).map(Value::Int).unwrap_or(Value::Null),
            _ => float_op(a, b, |x, y| x * y),
        },
        BinaryOp::Div => match (a.as_f64(), b.as_f64()) {
            (Some(_), Some(y)) if y == 0.0 => Value::Null,
            (Some(x), Some(y)) => Value::Float(x / y),
            _ => Value::Null,
        },
        BinaryOp::Mod => modulo(a, b),
        BinaryOp::And | BinaryOp::Or => Value::Null,
    }
}

fn add(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x.checked_add(*y).map(Value::Int).unwrap_or(Value::Null),
        (Value::Date(d), Value::Int(n)) | (Value::Int(n), Value::Date(d)) => shift(*d, *n),
        _ => float_op(a, b, |x, y| x + y),
    }
}

fn sub(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x.checked_sub(*y).map(Value::Int).unwrap_or(Value::Null),
        (Value::Date(x), Value::Date(y)) => Value::Int(x.signed_duration_since(*y).num_days()),
        (Value::Date(d), Value::Int(n)) => match n.checked_neg() {
            Some(n) => shift(*d, n),
            None => Value::Null,
        },
        _ => float_op(a, b, |x, y| x - y),
    }
}

fn shift(d: chrono::NaiveDate, days: i64) -> Value {
    Duration::try_days(days)
        .and_then(|delta| d.checked_add_signed(delta))
        .map(Value::Date)
        .unwrap_or(Value::Null)
}

fn float_op(a: &Value, b: &Value, f: impl Fn(f64, f64) -> f64) -> Value {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => Value::Float(f(x, y)),
        _ => Value::Null,
    }
}
