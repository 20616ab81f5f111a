//! Built-in expression functions.
//!
//! Names resolve to a `Func` when the expression is parsed, so an unknown
//! function or a wrong argument count fails at plan build time. At runtime a
//! function never errors: bad inputs produce Null.

use crate::value::Value;

static NULL: Value = Value::Null;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Upper,
    Lower,
    Len,
    Trim,
    StartsWith,
    EndsWith,
    Contains,
    Slice,
    Concat,
    PadLeft,
    PadRight,
    Initcap,
    Left,
    Right,
    Replace,
    If,
    Coalesce,
    NullIf,
    Abs,
    Round,
    Floor,
    Ceil,
    Sign,
    Min,
    Max,
    Pow,
    Sqrt,
    Log,
    Exp,
    Mod,
}

impl Func {
    pub fn from_name(name: &str) -> Option<Func> {
        let f = match name.to_ascii_lowercase().as_str() {
            "upper" => Func::Upper,
            "lower" => Func::Lower,
            "len" | "length" => Func::Len,
            "trim" => Func::Trim,
            "starts_with" => Func::StartsWith,
            "ends_with" => Func::EndsWith,
            "contains" => Func::Contains,
            "slice" | "substr" => Func::Slice,
            "concat" => Func::Concat,
            "pad_left" | "lpad" => Func::PadLeft,
            "pad_right" | "rpad" => Func::PadRight,
            "initcap" => Func::Initcap,
            "left" => Func::Left,
            "right" => Func::Right,
            "replace" => Func::Replace,
            "if" => Func::If,
            "coalesce" => Func::Coalesce,
            "nullif" => Func::NullIf,
            "abs" => Func::Abs,
            "round" => Func::Round,
            "floor" => Func::Floor,
            "ceil" => Func::Ceil,
            "sign" => Func::Sign,
            "min" | "least" => Func::Min,
            "max" | "greatest" => Func::Max,
            "pow" => Func::Pow,
            "sqrt" => Func::Sqrt,
            "log" => Func::Log,
            "exp" => Func::Exp,
            "mod" => Func::Mod,
            _ => return None,
        };
        Some(f)
    }

    pub fn name(self) -> &'static str {
        match self {
            Func::Upper => "upper",
            Func::Lower => "lower",
            Func::Len => "len",
            Func::Trim => "trim",
            Func::StartsWith => "starts_with",
            Func::EndsWith => "ends_with",
            Func::Contains => "contains",
            Func::Slice => "slice",
            Func::Concat => "concat",
            Func::PadLeft => "pad_left",
            Func::PadRight => "pad_right",
            Func::Initcap => "initcap",
            Func::Left => "left",
            Func::Right => "right",
            Func::Replace => "replace",
            Func::If => "if",
            Func::Coalesce => "coalesce",
            Func::NullIf => "nullif",
            Func::Abs => "abs",
            Func::Round => "round",
            Func::Floor => "floor",
            Func::Ceil => "ceil",
            Func::Sign => "sign",
            Func::Min => "min",
            Func::Max => "max",
            Func::Pow => "pow",
            Func::Sqrt => "sqrt",
            Func::Log => "log",
            Func::Exp => "exp",
            Func::Mod => "mod",
        }
    }

    /// Accepted argument counts as (min, max); `None` means variadic.
    pub fn arity(self) -> (usize, Option<usize>) {
        match self {
            Func::Upper
            | Func::Lower
            | Func::Len
            | Func::Trim
            | Func::Initcap
            | Func::Abs
            | Func::Floor
            | Func::Ceil
            | Func::Sign
            | Func::Sqrt
            | Func::Log
            | Func::Exp => (1, Some(1)),
            Func::StartsWith
            | Func::EndsWith
            | Func::Contains
            | Func::Left
            | Func::Right
            | Func::NullIf
            | Func::Pow
            | Func::Mod => (2, Some(2)),
            Func::Slice | Func::PadLeft | Func::PadRight => (2, Some(3)),
            Func::Replace | Func::If => (3, Some(3)),
            Func::Round => (1, Some(2)),
            Func::Concat => (0, None),
            Func::Coalesce | Func::Min | Func::Max => (1, None),
        }
    }

    pub fn call(self, args: &[Value]) -> Value {
        let arg = |i: usize| args.get(i).unwrap_or(&NULL);
        match self {
            Func::Upper => map_text(arg(0), |s| s.to_uppercase()),
            Func::Lower => map_text(arg(0), |s| s.to_lowercase()),
            Func::Trim => map_text(arg(0), |s| s.trim().to_string()),
            Func::Initcap => map_text(arg(0), initcap),
            Func::Len => match arg(0) {
                Value::Null => Value::Null,
                v => Value::Int(v.to_text().chars().count() as i64),
            },
            Func::StartsWith => str_pred(arg(0), arg(1), |a, b| a.starts_with(b)),
            Func::EndsWith => str_pred(arg(0), arg(1), |a, b| a.ends_with(b)),
            Func::Contains => str_pred(arg(0), arg(1), |a, b| a.contains(b)),
            Func::Slice => slice(arg(0), arg(1), args.get(2)),
            Func::Concat => Value::Str(args.iter().map(Value::to_text).collect()),
            Func::PadLeft => pad(arg(0), arg(1), args.get(2), true),
            Func::PadRight => pad(arg(0), arg(1), args.get(2), false),
            Func::Left => take_chars(arg(0), arg(1), true),
            Func::Right => take_chars(arg(0), arg(1), false),
            Func::Replace => match (arg(0), arg(1).as_str(), arg(2)) {
                (Value::Null, _, _) => Value::Null,
                (v, Some(""), _) => v.clone(),
                (v, Some(old), new) => Value::Str(v.to_text().replace(old, &new.to_text())),
                (v, None, _) => v.clone(),
            },
            Func::If => {
                if condition(arg(0)) {
                    arg(1).clone()
                } else {
                    arg(2).clone()
                }
            }
            Func::Coalesce => args
                .iter()
                .find(|v| !v.is_null())
                .cloned()
                .unwrap_or(Value::Null),
            Func::NullIf => {
                if arg(0).loose_eq(arg(1)) {
                    Value::Null
                } else {
                    arg(0).clone()
                }
            }
            Func::Abs => match arg(0) {
                Value::Int(i) => i.checked_abs().map(Value::Int).unwrap_or(Value::Null),
                Value::Float(f) => Value::Float(f.abs()),
                _ => Value::Null,
            },
            Func::Round => round(arg(0), args.get(1)),
            Func::Floor => float_to_int(arg(0), f64::floor),
            Func::Ceil => float_to_int(arg(0), f64::ceil),
            Func::Sign => match arg(0) {
                Value::Int(i) => Value::Int(i.signum()),
                Value::Float(f) if *f > 0.0 => Value::Int(1),
                Value::Float(f) if *f < 0.0 => Value::Int(-1),
                Value::Float(f) if *f == 0.0 => Value::Int(0),
                _ => Value::Null,
            },
            Func::Min => extremum(args, std::cmp::Ordering::Less),
            Func::Max => extremum(args, std::cmp::Ordering::Greater),
            Func::Pow => match (arg(0).as_f64(), arg(1).as_f64()) {
                (Some(a), Some(b)) => finite(a.powf(b)),
                _ => Value::Null,
            },
            Func::Sqrt => match arg(0).as_f64() {
                Some(x) if x >= 0.0 => Value::Float(x.sqrt()),
                _ => Value::Null,
            },
            Func::Log => match arg(0).as_f64() {
                Some(x) if x > 0.0 => Value::Float(x.ln()),
                _ => Value::Null,
            },
            Func::Exp => match arg(0).as_f64() {
                Some(x) => finite(x.exp()),
                None => Value::Null,
            },
            Func::Mod => modulo(arg(0), arg(1)),
        }
    }
}

/// Truthiness for `if(...)` conditions: a Bool is itself, Null is false, any
/// other value is true.
fn condition(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Null => false,
        _ => true,
    }
}

fn map_text(v: &Value, f: impl Fn(&str) -> String) -> Value {
    match v {
        Value::Null => Value::Null,
        Value::Str(s) => Value::Str(f(s)),
        other => Value::Str(f(&other.to_text())),
    }
}

fn str_pred(a: &Value, b: &Value, f: impl Fn(&str, &str) -> bool) -> Value {
    match (a.as_str(), b.as_str()) {
        (Some(a), Some(b)) => Value::Bool(f(a, b)),
        _ => Value::Bool(false),
    }
}

fn initcap(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        at_word_start = matches!(c, ' ' | '_' | '-');
    }
    out
}

fn slice(s: &Value, start: &Value, len: Option<&Value>) -> Value {
    if s.is_null() {
        return Value::Null;
    }
    let Some(start) = start.as_i64() else {
        return Value::Null;
    };
    let chars: Vec<char> = s.to_text().chars().collect();
    let n = chars.len() as i64;
    let from = if start < 0 {
        n.saturating_add(start).max(0)
    } else {
        start.min(n)
    };
    let to = match len {
        Some(l) => match l.as_i64() {
            Some(l) if l >= 0 => from.saturating_add(l).min(n),
            _ => return Value::Null,
        },
        None => n,
    };
    Value::Str(chars[from as usize..to as usize].iter().collect())
}

/// Widest result `pad_left`/`pad_right` will build; wider requests give Null.
pub const MAX_PAD_WIDTH: i64 = 1 << 20;

fn pad(s: &Value, width: &Value, fill: Option<&Value>, left: bool) -> Value {
    if s.is_null() {
        return Value::Null;
    }
    let Some(width) = width.as_i64() else {
        return Value::Null;
    };
    if width > MAX_PAD_WIDTH {
        return Value::Null;
    }
    let fill = fill
        .and_then(|f| f.as_str())
        .and_then(|f| f.chars().next())
        .unwrap_or(' ');
    let text = s.to_text();
    let have = text.chars().count() as i64;
    if have >= width {
        return Value::Str(text);
    }
    let padding: String = std::iter::repeat(fill).take((width - have) as usize).collect();
    Value::Str(if left {
        padding + &text
    } else {
        text + &padding
    })
}

fn take_chars(s: &Value, n: &Value, from_left: bool) -> Value {
    if s.is_null() {
        return Value::Null;
    }
    let Some(n) = n.as_i64() else {
        return Value::Null;
    };
    let chars: Vec<char> = s.to_text().chars().collect();
    let n = (n.max(0) as usize).min(chars.len());
    let part = if from_left {
        &chars[..n]
    } else {
        &chars[chars.len() - n..]
    };
    Value::Str(part.iter().collect())
}

fn round(x: &Value, digits: Option<&Value>) -> Value {
    let digits = digits.and_then(Value::as_i64).unwrap_or(0);
    match x {
        Value::Int(i) => Value::Int(*i),
        Value::Float(f) if digits <= 0 => float_to_int(&Value::Float(*f), f64::round),
        Value::Float(f) => {
            let scale = 10f64.powi(digits.min(15) as i32);
            Value::Float((f * scale).round() / scale)
        }
        _ => Value::Null,
    }
}

fn float_to_int(x: &Value, f: fn(f64) -> f64) -> Value {
    match x {
        Value::Int(i) => Value::Int(*i),
        Value::Float(v) => {
            let r = f(*v);
            if r.is_finite() && r.abs() < 9.2e18 {
                Value::Int(r as i64)
            } else {
                Value::Null
            }
        }
        _ => Value::Null,
    }
}

fn extremum(args: &[Value], want: std::cmp::Ordering) -> Value {
    let mut best: Option<&Value> = None;
    let mut all_int = true;
    for v in args {
        match v {
            Value::Null => continue,
            Value::Int(_) => {}
            Value::Float(_) => all_int = false,
            _ => return Value::Null,
        }
        best = match best {
            Some(b) if v.compare(b) != Some(want) => Some(b),
            _ => Some(v),
        };
    }
    match best {
        Some(Value::Int(i)) if all_int => Value::Int(*i),
        Some(v) => v.as_f64().map(Value::Float).unwrap_or(Value::Null),
        None => Value::Null,
    }
}

pub(crate) fn modulo(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Int(_), Value::Int(0)) => Value::Null,
        (Value::Int(x), Value::Int(y)) => x.checked_rem(*y).map(Value::Int).unwrap_or(Value::Null),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(_), Some(y)) if y == 0.0 => Value::Null,
            (Some(x), Some(y)) => Value::Float(x % y),
            _ => Value::Null,
        },
    }
}

fn finite(f: f64) -> Value {
    if f.is_finite() {
        Value::Float(f)
    } else {
        Value::Null
    }
}
