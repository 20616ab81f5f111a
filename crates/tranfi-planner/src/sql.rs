//! Plan → DuckDB SQL.
//!
//! Each transform becomes one CTE reading from the previous one; the first
//! reads from `input_data`. Codecs are dropped. Only ops with an exact SQL
//! counterpart are rendered; anything else is an error rather than an
//! approximation.
//!
//! Comparisons and logic are two-valued in the engine: a comparison with Null
//! is false, except `!=` which is true, and `not`/`and`/`or` treat anything
//! other than true as false. The rendered SQL pins each comparison with
//! `coalesce` and each logical operand with `IS TRUE` so NULL never leaks
//! into three-valued logic.

use tranfi_core::dag::{AggFunc, OpSpec};
use tranfi_core::expr::{BinaryOp, Expr, Func, UnaryOp};
use tranfi_core::plan::Plan;
use tranfi_core::value::Value;

use crate::error::{CompileError, Result};
use crate::schema::infer_columns;

const INPUT: &str = "input_data";

pub fn to_sql(plan: &Plan) -> Result<String> {
    let transforms = plan.transforms();
    if transforms.is_empty() {
        return Ok(format!("SELECT * FROM {INPUT}"));
    }
    // Columns known to exist before each step decide REPLACE vs append in
    // `derive`.
    let columns = infer_columns(plan, None);

    let mut ctes = Vec::with_capacity(transforms.len());
    let mut prev = INPUT.to_string();
    for (i, spec) in transforms.iter().enumerate() {
        let known = columns.get(i).and_then(|c| c.as_deref());
        let body = select(spec, &prev, known)?;
        let name = format!("step_{}", i + 1);
        ctes.push(format!("  {name} AS ({body})"));
        prev = name;
    }
    Ok(format!("WITH\n{}\nSELECT * FROM {prev}", ctes.join(",\n")))
}

fn select(spec: &OpSpec, from: &str, known: Option<&[String]>) -> Result<String> {
    let sql = match spec {
        OpSpec::Filter(a) => format!("SELECT * FROM {from} WHERE {}", expr(a.expr.ast())),
        OpSpec::Select(a) => format!("SELECT {} FROM {from}", ident_list(&a.columns)),
        OpSpec::Sort(a) => {
            let keys: Vec<String> = a
                .columns
                .iter()
                .map(|k| {
                    let dir = if k.desc { "DESC NULLS FIRST" } else { "ASC NULLS LAST" };
                    format!("{} {dir}", ident(&k.name))
                })
                .collect();
            format!("SELECT * FROM {from} ORDER BY {}", keys.join(", "))
        }
        OpSpec::Head(a) => format!("SELECT * FROM {from} LIMIT {}", a.n),
        OpSpec::Skip(a) => format!("SELECT * FROM {from} OFFSET {}", a.n),
        OpSpec::Rename(a) => {
            let pairs: Vec<String> = a
                .mapping
                .iter()
                .map(|(old, new)| format!("{} AS {}", ident(old), ident(new)))
                .collect();
            format!("SELECT * RENAME ({}) FROM {from}", pairs.join(", "))
        }
        OpSpec::Derive(a) => {
            // One nested SELECT per column so later expressions see earlier
            // results.
            let mut present: Vec<String> = known.map(<[String]>::to_vec).unwrap_or_default();
            let mut source = from.to_string();
            let mut sql = String::new();
            for (j, col) in a.columns.iter().enumerate() {
                let e = expr(col.expr.ast());
                sql = if present.contains(&col.name) {
                    format!("SELECT * REPLACE ({e} AS {}) FROM {source}", ident(&col.name))
                } else {
                    present.push(col.name.clone());
                    format!("SELECT *, {e} AS {} FROM {source}", ident(&col.name))
                };
                source = format!("({sql}) AS d{}", j + 1);
            }
            sql
        }
        OpSpec::GroupAgg(a) => {
            let mut items: Vec<String> = a.group_by.iter().map(|g| ident(g)).collect();
            for agg in &a.aggs {
                let col = ident(&agg.column);
                let call = match agg.func {
                    AggFunc::Count => "count(*)".to_string(),
                    AggFunc::Sum => format!("coalesce(sum({col}), 0)"),
                    AggFunc::Avg => format!("avg({col})"),
                    AggFunc::Min => format!("min({col})"),
                    AggFunc::Max => format!("max({col})"),
                };
                items.push(format!("{call} AS {}", ident(&agg.output_name())));
            }
            let mut sql = format!("SELECT {} FROM {from}", items.join(", "));
            if !a.group_by.is_empty() {
                sql.push_str(&format!(" GROUP BY {}", ident_list(&a.group_by)));
            }
            sql
        }
        OpSpec::Unique(a) if a.columns.is_empty() => format!("SELECT DISTINCT * FROM {from}"),
        OpSpec::Unique(a) => {
            format!("SELECT DISTINCT ON ({}) * FROM {from}", ident_list(&a.columns))
        }
        other => return Err(CompileError::NoSql(other.name().to_string())),
    };
    Ok(sql)
}

fn ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn ident_list(names: &[String]) -> String {
    names.iter().map(|n| ident(n)).collect::<Vec<_>>().join(", ")
}

fn string_lit(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn literal(v: &Value) -> String {
    match v {
        Value::Null => "NULL".into(),
        Value::Bool(true) => "TRUE".into(),
        Value::Bool(false) => "FALSE".into(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) if f.is_finite() => format!("{f:?}"),
        Value::Float(_) => "NULL".into(),
        Value::Str(s) => string_lit(s),
        Value::Date(d) => format!("DATE '{}'", d.format("%Y-%m-%d")),
    }
}

/// Fully parenthesized, so precedence never depends on the SQL dialect.
fn expr(e: &Expr) -> String {
    match e {
        Expr::Literal(v) => literal(v),
        Expr::Column(name) => ident(name),
        Expr::Unary(UnaryOp::Neg, inner) => format!("(- {})", expr(inner)),
        Expr::Unary(UnaryOp::Not, inner) => format!("(NOT {})", logic(inner)),
        Expr::Binary(op @ (BinaryOp::And | BinaryOp::Or), l, r) => {
            let sym = if *op == BinaryOp::And { "AND" } else { "OR" };
            format!("({} {sym} {})", logic(l), logic(r))
        }
        Expr::Binary(op, l, r) if op.is_comparison() => {
            let (sym, on_null) = match op {
                BinaryOp::Eq => ("=", "FALSE"),
                BinaryOp::Ne => ("<>", "TRUE"),
                other => (other.symbol(), "FALSE"),
            };
            format!("coalesce(({} {sym} {}), {on_null})", expr(l), expr(r))
        }
        Expr::Binary(op, l, r) => format!("({} {} {})", expr(l), op.symbol(), expr(r)),
        Expr::Call(func, args) => call(*func, args),
    }
}

/// An operand of `not`/`and`/`or`: only a true value counts.
fn logic(e: &Expr) -> String {
    match e {
        Expr::Unary(UnaryOp::Not, _) => expr(e),
        Expr::Binary(op, _, _) if op.is_comparison() || matches!(op, BinaryOp::And | BinaryOp::Or) => {
            expr(e)
        }
        _ => format!("({} IS TRUE)", expr(e)),
    }
}

fn call(func: Func, args: &[Expr]) -> String {
    let a: Vec<String> = args.iter().map(expr).collect();
    match (func, a.as_slice()) {
        (Func::If, [c, t, f]) => format!("(CASE WHEN {c} THEN {t} ELSE {f} END)"),
        (Func::Mod, [x, y]) => format!("({x} % {y})"),
        // 0-based here, 1-based in SQL.
        (Func::Slice, [s, start]) => format!("substr({s}, ({start}) + 1)"),
        (Func::Slice, [s, start, len]) => format!("substr({s}, ({start}) + 1, {len})"),
        _ => {
            let name = match func {
                Func::Len => "length",
                Func::PadLeft => "lpad",
                Func::PadRight => "rpad",
                Func::Min => "least",
                Func::Max => "greatest",
                Func::Log => "ln",
                other => other.name(),
            };
            format!("{name}({})", a.join(", "))
        }
    }
}
