//! Forward column inference over a plan.
//!
//! Best effort: each step's output columns are predicted from its input
//! columns and arguments. Steps whose shape depends on the data (`pivot`,
//! `onehot`, `join`, `stack`) make the result unknown, and it stays unknown
//! until a step that fixes its own output (`stats`, `group-agg`, `select`...).
//! Nothing here fails.

use tranfi_core::dag::{DatePart, OpSpec, StatKind};
use tranfi_core::plan::Plan;

type Columns = Option<Vec<String>>;

/// Output columns of every step, in plan order.
pub fn infer_columns(plan: &Plan, input: Option<&[String]>) -> Vec<Columns> {
    let mut cur: Columns = input.map(<[String]>::to_vec);
    plan.specs()
        .iter()
        .map(|spec| {
            cur = apply(spec, cur.take());
            cur.clone()
        })
        .collect()
}

/// Set semantics: replace in place if present, else append.
fn with(cols: Columns, names: impl IntoIterator<Item = String>) -> Columns {
    cols.map(|mut c| {
        for name in names {
            if !c.contains(&name) {
                c.push(name);
            }
        }
        c
    })
}

fn fixed(names: &[&str]) -> Columns {
    Some(names.iter().map(|s| s.to_string()).collect())
}

fn result_or(result: &Option<String>, column: &str, suffix: &str) -> String {
    result
        .clone()
        .unwrap_or_else(|| format!("{column}_{suffix}"))
}

fn apply(spec: &OpSpec, cols: Columns) -> Columns {
    match spec {
        OpSpec::TextDecode(_) => fixed(&["_line"]),
        OpSpec::CsvDecode(_) | OpSpec::JsonlDecode(_) => cols,

        OpSpec::Select(a) => Some(match cols {
            Some(c) => a.columns.iter().filter(|n| c.contains(n)).cloned().collect(),
            None => a.columns.clone(),
        }),
        OpSpec::Rename(a) => cols.map(|c| {
            c.into_iter()
                .map(|n| a.mapping.get(&n).cloned().unwrap_or(n))
                .collect()
        }),
        OpSpec::Derive(a) => with(cols, a.columns.iter().map(|d| d.name.clone())),
        OpSpec::Validate(_) => with(cols, ["_valid".to_string()]),
        OpSpec::FillNull(a) => with(cols, a.mapping.keys().cloned()),
        OpSpec::Bin(a) => with(cols, [format!("{}_bin", a.column)]),
        OpSpec::Hash(_) => with(cols, ["_hash".to_string()]),

        OpSpec::Stats(a) => {
            let mut kinds = a.stats.clone();
            kinds.sort();
            kinds.dedup();
            let mut out = vec!["column".to_string()];
            out.extend(kinds.into_iter().map(|k| StatKind::name(k).to_string()));
            Some(out)
        }
        OpSpec::Frequency(_) => fixed(&["value", "count"]),
        OpSpec::GroupAgg(a) => {
            let mut out = a.group_by.clone();
            out.extend(a.aggs.iter().map(|g| g.output_name()));
            Some(out)
        }
        OpSpec::Acf(_) => fixed(&["lag", "acf"]),

        OpSpec::Step(a) => with(cols, [a.result_name()]),
        OpSpec::Window(a) => with(cols, [a.result_name()]),
        OpSpec::Lead(a) => with(cols, [a.result_name()]),
        OpSpec::Ewma(a) => with(cols, [result_or(&a.result, &a.column, "ewma")]),
        OpSpec::Diff(a) => with(cols, [result_or(&a.result, &a.column, "diff")]),
        OpSpec::Anomaly(a) => with(cols, [result_or(&a.result, &a.column, "anomaly")]),
        OpSpec::LabelEncode(a) => with(cols, [result_or(&a.result, &a.column, "encoded")]),
        OpSpec::SplitData(a) => with(cols, [a.result.clone()]),
        OpSpec::Datetime(a) => with(
            cols,
            a.extract
                .iter()
                .map(|p| format!("{}_{}", a.column, DatePart::name(*p))),
        ),
        OpSpec::DateTrunc(a) => match &a.result {
            Some(r) => with(cols, [r.clone()]),
            None => cols,
        },

        OpSpec::Split(a) => cols.map(|mut c| {
            let at = c.iter().position(|n| *n == a.column);
            c.retain(|n| *n != a.column);
            let mut at = at.unwrap_or(c.len());
            for name in &a.names {
                if !c.contains(name) {
                    c.insert(at, name.clone());
                    at += 1;
                }
            }
            c
        }),
        OpSpec::Unpivot(a) => cols.map(|c| {
            let mut out: Vec<String> = c.into_iter().filter(|n| !a.columns.contains(n)).collect();
            out.push("variable".into());
            out.push("value".into());
            out
        }),

        OpSpec::Pivot(_) | OpSpec::Onehot(_) | OpSpec::Join(_) | OpSpec::Stack(_) => None,

        // Row filters, reorderings and in-place rewrites keep the shape.
        OpSpec::Filter(_)
        | OpSpec::Clip(_)
        | OpSpec::Replace(_)
        | OpSpec::Trim(_)
        | OpSpec::Cast(_)
        | OpSpec::Grep(_)
        | OpSpec::Flatten
        | OpSpec::Head(_)
        | OpSpec::Skip(_)
        | OpSpec::Tail(_)
        | OpSpec::Sort(_)
        | OpSpec::Unique(_)
        | OpSpec::Top(_)
        | OpSpec::Sample(_)
        | OpSpec::FillDown(_)
        | OpSpec::Explode(_)
        | OpSpec::Interpolate(_)
        | OpSpec::Normalize(_)
        | OpSpec::CsvEncode(_)
        | OpSpec::JsonlEncode
        | OpSpec::TextEncode
        | OpSpec::TableEncode(_) => cols,
    }
}
