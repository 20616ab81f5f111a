//! The `Transform` trait and the closed `Operator` enum.

use tranfi_core::prelude::{EngineConfig, OpClass, OpSpec, Row, RowError};

use crate::aggregate::{Frequency, GroupAgg, Pivot};
use crate::clean::{Cast, Clip, FillDown, FillNull, Replace, Trim};
use crate::datetime::{DateTrunc, Datetime};
use crate::encode::{Bin, Hash, LabelEncode, Onehot, SplitData};
use crate::error::{OpError, Result};
use crate::filter::{Filter, Grep, Validate};
use crate::limit::{Head, Skip, Tail};
use crate::lookup::{Join, Stack};
use crate::project::{Derive, Flatten, Rename, Select};
use crate::reshape::{Explode, Split, Unpivot};
use crate::sample::Sample;
use crate::sequence::{Anomaly, Diff, Ewma, Interpolate, Lead, Step, Window};
use crate::series::{Acf, Normalize};
use crate::sort::{Sort, Top, Unique};
use crate::stats::Stats;

/// A stateful row transform.
///
/// Invariants:
/// - `process` appends zero or more rows to `out`; it never reorders rows it
///   has already emitted.
/// - `flush` is called exactly once, after the last `process`.
/// - Row-level problems are appended to `errors`; `Err` is reserved for
///   failures that must stop the pipeline.
pub trait Transform {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, errors: &mut Vec<RowError>)
        -> Result<()>;

    fn flush(&mut self, _out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        Ok(())
    }
}

pub enum Operator {
    Filter(Filter),
    Select(Select),
    Rename(Rename),
    Derive(Derive),
    Validate(Validate),
    Clip(Clip),
    Replace(Replace),
    Trim(Trim),
    FillNull(FillNull),
    Cast(Cast),
    Bin(Bin),
    Hash(Hash),
    Grep(Grep),
    Flatten(Flatten),
    Head(Head),
    Skip(Skip),
    Tail(Tail),
    Sort(Sort),
    Unique(Unique),
    Top(Top),
    Sample(Sample),
    Stats(Stats),
    Frequency(Frequency),
    GroupAgg(GroupAgg),
    Step(Step),
    Window(Window),
    Lead(Lead),
    FillDown(FillDown),
    Explode(Explode),
    Split(Split),
    Unpivot(Unpivot),
    Pivot(Pivot),
    Datetime(Datetime),
    DateTrunc(DateTrunc),
    Stack(Stack),
    Join(Join),
    Onehot(Onehot),
    LabelEncode(LabelEncode),
    Ewma(Ewma),
    Diff(Diff),
    Anomaly(Anomaly),
    SplitData(SplitData),
    Interpolate(Interpolate),
    Normalize(Normalize),
    Acf(Acf),
}

/// Expand `$body` once per variant with `$op` bound to the inner operator.
macro_rules! each_op {
    ($self:expr, $op:ident => $body:expr) => {
        match $self {
            Operator::Filter($op) => $body,
            Operator::Select($op) => $body,
            Operator::Rename($op) => $body,
            Operator::Derive($op) => $body,
            Operator::Validate($op) => $body,
            Operator::Clip($op) => $body,
            Operator::Replace($op) => $body,
            Operator::Trim($op) => $body,
            Operator::FillNull($op) => $body,
            Operator::Cast($op) => $body,
            Operator::Bin($op) => $body,
            Operator::Hash($op) => $body,
            Operator::Grep($op) => $body,
            Operator::Flatten($op) => $body,
            Operator::Head($op) => $body,
            Operator::Skip($op) => $body,
            Operator::Tail($op) => $body,
            Operator::Sort($op) => $body,
            Operator::Unique($op) => $body,
            Operator::Top($op) => $body,
            Operator::Sample($op) => $body,
            Operator::Stats($op) => $body,
            Operator::Frequency($op) => $body,
            Operator::GroupAgg($op) => $body,
            Operator::Step($op) => $body,
            Operator::Window($op) => $body,
            Operator::Lead($op) => $body,
            Operator::FillDown($op) => $body,
            Operator::Explode($op) => $body,
            Operator::Split($op) => $body,
            Operator::Unpivot($op) => $body,
            Operator::Pivot($op) => $body,
            Operator::Datetime($op) => $body,
            Operator::DateTrunc($op) => $body,
            Operator::Stack($op) => $body,
            Operator::Join($op) => $body,
            Operator::Onehot($op) => $body,
            Operator::LabelEncode($op) => $body,
            Operator::Ewma($op) => $body,
            Operator::Diff($op) => $body,
            Operator::Anomaly($op) => $body,
            Operator::SplitData($op) => $body,
            Operator::Interpolate($op) => $body,
            Operator::Normalize($op) => $body,
            Operator::Acf($op) => $body,
        }
    };
}

impl Operator {
    /// Build the runtime operator for a transform step. Codec steps are
    /// rejected; they belong to the I/O layer.
    pub fn from_spec(spec: &OpSpec, config: &EngineConfig) -> Result<Operator> {
        Ok(match spec {
            OpSpec::CsvDecode(_)
            | OpSpec::JsonlDecode(_)
            | OpSpec::TextDecode(_)
            | OpSpec::CsvEncode(_)
            | OpSpec::JsonlEncode
            | OpSpec::TextEncode
            | OpSpec::TableEncode(_) => {
                return Err(OpError::Build {
                    op: spec.name(),
                    message: "codec steps are not transforms".into(),
                })
            }
            OpSpec::Filter(a) => Operator::Filter(Filter::new(a.expr.clone())),
            OpSpec::Select(a) => Operator::Select(Select::new(a.columns.clone())),
            OpSpec::Rename(a) => Operator::Rename(Rename::new(a.mapping.clone())),
            OpSpec::Derive(a) => Operator::Derive(Derive::new(a.columns.clone())),
            OpSpec::Validate(a) => Operator::Validate(Validate::new(a.expr.clone())),
            OpSpec::Clip(a) => Operator::Clip(Clip::new(a.clone())),
            OpSpec::Replace(a) => Operator::Replace(Replace::new(a)?),
            OpSpec::Trim(a) => Operator::Trim(Trim::new(a.columns.clone())),
            OpSpec::FillNull(a) => Operator::FillNull(FillNull::new(&a.mapping)),
            OpSpec::Cast(a) => Operator::Cast(Cast::new(a.mapping.clone())),
            OpSpec::Bin(a) => Operator::Bin(Bin::new(a.clone())),
            OpSpec::Hash(a) => Operator::Hash(Hash::new(a.columns.clone())),
            OpSpec::Grep(a) => Operator::Grep(Grep::new(a)?),
            OpSpec::Flatten => Operator::Flatten(Flatten),
            OpSpec::Head(a) => Operator::Head(Head::new(a.n)),
            OpSpec::Skip(a) => Operator::Skip(Skip::new(a.n)),
            OpSpec::Tail(a) => Operator::Tail(Tail::new(a.n)),
            OpSpec::Sort(a) => Operator::Sort(Sort::new(a.columns.clone())),
            OpSpec::Unique(a) => Operator::Unique(Unique::new(a.columns.clone())),
            OpSpec::Top(a) => Operator::Top(Top::new(a.clone())),
            OpSpec::Sample(a) => Operator::Sample(Sample::new(a.n, a.seed.or(config.seed))),
            OpSpec::Stats(a) => Operator::Stats(Stats::new(a.stats.clone())),
            OpSpec::Frequency(a) => Operator::Frequency(Frequency::new(a.columns.clone())),
            OpSpec::GroupAgg(a) => Operator::GroupAgg(GroupAgg::new(a.clone())),
            OpSpec::Step(a) => Operator::Step(Step::new(a)),
            OpSpec::Window(a) => Operator::Window(Window::new(a)),
            OpSpec::Lead(a) => Operator::Lead(Lead::new(a)),
            OpSpec::FillDown(a) => Operator::FillDown(FillDown::new(a.columns.clone())),
            OpSpec::Explode(a) => Operator::Explode(Explode::new(a.clone())),
            OpSpec::Split(a) => Operator::Split(Split::new(a.clone())),
            OpSpec::Unpivot(a) => Operator::Unpivot(Unpivot::new(a.columns.clone())),
            OpSpec::Pivot(a) => Operator::Pivot(Pivot::new(a.clone())),
            OpSpec::Datetime(a) => Operator::Datetime(Datetime::new(a.clone())),
            OpSpec::DateTrunc(a) => Operator::DateTrunc(DateTrunc::new(a.clone())),
            OpSpec::Stack(a) => Operator::Stack(Stack::new(a.clone())),
            OpSpec::Join(a) => Operator::Join(Join::new(a.clone())),
            OpSpec::Onehot(a) => Operator::Onehot(Onehot::new(a.clone())),
            OpSpec::LabelEncode(a) => Operator::LabelEncode(LabelEncode::new(a)),
            OpSpec::Ewma(a) => Operator::Ewma(Ewma::new(a)),
            OpSpec::Diff(a) => Operator::Diff(Diff::new(a)),
            OpSpec::Anomaly(a) => Operator::Anomaly(Anomaly::new(a)),
            OpSpec::SplitData(a) => Operator::SplitData(SplitData::new(a.clone())),
            OpSpec::Interpolate(a) => Operator::Interpolate(Interpolate::new(a.clone())),
            OpSpec::Normalize(a) => Operator::Normalize(Normalize::new(a.clone())),
            OpSpec::Acf(a) => Operator::Acf(Acf::new(a.clone())),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operator::Filter(_) => "filter",
            Operator::Select(_) => "select",
            Operator::Rename(_) => "rename",
            Operator::Derive(_) => "derive",
            Operator::Validate(_) => "validate",
            Operator::Clip(_) => "clip",
            Operator::Replace(_) => "replace",
            Operator::Trim(_) => "trim",
            Operator::FillNull(_) => "fill-null",
            Operator::Cast(_) => "cast",
            Operator::Bin(_) => "bin",
            Operator::Hash(_) => "hash",
            Operator::Grep(_) => "grep",
            Operator::Flatten(_) => "flatten",
            Operator::Head(_) => "head",
            Operator::Skip(_) => "skip",
            Operator::Tail(_) => "tail",
            Operator::Sort(_) => "sort",
            Operator::Unique(_) => "unique",
            Operator::Top(_) => "top",
            Operator::Sample(_) => "sample",
            Operator::Stats(_) => "stats",
            Operator::Frequency(_) => "frequency",
            Operator::GroupAgg(_) => "group-agg",
            Operator::Step(_) => "step",
            Operator::Window(_) => "window",
            Operator::Lead(_) => "lead",
            Operator::FillDown(_) => "fill-down",
            Operator::Explode(_) => "explode",
            Operator::Split(_) => "split",
            Operator::Unpivot(_) => "unpivot",
            Operator::Pivot(_) => "pivot",
            Operator::Datetime(_) => "datetime",
            Operator::DateTrunc(_) => "date-trunc",
            Operator::Stack(_) => "stack",
            Operator::Join(_) => "join",
            Operator::Onehot(_) => "onehot",
            Operator::LabelEncode(_) => "label-encode",
            Operator::Ewma(_) => "ewma",
            Operator::Diff(_) => "diff",
            Operator::Anomaly(_) => "anomaly",
            Operator::SplitData(_) => "split-data",
            Operator::Interpolate(_) => "interpolate",
            Operator::Normalize(_) => "normalize",
            Operator::Acf(_) => "acf",
        }
    }

    pub fn class(&self) -> OpClass {
        match self {
            Operator::Tail(_)
            | Operator::Sort(_)
            | Operator::Unique(_)
            | Operator::Top(_)
            | Operator::Sample(_)
            | Operator::Stats(_)
            | Operator::Frequency(_)
            | Operator::GroupAgg(_)
            | Operator::Pivot(_)
            | Operator::Onehot(_)
            | Operator::Normalize(_)
            | Operator::Acf(_) => OpClass::Blocking,
            _ => OpClass::Streaming,
        }
    }

    /// True once the operator will never emit another row (`head` after N).
    pub fn is_done(&self) -> bool {
        match self {
            Operator::Head(h) => h.is_done(),
            _ => false,
        }
    }

    pub fn process(
        &mut self,
        rows: Vec<Row>,
        out: &mut Vec<Row>,
        errors: &mut Vec<RowError>,
    ) -> Result<()> {
        each_op!(self, op => op.process(rows, out, errors))
    }

    pub fn flush(&mut self, out: &mut Vec<Row>, errors: &mut Vec<RowError>) -> Result<()> {
        each_op!(self, op => op.flush(out, errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tranfi_core::plan::Plan;

    #[test]
    fn every_transform_in_a_plan_builds() {
        let plan = Plan::from_json(
            r#"{"steps":[
                {"op":"codec.csv.decode"},
                {"op":"filter","args":{"expr":"x > 1"}},
                {"op":"head","args":{"n":2}},
                {"op":"stats"},
                {"op":"codec.csv.encode"}]}"#,
        )
        .expect("plan");
        let cfg = EngineConfig::default();
        let ops: Vec<Operator> = plan
            .transforms()
            .iter()
            .map(|s| Operator::from_spec(s, &cfg).expect("build"))
            .collect();
        let names: Vec<&str> = ops.iter().map(Operator::name).collect();
        assert_eq!(names, vec!["filter", "head", "stats"]);
        assert_eq!(ops[2].class(), OpClass::Blocking);
        assert!(Operator::from_spec(plan.decoder(), &cfg).is_err());
    }
}
