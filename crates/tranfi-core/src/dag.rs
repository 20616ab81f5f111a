//! The closed operator set.
//!
//! Every op name resolves through `OP_REGISTRY` to an `OpInfo` (class and
//! required arguments) and then to exactly one `OpSpec` variant carrying typed,
//! defaulted arguments. Plans hold both the raw `{op, args}` step (for lossless
//! round-tripping) and the `OpSpec` (for execution, SQL and schema passes).

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::expr::Expression;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpClass {
    Decoder,
    Encoder,
    /// Emits rows as it consumes them (possibly with bounded lookahead).
    Streaming,
    /// Must see end-of-input before emitting.
    Blocking,
}

#[derive(Debug, Clone, Copy)]
pub struct OpInfo {
    pub name: &'static str,
    pub class: OpClass,
    pub required: &'static [&'static str],
}

const fn op(name: &'static str, class: OpClass, required: &'static [&'static str]) -> OpInfo {
    OpInfo {
        name,
        class,
        required,
    }
}

use OpClass::{Blocking, Decoder, Encoder, Streaming};

pub static OP_REGISTRY: &[OpInfo] = &[
    op("codec.csv.decode", Decoder, &[]),
    op("codec.jsonl.decode", Decoder, &[]),
    op("codec.text.decode", Decoder, &[]),
    op("codec.csv.encode", Encoder, &[]),
    op("codec.jsonl.encode", Encoder, &[]),
    op("codec.text.encode", Encoder, &[]),
    op("codec.table.encode", Encoder, &[]),
    op("filter", Streaming, &["expr"]),
    op("select", Streaming, &["columns"]),
    op("rename", Streaming, &["mapping"]),
    op("derive", Streaming, &["columns"]),
    op("validate", Streaming, &["expr"]),
    op("clip", Streaming, &["column"]),
    op("replace", Streaming, &["column", "pattern"]),
    op("trim", Streaming, &[]),
    op("fill-null", Streaming, &["mapping"]),
    op("cast", Streaming, &["mapping"]),
    op("bin", Streaming, &["column", "boundaries"]),
    op("hash", Streaming, &[]),
    op("grep", Streaming, &["pattern"]),
    op("flatten", Streaming, &[]),
    op("head", Streaming, &["n"]),
    op("skip", Streaming, &["n"]),
    op("tail", Blocking, &["n"]),
    op("sort", Blocking, &["columns"]),
    op("unique", Blocking, &[]),
    op("top", Blocking, &["n", "column"]),
    op("sample", Blocking, &["n"]),
    op("stats", Blocking, &[]),
    op("frequency", Blocking, &[]),
    op("group-agg", Blocking, &["aggs"]),
    op("step", Streaming, &["column", "func"]),
    op("window", Streaming, &["column", "size", "func"]),
    op("lead", Streaming, &["column"]),
    op("fill-down", Streaming, &[]),
    op("explode", Streaming, &["column"]),
    op("split", Streaming, &["column", "names"]),
    op("unpivot", Streaming, &["columns"]),
    op("pivot", Blocking, &["name_column", "value_column"]),
    op("datetime", Streaming, &["column"]),
    op("date-trunc", Streaming, &["column", "trunc"]),
    op("stack", Streaming, &["file"]),
    op("join", Streaming, &["file", "on"]),
    op("onehot", Blocking, &["column"]),
    op("label-encode", Streaming, &["column"]),
    op("ewma", Streaming, &["column", "alpha"]),
    op("diff", Streaming, &["column"]),
    op("anomaly", Streaming, &["column"]),
    op("split-data", Streaming, &[]),
    op("interpolate", Streaming, &["column"]),
    op("normalize", Blocking, &["columns"]),
    op("acf", Blocking, &["column"]),
];

static BY_NAME: Lazy<HashMap<&'static str, &'static OpInfo>> =
    Lazy::new(|| OP_REGISTRY.iter().map(|i| (i.name, i)).collect());

const ALIASES: &[(&str, &str)] = &[
    ("reorder", "select"),
    ("dedup", "unique"),
    ("date_trunc", "date-trunc"),
    ("fill_null", "fill-null"),
    ("fill_down", "fill-down"),
    ("group_agg", "group-agg"),
    ("label_encode", "label-encode"),
    ("split_data", "split-data"),
];

/// Resolve aliases and short codec names (`csv.decode`) to the canonical name.
pub fn canonical_name(name: &str) -> Option<&'static str> {
    if let Some(info) = BY_NAME.get(name) {
        return Some(info.name);
    }
    if let Some((_, to)) = ALIASES.iter().find(|(from, _)| *from == name) {
        return BY_NAME.get(to).map(|i| i.name);
    }
    BY_NAME.get(format!("codec.{name}").as_str()).map(|i| i.name)
}

pub fn op_info(name: &str) -> Option<&'static OpInfo> {
    canonical_name(name).and_then(|n| BY_NAME.get(n).copied())
}

// ---------------------------------------------------------------------------
// Argument types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CsvDecodeArgs {
    #[serde(default = "comma", deserialize_with = "lenient::delimiter")]
    pub delimiter: char,
    #[serde(default = "yes", deserialize_with = "lenient::boolean")]
    pub header: bool,
    #[serde(default, deserialize_with = "lenient::opt_usize")]
    pub batch_size: Option<usize>,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub repair: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct LineDecodeArgs {
    #[serde(default, deserialize_with = "lenient::opt_usize")]
    pub batch_size: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CsvEncodeArgs {
    #[serde(default = "comma", deserialize_with = "lenient::delimiter")]
    pub delimiter: char,
    #[serde(default = "yes", deserialize_with = "lenient::boolean")]
    pub header: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableEncodeArgs {
    #[serde(default = "forty", deserialize_with = "lenient::usize")]
    pub max_width: usize,
    /// 0 = unlimited.
    #[serde(default, deserialize_with = "lenient::usize")]
    pub max_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExprArgs {
    pub expr: Expression,
}

/// Column list; empty means "all columns" where the op allows it.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ColumnsArgs {
    #[serde(default, deserialize_with = "lenient::names")]
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RenameArgs {
    pub mapping: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeriveArgs {
    pub columns: Vec<DeriveColumn>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeriveColumn {
    pub name: String,
    pub expr: Expression,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClipArgs {
    pub column: String,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub min: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReplaceArgs {
    pub column: String,
    pub pattern: String,
    #[serde(default)]
    pub replacement: String,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub regex: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FillNullArgs {
    pub mapping: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CastArgs {
    pub mapping: BTreeMap<String, CastType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CastType {
    #[serde(alias = "int64", alias = "integer")]
    Int,
    #[serde(alias = "float64", alias = "double")]
    Float,
    #[serde(alias = "str", alias = "text")]
    String,
    #[serde(alias = "boolean")]
    Bool,
    Date,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BinArgs {
    pub column: String,
    #[serde(deserialize_with = "lenient::f64_list")]
    pub boundaries: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GrepArgs {
    #[serde(default = "line_column")]
    pub column: String,
    pub pattern: String,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub invert: bool,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub regex: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CountArgs {
    #[serde(deserialize_with = "lenient::usize")]
    pub n: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SampleArgs {
    #[serde(deserialize_with = "lenient::usize")]
    pub n: usize,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SortArgs {
    pub columns: Vec<SortKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "SortKeyRepr")]
pub struct SortKey {
    pub name: String,
    pub desc: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SortKeyRepr {
    /// `"-price"` sorts descending.
    Bare(String),
    Full {
        #[serde(alias = "column")]
        name: String,
        #[serde(default)]
        desc: bool,
    },
}

impl From<SortKeyRepr> for SortKey {
    fn from(r: SortKeyRepr) -> Self {
        match r {
            SortKeyRepr::Bare(s) => match s.strip_prefix('-') {
                Some(name) => SortKey {
                    name: name.to_string(),
                    desc: true,
                },
                None => SortKey {
                    name: s.strip_prefix('+').unwrap_or(&s).to_string(),
                    desc: false,
                },
            },
            SortKeyRepr::Full { name, desc } => SortKey { name, desc },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TopArgs {
    #[serde(deserialize_with = "lenient::usize")]
    pub n: usize,
    pub column: String,
    #[serde(default = "yes", deserialize_with = "lenient::boolean")]
    pub desc: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatsArgs {
    #[serde(default = "StatKind::defaults")]
    pub stats: Vec<StatKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatKind {
    Count,
    Sum,
    #[serde(alias = "mean")]
    Avg,
    Min,
    Max,
    #[serde(alias = "variance")]
    Var,
    #[serde(alias = "std")]
    Stddev,
    Median,
    P25,
    P75,
    #[serde(alias = "skew")]
    Skewness,
    Kurtosis,
    Distinct,
    Hist,
    Sample,
}

impl StatKind {
    /// Canonical output order.
    pub const ALL: [StatKind; 15] = [
        StatKind::Count,
        StatKind::Sum,
        StatKind::Avg,
        StatKind::Min,
        StatKind::Max,
        StatKind::Var,
        StatKind::Stddev,
        StatKind::Median,
        StatKind::P25,
        StatKind::P75,
        StatKind::Skewness,
        StatKind::Kurtosis,
        StatKind::Distinct,
        StatKind::Hist,
        StatKind::Sample,
    ];

    pub fn defaults() -> Vec<StatKind> {
        StatKind::ALL[..8].to_vec()
    }

    pub fn name(self) -> &'static str {
        match self {
            StatKind::Count => "count",
            StatKind::Sum => "sum",
            StatKind::Avg => "avg",
            StatKind::Min => "min",
            StatKind::Max => "max",
            StatKind::Var => "var",
            StatKind::Stddev => "stddev",
            StatKind::Median => "median",
            StatKind::P25 => "p25",
            StatKind::P75 => "p75",
            StatKind::Skewness => "skewness",
            StatKind::Kurtosis => "kurtosis",
            StatKind::Distinct => "distinct",
            StatKind::Hist => "hist",
            StatKind::Sample => "sample",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GroupAggArgs {
    #[serde(default, deserialize_with = "lenient::names")]
    pub group_by: Vec<String>,
    pub aggs: Vec<AggSpec>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AggSpec {
    pub column: String,
    pub func: AggFunc,
    #[serde(default, alias = "result")]
    pub name: Option<String>,
}

impl AggSpec {
    pub fn output_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{}_{}", self.column, self.func.name()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggFunc {
    Sum,
    #[serde(alias = "mean")]
    Avg,
    Count,
    Min,
    Max,
}

impl AggFunc {
    pub fn name(self) -> &'static str {
        match self {
            AggFunc::Sum => "sum",
            AggFunc::Avg => "avg",
            AggFunc::Count => "count",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StepArgs {
    pub column: String,
    pub func: StepFunc,
    #[serde(default)]
    pub result: Option<String>,
}

impl StepArgs {
    pub fn result_name(&self) -> String {
        self.result
            .clone()
            .unwrap_or_else(|| format!("{}_{}", self.column, self.func.name()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepFunc {
    #[serde(alias = "cumsum")]
    RunningSum,
    #[serde(alias = "cumavg")]
    RunningAvg,
    RunningMin,
    RunningMax,
    RunningCount,
    Delta,
    Lag,
    Ratio,
}

impl StepFunc {
    pub fn name(self) -> &'static str {
        match self {
            StepFunc::RunningSum => "running-sum",
            StepFunc::RunningAvg => "running-avg",
            StepFunc::RunningMin => "running-min",
            StepFunc::RunningMax => "running-max",
            StepFunc::RunningCount => "running-count",
            StepFunc::Delta => "delta",
            StepFunc::Lag => "lag",
            StepFunc::Ratio => "ratio",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WindowArgs {
    pub column: String,
    #[serde(deserialize_with = "lenient::usize")]
    pub size: usize,
    pub func: WindowFunc,
    #[serde(default)]
    pub result: Option<String>,
}

impl WindowArgs {
    pub fn result_name(&self) -> String {
        self.result
            .clone()
            .unwrap_or_else(|| format!("{}_{}{}", self.column, self.func.name(), self.size))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowFunc {
    #[serde(alias = "mean")]
    Avg,
    Sum,
    Min,
    Max,
    Count,
}

impl WindowFunc {
    pub fn name(self) -> &'static str {
        match self {
            WindowFunc::Avg => "avg",
            WindowFunc::Sum => "sum",
            WindowFunc::Min => "min",
            WindowFunc::Max => "max",
            WindowFunc::Count => "count",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LeadArgs {
    pub column: String,
    #[serde(default = "one", deserialize_with = "lenient::usize")]
    pub offset: usize,
    #[serde(default)]
    pub result: Option<String>,
}

impl LeadArgs {
    pub fn result_name(&self) -> String {
        self.result
            .clone()
            .unwrap_or_else(|| format!("{}_lead{}", self.column, self.offset))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExplodeArgs {
    pub column: String,
    #[serde(default = "comma_str")]
    pub delimiter: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SplitArgs {
    pub column: String,
    #[serde(default = "space_str")]
    pub delimiter: String,
    #[serde(deserialize_with = "lenient::names")]
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PivotArgs {
    pub name_column: String,
    pub value_column: String,
    #[serde(default)]
    pub agg: PivotAgg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PivotAgg {
    First,
    #[default]
    Sum,
    Count,
    #[serde(alias = "mean")]
    Avg,
    Min,
    Max,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatetimeArgs {
    pub column: String,
    #[serde(default = "DatePart::all")]
    pub extract: Vec<DatePart>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatePart {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    #[serde(alias = "dow")]
    Weekday,
    Epoch,
}

impl DatePart {
    pub fn all() -> Vec<DatePart> {
        vec![
            DatePart::Year,
            DatePart::Month,
            DatePart::Day,
            DatePart::Hour,
            DatePart::Minute,
            DatePart::Second,
            DatePart::Weekday,
            DatePart::Epoch,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            DatePart::Year => "year",
            DatePart::Month => "month",
            DatePart::Day => "day",
            DatePart::Hour => "hour",
            DatePart::Minute => "minute",
            DatePart::Second => "second",
            DatePart::Weekday => "weekday",
            DatePart::Epoch => "epoch",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DateTruncArgs {
    pub column: String,
    pub trunc: TruncLevel,
    #[serde(default)]
    pub result: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TruncLevel {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StackArgs {
    pub file: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub tag_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JoinArgs {
    pub file: String,
    /// `"id"` or `"left_col=lookup_col"`.
    pub on: String,
    #[serde(default)]
    pub how: JoinHow,
}

impl JoinArgs {
    /// (primary column, lookup column)
    pub fn keys(&self) -> (&str, &str) {
        match self.on.split_once('=') {
            Some((l, r)) => (l.trim(), r.trim()),
            None => (self.on.trim(), self.on.trim()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinHow {
    #[default]
    Inner,
    Left,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OnehotArgs {
    pub column: String,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub drop: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LabelEncodeArgs {
    pub column: String,
    #[serde(default)]
    pub result: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EwmaArgs {
    pub column: String,
    #[serde(deserialize_with = "lenient::f64")]
    pub alpha: f64,
    #[serde(default)]
    pub result: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DiffArgs {
    pub column: String,
    #[serde(default = "one", deserialize_with = "lenient::usize")]
    pub order: usize,
    #[serde(default)]
    pub result: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnomalyArgs {
    pub column: String,
    #[serde(default = "three", deserialize_with = "lenient::f64")]
    pub threshold: f64,
    #[serde(default)]
    pub result: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SplitDataArgs {
    #[serde(default = "eighty_pct", deserialize_with = "lenient::f64")]
    pub ratio: f64,
    #[serde(default = "forty_two", deserialize_with = "lenient::u64")]
    pub seed: u64,
    #[serde(default = "split_column")]
    pub result: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InterpolateArgs {
    pub column: String,
    #[serde(default)]
    pub method: InterpMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpMethod {
    #[serde(alias = "ffill")]
    Forward,
    #[serde(alias = "bfill")]
    Backward,
    #[default]
    Linear,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NormalizeArgs {
    #[serde(deserialize_with = "lenient::names")]
    pub columns: Vec<String>,
    #[serde(default)]
    pub method: NormMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormMethod {
    #[default]
    #[serde(alias = "min-max")]
    Minmax,
    #[serde(alias = "z-score")]
    Zscore,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AcfArgs {
    pub column: String,
    #[serde(default = "twenty", deserialize_with = "lenient::usize")]
    pub lags: usize,
}

fn comma() -> char {
    ','
}
fn comma_str() -> String {
    ",".into()
}
fn space_str() -> String {
    " ".into()
}
fn yes() -> bool {
    true
}
fn one() -> usize {
    1
}
fn twenty() -> usize {
    20
}
fn forty() -> usize {
    40
}
fn three() -> f64 {
    3.0
}
fn eighty_pct() -> f64 {
    0.8
}
fn forty_two() -> u64 {
    42
}
fn line_column() -> String {
    "_line".into()
}
fn split_column() -> String {
    "_split".into()
}

// ---------------------------------------------------------------------------
// OpSpec
// ---------------------------------------------------------------------------

/// One validated step with typed arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum OpSpec {
    CsvDecode(CsvDecodeArgs),
    JsonlDecode(LineDecodeArgs),
    TextDecode(LineDecodeArgs),
    CsvEncode(CsvEncodeArgs),
    JsonlEncode,
    TextEncode,
    TableEncode(TableEncodeArgs),
    Filter(ExprArgs),
    Select(ColumnsArgs),
    Rename(RenameArgs),
    Derive(DeriveArgs),
    Validate(ExprArgs),
    Clip(ClipArgs),
    Replace(ReplaceArgs),
    Trim(ColumnsArgs),
    FillNull(FillNullArgs),
    Cast(CastArgs),
    Bin(BinArgs),
    Hash(ColumnsArgs),
    Grep(GrepArgs),
    Flatten,
    Head(CountArgs),
    Skip(CountArgs),
    Tail(CountArgs),
    Sort(SortArgs),
    Unique(ColumnsArgs),
    Top(TopArgs),
    Sample(SampleArgs),
    Stats(StatsArgs),
    Frequency(ColumnsArgs),
    GroupAgg(GroupAggArgs),
    Step(StepArgs),
    Window(WindowArgs),
    Lead(LeadArgs),
    FillDown(ColumnsArgs),
    Explode(ExplodeArgs),
    Split(SplitArgs),
    Unpivot(ColumnsArgs),
    Pivot(PivotArgs),
    Datetime(DatetimeArgs),
    DateTrunc(DateTruncArgs),
    Stack(StackArgs),
    Join(JoinArgs),
    Onehot(OnehotArgs),
    LabelEncode(LabelEncodeArgs),
    Ewma(EwmaArgs),
    Diff(DiffArgs),
    Anomaly(AnomalyArgs),
    SplitData(SplitDataArgs),
    Interpolate(InterpolateArgs),
    Normalize(NormalizeArgs),
    Acf(AcfArgs),
}

impl OpSpec {
    /// Resolve `op` and build typed arguments from a JSON object.
    pub fn from_step(op: &str, args: &serde_json::Value) -> Result<OpSpec> {
        let info = op_info(op).ok_or_else(|| Error::Plan(format!("unknown op: '{op}'")))?;
        let name = info.name;

        let empty = serde_json::Map::new();
        let obj = match args {
            serde_json::Value::Object(m) => m,
            serde_json::Value::Null => &empty,
            _ => {
                return Err(Error::Plan(format!(
                    "op '{name}' args must be a JSON object"
                )))
            }
        };
        for req in info.required {
            if obj.get(*req).map_or(true, serde_json::Value::is_null) {
                return Err(Error::Plan(format!(
                    "op '{name}' missing required arg '{req}'"
                )));
            }
        }
        let args = serde_json::Value::Object(obj.clone());

        let spec = match name {
            "codec.csv.decode" => OpSpec::CsvDecode(typed(name, args)?),
            "codec.jsonl.decode" => OpSpec::JsonlDecode(typed(name, args)?),
            "codec.text.decode" => OpSpec::TextDecode(typed(name, args)?),
            "codec.csv.encode" => OpSpec::CsvEncode(typed(name, args)?),
            "codec.jsonl.encode" => OpSpec::JsonlEncode,
            "codec.text.encode" => OpSpec::TextEncode,
            "codec.table.encode" => OpSpec::TableEncode(typed(name, args)?),
            "filter" => OpSpec::Filter(typed(name, args)?),
            "select" => OpSpec::Select(typed(name, args)?),
            "rename" => OpSpec::Rename(typed(name, args)?),
            "derive" => OpSpec::Derive(typed(name, args)?),
            "validate" => OpSpec::Validate(typed(name, args)?),
            "clip" => OpSpec::Clip(typed(name, args)?),
            "replace" => OpSpec::Replace(typed(name, args)?),
            "trim" => OpSpec::Trim(typed(name, args)?),
            "fill-null" => OpSpec::FillNull(typed(name, args)?),
            "cast" => OpSpec::Cast(typed(name, args)?),
            "bin" => OpSpec::Bin(typed(name, args)?),
            "hash" => OpSpec::Hash(typed(name, args)?),
            "grep" => OpSpec::Grep(typed(name, args)?),
            "flatten" => OpSpec::Flatten,
            "head" => OpSpec::Head(typed(name, args)?),
            "skip" => OpSpec::Skip(typed(name, args)?),
            "tail" => OpSpec::Tail(typed(name, args)?),
            "sort" => OpSpec::Sort(typed(name, args)?),
            "unique" => OpSpec::Unique(typed(name, args)?),
            "top" => OpSpec::Top(typed(name, args)?),
            "sample" => OpSpec::Sample(typed(name, args)?),
            "stats" => OpSpec::Stats(typed(name, args)?),
            "frequency" => OpSpec::Frequency(typed(name, args)?),
            "group-agg" => OpSpec::GroupAgg(typed(name, args)?),
            "step" => OpSpec::Step(typed(name, args)?),
            "window" => OpSpec::Window(typed(name, args)?),
            "lead" => OpSpec::Lead(typed(name, args)?),
            "fill-down" => OpSpec::FillDown(typed(name, args)?),
            "explode" => OpSpec::Explode(typed(name, args)?),
            "split" => OpSpec::Split(typed(name, args)?),
            "unpivot" => OpSpec::Unpivot(typed(name, args)?),
            "pivot" => OpSpec::Pivot(typed(name, args)?),
            "datetime" => OpSpec::Datetime(typed(name, args)?),
            "date-trunc" => OpSpec::DateTrunc(typed(name, args)?),
            "stack" => OpSpec::Stack(typed(name, args)?),
            "join" => OpSpec::Join(typed(name, args)?),
            "onehot" => OpSpec::Onehot(typed(name, args)?),
            "label-encode" => OpSpec::LabelEncode(typed(name, args)?),
            "ewma" => OpSpec::Ewma(typed(name, args)?),
            "diff" => OpSpec::Diff(typed(name, args)?),
            "anomaly" => OpSpec::Anomaly(typed(name, args)?),
            "split-data" => OpSpec::SplitData(typed(name, args)?),
            "interpolate" => OpSpec::Interpolate(typed(name, args)?),
            "normalize" => OpSpec::Normalize(typed(name, args)?),
            "acf" => OpSpec::Acf(typed(name, args)?),
            other => {
                return Err(Error::Invariant(format!(
                    "registered op '{other}' has no argument binding"
                )))
            }
        };
        spec.check()?;
        Ok(spec)
    }

    pub fn name(&self) -> &'static str {
        match self {
            OpSpec::CsvDecode(_) => "codec.csv.decode",
            OpSpec::JsonlDecode(_) => "codec.jsonl.decode",
            OpSpec::TextDecode(_) => "codec.text.decode",
            OpSpec::CsvEncode(_) => "codec.csv.encode",
            OpSpec::JsonlEncode => "codec.jsonl.encode",
            OpSpec::TextEncode => "codec.text.encode",
            OpSpec::TableEncode(_) => "codec.table.encode",
            OpSpec::Filter(_) => "filter",
            OpSpec::Select(_) => "select",
            OpSpec::Rename(_) => "rename",
            OpSpec::Derive(_) => "derive",
            OpSpec::Validate(_) => "validate",
            OpSpec::Clip(_) => "clip",
            OpSpec::Replace(_) => "replace",
            OpSpec::Trim(_) => "trim",
            OpSpec::FillNull(_) => "fill-null",
            OpSpec::Cast(_) => "cast",
            OpSpec::Bin(_) => "bin",
            OpSpec::Hash(_) => "hash",
            OpSpec::Grep(_) => "grep",
            OpSpec::Flatten => "flatten",
            OpSpec::Head(_) => "head",
            OpSpec::Skip(_) => "skip",
            OpSpec::Tail(_) => "tail",
            OpSpec::Sort(_) => "sort",
            OpSpec::Unique(_) => "unique",
            OpSpec::Top(_) => "top",
            OpSpec::Sample(_) => "sample",
            OpSpec::Stats(_) => "stats",
            OpSpec::Frequency(_) => "frequency",
            OpSpec::GroupAgg(_) => "group-agg",
            OpSpec::Step(_) => "step",
            OpSpec::Window(_) => "window",
            OpSpec::Lead(_) => "lead",
            OpSpec::FillDown(_) => "fill-down",
            OpSpec::Explode(_) => "explode",
            OpSpec::Split(_) => "split",
            OpSpec::Unpivot(_) => "unpivot",
            OpSpec::Pivot(_) => "pivot",
            OpSpec::Datetime(_) => "datetime",
            OpSpec::DateTrunc(_) => "date-trunc",
            OpSpec::Stack(_) => "stack",
            OpSpec::Join(_) => "join",
            OpSpec::Onehot(_) => "onehot",
            OpSpec::LabelEncode(_) => "label-encode",
            OpSpec::Ewma(_) => "ewma",
            OpSpec::Diff(_) => "diff",
            OpSpec::Anomaly(_) => "anomaly",
            OpSpec::SplitData(_) => "split-data",
            OpSpec::Interpolate(_) => "interpolate",
            OpSpec::Normalize(_) => "normalize",
            OpSpec::Acf(_) => "acf",
        }
    }

    pub fn class(&self) -> OpClass {
        op_info(self.name())
            .map(|i| i.class)
            .unwrap_or(OpClass::Streaming)
    }

    /// Structural constraints serde cannot express.
    fn check(&self) -> Result<()> {
        let fail = |msg: String| -> Result<()> {
            Err(Error::Plan(format!("op '{}' {}", self.name(), msg)))
        };
        match self {
            OpSpec::Select(a) | OpSpec::Unpivot(a) if a.columns.is_empty() => {
                fail("needs at least one column".into())
            }
            OpSpec::Normalize(a) if a.columns.is_empty() => fail("needs at least one column".into()),
            OpSpec::Rename(a) if a.mapping.is_empty() => fail("needs at least one mapping".into()),
            OpSpec::Cast(a) if a.mapping.is_empty() => fail("needs at least one mapping".into()),
            OpSpec::FillNull(a) if a.mapping.is_empty() => {
                fail("needs at least one mapping".into())
            }
            OpSpec::Derive(a) if a.columns.is_empty() => fail("needs at least one column".into()),
            OpSpec::Derive(a) if a.columns.iter().any(|c| c.name.is_empty()) => {
                fail("has an empty column name".into())
            }
            OpSpec::Sort(a) if a.columns.is_empty() => fail("needs at least one key".into()),
            OpSpec::GroupAgg(a) if a.aggs.is_empty() => fail("needs at least one aggregate".into()),
            OpSpec::Window(a) if a.size == 0 => fail("size must be > 0".into()),
            OpSpec::Lead(a) if a.offset == 0 => fail("offset must be > 0".into()),
            OpSpec::Diff(a) if a.order == 0 => fail("order must be > 0".into()),
            OpSpec::Bin(a) if a.boundaries.is_empty() => fail("needs at least one boundary".into()),
            OpSpec::Bin(a) if a.boundaries.windows(2).any(|w| w[0] >= w[1]) => {
                fail("boundaries must be strictly ascending".into())
            }
            OpSpec::Split(a) if a.names.is_empty() => fail("needs at least one name".into()),
            OpSpec::Explode(a) if a.delimiter.is_empty() => fail("delimiter is empty".into()),
            OpSpec::Join(a) if a.file.trim().is_empty() => fail("file is empty".into()),
            OpSpec::Join(a) if a.keys().0.is_empty() || a.keys().1.is_empty() => {
                fail("'on' must name a column".into())
            }
            OpSpec::Stack(a) if a.file.trim().is_empty() => fail("file is empty".into()),
            OpSpec::Ewma(a) if !(a.alpha > 0.0 && a.alpha <= 1.0) => {
                fail("alpha must be in (0, 1]".into())
            }
            OpSpec::SplitData(a) if !(0.0..=1.0).contains(&a.ratio) => {
                fail("ratio must be in [0, 1]".into())
            }
            OpSpec::Clip(a) if a.min.is_none() && a.max.is_none() => {
                fail("needs min or max".into())
            }
            OpSpec::Clip(ClipArgs {
                min: Some(lo),
                max: Some(hi),
                ..
            }) if lo > hi => fail("min must not exceed max".into()),
            OpSpec::Grep(a) if a.pattern.is_empty() => fail("pattern is empty".into()),
            OpSpec::Replace(a) if a.pattern.is_empty() => fail("pattern is empty".into()),
            _ => Ok(()),
        }
    }
}

fn typed<T: DeserializeOwned>(name: &str, args: serde_json::Value) -> Result<T> {
    serde_json::from_value(args).map_err(|e| Error::Plan(format!("op '{name}' has invalid args: {e}")))
}

/// Argument deserializers that accept the loose shapes the DSL and hand-written
/// JSON produce: numbers as strings, comma-joined column lists, `"\t"` escapes.
mod lenient {
    use super::*;
    use serde::de::Error as _;
    use serde_json::Value as J;

    fn as_u64(v: &J) -> Option<u64> {
        match v {
            J::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64)),
            J::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn as_f64(v: &J) -> Option<f64> {
        match v {
            J::Number(n) => n.as_f64(),
            J::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn usize<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<usize, D::Error> {
        let v = J::deserialize(d)?;
        as_u64(&v)
            .map(|n| n as usize)
            .ok_or_else(|| D::Error::custom(format!("expected a non-negative integer, got {v}")))
    }

    pub fn u64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<u64, D::Error> {
        let v = J::deserialize(d)?;
        as_u64(&v).ok_or_else(|| D::Error::custom(format!("expected a non-negative integer, got {v}")))
    }

    pub fn opt_usize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<Option<usize>, D::Error> {
        let v = J::deserialize(d)?;
        if v.is_null() {
            return Ok(None);
        }
        as_u64(&v)
            .map(|n| Some(n as usize))
            .ok_or_else(|| D::Error::custom(format!("expected a non-negative integer, got {v}")))
    }

    pub fn opt_u64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<u64>, D::Error> {
        let v = J::deserialize(d)?;
        if v.is_null() {
            return Ok(None);
        }
        as_u64(&v)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected a non-negative integer, got {v}")))
    }

    pub fn f64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<f64, D::Error> {
        let v = J::deserialize(d)?;
        as_f64(&v).ok_or_else(|| D::Error::custom(format!("expected a number, got {v}")))
    }

    pub fn opt_f64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<f64>, D::Error> {
        let v = J::deserialize(d)?;
        if v.is_null() {
            return Ok(None);
        }
        as_f64(&v)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected a number, got {v}")))
    }

    pub fn f64_list<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Vec<f64>, D::Error> {
        let v = J::deserialize(d)?;
        let items: Vec<J> = match v {
            J::Array(a) => a,
            J::String(s) => s
                .split(',')
                .filter(|p| !p.trim().is_empty())
                .map(|p| J::String(p.to_string()))
                .collect(),
            other => vec![other],
        };
        items
            .iter()
            .map(|i| as_f64(i).ok_or_else(|| D::Error::custom(format!("expected a number, got {i}"))))
            .collect()
    }

    pub fn boolean<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<bool, D::Error> {
        let v = J::deserialize(d)?;
        match &v {
            J::Bool(b) => Ok(*b),
            J::Null => Ok(false),
            J::Number(n) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
            J::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" | "on" => Ok(true),
                "false" | "no" | "0" | "off" | "" => Ok(false),
                _ => Err(D::Error::custom(format!("expected a boolean, got {v}"))),
            },
            _ => Err(D::Error::custom(format!("expected a boolean, got {v}"))),
        }
    }

    /// A list of names, or one comma-separated string.
    pub fn names<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Vec<String>, D::Error> {
        let v = J::deserialize(d)?;
        match v {
            J::Null => Ok(Vec::new()),
            J::String(s) => Ok(s
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect()),
            J::Array(items) => items
                .into_iter()
                .map(|i| match i {
                    J::String(s) => Ok(s),
                    other => Err(D::Error::custom(format!("expected a column name, got {other}"))),
                })
                .collect(),
            other => Err(D::Error::custom(format!("expected column names, got {other}"))),
        }
    }

    /// One character; accepts the two-character escape `\t`.
    pub fn delimiter<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<char, D::Error> {
        let s = String::deserialize(d)?;
        let s = match s.as_str() {
            "\\t" | "tab" => "\t",
            other => other,
        };
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii() => Ok(c),
            _ => Err(D::Error::custom(format!(
                "delimiter must be a single ASCII character, got {s:?}"
            ))),
        }
    }
}
