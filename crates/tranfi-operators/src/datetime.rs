//! Calendar operators: `datetime` part extraction and `date-trunc`.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use tranfi_core::dag::{DatePart, DateTruncArgs, DatetimeArgs, TruncLevel};
use tranfi_core::error::RowError;
use tranfi_core::row::Row;
use tranfi_core::value::Value;

use crate::error::Result;
use crate::operator::Transform;

/// Shape of the parsed input, so truncation can answer in kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Date,
    DateString,
    DateTimeString,
    Epoch,
}

const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FMT: &str = "%Y-%m-%d";

fn parse(v: &Value) -> Option<(NaiveDateTime, Shape)> {
    match v {
        Value::Date(d) => Some((d.and_time(NaiveTime::MIN), Shape::Date)),
        Value::Int(secs) => epoch(*secs).map(|dt| (dt, Shape::Epoch)),
        Value::Float(secs) if secs.is_finite() => {
            epoch(secs.floor() as i64).map(|dt| (dt, Shape::Epoch))
        }
        Value::Str(s) => parse_text(s.trim()),
        _ => None,
    }
}

fn epoch(secs: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc())
}

fn parse_text(s: &str) -> Option<(NaiveDateTime, Shape)> {
    if s.len() == 10 {
        return NaiveDate::parse_from_str(s, DATE_FMT)
            .ok()
            .map(|d| (d.and_time(NaiveTime::MIN), Shape::DateString));
    }
    for fmt in [DATETIME_FMT, "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some((dt, Shape::DateTimeString));
        }
    }
    // Fractional seconds or a zone suffix: keep the leading date.
    s.get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, DATE_FMT).ok())
        .map(|d| (d.and_time(NaiveTime::MIN), Shape::DateString))
}

fn part(dt: &NaiveDateTime, p: DatePart) -> i64 {
    match p {
        DatePart::Year => i64::from(dt.year()),
        DatePart::Month => i64::from(dt.month()),
        DatePart::Day => i64::from(dt.day()),
        DatePart::Hour => i64::from(dt.hour()),
        DatePart::Minute => i64::from(dt.minute()),
        DatePart::Second => i64::from(dt.second()),
        DatePart::Weekday => i64::from(dt.weekday().num_days_from_sunday()),
        DatePart::Epoch => dt.and_utc().timestamp(),
    }
}

/// Appends `<col>_<part>` Int columns.
pub struct Datetime {
    column: String,
    parts: Vec<(DatePart, String)>,
}

impl Datetime {
    pub fn new(args: DatetimeArgs) -> Self {
        let parts = args
            .extract
            .iter()
            .map(|p| (*p, format!("{}_{}", args.column, p.name())))
            .collect();
        Self {
            column: args.column,
            parts,
        }
    }
}

impl Transform for Datetime {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for mut row in rows {
            let parsed = parse(row.value(&self.column)).map(|(dt, _)| dt);
            for (p, name) in &self.parts {
                let v = parsed.as_ref().map_or(Value::Null, |dt| Value::Int(part(dt, *p)));
                row.set(name.as_str(), v);
            }
            out.push(row);
        }
        Ok(())
    }
}

fn truncate(dt: NaiveDateTime, level: TruncLevel) -> Option<NaiveDateTime> {
    let date = dt.date();
    let (h, mi, s) = (dt.hour(), dt.minute(), dt.second());
    match level {
        TruncLevel::Year => date.with_ordinal(1)?.and_hms_opt(0, 0, 0),
        TruncLevel::Month => date.with_day(1)?.and_hms_opt(0, 0, 0),
        TruncLevel::Day => date.and_hms_opt(0, 0, 0),
        TruncLevel::Hour => date.and_hms_opt(h, 0, 0),
        TruncLevel::Minute => date.and_hms_opt(h, mi, 0),
        TruncLevel::Second => date.and_hms_opt(h, mi, s),
    }
}

pub struct DateTrunc {
    column: String,
    result: String,
    level: TruncLevel,
}

impl DateTrunc {
    pub fn new(args: DateTruncArgs) -> Self {
        Self {
            result: args.result.unwrap_or_else(|| args.column.clone()),
            column: args.column,
            level: args.trunc,
        }
    }

    fn apply(&self, v: &Value) -> Value {
        let Some((dt, shape)) = parse(v) else {
            return Value::Null;
        };
        let Some(t) = truncate(dt, self.level) else {
            return Value::Null;
        };
        match shape {
            Shape::Date => Value::Date(t.date()),
            Shape::DateString => Value::Str(t.format(DATE_FMT).to_string()),
            Shape::DateTimeString => Value::Str(t.format(DATETIME_FMT).to_string()),
            Shape::Epoch => Value::Int(t.and_utc().timestamp()),
        }
    }
}

impl Transform for DateTrunc {
    fn process(&mut self, rows: Vec<Row>, out: &mut Vec<Row>, _errors: &mut Vec<RowError>) -> Result<()> {
        for mut row in rows {
            let v = self.apply(row.value(&self.column));
            row.set(self.result.as_str(), v);
            out.push(row);
        }
        Ok(())
    }
}
