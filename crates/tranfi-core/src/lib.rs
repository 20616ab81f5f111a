#![forbid(unsafe_code)]
//! tranfi-core: values, rows, expressions, the operator registry, and plans.
//!
//! Design intent:
//! - `Value`/`Row`/`RowBatch` are the only data model; every other crate speaks it.
//! - Expressions are parsed once when a plan is built and evaluated per row.
//! - The operator set is closed: `OpSpec` is an enum, and every op name maps to
//!   exactly one typed argument struct. Unknown ops never reach execution.
//! - A `Plan` is always validated; there is no way to hold an unchecked one.
//! - No I/O here. Codecs live in `tranfi-io`, execution in `tranfi-exec`.

pub mod config;
pub mod dag;
pub mod error;
pub mod expr;
pub mod hash;
pub mod plan;
pub mod prelude;
pub mod row;
pub mod value;

pub use error::{Error, Result, RowError};
