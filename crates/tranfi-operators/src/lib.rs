#![forbid(unsafe_code)]
//! tranfi-operators: the transform library.
//!
//! Design intent:
//! - One struct per verb, each owning its own state. The closed `Operator`
//!   enum dispatches with a single `match`, so adding a verb is a compile
//!   error until every pass handles it.
//! - Streaming operators emit rows as they arrive; blocking ones buffer and
//!   emit from `flush`. Batch boundaries never change results.
//! - Per-row problems go to the caller's error list and never abort a run.

pub mod error;
pub mod operator;

pub mod aggregate;
pub mod clean;
pub mod datetime;
pub mod encode;
pub mod filter;
pub mod limit;
pub mod lookup;
pub mod project;
pub mod reshape;
pub mod sample;
pub mod sequence;
pub mod series;
pub mod sort;
pub mod stats;

pub use error::{OpError, Result};
pub use operator::{Operator, Transform};
