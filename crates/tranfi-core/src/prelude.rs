//! Convenient re-exports for downstream crates.

pub use crate::config::EngineConfig;
pub use crate::dag::{OpClass, OpSpec};
pub use crate::error::{Error, Result, RowError};
pub use crate::expr::Expression;
pub use crate::hash::Hash256;
pub use crate::plan::{Plan, Step};
pub use crate::row::{Row, RowBatch};
pub use crate::value::{Value, ValueKey};
