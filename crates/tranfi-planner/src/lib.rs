#![forbid(unsafe_code)]
//! tranfi-planner: from pipe DSL text (or a recipe name, or a JSON/YAML
//! document) to a validated `tranfi_core::plan::Plan`, plus two read-only
//! passes over finished plans.
//!
//! Design:
//! - The DSL is split into stages on `|`, each stage is tokenized, and a
//!   per-verb builder turns the tokens into the JSON `args` object that the
//!   core registry deserializes. Builders only shape arguments; all typing and
//!   range checks stay in `tranfi-core::dag`, so JSON plans and DSL plans are
//!   validated by the same code.
//! - Errors carry the stage index and verb that produced them.
//! - `sql` renders a DuckDB CTE chain; `schema` predicts output columns.
//!
//! NOTE: no I/O and no execution here.

pub mod dsl;
pub mod error;
pub mod recipes;
pub mod schema;
pub mod sql;

pub use dsl::{compile, compile_dsl, compile_json, compile_yaml};
pub use error::{CompileError, Result};
pub use recipes::{recipe_by_index, recipe_by_name, recipe_count, recipes, Recipe};
pub use schema::infer_columns;
pub use sql::to_sql;
