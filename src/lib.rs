#![forbid(unsafe_code)]
//! tranfi: a streaming ETL runtime.
//!
//! Umbrella crate over the workspace. Most callers want [`compile`] and
//! [`Pipeline`], or [`run`] for a whole input already in memory.

pub use tranfi_core as model;
pub use tranfi_exec as exec;
pub use tranfi_io as io;
pub use tranfi_operators as operators;
pub use tranfi_planner as planner;

pub use tranfi_core::config::EngineConfig;
pub use tranfi_core::plan::{Plan, Step};
pub use tranfi_exec::{Channel, ExecError, Pipeline, RunStats};
pub use tranfi_planner::{compile, recipe_by_name, recipes, to_sql, CompileError};

/// Everything a finished pipeline wrote, per channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
    pub main: Vec<u8>,
    pub errors: Vec<u8>,
    pub stats: Vec<u8>,
    pub samples: Vec<u8>,
}

/// Compile `dsl`, push `input` in chunks of `chunk` bytes, finish and collect
/// every channel.
pub fn run(dsl: &str, input: &[u8], chunk: usize) -> Result<Output, ExecError> {
    let plan = compile(dsl)?;
    run_plan(&plan, EngineConfig::default(), input, chunk)
}

pub fn run_plan(
    plan: &Plan,
    config: EngineConfig,
    input: &[u8],
    chunk: usize,
) -> Result<Output, ExecError> {
    let mut pipeline = Pipeline::with_config(plan, config)?;
    let mut out = Output::default();
    for piece in input.chunks(chunk.max(1)) {
        pipeline.push(piece)?;
        out.main.extend(pipeline.drain(Channel::Main)?);
    }
    pipeline.finish()?;
    out.main.extend(pipeline.drain(Channel::Main)?);
    out.errors = pipeline.drain(Channel::Errors)?;
    out.stats = pipeline.drain(Channel::Stats)?;
    out.samples = pipeline.drain(Channel::Samples)?;
    pipeline.release();
    Ok(out)
}
