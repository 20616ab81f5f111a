use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExecError>;

#[derive(Debug, Error)]
pub enum ExecError {
    /// Lifecycle violation, e.g. push after finish.
    #[error("{0}")]
    State(&'static str),

    #[error("invalid channel {0}")]
    InvalidChannel(u32),

    /// Unknown, freed or stale handle.
    #[error("invalid handle")]
    InvalidHandle,

    #[error(transparent)]
    Plan(#[from] tranfi_core::Error),

    #[error(transparent)]
    Compile(#[from] tranfi_planner::CompileError),

    #[error(transparent)]
    Codec(#[from] tranfi_io::Error),

    #[error(transparent)]
    Operator(#[from] tranfi_operators::OpError),
}
