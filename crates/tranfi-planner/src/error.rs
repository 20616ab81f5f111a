use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompileError>;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("empty pipeline")]
    EmptyPipeline,

    #[error("empty stage at position {0}")]
    EmptyStage(usize),

    /// A stage whose verb or arguments could not be turned into a step.
    #[error("stage {stage} ({verb}): {message}")]
    Stage {
        stage: usize,
        verb: String,
        message: String,
    },

    /// Whole-plan validation (codec placement, JSON/YAML shape).
    #[error(transparent)]
    Plan(#[from] tranfi_core::Error),

    #[error("no SQL equivalent for op '{0}'")]
    NoSql(String),
}

impl CompileError {
    pub(crate) fn stage(stage: usize, verb: &str, message: impl Into<String>) -> Self {
        CompileError::Stage {
            stage,
            verb: verb.to_string(),
            message: message.into(),
        }
    }

    /// Index of the offending stage, when the error is tied to one.
    pub fn stage_index(&self) -> Option<usize> {
        match self {
            CompileError::EmptyStage(i) => Some(*i),
            CompileError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    pub fn verb(&self) -> Option<&str> {
        match self {
            CompileError::Stage { verb, .. } => Some(verb),
            _ => None,
        }
    }
}
