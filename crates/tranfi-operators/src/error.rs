use thiserror::Error;

pub type Result<T> = std::result::Result<T, OpError>;

#[derive(Debug, Error)]
pub enum OpError {
    #[error("op '{op}' cannot be built: {message}")]
    Build { op: &'static str, message: String },

    #[error("{op}: cannot load '{path}': {source}")]
    Lookup {
        op: &'static str,
        path: String,
        #[source]
        source: tranfi_io::Error,
    },

    #[error("execution error: {0}")]
    Exec(String),
}
