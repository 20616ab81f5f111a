#![forbid(unsafe_code)]
//! tranfi-exec: the push/finish/pull runtime.
//!
//! A `Pipeline` owns a decoder, the operator chain, an encoder and four
//! output channels. Callers drive it cooperatively: push byte chunks, pull
//! whatever each channel has produced, then finish and drain. Nothing here
//! spawns threads.
//!
//! The `handle` module exposes the same lifecycle through opaque integer
//! handles for host-language bindings.

pub mod error;
pub mod handle;
pub mod metrics;
pub mod pipeline;

pub use error::{ExecError, Result};
pub use handle::{
    tf_last_error, tf_pipeline_create, tf_pipeline_create_dsl, tf_pipeline_finish,
    tf_pipeline_free, tf_pipeline_pull, tf_pipeline_push, Handle, HandleTable,
};
pub use pipeline::{Channel, Pipeline, RunStats, State};
