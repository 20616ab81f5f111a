#![forbid(unsafe_code)]
//! tranfi-io: byte-level codecs and channel buffers.
//!
//! Design intent:
//! - Decoders are push-based: they accept arbitrary byte chunks, keep any
//!   partial record, and emit complete rows. Chunk boundaries never change
//!   the decoded rows.
//! - Encoders append bytes to a caller-owned buffer, so the pipeline decides
//!   where output goes (a channel buffer, a file, stdout).
//! - Per-row problems are reported as `RowError` records; only I/O and
//!   configuration problems are `Err`.

pub mod buf;
pub mod codec;
pub mod error;
pub mod lookup;
pub mod readers;
pub mod writers;

pub use buf::ChannelBuffer;
pub use codec::{decoder_for, encoder_for, Decoder, Encoder};
pub use error::{Error, Result};
