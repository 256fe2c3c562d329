//! Crate-wide error taxonomy (spec §7).
//!
//! Parser-internal "this production doesn't match" outcomes are not errors —
//! they are plain `Option<T>` returns threaded through the block/inline
//! parsers. `AtrusError` only ever surfaces from the LineReader, the
//! renderers, and the post-process idempotence guard.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AtrusError {
    #[error("line exceeded the maximum buffered length ({limit} bytes)")]
    LineTooLong { limit: usize },

    #[error("failed to read from the underlying byte stream: {0}")]
    ReadFailed(String),

    #[error("failed to write to the output sink: {0}")]
    WriteFailed(String),

    #[error("allocation failed")]
    OutOfMemory,

    #[error("render_html called on a tree that has not been post-processed")]
    NotPostProcessed,
}

pub type Result<T> = std::result::Result<T, AtrusError>;
