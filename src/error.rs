//! Error types.
//!
//! Four kinds of failure exist in this layer, and all of them are synchronous
//! failures surfaced to the immediate caller: nothing is retried and nothing
//! is swallowed, with one documented exception — an unresolved uniform or
//! attribute name during program construction degrades to a logged warning,
//! because shader compilers may optimize unused parameters away.

use crate::types::ShaderStage;
use thiserror::Error;

/// Convenience alias used by every fallible operation in the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The error type for all operations in this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// An operation was invoked with an unusable combination of options,
    /// or named a uniform/attribute the program does not carry.
    ///
    /// Always fatal to the call that raised it.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A shader stage failed to compile, or the program failed to link.
    ///
    /// Carries the diagnostic text reported by the underlying compiler or
    /// linker. Fatal to program construction.
    #[error("shader {} error:\n{log}", stage_name(.stage))]
    CompileOrLink {
        /// The stage that failed to compile, or `None` for a link failure.
        stage: Option<ShaderStage>,
        /// The compiler/linker info log.
        log: String,
    },

    /// A GPU resource is missing, incomplete, or could not be created.
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// A setter received a value whose shape does not match the declared
    /// parameter type.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
}

impl Error {
    /// Shorthand for a [`Error::Configuration`] from anything displayable.
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

/// Failures tied to the state of a GPU resource.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// A framebuffer cannot be rendered to; the reason is symbolic so
    /// callers can distinguish a missing attachment from a size mismatch.
    #[error("framebuffer incomplete: {0}")]
    Incomplete(IncompleteReason),

    /// The underlying API refused to create a resource handle.
    #[error("failed to create GPU resource: {0}")]
    CreateFailed(String),

    /// A draw needed more texture units of one kind than the hardware pool
    /// provides.
    #[error("texture unit pool exhausted: needed unit {needed}, {available} available")]
    UnitPoolExhausted {
        /// The unit index the dispatcher tried to allocate.
        needed: u32,
        /// The size of the hardware unit pool.
        available: u32,
    },

    /// A buffer view outlived the buffer whose bytes it described.
    #[error("buffer was dropped while a view still referenced it")]
    BufferDropped,

    /// Encoded image data could not be decoded.
    #[error("image decode error: {0}")]
    Decode(String),
}

/// Why a framebuffer reported itself as not renderable.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncompleteReason {
    /// A required attachment is missing entirely.
    #[error("missing attachment")]
    MissingAttachment,
    /// An attachment is present but unusable.
    #[error("incomplete attachment")]
    IncompleteAttachment,
    /// Attachments do not share the same dimensions.
    #[error("attachment dimension mismatch")]
    DimensionMismatch,
    /// The attachment combination is not supported.
    #[error("unsupported attachment combination")]
    Unsupported,
}

fn stage_name(stage: &Option<ShaderStage>) -> &'static str {
    match stage {
        Some(ShaderStage::Vertex) => "compile (vertex)",
        Some(ShaderStage::Fragment) => "compile (fragment)",
        None => "link",
    }
}
