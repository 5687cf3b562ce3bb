//! A state-caching abstraction over an immediate-mode GPU API, built on
//! [glow].
//!
//! Raw GL is a pile of hidden mutable state: whatever was bound last silently
//! decides what the next call touches. This crate replaces that with a
//! [`RenderingContext`] that owns a complete mirror of the pipeline state and
//! routes every mutation through compare-and-issue: a requested value that
//! matches the cache costs nothing, and each distinct transition issues
//! exactly one real call.
//!
//! # Resources
//!
//! - [`Buffer`] owns GPU bytes; [`BufferView`] reads them as typed attribute
//!   streams, several views per buffer.
//! - [`Texture`] mirrors its filter and wrap parameters and supports
//!   asynchronous image sources through [`ImageLoad`].
//! - [`Program`] compiles and links shaders against a declared set of typed
//!   uniforms and attributes.
//! - [`Framebuffer`] is an off-screen target with per-slot texture
//!   attachments.
//!
//! # Drawing
//!
//! A draw is a single declarative [`DrawParams`] handed to
//! [`RenderingContext::draw`]: render target, viewport, program, uniform and
//! attribute values, primitive range. The dispatcher applies them in a fixed
//! order and assigns texture units to sampler uniforms per draw.
//!
//! # Threading
//!
//! Everything here is single-threaded by contract, matching the underlying
//! API; the one concession is [`ImageLoad`], whose sending half may live on
//! another thread.
//!
//! [glow]: https://docs.rs/glow

pub mod api;
pub mod backend;
pub mod buffer;
pub mod context;
pub mod error;
pub mod framebuffer;
pub mod program;
mod state;
pub mod texture;
pub mod types;

#[cfg(test)]
mod fake;

pub use api::GpuApi;
pub use backend::GlowGl;
pub use buffer::{Buffer, BufferInit, BufferView, ViewDesc};
pub use context::{ClearArgs, DrawParams, FrameScheduler, RenderingContext};
pub use error::{Error, IncompleteReason, ResourceError, Result};
pub use framebuffer::{Attachment, Framebuffer};
pub use program::{
    AttributeType, AttributeValue, Program, ProgramDesc, UniformType, UniformValue,
};
pub use texture::{
    ImageData, ImageLoad, ImageLoadSender, LoadState, TexImage, Texture, TextureDesc,
};
