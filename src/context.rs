//! The rendering context and draw dispatcher.
//!
//! [`RenderingContext`] is the crate's entry point: it owns the binding
//! state cache, hands out resources, and turns a declarative
//! [`DrawParams`] into the minimal sequence of real GL calls. Pipeline
//! state is never mutated behind the cache's back, which is what makes the
//! compare-and-issue elision sound.

use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::api::GpuApi;
use crate::buffer::Buffer;
use crate::error::{Error, ResourceError, Result};
use crate::framebuffer::Framebuffer;
use crate::program::{AttributeValue, Program, ProgramDesc, UniformValue};
use crate::state::ContextShared;
use crate::texture::{Texture, TextureDesc};
use crate::types::{BufferTarget, Capability, ClearMask, DrawMode, Rect};

/// Which aspects of the target to clear, and with what values.
///
/// Each `Some` field first routes the value through the state cache (so a
/// repeated value costs nothing) and then selects that aspect in the clear
/// mask. All-`None` clears nothing and issues no call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClearArgs {
    /// Clear the color buffer to this RGBA value.
    pub color: Option<[f32; 4]>,
    /// Clear the depth buffer to this value.
    pub depth: Option<f32>,
    /// Clear the stencil buffer to this value.
    pub stencil: Option<i32>,
}

/// Everything one draw call needs, declared up front.
///
/// The dispatcher applies these in a fixed order: render target, viewport,
/// program, uniforms, attributes, then the draw itself. Uniforms and
/// attributes are applied in slice order; for sampler uniforms that order
/// determines texture unit assignment.
pub struct DrawParams<'a, G: GpuApi> {
    /// The program to draw with.
    pub program: &'a Program<G>,
    /// Uniform values by declared name.
    pub uniforms: &'a [(&'a str, UniformValue<'a, G>)],
    /// Attribute values by declared name.
    pub attributes: &'a [(&'a str, AttributeValue<'a, G>)],
    /// Primitive assembly mode.
    pub mode: DrawMode,
    /// First vertex index.
    pub first: i32,
    /// Number of vertices.
    pub count: i32,
    /// Render target; `None` draws to the default surface.
    pub framebuffer: Option<&'a Framebuffer<G>>,
    /// Viewport override; `None` covers the whole render target.
    pub viewport: Option<Rect>,
}

/// Decides when each frame of a [`RenderingContext::run_frames`] loop runs.
///
/// `schedule` is called once per frame and must invoke `frame` exactly once,
/// after whatever pacing delay the implementation wants (vsync, a fixed
/// timer, or none at all for tests).
pub trait FrameScheduler {
    /// Run one frame, pacing it however this scheduler sees fit.
    fn schedule(&mut self, frame: &mut dyn FnMut());
}

/// The crate's entry point: resource factory, pipeline state owner, and
/// draw dispatcher over a [`GpuApi`] implementation.
pub struct RenderingContext<G: GpuApi> {
    shared: Rc<ContextShared<G>>,
}

impl<G: GpuApi> RenderingContext<G> {
    /// Wrap a command sink, recording the drawable surface size in pixels.
    ///
    /// The texture unit pool size is queried once, here.
    #[must_use]
    pub fn new(gl: G, surface_size: (u32, u32)) -> Self {
        Self {
            shared: Rc::new(ContextShared::new(gl, surface_size)),
        }
    }

    /// The drawable surface size in pixels, as last recorded.
    #[must_use]
    pub fn surface_size(&self) -> (u32, u32) {
        self.shared.surface_size.get()
    }

    /// Record a new drawable surface size after a resize.
    ///
    /// Only bookkeeping — the next full-surface viewport request picks the
    /// new size up.
    pub fn set_surface_size(&self, size: (u32, u32)) {
        self.shared.surface_size.set(size);
    }

    /// The size of the texture unit pool shared by all draws.
    #[must_use]
    pub fn texture_unit_count(&self) -> u32 {
        self.shared.unit_count
    }

    /// Create a buffer for `target`.
    ///
    /// # Errors
    ///
    /// [`ResourceError::CreateFailed`] if the underlying API refuses.
    pub fn create_buffer(&self, target: BufferTarget) -> Result<Buffer<G>> {
        Buffer::new(Rc::clone(&self.shared), target)
    }

    /// Create a texture with the given parameters.
    ///
    /// # Errors
    ///
    /// [`ResourceError::CreateFailed`] if the underlying API refuses.
    pub fn create_texture(&self, desc: TextureDesc) -> Result<Texture<G>> {
        Texture::new(Rc::clone(&self.shared), desc)
    }

    /// Compile, link, and reflect a shader program.
    ///
    /// # Errors
    ///
    /// [`Error::CompileOrLink`] on a compile or link failure, with the
    /// diagnostic log.
    pub fn create_program(&self, desc: &ProgramDesc<'_>) -> Result<Program<G>> {
        Program::new(Rc::clone(&self.shared), desc)
    }

    /// Create an off-screen render target of the given size.
    ///
    /// # Errors
    ///
    /// [`ResourceError::CreateFailed`] if the underlying API refuses.
    pub fn create_framebuffer(&self, width: u32, height: u32) -> Result<Framebuffer<G>> {
        Framebuffer::new(Rc::clone(&self.shared), width, height)
    }

    /// Enable or disable a pipeline capability through the state cache.
    pub fn set_capability(&self, cap: Capability, enabled: bool) {
        self.shared.set_capability(cap, enabled);
    }

    /// Clear the currently bound render target.
    ///
    /// See [`ClearArgs`] for the value-caching behavior.
    pub fn clear(&self, args: ClearArgs) {
        let mut mask = ClearMask::empty();
        if let Some(color) = args.color {
            self.shared.set_clear_color(color);
            mask |= ClearMask::COLOR;
        }
        if let Some(depth) = args.depth {
            self.shared.set_clear_depth(depth);
            mask |= ClearMask::DEPTH;
        }
        if let Some(stencil) = args.stencil {
            self.shared.set_clear_stencil(stencil);
            mask |= ClearMask::STENCIL;
        }
        if !mask.is_empty() {
            self.shared.gl.clear(mask);
        }
    }

    /// Set the viewport rectangle through the state cache.
    pub fn viewport(&self, rect: Rect) {
        self.shared.set_viewport(rect);
    }

    /// Set the viewport to cover the full default surface.
    pub fn viewport_full(&self) {
        let (width, height) = self.shared.surface_size.get();
        self.shared.set_viewport(Rect::of_size(width, height));
    }

    /// Enqueue a pipeline drain request without waiting for it.
    pub fn flush(&self) {
        self.shared.gl.flush();
    }

    /// Block until all previously issued commands have completed.
    pub fn finish(&self) {
        self.shared.gl.finish();
    }

    /// Dispatch one draw call.
    ///
    /// Applies, in order: the render target, the viewport, the program, the
    /// uniforms, the attributes, and finally the draw itself. Every state
    /// transition goes through the cache, so back-to-back draws sharing
    /// state issue only the calls that actually differ.
    ///
    /// Texture units are assigned per draw: sampler uniforms get units
    /// `0, 1, ...` of their binding kind in slice order, with both kinds
    /// counting independently. Assignments do not carry over between draws.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::Incomplete`] when the target framebuffer is not
    ///   renderable; nothing else is issued in that case;
    /// - [`Error::Configuration`] for a uniform or attribute name the
    ///   program does not carry;
    /// - [`Error::TypeMismatch`] for a value that contradicts its declared
    ///   type, including a 2D texture fed to a cube sampler;
    /// - [`ResourceError::UnitPoolExhausted`] when a draw references more
    ///   textures of one kind than the hardware pool holds.
    pub fn draw(&self, params: &DrawParams<'_, G>) -> Result<()> {
        // Binding and the completeness check are one step; an incomplete
        // target aborts before any other state is touched.
        match params.framebuffer {
            Some(fb) => fb.check_complete()?,
            None => self.shared.bind_framebuffer(None),
        }

        let viewport = params.viewport.unwrap_or_else(|| match params.framebuffer {
            Some(fb) => Rect::of_size(fb.width(), fb.height()),
            None => {
                let (width, height) = self.shared.surface_size.get();
                Rect::of_size(width, height)
            }
        });
        self.shared.set_viewport(viewport);

        params.program.activate();

        // One counter per binding kind, reset each draw.
        let mut next_2d_unit = 0u32;
        let mut next_cube_unit = 0u32;
        for (name, value) in params.uniforms {
            let uniform = params.program.uniform(name).ok_or_else(|| {
                Error::config(format!("program has no uniform named `{name}`"))
            })?;
            if let UniformValue::Texture(texture) = value {
                let Some(kind) = uniform.ty().sampler_kind() else {
                    return Err(Error::TypeMismatch(format!(
                        "uniform `{name}` is declared {:?}, got a texture",
                        uniform.ty()
                    )));
                };
                if texture.target().binding_kind() != kind {
                    return Err(Error::TypeMismatch(format!(
                        "uniform `{name}` samples {kind:?}, the texture is a {:?}",
                        texture.target().binding_kind()
                    )));
                }
                let counter = match kind {
                    crate::types::BindingKind::Texture2D => &mut next_2d_unit,
                    crate::types::BindingKind::CubeMap => &mut next_cube_unit,
                };
                let unit = *counter;
                if unit >= self.shared.unit_count {
                    return Err(ResourceError::UnitPoolExhausted {
                        needed: unit,
                        available: self.shared.unit_count,
                    }
                    .into());
                }
                *counter += 1;
                self.shared.bind_texture(unit, kind, texture.raw())?;
                uniform.set_sampler_unit(&self.shared.gl, unit);
            } else {
                uniform.set_value(&self.shared.gl, name, value)?;
            }
        }

        for (name, value) in params.attributes {
            let attribute = params.program.attribute(name).ok_or_else(|| {
                Error::config(format!("program has no attribute named `{name}`"))
            })?;
            attribute.set_value(name, value)?;
        }

        self.shared
            .gl
            .draw_arrays(params.mode, params.first, params.count);
        Ok(())
    }

    /// Run `callback` once per frame until [`exit_frames`](Self::exit_frames)
    /// is observed.
    ///
    /// The scheduler paces the frames; the callback receives the time
    /// elapsed since the previous frame (zero on the first). The exit flag
    /// is checked only between frames, so a frame that requests exit always
    /// runs to completion.
    pub fn run_frames<S, F>(&self, scheduler: &mut S, mut callback: F)
    where
        S: FrameScheduler,
        F: FnMut(Duration),
    {
        self.shared.loop_exit.set(false);
        let mut last: Option<Instant> = None;
        while !self.shared.loop_exit.get() {
            scheduler.schedule(&mut || {
                let now = Instant::now();
                let delta = last.map_or(Duration::ZERO, |last| {
                    now.saturating_duration_since(last)
                });
                last = Some(now);
                callback(delta);
            });
        }
    }

    /// Request that the running frame loop stop after the current frame.
    pub fn exit_frames(&self) {
        self.shared.loop_exit.set(true);
    }
}
