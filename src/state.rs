//! The binding state cache.
//!
//! [`ContextShared`] is the single source of truth for what is currently
//! bound, enabled, or set on the GL pipeline. Every mutation path in the
//! crate goes through the compare-and-issue methods here: the requested
//! value is compared against the cached slot, and only on a mismatch is the
//! real GL call issued and the slot updated. The cache therefore guarantees
//! at most one real call per distinct value transition, no matter how often
//! a caller re-requests the same value.
//!
//! Cached values start from the underlying API's documented initial state
//! (nothing bound, all capabilities off except dithering, clear color
//! transparent black, clear depth 1.0, clear stencil 0). The viewport is the
//! one slot that starts unknown — its initial value depends on the surface —
//! so the first viewport request always issues.

use std::cell::{Cell, RefCell};

use crate::api::GpuApi;
use crate::error::{ResourceError, Result};
use crate::types::{BindingKind, BufferTarget, Capability, Rect};

/// Per-unit record of which texture is bound to each binding kind.
struct UnitBindings<G: GpuApi> {
    texture_2d: Option<G::Texture>,
    cube_map: Option<G::Texture>,
}

impl<G: GpuApi> UnitBindings<G> {
    fn slot(&mut self, kind: BindingKind) -> &mut Option<G::Texture> {
        match kind {
            BindingKind::Texture2D => &mut self.texture_2d,
            BindingKind::CubeMap => &mut self.cube_map,
        }
    }
}

/// The cached pipeline state. One instance per rendering context; fields are
/// only ever read and written by the methods of [`ContextShared`].
pub(crate) struct StateTable<G: GpuApi> {
    vertex_buffer: Option<G::Buffer>,
    index_buffer: Option<G::Buffer>,
    units: Vec<UnitBindings<G>>,
    active_unit: u32,
    program: Option<G::Program>,
    enabled: [bool; Capability::COUNT],
    clear_color: [f32; 4],
    clear_depth: f32,
    clear_stencil: i32,
    viewport: Option<Rect>,
    framebuffer: Option<G::Framebuffer>,
}

impl<G: GpuApi> StateTable<G> {
    fn new(unit_count: u32) -> Self {
        let mut enabled = [false; Capability::COUNT];
        enabled[Capability::Dither.index()] = true;
        Self {
            vertex_buffer: None,
            index_buffer: None,
            units: (0..unit_count)
                .map(|_| UnitBindings {
                    texture_2d: None,
                    cube_map: None,
                })
                .collect(),
            active_unit: 0,
            program: None,
            enabled,
            clear_color: [0.0, 0.0, 0.0, 0.0],
            clear_depth: 1.0,
            clear_stencil: 0,
            viewport: None,
            framebuffer: None,
        }
    }
}

/// The state shared between a [`RenderingContext`](crate::RenderingContext)
/// and every resource created through it: the command sink, the binding
/// state cache, the texture unit pool size, the drawable surface size, and
/// the cooperative main-loop exit flag.
///
/// Single-threaded by contract; interior mutability is cells, not locks.
pub(crate) struct ContextShared<G: GpuApi> {
    pub(crate) gl: G,
    state: RefCell<StateTable<G>>,
    pub(crate) unit_count: u32,
    pub(crate) surface_size: Cell<(u32, u32)>,
    pub(crate) loop_exit: Cell<bool>,
}

impl<G: GpuApi> ContextShared<G> {
    pub(crate) fn new(gl: G, surface_size: (u32, u32)) -> Self {
        let unit_count = gl.max_texture_units();
        Self {
            gl,
            state: RefCell::new(StateTable::new(unit_count)),
            unit_count,
            surface_size: Cell::new(surface_size),
            loop_exit: Cell::new(false),
        }
    }

    /// Bind `buffer` to `target` unless it is already bound there.
    pub(crate) fn bind_buffer(&self, target: BufferTarget, buffer: G::Buffer) {
        let mut state = self.state.borrow_mut();
        let slot = match target {
            BufferTarget::Vertex => &mut state.vertex_buffer,
            BufferTarget::Index => &mut state.index_buffer,
        };
        if *slot == Some(buffer) {
            return;
        }
        log::trace!("bind buffer {buffer:?} to {target:?}");
        self.gl.bind_buffer(target, Some(buffer));
        *slot = Some(buffer);
    }

    /// Bind `texture` to `kind` on `unit`, activating the unit lazily.
    ///
    /// A cache hit issues nothing at all, not even the unit activation; on a
    /// miss the unit is activated only if it is not already the active one.
    pub(crate) fn bind_texture(
        &self,
        unit: u32,
        kind: BindingKind,
        texture: G::Texture,
    ) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let bindings = state.units.get_mut(unit as usize).ok_or(
            ResourceError::UnitPoolExhausted {
                needed: unit,
                available: self.unit_count,
            },
        )?;
        if *bindings.slot(kind) == Some(texture) {
            return Ok(());
        }
        if state.active_unit != unit {
            log::trace!("activate texture unit {unit}");
            self.gl.active_texture(unit);
            state.active_unit = unit;
        }
        log::trace!("bind texture {texture:?} to {kind:?} on unit {unit}");
        self.gl.bind_texture(kind, Some(texture));
        // Re-borrow: the active-unit update above released the slot.
        *state.units[unit as usize].slot(kind) = Some(texture);
        Ok(())
    }

    /// Make `program` current unless it already is.
    pub(crate) fn use_program(&self, program: G::Program) {
        let mut state = self.state.borrow_mut();
        if state.program == Some(program) {
            return;
        }
        log::trace!("use program {program:?}");
        self.gl.use_program(Some(program));
        state.program = Some(program);
    }

    /// Enable or disable a capability unless it is already in that state.
    pub(crate) fn set_capability(&self, cap: Capability, enabled: bool) {
        let mut state = self.state.borrow_mut();
        let slot = &mut state.enabled[cap.index()];
        if *slot == enabled {
            return;
        }
        log::trace!("{} {cap:?}", if enabled { "enable" } else { "disable" });
        if enabled {
            self.gl.enable(cap);
        } else {
            self.gl.disable(cap);
        }
        *slot = enabled;
    }

    /// Set the clear color unless all four components already match.
    #[expect(clippy::float_cmp)] // exact repeat detection, not arithmetic
    pub(crate) fn set_clear_color(&self, rgba: [f32; 4]) {
        let mut state = self.state.borrow_mut();
        if state.clear_color == rgba {
            return;
        }
        self.gl.clear_color(rgba);
        state.clear_color = rgba;
    }

    /// Set the clear depth unless it already matches.
    #[expect(clippy::float_cmp)] // exact repeat detection, not arithmetic
    pub(crate) fn set_clear_depth(&self, depth: f32) {
        let mut state = self.state.borrow_mut();
        if state.clear_depth == depth {
            return;
        }
        self.gl.clear_depth(depth);
        state.clear_depth = depth;
    }

    /// Set the clear stencil unless it already matches.
    pub(crate) fn set_clear_stencil(&self, stencil: i32) {
        let mut state = self.state.borrow_mut();
        if state.clear_stencil == stencil {
            return;
        }
        self.gl.clear_stencil(stencil);
        state.clear_stencil = stencil;
    }

    /// Set the viewport rectangle unless it already matches.
    pub(crate) fn set_viewport(&self, rect: Rect) {
        let mut state = self.state.borrow_mut();
        if state.viewport == Some(rect) {
            return;
        }
        log::trace!("viewport {rect:?}");
        self.gl.viewport(rect);
        state.viewport = Some(rect);
    }

    /// Bind `framebuffer` — or the default surface with `None`, which is a
    /// valid cached state — unless it is already bound.
    pub(crate) fn bind_framebuffer(&self, framebuffer: Option<G::Framebuffer>) {
        let mut state = self.state.borrow_mut();
        if state.framebuffer == framebuffer {
            return;
        }
        log::trace!("bind framebuffer {framebuffer:?}");
        self.gl.bind_framebuffer(framebuffer);
        state.framebuffer = framebuffer;
    }
}
