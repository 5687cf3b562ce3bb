//! A recording [`GpuApi`] double for tests.
//!
//! Every handle is a plain `u32`, every call is appended to a shared log,
//! and a few failure knobs let tests exercise the error paths. Nothing here
//! touches a real GPU.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::api::GpuApi;
use crate::types::{
    AttachmentSlot, BindingKind, BufferTarget, BufferUsage, Capability, ClearMask, DrawMode,
    ElementType, FramebufferStatus, PixelFormat, PixelType, Rect, ShaderStage, TexParam,
    TextureTarget,
};

/// One recorded call, with the arguments tests care about.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    BindBuffer(BufferTarget, Option<u32>),
    BufferData {
        target: BufferTarget,
        len: usize,
        usage: BufferUsage,
    },
    BufferDataSize {
        target: BufferTarget,
        size: usize,
        usage: BufferUsage,
    },
    BufferSubData {
        target: BufferTarget,
        offset: usize,
        len: usize,
    },
    ActiveTexture(u32),
    BindTexture(BindingKind, Option<u32>),
    TexParameter(BindingKind, TexParam),
    TexImage2D {
        target: TextureTarget,
        level: i32,
        format: PixelFormat,
        width: u32,
        height: u32,
        pixel_type: PixelType,
        has_pixels: bool,
    },
    GenerateMipmap(BindingKind),
    DeleteShader(u32),
    DeleteProgram(u32),
    UseProgram(Option<u32>),
    UniformI32(u32, Vec<i32>),
    UniformF32(u32, Vec<f32>),
    UniformMatrixF32(u32, u8, Vec<f32>),
    EnableVertexAttribArray(u32),
    DisableVertexAttribArray(u32),
    VertexAttribPointer {
        index: u32,
        item_size: u8,
        element: ElementType,
        normalized: bool,
        stride: i32,
        offset: i32,
    },
    VertexAttribF32(u32, Vec<f32>),
    BindFramebuffer(Option<u32>),
    FramebufferTexture2D(AttachmentSlot, TextureTarget, u32, i32),
    Enable(Capability),
    Disable(Capability),
    ClearColor([f32; 4]),
    ClearDepth(f32),
    ClearStencil(i32),
    Clear(ClearMask),
    Viewport(Rect),
    DrawArrays(DrawMode, i32, i32),
    Flush,
    Finish,
}

struct FakeInner {
    calls: RefCell<Vec<Call>>,
    next_handle: Cell<u32>,
    unit_count: u32,
    shader_stages: RefCell<HashMap<u32, ShaderStage>>,
    locations: RefCell<HashMap<String, u32>>,
    hidden_names: RefCell<HashSet<String>>,
    fail_compile: Cell<Option<ShaderStage>>,
    fail_link: Cell<bool>,
    framebuffer_status: Cell<FramebufferStatus>,
}

/// The recording double. Clones share the same log and knobs.
#[derive(Clone)]
pub struct FakeGl {
    inner: Rc<FakeInner>,
}

impl FakeGl {
    pub fn new(unit_count: u32) -> Self {
        Self {
            inner: Rc::new(FakeInner {
                calls: RefCell::new(Vec::new()),
                next_handle: Cell::new(1),
                unit_count,
                shader_stages: RefCell::new(HashMap::new()),
                locations: RefCell::new(HashMap::new()),
                hidden_names: RefCell::new(HashSet::new()),
                fail_compile: Cell::new(None),
                fail_link: Cell::new(false),
                framebuffer_status: Cell::new(FramebufferStatus::Complete),
            }),
        }
    }

    /// Snapshot of every call recorded so far.
    pub fn calls(&self) -> Vec<Call> {
        self.inner.calls.borrow().clone()
    }

    /// Forget everything recorded so far.
    pub fn clear_calls(&self) {
        self.inner.calls.borrow_mut().clear();
    }

    /// Number of recorded calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.inner.calls.borrow().iter().filter(|c| pred(c)).count()
    }

    /// Make compilation of the given stage fail (`None` restores success).
    pub fn fail_compile(&self, stage: Option<ShaderStage>) {
        self.inner.fail_compile.set(stage);
    }

    /// Make the next link fail.
    pub fn fail_link(&self, fail: bool) {
        self.inner.fail_link.set(fail);
    }

    /// Pretend the linker discarded `name`.
    pub fn hide_name(&self, name: &str) {
        self.inner.hidden_names.borrow_mut().insert(name.to_owned());
    }

    /// Set the status reported for the bound framebuffer.
    pub fn set_framebuffer_status(&self, status: FramebufferStatus) {
        self.inner.framebuffer_status.set(status);
    }

    fn record(&self, call: Call) {
        self.inner.calls.borrow_mut().push(call);
    }

    fn alloc(&self) -> u32 {
        let handle = self.inner.next_handle.get();
        self.inner.next_handle.set(handle + 1);
        handle
    }

    fn location(&self, name: &str) -> Option<u32> {
        if self.inner.hidden_names.borrow().contains(name) {
            return None;
        }
        let mut locations = self.inner.locations.borrow_mut();
        let next = u32::try_from(locations.len()).unwrap_or(0);
        Some(*locations.entry(name.to_owned()).or_insert(next))
    }
}

impl GpuApi for FakeGl {
    type Buffer = u32;
    type Shader = u32;
    type Program = u32;
    type Texture = u32;
    type Framebuffer = u32;
    type UniformLocation = u32;

    fn create_buffer(&self) -> Result<u32, String> {
        Ok(self.alloc())
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<u32>) {
        self.record(Call::BindBuffer(target, buffer));
    }

    fn buffer_data_size(&self, target: BufferTarget, size: usize, usage: BufferUsage) {
        self.record(Call::BufferDataSize {
            target,
            size,
            usage,
        });
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        self.record(Call::BufferData {
            target,
            len: data.len(),
            usage,
        });
    }

    fn buffer_sub_data(&self, target: BufferTarget, offset: usize, data: &[u8]) {
        self.record(Call::BufferSubData {
            target,
            offset,
            len: data.len(),
        });
    }

    fn create_texture(&self) -> Result<u32, String> {
        Ok(self.alloc())
    }

    fn active_texture(&self, unit: u32) {
        self.record(Call::ActiveTexture(unit));
    }

    fn bind_texture(&self, kind: BindingKind, texture: Option<u32>) {
        self.record(Call::BindTexture(kind, texture));
    }

    fn tex_parameter(&self, kind: BindingKind, param: TexParam) {
        self.record(Call::TexParameter(kind, param));
    }

    fn tex_image_2d(
        &self,
        target: TextureTarget,
        level: i32,
        format: PixelFormat,
        width: u32,
        height: u32,
        pixel_type: PixelType,
        pixels: Option<&[u8]>,
    ) {
        self.record(Call::TexImage2D {
            target,
            level,
            format,
            width,
            height,
            pixel_type,
            has_pixels: pixels.is_some(),
        });
    }

    fn generate_mipmap(&self, kind: BindingKind) {
        self.record(Call::GenerateMipmap(kind));
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<u32, String> {
        let shader = self.alloc();
        self.inner.shader_stages.borrow_mut().insert(shader, stage);
        Ok(shader)
    }

    fn shader_source(&self, _shader: u32, _source: &str) {}

    fn compile_shader(&self, _shader: u32) {}

    fn shader_compile_status(&self, shader: u32) -> bool {
        match self.inner.shader_stages.borrow().get(&shader) {
            Some(stage) => self.inner.fail_compile.get() != Some(*stage),
            None => true,
        }
    }

    fn shader_info_log(&self, _shader: u32) -> String {
        "fake compile error".to_owned()
    }

    fn delete_shader(&self, shader: u32) {
        self.record(Call::DeleteShader(shader));
    }

    fn create_program(&self) -> Result<u32, String> {
        Ok(self.alloc())
    }

    fn attach_shader(&self, _program: u32, _shader: u32) {}

    fn detach_shader(&self, _program: u32, _shader: u32) {}

    fn link_program(&self, _program: u32) {}

    fn program_link_status(&self, _program: u32) -> bool {
        !self.inner.fail_link.get()
    }

    fn program_info_log(&self, _program: u32) -> String {
        "fake link error".to_owned()
    }

    fn delete_program(&self, program: u32) {
        self.record(Call::DeleteProgram(program));
    }

    fn uniform_location(&self, _program: u32, name: &str) -> Option<u32> {
        self.location(name)
    }

    fn attrib_location(&self, _program: u32, name: &str) -> Option<u32> {
        self.location(name)
    }

    fn use_program(&self, program: Option<u32>) {
        self.record(Call::UseProgram(program));
    }

    fn uniform_i32(&self, location: &u32, v: &[i32]) {
        self.record(Call::UniformI32(*location, v.to_vec()));
    }

    fn uniform_f32(&self, location: &u32, v: &[f32]) {
        self.record(Call::UniformF32(*location, v.to_vec()));
    }

    fn uniform_matrix_f32(&self, location: &u32, dim: u8, v: &[f32]) {
        self.record(Call::UniformMatrixF32(*location, dim, v.to_vec()));
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        self.record(Call::EnableVertexAttribArray(index));
    }

    fn disable_vertex_attrib_array(&self, index: u32) {
        self.record(Call::DisableVertexAttribArray(index));
    }

    fn vertex_attrib_pointer(
        &self,
        index: u32,
        item_size: u8,
        element: ElementType,
        normalized: bool,
        stride: i32,
        offset: i32,
    ) {
        self.record(Call::VertexAttribPointer {
            index,
            item_size,
            element,
            normalized,
            stride,
            offset,
        });
    }

    fn vertex_attrib_f32(&self, index: u32, v: &[f32]) {
        self.record(Call::VertexAttribF32(index, v.to_vec()));
    }

    fn create_framebuffer(&self) -> Result<u32, String> {
        Ok(self.alloc())
    }

    fn bind_framebuffer(&self, framebuffer: Option<u32>) {
        self.record(Call::BindFramebuffer(framebuffer));
    }

    fn framebuffer_texture_2d(
        &self,
        slot: AttachmentSlot,
        target: TextureTarget,
        texture: u32,
        level: i32,
    ) {
        self.record(Call::FramebufferTexture2D(slot, target, texture, level));
    }

    fn framebuffer_status(&self) -> FramebufferStatus {
        self.inner.framebuffer_status.get()
    }

    fn enable(&self, cap: Capability) {
        self.record(Call::Enable(cap));
    }

    fn disable(&self, cap: Capability) {
        self.record(Call::Disable(cap));
    }

    fn clear_color(&self, rgba: [f32; 4]) {
        self.record(Call::ClearColor(rgba));
    }

    fn clear_depth(&self, depth: f32) {
        self.record(Call::ClearDepth(depth));
    }

    fn clear_stencil(&self, stencil: i32) {
        self.record(Call::ClearStencil(stencil));
    }

    fn clear(&self, mask: ClearMask) {
        self.record(Call::Clear(mask));
    }

    fn viewport(&self, rect: Rect) {
        self.record(Call::Viewport(rect));
    }

    fn draw_arrays(&self, mode: DrawMode, first: i32, count: i32) {
        self.record(Call::DrawArrays(mode, first, count));
    }

    fn flush(&self) {
        self.record(Call::Flush);
    }

    fn finish(&self) {
        self.record(Call::Finish);
    }

    fn max_texture_units(&self) -> u32 {
        self.inner.unit_count
    }
}
