//! The production [`GpuApi`] implementation over [glow].
//!
//! [`GlowGl`] maps the crate's typed vocabulary onto raw glow constants and
//! forwards every call. It holds the [`glow::Context`] behind an [`Arc`] so
//! resource handles and the rendering context can share it.
//!
//! [glow]: https://docs.rs/glow

use std::sync::Arc;

use glow::{HasContext, PixelUnpackData};

use crate::api::GpuApi;
use crate::types::{
    AttachmentSlot, BindingKind, BufferTarget, BufferUsage, Capability, ClearMask, DrawMode,
    ElementType, FramebufferStatus, MagFilter, MinFilter, PixelFormat, PixelType, Rect,
    ShaderStage, TexParam, TextureTarget, Wrap,
};

/// Convert a byte count or offset to the `i32` glow expects.
///
/// # Panics
///
/// Panics if `value > i32::MAX`. In practice, this is unreachable for
/// realistic buffer and image sizes.
fn gl_size(value: usize) -> i32 {
    i32::try_from(value).expect("size exceeds i32::MAX")
}

/// `u32` image dimension to `i32`, same reasoning as [`gl_size`].
fn gl_dim(value: u32) -> i32 {
    i32::try_from(value).expect("dimension exceeds i32::MAX")
}

/// [`GpuApi`] implemented over an OpenGL context via glow.
///
/// # Safety contract
///
/// glow calls are `unsafe` because they require the GL context to be current
/// on the calling thread. [`GlowGl::from_context`] concentrates that
/// obligation at construction: by creating a `GlowGl` the caller promises the
/// context is current for as long as any method of this value (or a resource
/// created through it) runs.
#[derive(Clone)]
pub struct GlowGl {
    gl: Arc<glow::Context>,
}

impl GlowGl {
    /// Wrap a glow context.
    ///
    /// # Safety
    ///
    /// The context must be valid and current on this thread whenever any
    /// method of the returned value is called, and must outlive every
    /// resource created through it.
    #[must_use]
    pub unsafe fn from_context(gl: Arc<glow::Context>) -> Self {
        Self { gl }
    }

    /// The wrapped glow context.
    #[must_use]
    pub fn raw_context(&self) -> &Arc<glow::Context> {
        &self.gl
    }
}

fn buffer_target(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Vertex => glow::ARRAY_BUFFER,
        BufferTarget::Index => glow::ELEMENT_ARRAY_BUFFER,
    }
}

fn buffer_usage(usage: BufferUsage) -> u32 {
    match usage {
        BufferUsage::Static => glow::STATIC_DRAW,
        BufferUsage::Dynamic => glow::DYNAMIC_DRAW,
        BufferUsage::Stream => glow::STREAM_DRAW,
    }
}

fn binding_kind(kind: BindingKind) -> u32 {
    match kind {
        BindingKind::Texture2D => glow::TEXTURE_2D,
        BindingKind::CubeMap => glow::TEXTURE_CUBE_MAP,
    }
}

fn texture_target(target: TextureTarget) -> u32 {
    match target {
        TextureTarget::Texture2D => glow::TEXTURE_2D,
        TextureTarget::CubeMapPositiveX => glow::TEXTURE_CUBE_MAP_POSITIVE_X,
        TextureTarget::CubeMapNegativeX => glow::TEXTURE_CUBE_MAP_NEGATIVE_X,
        TextureTarget::CubeMapPositiveY => glow::TEXTURE_CUBE_MAP_POSITIVE_Y,
        TextureTarget::CubeMapNegativeY => glow::TEXTURE_CUBE_MAP_NEGATIVE_Y,
        TextureTarget::CubeMapPositiveZ => glow::TEXTURE_CUBE_MAP_POSITIVE_Z,
        TextureTarget::CubeMapNegativeZ => glow::TEXTURE_CUBE_MAP_NEGATIVE_Z,
    }
}

fn min_filter(filter: MinFilter) -> u32 {
    match filter {
        MinFilter::Nearest => glow::NEAREST,
        MinFilter::Linear => glow::LINEAR,
        MinFilter::NearestMipmapNearest => glow::NEAREST_MIPMAP_NEAREST,
        MinFilter::LinearMipmapNearest => glow::LINEAR_MIPMAP_NEAREST,
        MinFilter::NearestMipmapLinear => glow::NEAREST_MIPMAP_LINEAR,
        MinFilter::LinearMipmapLinear => glow::LINEAR_MIPMAP_LINEAR,
    }
}

fn mag_filter(filter: MagFilter) -> u32 {
    match filter {
        MagFilter::Nearest => glow::NEAREST,
        MagFilter::Linear => glow::LINEAR,
    }
}

fn wrap_mode(wrap: Wrap) -> u32 {
    match wrap {
        Wrap::ClampToEdge => glow::CLAMP_TO_EDGE,
        Wrap::MirroredRepeat => glow::MIRRORED_REPEAT,
        Wrap::Repeat => glow::REPEAT,
    }
}

fn pixel_format(format: PixelFormat) -> u32 {
    match format {
        PixelFormat::Alpha => glow::ALPHA,
        PixelFormat::Luminance => glow::LUMINANCE,
        PixelFormat::LuminanceAlpha => glow::LUMINANCE_ALPHA,
        PixelFormat::Rgb => glow::RGB,
        PixelFormat::Rgba => glow::RGBA,
        PixelFormat::DepthComponent => glow::DEPTH_COMPONENT,
        PixelFormat::DepthStencil => glow::DEPTH_STENCIL,
    }
}

fn pixel_type(ty: PixelType) -> u32 {
    match ty {
        PixelType::UnsignedByte => glow::UNSIGNED_BYTE,
        PixelType::UnsignedShort565 => glow::UNSIGNED_SHORT_5_6_5,
        PixelType::UnsignedShort4444 => glow::UNSIGNED_SHORT_4_4_4_4,
        PixelType::UnsignedShort5551 => glow::UNSIGNED_SHORT_5_5_5_1,
        PixelType::UnsignedShort => glow::UNSIGNED_SHORT,
        PixelType::UnsignedInt24_8 => glow::UNSIGNED_INT_24_8,
    }
}

fn element_type(element: ElementType) -> u32 {
    match element {
        ElementType::I8 => glow::BYTE,
        ElementType::U8 => glow::UNSIGNED_BYTE,
        ElementType::I16 => glow::SHORT,
        ElementType::U16 => glow::UNSIGNED_SHORT,
        ElementType::F32 => glow::FLOAT,
    }
}

fn shader_stage(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
    }
}

fn capability(cap: Capability) -> u32 {
    match cap {
        Capability::Blend => glow::BLEND,
        Capability::CullFace => glow::CULL_FACE,
        Capability::DepthTest => glow::DEPTH_TEST,
        Capability::Dither => glow::DITHER,
        Capability::PolygonOffsetFill => glow::POLYGON_OFFSET_FILL,
        Capability::StencilTest => glow::STENCIL_TEST,
    }
}

fn draw_mode(mode: DrawMode) -> u32 {
    match mode {
        DrawMode::Points => glow::POINTS,
        DrawMode::LineStrip => glow::LINE_STRIP,
        DrawMode::LineLoop => glow::LINE_LOOP,
        DrawMode::Lines => glow::LINES,
        DrawMode::TriangleStrip => glow::TRIANGLE_STRIP,
        DrawMode::TriangleFan => glow::TRIANGLE_FAN,
        DrawMode::Triangles => glow::TRIANGLES,
    }
}

fn attachment_slot(slot: AttachmentSlot) -> u32 {
    match slot {
        AttachmentSlot::Color => glow::COLOR_ATTACHMENT0,
        AttachmentSlot::Depth => glow::DEPTH_ATTACHMENT,
        AttachmentSlot::Stencil => glow::STENCIL_ATTACHMENT,
    }
}

impl GpuApi for GlowGl {
    type Buffer = glow::Buffer;
    type Shader = glow::Shader;
    type Program = glow::Program;
    type Texture = glow::Texture;
    type Framebuffer = glow::Framebuffer;
    type UniformLocation = glow::UniformLocation;

    fn create_buffer(&self) -> Result<Self::Buffer, String> {
        unsafe { self.gl.create_buffer() }
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<Self::Buffer>) {
        unsafe { self.gl.bind_buffer(buffer_target(target), buffer) };
    }

    fn buffer_data_size(&self, target: BufferTarget, size: usize, usage: BufferUsage) {
        unsafe {
            self.gl
                .buffer_data_size(buffer_target(target), gl_size(size), buffer_usage(usage));
        }
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        unsafe {
            self.gl
                .buffer_data_u8_slice(buffer_target(target), data, buffer_usage(usage));
        }
    }

    fn buffer_sub_data(&self, target: BufferTarget, offset: usize, data: &[u8]) {
        unsafe {
            self.gl
                .buffer_sub_data_u8_slice(buffer_target(target), gl_size(offset), data);
        }
    }

    fn create_texture(&self) -> Result<Self::Texture, String> {
        unsafe { self.gl.create_texture() }
    }

    fn active_texture(&self, unit: u32) {
        unsafe { self.gl.active_texture(glow::TEXTURE0 + unit) };
    }

    fn bind_texture(&self, kind: BindingKind, texture: Option<Self::Texture>) {
        unsafe { self.gl.bind_texture(binding_kind(kind), texture) };
    }

    fn tex_parameter(&self, kind: BindingKind, param: TexParam) {
        let (pname, value) = match param {
            TexParam::MinFilter(f) => (glow::TEXTURE_MIN_FILTER, min_filter(f)),
            TexParam::MagFilter(f) => (glow::TEXTURE_MAG_FILTER, mag_filter(f)),
            TexParam::WrapS(w) => (glow::TEXTURE_WRAP_S, wrap_mode(w)),
            TexParam::WrapT(w) => (glow::TEXTURE_WRAP_T, wrap_mode(w)),
        };
        // GL constant values are small enough that the cast is always safe.
        #[expect(clippy::cast_possible_wrap)]
        unsafe {
            self.gl
                .tex_parameter_i32(binding_kind(kind), pname, value as i32);
        }
    }

    fn tex_image_2d(
        &self,
        target: TextureTarget,
        level: i32,
        format: PixelFormat,
        width: u32,
        height: u32,
        ty: PixelType,
        pixels: Option<&[u8]>,
    ) {
        let format = pixel_format(format);
        // GL constant values are small enough that the cast is always safe.
        #[expect(clippy::cast_possible_wrap)]
        let internal_format = format as i32;
        unsafe {
            self.gl.tex_image_2d(
                texture_target(target),
                level,
                internal_format,
                gl_dim(width),
                gl_dim(height),
                0,
                format,
                pixel_type(ty),
                PixelUnpackData::Slice(pixels),
            );
        }
    }

    fn generate_mipmap(&self, kind: BindingKind) {
        unsafe { self.gl.generate_mipmap(binding_kind(kind)) };
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, String> {
        unsafe { self.gl.create_shader(shader_stage(stage)) }
    }

    fn shader_source(&self, shader: Self::Shader, source: &str) {
        unsafe { self.gl.shader_source(shader, source) };
    }

    fn compile_shader(&self, shader: Self::Shader) {
        unsafe { self.gl.compile_shader(shader) };
    }

    fn shader_compile_status(&self, shader: Self::Shader) -> bool {
        unsafe { self.gl.get_shader_compile_status(shader) }
    }

    fn shader_info_log(&self, shader: Self::Shader) -> String {
        unsafe { self.gl.get_shader_info_log(shader) }
    }

    fn delete_shader(&self, shader: Self::Shader) {
        unsafe { self.gl.delete_shader(shader) };
    }

    fn create_program(&self) -> Result<Self::Program, String> {
        unsafe { self.gl.create_program() }
    }

    fn attach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { self.gl.attach_shader(program, shader) };
    }

    fn detach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { self.gl.detach_shader(program, shader) };
    }

    fn link_program(&self, program: Self::Program) {
        unsafe { self.gl.link_program(program) };
    }

    fn program_link_status(&self, program: Self::Program) -> bool {
        unsafe { self.gl.get_program_link_status(program) }
    }

    fn program_info_log(&self, program: Self::Program) -> String {
        unsafe { self.gl.get_program_info_log(program) }
    }

    fn delete_program(&self, program: Self::Program) {
        unsafe { self.gl.delete_program(program) };
    }

    fn uniform_location(&self, program: Self::Program, name: &str) -> Option<Self::UniformLocation> {
        unsafe { self.gl.get_uniform_location(program, name) }
    }

    fn attrib_location(&self, program: Self::Program, name: &str) -> Option<u32> {
        unsafe { self.gl.get_attrib_location(program, name) }
    }

    fn use_program(&self, program: Option<Self::Program>) {
        unsafe { self.gl.use_program(program) };
    }

    fn uniform_i32(&self, location: &Self::UniformLocation, v: &[i32]) {
        let loc = Some(location);
        unsafe {
            match *v {
                [x] => self.gl.uniform_1_i32(loc, x),
                [x, y] => self.gl.uniform_2_i32(loc, x, y),
                [x, y, z] => self.gl.uniform_3_i32(loc, x, y, z),
                [x, y, z, w] => self.gl.uniform_4_i32(loc, x, y, z, w),
                _ => unreachable!("uniform component count is 1..=4"),
            }
        }
    }

    fn uniform_f32(&self, location: &Self::UniformLocation, v: &[f32]) {
        let loc = Some(location);
        unsafe {
            match *v {
                [x] => self.gl.uniform_1_f32(loc, x),
                [x, y] => self.gl.uniform_2_f32(loc, x, y),
                [x, y, z] => self.gl.uniform_3_f32(loc, x, y, z),
                [x, y, z, w] => self.gl.uniform_4_f32(loc, x, y, z, w),
                _ => unreachable!("uniform component count is 1..=4"),
            }
        }
    }

    fn uniform_matrix_f32(&self, location: &Self::UniformLocation, dim: u8, v: &[f32]) {
        let loc = Some(location);
        unsafe {
            match dim {
                2 => self.gl.uniform_matrix_2_f32_slice(loc, false, v),
                3 => self.gl.uniform_matrix_3_f32_slice(loc, false, v),
                4 => self.gl.uniform_matrix_4_f32_slice(loc, false, v),
                _ => unreachable!("matrix dimension is 2..=4"),
            }
        }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(index) };
    }

    fn disable_vertex_attrib_array(&self, index: u32) {
        unsafe { self.gl.disable_vertex_attrib_array(index) };
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
        unsafe {
            self.gl.vertex_attrib_pointer_f32(
                index,
                i32::from(item_size),
                element_type(element),
                normalized,
                stride,
                offset,
            );
        }
    }

    fn vertex_attrib_f32(&self, index: u32, v: &[f32]) {
        unsafe {
            match *v {
                [x] => self.gl.vertex_attrib_1_f32(index, x),
                [x, y] => self.gl.vertex_attrib_2_f32(index, x, y),
                [x, y, z] => self.gl.vertex_attrib_3_f32(index, x, y, z),
                [x, y, z, w] => self.gl.vertex_attrib_4_f32(index, x, y, z, w),
                _ => unreachable!("attribute component count is 1..=4"),
            }
        }
    }

    fn create_framebuffer(&self) -> Result<Self::Framebuffer, String> {
        unsafe { self.gl.create_framebuffer() }
    }

    fn bind_framebuffer(&self, framebuffer: Option<Self::Framebuffer>) {
        unsafe { self.gl.bind_framebuffer(glow::FRAMEBUFFER, framebuffer) };
    }

    fn framebuffer_texture_2d(
        &self,
        slot: AttachmentSlot,
        target: TextureTarget,
        texture: Self::Texture,
        level: i32,
    ) {
        unsafe {
            self.gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                attachment_slot(slot),
                texture_target(target),
                Some(texture),
                level,
            );
        }
    }

    fn framebuffer_status(&self) -> FramebufferStatus {
        let status = unsafe { self.gl.check_framebuffer_status(glow::FRAMEBUFFER) };
        match status {
            glow::FRAMEBUFFER_COMPLETE => FramebufferStatus::Complete,
            glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT => FramebufferStatus::IncompleteAttachment,
            glow::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => FramebufferStatus::MissingAttachment,
            glow::FRAMEBUFFER_INCOMPLETE_DIMENSIONS => FramebufferStatus::DimensionMismatch,
            _ => FramebufferStatus::Unsupported,
        }
    }

    fn enable(&self, cap: Capability) {
        unsafe { self.gl.enable(capability(cap)) };
    }

    fn disable(&self, cap: Capability) {
        unsafe { self.gl.disable(capability(cap)) };
    }

    fn clear_color(&self, [r, g, b, a]: [f32; 4]) {
        unsafe { self.gl.clear_color(r, g, b, a) };
    }

    fn clear_depth(&self, depth: f32) {
        unsafe { self.gl.clear_depth_f32(depth) };
    }

    fn clear_stencil(&self, stencil: i32) {
        unsafe { self.gl.clear_stencil(stencil) };
    }

    fn clear(&self, mask: ClearMask) {
        let mut bits = 0;
        if mask.contains(ClearMask::COLOR) {
            bits |= glow::COLOR_BUFFER_BIT;
        }
        if mask.contains(ClearMask::DEPTH) {
            bits |= glow::DEPTH_BUFFER_BIT;
        }
        if mask.contains(ClearMask::STENCIL) {
            bits |= glow::STENCIL_BUFFER_BIT;
        }
        unsafe { self.gl.clear(bits) };
    }

    fn viewport(&self, rect: Rect) {
        unsafe { self.gl.viewport(rect.x, rect.y, rect.width, rect.height) };
    }

    fn draw_arrays(&self, mode: DrawMode, first: i32, count: i32) {
        unsafe { self.gl.draw_arrays(draw_mode(mode), first, count) };
    }

    fn flush(&self) {
        unsafe { self.gl.flush() };
    }

    fn finish(&self) {
        unsafe { self.gl.finish() };
    }

    fn max_texture_units(&self) -> u32 {
        let count = unsafe {
            self.gl
                .get_parameter_i32(glow::MAX_COMBINED_TEXTURE_IMAGE_UNITS)
        };
        u32::try_from(count).unwrap_or(0)
    }
}
