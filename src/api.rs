//! The command sink the rest of the crate is written against.
//!
//! [`GpuApi`] is a deliberately narrow trait covering exactly the calls this
//! layer needs from the underlying GL implementation: resource creation,
//! state transitions, data upload, compile/link status queries, and draw
//! submission. Every state-changing call on it is mediated by the binding
//! state cache — no other module talks to the API directly for state.
//!
//! [`GlowGl`](crate::backend::GlowGl) is the production implementation; the
//! test suites use a recording fake, which is what makes the "at most one
//! real call per value transition" guarantee checkable.

use std::fmt::Debug;

use crate::types::{
    AttachmentSlot, BindingKind, BufferTarget, BufferUsage, Capability, ClearMask, DrawMode,
    ElementType, FramebufferStatus, PixelFormat, PixelType, Rect, ShaderStage, TexParam,
    TextureTarget,
};

/// A synchronous GPU command sink.
///
/// Handle types mirror the underlying API's object names; they are plain
/// copyable tokens with no behavior of their own. Methods that create
/// resources report failure as the implementation's diagnostic string, which
/// callers wrap into [`ResourceError::CreateFailed`]
/// (crate::ResourceError::CreateFailed).
///
/// The GPU executes submitted commands asynchronously; no method here blocks
/// on that execution except [`finish`](Self::finish).
pub trait GpuApi {
    /// A GPU buffer object handle.
    type Buffer: Copy + PartialEq + Debug;
    /// A compiled shader stage handle.
    type Shader: Copy + PartialEq + Debug;
    /// A linked program handle.
    type Program: Copy + PartialEq + Debug;
    /// A texture object handle.
    type Texture: Copy + PartialEq + Debug;
    /// A framebuffer object handle.
    type Framebuffer: Copy + PartialEq + Debug;
    /// A resolved uniform location.
    type UniformLocation: Clone + PartialEq + Debug;

    /// Create a buffer object.
    ///
    /// # Errors
    ///
    /// Returns the implementation's diagnostic string on failure.
    fn create_buffer(&self) -> Result<Self::Buffer, String>;
    /// Bind `buffer` (or unbind with `None`) to `target`.
    fn bind_buffer(&self, target: BufferTarget, buffer: Option<Self::Buffer>);
    /// Allocate `size` bytes of undefined storage for the bound buffer.
    fn buffer_data_size(&self, target: BufferTarget, size: usize, usage: BufferUsage);
    /// Replace the bound buffer's full contents.
    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage);
    /// Overwrite a sub-range of the bound buffer.
    fn buffer_sub_data(&self, target: BufferTarget, offset: usize, data: &[u8]);

    /// Create a texture object.
    ///
    /// # Errors
    ///
    /// Returns the implementation's diagnostic string on failure.
    fn create_texture(&self) -> Result<Self::Texture, String>;
    /// Make `unit` the active texture unit.
    fn active_texture(&self, unit: u32);
    /// Bind `texture` (or unbind) to `kind` on the active unit.
    fn bind_texture(&self, kind: BindingKind, texture: Option<Self::Texture>);
    /// Set one parameter of the texture bound to `kind` on the active unit.
    fn tex_parameter(&self, kind: BindingKind, param: TexParam);
    /// Specify the image of the texture bound on the active unit.
    ///
    /// `pixels` of `None` allocates storage without defining its contents.
    #[allow(clippy::too_many_arguments)]
    fn tex_image_2d(
        &self,
        target: TextureTarget,
        level: i32,
        format: PixelFormat,
        width: u32,
        height: u32,
        pixel_type: PixelType,
        pixels: Option<&[u8]>,
    );
    /// Generate the full mipmap chain for the texture bound to `kind`.
    fn generate_mipmap(&self, kind: BindingKind);

    /// Create a shader object for `stage`.
    ///
    /// # Errors
    ///
    /// Returns the implementation's diagnostic string on failure.
    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, String>;
    /// Replace the shader's source text.
    fn shader_source(&self, shader: Self::Shader, source: &str);
    /// Compile the shader.
    fn compile_shader(&self, shader: Self::Shader);
    /// Whether the last compile succeeded.
    fn shader_compile_status(&self, shader: Self::Shader) -> bool;
    /// The compiler's info log.
    fn shader_info_log(&self, shader: Self::Shader) -> String;
    /// Delete a shader object.
    fn delete_shader(&self, shader: Self::Shader);

    /// Create a program object.
    ///
    /// # Errors
    ///
    /// Returns the implementation's diagnostic string on failure.
    fn create_program(&self) -> Result<Self::Program, String>;
    /// Attach a compiled shader to the program.
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    /// Detach a shader from the program.
    fn detach_shader(&self, program: Self::Program, shader: Self::Shader);
    /// Link the program.
    fn link_program(&self, program: Self::Program);
    /// Whether the last link succeeded.
    fn program_link_status(&self, program: Self::Program) -> bool;
    /// The linker's info log.
    fn program_info_log(&self, program: Self::Program) -> String;
    /// Delete a program object.
    fn delete_program(&self, program: Self::Program);
    /// Resolve a uniform name, or `None` if the linker discarded it.
    fn uniform_location(&self, program: Self::Program, name: &str) -> Option<Self::UniformLocation>;
    /// Resolve an attribute name, or `None` if the linker discarded it.
    fn attrib_location(&self, program: Self::Program, name: &str) -> Option<u32>;
    /// Make `program` (or no program) current.
    fn use_program(&self, program: Option<Self::Program>);

    /// Set an integer or boolean uniform; `v` holds 1–4 components.
    fn uniform_i32(&self, location: &Self::UniformLocation, v: &[i32]);
    /// Set a float scalar/vector uniform; `v` holds 1–4 components.
    fn uniform_f32(&self, location: &Self::UniformLocation, v: &[f32]);
    /// Set a square float matrix uniform of dimension `dim` (2–4) from a
    /// flat column-major array of `dim * dim` values.
    fn uniform_matrix_f32(&self, location: &Self::UniformLocation, dim: u8, v: &[f32]);

    /// Enable the vertex array state of attribute slot `index`.
    fn enable_vertex_attrib_array(&self, index: u32);
    /// Disable the vertex array state of attribute slot `index`.
    fn disable_vertex_attrib_array(&self, index: u32);
    /// Describe the element layout of attribute slot `index`, reading from
    /// the buffer currently bound to the vertex target.
    fn vertex_attrib_pointer(
        &self,
        index: u32,
        item_size: u8,
        element: ElementType,
        normalized: bool,
        stride: i32,
        offset: i32,
    );
    /// Set a constant value for attribute slot `index`; `v` holds 1–4
    /// components.
    fn vertex_attrib_f32(&self, index: u32, v: &[f32]);

    /// Create a framebuffer object.
    ///
    /// # Errors
    ///
    /// Returns the implementation's diagnostic string on failure.
    fn create_framebuffer(&self) -> Result<Self::Framebuffer, String>;
    /// Bind `framebuffer`, or the default surface with `None`.
    fn bind_framebuffer(&self, framebuffer: Option<Self::Framebuffer>);
    /// Attach a texture image to a slot of the bound framebuffer.
    fn framebuffer_texture_2d(
        &self,
        slot: AttachmentSlot,
        target: TextureTarget,
        texture: Self::Texture,
        level: i32,
    );
    /// Query the aggregate completeness status of the bound framebuffer.
    fn framebuffer_status(&self) -> FramebufferStatus;

    /// Enable a capability.
    fn enable(&self, cap: Capability);
    /// Disable a capability.
    fn disable(&self, cap: Capability);
    /// Set the color used by color clears.
    fn clear_color(&self, rgba: [f32; 4]);
    /// Set the depth value used by depth clears.
    fn clear_depth(&self, depth: f32);
    /// Set the stencil value used by stencil clears.
    fn clear_stencil(&self, stencil: i32);
    /// Clear the selected aspects of the bound framebuffer.
    fn clear(&self, mask: ClearMask);
    /// Set the viewport rectangle.
    fn viewport(&self, rect: Rect);
    /// Submit a non-indexed draw call.
    fn draw_arrays(&self, mode: DrawMode, first: i32, count: i32);

    /// Enqueue a pipeline drain request without waiting for it.
    fn flush(&self);
    /// Block until all previously issued commands have completed.
    fn finish(&self);

    /// The size of the hardware texture unit pool.
    fn max_texture_units(&self) -> u32;
}
