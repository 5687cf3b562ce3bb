//! Shader programs and their declared interface.
//!
//! A [`Program`] is built from vertex and fragment source plus an explicit
//! declaration of the uniforms and attributes the caller intends to drive.
//! Declared names the linker cannot resolve are logged and dropped rather
//! than treated as fatal — dead-code-eliminated uniforms are routine.
//! Setting a value goes through the declared type, so a `Vec3` uniform fed
//! a matrix fails with a type error instead of corrupting GPU state.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::api::GpuApi;
use crate::buffer::BufferView;
use crate::error::{Error, ResourceError, Result};
use crate::state::ContextShared;
use crate::texture::Texture;
use crate::types::{BindingKind, BufferTarget, ShaderStage};

/// Declared type of a uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformType {
    /// `bool`, set as an integer 0 or 1.
    Bool,
    /// `int`.
    Int,
    /// `ivec2`.
    IntVec2,
    /// `ivec3`.
    IntVec3,
    /// `ivec4`.
    IntVec4,
    /// `float`.
    Float,
    /// `vec2`.
    Vec2,
    /// `vec3`.
    Vec3,
    /// `vec4`.
    Vec4,
    /// `mat2`.
    Mat2,
    /// `mat3`.
    Mat3,
    /// `mat4`.
    Mat4,
    /// `sampler2D`.
    Sampler2D,
    /// `samplerCube`.
    SamplerCube,
}

impl UniformType {
    /// For sampler types, the texture binding kind they sample from.
    #[must_use]
    pub fn sampler_kind(self) -> Option<BindingKind> {
        match self {
            Self::Sampler2D => Some(BindingKind::Texture2D),
            Self::SamplerCube => Some(BindingKind::CubeMap),
            _ => None,
        }
    }
}

/// Declared type of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    /// `float`.
    Float,
    /// `vec2`.
    Vec2,
    /// `vec3`.
    Vec3,
    /// `vec4`.
    Vec4,
}

impl AttributeType {
    /// Components per vertex.
    #[must_use]
    pub fn size(self) -> u8 {
        match self {
            Self::Float => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 => 4,
        }
    }
}

/// A value for a declared uniform.
pub enum UniformValue<'a, G: GpuApi> {
    /// For [`UniformType::Bool`].
    Bool(bool),
    /// For [`UniformType::Int`].
    Int(i32),
    /// For [`UniformType::IntVec2`].
    IntVec2([i32; 2]),
    /// For [`UniformType::IntVec3`].
    IntVec3([i32; 3]),
    /// For [`UniformType::IntVec4`].
    IntVec4([i32; 4]),
    /// For [`UniformType::Float`].
    Float(f32),
    /// For [`UniformType::Vec2`].
    Vec2([f32; 2]),
    /// For [`UniformType::Vec3`].
    Vec3([f32; 3]),
    /// For [`UniformType::Vec4`].
    Vec4([f32; 4]),
    /// For [`UniformType::Mat2`], column-major.
    Mat2([f32; 4]),
    /// For [`UniformType::Mat3`], column-major.
    Mat3([f32; 9]),
    /// For [`UniformType::Mat4`], column-major.
    Mat4([f32; 16]),
    /// For [`UniformType::Sampler2D`] and [`UniformType::SamplerCube`].
    Texture(&'a Texture<G>),
}

/// A value for a declared attribute: a constant, or a buffer view.
pub enum AttributeValue<'a, G: GpuApi> {
    /// Constant `float` for every vertex.
    Float(f32),
    /// Constant `vec2` for every vertex.
    Vec2([f32; 2]),
    /// Constant `vec3` for every vertex.
    Vec3([f32; 3]),
    /// Constant `vec4` for every vertex.
    Vec4([f32; 4]),
    /// Per-vertex data read from a vertex buffer view.
    View(&'a BufferView<G>),
}

/// Construction inputs for a [`Program`].
pub struct ProgramDesc<'a> {
    /// Vertex shader source.
    pub vertex: &'a str,
    /// Fragment shader source.
    pub fragment: &'a str,
    /// Uniform names and the types the caller will set them with.
    pub uniforms: &'a [(&'a str, UniformType)],
    /// Attribute names and their vertex types.
    pub attributes: &'a [(&'a str, AttributeType)],
}

/// Last value written to a uniform location, for compare-and-issue.
#[derive(PartialEq)]
enum StoredUniform {
    Ints(Vec<i32>),
    Floats(Vec<f32>),
}

pub(crate) struct Uniform<G: GpuApi> {
    location: G::UniformLocation,
    ty: UniformType,
    last: RefCell<Option<StoredUniform>>,
}

impl<G: GpuApi> Uniform<G> {
    pub(crate) fn ty(&self) -> UniformType {
        self.ty
    }

    fn issue_ints(&self, gl: &G, values: &[i32]) {
        let stored = StoredUniform::Ints(values.to_vec());
        let mut last = self.last.borrow_mut();
        if last.as_ref() == Some(&stored) {
            return;
        }
        gl.uniform_i32(&self.location, values);
        *last = Some(stored);
    }

    fn issue_floats(&self, gl: &G, values: &[f32]) {
        let stored = StoredUniform::Floats(values.to_vec());
        let mut last = self.last.borrow_mut();
        if last.as_ref() == Some(&stored) {
            return;
        }
        gl.uniform_f32(&self.location, values);
        *last = Some(stored);
    }

    fn issue_matrix(&self, gl: &G, dim: u8, values: &[f32]) {
        let stored = StoredUniform::Floats(values.to_vec());
        let mut last = self.last.borrow_mut();
        if last.as_ref() == Some(&stored) {
            return;
        }
        gl.uniform_matrix_f32(&self.location, dim, values);
        *last = Some(stored);
    }

    /// Write a non-sampler value, enforcing the declared type.
    pub(crate) fn set_value(&self, gl: &G, name: &str, value: &UniformValue<'_, G>) -> Result<()> {
        match (self.ty, value) {
            (UniformType::Bool, UniformValue::Bool(b)) => {
                self.issue_ints(gl, &[i32::from(*b)]);
            }
            (UniformType::Int, UniformValue::Int(v)) => self.issue_ints(gl, &[*v]),
            (UniformType::IntVec2, UniformValue::IntVec2(v)) => self.issue_ints(gl, v),
            (UniformType::IntVec3, UniformValue::IntVec3(v)) => self.issue_ints(gl, v),
            (UniformType::IntVec4, UniformValue::IntVec4(v)) => self.issue_ints(gl, v),
            (UniformType::Float, UniformValue::Float(v)) => self.issue_floats(gl, &[*v]),
            (UniformType::Vec2, UniformValue::Vec2(v)) => self.issue_floats(gl, v),
            (UniformType::Vec3, UniformValue::Vec3(v)) => self.issue_floats(gl, v),
            (UniformType::Vec4, UniformValue::Vec4(v)) => self.issue_floats(gl, v),
            (UniformType::Mat2, UniformValue::Mat2(v)) => self.issue_matrix(gl, 2, v),
            (UniformType::Mat3, UniformValue::Mat3(v)) => self.issue_matrix(gl, 3, v),
            (UniformType::Mat4, UniformValue::Mat4(v)) => self.issue_matrix(gl, 4, v),
            _ => {
                return Err(Error::TypeMismatch(format!(
                    "uniform `{name}` is declared {:?}, got an incompatible value",
                    self.ty
                )))
            }
        }
        Ok(())
    }

    /// Point a sampler uniform at a texture unit.
    pub(crate) fn set_sampler_unit(&self, gl: &G, unit: u32) {
        // Unit indices are bounded by the pool size, far below i32::MAX.
        let unit = i32::try_from(unit).expect("texture unit index fits in i32");
        self.issue_ints(gl, &[unit]);
    }
}

pub(crate) struct Attribute<G: GpuApi> {
    ctx: Rc<ContextShared<G>>,
    location: u32,
    ty: AttributeType,
    array_enabled: Cell<bool>,
}

impl<G: GpuApi> Attribute<G> {
    /// Drive the attribute from a constant or a buffer view.
    pub(crate) fn set_value(&self, name: &str, value: &AttributeValue<'_, G>) -> Result<()> {
        match value {
            AttributeValue::Float(v) => self.set_constant(name, AttributeType::Float, &[*v]),
            AttributeValue::Vec2(v) => self.set_constant(name, AttributeType::Vec2, v),
            AttributeValue::Vec3(v) => self.set_constant(name, AttributeType::Vec3, v),
            AttributeValue::Vec4(v) => self.set_constant(name, AttributeType::Vec4, v),
            AttributeValue::View(view) => self.set_view(name, view),
        }
    }

    fn set_constant(&self, name: &str, given: AttributeType, values: &[f32]) -> Result<()> {
        if given != self.ty {
            return Err(Error::TypeMismatch(format!(
                "attribute `{name}` is declared {:?}, got a {given:?} constant",
                self.ty
            )));
        }
        if self.array_enabled.get() {
            self.ctx.gl.disable_vertex_attrib_array(self.location);
            self.array_enabled.set(false);
        }
        self.ctx.gl.vertex_attrib_f32(self.location, values);
        Ok(())
    }

    fn set_view(&self, name: &str, view: &BufferView<G>) -> Result<()> {
        let buffer = view.upgrade()?;
        if buffer.target != BufferTarget::Vertex {
            return Err(Error::TypeMismatch(format!(
                "attribute `{name}` needs a vertex buffer view, got an index buffer"
            )));
        }
        if view.item_size() != self.ty.size() {
            return Err(Error::TypeMismatch(format!(
                "attribute `{name}` is declared {:?} ({} components), the view carries {}",
                self.ty,
                self.ty.size(),
                view.item_size()
            )));
        }
        self.ctx.bind_buffer(BufferTarget::Vertex, buffer.raw);
        if !self.array_enabled.get() {
            self.ctx.gl.enable_vertex_attrib_array(self.location);
            self.array_enabled.set(true);
        }
        // Stride and offset were validated against i32 range at view
        // creation.
        let stride = i32::try_from(view.stride()).expect("view stride fits in i32");
        let offset = i32::try_from(view.offset()).expect("view offset fits in i32");
        self.ctx.gl.vertex_attrib_pointer(
            self.location,
            view.item_size(),
            view.element(),
            view.normalized(),
            stride,
            offset,
        );
        Ok(())
    }
}

/// A linked shader program with its declared uniforms and attributes.
pub struct Program<G: GpuApi> {
    ctx: Rc<ContextShared<G>>,
    raw: G::Program,
    uniforms: HashMap<String, Uniform<G>>,
    attributes: HashMap<String, Attribute<G>>,
}

impl<G: GpuApi> Program<G> {
    pub(crate) fn new(ctx: Rc<ContextShared<G>>, desc: &ProgramDesc<'_>) -> Result<Self> {
        let gl = &ctx.gl;
        let vertex = compile(gl, ShaderStage::Vertex, desc.vertex)?;
        let fragment = match compile(gl, ShaderStage::Fragment, desc.fragment) {
            Ok(shader) => shader,
            Err(err) => {
                gl.delete_shader(vertex);
                return Err(err);
            }
        };

        let raw = match gl.create_program() {
            Ok(raw) => raw,
            Err(message) => {
                gl.delete_shader(vertex);
                gl.delete_shader(fragment);
                return Err(ResourceError::CreateFailed(message).into());
            }
        };
        gl.attach_shader(raw, vertex);
        gl.attach_shader(raw, fragment);
        gl.link_program(raw);
        let linked = gl.program_link_status(raw);
        // Shaders are only needed until the link; the program keeps the
        // binary either way.
        gl.detach_shader(raw, vertex);
        gl.detach_shader(raw, fragment);
        gl.delete_shader(vertex);
        gl.delete_shader(fragment);
        if !linked {
            let log = gl.program_info_log(raw);
            gl.delete_program(raw);
            return Err(Error::CompileOrLink { stage: None, log });
        }

        let mut uniforms = HashMap::new();
        for &(name, ty) in desc.uniforms {
            match gl.uniform_location(raw, name) {
                Some(location) => {
                    uniforms.insert(
                        name.to_owned(),
                        Uniform {
                            location,
                            ty,
                            last: RefCell::new(None),
                        },
                    );
                }
                None => log::warn!("uniform `{name}` not found in linked program, ignoring"),
            }
        }
        let mut attributes = HashMap::new();
        for &(name, ty) in desc.attributes {
            match gl.attrib_location(raw, name) {
                Some(location) => {
                    attributes.insert(
                        name.to_owned(),
                        Attribute {
                            ctx: Rc::clone(&ctx),
                            location,
                            ty,
                            array_enabled: Cell::new(false),
                        },
                    );
                }
                None => log::warn!("attribute `{name}` not found in linked program, ignoring"),
            }
        }

        Ok(Self {
            ctx,
            raw,
            uniforms,
            attributes,
        })
    }

    pub(crate) fn uniform(&self, name: &str) -> Option<&Uniform<G>> {
        self.uniforms.get(name)
    }

    pub(crate) fn attribute(&self, name: &str) -> Option<&Attribute<G>> {
        self.attributes.get(name)
    }

    /// Declared uniform names that resolved to live locations.
    pub fn uniform_names(&self) -> impl Iterator<Item = &str> {
        self.uniforms.keys().map(String::as_str)
    }

    /// Declared attribute names that resolved to live locations.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Make this the active program through the state cache.
    pub(crate) fn activate(&self) {
        self.ctx.use_program(self.raw);
    }
}

fn compile<G: GpuApi>(gl: &G, stage: ShaderStage, source: &str) -> Result<G::Shader> {
    let shader = gl
        .create_shader(stage)
        .map_err(ResourceError::CreateFailed)?;
    gl.shader_source(shader, source);
    gl.compile_shader(shader);
    if !gl.shader_compile_status(shader) {
        let log = gl.shader_info_log(shader);
        gl.delete_shader(shader);
        return Err(Error::CompileOrLink {
            stage: Some(stage),
            log,
        });
    }
    Ok(shader)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::buffer::{BufferInit, ViewDesc};
    use crate::fake::{Call, FakeGl};
    use crate::RenderingContext;

    fn ctx() -> (FakeGl, RenderingContext<FakeGl>) {
        let gl = FakeGl::new(8);
        let ctx = RenderingContext::new(gl.clone(), (640, 480));
        (gl, ctx)
    }

    fn simple_desc<'a>() -> ProgramDesc<'a> {
        ProgramDesc {
            vertex: "void main() {}",
            fragment: "void main() {}",
            uniforms: &[("u_color", UniformType::Vec4)],
            attributes: &[("a_pos", AttributeType::Vec3)],
        }
    }

    #[test]
    fn successful_build_resolves_declared_names() {
        let (_gl, ctx) = ctx();
        let program = ctx.create_program(&simple_desc()).unwrap();
        assert!(program.uniform("u_color").is_some());
        assert!(program.attribute("a_pos").is_some());
    }

    #[test]
    fn compile_failure_reports_stage_and_log() {
        let (gl, ctx) = ctx();
        gl.fail_compile(Some(ShaderStage::Fragment));
        match ctx.create_program(&simple_desc()) {
            Err(Error::CompileOrLink { stage, log }) => {
                assert_eq!(stage, Some(ShaderStage::Fragment));
                assert!(!log.is_empty());
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("construction should fail"),
        }
        // Both shaders were cleaned up.
        assert_eq!(gl.count(|c| matches!(c, Call::DeleteShader(_))), 2);
    }

    #[test]
    fn link_failure_deletes_the_program() {
        let (gl, ctx) = ctx();
        gl.fail_link(true);
        match ctx.create_program(&simple_desc()) {
            Err(Error::CompileOrLink { stage: None, .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("link should fail"),
        }
        assert_eq!(gl.count(|c| matches!(c, Call::DeleteProgram(_))), 1);
    }

    #[test]
    fn unresolved_names_are_dropped_not_fatal() {
        let (gl, ctx) = ctx();
        gl.hide_name("u_gone");
        let program = ctx
            .create_program(&ProgramDesc {
                uniforms: &[("u_gone", UniformType::Float), ("u_color", UniformType::Vec4)],
                ..simple_desc()
            })
            .unwrap();
        assert!(program.uniform("u_gone").is_none());
        assert!(program.uniform("u_color").is_some());
    }

    #[test]
    fn uniform_type_mismatch_is_rejected() {
        let (gl, ctx) = ctx();
        let program = ctx.create_program(&simple_desc()).unwrap();
        let uniform = program.uniform("u_color").unwrap();
        let err = uniform
            .set_value(&gl, "u_color", &UniformValue::Float(1.0))
            .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch(_)));
    }

    #[test]
    fn repeated_uniform_value_is_issued_once() {
        let (gl, ctx) = ctx();
        let program = ctx.create_program(&simple_desc()).unwrap();
        let uniform = program.uniform("u_color").unwrap();
        gl.clear_calls();
        uniform
            .set_value(&gl, "u_color", &UniformValue::Vec4([1.0, 0.0, 0.0, 1.0]))
            .unwrap();
        uniform
            .set_value(&gl, "u_color", &UniformValue::Vec4([1.0, 0.0, 0.0, 1.0]))
            .unwrap();
        assert_eq!(gl.count(|c| matches!(c, Call::UniformF32(..))), 1);
        uniform
            .set_value(&gl, "u_color", &UniformValue::Vec4([0.0, 1.0, 0.0, 1.0]))
            .unwrap();
        assert_eq!(gl.count(|c| matches!(c, Call::UniformF32(..))), 2);
    }

    #[test]
    fn constant_attribute_disables_the_array() {
        let (gl, ctx) = ctx();
        let program = ctx.create_program(&simple_desc()).unwrap();
        let buffer = ctx.create_buffer(crate::types::BufferTarget::Vertex).unwrap();
        buffer
            .set(BufferInit {
                data: Some(&[0u8; 36]),
                ..BufferInit::default()
            })
            .unwrap();
        buffer.create_view("pos", ViewDesc::new(3)).unwrap();
        let attribute = program.attribute("a_pos").unwrap();

        attribute
            .set_value("a_pos", &AttributeValue::View(&buffer.view("pos").unwrap()))
            .unwrap();
        assert_eq!(gl.count(|c| matches!(c, Call::EnableVertexAttribArray(_))), 1);

        attribute
            .set_value("a_pos", &AttributeValue::Vec3([0.0, 0.0, 0.0]))
            .unwrap();
        assert_eq!(gl.count(|c| matches!(c, Call::DisableVertexAttribArray(_))), 1);
        assert_eq!(gl.count(|c| matches!(c, Call::VertexAttribF32(..))), 1);

        // Back to a view: the array is re-enabled.
        attribute
            .set_value("a_pos", &AttributeValue::View(&buffer.view("pos").unwrap()))
            .unwrap();
        assert_eq!(gl.count(|c| matches!(c, Call::EnableVertexAttribArray(_))), 2);
    }

    #[test]
    fn index_buffer_view_is_rejected_for_attributes() {
        let (_gl, ctx) = ctx();
        let program = ctx.create_program(&simple_desc()).unwrap();
        let buffer = ctx.create_buffer(crate::types::BufferTarget::Index).unwrap();
        buffer
            .set(BufferInit {
                data: Some(&[0u8; 12]),
                ..BufferInit::default()
            })
            .unwrap();
        buffer.create_view("pos", ViewDesc::new(3)).unwrap();
        let err = program
            .attribute("a_pos")
            .unwrap()
            .set_value("a_pos", &AttributeValue::View(&buffer.view("pos").unwrap()))
            .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch(_)));
    }

    #[test]
    fn component_count_mismatch_is_rejected() {
        let (_gl, ctx) = ctx();
        let program = ctx.create_program(&simple_desc()).unwrap();
        let buffer = ctx.create_buffer(crate::types::BufferTarget::Vertex).unwrap();
        buffer
            .set(BufferInit {
                data: Some(&[0u8; 16]),
                ..BufferInit::default()
            })
            .unwrap();
        buffer.create_view("uv", ViewDesc::new(2)).unwrap();
        let err = program
            .attribute("a_pos")
            .unwrap()
            .set_value("a_pos", &AttributeValue::View(&buffer.view("uv").unwrap()))
            .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch(_)));
    }
}
