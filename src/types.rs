//! Backend-neutral vocabulary shared by the whole crate.
//!
//! Every GL enumerant the core cares about is a closed Rust enum here, so
//! that state comparisons are typed and dispatch never happens on raw
//! constants or strings. The [`backend`](crate::backend) module is the only
//! place these are mapped onto the underlying API's values.

use bitflags::bitflags;

/// The binding target of a [`Buffer`](crate::Buffer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Vertex attribute data (`ARRAY_BUFFER`).
    Vertex,
    /// Element index data (`ELEMENT_ARRAY_BUFFER`).
    Index,
}

/// Usage hint supplied when (re)allocating a buffer's storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferUsage {
    /// Written once, drawn many times.
    #[default]
    Static,
    /// Rewritten frequently, drawn many times.
    Dynamic,
    /// Rewritten for every use.
    Stream,
}

/// Scalar type of one element inside a buffer view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    /// Signed 8-bit integer.
    I8,
    /// Unsigned 8-bit integer.
    U8,
    /// Signed 16-bit integer.
    I16,
    /// Unsigned 16-bit integer.
    U16,
    /// 32-bit float.
    F32,
}

impl ElementType {
    /// Size of one element in bytes.
    #[must_use]
    pub fn byte_size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::F32 => 4,
        }
    }
}

/// Image target of a texture: plain 2D or one of the six cube-map faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureTarget {
    /// A standard two-dimensional texture.
    Texture2D,
    /// Cube map, positive X face.
    CubeMapPositiveX,
    /// Cube map, negative X face.
    CubeMapNegativeX,
    /// Cube map, positive Y face.
    CubeMapPositiveY,
    /// Cube map, negative Y face.
    CubeMapNegativeY,
    /// Cube map, positive Z face.
    CubeMapPositiveZ,
    /// Cube map, negative Z face.
    CubeMapNegativeZ,
}

impl TextureTarget {
    /// The binding kind this target belongs to.
    ///
    /// All six cube faces share a single cube-map binding point; texture
    /// units and sampler uniforms deal in binding kinds, not faces.
    #[must_use]
    pub fn binding_kind(self) -> BindingKind {
        match self {
            Self::Texture2D => BindingKind::Texture2D,
            _ => BindingKind::CubeMap,
        }
    }
}

/// The binding point a texture occupies on a texture unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    /// `TEXTURE_2D` binding point.
    Texture2D,
    /// `TEXTURE_CUBE_MAP` binding point.
    CubeMap,
}

/// Minification filter of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinFilter {
    /// Nearest texel.
    Nearest,
    /// Bilinear interpolation.
    Linear,
    /// Nearest texel in the nearest mip level.
    NearestMipmapNearest,
    /// Bilinear in the nearest mip level.
    LinearMipmapNearest,
    /// Nearest texel, interpolated between mip levels.
    NearestMipmapLinear,
    /// Full trilinear interpolation.
    LinearMipmapLinear,
}

/// Magnification filter of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagFilter {
    /// Nearest texel.
    Nearest,
    /// Bilinear interpolation.
    Linear,
}

/// Wrap mode for one texture coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrap {
    /// Clamp to the edge texel.
    ClampToEdge,
    /// Repeat, mirrored on every other tile.
    MirroredRepeat,
    /// Plain repeat.
    Repeat,
}

/// One texture parameter together with its new value.
///
/// Modelled as a single call-shaped enum so the command sink sees exactly one
/// parameter write per variant and recording backends can log it verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexParam {
    /// `TEXTURE_MIN_FILTER`.
    MinFilter(MinFilter),
    /// `TEXTURE_MAG_FILTER`.
    MagFilter(MagFilter),
    /// `TEXTURE_WRAP_S`.
    WrapS(Wrap),
    /// `TEXTURE_WRAP_T`.
    WrapT(Wrap),
}

/// Pixel layout of image data handed to a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Single alpha channel.
    Alpha,
    /// Single luminance channel.
    Luminance,
    /// Luminance plus alpha.
    LuminanceAlpha,
    /// Red, green, blue.
    Rgb,
    /// Red, green, blue, alpha.
    Rgba,
    /// Depth values (for depth attachments).
    DepthComponent,
    /// Packed depth and stencil (for stencil attachments).
    DepthStencil,
}

/// Storage type of each pixel component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelType {
    /// One byte per component.
    UnsignedByte,
    /// Packed 5-6-5 RGB in one 16-bit value.
    UnsignedShort565,
    /// Packed 4-4-4-4 RGBA in one 16-bit value.
    UnsignedShort4444,
    /// Packed 5-5-5-1 RGBA in one 16-bit value.
    UnsignedShort5551,
    /// One 16-bit value per pixel (depth textures).
    UnsignedShort,
    /// Packed 24-bit depth and 8-bit stencil.
    UnsignedInt24_8,
}

/// One of the two shader pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    /// Vertex stage.
    Vertex,
    /// Fragment stage.
    Fragment,
}

/// A toggleable pipeline capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Framebuffer blending.
    Blend,
    /// Back/front face culling.
    CullFace,
    /// Depth testing.
    DepthTest,
    /// Color dithering. The only capability that starts enabled.
    Dither,
    /// Polygon offset for filled primitives.
    PolygonOffsetFill,
    /// Stencil testing.
    StencilTest,
}

impl Capability {
    pub(crate) const COUNT: usize = 6;

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// Whether the underlying API enables this capability by default.
    #[must_use]
    pub fn initially_enabled(self) -> bool {
        matches!(self, Self::Dither)
    }
}

/// Primitive assembly mode for a draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawMode {
    /// Individual points.
    Points,
    /// Connected line strip.
    LineStrip,
    /// Closed line loop.
    LineLoop,
    /// Individual line segments.
    Lines,
    /// Connected triangle strip.
    TriangleStrip,
    /// Triangle fan around the first vertex.
    TriangleFan,
    /// Individual triangles.
    Triangles,
}

/// Attachment slot of a framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentSlot {
    /// Color attachment 0.
    Color,
    /// Depth attachment.
    Depth,
    /// Stencil attachment.
    Stencil,
}

/// Aggregate completeness status reported for a framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramebufferStatus {
    /// The framebuffer can be rendered to.
    Complete,
    /// An attachment is present but unusable.
    IncompleteAttachment,
    /// A required attachment is missing entirely.
    MissingAttachment,
    /// Attachments do not share the same dimensions.
    DimensionMismatch,
    /// The attachment combination is not supported by the implementation.
    Unsupported,
}

bitflags! {
    /// Which aspects of the framebuffer a clear call touches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClearMask: u32 {
        /// Clear the color buffer.
        const COLOR = 1 << 0;
        /// Clear the depth buffer.
        const DEPTH = 1 << 1;
        /// Clear the stencil buffer.
        const STENCIL = 1 << 2;
    }
}

/// An axis-aligned viewport rectangle in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Bottom edge.
    pub y: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl Rect {
    /// A rectangle anchored at the origin with the given size.
    ///
    /// # Panics
    ///
    /// Panics if either dimension exceeds `i32::MAX`, which is unreachable
    /// for real surface sizes.
    #[must_use]
    pub fn of_size(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width: i32::try_from(width).expect("width exceeds i32::MAX"),
            height: i32::try_from(height).expect("height exceeds i32::MAX"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn element_byte_sizes() {
        assert_eq!(ElementType::I8.byte_size(), 1);
        assert_eq!(ElementType::U16.byte_size(), 2);
        assert_eq!(ElementType::F32.byte_size(), 4);
    }

    #[test]
    fn cube_faces_share_one_binding_kind() {
        assert_eq!(
            TextureTarget::Texture2D.binding_kind(),
            BindingKind::Texture2D
        );
        assert_eq!(
            TextureTarget::CubeMapPositiveX.binding_kind(),
            BindingKind::CubeMap
        );
        assert_eq!(
            TextureTarget::CubeMapNegativeZ.binding_kind(),
            BindingKind::CubeMap
        );
    }

    #[test]
    fn only_dither_starts_enabled() {
        assert!(Capability::Dither.initially_enabled());
        assert!(!Capability::Blend.initially_enabled());
        assert!(!Capability::StencilTest.initially_enabled());
    }
}
