//! Off-screen render targets.
//!
//! A [`Framebuffer`] carries a fixed size and up to three texture
//! attachments, one per [`AttachmentSlot`]. Attachments are either textures
//! the caller already owns or fresh ones allocated to the framebuffer's size
//! with [`Attachment::New`]; either way the framebuffer keeps a handle so
//! the backing storage outlives the caller's copy.

use std::cell::RefCell;
use std::rc::Rc;

use crate::api::GpuApi;
use crate::error::{IncompleteReason, ResourceError, Result};
use crate::state::ContextShared;
use crate::texture::{TexImage, Texture, TextureDesc};
use crate::types::{
    AttachmentSlot, FramebufferStatus, MagFilter, MinFilter, PixelFormat, PixelType,
    TextureTarget, Wrap,
};

/// What to attach to a framebuffer slot.
pub enum Attachment<'a, G: GpuApi> {
    /// An existing texture; the framebuffer records a shared handle to it.
    Texture(&'a Texture<G>),
    /// Allocate a fresh texture sized to the framebuffer, with a format
    /// chosen by the slot: RGBA8 for color, 16-bit depth for depth,
    /// packed depth-stencil for stencil.
    New,
}

struct Attachments<G: GpuApi> {
    color: Option<Texture<G>>,
    depth: Option<Texture<G>>,
    stencil: Option<Texture<G>>,
}

impl<G: GpuApi> Attachments<G> {
    fn slot(&mut self, slot: AttachmentSlot) -> &mut Option<Texture<G>> {
        match slot {
            AttachmentSlot::Color => &mut self.color,
            AttachmentSlot::Depth => &mut self.depth,
            AttachmentSlot::Stencil => &mut self.stencil,
        }
    }
}

/// An off-screen render target of fixed size.
pub struct Framebuffer<G: GpuApi> {
    ctx: Rc<ContextShared<G>>,
    raw: G::Framebuffer,
    width: u32,
    height: u32,
    attachments: RefCell<Attachments<G>>,
}

impl<G: GpuApi> Framebuffer<G> {
    pub(crate) fn new(ctx: Rc<ContextShared<G>>, width: u32, height: u32) -> Result<Self> {
        let raw = ctx
            .gl
            .create_framebuffer()
            .map_err(ResourceError::CreateFailed)?;
        Ok(Self {
            ctx,
            raw,
            width,
            height,
            attachments: RefCell::new(Attachments {
                color: None,
                depth: None,
                stencil: None,
            }),
        })
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    pub(crate) fn raw(&self) -> G::Framebuffer {
        self.raw
    }

    /// The texture currently attached to `slot`, if any.
    #[must_use]
    pub fn attachment(&self, slot: AttachmentSlot) -> Option<Texture<G>> {
        self.attachments.borrow_mut().slot(slot).clone()
    }

    /// Attach a texture image to `slot`, replacing any previous attachment.
    ///
    /// Returns a handle to the attached texture — the freshly allocated one
    /// for [`Attachment::New`], a shared clone otherwise.
    ///
    /// # Errors
    ///
    /// Propagates texture allocation and binding failures.
    pub fn attach(&self, slot: AttachmentSlot, attachment: Attachment<'_, G>) -> Result<Texture<G>> {
        let texture = match attachment {
            Attachment::Texture(texture) => texture.clone(),
            Attachment::New => self.new_attachment_texture(slot)?,
        };
        self.ctx.bind_framebuffer(Some(self.raw));
        self.ctx
            .gl
            .framebuffer_texture_2d(slot, texture.target(), texture.raw(), 0);
        *self.attachments.borrow_mut().slot(slot) = Some(texture.clone());
        Ok(texture)
    }

    /// Allocate a texture suitable for attaching to `slot`, sized to the
    /// framebuffer.
    fn new_attachment_texture(&self, slot: AttachmentSlot) -> Result<Texture<G>> {
        let (format, pixel_type) = match slot {
            AttachmentSlot::Color => (PixelFormat::Rgba, PixelType::UnsignedByte),
            AttachmentSlot::Depth => (PixelFormat::DepthComponent, PixelType::UnsignedShort),
            AttachmentSlot::Stencil => (PixelFormat::DepthStencil, PixelType::UnsignedInt24_8),
        };
        let texture = Texture::new(
            Rc::clone(&self.ctx),
            TextureDesc {
                target: TextureTarget::Texture2D,
                // Render targets are sampled without mipmaps.
                min_filter: MinFilter::Linear,
                mag_filter: MagFilter::Linear,
                wrap_s: Wrap::ClampToEdge,
                wrap_t: Wrap::ClampToEdge,
                generate_mipmaps: false,
                // Storage is allocated explicitly below with the
                // slot-appropriate format.
                size: None,
            },
        )?;
        texture.set_image(TexImage {
            width: self.width,
            height: self.height,
            level: 0,
            format,
            pixel_type,
            pixels: None,
        })?;
        Ok(texture)
    }

    /// Verify the attachment combination is renderable.
    ///
    /// Leaves the framebuffer bound, since the usual next step is drawing
    /// into it.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Incomplete`] with the symbolic reason reported by
    /// the underlying API.
    pub fn check_complete(&self) -> Result<()> {
        self.ctx.bind_framebuffer(Some(self.raw));
        let reason = match self.ctx.gl.framebuffer_status() {
            FramebufferStatus::Complete => return Ok(()),
            FramebufferStatus::IncompleteAttachment => IncompleteReason::IncompleteAttachment,
            FramebufferStatus::MissingAttachment => IncompleteReason::MissingAttachment,
            FramebufferStatus::DimensionMismatch => IncompleteReason::DimensionMismatch,
            FramebufferStatus::Unsupported => IncompleteReason::Unsupported,
        };
        Err(ResourceError::Incomplete(reason).into())
    }
}
