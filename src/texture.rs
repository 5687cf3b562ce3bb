//! GPU image resources.
//!
//! A [`Texture`] mirrors its last-set filter and wrap parameters locally, so
//! re-requesting the current values is a true no-op: no bind, no parameter
//! write. Image data arrives either immediately ([`Texture::set_image`]) or
//! through [`ImageLoad`], an explicit polling state machine for sources that
//! load asynchronously; the upload happens exactly once, on the
//! pending-to-ready edge.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::mpsc;

use crate::api::GpuApi;
use crate::error::{ResourceError, Result};
use crate::state::ContextShared;
use crate::types::{
    MagFilter, MinFilter, PixelFormat, PixelType, TexParam, TextureTarget, Wrap,
};

/// Construction options for a [`Texture`].
///
/// Defaults match the underlying API's texture defaults: 2D target,
/// nearest-mipmap-linear minification, linear magnification, repeat wrap on
/// both axes, mipmap generation after each upload.
#[derive(Debug, Clone, Copy)]
pub struct TextureDesc {
    /// Image target kind.
    pub target: TextureTarget,
    /// Minification filter.
    pub min_filter: MinFilter,
    /// Magnification filter.
    pub mag_filter: MagFilter,
    /// Wrap mode along S.
    pub wrap_s: Wrap,
    /// Wrap mode along T.
    pub wrap_t: Wrap,
    /// Whether to regenerate the mipmap chain after each image upload.
    pub generate_mipmaps: bool,
    /// When present, allocate empty RGBA8 storage of this size at
    /// construction.
    pub size: Option<(u32, u32)>,
}

impl Default for TextureDesc {
    fn default() -> Self {
        Self {
            target: TextureTarget::Texture2D,
            min_filter: MinFilter::NearestMipmapLinear,
            mag_filter: MagFilter::Linear,
            wrap_s: Wrap::Repeat,
            wrap_t: Wrap::Repeat,
            generate_mipmaps: true,
            size: None,
        }
    }
}

/// One image upload: dimensions plus optional pixel bytes.
///
/// `pixels` of `None` allocates storage without defining its contents
/// (useful for render targets).
#[derive(Debug, Clone, Copy)]
pub struct TexImage<'a> {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Mip level to write.
    pub level: i32,
    /// Pixel layout.
    pub format: PixelFormat,
    /// Component storage type.
    pub pixel_type: PixelType,
    /// Raw pixel bytes, or `None` for undefined storage.
    pub pixels: Option<&'a [u8]>,
}

impl TexImage<'_> {
    /// An empty RGBA8 allocation of the given size.
    #[must_use]
    pub fn storage(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            level: 0,
            format: PixelFormat::Rgba,
            pixel_type: PixelType::UnsignedByte,
            pixels: None,
        }
    }
}

/// Mirrored texture parameters, `None` until first set.
#[derive(Default)]
struct TexParams {
    min_filter: Option<MinFilter>,
    mag_filter: Option<MagFilter>,
    wrap_s: Option<Wrap>,
    wrap_t: Option<Wrap>,
}

struct TextureInner<G: GpuApi> {
    ctx: Rc<ContextShared<G>>,
    raw: G::Texture,
    target: TextureTarget,
    params: RefCell<TexParams>,
    generate_mipmaps: Cell<bool>,
}

/// A GPU image resource.
///
/// Cheap to clone — clones share the same underlying GL texture, which is
/// what lets a [`Framebuffer`](crate::Framebuffer) record an attachment
/// without taking the caller's handle away.
pub struct Texture<G: GpuApi> {
    inner: Rc<TextureInner<G>>,
}

impl<G: GpuApi> Clone for Texture<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<G: GpuApi> Texture<G> {
    pub(crate) fn new(ctx: Rc<ContextShared<G>>, desc: TextureDesc) -> Result<Self> {
        let raw = ctx
            .gl
            .create_texture()
            .map_err(ResourceError::CreateFailed)?;
        let texture = Self {
            inner: Rc::new(TextureInner {
                ctx,
                raw,
                target: desc.target,
                params: RefCell::new(TexParams::default()),
                generate_mipmaps: Cell::new(desc.generate_mipmaps),
            }),
        };
        // Mirrors start unset, so this issues the initial parameter writes.
        texture.set_filter(desc.min_filter, desc.mag_filter)?;
        texture.set_wrap(desc.wrap_s, desc.wrap_t)?;
        if let Some((width, height)) = desc.size {
            texture.set_image(TexImage::storage(width, height))?;
        }
        Ok(texture)
    }

    /// The image target this texture was created for.
    #[must_use]
    pub fn target(&self) -> TextureTarget {
        self.inner.target
    }

    pub(crate) fn raw(&self) -> G::Texture {
        self.inner.raw
    }

    /// Bind this texture on unit 0 through the state cache.
    fn bind(&self) -> Result<()> {
        self.inner
            .ctx
            .bind_texture(0, self.inner.target.binding_kind(), self.inner.raw)
    }

    /// Set the minification and magnification filters.
    ///
    /// A no-op — not even a bind — when both already match the mirrored
    /// values; otherwise only the changed parameters are written.
    ///
    /// # Errors
    ///
    /// Propagates binding failures.
    pub fn set_filter(&self, min: MinFilter, mag: MagFilter) -> Result<()> {
        let (set_min, set_mag) = {
            let params = self.inner.params.borrow();
            (
                params.min_filter != Some(min),
                params.mag_filter != Some(mag),
            )
        };
        if !set_min && !set_mag {
            return Ok(());
        }
        self.bind()?;
        let kind = self.inner.target.binding_kind();
        let mut params = self.inner.params.borrow_mut();
        if set_min {
            self.inner.ctx.gl.tex_parameter(kind, TexParam::MinFilter(min));
            params.min_filter = Some(min);
        }
        if set_mag {
            self.inner.ctx.gl.tex_parameter(kind, TexParam::MagFilter(mag));
            params.mag_filter = Some(mag);
        }
        Ok(())
    }

    /// Set the S and T wrap modes; same caching discipline as
    /// [`set_filter`](Self::set_filter).
    ///
    /// # Errors
    ///
    /// Propagates binding failures.
    pub fn set_wrap(&self, s: Wrap, t: Wrap) -> Result<()> {
        let (set_s, set_t) = {
            let params = self.inner.params.borrow();
            (params.wrap_s != Some(s), params.wrap_t != Some(t))
        };
        if !set_s && !set_t {
            return Ok(());
        }
        self.bind()?;
        let kind = self.inner.target.binding_kind();
        let mut params = self.inner.params.borrow_mut();
        if set_s {
            self.inner.ctx.gl.tex_parameter(kind, TexParam::WrapS(s));
            params.wrap_s = Some(s);
        }
        if set_t {
            self.inner.ctx.gl.tex_parameter(kind, TexParam::WrapT(t));
            params.wrap_t = Some(t);
        }
        Ok(())
    }

    /// Upload (or allocate) the texture image, then regenerate mipmaps
    /// unless disabled at construction.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`](crate::Error::Configuration) if pixel data
    /// is supplied but its length does not match the dimensions and format.
    pub fn set_image(&self, image: TexImage<'_>) -> Result<()> {
        if let Some(pixels) = image.pixels {
            let expected = expected_byte_len(&image);
            if pixels.len() != expected {
                return Err(crate::Error::config(format!(
                    "pixel data is {} bytes, expected {expected} for {}x{} {:?}/{:?}",
                    pixels.len(),
                    image.width,
                    image.height,
                    image.format,
                    image.pixel_type
                )));
            }
        }
        self.bind()?;
        self.inner.ctx.gl.tex_image_2d(
            self.inner.target,
            image.level,
            image.format,
            image.width,
            image.height,
            image.pixel_type,
            image.pixels,
        );
        if self.inner.generate_mipmaps.get() {
            self.inner
                .ctx
                .gl
                .generate_mipmap(self.inner.target.binding_kind());
        }
        Ok(())
    }

    /// Drive a pending asynchronous image source.
    ///
    /// While the source is still loading this returns
    /// [`LoadState::Pending`] without side effects. The first poll after the
    /// source completes uploads the decoded image (and mipmaps, per the
    /// construction flag) and returns [`LoadState::Ready`] — the single-shot
    /// completion notification. Later polls return the settled state without
    /// re-uploading.
    ///
    /// # Errors
    ///
    /// Propagates upload failures. A failed *load* is not an `Err`: it
    /// settles the state machine at [`LoadState::Failed`] with the message
    /// available from [`ImageLoad::error`].
    pub fn poll_image(&self, load: &mut ImageLoad) -> Result<LoadState> {
        if load.state != LoadState::Pending {
            return Ok(load.state);
        }
        match load.rx.try_recv() {
            Err(mpsc::TryRecvError::Empty) => Ok(LoadState::Pending),
            Err(mpsc::TryRecvError::Disconnected) => {
                load.state = LoadState::Failed;
                load.error = Some("image source dropped without completing".into());
                Ok(LoadState::Failed)
            }
            Ok(Err(message)) => {
                load.state = LoadState::Failed;
                load.error = Some(message);
                Ok(LoadState::Failed)
            }
            Ok(Ok(data)) => {
                self.set_image(TexImage {
                    width: data.width,
                    height: data.height,
                    level: 0,
                    format: PixelFormat::Rgba,
                    pixel_type: PixelType::UnsignedByte,
                    pixels: Some(&data.pixels),
                })?;
                load.state = LoadState::Ready;
                Ok(LoadState::Ready)
            }
        }
    }
}

/// Bytes required for one image upload.
fn expected_byte_len(image: &TexImage<'_>) -> usize {
    let pixels = image.width as usize * image.height as usize;
    let per_pixel = match image.pixel_type {
        PixelType::UnsignedByte => match image.format {
            PixelFormat::Alpha | PixelFormat::Luminance => 1,
            PixelFormat::LuminanceAlpha => 2,
            PixelFormat::Rgb => 3,
            // Depth formats never pair with byte storage in practice, but
            // the arithmetic stays defined.
            PixelFormat::Rgba | PixelFormat::DepthComponent | PixelFormat::DepthStencil => 4,
        },
        PixelType::UnsignedShort565
        | PixelType::UnsignedShort4444
        | PixelType::UnsignedShort5551
        | PixelType::UnsignedShort => 2,
        PixelType::UnsignedInt24_8 => 4,
    };
    pixels * per_pixel
}

/// Where an asynchronous image load currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// The source has not completed yet.
    Pending,
    /// The image was uploaded to the texture.
    Ready,
    /// The source failed; see [`ImageLoad::error`].
    Failed,
}

/// Decoded RGBA8 image data ready for upload.
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Tightly packed RGBA8 bytes, `width * height * 4` of them.
    pub pixels: Vec<u8>,
}

impl ImageData {
    /// Decode an encoded image (PNG, JPEG) into RGBA8.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Decode`] if the bytes are not a decodable image.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| ResourceError::Decode(e.to_string()))?
            .to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self {
            width,
            height,
            pixels: img.into_raw(),
        })
    }
}

/// The polling half of a single-shot asynchronous image load.
///
/// Created by [`ImageLoad::start`]; the returned [`ImageLoadSender`] travels
/// to whatever performs the load (a worker thread, an I/O callback) and is
/// consumed by fulfilling it. The texture side drives the state machine with
/// [`Texture::poll_image`].
pub struct ImageLoad {
    rx: mpsc::Receiver<std::result::Result<ImageData, String>>,
    state: LoadState,
    error: Option<String>,
}

impl ImageLoad {
    /// Create a pending load and the sender that will complete it.
    #[must_use]
    pub fn start() -> (ImageLoadSender, Self) {
        let (tx, rx) = mpsc::channel();
        (
            ImageLoadSender { tx },
            Self {
                rx,
                state: LoadState::Pending,
                error: None,
            },
        )
    }

    /// The current state, without driving the machine.
    #[must_use]
    pub fn state(&self) -> LoadState {
        self.state
    }

    /// The failure message once the state is [`LoadState::Failed`].
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// The fulfilling half of a single-shot image load.
pub struct ImageLoadSender {
    tx: mpsc::Sender<std::result::Result<ImageData, String>>,
}

impl ImageLoadSender {
    /// Complete the load with decoded image data or a failure message.
    ///
    /// Consumes the sender — the completion signal fires at most once. The
    /// result is delivered on the next [`Texture::poll_image`] of the
    /// corresponding [`ImageLoad`].
    pub fn fulfill(self, result: std::result::Result<ImageData, String>) {
        // An already-abandoned load is not an error worth surfacing here.
        let _ = self.tx.send(result);
    }
}
