//! GPU buffers and typed views over their bytes.
//!
//! A [`Buffer`] owns a GPU memory allocation; it carries no layout of its
//! own. Reading it as a stream of attribute elements is the job of
//! [`BufferView`], a weak reference plus a layout descriptor. Several views
//! may alias the same bytes with different layouts.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use bytemuck::Pod;

use crate::api::GpuApi;
use crate::error::{Error, ResourceError, Result};
use crate::state::ContextShared;
use crate::types::{BufferTarget, BufferUsage, ElementType};

/// What a [`Buffer::set`] call should allocate or upload.
///
/// Exactly one of `data` and `size` must be supplied: data replaces the full
/// contents, size allocates undefined storage. Supplying both or neither is
/// a configuration error.
#[derive(Debug, Clone, Copy, Default)]
pub struct BufferInit<'a> {
    /// Full replacement contents.
    pub data: Option<&'a [u8]>,
    /// Size in bytes of undefined storage to allocate.
    pub size: Option<usize>,
    /// Usage hint for the new allocation.
    pub usage: BufferUsage,
}

pub(crate) struct BufferShared<G: GpuApi> {
    pub(crate) ctx: Rc<ContextShared<G>>,
    pub(crate) raw: G::Buffer,
    pub(crate) target: BufferTarget,
    pub(crate) byte_len: Cell<usize>,
    usage: Cell<BufferUsage>,
}

/// A GPU memory allocation.
///
/// Created through [`RenderingContext::create_buffer`]
/// (crate::RenderingContext::create_buffer). Contents are mutated only by
/// the explicit [`set`](Self::set) and [`subset`](Self::subset) operations;
/// binding for upload goes through the context's state cache, so redundant
/// binds are never issued.
pub struct Buffer<G: GpuApi> {
    shared: Rc<BufferShared<G>>,
    views: RefCell<HashMap<String, BufferView<G>>>,
}

impl<G: GpuApi> Buffer<G> {
    pub(crate) fn new(ctx: Rc<ContextShared<G>>, target: BufferTarget) -> Result<Self> {
        let raw = ctx
            .gl
            .create_buffer()
            .map_err(ResourceError::CreateFailed)?;
        Ok(Self {
            shared: Rc::new(BufferShared {
                ctx,
                raw,
                target,
                byte_len: Cell::new(0),
                usage: Cell::new(BufferUsage::default()),
            }),
            views: RefCell::new(HashMap::new()),
        })
    }

    /// The binding target this buffer was created for.
    #[must_use]
    pub fn target(&self) -> BufferTarget {
        self.shared.target
    }

    /// Current length of the allocation in bytes.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.shared.byte_len.get()
    }

    /// The usage hint of the current allocation.
    #[must_use]
    pub fn usage(&self) -> BufferUsage {
        self.shared.usage.get()
    }

    /// Replace the buffer's full contents (or allocation size) and usage
    /// hint.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] unless exactly one of `init.data` and
    /// `init.size` is supplied.
    pub fn set(&self, init: BufferInit<'_>) -> Result<()> {
        let shared = &self.shared;
        // Validate before binding, so a rejected call leaves the cached
        // binding state untouched.
        match (init.data, init.size) {
            (Some(data), None) => {
                shared.ctx.bind_buffer(shared.target, shared.raw);
                shared.ctx.gl.buffer_data(shared.target, data, init.usage);
                shared.byte_len.set(data.len());
            }
            (None, Some(size)) => {
                shared.ctx.bind_buffer(shared.target, shared.raw);
                shared.ctx.gl.buffer_data_size(shared.target, size, init.usage);
                shared.byte_len.set(size);
            }
            (Some(_), Some(_)) => {
                return Err(Error::config("buffer set takes data or size, not both"));
            }
            (None, None) => {
                return Err(Error::config("buffer set requires either data or size"));
            }
        }
        shared.usage.set(init.usage);
        Ok(())
    }

    /// [`set`](Self::set) from a typed slice, reinterpreted as bytes.
    ///
    /// # Errors
    ///
    /// Propagates [`set`](Self::set) failures (none are reachable from this
    /// entry point).
    pub fn set_slice<T: Pod>(&self, data: &[T], usage: BufferUsage) -> Result<()> {
        self.set(BufferInit {
            data: Some(bytemuck::cast_slice(data)),
            size: None,
            usage,
        })
    }

    /// Overwrite a sub-range of the buffer without touching the usage hint.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] if the range extends past the current
    /// allocation.
    pub fn subset(&self, offset: usize, data: &[u8]) -> Result<()> {
        let shared = &self.shared;
        let end = offset
            .checked_add(data.len())
            .ok_or_else(|| Error::config("buffer subset range overflows"))?;
        if end > shared.byte_len.get() {
            return Err(Error::config(format!(
                "buffer subset range {offset}..{end} exceeds allocation of {} bytes",
                shared.byte_len.get()
            )));
        }
        shared.ctx.bind_buffer(shared.target, shared.raw);
        shared.ctx.gl.buffer_sub_data(shared.target, offset, data);
        Ok(())
    }

    /// [`subset`](Self::subset) from a typed slice.
    ///
    /// # Errors
    ///
    /// Same as [`subset`](Self::subset).
    pub fn subset_slice<T: Pod>(&self, offset: usize, data: &[T]) -> Result<()> {
        self.subset(offset, bytemuck::cast_slice(data))
    }

    /// Create a named view over this buffer's bytes.
    ///
    /// The view is recorded on the buffer under `name` and also returned;
    /// views may be added or removed at any time without affecting other
    /// views.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] if the layout violates the stride/offset
    /// invariants (see [`ViewDesc`]).
    pub fn create_view(&self, name: &str, desc: ViewDesc) -> Result<BufferView<G>> {
        let view = BufferView::new(Rc::downgrade(&self.shared), desc)?;
        self.views
            .borrow_mut()
            .insert(name.to_owned(), view.clone());
        Ok(view)
    }

    /// Look up a previously created view by name.
    #[must_use]
    pub fn view(&self, name: &str) -> Option<BufferView<G>> {
        self.views.borrow().get(name).cloned()
    }

    /// Remove a named view, returning it if it existed.
    pub fn remove_view(&self, name: &str) -> Option<BufferView<G>> {
        self.views.borrow_mut().remove(name)
    }
}

/// Layout descriptor for a [`BufferView`].
///
/// Invariants, checked at view creation:
///
/// - `item_size` is 1–4;
/// - if `stride` is nonzero, `stride >= element.byte_size() * item_size`
///   and `stride` is a multiple of `element.byte_size()`;
/// - `offset` is a multiple of `element.byte_size()`.
///
/// `stride` of 0 means tightly packed and always passes validation.
#[derive(Debug, Clone, Copy)]
pub struct ViewDesc {
    /// Elements per item (1–4).
    pub item_size: u8,
    /// Scalar type of each element.
    pub element: ElementType,
    /// Whether integer elements are normalized to [0, 1] / [-1, 1].
    pub normalized: bool,
    /// Distance between consecutive items in bytes; 0 = tightly packed.
    pub stride: usize,
    /// Byte offset of the first item.
    pub offset: usize,
}

impl ViewDesc {
    /// A tightly packed float view with `item_size` elements per item.
    #[must_use]
    pub fn new(item_size: u8) -> Self {
        Self {
            item_size,
            element: ElementType::F32,
            normalized: false,
            stride: 0,
            offset: 0,
        }
    }
}

/// A read interpretation of a [`Buffer`]'s bytes as a stream of fixed-size
/// items.
///
/// A view does not own its buffer — it holds a weak reference plus the
/// layout. Item and value counts are computed on demand from the buffer's
/// current byte length.
pub struct BufferView<G: GpuApi> {
    buffer: Weak<BufferShared<G>>,
    item_size: u8,
    element: ElementType,
    normalized: bool,
    stride: usize,
    offset: usize,
}

// Manual impl: `G` itself need not be `Clone`.
impl<G: GpuApi> Clone for BufferView<G> {
    fn clone(&self) -> Self {
        Self {
            buffer: Weak::clone(&self.buffer),
            item_size: self.item_size,
            element: self.element,
            normalized: self.normalized,
            stride: self.stride,
            offset: self.offset,
        }
    }
}

impl<G: GpuApi> BufferView<G> {
    fn new(buffer: Weak<BufferShared<G>>, desc: ViewDesc) -> Result<Self> {
        if !(1..=4).contains(&desc.item_size) {
            return Err(Error::config(format!(
                "view item size must be 1..=4, got {}",
                desc.item_size
            )));
        }
        let element_size = desc.element.byte_size();
        if desc.stride != 0 {
            let packed = element_size * desc.item_size as usize;
            if desc.stride < packed {
                return Err(Error::config(format!(
                    "view stride {} is smaller than the packed item size {packed}",
                    desc.stride
                )));
            }
            if desc.stride % element_size != 0 {
                return Err(Error::config(format!(
                    "view stride {} is not a multiple of the element size {element_size}",
                    desc.stride
                )));
            }
        }
        if desc.offset % element_size != 0 {
            return Err(Error::config(format!(
                "view offset {} is not a multiple of the element size {element_size}",
                desc.offset
            )));
        }
        // The underlying API takes these as i32.
        if i32::try_from(desc.stride).is_err() || i32::try_from(desc.offset).is_err() {
            return Err(Error::config("view stride and offset must fit in an i32"));
        }
        Ok(Self {
            buffer,
            item_size: desc.item_size,
            element: desc.element,
            normalized: desc.normalized,
            stride: desc.stride,
            offset: desc.offset,
        })
    }

    /// Elements per item (1–4).
    #[must_use]
    pub fn item_size(&self) -> u8 {
        self.item_size
    }

    /// Scalar type of each element.
    #[must_use]
    pub fn element(&self) -> ElementType {
        self.element
    }

    /// Whether integer elements are normalized when read.
    #[must_use]
    pub fn normalized(&self) -> bool {
        self.normalized
    }

    /// Distance between consecutive items in bytes; 0 = tightly packed.
    #[must_use]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Byte offset of the first item.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of whole items the buffer currently holds under this layout.
    ///
    /// # Errors
    ///
    /// [`ResourceError::BufferDropped`] if the buffer no longer exists.
    pub fn item_count(&self) -> Result<usize> {
        let shared = self.upgrade()?;
        let byte_len = shared.byte_len.get();
        let count = if self.stride > 0 {
            byte_len / self.stride
        } else {
            byte_len / (self.element.byte_size() * self.item_size as usize)
        };
        Ok(count)
    }

    /// Number of scalar values across all items
    /// (`item_count * item_size`).
    ///
    /// # Errors
    ///
    /// [`ResourceError::BufferDropped`] if the buffer no longer exists.
    pub fn value_count(&self) -> Result<usize> {
        Ok(self.item_count()? * self.item_size as usize)
    }

    pub(crate) fn upgrade(&self) -> Result<Rc<BufferShared<G>>> {
        self.buffer
            .upgrade()
            .ok_or_else(|| ResourceError::BufferDropped.into())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fake::{Call, FakeGl};
    use crate::RenderingContext;

    fn ctx() -> (FakeGl, RenderingContext<FakeGl>) {
        let gl = FakeGl::new(8);
        let ctx = RenderingContext::new(gl.clone(), (640, 480));
        (gl, ctx)
    }

    #[test]
    fn set_requires_exactly_one_of_data_and_size() {
        let (_gl, ctx) = ctx();
        let buffer = ctx.create_buffer(BufferTarget::Vertex).unwrap();

        let both = buffer.set(BufferInit {
            data: Some(&[0, 1, 2]),
            size: Some(3),
            usage: BufferUsage::Static,
        });
        assert!(matches!(both, Err(Error::Configuration(_))));

        let neither = buffer.set(BufferInit::default());
        assert!(matches!(neither, Err(Error::Configuration(_))));
    }

    #[test]
    fn rejected_set_leaves_binding_state_untouched() {
        let (gl, ctx) = ctx();
        let buffer = ctx.create_buffer(BufferTarget::Vertex).unwrap();
        let _ = buffer.set(BufferInit {
            data: Some(&[0, 1, 2]),
            size: Some(3),
            usage: BufferUsage::Static,
        });
        let _ = buffer.set(BufferInit::default());
        assert!(gl.calls().is_empty());
        // The binding was not silently cached either: a later valid upload
        // still issues the bind.
        buffer.set_slice(&[0u8; 4], BufferUsage::Static).unwrap();
        assert_eq!(gl.count(|c| matches!(c, Call::BindBuffer(..))), 1);
    }

    #[test]
    fn set_uploads_and_records_length_and_usage() {
        let (gl, ctx) = ctx();
        let buffer = ctx.create_buffer(BufferTarget::Vertex).unwrap();
        buffer
            .set(BufferInit {
                data: Some(&[0u8; 12]),
                size: None,
                usage: BufferUsage::Dynamic,
            })
            .unwrap();
        assert_eq!(buffer.byte_len(), 12);
        assert_eq!(buffer.usage(), BufferUsage::Dynamic);
        assert_eq!(
            gl.count(|c| matches!(
                c,
                Call::BufferData {
                    target: BufferTarget::Vertex,
                    len: 12,
                    usage: BufferUsage::Dynamic,
                }
            )),
            1
        );
    }

    #[test]
    fn set_by_size_allocates_undefined_storage() {
        let (gl, ctx) = ctx();
        let buffer = ctx.create_buffer(BufferTarget::Index).unwrap();
        buffer
            .set(BufferInit {
                data: None,
                size: Some(256),
                usage: BufferUsage::Stream,
            })
            .unwrap();
        assert_eq!(buffer.byte_len(), 256);
        assert_eq!(gl.count(|c| matches!(c, Call::BufferDataSize { size: 256, .. })), 1);
    }

    #[test]
    fn repeated_uploads_bind_once() {
        let (gl, ctx) = ctx();
        let buffer = ctx.create_buffer(BufferTarget::Vertex).unwrap();
        buffer.set_slice(&[0.0f32; 4], BufferUsage::Static).unwrap();
        buffer.subset(0, &[1, 2, 3, 4]).unwrap();
        buffer.subset(4, &[5, 6]).unwrap();
        assert_eq!(gl.count(|c| matches!(c, Call::BindBuffer(..))), 1);
    }

    #[test]
    fn subset_leaves_usage_untouched_and_checks_bounds() {
        let (_gl, ctx) = ctx();
        let buffer = ctx.create_buffer(BufferTarget::Vertex).unwrap();
        buffer.set_slice(&[0u8; 8], BufferUsage::Dynamic).unwrap();
        buffer.subset(4, &[1, 2, 3, 4]).unwrap();
        assert_eq!(buffer.usage(), BufferUsage::Dynamic);

        let out_of_range = buffer.subset(6, &[1, 2, 3, 4]);
        assert!(matches!(out_of_range, Err(Error::Configuration(_))));
    }

    #[test]
    fn stride_not_multiple_of_element_size_is_rejected() {
        let (_gl, ctx) = ctx();
        let buffer = ctx.create_buffer(BufferTarget::Vertex).unwrap();
        let result = buffer.create_view(
            "bad",
            ViewDesc {
                stride: 13,
                ..ViewDesc::new(1)
            },
        );
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn zero_stride_always_passes_validation() {
        let (_gl, ctx) = ctx();
        let buffer = ctx.create_buffer(BufferTarget::Vertex).unwrap();
        for item_size in 1..=4 {
            buffer
                .create_view(&format!("v{item_size}"), ViewDesc::new(item_size))
                .unwrap();
        }
    }

    #[test]
    fn stride_smaller_than_packed_item_is_rejected() {
        let (_gl, ctx) = ctx();
        let buffer = ctx.create_buffer(BufferTarget::Vertex).unwrap();
        // Packed item is 12 bytes (vec3 of f32); 8 is a multiple of 4 but
        // too small.
        let result = buffer.create_view(
            "bad",
            ViewDesc {
                stride: 8,
                ..ViewDesc::new(3)
            },
        );
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn misaligned_offset_is_rejected() {
        let (_gl, ctx) = ctx();
        let buffer = ctx.create_buffer(BufferTarget::Vertex).unwrap();
        let result = buffer.create_view(
            "bad",
            ViewDesc {
                offset: 2,
                ..ViewDesc::new(2)
            },
        );
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn counts_for_packed_float_vec3() {
        let (_gl, ctx) = ctx();
        let buffer = ctx.create_buffer(BufferTarget::Vertex).unwrap();
        buffer.set_slice(&[0u8; 48], BufferUsage::Static).unwrap();
        let view = buffer.create_view("position", ViewDesc::new(3)).unwrap();
        assert_eq!(view.item_count().unwrap(), 4);
        assert_eq!(view.value_count().unwrap(), 12);
    }

    #[test]
    fn counts_follow_stride_when_nonzero() {
        let (_gl, ctx) = ctx();
        let buffer = ctx.create_buffer(BufferTarget::Vertex).unwrap();
        buffer.set_slice(&[0u8; 48], BufferUsage::Static).unwrap();
        // Interleaved layout: 16-byte stride around a vec2 of f32.
        let view = buffer
            .create_view(
                "uv",
                ViewDesc {
                    stride: 16,
                    offset: 8,
                    ..ViewDesc::new(2)
                },
            )
            .unwrap();
        assert_eq!(view.item_count().unwrap(), 3);
        assert_eq!(view.value_count().unwrap(), 6);
    }

    #[test]
    fn counts_track_buffer_resizes() {
        let (_gl, ctx) = ctx();
        let buffer = ctx.create_buffer(BufferTarget::Vertex).unwrap();
        let view = buffer.create_view("position", ViewDesc::new(3)).unwrap();
        assert_eq!(view.item_count().unwrap(), 0);
        buffer.set_slice(&[0u8; 24], BufferUsage::Static).unwrap();
        assert_eq!(view.item_count().unwrap(), 2);
    }

    #[test]
    fn views_alias_and_detach_independently() {
        let (_gl, ctx) = ctx();
        let buffer = ctx.create_buffer(BufferTarget::Vertex).unwrap();
        buffer.set_slice(&[0u8; 48], BufferUsage::Static).unwrap();
        let a = buffer.create_view("a", ViewDesc::new(3)).unwrap();
        buffer.create_view("b", ViewDesc::new(2)).unwrap();
        buffer.remove_view("b").unwrap();
        // Removing one view leaves the other usable.
        assert_eq!(a.item_count().unwrap(), 4);
        assert!(buffer.view("b").is_none());
        assert_eq!(buffer.view("a").unwrap().item_count().unwrap(), 4);
    }

    #[test]
    fn view_outliving_buffer_reports_dropped() {
        let (_gl, ctx) = ctx();
        let buffer = ctx.create_buffer(BufferTarget::Vertex).unwrap();
        let view = buffer.create_view("v", ViewDesc::new(1)).unwrap();
        drop(buffer);
        assert!(matches!(
            view.item_count(),
            Err(Error::Resource(ResourceError::BufferDropped))
        ));
    }
}
