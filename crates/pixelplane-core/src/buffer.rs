//! Pixel buffer and allocator contracts.
//!
//! A [`PixelBuffer`] is an opaque handle to pixel memory owned by whoever
//! created it. Its memory is only reachable through a
//! [`LockScope`](crate::lock::LockScope), which hands out borrowed plane views.

use crate::attachment::{AttachmentMode, AttachmentValue, AttributeMap};
use crate::error::Result;
use crate::format::PixelFormat;
use crate::lock::{LockMode, LockState};
use std::ptr::NonNull;

/// Metadata, lock and memory surface exposed by an allocated buffer.
///
/// Per-plane getters follow the allocator convention: they report `0` (or
/// `None`) on a buffer whose plane count is 0. Use
/// [`PlaneDescriptor::of`](crate::plane::PlaneDescriptor::of) to treat plane 0
/// of such a buffer as the whole buffer.
///
/// # Safety
///
/// Implementors guarantee, for as long as a lock taken with
/// [`lock_base_address`](Self::lock_base_address) is held:
///
/// - `base_address()` is valid for reads of `data_size()` bytes;
/// - for every `i < plane_count()`, `plane_base_address(i)` is valid for reads
///   of `plane_height(i) * plane_bytes_per_row(i)` bytes, and planes do not
///   overlap one another;
/// - under [`LockMode::ReadWrite`] the same ranges are valid for writes, and no
///   other lock on the buffer can be acquired until it is released;
/// - the memory is not shared with any other buffer.
pub unsafe trait PixelBuffer: Send + Sync {
    /// Width in pixels.
    fn width(&self) -> usize;

    /// Height in pixels.
    fn height(&self) -> usize;

    /// Raw format code.
    fn format_code(&self) -> u32;

    /// Catalog format of the buffer.
    fn pixel_format(&self) -> PixelFormat {
        PixelFormat::from_code(self.format_code())
    }

    /// Bytes per row. For planar buffers, `bytes_per_row() * height()` covers
    /// every plane.
    fn bytes_per_row(&self) -> usize;

    /// Size of the contiguous pixel data.
    fn data_size(&self) -> usize;

    /// Number of planes; 0 for chunky buffers.
    fn plane_count(&self) -> usize;

    fn is_planar(&self) -> bool {
        self.plane_count() > 0
    }

    fn plane_width(&self, plane: usize) -> usize;

    fn plane_height(&self, plane: usize) -> usize;

    fn plane_bytes_per_row(&self, plane: usize) -> usize;

    /// Make the memory CPU-visible.
    ///
    /// Callers normally go through [`LockScope`](crate::lock::LockScope),
    /// which pairs every lock with exactly one unlock.
    ///
    /// # Safety
    ///
    /// A successful lock must be balanced by exactly one
    /// [`unlock_base_address`](Self::unlock_base_address) in the same mode by
    /// the same caller, and memory reached through it must not be used after
    /// that unlock.
    unsafe fn lock_base_address(&self, mode: LockMode) -> Result<()>;

    /// Release a lock taken with the same mode.
    ///
    /// # Safety
    ///
    /// The caller must own the lock being released. Releasing a lock held by a
    /// [`LockScope`](crate::lock::LockScope) is forbidden: plane views borrowed
    /// from that scope would outlive the lock and could alias a later
    /// read-write view of the same memory.
    unsafe fn unlock_base_address(&self, mode: LockMode) -> Result<()>;

    fn lock_state(&self) -> LockState;

    /// Generation counter bumped on every read-write unlock.
    fn seed(&self) -> u32;

    /// Start of the pixel data. Only meaningful while locked.
    fn base_address(&self) -> Option<NonNull<u8>>;

    /// Start of plane `plane`; `None` on chunky buffers. Only meaningful while locked.
    fn plane_base_address(&self, plane: usize) -> Option<NonNull<u8>>;

    /// Attachments with the given mode.
    fn attachments(&self, mode: AttachmentMode) -> AttributeMap;

    fn attachment(&self, key: &str) -> Option<(AttachmentValue, AttachmentMode)>;

    fn set_attachment(&self, key: &str, value: AttachmentValue, mode: AttachmentMode);

    fn remove_attachment(&self, key: &str);

    /// Copy of the attributes the buffer was created with, for creating
    /// similar buffers.
    fn creation_attributes(&self) -> AttributeMap;
}

/// Creates buffers on behalf of the copy engine and callers.
pub trait BufferAllocator: Send + Sync {
    type Buffer: PixelBuffer + 'static;

    /// Create a buffer of the given size and format.
    fn create(
        &self,
        width: usize,
        height: usize,
        format_code: u32,
        attributes: Option<&AttributeMap>,
    ) -> Result<Self::Buffer>;
}

impl<A: BufferAllocator + ?Sized> BufferAllocator for std::sync::Arc<A> {
    type Buffer = A::Buffer;

    fn create(
        &self,
        width: usize,
        height: usize,
        format_code: u32,
        attributes: Option<&AttributeMap>,
    ) -> Result<Self::Buffer> {
        (**self).create(width, height, format_code, attributes)
    }
}
