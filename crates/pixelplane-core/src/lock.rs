//! Scoped CPU access to buffer memory.
//!
//! A [`LockScope`] locks a buffer on construction and unlocks it when dropped
//! or explicitly released. Plane views borrow the scope, so they cannot be
//! used after the lock is gone.
//!
//! The raw lock primitives are `unsafe`, so safe code can only end a scope's
//! lock through the scope itself:
//!
//! ```compile_fail
//! use pixelplane_core::{BufferAllocator, HeapAllocator, LockMode, PixelBuffer, PixelFormat, WriteLock};
//!
//! let buffer = HeapAllocator::default()
//!     .create(8, 8, PixelFormat::Bgra32.code(), None)
//!     .unwrap();
//! let mut lock = WriteLock::write(&buffer).unwrap();
//! let plane = lock.plane_mut(0).unwrap();
//! buffer.unlock_base_address(LockMode::ReadWrite).unwrap();
//! drop(plane);
//! ```
//!
//! Nor can a view be kept past `release`:
//!
//! ```compile_fail
//! use pixelplane_core::{BufferAllocator, HeapAllocator, PixelFormat, ReadLock};
//!
//! let buffer = HeapAllocator::default()
//!     .create(8, 8, PixelFormat::Bgra32.code(), None)
//!     .unwrap();
//! let lock = ReadLock::read(&buffer).unwrap();
//! let plane = lock.plane(0).unwrap();
//! lock.release().unwrap();
//! let _ = plane.as_bytes();
//! ```

use crate::buffer::PixelBuffer;
use crate::error::{BufferError, Result};
use crate::plane::{Plane, PlaneDescriptor, PlaneMut};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;
use tracing::{debug, warn};

/// Requested access when locking a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockMode {
    ReadOnly,
    ReadWrite,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnly => f.write_str("read-only"),
            Self::ReadWrite => f.write_str("read-write"),
        }
    }
}

/// Current lock state of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LockState {
    #[default]
    Unlocked,
    LockedReadOnly,
    LockedReadWrite,
}

impl LockState {
    pub fn is_locked(self) -> bool {
        self != Self::Unlocked
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::ReadOnly {}
    impl Sealed for super::ReadWrite {}
}

/// Type-level access mode of a [`LockScope`].
pub trait Access: sealed::Sealed {
    const MODE: LockMode;
}

/// Marker for read-only scopes.
#[derive(Debug)]
pub enum ReadOnly {}

/// Marker for read-write scopes.
#[derive(Debug)]
pub enum ReadWrite {}

impl Access for ReadOnly {
    const MODE: LockMode = LockMode::ReadOnly;
}

impl Access for ReadWrite {
    const MODE: LockMode = LockMode::ReadWrite;
}

/// Held lock on a buffer.
pub struct LockScope<'b, B: PixelBuffer + ?Sized, M: Access> {
    buffer: &'b B,
    released: bool,
    _mode: PhantomData<M>,
}

/// Read-only lock scope.
pub type ReadLock<'b, B> = LockScope<'b, B, ReadOnly>;

/// Read-write lock scope.
pub type WriteLock<'b, B> = LockScope<'b, B, ReadWrite>;

impl<'b, B: PixelBuffer + ?Sized, M: Access> LockScope<'b, B, M> {
    /// Lock `buffer` in this scope's mode.
    pub fn acquire(buffer: &'b B) -> Result<Self> {
        // SAFETY: the lock is owned by the returned scope and released exactly
        // once, by `release` or on drop.
        unsafe { buffer.lock_base_address(M::MODE)? };
        debug!(mode = %M::MODE, width = buffer.width(), height = buffer.height(), "Buffer locked");
        Ok(Self {
            buffer,
            released: false,
            _mode: PhantomData,
        })
    }

    pub fn mode(&self) -> LockMode {
        M::MODE
    }

    pub fn buffer(&self) -> &'b B {
        self.buffer
    }

    /// Number of addressable planes: at least 1, since plane 0 of a chunky
    /// buffer is the whole buffer.
    pub fn plane_count(&self) -> usize {
        self.buffer.plane_count().max(1)
    }

    pub fn descriptor(&self, index: usize) -> Result<PlaneDescriptor> {
        PlaneDescriptor::of(self.buffer, index)
    }

    /// Read view of plane `index`.
    pub fn plane(&self, index: usize) -> Result<Plane<'_>> {
        let descriptor = self.descriptor(index)?;
        let ptr = plane_address(self.buffer, index)?;
        // SAFETY: the buffer is locked for the lifetime of `self`, and the
        // PixelBuffer contract makes the plane readable for `byte_len` bytes.
        let data = unsafe { raw_slice(ptr, descriptor.byte_len()) };
        Ok(Plane::new(descriptor, data))
    }

    /// Whole pixel data, `data_size()` bytes from the base address.
    pub fn data(&self) -> Option<&[u8]> {
        let ptr = self.buffer.base_address()?;
        // SAFETY: locked for the lifetime of `self`; the contract covers
        // `data_size()` bytes from the base address.
        Some(unsafe { raw_slice(ptr, self.buffer.data_size()) })
    }

    /// Bytes of plane `index`, including row padding.
    pub fn plane_data(&self, index: usize) -> Option<&[u8]> {
        self.plane(index).ok().map(Plane::into_bytes)
    }

    /// Release the lock and report the unlock result.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        // SAFETY: this scope owns the lock, and `self` is consumed so no plane
        // view borrowed from it is still alive.
        let result = unsafe { self.buffer.unlock_base_address(M::MODE) };
        debug!(mode = %M::MODE, ok = result.is_ok(), "Buffer unlocked");
        result
    }
}

impl<'b, B: PixelBuffer + ?Sized> LockScope<'b, B, ReadOnly> {
    pub fn read(buffer: &'b B) -> Result<Self> {
        Self::acquire(buffer)
    }
}

impl<'b, B: PixelBuffer + ?Sized> LockScope<'b, B, ReadWrite> {
    pub fn write(buffer: &'b B) -> Result<Self> {
        Self::acquire(buffer)
    }

    /// Write view of plane `index`.
    pub fn plane_mut(&mut self, index: usize) -> Result<PlaneMut<'_>> {
        let descriptor = self.descriptor(index)?;
        let ptr = plane_address(self.buffer, index)?;
        // SAFETY: the buffer is exclusively locked read-write for the lifetime
        // of `self`, and `&mut self` prevents a second view through this scope.
        let data = unsafe { raw_slice_mut(ptr, descriptor.byte_len()) };
        Ok(PlaneMut::new(descriptor, data))
    }

    /// Write views of every plane at once.
    pub fn planes_mut(&mut self) -> Result<SmallVec<[PlaneMut<'_>; 3]>> {
        let mut planes = SmallVec::new();
        for index in 0..self.plane_count() {
            let descriptor = self.descriptor(index)?;
            let ptr = plane_address(self.buffer, index)?;
            // SAFETY: as in `plane_mut`; planes never overlap, so the views
            // are disjoint.
            let data = unsafe { raw_slice_mut(ptr, descriptor.byte_len()) };
            planes.push(PlaneMut::new(descriptor, data));
        }
        Ok(planes)
    }

    pub fn data_mut(&mut self) -> Option<&mut [u8]> {
        let ptr = self.buffer.base_address()?;
        // SAFETY: exclusive read-write lock held for the lifetime of `self`.
        Some(unsafe { raw_slice_mut(ptr, self.buffer.data_size()) })
    }
}

impl<B: PixelBuffer + ?Sized, M: Access> Drop for LockScope<'_, B, M> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        // SAFETY: the scope still owns the lock, and views borrowing it have
        // ended before drop runs.
        if let Err(e) = unsafe { self.buffer.unlock_base_address(M::MODE) } {
            warn!(mode = %M::MODE, error = %e, "Failed to unlock buffer on scope exit");
        }
    }
}

impl<B: PixelBuffer + ?Sized, M: Access> fmt::Debug for LockScope<'_, B, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockScope")
            .field("mode", &M::MODE)
            .field("width", &self.buffer.width())
            .field("height", &self.buffer.height())
            .finish()
    }
}

fn plane_address<B: PixelBuffer + ?Sized>(buffer: &B, index: usize) -> Result<NonNull<u8>> {
    let ptr = if buffer.plane_count() == 0 {
        buffer.base_address()
    } else {
        buffer.plane_base_address(index)
    };
    ptr.ok_or_else(|| BufferError::LockFailed(format!("plane {index} has no base address while locked")))
}

/// # Safety
///
/// `ptr` must be valid for reads of `len` bytes for `'a`.
unsafe fn raw_slice<'a>(ptr: NonNull<u8>, len: usize) -> &'a [u8] {
    std::slice::from_raw_parts(ptr.as_ptr(), len)
}

/// # Safety
///
/// `ptr` must be valid for writes of `len` bytes for `'a` and not aliased.
unsafe fn raw_slice_mut<'a>(ptr: NonNull<u8>, len: usize) -> &'a mut [u8] {
    std::slice::from_raw_parts_mut(ptr.as_ptr(), len)
}
