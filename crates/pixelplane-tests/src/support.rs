//! Shared fixtures for the integration tests.

use parking_lot::Mutex;
use pixelplane_core::{
    AttachmentMode, AttachmentValue, AttributeMap, BufferAllocator, HeapAllocator, HeapBuffer, LockMode,
    LockState, PixelBuffer, Primitive, ReadLock, Result, ReturnCode, WriteLock,
};
use std::ptr::NonNull;
use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Install a test-writer subscriber once. Filter with `RUST_LOG`.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
            .with_test_writer()
            .try_init();
    });
}

// ── Fault injection ──

/// Lock primitives forced to fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Faults {
    /// Refuse locks in this mode.
    pub lock: Option<LockMode>,
    /// Report failure for unlocks in this mode. The lock is still released.
    pub unlock: Option<LockMode>,
}

#[derive(Debug, Default)]
struct CallLog {
    locks: usize,
    unlocks: usize,
}

/// Heap buffer whose lock primitives can be made to fail.
#[derive(Debug)]
pub struct FaultyBuffer {
    inner: HeapBuffer,
    faults: Mutex<Faults>,
    calls: Mutex<CallLog>,
    format_code: Option<u32>,
}

impl FaultyBuffer {
    pub fn wrap(inner: HeapBuffer, faults: Faults) -> Self {
        Self {
            inner,
            faults: Mutex::new(faults),
            calls: Mutex::new(CallLog::default()),
            format_code: None,
        }
    }

    /// Report `code` as the format code instead of the wrapped buffer's.
    pub fn with_format_code(mut self, code: u32) -> Self {
        self.format_code = Some(code);
        self
    }

    pub fn set_faults(&self, faults: Faults) {
        *self.faults.lock() = faults;
    }

    /// Locks granted so far.
    pub fn locks(&self) -> usize {
        self.calls.lock().locks
    }

    /// Locks released so far.
    pub fn unlocks(&self) -> usize {
        self.calls.lock().unlocks
    }
}

// SAFETY: memory and lock bookkeeping are delegated to the wrapped
// `HeapBuffer`. An injected lock fault refuses the lock before the inner
// buffer is touched, and an injected unlock fault still releases it.
unsafe impl PixelBuffer for FaultyBuffer {
    fn width(&self) -> usize {
        self.inner.width()
    }

    fn height(&self) -> usize {
        self.inner.height()
    }

    fn format_code(&self) -> u32 {
        self.format_code.unwrap_or_else(|| self.inner.format_code())
    }

    fn bytes_per_row(&self) -> usize {
        self.inner.bytes_per_row()
    }

    fn data_size(&self) -> usize {
        self.inner.data_size()
    }

    fn plane_count(&self) -> usize {
        self.inner.plane_count()
    }

    fn plane_width(&self, plane: usize) -> usize {
        self.inner.plane_width(plane)
    }

    fn plane_height(&self, plane: usize) -> usize {
        self.inner.plane_height(plane)
    }

    fn plane_bytes_per_row(&self, plane: usize) -> usize {
        self.inner.plane_bytes_per_row(plane)
    }

    unsafe fn lock_base_address(&self, mode: LockMode) -> Result<()> {
        if self.faults.lock().lock == Some(mode) {
            return Err(ReturnCode::ERROR.into_error(Primitive::Lock, "injected lock fault"));
        }
        // SAFETY: forwarded under the caller's own contract.
        unsafe { self.inner.lock_base_address(mode)? };
        self.calls.lock().locks += 1;
        Ok(())
    }

    unsafe fn unlock_base_address(&self, mode: LockMode) -> Result<()> {
        // SAFETY: forwarded under the caller's own contract.
        unsafe { self.inner.unlock_base_address(mode)? };
        self.calls.lock().unlocks += 1;
        if self.faults.lock().unlock == Some(mode) {
            return Err(ReturnCode::ERROR.into_error(Primitive::Unlock, "injected unlock fault"));
        }
        Ok(())
    }

    fn lock_state(&self) -> LockState {
        self.inner.lock_state()
    }

    fn seed(&self) -> u32 {
        self.inner.seed()
    }

    fn base_address(&self) -> Option<NonNull<u8>> {
        self.inner.base_address()
    }

    fn plane_base_address(&self, plane: usize) -> Option<NonNull<u8>> {
        self.inner.plane_base_address(plane)
    }

    fn attachments(&self, mode: AttachmentMode) -> AttributeMap {
        self.inner.attachments(mode)
    }

    fn attachment(&self, key: &str) -> Option<(AttachmentValue, AttachmentMode)> {
        self.inner.attachment(key)
    }

    fn set_attachment(&self, key: &str, value: AttachmentValue, mode: AttachmentMode) {
        self.inner.set_attachment(key, value, mode)
    }

    fn remove_attachment(&self, key: &str) {
        self.inner.remove_attachment(key)
    }

    fn creation_attributes(&self) -> AttributeMap {
        self.inner.creation_attributes()
    }
}

/// Heap allocator handing out [`FaultyBuffer`]s preset with `faults`.
#[derive(Debug, Clone, Default)]
pub struct FaultyAllocator {
    pub inner: HeapAllocator,
    pub faults: Faults,
}

impl FaultyAllocator {
    pub fn new(faults: Faults) -> Self {
        Self {
            inner: HeapAllocator::default(),
            faults,
        }
    }
}

impl BufferAllocator for FaultyAllocator {
    type Buffer = FaultyBuffer;

    fn create(
        &self,
        width: usize,
        height: usize,
        format_code: u32,
        attributes: Option<&AttributeMap>,
    ) -> Result<FaultyBuffer> {
        let inner = self.inner.create(width, height, format_code, attributes)?;
        Ok(FaultyBuffer::wrap(inner, self.faults))
    }
}

// ── Content helpers ──

/// Fill every plane, padding included, with a pattern derived from `seed`.
pub fn fill_pattern<B: PixelBuffer + ?Sized>(buffer: &B, seed: u8) -> Result<()> {
    let mut lock = WriteLock::write(buffer)?;
    for mut plane in lock.planes_mut()? {
        let index = plane.index();
        for (offset, byte) in plane.as_bytes_mut().iter_mut().enumerate() {
            *byte = (offset as u8).wrapping_mul(31).wrapping_add(seed).wrapping_add(index as u8);
        }
    }
    lock.release()
}

/// Pixel data of a plane, row by row, clamped to `row_bytes` per row.
pub fn plane_rows<B: PixelBuffer + ?Sized>(buffer: &B, plane: usize, row_bytes: usize) -> Result<Vec<Vec<u8>>> {
    let lock = ReadLock::read(buffer)?;
    let view = lock.plane(plane)?;
    let width = row_bytes.min(view.bytes_per_row());
    let rows = view.rows().map(|row| row[..width].to_vec()).collect();
    lock.release()?;
    Ok(rows)
}

/// Whether every plane of `copy` matches `source` within the overlap of
/// their strides.
pub fn planes_match<S, D>(source: &S, copy: &D) -> Result<bool>
where
    S: PixelBuffer + ?Sized,
    D: PixelBuffer + ?Sized,
{
    let src_lock = ReadLock::read(source)?;
    let dst_lock = ReadLock::read(copy)?;
    if src_lock.plane_count() != dst_lock.plane_count() {
        return Ok(false);
    }

    let mut matched = true;
    for index in 0..src_lock.plane_count() {
        let (src, dst) = (src_lock.plane(index)?, dst_lock.plane(index)?);
        if (src.width(), src.height()) != (dst.width(), dst.height()) {
            matched = false;
            break;
        }
        let overlap = src.bytes_per_row().min(dst.bytes_per_row());
        if !src.rows().zip(dst.rows()).all(|(a, b)| a[..overlap] == b[..overlap]) {
            matched = false;
            break;
        }
    }

    src_lock.release()?;
    dst_lock.release()?;
    Ok(matched)
}

/// Read a BGRA row as packed 32-bit pixels.
pub fn bgra_row<B: PixelBuffer + ?Sized>(buffer: &B, y: usize) -> Result<Vec<u32>> {
    let lock = ReadLock::read(buffer)?;
    let plane = lock.plane(0)?;
    let row = &plane.row(y)[..plane.width() * 4];
    let pixels = row
        .chunks_exact(4)
        .map(|px| u32::from_ne_bytes([px[0], px[1], px[2], px[3]]))
        .collect();
    lock.release()?;
    Ok(pixels)
}

/// Write a BGRA row from packed 32-bit pixels.
pub fn write_bgra_row<B: PixelBuffer + ?Sized>(buffer: &B, y: usize, pixels: &[u32]) -> Result<()> {
    let mut lock = WriteLock::write(buffer)?;
    {
        let mut plane = lock.plane_mut(0)?;
        let bytes: &[u8] = bytemuck::cast_slice(pixels);
        plane.row_mut(y)[..bytes.len()].copy_from_slice(bytes);
    }
    lock.release()
}
