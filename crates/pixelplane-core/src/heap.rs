//! In-process pixel buffer allocator backed by heap memory.
//!
//! Planes are stored back to back in one allocation, each row padded to the
//! configured alignment. Lock bookkeeping follows the usual allocator rules:
//! read-only locks nest, a read-write lock is exclusive.

use crate::attachment::{keys, AttachmentMode, AttachmentValue, Attachments, AttributeMap};
use crate::buffer::{BufferAllocator, PixelBuffer};
use crate::error::{BufferError, Primitive, Result, ReturnCode};
use crate::format::{FormatDescription, PixelFormat};
use crate::lock::{LockMode, LockState};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::ptr::NonNull;
use tracing::{debug, warn};

/// Configuration for [`HeapAllocator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// Row alignment in bytes (power of two).
    pub row_alignment: usize,
    /// Refuse allocations larger than this many bytes.
    pub max_allocation_bytes: Option<usize>,
    /// Initial content of freshly allocated memory.
    pub fill_byte: u8,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            // Align rows to 64 bytes for SIMD and GPU compatibility
            row_alignment: 64,
            max_allocation_bytes: None,
            fill_byte: 0,
        }
    }
}

impl AllocatorConfig {
    /// Parse a JSON configuration. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| BufferError::InvalidArgument(format!("allocator config: {e}")))?;
        if !config.row_alignment.is_power_of_two() {
            return Err(BufferError::InvalidArgument(format!(
                "allocator config: row_alignment {} is not a power of two",
                config.row_alignment
            )));
        }
        Ok(config)
    }
}

/// Allocator producing [`HeapBuffer`]s.
#[derive(Debug, Clone, Default)]
pub struct HeapAllocator {
    config: AllocatorConfig,
}

impl HeapAllocator {
    /// Create an allocator. A `row_alignment` that is not a power of two is
    /// rounded up to the next one.
    pub fn new(mut config: AllocatorConfig) -> Self {
        let alignment = config
            .row_alignment
            .max(1)
            .checked_next_power_of_two()
            .unwrap_or(1 << (usize::BITS - 1));
        if alignment != config.row_alignment {
            debug!(
                requested = config.row_alignment,
                alignment, "Row alignment rounded up to a power of two"
            );
            config.row_alignment = alignment;
        }
        Self { config }
    }

    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// Wrap caller-provided memory as a chunky buffer.
    ///
    /// Ownership of `bytes` moves into the buffer and is freed with it. Bytes
    /// past `height * bytes_per_row` are discarded.
    pub fn create_with_bytes(
        &self,
        width: usize,
        height: usize,
        format_code: u32,
        mut bytes: Vec<u8>,
        bytes_per_row: usize,
        attributes: Option<&AttributeMap>,
    ) -> Result<HeapBuffer> {
        let context = format!("create {}x{} with bytes", width, height);
        let description = validate(width, height, format_code, &context)?;
        if description.is_planar {
            return Err(ReturnCode::UNSUPPORTED.into_error(Primitive::Create, &format!("{context}: planar format")));
        }

        let min_row = description.planes[0]
            .min_bytes_per_row(width)
            .ok_or_else(|| overflow(&context))?;
        if bytes_per_row < min_row {
            return Err(ReturnCode::INVALID_ARGUMENT.into_error(
                Primitive::Create,
                &format!("{context}: bytes_per_row {bytes_per_row} below minimum {min_row}"),
            ));
        }

        let data_size = height.checked_mul(bytes_per_row).ok_or_else(|| overflow(&context))?;
        if bytes.len() < data_size {
            return Err(ReturnCode::INVALID_SIZE.into_error(
                Primitive::Create,
                &format!("{context}: {} bytes supplied, {} required", bytes.len(), data_size),
            ));
        }
        bytes.truncate(data_size);

        let slots = smallvec::smallvec![PlaneSlot {
            offset: 0,
            width,
            height,
            bytes_per_row,
        }];
        Ok(HeapBuffer::new(width, height, description, slots, bytes, attributes))
    }
}

impl BufferAllocator for HeapAllocator {
    type Buffer = HeapBuffer;

    fn create(
        &self,
        width: usize,
        height: usize,
        format_code: u32,
        attributes: Option<&AttributeMap>,
    ) -> Result<HeapBuffer> {
        let context = format!("create {}x{}", width, height);
        let description = validate(width, height, format_code, &context)?;
        let alignment = row_alignment(&self.config, attributes, &context)?;

        let mut slots: SmallVec<[PlaneSlot; 3]> = SmallVec::new();
        let mut total = 0usize;
        for layout in description.planes {
            let (plane_width, plane_height) = layout.plane_size(width, height);
            let bytes_per_row = layout
                .min_bytes_per_row(plane_width)
                .and_then(|min_row| align_up(min_row, alignment))
                .ok_or_else(|| overflow(&context))?;
            let plane_bytes = bytes_per_row
                .checked_mul(plane_height)
                .ok_or_else(|| overflow(&context))?;
            slots.push(PlaneSlot {
                offset: total,
                width: plane_width,
                height: plane_height,
                bytes_per_row,
            });
            total = total.checked_add(plane_bytes).ok_or_else(|| overflow(&context))?;
        }

        if let Some(limit) = self.config.max_allocation_bytes {
            if total > limit {
                return Err(ReturnCode::WOULD_EXCEED_ALLOCATION_THRESHOLD.into_error(
                    Primitive::Create,
                    &format!("{context}: {total} bytes over limit of {limit}"),
                ));
            }
        }

        let mut storage = Vec::new();
        storage.try_reserve_exact(total).map_err(|e| {
            ReturnCode::ALLOCATION_FAILED.into_error(Primitive::Create, &format!("{context}: {total} bytes: {e}"))
        })?;
        storage.resize(total, self.config.fill_byte);
        debug!(
            width,
            height,
            format = %description.format,
            bytes = total,
            "Allocated heap pixel buffer"
        );
        Ok(HeapBuffer::new(width, height, description, slots, storage, attributes))
    }
}

fn validate(width: usize, height: usize, format_code: u32, context: &str) -> Result<FormatDescription> {
    if width == 0 || height == 0 {
        return Err(ReturnCode::INVALID_SIZE.into_error(Primitive::Create, context));
    }
    let format = PixelFormat::from_code(format_code);
    if format == PixelFormat::Unknown {
        return Err(ReturnCode::INVALID_PIXEL_FORMAT.into_error(
            Primitive::Create,
            &format!("{context}: format code {format_code:#010x}"),
        ));
    }
    format.describe().ok_or_else(|| {
        ReturnCode::UNSUPPORTED.into_error(
            Primitive::Create,
            &format!("{context}: compressed format {format} has no CPU layout"),
        )
    })
}

fn row_alignment(config: &AllocatorConfig, attributes: Option<&AttributeMap>, context: &str) -> Result<usize> {
    let Some(value) = attributes.and_then(|a| a.get(keys::BYTES_PER_ROW_ALIGNMENT)) else {
        return Ok(config.row_alignment);
    };
    match value.as_int() {
        Some(alignment) if alignment > 0 && (alignment as u64).is_power_of_two() => Ok(alignment as usize),
        _ => Err(ReturnCode::INVALID_PIXEL_BUFFER_ATTRIBUTES.into_error(
            Primitive::Create,
            &format!("{context}: {} = {:?}", keys::BYTES_PER_ROW_ALIGNMENT, value),
        )),
    }
}

/// Round `value` up to a power-of-two `alignment`, or `None` on overflow.
fn align_up(value: usize, alignment: usize) -> Option<usize> {
    Some(value.checked_add(alignment - 1)? & !(alignment - 1))
}

fn overflow(context: &str) -> BufferError {
    ReturnCode::INVALID_SIZE.into_error(Primitive::Create, &format!("{context}: size overflows usize"))
}

#[derive(Debug, Clone, Copy)]
struct PlaneSlot {
    offset: usize,
    width: usize,
    height: usize,
    bytes_per_row: usize,
}

#[derive(Debug, Default)]
struct LockBook {
    readers: u32,
    writer: bool,
    seed: u32,
}

/// Pixel buffer whose memory lives on the heap.
pub struct HeapBuffer {
    width: usize,
    height: usize,
    format: PixelFormat,
    planar: bool,
    slots: SmallVec<[PlaneSlot; 3]>,
    data: NonNull<u8>,
    len: usize,
    lock: Mutex<LockBook>,
    attachments: Mutex<Attachments>,
    creation_attributes: AttributeMap,
}

// SAFETY: `data` is uniquely owned by the buffer. Shared access to it only
// happens through lock scopes, and the lock book (behind a mutex) never grants
// a read-write lock while any other lock is held.
unsafe impl Send for HeapBuffer {}
unsafe impl Sync for HeapBuffer {}

impl HeapBuffer {
    fn new(
        width: usize,
        height: usize,
        description: FormatDescription,
        slots: SmallVec<[PlaneSlot; 3]>,
        storage: Vec<u8>,
        attributes: Option<&AttributeMap>,
    ) -> Self {
        let mut attachments = Attachments::new();
        let creation_attributes = attributes.cloned().unwrap_or_default();
        for (key, value) in &creation_attributes {
            if key != keys::BYTES_PER_ROW_ALIGNMENT {
                attachments.set(key.clone(), value.clone(), AttachmentMode::ShouldPropagate);
            }
        }

        let boxed = storage.into_boxed_slice();
        let len = boxed.len();
        let data = NonNull::from(Box::leak(boxed)).cast::<u8>();

        Self {
            width,
            height,
            format: description.format,
            planar: description.is_planar,
            slots,
            data,
            len,
            lock: Mutex::new(LockBook::default()),
            attachments: Mutex::new(attachments),
            creation_attributes,
        }
    }

    fn slot(&self, plane: usize) -> Option<&PlaneSlot> {
        if self.planar {
            self.slots.get(plane)
        } else {
            None
        }
    }
}

impl Drop for HeapBuffer {
    fn drop(&mut self) {
        // SAFETY: `data`/`len` came from a leaked boxed slice in `new` and are
        // released exactly once here.
        unsafe {
            drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                self.data.as_ptr(),
                self.len,
            )));
        }
    }
}

impl std::fmt::Debug for HeapBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeapBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("planes", &self.plane_count())
            .field("data_size", &self.len)
            .finish()
    }
}

// SAFETY: every plane range lies inside the single `len`-byte allocation,
// slots are laid out back to back so planes never overlap, and the lock book
// makes read-write locks exclusive.
unsafe impl PixelBuffer for HeapBuffer {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn format_code(&self) -> u32 {
        self.format.code()
    }

    fn pixel_format(&self) -> PixelFormat {
        self.format
    }

    fn bytes_per_row(&self) -> usize {
        if self.planar {
            self.len.div_ceil(self.height)
        } else {
            self.slots[0].bytes_per_row
        }
    }

    fn data_size(&self) -> usize {
        self.len
    }

    fn plane_count(&self) -> usize {
        if self.planar {
            self.slots.len()
        } else {
            0
        }
    }

    fn plane_width(&self, plane: usize) -> usize {
        self.slot(plane).map_or(0, |s| s.width)
    }

    fn plane_height(&self, plane: usize) -> usize {
        self.slot(plane).map_or(0, |s| s.height)
    }

    fn plane_bytes_per_row(&self, plane: usize) -> usize {
        self.slot(plane).map_or(0, |s| s.bytes_per_row)
    }

    unsafe fn lock_base_address(&self, mode: LockMode) -> Result<()> {
        let mut book = self.lock.lock();
        let refused = match mode {
            LockMode::ReadOnly => book.writer,
            LockMode::ReadWrite => book.writer || book.readers > 0,
        };
        if refused {
            return Err(ReturnCode::ERROR.into_error(
                Primitive::Lock,
                &format!("{mode} lock refused while buffer is {:?}", state_of(&book)),
            ));
        }

        match mode {
            LockMode::ReadOnly => book.readers += 1,
            LockMode::ReadWrite => book.writer = true,
        }
        Ok(())
    }

    unsafe fn unlock_base_address(&self, mode: LockMode) -> Result<()> {
        let mut book = self.lock.lock();
        match (mode, state_of(&book)) {
            (_, LockState::Unlocked) => {
                warn!(mode = %mode, "Unlock of a buffer that is not locked");
            }
            (LockMode::ReadOnly, LockState::LockedReadOnly) => book.readers -= 1,
            (LockMode::ReadWrite, LockState::LockedReadWrite) => {
                book.writer = false;
                book.seed = book.seed.wrapping_add(1);
            }
            (_, state) => {
                return Err(ReturnCode::ERROR.into_error(
                    Primitive::Unlock,
                    &format!("{mode} unlock does not match buffer state {state:?}"),
                ));
            }
        }
        Ok(())
    }

    fn lock_state(&self) -> LockState {
        state_of(&self.lock.lock())
    }

    fn seed(&self) -> u32 {
        self.lock.lock().seed
    }

    fn base_address(&self) -> Option<NonNull<u8>> {
        Some(self.data)
    }

    fn plane_base_address(&self, plane: usize) -> Option<NonNull<u8>> {
        let slot = self.slot(plane)?;
        // SAFETY: slot offsets lie within the allocation.
        Some(unsafe { NonNull::new_unchecked(self.data.as_ptr().add(slot.offset)) })
    }

    fn attachments(&self, mode: AttachmentMode) -> AttributeMap {
        self.attachments.lock().filtered(mode)
    }

    fn attachment(&self, key: &str) -> Option<(AttachmentValue, AttachmentMode)> {
        self.attachments
            .lock()
            .get(key)
            .map(|(value, mode)| (value.clone(), mode))
    }

    fn set_attachment(&self, key: &str, value: AttachmentValue, mode: AttachmentMode) {
        self.attachments.lock().set(key, value, mode);
    }

    fn remove_attachment(&self, key: &str) {
        self.attachments.lock().remove(key);
    }

    fn creation_attributes(&self) -> AttributeMap {
        self.creation_attributes.clone()
    }
}

fn state_of(book: &LockBook) -> LockState {
    if book.writer {
        LockState::LockedReadWrite
    } else if book.readers > 0 {
        LockState::LockedReadOnly
    } else {
        LockState::Unlocked
    }
}
