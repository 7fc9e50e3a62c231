//! Pixelplane Core - pixel buffers, plane views and scoped locking
//!
//! This crate provides the building blocks used by the copy engine:
//! - Pixel format catalog (raw format codes, plane layouts)
//! - Buffer attachments and creation attributes
//! - The `PixelBuffer` / `BufferAllocator` contracts and a heap allocator
//! - Lock scopes handing out borrowed plane views

pub mod attachment;
pub mod buffer;
pub mod error;
pub mod format;
pub mod heap;
pub mod lock;
pub mod plane;

pub use attachment::{AttachmentMode, AttachmentValue, Attachments, AttributeMap};
pub use buffer::{BufferAllocator, PixelBuffer};
pub use error::{BufferError, Primitive, Result, ReturnCode};
pub use format::{fourcc, FormatDescription, PixelFormat, PlaneLayout};
pub use heap::{AllocatorConfig, HeapAllocator, HeapBuffer};
pub use lock::{LockMode, LockScope, LockState, ReadLock, WriteLock};
pub use plane::{Plane, PlaneDescriptor, PlaneMut};
