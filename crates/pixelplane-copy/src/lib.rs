//! Pixelplane Copy - blank and deep copies of planar pixel buffers
//!
//! Copies are made through a [`CopyEngine`] wrapping any
//! [`BufferAllocator`](pixelplane_core::BufferAllocator). Source and
//! destination are locked for the duration of the copy and always released,
//! whether the copy succeeds or not.

pub mod config;
pub mod engine;
pub mod kernel;

pub use config::CopyConfig;
pub use engine::{CopyEngine, CopyReport, CopyStage};
pub use kernel::{copy_plane, copy_planes, CopyStrategy};
