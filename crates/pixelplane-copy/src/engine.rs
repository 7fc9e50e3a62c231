//! Blank and deep copies of pixel buffers.
//!
//! A deep copy walks a fixed sequence of stages:
//! 1. Allocate a destination with the source's geometry (`blank_copy`)
//! 2. Lock the source read-only, then the destination read-write
//! 3. Copy each plane, in one block or row by row
//! 4. Release the source lock, then the destination lock
//!
//! Locks taken before a failure are always released before the error is
//! returned.

use crate::config::CopyConfig;
use crate::kernel::{self, CopyStrategy};
use pixelplane_core::{
    AttachmentMode, BufferAllocator, BufferError, PixelBuffer, Plane, ReadLock, Result, WriteLock,
};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::any::Any;
use std::fmt;
use tracing::{debug, debug_span, trace, warn};

/// Stages of a deep copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CopyStage {
    Start,
    Allocated,
    SourceLocked,
    DestLocked,
    Copying,
    Unlocking,
    Done,
    Failed,
}

impl CopyStage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Allocated => "allocated",
            Self::SourceLocked => "source-locked",
            Self::DestLocked => "dest-locked",
            Self::Copying => "copying",
            Self::Unlocking => "unlocking",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    fn advance(&mut self, next: Self) {
        trace!(from = %self, to = %next, "Copy stage");
        *self = next;
    }
}

impl fmt::Display for CopyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a deep copy did, plane by plane.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyReport {
    pub planes: SmallVec<[CopyStrategy; 3]>,
    pub bytes_copied: usize,
}

impl CopyReport {
    /// Whether any plane needed a row-by-row copy.
    pub fn has_row_wise(&self) -> bool {
        self.planes.iter().any(|strategy| !strategy.is_bulk())
    }
}

/// Creates copies of buffers produced by an allocator.
#[derive(Debug, Clone)]
pub struct CopyEngine<A: BufferAllocator> {
    allocator: A,
    config: CopyConfig,
}

impl<A: BufferAllocator + Default> Default for CopyEngine<A> {
    fn default() -> Self {
        Self::new(A::default())
    }
}

impl<A: BufferAllocator> CopyEngine<A> {
    pub fn new(allocator: A) -> Self {
        Self::with_config(allocator, CopyConfig::default())
    }

    pub fn with_config(allocator: A, config: CopyConfig) -> Self {
        Self { allocator, config }
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    pub fn config(&self) -> &CopyConfig {
        &self.config
    }

    /// New buffer with the source's width, height, format and propagated
    /// attachments. Pixel content is whatever the allocator initializes.
    ///
    /// Only metadata is read; the source does not need to be locked.
    pub fn blank_copy(&self, source: &A::Buffer) -> Result<A::Buffer> {
        let attributes = source.attachments(AttachmentMode::ShouldPropagate);
        self.allocator.create(
            source.width(),
            source.height(),
            source.format_code(),
            Some(&attributes),
        )
    }

    /// New buffer holding a copy of the source's pixel data.
    pub fn deep_copy(&self, source: &A::Buffer) -> Result<A::Buffer> {
        self.deep_copy_with_report(source).map(|(copy, _)| copy)
    }

    /// [`deep_copy`](Self::deep_copy) for a value whose type is only known at
    /// runtime.
    ///
    /// # Panics
    ///
    /// Panics if `source` is not this allocator's buffer type.
    pub fn deep_copy_any(&self, source: &dyn Any) -> Result<A::Buffer> {
        match source.downcast_ref::<A::Buffer>() {
            Some(buffer) => self.deep_copy(buffer),
            None => panic!("deep_copy() cannot be called on a non-pixel buffer"),
        }
    }

    /// Deep copy, also reporting how each plane was copied.
    pub fn deep_copy_with_report(&self, source: &A::Buffer) -> Result<(A::Buffer, CopyReport)> {
        let span = debug_span!(
            "deep_copy",
            width = source.width(),
            height = source.height(),
            format = %source.pixel_format(),
        );
        let _enter = span.enter();

        let mut stage = CopyStage::Start;
        let result = self.run(source, &mut stage);
        match &result {
            Ok((_, report)) => {
                stage.advance(CopyStage::Done);
                debug!(
                    planes = report.planes.len(),
                    bytes = report.bytes_copied,
                    row_wise = report.has_row_wise(),
                    "Deep copy complete"
                );
            }
            Err(e) => {
                debug!(stage = %stage, error = %e, "Deep copy failed");
                stage.advance(CopyStage::Failed);
            }
        }
        result
    }

    fn run(&self, source: &A::Buffer, stage: &mut CopyStage) -> Result<(A::Buffer, CopyReport)> {
        let destination = self.blank_copy(source)?;
        stage.advance(CopyStage::Allocated);
        let report = copy_locked(source, &destination, &self.config, stage)?;
        Ok((destination, report))
    }
}

/// Lock both buffers, copy, and release source then destination.
fn copy_locked<S, D>(source: &S, destination: &D, config: &CopyConfig, stage: &mut CopyStage) -> Result<CopyReport>
where
    S: PixelBuffer + ?Sized,
    D: PixelBuffer + ?Sized,
{
    let src_lock = ReadLock::read(source)?;
    stage.advance(CopyStage::SourceLocked);

    let mut dst_lock = match WriteLock::write(destination) {
        Ok(lock) => lock,
        Err(e) => {
            stage.advance(CopyStage::Unlocking);
            if let Err(release) = src_lock.release() {
                warn!(error = %release, "Failed to release source while unwinding");
            }
            return Err(e);
        }
    };
    stage.advance(CopyStage::DestLocked);

    stage.advance(CopyStage::Copying);
    let copied = copy_contents(&src_lock, &mut dst_lock, config);

    stage.advance(CopyStage::Unlocking);
    let src_released = src_lock.release();
    let dst_released = dst_lock.release();

    match copied {
        Ok(report) => {
            src_released?;
            dst_released?;
            Ok(report)
        }
        Err(e) => {
            for released in [src_released, dst_released] {
                if let Err(release) = released {
                    warn!(error = %release, "Failed to release lock while unwinding");
                }
            }
            Err(e)
        }
    }
}

fn copy_contents<S, D>(source: &ReadLock<'_, S>, destination: &mut WriteLock<'_, D>, config: &CopyConfig) -> Result<CopyReport>
where
    S: PixelBuffer + ?Sized,
    D: PixelBuffer + ?Sized,
{
    let count = source.plane_count();
    if destination.plane_count() != count {
        return Err(BufferError::InvalidArgument(format!(
            "destination has {} planes, source has {}",
            destination.plane_count(),
            count
        )));
    }

    let sources = (0..count)
        .map(|index| source.plane(index))
        .collect::<Result<SmallVec<[Plane<'_>; 3]>>>()?;
    let mut targets = destination.planes_mut()?;

    let planes = kernel::copy_planes(&sources, &mut targets, config);
    let bytes_copied = planes.iter().map(CopyStrategy::bytes).sum();
    trace!(bytes = bytes_copied, "Pixel data copied");

    Ok(CopyReport { planes, bytes_copied })
}
