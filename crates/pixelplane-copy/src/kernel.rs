//! Plane copy kernels.
//!
//! A plane is copied in one block when source and destination share a stride,
//! and row by row otherwise so padding is never treated as pixel data.

use crate::config::CopyConfig;
use pixelplane_core::{Plane, PlaneMut};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, trace};

/// How a single plane was copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CopyStrategy {
    /// One block copy of `height * stride` bytes.
    Bulk { bytes: usize },
    /// `rows` copies of `bytes_per_row` bytes each.
    RowWise { rows: usize, bytes_per_row: usize },
}

impl CopyStrategy {
    /// Bytes transferred.
    pub fn bytes(&self) -> usize {
        match *self {
            Self::Bulk { bytes } => bytes,
            Self::RowWise { rows, bytes_per_row } => rows * bytes_per_row,
        }
    }

    pub fn is_bulk(&self) -> bool {
        matches!(self, Self::Bulk { .. })
    }
}

/// Copy `src` into `dst`.
///
/// Rows are clamped to the smaller stride and the smaller height. Destination
/// bytes past the copied range keep whatever the allocator put there.
pub fn copy_plane(src: &Plane<'_>, dst: &mut PlaneMut<'_>) -> CopyStrategy {
    let rows = src.height().min(dst.height());
    let src_stride = src.bytes_per_row();
    let dst_stride = dst.bytes_per_row();

    let strategy = if src_stride == dst_stride {
        let bytes = rows * src_stride;
        dst.as_bytes_mut()[..bytes].copy_from_slice(&src.as_bytes()[..bytes]);
        CopyStrategy::Bulk { bytes }
    } else {
        let bytes_per_row = src_stride.min(dst_stride);
        for y in 0..rows {
            dst.row_mut(y)[..bytes_per_row].copy_from_slice(&src.row(y)[..bytes_per_row]);
        }
        CopyStrategy::RowWise { rows, bytes_per_row }
    };

    debug!(
        plane = src.index(),
        src_stride,
        dst_stride,
        strategy = ?strategy,
        "Plane copied"
    );
    strategy
}

/// Copy every plane of `src` into the matching plane of `dst`.
///
/// Planes fan out over the rayon pool when `config` allows it. Extra planes on
/// either side are ignored.
pub fn copy_planes(
    src: &[Plane<'_>],
    dst: &mut [PlaneMut<'_>],
    config: &CopyConfig,
) -> SmallVec<[CopyStrategy; 3]> {
    let total: usize = src.iter().map(|plane| plane.as_bytes().len()).sum();

    if config.use_parallel(src.len().min(dst.len()), total) {
        trace!(planes = src.len(), bytes = total, "Copying planes in parallel");
        let strategies: Vec<CopyStrategy> = src
            .par_iter()
            .zip(dst.par_iter_mut())
            .map(|(s, d)| copy_plane(s, d))
            .collect();
        return strategies.into_iter().collect();
    }

    src.iter()
        .zip(dst.iter_mut())
        .map(|(s, d)| copy_plane(s, d))
        .collect()
}
