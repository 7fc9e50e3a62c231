//! Property tests for deep copy content and lock pairing.

use crate::support::{fill_pattern, init_tracing, plane_rows, planes_match, FaultyAllocator, FaultyBuffer, Faults};
use pixelplane_copy::CopyEngine;
use pixelplane_core::{
    AllocatorConfig, BufferAllocator, HeapAllocator, LockMode, LockState, PixelBuffer, PixelFormat,
};
use proptest::prelude::*;

const CHUNKY: [PixelFormat; 5] = [
    PixelFormat::Bgra32,
    PixelFormat::Rgb24,
    PixelFormat::Gray16,
    PixelFormat::OneComponent8,
    PixelFormat::YpCbCr422_8,
];

const PLANAR: [PixelFormat; 3] = [
    PixelFormat::YpCbCr420_8BiPlanarVideoRange,
    PixelFormat::YpCbCr420_8Planar,
    PixelFormat::YpCbCr420_8BiPlanarFullRange,
];

fn faults(choice: u8) -> (Faults, Faults) {
    let none = Faults::default();
    match choice % 5 {
        0 => (none, none),
        1 => (Faults { lock: Some(LockMode::ReadOnly), ..none }, none),
        2 => (none, Faults { lock: Some(LockMode::ReadWrite), ..none }),
        3 => (Faults { unlock: Some(LockMode::ReadOnly), ..none }, none),
        _ => (none, Faults { unlock: Some(LockMode::ReadWrite), ..none }),
    }
}

proptest! {
    #[test]
    fn deep_copy_preserves_rows_across_strides(
        width in 1usize..200,
        height in 1usize..64,
        padding in 0usize..96,
        align_shift in 0u32..8,
        format_index in 0usize..CHUNKY.len(),
        seed in any::<u8>(),
    ) {
        init_tracing();
        let format = CHUNKY[format_index];
        let min_row = format.describe().unwrap().planes[0].min_bytes_per_row(width).unwrap();
        let stride = min_row + padding;
        let bytes = (0..height * stride).map(|i| (i as u8).wrapping_mul(13).wrapping_add(seed)).collect();

        let source = HeapAllocator::default()
            .create_with_bytes(width, height, format.code(), bytes, stride, None)
            .unwrap();
        let engine = CopyEngine::new(HeapAllocator::new(AllocatorConfig {
            row_alignment: 1 << align_shift,
            ..Default::default()
        }));
        let (copy, report) = engine.deep_copy_with_report(&source).unwrap();

        let overlap = stride.min(copy.bytes_per_row());
        prop_assert_eq!(report.bytes_copied, overlap * height);
        prop_assert_eq!(plane_rows(&source, 0, overlap).unwrap(), plane_rows(&copy, 0, overlap).unwrap());
        prop_assert_eq!(copy.lock_state(), LockState::Unlocked);
        prop_assert_eq!(source.lock_state(), LockState::Unlocked);
    }

    #[test]
    fn deep_copy_preserves_planar_geometry(
        width in 1usize..160,
        height in 1usize..120,
        format_index in 0usize..PLANAR.len(),
        seed in any::<u8>(),
    ) {
        init_tracing();
        let engine = CopyEngine::new(HeapAllocator::default());
        let source = engine
            .allocator()
            .create(width, height, PLANAR[format_index].code(), None)
            .unwrap();
        fill_pattern(&source, seed).unwrap();

        let copy = engine.deep_copy(&source).unwrap();
        prop_assert_eq!(copy.plane_count(), source.plane_count());
        for plane in 0..source.plane_count() {
            prop_assert_eq!(copy.plane_width(plane), source.plane_width(plane));
            prop_assert_eq!(copy.plane_height(plane), source.plane_height(plane));
        }
        prop_assert!(planes_match(&source, &copy).unwrap());
    }

    #[test]
    fn every_outcome_leaves_buffers_unlocked(choice in any::<u8>(), width in 1usize..64) {
        init_tracing();
        let (source_faults, destination_faults) = faults(choice);
        let inner = HeapAllocator::default()
            .create(width, 16, PixelFormat::YpCbCr420_8Planar.code(), None)
            .unwrap();
        let source = FaultyBuffer::wrap(inner, source_faults);
        let engine = CopyEngine::new(FaultyAllocator::new(destination_faults));

        let outcome = engine.deep_copy(&source);
        prop_assert_eq!(outcome.is_ok(), choice % 5 == 0);
        prop_assert_eq!(source.lock_state(), LockState::Unlocked);
        prop_assert_eq!(source.locks(), source.unlocks());
        if let Ok(copy) = outcome {
            prop_assert_eq!(copy.lock_state(), LockState::Unlocked);
            prop_assert_eq!(copy.locks(), copy.unlocks());
        }
    }
}
