//! Integration tests for blank and deep copies on heap buffers.

use crate::support::{
    bgra_row, fill_pattern, init_tracing, plane_rows, planes_match, write_bgra_row, FaultyAllocator, FaultyBuffer,
    Faults,
};
use pixelplane_copy::{CopyConfig, CopyEngine, CopyStrategy};
use pixelplane_core::{
    AllocatorConfig, AttachmentMode, AttachmentValue, AttributeMap, BufferAllocator, BufferError, HeapAllocator,
    LockState, PixelBuffer, PixelFormat, ReadLock,
};

// ── Helpers ──

fn engine() -> CopyEngine<HeapAllocator> {
    init_tracing();
    CopyEngine::default()
}

// ── Scenarios ──

#[test]
fn deep_copy_of_white_vga_frame() {
    let engine = engine();
    let source = HeapAllocator::new(AllocatorConfig {
        fill_byte: 255,
        ..Default::default()
    })
    .create(640, 480, PixelFormat::Bgra32.code(), None)
    .unwrap();

    let copy = engine.deep_copy(&source).unwrap();
    assert_eq!(copy.width(), 640);
    assert_eq!(copy.height(), 480);
    assert_eq!(copy.pixel_format(), PixelFormat::Bgra32);

    let lock = ReadLock::read(&copy).unwrap();
    let data = lock.data().unwrap();
    assert_eq!(data.len(), source.data_size());
    assert_eq!(data[0], 255);
    assert_eq!(data[data.len() - 1], 255);
}

#[test]
fn deep_copy_of_biplanar_420() {
    let engine = engine();
    let source = engine
        .allocator()
        .create(100, 100, PixelFormat::YpCbCr420_8BiPlanarVideoRange.code(), None)
        .unwrap();
    assert_eq!(source.plane_count(), 2);
    assert_eq!((source.plane_width(0), source.plane_height(0)), (100, 100));
    assert_eq!((source.plane_width(1), source.plane_height(1)), (50, 50));
    fill_pattern(&source, 17).unwrap();

    let (copy, report) = engine.deep_copy_with_report(&source).unwrap();
    assert_eq!(copy.plane_count(), 2);
    for plane in 0..2 {
        assert_eq!(copy.plane_width(plane), source.plane_width(plane));
        assert_eq!(copy.plane_height(plane), source.plane_height(plane));
        assert_eq!(
            plane_rows(&copy, plane, usize::MAX).unwrap(),
            plane_rows(&source, plane, usize::MAX).unwrap()
        );
    }
    assert_eq!(report.planes.len(), 2);
    assert!(report.planes.iter().all(CopyStrategy::is_bulk));
}

#[test]
fn wide_source_stride_copies_row_by_row() {
    let engine = engine();
    let (width, height, stride) = (160, 48, 644);
    let bytes: Vec<u8> = (0..height * stride).map(|i| (i % 241) as u8).collect();
    let source = engine
        .allocator()
        .create_with_bytes(width, height, PixelFormat::Bgra32.code(), bytes, stride, None)
        .unwrap();
    assert_eq!(source.bytes_per_row(), 644);

    let (copy, report) = engine.deep_copy_with_report(&source).unwrap();
    assert_eq!(copy.bytes_per_row(), 640);
    assert_eq!(copy.data_size(), 640 * height);
    assert_eq!(
        report.planes.as_slice(),
        &[CopyStrategy::RowWise {
            rows: height,
            bytes_per_row: 640
        }]
    );
    assert_eq!(report.bytes_copied, 640 * height);

    let src_rows = plane_rows(&source, 0, 640).unwrap();
    let dst_rows = plane_rows(&copy, 0, 640).unwrap();
    assert_eq!(src_rows, dst_rows);
    assert!(dst_rows.iter().all(|row| row.len() == 640));
}

#[test]
fn narrow_source_leaves_destination_padding_untouched() {
    let source = HeapAllocator::new(AllocatorConfig {
        row_alignment: 16,
        ..Default::default()
    })
    .create(20, 10, PixelFormat::Bgra32.code(), None)
    .unwrap();
    fill_pattern(&source, 3).unwrap();

    init_tracing();
    let engine = CopyEngine::new(HeapAllocator::new(AllocatorConfig {
        row_alignment: 128,
        fill_byte: 0x5A,
        ..Default::default()
    }));
    let copy = engine.deep_copy(&source).unwrap();
    assert_eq!((source.bytes_per_row(), copy.bytes_per_row()), (80, 128));
    assert!(planes_match(&source, &copy).unwrap());

    let padded = plane_rows(&copy, 0, usize::MAX).unwrap();
    assert!(padded.iter().all(|row| row[80..].iter().all(|&b| b == 0x5A)));
}

#[test]
fn deep_copy_does_not_alias_source() {
    let engine = engine();
    let source = engine.allocator().create(32, 8, PixelFormat::Bgra32.code(), None).unwrap();
    let original: Vec<u32> = (0..32).map(|x| 0xFF00_0000 | x).collect();
    write_bgra_row(&source, 3, &original).unwrap();

    let copy = engine.deep_copy(&source).unwrap();
    write_bgra_row(&source, 3, &[0xDEAD_BEEF; 32]).unwrap();

    assert_eq!(bgra_row(&copy, 3).unwrap(), original);
    assert_eq!(bgra_row(&source, 3).unwrap(), vec![0xDEAD_BEEF; 32]);
}

#[test]
fn deep_copy_is_idempotent() {
    let engine = engine();
    let source = engine
        .allocator()
        .create(33, 17, PixelFormat::YpCbCr420_8Planar.code(), None)
        .unwrap();
    fill_pattern(&source, 99).unwrap();

    let once = engine.deep_copy(&source).unwrap();
    let twice = engine.deep_copy(&once).unwrap();
    assert_eq!((twice.width(), twice.height()), (once.width(), once.height()));
    assert_eq!(twice.format_code(), once.format_code());
    assert!(planes_match(&once, &twice).unwrap());
    assert!(planes_match(&source, &twice).unwrap());
}

#[test]
fn blank_copy_keeps_geometry_across_formats() {
    let engine = engine();
    let formats = [
        PixelFormat::Bgra32,
        PixelFormat::Rgb24,
        PixelFormat::Gray16,
        PixelFormat::YpCbCr422_8,
        PixelFormat::YpCbCr420_8BiPlanarFullRange,
        PixelFormat::YpCbCr420_8Planar,
        PixelFormat::Monochrome1,
    ];

    for format in formats {
        let source = engine.allocator().create(77, 41, format.code(), None).unwrap();
        let blank = engine.blank_copy(&source).unwrap();
        assert_eq!(blank.width(), 77, "{format}");
        assert_eq!(blank.height(), 41, "{format}");
        assert_eq!(blank.pixel_format(), format);
        assert_eq!(blank.plane_count(), source.plane_count(), "{format}");
        assert_eq!(blank.lock_state(), LockState::Unlocked);
    }
}

#[test]
fn blank_copy_of_unrecognized_format_is_invalid_argument() {
    init_tracing();
    let inner = HeapAllocator::default()
        .create(16, 16, PixelFormat::Bgra32.code(), None)
        .unwrap();
    let source = FaultyBuffer::wrap(inner, Faults::default()).with_format_code(0xdead_beef);
    assert_eq!(source.pixel_format(), PixelFormat::Unknown);

    let engine = CopyEngine::new(FaultyAllocator::default());
    assert!(matches!(engine.blank_copy(&source), Err(BufferError::InvalidArgument(_))));
    assert!(matches!(engine.deep_copy(&source), Err(BufferError::InvalidArgument(_))));
    assert_eq!(source.lock_state(), LockState::Unlocked);
    assert_eq!(source.locks(), 0);
}

#[test]
fn blank_copy_of_compressed_format_is_unsupported() {
    init_tracing();
    let inner = HeapAllocator::default()
        .create(16, 16, PixelFormat::Bgra32.code(), None)
        .unwrap();
    let source = FaultyBuffer::wrap(inner, Faults::default()).with_format_code(PixelFormat::LossyBgra32.code());

    let engine = CopyEngine::new(FaultyAllocator::default());
    assert!(matches!(engine.blank_copy(&source), Err(BufferError::Unsupported(_))));
}

#[test]
fn propagated_attachments_follow_copies() {
    let engine = engine();
    let mut attributes = AttributeMap::new();
    attributes.insert("Origin".into(), AttachmentValue::from("camera-a"));
    let source = engine
        .allocator()
        .create(8, 8, PixelFormat::Bgra32.code(), Some(&attributes))
        .unwrap();
    source.set_attachment("FrameIndex", AttachmentValue::Int(12), AttachmentMode::ShouldPropagate);
    source.set_attachment("Scratch", AttachmentValue::Bool(true), AttachmentMode::ShouldNotPropagate);

    let copy = engine.deep_copy(&source).unwrap();
    assert_eq!(
        copy.attachment("Origin"),
        Some((AttachmentValue::from("camera-a"), AttachmentMode::ShouldPropagate))
    );
    assert_eq!(
        copy.attachment("FrameIndex").map(|(value, _)| value),
        Some(AttachmentValue::Int(12))
    );
    assert!(copy.attachment("Scratch").is_none());
}

#[test]
fn parallel_planes_match_sequential() {
    init_tracing();
    let sequential = CopyEngine::new(HeapAllocator::default());
    let parallel = CopyEngine::with_config(
        HeapAllocator::default(),
        CopyConfig::from_json(r#"{"parallel_planes": true, "parallel_min_bytes": 0}"#).unwrap(),
    );
    let source = sequential
        .allocator()
        .create(256, 128, PixelFormat::YpCbCr420_8Planar.code(), None)
        .unwrap();
    fill_pattern(&source, 42).unwrap();

    let a = sequential.deep_copy(&source).unwrap();
    let b = parallel.deep_copy(&source).unwrap();
    assert!(planes_match(&a, &b).unwrap());
    assert!(planes_match(&source, &b).unwrap());
}

#[test]
fn copies_from_many_threads() {
    let engine = engine();
    let sources: Vec<_> = (0..8u8)
        .map(|seed| {
            let buffer = engine.allocator().create(64, 64, PixelFormat::Bgra32.code(), None).unwrap();
            fill_pattern(&buffer, seed).unwrap();
            buffer
        })
        .collect();

    std::thread::scope(|scope| {
        for source in &sources {
            let engine = &engine;
            scope.spawn(move || {
                let copy = engine.deep_copy(source).unwrap();
                assert!(planes_match(source, &copy).unwrap());
            });
        }
    });

    assert!(sources.iter().all(|s| s.lock_state() == LockState::Unlocked));
}
