//! Lock pairing around deep copies, including injected lock failures.

use crate::support::{fill_pattern, init_tracing, planes_match, FaultyAllocator, FaultyBuffer, Faults};
use pixelplane_copy::CopyEngine;
use pixelplane_core::{
    BufferAllocator, BufferError, HeapAllocator, LockMode, LockState, PixelBuffer, PixelFormat, ReadLock, WriteLock,
};

// ── Helpers ──

fn source(faults: Faults) -> FaultyBuffer {
    let inner = HeapAllocator::default()
        .create(48, 24, PixelFormat::YpCbCr420_8BiPlanarVideoRange.code(), None)
        .unwrap();
    let buffer = FaultyBuffer::wrap(inner, Faults::default());
    fill_pattern(&buffer, 5).unwrap();
    buffer.set_faults(faults);
    buffer
}

fn engine(destination_faults: Faults) -> CopyEngine<FaultyAllocator> {
    init_tracing();
    CopyEngine::new(FaultyAllocator::new(destination_faults))
}

fn assert_balanced(buffer: &FaultyBuffer) {
    assert_eq!(buffer.lock_state(), LockState::Unlocked);
    assert_eq!(buffer.locks(), buffer.unlocks());
}

// ── Success ──

#[test]
fn successful_copy_pairs_every_lock() {
    let source = source(Faults::default());
    let locks_before = source.locks();

    let copy = engine(Faults::default()).deep_copy(&source).unwrap();
    assert_balanced(&source);
    assert_balanced(&copy);
    assert_eq!(source.locks() - locks_before, 1);
    assert_eq!(copy.locks(), 1);
    assert!(planes_match(&source, &copy).unwrap());
}

// ── Failures ──

#[test]
fn source_lock_failure_surfaces_without_locking() {
    let source = source(Faults {
        lock: Some(LockMode::ReadOnly),
        ..Default::default()
    });
    let locks_before = source.locks();

    let err = engine(Faults::default()).deep_copy(&source).unwrap_err();
    assert!(matches!(err, BufferError::LockFailed(_)));
    assert!(err.to_string().contains("injected lock fault"));
    assert_balanced(&source);
    assert_eq!(source.locks(), locks_before);
}

#[test]
fn destination_lock_failure_releases_source() {
    let source = source(Faults::default());
    let locks_before = source.locks();

    let err = engine(Faults {
        lock: Some(LockMode::ReadWrite),
        ..Default::default()
    })
    .deep_copy(&source)
    .unwrap_err();

    assert!(matches!(err, BufferError::LockFailed(_)));
    assert_balanced(&source);
    assert_eq!(source.locks() - locks_before, 1);
}

#[test]
fn destination_unlock_failure_after_copy_surfaces() {
    let source = source(Faults::default());
    let err = engine(Faults {
        unlock: Some(LockMode::ReadWrite),
        ..Default::default()
    })
    .deep_copy(&source)
    .unwrap_err();

    assert!(matches!(err, BufferError::LockFailed(_)));
    assert!(err.to_string().contains("injected unlock fault"));
    assert_balanced(&source);
}

#[test]
fn source_unlock_failure_after_copy_surfaces() {
    let source = source(Faults {
        unlock: Some(LockMode::ReadOnly),
        ..Default::default()
    });
    let err = engine(Faults::default()).deep_copy(&source).unwrap_err();
    assert!(matches!(err, BufferError::LockFailed(_)));
    assert_balanced(&source);
}

#[test]
fn destination_lock_and_source_unlock_failures_keep_lock_error() {
    let source = source(Faults {
        unlock: Some(LockMode::ReadOnly),
        ..Default::default()
    });
    let err = engine(Faults {
        lock: Some(LockMode::ReadWrite),
        ..Default::default()
    })
    .deep_copy(&source)
    .unwrap_err();

    assert!(err.to_string().contains("injected lock fault"));
    assert_balanced(&source);
}

#[test]
fn caller_held_write_lock_blocks_copy() {
    let source = source(Faults::default());
    let held = WriteLock::write(&source).unwrap();

    let err = engine(Faults::default()).deep_copy(&source).unwrap_err();
    assert!(matches!(err, BufferError::LockFailed(_)));
    assert_eq!(source.lock_state(), LockState::LockedReadWrite);

    held.release().unwrap();
    assert_balanced(&source);
}

#[test]
fn caller_held_read_lock_allows_copy() {
    let source = source(Faults::default());
    let held = ReadLock::read(&source).unwrap();

    let copy = engine(Faults::default()).deep_copy(&source).unwrap();
    assert_eq!(source.lock_state(), LockState::LockedReadOnly);
    drop(held);

    assert_balanced(&source);
    assert_balanced(&copy);
}

#[test]
fn lock_scope_drop_logs_failed_unlock() {
    let source = source(Faults {
        unlock: Some(LockMode::ReadOnly),
        ..Default::default()
    });
    {
        let lock = ReadLock::read(&source).unwrap();
        assert!(lock.plane(1).is_ok());
    }
    assert_balanced(&source);
}
