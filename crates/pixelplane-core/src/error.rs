//! Error types for pixel buffer operations.

use thiserror::Error;

/// Errors surfaced by buffer allocation, locking and copying.
///
/// A failed type-identity check is not represented here: it is a programming
/// error and panics instead of returning a value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// Malformed geometry, format or attribute.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The allocator could not satisfy the request.
    #[error("Allocation failed: {0}")]
    AllocationFailed(String),

    /// A lock or unlock primitive returned non-success.
    #[error("Lock failed: {0}")]
    LockFailed(String),

    /// Format/feature combination the allocator rejects.
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

/// Result type alias for pixel buffer operations.
pub type Result<T> = std::result::Result<T, BufferError>;

/// The primitive that produced a [`ReturnCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Create,
    Lock,
    Unlock,
}

/// Numeric status code returned by allocator-level primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReturnCode(pub i32);

impl ReturnCode {
    pub const SUCCESS: Self = Self(0);
    pub const ERROR: Self = Self(-6660);
    pub const INVALID_ARGUMENT: Self = Self(-6661);
    pub const ALLOCATION_FAILED: Self = Self(-6662);
    pub const UNSUPPORTED: Self = Self(-6663);
    pub const INVALID_PIXEL_FORMAT: Self = Self(-6680);
    pub const INVALID_SIZE: Self = Self(-6681);
    pub const INVALID_PIXEL_BUFFER_ATTRIBUTES: Self = Self(-6682);
    pub const WOULD_EXCEED_ALLOCATION_THRESHOLD: Self = Self(-6689);
    pub const POOL_ALLOCATION_FAILED: Self = Self(-6690);
    pub const INVALID_POOL_ATTRIBUTES: Self = Self(-6691);
    pub const RETRY: Self = Self(-6692);

    /// Whether this code reports success.
    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    /// Short human-readable name of the code.
    pub fn name(self) -> &'static str {
        match self {
            Self::SUCCESS => "success",
            Self::INVALID_ARGUMENT => "invalid argument",
            Self::ALLOCATION_FAILED => "allocation failed",
            Self::UNSUPPORTED => "unsupported",
            Self::INVALID_PIXEL_FORMAT => "invalid pixel format",
            Self::INVALID_SIZE => "invalid size",
            Self::INVALID_PIXEL_BUFFER_ATTRIBUTES => "invalid pixel buffer attributes",
            Self::WOULD_EXCEED_ALLOCATION_THRESHOLD => "would exceed allocation threshold",
            Self::POOL_ALLOCATION_FAILED => "pool allocation failed",
            Self::INVALID_POOL_ATTRIBUTES => "invalid pool attributes",
            Self::RETRY => "retry",
            _ => "error",
        }
    }

    /// Convert the code into a typed result for the given primitive.
    ///
    /// `context` prefixes the error message.
    pub fn check(self, primitive: Primitive, context: &str) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(self.into_error(primitive, context))
        }
    }

    /// The error a failing code maps to. Every failure of a lock or unlock
    /// primitive is a [`BufferError::LockFailed`].
    pub fn into_error(self, primitive: Primitive, context: &str) -> BufferError {
        let message = format!("{context}: {} ({})", self.name(), self.0);
        match primitive {
            Primitive::Lock | Primitive::Unlock => BufferError::LockFailed(message),
            Primitive::Create => match self {
                Self::INVALID_ARGUMENT
                | Self::INVALID_SIZE
                | Self::INVALID_PIXEL_FORMAT
                | Self::INVALID_PIXEL_BUFFER_ATTRIBUTES => BufferError::InvalidArgument(message),
                Self::UNSUPPORTED => BufferError::Unsupported(message),
                _ => BufferError::AllocationFailed(message),
            },
        }
    }
}

impl From<i32> for ReturnCode {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}
