//! Integration test crate for pixelplane.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! [`support`] carries the shared fixtures: a fault-injecting buffer and
//! allocator, pattern fills and plane comparison.

pub mod support;

#[cfg(test)]
mod copy;

#[cfg(test)]
mod locking;

#[cfg(test)]
mod properties;
