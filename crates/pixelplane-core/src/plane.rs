//! Plane geometry and borrowed plane views.

use crate::buffer::PixelBuffer;
use crate::error::{BufferError, Result};
use bytemuck::Pod;
use smallvec::SmallVec;

/// Geometry of one plane of a buffer.
///
/// Derived from the buffer on demand, never stored. Plane 0 of a chunky
/// (0-plane) buffer describes the whole buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaneDescriptor {
    pub index: usize,
    /// Width in elements
    pub width: usize,
    /// Height in rows
    pub height: usize,
    /// Bytes per row (may include padding)
    pub bytes_per_row: usize,
}

impl PlaneDescriptor {
    /// Describe plane `index` of `buffer`.
    pub fn of<B: PixelBuffer + ?Sized>(buffer: &B, index: usize) -> Result<Self> {
        let count = buffer.plane_count();
        if count == 0 {
            if index != 0 {
                return Err(BufferError::InvalidArgument(format!(
                    "Plane {} out of range (0-0)",
                    index
                )));
            }
            return Ok(Self {
                index,
                width: buffer.width(),
                height: buffer.height(),
                bytes_per_row: buffer.bytes_per_row(),
            });
        }

        if index >= count {
            return Err(BufferError::InvalidArgument(format!(
                "Plane {} out of range (0-{})",
                index,
                count - 1
            )));
        }

        Ok(Self {
            index,
            width: buffer.plane_width(index),
            height: buffer.plane_height(index),
            bytes_per_row: buffer.plane_bytes_per_row(index),
        })
    }

    /// Descriptors of every addressable plane of `buffer`.
    pub fn all<B: PixelBuffer + ?Sized>(buffer: &B) -> Result<SmallVec<[Self; 3]>> {
        (0..buffer.plane_count().max(1))
            .map(|index| Self::of(buffer, index))
            .collect()
    }

    /// Bytes spanned by the plane, padding included.
    pub fn byte_len(&self) -> usize {
        self.height * self.bytes_per_row
    }
}

/// Read view of a locked plane.
#[derive(Debug, Clone, Copy)]
pub struct Plane<'a> {
    descriptor: PlaneDescriptor,
    data: &'a [u8],
}

impl<'a> Plane<'a> {
    pub(crate) fn new(descriptor: PlaneDescriptor, data: &'a [u8]) -> Self {
        Self { descriptor, data }
    }

    pub fn descriptor(&self) -> PlaneDescriptor {
        self.descriptor
    }

    pub fn index(&self) -> usize {
        self.descriptor.index
    }

    pub fn width(&self) -> usize {
        self.descriptor.width
    }

    pub fn height(&self) -> usize {
        self.descriptor.height
    }

    pub fn bytes_per_row(&self) -> usize {
        self.descriptor.bytes_per_row
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    pub fn into_bytes(self) -> &'a [u8] {
        self.data
    }

    /// Row `y`, padding included.
    #[inline]
    pub fn row(&self, y: usize) -> &'a [u8] {
        let start = y * self.descriptor.bytes_per_row;
        &self.data[start..start + self.descriptor.bytes_per_row]
    }

    /// Rows in order, padding included.
    pub fn rows(&self) -> impl Iterator<Item = &'a [u8]> + 'a {
        let stride = self.descriptor.bytes_per_row.max(1);
        self.data.chunks_exact(stride).take(self.descriptor.height)
    }

    /// Row `y` reinterpreted as `T` elements, or `None` if the row is
    /// misaligned or not a whole number of elements.
    pub fn row_as<T: Pod>(&self, y: usize) -> Option<&'a [T]> {
        bytemuck::try_cast_slice(self.row(y)).ok()
    }
}

/// Write view of a plane locked read-write.
#[derive(Debug)]
pub struct PlaneMut<'a> {
    descriptor: PlaneDescriptor,
    data: &'a mut [u8],
}

impl<'a> PlaneMut<'a> {
    pub(crate) fn new(descriptor: PlaneDescriptor, data: &'a mut [u8]) -> Self {
        Self { descriptor, data }
    }

    pub fn descriptor(&self) -> PlaneDescriptor {
        self.descriptor
    }

    pub fn index(&self) -> usize {
        self.descriptor.index
    }

    pub fn width(&self) -> usize {
        self.descriptor.width
    }

    pub fn height(&self) -> usize {
        self.descriptor.height
    }

    pub fn bytes_per_row(&self) -> usize {
        self.descriptor.bytes_per_row
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.data
    }

    /// Reborrow as a read view.
    pub fn as_plane(&self) -> Plane<'_> {
        Plane::new(self.descriptor, self.data)
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.descriptor.bytes_per_row;
        &self.data[start..start + self.descriptor.bytes_per_row]
    }

    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let start = y * self.descriptor.bytes_per_row;
        &mut self.data[start..start + self.descriptor.bytes_per_row]
    }

    pub fn row_as_mut<T: Pod>(&mut self, y: usize) -> Option<&mut [T]> {
        bytemuck::try_cast_slice_mut(self.row_mut(y)).ok()
    }

    /// Fill the whole plane, padding included.
    pub fn fill(&mut self, value: u8) {
        self.data.fill(value);
    }
}
