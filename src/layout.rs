#![forbid(unsafe_code)]

//! Dense, strided pixel buffers.
//!
//! Every buffer is a `height × width × channels` array stored row-major with
//! no padding, so the byte strides follow from the format alone:
//!
//! ```text
//! channel_stride = channel_byte_width
//! pixel_stride   = channel_count * channel_byte_width
//! row_stride     = width * pixel_stride
//! total_bytes    = height * row_stride
//! ```
//!
//! Single channel images keep their trailing channel dimension of 1.

use alloc::vec::Vec;

use bytemuck::{allocation::try_zeroed_slice_box, cast_slice, cast_slice_mut, Zeroable};

use crate::{ImageHeader, PixelFormat, PngArrayError, PngArrayResult};

/// The shape and byte strides of a pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferLayout {
  pub(crate) height: usize,
  pub(crate) width: usize,
  pub(crate) channel_count: usize,
  pub(crate) channel_byte_width: usize,
  pub(crate) row_stride: usize,
  pub(crate) pixel_stride: usize,
  pub(crate) total_bytes: usize,
}
impl BufferLayout {
  /// Computes the layout for the given dimensions.
  ///
  /// ## Failure
  /// * `channel_count` outside 1 through 4.
  /// * `channel_byte_width` other than 1 or 2.
  /// * The total byte size overflows `usize`.
  pub fn new(
    height: usize, width: usize, channel_count: usize, channel_byte_width: usize,
  ) -> PngArrayResult<Self> {
    if !(1..=4).contains(&channel_count) {
      return Err(PngArrayError::UnsupportedChannelCount(channel_count));
    }
    if !(1..=2).contains(&channel_byte_width) {
      return Err(PngArrayError::InvalidArgument(alloc::format!(
        "channel byte width {channel_byte_width} is not 1 or 2"
      )));
    }
    let pixel_stride = channel_count * channel_byte_width;
    let row_stride = width.checked_mul(pixel_stride).ok_or(PngArrayError::SizeOverflow)?;
    let total_bytes = height.checked_mul(row_stride).ok_or(PngArrayError::SizeOverflow)?;
    Ok(Self {
      height,
      width,
      channel_count,
      channel_byte_width,
      row_stride,
      pixel_stride,
      total_bytes,
    })
  }

  /// The layout of a decode of this image in a concrete format.
  pub fn for_format(header: &ImageHeader, format: PixelFormat) -> PngArrayResult<Self> {
    let (Some(channels), Some(width)) = (format.channel_count(), format.channel_byte_width())
    else {
      return Err(PngArrayError::InvalidArgument("a layout needs a concrete format".into()));
    };
    Self::new(header.height as usize, header.width as usize, channels, width)
  }

  /// Rows.
  #[inline]
  #[must_use]
  pub const fn height(&self) -> usize {
    self.height
  }
  /// Pixels per row.
  #[inline]
  #[must_use]
  pub const fn width(&self) -> usize {
    self.width
  }
  /// Channels per pixel.
  #[inline]
  #[must_use]
  pub const fn channel_count(&self) -> usize {
    self.channel_count
  }
  /// Bytes per channel: 1 for `u8`, 2 for `u16`.
  #[inline]
  #[must_use]
  pub const fn channel_byte_width(&self) -> usize {
    self.channel_byte_width
  }
  #[inline]
  #[must_use]
  pub const fn row_stride_bytes(&self) -> usize {
    self.row_stride
  }
  #[inline]
  #[must_use]
  pub const fn pixel_stride_bytes(&self) -> usize {
    self.pixel_stride
  }
  #[inline]
  #[must_use]
  pub const fn channel_stride_bytes(&self) -> usize {
    self.channel_byte_width
  }
  #[inline]
  #[must_use]
  pub const fn total_bytes(&self) -> usize {
    self.total_bytes
  }
  /// Samples in the whole buffer.
  #[inline]
  #[must_use]
  pub const fn sample_count(&self) -> usize {
    self.total_bytes / self.channel_byte_width
  }
  /// `[height, width, channels]`
  #[inline]
  #[must_use]
  pub const fn shape(&self) -> [usize; 3] {
    [self.height, self.width, self.channel_count]
  }
  /// Byte strides matching [`shape`](Self::shape).
  #[inline]
  #[must_use]
  pub const fn strides(&self) -> [usize; 3] {
    [self.row_stride, self.pixel_stride, self.channel_byte_width]
  }
}

/// Owned sample storage. 16-bit samples are in host byte order.
#[derive(Debug, PartialEq, Eq, Hash)]
pub enum Samples {
  U8(Vec<u8>),
  U16(Vec<u16>),
}
impl Samples {
  /// The samples as bytes.
  #[inline]
  #[must_use]
  pub fn as_bytes(&self) -> &[u8] {
    match self {
      Self::U8(v) => v,
      Self::U16(v) => cast_slice(v),
    }
  }
}

/// An exclusively owned pixel buffer and the layout that describes it.
///
/// This is deliberately not `Clone`: the memory is freed when the buffer drops,
/// unless it was handed off with [`into_parts`](Self::into_parts) or
/// [`into_samples`](Self::into_samples).
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct PixelBuffer {
  layout: BufferLayout,
  samples: Samples,
}
impl PixelBuffer {
  /// Allocates a zeroed buffer for the layout.
  ///
  /// ## Failure
  /// * [`OutOfMemory`](PngArrayError::OutOfMemory) if the allocator refuses.
  pub fn allocate(layout: BufferLayout) -> PngArrayResult<Self> {
    let samples = if layout.channel_byte_width == 2 {
      Samples::U16(zeroed_vec(layout.sample_count())?)
    } else {
      Samples::U8(zeroed_vec(layout.sample_count())?)
    };
    Ok(Self { layout, samples })
  }

  #[inline]
  #[must_use]
  pub const fn layout(&self) -> &BufferLayout {
    &self.layout
  }

  /// The samples as bytes.
  #[inline]
  #[must_use]
  pub fn as_bytes(&self) -> &[u8] {
    self.samples.as_bytes()
  }

  #[inline]
  pub fn as_bytes_mut(&mut self) -> &mut [u8] {
    match &mut self.samples {
      Samples::U8(v) => v,
      Samples::U16(v) => cast_slice_mut(v),
    }
  }

  #[inline]
  pub(crate) const fn samples(&self) -> &Samples {
    &self.samples
  }

  #[inline]
  pub(crate) fn samples_mut(&mut self) -> &mut Samples {
    &mut self.samples
  }

  /// The samples, if this is an 8-bit buffer.
  #[inline]
  #[must_use]
  pub fn as_u8(&self) -> Option<&[u8]> {
    match &self.samples {
      Samples::U8(v) => Some(v),
      Samples::U16(_) => None,
    }
  }

  /// The samples, if this is a 16-bit buffer.
  #[inline]
  #[must_use]
  pub fn as_u16(&self) -> Option<&[u16]> {
    match &self.samples {
      Samples::U16(v) => Some(v),
      Samples::U8(_) => None,
    }
  }

  /// One sample widened to `u16`, or `None` if out of bounds.
  #[inline]
  #[must_use]
  pub fn get(&self, y: usize, x: usize, c: usize) -> Option<u16> {
    let l = &self.layout;
    if y >= l.height || x >= l.width || c >= l.channel_count {
      return None;
    }
    let i = (y * l.width + x) * l.channel_count + c;
    match &self.samples {
      Samples::U8(v) => v.get(i).map(|s| u16::from(*s)),
      Samples::U16(v) => v.get(i).copied(),
    }
  }

  /// A borrowed view, ready to hand to the encoder.
  #[inline]
  #[must_use]
  pub fn as_image(&self) -> ImageRef<'_> {
    let samples = match &self.samples {
      Samples::U8(v) => SampleSlice::U8(v),
      Samples::U16(v) => SampleSlice::U16(v),
    };
    ImageRef { layout: self.layout, samples }
  }

  /// Transfers ownership of the memory out, along with its layout.
  #[inline]
  #[must_use]
  pub fn into_parts(self) -> (BufferLayout, Samples) {
    (self.layout, self.samples)
  }

  /// Transfers ownership of the memory out.
  #[inline]
  #[must_use]
  pub fn into_samples(self) -> Samples {
    self.samples
  }
}

/// Zeroed memory straight from the allocator, so pages the decode never
/// reaches are never touched.
fn zeroed_vec<T: Zeroable>(len: usize) -> PngArrayResult<Vec<T>> {
  try_zeroed_slice_box(len).map(Vec::from).map_err(|()| PngArrayError::OutOfMemory)
}

/// Borrowed samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleSlice<'a> {
  U8(&'a [u8]),
  U16(&'a [u16]),
}

/// A borrowed, validated pixel array.
///
/// The shape is `[height, width]` for single channel data or
/// `[height, width, channels]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageRef<'a> {
  layout: BufferLayout,
  samples: SampleSlice<'a>,
}
impl<'a> ImageRef<'a> {
  /// Views 8-bit samples with the given shape.
  pub fn from_u8(samples: &'a [u8], shape: &[usize]) -> PngArrayResult<Self> {
    Self::new(SampleSlice::U8(samples), samples.len(), 1, shape)
  }

  /// Views 16-bit samples (host byte order) with the given shape.
  pub fn from_u16(samples: &'a [u16], shape: &[usize]) -> PngArrayResult<Self> {
    Self::new(SampleSlice::U16(samples), samples.len(), 2, shape)
  }

  fn new(
    samples: SampleSlice<'a>, len: usize, channel_byte_width: usize, shape: &[usize],
  ) -> PngArrayResult<Self> {
    let (height, width, channels) = match *shape {
      [h, w] => (h, w, 1),
      [h, w, c] => (h, w, c),
      _ => {
        return Err(PngArrayError::InvalidArgument(alloc::format!(
          "pixel arrays must have 2 or 3 dimensions, got {}",
          shape.len()
        )))
      }
    };
    let layout = BufferLayout::new(height, width, channels, channel_byte_width)?;
    if layout.sample_count() != len {
      return Err(PngArrayError::InvalidArgument(alloc::format!(
        "shape {shape:?} needs {} samples, got {len}",
        layout.sample_count()
      )));
    }
    Ok(Self { layout, samples })
  }

  #[inline]
  #[must_use]
  pub const fn layout(&self) -> &BufferLayout {
    &self.layout
  }

  #[inline]
  #[must_use]
  pub const fn samples(&self) -> SampleSlice<'a> {
    self.samples
  }

  /// The samples as bytes.
  #[inline]
  #[must_use]
  pub fn as_bytes(&self) -> &'a [u8] {
    match self.samples {
      SampleSlice::U8(v) => v,
      SampleSlice::U16(v) => cast_slice(v),
    }
  }

  /// The bytes of row `y`, or `None` past the bottom.
  #[inline]
  #[must_use]
  pub fn row_bytes(&self, y: usize) -> Option<&'a [u8]> {
    let start = y.checked_mul(self.layout.row_stride)?;
    let end = start.checked_add(self.layout.row_stride)?;
    self.as_bytes().get(start..end)
  }
}
