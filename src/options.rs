//! Settings for decoding and encoding.

use alloc::format;

use crate::{PngArrayError, PngArrayResult};

/// The default limit for a single chunk, and for all stored ancillary chunks
/// together: 64 MiB.
pub const DEFAULT_CHUNK_LIMIT: usize = 64 * 1024 * 1024;

/// The default zlib compression level.
pub const DEFAULT_COMPRESSION_LEVEL: u8 = 6;

/// Options respected while reading PNG data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecodeOptions {
  /// Largest length any one chunk may declare.
  ///
  /// - Default value: 64 MiB
  chunk_size_limit: usize,
  /// Largest total of ancillary (non-critical) chunk bytes kept around while
  /// scanning up to the image data.
  ///
  /// - Default value: 64 MiB
  chunk_cache_limit: usize,
  /// Verify each chunk's CRC-32.
  ///
  /// - Default value: `false`, the data is used as-is.
  check_crc: bool,
}
impl Default for DecodeOptions {
  fn default() -> Self {
    Self {
      chunk_size_limit: DEFAULT_CHUNK_LIMIT,
      chunk_cache_limit: DEFAULT_CHUNK_LIMIT,
      check_crc: false,
    }
  }
}
impl DecodeOptions {
  /// Get the largest length a single chunk other than `IDAT` may declare.
  #[inline]
  pub const fn get_chunk_size_limit(&self) -> usize {
    self.chunk_size_limit
  }

  /// Get the limit on stored ancillary chunk bytes.
  #[inline]
  pub const fn get_chunk_cache_limit(&self) -> usize {
    self.chunk_cache_limit
  }

  /// Get whether chunk CRCs are verified.
  #[inline]
  pub const fn get_check_crc(&self) -> bool {
    self.check_crc
  }

  /// Set the largest length a single chunk other than `IDAT` may declare.
  pub fn set_chunk_size_limit(mut self, limit: usize) -> Self {
    self.chunk_size_limit = limit;
    self
  }

  /// Set the limit on stored ancillary chunk bytes.
  pub fn set_chunk_cache_limit(mut self, limit: usize) -> Self {
    self.chunk_cache_limit = limit;
    self
  }

  /// Set both chunk limits to the same value.
  pub fn set_chunk_limits(self, limit: usize) -> Self {
    self.set_chunk_size_limit(limit).set_chunk_cache_limit(limit)
  }

  /// Set whether chunk CRCs are verified.
  pub fn set_check_crc(mut self, yes: bool) -> Self {
    self.check_crc = yes;
    self
  }
}

/// How rows are handed to the encoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EncodeMode {
  /// The whole buffer goes to the engine in one call.
  #[default]
  Plain = 0,
  /// Rows are submitted one at a time, top to bottom.
  Progressive = 1,
  /// Rows are submitted one at a time in Adam7 pass order, as directed by the
  /// engine, and the output is interlaced.
  ProgressiveInterlaced = 2,
}
impl EncodeMode {
  /// If this mode produces an interlaced PNG.
  #[inline]
  #[must_use]
  pub const fn is_interlaced(self) -> bool {
    matches!(self, Self::ProgressiveInterlaced)
  }
}
impl TryFrom<u8> for EncodeMode {
  type Error = PngArrayError;
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      0 => Self::Plain,
      1 => Self::Progressive,
      2 => Self::ProgressiveInterlaced,
      other => {
        return Err(PngArrayError::InvalidArgument(format!(
          "encode mode {other} is not valid, must be 0 through 2"
        )))
      }
    })
  }
}

/// Options respected while writing PNG data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncodeOptions {
  /// - Default value: [`EncodeMode::Plain`]
  mode: EncodeMode,
  /// zlib level, 0 (store) through 9 (smallest).
  ///
  /// - Default value: 6
  compression_level: u8,
}
impl Default for EncodeOptions {
  fn default() -> Self {
    Self { mode: EncodeMode::Plain, compression_level: DEFAULT_COMPRESSION_LEVEL }
  }
}
impl EncodeOptions {
  /// Get the encode mode.
  #[inline]
  pub const fn get_mode(&self) -> EncodeMode {
    self.mode
  }

  /// Get the compression level.
  #[inline]
  pub const fn get_compression_level(&self) -> u8 {
    self.compression_level
  }

  /// Set the encode mode.
  pub fn set_mode(mut self, mode: EncodeMode) -> Self {
    self.mode = mode;
    self
  }

  /// Set the compression level.
  ///
  /// The value isn't checked here; out of range levels are refused when the
  /// encode runs.
  pub fn set_compression_level(mut self, level: u8) -> Self {
    self.compression_level = level;
    self
  }

  pub(crate) fn validate(&self) -> PngArrayResult<()> {
    if self.compression_level > 9 {
      return Err(PngArrayError::InvalidArgument(format!(
        "compression level {} is not valid, must be 0 through 9",
        self.compression_level
      )));
    }
    Ok(())
  }
}
