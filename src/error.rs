use alloc::{collections::TryReserveError, string::String};

use crate::{header::ColorType, PixelFormat};

/// A status reported by the PNG codec engine.
///
/// These are the engine's own failure codes. The orchestrators wrap them into
/// a [`PngArrayError`] that says which stage of the work failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
  /// The first eight bytes aren't the PNG signature.
  #[error("missing PNG signature")]
  Signature,
  /// The first chunk isn't a 13 byte `IHDR`.
  #[error("first chunk is not an IHDR")]
  NoHeader,
  /// The `IHDR` is present but holds illegal values.
  #[error("invalid IHDR: {0}")]
  InvalidHeader(&'static str),
  /// A chunk claims more bytes than the stream holds.
  #[error("chunk data is truncated")]
  ChunkTruncated,
  /// A chunk's CRC doesn't match (only checked when enabled).
  #[error("chunk CRC mismatch")]
  ChunkCrc,
  /// A single chunk is larger than the configured chunk size limit.
  #[error("chunk of {len} bytes exceeds the limit of {limit} bytes")]
  ChunkLimit { len: usize, limit: usize },
  /// Stored ancillary chunks would exceed the configured cache limit.
  #[error("ancillary chunks exceed the cache limit of {limit} bytes")]
  CacheLimit { limit: usize },
  /// A critical chunk this engine doesn't know.
  #[error("unknown critical chunk {0:?}")]
  UnknownCriticalChunk([u8; 4]),
  /// An indexed image without a `PLTE`, or a malformed `PLTE`.
  #[error("missing or malformed palette")]
  Palette,
  /// No `IDAT` chunk was found.
  #[error("no image data")]
  NoImageData,
  /// The requested output format can't be produced for this image.
  #[error("output format not supported for this image")]
  Format,
  /// The zlib stream couldn't be inflated.
  #[error("zlib decompression failed")]
  Inflate,
  /// The zlib stream ended before all scanlines were produced.
  #[error("image data is truncated")]
  ImageDataTruncated,
  /// A scanline used a filter type other than 0 through 4.
  #[error("illegal filter type {0}")]
  FilterType(u8),
  /// A palette index points past the end of the palette.
  #[error("palette index out of range")]
  PaletteIndex,
  /// The allocator couldn't give us enough space.
  #[error("allocation failed")]
  Alloc,
  /// A checked math operation failed.
  #[error("arithmetic overflow")]
  Overflow,
  /// The caller's buffer has the wrong length.
  #[error("buffer is {actual} bytes, expected {expected}")]
  BufferSize { expected: usize, actual: usize },
  /// The deflate compressor reported a failure.
  #[error("zlib compression failed")]
  Deflate,
  /// The call doesn't fit the session's current state.
  #[error("operation not valid in the current session state")]
  BadState,
  /// A submitted row has the wrong length.
  #[error("row is {actual} bytes, expected {expected}")]
  RowLength { expected: usize, actual: usize },
  /// The encoded stream was already taken, or never produced.
  #[error("no encoded output available")]
  NoOutput,
}
impl From<TryReserveError> for EngineError {
  #[inline]
  fn from(_: TryReserveError) -> Self {
    Self::Alloc
  }
}

/// An error from the `pngarray` crate.
///
/// Each variant names the stage that failed. Where the codec engine reported
/// the failure its status is kept as the error source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PngArrayError {
  /// The signature or `IHDR` couldn't be read.
  #[error("malformed PNG header")]
  MalformedHeader(#[source] EngineError),

  /// The requested pixel format can't be produced for this image.
  #[error("cannot decode {color_type:?} at bit depth {bit_depth} as {requested:?}")]
  UnsupportedFormat { color_type: ColorType, bit_depth: u8, requested: PixelFormat },

  /// Pixel buffers must have 1 through 4 channels.
  #[error("unsupported channel count {0}, expected 1 through 4")]
  UnsupportedChannelCount(usize),

  /// The buffer size doesn't fit in `usize`.
  #[error("image dimensions overflow the addressable size")]
  SizeOverflow,

  /// The allocator couldn't give us enough space.
  #[error("out of memory")]
  OutOfMemory,

  /// The engine couldn't report the decoded size.
  #[error("could not determine the decoded image size")]
  SizeQueryFailed(#[source] EngineError),

  /// The engine failed while decoding pixels.
  #[error("could not decode image")]
  DecodeFailed(#[source] EngineError),

  /// The engine failed while encoding pixels.
  #[error("could not encode image")]
  EncodeFailed(#[source] EngineError),

  /// An argument was outside its valid range.
  #[error("invalid argument: {0}")]
  InvalidArgument(String),
}
impl From<TryReserveError> for PngArrayError {
  #[inline]
  fn from(_: TryReserveError) -> Self {
    Self::OutOfMemory
  }
}

/// Shorthand for results from this crate.
pub type PngArrayResult<T> = Result<T, PngArrayError>;
