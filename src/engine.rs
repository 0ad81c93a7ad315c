//! The narrow interface the orchestrators use to talk to a PNG codec engine.
//!
//! The crate's own engine lives in [`png`](crate::png), but the decode and
//! encode orchestrators only ever see these traits. Dropping a session
//! releases it.

use alloc::vec::Vec;

use crate::{ColorType, EngineError, ImageHeader};

/// The pixel formats the engine can write during a one-shot decode.
///
/// 16-bit formats are written in host byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DecodeFormat {
  /// 8-bit red, green, blue, alpha.
  Rgba8,
  /// 16-bit red, green, blue, alpha.
  Rgba16,
  /// 8-bit red, green, blue.
  Rgb8,
  /// 8-bit gray.
  G8,
  /// 8-bit gray, alpha.
  Ga8,
  /// 16-bit gray, alpha.
  Ga16,
  /// The image's own channels at its own depth. Samples below 8 bits are
  /// widened to one byte each without scaling; indexed images give indexes.
  Png,
}
impl DecodeFormat {
  /// Output bytes per pixel for an image with this header.
  #[inline]
  #[must_use]
  pub const fn bytes_per_pixel(self, header: &ImageHeader) -> usize {
    match self {
      Self::Rgba8 => 4,
      Self::Rgba16 => 8,
      Self::Rgb8 => 3,
      Self::G8 => 1,
      Self::Ga8 => 2,
      Self::Ga16 => 4,
      Self::Png => {
        let sample = if header.bit_depth == 16 { 2 } else { 1 };
        header.color_type.channel_count() * sample
      }
    }
  }

  /// If the engine can produce this format from the image in one shot.
  ///
  /// The gray formats are only accepted for gray sources without an alpha
  /// channel, and only at a matching depth class.
  #[inline]
  #[must_use]
  pub const fn accepts(self, header: &ImageHeader) -> bool {
    match self {
      Self::Rgba8 | Self::Rgba16 | Self::Rgb8 | Self::Png => true,
      Self::G8 | Self::Ga8 => {
        matches!(header.color_type, ColorType::Grayscale) && header.bit_depth <= 8
      }
      Self::Ga16 => matches!(header.color_type, ColorType::Grayscale) && header.bit_depth == 16,
    }
  }
}

/// Which source row the engine expects next during a progressive encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowInfo {
  /// Row index in the full image.
  pub row_num: u32,
  /// Adam7 pass (1 through 7), or 0 when not interlaced.
  pub pass: u8,
  /// Row index within the current pass.
  pub scanline_idx: u32,
}

/// What the engine says after accepting a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Progress {
  /// More rows are expected.
  More,
  /// That was the last row of the image.
  EndOfImage,
}

/// A decoding session over one PNG datastream.
pub trait DecodeEngine {
  /// Reads the signature and `IHDR`.
  fn header(&mut self) -> Result<ImageHeader, EngineError>;

  /// Scans the chunks up to the image data and reports the exact byte size
  /// of a whole-image decode in `fmt`.
  fn decoded_image_size(&mut self, fmt: DecodeFormat) -> Result<usize, EngineError>;

  /// Decodes the whole image into `out`, which must be exactly
  /// `decoded_image_size(fmt)` bytes.
  fn decode_image(&mut self, out: &mut [u8], fmt: DecodeFormat) -> Result<(), EngineError>;
}

/// An encoding session that writes into a buffer owned by the engine.
///
/// Input samples use the header's channels and depth, with 16-bit samples in
/// host byte order.
pub trait EncodeEngine {
  /// Sets the image header and the zlib level. Must come first.
  fn set_header(&mut self, header: ImageHeader, compression_level: u8) -> Result<(), EngineError>;

  /// Encodes a whole image in one call. With `finalize` the trailing chunks
  /// are written too.
  fn encode_image(&mut self, image: &[u8], finalize: bool) -> Result<(), EngineError>;

  /// Starts a progressive encode.
  fn begin_rows(&mut self) -> Result<(), EngineError>;

  /// The row expected by the next [`encode_row`](Self::encode_row) call, or
  /// `None` if no rows are expected.
  fn row_info(&self) -> Option<RowInfo>;

  /// Encodes one full-width source row.
  fn encode_row(&mut self, row: &[u8]) -> Result<Progress, EngineError>;

  /// Writes the chunks that follow the image data.
  fn encode_chunks(&mut self) -> Result<(), EngineError>;

  /// Moves the encoded datastream out of the engine. Works once.
  fn take_png_buffer(&mut self) -> Result<Vec<u8>, EngineError>;
}
