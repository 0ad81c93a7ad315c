//! Reading the image header without decoding any pixels.

use crate::{
  png::{reduced_image_dimensions, PngDecoder},
  DecodeEngine, DecodeOptions, EngineError, PngArrayError, PngArrayResult,
};

/// The largest width or height that PNG allows.
pub const MAX_DIMENSION: u32 = (1 << 31) - 1;

/// The types of color that PNG supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ColorType {
  /// Greyscale
  Grayscale = 0,
  /// Red, Green, Blue
  TrueColor = 2,
  /// Index into a palette.
  ///
  /// The palette will have RGB8 data. There may optionally be a transparency
  /// chunk.
  Indexed = 3,
  /// Greyscale + Alpha
  GrayscaleAlpha = 4,
  /// Red, Green, Blue, Alpha
  TrueColorAlpha = 6,
}
impl ColorType {
  /// The number of channels stored per pixel in this type of color.
  #[inline]
  #[must_use]
  pub const fn channel_count(self) -> usize {
    match self {
      Self::Grayscale => 1,
      Self::TrueColor => 3,
      Self::Indexed => 1,
      Self::GrayscaleAlpha => 2,
      Self::TrueColorAlpha => 4,
    }
  }

  /// If the bit depth is legal for this color type.
  #[inline]
  #[must_use]
  pub const fn allows_bit_depth(self, bit_depth: u8) -> bool {
    match self {
      Self::Grayscale => matches!(bit_depth, 1 | 2 | 4 | 8 | 16),
      Self::Indexed => matches!(bit_depth, 1 | 2 | 4 | 8),
      Self::TrueColor | Self::GrayscaleAlpha | Self::TrueColorAlpha => {
        matches!(bit_depth, 8 | 16)
      }
    }
  }

  /// The color type used to store a buffer with this many channels.
  #[inline]
  #[must_use]
  pub const fn from_channel_count(channels: usize) -> Option<Self> {
    Some(match channels {
      1 => Self::Grayscale,
      2 => Self::GrayscaleAlpha,
      3 => Self::TrueColor,
      4 => Self::TrueColorAlpha,
      _ => return None,
    })
  }
}
impl TryFrom<u8> for ColorType {
  type Error = EngineError;
  #[inline]
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      0 => Self::Grayscale,
      2 => Self::TrueColor,
      3 => Self::Indexed,
      4 => Self::GrayscaleAlpha,
      6 => Self::TrueColorAlpha,
      _ => return Err(EngineError::InvalidHeader("unknown color type")),
    })
  }
}

/// How the scanlines of the image data are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum InterlaceMethod {
  /// Scanlines go top to bottom.
  None = 0,
  /// Seven reduced images of increasing resolution.
  Adam7 = 1,
}

/// Image Header
///
/// Everything the `IHDR` chunk says about the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageHeader {
  /// width in pixels
  pub width: u32,
  /// height in pixels
  pub height: u32,
  /// bits per channel
  pub bit_depth: u8,
  /// pixel color type
  pub color_type: ColorType,
  /// always 0 (zlib) in a valid PNG
  pub compression_method: u8,
  /// always 0 (adaptive filtering) in a valid PNG
  pub filter_method: u8,
  /// scanline ordering
  pub interlace_method: InterlaceMethod,
}
impl ImageHeader {
  /// If the image data is stored as Adam7 reduced images.
  #[inline]
  #[must_use]
  pub const fn is_interlaced(&self) -> bool {
    matches!(self.interlace_method, InterlaceMethod::Adam7)
  }

  /// Bits used by one pixel in the PNG's stored format.
  #[inline]
  #[must_use]
  pub const fn bits_per_pixel(&self) -> usize {
    (self.bit_depth as usize) * self.color_type.channel_count()
  }

  /// Filtering works on whole pixels when pixels are a byte or more, and on
  /// single bytes otherwise.
  #[inline]
  #[must_use]
  pub const fn filter_chunk_size(&self) -> usize {
    let bytes = self.bits_per_pixel() / 8;
    if bytes == 0 {
      1
    } else {
      bytes
    }
  }

  /// Stored bytes per scanline of the given width, not counting the filter
  /// byte. Partial bytes at the end of a line round up.
  #[inline]
  pub fn bytes_per_scanline(&self, width: u32) -> Option<usize> {
    let bits = self.bits_per_pixel().checked_mul(width as usize)?;
    Some(bits / 8 + usize::from(bits % 8 != 0))
  }

  /// Gets the buffer size required to hold the inflated (still filtered)
  /// image data.
  ///
  /// Interlaced images add up all of the non-empty reduced images.
  pub fn zlib_decompression_requirement(&self) -> Option<usize> {
    let temp_bytes_for_image = |width: u32, height: u32| -> Option<usize> {
      if width == 0 || height == 0 {
        return Some(0);
      }
      let filterline = self.bytes_per_scanline(width)?.checked_add(1)?;
      filterline.checked_mul(height as usize)
    };
    if self.is_interlaced() {
      reduced_image_dimensions(self.width, self.height)
        .into_iter()
        .skip(1)
        .try_fold(0_usize, |total, (w, h)| total.checked_add(temp_bytes_for_image(w, h)?))
    } else {
      temp_bytes_for_image(self.width, self.height)
    }
  }

  /// The 13 byte `IHDR` payload for this header.
  #[must_use]
  pub fn to_ihdr_bytes(&self) -> [u8; 13] {
    let mut out = [0_u8; 13];
    out[0..4].copy_from_slice(&self.width.to_be_bytes());
    out[4..8].copy_from_slice(&self.height.to_be_bytes());
    out[8] = self.bit_depth;
    out[9] = self.color_type as u8;
    out[10] = self.compression_method;
    out[11] = self.filter_method;
    out[12] = self.interlace_method as u8;
    out
  }
}
impl TryFrom<&[u8]> for ImageHeader {
  type Error = EngineError;
  fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
    match value {
      [w0, w1, w2, w3, h0, h1, h2, h3, bit_depth, color_type, compression_method, filter_method, interlace_method] =>
      {
        let width = u32::from_be_bytes([*w0, *w1, *w2, *w3]);
        let height = u32::from_be_bytes([*h0, *h1, *h2, *h3]);
        if width == 0 || height == 0 {
          return Err(EngineError::InvalidHeader("width or height is zero"));
        }
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
          return Err(EngineError::InvalidHeader("width or height exceeds 2^31-1"));
        }
        let color_type = ColorType::try_from(*color_type)?;
        if !color_type.allows_bit_depth(*bit_depth) {
          return Err(EngineError::InvalidHeader("illegal bit depth for color type"));
        }
        if *compression_method != 0 {
          return Err(EngineError::InvalidHeader("unknown compression method"));
        }
        if *filter_method != 0 {
          return Err(EngineError::InvalidHeader("unknown filter method"));
        }
        let interlace_method = match interlace_method {
          0 => InterlaceMethod::None,
          1 => InterlaceMethod::Adam7,
          _ => return Err(EngineError::InvalidHeader("unknown interlace method")),
        };
        Ok(Self {
          width,
          height,
          bit_depth: *bit_depth,
          color_type,
          compression_method: *compression_method,
          filter_method: *filter_method,
          interlace_method,
        })
      }
      _ => Err(EngineError::NoHeader),
    }
  }
}

/// Reads the [`ImageHeader`] out of PNG bytes using the default options.
///
/// No image data is inflated.
#[inline]
pub fn read_header(png: &[u8]) -> PngArrayResult<ImageHeader> {
  read_header_with(png, &DecodeOptions::default())
}

/// Reads the [`ImageHeader`] out of PNG bytes.
///
/// The chunk limits from `options` are installed on the engine session before
/// anything is read, so an oversized `IHDR` claim is refused up front.
pub fn read_header_with(png: &[u8], options: &DecodeOptions) -> PngArrayResult<ImageHeader> {
  let mut decoder = PngDecoder::new(png).with_options(options);
  let header = decoder.header().map_err(PngArrayError::MalformedHeader)?;
  log::debug!(
    "header: {}x{} depth {} {:?} {:?}",
    header.width,
    header.height,
    header.bit_depth,
    header.color_type,
    header.interlace_method
  );
  Ok(header)
}
