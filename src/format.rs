//! Choosing the pixel format of a decode.
//!
//! There's two main factors with a pixel format here:
//! * **Channels:** gray, gray + alpha, RGB, or RGBA (1 through 4).
//! * **Channel width:** one byte (`u8`) or two bytes (`u16`) per channel.
//!
//! A request is either a concrete format, used as-is, or [`PixelFormat::Auto`],
//! which picks a format from the image header by table.
//!
//! ## Engine limitations
//!
//! The codec engine can't render every format from every image in one shot.
//! The gray formats are only produced from gray images without alpha, so
//! a gray + alpha image can't be decoded straight to `GrayAlpha8` or
//! `GrayAlpha16`, and there's no way to get a plain 16-bit gray or 16-bit RGB
//! output at all. These are carried as explicit rules:
//!
//! * 16-bit gray decodes as `GrayAlpha16` and 16-bit RGB as `Rgba16`, with an
//!   opaque alpha channel unless a `tRNS` chunk says otherwise.
//! * When the chosen format isn't accepted by the engine, the decode falls
//!   back to the engine's native layout followed by a conversion pass. That
//!   pass only knows 8 and 16-bit gray sources and the gray targets; anything
//!   else is an [`UnsupportedFormat`](crate::PngArrayError::UnsupportedFormat).
//!   The native path doesn't apply `tRNS`.

use crate::{ColorType, DecodeFormat, ImageHeader, PngArrayError, PngArrayResult};

/// The pixel formats a caller can ask a decode for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PixelFormat {
  /// Pick a format from the image header.
  #[default]
  Auto,
  /// 1 channel, `u8`
  Gray8,
  /// 2 channels, `u8`
  GrayAlpha8,
  /// 2 channels, `u16`
  GrayAlpha16,
  /// 3 channels, `u8`
  Rgb8,
  /// 4 channels, `u8`
  Rgba8,
  /// 4 channels, `u16`
  Rgba16,
}
impl PixelFormat {
  /// Every concrete format.
  pub const CONCRETE: [Self; 6] =
    [Self::Gray8, Self::GrayAlpha8, Self::GrayAlpha16, Self::Rgb8, Self::Rgba8, Self::Rgba16];

  /// If this is the [`Auto`](Self::Auto) sentinel.
  #[inline]
  #[must_use]
  pub const fn is_auto(self) -> bool {
    matches!(self, Self::Auto)
  }

  /// Channels per pixel, or `None` for `Auto`.
  #[inline]
  #[must_use]
  pub const fn channel_count(self) -> Option<usize> {
    Some(match self {
      Self::Auto => return None,
      Self::Gray8 => 1,
      Self::GrayAlpha8 | Self::GrayAlpha16 => 2,
      Self::Rgb8 => 3,
      Self::Rgba8 | Self::Rgba16 => 4,
    })
  }

  /// Bytes per channel, or `None` for `Auto`.
  #[inline]
  #[must_use]
  pub const fn channel_byte_width(self) -> Option<usize> {
    Some(match self {
      Self::Auto => return None,
      Self::Gray8 | Self::GrayAlpha8 | Self::Rgb8 | Self::Rgba8 => 1,
      Self::GrayAlpha16 | Self::Rgba16 => 2,
    })
  }

  /// The engine format that writes exactly this layout, or `None` for `Auto`.
  #[inline]
  #[must_use]
  pub const fn decode_format(self) -> Option<DecodeFormat> {
    Some(match self {
      Self::Auto => return None,
      Self::Gray8 => DecodeFormat::G8,
      Self::GrayAlpha8 => DecodeFormat::Ga8,
      Self::GrayAlpha16 => DecodeFormat::Ga16,
      Self::Rgb8 => DecodeFormat::Rgb8,
      Self::Rgba8 => DecodeFormat::Rgba8,
      Self::Rgba16 => DecodeFormat::Rgba16,
    })
  }

  /// The format [`Auto`](Self::Auto) picks for an image.
  #[must_use]
  pub const fn auto_for(header: &ImageHeader) -> Self {
    let wide = header.bit_depth > 8;
    match (header.color_type, wide) {
      (ColorType::Grayscale, false) => Self::Gray8,
      (ColorType::Grayscale, true) => Self::GrayAlpha16,
      (ColorType::TrueColor, false) => Self::Rgb8,
      (ColorType::TrueColor, true) => Self::Rgba16,
      (ColorType::Indexed, _) => Self::Rgb8,
      (ColorType::GrayscaleAlpha, false) => Self::GrayAlpha8,
      (ColorType::GrayscaleAlpha, true) => Self::GrayAlpha16,
      (ColorType::TrueColorAlpha, false) => Self::Rgba8,
      (ColorType::TrueColorAlpha, true) => Self::Rgba16,
    }
  }
}

/// How the engine is driven to produce a resolved format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeTarget {
  /// The engine writes the final layout directly.
  Direct(DecodeFormat),
  /// The engine writes its native layout, then a conversion pass builds the
  /// final layout.
  NativeFallback,
}
impl DecodeTarget {
  /// The format the engine is asked for.
  #[inline]
  #[must_use]
  pub const fn engine_format(self) -> DecodeFormat {
    match self {
      Self::Direct(fmt) => fmt,
      Self::NativeFallback => DecodeFormat::Png,
    }
  }
}

/// A concrete pixel format plus the plan for getting it out of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolved {
  /// Never [`PixelFormat::Auto`].
  pub format: PixelFormat,
  /// How the engine gets driven.
  pub target: DecodeTarget,
}

/// If the native-layout conversion pass can build `format` from this image.
#[inline]
#[must_use]
pub const fn native_fallback_supports(header: &ImageHeader, format: PixelFormat) -> bool {
  let gray_source = matches!(header.color_type, ColorType::Grayscale | ColorType::GrayscaleAlpha);
  let byte_depth = matches!(header.bit_depth, 8 | 16);
  let gray_target =
    matches!(format, PixelFormat::Gray8 | PixelFormat::GrayAlpha8 | PixelFormat::GrayAlpha16);
  gray_source && byte_depth && gray_target
}

/// Resolves a requested format against an image header.
pub fn resolve(requested: PixelFormat, header: &ImageHeader) -> PngArrayResult<Resolved> {
  let format = match requested {
    PixelFormat::Auto => PixelFormat::auto_for(header),
    concrete => concrete,
  };
  let unsupported = || PngArrayError::UnsupportedFormat {
    color_type: header.color_type,
    bit_depth: header.bit_depth,
    requested,
  };
  let direct = format.decode_format().ok_or_else(unsupported)?;
  let target = if direct.accepts(header) {
    DecodeTarget::Direct(direct)
  } else if native_fallback_supports(header, format) {
    log::warn!(
      "engine can't write {format:?} from {:?} depth {}, using the native layout fallback",
      header.color_type,
      header.bit_depth
    );
    DecodeTarget::NativeFallback
  } else {
    return Err(unsupported());
  };
  log::debug!("resolved {requested:?} to {format:?} via {target:?}");
  Ok(Resolved { format, target })
}
