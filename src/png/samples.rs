//! Moving samples between PNG's stored layout and the output layouts.

use alloc::vec::Vec;

use bitfrob::u8_replicate_bits;

use super::adam7::{column_pattern, interlaced_pos_to_full_pos};
use crate::{ColorType, DecodeFormat, EngineError, ImageHeader};

/// Reads sample `index` of a stored scanline, unscaled.
///
/// Samples below 8 bits are packed from the high bits down, 16-bit samples
/// are big-endian.
#[inline]
fn stored_sample(line: &[u8], bit_depth: u8, index: usize) -> Option<u16> {
  match bit_depth {
    16 => {
      let i = index.checked_mul(2)?;
      Some(u16::from_be_bytes([*line.get(i)?, *line.get(i + 1)?]))
    }
    8 => line.get(index).map(|b| u16::from(*b)),
    1 | 2 | 4 => {
      let depth = usize::from(bit_depth);
      let bit = index.checked_mul(depth)?;
      let byte = *line.get(bit / 8)?;
      let down_shift = 8 - depth - (bit % 8);
      let mask = (1_u8 << depth) - 1;
      Some(u16::from((byte >> down_shift) & mask))
    }
    _ => None,
  }
}

/// Scales a stored sample to the full 16-bit range.
#[inline]
fn to_u16_range(bit_depth: u8, v: u16) -> u16 {
  match bit_depth {
    16 => v,
    8 => v * 257,
    _ => u16::from(u8_replicate_bits(u32::from(bit_depth), v as u8)) * 257,
  }
}

/// What the `tRNS` chunk says, if there was one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transparency<'b> {
  None,
  /// This stored gray value is fully transparent.
  Gray(u16),
  /// This stored RGB value is fully transparent.
  Rgb([u16; 3]),
  /// Alpha for each palette entry, missing entries are opaque.
  Indexed(&'b [u8]),
}
impl<'b> Transparency<'b> {
  /// Interprets `tRNS` data for the image's color type. Data of the wrong
  /// size is ignored.
  pub(crate) fn parse(color_type: ColorType, data: Option<&'b [u8]>) -> Self {
    match (color_type, data) {
      (ColorType::Grayscale, Some([y0, y1])) => Self::Gray(u16::from_be_bytes([*y0, *y1])),
      (ColorType::TrueColor, Some([r0, r1, g0, g1, b0, b1])) => Self::Rgb([
        u16::from_be_bytes([*r0, *r1]),
        u16::from_be_bytes([*g0, *g1]),
        u16::from_be_bytes([*b0, *b1]),
      ]),
      (ColorType::Indexed, Some(alphas)) => Self::Indexed(alphas),
      _ => Self::None,
    }
  }
}

/// Writes unfiltered scanlines into a whole-image output buffer.
pub(crate) struct PixelWriter<'o, 'b> {
  header: ImageHeader,
  fmt: DecodeFormat,
  palette: &'b [[u8; 3]],
  transparency: Transparency<'b>,
  out: &'o mut [u8],
  out_bpp: usize,
}
impl<'o, 'b> PixelWriter<'o, 'b> {
  /// `out` must already be sized for the whole image in `fmt`.
  pub(crate) fn new(
    header: ImageHeader, fmt: DecodeFormat, palette: &'b [[u8; 3]],
    transparency: Transparency<'b>, out: &'o mut [u8],
  ) -> Self {
    Self { header, fmt, palette, transparency, out, out_bpp: fmt.bytes_per_pixel(&header) }
  }

  /// Writes every pixel of one reduced scanline to its full image position.
  pub(crate) fn write_line(
    &mut self, image_level: usize, reduced_width: u32, reduced_y: u32, line: &[u8],
  ) -> Result<(), EngineError> {
    let channels = self.header.color_type.channel_count();
    let mut raw = [0_u16; 4];
    for reduced_x in 0..reduced_width {
      let (x, y) = interlaced_pos_to_full_pos(image_level, reduced_x, reduced_y);
      let first = (reduced_x as usize) * channels;
      for (c, r) in raw.iter_mut().enumerate().take(channels) {
        *r = stored_sample(line, self.header.bit_depth, first + c)
          .ok_or(EngineError::ImageDataTruncated)?;
      }
      let i = (y as usize)
        .checked_mul(self.header.width as usize)
        .and_then(|p| p.checked_add(x as usize))
        .and_then(|p| p.checked_mul(self.out_bpp))
        .ok_or(EngineError::Overflow)?;
      let out_len = self.out.len();
      let pixel = self
        .out
        .get_mut(i..i + self.out_bpp)
        .ok_or(EngineError::BufferSize { expected: i + self.out_bpp, actual: out_len })?;
      if self.fmt == DecodeFormat::Png {
        write_native(pixel, self.header.bit_depth, &raw[..channels]);
      } else {
        let rgba = rgba16(&self.header, self.palette, self.transparency, raw)?;
        write_converted(pixel, self.fmt, rgba);
      }
    }
    Ok(())
  }
}

/// The stored channels, one byte each below 16 bits, host-endian at 16.
fn write_native(pixel: &mut [u8], bit_depth: u8, raw: &[u16]) {
  if bit_depth == 16 {
    for (dst, v) in pixel.chunks_exact_mut(2).zip(raw) {
      dst.copy_from_slice(&v.to_ne_bytes());
    }
  } else {
    for (dst, v) in pixel.iter_mut().zip(raw) {
      *dst = *v as u8;
    }
  }
}

/// Expands one stored pixel to 16-bit RGBA.
fn rgba16(
  header: &ImageHeader, palette: &[[u8; 3]], transparency: Transparency<'_>, raw: [u16; 4],
) -> Result<[u16; 4], EngineError> {
  let depth = header.bit_depth;
  let s = |v: u16| to_u16_range(depth, v);
  Ok(match header.color_type {
    ColorType::Grayscale => {
      let y = s(raw[0]);
      let a = if transparency == Transparency::Gray(raw[0]) { 0 } else { u16::MAX };
      [y, y, y, a]
    }
    ColorType::TrueColor => {
      let [r, g, b, _] = raw;
      let a = if transparency == Transparency::Rgb([r, g, b]) { 0 } else { u16::MAX };
      [s(r), s(g), s(b), a]
    }
    ColorType::Indexed => {
      let index = usize::from(raw[0]);
      let [r, g, b] = *palette.get(index).ok_or(EngineError::PaletteIndex)?;
      let a = match transparency {
        Transparency::Indexed(alphas) => alphas.get(index).copied().unwrap_or(u8::MAX),
        _ => u8::MAX,
      };
      [u16::from(r) * 257, u16::from(g) * 257, u16::from(b) * 257, u16::from(a) * 257]
    }
    ColorType::GrayscaleAlpha => {
      let y = s(raw[0]);
      [y, y, y, s(raw[1])]
    }
    ColorType::TrueColorAlpha => [s(raw[0]), s(raw[1]), s(raw[2]), s(raw[3])],
  })
}

fn write_converted(pixel: &mut [u8], fmt: DecodeFormat, [r, g, b, a]: [u16; 4]) {
  let hi = |v: u16| (v >> 8) as u8;
  match fmt {
    DecodeFormat::Rgba8 => pixel.copy_from_slice(&[hi(r), hi(g), hi(b), hi(a)]),
    DecodeFormat::Rgb8 => pixel.copy_from_slice(&[hi(r), hi(g), hi(b)]),
    DecodeFormat::G8 => pixel[0] = hi(r),
    DecodeFormat::Ga8 => pixel.copy_from_slice(&[hi(r), hi(a)]),
    DecodeFormat::Rgba16 => {
      for (dst, v) in pixel.chunks_exact_mut(2).zip([r, g, b, a]) {
        dst.copy_from_slice(&v.to_ne_bytes());
      }
    }
    DecodeFormat::Ga16 => {
      for (dst, v) in pixel.chunks_exact_mut(2).zip([r, a]) {
        dst.copy_from_slice(&v.to_ne_bytes());
      }
    }
    DecodeFormat::Png => (),
  }
}

/// Gathers the pixels of one full image row that belong to `image_level`,
/// in stored order (16-bit samples go from host order to big-endian).
///
/// Only 8 and 16-bit depths are written, so every pixel is whole bytes.
pub(crate) fn gather_line(
  header: &ImageHeader, image_level: usize, row: &[u8], out: &mut Vec<u8>,
) -> Result<(), EngineError> {
  let bytes_per_pixel = header.bits_per_pixel() / 8;
  let (start, step) = column_pattern(image_level);
  out.clear();
  for x in (start..header.width).step_by(step as usize) {
    let i = (x as usize) * bytes_per_pixel;
    let pixel = row.get(i..i + bytes_per_pixel).ok_or(EngineError::RowLength {
      expected: (header.width as usize) * bytes_per_pixel,
      actual: row.len(),
    })?;
    out.try_reserve(bytes_per_pixel)?;
    if header.bit_depth == 16 {
      for pair in pixel.chunks_exact(2) {
        out.extend_from_slice(&u16::from_ne_bytes([pair[0], pair[1]]).to_be_bytes());
      }
    } else {
      out.extend_from_slice(pixel);
    }
  }
  Ok(())
}
