//! Driving a decode engine into a [`PixelBuffer`].

use crate::{
  format::{resolve, DecodeTarget},
  layout::Samples,
  BufferLayout, DecodeEngine, DecodeFormat, EngineError, ImageHeader, PixelBuffer, PixelFormat,
  PngArrayError, PngArrayResult,
};

/// Decodes the whole image from `engine` in the requested format.
///
/// The engine is used for exactly one whole-image decode. If anything fails
/// the partly written buffer is dropped and no pixels are returned.
pub fn decode<E: DecodeEngine>(
  engine: &mut E, requested: PixelFormat,
) -> PngArrayResult<PixelBuffer> {
  let header = engine.header().map_err(PngArrayError::MalformedHeader)?;
  let resolved = resolve(requested, &header)?;
  let engine_format = resolved.target.engine_format();
  let size = engine.decoded_image_size(engine_format).map_err(PngArrayError::SizeQueryFailed)?;

  match resolved.target {
    DecodeTarget::Direct(fmt) => {
      let layout = BufferLayout::for_format(&header, resolved.format)?;
      let mut buffer = allocate_checked(layout, size)?;
      engine.decode_image(buffer.as_bytes_mut(), fmt).map_err(PngArrayError::DecodeFailed)?;
      log::debug!("decoded {:?} as {:?}", layout.shape(), resolved.format);
      Ok(buffer)
    }
    DecodeTarget::NativeFallback => {
      let native = native_layout(&header)?;
      let mut staging = allocate_checked(native, size)?;
      engine
        .decode_image(staging.as_bytes_mut(), DecodeFormat::Png)
        .map_err(PngArrayError::DecodeFailed)?;
      let layout = BufferLayout::for_format(&header, resolved.format)?;
      let mut buffer = PixelBuffer::allocate(layout)?;
      convert_native(&staging, &mut buffer)?;
      log::debug!("decoded {:?} as {:?} from the native layout", layout.shape(), resolved.format);
      Ok(buffer)
    }
  }
}

/// Allocates the buffer after checking that the engine agrees on its size.
fn allocate_checked(layout: BufferLayout, engine_size: usize) -> PngArrayResult<PixelBuffer> {
  if layout.total_bytes() != engine_size {
    return Err(PngArrayError::SizeQueryFailed(EngineError::BufferSize {
      expected: layout.total_bytes(),
      actual: engine_size,
    }));
  }
  PixelBuffer::allocate(layout)
}

/// The layout of the engine's native output: the image's own channels, one
/// byte per sample below 16 bits.
fn native_layout(header: &ImageHeader) -> PngArrayResult<BufferLayout> {
  let channel_byte_width = if header.bit_depth == 16 { 2 } else { 1 };
  BufferLayout::new(
    header.height as usize,
    header.width as usize,
    header.color_type.channel_count(),
    channel_byte_width,
  )
}

/// One gray or gray + alpha pixel of the native layout, scaled to 16 bits.
/// A missing alpha channel is opaque.
#[inline]
fn native_pixel(samples: &Samples, channels: usize, pixel: usize) -> Option<[u16; 2]> {
  let at = |i: usize| match samples {
    Samples::U8(v) => v.get(i).map(|s| u16::from(*s) * 257),
    Samples::U16(v) => v.get(i).copied(),
  };
  let i = pixel.checked_mul(channels)?;
  let gray = at(i)?;
  let alpha = if channels == 2 { at(i + 1)? } else { u16::MAX };
  Some([gray, alpha])
}

/// Builds a gray target from the native layout of a gray source.
fn convert_native(native: &PixelBuffer, out: &mut PixelBuffer) -> PngArrayResult<()> {
  let src_channels = native.layout().channel_count();
  let dst_channels = out.layout().channel_count();
  if src_channels > 2 || dst_channels > 2 {
    return Err(PngArrayError::InvalidArgument(alloc::format!(
      "no native conversion from {src_channels} to {dst_channels} channels"
    )));
  }
  let missing = || PngArrayError::DecodeFailed(EngineError::ImageDataTruncated);
  let src = native.samples();
  match out.samples_mut() {
    Samples::U8(dst) => {
      for (p, px) in dst.chunks_exact_mut(dst_channels).enumerate() {
        let [gray, alpha] = native_pixel(src, src_channels, p).ok_or_else(missing)?;
        for (d, v) in px.iter_mut().zip([gray, alpha]) {
          *d = (v >> 8) as u8;
        }
      }
    }
    Samples::U16(dst) => {
      for (p, px) in dst.chunks_exact_mut(dst_channels).enumerate() {
        let [gray, alpha] = native_pixel(src, src_channels, p).ok_or_else(missing)?;
        for (d, v) in px.iter_mut().zip([gray, alpha]) {
          *d = v;
        }
      }
    }
  }
  Ok(())
}
