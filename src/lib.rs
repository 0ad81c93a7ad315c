#![no_std]
#![cfg_attr(docs_rs, feature(doc_cfg))]

//! A crate for moving PNG data in and out of dense pixel arrays.
//!
//! Decoding gives a [`PixelBuffer`]: a `height × width × channels` array of
//! `u8` or `u16` samples with known byte strides, in a [`PixelFormat`] that
//! either you pick or the crate picks from the image header. Encoding takes an
//! [`ImageRef`] view of your samples and gives back PNG bytes, written all at
//! once or one row at a time (optionally Adam7 interlaced).
//!
//! ```no_run
//! # fn main() -> Result<(), pngarray::PngArrayError> {
//! # let png_bytes: &[u8] = &[];
//! let pixels = pngarray::decode_image(png_bytes, pngarray::PixelFormat::Auto)?;
//! let [height, width, channels] = pixels.layout().shape();
//! let again = pngarray::encode_image(pixels.as_image(), pngarray::EncodeMode::Plain, 6)?;
//! # Ok(())
//! # }
//! ```
//!
//! The crate logs through the [`log`] facade and never installs a logger.

extern crate alloc;

use alloc::vec::Vec;

#[cfg(target_pointer_width = "16")]
compile_error!("this crate assumes 32-bit or bigger pointers!");

mod error;
pub use error::*;

mod header;
pub use header::*;

mod options;
pub use options::*;

pub mod engine;
pub use engine::{DecodeEngine, DecodeFormat, EncodeEngine, Progress, RowInfo};

pub mod format;
pub use format::PixelFormat;

pub mod layout;
pub use layout::{BufferLayout, ImageRef, PixelBuffer, SampleSlice, Samples};

pub mod png;

pub mod decode;
pub mod encode;

/// Decodes a whole PNG using the default [`DecodeOptions`].
#[inline]
pub fn decode_image(png: &[u8], format: PixelFormat) -> PngArrayResult<PixelBuffer> {
  decode_image_with(png, format, &DecodeOptions::default())
}

/// Decodes a whole PNG.
///
/// ## Failure
/// * [`MalformedHeader`](PngArrayError::MalformedHeader) if the signature or
///   `IHDR` is bad.
/// * [`UnsupportedFormat`](PngArrayError::UnsupportedFormat) if `format` can't
///   be produced from this image.
/// * [`SizeQueryFailed`](PngArrayError::SizeQueryFailed) for chunk trouble
///   before the image data, including the chunk limits in `options`.
/// * [`DecodeFailed`](PngArrayError::DecodeFailed) if the image data is bad.
pub fn decode_image_with(
  png: &[u8], format: PixelFormat, options: &DecodeOptions,
) -> PngArrayResult<PixelBuffer> {
  let mut engine = png::PngDecoder::new(png).with_options(options);
  decode::decode(&mut engine, format)
}

/// Encodes a pixel array as a PNG.
///
/// `compression_level` goes from 0 (store) to 9 (smallest).
#[inline]
pub fn encode_image(
  image: ImageRef<'_>, mode: EncodeMode, compression_level: u8,
) -> PngArrayResult<Vec<u8>> {
  let options = EncodeOptions::default().set_mode(mode).set_compression_level(compression_level);
  encode_image_with(image, &options)
}

/// Encodes a pixel array as a PNG.
///
/// ## Failure
/// * [`InvalidArgument`](PngArrayError::InvalidArgument) for a bad compression
///   level or an empty image.
/// * [`EncodeFailed`](PngArrayError::EncodeFailed) if the engine fails.
pub fn encode_image_with(image: ImageRef<'_>, options: &EncodeOptions) -> PngArrayResult<Vec<u8>> {
  let mut engine = png::PngEncoder::new();
  encode::encode(&mut engine, &image, options)
}
