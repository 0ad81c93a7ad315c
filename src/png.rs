#![forbid(unsafe_code)]

//! The PNG codec engine.
//!
//! * [Portable Network Graphics Specification (Second Edition)][png-spec]
//!
//! [png-spec]: https://www.w3.org/TR/2003/REC-PNG-20031110/
//!
//! ## Engine Design Assumptions
//!
//! * The entire PNG encoded source data stream is a single byte slice.
//! * Each stage of the decoding process goes into a single output buffer which
//!   must be large enough to fit all of the output of that stage at once.
//! * Encoding writes into a buffer owned by the [`PngEncoder`], which is taken
//!   out once the trailing chunks are written.
//!
//! ## Decoding
//!
//! [`PngDecoder`] reads the header, scans the chunks up through the image
//! data, inflates the `IDAT` stream with
//! [`decompress_slice_iter_to_slice`](miniz_oxide::inflate::decompress_slice_iter_to_slice),
//! and then unfilters the data, writing each pixel straight to its spot in the
//! output buffer.
//!
//! ## Encoding
//!
//! [`PngEncoder`] accepts 8 and 16-bit gray, gray + alpha, RGB, and RGBA
//! images, either all at once or one full image row at a time. Interlaced
//! images take their rows in Adam7 pass order, and the encoder says which row
//! it wants next.
//!
//! ## Parsing Errors
//!
//! Quoting [section 13.2 of the PNG
//! spec](https://www.w3.org/TR/2003/REC-PNG-20031110/#13Decoders.Errors):
//!
//! > Errors that have little or no effect on the processing of the image may be
//! > ignored, while those that affect critical data shall be dealt with in a
//! > manner appropriate to the application.
//!
//! In our case, that means that we ignore:
//!
//! * Most of the chunk ordering rules.
//! * Chunks after the image data. Scanning stops once the `IDAT` run ends.
//! * Both of the checksum systems (CRC32 checks on individual chunks, and
//!   Adler32 checking on the Zlib compressed image data), unless
//!   [`set_check_crc`](crate::DecodeOptions::set_check_crc) asks for them.
//!
//! Resource limits are never ignored: a chunk over the size limit, or too many
//! ancillary bytes, stops the decode. `IDAT` chunks are only borrowed, so the
//! size limit doesn't apply to them, and the inflate buffer grows with the
//! data actually present.

mod adam7;
mod crc32;
mod decoder;
mod encoder;
mod filter;
mod raw_chunk;
mod samples;
mod unfilter;

pub use self::{
  adam7::{interlaced_pos_to_full_pos, reduced_image_dimensions},
  decoder::PngDecoder,
  encoder::PngEncoder,
  raw_chunk::{
    is_png_signature_correct, write_chunk, PngChunkType, RawPngChunk, RawPngChunkIter,
    PNG_SIGNATURE,
  },
};

#[cfg(test)]
mod tests;
