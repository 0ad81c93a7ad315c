use core::fmt::{Debug, Write};

use alloc::vec::Vec;

use super::crc32::chunk_crc;
use crate::EngineError;

/// The first eight bytes of a PNG datastream should match these bytes.
pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Checks if the PNG's initial 8 bytes are correct.
#[inline]
#[must_use]
pub const fn is_png_signature_correct(bytes: &[u8]) -> bool {
  matches!(bytes, [137, 80, 78, 71, 13, 10, 26, 10, ..])
}

/// The four ASCII bytes naming a chunk.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PngChunkType(pub [u8; 4]);
#[allow(nonstandard_style)]
impl PngChunkType {
  pub const IHDR: Self = Self(*b"IHDR");
  pub const PLTE: Self = Self(*b"PLTE");
  pub const IDAT: Self = Self(*b"IDAT");
  pub const IEND: Self = Self(*b"IEND");
  pub const tRNS: Self = Self(*b"tRNS");

  /// Ancillary chunks have a lowercase first letter and can be skipped.
  #[inline]
  #[must_use]
  pub const fn is_ancillary(self) -> bool {
    self.0[0] & 0x20 != 0
  }
}
impl Debug for PngChunkType {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    for b in self.0 {
      f.write_char(b as char)?;
    }
    Ok(())
  }
}

/// An unparsed chunk from a PNG.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawPngChunk<'b> {
  pub chunk_type: PngChunkType,
  pub data: &'b [u8],
  pub declared_crc: u32,
}
impl RawPngChunk<'_> {
  /// If the declared CRC matches the type and data.
  #[inline]
  #[must_use]
  pub fn crc_is_correct(&self) -> bool {
    chunk_crc(self.chunk_type.0, self.data) == self.declared_crc
  }
}
impl Debug for RawPngChunk<'_> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("RawPngChunk")
      .field("chunk_type", &self.chunk_type)
      .field("data", &(&self.data[..self.data.len().min(12)], self.data.len()))
      .field("declared_crc", &self.declared_crc)
      .finish()
  }
}

/// An iterator that produces successive raw chunks from PNG bytes.
///
/// A chunk whose declared length is over the limit, or that runs past the end
/// of the bytes, produces one error and then the iterator stops. Leftover
/// bytes too short to hold a chunk header end the iteration quietly.
///
/// `IDAT` chunks are exempt from the size limit. Their data is only ever
/// borrowed from the input, so a large one costs nothing to step over.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawPngChunkIter<'b> {
  bytes: &'b [u8],
  chunk_size_limit: usize,
}
impl<'b> RawPngChunkIter<'b> {
  /// Pass the full PNG bytes, it will skip the signature automatically.
  #[inline]
  pub const fn new(bytes: &'b [u8]) -> Self {
    match bytes {
      [_, _, _, _, _, _, _, _, rest @ ..] => Self { bytes: rest, chunk_size_limit: usize::MAX },
      _ => Self { bytes: &[], chunk_size_limit: usize::MAX },
    }
  }

  /// Refuse chunks other than `IDAT` that declare more than `limit` data
  /// bytes.
  #[inline]
  #[must_use]
  pub const fn with_chunk_size_limit(mut self, limit: usize) -> Self {
    self.chunk_size_limit = limit;
    self
  }
}
impl<'b> Iterator for RawPngChunkIter<'b> {
  type Item = Result<RawPngChunk<'b>, EngineError>;
  fn next(&mut self) -> Option<Self::Item> {
    let (len_bytes, rest) = self.bytes.split_first_chunk::<4>()?;
    let (type_bytes, rest) = rest.split_first_chunk::<4>()?;
    let chunk_type = PngChunkType(*type_bytes);
    let chunk_len = u32::from_be_bytes(*len_bytes) as usize;
    if chunk_len > self.chunk_size_limit && chunk_type != PngChunkType::IDAT {
      self.bytes = &[];
      return Some(Err(EngineError::ChunkLimit { len: chunk_len, limit: self.chunk_size_limit }));
    }
    if rest.len() < chunk_len.saturating_add(4) {
      self.bytes = &[];
      return Some(Err(EngineError::ChunkTruncated));
    }
    let (data, rest) = rest.split_at(chunk_len);
    let (crc_bytes, rest) = rest.split_at(4);
    self.bytes = rest;
    Some(Ok(RawPngChunk {
      chunk_type,
      data,
      declared_crc: u32::from_be_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]),
    }))
  }
}

/// Appends a complete chunk (length, type, data, CRC) to `out`.
///
/// ## Failure
/// * The data is longer than the 2^31-1 bytes a chunk can hold.
pub fn write_chunk(
  out: &mut Vec<u8>, chunk_type: PngChunkType, data: &[u8],
) -> Result<(), EngineError> {
  let len = u32::try_from(data.len())
    .ok()
    .filter(|len| *len <= crate::header::MAX_DIMENSION)
    .ok_or(EngineError::Overflow)?;
  out.try_reserve(data.len() + 12)?;
  out.extend_from_slice(&len.to_be_bytes());
  out.extend_from_slice(&chunk_type.0);
  out.extend_from_slice(data);
  out.extend_from_slice(&chunk_crc(chunk_type.0, data).to_be_bytes());
  Ok(())
}
