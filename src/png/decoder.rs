use alloc::vec::Vec;

use miniz_oxide::inflate::{
  core::{
    decompress,
    inflate_flags::{
      TINFL_FLAG_HAS_MORE_INPUT, TINFL_FLAG_IGNORE_ADLER32, TINFL_FLAG_PARSE_ZLIB_HEADER,
      TINFL_FLAG_USING_NON_WRAPPING_OUTPUT_BUF,
    },
    DecompressorOxide,
  },
  TINFLStatus,
};

use super::{
  raw_chunk::{is_png_signature_correct, PngChunkType, RawPngChunk, RawPngChunkIter},
  samples::{PixelWriter, Transparency},
  unfilter::unfilter_image,
};
use crate::{ColorType, DecodeEngine, DecodeFormat, DecodeOptions, EngineError, ImageHeader};

/// What the chunks before (and including) the image data had to say.
#[derive(Debug, Clone, Default)]
struct ChunkScan<'b> {
  palette: &'b [[u8; 3]],
  trns: Option<&'b [u8]>,
  idat: Vec<&'b [u8]>,
}

/// A decoding session over PNG bytes held in memory.
///
/// Nothing is read until it's asked for. The header and the chunk scan are
/// each done once and then kept for later calls.
#[derive(Debug, Clone)]
pub struct PngDecoder<'b> {
  bytes: &'b [u8],
  options: DecodeOptions,
  header: Option<ImageHeader>,
  scan: Option<ChunkScan<'b>>,
}
impl<'b> PngDecoder<'b> {
  /// Starts a session over a complete PNG datastream.
  #[inline]
  #[must_use]
  pub fn new(bytes: &'b [u8]) -> Self {
    Self { bytes, options: DecodeOptions::default(), header: None, scan: None }
  }

  /// Uses these options for all later reading.
  #[inline]
  #[must_use]
  pub fn with_options(mut self, options: &DecodeOptions) -> Self {
    self.options = *options;
    self
  }

  /// Sets the largest length a single non-`IDAT` chunk may declare, and the
  /// largest total of ancillary chunk bytes the scan will keep around.
  #[inline]
  pub fn set_chunk_limits(&mut self, chunk_size: usize, chunk_cache: usize) {
    self.options = self.options.set_chunk_size_limit(chunk_size).set_chunk_cache_limit(chunk_cache);
  }

  fn chunks(&self) -> RawPngChunkIter<'b> {
    RawPngChunkIter::new(self.bytes).with_chunk_size_limit(self.options.get_chunk_size_limit())
  }

  fn checked(&self, chunk: RawPngChunk<'b>) -> Result<RawPngChunk<'b>, EngineError> {
    if self.options.get_check_crc() && !chunk.crc_is_correct() {
      return Err(EngineError::ChunkCrc);
    }
    Ok(chunk)
  }

  /// Walks the chunks after the `IHDR` through the end of the `IDAT` run.
  fn scan(&mut self) -> Result<&ChunkScan<'b>, EngineError> {
    let header = self.header()?;
    if self.scan.is_none() {
      let cache_limit = self.options.get_chunk_cache_limit();
      let mut cache_used = 0_usize;
      let mut scan = ChunkScan::default();
      for chunk in self.chunks().skip(1) {
        let chunk = self.checked(chunk?)?;
        log::trace!("chunk {:?}, {} bytes", chunk.chunk_type, chunk.data.len());
        if !scan.idat.is_empty() && chunk.chunk_type != PngChunkType::IDAT {
          // the image data must be one unbroken run, so we're done.
          break;
        }
        if chunk.chunk_type.is_ancillary() {
          cache_used = cache_used.saturating_add(chunk.data.len());
          if cache_used > cache_limit {
            return Err(EngineError::CacheLimit { limit: cache_limit });
          }
        }
        match chunk.chunk_type {
          PngChunkType::IDAT => scan.idat.push(chunk.data),
          PngChunkType::IEND => break,
          PngChunkType::PLTE => {
            let entries: &[[u8; 3]] =
              bytemuck::try_cast_slice(chunk.data).map_err(|_| EngineError::Palette)?;
            if entries.is_empty() || entries.len() > 256 {
              return Err(EngineError::Palette);
            }
            scan.palette = entries;
          }
          PngChunkType::tRNS => scan.trns = Some(chunk.data),
          PngChunkType::IHDR => return Err(EngineError::InvalidHeader("duplicate IHDR")),
          other if !other.is_ancillary() => {
            return Err(EngineError::UnknownCriticalChunk(other.0));
          }
          _ => (),
        }
      }
      if scan.idat.is_empty() {
        return Err(EngineError::NoImageData);
      }
      if header.color_type == ColorType::Indexed && scan.palette.is_empty() {
        return Err(EngineError::Palette);
      }
      self.scan = Some(scan);
    }
    self.scan.as_ref().ok_or(EngineError::BadState)
  }
}

/// The first size of the inflate buffer, unless the image needs less.
const INFLATE_START_SIZE: usize = 32 * 1024;

/// Inflates the `IDAT` run into exactly `zlib_len` bytes of filtered
/// scanlines.
///
/// The buffer starts small and doubles as output arrives, so a stream that
/// ends early only costs about as much memory as it actually produced.
/// Anything past `zlib_len` is ignored.
pub(super) fn inflate_image_data(
  idat: &[&[u8]], zlib_len: usize, ignore_adler32: bool,
) -> Result<Vec<u8>, EngineError> {
  let base_flags = TINFL_FLAG_PARSE_ZLIB_HEADER
    | TINFL_FLAG_USING_NON_WRAPPING_OUTPUT_BUF
    | if ignore_adler32 { TINFL_FLAG_IGNORE_ADLER32 } else { 0 };
  let r = &mut DecompressorOxide::new();
  let mut out: Vec<u8> = Vec::new();
  let mut out_pos = 0_usize;
  for (i, mut in_buf) in idat.iter().copied().enumerate() {
    let has_more = i + 1 < idat.len();
    let flags = base_flags | if has_more { TINFL_FLAG_HAS_MORE_INPUT } else { 0 };
    loop {
      if out_pos == out.len() && out.len() < zlib_len {
        let new_len = out.len().saturating_mul(2).clamp(INFLATE_START_SIZE.min(zlib_len), zlib_len);
        out.try_reserve_exact(new_len - out.len())?;
        out.resize(new_len, 0);
      }
      let (status, bytes_read, bytes_written) = decompress(r, in_buf, &mut out, out_pos, flags);
      in_buf = in_buf.get(bytes_read..).ok_or(EngineError::Inflate)?;
      out_pos += bytes_written;
      match status {
        TINFLStatus::Done if out_pos < zlib_len => return Err(EngineError::ImageDataTruncated),
        TINFLStatus::Done => return Ok(out),
        TINFLStatus::HasMoreOutput if out.len() >= zlib_len => {
          // the buffer is full, any extra data after the last scanline is unused.
          log::trace!("ignoring image data past the last scanline");
          return Ok(out);
        }
        TINFLStatus::HasMoreOutput => continue,
        TINFLStatus::NeedsMoreInput if has_more => break,
        TINFLStatus::NeedsMoreInput | TINFLStatus::FailedCannotMakeProgress => {
          return Err(EngineError::ImageDataTruncated)
        }
        e => {
          log::debug!("inflate failed: {e:?}");
          return Err(EngineError::Inflate);
        }
      }
    }
  }
  Err(EngineError::ImageDataTruncated)
}

impl DecodeEngine for PngDecoder<'_> {
  fn header(&mut self) -> Result<ImageHeader, EngineError> {
    if let Some(header) = self.header {
      return Ok(header);
    }
    if !is_png_signature_correct(self.bytes) {
      return Err(EngineError::Signature);
    }
    let first = self.chunks().next().ok_or(EngineError::NoHeader)??;
    if first.chunk_type != PngChunkType::IHDR {
      return Err(EngineError::NoHeader);
    }
    let header = ImageHeader::try_from(self.checked(first)?.data)?;
    self.header = Some(header);
    Ok(header)
  }

  fn decoded_image_size(&mut self, fmt: DecodeFormat) -> Result<usize, EngineError> {
    let header = self.header()?;
    if !fmt.accepts(&header) {
      return Err(EngineError::Format);
    }
    self.scan()?;
    (header.width as usize)
      .checked_mul(header.height as usize)
      .and_then(|pixels| pixels.checked_mul(fmt.bytes_per_pixel(&header)))
      .ok_or(EngineError::Overflow)
  }

  fn decode_image(&mut self, out: &mut [u8], fmt: DecodeFormat) -> Result<(), EngineError> {
    let expected = self.decoded_image_size(fmt)?;
    if out.len() != expected {
      return Err(EngineError::BufferSize { expected, actual: out.len() });
    }
    let header = self.header()?;
    let ignore_adler32 = !self.options.get_check_crc();
    let scan = self.scan()?;

    let zlib_len = header.zlib_decompression_requirement().ok_or(EngineError::Overflow)?;
    let mut zlib_buffer = inflate_image_data(&scan.idat, zlib_len, ignore_adler32)?;

    let transparency = Transparency::parse(header.color_type, scan.trns);
    let mut writer = PixelWriter::new(header, fmt, scan.palette, transparency, out);
    unfilter_image(&header, &mut zlib_buffer, |level, reduced_width, reduced_y, line| {
      writer.write_line(level, reduced_width, reduced_y, line)
    })
  }
}
