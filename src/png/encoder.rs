use alloc::vec::Vec;
use core::mem::take;

use miniz_oxide::deflate::core::{
  compress, create_comp_flags_from_zip_params, CompressorOxide, TDEFLFlush, TDEFLStatus,
};

use super::{
  adam7::{full_row_of, reduced_image_dimensions},
  filter::LineFilter,
  raw_chunk::{write_chunk, PngChunkType, PNG_SIGNATURE},
  samples::gather_line,
};
use crate::{ColorType, EncodeEngine, EngineError, ImageHeader, Progress, RowInfo};

/// Compressed bytes are held back until there's at least this much for an
/// `IDAT` chunk.
const IDAT_TARGET_SIZE: usize = 64 * 1024;

/// Size of the buffer the compressor writes into.
const DEFLATE_SCRATCH_SIZE: usize = 16 * 1024;

/// The next scanline expected during a row by row encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RowCursor {
  image_level: usize,
  scanline_idx: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
  Fresh,
  HeaderSet,
  Rows(RowCursor),
  ImageDone,
  Finished,
}

/// An encoding session writing a PNG into a buffer it owns.
///
/// The calls go in order: [`set_header`](EncodeEngine::set_header), then the
/// image data (all at once, or one row at a time), then the trailing chunks,
/// and then the output can be taken once. Calls out of order get
/// [`BadState`](EngineError::BadState).
pub struct PngEncoder {
  stage: Stage,
  header: Option<ImageHeader>,
  compression_level: u8,
  compressor: Option<CompressorOxide>,
  filter: LineFilter,
  line: Vec<u8>,
  scratch: Vec<u8>,
  pending: Vec<u8>,
  out: Vec<u8>,
  taken: bool,
}
impl core::fmt::Debug for PngEncoder {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("PngEncoder")
      .field("stage", &self.stage)
      .field("header", &self.header)
      .field("compression_level", &self.compression_level)
      .field("pending", &self.pending.len())
      .field("out", &self.out.len())
      .finish()
  }
}
impl Default for PngEncoder {
  fn default() -> Self {
    Self::new()
  }
}
impl PngEncoder {
  /// A fresh session with an empty output buffer.
  #[inline]
  #[must_use]
  pub fn new() -> Self {
    Self {
      stage: Stage::Fresh,
      header: None,
      compression_level: crate::DEFAULT_COMPRESSION_LEVEL,
      compressor: None,
      filter: LineFilter::default(),
      line: Vec::new(),
      scratch: Vec::new(),
      pending: Vec::new(),
      out: Vec::new(),
      taken: false,
    }
  }

  fn header_or_bad_state(&self) -> Result<ImageHeader, EngineError> {
    self.header.ok_or(EngineError::BadState)
  }

  /// Stored bytes in one full source row.
  fn row_len(header: &ImageHeader) -> usize {
    (header.width as usize) * (header.bits_per_pixel() / 8)
  }

  /// The first non-empty scanline at or after `image_level`.
  fn first_row_from(header: &ImageHeader, image_level: usize) -> Option<RowCursor> {
    let mut levels = if header.is_interlaced() { image_level.max(1)..8 } else { image_level..1 };
    let dimensions = reduced_image_dimensions(header.width, header.height);
    levels
      .find(|level| dimensions[*level].0 > 0 && dimensions[*level].1 > 0)
      .map(|image_level| RowCursor { image_level, scanline_idx: 0 })
  }

  fn next_row(header: &ImageHeader, cursor: RowCursor) -> Option<RowCursor> {
    let (_, reduced_height) =
      reduced_image_dimensions(header.width, header.height)[cursor.image_level];
    if cursor.scanline_idx + 1 < reduced_height {
      Some(RowCursor { scanline_idx: cursor.scanline_idx + 1, ..cursor })
    } else {
      Self::first_row_from(header, cursor.image_level + 1)
    }
  }

  /// Resets the filter history for the reduced image the cursor is in.
  fn start_image_level(
    &mut self, header: &ImageHeader, image_level: usize,
  ) -> Result<(), EngineError> {
    let (reduced_width, _) = reduced_image_dimensions(header.width, header.height)[image_level];
    let line_len = header.bytes_per_scanline(reduced_width).ok_or(EngineError::Overflow)?;
    log::trace!("starting image level {image_level}, {line_len} bytes per line");
    self.filter.reset(line_len)
  }

  /// Writes out the held compressed bytes as an `IDAT` once there's enough of
  /// them, or right away with `all`.
  fn flush_idat(&mut self, all: bool) -> Result<(), EngineError> {
    if self.pending.len() >= IDAT_TARGET_SIZE || (all && !self.pending.is_empty()) {
      write_chunk(&mut self.out, PngChunkType::IDAT, &self.pending)?;
      self.pending.clear();
    }
    Ok(())
  }
}

/// Runs `input` through the compressor, appending all output to `pending`.
fn deflate_into(
  compressor: &mut CompressorOxide, mut input: &[u8], flush: TDEFLFlush, scratch: &mut [u8],
  pending: &mut Vec<u8>,
) -> Result<(), EngineError> {
  let finishing = matches!(flush, TDEFLFlush::Finish);
  loop {
    let (status, bytes_in, bytes_out) = compress(compressor, input, scratch, flush);
    input = input.get(bytes_in..).ok_or(EngineError::Deflate)?;
    pending.try_reserve(bytes_out)?;
    pending.extend_from_slice(&scratch[..bytes_out]);
    match status {
      TDEFLStatus::Done => return Ok(()),
      TDEFLStatus::Okay => {
        if !finishing && input.is_empty() && bytes_out < scratch.len() {
          return Ok(());
        }
        if bytes_in == 0 && bytes_out == 0 {
          return Err(EngineError::Deflate);
        }
      }
      TDEFLStatus::BadParam | TDEFLStatus::PutBufFailed => return Err(EngineError::Deflate),
    }
  }
}

impl EncodeEngine for PngEncoder {
  fn set_header(&mut self, header: ImageHeader, compression_level: u8) -> Result<(), EngineError> {
    if self.stage != Stage::Fresh {
      return Err(EngineError::BadState);
    }
    // checks everything the decoder checks.
    let header = ImageHeader::try_from(&header.to_ihdr_bytes()[..])?;
    if header.color_type == ColorType::Indexed || !matches!(header.bit_depth, 8 | 16) {
      return Err(EngineError::Format);
    }
    if compression_level > 9 {
      return Err(EngineError::Format);
    }
    self.header = Some(header);
    self.compression_level = compression_level;
    self.stage = Stage::HeaderSet;
    Ok(())
  }

  fn encode_image(&mut self, image: &[u8], finalize: bool) -> Result<(), EngineError> {
    let header = self.header_or_bad_state()?;
    if self.stage != Stage::HeaderSet {
      return Err(EngineError::BadState);
    }
    let row_len = Self::row_len(&header);
    let expected = row_len.checked_mul(header.height as usize).ok_or(EngineError::Overflow)?;
    if image.len() != expected {
      return Err(EngineError::BufferSize { expected, actual: image.len() });
    }
    self.begin_rows()?;
    while let Some(info) = self.row_info() {
      let start = (info.row_num as usize) * row_len;
      self.encode_row(&image[start..start + row_len])?;
    }
    if finalize {
      self.encode_chunks()?;
    }
    Ok(())
  }

  fn begin_rows(&mut self) -> Result<(), EngineError> {
    let header = self.header_or_bad_state()?;
    if self.stage != Stage::HeaderSet {
      return Err(EngineError::BadState);
    }
    let cursor = Self::first_row_from(&header, 0).ok_or(EngineError::BadState)?;
    log::debug!(
      "encoding {}x{} depth {} {:?} {:?} at level {}",
      header.width,
      header.height,
      header.bit_depth,
      header.color_type,
      header.interlace_method,
      self.compression_level
    );
    self.out.try_reserve(PNG_SIGNATURE.len())?;
    self.out.extend_from_slice(&PNG_SIGNATURE);
    write_chunk(&mut self.out, PngChunkType::IHDR, &header.to_ihdr_bytes())?;

    let flags = create_comp_flags_from_zip_params(i32::from(self.compression_level), 1, 0);
    self.compressor = Some(CompressorOxide::new(flags));
    self.filter = LineFilter::new(self.compression_level > 0);
    self.scratch.try_reserve_exact(DEFLATE_SCRATCH_SIZE)?;
    self.scratch.resize(DEFLATE_SCRATCH_SIZE, 0);
    self.start_image_level(&header, cursor.image_level)?;
    self.stage = Stage::Rows(cursor);
    Ok(())
  }

  fn row_info(&self) -> Option<RowInfo> {
    match self.stage {
      Stage::Rows(RowCursor { image_level, scanline_idx }) => Some(RowInfo {
        row_num: full_row_of(image_level, scanline_idx),
        pass: image_level as u8,
        scanline_idx,
      }),
      _ => None,
    }
  }

  fn encode_row(&mut self, row: &[u8]) -> Result<Progress, EngineError> {
    let header = self.header_or_bad_state()?;
    let Stage::Rows(cursor) = self.stage else {
      return Err(EngineError::BadState);
    };
    let expected = Self::row_len(&header);
    if row.len() != expected {
      return Err(EngineError::RowLength { expected, actual: row.len() });
    }
    log::trace!("level {} line {}", cursor.image_level, cursor.scanline_idx);

    gather_line(&header, cursor.image_level, row, &mut self.line)?;
    let bpp = header.filter_chunk_size();
    let Self { compressor, filter, line, scratch, pending, .. } = self;
    let compressor = compressor.as_mut().ok_or(EngineError::BadState)?;
    let filtered = filter.filter(line, bpp)?;
    deflate_into(compressor, filtered, TDEFLFlush::None, scratch, pending)?;

    match Self::next_row(&header, cursor) {
      Some(next) => {
        if next.image_level != cursor.image_level {
          self.start_image_level(&header, next.image_level)?;
        }
        self.stage = Stage::Rows(next);
        self.flush_idat(false)?;
        Ok(Progress::More)
      }
      None => {
        let Self { compressor, scratch, pending, .. } = self;
        let compressor = compressor.as_mut().ok_or(EngineError::BadState)?;
        deflate_into(compressor, &[], TDEFLFlush::Finish, scratch, pending)?;
        self.flush_idat(true)?;
        self.compressor = None;
        self.stage = Stage::ImageDone;
        Ok(Progress::EndOfImage)
      }
    }
  }

  fn encode_chunks(&mut self) -> Result<(), EngineError> {
    if self.stage != Stage::ImageDone {
      return Err(EngineError::BadState);
    }
    write_chunk(&mut self.out, PngChunkType::IEND, &[])?;
    self.stage = Stage::Finished;
    log::debug!("encoded {} bytes", self.out.len());
    Ok(())
  }

  fn take_png_buffer(&mut self) -> Result<Vec<u8>, EngineError> {
    if self.stage != Stage::Finished || self.taken {
      return Err(EngineError::NoOutput);
    }
    self.taken = true;
    Ok(take(&mut self.out))
  }
}
