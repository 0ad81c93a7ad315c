//! Driving an encode engine from an [`ImageRef`].

use alloc::{format, vec::Vec};

use crate::{
  header::MAX_DIMENSION, BufferLayout, ColorType, EncodeEngine, EncodeMode, EncodeOptions,
  EngineError, ImageHeader, ImageRef, InterlaceMethod, PngArrayError, PngArrayResult, Progress,
};

/// The PNG header that stores a buffer with this layout.
///
/// ## Failure
/// * Zero or oversized dimensions are an
///   [`InvalidArgument`](PngArrayError::InvalidArgument).
pub fn header_for_layout(layout: &BufferLayout, mode: EncodeMode) -> PngArrayResult<ImageHeader> {
  let dimension = |name: &str, v: usize| match u32::try_from(v) {
    Ok(v) if (1..=MAX_DIMENSION).contains(&v) => Ok(v),
    _ => Err(PngArrayError::InvalidArgument(format!(
      "image {name} {v} is outside 1 through {MAX_DIMENSION}"
    ))),
  };
  let color_type = ColorType::from_channel_count(layout.channel_count())
    .ok_or(PngArrayError::UnsupportedChannelCount(layout.channel_count()))?;
  Ok(ImageHeader {
    width: dimension("width", layout.width())?,
    height: dimension("height", layout.height())?,
    bit_depth: (8 * layout.channel_byte_width()) as u8,
    color_type,
    compression_method: 0,
    filter_method: 0,
    interlace_method: if mode.is_interlaced() {
      InterlaceMethod::Adam7
    } else {
      InterlaceMethod::None
    },
  })
}

/// A row by row encode in progress.
///
/// The engine decides which source row comes next. The session looks that row
/// up in the image and hands it over, until the engine says the image is done.
pub struct EncodeSession<'e, 'i, E: EncodeEngine> {
  engine: &'e mut E,
  image: ImageRef<'i>,
  interlaced: bool,
}
impl<'e, 'i, E: EncodeEngine> EncodeSession<'e, 'i, E> {
  /// Starts the rows on an engine that already has its header.
  pub fn begin(engine: &'e mut E, image: ImageRef<'i>, interlaced: bool) -> PngArrayResult<Self> {
    engine.begin_rows().map_err(PngArrayError::EncodeFailed)?;
    Ok(Self { engine, image, interlaced })
  }

  /// Feeds rows until the engine reports the end of the image, then writes
  /// the trailing chunks.
  pub fn run(self) -> PngArrayResult<()> {
    let mut rows_sent = 0_usize;
    loop {
      let info =
        self.engine.row_info().ok_or(PngArrayError::EncodeFailed(EngineError::BadState))?;
      log::trace!(
        "sending row {} (pass {}, line {}), interlaced: {}",
        info.row_num,
        info.pass,
        info.scanline_idx,
        self.interlaced
      );
      let row = self
        .image
        .row_bytes(info.row_num as usize)
        .ok_or(PngArrayError::EncodeFailed(EngineError::BadState))?;
      rows_sent += 1;
      match self.engine.encode_row(row).map_err(PngArrayError::EncodeFailed)? {
        Progress::More => continue,
        Progress::EndOfImage => break,
      }
    }
    log::debug!("sent {rows_sent} rows");
    self.engine.encode_chunks().map_err(PngArrayError::EncodeFailed)
  }
}

/// Encodes the image with `engine`, which must be a fresh session.
///
/// The engine's output buffer is taken out once everything is written. If
/// anything fails, nothing is returned and the engine keeps (and later frees)
/// whatever it had written.
pub fn encode<E: EncodeEngine>(
  engine: &mut E, image: &ImageRef<'_>, options: &EncodeOptions,
) -> PngArrayResult<Vec<u8>> {
  options.validate()?;
  let mode = options.get_mode();
  let header = header_for_layout(image.layout(), mode)?;
  engine
    .set_header(header, options.get_compression_level())
    .map_err(PngArrayError::EncodeFailed)?;
  match mode {
    EncodeMode::Plain => {
      engine.encode_image(image.as_bytes(), true).map_err(PngArrayError::EncodeFailed)?;
    }
    EncodeMode::Progressive | EncodeMode::ProgressiveInterlaced => {
      EncodeSession::begin(engine, *image, mode.is_interlaced())?.run()?;
    }
  }
  engine.take_png_buffer().map_err(PngArrayError::EncodeFailed)
}
