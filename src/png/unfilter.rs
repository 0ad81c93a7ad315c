use core::mem::take;

use super::{adam7::reduced_image_dimensions, filter::reconstruct_line};
use crate::{EngineError, ImageHeader};

/// Given the `header`, `decompressed` buffer, and a per-line `op`, unfilters
/// the data and passes each line to the `op` as the unfiltering occurs.
///
/// Each call to the `op` gets `|image_level, reduced_width, reduced_y, line|`
/// as arguments. The image level is 0 for a non-interlaced image, or 1 through
/// 7 for the reduced images of an interlaced one, and `line` holds the stored
/// bytes of one scanline (without the filter byte).
///
/// The data is unfiltered in place, and each filter byte is reset to the
/// "no filter" setting as well.
///
/// ## Failure
/// * You **are** allowed to pass a `decompressed` buffer larger than just the
///   decompressed data itself. Only the bytes the header calls for are used.
/// * A buffer that's too small gives
///   [`ImageDataTruncated`](EngineError::ImageDataTruncated), possibly after
///   some lines were already passed to the `op`.
/// * Any error from the `op` stops the work and is passed along.
pub(crate) fn unfilter_image<F>(
  header: &ImageHeader, mut decompressed: &mut [u8], mut op: F,
) -> Result<(), EngineError>
where
  F: FnMut(usize, u32, u32, &[u8]) -> Result<(), EngineError>,
{
  let bpp = header.filter_chunk_size();

  // Interlaced data is the 1st through 7th reduced images, otherwise it's
  // only the 0th "reduced" image (the full image). After this point the two
  // cases are handled the same way.
  let levels = if header.is_interlaced() { 1..8 } else { 0..1 };
  let dimensions = reduced_image_dimensions(header.width, header.height);

  for image_level in levels {
    let (reduced_width, reduced_height) = dimensions[image_level];
    if reduced_width == 0 || reduced_height == 0 {
      // the full image can't be empty, but a reduced image can be.
      continue;
    }

    let bytes_per_filterline = header
      .bytes_per_scanline(reduced_width)
      .and_then(|b| b.checked_add(1))
      .ok_or(EngineError::Overflow)?;
    let bytes_used_this_image = bytes_per_filterline
      .checked_mul(reduced_height as usize)
      .ok_or(EngineError::Overflow)?;
    if decompressed.len() < bytes_used_this_image {
      return Err(EngineError::ImageDataTruncated);
    }
    let (these_bytes, more_bytes) = take(&mut decompressed).split_at_mut(bytes_used_this_image);
    decompressed = more_bytes;

    // the line above the first line of each reduced image is all zeros.
    let mut prev: &[u8] = &[];
    for (reduced_y, filterline) in these_bytes.chunks_exact_mut(bytes_per_filterline).enumerate() {
      let Some((filter_type, line)) = filterline.split_first_mut() else {
        return Err(EngineError::ImageDataTruncated);
      };
      reconstruct_line(*filter_type, line, prev, bpp)?;
      *filter_type = 0;
      op(image_level, reduced_width, reduced_y as u32, line)?;
      prev = line;
    }
  }
  Ok(())
}
