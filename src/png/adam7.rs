//! Adam7 interlacing geometry.
//!
//! The interlacing scheme converts a full image into 7 reduced images, each
//! taking the pixels marked with its number in this repeating 8x8 pattern:
//!
//! ```text
//! 1 6 4 6 2 6 4 6
//! 7 7 7 7 7 7 7 7
//! 5 6 5 6 5 6 5 6
//! 7 7 7 7 7 7 7 7
//! 3 6 4 6 3 6 4 6
//! 7 7 7 7 7 7 7 7
//! 5 6 5 6 5 6 5 6
//! 7 7 7 7 7 7 7 7
//! ```
//!
//! Throughout the engine "image level" 0 means the full, non-interlaced image,
//! and levels 1 through 7 are the reduced images.

/// Column of the first pixel of each reduced image, indexed by `level - 1`.
const START_X: [u32; 7] = [0, 4, 0, 2, 0, 1, 0];
/// Row of the first pixel of each reduced image.
const START_Y: [u32; 7] = [0, 0, 4, 0, 2, 0, 1];
/// Column step between pixels of each reduced image.
const STEP_X: [u32; 7] = [8, 8, 4, 4, 2, 2, 1];
/// Row step between rows of each reduced image.
const STEP_Y: [u32; 7] = [8, 8, 8, 4, 4, 2, 2];

/// Given the dimensions of the full PNG image, computes the size of each
/// reduced image.
///
/// The output uses index 0 as the base image size, and indexes 1 through 7 for
/// the size of reduced images 1 through 7. A reduced image can have a zero
/// width or height, in which case it holds no scanlines at all.
#[inline]
#[must_use]
pub const fn reduced_image_dimensions(full_width: u32, full_height: u32) -> [(u32, u32); 8] {
  let mut out = [(full_width, full_height); 8];
  let mut i = 0;
  while i < 7 {
    out[i + 1] = (
      reduced_extent(full_width, START_X[i], STEP_X[i]),
      reduced_extent(full_height, START_Y[i], STEP_Y[i]),
    );
    i += 1;
  }
  out
}

/// How many of `0..full` land on `start + k * step`.
#[inline]
const fn reduced_extent(full: u32, start: u32, step: u32) -> u32 {
  if full <= start {
    0
  } else {
    (full - start).div_ceil(step)
  }
}

/// Converts a reduced image location into the full image location.
///
/// Level 0 passes the position through unchanged.
///
/// ## Panics
/// * If the image level given exceeds 7.
#[inline]
#[must_use]
pub const fn interlaced_pos_to_full_pos(
  image_level: usize, reduced_x: u32, reduced_y: u32,
) -> (u32, u32) {
  if image_level == 0 {
    return (reduced_x, reduced_y);
  }
  let i = image_level - 1;
  (START_X[i] + reduced_x * STEP_X[i], START_Y[i] + reduced_y * STEP_Y[i])
}

/// The full image row holding scanline `reduced_y` of an image level.
#[inline]
#[must_use]
pub const fn full_row_of(image_level: usize, reduced_y: u32) -> u32 {
  interlaced_pos_to_full_pos(image_level, 0, reduced_y).1
}

/// The full image columns sampled by an image level, as `(start, step)`.
#[inline]
#[must_use]
pub const fn column_pattern(image_level: usize) -> (u32, u32) {
  if image_level == 0 {
    (0, 1)
  } else {
    (START_X[image_level - 1], STEP_X[image_level - 1])
  }
}
