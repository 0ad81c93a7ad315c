//! Scanline filters.
//!
//! From the PNG spec:
//!
//! > Filters are applied to **bytes**, not to pixels, regardless of the bit
//! > depth or color type of the image.
//!
//! The "previous pixel" is `bpp` bytes back (at least 1), and on the first
//! line of each reduced image the previous line is taken to be all zeros.

use alloc::vec::Vec;

use crate::EngineError;

#[inline]
#[must_use]
pub(crate) const fn paeth_predict(a: u8, b: u8, c: u8) -> u8 {
  let a_ = a as i32;
  let b_ = b as i32;
  let c_ = c as i32;
  let p: i32 = a_ + b_ - c_;
  let pa = (p - a_).abs();
  let pb = (p - b_).abs();
  let pc = (p - c_).abs();
  // The order of these tests is fixed by the PNG spec, don't rearrange them.
  if pa <= pb && pa <= pc {
    a
  } else if pb <= pc {
    b
  } else {
    c
  }
}

/// Undoes the filter on one line in place. An empty `prev` means "first
/// line".
pub(crate) fn reconstruct_line(
  filter_type: u8, line: &mut [u8], prev: &[u8], bpp: usize,
) -> Result<(), EngineError> {
  let up = |i: usize| prev.get(i).copied().unwrap_or(0);
  match filter_type {
    0 => (),
    1 => {
      // Sub
      for i in bpp..line.len() {
        line[i] = line[i].wrapping_add(line[i - bpp]);
      }
    }
    2 => {
      // Up
      for (i, x) in line.iter_mut().enumerate() {
        *x = x.wrapping_add(up(i));
      }
    }
    3 => {
      // Average
      for i in 0..line.len() {
        let a = if i >= bpp { line[i - bpp] } else { 0 };
        line[i] = line[i].wrapping_add(((u16::from(a) + u16::from(up(i))) / 2) as u8);
      }
    }
    4 => {
      // Paeth
      for i in 0..line.len() {
        let (a, c) = if i >= bpp { (line[i - bpp], up(i - bpp)) } else { (0, 0) };
        line[i] = line[i].wrapping_add(paeth_predict(a, up(i), c));
      }
    }
    other => return Err(EngineError::FilterType(other)),
  }
  Ok(())
}

/// Applies one filter type to `line`, writing the filtered bytes to `out`.
fn apply_filter(filter_type: u8, line: &[u8], prev: &[u8], bpp: usize, out: &mut [u8]) {
  let left = |i: usize| if i >= bpp { line[i - bpp] } else { 0 };
  let up_left = |i: usize| if i >= bpp { prev[i - bpp] } else { 0 };
  for (i, o) in out.iter_mut().enumerate() {
    let x = line[i];
    *o = match filter_type {
      1 => x.wrapping_sub(left(i)),
      2 => x.wrapping_sub(prev[i]),
      3 => x.wrapping_sub(((u16::from(left(i)) + u16::from(prev[i])) / 2) as u8),
      4 => x.wrapping_sub(paeth_predict(left(i), prev[i], up_left(i))),
      _ => x,
    };
  }
}

/// Sum of the filtered bytes read as signed values, the usual "which filter
/// compresses best" guess.
#[inline]
fn filter_cost(filtered: &[u8]) -> u64 {
  filtered.iter().map(|b| u64::from((*b as i8).unsigned_abs())).sum()
}

/// Picks and applies a filter for each line of one reduced image.
#[derive(Debug, Default)]
pub(crate) struct LineFilter {
  prev: Vec<u8>,
  trial: Vec<u8>,
  best: Vec<u8>,
  adaptive: bool,
}
impl LineFilter {
  /// With `adaptive` off, every line is stored unfiltered.
  pub(crate) fn new(adaptive: bool) -> Self {
    Self { adaptive, ..Self::default() }
  }

  /// Starts a new reduced image whose lines are `line_len` bytes.
  pub(crate) fn reset(&mut self, line_len: usize) -> Result<(), EngineError> {
    for v in [&mut self.prev, &mut self.trial, &mut self.best] {
      v.clear();
      v.try_reserve(line_len + 1)?;
    }
    self.prev.resize(line_len, 0);
    self.trial.resize(line_len, 0);
    self.best.resize(line_len + 1, 0);
    Ok(())
  }

  /// Filters `line` and returns the filter byte followed by the filtered
  /// bytes.
  pub(crate) fn filter(&mut self, line: &[u8], bpp: usize) -> Result<&[u8], EngineError> {
    if line.len() != self.prev.len() {
      return Err(EngineError::RowLength { expected: self.prev.len(), actual: line.len() });
    }
    let (best_type, best_bytes) = self.best.split_at_mut(1);
    best_type[0] = 0;
    best_bytes.copy_from_slice(line);
    if self.adaptive {
      let mut best_cost = filter_cost(best_bytes);
      for filter_type in 1..=4 {
        apply_filter(filter_type, line, &self.prev, bpp, &mut self.trial);
        let cost = filter_cost(&self.trial);
        if cost < best_cost {
          best_cost = cost;
          best_type[0] = filter_type;
          best_bytes.copy_from_slice(&self.trial);
        }
      }
    }
    self.prev.copy_from_slice(line);
    Ok(&self.best)
  }
}
