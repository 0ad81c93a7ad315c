//! The CRC-32 used by PNG chunks (ISO 3309, reflected, poly `0xEDB88320`).

const CRC_TABLE: [u32; 256] = make_crc_table();

const fn make_crc_table() -> [u32; 256] {
  let mut out = [0; 256];
  let mut n = 0;
  while n < 256 {
    let mut c = n as u32;
    let mut k = 0;
    while k < 8 {
      c = if (c & 1) != 0 { 0xEDB8_8320_u32 ^ (c >> 1) } else { c >> 1 };
      k += 1;
    }
    out[n] = c;
    n += 1;
  }
  out
}

/// A running chunk CRC. Feed it the chunk type and then the chunk data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Crc32(u32);
impl Crc32 {
  #[inline]
  pub(crate) const fn new() -> Self {
    Self(u32::MAX)
  }

  #[inline]
  pub(crate) fn update(mut self, bytes: &[u8]) -> Self {
    for byte in bytes {
      let i = (self.0 ^ u32::from(*byte)) as u8 as usize;
      self.0 = CRC_TABLE[i] ^ (self.0 >> 8);
    }
    self
  }

  #[inline]
  pub(crate) const fn finish(self) -> u32 {
    self.0 ^ u32::MAX
  }
}

/// The CRC of a chunk with this type and data.
#[inline]
pub(crate) fn chunk_crc(chunk_type: [u8; 4], data: &[u8]) -> u32 {
  Crc32::new().update(&chunk_type).update(data).finish()
}
