use alloc::{vec, vec::Vec};

use super::{crc32::chunk_crc, decoder::inflate_image_data, *};
use crate::{
  ColorType, DecodeEngine, DecodeFormat, DecodeOptions, EncodeEngine, EngineError, ImageHeader,
  InterlaceMethod, Progress,
};

fn header(
  width: u32, height: u32, bit_depth: u8, color_type: ColorType, interlaced: bool,
) -> ImageHeader {
  ImageHeader {
    width,
    height,
    bit_depth,
    color_type,
    compression_method: 0,
    filter_method: 0,
    interlace_method: if interlaced { InterlaceMethod::Adam7 } else { InterlaceMethod::None },
  }
}

/// Builds a PNG out of already filtered scanlines and some extra chunks that
/// go before the image data.
fn build_png(h: &ImageHeader, extra: &[(PngChunkType, &[u8])], filtered: &[u8]) -> Vec<u8> {
  let mut png = PNG_SIGNATURE.to_vec();
  write_chunk(&mut png, PngChunkType::IHDR, &h.to_ihdr_bytes()).unwrap();
  for (chunk_type, data) in extra {
    write_chunk(&mut png, *chunk_type, data).unwrap();
  }
  let zlib = miniz_oxide::deflate::compress_to_vec_zlib(filtered, 6);
  // two IDAT chunks, to check that they're joined back up.
  let (a, b) = zlib.split_at(zlib.len() / 2);
  write_chunk(&mut png, PngChunkType::IDAT, a).unwrap();
  write_chunk(&mut png, PngChunkType::IDAT, b).unwrap();
  write_chunk(&mut png, PngChunkType::IEND, &[]).unwrap();
  png
}

fn decode(png: &[u8], fmt: DecodeFormat) -> Result<Vec<u8>, EngineError> {
  let mut d = PngDecoder::new(png);
  let mut out = vec![0; d.decoded_image_size(fmt)?];
  d.decode_image(&mut out, fmt)?;
  Ok(out)
}

fn encode(h: ImageHeader, level: u8, image: &[u8]) -> Vec<u8> {
  let mut e = PngEncoder::new();
  e.set_header(h, level).unwrap();
  e.encode_image(image, true).unwrap();
  e.take_png_buffer().unwrap()
}

#[test]
fn test_reduced_image_dimensions() {
  assert_eq!(reduced_image_dimensions(0, 0), [(0, 0); 8]);
  // expected width (and height) of each reduced image for full sizes 1..=8
  let widths: [[u32; 8]; 7] = [
    [1, 1, 1, 1, 1, 1, 1, 1],
    [0, 0, 0, 0, 1, 1, 1, 1],
    [1, 1, 1, 1, 2, 2, 2, 2],
    [0, 0, 1, 1, 1, 1, 2, 2],
    [1, 1, 2, 2, 3, 3, 4, 4],
    [0, 1, 1, 2, 2, 3, 3, 4],
    [1, 2, 3, 4, 5, 6, 7, 8],
  ];
  let heights: [[u32; 8]; 7] = [
    [1, 1, 1, 1, 1, 1, 1, 1],
    [1, 1, 1, 1, 1, 1, 1, 1],
    [0, 0, 0, 0, 1, 1, 1, 1],
    [1, 1, 1, 1, 2, 2, 2, 2],
    [0, 0, 1, 1, 1, 1, 2, 2],
    [1, 1, 2, 2, 3, 3, 4, 4],
    [0, 1, 1, 2, 2, 3, 3, 4],
  ];
  for level in 1..=7 {
    for n in 1..=8_u32 {
      let ex_w = widths[level - 1][n as usize - 1];
      let ex_h = heights[level - 1][n as usize - 1];
      assert_eq!(reduced_image_dimensions(n, 0)[level].0, ex_w, "level {level} w:{n}");
      assert_eq!(reduced_image_dimensions(0, n)[level].1, ex_h, "level {level} h:{n}");
    }
  }
  assert_eq!(
    reduced_image_dimensions(8, 8),
    [
      (8, 8), // zeroth
      (1, 1), // one
      (1, 1), // two
      (2, 1), // three
      (2, 2), // four
      (4, 2), // five
      (4, 4), // six
      (8, 4), // seven
    ]
  );
}

#[test]
fn adam7_positions_cover_the_image_once() {
  let (w, h) = (13_u32, 11_u32);
  let mut seen = vec![0_u8; (w * h) as usize];
  let dims = reduced_image_dimensions(w, h);
  for (level, (rw, rh)) in dims.iter().enumerate().skip(1) {
    for ry in 0..*rh {
      for rx in 0..*rw {
        let (x, y) = interlaced_pos_to_full_pos(level, rx, ry);
        assert!(x < w && y < h, "level {level} ({rx},{ry}) went to ({x},{y})");
        seen[(y * w + x) as usize] += 1;
      }
    }
  }
  assert!(seen.iter().all(|n| *n == 1));
  assert_eq!(interlaced_pos_to_full_pos(0, 5, 6), (5, 6));
}

#[test]
fn crc_of_iend() {
  assert_eq!(chunk_crc(*b"IEND", &[]), 0xAE42_6082);
  let mut out = Vec::new();
  write_chunk(&mut out, PngChunkType::IEND, &[]).unwrap();
  assert_eq!(out, [0, 0, 0, 0, b'I', b'E', b'N', b'D', 0xAE, 0x42, 0x60, 0x82]);
  let png = [&PNG_SIGNATURE[..], &out].concat();
  let chunk = RawPngChunkIter::new(&png).next().unwrap().unwrap();
  assert!(chunk.crc_is_correct());
  assert!(!chunk.chunk_type.is_ancillary());
  assert!(PngChunkType::tRNS.is_ancillary());
}

#[test]
fn chunk_iter_stops_on_bad_lengths() {
  let mut png = PNG_SIGNATURE.to_vec();
  write_chunk(&mut png, PngChunkType(*b"teXt"), &[0; 100]).unwrap();
  let mut it = RawPngChunkIter::new(&png).with_chunk_size_limit(99);
  assert_eq!(it.next(), Some(Err(EngineError::ChunkLimit { len: 100, limit: 99 })));
  assert_eq!(it.next(), None);
  let mut it = RawPngChunkIter::new(&png[..png.len() - 1]);
  assert_eq!(it.next(), Some(Err(EngineError::ChunkTruncated)));
  assert_eq!(it.next(), None);

  let mut png = PNG_SIGNATURE.to_vec();
  write_chunk(&mut png, PngChunkType::IDAT, &[0; 100]).unwrap();
  let mut it = RawPngChunkIter::new(&png).with_chunk_size_limit(99);
  assert_eq!(it.next().map(|c| c.map(|c| c.data.len())), Some(Ok(100)));
  let mut it = RawPngChunkIter::new(&png[..png.len() - 1]).with_chunk_size_limit(99);
  assert_eq!(it.next(), Some(Err(EngineError::ChunkTruncated)));
}

#[test]
fn decode_gray_low_depth() {
  // 2-bit gray, 3x2, filter type 0 and 2 (up).
  let h = header(3, 2, 2, ColorType::Grayscale, false);
  let filtered = [0, 0b00_01_10_00, 2, 0b01_01_01_00];
  let png = build_png(&h, &[], &filtered);
  assert_eq!(decode(&png, DecodeFormat::G8).unwrap(), [0x00, 0x55, 0xAA, 0x55, 0xAA, 0xFF]);
  assert_eq!(decode(&png, DecodeFormat::Png).unwrap(), [0, 1, 2, 1, 2, 3]);
  assert_eq!(decode(&png, DecodeFormat::Rgb8).unwrap()[3..6], [0x55, 0x55, 0x55]);
}

#[test]
fn decode_indexed_with_transparency() {
  let h = header(2, 1, 8, ColorType::Indexed, false);
  let plte = [10, 20, 30, 40, 50, 60];
  let trns = [128];
  let png = build_png(
    &h,
    &[(PngChunkType::PLTE, &plte[..]), (PngChunkType::tRNS, &trns[..])],
    &[0, 1, 0],
  );
  assert_eq!(decode(&png, DecodeFormat::Rgba8).unwrap(), [40, 50, 60, 255, 10, 20, 30, 128]);
  assert_eq!(decode(&png, DecodeFormat::Rgb8).unwrap(), [40, 50, 60, 10, 20, 30]);
  assert_eq!(decode(&png, DecodeFormat::G8), Err(EngineError::Format));

  let no_palette = build_png(&h, &[], &[0, 1, 0]);
  assert_eq!(decode(&no_palette, DecodeFormat::Rgb8), Err(EngineError::Palette));
  let bad_palette = build_png(&h, &[(PngChunkType::PLTE, &plte[..4])], &[0, 1, 0]);
  assert_eq!(decode(&bad_palette, DecodeFormat::Rgb8), Err(EngineError::Palette));
  let out_of_range = build_png(&h, &[(PngChunkType::PLTE, &plte[..])], &[0, 2, 0]);
  assert_eq!(decode(&out_of_range, DecodeFormat::Rgb8), Err(EngineError::PaletteIndex));
}

#[test]
fn decode_rejects_broken_streams() {
  let h = header(2, 2, 8, ColorType::Grayscale, false);
  let good = build_png(&h, &[], &[0, 1, 2, 0, 3, 4]);
  assert_eq!(decode(&good, DecodeFormat::G8).unwrap(), [1, 2, 3, 4]);

  assert_eq!(decode(&good[1..], DecodeFormat::G8), Err(EngineError::Signature));
  assert_eq!(PngDecoder::new(&good[..20]).header(), Err(EngineError::ChunkTruncated));

  let short = build_png(&h, &[], &[0, 1, 2]);
  assert_eq!(decode(&short, DecodeFormat::G8), Err(EngineError::ImageDataTruncated));
  let bad_filter = build_png(&h, &[], &[0, 1, 2, 7, 3, 4]);
  assert_eq!(decode(&bad_filter, DecodeFormat::G8), Err(EngineError::FilterType(7)));
  let critical = build_png(&h, &[(PngChunkType(*b"ABCD"), &[1][..])], &[0, 1, 2, 0, 3, 4]);
  assert_eq!(
    decode(&critical, DecodeFormat::G8),
    Err(EngineError::UnknownCriticalChunk(*b"ABCD"))
  );
  let ancillary = build_png(&h, &[(PngChunkType(*b"abCD"), &[1][..])], &[0, 1, 2, 0, 3, 4]);
  assert!(decode(&ancillary, DecodeFormat::G8).is_ok());

  let mut no_idat = PNG_SIGNATURE.to_vec();
  write_chunk(&mut no_idat, PngChunkType::IHDR, &h.to_ihdr_bytes()).unwrap();
  write_chunk(&mut no_idat, PngChunkType::IEND, &[]).unwrap();
  assert_eq!(decode(&no_idat, DecodeFormat::G8), Err(EngineError::NoImageData));

  let mut d = PngDecoder::new(&good);
  assert_eq!(
    d.decode_image(&mut [0; 3], DecodeFormat::G8),
    Err(EngineError::BufferSize { expected: 4, actual: 3 })
  );
}

#[test]
fn decode_limits_and_crc() {
  let h = header(2, 2, 8, ColorType::Grayscale, false);
  let text = [b'x'; 300];
  let png = build_png(&h, &[(PngChunkType(*b"tEXt"), &text[..])], &[0, 1, 2, 0, 3, 4]);

  let mut d = PngDecoder::new(&png);
  d.set_chunk_limits(200, 1000);
  assert!(d.header().is_ok());
  assert_eq!(
    d.decoded_image_size(DecodeFormat::G8),
    Err(EngineError::ChunkLimit { len: 300, limit: 200 })
  );
  let mut d = PngDecoder::new(&png);
  d.set_chunk_limits(1000, 200);
  assert_eq!(d.decoded_image_size(DecodeFormat::G8), Err(EngineError::CacheLimit { limit: 200 }));

  // flip one byte of the tEXt data
  let mut corrupt = png.clone();
  corrupt[33 + 8 + 5] ^= 1;
  assert!(decode(&corrupt, DecodeFormat::G8).is_ok());
  let checked = DecodeOptions::default().set_check_crc(true);
  let mut d = PngDecoder::new(&corrupt).with_options(&checked);
  assert_eq!(d.decoded_image_size(DecodeFormat::G8), Err(EngineError::ChunkCrc));
}

#[test]
fn idat_is_exempt_from_the_chunk_size_limit() {
  let h = header(64, 64, 8, ColorType::Grayscale, false);
  let filtered: Vec<u8> =
    (0..64 * 65).map(|i| if i % 65 == 0 { 0 } else { (i * 37 % 251) as u8 }).collect();
  let png = build_png(&h, &[], &filtered);
  assert!(RawPngChunkIter::new(&png)
    .filter_map(Result::ok)
    .any(|c| c.chunk_type == PngChunkType::IDAT && c.data.len() > 16));

  let mut d = PngDecoder::new(&png);
  d.set_chunk_limits(16, 1000);
  let mut out = vec![0; d.decoded_image_size(DecodeFormat::G8).unwrap()];
  d.decode_image(&mut out, DecodeFormat::G8).unwrap();
  let expected: Vec<u8> = filtered.chunks(65).flat_map(|line| line[1..].to_vec()).collect();
  assert_eq!(out, expected);

  // other chunks of that size are still refused.
  let text = [b'x'; 100];
  let png = build_png(&h, &[(PngChunkType(*b"tEXt"), &text[..])], &filtered);
  let mut d = PngDecoder::new(&png);
  d.set_chunk_limits(16, 1000);
  assert_eq!(
    d.decoded_image_size(DecodeFormat::G8),
    Err(EngineError::ChunkLimit { len: 100, limit: 16 })
  );
}

#[test]
fn inflate_only_grows_with_the_data() {
  let zlib = miniz_oxide::deflate::compress_to_vec_zlib(&[0; 10], 6);
  // a size that could never be reserved up front.
  assert_eq!(
    inflate_image_data(&[&zlib], usize::MAX / 2, false),
    Err(EngineError::ImageDataTruncated)
  );
  assert_eq!(inflate_image_data(&[&zlib], 10, false), Ok(vec![0; 10]));
  // data past the last scanline is ignored.
  assert_eq!(inflate_image_data(&[&zlib], 4, false), Ok(vec![0; 4]));

  let big: Vec<u8> = (0..100_000_u32).map(|i| (i * 31 % 256) as u8).collect();
  let zlib = miniz_oxide::deflate::compress_to_vec_zlib(&big, 1);
  let (a, b) = zlib.split_at(7);
  let empty: &[u8] = &[];
  assert_eq!(inflate_image_data(&[a, empty, b], big.len(), false), Ok(big.clone()));
  assert_eq!(inflate_image_data(&[a], big.len(), false), Err(EngineError::ImageDataTruncated));
}

#[test]
fn encoder_output_decodes() {
  for (color_type, depth) in [
    (ColorType::Grayscale, 8),
    (ColorType::GrayscaleAlpha, 16),
    (ColorType::TrueColor, 8),
    (ColorType::TrueColorAlpha, 16),
  ] {
    for interlaced in [false, true] {
      for level in [0, 6, 9] {
        let h = header(9, 7, depth, color_type, interlaced);
        let len = 9 * 7 * h.bits_per_pixel() / 8;
        let image: Vec<u8> = (0..len).map(|i| (i * 7 % 251) as u8).collect();
        let png = encode(h, level, &image);
        let checked = DecodeOptions::default().set_check_crc(true);
        let mut d = PngDecoder::new(&png).with_options(&checked);
        assert_eq!(d.header().unwrap(), h);
        let mut out = vec![0; d.decoded_image_size(DecodeFormat::Png).unwrap()];
        d.decode_image(&mut out, DecodeFormat::Png).unwrap();
        assert_eq!(out, image, "{color_type:?} {depth} interlaced:{interlaced} level:{level}");
      }
    }
  }
}

#[test]
fn encoder_asks_for_rows_in_pass_order() {
  let h = header(3, 3, 8, ColorType::Grayscale, true);
  let mut e = PngEncoder::new();
  e.set_header(h, 6).unwrap();
  assert_eq!(e.row_info(), None);
  e.begin_rows().unwrap();
  let mut order = Vec::new();
  loop {
    let info = e.row_info().unwrap();
    order.push((info.pass, info.row_num, info.scanline_idx));
    let row = [info.row_num as u8; 3];
    if e.encode_row(&row).unwrap() == Progress::EndOfImage {
      break;
    }
  }
  // a 3x3 image has rows in passes 1, 4, 5, 6, and 7.
  assert_eq!(order, [(1, 0, 0), (4, 0, 0), (5, 2, 0), (6, 0, 0), (6, 2, 1), (7, 1, 0)]);
  assert_eq!(e.row_info(), None);
  e.encode_chunks().unwrap();
  let png = e.take_png_buffer().unwrap();
  assert_eq!(decode(&png, DecodeFormat::G8).unwrap(), [0, 0, 0, 1, 1, 1, 2, 2, 2]);
}

#[test]
fn encoder_refuses_calls_out_of_order() {
  let h = header(2, 1, 8, ColorType::Grayscale, false);
  let mut e = PngEncoder::new();
  assert_eq!(e.begin_rows(), Err(EngineError::BadState));
  assert_eq!(e.encode_row(&[0, 0]), Err(EngineError::BadState));
  let gray4 = header(2, 1, 4, ColorType::Grayscale, false);
  assert_eq!(e.set_header(gray4, 6), Err(EngineError::Format));
  let indexed = header(2, 1, 8, ColorType::Indexed, false);
  assert_eq!(e.set_header(indexed, 6), Err(EngineError::Format));
  assert_eq!(e.set_header(h, 10), Err(EngineError::Format));
  e.set_header(h, 6).unwrap();
  assert_eq!(e.set_header(h, 6), Err(EngineError::BadState));
  assert_eq!(e.encode_chunks(), Err(EngineError::BadState));
  e.begin_rows().unwrap();
  assert_eq!(e.encode_row(&[0]), Err(EngineError::RowLength { expected: 2, actual: 1 }));
  assert_eq!(e.take_png_buffer(), Err(EngineError::NoOutput));
  assert_eq!(e.encode_row(&[0, 0]), Ok(Progress::EndOfImage));
  e.encode_chunks().unwrap();
  assert!(e.take_png_buffer().is_ok());
  assert_eq!(e.take_png_buffer(), Err(EngineError::NoOutput));
}

#[test]
fn big_images_split_into_several_idats() {
  let h = header(300, 300, 16, ColorType::TrueColorAlpha, false);
  let mut state = 0x1234_5678_u32;
  let image: Vec<u8> = (0..300 * 300 * 8)
    .map(|_| {
      state ^= state << 13;
      state ^= state >> 17;
      state ^= state << 5;
      state as u8
    })
    .collect();
  let png = encode(h, 1, &image);
  let idats = RawPngChunkIter::new(&png)
    .filter(|c| c.as_ref().unwrap().chunk_type == PngChunkType::IDAT)
    .count();
  assert!(idats > 1);
  assert_eq!(decode(&png, DecodeFormat::Png).unwrap(), image);
}
