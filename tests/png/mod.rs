use pngarray::{
  decode_image, decode_image_with, encode_image, png::*, read_header, ColorType, DecodeOptions,
  EncodeMode, ImageHeader, ImageRef, InterlaceMethod, PixelBuffer, PixelFormat, PngArrayError,
};
use walkdir::WalkDir;

const MODES: [EncodeMode; 3] =
  [EncodeMode::Plain, EncodeMode::Progressive, EncodeMode::ProgressiveInterlaced];

/// Random samples, kept as bytes or as `u16` values.
enum TestPixels {
  U8(Vec<u8>),
  U16(Vec<u16>),
}
impl TestPixels {
  fn random(sample_count: usize, byte_width: usize) -> Self {
    let bytes = super::rand_bytes(sample_count * byte_width);
    if byte_width == 2 {
      Self::U16(bytes.chunks_exact(2).map(|b| u16::from_ne_bytes([b[0], b[1]])).collect())
    } else {
      Self::U8(bytes)
    }
  }
  fn view(&self, shape: &[usize]) -> ImageRef<'_> {
    match self {
      Self::U8(v) => ImageRef::from_u8(v, shape).unwrap(),
      Self::U16(v) => ImageRef::from_u16(v, shape).unwrap(),
    }
  }
  fn sample(&self, i: usize) -> u16 {
    match self {
      Self::U8(v) => u16::from(v[i]),
      Self::U16(v) => v[i],
    }
  }
}

fn assert_source_channels_match(src: &TestPixels, shape: [usize; 3], out: &PixelBuffer) {
  let [h, w, c] = shape;
  for y in 0..h {
    for x in 0..w {
      for ch in 0..c {
        let expected = src.sample((y * w + x) * c + ch);
        assert_eq!(out.get(y, x, ch), Some(expected), "at ({y},{x},{ch}) of {shape:?}");
      }
    }
  }
}

#[test]
fn test_round_trip_every_layout_and_mode() {
  for (h, w) in [(1, 1), (1, 17), (33, 1), (64, 64)] {
    for channels in 1..=4 {
      for byte_width in 1..=2 {
        let src = TestPixels::random(h * w * channels, byte_width);
        let shape = [h, w, channels];
        for mode in MODES {
          let png = encode_image(src.view(&shape), mode, 6).unwrap();
          let out = decode_image(&png, PixelFormat::Auto).unwrap();
          let [oh, ow, oc] = out.layout().shape();
          assert_eq!((oh, ow), (h, w));
          assert_eq!(out.layout().channel_byte_width(), byte_width);
          assert_source_channels_match(&src, shape, &out);
          if oc > channels {
            // 16-bit gray and RGB come back with an opaque alpha channel.
            assert_eq!((channels, oc, byte_width), (channels, channels + 1, 2));
            for y in 0..h {
              for x in 0..w {
                assert_eq!(out.get(y, x, channels), Some(u16::MAX));
              }
            }
          } else {
            assert_eq!(oc, channels);
          }
        }
      }
    }
  }
}

#[test]
fn test_header_fidelity() {
  let src = TestPixels::random(5 * 7 * 2, 2);
  for mode in MODES {
    let png = encode_image(src.view(&[5, 7, 2]), mode, 9).unwrap();
    let header = read_header(&png).unwrap();
    assert_eq!((header.width, header.height, header.bit_depth), (7, 5, 16));
    assert_eq!(header.color_type, ColorType::GrayscaleAlpha);
    let interlace =
      if mode.is_interlaced() { InterlaceMethod::Adam7 } else { InterlaceMethod::None };
    assert_eq!(header.interlace_method, interlace);
    assert_eq!((header.compression_method, header.filter_method), (0, 0));
  }
}

#[test]
fn test_auto_detects_gray_alpha() {
  let src = TestPixels::random(3 * 4 * 2, 1);
  let png = encode_image(src.view(&[3, 4, 2]), EncodeMode::Plain, 6).unwrap();
  let out = decode_image(&png, PixelFormat::Auto).unwrap();
  assert_eq!(out.layout().shape(), [3, 4, 2]);
  assert_eq!(out.layout().strides(), [8, 2, 1]);
  assert!(out.as_u8().is_some());
}

#[test]
fn test_auto_expands_indexed_images() {
  let header = ImageHeader {
    width: 4,
    height: 2,
    bit_depth: 2,
    color_type: ColorType::Indexed,
    compression_method: 0,
    filter_method: 0,
    interlace_method: InterlaceMethod::None,
  };
  let palette = [255, 0, 0, 0, 255, 0, 0, 0, 255];
  // each line is a filter byte then four 2-bit indexes.
  let filtered = [0, 0b00_01_10_00, 0, 0b10_10_01_01];
  let mut png = PNG_SIGNATURE.to_vec();
  write_chunk(&mut png, PngChunkType::IHDR, &header.to_ihdr_bytes()).unwrap();
  write_chunk(&mut png, PngChunkType::PLTE, &palette).unwrap();
  let zlib = miniz_oxide::deflate::compress_to_vec_zlib(&filtered, 6);
  write_chunk(&mut png, PngChunkType::IDAT, &zlib).unwrap();
  write_chunk(&mut png, PngChunkType::IEND, &[]).unwrap();

  assert_eq!(read_header(&png).unwrap(), header);
  let out = decode_image(&png, PixelFormat::Auto).unwrap();
  assert_eq!(out.layout().shape(), [2, 4, 3]);
  let expected: Vec<u8> = [0, 1, 2, 0, 2, 2, 1, 1]
    .iter()
    .flat_map(|i| palette[i * 3..i * 3 + 3].iter().copied())
    .collect();
  assert_eq!(out.as_u8().unwrap(), &expected[..]);

  let rgba = decode_image(&png, PixelFormat::Rgba8).unwrap();
  assert_eq!(rgba.layout().shape(), [2, 4, 4]);
  assert!(matches!(
    decode_image(&png, PixelFormat::Gray8),
    Err(PngArrayError::UnsupportedFormat { color_type: ColorType::Indexed, .. })
  ));
}

#[test]
fn test_boundary_cases() {
  let one = [77_u8];
  let png = encode_image(ImageRef::from_u8(&one, &[1, 1]).unwrap(), EncodeMode::Plain, 6).unwrap();
  let out = decode_image(&png, PixelFormat::Auto).unwrap();
  assert_eq!(out.layout().shape(), [1, 1, 1]);
  assert_eq!(out.as_u8(), Some(&one[..]));

  let five = [0_u8; 5];
  assert_eq!(
    ImageRef::from_u8(&five, &[1, 1, 5]).err(),
    Some(PngArrayError::UnsupportedChannelCount(5))
  );

  let img = ImageRef::from_u8(&one, &[1, 1]).unwrap();
  assert!(matches!(
    encode_image(img, EncodeMode::Plain, 10),
    Err(PngArrayError::InvalidArgument(_))
  ));
  assert!(matches!(EncodeMode::try_from(3), Err(PngArrayError::InvalidArgument(_))));

  assert!(matches!(read_header(&[1, 2, 3]), Err(PngArrayError::MalformedHeader(_))));
  assert!(matches!(
    decode_image(&png[..30], PixelFormat::Auto),
    Err(PngArrayError::MalformedHeader(_))
  ));
}

#[test]
fn test_interlace_equivalence() {
  let src = TestPixels::random(19 * 23 * 4, 2);
  let plain = encode_image(src.view(&[19, 23, 4]), EncodeMode::Plain, 6).unwrap();
  let interlaced =
    encode_image(src.view(&[19, 23, 4]), EncodeMode::ProgressiveInterlaced, 6).unwrap();
  assert_ne!(plain, interlaced);
  assert_eq!(
    decode_image(&plain, PixelFormat::Auto).unwrap(),
    decode_image(&interlaced, PixelFormat::Auto).unwrap()
  );
  assert_eq!(
    decode_image(&plain, PixelFormat::Rgba8).unwrap(),
    decode_image(&interlaced, PixelFormat::Rgba8).unwrap()
  );
}

/// A valid PNG with one extra chunk right after the `IHDR`.
fn png_with_chunk_after_header(chunk: &[u8]) -> Vec<u8> {
  let src = [1_u8, 2, 3, 4];
  let png = encode_image(ImageRef::from_u8(&src, &[2, 2]).unwrap(), EncodeMode::Plain, 6).unwrap();
  let after_ihdr = PNG_SIGNATURE.len() + 12 + 13;
  [&png[..after_ihdr], chunk, &png[after_ihdr..]].concat()
}

#[test]
fn test_chunk_limits_are_enforced() {
  let mut text = Vec::new();
  write_chunk(&mut text, PngChunkType(*b"tEXt"), &[b'a'; 4096]).unwrap();
  let png = png_with_chunk_after_header(&text);
  assert!(decode_image(&png, PixelFormat::Auto).is_ok());

  let small = DecodeOptions::default().set_chunk_limits(1024);
  assert!(pngarray::read_header_with(&png, &small).is_ok());
  assert!(matches!(
    decode_image_with(&png, PixelFormat::Auto, &small),
    Err(PngArrayError::SizeQueryFailed(_))
  ));

  // image data is only borrowed, so one big IDAT passes a small limit.
  let noise = super::rand_bytes(40 * 40 * 4);
  let img = ImageRef::from_u8(&noise, &[40, 40, 4]).unwrap();
  let png = encode_image(img, EncodeMode::Plain, 0).unwrap();
  let idat_lens: Vec<usize> = RawPngChunkIter::new(&png)
    .filter_map(Result::ok)
    .filter(|c| c.chunk_type == PngChunkType::IDAT)
    .map(|c| c.data.len())
    .collect();
  assert_eq!(idat_lens.len(), 1);
  assert!(idat_lens[0] > 1024);
  let out = decode_image_with(&png, PixelFormat::Auto, &small).unwrap();
  assert_eq!(out.as_u8(), Some(&noise[..]));

  // claims 2 GiB of data but holds none of it.
  let mut lie = Vec::new();
  lie.extend_from_slice(&0x7FFF_FFFF_u32.to_be_bytes());
  lie.extend_from_slice(b"zTXt");
  let png = png_with_chunk_after_header(&lie);
  assert!(matches!(
    decode_image(&png, PixelFormat::Auto),
    Err(PngArrayError::SizeQueryFailed(_))
  ));
}

#[test]
fn test_RawPngChunkIter_no_panics() {
  // iter ALL files in the test folder, even non-png files shouldn't panic it.
  for entry in WalkDir::new("tests/").into_iter().filter_map(|e| e.ok()) {
    println!("{}", entry.path().display());
    let v = match std::fs::read(entry.path()) {
      Ok(v) => v,
      Err(e) => {
        println!("Error reading file: {e:?}");
        continue;
      }
    };
    for _ in RawPngChunkIter::new(&v) {
      //
    }
    let _ = decode_image(&v, PixelFormat::Auto);
  }
  // even totally random data should never panic the iterator!
  for _ in 0..10 {
    let v = super::rand_bytes(1024);
    for _ in RawPngChunkIter::new(&v) {
      //
    }
    let mut with_signature = PNG_SIGNATURE.to_vec();
    with_signature.extend_from_slice(&v);
    let _ = decode_image(&with_signature, PixelFormat::Auto);
  }
}
