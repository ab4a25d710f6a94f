use byteorder::{ByteOrder, LE};
use lz4_frame::framed::{BlockSize, CompressionSettings};
use lz4_frame::raw::DecodeError;
use lz4_frame::{compress, compress_bound, decompress, decompress_bound, DecompressionError};
use rand::prelude::*;
use rand::rngs::StdRng;

const RAW: u32 = 1 << 31;

fn roundtrip(data: &[u8]) -> Vec<u8> {
    let frame = compress(data);
    assert!(frame.len() <= compress_bound(data.len()), "{} > {}", frame.len(), compress_bound(data.len()));
    assert!(decompress_bound(&frame).unwrap() >= data.len() as u64);
    assert_eq!(decompress(&frame).unwrap(), data);
    frame
}

/// Block headers of a frame without content size or checksums.
fn block_headers(frame: &[u8]) -> Vec<u32> {
    let mut pos = 7;
    let mut headers = Vec::new();
    loop {
        let header = LE::read_u32(&frame[pos..]);
        if header == 0 {
            return headers;
        }
        headers.push(header);
        pos += 4 + (header & !RAW) as usize;
    }
}

/// Compressible but not trivial: runs, copies of earlier data and noise.
fn mixed_data(rng: &mut StdRng, len: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(len);
    while data.len() < len {
        let chunk = rng.gen_range(1, 300);
        match rng.gen_range(0, 3) {
            0 => {
                let byte: u8 = rng.gen();
                data.extend(std::iter::repeat(byte).take(chunk));
            }
            1 if data.len() > chunk => {
                let start = rng.gen_range(0, data.len() - chunk);
                for i in start..start + chunk {
                    let b = data[i];
                    data.push(b);
                }
            }
            _ => data.extend((0..chunk).map(|_| rng.gen::<u8>())),
        }
    }
    data.truncate(len);
    data
}

#[test]
fn empty() {
    let frame = roundtrip(&[]);
    assert_eq!(frame.len(), 11);
    assert!(block_headers(&frame).is_empty());
}

#[test]
fn random_input_is_stored_raw() {
    let mut data = vec![0u8; 100_000];
    StdRng::seed_from_u64(7).fill(&mut data[..]);

    let frame = roundtrip(&data);
    assert_eq!(block_headers(&frame), vec![100_000 | RAW]);
    assert_eq!(frame.len(), 7 + 4 + 100_000 + 4);
}

#[test]
fn repeated_value() {
    let data = vec![0x42u8; 1000];
    let frame = roundtrip(&data);
    assert_eq!(block_headers(&frame), vec![14]);
    // literal, offset 1, long match, then the mandatory trailing literals
    assert_eq!(&frame[11..15], &[0x1F, 0x42, 1, 0]);
}

#[test]
fn mixed_inputs_of_many_sizes() {
    let mut rng = StdRng::seed_from_u64(1337);
    for &len in &[1, 4, 5, 11, 12, 13, 16, 100, 255, 256, 1000, 4096, 65_535, 65_536, 65_537, 300_000] {
        let data = mixed_data(&mut rng, len);
        roundtrip(&data);
    }
}

#[test]
fn big_compression() {
    let s: Vec<u8> = (0..9_000_000u32).map(|n| (n as u8).wrapping_mul(0xA).wrapping_add(33) ^ 0xA2).collect();

    let frame = roundtrip(&s);
    let headers = block_headers(&frame);
    assert_eq!(headers.len(), 3);
    assert!(headers.iter().all(|h| h & RAW == 0));
}

/// Noise from a fixed xorshift generator, so the block layout below is reproducible.
fn noise(len: usize) -> Vec<u8> {
    let mut x: u32 = 0x1234_5678;
    (0..len)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            (x >> 24) as u8
        })
        .collect()
}

#[test]
fn noise_of_many_lengths() {
    let data = noise(300_000);
    for len in (1_000..data.len()).step_by(997) {
        roundtrip(&data[..len]);
    }
}

#[test]
fn small_blocks_reference_earlier_blocks() {
    let data = noise(40_000).repeat(4);

    let frame = CompressionSettings::default().block_size(BlockSize::Max64KiB).compress(&data);
    assert_eq!(decompress(&frame).unwrap(), data);

    let headers = block_headers(&frame);
    assert_eq!(headers.len(), 3);
    // the first block finds the start of the second copy within itself
    assert!(headers[0] & RAW == 0 && headers[0] < 45_000);
    // the second block is nothing but a match into the first one
    assert!(headers[1] & RAW == 0 && headers[1] < 1000);
    // the third block would have to look back further than 64 KiB
    assert_eq!(headers[2], (160_000 - 2 * 65_536) | RAW);
}

#[test]
fn content_size_is_the_bound() {
    let data = mixed_data(&mut StdRng::seed_from_u64(5), 200_000);
    let frame = CompressionSettings::default()
        .content_size(true)
        .block_size(BlockSize::Max256KiB)
        .compress(&data);

    assert_eq!(frame[4] & 0x08, 0x08);
    assert_eq!(decompress_bound(&frame).unwrap(), data.len() as u64);
    assert_eq!(decompress(&frame).unwrap(), data);
}

#[test]
fn all_raw_frame() {
    let mut frame = vec![0x04, 0x22, 0x4D, 0x18, 0x40, 0x70, 0xDF];
    let parts: [&[u8]; 3] = [b"frames ", b"of ", b"raw blocks"];
    for part in &parts {
        frame.extend_from_slice(&(part.len() as u32 | RAW).to_le_bytes());
        frame.extend_from_slice(part);
    }
    frame.extend_from_slice(&[0, 0, 0, 0]);

    assert_eq!(decompress_bound(&frame).unwrap(), 20);
    assert_eq!(decompress(&frame).unwrap(), b"frames of raw blocks");
}

#[test]
fn trailing_content_checksum_is_ignored() {
    let mut frame = compress(b"checksum me");
    frame[4] |= 0x04;
    frame.extend_from_slice(&[1, 2, 3, 4]);
    assert_eq!(decompress(&frame).unwrap(), b"checksum me");
}

#[test]
fn bad_magic() {
    let mut frame = compress(b"hello");
    frame[0] = 0x05;
    assert!(matches!(decompress(&frame), Err(DecompressionError::InvalidMagicNumber(0x184D2205))));
    assert!(matches!(decompress_bound(&frame), Err(DecompressionError::InvalidMagicNumber(_))));
    assert!(matches!(decompress(b"not an lz4 frame"), Err(DecompressionError::InvalidMagicNumber(_))));
}

#[test]
fn bad_version() {
    let mut frame = compress(b"hello");
    frame[4] = 0x60 | 0x80;
    assert!(matches!(decompress(&frame), Err(DecompressionError::UnsupportedVersion(3))));
    frame[4] = 0x00;
    assert!(matches!(decompress_bound(&frame), Err(DecompressionError::UnsupportedVersion(0))));
}

#[test]
fn bad_block_size_id() {
    let mut frame = compress(b"hello");
    frame[5] = 0x20;
    assert!(matches!(decompress(&frame), Err(DecompressionError::InvalidBlockSizeId(2))));
}

#[test]
fn corrupt_offset() {
    let mut frame = compress(&[b'z'; 1000]);
    // the first match copies from one byte back, make it two
    frame[13] = 2;
    assert!(matches!(
        decompress(&frame),
        Err(DecompressionError::CorruptData(DecodeError::InvalidDeduplicationOffset))
    ));
}

#[test]
fn absurd_content_size() {
    let mut frame = vec![0x04, 0x22, 0x4D, 0x18, 0x48, 0x70];
    frame.extend_from_slice(&(1u64 << 46).to_le_bytes());
    frame.extend_from_slice(&[0, 0, 0, 0, 0]);
    assert!(matches!(decompress(&frame), Err(DecompressionError::SizeOverflow)));
}

#[test]
fn garbage_never_panics() {
    let mut rng = StdRng::seed_from_u64(2020);
    for _ in 0..2000 {
        let len = rng.gen_range(0, 64);
        let mut frame = vec![0x04, 0x22, 0x4D, 0x18, 0x40, 0x40, 0x00];
        frame.extend((0..len).map(|_| rng.gen::<u8>()));
        let _ = decompress(&frame);
    }
}
