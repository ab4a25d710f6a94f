#![no_main]
use libfuzzer_sys::fuzz_target;
use lz4_frame::framed::{BlockSize, CompressionSettings};

fuzz_target!(|data: &[u8]| {
    let compressed = lz4_frame::compress(data);
    assert!(compressed.len() <= lz4_frame::compress_bound(data.len()));
    let roundtripped = lz4_frame::decompress(&compressed).expect("Could not decompress our own frame");
    assert!(roundtripped == data);

    let compressed = CompressionSettings::default()
        .block_size(BlockSize::Max64KiB)
        .content_size(true)
        .compress(data);
    let roundtripped = lz4_frame::decompress(&compressed).expect("Could not decompress our own frame");
    assert!(roundtripped == data);
});
