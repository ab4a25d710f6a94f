#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // random bytes are not valid LZ4 frames, errors are expected but panics are not
    let _ = lz4_frame::decompress_bound(data);
    let _ = lz4_frame::decompress(data);
});
