//! Pure Rust LZ4 compression and decompression of in-memory buffers.
//!
//! `compress` turns any byte slice into a standard LZ4 frame that the `lz4` command line tool can
//! read, and `decompress` turns a frame back into the original bytes. The `raw` module exposes the
//! block codec underneath, `framed` the frame layer with its settings and header types.
//!
//! ```
//! let data = b"to live or not to live, to live or not to live";
//! let frame = lz4_frame::compress(data);
//! assert_eq!(lz4_frame::decompress(&frame).unwrap(), &data[..]);
//! ```

#![forbid(unsafe_code)]

pub mod framed;
pub mod raw;

pub use framed::{compress_bound, decompress_bound, CompressionSettings, DecompressionError};

/// Compress `input` into an LZ4 frame using the default settings.
///
/// The result is never larger than `compress_bound(input.len())`.
pub fn compress(input: &[u8]) -> Vec<u8> {
    CompressionSettings::default().compress(input)
}

/// Decompress an LZ4 frame.
///
/// Checksums are not verified. Anything after the end of the frame is ignored.
pub fn decompress(input: &[u8]) -> Result<Vec<u8>, DecompressionError> {
    framed::decompress_frame(input)
}
