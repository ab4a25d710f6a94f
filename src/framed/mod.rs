//! The LZ4 frame format.
//!
//! A frame wraps a sequence of raw blocks with a header describing them, and stores every block that
//! doesn't compress well uncompressed instead. Frames are what the `lz4` command line tool reads and
//! writes. Checksum fields are understood (and skipped) when decoding but never verified.

use byteorder::{ByteOrder, LE};
use fehler::throws;

use crate::raw::DecodeError;

mod compress;
mod decompress;
mod header;

/// The four magic bytes at the start of every LZ4 frame.
const MAGIC: u32 = 0x184D2204;
/// The frame format sets the high bit of every length field to indicate that the data was not compressed.
const INCOMPRESSIBLE: u32 = 1 << 31;

pub use compress::*;
pub use decompress::*;
pub use header::*;

#[throws(DecodeError)]
fn byte_at(input: &[u8], pos: usize) -> u8 {
    *input.get(pos).ok_or(DecodeError::UnexpectedEnd)?
}

#[throws(DecodeError)]
fn read_u32_at(input: &[u8], pos: usize) -> u32 {
    input.get(pos..).and_then(|rest| rest.get(..4)).map(LE::read_u32).ok_or(DecodeError::UnexpectedEnd)?
}

#[throws(DecodeError)]
fn read_u64_at(input: &[u8], pos: usize) -> u64 {
    input.get(pos..).and_then(|rest| rest.get(..8)).map(LE::read_u64).ok_or(DecodeError::UnexpectedEnd)?
}
