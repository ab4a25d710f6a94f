use std::cmp;
use std::convert::TryFrom;
use fehler::{throw, throws};
use thiserror::Error;
use tracing::{debug, trace};

use super::{read_u32_at, FrameHeader, INCOMPRESSIBLE};
use crate::raw::{self, DecodeError};

/// Errors when decompressing an LZ4 frame.
#[derive(Error, Debug)]
pub enum DecompressionError {
    #[error("wrong magic number in file header: {0:08x}")]
    InvalidMagicNumber(u32),
    #[error("file version {0} not supported")]
    UnsupportedVersion(u8),
    #[error("block size id {0} is reserved")]
    InvalidBlockSizeId(u8),
    #[error("the frame is truncated or contains a corrupt block")]
    CorruptData(#[from] DecodeError),
    #[error("the frame claims a size so large we can't even address it (let alone fit it in memory...)")]
    SizeOverflow,
}
type Error = DecompressionError; // do it this way for better docs

/// A token and its length bytes can't describe more than this many output bytes per input byte.
const MAX_EXPANSION: u64 = 255;

/// Calculates an upper bound for the decompressed size of a frame without decompressing it.
///
/// If the frame stores its content size, that is returned as is. Otherwise we walk the block headers:
/// uncompressed blocks contribute their exact length, compressed blocks the maximum block size.
#[throws]
pub fn decompress_bound(input: &[u8]) -> u64 {
    let header = FrameHeader::parse(input)?;
    if let Some(content_size) = header.content_size {
        return content_size;
    }

    let block_maxsize = header.block_size.bytes() as u64;
    let checksum_len = if header.flags.block_checksums() { 4 } else { 0 };

    let mut bound: u64 = 0;
    let mut pos = header.len;
    loop {
        let block_length = read_u32_at(input, pos)?;
        if block_length == 0 {
            break;
        }

        let is_compressed = block_length & INCOMPRESSIBLE == 0;
        let block_length = block_length & !INCOMPRESSIBLE;
        let block_bound = if is_compressed { block_maxsize } else { block_length as u64 };
        bound = bound.checked_add(block_bound).ok_or(Error::SizeOverflow)?;

        // if this runs past the end, the next header read fails
        pos = pos.saturating_add(4 + block_length as usize + checksum_len);
    }
    bound
}

/// Decompress an entire LZ4 frame.
///
/// The output buffer is allocated once, sized by `decompress_bound`, and trimmed afterwards.
/// Blocks may reference data of previous blocks, so this handles linked and independent blocks alike.
///
/// No frame can expand to more than 255 times its own length. A stored content size beyond that is
/// rejected with `SizeOverflow`, a bound estimated from block headers is capped to it.
#[throws]
pub fn decompress_frame(input: &[u8]) -> Vec<u8> {
    let header = FrameHeader::parse(input)?;
    debug!(
        flags = ?header.flags,
        block_maxsize = header.block_size.bytes(),
        content_size = ?header.content_size,
        independent_blocks = header.flags.independent_blocks(),
        content_checksum = header.flags.content_checksum(),
        "parsed frame header"
    );

    let limit = (input.len() as u64).saturating_mul(MAX_EXPANSION);
    let bound = match decompress_bound(input)? {
        bound if header.content_size.is_some() && bound > limit => throw!(Error::SizeOverflow),
        bound => cmp::min(bound, limit),
    };
    let bound = usize::try_from(bound).map_err(|_| Error::SizeOverflow)?;

    let mut output = Vec::new();
    output.try_reserve_exact(bound).map_err(|_| Error::SizeOverflow)?;
    output.resize(bound, 0);
    let mut cursor = 0;

    let mut pos = header.len;
    loop {
        let block_length = read_u32_at(input, pos)?;
        pos += 4;
        if block_length == 0 {
            break;
        }

        let is_compressed = block_length & INCOMPRESSIBLE == 0;
        let block_length = (block_length & !INCOMPRESSIBLE) as usize;

        let block = input.get(pos..).and_then(|rest| rest.get(..block_length)).ok_or(DecodeError::UnexpectedEnd)?;
        pos += block_length;
        if header.flags.block_checksums() {
            pos += 4; // not verified
        }

        if is_compressed {
            cursor = raw::decompress_block(block, &mut output, cursor)?;
        } else {
            let target = output.get_mut(cursor..).and_then(|rest| rest.get_mut(..block_length)).ok_or(DecodeError::OutputOverflow)?;
            target.copy_from_slice(block);
            cursor += block_length;
        }
        trace!(is_compressed, block_length, cursor, "decoded block");
    }

    output.truncate(cursor);
    output
}
