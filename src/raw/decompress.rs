use byteorder::{ByteOrder, LE};
use fehler::{throw, throws};
use thiserror::Error;

use super::{LSIC_LIMIT, MINMATCH};

#[derive(Error, Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum DecodeError {
    /// Expected more bytes, but found none.
    /// Either your input was truncated or you're trying to decompress garbage.
    #[error("unexpected end of input")]
    UnexpectedEnd,
    /// The offset for a deduplication is zero or points before the start of the output.
    #[error("invalid deduplication offset")]
    InvalidDeduplicationOffset,
    /// The block decodes to more data than the output buffer can hold.
    #[error("decoded data does not fit into the output buffer")]
    OutputOverflow,
}
type Error = DecodeError;

/// This is how LZ4 encodes varints.
/// Just keep reading and adding while it's all F.
///
/// Returns the decoded value and the number of extension bytes consumed from `input`.
#[throws]
fn read_lsic(initial: u8, input: &[u8]) -> (usize, usize) {
    let mut value = initial as usize;
    let mut consumed = 0;
    if value == LSIC_LIMIT {
        loop {
            let more = *input.get(consumed).ok_or(Error::UnexpectedEnd)?;
            consumed += 1;
            value = value.saturating_add(more as usize);
            if more != 0xFF {
                break;
            }
        }
    }
    (value, consumed)
}

/// Decompress an LZ4-compressed block into `output`, starting at `cursor`.
///
/// The bytes of `output` before `cursor` are the lookback window: matches may reference them,
/// which is how blocks of one frame refer to each other. `output` has to be large enough to hold
/// the decompressed block, it is never grown.
///
/// Returns the position right after the last byte written.
#[throws]
pub fn decompress_block(input: &[u8], output: &mut [u8], mut cursor: usize) -> usize {
    let mut pos = 0;
    while pos < input.len() {
        let token = input[pos];
        pos += 1;

        // read literals
        let (literal_length, consumed) = read_lsic(token >> 4, &input[pos..])?;
        pos += consumed;

        let literal = input.get(pos..).and_then(|rest| rest.get(..literal_length)).ok_or(Error::UnexpectedEnd)?;
        let target = output.get_mut(cursor..).and_then(|rest| rest.get_mut(..literal_length)).ok_or(Error::OutputOverflow)?;
        target.copy_from_slice(literal);
        pos += literal_length;
        cursor += literal_length;

        // the last token has no duplicate
        if pos >= input.len() {
            break;
        }

        // read duplicates
        let offset = input.get(pos..pos + 2).map(LE::read_u16).ok_or(Error::UnexpectedEnd)? as usize;
        pos += 2;
        let (match_len, consumed) = read_lsic(token & 0xF, &input[pos..])?;
        pos += consumed;

        cursor = copy_overlapping(offset, match_len.saturating_add(MINMATCH), output, cursor)?;
    }
    cursor
}

#[throws]
fn copy_overlapping(offset: usize, match_len: usize, output: &mut [u8], cursor: usize) -> usize {
    if offset == 0 || offset > cursor {
        throw!(Error::InvalidDeduplicationOffset);
    }
    if output.len() - cursor < match_len {
        throw!(Error::OutputOverflow);
    }

    let start = cursor - offset;
    let end = cursor + match_len;
    match offset {
        // fastpath: memset if we repeat the same byte forever
        1 => {
            let byte = output[start];
            for b in &mut output[cursor..end] {
                *b = byte;
            }
        }

        // fastpath: nonoverlapping
        o if o > match_len => output.copy_within(start..start + match_len, cursor),

        // overlapping: every copy of the pattern depends on the one written before it,
        // so repeat the first `offset` bytes as whole chunks and finish with the remainder
        _ => {
            let mut target = cursor;
            for _ in 0..match_len / offset {
                output.copy_within(start..cursor, target);
                target += offset;
            }
            output.copy_within(start..start + match_len % offset, target);
        }
    }
    end
}
