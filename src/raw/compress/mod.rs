//! The compression algorithm.
//!
//! We make use of a hash table to find duplicates. This gives a reasonable compression ratio with a
//! high performance. It has fixed memory usage, which contrary to other approaches, makes it less
//! memory hungry.

use std::cmp;
use std::io::Write;
use std::mem;
use byteorder::{ByteOrder, NativeEndian, WriteBytesExt, LE};
use fehler::throws;

use super::{LSIC_LIMIT, MINMATCH};

type Error = std::io::Error;

/// Number of slots in the duplication dictionary.
///
/// Every four byte window is hashed into one of these slots. Collisions simply overwrite the
/// previous entry, there is no chaining.
pub const HASH_TABLE_SLOTS: usize = 1 << 16;

/// Slots store `position + 1` as an `u32`, so this is the largest input `compress_block` accepts.
pub const MAX_INPUT_SPAN: usize = u32::MAX as usize;

/// Matches can't be further away than this because offsets are encoded as `u16`.
const MAX_OFFSET: usize = 0xFFFF;
/// We stop looking for matches once fewer bytes than this remain in the block.
const MATCH_SEARCH_LIMIT: usize = 12;
/// The last five bytes of a block must always be encoded as literals.
const MIN_TRAILING_LITERALS: usize = 5;
/// For each 64 misses in a row, skip in bigger increments.
const SKIP_TRIGGER: usize = 6;
const MISS_COUNTER_BASE: usize = (1 << SKIP_TRIGGER) + 3;

/// The most-recent-position table used to find match candidates.
///
/// A table lives as long as one frame and is shared by all of its blocks, which lets later blocks
/// reference data from earlier ones. Positions are relative to the `input` slice handed to
/// `compress_block`, so every block of a frame has to be compressed against the same base.
#[derive(Clone)]
pub struct HashTable {
    slots: Box<[u32]>,
}

impl Default for HashTable {
    fn default() -> Self {
        HashTable { slots: vec![0; HASH_TABLE_SLOTS].into_boxed_slice() }
    }
}

impl HashTable {
    /// Forget every recorded position.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = 0;
        }
    }

    /// Record `position` for `window` and return the position previously recorded in that slot.
    fn replace(&mut self, window: u32, position: usize) -> Option<usize> {
        debug_assert!(position < MAX_INPUT_SPAN);
        let previous = mem::replace(&mut self.slots[hash(window)], (position + 1) as u32);
        (previous as usize).checked_sub(1) // zero marks an empty slot
    }
}

/// Scrambles a four byte window and folds the result down to a 16 bit table index.
pub fn hash(window: u32) -> usize {
    let mut a = window;
    a = a.wrapping_add(0x7ED5_5D16).wrapping_add(a << 12);
    a ^= 0xC761_C23C ^ (a >> 19);
    a = a.wrapping_add(0x1656_67B1).wrapping_add(a << 5);
    a = a.wrapping_add(0xD3A2_646C) ^ (a << 9);
    a = a.wrapping_add(0xFD70_46C5).wrapping_add(a << 3);
    a ^= 0xB55A_4F09 ^ (a >> 16);

    (((a >> 16) ^ a) & 0xFFFF) as usize
}

#[derive(Copy, Clone, Debug)]
struct Duplicate {
    /// The number of bytes before our cursor, where the duplicate starts.
    offset: u16,

    /// The length beyond the four first bytes.
    ///
    /// Adding four to this number yields the actual length.
    extra_bytes: usize,
}

fn count_matching_bytes(a: &[u8], b: &[u8]) -> usize {
    const REGSIZE: usize = mem::size_of::<usize>();
    fn read_usize(b: &[u8]) -> usize {
        let mut buf = [0u8; REGSIZE];
        buf.copy_from_slice(&b[..REGSIZE]);
        usize::from_le_bytes(buf)
    }

    let mut matching_bytes = 0;
    // compare a full register at a time instead of single bytes
    for (a, b) in a.chunks_exact(REGSIZE).zip(b.chunks_exact(REGSIZE)) {
        let xor = read_usize(a) ^ read_usize(b);
        if xor == 0 {
            matching_bytes += REGSIZE;
        } else {
            // little endian read, so the first differing byte sits in the lowest bits
            matching_bytes += (xor.trailing_zeros() / 8) as usize;
            return matching_bytes;
        }
    }

    // all full registers matched, but there may be a few more bytes to check
    let trailing_matches = a.iter().zip(b).skip(matching_bytes).take_while(|&(a, b)| a == b).count();
    matching_bytes + trailing_matches
}

/// Compress the block `input[start..]` and write the token stream to `writer`.
///
/// The bytes before `start` are not encoded but may be referenced, as long as `table` has seen them
/// (i.e. they were part of an earlier block of the same frame). The table is updated as we go.
///
/// Returns `false` if nothing could be encoded because no match was ever found. In that case
/// the caller should store the block uncompressed, and the output written so far is meaningless.
///
/// Any error returned by `writer` aborts compression. The frame compressor uses a writer with
/// limited capacity so it can stop as soon as compression doesn't pay off.
#[throws]
pub fn compress_block<W: Write>(input: &[u8], start: usize, table: &mut HashTable, mut writer: W) -> bool {
    assert!(input.len() <= MAX_INPUT_SPAN, "input too large for a 32 bit hash table");
    assert!(start <= input.len());

    let end = input.len();
    let mut anchor = start;
    let mut cursor = start;
    let mut miss_counter = MISS_COUNTER_BASE;

    // skipping can carry the cursor past `end`, so don't subtract from it
    while cursor + MATCH_SEARCH_LIMIT <= end {
        let window = LE::read_u32(&input[cursor..]);

        let candidate = match table.replace(window, cursor) {
            Some(candidate) if is_duplicate(input, window, cursor, candidate) => candidate,
            _ => {
                // the longer we miss, the faster we skip through incompressible data
                cursor += miss_counter >> SKIP_TRIGGER;
                miss_counter += 1;
                continue;
            }
        };
        miss_counter = MISS_COUNTER_BASE;

        // the first four bytes were already compared above
        let extra_bytes = count_matching_bytes(
            &input[cursor + MINMATCH..end - MIN_TRAILING_LITERALS],
            &input[candidate + MINMATCH..],
        );
        let duplicate = Duplicate { offset: (cursor - candidate) as u16, extra_bytes };
        write_group(&mut writer, &input[anchor..cursor], duplicate)?;

        cursor += MINMATCH + extra_bytes;
        anchor = cursor;
    }

    if anchor == start {
        return false;
    }

    write_last_literals(&mut writer, &input[anchor..])?;
    true
}

fn is_duplicate(input: &[u8], window: u32, cursor: usize, candidate: usize) -> bool {
    candidate < cursor
        && cursor - candidate <= MAX_OFFSET
        && LE::read_u32(&input[candidate..]) == window // the hash is only a hint
}

#[throws]
fn write_group<W: Write>(writer: &mut W, literal: &[u8], duplicate: Duplicate) {
    let literal_len = literal.len();

    let mut token = 0;
    write_lsic_head(&mut token, 4, literal_len);
    write_lsic_head(&mut token, 0, duplicate.extra_bytes);

    writer.write_u8(token)?;
    write_lsic_tail(writer, literal_len)?;
    writer.write_all(literal)?;
    writer.write_u16::<LE>(duplicate.offset)?;
    write_lsic_tail(writer, duplicate.extra_bytes)?;
}

/// The final token of a block carries literals only.
#[throws]
fn write_last_literals<W: Write>(writer: &mut W, literal: &[u8]) {
    let mut token = 0;
    write_lsic_head(&mut token, 4, literal.len());

    writer.write_u8(token)?;
    write_lsic_tail(writer, literal.len())?;
    writer.write_all(literal)?;
}

fn write_lsic_head(token: &mut u8, shift: usize, value: usize) {
    let i = cmp::min(value, LSIC_LIMIT) as u8;
    *token |= i << shift;
}

#[throws]
fn write_lsic_tail<W: Write>(writer: &mut W, mut value: usize) {
    if value < LSIC_LIMIT {
        return;
    }

    value -= LSIC_LIMIT;

    while value >= 4 * 0xFF {
        writer.write_u32::<NativeEndian>(u32::MAX)?;
        value -= 4 * 0xFF;
    }
    while value >= 0xFF {
        writer.write_u8(0xFF)?;
        value -= 0xFF;
    }
    writer.write_u8(value as u8)?;
}
