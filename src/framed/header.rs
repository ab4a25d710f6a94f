#![allow(non_upper_case_globals)]

use bitflags::bitflags;
use fehler::{throw, throws};

use super::{byte_at, read_u32_at, read_u64_at, DecompressionError, MAGIC};

type Error = DecompressionError;

/// The only frame version there is, stored in the top two bits of the flag byte.
const VERSION: u8 = 0b01000000;
const VERSION_MASK: u8 = 0b11000000;

bitflags! {
    pub struct Flags: u8 {
        const IndependentBlocks = 0b00100000;
        const BlockChecksums    = 0b00010000;
        const ContentSize       = 0b00001000;
        const ContentChecksum   = 0b00000100;
        const DictionaryId      = 0b00000001;
    }
}

impl Flags {
    #[throws]
    pub fn parse(i: u8) -> Self {
        if (i & VERSION_MASK) != VERSION {
            throw!(Error::UnsupportedVersion(i >> 6));
        }

        Flags::from_bits_truncate(i)
    }

    /// The flag byte as it appears in the frame, including the version bits.
    pub fn to_byte(self) -> u8 { VERSION | self.bits() }

    pub fn independent_blocks(&self) -> bool { self.contains(Flags::IndependentBlocks) }
    pub fn block_checksums(&self)    -> bool { self.contains(Flags::BlockChecksums) }
    pub fn content_size(&self)       -> bool { self.contains(Flags::ContentSize) }
    pub fn content_checksum(&self)   -> bool { self.contains(Flags::ContentChecksum) }
    pub fn dictionary_id(&self)      -> bool { self.contains(Flags::DictionaryId) }
}

/// The maximum size of a block in a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockSize {
    Max64KiB = 4,
    Max256KiB = 5,
    Max1MiB = 6,
    Max4MiB = 7,
}

impl Default for BlockSize {
    fn default() -> Self { BlockSize::Max4MiB }
}

impl BlockSize {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            4 => Some(BlockSize::Max64KiB),
            5 => Some(BlockSize::Max256KiB),
            6 => Some(BlockSize::Max1MiB),
            7 => Some(BlockSize::Max4MiB),
            _ => None,
        }
    }

    pub fn id(self) -> u8 { self as u8 }

    pub fn bytes(self) -> usize { 1 << (self.id() * 2 + 8) }
}

/// The BD byte of the frame header. Only the block size lives here so far.
pub struct BlockDescriptor(pub u8);
impl BlockDescriptor {
    pub fn new(block_size: BlockSize) -> Self {
        BlockDescriptor(block_size.id() << 4)
    }

    #[throws]
    pub fn block_size(&self) -> BlockSize {
        let id = (self.0 >> 4) & 0b111;
        match BlockSize::from_id(id) {
            Some(size) => size,
            None => throw!(Error::InvalidBlockSizeId(id)),
        }
    }
}

/// Everything in front of the first block header.
#[derive(Clone, Debug)]
pub struct FrameHeader {
    pub flags: Flags,
    pub block_size: BlockSize,
    pub content_size: Option<u64>,
    pub dictionary_id: Option<u32>,
    /// Parsed but not verified.
    pub header_checksum: u8,
    /// Number of bytes the header occupies, magic number included.
    pub len: usize,
}

impl FrameHeader {
    #[throws]
    pub fn parse(input: &[u8]) -> Self {
        let magic = read_u32_at(input, 0)?;
        if magic != MAGIC {
            throw!(Error::InvalidMagicNumber(magic));
        }

        let flags = Flags::parse(byte_at(input, 4)?)?;
        let block_size = BlockDescriptor(byte_at(input, 5)?).block_size()?;
        let mut pos = 6;

        let content_size = if flags.content_size() {
            let i = read_u64_at(input, pos)?;
            pos += 8;
            Some(i)
        } else {
            None
        };

        let dictionary_id = if flags.dictionary_id() {
            let i = read_u32_at(input, pos)?;
            pos += 4;
            Some(i)
        } else {
            None
        };

        let header_checksum = byte_at(input, pos)?;
        pos += 1;

        FrameHeader { flags, block_size, content_size, dictionary_id, header_checksum, len: pos }
    }
}
