//! The raw LZ4 block format.
//!
//! A block is a plain sequence of tokens without any framing. Using this directly saves you the
//! framing overhead but you lose the fallback mechanism for incompressible data: the frame format
//! stores a block uncompressed if the compressed version would be larger. Also note that a block
//! carries no length information, so you have to keep track of the decompressed size yourself.

mod compress;
mod decompress;

pub use compress::*;
pub use decompress::*;

/// Every match is at least this long, so the token stores the length minus this value.
pub(crate) const MINMATCH: usize = 4;
/// A token nibble with this value means the length continues in extension bytes.
pub(crate) const LSIC_LIMIT: usize = 0xF;
