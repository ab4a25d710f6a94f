use byteorder::{ByteOrder, LE};
use std::cmp;
use std::hash::Hasher;
use std::io::{self, ErrorKind, Write};
use std::mem;
use tracing::{debug, trace};
use twox_hash::XxHash32;

use super::{BlockDescriptor, BlockSize, Flags, INCOMPRESSIBLE, MAGIC};
use crate::raw::{compress_block, HashTable, MAX_INPUT_SPAN};

/// Upper bound for the size of a frame produced from `len` bytes with the default settings.
pub fn compress_bound(len: usize) -> usize {
    len + len / 255 + 16
}

/// A builder-style struct that configures compression settings.
/// This is how you compress LZ4 frames.
///
/// Create it using `Default::default()`.
#[derive(Clone, Debug, Default)]
pub struct CompressionSettings {
    block_size: BlockSize,
    content_size: bool,
}

impl CompressionSettings {
    /// Input is split into blocks of this size. Each block is stored uncompressed if compressing
    /// it doesn't make it smaller, so smaller blocks react faster to incompressible stretches.
    ///
    /// The default block size is 4 MiB.
    pub fn block_size(&mut self, v: BlockSize) -> &mut Self {
        self.block_size = v;
        self
    }

    /// Store the length of the input in the frame header (8 more bytes), which lets the
    /// decompressing side allocate exactly as much memory as needed.
    ///
    /// The content size is not written by default.
    pub fn content_size(&mut self, v: bool) -> &mut Self {
        self.content_size = v;
        self
    }

    fn output_bound(&self, len: usize) -> usize {
        compress_bound(len) + if self.content_size { 8 } else { 0 }
    }

    /// Compress `input` into a single frame.
    ///
    /// All blocks share one hash table, so later blocks can reference earlier ones. The frame is
    /// therefore marked as having linked blocks.
    pub fn compress(&self, input: &[u8]) -> Vec<u8> {
        let mut output = vec![0u8; self.output_bound(input.len())];
        let mut pos = self.write_header(&mut output, input.len());

        let block_size = self.block_size.bytes();
        let mut table = HashTable::default();
        let mut window_start = 0;
        let mut compressed_blocks = 0;
        for block_start in (0..input.len()).step_by(block_size) {
            let block_end = cmp::min(block_start + block_size, input.len());
            if block_end - window_start > MAX_INPUT_SPAN {
                // positions would no longer fit into the table
                window_start = block_start;
                table.clear();
            }
            let block = &input[block_start..block_end];
            let payload = pos + 4;

            // limit output to one byte less than the input so we never have negative compression ratio
            let mut sink = NoPartialWrites(&mut output[payload..payload + block.len() - 1]);
            let compressed_len = match compress_block(&input[window_start..block_end], block_start - window_start, &mut table, &mut sink) {
                Ok(true) => Some(block.len() - 1 - sink.0.len()),
                Ok(false) => None,
                Err(e) => {
                    debug_assert_eq!(e.kind(), ErrorKind::ConnectionAborted);
                    None
                }
            };

            pos = match compressed_len {
                Some(len) => {
                    LE::write_u32(&mut output[pos..], len as u32);
                    compressed_blocks += 1;
                    trace!(block_start, block_length = block.len(), compressed_length = len, "compressed block");
                    payload + len
                }
                None => {
                    // incompressible
                    LE::write_u32(&mut output[pos..], block.len() as u32 | INCOMPRESSIBLE);
                    output[payload..payload + block.len()].copy_from_slice(block);
                    trace!(block_start, block_length = block.len(), "stored block uncompressed");
                    payload + block.len()
                }
            };
        }
        LE::write_u32(&mut output[pos..], 0);
        pos += 4;

        output.truncate(pos);
        debug!(input_length = input.len(), output_length = output.len(), compressed_blocks, "compressed frame");
        output
    }

    /// Writes the frame header and returns its length.
    fn write_header(&self, output: &mut [u8], content_size: usize) -> usize {
        let mut flags = Flags::empty();
        if self.content_size {
            flags |= Flags::ContentSize;
        }

        LE::write_u32(output, MAGIC);
        output[4] = flags.to_byte();
        output[5] = BlockDescriptor::new(self.block_size).0;
        let mut pos = 6;

        if self.content_size {
            LE::write_u64(&mut output[pos..], content_size as u64);
            pos += 8;
        }

        let mut hasher = XxHash32::with_seed(0);
        hasher.write(&output[4..pos]); // skip magic for header checksum
        output[pos] = (hasher.finish() >> 8) as u8;
        pos + 1
    }
}

/// Helper struct to allow more efficient code generation when using the Write trait on byte buffers.
///
/// The underlying problem is that the Write impl on [u8] (and everything similar, e.g. Cursor<[u8]>)
/// is specified to write as many bytes as possible before returning an error.
/// This is a problem because it forces e.g. a 32-bit write to compile to four 8-bit writes with a range
/// check every time, rather than a single 32-bit write with a range check.
///
/// This wrapper aims to resolve the problem by simply not writing anything in case we fail the bounds check,
/// as we throw away the entire buffer in that case anyway.
struct NoPartialWrites<'a>(&'a mut [u8]);
impl<'a> Write for NoPartialWrites<'a> {
    #[inline]
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.0.len() < data.len() {
            // quite frankly it doesn't matter what we specify here
            return Err(ErrorKind::ConnectionAborted.into());
        }

        let amt = data.len();
        let (a, b) = mem::replace(&mut self.0, &mut []).split_at_mut(data.len());
        a.copy_from_slice(data);
        self.0 = b;
        Ok(amt)
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
