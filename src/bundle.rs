use std::{fs, path::Path};

use bytes::Bytes;
use log::{debug, warn};
use nom::{
    bytes::complete::take,
    multi::count,
    number::complete::{le_u32, le_u64},
    IResult,
};
use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};

use crate::{
    decompress::BlockDecompressor,
    error::{Error, Result},
};

/// Size of the header before the block size table
const FIXED_HEADER_SIZE: usize = 60;

/// Encoded as a u32
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstFileEncode {
    Kraken6,
    MermaidA,
    Bitknit,
    LeviathanC,
    Unknown(u32),
}

impl From<u32> for FirstFileEncode {
    fn from(value: u32) -> Self {
        match value {
            8 => Self::Kraken6,
            9 => Self::MermaidA,
            12 => Self::Bitknit,
            13 => Self::LeviathanC,
            x => Self::Unknown(x),
        }
    }
}

/// Container header. The 32-bit sizes are authoritative, the 64-bit copies are only cross-checked.
#[derive(Debug, Clone)]
pub struct HeadPayload {
    pub uncompressed_size: u32,
    pub total_payload_size: u32,
    pub head_payload_size: u32,
    pub first_file_encode: FirstFileEncode,
    pub uncompressed_size_2: u64,
    pub total_payload_size_2: u64,
    pub uncompressed_block_granularity: u32,
}

/// A parsed compressed container. Keeps the source bytes so it can be decoded any number of
/// times.
#[derive(Debug, Clone)]
pub struct Bundle {
    pub head: HeadPayload,
    pub block_sizes: Vec<u32>,
    data: Bytes,
    data_start: usize,
}

impl Bundle {
    pub fn parse(data: impl Into<Bytes>) -> Result<Self> {
        let data: Bytes = data.into();

        let (rest, (head, block_count)) =
            parse_head_payload(&data).map_err(|_| Error::TruncatedStream {
                block: None,
                offset: 0,
                needed: FIXED_HEADER_SIZE,
                available: data.len(),
            })?;

        let table_len = block_count as usize * 4;
        if rest.len() < table_len {
            return Err(Error::TruncatedStream {
                block: None,
                offset: FIXED_HEADER_SIZE,
                needed: table_len,
                available: rest.len(),
            });
        }
        let (_, block_sizes) =
            parse_block_sizes(rest, block_count).map_err(|_| Error::TruncatedStream {
                block: None,
                offset: FIXED_HEADER_SIZE,
                needed: table_len,
                available: rest.len(),
            })?;

        check_head(&head, block_count)?;

        debug!(
            "Bundle: {} bytes in {} blocks of {} ({:?})",
            head.uncompressed_size,
            block_count,
            head.uncompressed_block_granularity,
            head.first_file_encode
        );

        Ok(Self {
            head,
            block_sizes,
            data,
            data_start: FIXED_HEADER_SIZE + table_len,
        })
    }

    pub fn uncompressed_size(&self) -> usize {
        self.head.uncompressed_size as usize
    }

    /// Uncompressed size of block `i`. Every block is the granularity apart from the last, which
    /// holds whatever is left.
    pub fn block_uncompressed_size(&self, i: usize) -> usize {
        if i + 1 == self.block_sizes.len() {
            self.uncompressed_size() - i * self.block_stride()
        } else {
            self.block_stride()
        }
    }

    // A lone block holds everything, whatever the granularity field says
    fn block_stride(&self) -> usize {
        if self.block_sizes.len() == 1 {
            self.uncompressed_size().max(1)
        } else {
            self.head.uncompressed_block_granularity as usize
        }
    }

    /// Return the entire content of the bundle
    pub fn decompress_all<D>(&self, decompressor: &D) -> Result<Bytes>
    where
        D: BlockDecompressor + ?Sized,
    {
        let buf = self.decode_blocks(0, self.block_sizes.len(), decompressor)?;
        Ok(Bytes::from(buf))
    }

    /// Return `len` bytes starting at `offset`, only decoding the blocks that overlap them
    pub fn read_range<D>(&self, offset: usize, len: usize, decompressor: &D) -> Result<Bytes>
    where
        D: BlockDecompressor + ?Sized,
    {
        let size = self.uncompressed_size();
        if offset.checked_add(len).map_or(true, |end| end > size) {
            return Err(Error::RangeOutOfBounds { offset, len, size });
        }
        if len == 0 {
            return Ok(Bytes::new());
        }

        let block_size = self.block_stride();
        let block_start = offset / block_size;
        let block_end = (offset + len).div_ceil(block_size);

        let buf = self.decode_blocks(block_start, block_end, decompressor)?;

        // Grab subset from the block aligned buffer
        let start = offset - block_start * block_size;
        Ok(Bytes::from(buf).slice(start..start + len))
    }

    /// Slices out the compressed bytes of blocks `..end`
    fn compressed_blocks(&self, end: usize) -> Result<Vec<&[u8]>> {
        let mut offset = self.data_start;
        let mut blocks = Vec::with_capacity(end);

        for (i, &size) in self.block_sizes[..end].iter().enumerate() {
            let size = size as usize;
            let available = self.data.len().saturating_sub(offset);
            if size > available {
                return Err(Error::TruncatedStream {
                    block: Some(i),
                    offset,
                    needed: size,
                    available,
                });
            }

            blocks.push(&self.data[offset..offset + size]);
            offset += size;
        }

        Ok(blocks)
    }

    /// Decode blocks `start..end` into one contiguous buffer
    fn decode_blocks<D>(&self, start: usize, end: usize, decompressor: &D) -> Result<Vec<u8>>
    where
        D: BlockDecompressor + ?Sized,
    {
        let blocks = self.compressed_blocks(end)?;

        let buf_size: usize = (start..end).map(|i| self.block_uncompressed_size(i)).sum();
        let mut buf = vec![0; buf_size];
        if buf.is_empty() {
            return Ok(buf);
        }

        // Chunk into slices which can be written to in parallel
        let chunks = buf.chunks_mut(self.block_stride()).collect::<Vec<_>>();

        chunks
            .into_par_iter()
            .zip(&blocks[start..end])
            .enumerate()
            .try_for_each(|(i, (chunk, block))| {
                let block_index = start + i;
                let expected = chunk.len();

                let written = decompressor
                    .decompress_block(block, chunk)
                    .map_err(|reason| Error::CorruptBlock {
                        block: block_index,
                        reason,
                    })?;

                if written != expected {
                    return Err(Error::CorruptBlock {
                        block: block_index,
                        reason: format!("decoded {written} bytes, expected {expected}"),
                    });
                }

                Ok(())
            })?;

        Ok(buf)
    }
}

// Parser for the fixed part of the header, also returns the block count
fn parse_head_payload(input: &[u8]) -> IResult<&[u8], (HeadPayload, u32)> {
    let (input, uncompressed_size) = le_u32(input)?;
    let (input, total_payload_size) = le_u32(input)?;
    let (input, head_payload_size) = le_u32(input)?;
    let (input, first_file_encode) = le_u32(input)?;
    let (input, _) = take(4usize)(input)?; // Skip bytes 16-20
    let (input, uncompressed_size_2) = le_u64(input)?;
    let (input, total_payload_size_2) = le_u64(input)?;
    let (input, block_count) = le_u32(input)?;
    let (input, uncompressed_block_granularity) = le_u32(input)?;
    let (input, _) = take(16usize)(input)?; // Skip bytes 44-60

    Ok((
        input,
        (
            HeadPayload {
                uncompressed_size,
                total_payload_size,
                head_payload_size,
                first_file_encode: first_file_encode.into(),
                uncompressed_size_2,
                total_payload_size_2,
                uncompressed_block_granularity,
            },
            block_count,
        ),
    ))
}

// Parser for the block size table
fn parse_block_sizes(input: &[u8], block_count: u32) -> IResult<&[u8], Vec<u32>> {
    count(le_u32, block_count as usize)(input)
}

/// Cross-check the redundant size fields and the block geometry
fn check_head(head: &HeadPayload, block_count: u32) -> Result<()> {
    let size = head.uncompressed_size as u64;
    let payload = head.total_payload_size as u64;

    // A wider value in the 64-bit copy means the 32-bit field lost bits
    if head.uncompressed_size_2 > size {
        return Err(Error::HeaderMismatch(format!(
            "64-bit uncompressed size {} exceeds 32-bit field {}",
            head.uncompressed_size_2, size
        )));
    }
    if head.total_payload_size_2 > payload {
        return Err(Error::HeaderMismatch(format!(
            "64-bit payload size {} exceeds 32-bit field {}",
            head.total_payload_size_2, payload
        )));
    }
    if head.uncompressed_size_2 != size || head.total_payload_size_2 != payload {
        warn!(
            "Bundle header size copies disagree: {}/{} vs {}/{}",
            size, payload, head.uncompressed_size_2, head.total_payload_size_2
        );
    }

    let blocks = block_count as u64;
    let granularity = head.uncompressed_block_granularity as u64;
    if blocks == 0 {
        if size != 0 {
            return Err(Error::HeaderMismatch(format!(
                "no blocks to hold {size} bytes"
            )));
        }
        return Ok(());
    }
    // The last block takes the remainder, so a lone block can hold any size
    if blocks == 1 {
        return Ok(());
    }
    if granularity == 0 {
        return Err(Error::HeaderMismatch("zero block granularity".to_string()));
    }
    if blocks * granularity < size {
        return Err(Error::HeaderMismatch(format!(
            "{blocks} blocks of {granularity} bytes cannot hold {size} bytes"
        )));
    }
    if (blocks - 1) * granularity >= size {
        return Err(Error::HeaderMismatch(format!(
            "{blocks} blocks of {granularity} bytes leave the last block empty for {size} bytes"
        )));
    }

    Ok(())
}

/// Load a bundle file from disk
pub fn load_bundle(path: &Path) -> Result<Bundle> {
    let content = fs::read(path)?;
    Bundle::parse(content)
}
