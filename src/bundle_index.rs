use std::{fs, path::Path};

use bytes::Bytes;
use log::debug;
use nom::{
    bytes::complete::take,
    number::complete::{le_u32, le_u64},
    IResult,
};
use serde::Serialize;

use crate::{
    bundle::Bundle,
    decompress::BlockDecompressor,
    error::{Error, Result},
};

/// One on-disk bundle, stored at `Bundles2/{name}.bundle.bin`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleRecord {
    pub name: String,
    pub uncompressed_size: u32,
}

impl BundleRecord {
    /// Location of the bundle relative to the game folder
    pub fn bin_path(&self) -> String {
        format!("Bundles2/{}.bundle.bin", self.name)
    }
}

/// Where a file lives: a byte range inside the uncompressed bundle `bundle_index`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub path_hash: u64,
    pub bundle_index: u32,
    pub file_offset: u32,
    pub file_size: u32,
}

/// A run of encoded paths inside the decompressed path table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PathRegion {
    pub hash: u64,
    pub offset: u32,
    pub size: u32,
    pub recursive_size: u32,
}

#[derive(Debug, Clone)]
pub struct BundleIndex {
    pub bundles: Vec<BundleRecord>,
    pub files: Vec<FileRecord>,
    pub path_regions: Vec<PathRegion>,
    /// Still block compressed, decoded on demand by [`crate::path::PathTable`]
    pub path_table_bundle: Bytes,
}

impl BundleIndex {
    /// Decode an index from the raw bytes of its outer container
    pub fn parse<D>(data: impl Into<Bytes>, decompressor: &D) -> Result<Self>
    where
        D: BlockDecompressor + ?Sized,
    {
        let payload = Bundle::parse(data)?.decompress_all(decompressor)?;
        parse_index_payload(payload)
    }
}

// Parser for a UTF-8 string of given length
fn parse_string(input: &[u8], length: u32) -> IResult<&[u8], String> {
    let (input, data) = take(length)(input)?;
    let string = String::from_utf8_lossy(data).to_string();
    Ok((input, string))
}

// Parser for a BundleRecord
fn parse_bundle_record(input: &[u8]) -> IResult<&[u8], BundleRecord> {
    let (input, name_length) = le_u32(input)?;
    let (input, name) = parse_string(input, name_length)?;
    let (input, uncompressed_size) = le_u32(input)?;
    Ok((
        input,
        BundleRecord {
            name,
            uncompressed_size,
        },
    ))
}

// Parser for a FileRecord
fn parse_file_record(input: &[u8]) -> IResult<&[u8], FileRecord> {
    let (input, path_hash) = le_u64(input)?;
    let (input, bundle_index) = le_u32(input)?;
    let (input, file_offset) = le_u32(input)?;
    let (input, file_size) = le_u32(input)?;
    Ok((
        input,
        FileRecord {
            path_hash,
            bundle_index,
            file_offset,
            file_size,
        },
    ))
}

// Parser for a PathRegion
fn parse_path_region(input: &[u8]) -> IResult<&[u8], PathRegion> {
    let (input, hash) = le_u64(input)?;
    let (input, offset) = le_u32(input)?;
    let (input, size) = le_u32(input)?;
    let (input, recursive_size) = le_u32(input)?;
    Ok((
        input,
        PathRegion {
            hash,
            offset,
            size,
            recursive_size,
        },
    ))
}

/// Read a u32 length prefix followed by that many records.
///
/// Fixed size records are bounds checked up front so a bogus count can't reserve a huge vector.
fn parse_section<'a, T>(
    payload: &'a [u8],
    input: &'a [u8],
    section: &'static str,
    record_size: Option<usize>,
    parser: fn(&[u8]) -> IResult<&[u8], T>,
) -> Result<(&'a [u8], Vec<T>)> {
    let truncated = |rest: &[u8]| Error::TruncatedIndex {
        section,
        offset: payload.len() - rest.len(),
    };

    let (input, n) =
        le_u32::<_, nom::error::Error<_>>(input).map_err(|_| truncated(input))?;
    let n = n as usize;

    if let Some(size) = record_size {
        if n.saturating_mul(size) > input.len() {
            return Err(truncated(input));
        }
    }

    let mut records = Vec::with_capacity(n.min(input.len()));
    let mut rest = input;
    for _ in 0..n {
        let (next, record) = parser(rest).map_err(|_| truncated(rest))?;
        records.push(record);
        rest = next;
    }

    Ok((rest, records))
}

/// Parse the decompressed index payload. The remainder after the path regions is the path table
/// container, kept as is.
pub fn parse_index_payload(payload: Bytes) -> Result<BundleIndex> {
    let input: &[u8] = &payload;

    let (input, bundles) = parse_section(&payload, input, "bundles", None, parse_bundle_record)?;
    let (input, files) = parse_section(&payload, input, "files", Some(20), parse_file_record)?;
    let (input, path_regions) =
        parse_section(&payload, input, "path regions", Some(24), parse_path_region)?;

    let consumed = payload.len() - input.len();
    let path_table_bundle = payload.slice(consumed..);

    debug!(
        "Bundle index: {} bundles, {} files, {} path regions, {} byte path table",
        bundles.len(),
        files.len(),
        path_regions.len(),
        path_table_bundle.len()
    );

    Ok(BundleIndex {
        bundles,
        files,
        path_regions,
        path_table_bundle,
    })
}

/// Load an index file from disk
pub fn load_index_file<D>(path: &Path, decompressor: &D) -> Result<BundleIndex>
where
    D: BlockDecompressor + ?Sized,
{
    let content = fs::read(path)?;
    BundleIndex::parse(content, decompressor)
}
