//! Builders for synthetic bundles, indices and path tables used by the unit tests

use std::fs;

use tempfile::TempDir;

use crate::{
    bundle_fs::INDEX_PATH,
    bundle_index::{FileRecord, PathRegion},
    hasher::{BuildMurmurHash64A, PathHasher},
};

/// "Decompresses" by copying, so a stored block is just the raw bytes
#[derive(Debug, Default, Clone, Copy)]
pub struct StoredDecompressor;

impl crate::decompress::BlockDecompressor for StoredDecompressor {
    fn decompress_block(&self, block: &[u8], output: &mut [u8]) -> Result<usize, String> {
        let len = block.len().min(output.len());
        output[..len].copy_from_slice(&block[..len]);
        Ok(len)
    }
}

/// Raw header fields, so tests can make them disagree
pub struct Header {
    pub uncompressed_size: u32,
    pub uncompressed_size_2: u64,
    pub total_payload_size: u32,
    pub total_payload_size_2: u64,
    pub granularity: u32,
    pub block_sizes: Vec<u32>,
}

impl Header {
    pub fn for_blocks(uncompressed_size: u32, granularity: u32, blocks: &[&[u8]]) -> Self {
        let block_sizes: Vec<u32> = blocks.iter().map(|b| b.len() as u32).collect();
        let total_payload_size: u32 = block_sizes.iter().sum();
        Self {
            uncompressed_size,
            uncompressed_size_2: uncompressed_size as u64,
            total_payload_size,
            total_payload_size_2: total_payload_size as u64,
            granularity,
            block_sizes,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![];
        out.extend(self.uncompressed_size.to_le_bytes());
        out.extend(self.total_payload_size.to_le_bytes());
        out.extend((48 + 4 * self.block_sizes.len() as u32).to_le_bytes());
        out.extend(8_u32.to_le_bytes());
        out.extend(1_u32.to_le_bytes());
        out.extend(self.uncompressed_size_2.to_le_bytes());
        out.extend(self.total_payload_size_2.to_le_bytes());
        out.extend((self.block_sizes.len() as u32).to_le_bytes());
        out.extend(self.granularity.to_le_bytes());
        out.extend([0; 16]);
        for size in &self.block_sizes {
            out.extend(size.to_le_bytes());
        }
        out
    }
}

/// Container holding `payload` as stored blocks of `granularity` bytes
pub fn build_bundle(payload: &[u8], granularity: usize) -> Vec<u8> {
    let blocks: Vec<&[u8]> = payload.chunks(granularity).collect();
    let mut out = Header::for_blocks(payload.len() as u32, granularity as u32, &blocks).encode();
    for block in blocks {
        out.extend(block);
    }
    out
}

/// Uncompressed bundle index payload
pub fn encode_index_payload(
    bundles: &[(&str, u32)],
    files: &[FileRecord],
    regions: &[PathRegion],
    path_table_bundle: &[u8],
) -> Vec<u8> {
    let mut out = vec![];

    out.extend((bundles.len() as u32).to_le_bytes());
    for (name, size) in bundles {
        out.extend((name.len() as u32).to_le_bytes());
        out.extend(name.as_bytes());
        out.extend(size.to_le_bytes());
    }

    out.extend((files.len() as u32).to_le_bytes());
    for f in files {
        out.extend(f.path_hash.to_le_bytes());
        out.extend(f.bundle_index.to_le_bytes());
        out.extend(f.file_offset.to_le_bytes());
        out.extend(f.file_size.to_le_bytes());
    }

    out.extend((regions.len() as u32).to_le_bytes());
    for r in regions {
        out.extend(r.hash.to_le_bytes());
        out.extend(r.offset.to_le_bytes());
        out.extend(r.size.to_le_bytes());
        out.extend(r.recursive_size.to_le_bytes());
    }

    out.extend(path_table_bundle);
    out
}

/// One entry of a path table command stream
#[derive(Debug, Clone, Copy)]
pub enum Cmd<'a> {
    Toggle,
    Str(u32, &'a str),
}

pub fn encode_commands(cmds: &[Cmd]) -> Vec<u8> {
    let mut out = vec![];
    for cmd in cmds {
        match cmd {
            Cmd::Toggle => out.extend(0_u32.to_le_bytes()),
            Cmd::Str(word, s) => {
                out.extend(word.to_le_bytes());
                out.extend(s.as_bytes());
                out.push(0);
            }
        }
    }
    out
}

/// Concatenates encoded regions into one decompressed path table, returning the region table
pub fn layout_regions(regions: &[Vec<u8>]) -> (Vec<PathRegion>, Vec<u8>) {
    let mut data = vec![];
    let reps = regions
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let rep = PathRegion {
                hash: i as u64,
                offset: data.len() as u32,
                size: r.len() as u32,
                recursive_size: r.len() as u32,
            };
            data.extend(r);
            rep
        })
        .collect();

    (reps, data)
}

/// Game folder with a "data" and an "art" bundle, removed when dropped
pub fn game_folder() -> TempDir {
    use Cmd::*;

    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("Bundles2")).unwrap();

    let hash = |p: &str| BuildMurmurHash64A::default().hash_path(p);
    let files = [
        FileRecord {
            path_hash: hash("data/a.dat64"),
            bundle_index: 0,
            file_offset: 0,
            file_size: 12,
        },
        FileRecord {
            path_hash: hash("data/b.txt"),
            bundle_index: 0,
            file_offset: 12,
            file_size: 3,
        },
        FileRecord {
            path_hash: hash("art/c.dds"),
            bundle_index: 1,
            file_offset: 0,
            file_size: 3,
        },
    ];

    let (regions, table) = layout_regions(&[
        encode_commands(&[
            Toggle,
            Str(1, "data/"),
            Toggle,
            Str(1, "a.dat64"),
            Str(1, "b.txt"),
            Str(1, "orphan.dat64"),
        ]),
        encode_commands(&[Str(1, "art/c.dds")]),
    ]);

    let payload = encode_index_payload(
        &[("data", 15), ("art", 3)],
        &files,
        &regions,
        &build_bundle(&table, 16),
    );
    fs::write(root.join(INDEX_PATH), build_bundle(&payload, 32)).unwrap();
    fs::write(
        root.join("Bundles2/data.bundle.bin"),
        build_bundle(b"hello world!abc", 4),
    )
    .unwrap();
    fs::write(root.join("Bundles2/art.bundle.bin"), build_bundle(b"xyz", 4)).unwrap();

    dir
}
