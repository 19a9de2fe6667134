use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{
    bundle_fs::FS,
    bundle_index::{BundleIndex, BundleRecord},
    decompress::BlockDecompressor,
};

#[derive(Debug, Serialize)]
pub struct IndexSummary<'a> {
    pub bundle_count: usize,
    pub file_count: usize,
    pub path_region_count: usize,
    pub path_table_bundle_size: usize,
    pub bundles: &'a [BundleRecord],
}

impl<'a> From<&'a BundleIndex> for IndexSummary<'a> {
    fn from(index: &'a BundleIndex) -> Self {
        Self {
            bundle_count: index.bundles.len(),
            file_count: index.files.len(),
            path_region_count: index.path_regions.len(),
            path_table_bundle_size: index.path_table_bundle.len(),
            bundles: &index.bundles,
        }
    }
}

/// Print a JSON summary of the bundle index
pub fn dump_index<D: BlockDecompressor>(fs: &FS<D>) -> Result<()> {
    let summary = IndexSummary::from(fs.index());

    let mut stdout = BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut stdout, &summary).context("Failed to serialise index")?;
    writeln!(stdout).context("Failed to write to stdout")?;

    stdout.flush().context("Failed to flush stdout")
}

#[cfg(test)]
mod tests {
    use super::IndexSummary;
    use crate::{
        bundle_fs::FS,
        test_utils::{game_folder, StoredDecompressor},
    };

    #[test]
    fn summary_as_json() {
        let dir = game_folder();
        let fs = FS::with_decompressor(dir.path().to_path_buf(), StoredDecompressor).unwrap();

        let json = serde_json::to_value(IndexSummary::from(fs.index())).unwrap();
        assert_eq!(json["bundle_count"], 2);
        assert_eq!(json["file_count"], 3);
        assert_eq!(json["path_region_count"], 2);
        assert_eq!(json["bundles"][1]["name"], "art");
        assert_eq!(json["bundles"][0]["uncompressed_size"], 15);
    }
}
