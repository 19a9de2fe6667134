use std::{fs, path::Path};

use anyhow::{Context, Result};
use glob::Pattern;
use log::{info, warn};

use super::matches_any;
use crate::{bundle_fs::FS, decompress::BlockDecompressor};

/// Extract files to disk matching a glob pattern. Returns how many were written.
pub fn extract_files<D: BlockDecompressor>(
    fs: &FS<D>,
    patterns: &[Pattern],
    output_folder: &Path,
) -> Result<usize> {
    let filenames = fs
        .list()?
        .filter(|filename| matches_any(patterns, filename))
        .collect::<Vec<_>>();
    let filenames = filenames.iter().map(|f| f.as_str()).collect::<Vec<_>>();

    let extracted = fs
        .batch_read(&filenames)
        // Report and filter out errors
        .filter_map(|f| match f {
            Ok(x) => Some(x),
            Err((path, e)) => {
                warn!("Failed to extract file: {:?}: {:?}", path, e);
                None
            }
        })
        // Write out file contents
        .map(|(filename, contents)| -> Result<_> {
            let out_filename = output_folder.join(filename);
            if let Some(parent) = out_filename.parent() {
                fs::create_dir_all(parent).context("Failed to create folder")?;
            }

            fs::write(&out_filename, &contents).context("Failed to write file")?;

            Ok(filename)
        })
        .filter(|result| match result {
            Ok(filename) => {
                info!("Extracted file: {}", filename);
                true
            }
            Err(e) => {
                warn!("Failed to extract file: {:?}", e);
                false
            }
        })
        .count();

    Ok(extracted)
}
