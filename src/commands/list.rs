use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use glob::Pattern;

use super::matches_any;
use crate::{bundle_fs::FS, decompress::BlockDecompressor};

/// List filenames matching a glob pattern
pub fn list_files<D: BlockDecompressor>(file_system: &FS<D>, patterns: &[Pattern]) -> Result<()> {
    // Use a buffered writer since we're dumping a lot of data
    let mut stdout = BufWriter::new(io::stdout().lock());

    file_system
        .list()?
        .filter(|path| matches_any(patterns, path))
        .try_for_each(|p| writeln!(stdout, "{}", p).context("Failed to write to stdout"))?;

    stdout.flush().context("Failed to flush stdout")
}
