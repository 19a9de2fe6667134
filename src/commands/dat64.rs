use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};

use crate::{bundle_fs::FS, decompress::BlockDecompressor};

/// Top-level tables such as `data/mods.dat64`, skipping the per-language copies in subfolders
pub fn is_top_level_dat64(path: &str) -> bool {
    path.ends_with(".dat64") && path.matches('/').count() == 1
}

/// Print the top-level `.dat64` tables, grouped by the bundle that stores them
pub fn list_dat64<D: BlockDecompressor>(fs: &FS<D>) -> Result<()> {
    let by_bundle = fs.files_by_bundle(is_top_level_dat64)?;

    let mut stdout = BufWriter::new(io::stdout().lock());
    for (bundle_index, files) in by_bundle {
        let bundle = fs
            .index()
            .bundles
            .get(bundle_index as usize)
            .with_context(|| format!("Bundle index out of range: {bundle_index}"))?;
        writeln!(stdout, "{}", bundle.name).context("Failed to write to stdout")?;

        for (path, file) in files {
            writeln!(
                stdout,
                "\t{path}\t{}+{}",
                file.file_offset, file.file_size
            )
            .context("Failed to write to stdout")?;
        }
    }

    stdout.flush().context("Failed to flush stdout")
}

#[cfg(test)]
mod tests {
    use super::is_top_level_dat64;

    #[test]
    fn top_level_dat64_only() {
        assert!(is_top_level_dat64("data/b.dat64"));
        assert!(!is_top_level_dat64("data/c.txt"));
        assert!(!is_top_level_dat64("data/french/d.dat64"));
        assert!(!is_top_level_dat64("mods.dat64"));
    }
}
