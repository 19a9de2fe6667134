//! Block decompression capability

use oozextract::Extractor;

/// Decodes one compressed block into a buffer of the expected uncompressed size.
///
/// The format never records the uncompressed size inside a block, so `output` is always sized
/// by the caller from the container header. Returns the number of bytes written.
pub trait BlockDecompressor: Sync {
    fn decompress_block(&self, block: &[u8], output: &mut [u8]) -> Result<usize, String>;
}

impl<F> BlockDecompressor for F
where
    F: Fn(&[u8], &mut [u8]) -> Result<usize, String> + Sync,
{
    fn decompress_block(&self, block: &[u8], output: &mut [u8]) -> Result<usize, String> {
        self(block, output)
    }
}

/// Oodle family decoder (Kraken, Mermaid, Bitknit, Leviathan) used by the game's bundles
#[derive(Debug, Default, Clone, Copy)]
pub struct OozDecompressor;

impl BlockDecompressor for OozDecompressor {
    fn decompress_block(&self, block: &[u8], output: &mut [u8]) -> Result<usize, String> {
        // Extractor carries decoder state, so each block gets its own
        let mut ext = Extractor::new();

        ext.read_from_slice(block, output).map_err(|e| e.to_string())
    }
}
