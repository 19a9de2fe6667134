//! Decoding of the bundle index path table.
//!
//! Each [`PathRegion`] is an independent stream of little-endian `u32` command words, most
//! followed by a NUL terminated UTF-8 string:
//!
//! - `0` toggles the base phase. Entering it clears the stored bases.
//! - `n` in `1..=bases.len()` decodes `bases[n - 1]` followed by the string.
//! - any other `n` decodes the string as is.
//!
//! Strings decoded during the base phase become new bases, the rest are full file paths.

use std::collections::HashMap;

use bytes::Bytes;
use log::debug;
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};

use crate::{
    bundle::Bundle,
    bundle_index::{BundleIndex, PathRegion},
    decompress::BlockDecompressor,
    error::{Error, Result},
    hasher::PathHasher,
};

/// The decompressed path table together with the regions describing it
pub struct PathTable<'a> {
    data: Bytes,
    regions: &'a [PathRegion],
}

impl<'a> PathTable<'a> {
    /// Decompress the path table carried by `index`
    pub fn new<D>(index: &'a BundleIndex, decompressor: &D) -> Result<Self>
    where
        D: BlockDecompressor + ?Sized,
    {
        let data = Bundle::parse(index.path_table_bundle.clone())?.decompress_all(decompressor)?;
        debug!(
            "Path table: {} bytes over {} regions",
            data.len(),
            index.path_regions.len()
        );

        Ok(Self::from_parts(data, &index.path_regions))
    }

    /// Wrap an already decompressed path table
    pub fn from_parts(data: Bytes, regions: &'a [PathRegion]) -> Self {
        Self { data, regions }
    }

    /// Decoder over the full paths of region `index`, `None` past the last region
    pub fn decode_region(&self, index: usize) -> Option<RegionDecoder> {
        let rep = self.regions.get(index)?;
        Some(RegionDecoder::new(&self.data, index, rep))
    }

    /// Decode every path up front into a hash -> path map.
    ///
    /// Regions are decoded in parallel; the first malformed region fails the whole table.
    pub fn hash_table<H>(&self, hasher: &H) -> Result<HashMap<u64, String>>
    where
        H: PathHasher + ?Sized,
    {
        let per_region = self
            .regions
            .par_iter()
            .enumerate()
            .map(|(i, rep)| RegionDecoder::new(&self.data, i, rep).collect::<Result<Vec<_>>>())
            .collect::<Result<Vec<_>>>()?;

        let table = per_region
            .into_iter()
            .flatten()
            .map(|path| (hasher.hash_path(&path), path))
            .collect();

        Ok(table)
    }

    /// Lazily yield every `(hash, path)`
    pub fn paths<H>(&self, hasher: H) -> Paths<'a, H, fn(&str) -> bool>
    where
        H: PathHasher,
    {
        self.filtered_paths(hasher, accept_all as fn(&str) -> bool)
    }

    /// Lazily yield the `(hash, path)` of paths accepted by `filter`. Rejected paths are never
    /// hashed.
    ///
    /// A malformed region yields a single error, then iteration carries on with the next region.
    pub fn filtered_paths<H, F>(&self, hasher: H, filter: F) -> Paths<'a, H, F>
    where
        H: PathHasher,
        F: FnMut(&str) -> bool,
    {
        Paths {
            data: self.data.clone(),
            regions: self.regions.iter().enumerate(),
            current: None,
            hasher,
            filter,
        }
    }
}

fn accept_all(_: &str) -> bool {
    true
}

/// State machine decoding the full paths of a single region
#[derive(Debug)]
pub struct RegionDecoder {
    region: usize,
    data: Bytes,
    // Offset of `data` within the path table
    base: usize,
    pos: usize,
    base_phase: bool,
    bases: Vec<String>,
    done: bool,
    pending: Option<Error>,
}

impl RegionDecoder {
    fn new(table: &Bytes, region: usize, rep: &PathRegion) -> Self {
        let start = rep.offset as usize;
        let end = start.saturating_add(rep.size as usize);

        if end <= table.len() {
            return Self::at(region, table.slice(start..end), start);
        }

        let mut decoder = Self::at(region, Bytes::new(), start);
        decoder.pending = Some(Error::MalformedPathTable {
            region,
            offset: start,
            reason: "region outside of the path table",
        });
        decoder
    }

    /// Decode `data` as the full contents of region number `region`
    pub fn from_bytes(region: usize, data: Bytes) -> Self {
        Self::at(region, data, 0)
    }

    fn at(region: usize, data: Bytes, base: usize) -> Self {
        Self {
            region,
            data,
            base,
            pos: 0,
            base_phase: false,
            bases: vec![],
            done: false,
            pending: None,
        }
    }

    fn malformed(&mut self, reason: &'static str) -> Error {
        self.done = true;
        Error::MalformedPathTable {
            region: self.region,
            offset: self.base + self.pos,
            reason,
        }
    }

    fn read_command(&mut self) -> Result<u32> {
        if self.data.len() - self.pos < 4 {
            return Err(self.malformed("truncated command word"));
        }

        let word = &self.data[self.pos..self.pos + 4];
        let cmd = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
        self.pos += 4;
        Ok(cmd)
    }

    fn read_string(&mut self) -> Result<String> {
        if self.pos == self.data.len() {
            return Err(self.malformed("missing string after command"));
        }
        let Some(len) = self.data[self.pos..].iter().position(|&b| b == b'\0') else {
            return Err(self.malformed("unterminated string"));
        };

        let start = self.pos;
        let decoded = std::str::from_utf8(&self.data[start..start + len]).map(str::to_string);
        match decoded {
            Ok(s) => {
                self.pos += len + 1;
                Ok(s)
            }
            Err(_) => Err(self.malformed("invalid UTF-8")),
        }
    }
}

impl Iterator for RegionDecoder {
    type Item = Result<String>;

    /// Run commands until the next full path, or the end of the region
    fn next(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.pending.take() {
            self.done = true;
            return Some(Err(e));
        }

        while !self.done && self.pos < self.data.len() {
            let cmd = match self.read_command() {
                Ok(cmd) => cmd as usize,
                Err(e) => return Some(Err(e)),
            };

            if cmd == 0 {
                self.base_phase = !self.base_phase;
                if self.base_phase {
                    self.bases.clear();
                }
                continue;
            }

            let suffix = match self.read_string() {
                Ok(s) => s,
                Err(e) => return Some(Err(e)),
            };
            let value = match self.bases.get(cmd - 1) {
                Some(base) => base.clone() + &suffix,
                None => suffix,
            };

            if self.base_phase {
                self.bases.push(value);
            } else {
                return Some(Ok(value));
            }
        }

        None
    }
}

/// Lazy `(hash, path)` iterator over all regions of a [`PathTable`]
pub struct Paths<'a, H, F> {
    data: Bytes,
    regions: std::iter::Enumerate<std::slice::Iter<'a, PathRegion>>,
    current: Option<RegionDecoder>,
    hasher: H,
    filter: F,
}

impl<H, F> Iterator for Paths<'_, H, F>
where
    H: PathHasher,
    F: FnMut(&str) -> bool,
{
    type Item = Result<(u64, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(decoder) = &mut self.current {
                match decoder.next() {
                    Some(Ok(path)) => {
                        if (self.filter)(&path) {
                            return Some(Ok((self.hasher.hash_path(&path), path)));
                        }
                        continue;
                    }
                    Some(Err(e)) => return Some(Err(e)),
                    None => self.current = None,
                }
            }

            let (i, rep) = self.regions.next()?;
            self.current = Some(RegionDecoder::new(&self.data, i, rep));
        }
    }
}
