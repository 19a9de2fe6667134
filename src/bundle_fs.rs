use std::{
    collections::{BTreeMap, HashMap},
    path::PathBuf,
};

use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use iterators_extended::bucket::Bucket;
use log::{debug, info, warn};

use crate::{
    bundle::{load_bundle, Bundle},
    bundle_index::{load_index_file, BundleIndex, FileRecord},
    decompress::{BlockDecompressor, OozDecompressor},
    hasher::{BuildMurmurHash64A, PathHasher},
    path::{PathTable, Paths},
};

/// Location of the index relative to the game folder
pub const INDEX_PATH: &str = "Bundles2/_.index.bin";

/// Read-only view of the files stored in a game folder's bundles
pub struct FS<D = OozDecompressor> {
    root: PathBuf,
    index: BundleIndex,
    lut: HashMap<u64, usize>,
    decompressor: D,
    hasher: BuildMurmurHash64A,
}

impl FS {
    /// Initialise a file system over an installed game folder
    pub fn from_folder(root: PathBuf) -> Result<FS> {
        Self::with_decompressor(root, OozDecompressor)
    }
}

impl<D: BlockDecompressor> FS<D> {
    pub fn with_decompressor(root: PathBuf, decompressor: D) -> Result<Self> {
        let index_path = root.join(INDEX_PATH);
        info!("Loading bundle index: {}", index_path.display());
        let index = load_index_file(&index_path, &decompressor)
            .with_context(|| format!("Failed to load bundle index: {:?}", index_path))?;

        let lut = index
            .files
            .iter()
            .enumerate()
            .map(|(i, f)| (f.path_hash, i))
            .collect();

        Ok(FS {
            root,
            index,
            lut,
            decompressor,
            hasher: BuildMurmurHash64A::default(),
        })
    }

    pub fn index(&self) -> &BundleIndex {
        &self.index
    }

    /// Decompress the path table
    pub fn path_table(&self) -> Result<PathTable<'_>> {
        PathTable::new(&self.index, &self.decompressor).context("Failed to decode path table")
    }

    /// Lazily enumerate the `(hash, path)` pairs accepted by `filter`
    pub fn paths<F>(&self, filter: F) -> Result<Paths<'_, BuildMurmurHash64A, F>>
    where
        F: FnMut(&str) -> bool,
    {
        Ok(self.path_table()?.filtered_paths(self.hasher, filter))
    }

    /// Lists all paths in the index. Malformed path table regions are reported and skipped.
    pub fn list(&self) -> Result<impl Iterator<Item = String> + '_> {
        let paths = self.paths(|_| true)?.filter_map(|p| match p {
            Ok((_, path)) => Some(path),
            Err(e) => {
                warn!("Skipping path table region: {e}");
                None
            }
        });

        Ok(paths)
    }

    /// Look up where a file is stored
    pub fn record(&self, path: &str) -> Result<&FileRecord> {
        let hash = self.hasher.hash_path(path);
        self.lut
            .get(&hash)
            .map(|i| &self.index.files[*i])
            .with_context(|| format!("Path not found in index: {}", path))
    }

    /// Load and parse one of the bundles listed in the index
    pub fn load_bundle(&self, bundle_index: u32) -> Result<Bundle> {
        let record = self
            .index
            .bundles
            .get(bundle_index as usize)
            .with_context(|| format!("Bundle index out of range: {bundle_index}"))?;

        let bundle_path = self.root.join(record.bin_path());
        debug!("Loading bundle: {}", bundle_path.display());
        load_bundle(&bundle_path)
            .with_context(|| format!("Failed to load bundle file: {:?}", bundle_path))
    }

    fn read_record(&self, bundle: &Bundle, file: &FileRecord) -> Result<Bytes> {
        let contents = bundle.read_range(
            file.file_offset as usize,
            file.file_size as usize,
            &self.decompressor,
        )?;
        Ok(contents)
    }

    pub fn read(&self, path: &str) -> Result<Bytes> {
        let file = self.record(path)?;
        let bundle = self.load_bundle(file.bundle_index)?;

        self.read_record(&bundle, file)
            .with_context(|| format!("Failed to read file: {path}"))
    }

    /// Read many files at once, loading each bundle only once. Does not preserve order of paths
    /// given.
    pub fn batch_read<'a>(
        &'a self,
        paths: &'a [&str],
    ) -> impl Iterator<Item = Result<(&'a str, Bytes), (&'a str, anyhow::Error)>> + 'a {
        let (records, errors) = paths
            .iter()
            .map(|&path| self.record(path).map(|f| (path, f)).map_err(|e| (path, e)))
            .bucket_result();

        // Batch them into their bundles
        let by_bundle =
            records
                .into_iter()
                .fold(HashMap::<_, Vec<_>>::new(), |mut acc, (path, file)| {
                    acc.entry(file.bundle_index).or_default().push((path, file));
                    acc
                });

        // Process files bundle-wise
        let contents = by_bundle.into_iter().flat_map(move |(bundle_index, files)| {
            let contents: Vec<_> = match self.load_bundle(bundle_index) {
                Ok(bundle) => files
                    .into_iter()
                    .map(|(path, file)| match self.read_record(&bundle, file) {
                        Ok(bytes) => Ok((path, bytes)),
                        Err(e) => Err((path, e)),
                    })
                    .collect(),
                Err(e) => files
                    .into_iter()
                    .map(|(path, _)| Err((path, anyhow!("{:?}", e))))
                    .collect(),
            };

            contents
        });

        // Add on previous errors
        errors.into_iter().map(Err).chain(contents)
    }

    /// Join the paths accepted by `filter` with their file records, grouped by bundle index
    pub fn files_by_bundle<F>(&self, filter: F) -> Result<BTreeMap<u32, Vec<(String, FileRecord)>>>
    where
        F: FnMut(&str) -> bool,
    {
        let mut by_bundle = BTreeMap::<_, Vec<_>>::new();

        for entry in self.paths(filter)? {
            let (hash, path) = entry.context("Failed to decode path table")?;
            match self.lut.get(&hash) {
                Some(&i) => {
                    let file = self.index.files[i];
                    by_bundle
                        .entry(file.bundle_index)
                        .or_default()
                        .push((path, file));
                }
                None => warn!("No file record for path: {path}"),
            }
        }

        Ok(by_bundle)
    }
}
