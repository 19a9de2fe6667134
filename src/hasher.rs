//! Hasher for virtual file paths

use std::hash::{BuildHasher, Hasher};

use murmurhash64::murmur_hash64a;

/// Seed the game uses for its path hashes
pub const PATH_HASH_SEED: u64 = 0x1337b33f;

/// Maps a virtual file path to the hash used as the key of [`crate::bundle_index::FileRecord`]
pub trait PathHasher {
    fn hash_path(&self, path: &str) -> u64;
}

impl<F> PathHasher for F
where
    F: Fn(&str) -> u64,
{
    fn hash_path(&self, path: &str) -> u64 {
        self(path)
    }
}

pub struct MurmurHash64A {
    seed: u64,
    data: Vec<u8>,
}

impl MurmurHash64A {
    pub fn new(seed: u64) -> Self {
        MurmurHash64A { seed, data: vec![] }
    }
}

impl Hasher for MurmurHash64A {
    fn finish(&self) -> u64 {
        murmur_hash64a(&self.data, self.seed)
    }

    fn write(&mut self, bytes: &[u8]) {
        self.data.extend(bytes);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BuildMurmurHash64A {
    pub seed: u64,
}

impl Default for BuildMurmurHash64A {
    fn default() -> Self {
        Self {
            seed: PATH_HASH_SEED,
        }
    }
}

impl BuildHasher for BuildMurmurHash64A {
    type Hasher = MurmurHash64A;

    fn build_hasher(&self) -> Self::Hasher {
        MurmurHash64A::new(self.seed)
    }
}

/// Paths are case insensitive, so they're lowercased before hashing
impl PathHasher for BuildMurmurHash64A {
    fn hash_path(&self, path: &str) -> u64 {
        let mut hasher = self.build_hasher();
        hasher.write(path.to_lowercase().as_bytes());
        hasher.finish()
    }
}
