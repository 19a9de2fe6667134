pub mod bundle;
pub mod bundle_fs;
pub mod bundle_index;
pub mod commands;
pub mod decompress;
pub mod error;
pub mod hasher;
pub mod path;
pub mod steam;

#[cfg(test)]
mod test_utils;

pub use error::{Error, Result};
