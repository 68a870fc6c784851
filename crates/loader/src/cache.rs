//! Activation cache reader
//!
//! Layout under `raw_dir`:
//!
//! ```text
//! tokens.json                      {"tokens": [[tok, ...], ...]}
//! <module>/activations.json        {"locations": [[row, pos, feature], ...],
//!                                   "activations": [f32, ...]}
//! ```
//!
//! `<module>` is the module name with `/` replaced by `_`. The cache is only
//! ever read.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::error::{LoaderError, Result};

pub const TOKENS_FILE: &str = "tokens.json";
pub const ACTIVATIONS_FILE: &str = "activations.json";

/// One non-zero activation of a feature
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub row: usize,
    pub pos: usize,
    pub activation: f32,
}

/// Tokenized corpus, every row the same length
#[derive(Debug, Clone)]
pub struct TokenCache {
    rows: Vec<Vec<String>>,
    seq_len: usize,
}

#[derive(Deserialize)]
struct TokensFile {
    tokens: Vec<Vec<String>>,
}

impl TokenCache {
    /// Load `<raw_dir>/tokens.json`
    pub fn load(raw_dir: &Path) -> Result<Self> {
        let file: TokensFile = read_json(&raw_dir.join(TOKENS_FILE))?;
        Self::from_rows(file.tokens)
    }

    pub fn from_rows(rows: Vec<Vec<String>>) -> Result<Self> {
        let seq_len = rows.first().map_or(0, Vec::len);
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != seq_len) {
            return Err(LoaderError::inconsistent(format!(
                "token row {i} has {} tokens, expected {seq_len}",
                row.len()
            )));
        }
        Ok(Self { rows, seq_len })
    }

    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Total number of tokens in the flattened corpus
    pub fn len(&self) -> usize {
        self.rows.len() * self.seq_len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Token at a flattened corpus position
    pub fn token(&self, flat: usize) -> &str {
        &self.rows[flat / self.seq_len][flat % self.seq_len]
    }
}

#[derive(Deserialize)]
struct ActivationsFile {
    locations: Vec<[u64; 3]>,
    activations: Vec<f32>,
}

/// Sparse activations of every feature of one module
#[derive(Debug, Clone, Default)]
pub struct ModuleActivations {
    by_feature: BTreeMap<u32, Vec<Hit>>,
}

impl ModuleActivations {
    /// Load `<raw_dir>/<module>/activations.json`
    pub fn load(raw_dir: &Path, module: &str) -> Result<Self> {
        let path = activations_path(raw_dir, module);
        if !path.exists() {
            return Err(LoaderError::MissingModule {
                module: module.to_string(),
                path,
            });
        }

        let file: ActivationsFile = read_json(&path)?;
        if file.locations.len() != file.activations.len() {
            return Err(LoaderError::inconsistent(format!(
                "module '{module}': {} locations but {} activations",
                file.locations.len(),
                file.activations.len()
            )));
        }

        let mut by_feature: BTreeMap<u32, Vec<Hit>> = BTreeMap::new();
        for ([row, pos, feature], activation) in file.locations.into_iter().zip(file.activations) {
            let feature = u32::try_from(feature).map_err(|_| {
                LoaderError::inconsistent(format!("module '{module}': feature index {feature} out of range"))
            })?;
            by_feature.entry(feature).or_default().push(Hit {
                row: row as usize,
                pos: pos as usize,
                activation,
            });
        }

        debug!(module, features = by_feature.len(), "module activations loaded");
        Ok(Self { by_feature })
    }

    pub fn n_features(&self) -> usize {
        self.by_feature.len()
    }

    pub fn hits(&self, feature: u32) -> Option<&[Hit]> {
        self.by_feature.get(&feature).map(Vec::as_slice)
    }

    /// Consume into `(feature, hits)` pairs in ascending feature order
    pub fn into_features(self) -> std::collections::btree_map::IntoIter<u32, Vec<Hit>> {
        self.by_feature.into_iter()
    }
}

/// Directory name of a module inside the cache
pub fn module_dir_name(module: &str) -> String {
    module.replace('/', "_")
}

pub fn activations_path(raw_dir: &Path, module: &str) -> PathBuf {
    raw_dir.join(module_dir_name(module)).join(ACTIVATIONS_FILE)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|source| LoaderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| LoaderError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
