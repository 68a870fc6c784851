//! ArtifactWriter - one JSON file per feature

use std::fs;
use std::path::{Path, PathBuf};

use contracts::{ContractError, FeatureId};
use serde::Serialize;
use tracing::{debug, instrument};

/// Writes `<dir>/<artifact_stem>.txt`, overwriting earlier runs
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    /// Create the writer, creating `dir` if needed
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Artifact path of `feature`
    pub fn path_for(&self, feature: &FeatureId) -> PathBuf {
        self.dir.join(format!("{}.txt", feature.artifact_stem()))
    }

    /// Serialize `value` as JSON into the feature's artifact
    #[instrument(name = "artifact_write", skip(self, value), fields(feature = %feature))]
    pub fn write<T: Serialize + ?Sized>(
        &self,
        feature: &FeatureId,
        value: &T,
    ) -> Result<PathBuf, ContractError> {
        let path = self.path_for(feature);
        let bytes = serde_json::to_vec(value)
            .map_err(|e| ContractError::Other(format!("failed to serialize artifact: {e}")))?;
        fs::write(&path, bytes)?;
        debug!(path = %path.display(), "Artifact written");
        Ok(path)
    }
}
