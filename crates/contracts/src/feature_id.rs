//! FeatureId - identifier of one SAE latent

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a single SAE feature: the hooked module plus the latent index.
///
/// Display form is `<module>_feature<index>`, e.g. `.transformer.h.0_feature5`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureId {
    module: String,
    index: u32,
}

impl FeatureId {
    pub fn new(module: impl Into<String>, index: u32) -> Self {
        Self {
            module: module.into(),
            index,
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    /// File-name-safe stem for per-feature artifacts.
    ///
    /// Path separators in the module name are replaced so every feature maps
    /// to a file directly under the output directory. Modules whose stems
    /// collide are rejected at config validation.
    pub fn artifact_stem(&self) -> String {
        format!("{}_feature{}", Self::module_stem(&self.module), self.index)
    }

    /// File-name-safe form of a module name, as used in artifact stems.
    pub fn module_stem(module: &str) -> String {
        module.replace(['/', '\\', ':'], "_")
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_feature{}", self.module, self.index)
    }
}
