//! FeatureDataset - lazy producer of feature records
//!
//! Modules are read one at a time, in configured order; records are built
//! one feature at a time as the consumer pulls.

use std::path::PathBuf;
use std::sync::Arc;

use contracts::{ExperimentConfig, FeatureConfig, FeatureId, FeatureSelection, Record};
use metrics::counter;
use tracing::{debug, info, instrument, warn};

use crate::cache::{Hit, ModuleActivations, TokenCache};
use crate::error::Result;
use crate::sampler::Sampler;
use crate::windows::pool_max_activation_windows;

/// Feature dataset over an activation cache
pub struct FeatureDataset {
    raw_dir: PathBuf,
    modules: Vec<String>,
    selection: Option<FeatureSelection>,
    example_ctx_len: usize,
    max_examples: usize,
    tokens: Arc<TokenCache>,
    sampler: Sampler,
}

impl FeatureDataset {
    /// Open the cache under `feature.raw_dir`
    ///
    /// Reads the token corpus eagerly; module activations are read on demand.
    #[instrument(name = "feature_dataset_open", skip_all, fields(raw_dir = %feature.raw_dir.display()))]
    pub fn open(feature: &FeatureConfig, experiment: &ExperimentConfig) -> Result<Self> {
        let tokens = TokenCache::load(&feature.raw_dir)?;
        info!(
            rows = tokens.n_rows(),
            seq_len = tokens.seq_len(),
            modules = feature.modules.len(),
            "Activation cache opened"
        );
        Ok(Self::with_tokens(feature, experiment, Arc::new(tokens)))
    }

    /// Build over an already loaded corpus
    pub fn with_tokens(
        feature: &FeatureConfig,
        experiment: &ExperimentConfig,
        tokens: Arc<TokenCache>,
    ) -> Self {
        Self {
            raw_dir: feature.raw_dir.clone(),
            modules: feature.modules.clone(),
            selection: feature.features.clone(),
            example_ctx_len: feature.example_ctx_len,
            max_examples: feature.max_examples,
            tokens,
            sampler: Sampler::new(experiment.clone()),
        }
    }

    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    /// Lazy record iterator
    ///
    /// A module that cannot be read yields one `Err` item; iteration then
    /// continues with the next module.
    pub fn records(self) -> FeatureRecords {
        let modules = self.modules.clone().into_iter();
        FeatureRecords {
            dataset: self,
            modules,
            current: None,
        }
    }

    fn selected(&self, index: u32) -> bool {
        self.selection.as_ref().map_or(true, |s| s.contains(index))
    }

    fn warn_unmatched(&self, module: &str, activations: &ModuleActivations) {
        let missing = match &self.selection {
            Some(FeatureSelection::Range { start, end }) => (*start..*end)
                .filter(|i| activations.hits(*i).is_none())
                .count(),
            Some(FeatureSelection::Indices(indices)) => indices
                .iter()
                .filter(|i| activations.hits(**i).is_none())
                .count(),
            None => 0,
        };
        if missing > 0 {
            warn!(module, missing, "Selected features without activations skipped");
        }
    }

    fn build(&self, module: &str, index: u32, hits: &[Hit]) -> Result<Option<Record>> {
        let feature = FeatureId::new(module, index);
        let examples = pool_max_activation_windows(
            &self.tokens,
            hits,
            self.example_ctx_len,
            self.max_examples,
        )?;
        if examples.is_empty() {
            warn!(feature = %feature, "No complete window activates; feature skipped");
            return Ok(None);
        }

        let mut record = Record::new(feature, examples);
        self.sampler.sample(&mut record);

        debug!(
            feature = %record.feature(),
            examples = record.examples.len(),
            train = record.train.len(),
            bands = record.test.len(),
            "Record built"
        );
        counter!("autointerp_features_loaded_total", "module" => module.to_string()).increment(1);
        Ok(Some(record))
    }
}

/// Iterator returned by [`FeatureDataset::records`]
pub struct FeatureRecords {
    dataset: FeatureDataset,
    modules: std::vec::IntoIter<String>,
    current: Option<(String, std::collections::btree_map::IntoIter<u32, Vec<Hit>>)>,
}

impl Iterator for FeatureRecords {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((module, features)) = self.current.as_mut() {
                for (index, hits) in features.by_ref() {
                    if !self.dataset.selected(index) {
                        continue;
                    }
                    match self.dataset.build(module, index, &hits) {
                        Ok(Some(record)) => return Some(Ok(record)),
                        Ok(None) => continue,
                        Err(e) => return Some(Err(e)),
                    }
                }
                self.current = None;
            }

            let module = self.modules.next()?;
            match ModuleActivations::load(&self.dataset.raw_dir, &module) {
                Ok(activations) => {
                    self.dataset.warn_unmatched(&module, &activations);
                    self.current = Some((module, activations.into_features()));
                }
                Err(e) => {
                    warn!(module = %module, error = %e, "Module could not be loaded");
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoaderError;
    use std::path::Path;

    fn write(dir: &Path, rel: &str, value: serde_json::Value) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, value.to_string()).unwrap();
    }

    /// 2 rows x 8 tokens; layer0 has features 5 and 9, feature 7 only hits the
    /// trailing partial window when ctx_len is 3
    fn cache() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let rows: Vec<Vec<String>> = (0..2)
            .map(|r| (0..8).map(|p| format!(" w{}", r * 8 + p)).collect())
            .collect();
        write(dir.path(), "tokens.json", serde_json::json!({ "tokens": rows }));
        write(
            dir.path(),
            "layer0/activations.json",
            serde_json::json!({
                "locations": [[0, 1, 5], [1, 2, 5], [0, 4, 9], [1, 7, 7]],
                "activations": [2.0, 4.0, 1.0, 3.0]
            }),
        );
        dir
    }

    fn feature_config(raw_dir: &Path, modules: &[&str]) -> FeatureConfig {
        FeatureConfig {
            raw_dir: raw_dir.to_path_buf(),
            modules: modules.iter().map(|m| m.to_string()).collect(),
            features: None,
            example_ctx_len: 3,
            max_examples: 100,
        }
    }

    fn experiment() -> ExperimentConfig {
        ExperimentConfig {
            n_examples_train: 1,
            ..ExperimentConfig::default()
        }
    }

    #[test]
    fn test_records_in_feature_order() {
        let dir = cache();
        let dataset = FeatureDataset::open(&feature_config(dir.path(), &["layer0"]), &experiment()).unwrap();

        let records: Vec<Record> = dataset.records().collect::<Result<_>>().unwrap();
        let ids: Vec<String> = records.iter().map(|r| r.feature().to_string()).collect();
        // feature 7 only activates in the dropped partial window
        assert_eq!(ids, vec!["layer0_feature5", "layer0_feature9"]);

        let rec5 = &records[0];
        assert_eq!(rec5.max_activation, 4.0);
        assert_eq!(rec5.examples.len(), 2);
        assert_eq!(rec5.train.len(), 1);
        assert_eq!(rec5.train[0].max_activation, 4.0);
        assert_eq!(rec5.flat_test().len(), 1);
    }

    #[test]
    fn test_selection_filters_features() {
        let dir = cache();
        let mut config = feature_config(dir.path(), &["layer0"]);
        config.features = Some(FeatureSelection::Indices(vec![9, 11]));

        let records: Vec<Record> = FeatureDataset::open(&config, &experiment())
            .unwrap()
            .records()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].feature().index(), 9);
    }

    #[test]
    fn test_missing_module_yields_error_and_continues() {
        let dir = cache();
        let config = feature_config(dir.path(), &["layer3", "layer0"]);

        let items: Vec<Result<Record>> = FeatureDataset::open(&config, &experiment())
            .unwrap()
            .records()
            .collect();
        assert_eq!(items.len(), 3);
        assert!(matches!(items[0], Err(LoaderError::MissingModule { .. })));
        assert!(items[1].is_ok());
        assert!(items[2].is_ok());
    }

    #[test]
    fn test_missing_tokens_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = FeatureDataset::open(&feature_config(dir.path(), &["layer0"]), &experiment());
        assert!(matches!(result, Err(LoaderError::Io { .. })));
    }
}
