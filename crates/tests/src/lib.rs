//! # Integration Tests
//!
//! Cross-crate end-to-end tests.
//!
//! Covers:
//! - Config snapshot parsing
//! - Cache -> explain -> score -> artifacts with a scripted client
//! - Failure isolation across records
//! - Client concurrency ceiling across records and batches

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use autointerp_cli::build_pipeline;
    use clients::MockClient;
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ClientError, FeatureId, LanguageClient, Message, RunBlueprint};
    use loader::FeatureDataset;
    use pipeline::{Pipeline, PipelineError, RunReport};

    fn write(dir: &Path, rel: &str, value: serde_json::Value) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, value.to_string()).unwrap();
    }

    /// One row, four windows of four tokens.
    /// Feature 5 fires on " cat" (windows 0, 2), feature 9 on " dog" (windows 1, 3).
    fn cache(dir: &Path) {
        let tokens: Vec<&str> = vec![
            " the", " cat", " sat", " down", " a", " dog", " ran", " off", " my", " cat", " ate",
            " food", " one", " dog", " barked", " loud",
        ];
        write(dir, "raw/tokens.json", serde_json::json!({ "tokens": [tokens] }));
        write(
            dir,
            "raw/layer0/activations.json",
            serde_json::json!({
                "locations": [[0, 1, 5], [0, 5, 9], [0, 9, 5], [0, 13, 9]],
                "activations": [5.0, 3.0, 2.0, 6.0]
            }),
        );
    }

    fn blueprint(dir: &Path, max_concurrency: usize) -> RunBlueprint {
        let toml = format!(
            r#"
[client]
model = "mock"

[feature]
raw_dir = '{raw}'
modules = ["layer0"]
features = [5, 9]
example_ctx_len = 4

[experiment]
n_examples_train = 1
n_examples_test = 1
n_quantiles = 1

[scorer]
batch_size = 10
include_fuzzed = false

[output]
explanation_dir = '{out}/explanations'
score_dir = '{out}/fuzz'

[pipeline]
max_concurrency = {max_concurrency}
"#,
            raw = dir.join("raw").display(),
            out = dir.join("results").display(),
        );
        ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap()
    }

    /// Explains " cat" as X and " dog" as Y; accepts highlighted cats only
    fn respond(messages: &[Message]) -> Result<String, ClientError> {
        let prompt = &messages.last().unwrap().content;
        let answer = if prompt.contains("<<") {
            if prompt.contains("cat>>") {
                r#"{"example_1": 1}"#
            } else {
                r#"{"example_1": 0}"#
            }
        } else if prompt.contains(" cat") {
            "Explanation: X"
        } else {
            "Explanation: Y"
        };
        Ok(answer.to_string())
    }

    /// The `run` command's pipeline over the blueprint's cache
    fn build<C>(blueprint: &RunBlueprint, client: Arc<C>) -> Pipeline<loader::FeatureRecords>
    where
        C: LanguageClient + Sync + 'static,
    {
        let dataset = FeatureDataset::open(&blueprint.feature, &blueprint.experiment).unwrap();
        build_pipeline(blueprint, client, dataset.records()).unwrap()
    }

    /// One row; feature 5 fires on " cat" in even windows, feature 9 on
    /// " dog" in odd windows, `per_feature` windows each.
    fn wide_cache(dir: &Path, per_feature: usize) {
        let pattern = [" the", " cat", " sat", " down", " a", " dog", " ran", " off"];
        let tokens: Vec<&str> = pattern.iter().copied().cycle().take(8 * per_feature).collect();
        let mut locations = Vec::new();
        let mut activations = Vec::new();
        for window in 0..2 * per_feature {
            let feature = if window % 2 == 0 { 5 } else { 9 };
            locations.push(serde_json::json!([0, window * 4 + 1, feature]));
            activations.push(1.0 + window as f64);
        }
        write(dir, "raw/tokens.json", serde_json::json!({ "tokens": [tokens] }));
        write(
            dir,
            "raw/layer0/activations.json",
            serde_json::json!({ "locations": locations, "activations": activations }),
        );
    }

    fn read_json(path: impl AsRef<Path>) -> serde_json::Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_e2e_explain_and_score() {
        let dir = tempfile::tempdir().unwrap();
        cache(dir.path());
        let blueprint = blueprint(dir.path(), 2);
        let client = Arc::new(MockClient::new(respond).with_delay(Duration::from_millis(5)));

        let report: RunReport = build(&blueprint, Arc::clone(&client))
            .run(blueprint.pipeline.max_concurrency)
            .await
            .unwrap();

        assert_eq!(report.submitted, 2);
        assert_eq!(report.completed, 2);
        assert!(report.peak_in_flight <= 2);
        // One explain and one score call per feature
        assert_eq!(client.calls(), 4);

        let explanations = dir.path().join("results/explanations");
        assert_eq!(read_json(explanations.join("layer0_feature5.txt")), "X");
        assert_eq!(read_json(explanations.join("layer0_feature9.txt")), "Y");

        let fuzz = dir.path().join("results/fuzz");
        let score5 = read_json(fuzz.join("layer0_feature5.txt"));
        let score9 = read_json(fuzz.join("layer0_feature9.txt"));
        assert_eq!(score5["verdicts"].as_array().unwrap().len(), 1);
        assert_eq!(score5["verdicts"][0]["example"], 1);
        assert_eq!(score5["verdicts"][0]["prediction"], 1);
        assert_eq!(score9["verdicts"][0]["prediction"], 0);
        assert_eq!(score5["accuracy"], 1.0);
        assert_eq!(score9["accuracy"], 0.0);

        let summary = report.summary();
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.accuracy.count, 2);
    }

    #[tokio::test]
    async fn test_e2e_client_failure_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        cache(dir.path());
        let blueprint = blueprint(dir.path(), 2);
        let client = Arc::new(MockClient::new(|messages: &[Message]| {
            let prompt = &messages.last().unwrap().content;
            if prompt.contains("dog>>") {
                Err(ClientError::Timeout { after_ms: 10 })
            } else {
                respond(messages)
            }
        }));

        let err = build(&blueprint, client)
            .run(blueprint.pipeline.max_concurrency)
            .await
            .unwrap_err();
        let PipelineError::RecordsFailed { report } = err else {
            panic!("expected failed records");
        };

        assert_eq!(report.completed, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].feature, Some(FeatureId::new("layer0", 9)));
        assert_eq!(report.failures[0].stage, "scorer");
        assert!(report.failures[0].error.contains("timed out"));

        // The healthy record still has both artifacts; the failed one only its explanation
        let results = dir.path().join("results");
        assert!(results.join("fuzz/layer0_feature5.txt").exists());
        assert!(!results.join("fuzz/layer0_feature9.txt").exists());
        assert!(results.join("explanations/layer0_feature9.txt").exists());
    }

    #[tokio::test]
    async fn test_e2e_missing_module_reported_by_loader() {
        let dir = tempfile::tempdir().unwrap();
        cache(dir.path());
        let mut blueprint = blueprint(dir.path(), 1);
        blueprint.feature.modules.push("layer1".into());
        let client = Arc::new(MockClient::new(respond));

        let err = build(&blueprint, client).run(1).await.unwrap_err();
        let report = err.report().unwrap();
        assert_eq!(report.submitted, 3);
        assert_eq!(report.completed, 2);
        assert_eq!(report.failures[0].stage, "loader");
        assert!(report.failures[0].feature.is_none());
    }

    #[tokio::test]
    async fn test_e2e_client_calls_stay_under_ceiling() {
        let dir = tempfile::tempdir().unwrap();
        wide_cache(dir.path(), 5);
        let mut blueprint = blueprint(dir.path(), 2);
        // Four single-example scoring batches per record
        blueprint.experiment.n_examples_test = 4;
        blueprint.scorer.batch_size = 1;
        let client = Arc::new(MockClient::new(respond).with_delay(Duration::from_millis(30)));

        let report = build(&blueprint, Arc::clone(&client))
            .run(blueprint.pipeline.max_concurrency)
            .await
            .unwrap();

        assert_eq!(report.completed, 2);
        // One explanation plus four batches per feature
        assert_eq!(client.calls(), 10);
        assert!(
            client.peak_concurrency() <= 2,
            "peak {} exceeds ceiling",
            client.peak_concurrency()
        );

        let score5 = read_json(dir.path().join("results/fuzz/layer0_feature5.txt"));
        assert_eq!(score5["verdicts"].as_array().unwrap().len(), 4);
    }
}
