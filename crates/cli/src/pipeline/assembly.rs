//! Builds the explain -> score pipeline from a blueprint.
//!
//! Hooks:
//! - explainer preprocess: trim each test band to `n_examples_test`, the
//!   surplus becomes extra examples for fuzzing
//! - explainer postprocess: write the explanation artifact
//! - scorer postprocess: write the score artifact
//!
//! Both stages share one [`LimitedClient`], so at most `max_concurrency`
//! model calls are in flight across all records and batches.

use std::fmt::Display;
use std::sync::Arc;

use clients::LimitedClient;
use contracts::{
    ExplainerInput, ExplanationResult, FromRecord, IntoRecord, LanguageClient, Record,
    RunBlueprint, ScoreResult,
};
use explainer::SimpleExplainer;
use loader::Sampler;
use pipeline::{ArtifactWriter, Pipe, Pipeline, ProcessWrapper};
use scorer::FuzzingScorer;
use tracing::info;

use crate::error::{CliError, Result};

/// Assemble the two-pipe pipeline over `loader`
pub fn build_pipeline<C, L, E>(
    blueprint: &RunBlueprint,
    client: Arc<C>,
    loader: L,
) -> Result<Pipeline<L>>
where
    C: LanguageClient + Sync + 'static,
    L: Iterator<Item = std::result::Result<Record, E>>,
    E: Display,
{
    let output = &blueprint.output;
    let explanations = ArtifactWriter::new(&output.explanation_dir)
        .map_err(|e| CliError::output_dir(&output.explanation_dir, e))?;
    let scores = ArtifactWriter::new(&output.score_dir)
        .map_err(|e| CliError::output_dir(&output.score_dir, e))?;
    let sampler = Sampler::new(blueprint.experiment.clone());
    let client = Arc::new(LimitedClient::new(client, blueprint.pipeline.max_concurrency));

    let explainer = ProcessWrapper::new(SimpleExplainer::new(
        Arc::clone(&client),
        blueprint.explainer.generation.clone(),
    ))
    .named("explainer")
    .with_preprocess(move |mut record: Record| {
        sampler.split_test(&mut record);
        ExplainerInput::from_record(record)
    })
    .with_postprocess(move |result: ExplanationResult| {
        explanations.write(result.record.feature(), &result.explanation)?;
        result.into_record()
    });

    let scorer = ProcessWrapper::new(FuzzingScorer::new(
        client,
        blueprint.scorer.clone(),
        blueprint.pipeline.max_concurrency,
    ))
    .named("scorer")
    .with_postprocess(move |result: ScoreResult| {
        scores.write(result.record.feature(), &result.score)?;
        result.into_record()
    });

    info!(
        explanation_dir = %output.explanation_dir.display(),
        score_dir = %output.score_dir.display(),
        "Pipeline assembled"
    );

    Ok(Pipeline::new(loader)
        .with_pipe(Pipe::new(explainer))
        .with_pipe(Pipe::new(scorer)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clients::MockClient;
    use contracts::{Example, FeatureId};

    fn blueprint(dir: &std::path::Path) -> RunBlueprint {
        let toml = format!(
            r#"
[client]
model = "mock"

[feature]
raw_dir = "unused"
modules = ["layer0"]

[experiment]
n_examples_train = 1
n_examples_test = 1
n_quantiles = 1

[scorer]
batch_size = 10
include_fuzzed = false

[output]
explanation_dir = '{}'
score_dir = '{}'
"#,
            dir.join("explanations").display(),
            dir.join("scores").display()
        );
        config_loader::ConfigLoader::load_from_str(&toml, config_loader::ConfigFormat::Toml)
            .unwrap()
    }

    fn record(index: u32) -> Record {
        let ex = |max: f32| {
            Example::new(vec!["the".into(), "cat".into()], vec![0.0, max]).unwrap()
        };
        let mut record = Record::new(FeatureId::new("layer0", index), vec![ex(4.0), ex(3.0)]);
        record.train = vec![ex(4.0)];
        record.test = vec![vec![ex(3.0), ex(2.0)]];
        record
    }

    #[tokio::test]
    async fn test_run_writes_both_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let blueprint = blueprint(dir.path());
        let client = Arc::new(MockClient::new(|messages| {
            let prompt = &messages.last().unwrap().content;
            if prompt.contains("<<") {
                Ok(r#"{"example_1": 1}"#.to_string())
            } else {
                Ok("Explanation: cats".to_string())
            }
        }));

        let pipeline = build_pipeline(&blueprint, client, vec![Ok::<_, String>(record(7))].into_iter())
            .unwrap();
        assert_eq!(pipeline.pipe_count(), 2);

        let report = pipeline.run(1).await.unwrap();
        assert_eq!(report.completed, 1);

        let explanation =
            std::fs::read_to_string(dir.path().join("explanations/layer0_feature7.txt")).unwrap();
        assert_eq!(explanation, "\"cats\"");
        let score: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("scores/layer0_feature7.txt")).unwrap(),
        )
        .unwrap();
        // One band trimmed to one test example
        assert_eq!(score["verdicts"].as_array().unwrap().len(), 1);
        assert_eq!(score["accuracy"], 1.0);
    }
}
