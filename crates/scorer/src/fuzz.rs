//! FuzzingScorer - detection of correctly vs randomly highlighted spans

use std::sync::Arc;

use contracts::{
    ContractError, Example, LanguageClient, ProcessUnit, SampleVerdict, Score, ScoreResult,
    ScorerConfig, ScorerInput,
};
use futures::stream::{self, StreamExt, TryStreamExt};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, instrument};

use crate::prompts::{build_messages, format_batch};
use crate::sample::{clean_samples, fuzzed_samples, Sample};
use crate::schema::ResponseSchema;

/// Fuzzing scorer
///
/// Each test example is shown highlighted on its real activating tokens
/// (ground truth 1); with `include_fuzzed`, as many held-out examples are
/// shown highlighted on random non-activating tokens (ground truth 0). The
/// model judges batches of `batch_size` samples; up to `concurrency` batches
/// are in flight at once.
pub struct FuzzingScorer<C> {
    client: Arc<C>,
    config: ScorerConfig,
    concurrency: usize,
}

impl<C> FuzzingScorer<C> {
    pub fn new(client: Arc<C>, config: ScorerConfig, concurrency: usize) -> Self {
        Self {
            client,
            config,
            concurrency: concurrency.max(1),
        }
    }

    /// Shuffled clean + fuzzed samples for one record
    fn samples(&self, input: &ScorerInput, rng: &mut StdRng) -> Vec<Sample> {
        let mut samples = clean_samples(&input.test);

        if self.config.include_fuzzed {
            let flat_test: Vec<Example>;
            let pool: &[Example] = if input.extra_examples.is_empty() {
                flat_test = input.test.iter().flatten().cloned().collect();
                &flat_test
            } else {
                &input.extra_examples
            };
            let pool = &pool[..pool.len().min(samples.len())];
            let fuzzed = fuzzed_samples(pool, mean_activating(&input.test), rng);
            samples.extend(fuzzed);
        }

        samples.shuffle(rng);
        samples
    }
}

/// Rounded mean number of activating tokens per test example, at least 1
fn mean_activating(test: &[Vec<Example>]) -> usize {
    let (total, count) = test
        .iter()
        .flatten()
        .fold((0usize, 0usize), |(t, c), e| (t + e.n_activating(), c + 1));
    if count == 0 {
        return 1;
    }
    ((total as f64 / count as f64).round() as usize).max(1)
}

impl<C> FuzzingScorer<C>
where
    C: LanguageClient + Sync + 'static,
{
    #[instrument(name = "scorer_batch", skip(self, explanation, batch), fields(k = batch.len()))]
    async fn score_batch(&self, explanation: &str, batch: &[Sample]) -> Result<Vec<u8>, ContractError> {
        let schema = ResponseSchema::new(batch.len());
        let options = self
            .config
            .generation
            .with_response_schema(schema.to_json_schema());
        let messages = build_messages(explanation, &format_batch(batch));

        let response = self.client.generate(&messages, &options).await?;
        schema.parse(&response)
    }
}

impl<C> ProcessUnit for FuzzingScorer<C>
where
    C: LanguageClient + Sync + 'static,
{
    type Input = ScorerInput;
    type Output = ScoreResult;

    fn name(&self) -> &str {
        "fuzz"
    }

    #[instrument(
        name = "scorer_process",
        skip(self, input),
        fields(feature = %input.record.feature())
    )]
    async fn process(&self, input: ScorerInput) -> Result<ScoreResult, ContractError> {
        let seed = self
            .config
            .seed
            .wrapping_add(u64::from(input.record.feature().index()));
        let mut rng = StdRng::seed_from_u64(seed);
        let samples = self.samples(&input, &mut rng);

        let mut batches = Vec::new();
        for batch in samples.chunks(self.config.batch_size.max(1)) {
            batches.push(self.score_batch(&input.explanation, batch));
        }
        let predictions: Vec<Vec<u8>> = stream::iter(batches)
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let verdicts: Vec<SampleVerdict> = samples
            .iter()
            .zip(predictions.into_iter().flatten())
            .enumerate()
            .map(|(i, (sample, prediction))| SampleVerdict {
                example: i + 1,
                ground_truth: sample.ground_truth,
                prediction,
                band: sample.band,
                text: self.config.verbose.then(|| sample.text.clone()),
            })
            .collect();

        let score = Score::from_verdicts(verdicts);
        debug!(
            samples = samples.len(),
            accuracy = score.accuracy,
            "Record scored"
        );
        observability::record_accuracy(self.name(), score.accuracy);

        Ok(ScoreResult {
            record: input.record,
            scorer: self.name().to_string(),
            score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clients::MockClient;
    use contracts::{ClientError, FeatureId, FromRecord, GenerationOptions, Message, Record};
    use std::time::Duration;

    fn example(tokens: &[&str], acts: &[f32]) -> Example {
        Example::new(tokens.iter().map(|t| t.to_string()).collect(), acts.to_vec()).unwrap()
    }

    fn config(batch_size: usize, include_fuzzed: bool) -> ScorerConfig {
        ScorerConfig {
            batch_size,
            verbose: true,
            include_fuzzed,
            seed: 22,
            generation: GenerationOptions::new(50, 0.0),
        }
    }

    fn input(n_test: usize) -> ScorerInput {
        let test: Vec<Example> = (0..n_test)
            .map(|i| example(&["a", " b", " c"], &[0.0, 1.0 + i as f32, 0.0]))
            .collect();
        let mut record = Record::new(FeatureId::new("layer0", 5), test.clone());
        record.test = vec![test];
        record.set_explanation("letter b").unwrap();
        ScorerInput::from_record(record).unwrap()
    }

    /// Answers 1 for every example whose highlight is exactly `<< b>>`
    fn oracle(messages: &[Message]) -> Result<String, ClientError> {
        let prompt = &messages.last().unwrap().content;
        let fields: Vec<String> = prompt
            .lines()
            .filter(|l| l.starts_with("Example "))
            .enumerate()
            .map(|(i, line)| {
                let bit = u8::from(line.ends_with("a<< b>> c"));
                format!("\"example_{}\": {bit}", i + 1)
            })
            .collect();
        Ok(format!("{{{}}}", fields.join(", ")))
    }

    #[test]
    fn test_mean_activating() {
        let test = vec![vec![
            example(&["a", "b"], &[1.0, 1.0]),
            example(&["a", "b"], &[1.0, 0.0]),
        ]];
        assert_eq!(mean_activating(&test), 2);
        assert_eq!(mean_activating(&[]), 1);
    }

    #[tokio::test]
    async fn test_clean_only_batches_and_arity() {
        let client = Arc::new(MockClient::new(oracle));
        let scorer = FuzzingScorer::new(Arc::clone(&client), config(2, false), 4);

        let result = scorer.process(input(5)).await.unwrap();
        assert_eq!(result.scorer, "fuzz");
        // 5 samples in batches of 2 -> 3 calls, the last with k = 1
        assert_eq!(client.calls(), 3);
        assert_eq!(result.score.verdicts.len(), 5);
        assert!((result.score.accuracy - 1.0).abs() < 1e-12);
        assert!(result.score.verdicts.iter().all(|v| v.band == Some(0)));
        assert_eq!(result.score.verdict(1), Some(1));
    }

    #[tokio::test]
    async fn test_fuzzed_samples_labelled_zero() {
        let client = Arc::new(MockClient::new(oracle));
        let scorer = FuzzingScorer::new(client, config(3, true), 2);

        let result = scorer.process(input(3)).await.unwrap();
        let verdicts = &result.score.verdicts;
        assert_eq!(verdicts.len(), 6);
        assert_eq!(verdicts.iter().filter(|v| v.ground_truth == 0).count(), 3);
        assert!(verdicts.iter().all(|v| v.is_correct()));
        assert!(verdicts
            .iter()
            .filter(|v| v.ground_truth == 0)
            .all(|v| v.band.is_none() && v.text.is_some()));
    }

    #[tokio::test]
    async fn test_deterministic_for_seed() {
        let scorer = FuzzingScorer::new(Arc::new(MockClient::new(oracle)), config(2, true), 2);
        let a = scorer.process(input(4)).await.unwrap();
        let b = scorer.process(input(4)).await.unwrap();
        assert_eq!(a.score, b.score);
    }

    #[tokio::test]
    async fn test_schema_mismatch_fails() {
        let client = Arc::new(MockClient::fixed(r#"{"example_1": 1}"#));
        let scorer = FuzzingScorer::new(client, config(2, false), 1);

        let err = scorer.process(input(2)).await.unwrap_err();
        assert!(matches!(err, ContractError::ResponseSchema { .. }));
    }

    #[tokio::test]
    async fn test_client_error_propagates() {
        let client = Arc::new(MockClient::failing(ClientError::RateLimited {
            retry_after_ms: 100,
        }));
        let scorer = FuzzingScorer::new(client, config(2, false), 1);

        let err = scorer.process(input(2)).await.unwrap_err();
        assert!(matches!(err, ContractError::Client(ClientError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn test_batches_bounded_by_concurrency() {
        let client = Arc::new(MockClient::new(oracle).with_delay(Duration::from_millis(20)));
        let scorer = FuzzingScorer::new(Arc::clone(&client), config(1, false), 2);

        scorer.process(input(6)).await.unwrap();
        assert_eq!(client.calls(), 6);
        assert_eq!(client.peak_concurrency(), 2);
    }
}
