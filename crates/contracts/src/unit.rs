//! ProcessUnit trait and stage input/output types
//!
//! A processing unit (explainer, scorer) exposes a single `process`
//! capability. Its input is derived from a [`Record`] and its output is folded
//! back into one, so units can be chained by the pipeline without knowing
//! about each other.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{ContractError, Example, Record};

/// Sentinel returned by the explainer when no explanation could be extracted.
pub const NO_EXPLANATION: &str = "Explanation:";

/// Processing unit behind a pipeline stage
#[trait_variant::make(ProcessUnit: Send)]
pub trait LocalProcessUnit {
    type Input: Send;
    type Output: Send;

    /// Unit name (used for logging, metrics and score keys)
    fn name(&self) -> &str;

    /// Run the unit on one input
    ///
    /// # Errors
    /// Client failures and hard parse failures. No error is caught here.
    async fn process(&self, input: Self::Input) -> Result<Self::Output, ContractError>;
}

/// Build a unit input from a record (the default preprocess step)
pub trait FromRecord: Sized {
    fn from_record(record: Record) -> Result<Self, ContractError>;
}

/// Fold a unit output back into its record (the default postprocess step)
pub trait IntoRecord {
    fn into_record(self) -> Result<Record, ContractError>;
}

impl FromRecord for Record {
    fn from_record(record: Record) -> Result<Self, ContractError> {
        Ok(record)
    }
}

impl IntoRecord for Record {
    fn into_record(self) -> Result<Record, ContractError> {
        Ok(self)
    }
}

// ===== Explainer =====

/// Explainer input
#[derive(Debug, Clone)]
pub struct ExplainerInput {
    pub record: Record,
    pub train_examples: Vec<Example>,
    pub max_activation: f32,
}

impl FromRecord for ExplainerInput {
    fn from_record(record: Record) -> Result<Self, ContractError> {
        if record.train.is_empty() {
            return Err(ContractError::invalid_example(format!(
                "record '{}' has no train examples",
                record.feature()
            )));
        }
        Ok(Self {
            train_examples: record.train.clone(),
            max_activation: record.max_activation,
            record,
        })
    }
}

/// Explainer output
#[derive(Debug, Clone)]
pub struct ExplanationResult {
    pub record: Record,
    pub explanation: String,
}

impl ExplanationResult {
    /// True when the explainer fell back to the sentinel
    pub fn is_fallback(&self) -> bool {
        self.explanation == NO_EXPLANATION
    }
}

impl IntoRecord for ExplanationResult {
    fn into_record(self) -> Result<Record, ContractError> {
        let mut record = self.record;
        if self.explanation != NO_EXPLANATION {
            record.set_explanation(self.explanation)?;
        }
        Ok(record)
    }
}

// ===== Scorer =====

/// Scorer input
#[derive(Debug, Clone)]
pub struct ScorerInput {
    pub record: Record,
    /// Explanation under evaluation (the sentinel when none was produced)
    pub explanation: String,
    /// Test examples grouped by activation band
    pub test: Vec<Vec<Example>>,
    /// Additional held-out examples
    pub extra_examples: Vec<Example>,
}

impl FromRecord for ScorerInput {
    fn from_record(record: Record) -> Result<Self, ContractError> {
        if record.test.iter().all(Vec::is_empty) {
            return Err(ContractError::invalid_example(format!(
                "record '{}' has no test examples",
                record.feature()
            )));
        }
        Ok(Self {
            explanation: record
                .explanation()
                .unwrap_or(NO_EXPLANATION)
                .to_string(),
            test: record.test.clone(),
            extra_examples: record.extra_examples.clone(),
            record,
        })
    }
}

/// Verdict for one scored sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleVerdict {
    /// 1-based index in submission order
    pub example: usize,
    /// 1 when the highlighted spans are the real activations
    pub ground_truth: u8,
    /// Verdict returned by the model
    pub prediction: u8,
    /// Activation band of clean samples
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub band: Option<usize>,
    /// Highlighted text (verbose scoring only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl SampleVerdict {
    pub fn is_correct(&self) -> bool {
        self.ground_truth == self.prediction
    }
}

/// Score produced by a scorer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub verdicts: Vec<SampleVerdict>,
    /// Fraction of verdicts matching the ground truth
    pub accuracy: f64,
}

impl Score {
    pub fn from_verdicts(verdicts: Vec<SampleVerdict>) -> Self {
        let correct = verdicts.iter().filter(|v| v.is_correct()).count();
        let accuracy = if verdicts.is_empty() {
            0.0
        } else {
            correct as f64 / verdicts.len() as f64
        };
        Self { verdicts, accuracy }
    }

    /// Verdict bit for a 1-based example index
    pub fn verdict(&self, example: usize) -> Option<u8> {
        self.verdicts
            .iter()
            .find(|v| v.example == example)
            .map(|v| v.prediction)
    }

    /// `example_i -> verdict` view
    pub fn predictions(&self) -> BTreeMap<String, u8> {
        self.verdicts
            .iter()
            .map(|v| (format!("example_{}", v.example), v.prediction))
            .collect()
    }
}

/// Scorer output
#[derive(Debug, Clone)]
pub struct ScoreResult {
    pub record: Record,
    /// Name of the producing scorer, used as the score key on the record
    pub scorer: String,
    pub score: Score,
}

impl IntoRecord for ScoreResult {
    fn into_record(self) -> Result<Record, ContractError> {
        let mut record = self.record;
        record.insert_score(self.scorer, self.score)?;
        Ok(record)
    }
}
