//! Record - the unit of work flowing through the pipeline
//!
//! One record per SAE feature. The identifier is fixed at construction;
//! stages append explanation and score fields, never overwrite them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{ContractError, FeatureId, Score};

/// A window of consecutive tokens with the feature's activation on each token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    /// Token strings, in corpus order
    pub tokens: Vec<String>,

    /// Per-token activations, parallel to `tokens`
    pub activations: Vec<f32>,

    /// Largest activation in the window
    pub max_activation: f32,
}

impl Example {
    /// Build an example, enforcing equal token/activation lengths.
    pub fn new(tokens: Vec<String>, activations: Vec<f32>) -> Result<Self, ContractError> {
        if tokens.len() != activations.len() {
            return Err(ContractError::invalid_example(format!(
                "{} tokens but {} activations",
                tokens.len(),
                activations.len()
            )));
        }
        let max_activation = activations.iter().copied().fold(0.0_f32, f32::max);
        Ok(Self {
            tokens,
            activations,
            max_activation,
        })
    }

    /// Decoded text of the window (tokens concatenated).
    pub fn text(&self) -> String {
        self.tokens.concat()
    }

    /// Number of tokens with strictly positive activation.
    pub fn n_activating(&self) -> usize {
        self.activations.iter().filter(|&&a| a > 0.0).count()
    }

    /// Iterate over `(token, activation)` pairs with strictly positive activation.
    pub fn activating_tokens(&self) -> impl Iterator<Item = (&str, f32)> {
        self.tokens
            .iter()
            .zip(&self.activations)
            .filter(|(_, &a)| a > 0.0)
            .map(|(t, &a)| (t.as_str(), a))
    }
}

/// Per-feature record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    feature: FeatureId,

    /// Top activating windows, sorted by max activation (descending)
    pub examples: Vec<Example>,

    /// Max activation over all examples
    pub max_activation: f32,

    /// Examples shown to the explainer
    pub train: Vec<Example>,

    /// Held-out examples grouped by activation band (highest band first)
    pub test: Vec<Vec<Example>>,

    /// Held-out examples not used as test examples
    pub extra_examples: Vec<Example>,

    explanation: Option<String>,

    scores: BTreeMap<String, Score>,
}

impl Record {
    /// Create a record from its pooled examples.
    pub fn new(feature: FeatureId, examples: Vec<Example>) -> Self {
        let max_activation = examples
            .iter()
            .map(|e| e.max_activation)
            .fold(0.0_f32, f32::max);
        Self {
            feature,
            examples,
            max_activation,
            train: Vec::new(),
            test: Vec::new(),
            extra_examples: Vec::new(),
            explanation: None,
            scores: BTreeMap::new(),
        }
    }

    pub fn feature(&self) -> &FeatureId {
        &self.feature
    }

    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    pub fn scores(&self) -> &BTreeMap<String, Score> {
        &self.scores
    }

    pub fn score(&self, name: &str) -> Option<&Score> {
        self.scores.get(name)
    }

    /// Test examples of every band, flattened in band order.
    pub fn flat_test(&self) -> Vec<Example> {
        self.test.iter().flatten().cloned().collect()
    }

    /// Attach an explanation.
    ///
    /// Setting the same value twice is a no-op; a different value is a conflict.
    pub fn set_explanation(&mut self, explanation: impl Into<String>) -> Result<(), ContractError> {
        let explanation = explanation.into();
        match &self.explanation {
            Some(existing) if *existing != explanation => {
                Err(ContractError::field_conflict(&self.feature, "explanation"))
            }
            _ => {
                self.explanation = Some(explanation);
                Ok(())
            }
        }
    }

    /// Attach a score under the producing stage's name.
    pub fn insert_score(&mut self, name: impl Into<String>, score: Score) -> Result<(), ContractError> {
        let name = name.into();
        match self.scores.get(&name) {
            Some(existing) if *existing != score => Err(ContractError::field_conflict(
                &self.feature,
                format!("scores.{name}"),
            )),
            _ => {
                self.scores.insert(name, score);
                Ok(())
            }
        }
    }

    /// Fold the accumulated fields of `other` into `self`.
    ///
    /// Used after a fan-out pipe: every branch received a clone of the same
    /// record and may have appended different fields. Example fields are taken
    /// from `self`.
    pub fn merge(mut self, other: Record) -> Result<Record, ContractError> {
        if self.feature != other.feature {
            return Err(ContractError::IdentityMismatch {
                left: self.feature.to_string(),
                right: other.feature.to_string(),
            });
        }
        if let Some(explanation) = other.explanation {
            self.set_explanation(explanation)?;
        }
        for (name, score) in other.scores {
            self.insert_score(name, score)?;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(tokens: &[&str], acts: &[f32]) -> Example {
        Example::new(tokens.iter().map(|t| t.to_string()).collect(), acts.to_vec()).unwrap()
    }

    fn score(prediction: u8) -> Score {
        Score::from_verdicts(vec![crate::SampleVerdict {
            example: 1,
            ground_truth: 1,
            prediction,
            band: Some(0),
            text: None,
        }])
    }

    #[test]
    fn test_example_rejects_mismatched_lengths() {
        let result = Example::new(vec!["a".into(), "b".into()], vec![1.0]);
        assert!(matches!(result, Err(ContractError::InvalidExample { .. })));
    }

    #[test]
    fn test_example_max_and_text() {
        let ex = example(&["The", " cat", " sat"], &[0.0, 3.5, 1.0]);
        assert_eq!(ex.max_activation, 3.5);
        assert_eq!(ex.text(), "The cat sat");
        assert_eq!(ex.n_activating(), 2);
    }

    #[test]
    fn test_record_max_activation() {
        let record = Record::new(
            FeatureId::new("layer0", 1),
            vec![example(&["a"], &[2.0]), example(&["b"], &[4.0])],
        );
        assert_eq!(record.max_activation, 4.0);
    }

    #[test]
    fn test_explanation_is_append_only() {
        let mut record = Record::new(FeatureId::new("layer0", 1), vec![]);
        record.set_explanation("dogs").unwrap();
        record.set_explanation("dogs").unwrap();
        let err = record.set_explanation("cats").unwrap_err();
        assert!(matches!(err, ContractError::FieldConflict { .. }));
        assert_eq!(record.explanation(), Some("dogs"));
    }

    #[test]
    fn test_merge_unions_scores() {
        let base = Record::new(FeatureId::new("layer0", 1), vec![]);
        let mut left = base.clone();
        let mut right = base;
        left.insert_score("fuzz", score(1)).unwrap();
        right.insert_score("detection", score(0)).unwrap();

        let merged = left.merge(right).unwrap();
        assert_eq!(merged.scores().len(), 2);
    }

    #[test]
    fn test_merge_conflicting_score_fails() {
        let base = Record::new(FeatureId::new("layer0", 1), vec![]);
        let mut left = base.clone();
        let mut right = base;
        left.insert_score("fuzz", score(1)).unwrap();
        right.insert_score("fuzz", score(0)).unwrap();

        assert!(left.merge(right).is_err());
    }

    #[test]
    fn test_merge_rejects_different_features() {
        let a = Record::new(FeatureId::new("layer0", 1), vec![]);
        let b = Record::new(FeatureId::new("layer0", 2), vec![]);
        assert!(matches!(
            a.merge(b),
            Err(ContractError::IdentityMismatch { .. })
        ));
    }
}
