//! SimpleExplainer - few-shot explanation from activating tokens

use std::sync::{Arc, LazyLock};

use contracts::{
    ContractError, Example, ExplainerInput, ExplanationResult, GenerationOptions, LanguageClient,
    ProcessUnit, NO_EXPLANATION,
};
use regex::Regex;
use tracing::{debug, instrument, warn};

use crate::prompt::build_messages;

static EXPLANATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Explanation:\s*(.*)").expect("explanation pattern is a valid regex")
});

/// Explainer that shows the model each training example with its activating
/// tokens and asks for a one-line explanation.
pub struct SimpleExplainer<C> {
    client: Arc<C>,
    generation: GenerationOptions,
}

impl<C> SimpleExplainer<C> {
    pub fn new(client: Arc<C>, generation: GenerationOptions) -> Self {
        Self { client, generation }
    }
}

impl<C> ProcessUnit for SimpleExplainer<C>
where
    C: LanguageClient + Sync + 'static,
{
    type Input = ExplainerInput;
    type Output = ExplanationResult;

    fn name(&self) -> &str {
        "simple"
    }

    #[instrument(
        name = "explainer_process",
        skip(self, input),
        fields(feature = %input.record.feature(), examples = input.train_examples.len())
    )]
    async fn process(&self, input: ExplainerInput) -> Result<ExplanationResult, ContractError> {
        let question = format_examples(&input.train_examples, input.max_activation);
        let messages = build_messages(&question);

        let response = self.client.generate(&messages, &self.generation).await?;

        let explanation = match parse_explanation(&response) {
            Some(explanation) => {
                debug!(explanation = %explanation, "Explanation extracted");
                explanation
            }
            None => {
                warn!(response_chars = response.len(), "No explanation in response; using sentinel");
                NO_EXPLANATION.to_string()
            }
        };

        Ok(ExplanationResult {
            record: input.record,
            explanation,
        })
    }
}

/// Extract the text following `Explanation:`, trimmed.
///
/// Returns `None` when the marker is missing or nothing follows it.
pub fn parse_explanation(text: &str) -> Option<String> {
    let captured = EXPLANATION_PATTERN.captures(text)?.get(1)?.as_str().trim();
    if captured.is_empty() {
        None
    } else {
        Some(captured.to_string())
    }
}

/// Activation scaled to 0..=10 relative to the feature's max, ties to even
fn normalized_score(activation: f32, max_activation: f32) -> i64 {
    if max_activation <= 0.0 {
        return 0;
    }
    (activation / max_activation * 10.0).round_ties_even() as i64
}

/// One `Document i:` block
pub fn formulate_question(index: usize, example: &Example, max_activation: f32) -> String {
    let mut question = String::new();
    if index == 1 {
        question.push_str("Neuron\n");
    }
    question.push_str(&format!("Document {index}:\n{}\n", example.text()));

    let tokens: Vec<String> = example
        .activating_tokens()
        .map(|(token, activation)| {
            format!("{token} ({})", normalized_score(activation, max_activation))
        })
        .collect();
    if tokens.is_empty() {
        question.push_str("Activating tokens.\n\n");
    } else {
        question.push_str(&format!("Activating tokens: {}.\n\n", tokens.join(", ")));
    }
    question
}

/// All training examples, numbered from 1
pub fn format_examples(examples: &[Example], max_activation: f32) -> String {
    examples
        .iter()
        .enumerate()
        .map(|(i, example)| formulate_question(i + 1, example, max_activation))
        .collect()
}
