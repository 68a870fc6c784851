//! Scoring samples: highlighted example text with a ground-truth label

use contracts::Example;
use rand::seq::SliceRandom;
use rand::Rng;

/// One highlighted example submitted for judgment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub text: String,
    /// 1 when the highlighted tokens are the real activations
    pub ground_truth: u8,
    /// Activation band (clean samples only)
    pub band: Option<usize>,
}

/// Render tokens, wrapping each run of highlighted tokens in `<<`/`>>`
pub fn highlight(tokens: &[String], mask: &[bool]) -> String {
    let mut out = String::new();
    let mut open = false;
    for (token, &on) in tokens.iter().zip(mask) {
        if on && !open {
            out.push_str("<<");
            open = true;
        } else if !on && open {
            out.push_str(">>");
            open = false;
        }
        out.push_str(token);
    }
    if open {
        out.push_str(">>");
    }
    out
}

/// Test examples highlighted on their activating tokens, labelled 1
pub fn clean_samples(test: &[Vec<Example>]) -> Vec<Sample> {
    test.iter()
        .enumerate()
        .flat_map(|(band, examples)| {
            examples.iter().map(move |example| {
                let mask: Vec<bool> = example.activations.iter().map(|&a| a > 0.0).collect();
                Sample {
                    text: highlight(&example.tokens, &mask),
                    ground_truth: 1,
                    band: Some(band),
                }
            })
        })
        .collect()
}

/// Examples highlighted on `n_highlight` random non-activating tokens, labelled 0
///
/// Examples without any non-activating token are skipped.
pub fn fuzzed_samples<R: Rng>(pool: &[Example], n_highlight: usize, rng: &mut R) -> Vec<Sample> {
    pool.iter()
        .filter_map(|example| {
            let mut candidates: Vec<usize> = example
                .activations
                .iter()
                .enumerate()
                .filter(|(_, &a)| a <= 0.0)
                .map(|(i, _)| i)
                .collect();
            if candidates.is_empty() {
                return None;
            }
            candidates.shuffle(rng);

            let mut mask = vec![false; example.tokens.len()];
            for &i in candidates.iter().take(n_highlight.max(1)) {
                mask[i] = true;
            }
            Some(Sample {
                text: highlight(&example.tokens, &mask),
                ground_truth: 0,
                band: None,
            })
        })
        .collect()
}
