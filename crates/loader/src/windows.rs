//! Max-activation window pooling
//!
//! The corpus is flattened and cut into consecutive windows of
//! `example_ctx_len` tokens (a trailing partial window is dropped). Every
//! window touched by the feature becomes an [`Example`]; the strongest
//! `max_examples` survive, strongest first.

use std::collections::BTreeMap;

use contracts::Example;

use crate::cache::{Hit, TokenCache};
use crate::error::{LoaderError, Result};

/// Build the top activating windows of one feature
pub fn pool_max_activation_windows(
    tokens: &TokenCache,
    hits: &[Hit],
    ctx_len: usize,
    max_examples: usize,
) -> Result<Vec<Example>> {
    if ctx_len == 0 {
        return Err(LoaderError::inconsistent("example_ctx_len must be positive"));
    }
    let n_windows = tokens.len() / ctx_len;

    let mut windows: BTreeMap<usize, Vec<f32>> = BTreeMap::new();
    for hit in hits {
        if hit.row >= tokens.n_rows() || hit.pos >= tokens.seq_len() {
            return Err(LoaderError::inconsistent(format!(
                "activation at ({}, {}) outside the {}x{} token cache",
                hit.row,
                hit.pos,
                tokens.n_rows(),
                tokens.seq_len()
            )));
        }
        let flat = hit.row * tokens.seq_len() + hit.pos;
        let window = flat / ctx_len;
        if window >= n_windows {
            continue;
        }
        windows.entry(window).or_insert_with(|| vec![0.0; ctx_len])[flat % ctx_len] =
            hit.activation;
    }

    let mut examples = windows
        .into_iter()
        .map(|(window, activations)| {
            let start = window * ctx_len;
            let window_tokens = (start..start + ctx_len)
                .map(|flat| tokens.token(flat).to_string())
                .collect();
            Example::new(window_tokens, activations).map_err(LoaderError::from)
        })
        .collect::<Result<Vec<_>>>()?;

    // stable: equal maxima keep corpus order
    examples.sort_by(|a, b| b.max_activation.total_cmp(&a.max_activation));
    examples.truncate(max_examples);
    Ok(examples)
}
