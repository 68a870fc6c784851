//! Train/test sampling
//!
//! Splits a record's pooled windows into the examples shown to the explainer
//! (`train`) and held-out examples grouped by activation band (`test`).
//! Deterministic for a given seed and feature index.

use contracts::{Example, ExperimentConfig, FeatureId, Record, TrainType};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Sampler
#[derive(Debug, Clone)]
pub struct Sampler {
    config: ExperimentConfig,
}

impl Sampler {
    pub fn new(config: ExperimentConfig) -> Self {
        Self { config }
    }

    /// Fill `record.train` and `record.test` from `record.examples`
    pub fn sample(&self, record: &mut Record) {
        let mut rng = StdRng::seed_from_u64(self.seed_for(record.feature()));
        let n = record.examples.len();

        let train_indices = self.train_indices(n, &mut rng);
        let mut used = vec![false; n];
        for &i in &train_indices {
            used[i] = true;
        }

        record.train = train_indices
            .iter()
            .map(|&i| record.examples[i].clone())
            .collect();

        let held_out: Vec<&Example> = record
            .examples
            .iter()
            .zip(&used)
            .filter(|(_, &u)| !u)
            .map(|(e, _)| e)
            .collect();
        record.test = self.bands(&held_out, record.max_activation, &mut rng);
    }

    /// Keep the first `n_examples_test` of each band as test examples and
    /// append the rest to `record.extra_examples`
    pub fn split_test(&self, record: &mut Record) {
        let keep = self.config.n_examples_test;
        for band in &mut record.test {
            if band.len() > keep {
                record.extra_examples.extend(band.drain(keep..));
            }
        }
    }

    fn seed_for(&self, feature: &FeatureId) -> u64 {
        self.config.seed.wrapping_add(u64::from(feature.index()))
    }

    /// Indices into the (descending) pooled windows, ascending
    fn train_indices(&self, n: usize, rng: &mut StdRng) -> Vec<usize> {
        let n_train = self.config.n_examples_train.min(n);
        let mut indices = match self.config.train_type {
            TrainType::Top => (0..n_train).collect(),
            TrainType::Random => {
                let mut all: Vec<usize> = (0..n).collect();
                all.shuffle(rng);
                all.truncate(n_train);
                all
            }
            TrainType::Quantiles => {
                let n_q = self.config.n_quantiles.min(n).max(1);
                let per_q = (n_train / n_q).max(1);
                let mut picked = Vec::with_capacity(n_train);
                for q in 0..n_q {
                    let mut chunk: Vec<usize> = (q * n / n_q..(q + 1) * n / n_q).collect();
                    chunk.shuffle(rng);
                    picked.extend(chunk.into_iter().take(per_q));
                }
                picked.truncate(n_train);
                picked
            }
        };
        indices.sort_unstable();
        indices
    }

    /// Equal-width bands over `(0, max_activation]`, highest band first
    fn bands(&self, held_out: &[&Example], max_activation: f32, rng: &mut StdRng) -> Vec<Vec<Example>> {
        if max_activation <= 0.0 {
            return Vec::new();
        }
        let n_q = self.config.n_quantiles.max(1);
        let width = max_activation / n_q as f32;

        let mut bands: Vec<Vec<Example>> = vec![Vec::new(); n_q];
        for example in held_out {
            if example.max_activation <= 0.0 {
                continue;
            }
            let band = ((example.max_activation / width).ceil() as usize).clamp(1, n_q) - 1;
            bands[band].push((*example).clone());
        }

        bands
            .into_iter()
            .rev()
            .filter(|band| !band.is_empty())
            .map(|mut band| {
                band.shuffle(rng);
                band
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(max: f32) -> Example {
        Example::new(vec!["a".into(), "b".into()], vec![max, 0.0]).unwrap()
    }

    fn record(maxima: &[f32]) -> Record {
        Record::new(
            FeatureId::new("layer0", 5),
            maxima.iter().map(|&m| example(m)).collect(),
        )
    }

    fn config(train_type: TrainType, n_train: usize, n_quantiles: usize) -> ExperimentConfig {
        ExperimentConfig {
            n_examples_train: n_train,
            n_examples_test: 2,
            n_quantiles,
            train_type,
            seed: 22,
        }
    }

    #[test]
    fn test_split_test_moves_surplus_to_extras() {
        let mut rec = record(&[10.0, 9.0, 8.0, 7.0, 2.0, 1.0]);
        let sampler = Sampler::new(config(TrainType::Top, 1, 2));
        sampler.sample(&mut rec);
        // (5,10] holds 9,8,7; (0,5] holds 2,1
        sampler.split_test(&mut rec);

        assert_eq!(rec.test[0].len(), 2);
        assert_eq!(rec.test[1].len(), 2);
        assert_eq!(rec.extra_examples.len(), 1);
        assert!(rec.extra_examples[0].max_activation > 5.0);
    }

    #[test]
    fn test_top_takes_strongest() {
        let mut rec = record(&[10.0, 9.0, 8.0, 2.0, 1.0]);
        Sampler::new(config(TrainType::Top, 2, 2)).sample(&mut rec);

        let train: Vec<f32> = rec.train.iter().map(|e| e.max_activation).collect();
        assert_eq!(train, vec![10.0, 9.0]);
    }

    #[test]
    fn test_bands_highest_first_and_disjoint_from_train() {
        let mut rec = record(&[10.0, 9.0, 8.0, 2.0, 1.0]);
        Sampler::new(config(TrainType::Top, 1, 2)).sample(&mut rec);

        // width 5: (5,10] holds 9,8; (0,5] holds 2,1
        assert_eq!(rec.test.len(), 2);
        assert!(rec.test[0].iter().all(|e| e.max_activation > 5.0));
        assert!(rec.test[1].iter().all(|e| e.max_activation <= 5.0));
        assert_eq!(rec.test[0].len() + rec.test[1].len(), 4);
        assert!(rec.flat_test().iter().all(|e| e.max_activation != 10.0));
    }

    #[test]
    fn test_empty_bands_omitted() {
        let mut rec = record(&[10.0, 9.8, 9.6]);
        Sampler::new(config(TrainType::Top, 1, 10)).sample(&mut rec);
        assert_eq!(rec.test.len(), 1);
    }

    #[test]
    fn test_random_is_deterministic() {
        let maxima: Vec<f32> = (1..=30).map(|i| i as f32).rev().collect();
        let sampler = Sampler::new(config(TrainType::Random, 5, 3));

        let mut a = record(&maxima);
        let mut b = record(&maxima);
        sampler.sample(&mut a);
        sampler.sample(&mut b);

        assert_eq!(a.train, b.train);
        assert_eq!(a.test, b.test);
        assert_eq!(a.train.len(), 5);
    }

    #[test]
    fn test_quantiles_draws_from_every_chunk() {
        let maxima: Vec<f32> = (1..=12).map(|i| i as f32).rev().collect();
        let mut rec = record(&maxima);
        Sampler::new(config(TrainType::Quantiles, 3, 3)).sample(&mut rec);

        // chunks of 4 over [12..9], [8..5], [4..1]
        let mut train: Vec<f32> = rec.train.iter().map(|e| e.max_activation).collect();
        train.sort_by(|a, b| b.total_cmp(a));
        assert_eq!(train.len(), 3);
        assert!(train[0] >= 9.0);
        assert!((5.0..=8.0).contains(&train[1]));
        assert!(train[2] <= 4.0);
    }

    #[test]
    fn test_train_capped_by_available_windows() {
        let mut rec = record(&[3.0, 2.0]);
        Sampler::new(config(TrainType::Top, 20, 10)).sample(&mut rec);
        assert_eq!(rec.train.len(), 2);
        assert!(rec.test.is_empty());
    }
}
