//! Random undersampling of the majority class

use super::{
    balance_by_indices, default_indices, BalancePartitioner, ClassSummary, DEFAULT_RATIO,
};
use crate::error::{Result, TabprepError};
use polars::prelude::*;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Partitioner that drops majority rows (a draw without replacement) until
/// the second-most-populous class is represented at the target ratio.
pub(crate) struct UndersamplePartitioner {
    pub ratio: f64,
}

impl BalancePartitioner for UndersamplePartitioner {
    fn sample_indices(
        &self,
        summary: &ClassSummary,
        n_rows: usize,
        shuffle: bool,
        rng: &mut StdRng,
    ) -> Result<Vec<usize>> {
        if !summary.needs_balancing {
            return Ok(default_indices(n_rows, shuffle, rng));
        }

        let (majority_label, majority_count) = summary.majority().clone();
        // Validation guarantees at least two classes
        let next_most_count = summary.counts[summary.counts.len() - 2].1;
        let n_required = (next_most_count as f64 / self.ratio) as usize;

        if majority_count <= n_required {
            // Nothing to drop; identity stays sorted regardless of shuffle
            return Ok((0..n_rows).collect());
        }

        let majority_rows = summary.label_rows(&majority_label);
        if n_required > majority_rows.len() {
            return Err(TabprepError::SamplingError(format!(
                "cannot draw {} rows without replacement from a class of {}",
                n_required,
                majority_rows.len()
            )));
        }

        let mut pool = majority_rows;
        pool.shuffle(rng);
        pool.truncate(n_required);

        let mut indices: Vec<usize> = summary
            .target
            .iter()
            .enumerate()
            .filter(|(_, l)| l.as_str() != majority_label)
            .map(|(i, _)| i)
            .collect();
        indices.extend(pool);

        if shuffle {
            indices.shuffle(rng);
        } else {
            indices.sort_unstable();
        }
        Ok(indices)
    }
}

/// Undersample the majority class until the second-most-populous class is
/// represented at the target proportion.
///
/// Minority rows are always kept in full; only majority rows are dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndersamplingBalancer {
    target: String,
    ratio: f64,
    shuffle: bool,
    seed: Option<u64>,
}

impl UndersamplingBalancer {
    /// Create a balancer for the named label column
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ratio: DEFAULT_RATIO,
            shuffle: true,
            seed: None,
        }
    }

    /// Target minority:majority ratio, in (0.0, 1.0]
    pub fn with_ratio(mut self, ratio: f64) -> Self {
        self.ratio = ratio;
        self
    }

    /// Whether to shuffle rows on return (default true)
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Fix the random seed for reproducible draws
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Produce the undersampled frame; the input is not modified
    pub fn balance(&self, df: &DataFrame) -> Result<DataFrame> {
        let partitioner = UndersamplePartitioner { ratio: self.ratio };
        balance_by_indices(df, &self.target, self.ratio, self.shuffle, self.seed, &partitioner)
    }
}
