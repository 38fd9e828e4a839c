//! Random oversampling of minority classes

use super::{
    balance_by_indices, default_indices, BalancePartitioner, ClassSummary, DEFAULT_RATIO,
};
use crate::error::Result;
use polars::prelude::*;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Partitioner that duplicates minority rows (draws with replacement) until
/// each minority class reaches the target ratio of the majority count.
pub(crate) struct OversamplePartitioner {
    pub ratio: f64,
}

impl BalancePartitioner for OversamplePartitioner {
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

        let majority_count = summary.majority().1;
        let n_required = ((self.ratio * majority_count as f64) as usize).max(1);

        let mut indices: Vec<usize> = (0..n_rows).collect();
        for (label, count) in summary.minorities() {
            if *count == 1 {
                // Recoverable: a size-1 draw pool just repeats the one row
                warn!(class = %label, "class has only one observation");
            }
            if *count as f64 / majority_count as f64 >= self.ratio {
                continue;
            }
            let n_samples = n_required.saturating_sub(*count);
            if n_samples == 0 {
                continue;
            }
            let rows = summary.label_rows(label);
            for _ in 0..n_samples {
                indices.push(rows[rng.gen_range(0..rows.len())]);
            }
        }

        if shuffle {
            indices.shuffle(rng);
        } else {
            indices.sort_unstable();
        }
        Ok(indices)
    }
}

/// Oversample every minority class until it is represented at the target
/// proportion of the majority class.
///
/// Already-compliant classes are left alone; if no class falls below the
/// ratio the output is a row-identical copy of the input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OversamplingBalancer {
    target: String,
    ratio: f64,
    shuffle: bool,
    seed: Option<u64>,
}

impl OversamplingBalancer {
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

    /// Whether to shuffle rows on return (default true); unshuffled output
    /// is sorted by original row position
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Fix the random seed for reproducible draws
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Produce the oversampled frame; the input is not modified
    pub fn balance(&self, df: &DataFrame) -> Result<DataFrame> {
        let partitioner = OversamplePartitioner { ratio: self.ratio };
        balance_by_indices(df, &self.target, self.ratio, self.shuffle, self.seed, &partitioner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::validate_class_ratio;

    fn imbalanced_df() -> DataFrame {
        // 100 zeros, 30 ones, 25 twos
        let labels: Vec<i64> = std::iter::repeat(0)
            .take(100)
            .chain(std::iter::repeat(1).take(30))
            .chain(std::iter::repeat(2).take(25))
            .collect();
        let x: Vec<f64> = (0..155).map(|i| i as f64).collect();
        df!("x" => x, "y" => labels).unwrap()
    }

    fn counts_of(df: &DataFrame, target: &str) -> Vec<(String, usize)> {
        validate_class_ratio(df, target, 0.5).unwrap().counts
    }

    #[test]
    fn test_oversample_reaches_target_counts() {
        let df = imbalanced_df();
        let balancer = OversamplingBalancer::new("y").with_ratio(0.5).with_seed(42);
        let out = balancer.balance(&df).unwrap();

        let mut counts = counts_of(&out, "y");
        counts.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            counts,
            vec![
                ("0".to_string(), 100),
                ("1".to_string(), 50),
                ("2".to_string(), 50),
            ]
        );
    }

    #[test]
    fn test_oversample_unshuffled_is_sorted() {
        let df = imbalanced_df();
        let balancer = OversamplingBalancer::new("y")
            .with_ratio(0.5)
            .with_shuffle(false)
            .with_seed(7);
        let out = balancer.balance(&df).unwrap();

        let xs: Vec<f64> = out.column("x").unwrap().f64().unwrap().into_iter().flatten().collect();
        assert!(xs.windows(2).all(|w| w[0] <= w[1]), "rows not sorted by origin");
    }

    #[test]
    fn test_oversample_shuffle_same_multiset() {
        let df = imbalanced_df();
        let sorted = OversamplingBalancer::new("y")
            .with_ratio(0.5)
            .with_shuffle(false)
            .with_seed(3)
            .balance(&df)
            .unwrap();
        let shuffled = OversamplingBalancer::new("y")
            .with_ratio(0.5)
            .with_shuffle(true)
            .with_seed(3)
            .balance(&df)
            .unwrap();

        let mut a: Vec<i64> = sorted.column("y").unwrap().i64().unwrap().into_iter().flatten().collect();
        let mut b: Vec<i64> = shuffled.column("y").unwrap().i64().unwrap().into_iter().flatten().collect();
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, b);
    }

    #[test]
    fn test_oversample_identity_when_balanced() {
        let labels: Vec<i64> = std::iter::repeat(0)
            .take(10)
            .chain(std::iter::repeat(1).take(8))
            .collect();
        let df = df!("y" => labels).unwrap();
        let out = OversamplingBalancer::new("y")
            .with_ratio(0.5)
            .with_shuffle(false)
            .balance(&df)
            .unwrap();
        assert_eq!(out.height(), df.height());
    }

    #[test]
    fn test_oversample_singleton_succeeds_with_warning() {
        let labels: Vec<i64> = std::iter::repeat(0).take(20).chain(std::iter::once(1)).collect();
        let df = df!("y" => labels).unwrap();
        let out = OversamplingBalancer::new("y")
            .with_ratio(0.5)
            .with_seed(11)
            .balance(&df)
            .unwrap();

        let mut counts = counts_of(&out, "y");
        counts.sort_by(|a, b| a.0.cmp(&b.0));
        // 20 * 0.5 = 10 required; the single row is repeated to fill
        assert_eq!(counts, vec![("0".to_string(), 20), ("1".to_string(), 10)]);
    }

    #[test]
    fn test_oversample_seed_reproducible() {
        let df = imbalanced_df();
        let balancer = OversamplingBalancer::new("y").with_ratio(0.5).with_seed(99);
        let a = balancer.balance(&df).unwrap();
        let b = balancer.balance(&df).unwrap();
        assert!(a.equals(&b));
    }
}
