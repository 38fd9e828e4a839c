//! Class-imbalance balancing module
//!
//! Resampling strategies that bring minority classes up to (or the majority
//! class down to) a target ratio of the majority count:
//! - Random oversampling (duplicate minority rows)
//! - Random undersampling (drop majority rows)
//! - SMOTE (synthesize minority rows from nearest-neighbor means)
//!
//! All balancers validate the class distribution up front and share a
//! partitioner abstraction that turns a validated summary into a row-index
//! set. Balancing never mutates the caller's frame.

mod oversample;
mod smote;
mod undersample;

pub use oversample::OversamplingBalancer;
pub use smote::SmoteBalancer;
pub use undersample::UndersamplingBalancer;

use crate::error::{Result, TabprepError};
use polars::prelude::*;
use rand::prelude::*;

/// Maximum number of distinct classes a balancer will handle
pub const MAX_CLASSES: usize = 20;

/// Default target ratio of minority to majority counts
pub const DEFAULT_RATIO: f64 = 0.2;

/// Validated class distribution of a labeled frame
#[derive(Debug, Clone)]
pub struct ClassSummary {
    /// Per-class (label, count), ascending by count; ties break by label
    pub counts: Vec<(String, usize)>,
    /// Canonical per-row label values
    pub target: Vec<String>,
    /// Number of distinct classes
    pub n_classes: usize,
    /// Whether the least-populous class falls below the requested ratio
    pub needs_balancing: bool,
}

impl ClassSummary {
    /// The most populous (label, count) pair
    pub fn majority(&self) -> &(String, usize) {
        self.counts.last().expect("validated summary has >= 2 classes")
    }

    /// All classes except the majority, ascending by count
    pub fn minorities(&self) -> &[(String, usize)] {
        &self.counts[..self.counts.len() - 1]
    }

    /// Row positions carrying the given label
    pub fn label_rows(&self, label: &str) -> Vec<usize> {
        self.target
            .iter()
            .enumerate()
            .filter(|(_, l)| l.as_str() == label)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Validate a frame, target column and ratio for balancing.
///
/// Checks that the ratio falls in (0.0, 1.0], that the target column exists,
/// and that the number of distinct classes is within [2, 20]. Labels are
/// coerced to canonical strings so numeric and string label columns hash and
/// compare identically.
pub fn validate_class_ratio(df: &DataFrame, target: &str, ratio: f64) -> Result<ClassSummary> {
    if !ratio.is_finite() || ratio <= 0.0 || ratio > 1.0 {
        return Err(TabprepError::InvalidParameter {
            name: "ratio".to_string(),
            value: ratio.to_string(),
            reason: "must be a float in (0.0, 1.0]".to_string(),
        });
    }

    let column = df
        .column(target)
        .map_err(|_| TabprepError::FeatureNotFound(target.to_string()))?;
    let labels = column.as_materialized_series().cast(&DataType::String)?;
    let target_values: Vec<String> = labels
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or("null").to_string())
        .collect();

    let mut table: std::collections::BTreeMap<String, usize> = std::collections::BTreeMap::new();
    for label in &target_values {
        *table.entry(label.clone()).or_insert(0) += 1;
    }

    let n_classes = table.len();
    if n_classes > MAX_CLASSES {
        return Err(TabprepError::TooManyClasses {
            max: MAX_CLASSES,
            actual: n_classes,
        });
    }
    if n_classes < 2 {
        return Err(TabprepError::TooFewClasses { actual: n_classes });
    }

    let mut counts: Vec<(String, usize)> = table.into_iter().collect();
    // BTreeMap iteration is label-ascending, so a stable sort on count alone
    // keeps ties deterministic
    counts.sort_by_key(|(_, ct)| *ct);

    let least = counts.first().expect("at least 2 classes").1;
    let most = counts.last().expect("at least 2 classes").1;
    let needs_balancing = (least as f64 / most as f64) < ratio;

    Ok(ClassSummary {
        counts,
        target: target_values,
        n_classes,
        needs_balancing,
    })
}

/// Strategy that turns a validated class summary into a row-index set
pub(crate) trait BalancePartitioner {
    fn sample_indices(
        &self,
        summary: &ClassSummary,
        n_rows: usize,
        shuffle: bool,
        rng: &mut StdRng,
    ) -> Result<Vec<usize>>;
}

/// Validate, compute indices with the given partitioner, and materialize
pub(crate) fn balance_by_indices<P: BalancePartitioner>(
    df: &DataFrame,
    target: &str,
    ratio: f64,
    shuffle: bool,
    seed: Option<u64>,
    partitioner: &P,
) -> Result<DataFrame> {
    let summary = validate_class_ratio(df, target, ratio)?;
    let mut rng = rng_from_seed(seed);
    let indices = partitioner.sample_indices(&summary, df.height(), shuffle, &mut rng)?;
    take_rows(df, &indices)
}

pub(crate) fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Identity index set, optionally permuted
pub(crate) fn default_indices(n: usize, shuffle: bool, rng: &mut StdRng) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    if shuffle {
        indices.shuffle(rng);
    }
    indices
}

/// Materialize rows by position; the result is densely re-indexed
pub(crate) fn take_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let idx = IdxCa::from_vec(
        "idx".into(),
        indices.iter().map(|&i| i as IdxSize).collect(),
    );
    Ok(df.take(&idx)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labeled_df() -> DataFrame {
        let labels: Vec<i64> = std::iter::repeat(0)
            .take(10)
            .chain(std::iter::repeat(1).take(4))
            .collect();
        df!("y" => labels).unwrap()
    }

    #[test]
    fn test_validate_counts_ascending() {
        let df = labeled_df();
        let summary = validate_class_ratio(&df, "y", 0.5).unwrap();
        assert_eq!(summary.n_classes, 2);
        assert_eq!(summary.counts, vec![("1".to_string(), 4), ("0".to_string(), 10)]);
        assert_eq!(summary.majority(), &("0".to_string(), 10));
        assert!(summary.needs_balancing);
    }

    #[test]
    fn test_validate_already_balanced() {
        let df = labeled_df();
        let summary = validate_class_ratio(&df, "y", 0.3).unwrap();
        assert!(!summary.needs_balancing);
    }

    #[test]
    fn test_validate_bad_ratio() {
        let df = labeled_df();
        for ratio in [0.0, -0.5, 1.5, f64::NAN] {
            assert!(matches!(
                validate_class_ratio(&df, "y", ratio),
                Err(TabprepError::InvalidParameter { .. })
            ));
        }
        // 1.0 inclusive upper bound
        assert!(validate_class_ratio(&df, "y", 1.0).is_ok());
    }

    #[test]
    fn test_validate_missing_column() {
        let df = labeled_df();
        assert!(matches!(
            validate_class_ratio(&df, "missing", 0.5),
            Err(TabprepError::FeatureNotFound(_))
        ));
    }

    #[test]
    fn test_validate_single_class() {
        let df = df!("y" => &[1i64, 1, 1]).unwrap();
        assert!(matches!(
            validate_class_ratio(&df, "y", 0.5),
            Err(TabprepError::TooFewClasses { actual: 1 })
        ));
    }

    #[test]
    fn test_validate_too_many_classes() {
        let labels: Vec<i64> = (0..42).map(|i| i % 21).collect();
        let df = df!("y" => labels).unwrap();
        assert!(matches!(
            validate_class_ratio(&df, "y", 0.5),
            Err(TabprepError::TooManyClasses { max: 20, actual: 21 })
        ));
    }

    #[test]
    fn test_string_labels_coerced() {
        let df = df!("y" => &["a", "a", "a", "b"]).unwrap();
        let summary = validate_class_ratio(&df, "y", 0.5).unwrap();
        assert_eq!(summary.counts, vec![("b".to_string(), 1), ("a".to_string(), 3)]);
        assert_eq!(summary.label_rows("b"), vec![3]);
    }

    #[test]
    fn test_label_rows() {
        let df = labeled_df();
        let summary = validate_class_ratio(&df, "y", 0.5).unwrap();
        assert_eq!(summary.label_rows("1"), vec![10, 11, 12, 13]);
        assert_eq!(summary.label_rows("0").len(), 10);
    }
}
