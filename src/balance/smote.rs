//! SMOTE (Synthetic Minority Oversampling Technique)

use super::{default_indices, rng_from_seed, take_rows, validate_class_ratio, DEFAULT_RATIO};
use crate::error::{Result, TabprepError};
use crate::neighbors::NearestNeighbors;
use ndarray::Array2;
use polars::prelude::*;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Balance a frame by synthesizing minority rows.
///
/// For each under-represented class, a random subset of its rows is drawn
/// and a nearest-neighbor model is fitted over the drawn points (label
/// column excluded). Each synthetic row is the arithmetic mean of one drawn
/// point's k neighbors within that subset, tagged with the minority label.
///
/// Unlike [`OversamplingBalancer`](super::OversamplingBalancer), a class
/// with a single observation is a fatal error here: one point cannot anchor
/// a neighbor model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmoteBalancer {
    target: String,
    ratio: f64,
    shuffle: bool,
    k: usize,
    seed: Option<u64>,
}

impl SmoteBalancer {
    /// Create a balancer for the named label column
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ratio: DEFAULT_RATIO,
            shuffle: true,
            k: 3,
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

    /// Number of neighbors used for interpolation (default 3)
    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k = k.max(1);
        self
    }

    /// Fix the random seed for reproducible draws
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Produce the balanced frame; the input is not modified.
    /// Feature columns are cast to f64 in the output, since synthetic rows
    /// interpolate between observations.
    pub fn balance(&self, df: &DataFrame) -> Result<DataFrame> {
        let summary = validate_class_ratio(df, &self.target, self.ratio)?;
        let mut rng = rng_from_seed(self.seed);

        if !summary.needs_balancing {
            let indices = default_indices(df.height(), self.shuffle, &mut rng);
            return take_rows(df, &indices);
        }

        let feature_cols: Vec<String> = df
            .get_column_names()
            .iter()
            .filter(|c| c.as_str() != self.target)
            .map(|c| c.to_string())
            .collect();
        if feature_cols.is_empty() {
            return Err(TabprepError::DataError(
                "SMOTE requires at least one feature column besides the target".to_string(),
            ));
        }

        // Working copy with float features so synthetic rows stack cleanly
        let mut working = cast_features(df, &self.target)?;
        let feature_values = extract_features(&working, &feature_cols)?;

        let majority_count = summary.majority().1;
        let n_required = ((self.ratio * majority_count as f64) as usize).max(1);

        // Counts and candidate rows are snapshotted before the loop; later
        // labels never see earlier synthetics as candidates
        for (label, count) in summary.minorities() {
            if *count == 1 {
                return Err(TabprepError::SamplingError(format!(
                    "cannot perform SMOTE on only one observation (class={})",
                    label
                )));
            }
            if *count as f64 / majority_count as f64 >= self.ratio {
                continue;
            }
            let n_samples = n_required.saturating_sub(*count);
            if n_samples == 0 {
                continue;
            }

            let rows = summary.label_rows(label);
            let replace = n_samples > rows.len();
            let drawn: Vec<usize> = if replace {
                (0..n_samples).map(|_| rows[rng.gen_range(0..rows.len())]).collect()
            } else {
                let mut pool = rows.clone();
                pool.shuffle(&mut rng);
                pool.truncate(n_samples);
                pool
            };

            let points = gather_rows(&feature_values, &drawn, feature_cols.len())?;
            let mut nn = NearestNeighbors::new(self.k);
            nn.fit(&points)?;

            let mut synthetic: Vec<Vec<f64>> = Vec::with_capacity(drawn.len());
            for neighbors in nn.kneighbors()? {
                let mut mean = vec![0.0; feature_cols.len()];
                for &j in &neighbors {
                    for (m, v) in mean.iter_mut().zip(points.row(j).iter()) {
                        *m += v;
                    }
                }
                for m in mean.iter_mut() {
                    *m /= neighbors.len() as f64;
                }
                synthetic.push(mean);
            }

            let syn_df = synthetic_frame(&working, &self.target, &feature_cols, &synthetic, rows[0])?;
            working.vstack_mut(&syn_df)?;
        }

        if self.shuffle {
            let indices = default_indices(working.height(), true, &mut rng);
            working = take_rows(&working, &indices)?;
        }
        Ok(working)
    }
}

/// Clone a frame with every non-target column cast to f64
fn cast_features(df: &DataFrame, target: &str) -> Result<DataFrame> {
    let mut columns: Vec<Column> = Vec::with_capacity(df.width());
    for name in df.get_column_names() {
        let column = df.column(name.as_str())?;
        if name.as_str() == target {
            columns.push(column.clone());
        } else {
            let series = column
                .as_materialized_series()
                .cast(&DataType::Float64)
                .map_err(|_| {
                    TabprepError::DataError(format!("feature column {} is not numeric", name))
                })?;
            columns.push(series.into_column());
        }
    }
    Ok(DataFrame::new(columns)?)
}

/// Per-feature value vectors; SMOTE needs every feature value finite
fn extract_features(df: &DataFrame, feature_cols: &[String]) -> Result<Vec<Vec<f64>>> {
    let mut out = Vec::with_capacity(feature_cols.len());
    for name in feature_cols {
        let values: Vec<f64> = df
            .column(name)?
            .as_materialized_series()
            .f64()?
            .into_iter()
            .map(|v| match v {
                Some(x) if x.is_finite() => Ok(x),
                _ => Err(TabprepError::DataError(format!(
                    "feature column {} contains null or non-finite values",
                    name
                ))),
            })
            .collect::<Result<_>>()?;
        out.push(values);
    }
    Ok(out)
}

/// Row-major matrix of the drawn rows
fn gather_rows(feature_values: &[Vec<f64>], rows: &[usize], n_features: usize) -> Result<Array2<f64>> {
    let mut data = Vec::with_capacity(rows.len() * n_features);
    for &row in rows {
        for values in feature_values {
            data.push(values[row]);
        }
    }
    Array2::from_shape_vec((rows.len(), n_features), data)
        .map_err(|e| TabprepError::DataError(e.to_string()))
}

/// Build the synthetic rows as a frame matching the working frame's schema.
/// The label column repeats the value at `label_row` so its dtype is
/// preserved exactly.
fn synthetic_frame(
    working: &DataFrame,
    target: &str,
    feature_cols: &[String],
    synthetic: &[Vec<f64>],
    label_row: usize,
) -> Result<DataFrame> {
    let n = synthetic.len();
    let mut columns: Vec<Column> = Vec::with_capacity(working.width());
    for name in working.get_column_names() {
        if name.as_str() == target {
            let idx = IdxCa::from_vec("idx".into(), vec![label_row as IdxSize; n]);
            let labels = working.column(target)?.as_materialized_series().take(&idx)?;
            columns.push(labels.into_column());
        } else {
            let j = feature_cols
                .iter()
                .position(|c| c == name.as_str())
                .expect("every non-target column is a feature column");
            let values: Vec<f64> = synthetic.iter().map(|row| row[j]).collect();
            columns.push(Series::new(name.clone(), values).into_column());
        }
    }
    Ok(DataFrame::new(columns)?)
}
