//! Box-Cox and Yeo-Johnson power transforms
//!
//! Both transformers estimate one lambda per feature by maximizing a
//! log-likelihood with the Brent scalar minimizer, then apply the forward
//! transform column by column. Fitting never mutates the input frame.

use crate::error::{Result, TabprepError};
use crate::optimize::minimize_scalar;
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Absolute threshold for "lambda equals a boundary constant" comparisons.
/// Exact float equality misclassifies values that round to the boundary.
const ZERO_THRESHOLD: f64 = 1e-16;

/// Values at or below zero are truncated to this before a Box-Cox transform
const POSITIVITY_CLAMP: f64 = 1e-6;

/// Bracket for the lambda line search
const LAMBDA_BRACKET: (f64, f64) = (-2.0, 2.0);

fn near(lam: f64, c: f64) -> bool {
    (lam - c).abs() <= ZERO_THRESHOLD
}

/// Box-Cox transform of a single strictly positive value
fn boxcox_value(x: f64, lam: f64) -> f64 {
    if near(lam, 0.0) {
        x.ln()
    } else {
        (x.powf(lam) - 1.0) / lam
    }
}

/// Yeo-Johnson transform of a single value, piecewise on sign
fn yeo_johnson_value(x: f64, lam: f64) -> f64 {
    if x >= 0.0 {
        if near(lam, 0.0) {
            (x + 1.0).ln()
        } else {
            ((x + 1.0).powf(lam) - 1.0) / lam
        }
    } else if near(lam, 2.0) {
        -(-x + 1.0).ln()
    } else {
        -(((-x + 1.0).powf(2.0 - lam) - 1.0) / (2.0 - lam))
    }
}

/// Box-Cox log-likelihood over strictly positive data.
/// Zero variance yields NaN so the optimizer skips the candidate.
fn boxcox_llf(data: &[f64], lam: f64) -> f64 {
    let n = data.len() as f64;
    let y: Vec<f64> = data.iter().map(|&x| boxcox_value(x, lam)).collect();
    let mean = y.iter().sum::<f64>() / n;
    let var = y.iter().map(|&t| (t - mean).powi(2)).sum::<f64>() / n;
    if var == 0.0 {
        return f64::NAN;
    }
    let log_jacobian: f64 = data.iter().map(|&x| x.ln()).sum();
    (lam - 1.0) * log_jacobian - n / 2.0 * var.ln()
}

/// Yeo-Johnson log-likelihood over signed data.
///
/// The log term cannot take zeros or negatives, so both the data and its
/// transform are shifted up by |min| + 1 for the likelihood computation
/// only. Zero variance yields NaN.
fn yeo_johnson_llf(data: &[f64], lam: f64) -> Result<f64> {
    let n = data.len();
    if n == 0 {
        return Err(TabprepError::InsufficientData(
            "cannot evaluate likelihood of an empty vector".to_string(),
        ));
    }
    let nf = n as f64;
    let y: Vec<f64> = data.iter().map(|&x| yeo_johnson_value(x, lam)).collect();

    let min_d = data.iter().cloned().fold(f64::INFINITY, f64::min);
    let min_y = y.iter().cloned().fold(f64::INFINITY, f64::min);

    let data_shifted: Vec<f64> = if min_d < ZERO_THRESHOLD {
        let shift = min_d.abs() + 1.0;
        data.iter().map(|&x| x + shift).collect()
    } else {
        data.to_vec()
    };
    let y_shifted: Vec<f64> = if min_y < ZERO_THRESHOLD {
        let shift = min_y.abs() + 1.0;
        y.iter().map(|&v| v + shift).collect()
    } else {
        y
    };

    let y_mean = y_shifted.iter().sum::<f64>() / nf;
    let var = y_shifted.iter().map(|&v| (v - y_mean).powi(2)).sum::<f64>() / nf;
    if var == 0.0 {
        return Ok(f64::NAN);
    }

    let llf = (lam - 1.0) * data_shifted.iter().map(|&x| x.ln()).sum::<f64>()
        - nf / 2.0 * var.ln();
    Ok(llf)
}

fn estimate_boxcox_lambda(data: &[f64]) -> Result<f64> {
    if data.is_empty() {
        return Err(TabprepError::InsufficientData(
            "cannot estimate lambda from an empty vector".to_string(),
        ));
    }
    minimize_scalar(|lam| -boxcox_llf(data, lam), LAMBDA_BRACKET)
}

fn estimate_yeo_johnson_lambda(data: &[f64]) -> Result<f64> {
    if data.is_empty() {
        return Err(TabprepError::InsufficientData(
            "cannot estimate lambda from an empty vector".to_string(),
        ));
    }
    minimize_scalar(|lam| -yeo_johnson_llf(data, lam).unwrap_or(f64::NAN), LAMBDA_BRACKET)
}

/// Resolve a parallelism setting: 1 = sequential, -1 = all logical CPUs,
/// n < -1 = cpus + 1 + n (floor 1).
fn effective_jobs(n_jobs: i32) -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    if n_jobs >= 0 {
        (n_jobs as usize).max(1)
    } else {
        ((cpus as i64 + 1 + n_jobs as i64).max(1)) as usize
    }
}

/// Run per-column lambda estimation either sequentially or on a dedicated
/// rayon pool of the requested width. Columns share no mutable state.
fn estimate_all<F>(columns: Vec<(String, Vec<f64>)>, n_jobs: i32, estimate: F) -> Result<Vec<(String, f64)>>
where
    F: Fn(&[f64]) -> Result<f64> + Send + Sync,
{
    let jobs = effective_jobs(n_jobs);
    if jobs <= 1 {
        columns
            .into_iter()
            .map(|(name, values)| Ok((name, estimate(&values)?)))
            .collect()
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .map_err(|e| TabprepError::ThreadPoolError(e.to_string()))?;
        pool.install(|| {
            columns
                .into_par_iter()
                .map(|(name, values)| Ok((name, estimate(&values)?)))
                .collect()
        })
    }
}

fn numeric_column_names(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|c| {
            matches!(
                c.dtype(),
                DataType::Float64
                    | DataType::Float32
                    | DataType::Int64
                    | DataType::Int32
                    | DataType::Int16
                    | DataType::Int8
                    | DataType::UInt64
                    | DataType::UInt32
                    | DataType::UInt16
                    | DataType::UInt8
            )
        })
        .map(|c| c.name().to_string())
        .collect()
}

/// Pull a column as f64 values, nulls dropped
fn column_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| TabprepError::FeatureNotFound(name.to_string()))?;
    let series = column.as_materialized_series().cast(&DataType::Float64)?;
    Ok(series.f64()?.into_iter().flatten().collect())
}

/// Map every non-null value of a column through `f`, keeping nulls in place
fn map_column<F>(df: &DataFrame, name: &str, f: F) -> Result<Series>
where
    F: Fn(f64) -> f64,
{
    let column = df
        .column(name)
        .map_err(|_| TabprepError::FeatureNotFound(name.to_string()))?;
    let series = column.as_materialized_series().cast(&DataType::Float64)?;
    let values: Vec<Option<f64>> = series
        .f64()?
        .into_iter()
        .map(|v| v.map(&f))
        .collect();
    Ok(Series::new(name.into(), values))
}

/// Box-Cox power transformer with per-feature lambda and shift maps.
///
/// Box-Cox requires strictly positive inputs; each feature gets a stored
/// shift computed at fit time, and any value still at or below zero after
/// shifting is truncated to 1e-6 (at fit and again at transform time, since
/// the fitted shift cannot guarantee positivity of future data).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxCoxTransformer {
    columns: Option<Vec<String>>,
    n_jobs: i32,
    lambda_: HashMap<String, f64>,
    shift_: HashMap<String, f64>,
    is_fitted: bool,
}

impl BoxCoxTransformer {
    pub fn new() -> Self {
        Self {
            columns: None,
            n_jobs: 1,
            lambda_: HashMap::new(),
            shift_: HashMap::new(),
            is_fitted: false,
        }
    }

    /// Restrict the transform to a subset of columns.
    /// Defaults to every numeric column at fit time.
    pub fn with_columns(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Degree of parallelism for per-feature estimation.
    /// 1 = sequential, -1 = all CPUs, n < -1 = cpus + 1 + n.
    pub fn with_n_jobs(mut self, n_jobs: i32) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    /// Fitted lambda per column
    pub fn lambdas(&self) -> &HashMap<String, f64> {
        &self.lambda_
    }

    /// Fitted positivity shift per column
    pub fn shifts(&self) -> &HashMap<String, f64> {
        &self.shift_
    }

    /// Estimate shifts and lambdas for every selected column
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        if df.height() < 2 {
            return Err(TabprepError::InsufficientData(format!(
                "n_samples should be at least two, but was {}",
                df.height()
            )));
        }
        let cols = match &self.columns {
            Some(cols) => cols.clone(),
            None => numeric_column_names(df),
        };

        let mut shifts = HashMap::new();
        let mut prepared = Vec::with_capacity(cols.len());
        for name in &cols {
            let values = column_values(df, name)?;
            if values.is_empty() {
                return Err(TabprepError::InsufficientData(format!(
                    "column {} has no non-null values",
                    name
                )));
            }
            let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let shift = if min <= 0.0 { min.abs() + 1e-6 } else { 0.0 };
            let shifted: Vec<f64> = values
                .iter()
                .map(|&v| {
                    let s = v + shift;
                    if s <= 0.0 {
                        POSITIVITY_CLAMP
                    } else {
                        s
                    }
                })
                .collect();
            shifts.insert(name.clone(), shift);
            prepared.push((name.clone(), shifted));
        }

        let lambdas = estimate_all(prepared, self.n_jobs, estimate_boxcox_lambda)?;
        for (name, lambda) in &lambdas {
            debug!(column = %name, lambda, "fitted Box-Cox lambda");
        }

        self.lambda_ = lambdas.into_iter().collect();
        self.shift_ = shifts;
        self.is_fitted = true;
        Ok(self)
    }

    /// Apply the fitted transform, returning a new frame
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(TabprepError::NotFitted);
        }
        let mut result = df.clone();
        for (name, &lambda) in &self.lambda_ {
            if df.column(name).is_err() {
                return Err(TabprepError::FeatureNotFound(name.to_string()));
            }
            let shift = self.shift_[name];
            let transformed = map_column(df, name, |x| {
                let shifted = x + shift;
                let positive = if shifted <= 0.0 { POSITIVITY_CLAMP } else { shifted };
                boxcox_value(positive, lambda)
            })?;
            result.with_column(transformed)?;
        }
        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<DataFrame> {
        self.fit(df)?;
        self.transform(df)
    }
}

impl Default for BoxCoxTransformer {
    fn default() -> Self {
        Self::new()
    }
}

/// Yeo-Johnson power transformer with a per-feature lambda map.
///
/// Works on signed data, so no shift map is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YeoJohnsonTransformer {
    columns: Option<Vec<String>>,
    n_jobs: i32,
    lambda_: HashMap<String, f64>,
    is_fitted: bool,
}

impl YeoJohnsonTransformer {
    pub fn new() -> Self {
        Self {
            columns: None,
            n_jobs: 1,
            lambda_: HashMap::new(),
            is_fitted: false,
        }
    }

    /// Restrict the transform to a subset of columns.
    /// Defaults to every numeric column at fit time.
    pub fn with_columns(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Degree of parallelism for per-feature estimation.
    /// 1 = sequential, -1 = all CPUs, n < -1 = cpus + 1 + n.
    pub fn with_n_jobs(mut self, n_jobs: i32) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    /// Fitted lambda per column
    pub fn lambdas(&self) -> &HashMap<String, f64> {
        &self.lambda_
    }

    /// Estimate lambdas for every selected column
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        if df.height() < 2 {
            return Err(TabprepError::InsufficientData(format!(
                "n_samples should be at least two, but was {}",
                df.height()
            )));
        }
        let cols = match &self.columns {
            Some(cols) => cols.clone(),
            None => numeric_column_names(df),
        };

        let mut prepared = Vec::with_capacity(cols.len());
        for name in &cols {
            let values = column_values(df, name)?;
            if values.is_empty() {
                return Err(TabprepError::InsufficientData(format!(
                    "column {} has no non-null values",
                    name
                )));
            }
            prepared.push((name.clone(), values));
        }

        let lambdas = estimate_all(prepared, self.n_jobs, estimate_yeo_johnson_lambda)?;
        for (name, lambda) in &lambdas {
            debug!(column = %name, lambda, "fitted Yeo-Johnson lambda");
        }

        self.lambda_ = lambdas.into_iter().collect();
        self.is_fitted = true;
        Ok(self)
    }

    /// Apply the fitted transform, returning a new frame
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(TabprepError::NotFitted);
        }
        let mut result = df.clone();
        for (name, &lambda) in &self.lambda_ {
            if df.column(name).is_err() {
                return Err(TabprepError::FeatureNotFound(name.to_string()));
            }
            let transformed = map_column(df, name, |x| yeo_johnson_value(x, lambda))?;
            result.with_column(transformed)?;
        }
        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<DataFrame> {
        self.fit(df)?;
        self.transform(df)
    }
}

impl Default for YeoJohnsonTransformer {
    fn default() -> Self {
        Self::new()
    }
}
