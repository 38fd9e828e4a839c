//! Nearest-neighbor index over row vectors
//!
//! A small exact k-NN index: fit on a matrix of row vectors, then query the
//! k nearest neighbors of every fitted row (self excluded). Backs the SMOTE
//! synthetic interpolation step.

use crate::error::{Result, TabprepError};
use ndarray::Array2;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Ordered (distance, index) pair for BinaryHeap-based partial sort
#[derive(Debug, Clone, Copy)]
struct DistIdx(f64, usize);

impl PartialEq for DistIdx {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl Eq for DistIdx {}
impl PartialOrd for DistIdx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for DistIdx {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
    }
}

/// Exact nearest-neighbor index with Euclidean distance
#[derive(Debug, Clone)]
pub struct NearestNeighbors {
    n_neighbors: usize,
    data: Option<Array2<f64>>,
}

impl NearestNeighbors {
    /// Create an index that will answer k-neighbor queries
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors,
            data: None,
        }
    }

    /// Store the row vectors to query against
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if self.n_neighbors == 0 || self.n_neighbors >= x.nrows() {
            return Err(TabprepError::InvalidParameter {
                name: "n_neighbors".to_string(),
                value: self.n_neighbors.to_string(),
                reason: format!("must be in [1, {}) for {} fitted rows", x.nrows(), x.nrows()),
            });
        }
        self.data = Some(x.clone());
        Ok(self)
    }

    /// For every fitted row, the indices of its k nearest neighbors within
    /// the fitted set, nearest first. A row is never its own neighbor.
    pub fn kneighbors(&self) -> Result<Vec<Vec<usize>>> {
        let data = self.data.as_ref().ok_or(TabprepError::NotFitted)?;
        let k = self.n_neighbors;

        let mut out = Vec::with_capacity(data.nrows());
        for (i, row) in data.rows().into_iter().enumerate() {
            let point = row.as_slice().expect("row views of owned Array2 are contiguous");

            // Max-heap of the k smallest distances: O(n log k)
            let mut heap: BinaryHeap<DistIdx> = BinaryHeap::with_capacity(k + 1);
            for (j, other) in data.rows().into_iter().enumerate() {
                if j == i {
                    continue;
                }
                let dist = euclidean(point, other.as_slice().expect("contiguous row"));
                if heap.len() < k {
                    heap.push(DistIdx(dist, j));
                } else if let Some(&DistIdx(max_dist, _)) = heap.peek() {
                    if dist < max_dist {
                        heap.pop();
                        heap.push(DistIdx(dist, j));
                    }
                }
            }

            let mut neighbors: Vec<DistIdx> = heap.into_iter().collect();
            neighbors.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
            out.push(neighbors.into_iter().map(|DistIdx(_, j)| j).collect());
        }
        Ok(out)
    }
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(ai, bi)| {
            let d = ai - bi;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}
