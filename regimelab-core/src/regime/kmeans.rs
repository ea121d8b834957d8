//! Seeded k-means over standardized features.
//!
//! k-means++ initialization, Lloyd iteration, `n_init` restarts keeping the
//! lowest within-cluster sum of squares. Everything is deterministic from
//! the master seed: restart r uses `StdRng::seed_from_u64(seed + r)`, so
//! identical input and seed always reproduce identical assignments.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KMeansError {
    #[error("empty feature matrix")]
    EmptyInput,

    #[error("k must be in 1..={rows}, got {k}")]
    InvalidK { k: usize, rows: usize },
}

/// Column-wise standardization to mean 0 / unit variance.
///
/// Flat columns (zero variance) transform to 0 rather than dividing by zero.
#[derive(Debug, Clone)]
pub struct Standardizer {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl Standardizer {
    pub fn fit(x: &[Vec<f64>]) -> Self {
        let dims = x.first().map_or(0, Vec::len);
        let n = x.len() as f64;
        let mut means = vec![0.0; dims];
        for row in x {
            for (m, v) in means.iter_mut().zip(row) {
                *m += v;
            }
        }
        for m in &mut means {
            *m /= n;
        }
        let mut stds = vec![0.0; dims];
        for row in x {
            for ((s, v), m) in stds.iter_mut().zip(row).zip(&means) {
                *s += (v - m).powi(2);
            }
        }
        for s in &mut stds {
            *s = (*s / n).sqrt();
        }
        Self { means, stds }
    }

    pub fn transform(&self, x: &[Vec<f64>]) -> Vec<Vec<f64>> {
        x.iter()
            .map(|row| {
                row.iter()
                    .zip(&self.means)
                    .zip(&self.stds)
                    .map(|((v, m), s)| if *s == 0.0 { 0.0 } else { (v - m) / s })
                    .collect()
            })
            .collect()
    }
}

/// Fitted k-means model.
#[derive(Debug, Clone)]
pub struct KMeansModel {
    pub centroids: Vec<Vec<f64>>,
    /// Within-cluster sum of squared distances of the winning restart.
    pub inertia: f64,
}

impl KMeansModel {
    /// Assign each row to its nearest centroid.
    pub fn predict(&self, x: &[Vec<f64>]) -> Vec<usize> {
        x.iter().map(|row| nearest(row, &self.centroids).0).collect()
    }
}

fn sq_dist(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

fn nearest(row: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = 0;
    let mut best_d = f64::INFINITY;
    for (j, c) in centroids.iter().enumerate() {
        let d = sq_dist(row, c);
        if d < best_d {
            best_d = d;
            best = j;
        }
    }
    (best, best_d)
}

/// k-means++ seeding: first centroid uniform, subsequent ones sampled with
/// probability proportional to squared distance from the nearest chosen one.
fn init_centroids(x: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids: Vec<Vec<f64>> = Vec::with_capacity(k);
    centroids.push(x[rng.gen_range(0..x.len())].clone());

    while centroids.len() < k {
        let dists: Vec<f64> = x.iter().map(|row| nearest(row, &centroids).1).collect();
        let total: f64 = dists.iter().sum();
        if total == 0.0 {
            // All points coincide with a centroid; fill deterministically.
            centroids.push(x[rng.gen_range(0..x.len())].clone());
            continue;
        }
        let mut target = rng.gen::<f64>() * total;
        let mut chosen = x.len() - 1;
        for (i, d) in dists.iter().enumerate() {
            target -= d;
            if target <= 0.0 {
                chosen = i;
                break;
            }
        }
        centroids.push(x[chosen].clone());
    }
    centroids
}

fn lloyd(
    x: &[Vec<f64>],
    mut centroids: Vec<Vec<f64>>,
    max_iter: usize,
) -> (Vec<usize>, Vec<Vec<f64>>, f64) {
    let k = centroids.len();
    let dims = x[0].len();
    let mut assignments = vec![0usize; x.len()];

    for _ in 0..max_iter {
        let mut changed = false;
        for (i, row) in x.iter().enumerate() {
            let (j, _) = nearest(row, &centroids);
            if assignments[i] != j {
                assignments[i] = j;
                changed = true;
            }
        }

        let mut sums = vec![vec![0.0; dims]; k];
        let mut counts = vec![0usize; k];
        for (row, &j) in x.iter().zip(&assignments) {
            counts[j] += 1;
            for (s, v) in sums[j].iter_mut().zip(row) {
                *s += v;
            }
        }
        for j in 0..k {
            if counts[j] == 0 {
                continue; // empty cluster keeps its centroid
            }
            for s in &mut sums[j] {
                *s /= counts[j] as f64;
            }
            centroids[j] = sums[j].clone();
        }

        if !changed {
            break;
        }
    }

    let inertia: f64 = x
        .iter()
        .zip(&assignments)
        .map(|(row, &j)| sq_dist(row, &centroids[j]))
        .sum();
    (assignments, centroids, inertia)
}

/// Fit k-means with `n_init` restarts, keeping the lowest-inertia solution.
pub fn fit(
    x: &[Vec<f64>],
    k: usize,
    seed: u64,
    n_init: usize,
    max_iter: usize,
) -> Result<(KMeansModel, Vec<usize>), KMeansError> {
    if x.is_empty() {
        return Err(KMeansError::EmptyInput);
    }
    if k == 0 || k > x.len() {
        return Err(KMeansError::InvalidK { k, rows: x.len() });
    }

    let mut best: Option<(KMeansModel, Vec<usize>)> = None;
    for restart in 0..n_init.max(1) as u64 {
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(restart));
        let init = init_centroids(x, k, &mut rng);
        let (assignments, centroids, inertia) = lloyd(x, init, max_iter);
        let replace = match &best {
            None => true,
            Some((model, _)) => inertia < model.inertia,
        };
        if replace {
            best = Some((
                KMeansModel {
                    centroids,
                    inertia,
                },
                assignments,
            ));
        }
    }
    Ok(best.expect("at least one restart runs"))
}
