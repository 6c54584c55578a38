use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::scaler::check_dimensions;

#[derive(Debug, Clone)]
pub struct KMeansConfig {
    pub k: usize,
    pub max_iterations: usize,
    /// Training stops once the summed squared centroid shift falls below this.
    pub tolerance: f64,
    pub n_init: usize,
    pub seed: u64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            k: 4,
            max_iterations: 300,
            tolerance: 1e-4,
            n_init: 10,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeans {
    pub centroids: Vec<Vec<f64>>,
    pub inertia: f64,
    pub iterations: usize,
}

impl KMeans {
    pub fn fit(data: &[Vec<f64>], config: &KMeansConfig) -> Result<Self, PipelineError> {
        let first = data.first().ok_or(PipelineError::EmptyDataset)?;
        check_dimensions(data, first.len())?;
        if config.k == 0 || data.len() < config.k {
            return Err(PipelineError::TooFewSamples {
                samples: data.len(),
                clusters: config.k,
            });
        }

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let mut best: Option<KMeans> = None;

        for _ in 0..config.n_init.max(1) {
            let run = run_lloyd(data, config, &mut rng);
            let better = best
                .as_ref()
                .map_or(true, |current| run.inertia < current.inertia);
            if better {
                best = Some(run);
            }
        }

        best.ok_or(PipelineError::EmptyDataset)
    }

    pub fn k(&self) -> usize {
        self.centroids.len()
    }

    pub fn dimension(&self) -> usize {
        self.centroids.first().map_or(0, Vec::len)
    }

    pub fn predict(&self, point: &[f64]) -> usize {
        nearest(&self.centroids, point).0
    }
}

fn run_lloyd<R: Rng + ?Sized>(data: &[Vec<f64>], config: &KMeansConfig, rng: &mut R) -> KMeans {
    let mut centroids = init_plus_plus(data, config.k, rng);
    let mut assignments = vec![0usize; data.len()];
    let mut iterations = 0;

    while iterations < config.max_iterations {
        iterations += 1;
        for (slot, point) in assignments.iter_mut().zip(data) {
            *slot = nearest(&centroids, point).0;
        }

        let updated = recompute_centroids(data, &assignments, &centroids);
        let shift: f64 = centroids
            .iter()
            .zip(&updated)
            .map(|(old, new)| squared_distance(old, new))
            .sum();
        centroids = updated;

        if shift <= config.tolerance {
            break;
        }
    }

    let inertia = data.iter().map(|point| nearest(&centroids, point).1).sum();

    KMeans {
        centroids,
        inertia,
        iterations,
    }
}

/// Picks the first centroid uniformly, then each next one with probability
/// proportional to its squared distance from the centroids chosen so far.
fn init_plus_plus<R: Rng + ?Sized>(data: &[Vec<f64>], k: usize, rng: &mut R) -> Vec<Vec<f64>> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(data[rng.random_range(0..data.len())].clone());

    while centroids.len() < k {
        let distances: Vec<f64> = data
            .iter()
            .map(|point| nearest(&centroids, point).1)
            .collect();
        let total: f64 = distances.iter().sum();

        if total <= 0.0 {
            centroids.push(data[rng.random_range(0..data.len())].clone());
            continue;
        }

        let target = rng.random_range(0.0..total);
        let mut cumulative = 0.0;
        let mut chosen = data.len() - 1;
        for (index, distance) in distances.iter().enumerate() {
            cumulative += distance;
            if target < cumulative {
                chosen = index;
                break;
            }
        }
        centroids.push(data[chosen].clone());
    }

    centroids
}

/// Mean of each cluster's members; an empty cluster keeps its previous centroid.
fn recompute_centroids(
    data: &[Vec<f64>],
    assignments: &[usize],
    previous: &[Vec<f64>],
) -> Vec<Vec<f64>> {
    let dimension = previous.first().map_or(0, Vec::len);
    let mut sums = vec![vec![0.0; dimension]; previous.len()];
    let mut counts = vec![0usize; previous.len()];

    for (point, &cluster) in data.iter().zip(assignments) {
        counts[cluster] += 1;
        for (acc, value) in sums[cluster].iter_mut().zip(point) {
            *acc += value;
        }
    }

    sums.into_iter()
        .zip(counts)
        .zip(previous)
        .map(|((sum, count), old)| {
            if count == 0 {
                old.clone()
            } else {
                sum.into_iter().map(|v| v / count as f64).collect()
            }
        })
        .collect()
}

fn nearest(centroids: &[Vec<f64>], point: &[f64]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (index, centroid) in centroids.iter().enumerate() {
        let distance = squared_distance(centroid, point);
        if distance < best.1 {
            best = (index, distance);
        }
    }
    best
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}
