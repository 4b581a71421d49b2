//! t-SNE projection of embedding vectors to two dimensions.
//!
//! The exact solver follows the usual recipe: perplexity-calibrated Gaussian
//! affinities, a PCA-initialized layout, early exaggeration and gradient
//! descent with momentum and per-coordinate gains. It is quadratic in the
//! number of words, which is fine for hand-written word lists. Larger inputs
//! can use Barnes-Hut through `bhtsne` (random initialization, not seeded).

use bhtsne::tSNE;
use ndarray::{Array1, Array2, ArrayView1, Axis, Zip};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::error::{EmbedError, Result};

const PERPLEXITY_TOLERANCE: f64 = 1e-5;
const MAX_BINARY_SEARCH_STEPS: usize = 100;
const MIN_GAIN: f64 = 0.01;
const INITIAL_MOMENTUM: f64 = 0.5;
const FINAL_MOMENTUM: f64 = 0.8;
const MIN_PROBABILITY: f64 = 1e-12;
const PCA_INIT_STD: f64 = 1e-4;
const POWER_ITERATIONS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TsneMethod {
    Exact,
    BarnesHut { theta: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TsneConfig {
    pub perplexity: f64,
    pub early_exaggeration: f64,
    /// `None` picks `max(n / early_exaggeration / 4, 50)`
    pub learning_rate: Option<f64>,
    pub n_iter: usize,
    pub exaggeration_iters: usize,
    pub seed: u64,
    pub method: TsneMethod,
}

impl Default for TsneConfig {
    fn default() -> Self {
        Self {
            perplexity: 30.0,
            early_exaggeration: 12.0,
            learning_rate: None,
            n_iter: 1000,
            exaggeration_iters: 250,
            seed: 0,
            method: TsneMethod::Exact,
        }
    }
}

/// Project `data` (one row per word) to 2D, preserving row order.
pub fn fit_transform(data: &[Vec<f64>], config: &TsneConfig) -> Result<Vec<[f64; 2]>> {
    let n = data.len();
    if n == 0 {
        return Err(EmbedError::Projection("no vectors to project".to_string()));
    }

    let dim = data[0].len();
    if dim == 0 {
        return Err(EmbedError::Projection("vectors have no components".to_string()));
    }
    if let Some(row) = data.iter().position(|v| v.len() != dim) {
        return Err(EmbedError::Projection(format!(
            "row {} has {} values, expected {}",
            row,
            data[row].len(),
            dim
        )));
    }

    if n == 1 {
        return Ok(vec![[0.0, 0.0]]);
    }

    info!(samples = n, dim, method = ?config.method, "computing t-SNE embedding");
    match config.method {
        TsneMethod::Exact => exact_tsne(data, config),
        TsneMethod::BarnesHut { theta } => barnes_hut_tsne(data, config, theta),
    }
}

/// Perplexity must stay below `(n - 1) / 3` for the affinities to make sense.
pub fn effective_perplexity(requested: f64, n: usize) -> f64 {
    let max = n.saturating_sub(1) as f64 / 3.0;
    if requested > max {
        let clamped = max.max(1.0);
        warn!(requested, clamped, samples = n, "perplexity too large for sample count");
        clamped
    } else {
        requested
    }
}

fn exact_tsne(data: &[Vec<f64>], config: &TsneConfig) -> Result<Vec<[f64; 2]>> {
    let n = data.len();
    let x = to_matrix(data);

    let perplexity = effective_perplexity(config.perplexity, n);
    let conditional = conditional_probabilities(&squared_distances(&x), perplexity);
    let mut p = &conditional + &conditional.t();
    let total = p.sum();
    p.mapv_inplace(|v| (v / total).max(MIN_PROBABILITY));

    let learning_rate = config
        .learning_rate
        .unwrap_or_else(|| (n as f64 / config.early_exaggeration / 4.0).max(50.0));

    let mut y = pca_init(&x, config.seed);
    let mut update = Array2::<f64>::zeros((n, 2));
    let mut gains = Array2::<f64>::ones((n, 2));

    for iter in 0..config.n_iter {
        let (exaggeration, momentum) = if iter < config.exaggeration_iters {
            (config.early_exaggeration, INITIAL_MOMENTUM)
        } else {
            (1.0, FINAL_MOMENTUM)
        };

        let grad = gradient(&p, &y, exaggeration);
        Zip::from(&mut update)
            .and(&mut gains)
            .and(&grad)
            .for_each(|u, gain, &g| {
                let next_gain = if (g > 0.0) != (*u > 0.0) {
                    *gain + 0.2
                } else {
                    *gain * 0.8
                };
                *gain = next_gain.max(MIN_GAIN);
                *u = momentum * *u - learning_rate * *gain * g;
            });

        y += &update;
        if let Some(mean) = y.mean_axis(Axis(0)) {
            y -= &mean;
        }

        if (iter + 1) % 250 == 0 {
            debug!(iteration = iter + 1, kl = kl_divergence(&p, &y), "t-SNE progress");
        }
    }

    Ok(y.rows().into_iter().map(|row| [row[0], row[1]]).collect())
}

fn barnes_hut_tsne(data: &[Vec<f64>], config: &TsneConfig, theta: f32) -> Result<Vec<[f64; 2]>> {
    let n = data.len();
    let perplexity = config.perplexity as f32;
    if theta <= 0.0 {
        return Err(EmbedError::Projection(format!(
            "Barnes-Hut theta must be positive, got {}",
            theta
        )));
    }
    if (n as f32 - 1.0) < 3.0 * perplexity {
        return Err(EmbedError::Projection(format!(
            "Barnes-Hut t-SNE with perplexity {} needs at least {} samples, got {}",
            perplexity,
            (3.0 * perplexity).ceil() as usize + 1,
            n
        )));
    }

    let samples: Vec<Vec<f32>> = data
        .iter()
        .map(|row| row.iter().map(|&v| v as f32).collect())
        .collect();
    let learning_rate = config.learning_rate.unwrap_or(200.0) as f32;

    let points: Vec<f32> = tSNE::new(&samples)
        .embedding_dim(2)
        .perplexity(perplexity)
        .learning_rate(learning_rate)
        .epochs(config.n_iter)
        .barnes_hut(theta, |a, b| {
            a.iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y).powi(2))
                .sum::<f32>()
                .sqrt()
        })
        .embedding();

    Ok(points
        .chunks(2)
        .map(|pair| [pair[0] as f64, pair[1] as f64])
        .collect())
}

fn to_matrix(data: &[Vec<f64>]) -> Array2<f64> {
    let dim = data[0].len();
    let flat: Vec<f64> = data.iter().flat_map(|row| row.iter().copied()).collect();
    Array2::from_shape_vec((data.len(), dim), flat)
        .unwrap_or_else(|_| Array2::zeros((data.len(), dim)))
}

fn squared_distances(x: &Array2<f64>) -> Array2<f64> {
    let n = x.nrows();
    let mut distances = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in (i + 1)..n {
            let diff = &x.row(i) - &x.row(j);
            let d = diff.dot(&diff);
            distances[[i, j]] = d;
            distances[[j, i]] = d;
        }
    }
    distances
}

/// Row-normalized Gaussian affinities whose entropy matches `ln(perplexity)`.
fn conditional_probabilities(distances: &Array2<f64>, perplexity: f64) -> Array2<f64> {
    let n = distances.nrows();
    let target_entropy = perplexity.ln();
    let mut p = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        let mut beta = 1.0;
        let mut beta_min = f64::NEG_INFINITY;
        let mut beta_max = f64::INFINITY;
        let (mut entropy, mut row) = row_probabilities(distances.row(i), i, beta);

        for _ in 0..MAX_BINARY_SEARCH_STEPS {
            let diff = entropy - target_entropy;
            if diff.abs() < PERPLEXITY_TOLERANCE {
                break;
            }
            if diff > 0.0 {
                beta_min = beta;
                beta = if beta_max.is_infinite() { beta * 2.0 } else { (beta + beta_max) / 2.0 };
            } else {
                beta_max = beta;
                beta = if beta_min.is_infinite() { beta / 2.0 } else { (beta + beta_min) / 2.0 };
            }
            (entropy, row) = row_probabilities(distances.row(i), i, beta);
        }

        p.row_mut(i).assign(&row);
    }

    p
}

fn row_probabilities(distances: ArrayView1<f64>, i: usize, beta: f64) -> (f64, Array1<f64>) {
    let min_distance = distances
        .iter()
        .enumerate()
        .filter(|(j, _)| *j != i)
        .map(|(_, d)| *d)
        .fold(f64::INFINITY, f64::min);

    let mut row: Array1<f64> = distances
        .iter()
        .enumerate()
        .map(|(j, d)| if j == i { 0.0 } else { (-(d - min_distance) * beta).exp() })
        .collect();

    // The nearest neighbour contributes exp(0) = 1, so the sum is at least 1.
    let sum = row.sum();
    row /= sum;

    let entropy = row
        .iter()
        .filter(|v| **v > 0.0)
        .map(|v| -v * v.ln())
        .sum();
    (entropy, row)
}

fn gradient(p: &Array2<f64>, y: &Array2<f64>, exaggeration: f64) -> Array2<f64> {
    let n = y.nrows();
    let num = student_t_kernel(y);
    let sum_num = num.sum().max(f64::MIN_POSITIVE);

    let mut grad = Array2::<f64>::zeros((n, 2));
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let q = (num[[i, j]] / sum_num).max(MIN_PROBABILITY);
            let mult = 4.0 * (exaggeration * p[[i, j]] - q) * num[[i, j]];
            grad[[i, 0]] += mult * (y[[i, 0]] - y[[j, 0]]);
            grad[[i, 1]] += mult * (y[[i, 1]] - y[[j, 1]]);
        }
    }
    grad
}

fn student_t_kernel(y: &Array2<f64>) -> Array2<f64> {
    let n = y.nrows();
    let mut num = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in (i + 1)..n {
            let dx = y[[i, 0]] - y[[j, 0]];
            let dy = y[[i, 1]] - y[[j, 1]];
            let v = 1.0 / (1.0 + dx * dx + dy * dy);
            num[[i, j]] = v;
            num[[j, i]] = v;
        }
    }
    num
}

/// KL(P || Q) of a layout, for progress reporting.
fn kl_divergence(p: &Array2<f64>, y: &Array2<f64>) -> f64 {
    let num = student_t_kernel(y);
    let sum_num = num.sum().max(f64::MIN_POSITIVE);
    let n = y.nrows();

    let mut kl = 0.0;
    for i in 0..n {
        for j in 0..n {
            if i != j {
                let q = (num[[i, j]] / sum_num).max(MIN_PROBABILITY);
                kl += p[[i, j]] * (p[[i, j]] / q).ln();
            }
        }
    }
    kl
}

/// First two principal components, scaled so the first has std `PCA_INIT_STD`.
/// Falls back to a small seeded random layout when the data has no variance.
fn pca_init(x: &Array2<f64>, seed: u64) -> Array2<f64> {
    let n = x.nrows();
    let mut rng = StdRng::seed_from_u64(seed);

    let centered = match x.mean_axis(Axis(0)) {
        Some(mean) => x - &mean,
        None => x.clone(),
    };
    // Eigenvectors of the Gram matrix scaled by sqrt(eigenvalue) are the PCA scores.
    let mut gram = centered.dot(&centered.t());

    let mut y = Array2::<f64>::zeros((n, 2));
    for component in 0..2 {
        let (value, vector) = leading_eigenpair(&gram, &mut rng);
        let scale = value.max(0.0).sqrt();

        let pivot = vector
            .iter()
            .copied()
            .fold(0.0f64, |acc, v| if v.abs() > acc.abs() { v } else { acc });
        let sign = if pivot < 0.0 { -1.0 } else { 1.0 };
        y.column_mut(component).assign(&(&vector * (sign * scale)));

        let v = vector.view().insert_axis(Axis(1));
        gram = gram - v.dot(&v.t()) * value;
    }

    let std = y.column(0).std(0.0);
    if std > 0.0 {
        y *= PCA_INIT_STD / std;
    } else {
        y.mapv_inplace(|_| rng.random_range(-1.0..1.0) * PCA_INIT_STD);
    }
    y
}

fn leading_eigenpair(matrix: &Array2<f64>, rng: &mut StdRng) -> (f64, Array1<f64>) {
    let n = matrix.nrows();
    let mut v: Array1<f64> = (0..n).map(|_| rng.random_range(-1.0..1.0)).collect();
    let norm = v.dot(&v).sqrt();
    if norm > 0.0 {
        v /= norm;
    }

    for _ in 0..POWER_ITERATIONS {
        let next = matrix.dot(&v);
        let norm = next.dot(&next).sqrt();
        if norm < f64::MIN_POSITIVE {
            return (0.0, v);
        }
        v = next / norm;
    }

    let value = v.dot(&matrix.dot(&v));
    (value, v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;

    fn two_clusters(per_cluster: usize, dim: usize, seed: u64) -> Vec<Vec<f64>> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut data = Vec::new();
        for cluster in 0..2 {
            let center = if cluster == 0 { 0.0 } else { 10.0 };
            for _ in 0..per_cluster {
                data.push(
                    (0..dim)
                        .map(|_| center + rng.random_range(-0.5..0.5))
                        .collect(),
                );
            }
        }
        data
    }

    fn distance(a: &[f64; 2], b: &[f64; 2]) -> f64 {
        ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
    }

    #[test]
    fn test_rejects_empty_and_ragged_input() {
        let config = TsneConfig::default();
        assert!(matches!(fit_transform(&[], &config), Err(EmbedError::Projection(_))));

        let ragged = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(matches!(fit_transform(&ragged, &config), Err(EmbedError::Projection(_))));
    }

    #[test]
    fn test_single_point_sits_at_origin() {
        let points = fit_transform(&[vec![0.3, 0.1, 0.9]], &TsneConfig::default()).unwrap();
        assert_eq!(points, vec![[0.0, 0.0]]);
    }

    #[test]
    fn test_same_seed_gives_same_layout() {
        let data = two_clusters(6, 4, 7);
        let config = TsneConfig {
            n_iter: 300,
            ..TsneConfig::default()
        };

        let first = fit_transform(&data, &config).unwrap();
        let second = fit_transform(&data, &config).unwrap();
        assert_eq!(first.len(), data.len());
        assert_eq!(first, second);
        assert!(first.iter().all(|p| p[0].is_finite() && p[1].is_finite()));
    }

    #[test]
    fn test_separated_clusters_stay_separated() {
        let data = two_clusters(8, 6, 3);
        let config = TsneConfig {
            n_iter: 500,
            ..TsneConfig::default()
        };
        let points = fit_transform(&data, &config).unwrap();

        let mut intra = Vec::new();
        let mut inter = Vec::new();
        for i in 0..points.len() {
            for j in (i + 1)..points.len() {
                let d = distance(&points[i], &points[j]);
                if (i < 8) == (j < 8) {
                    intra.push(d);
                } else {
                    inter.push(d);
                }
            }
        }
        let mean = |v: &[f64]| v.iter().sum::<f64>() / v.len() as f64;
        assert!(
            mean(&intra) < mean(&inter),
            "intra {} should be below inter {}",
            mean(&intra),
            mean(&inter)
        );
    }

    #[test]
    fn test_effective_perplexity_clamps_small_inputs() {
        assert_eq!(effective_perplexity(30.0, 100), 30.0);
        assert_eq!(effective_perplexity(30.0, 13), 4.0);
        assert_eq!(effective_perplexity(30.0, 2), 1.0);
    }

    #[test]
    fn test_conditional_probabilities_match_perplexity() {
        let data = two_clusters(10, 3, 11);
        let x = to_matrix(&data);
        let p = conditional_probabilities(&squared_distances(&x), 5.0);

        for (i, row) in p.rows().into_iter().enumerate() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
            assert_eq!(row[i], 0.0);
            let entropy: f64 = row.iter().filter(|v| **v > 0.0).map(|v| -v * v.ln()).sum();
            assert!((entropy.exp() - 5.0).abs() < 1e-2, "row {i} perplexity {}", entropy.exp());
        }
    }

    #[test]
    fn test_pca_init_scales_first_component() {
        let data = two_clusters(5, 4, 5);
        let y = pca_init(&to_matrix(&data), 0);

        assert_eq!(y.dim(), (10, 2));
        assert!((y.column(0).std(0.0) - PCA_INIT_STD).abs() < 1e-12);

        // The first component splits the two clusters.
        let first: Vec<f64> = y.column(0).to_vec();
        assert!(first[..5].iter().all(|v| v.signum() == first[0].signum()));
        assert!(first[5..].iter().all(|v| v.signum() == -first[0].signum()));
    }

    #[test]
    fn test_pca_init_without_variance_is_random_but_seeded() {
        let data = vec![vec![1.0, 1.0]; 4];
        let a = pca_init(&to_matrix(&data), 9);
        let b = pca_init(&to_matrix(&data), 9);
        assert_eq!(a, b);
        assert!(a.iter().any(|v| *v != 0.0));
    }

    #[test]
    fn test_barnes_hut_needs_enough_samples() {
        let data = two_clusters(5, 3, 1);
        let config = TsneConfig {
            method: TsneMethod::BarnesHut { theta: 0.5 },
            ..TsneConfig::default()
        };
        assert!(matches!(
            fit_transform(&data, &config),
            Err(EmbedError::Projection(_))
        ));
    }
}
