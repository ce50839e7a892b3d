//! Isolation Forest
//!
//! Unsupervised outlier model used by the per-parameter detectors.
//! Each split node keeps the observed range of its split feature; a query
//! falling outside that range is isolated right there.

use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::OutlierModel;
use crate::logic::error::{PipelineError, PipelineResult};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Average path length of an unsuccessful BST search over `n` points
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let nf = n as f64;
            2.0 * ((nf - 1.0).ln() + EULER_GAMMA) - 2.0 * (nf - 1.0) / nf
        }
    }
}

/// Linear-interpolated quantile of unsorted data (`q` in [0, 1])
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IsolationForestParams {
    pub n_trees: usize,
    pub max_samples: usize,
    /// Expected outlier share in training data, in [0, 0.5)
    pub contamination: f64,
    pub seed: u64,
}

impl Default for IsolationForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_samples: 256,
            contamination: crate::constants::DEFAULT_CONTAMINATION,
            seed: crate::constants::DEFAULT_SEED,
        }
    }
}

// ============================================================================
// TREE
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        lo: f64,
        hi: f64,
        left: usize,
        right: usize,
    },
}

/// Arena-allocated isolation tree (root at index 0)
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn build(x: &ArrayView2<f64>, rows: Vec<usize>, depth_limit: usize, rng: &mut StdRng) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(x, rows, 0, depth_limit, rng);
        tree
    }

    fn grow(
        &mut self,
        x: &ArrayView2<f64>,
        rows: Vec<usize>,
        depth: usize,
        depth_limit: usize,
        rng: &mut StdRng,
    ) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { size: rows.len() });

        if depth >= depth_limit || rows.len() <= 1 {
            return id;
        }

        let mut features: Vec<usize> = (0..x.ncols()).collect();
        features.shuffle(rng);

        // First feature (in random order) that still varies in this node
        let mut chosen = None;
        for f in features {
            let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
                let v = x[[r, f]];
                (lo.min(v), hi.max(v))
            });
            if hi > lo {
                chosen = Some((f, lo, hi));
                break;
            }
        }

        let Some((feature, lo, hi)) = chosen else {
            return id;
        };

        let threshold = rng.gen_range(lo..hi);
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            rows.into_iter().partition(|&r| x[[r, feature]] <= threshold);

        let left = self.grow(x, left_rows, depth + 1, depth_limit, rng);
        let right = self.grow(x, right_rows, depth + 1, depth_limit, rng);

        self.nodes[id] = Node::Split {
            feature,
            threshold,
            lo,
            hi,
            left,
            right,
        };
        id
    }

    fn path_length(&self, sample: &[f64]) -> f64 {
        let mut id = 0;
        let mut depth = 0.0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { size } => return depth + average_path_length(*size),
                Node::Split {
                    feature,
                    threshold,
                    lo,
                    hi,
                    left,
                    right,
                } => {
                    let v = sample[*feature];
                    if v < *lo || v > *hi {
                        return depth + 1.0;
                    }
                    id = if v <= *threshold { *left } else { *right };
                    depth += 1.0;
                }
            }
        }
    }
}

// ============================================================================
// FOREST
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    params: IsolationForestParams,
    n_features: usize,
    sample_size: usize,
    trees: Vec<IsolationTree>,
    /// Scores strictly above this are outliers
    threshold: f64,
}

impl IsolationForest {
    pub fn new(params: IsolationForestParams) -> Self {
        Self {
            params,
            n_features: 0,
            sample_size: 0,
            trees: Vec::new(),
            threshold: f64::INFINITY,
        }
    }

    pub fn params(&self) -> &IsolationForestParams {
        &self.params
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    fn score_row(&self, row: &[f64]) -> f64 {
        let c = average_path_length(self.sample_size);
        if c <= 0.0 || self.trees.is_empty() {
            return 0.5;
        }
        let mean_path =
            self.trees.iter().map(|t| t.path_length(row)).sum::<f64>() / self.trees.len() as f64;
        2f64.powf(-mean_path / c)
    }
}

impl OutlierModel for IsolationForest {
    fn fit(&mut self, x: ArrayView2<f64>) -> PipelineResult<()> {
        let n = x.nrows();
        if n == 0 || x.ncols() == 0 {
            return Err(PipelineError::EmptyMatrix);
        }
        if !(0.0..0.5).contains(&self.params.contamination) {
            return Err(PipelineError::InvalidParameter(format!(
                "contamination must be in [0, 0.5), got {}",
                self.params.contamination
            )));
        }

        let psi = self.params.max_samples.min(n).max(1);
        let depth_limit = (psi as f64).log2().ceil().max(0.0) as usize;
        let mut rng = StdRng::seed_from_u64(self.params.seed);

        let trees: Vec<IsolationTree> = (0..self.params.n_trees.max(1))
            .map(|_| {
                let rows = index::sample(&mut rng, n, psi).into_vec();
                IsolationTree::build(&x, rows, depth_limit, &mut rng)
            })
            .collect();

        self.n_features = x.ncols();
        self.sample_size = psi;
        self.trees = trees;

        let scores = self.score_samples(x);
        self.threshold = quantile(&scores, 1.0 - self.params.contamination);

        log::debug!(
            "Isolation forest fitted: {} trees, psi={}, threshold={:.4}",
            self.trees.len(),
            psi,
            self.threshold
        );
        Ok(())
    }

    fn score_samples(&self, x: ArrayView2<f64>) -> Vec<f64> {
        x.rows()
            .into_iter()
            .map(|row| {
                let row: Vec<f64> = row.to_vec();
                self.score_row(&row)
            })
            .collect()
    }

    fn predict(&self, x: ArrayView2<f64>) -> Vec<bool> {
        self.score_samples(x)
            .into_iter()
            .map(|s| s > self.threshold)
            .collect()
    }

    fn n_features(&self) -> usize {
        self.n_features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use crate::logic::dataset::generator::standard_normal;

    fn gaussian_blob(n: usize, seed: u64) -> Array2<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        Array2::from_shape_fn((n, 3), |_| standard_normal(&mut rng))
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        assert!(average_path_length(256) > 10.0);
    }

    #[test]
    fn test_quantile() {
        let v = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(quantile(&v, 1.0), 4.0);
        assert_eq!(quantile(&v, 0.0), 1.0);
        assert_eq!(quantile(&v, 0.5), 2.5);
    }

    #[test]
    fn test_far_point_scores_higher() {
        let x = gaussian_blob(200, 7);
        let mut forest = IsolationForest::new(IsolationForestParams::default());
        forest.fit(x.view()).unwrap();

        let query = Array2::from_shape_vec((2, 3), vec![0.0, 0.0, 0.0, 50.0, 50.0, 50.0]).unwrap();
        let scores = forest.score_samples(query.view());
        assert!(scores[1] > scores[0]);
        assert_eq!(forest.predict(query.view()), vec![false, true]);
    }

    #[test]
    fn test_contamination_share() {
        let x = gaussian_blob(300, 11);
        let mut forest = IsolationForest::new(IsolationForestParams {
            contamination: 0.1,
            ..Default::default()
        });
        forest.fit(x.view()).unwrap();

        let flagged = forest.predict(x.view()).into_iter().filter(|f| *f).count();
        assert!(flagged > 0 && flagged <= 31, "flagged {}", flagged);
    }

    #[test]
    fn test_zero_contamination_flags_no_training_row() {
        let x = gaussian_blob(80, 3);
        let mut forest = IsolationForest::new(IsolationForestParams {
            contamination: 0.0,
            ..Default::default()
        });
        forest.fit(x.view()).unwrap();
        assert!(forest.predict(x.view()).iter().all(|f| !f));
    }

    #[test]
    fn test_rejects_bad_input() {
        let mut forest = IsolationForest::new(IsolationForestParams::default());
        assert!(forest.fit(Array2::<f64>::zeros((0, 7)).view()).is_err());

        let mut forest = IsolationForest::new(IsolationForestParams {
            contamination: 0.6,
            ..Default::default()
        });
        assert!(forest.fit(gaussian_blob(10, 1).view()).is_err());
    }
}
