//! Random Forest Classifier
//!
//! Bootstrap-aggregated gini trees for the maintenance predictor.
//! Binary labels only; probabilities are the mean of leaf class fractions.

use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::Classifier;
use crate::logic::error::{PipelineError, PipelineResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RandomForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    /// Features tried per split; None means floor(sqrt(d))
    pub max_features: Option<usize>,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 10,
            max_features: None,
            bootstrap: true,
            seed: crate::constants::DEFAULT_SEED,
        }
    }
}

fn gini(pos: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    let p = pos / total;
    2.0 * p * (1.0 - p)
}

// ============================================================================
// TREE
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        /// Share of positive samples reaching this leaf
        positive: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    decrease: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DecisionTree {
    nodes: Vec<Node>,
}

struct TreeBuilder<'a, 'b> {
    x: &'a ArrayView2<'b, f64>,
    y: &'a [bool],
    max_depth: usize,
    max_features: usize,
    nodes: Vec<Node>,
    importance: Vec<f64>,
}

impl<'a, 'b> TreeBuilder<'a, 'b> {
    fn grow(&mut self, rows: Vec<usize>, depth: usize, rng: &mut StdRng) -> usize {
        let total = rows.len() as f64;
        let pos = rows.iter().filter(|&&r| self.y[r]).count() as f64;
        let positive = if total > 0.0 { pos / total } else { 0.0 };

        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { positive });

        if depth >= self.max_depth || rows.len() < 2 || pos == 0.0 || pos == total {
            return id;
        }

        let Some(split) = self.best_split(&rows, pos, rng) else {
            return id;
        };

        self.importance[split.feature] += split.decrease;

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| self.x[[r, split.feature]] <= split.threshold);

        let left = self.grow(left_rows, depth + 1, rng);
        let right = self.grow(right_rows, depth + 1, rng);

        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }

    /// Best gini split over a random feature subset. When the subset holds
    /// only constant features, the remaining features are tried as well.
    fn best_split(&self, rows: &[usize], pos: f64, rng: &mut StdRng) -> Option<SplitCandidate> {
        let mut order: Vec<usize> = (0..self.x.ncols()).collect();
        order.shuffle(rng);

        let total = rows.len() as f64;
        let parent = total * gini(pos, total);

        let mut best: Option<SplitCandidate> = None;
        let mut tried = 0;
        let mut values: Vec<(f64, bool)> = Vec::with_capacity(rows.len());

        for feature in order {
            if tried >= self.max_features && best.is_some() {
                break;
            }

            values.clear();
            values.extend(rows.iter().map(|&r| (self.x[[r, feature]], self.y[r])));
            values.sort_by(|a, b| a.0.total_cmp(&b.0));

            if values[0].0 == values[values.len() - 1].0 {
                continue;
            }
            tried += 1;

            let mut left_pos = 0.0;
            for i in 0..values.len() - 1 {
                if values[i].1 {
                    left_pos += 1.0;
                }
                if values[i].0 == values[i + 1].0 {
                    continue;
                }
                let nl = (i + 1) as f64;
                let nr = total - nl;
                let child = nl * gini(left_pos, nl) + nr * gini(pos - left_pos, nr);
                let decrease = parent - child;

                if best.as_ref().map_or(true, |b| decrease > b.decrease) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: (values[i].0 + values[i + 1].0) / 2.0,
                        decrease,
                    });
                }
            }
        }

        best
    }
}

impl DecisionTree {
    fn predict_row(&self, row: &[f64]) -> f64 {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { positive } => return *positive,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

// ============================================================================
// FOREST
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    params: RandomForestParams,
    n_features: usize,
    trees: Vec<DecisionTree>,
    importances: Vec<f64>,
}

impl RandomForest {
    pub fn new(params: RandomForestParams) -> Self {
        Self {
            params,
            n_features: 0,
            trees: Vec::new(),
            importances: Vec::new(),
        }
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Normalized mean impurity decrease per input column
    pub fn feature_importances(&self) -> Vec<f64> {
        self.importances.clone()
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, x: ArrayView2<f64>, y: &[bool]) -> PipelineResult<()> {
        let (n, d) = x.dim();
        if n == 0 || d == 0 {
            return Err(PipelineError::EmptyMatrix);
        }
        if y.len() != n {
            return Err(PipelineError::LengthMismatch { rows: n, labels: y.len() });
        }

        let max_features = self
            .params
            .max_features
            .unwrap_or_else(|| (d as f64).sqrt() as usize)
            .clamp(1, d);
        let mut rng = StdRng::seed_from_u64(self.params.seed);

        let mut trees = Vec::with_capacity(self.params.n_trees);
        let mut importances = vec![0.0; d];

        for _ in 0..self.params.n_trees.max(1) {
            let rows: Vec<usize> = if self.params.bootstrap {
                (0..n).map(|_| rng.gen_range(0..n)).collect()
            } else {
                (0..n).collect()
            };

            let mut builder = TreeBuilder {
                x: &x,
                y,
                max_depth: self.params.max_depth,
                max_features,
                nodes: Vec::new(),
                importance: vec![0.0; d],
            };
            builder.grow(rows, 0, &mut rng);

            let tree_total: f64 = builder.importance.iter().sum();
            if tree_total > 0.0 {
                for (acc, v) in importances.iter_mut().zip(builder.importance.iter()) {
                    *acc += v / tree_total;
                }
            }
            trees.push(DecisionTree { nodes: builder.nodes });
        }

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }

        self.n_features = d;
        self.trees = trees;
        self.importances = importances;
        Ok(())
    }

    fn predict_proba(&self, x: ArrayView2<f64>) -> Vec<f64> {
        let n_trees = self.trees.len().max(1) as f64;
        x.rows()
            .into_iter()
            .map(|row| {
                let row = row.to_vec();
                self.trees.iter().map(|t| t.predict_row(&row)).sum::<f64>() / n_trees
            })
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

    fn separable(n: usize, d: usize, informative: usize) -> (Array2<f64>, Vec<bool>) {
        let mut rng = StdRng::seed_from_u64(5);
        let y: Vec<bool> = (0..n).map(|i| i % 3 == 0).collect();
        let x = Array2::from_shape_fn((n, d), |(r, c)| {
            if c == informative {
                if y[r] { 1.0 } else { 0.0 }
            } else {
                rng.gen_range(-1.0..1.0)
            }
        });
        (x, y)
    }

    #[test]
    fn test_fits_separable_data() {
        let (x, y) = separable(120, 6, 2);
        let mut forest = RandomForest::new(RandomForestParams::default());
        forest.fit(x.view(), &y).unwrap();

        assert_eq!(forest.predict(x.view()), y);
        let proba = forest.predict_proba(x.view());
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_importance_prefers_informative_feature() {
        let (x, y) = separable(150, 6, 4);
        let mut forest = RandomForest::new(RandomForestParams::default());
        forest.fit(x.view(), &y).unwrap();

        let imp = forest.feature_importances();
        assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        let top = imp
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(top, Some(4));
    }

    #[test]
    fn test_deterministic_with_seed() {
        let (x, y) = separable(60, 5, 0);
        let mut a = RandomForest::new(RandomForestParams::default());
        let mut b = RandomForest::new(RandomForestParams::default());
        a.fit(x.view(), &y).unwrap();
        b.fit(x.view(), &y).unwrap();
        assert_eq!(a.predict_proba(x.view()), b.predict_proba(x.view()));
    }

    #[test]
    fn test_rejects_label_mismatch() {
        let (x, _) = separable(10, 3, 0);
        let mut forest = RandomForest::new(RandomForestParams::default());
        let err = forest.fit(x.view(), &[true; 9]).unwrap_err();
        assert!(err.is_shape_error());
    }
}
