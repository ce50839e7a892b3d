//! Recurrent Sequence Classifier
//!
//! Single-layer Elman network over the trailing `sequence_length` feature
//! rows, with a sigmoid output. Trained with truncated BPTT and plain SGD
//! on binary cross-entropy.
//!
//! Row `i` is scored from rows `[i - L + 1, i]`; rows before the start of
//! the matrix are replaced by the first row.

use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::scaler::StandardScaler;
use super::Classifier;
use crate::logic::error::{PipelineError, PipelineResult};

const GRAD_CLIP: f64 = 5.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SequenceParams {
    pub sequence_length: usize,
    pub hidden_size: usize,
    pub learning_rate: f64,
    pub epochs: usize,
    pub seed: u64,
}

impl Default for SequenceParams {
    fn default() -> Self {
        Self {
            sequence_length: 10,
            hidden_size: 16,
            learning_rate: 0.01,
            epochs: 50,
            seed: crate::constants::DEFAULT_SEED,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceModel {
    params: SequenceParams,
    input_size: usize,
    scaler: StandardScaler,
    /// hidden x input, row-major
    w: Vec<f64>,
    /// hidden x hidden, row-major
    u: Vec<f64>,
    b: Vec<f64>,
    v: Vec<f64>,
    c: f64,
}

struct Gradients {
    w: Vec<f64>,
    u: Vec<f64>,
    b: Vec<f64>,
    v: Vec<f64>,
    c: f64,
}

impl Gradients {
    fn zeros(hidden: usize, input: usize) -> Self {
        Self {
            w: vec![0.0; hidden * input],
            u: vec![0.0; hidden * hidden],
            b: vec![0.0; hidden],
            v: vec![0.0; hidden],
            c: 0.0,
        }
    }

    fn clip(&mut self) {
        let norm = (self.w.iter().chain(&self.u).chain(&self.b).chain(&self.v))
            .map(|g| g * g)
            .sum::<f64>()
            + self.c * self.c;
        let norm = norm.sqrt();
        if norm > GRAD_CLIP {
            let k = GRAD_CLIP / norm;
            for g in self
                .w
                .iter_mut()
                .chain(self.u.iter_mut())
                .chain(self.b.iter_mut())
                .chain(self.v.iter_mut())
            {
                *g *= k;
            }
            self.c *= k;
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl SequenceModel {
    pub fn new(params: SequenceParams) -> Self {
        Self {
            params,
            input_size: 0,
            scaler: StandardScaler::new(),
            w: Vec::new(),
            u: Vec::new(),
            b: Vec::new(),
            v: Vec::new(),
            c: 0.0,
        }
    }

    pub fn params(&self) -> &SequenceParams {
        &self.params
    }

    pub fn is_fitted(&self) -> bool {
        self.input_size > 0
    }

    /// Fit with an explicit epoch count
    pub fn fit_epochs(&mut self, x: ArrayView2<f64>, y: &[bool], epochs: usize) -> PipelineResult<()> {
        let (n, d) = x.dim();
        if n == 0 || d == 0 {
            return Err(PipelineError::EmptyMatrix);
        }
        if y.len() != n {
            return Err(PipelineError::LengthMismatch { rows: n, labels: y.len() });
        }
        if self.params.sequence_length == 0 || self.params.hidden_size == 0 {
            return Err(PipelineError::InvalidParameter(
                "sequence length and hidden size must be positive".to_string(),
            ));
        }

        let h = self.params.hidden_size;
        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let bound = 1.0 / (h as f64).sqrt();
        let mut init = |len: usize| -> Vec<f64> { (0..len).map(|_| rng.gen_range(-bound..bound)).collect() };

        self.scaler.fit(x)?;
        self.input_size = d;
        self.w = init(h * d);
        self.u = init(h * h);
        self.v = init(h);
        self.b = vec![0.0; h];
        self.c = 0.0;

        let scaled = self.scaler.transform(x)?;
        let rows: Vec<Vec<f64>> = scaled.rows().into_iter().map(|r| r.to_vec()).collect();

        let mut order: Vec<usize> = (0..n).collect();
        let mut shuffle_rng = StdRng::seed_from_u64(self.params.seed.wrapping_add(1));
        let lr = self.params.learning_rate;

        for epoch in 0..epochs {
            order.shuffle(&mut shuffle_rng);
            let mut loss = 0.0;

            for &i in &order {
                let seq = self.sequence(&rows, i);
                let target = if y[i] { 1.0 } else { 0.0 };
                let (p, mut grads) = self.backward(&seq, target);
                loss -= target * p.max(1e-12).ln() + (1.0 - target) * (1.0 - p).max(1e-12).ln();

                grads.clip();
                self.apply(&grads, lr);
            }

            if epoch % 10 == 0 || epoch + 1 == epochs {
                log::debug!("Sequence model epoch {}/{}: loss={:.4}", epoch + 1, epochs, loss / n as f64);
            }
        }

        Ok(())
    }

    fn sequence<'a>(&self, rows: &'a [Vec<f64>], i: usize) -> Vec<&'a [f64]> {
        let len = self.params.sequence_length;
        (0..len)
            .map(|k| rows[i.saturating_sub(len - 1 - k)].as_slice())
            .collect()
    }

    fn step(&self, x: &[f64], prev: &[f64]) -> Vec<f64> {
        let (h, d) = (self.params.hidden_size, self.input_size);
        (0..h)
            .map(|i| {
                let mut a = self.b[i];
                for j in 0..d {
                    a += self.w[i * d + j] * x[j];
                }
                for k in 0..h {
                    a += self.u[i * h + k] * prev[k];
                }
                a.tanh()
            })
            .collect()
    }

    fn forward(&self, seq: &[&[f64]]) -> (Vec<Vec<f64>>, f64) {
        let h = self.params.hidden_size;
        let mut states = Vec::with_capacity(seq.len() + 1);
        states.push(vec![0.0; h]);
        for x in seq {
            let next = self.step(x, &states[states.len() - 1]);
            states.push(next);
        }
        let last = &states[states.len() - 1];
        let z = self.c + self.v.iter().zip(last).map(|(v, s)| v * s).sum::<f64>();
        (states, sigmoid(z))
    }

    fn backward(&self, seq: &[&[f64]], target: f64) -> (f64, Gradients) {
        let (h, d) = (self.params.hidden_size, self.input_size);
        let (states, p) = self.forward(seq);
        let mut g = Gradients::zeros(h, d);

        let dz = p - target;
        let last = &states[states.len() - 1];
        for i in 0..h {
            g.v[i] = dz * last[i];
        }
        g.c = dz;

        let mut dh: Vec<f64> = self.v.iter().map(|v| dz * v).collect();
        for t in (0..seq.len()).rev() {
            let ht = &states[t + 1];
            let prev = &states[t];
            let da: Vec<f64> = (0..h).map(|i| dh[i] * (1.0 - ht[i] * ht[i])).collect();

            for i in 0..h {
                for j in 0..d {
                    g.w[i * d + j] += da[i] * seq[t][j];
                }
                for k in 0..h {
                    g.u[i * h + k] += da[i] * prev[k];
                }
                g.b[i] += da[i];
            }

            dh = (0..h)
                .map(|k| (0..h).map(|i| self.u[i * h + k] * da[i]).sum())
                .collect();
        }

        (p, g)
    }

    fn apply(&mut self, g: &Gradients, lr: f64) {
        for (w, dw) in self.w.iter_mut().zip(&g.w) {
            *w -= lr * dw;
        }
        for (u, du) in self.u.iter_mut().zip(&g.u) {
            *u -= lr * du;
        }
        for (b, db) in self.b.iter_mut().zip(&g.b) {
            *b -= lr * db;
        }
        for (v, dv) in self.v.iter_mut().zip(&g.v) {
            *v -= lr * dv;
        }
        self.c -= lr * g.c;
    }
}

impl Classifier for SequenceModel {
    fn fit(&mut self, x: ArrayView2<f64>, y: &[bool]) -> PipelineResult<()> {
        self.fit_epochs(x, y, self.params.epochs)
    }

    fn predict_proba(&self, x: ArrayView2<f64>) -> Vec<f64> {
        if !self.is_fitted() || x.nrows() == 0 {
            return vec![0.0; x.nrows()];
        }
        let rows: Vec<Vec<f64>> = match self.scaler.transform(x) {
            Ok(scaled) => scaled.rows().into_iter().map(|r| r.to_vec()).collect(),
            Err(_) => return vec![0.0; x.nrows()],
        };
        (0..rows.len())
            .map(|i| self.forward(&self.sequence(&rows, i)).1)
            .collect()
    }

    fn n_features(&self) -> usize {
        self.input_size
    }
}
