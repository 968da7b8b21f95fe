//! Single-layer GRU regressor with full backpropagation through time
//!
//! Gate layout follows the usual convention:
//!
//! ```text
//! r  = sigmoid(W_ir x + b_r + W_hr h)
//! z  = sigmoid(W_iz x + b_z + W_hz h)
//! n  = tanh(W_in x + b_in + r * (W_hn h + b_hn))
//! h' = (1 - z) * n + z * h
//! y  = w_out . h_T + b_out
//! ```
//!
//! Weights live in `ndarray` arrays: input matrices are `hidden x FEATURES`,
//! recurrent matrices `hidden x hidden`.

use ndarray::{aview1, Array, Array1, Array2, Axis, Dimension};
use rand::{rngs::SmallRng, Rng, SeedableRng};

use super::scaler::FEATURES;

const ADAM_BETA1: f64 = 0.9;
const ADAM_BETA2: f64 = 0.999;
const ADAM_EPSILON: f64 = 1e-8;

#[derive(Debug, Clone, PartialEq)]
struct GruParams {
    w_ir: Array2<f64>,
    w_iz: Array2<f64>,
    w_in: Array2<f64>,
    w_hr: Array2<f64>,
    w_hz: Array2<f64>,
    w_hn: Array2<f64>,
    b_r: Array1<f64>,
    b_z: Array1<f64>,
    b_in: Array1<f64>,
    b_hn: Array1<f64>,
    w_out: Array1<f64>,
    b_out: Array1<f64>,
}

impl GruParams {
    fn zeros(hidden: usize) -> Self {
        GruParams {
            w_ir: Array2::zeros((hidden, FEATURES)),
            w_iz: Array2::zeros((hidden, FEATURES)),
            w_in: Array2::zeros((hidden, FEATURES)),
            w_hr: Array2::zeros((hidden, hidden)),
            w_hz: Array2::zeros((hidden, hidden)),
            w_hn: Array2::zeros((hidden, hidden)),
            b_r: Array1::zeros(hidden),
            b_z: Array1::zeros(hidden),
            b_in: Array1::zeros(hidden),
            b_hn: Array1::zeros(hidden),
            w_out: Array1::zeros(hidden),
            b_out: Array1::zeros(1),
        }
    }

    /// Uniform(-1/sqrt(hidden), 1/sqrt(hidden)) initialisation
    fn random(hidden: usize, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let bound = 1.0 / (hidden.max(1) as f64).sqrt();
        let mut matrix = |rows: usize, cols: usize| {
            Array2::from_shape_fn((rows, cols), |_| rng.gen_range(-bound..bound))
        };
        let (w_ir, w_iz, w_in) = (
            matrix(hidden, FEATURES),
            matrix(hidden, FEATURES),
            matrix(hidden, FEATURES),
        );
        let (w_hr, w_hz, w_hn) = (matrix(hidden, hidden), matrix(hidden, hidden), matrix(hidden, hidden));
        let mut vector = |len: usize| Array1::from_shape_fn(len, |_| rng.gen_range(-bound..bound));
        GruParams {
            w_ir,
            w_iz,
            w_in,
            w_hr,
            w_hz,
            w_hn,
            b_r: vector(hidden),
            b_z: vector(hidden),
            b_in: vector(hidden),
            b_hn: vector(hidden),
            w_out: vector(hidden),
            b_out: vector(1),
        }
    }
}

/// Activations of one time step, kept for the backward pass
struct StepCache {
    x: Array1<f64>,
    h_prev: Array1<f64>,
    r: Array1<f64>,
    z: Array1<f64>,
    n: Array1<f64>,
    /// `W_hn h_prev + b_hn`, before the reset gate is applied
    hn: Array1<f64>,
    h: Array1<f64>,
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Column vector `a` times row vector `b`
fn outer(a: &Array1<f64>, b: &Array1<f64>) -> Array2<f64> {
    a.view()
        .insert_axis(Axis(1))
        .dot(&b.view().insert_axis(Axis(0)))
}

fn adam_update<D: Dimension>(
    param: &mut Array<f64, D>,
    m: &mut Array<f64, D>,
    v: &mut Array<f64, D>,
    grad: &Array<f64, D>,
    learning_rate: f64,
    bias1: f64,
    bias2: f64,
) {
    *m = &*m * ADAM_BETA1 + grad * (1.0 - ADAM_BETA1);
    *v = &*v * ADAM_BETA2 + grad.mapv(|g| g * g) * (1.0 - ADAM_BETA2);
    let denom = v.mapv(|v| (v / bias2).sqrt() + ADAM_EPSILON);
    *param -= &((&*m / bias1) / &denom * learning_rate);
}

/// Recurrent regressor mapping a sequence of scaled rows to the next scaled load
#[derive(Debug, Clone, PartialEq)]
pub struct GruRegressor {
    params: GruParams,
    adam_m: GruParams,
    adam_v: GruParams,
    adam_step: i32,
}

impl GruRegressor {
    pub fn new(hidden_size: usize, seed: u64) -> Self {
        GruRegressor {
            params: GruParams::random(hidden_size, seed),
            adam_m: GruParams::zeros(hidden_size),
            adam_v: GruParams::zeros(hidden_size),
            adam_step: 0,
        }
    }

    pub fn hidden_size(&self) -> usize {
        self.params.b_r.len()
    }

    fn step(&self, x: Array1<f64>, h_prev: &Array1<f64>) -> StepCache {
        let p = &self.params;
        let r = (p.w_ir.dot(&x) + &p.b_r + p.w_hr.dot(h_prev)).mapv(sigmoid);
        let z = (p.w_iz.dot(&x) + &p.b_z + p.w_hz.dot(h_prev)).mapv(sigmoid);
        let hn = p.w_hn.dot(h_prev) + &p.b_hn;
        let n = (p.w_in.dot(&x) + &p.b_in + &r * &hn).mapv(f64::tanh);
        let h = (1.0 - &z) * &n + &z * h_prev;

        StepCache {
            x,
            h_prev: h_prev.clone(),
            r,
            z,
            n,
            hn,
            h,
        }
    }

    fn forward(&self, sequence: &[[f64; FEATURES]]) -> (f64, Vec<StepCache>) {
        let mut h = Array1::zeros(self.hidden_size());
        let mut caches = Vec::with_capacity(sequence.len());
        for row in sequence {
            let cache = self.step(aview1(&row[..]).to_owned(), &h);
            h.assign(&cache.h);
            caches.push(cache);
        }
        let y = h.dot(&self.params.w_out) + self.params.b_out[0];
        (y, caches)
    }

    /// Predict the next scaled load for one window
    pub fn predict(&self, sequence: &[[f64; FEATURES]]) -> f64 {
        self.forward(sequence).0
    }

    /// Mean squared error over a batch
    pub fn mse(&self, inputs: &[Vec<[f64; FEATURES]>], targets: &[f64]) -> f64 {
        if inputs.is_empty() {
            return 0.0;
        }
        let total: f64 = inputs
            .iter()
            .zip(targets)
            .map(|(x, t)| (self.predict(x) - t).powi(2))
            .sum();
        total / inputs.len() as f64
    }

    /// Loss and gradient of the batch MSE with respect to every parameter
    fn gradients(&self, inputs: &[Vec<[f64; FEATURES]>], targets: &[f64]) -> (f64, GruParams) {
        let hidden = self.hidden_size();
        let p = &self.params;
        let mut grads = GruParams::zeros(hidden);
        let batch = inputs.len() as f64;
        let mut loss = 0.0;

        for (sequence, target) in inputs.iter().zip(targets) {
            let (y, caches) = self.forward(sequence);
            let err = y - target;
            loss += err * err;
            let dy = 2.0 * err / batch;

            if let Some(last) = caches.last() {
                grads.w_out += &(&last.h * dy);
            }
            grads.b_out[0] += dy;

            let mut dh = &p.w_out * dy;

            for step in caches.iter().rev() {
                let dn = &dh * &(1.0 - &step.z);
                let dz = &dh * &(&step.h_prev - &step.n);

                let da_n = dn * &step.n.mapv(|n| 1.0 - n * n);
                let dhn = &da_n * &step.r;
                let dr = &da_n * &step.hn;
                let da_z = dz * &step.z.mapv(|z| z * (1.0 - z));
                let da_r = dr * &step.r.mapv(|r| r * (1.0 - r));

                grads.w_in += &outer(&da_n, &step.x);
                grads.w_iz += &outer(&da_z, &step.x);
                grads.w_ir += &outer(&da_r, &step.x);
                grads.b_in += &da_n;
                grads.b_hn += &dhn;
                grads.b_z += &da_z;
                grads.b_r += &da_r;

                grads.w_hn += &outer(&dhn, &step.h_prev);
                grads.w_hz += &outer(&da_z, &step.h_prev);
                grads.w_hr += &outer(&da_r, &step.h_prev);

                dh = &dh * &step.z
                    + p.w_hn.t().dot(&dhn)
                    + p.w_hz.t().dot(&da_z)
                    + p.w_hr.t().dot(&da_r);
            }
        }

        (loss / batch, grads)
    }

    /// One full-batch Adam update; returns the loss before the update
    pub fn train_epoch(
        &mut self,
        inputs: &[Vec<[f64; FEATURES]>],
        targets: &[f64],
        learning_rate: f64,
    ) -> f64 {
        if inputs.is_empty() {
            return 0.0;
        }

        let (loss, g) = self.gradients(inputs, targets);

        self.adam_step += 1;
        let bias1 = 1.0 - ADAM_BETA1.powi(self.adam_step);
        let bias2 = 1.0 - ADAM_BETA2.powi(self.adam_step);

        let (p, m, v) = (&mut self.params, &mut self.adam_m, &mut self.adam_v);
        macro_rules! update {
            ($($field:ident),+) => {
                $(adam_update(&mut p.$field, &mut m.$field, &mut v.$field, &g.$field, learning_rate, bias1, bias2);)+
            };
        }
        update!(w_ir, w_iz, w_in, w_hr, w_hz, w_hn, b_r, b_z, b_in, b_hn, w_out, b_out);

        loss
    }
}
