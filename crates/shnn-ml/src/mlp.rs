// ─────────────────────────────────────────────────────────────────────
// Symplectic HNN — Scalar MLP
// © 2021–2026 Symplectic HNN contributors.
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Fully connected network `dim → hidden ×L → 1` with analytic input
//! gradient and second-order backpropagation.
//!
//! Row-major batches: `Z_k = A_k W_k + b_k`, `A_{k+1} = σ(Z_k)`,
//! `H = A_L w_out + b_out`. The input gradient runs the chain backwards,
//! `D_k = G_{k+1} ⊙ σ'(Z_k)`, `G_k = D_k W_kᵀ`, starting from
//! `G_L = w_out`. Losses on `G_0` are differentiated w.r.t. the weights by
//! reversing both chains.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use shnn_types::config::Nonlinearity;
use shnn_types::error::{ensure_dim, ShnnError, ShnnResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub w: Array2<f64>, // (in, out)
    pub b: Array1<f64>, // (out,)
}

/// All trainable parameters. Also used as the gradient container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlpWeights {
    pub hidden: Vec<DenseLayer>,
    pub w_out: Array1<f64>, // (hidden,)
    pub b_out: f64,
}

impl MlpWeights {
    /// Zero-filled container with the same shapes.
    pub fn zeros_like(&self) -> Self {
        MlpWeights {
            hidden: self
                .hidden
                .iter()
                .map(|l| DenseLayer {
                    w: Array2::zeros(l.w.raw_dim()),
                    b: Array1::zeros(l.b.raw_dim()),
                })
                .collect(),
            w_out: Array1::zeros(self.w_out.raw_dim()),
            b_out: 0.0,
        }
    }

    pub fn num_parameters(&self) -> usize {
        self.hidden.iter().map(|l| l.w.len() + l.b.len()).sum::<usize>() + self.w_out.len() + 1
    }

    /// Flatten in layer order: `W_0, b_0, …, w_out, b_out`.
    pub fn to_flat(&self) -> Array1<f64> {
        let mut flat = Vec::with_capacity(self.num_parameters());
        for layer in &self.hidden {
            flat.extend(layer.w.iter().copied());
            flat.extend(layer.b.iter().copied());
        }
        flat.extend(self.w_out.iter().copied());
        flat.push(self.b_out);
        Array1::from_vec(flat)
    }

    /// Overwrite from a vector laid out like [`to_flat`](Self::to_flat).
    pub fn assign_flat(&mut self, flat: ArrayView1<'_, f64>) -> ShnnResult<()> {
        ensure_dim("flat parameter vector", self.num_parameters(), flat.len())?;
        let mut values = flat.iter().copied();
        for layer in &mut self.hidden {
            layer.w.iter_mut().zip(values.by_ref()).for_each(|(w, v)| *w = v);
            layer.b.iter_mut().zip(values.by_ref()).for_each(|(b, v)| *b = v);
        }
        self.w_out.iter_mut().zip(values.by_ref()).for_each(|(w, v)| *w = v);
        if let Some(v) = values.next() {
            self.b_out = v;
        }
        Ok(())
    }
}

/// Forward activations kept for the input gradient and backprop.
struct ForwardCache {
    /// `A_0 = X, A_1, …, A_L`
    acts: Vec<Array2<f64>>,
    /// `Z_0, …, Z_{L-1}`
    zs: Vec<Array2<f64>>,
}

/// Input-gradient chain kept for second-order backprop.
struct GradientCache {
    /// `G_0, …, G_L`
    gs: Vec<Array2<f64>>,
    /// `D_0, …, D_{L-1}`
    ds: Vec<Array2<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mlp {
    weights: MlpWeights,
    nonlinearity: Nonlinearity,
}

impl Mlp {
    /// Xavier-uniform weights, zero biases.
    pub fn new(
        input_dim: usize,
        hidden_dim: usize,
        hidden_layers: usize,
        nonlinearity: Nonlinearity,
        rng: &mut StdRng,
    ) -> ShnnResult<Self> {
        if input_dim == 0 || hidden_dim == 0 || hidden_layers == 0 {
            return Err(ShnnError::ConfigError(format!(
                "MLP sizes must be > 0 (input={input_dim}, hidden={hidden_dim}, layers={hidden_layers})"
            )));
        }
        let mut hidden = Vec::with_capacity(hidden_layers);
        let mut fan_in = input_dim;
        for _ in 0..hidden_layers {
            let limit = (6.0 / (fan_in + hidden_dim) as f64).sqrt();
            hidden.push(DenseLayer {
                w: Array2::from_shape_fn((fan_in, hidden_dim), |_| rng.gen_range(-limit..limit)),
                b: Array1::zeros(hidden_dim),
            });
            fan_in = hidden_dim;
        }
        let limit = (6.0 / (hidden_dim + 1) as f64).sqrt();
        let w_out = Array1::from_shape_fn(hidden_dim, |_| rng.gen_range(-limit..limit));

        Ok(Mlp {
            weights: MlpWeights {
                hidden,
                w_out,
                b_out: 0.0,
            },
            nonlinearity,
        })
    }

    /// Rebuild from stored weights, checking that the layer shapes chain.
    pub fn from_weights(weights: MlpWeights, nonlinearity: Nonlinearity) -> ShnnResult<Self> {
        let Some(first) = weights.hidden.first() else {
            return Err(ShnnError::Persistence(
                "MLP weights contain no hidden layers".to_string(),
            ));
        };
        let mut width = first.w.nrows();
        for (k, layer) in weights.hidden.iter().enumerate() {
            if layer.w.nrows() != width || layer.b.len() != layer.w.ncols() {
                return Err(ShnnError::Persistence(format!(
                    "hidden layer {k}: w {:?} and b ({}) do not chain from width {width}",
                    layer.w.dim(),
                    layer.b.len()
                )));
            }
            width = layer.w.ncols();
        }
        if weights.w_out.len() != width {
            return Err(ShnnError::Persistence(format!(
                "output weights have length {}, expected {width}",
                weights.w_out.len()
            )));
        }
        Ok(Mlp {
            weights,
            nonlinearity,
        })
    }

    pub fn weights(&self) -> &MlpWeights {
        &self.weights
    }

    pub fn weights_mut(&mut self) -> &mut MlpWeights {
        &mut self.weights
    }

    pub fn nonlinearity(&self) -> Nonlinearity {
        self.nonlinearity
    }

    pub fn input_dim(&self) -> usize {
        self.weights.hidden[0].w.nrows()
    }

    pub fn hidden_dim(&self) -> usize {
        self.weights.w_out.len()
    }

    pub fn hidden_layers(&self) -> usize {
        self.weights.hidden.len()
    }

    fn forward_cache(&self, x: &Array2<f64>) -> ShnnResult<ForwardCache> {
        ensure_dim("MLP input", self.input_dim(), x.ncols())?;
        let mut acts = Vec::with_capacity(self.hidden_layers() + 1);
        let mut zs = Vec::with_capacity(self.hidden_layers());
        acts.push(x.to_owned());
        for layer in &self.weights.hidden {
            let z = acts[acts.len() - 1].dot(&layer.w) + &layer.b;
            acts.push(z.mapv(|v| activation(self.nonlinearity, v)));
            zs.push(z);
        }
        Ok(ForwardCache { acts, zs })
    }

    fn gradient_cache(&self, fwd: &ForwardCache) -> GradientCache {
        let n = fwd.acts[0].nrows();
        let layers = self.hidden_layers();
        let mut gs = vec![Array2::zeros((0, 0)); layers + 1];
        let mut ds = vec![Array2::zeros((0, 0)); layers];

        let mut g = Array2::zeros((n, self.hidden_dim()));
        g.assign(&self.weights.w_out);
        gs[layers] = g;
        for k in (0..layers).rev() {
            let d = &gs[k + 1] * &fwd.zs[k].mapv(|v| first_derivative(self.nonlinearity, v));
            gs[k] = d.dot(&self.weights.hidden[k].w.t());
            ds[k] = d;
        }
        GradientCache { gs, ds }
    }

    /// `H` for each row of `x`.
    pub fn forward_rows(&self, x: &Array2<f64>) -> ShnnResult<Array1<f64>> {
        let fwd = self.forward_cache(x)?;
        let last = &fwd.acts[fwd.acts.len() - 1];
        Ok(last.dot(&self.weights.w_out) + self.weights.b_out)
    }

    pub fn forward(&self, x: ArrayView1<'_, f64>) -> ShnnResult<f64> {
        let batch = x.to_owned().insert_axis(Axis(0));
        Ok(self.forward_rows(&batch)?[0])
    }

    /// `∂H/∂x` for each row of `x`.
    pub fn input_gradient_rows(&self, x: &Array2<f64>) -> ShnnResult<Array2<f64>> {
        let fwd = self.forward_cache(x)?;
        let mut grad = self.gradient_cache(&fwd);
        Ok(grad.gs.swap_remove(0))
    }

    pub fn input_gradient(&self, x: ArrayView1<'_, f64>) -> ShnnResult<Array1<f64>> {
        let batch = x.to_owned().insert_axis(Axis(0));
        Ok(self.input_gradient_rows(&batch)?.row(0).to_owned())
    }

    /// Input gradient together with the parameter gradient of
    /// `Σ upstream ⊙ G_0`, i.e. of any loss whose derivative w.r.t. the
    /// input gradient is `upstream`.
    pub fn backprop_input_gradient(
        &self,
        x: &Array2<f64>,
        upstream: &Array2<f64>,
    ) -> ShnnResult<(Array2<f64>, MlpWeights)> {
        ensure_dim("upstream rows", x.nrows(), upstream.nrows())?;
        ensure_dim("upstream columns", self.input_dim(), upstream.ncols())?;
        let fwd = self.forward_cache(x)?;
        let grad = self.gradient_cache(&fwd);
        let layers = self.hidden_layers();
        let sigma = self.nonlinearity;
        let mut out = self.weights.zeros_like();

        // Reverse the input-gradient chain, G_0 → G_L.
        let mut g_bar = upstream.to_owned();
        let mut z_bar_direct = Vec::with_capacity(layers);
        for k in 0..layers {
            let w = &self.weights.hidden[k].w;
            out.hidden[k].w += &g_bar.t().dot(&grad.ds[k]);
            let d_bar = g_bar.dot(w);
            let z = &fwd.zs[k];
            g_bar = &d_bar * &z.mapv(|v| first_derivative(sigma, v));
            z_bar_direct.push(&d_bar * &grad.gs[k + 1] * &z.mapv(|v| second_derivative(sigma, v)));
        }
        out.w_out += &g_bar.sum_axis(Axis(0));

        // Reverse the forward chain; A_L feeds only H, which the loss ignores.
        let mut a_bar: Option<Array2<f64>> = None;
        for k in (0..layers).rev() {
            let z = &fwd.zs[k];
            let mut z_bar = z_bar_direct[k].clone();
            if let Some(a) = &a_bar {
                z_bar += &(a * &z.mapv(|v| first_derivative(sigma, v)));
            }
            out.hidden[k].w += &fwd.acts[k].t().dot(&z_bar);
            out.hidden[k].b += &z_bar.sum_axis(Axis(0));
            a_bar = Some(z_bar.dot(&self.weights.hidden[k].w.t()));
        }

        let mut gs = grad.gs;
        Ok((gs.swap_remove(0), out))
    }
}

fn activation(kind: Nonlinearity, x: f64) -> f64 {
    match kind {
        Nonlinearity::Tanh => x.tanh(),
        Nonlinearity::Softplus => softplus(x),
    }
}

fn first_derivative(kind: Nonlinearity, x: f64) -> f64 {
    match kind {
        Nonlinearity::Tanh => {
            let t = x.tanh();
            1.0 - t * t
        }
        Nonlinearity::Softplus => sigmoid(x),
    }
}

fn second_derivative(kind: Nonlinearity, x: f64) -> f64 {
    match kind {
        Nonlinearity::Tanh => {
            let t = x.tanh();
            -2.0 * t * (1.0 - t * t)
        }
        Nonlinearity::Softplus => {
            let s = sigmoid(x);
            s * (1.0 - s)
        }
    }
}

fn softplus(x: f64) -> f64 {
    if x > 20.0 {
        x
    } else if x < -20.0 {
        x.exp()
    } else {
        x.exp().ln_1p()
    }
}

fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    fn small(nonlinearity: Nonlinearity) -> Mlp {
        let mut rng = StdRng::seed_from_u64(42);
        let mut mlp = Mlp::new(2, 5, 2, nonlinearity, &mut rng).unwrap();
        // non-zero biases exercise every term
        for layer in &mut mlp.weights_mut().hidden {
            layer.b.mapv_inplace(|_| rng.gen_range(-0.5..0.5));
        }
        mlp.weights_mut().b_out = 0.3;
        mlp
    }

    #[test]
    fn test_shapes_and_parameter_count() {
        let mut rng = StdRng::seed_from_u64(0);
        let mlp = Mlp::new(4, 200, 2, Nonlinearity::Tanh, &mut rng).unwrap();
        assert_eq!(mlp.input_dim(), 4);
        assert_eq!(mlp.hidden_dim(), 200);
        assert_eq!(mlp.weights().num_parameters(), 4 * 200 + 200 + 200 * 200 + 200 + 200 + 1);
        let h = mlp.forward_rows(&Array2::zeros((7, 4))).unwrap();
        assert_eq!(h.len(), 7);
    }

    #[test]
    fn test_same_seed_same_weights() {
        let a = Mlp::new(2, 8, 2, Nonlinearity::Tanh, &mut StdRng::seed_from_u64(5)).unwrap();
        let b = Mlp::new(2, 8, 2, Nonlinearity::Tanh, &mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_input_gradient_matches_finite_differences() {
        for nl in [Nonlinearity::Tanh, Nonlinearity::Softplus] {
            let mlp = small(nl);
            let x = array![0.4, -0.7];
            let g = mlp.input_gradient(x.view()).unwrap();
            let eps = 1e-6;
            for i in 0..2 {
                let mut xp = x.clone();
                xp[i] += eps;
                let mut xm = x.clone();
                xm[i] -= eps;
                let fd = (mlp.forward(xp.view()).unwrap() - mlp.forward(xm.view()).unwrap()) / (2.0 * eps);
                assert!((g[i] - fd).abs() < 1e-8, "{nl}: dH/dx{i} = {} vs {fd}", g[i]);
            }
        }
    }

    #[test]
    fn test_second_order_backprop_matches_finite_differences() {
        for nl in [Nonlinearity::Tanh, Nonlinearity::Softplus] {
            let mlp = small(nl);
            let x = array![[0.4, -0.7], [1.1, 0.2], [-0.3, 0.9]];
            let upstream = array![[0.5, -1.0], [0.25, 0.75], [-2.0, 0.1]];
            let (_, grads) = mlp.backprop_input_gradient(&x, &upstream).unwrap();

            let objective = |m: &Mlp| -> f64 { (&m.input_gradient_rows(&x).unwrap() * &upstream).sum() };
            let flat = mlp.weights().to_flat();
            let analytic = grads.to_flat();
            let eps = 1e-6;
            for idx in 0..flat.len() {
                let mut plus = mlp.clone();
                let mut p = flat.clone();
                p[idx] += eps;
                plus.weights_mut().assign_flat(p.view()).unwrap();
                let mut minus = mlp.clone();
                let mut m = flat.clone();
                m[idx] -= eps;
                minus.weights_mut().assign_flat(m.view()).unwrap();
                let fd = (objective(&plus) - objective(&minus)) / (2.0 * eps);
                assert!(
                    (analytic[idx] - fd).abs() < 1e-6,
                    "{nl}: parameter {idx}: analytic {} vs fd {fd}",
                    analytic[idx]
                );
            }
        }
    }

    #[test]
    fn test_flat_roundtrip() {
        let mlp = small(Nonlinearity::Tanh);
        let flat = mlp.weights().to_flat();
        let mut copy = mlp.weights().zeros_like();
        copy.assign_flat(flat.view()).unwrap();
        assert_eq!(&copy, mlp.weights());
        assert!(copy.assign_flat(Array1::zeros(3).view()).is_err());
    }

    #[test]
    fn test_from_weights_rejects_broken_chain() {
        let mut weights = small(Nonlinearity::Tanh).weights().clone();
        weights.w_out = Array1::zeros(3);
        assert!(matches!(
            Mlp::from_weights(weights, Nonlinearity::Tanh),
            Err(ShnnError::Persistence(_))
        ));
    }
}
