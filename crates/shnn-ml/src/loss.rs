// ─────────────────────────────────────────────────────────────────────
// Symplectic HNN — Scheme Loss
// © 2021–2026 Symplectic HNN contributors.
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Training loss that asks one scheme step to reproduce each data pair.
//!
//! For a pair `(x0, x1)` observed `dt` apart the residual is
//! `R = Jᵀ∇H_θ(a(x0, x1)) − (x1 − x0) / dt`, with `a` the scheme's
//! evaluation point. The loss is the mean of `R²` over all entries.

use crate::hnn::Hnn;
use crate::mlp::MlpWeights;
use ndarray::{Array1, Array2, Axis};
use shnn_core::scheme::Scheme;
use shnn_core::vector_field::VectorFieldModel;
use shnn_data::loader::PairBatch;
use shnn_types::error::{ensure_dim, ShnnError, ShnnResult};

#[derive(Debug, Clone)]
pub struct LossEvaluation {
    pub loss: f64,
    /// Mean squared residual per pair.
    pub distances: Array1<f64>,
}

impl LossEvaluation {
    /// Mean and standard error of the per-pair distances.
    pub fn mean_and_stderr(&self) -> (f64, f64) {
        let n = self.distances.len() as f64;
        let mean = self.distances.mean().unwrap_or(f64::NAN);
        if self.distances.len() < 2 {
            return (mean, 0.0);
        }
        let std = self.distances.std(0.0);
        (mean, std / n.sqrt())
    }
}

fn residuals(hnn: &Hnn, scheme: &Scheme, pairs: &PairBatch) -> ShnnResult<(Array2<f64>, Array2<f64>)> {
    if pairs.is_empty() {
        return Err(ShnnError::ConfigError("loss needs at least one pair".to_string()));
    }
    ensure_dim("loss pair dimension", hnn.dim(), pairs.dim())?;
    ensure_dim("loss dt length", pairs.len(), pairs.dt.len())?;
    let arg = scheme.argument_rows(&pairs.x0, &pairs.x1)?;
    let field = hnn.time_derivative_rows(&arg)?;
    Ok((field - &pairs.velocities(), arg))
}

fn evaluation(residual: &Array2<f64>) -> LossEvaluation {
    let squared = residual.mapv(|r| r * r);
    let distances = squared.mean_axis(Axis(1)).unwrap_or_else(|| Array1::zeros(0));
    let loss = squared.mean().unwrap_or(f64::NAN);
    LossEvaluation { loss, distances }
}

/// Loss and per-pair distances, no gradients.
pub fn scheme_loss(hnn: &Hnn, scheme: &Scheme, pairs: &PairBatch) -> ShnnResult<LossEvaluation> {
    let (residual, _) = residuals(hnn, scheme, pairs)?;
    Ok(evaluation(&residual))
}

/// Loss with its gradient w.r.t. every network parameter.
pub fn scheme_loss_and_gradient(
    hnn: &Hnn,
    scheme: &Scheme,
    pairs: &PairBatch,
) -> ShnnResult<(LossEvaluation, MlpWeights)> {
    let (residual, arg) = residuals(hnn, scheme, pairs)?;
    let eval = evaluation(&residual);

    // ∂loss/∂F = 2R / (n·d); F = G J row-wise, so ∂loss/∂G = (∂loss/∂F) Jᵀ.
    let scale = 2.0 / residual.len() as f64;
    let d_field = residual * scale;
    let d_grad = d_field.dot(&hnn.symplectic_form().matrix().t());
    let (_, grads) = hnn.mlp().backprop_input_gradient(&arg, &d_grad)?;
    Ok((eval, grads))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shnn_types::config::{Problem, RunConfig, SchemeKind};

    fn setup(kind: SchemeKind) -> (Hnn, Scheme, PairBatch) {
        let mut cfg = RunConfig::new(Problem::Spring, kind, 0.1);
        cfg.hidden_dim = 8;
        let hnn = Hnn::new(&cfg, &mut StdRng::seed_from_u64(3)).unwrap();
        let scheme = Scheme::new(kind, 0.1, 2).unwrap();
        let pairs = PairBatch {
            x0: array![[1.0, 0.0], [0.0, 0.5], [-0.4, 0.3]],
            x1: array![[0.995, 0.0998], [-0.05, 0.4975], [-0.43, 0.26]],
            dt: array![0.1, 0.1, 0.1],
        };
        (hnn, scheme, pairs)
    }

    #[test]
    fn test_loss_is_mean_of_distances() {
        let (hnn, scheme, pairs) = setup(SchemeKind::Midpoint);
        let eval = scheme_loss(&hnn, &scheme, &pairs).unwrap();
        assert_eq!(eval.distances.len(), 3);
        let mean = eval.distances.mean().unwrap();
        assert!((eval.loss - mean).abs() < 1e-14);
        assert!(eval.distances.iter().all(|&d| d >= 0.0));
    }

    #[test]
    fn test_loss_gradient_matches_finite_differences() {
        for kind in SchemeKind::ALL {
            let (hnn, scheme, pairs) = setup(kind);
            let (eval, grads) = scheme_loss_and_gradient(&hnn, &scheme, &pairs).unwrap();
            let flat = hnn.mlp().weights().to_flat();
            let analytic = grads.to_flat();
            let eps = 1e-6;
            // every fifth parameter keeps the test quick
            for idx in (0..flat.len()).step_by(5) {
                let perturbed = |delta: f64| {
                    let mut model = hnn.clone();
                    let mut p = flat.clone();
                    p[idx] += delta;
                    model.mlp_mut().weights_mut().assign_flat(p.view()).unwrap();
                    scheme_loss(&model, &scheme, &pairs).unwrap().loss
                };
                let fd = (perturbed(eps) - perturbed(-eps)) / (2.0 * eps);
                assert!(
                    (analytic[idx] - fd).abs() < 1e-6 * (1.0 + eval.loss),
                    "{kind}: parameter {idx}: analytic {} vs fd {fd}",
                    analytic[idx]
                );
            }
        }
    }

    #[test]
    fn test_midpoint_residual_of_exact_flow_is_second_order() {
        // Noise-free spring pairs are reproduced by the midpoint rule up to O(h²).
        let (_, scheme, _) = setup(SchemeKind::Midpoint);
        let h: f64 = 0.1;
        let x0 = array![[1.0, 0.0], [0.0, 1.0]];
        let mut x1 = Array2::zeros((2, 2));
        for i in 0..2 {
            let (p, q) = (x0[[i, 0]], x0[[i, 1]]);
            x1[[i, 0]] = p * h.cos() - q * h.sin();
            x1[[i, 1]] = q * h.cos() + p * h.sin();
        }
        let pairs = PairBatch { x0, x1, dt: array![h, h] };
        let arg = scheme.argument_rows(&pairs.x0, &pairs.x1).unwrap();
        // spring field at the midpoint: (-q, p)
        let field = array![[-arg[[0, 1]], arg[[0, 0]]], [-arg[[1, 1]], arg[[1, 0]]]];
        let r = &field - &pairs.velocities();
        assert!(r.iter().all(|v| v.abs() < h * h));
    }

    #[test]
    fn test_mean_and_stderr() {
        let eval = LossEvaluation {
            loss: 2.0,
            distances: array![1.0, 2.0, 3.0],
        };
        let (mean, se) = eval.mean_and_stderr();
        assert!((mean - 2.0).abs() < 1e-15);
        assert!((se - (2.0_f64 / 3.0).sqrt() / 3.0_f64.sqrt()).abs() < 1e-15);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let (hnn, scheme, _) = setup(SchemeKind::Midpoint);
        let pairs = PairBatch {
            x0: Array2::zeros((2, 4)),
            x1: Array2::zeros((2, 4)),
            dt: array![0.1, 0.1],
        };
        assert!(matches!(
            scheme_loss(&hnn, &scheme, &pairs),
            Err(ShnnError::Shape { .. })
        ));
    }
}
