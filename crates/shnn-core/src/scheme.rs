// ─────────────────────────────────────────────────────────────────────
// Symplectic HNN — Integration Schemes
// © 2021–2026 Symplectic HNN contributors.
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
//! One-step schemes shared by the training loss and the integrator.
//!
//! Every scheme advances `y_{n+1} = y_n + h · Jᵀ∇H(a(y_n, y_{n+1}))`; the
//! variants differ only in the evaluation point `a`:
//!
//! | kind         | `a(y_n, y_var)`                  |
//! |--------------|----------------------------------|
//! | `euler-forw` | `y_n`                            |
//! | `euler-symp` | `(p_var, q_n)`                   |
//! | `midpoint`   | `(y_n + y_var) / 2`              |
//!
//! The symplectic variants conserve a modified Hamiltonian; a network
//! trained through them learns that shadow quantity, and
//! [`Scheme::corrected`] maps it back to the physical energy.

use crate::vector_field::VectorFieldModel;
use ndarray::{s, Array1, Array2, ArrayView1};
use shnn_math::symplectic::{momenta, positions};
use shnn_types::config::SchemeKind;
use shnn_types::error::{ensure_dim, ShnnError, ShnnResult};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scheme {
    kind: SchemeKind,
    h: f64,
    dim: usize,
}

impl Scheme {
    pub fn new(kind: SchemeKind, h: f64, dim: usize) -> ShnnResult<Self> {
        if !h.is_finite() || h <= 0.0 {
            return Err(ShnnError::ConfigError(format!(
                "scheme step h must be finite and > 0, got {h}"
            )));
        }
        if dim == 0 || dim % 2 != 0 {
            let nearest_even = if dim == 0 { 2 } else { dim + 1 };
            return Err(ShnnError::shape("scheme dimension (must be even)", nearest_even, dim));
        }
        Ok(Scheme { kind, h, dim })
    }

    pub fn kind(&self) -> SchemeKind {
        self.kind
    }

    pub fn h(&self) -> f64 {
        self.h
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Whether the step needs no implicit solve.
    pub fn is_explicit(&self) -> bool {
        self.kind == SchemeKind::EulerForward
    }

    /// Evaluation point of the vector field for one step.
    pub fn argument(
        &self,
        y_n: ArrayView1<'_, f64>,
        y_var: ArrayView1<'_, f64>,
    ) -> ShnnResult<Array1<f64>> {
        ensure_dim("scheme argument y_n", self.dim, y_n.len())?;
        ensure_dim("scheme argument y_var", self.dim, y_var.len())?;
        Ok(match self.kind {
            SchemeKind::EulerForward => y_n.to_owned(),
            SchemeKind::EulerSymplectic => {
                let n = self.dim / 2;
                let mut arg = Array1::zeros(self.dim);
                arg.slice_mut(s![..n]).assign(&momenta(y_var));
                arg.slice_mut(s![n..]).assign(&positions(y_n));
                arg
            }
            SchemeKind::Midpoint => (&y_n + &y_var) * 0.5,
        })
    }

    /// Row-wise [`argument`](Self::argument) for batches `[n, dim]`.
    pub fn argument_rows(&self, y_n: &Array2<f64>, y_var: &Array2<f64>) -> ShnnResult<Array2<f64>> {
        ensure_dim("scheme batch y_n", self.dim, y_n.ncols())?;
        ensure_dim("scheme batch y_var", self.dim, y_var.ncols())?;
        ensure_dim("scheme batch rows", y_n.nrows(), y_var.nrows())?;
        Ok(match self.kind {
            SchemeKind::EulerForward => y_n.clone(),
            SchemeKind::EulerSymplectic => {
                let n = self.dim / 2;
                let mut arg = y_n.clone();
                arg.slice_mut(s![.., ..n]).assign(&y_var.slice(s![.., ..n]));
                arg
            }
            SchemeKind::Midpoint => (y_n + y_var) * 0.5,
        })
    }

    /// Map a learned (shadow) Hamiltonian value at `state` to the physical
    /// one, using `model`'s derivatives for the leading modified-equation
    /// term at step `h`.
    ///
    /// - `euler-forw`: unchanged
    /// - `euler-symp`: `H̃ + (h/2) ∇ₚH̃ · ∇_qH̃`
    /// - `midpoint`: `H̃ − (h²/24) fᵀ ∇²H̃ f`, `f = Jᵀ∇H̃`
    pub fn corrected<M>(&self, raw: f64, state: ArrayView1<'_, f64>, model: &M) -> ShnnResult<f64>
    where
        M: VectorFieldModel + ?Sized,
    {
        ensure_dim("corrected state", self.dim, state.len())?;
        ensure_dim("corrected model", self.dim, model.dim())?;
        let h = self.h;
        match self.kind {
            SchemeKind::EulerForward => Ok(raw),
            SchemeKind::EulerSymplectic => {
                let grad = model.gradient(state)?;
                let cross = momenta(grad.view()).dot(&positions(grad.view()));
                Ok(raw + 0.5 * h * cross)
            }
            SchemeKind::Midpoint => {
                let f = model.time_derivative(state)?;
                let hf = model.hessian_vector(state, f.view())?;
                Ok(raw - h * h / 24.0 * f.dot(&hf))
            }
        }
    }
}
