// ─────────────────────────────────────────────────────────────────────
// Symplectic HNN — Vector Field Models
// © 2021–2026 Symplectic HNN contributors.
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Hamiltonian vector-field capability and analytic linear systems.
//!
//! A [`VectorFieldModel`] maps a `(p, q)` state to its Hamiltonian and to
//! the vector field `Jᵀ∇H`. Integrators only borrow models, so any
//! implementor (analytic, dataset problem, neural network) can be shared
//! between threads and integrated concurrently.

use ndarray::{Array1, Array2, ArrayView1};
use shnn_math::diff::{hessian_vector_product, DEFAULT_STEP};
use shnn_math::symplectic::SymplecticForm;
use shnn_types::error::{ensure_dim, ShnnError, ShnnResult};

/// Hamiltonian system contract on the full `(p, q)` state.
pub trait VectorFieldModel: Send + Sync {
    /// Phase-space dimension (even).
    fn dim(&self) -> usize;

    /// The symplectic form matching [`dim`](Self::dim).
    fn symplectic_form(&self) -> &SymplecticForm;

    /// Hamiltonian `H(state)`.
    fn hamiltonian(&self, state: ArrayView1<'_, f64>) -> ShnnResult<f64>;

    /// Gradient `∇H(state)`, ordered like the state.
    fn gradient(&self, state: ArrayView1<'_, f64>) -> ShnnResult<Array1<f64>>;

    /// Vector field `Jᵀ∇H(state)`.
    fn time_derivative(&self, state: ArrayView1<'_, f64>) -> ShnnResult<Array1<f64>> {
        ensure_dim("model state", self.dim(), state.len())?;
        let grad = self.gradient(state)?;
        self.symplectic_form().vector_field(grad.view())
    }

    /// `(H, Jᵀ∇H)` at one state.
    fn evaluate(&self, state: ArrayView1<'_, f64>) -> ShnnResult<(f64, Array1<f64>)> {
        Ok((self.hamiltonian(state)?, self.time_derivative(state)?))
    }

    /// Row-wise vector field for a batch `[n, dim]`.
    fn time_derivative_rows(&self, states: &Array2<f64>) -> ShnnResult<Array2<f64>> {
        ensure_dim("model state batch", self.dim(), states.ncols())?;
        let mut out = Array2::zeros(states.raw_dim());
        for (i, row) in states.outer_iter().enumerate() {
            out.row_mut(i).assign(&self.time_derivative(row)?);
        }
        Ok(out)
    }

    /// Hessian-vector product `∇²H(state) · v`. Central differences of
    /// [`gradient`](Self::gradient) unless overridden.
    fn hessian_vector(
        &self,
        state: ArrayView1<'_, f64>,
        v: ArrayView1<'_, f64>,
    ) -> ShnnResult<Array1<f64>> {
        ensure_dim("model state", self.dim(), state.len())?;
        hessian_vector_product(
            |x| self.gradient(x.view()),
            &state.to_owned(),
            &v.to_owned(),
            DEFAULT_STEP,
        )
    }
}

/// Quadratic Hamiltonian `H = ½ yᵀ S y` with symmetric `S`.
///
/// Exact gradient and Hessian, which makes it the reference system for
/// order and energy checks.
#[derive(Debug, Clone)]
pub struct LinearHamiltonian {
    form: SymplecticForm,
    stiffness: Array2<f64>,
}

impl LinearHamiltonian {
    pub fn new(stiffness: Array2<f64>) -> ShnnResult<Self> {
        let dim = stiffness.nrows();
        ensure_dim("stiffness matrix columns", dim, stiffness.ncols())?;
        let form = SymplecticForm::new(dim)?;
        let asym = stiffness
            .iter()
            .zip(stiffness.t().iter())
            .fold(0.0_f64, |m, (a, b)| m.max((a - b).abs()));
        if asym > 1e-12 {
            return Err(ShnnError::ConfigError(format!(
                "stiffness matrix must be symmetric (max asymmetry {asym:.3e})"
            )));
        }
        Ok(LinearHamiltonian { form, stiffness })
    }

    /// `dof` uncoupled oscillators, `H = Σ ½(pᵢ² + ω² qᵢ²)`.
    pub fn harmonic_oscillator(dof: usize, omega: f64) -> ShnnResult<Self> {
        if !omega.is_finite() || omega <= 0.0 {
            return Err(ShnnError::ConfigError(format!(
                "oscillator frequency must be finite and > 0, got {omega}"
            )));
        }
        let mut stiffness = Array2::zeros((2 * dof, 2 * dof));
        for i in 0..dof {
            stiffness[[i, i]] = 1.0;
            stiffness[[dof + i, dof + i]] = omega * omega;
        }
        Self::new(stiffness)
    }

    pub fn stiffness(&self) -> &Array2<f64> {
        &self.stiffness
    }
}

impl VectorFieldModel for LinearHamiltonian {
    fn dim(&self) -> usize {
        self.form.dim()
    }

    fn symplectic_form(&self) -> &SymplecticForm {
        &self.form
    }

    fn hamiltonian(&self, state: ArrayView1<'_, f64>) -> ShnnResult<f64> {
        ensure_dim("model state", self.dim(), state.len())?;
        Ok(0.5 * state.dot(&self.stiffness.dot(&state)))
    }

    fn gradient(&self, state: ArrayView1<'_, f64>) -> ShnnResult<Array1<f64>> {
        ensure_dim("model state", self.dim(), state.len())?;
        Ok(self.stiffness.dot(&state))
    }

    fn hessian_vector(
        &self,
        state: ArrayView1<'_, f64>,
        v: ArrayView1<'_, f64>,
    ) -> ShnnResult<Array1<f64>> {
        ensure_dim("model state", self.dim(), state.len())?;
        ensure_dim("hessian-vector direction", self.dim(), v.len())?;
        Ok(self.stiffness.dot(&v))
    }
}
