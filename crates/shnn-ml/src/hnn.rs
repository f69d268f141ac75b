// ─────────────────────────────────────────────────────────────────────
// Symplectic HNN — Hamiltonian Networks
// © 2021–2026 Symplectic HNN contributors.
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Hamiltonian neural network and its scheme-corrected view.

use crate::mlp::Mlp;
use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use shnn_core::scheme::Scheme;
use shnn_core::vector_field::VectorFieldModel;
use shnn_math::diff::{central_gradient, DEFAULT_STEP};
use shnn_math::symplectic::SymplecticForm;
use shnn_types::config::RunConfig;
use shnn_types::error::{ensure_dim, ShnnResult};

/// Learned Hamiltonian `H_θ`; vector field `Jᵀ∇H_θ`.
#[derive(Debug, Clone)]
pub struct Hnn {
    mlp: Mlp,
    form: SymplecticForm,
}

impl Hnn {
    /// Fresh network with the run's architecture.
    pub fn new(config: &RunConfig, rng: &mut StdRng) -> ShnnResult<Self> {
        let mlp = Mlp::new(
            config.dim,
            config.hidden_dim,
            config.hidden_layers,
            config.nonlinearity,
            rng,
        )?;
        Self::from_mlp(mlp)
    }

    pub fn from_mlp(mlp: Mlp) -> ShnnResult<Self> {
        let form = SymplecticForm::new(mlp.input_dim())?;
        Ok(Hnn { mlp, form })
    }

    pub fn mlp(&self) -> &Mlp {
        &self.mlp
    }

    pub fn mlp_mut(&mut self) -> &mut Mlp {
        &mut self.mlp
    }
}

impl VectorFieldModel for Hnn {
    fn dim(&self) -> usize {
        self.form.dim()
    }

    fn symplectic_form(&self) -> &SymplecticForm {
        &self.form
    }

    fn hamiltonian(&self, state: ArrayView1<'_, f64>) -> ShnnResult<f64> {
        self.mlp.forward(state)
    }

    fn gradient(&self, state: ArrayView1<'_, f64>) -> ShnnResult<Array1<f64>> {
        self.mlp.input_gradient(state)
    }

    fn time_derivative_rows(&self, states: &Array2<f64>) -> ShnnResult<Array2<f64>> {
        let grads = self.mlp.input_gradient_rows(states)?;
        self.form.vector_field_rows(&grads)
    }
}

/// An [`Hnn`] whose Hamiltonian is mapped through [`Scheme::corrected`].
///
/// The wrapped network learned the shadow Hamiltonian of its training
/// scheme; this view reports the physical one. Its gradient is taken by
/// central differences of the corrected value.
#[derive(Debug, Clone)]
pub struct CorrectedHnn {
    hnn: Hnn,
    scheme: Scheme,
}

impl CorrectedHnn {
    pub fn new(hnn: Hnn, scheme: Scheme) -> ShnnResult<Self> {
        ensure_dim("corrected scheme", hnn.dim(), scheme.dim())?;
        Ok(CorrectedHnn { hnn, scheme })
    }

    pub fn inner(&self) -> &Hnn {
        &self.hnn
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }
}

impl VectorFieldModel for CorrectedHnn {
    fn dim(&self) -> usize {
        self.hnn.dim()
    }

    fn symplectic_form(&self) -> &SymplecticForm {
        self.hnn.symplectic_form()
    }

    fn hamiltonian(&self, state: ArrayView1<'_, f64>) -> ShnnResult<f64> {
        let raw = self.hnn.hamiltonian(state)?;
        self.scheme.corrected(raw, state, &self.hnn)
    }

    fn gradient(&self, state: ArrayView1<'_, f64>) -> ShnnResult<Array1<f64>> {
        central_gradient(|y| self.hamiltonian(y.view()), &state.to_owned(), DEFAULT_STEP)
    }
}
