// ─────────────────────────────────────────────────────────────────────
// Symplectic HNN — Physical Systems
// © 2021–2026 Symplectic HNN contributors.
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Ground-truth Hamiltonians for the dataset problems.
//!
//! All states are `(p, q)` ordered. Masses, lengths and gravity are 1.

use ndarray::{Array1, ArrayView1};
use shnn_core::vector_field::VectorFieldModel;
use shnn_math::diff::{central_gradient, DEFAULT_STEP};
use shnn_math::symplectic::SymplecticForm;
use shnn_types::config::Problem;
use shnn_types::error::{ensure_dim, ShnnResult};

/// Mass-spring oscillator, `H = ½(p² + q²)`.
#[derive(Debug, Clone)]
pub struct Spring {
    form: SymplecticForm,
}

/// Simple pendulum, `H = ½p² + (1 − cos q)`.
#[derive(Debug, Clone)]
pub struct Pendulum {
    form: SymplecticForm,
}

/// Planar double pendulum with state `(p₁, p₂, θ₁, θ₂)`.
///
/// `H = (p₁² + 2p₂² − 2p₁p₂ cos Δ) / (2(1 + sin² Δ)) − 2 cos θ₁ − cos θ₂`,
/// `Δ = θ₁ − θ₂`. The gradient is taken by central differences.
#[derive(Debug, Clone)]
pub struct DoublePendulum {
    form: SymplecticForm,
}

impl Spring {
    pub fn new() -> ShnnResult<Self> {
        Ok(Spring {
            form: SymplecticForm::new(2)?,
        })
    }
}

impl Pendulum {
    pub fn new() -> ShnnResult<Self> {
        Ok(Pendulum {
            form: SymplecticForm::new(2)?,
        })
    }
}

impl DoublePendulum {
    pub fn new() -> ShnnResult<Self> {
        Ok(DoublePendulum {
            form: SymplecticForm::new(4)?,
        })
    }

    fn energy(y: ArrayView1<'_, f64>) -> f64 {
        let (p1, p2, t1, t2) = (y[0], y[1], y[2], y[3]);
        let delta = t1 - t2;
        let kinetic = (p1 * p1 + 2.0 * p2 * p2 - 2.0 * p1 * p2 * delta.cos())
            / (2.0 * (1.0 + delta.sin().powi(2)));
        kinetic - 2.0 * t1.cos() - t2.cos()
    }
}

impl VectorFieldModel for Spring {
    fn dim(&self) -> usize {
        2
    }

    fn symplectic_form(&self) -> &SymplecticForm {
        &self.form
    }

    fn hamiltonian(&self, state: ArrayView1<'_, f64>) -> ShnnResult<f64> {
        ensure_dim("spring state", 2, state.len())?;
        Ok(0.5 * (state[0] * state[0] + state[1] * state[1]))
    }

    fn gradient(&self, state: ArrayView1<'_, f64>) -> ShnnResult<Array1<f64>> {
        ensure_dim("spring state", 2, state.len())?;
        Ok(state.to_owned())
    }
}

impl VectorFieldModel for Pendulum {
    fn dim(&self) -> usize {
        2
    }

    fn symplectic_form(&self) -> &SymplecticForm {
        &self.form
    }

    fn hamiltonian(&self, state: ArrayView1<'_, f64>) -> ShnnResult<f64> {
        ensure_dim("pendulum state", 2, state.len())?;
        Ok(0.5 * state[0] * state[0] + (1.0 - state[1].cos()))
    }

    fn gradient(&self, state: ArrayView1<'_, f64>) -> ShnnResult<Array1<f64>> {
        ensure_dim("pendulum state", 2, state.len())?;
        Ok(Array1::from_vec(vec![state[0], state[1].sin()]))
    }
}

impl VectorFieldModel for DoublePendulum {
    fn dim(&self) -> usize {
        4
    }

    fn symplectic_form(&self) -> &SymplecticForm {
        &self.form
    }

    fn hamiltonian(&self, state: ArrayView1<'_, f64>) -> ShnnResult<f64> {
        ensure_dim("double pendulum state", 4, state.len())?;
        Ok(Self::energy(state))
    }

    fn gradient(&self, state: ArrayView1<'_, f64>) -> ShnnResult<Array1<f64>> {
        ensure_dim("double pendulum state", 4, state.len())?;
        central_gradient(|y| Ok(Self::energy(y.view())), &state.to_owned(), DEFAULT_STEP)
    }
}

/// Ground-truth system for `problem`.
pub fn system_for(problem: Problem) -> ShnnResult<Box<dyn VectorFieldModel>> {
    Ok(match problem {
        Problem::Spring => Box::new(Spring::new()?),
        Problem::Pendulum => Box::new(Pendulum::new()?),
        Problem::DoublePendulum => Box::new(DoublePendulum::new()?),
    })
}
