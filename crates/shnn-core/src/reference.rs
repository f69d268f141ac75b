// ─────────────────────────────────────────────────────────────────────
// Symplectic HNN — Reference Integrator
// © 2021–2026 Symplectic HNN contributors.
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Adaptive RK45 trajectories of a [`VectorFieldModel`], used as the
//! non-symplectic reference next to the custom integrator.
//!
//! Stepping is delegated to `ivp::solve_ivp` with `Method::DOPRI5`. This
//! module adapts the model to the solver's slice interface and turns the
//! solution back into a [`Trajectory`].

use crate::vector_field::VectorFieldModel;
use ivp::prelude::{solve_ivp, Method, Options, IVP};
use ndarray::{Array1, Array2, ArrayView1};
use shnn_types::error::{ensure_dim, ShnnError, ShnnResult};
use shnn_types::state::Trajectory;
use std::sync::Mutex;

/// Tolerances for the adaptive solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rk45Config {
    /// Relative tolerance (default: 1e-3).
    pub rtol: f64,
    /// Absolute tolerance (default: 1e-6).
    pub atol: f64,
}

impl Default for Rk45Config {
    fn default() -> Self {
        Rk45Config {
            rtol: 1e-3,
            atol: 1e-6,
        }
    }
}

impl Rk45Config {
    pub fn with_rtol(rtol: f64) -> Self {
        Rk45Config {
            rtol,
            ..Rk45Config::default()
        }
    }

    fn validate(&self) -> ShnnResult<()> {
        if !(self.rtol.is_finite() && self.rtol > 0.0) || !(self.atol.is_finite() && self.atol > 0.0) {
            return Err(ShnnError::ConfigError(format!(
                "rk45 tolerances must be finite and > 0, got rtol = {}, atol = {}",
                self.rtol, self.atol
            )));
        }
        Ok(())
    }
}

/// The model seen through the solver's `dy/dt = f(t, y)` interface.
///
/// `ode` cannot fail, so the first model error is parked here and the
/// derivative is poisoned with NaN until the solver returns.
struct ModelOde<'a, M: ?Sized> {
    model: &'a M,
    failure: Mutex<Option<ShnnError>>,
}

impl<M> IVP for ModelOde<'_, M>
where
    M: VectorFieldModel + ?Sized,
{
    fn ode(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
        let derivative = self
            .model
            .time_derivative(ArrayView1::from(y))
            .and_then(|f| ensure_dim("rk45 derivative", dydt.len(), f.len()).map(|()| f));
        match derivative {
            Ok(f) => {
                for (d, v) in dydt.iter_mut().zip(f.iter()) {
                    *d = *v;
                }
            }
            Err(e) => {
                dydt.fill(f64::NAN);
                if let Ok(mut failure) = self.failure.lock() {
                    failure.get_or_insert(e);
                }
            }
        }
    }
}

/// Integrate `model`'s vector field with adaptive RK45.
///
/// `t_eval = None` returns every accepted step.
pub fn integrate_rk45<M>(
    model: &M,
    t_span: (f64, f64),
    y0: ArrayView1<'_, f64>,
    t_eval: Option<&[f64]>,
    rtol: f64,
) -> ShnnResult<Trajectory>
where
    M: VectorFieldModel + ?Sized,
{
    integrate_rk45_with(model, t_span, y0, t_eval, &Rk45Config::with_rtol(rtol))
}

/// [`integrate_rk45`] with explicit absolute tolerance.
pub fn integrate_rk45_with<M>(
    model: &M,
    t_span: (f64, f64),
    y0: ArrayView1<'_, f64>,
    t_eval: Option<&[f64]>,
    config: &Rk45Config,
) -> ShnnResult<Trajectory>
where
    M: VectorFieldModel + ?Sized,
{
    ensure_dim("initial state", model.dim(), y0.len())?;
    config.validate()?;
    let (t0, t1) = t_span;
    if !t0.is_finite() || !t1.is_finite() || t1 <= t0 {
        return Err(ShnnError::ConfigError(format!(
            "rk45 needs a finite forward time span, got ({t0}, {t1})"
        )));
    }
    if let Some(times) = t_eval {
        if times.is_empty() || times.iter().any(|&t| !(t0..=t1).contains(&t)) {
            return Err(ShnnError::ConfigError(format!(
                "rk45 output times must be non-empty and lie within ({t0}, {t1})"
            )));
        }
    }

    let ode = ModelOde {
        model,
        failure: Mutex::new(None),
    };
    let options = match t_eval {
        Some(times) => Options::builder()
            .method(Method::DOPRI5)
            .rtol(config.rtol)
            .atol(config.atol)
            .t_eval(times.to_vec())
            .build(),
        None => Options::builder()
            .method(Method::DOPRI5)
            .rtol(config.rtol)
            .atol(config.atol)
            .build(),
    };
    let y0 = y0.to_vec();
    let solved = solve_ivp(&ode, t0, t1, &y0, options);
    if let Some(e) = ode.failure.into_inner().ok().flatten() {
        return Err(e);
    }
    let sol = solved.map_err(|e| ShnnError::ExternalSolver(format!("rk45 failed: {e:?}")))?;

    let dim = y0.len();
    let mut states = Array2::zeros((sol.y.len(), dim));
    for (mut row, y) in states.outer_iter_mut().zip(sol.y.iter()) {
        ensure_dim("rk45 output state", dim, y.len())?;
        for (dst, &v) in row.iter_mut().zip(y.iter()) {
            *dst = v;
        }
    }
    if states.iter().any(|v| !v.is_finite()) {
        return Err(ShnnError::ExternalSolver(
            "rk45 produced a non-finite state".to_string(),
        ));
    }
    tracing::debug!(
        samples = sol.t.len(),
        nfev = sol.nfev,
        status = ?sol.status,
        rtol = config.rtol,
        "rk45 reference finished"
    );
    Trajectory::from_arrays(Array1::from_vec(sol.t), states)
}

/// `n` evenly spaced output times from `t0` to `t1` inclusive, with
/// `n = round((t1 - t0) / h) + 1`.
pub fn uniform_time_grid(t_span: (f64, f64), h: f64) -> ShnnResult<Vec<f64>> {
    let (t0, t1) = t_span;
    if !h.is_finite() || h <= 0.0 || !t0.is_finite() || !t1.is_finite() || t1 < t0 {
        return Err(ShnnError::ConfigError(format!(
            "cannot build time grid over ({t0}, {t1}) with h = {h}"
        )));
    }
    let intervals = ((t1 - t0) / h).round() as usize;
    if intervals == 0 {
        return Ok(vec![t0]);
    }
    let dt = (t1 - t0) / intervals as f64;
    let mut grid: Vec<f64> = (0..intervals).map(|i| t0 + i as f64 * dt).collect();
    grid.push(t1);
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_field::LinearHamiltonian;
    use ndarray::array;
    use shnn_math::symplectic::SymplecticForm;

    #[test]
    fn test_rk45_on_oscillator_tracks_exact_solution() {
        let osc = LinearHamiltonian::harmonic_oscillator(1, 1.0).unwrap();
        let t_eval = uniform_time_grid((0.0, 20.0), 0.1).unwrap();
        let traj = integrate_rk45(&osc, (0.0, 20.0), array![0.0, 1.0].view(), Some(&t_eval), 1e-9).unwrap();
        assert_eq!(traj.len(), t_eval.len());
        for (t, y) in traj.iter() {
            assert!((y[0] + t.sin()).abs() < 1e-4);
            assert!((y[1] - t.cos()).abs() < 1e-4);
        }
    }

    #[test]
    fn test_output_shape_matches_custom_integrator() {
        let osc = LinearHamiltonian::harmonic_oscillator(2, 1.0).unwrap();
        let traj = integrate_rk45(&osc, (0.0, 1.0), array![0.1, 0.2, 0.3, 0.4].view(), None, 1e-6).unwrap();
        assert_eq!(traj.dim(), 4);
        assert_eq!(traj.times()[0], 0.0);
        assert_eq!(traj.last().0, 1.0);
    }

    #[test]
    fn test_exponential_decay_with_tight_atol() {
        // H = p q gives dp/dt = -p, dq/dt = q.
        let decay = LinearHamiltonian::new(array![[0.0, 1.0], [1.0, 0.0]]).unwrap();
        let config = Rk45Config {
            rtol: 1e-8,
            atol: 1e-12,
        };
        let traj = integrate_rk45_with(&decay, (0.0, 2.0), array![1.0, 1.0].view(), Some(&[0.0, 1.0, 2.0]), &config)
            .unwrap();
        assert_eq!(traj.len(), 3);
        let (t_last, y_last) = traj.last();
        assert_eq!(t_last, 2.0);
        assert!((y_last[0] - (-2.0f64).exp()).abs() < 1e-7, "p = {}", y_last[0]);
        assert!((y_last[1] - 2.0f64.exp()).abs() < 1e-6, "q = {}", y_last[1]);
    }

    #[test]
    fn test_invalid_span_and_tolerances_rejected() {
        let osc = LinearHamiltonian::harmonic_oscillator(1, 1.0).unwrap();
        let y0 = array![1.0, 0.0];
        assert!(matches!(
            integrate_rk45(&osc, (1.0, 0.0), y0.view(), None, 1e-6),
            Err(ShnnError::ConfigError(_))
        ));
        assert!(matches!(
            integrate_rk45(&osc, (0.0, 1.0), y0.view(), Some(&[0.5, 2.0]), 1e-6),
            Err(ShnnError::ConfigError(_))
        ));
        assert!(matches!(
            integrate_rk45(&osc, (0.0, 1.0), y0.view(), None, 0.0),
            Err(ShnnError::ConfigError(_))
        ));
    }

    #[test]
    fn test_model_error_propagates() {
        struct Failing(SymplecticForm);
        impl VectorFieldModel for Failing {
            fn dim(&self) -> usize {
                2
            }
            fn symplectic_form(&self) -> &SymplecticForm {
                &self.0
            }
            fn hamiltonian(&self, _state: ArrayView1<'_, f64>) -> ShnnResult<f64> {
                Ok(0.0)
            }
            fn gradient(&self, _state: ArrayView1<'_, f64>) -> ShnnResult<Array1<f64>> {
                Err(ShnnError::ExternalSolver("network evaluation failed".to_string()))
            }
        }
        let failing = Failing(SymplecticForm::new(2).unwrap());
        let r = integrate_rk45(&failing, (0.0, 1.0), array![1.0, 0.0].view(), None, 1e-6);
        assert!(matches!(r, Err(ShnnError::ExternalSolver(msg)) if msg.contains("network")));
    }

    #[test]
    fn test_wrong_initial_state_is_shape_error() {
        let osc = LinearHamiltonian::harmonic_oscillator(1, 1.0).unwrap();
        let r = integrate_rk45(&osc, (0.0, 1.0), array![1.0].view(), None, 1e-6);
        assert!(matches!(r, Err(ShnnError::Shape { .. })));
    }

    #[test]
    fn test_uniform_grid_endpoints() {
        let grid = uniform_time_grid((0.0, 300.0), 0.1).unwrap();
        assert_eq!(grid.len(), 3001);
        assert_eq!(grid[0], 0.0);
        assert_eq!(*grid.last().unwrap(), 300.0);
        assert!(grid.windows(2).all(|w| w[1] > w[0]));
        assert!(uniform_time_grid((1.0, 0.0), 0.1).is_err());
    }
}
