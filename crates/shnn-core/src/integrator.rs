// ─────────────────────────────────────────────────────────────────────
// Symplectic HNN — Custom Integrator
// © 2021–2026 Symplectic HNN contributors.
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Fixed-step integrator driven by a [`Scheme`].
//!
//! Each step solves the implicit update
//! `y_{n+1} = y_n + h · Jᵀ∇H(scheme.argument(y_n, y_{n+1}))`
//! by fixed-point iteration seeded with `y_n`. Forward Euler needs no solve
//! and is evaluated directly.

use crate::scheme::Scheme;
use crate::vector_field::VectorFieldModel;
use ndarray::{Array1, ArrayView1};
use shnn_math::fixed_point::FixedPointSolver;
use shnn_types::config::{ConvergencePolicy, SolverConfig};
use shnn_types::error::{ensure_dim, ShnnError, ShnnResult};
use shnn_types::state::Trajectory;

/// Upper bound on the samples preallocated before stepping.
const MAX_CAPACITY_HINT: usize = 1 << 20;

/// Outcome of a single integrator step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub state: Array1<f64>,
    /// Fixed-point sweeps (0 for explicit steps).
    pub iterations: usize,
    pub residual: f64,
    /// `false` only when a non-converged iterate was accepted by policy.
    pub converged: bool,
}

#[derive(Debug, Clone)]
pub struct CustomIntegrator {
    solver: FixedPointSolver,
}

impl CustomIntegrator {
    pub fn new(config: SolverConfig) -> ShnnResult<Self> {
        Ok(CustomIntegrator {
            solver: FixedPointSolver::new(config)?,
        })
    }

    pub fn solver_config(&self) -> &SolverConfig {
        self.solver.config()
    }

    /// Advance `y_n` by one step of size `h`.
    pub fn step<M>(
        &self,
        model: &M,
        scheme: &Scheme,
        y_n: ArrayView1<'_, f64>,
        h: f64,
    ) -> ShnnResult<StepOutcome>
    where
        M: VectorFieldModel + ?Sized,
    {
        let y_n = y_n.to_owned();

        if scheme.is_explicit() {
            let mut state = model.time_derivative(y_n.view())?;
            ensure_dim("explicit step", y_n.len(), state.len())?;
            state *= h;
            state += &y_n;
            return Ok(StepOutcome {
                state,
                iterations: 0,
                residual: 0.0,
                converged: true,
            });
        }

        let update = |y_var: &Array1<f64>| -> ShnnResult<Array1<f64>> {
            let arg = scheme.argument(y_n.view(), y_var.view())?;
            let mut next = model.time_derivative(arg.view())?;
            next *= h;
            next += &y_n;
            Ok(next)
        };

        match self.solver.solve(update, &y_n) {
            Ok(sol) => Ok(StepOutcome {
                state: sol.value,
                iterations: sol.iterations,
                residual: sol.residual,
                converged: true,
            }),
            Err(ShnnError::NonConvergence {
                iterations,
                residual,
                last_iterate,
            }) if self.solver.config().on_non_convergence == ConvergencePolicy::AcceptLastIterate => {
                Ok(StepOutcome {
                    state: last_iterate,
                    iterations,
                    residual,
                    converged: false,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Integrate from `y0` over `t_span` with fixed step `h`.
    ///
    /// Records `(t0, y0)` then steps while `t <= t1`, so the last recorded
    /// time overshoots `t1` by less than `h`.
    pub fn integrate<M>(
        &self,
        model: &M,
        scheme: &Scheme,
        t_span: (f64, f64),
        y0: ArrayView1<'_, f64>,
        h: f64,
    ) -> ShnnResult<Trajectory>
    where
        M: VectorFieldModel + ?Sized,
    {
        let (t0, t1) = t_span;
        if !h.is_finite() || h <= 0.0 {
            return Err(ShnnError::ConfigError(format!(
                "integration step h must be finite and > 0, got {h}"
            )));
        }
        if !t0.is_finite() || !t1.is_finite() {
            return Err(ShnnError::ConfigError(format!(
                "time span must be finite, got ({t0}, {t1})"
            )));
        }
        ensure_dim("initial state", model.dim(), y0.len())?;
        ensure_dim("scheme dimension", model.dim(), scheme.dim())?;

        let capacity = capacity_hint(t_span, h);
        let mut times = Vec::with_capacity(capacity);
        let mut states = Vec::with_capacity(capacity);

        let mut t = t0;
        let mut y = y0.to_owned();
        times.push(t);
        states.push(y.clone());

        let mut total_iterations = 0usize;
        let mut accepted_unconverged = 0usize;

        while t <= t1 {
            let outcome = self.step(model, scheme, y.view(), h)?;
            if !outcome.converged {
                accepted_unconverged += 1;
                tracing::warn!(
                    t,
                    iterations = outcome.iterations,
                    residual = outcome.residual,
                    "accepting non-converged fixed-point iterate"
                );
            }
            total_iterations += outcome.iterations;
            y = outcome.state;

            let t_next = t + h;
            if t_next <= t {
                return Err(ShnnError::ConfigError(format!(
                    "step h = {h} does not advance time at t = {t}"
                )));
            }
            t = t_next;
            times.push(t);
            states.push(y.clone());
        }

        tracing::debug!(
            scheme = %scheme.kind(),
            steps = times.len() - 1,
            total_iterations,
            accepted_unconverged,
            "custom integration finished"
        );
        Trajectory::new(times, states)
    }
}

/// Expected sample count, capped so long spans grow the buffers on demand.
fn capacity_hint((t0, t1): (f64, f64), h: f64) -> usize {
    if t1 >= t0 {
        (((t1 - t0) / h) as usize)
            .saturating_add(2)
            .min(MAX_CAPACITY_HINT)
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_field::LinearHamiltonian;
    use ndarray::array;
    use shnn_types::config::{FixedPointMethod, SchemeKind};

    fn oscillator() -> LinearHamiltonian {
        LinearHamiltonian::harmonic_oscillator(1, 1.0).unwrap()
    }

    fn integrator() -> CustomIntegrator {
        CustomIntegrator::new(SolverConfig::default()).unwrap()
    }

    #[test]
    fn test_loop_records_initial_state_and_overshoots_end() {
        let osc = oscillator();
        for kind in SchemeKind::ALL {
            let scheme = Scheme::new(kind, 0.3, 2).unwrap();
            let traj = integrator()
                .integrate(&osc, &scheme, (0.0, 1.0), array![1.0, 0.0].view(), 0.3)
                .unwrap();
            assert_eq!(traj.len(), 5, "{kind}");
            assert_eq!(traj.initial(), array![1.0, 0.0].view());
            let expected = [0.0, 0.3, 0.6, 0.9, 1.2];
            for (t, e) in traj.times().iter().zip(expected) {
                assert!((t - e).abs() < 1e-12);
            }
            let (t_last, _) = traj.last();
            assert!(t_last > 1.0 && t_last < 1.0 + 0.3);
        }
    }

    #[test]
    fn test_forward_euler_step_is_explicit() {
        let osc = oscillator();
        let scheme = Scheme::new(SchemeKind::EulerForward, 0.1, 2).unwrap();
        let out = integrator().step(&osc, &scheme, array![1.0, 2.0].view(), 0.1).unwrap();
        // (p, q) + h (-q, p)
        assert_eq!(out.iterations, 0);
        assert!((out.state[0] - 0.8).abs() < 1e-15);
        assert!((out.state[1] - 2.1).abs() < 1e-15);
    }

    #[test]
    fn test_midpoint_step_matches_cayley_map() {
        // Implicit midpoint on ẏ = A y is y' = (I - hA/2)⁻¹ (I + hA/2) y.
        // For the unit oscillator that is a rotation with
        // cos θ = (1 - h²/4) / (1 + h²/4), sin θ = h / (1 + h²/4).
        let osc = oscillator();
        let h = 0.2;
        let config = SolverConfig {
            tolerance: 1e-12,
            ..SolverConfig::default()
        };
        let integ = CustomIntegrator::new(config).unwrap();
        let scheme = Scheme::new(SchemeKind::Midpoint, h, 2).unwrap();
        let out = integ.step(&osc, &scheme, array![0.0, 1.0].view(), h).unwrap();
        let d = 1.0 + h * h / 4.0;
        let (c, s) = ((1.0 - h * h / 4.0) / d, h / d);
        // (p, q) = (0, 1) → (-s, c)
        assert!((out.state[0] + s).abs() < 1e-10);
        assert!((out.state[1] - c).abs() < 1e-10);
        assert!(out.converged);
    }

    #[test]
    fn test_energy_midpoint_bounded_forward_euler_drifts() {
        let osc = oscillator();
        let y0 = array![1.0, 0.0];
        let energy = |s: ndarray::ArrayView1<'_, f64>| 0.5 * s.dot(&s);

        let midpoint = Scheme::new(SchemeKind::Midpoint, 0.1, 2).unwrap();
        let traj = integrator().integrate(&osc, &midpoint, (0.0, 10.0), y0.view(), 0.1).unwrap();
        let drift_mid = traj.max_energy_drift(energy);
        assert!(drift_mid < 1e-2, "midpoint drift {drift_mid}");

        let forward = Scheme::new(SchemeKind::EulerForward, 0.1, 2).unwrap();
        let traj = integrator().integrate(&osc, &forward, (0.0, 10.0), y0.view(), 0.1).unwrap();
        let drift_fwd = traj.max_energy_drift(energy);
        assert!(drift_fwd > 0.5, "forward Euler drift {drift_fwd}");
    }

    #[test]
    fn test_midpoint_default_solver_over_steps_and_phases() {
        // Del2 on the midpoint map sees oscillating components; every phase
        // and step size must still converge with the default settings.
        let osc = oscillator();
        let energy = |s: ndarray::ArrayView1<'_, f64>| 0.5 * s.dot(&s);
        for k in 0..30 {
            let h = 0.01 + 0.01 * k as f64;
            let scheme = Scheme::new(SchemeKind::Midpoint, h, 2).unwrap();
            for j in 0..24 {
                let phase = j as f64 * std::f64::consts::TAU / 24.0;
                let y0 = array![1.3 * phase.cos(), 1.3 * phase.sin()];
                let traj = integrator()
                    .integrate(&osc, &scheme, (0.0, 10.0), y0.view(), h)
                    .unwrap_or_else(|e| panic!("h = {h}, phase = {phase}: {e}"));
                let drift = traj.max_energy_drift(energy);
                assert!(drift < 1e-3, "h = {h}, phase = {phase}: drift {drift}");
            }
        }
        // Unguarded Δ² extrapolation diverges from this state.
        let scheme = Scheme::new(SchemeKind::Midpoint, 0.11, 2).unwrap();
        let traj = integrator()
            .integrate(&osc, &scheme, (0.0, 10.0), array![1.2557, 0.3365].view(), 0.11)
            .unwrap();
        assert!(traj.state(traj.len() - 1).iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_capacity_hint_is_capped() {
        assert_eq!(capacity_hint((0.0, 1.0), 0.3), 5);
        assert_eq!(capacity_hint((1.0, 0.0), 0.1), 1);
        assert_eq!(capacity_hint((0.0, 1e12), 1e-9), MAX_CAPACITY_HINT);
        assert_eq!(capacity_hint((0.0, f64::MAX), f64::MIN_POSITIVE), MAX_CAPACITY_HINT);
    }

    fn global_error(kind: SchemeKind, h: f64) -> f64 {
        let osc = oscillator();
        let integ = CustomIntegrator::new(SolverConfig {
            tolerance: 1e-12,
            ..SolverConfig::default()
        })
        .unwrap();
        let scheme = Scheme::new(kind, h, 2).unwrap();
        let traj = integ.integrate(&osc, &scheme, (0.0, 1.1), array![0.0, 1.0].view(), h).unwrap();
        let (t, y) = traj.last();
        // exact: p = -sin t, q = cos t
        ((y[0] + t.sin()).powi(2) + (y[1] - t.cos()).powi(2)).sqrt()
    }

    #[test]
    fn test_convergence_order() {
        // h and h/2 both overshoot t = 1.1 to the same end time 1.2.
        let (h, h2) = (0.4, 0.2);
        let mid = global_error(SchemeKind::Midpoint, h) / global_error(SchemeKind::Midpoint, h2);
        let fwd = global_error(SchemeKind::EulerForward, h) / global_error(SchemeKind::EulerForward, h2);
        assert!(mid > 3.0 && mid < 5.0, "midpoint ratio {mid}");
        assert!(fwd > 1.6 && fwd < 2.6, "forward Euler ratio {fwd}");
        assert!(mid > fwd);
    }

    #[test]
    fn test_dimension_mismatch_is_shape_error() {
        let osc = oscillator();
        let scheme = Scheme::new(SchemeKind::Midpoint, 0.1, 2).unwrap();
        let r = integrator().integrate(&osc, &scheme, (0.0, 1.0), array![1.0, 0.0, 0.0].view(), 0.1);
        assert!(matches!(r, Err(ShnnError::Shape { expected: 2, found: 3, .. })));

        let wide = Scheme::new(SchemeKind::Midpoint, 0.1, 4).unwrap();
        let r = integrator().integrate(&osc, &wide, (0.0, 1.0), array![1.0, 0.0].view(), 0.1);
        assert!(matches!(r, Err(ShnnError::Shape { expected: 2, found: 4, .. })));
    }

    #[test]
    fn test_invalid_step_is_config_error() {
        let osc = oscillator();
        let scheme = Scheme::new(SchemeKind::Midpoint, 0.1, 2).unwrap();
        for h in [0.0, -0.1, f64::INFINITY] {
            let r = integrator().integrate(&osc, &scheme, (0.0, 1.0), array![1.0, 0.0].view(), h);
            assert!(matches!(r, Err(ShnnError::ConfigError(_))));
        }
    }

    fn stiff_setup() -> (LinearHamiltonian, Scheme) {
        // h·ω = 5: the midpoint fixed-point map is not a contraction.
        let stiff = LinearHamiltonian::harmonic_oscillator(1, 10.0).unwrap();
        (stiff, Scheme::new(SchemeKind::Midpoint, 0.5, 2).unwrap())
    }

    #[test]
    fn test_non_convergence_fails_by_default() {
        let (stiff, scheme) = stiff_setup();
        let integ = CustomIntegrator::new(SolverConfig {
            max_iterations: 20,
            method: FixedPointMethod::Iteration,
            ..SolverConfig::default()
        })
        .unwrap();
        let r = integ.integrate(&stiff, &scheme, (0.0, 1.0), array![1.0, 1.0].view(), 0.5);
        assert!(matches!(r, Err(ShnnError::NonConvergence { .. })));
    }

    #[test]
    fn test_accept_last_iterate_policy_continues() {
        let (stiff, scheme) = stiff_setup();
        let integ = CustomIntegrator::new(SolverConfig {
            max_iterations: 3,
            method: FixedPointMethod::Iteration,
            on_non_convergence: ConvergencePolicy::AcceptLastIterate,
            ..SolverConfig::default()
        })
        .unwrap();
        let out = integ.step(&stiff, &scheme, array![1.0, 1.0].view(), 0.5).unwrap();
        assert!(!out.converged);
        assert_eq!(out.iterations, 3);

        let traj = integ
            .integrate(&stiff, &scheme, (0.0, 1.0), array![1.0, 1.0].view(), 0.5)
            .unwrap();
        assert_eq!(traj.len(), 4);
    }

    #[test]
    fn test_shared_model_across_threads() {
        let osc = oscillator();
        let integ = integrator();
        let scheme = Scheme::new(SchemeKind::Midpoint, 0.1, 2).unwrap();
        let reference = integ.integrate(&osc, &scheme, (0.0, 2.0), array![1.0, 0.0].view(), 0.1).unwrap();

        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| integ.integrate(&osc, &scheme, (0.0, 2.0), array![1.0, 0.0].view(), 0.1)))
                .collect();
            for handle in handles {
                let traj = handle.join().unwrap().unwrap();
                assert_eq!(traj, reference);
            }
        });
    }
}
