// ─────────────────────────────────────────────────────────────────────
// Symplectic HNN — Fixed-Point Solver
// © 2021–2026 Symplectic HNN contributors.
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Fixed-point solver for `y = g(y)`.
//!
//! Two update rules are available:
//!
//! - **del2** (default): Steffensen's method. Each sweep evaluates
//!   `p1 = g(p0)`, `p2 = g(p1)` and applies Aitken's Δ² extrapolation
//!   component-wise,
//!   `p = p0 - (p1 - p0)² / (p2 - 2 p1 + p0)`,
//!   falling back to `p2` wherever the denominator is negligible next to
//!   the iterates or the correction overshoots the last update `p2 - p0`.
//!   Oscillating components of a contraction otherwise extrapolate far
//!   outside the basin.
//! - **iteration**: plain successive substitution `p = g(p0)`.
//!
//! Convergence is declared when `‖p - p0‖∞ < tolerance`. Reaching the
//! iteration cap, or producing a non-finite iterate, is reported as
//! [`ShnnError::NonConvergence`] carrying the last finite iterate. Whether that
//! is fatal is the caller's decision.

use ndarray::{Array1, Zip};
use shnn_types::config::{FixedPointMethod, SolverConfig};
use shnn_types::error::{ensure_dim, ShnnError, ShnnResult};

/// Result of a converged fixed-point solve.
#[derive(Debug, Clone)]
pub struct FixedPointSolution {
    pub value: Array1<f64>,
    /// Number of sweeps (one `g` evaluation for `iteration`, two for `del2`).
    pub iterations: usize,
    /// Final max-norm step `‖p - p0‖∞`.
    pub residual: f64,
}

#[derive(Debug, Clone)]
pub struct FixedPointSolver {
    config: SolverConfig,
}

impl FixedPointSolver {
    pub fn new(config: SolverConfig) -> ShnnResult<Self> {
        config.validate()?;
        Ok(FixedPointSolver { config })
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solve `y = step_fn(y)` starting from `initial_guess`.
    ///
    /// Any fixed arguments of the update equation are captured by the
    /// closure. `step_fn` must return a vector of the same length as the guess.
    pub fn solve<F>(&self, mut step_fn: F, initial_guess: &Array1<f64>) -> ShnnResult<FixedPointSolution>
    where
        F: FnMut(&Array1<f64>) -> ShnnResult<Array1<f64>>,
    {
        let dim = initial_guess.len();
        let tol = self.config.tolerance;
        let max_iter = self.config.max_iterations;

        let mut p0 = initial_guess.clone();
        let mut residual = f64::INFINITY;

        for iteration in 1..=max_iter {
            let p1 = step_fn(&p0)?;
            ensure_dim("fixed-point update", dim, p1.len())?;

            let p = match self.config.method {
                FixedPointMethod::Iteration => p1,
                FixedPointMethod::Del2 => {
                    let p2 = step_fn(&p1)?;
                    ensure_dim("fixed-point update", dim, p2.len())?;
                    aitken_del2(&p0, &p1, &p2)
                }
            };

            residual = if p.iter().all(|v| v.is_finite()) {
                max_abs_diff(&p, &p0)
            } else {
                f64::INFINITY
            };
            if !residual.is_finite() {
                return Err(ShnnError::NonConvergence {
                    iterations: iteration,
                    residual,
                    last_iterate: p0,
                });
            }
            if residual < tol {
                tracing::trace!(iteration, residual, "fixed-point converged");
                return Ok(FixedPointSolution {
                    value: p,
                    iterations: iteration,
                    residual,
                });
            }
            p0 = p;
        }

        Err(ShnnError::NonConvergence {
            iterations: max_iter,
            residual,
            last_iterate: p0,
        })
    }
}

/// Relative size below which a Δ² denominator counts as zero.
const DEL2_DENOMINATOR_EPS: f64 = 1e-12;

/// Component-wise Aitken Δ² extrapolation of `p0, p1, p2`, with `p2` as the
/// fallback for unsafe components.
fn aitken_del2(p0: &Array1<f64>, p1: &Array1<f64>, p2: &Array1<f64>) -> Array1<f64> {
    let mut out = Array1::zeros(p0.len());
    Zip::from(&mut out)
        .and(p0)
        .and(p1)
        .and(p2)
        .for_each(|o, &a, &b, &c| *o = del2_component(a, b, c));
    out
}

fn del2_component(a: f64, b: f64, c: f64) -> f64 {
    let d = c - 2.0 * b + a;
    if d.abs() <= DEL2_DENOMINATOR_EPS * (a.abs() + b.abs() + c.abs()) {
        return c;
    }
    let p = a - (b - a) * (b - a) / d;
    if !p.is_finite() || (p - c).abs() > (c - a).abs() {
        c
    } else {
        p
    }
}

fn max_abs_diff(a: &Array1<f64>, b: &Array1<f64>) -> f64 {
    Zip::from(a)
        .and(b)
        .fold(0.0_f64, |m, &x, &y| m.max((x - y).abs()))
}
