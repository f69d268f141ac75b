// ─────────────────────────────────────────────────────────────────────
// Symplectic HNN — Data Loader
// © 2021–2026 Symplectic HNN contributors.
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Training pairs, reference trajectories and vector-field grids for one
//! dataset problem.
//!
//! Each sample is a pair `(y(0), y(h))`: a random initial condition and the
//! ground-truth state one step `h` later (tight-tolerance RK45), both
//! perturbed by Gaussian observation noise.

use crate::systems::system_for;
use ndarray::{s, Array1, Array2, Array3, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use shnn_core::reference::{integrate_rk45_with, uniform_time_grid, Rk45Config};
use shnn_core::vector_field::VectorFieldModel;
use shnn_types::config::Problem;
use shnn_types::error::{ensure_dim, ShnnError, ShnnResult};
use shnn_types::state::Trajectory;
use std::f64::consts::PI;

/// Tolerances for ground-truth integration.
const GROUND_TRUTH_RTOL: f64 = 1e-10;
const GROUND_TRUTH_ATOL: f64 = 1e-12;

/// Default side length of the vector-field mesh.
pub const DEFAULT_GRIDSIZE: usize = 20;

/// Spring initial radius range in phase space.
const SPRING_RADIUS: (f64, f64) = (0.1, 1.0);

/// Pendulum initial radius range in phase space.
const PENDULUM_RADIUS: (f64, f64) = (1.3, 2.3);

/// Double pendulum initial angle and momentum half-widths.
const DOUBLE_ANGLE: f64 = 1.0;
const DOUBLE_MOMENTUM: f64 = 0.5;

fn ground_truth_config() -> Rk45Config {
    Rk45Config {
        rtol: GROUND_TRUTH_RTOL,
        atol: GROUND_TRUTH_ATOL,
    }
}

/// Batch of training pairs `x0 → x1` with spacings `dt`.
#[derive(Debug, Clone, PartialEq)]
pub struct PairBatch {
    pub x0: Array2<f64>,
    pub x1: Array2<f64>,
    pub dt: Array1<f64>,
}

impl PairBatch {
    pub fn len(&self) -> usize {
        self.x0.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.x0.nrows() == 0
    }

    pub fn dim(&self) -> usize {
        self.x0.ncols()
    }

    /// Finite-difference velocities `(x1 − x0) / dt`, row-wise.
    pub fn velocities(&self) -> Array2<f64> {
        let diff = &self.x1 - &self.x0;
        let dt = self.dt.view().insert_axis(Axis(1));
        diff / &dt
    }
}

/// Train/test split of sampled pairs.
///
/// `coords[i, 0]` and `coords[i, 1]` are the two noisy states of pair `i`,
/// observed at `t[i, 0]` and `t[i, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub coords: Array3<f64>,
    pub t: Array2<f64>,
    pub test_coords: Array3<f64>,
    pub test_t: Array2<f64>,
}

impl Dataset {
    pub fn train_pairs(&self) -> PairBatch {
        to_pairs(&self.coords, &self.t)
    }

    pub fn test_pairs(&self) -> PairBatch {
        to_pairs(&self.test_coords, &self.test_t)
    }
}

fn to_pairs(coords: &Array3<f64>, t: &Array2<f64>) -> PairBatch {
    PairBatch {
        x0: coords.index_axis(Axis(1), 0).to_owned(),
        x1: coords.index_axis(Axis(1), 1).to_owned(),
        dt: &t.column(1) - &t.column(0),
    }
}

/// Vector field sampled on a regular `(p₁, q₁)` mesh.
///
/// `coords` holds the mesh points and `field` the `(ṗ₁, q̇₁)` components,
/// both `[gridsize², 2]`. The first coordinate varies fastest. Remaining
/// state components (double pendulum) are held at zero.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorFieldGrid {
    pub coords: Array2<f64>,
    pub field: Array2<f64>,
}

/// Evaluate `model` on a `gridsize × gridsize` mesh over `boundaries`.
pub fn field_on_grid<M>(model: &M, boundaries: (f64, f64), gridsize: usize) -> ShnnResult<VectorFieldGrid>
where
    M: VectorFieldModel + ?Sized,
{
    if gridsize < 2 {
        return Err(ShnnError::ConfigError(format!(
            "gridsize must be >= 2, got {gridsize}"
        )));
    }
    let (lo, hi) = boundaries;
    let dim = model.dim();
    let n = dim / 2;
    let axis = Array1::linspace(lo, hi, gridsize);

    let mut states = Array2::zeros((gridsize * gridsize, dim));
    let mut coords = Array2::zeros((gridsize * gridsize, 2));
    for i in 0..gridsize {
        for j in 0..gridsize {
            let k = i * gridsize + j;
            coords[[k, 0]] = axis[j];
            coords[[k, 1]] = axis[i];
            states[[k, 0]] = axis[j];
            states[[k, n]] = axis[i];
        }
    }

    let full = model.time_derivative_rows(&states)?;
    let mut field = Array2::zeros((gridsize * gridsize, 2));
    field.column_mut(0).assign(&full.column(0));
    field.column_mut(1).assign(&full.column(n));
    Ok(VectorFieldGrid { coords, field })
}

/// Dataset generator for one [`Problem`].
pub struct DataLoader {
    problem: Problem,
    h: f64,
    noise: f64,
    system: Box<dyn VectorFieldModel>,
}

impl DataLoader {
    pub fn new(problem: Problem, h: f64, noise: f64) -> ShnnResult<Self> {
        if !h.is_finite() || h <= 0.0 {
            return Err(ShnnError::ConfigError(format!(
                "sampling step h must be finite and > 0, got {h}"
            )));
        }
        if !noise.is_finite() || noise < 0.0 {
            return Err(ShnnError::ConfigError(format!(
                "noise must be finite and >= 0, got {noise}"
            )));
        }
        Ok(DataLoader {
            problem,
            h,
            noise,
            system: system_for(problem)?,
        })
    }

    pub fn problem(&self) -> Problem {
        self.problem
    }

    pub fn h(&self) -> f64 {
        self.h
    }

    pub fn system(&self) -> &dyn VectorFieldModel {
        self.system.as_ref()
    }

    /// Symmetric phase-space window used for plots and field meshes.
    pub fn plot_boundaries(&self) -> (f64, f64) {
        match self.problem {
            Problem::Spring => (-1.2, 1.2),
            Problem::Pendulum => (-3.0, 3.0),
            Problem::DoublePendulum => (-2.5, 2.5),
        }
    }

    /// Fixed initial condition for evaluation trajectories.
    pub fn static_initial_value(&self) -> Array1<f64> {
        match self.problem {
            Problem::Spring => Array1::from_vec(vec![0.0, 1.0]),
            Problem::Pendulum => Array1::from_vec(vec![0.0, 2.0]),
            Problem::DoublePendulum => Array1::from_vec(vec![0.0, 0.0, 1.0, 0.5]),
        }
    }

    fn random_initial_value(&self, rng: &mut StdRng) -> Array1<f64> {
        match self.problem {
            Problem::Spring | Problem::Pendulum => {
                let (r_lo, r_hi) = if self.problem == Problem::Spring {
                    SPRING_RADIUS
                } else {
                    PENDULUM_RADIUS
                };
                let r = rng.gen_range(r_lo..r_hi);
                let phi = rng.gen_range(0.0..2.0 * PI);
                Array1::from_vec(vec![r * phi.cos(), r * phi.sin()])
            }
            Problem::DoublePendulum => Array1::from_vec(vec![
                rng.gen_range(-DOUBLE_MOMENTUM..DOUBLE_MOMENTUM),
                rng.gen_range(-DOUBLE_MOMENTUM..DOUBLE_MOMENTUM),
                rng.gen_range(-DOUBLE_ANGLE..DOUBLE_ANGLE),
                rng.gen_range(-DOUBLE_ANGLE..DOUBLE_ANGLE),
            ]),
        }
    }

    /// Sample `samples` noisy pairs and split off `test_split` of them.
    pub fn get_dataset(&self, seed: u64, samples: usize, test_split: f64) -> ShnnResult<Dataset> {
        if samples < 2 {
            return Err(ShnnError::ConfigError(format!(
                "need at least 2 samples, got {samples}"
            )));
        }
        if !(test_split > 0.0 && test_split < 1.0) {
            return Err(ShnnError::ConfigError(format!(
                "test_split must lie in (0, 1), got {test_split}"
            )));
        }
        let n_test = ((samples as f64 * test_split).round() as usize).clamp(1, samples - 1);

        let mut rng = StdRng::seed_from_u64(seed);
        let noise = if self.noise > 0.0 {
            Some(
                Normal::new(0.0, self.noise)
                    .map_err(|e| ShnnError::ConfigError(format!("noise distribution: {e}")))?,
            )
        } else {
            None
        };

        let dim = self.system.dim();
        let mut coords = Array3::zeros((samples, 2, dim));
        let mut t = Array2::zeros((samples, 2));
        let t_eval = [0.0, self.h];
        let config = ground_truth_config();

        for i in 0..samples {
            let y0 = self.random_initial_value(&mut rng);
            let step = integrate_rk45_with(
                self.system.as_ref(),
                (0.0, self.h),
                y0.view(),
                Some(&t_eval),
                &config,
            )?;
            coords.slice_mut(s![i, .., ..]).assign(step.states());
            t.row_mut(i).assign(step.times());
        }

        if let Some(dist) = noise {
            coords.mapv_inplace(|v| v + dist.sample(&mut rng));
        }

        tracing::debug!(
            problem = %self.problem,
            samples,
            n_test,
            noise = self.noise,
            "sampled dataset"
        );

        Ok(Dataset {
            coords: coords.slice(s![n_test.., .., ..]).to_owned(),
            t: t.slice(s![n_test.., ..]).to_owned(),
            test_coords: coords.slice(s![..n_test, .., ..]).to_owned(),
            test_t: t.slice(s![..n_test, ..]).to_owned(),
        })
    }

    /// Ground-truth trajectory from `y0`, sampled on the inclusive grid
    /// with spacing `h`.
    pub fn get_trajectory(&self, t_span: (f64, f64), y0: ArrayView1<'_, f64>) -> ShnnResult<Trajectory> {
        ensure_dim("trajectory initial state", self.system.dim(), y0.len())?;
        let t_eval = uniform_time_grid(t_span, self.h)?;
        integrate_rk45_with(self.system.as_ref(), t_span, y0, Some(&t_eval), &ground_truth_config())
    }

    /// Ground-truth vector field on the plot mesh.
    pub fn get_analytic_field(&self, gridsize: usize) -> ShnnResult<VectorFieldGrid> {
        field_on_grid(self.system.as_ref(), self.plot_boundaries(), gridsize)
    }
}
