// ─────────────────────────────────────────────────────────────────────
// Symplectic HNN — State
// © 2021–2026 Symplectic HNN contributors.
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
use crate::error::{ShnnError, ShnnResult};
use ndarray::{Array1, Array2, ArrayView1};

/// Time-ordered sequence of phase-space samples.
///
/// Row `i` of `states` is the state at `times[i]`. Times are strictly
/// increasing and every row has the same dimension. There is no mutable
/// access once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    times: Array1<f64>,
    states: Array2<f64>, // [n_samples, dim]
}

impl Trajectory {
    /// Assemble from incrementally collected samples.
    pub fn new(times: Vec<f64>, states: Vec<Array1<f64>>) -> ShnnResult<Self> {
        if times.len() != states.len() {
            return Err(ShnnError::shape("trajectory samples", times.len(), states.len()));
        }
        let Some(first) = states.first() else {
            return Err(ShnnError::ConfigError(
                "trajectory needs at least one sample".to_string(),
            ));
        };
        let dim = first.len();
        let mut matrix = Array2::zeros((states.len(), dim));
        for (i, state) in states.iter().enumerate() {
            if state.len() != dim {
                return Err(ShnnError::shape("trajectory state", dim, state.len()));
            }
            matrix.row_mut(i).assign(state);
        }
        Self::from_arrays(Array1::from_vec(times), matrix)
    }

    pub fn from_arrays(times: Array1<f64>, states: Array2<f64>) -> ShnnResult<Self> {
        if times.len() != states.nrows() {
            return Err(ShnnError::shape("trajectory samples", times.len(), states.nrows()));
        }
        if times.is_empty() {
            return Err(ShnnError::ConfigError(
                "trajectory needs at least one sample".to_string(),
            ));
        }
        for w in times.windows(2) {
            if !(w[1] > w[0]) {
                return Err(ShnnError::ConfigError(format!(
                    "trajectory times must be strictly increasing ({} then {})",
                    w[0], w[1]
                )));
            }
        }
        Ok(Trajectory { times, states })
    }

    pub fn times(&self) -> &Array1<f64> {
        &self.times
    }

    pub fn states(&self) -> &Array2<f64> {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.states.ncols()
    }

    pub fn state(&self, i: usize) -> ArrayView1<'_, f64> {
        self.states.row(i)
    }

    pub fn initial(&self) -> ArrayView1<'_, f64> {
        self.states.row(0)
    }

    pub fn last(&self) -> (f64, ArrayView1<'_, f64>) {
        let i = self.len() - 1;
        (self.times[i], self.states.row(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, ArrayView1<'_, f64>)> {
        self.times.iter().copied().zip(self.states.outer_iter())
    }

    /// Maximum absolute deviation of `energy` along the trajectory from its
    /// value at the first sample.
    pub fn max_energy_drift<F>(&self, mut energy: F) -> f64
    where
        F: FnMut(ArrayView1<'_, f64>) -> f64,
    {
        let e0 = energy(self.initial());
        self.states
            .outer_iter()
            .map(|s| (energy(s) - e0).abs())
            .fold(0.0_f64, f64::max)
    }
}
