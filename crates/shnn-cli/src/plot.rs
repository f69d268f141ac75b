// ─────────────────────────────────────────────────────────────────────
// Symplectic HNN — Plot Data Export
// © 2021–2026 Symplectic HNN contributors.
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Data behind the four comparison panels, written as `.npz`.
//!
//! Panels: exact field and trajectory, learned field with an RK45
//! roll-out, learned field with a roll-out of the training scheme, and
//! the first coordinate of all three over time.

use anyhow::{Context, Result};
use ndarray::Array1;
use ndarray_npy::NpzWriter;
use shnn_core::integrator::CustomIntegrator;
use shnn_core::reference::{integrate_rk45, uniform_time_grid};
use shnn_core::scheme::Scheme;
use shnn_data::loader::{field_on_grid, DataLoader, VectorFieldGrid, DEFAULT_GRIDSIZE};
use shnn_ml::hnn::Hnn;
use shnn_types::config::RunConfig;
use shnn_types::state::Trajectory;
use std::fs::File;
use std::path::Path;

/// Relative tolerance of the learned-model RK45 roll-out.
const PRED_RTOL: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct PlotData {
    pub exact_field: VectorFieldGrid,
    pub pred_field: VectorFieldGrid,
    pub exact_traj: Trajectory,
    pub pred_traj_rk45: Trajectory,
    pub pred_traj_custom: Trajectory,
    pub t_eval: Array1<f64>,
}

/// Configuration for plotting a saved model. Architecture and training
/// settings come from `saved`; the fixed-point solver settings and the
/// output directory are the caller's.
pub fn plot_config(saved: RunConfig, requested: &RunConfig) -> RunConfig {
    RunConfig {
        solver: requested.solver.clone(),
        save_dir: requested.save_dir.clone(),
        ..saved
    }
}

/// Integrate the analytic system and the trained network from the
/// problem's fixed initial value over `(0, t_final)`.
pub fn plot_data(config: &RunConfig, hnn: &Hnn, t_final: f64) -> Result<PlotData> {
    let t_span = (0.0, t_final);
    let loader = DataLoader::new(config.problem, config.h, config.noise)?;
    let y0 = loader.static_initial_value();
    let t_eval = uniform_time_grid(t_span, config.h)?;

    let pred_field = field_on_grid(hnn, loader.plot_boundaries(), DEFAULT_GRIDSIZE)?;
    let pred_traj_rk45 = integrate_rk45(hnn, t_span, y0.view(), Some(&t_eval), PRED_RTOL)
        .context("RK45 roll-out of the learned field")?;

    let scheme = Scheme::new(config.loss_type, config.h, config.dim)?;
    let integrator = CustomIntegrator::new(config.solver.clone())?;
    let pred_traj_custom = integrator
        .integrate(hnn, &scheme, t_span, y0.view(), config.h)
        .with_context(|| format!("{} roll-out of the learned field", config.loss_type))?;

    let exact_field = loader.get_analytic_field(DEFAULT_GRIDSIZE)?;
    let exact_traj = loader.get_trajectory(t_span, y0.view())?;

    tracing::debug!(
        run = %config.label(),
        rk45_samples = pred_traj_rk45.len(),
        custom_samples = pred_traj_custom.len(),
        "plot data ready"
    );

    Ok(PlotData {
        exact_field,
        pred_field,
        exact_traj,
        pred_traj_rk45,
        pred_traj_custom,
        t_eval: Array1::from_vec(t_eval),
    })
}

/// Write every panel array under a fixed key.
pub fn write_npz(path: &Path, data: &PlotData) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut npz = NpzWriter::new(file);
    npz.add_array("field_coords", &data.exact_field.coords)?;
    npz.add_array("exact_field_x", &data.exact_field.field.column(0).to_owned())?;
    npz.add_array("exact_field_y", &data.exact_field.field.column(1).to_owned())?;
    npz.add_array("pred_field_x", &data.pred_field.field.column(0).to_owned())?;
    npz.add_array("pred_field_y", &data.pred_field.field.column(1).to_owned())?;
    npz.add_array("exact_traj", data.exact_traj.states())?;
    npz.add_array("pred_traj_rk45", data.pred_traj_rk45.states())?;
    npz.add_array("pred_traj_custom", data.pred_traj_custom.states())?;
    npz.add_array("t_custom", data.pred_traj_custom.times())?;
    npz.add_array("t_eval", &data.t_eval)?;
    npz.finish()?;
    tracing::info!(path = %path.display(), "wrote plot data");
    Ok(())
}
