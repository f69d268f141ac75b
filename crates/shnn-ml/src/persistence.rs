// ─────────────────────────────────────────────────────────────────────
// Symplectic HNN — Model Persistence
// © 2021–2026 Symplectic HNN contributors.
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
//! JSON save/load of a trained network together with its run config.

use crate::hnn::Hnn;
use crate::mlp::{Mlp, MlpWeights};
use serde::{Deserialize, Serialize};
use shnn_types::config::RunConfig;
use shnn_types::error::{ShnnError, ShnnResult};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedModel {
    pub config: RunConfig,
    pub weights: MlpWeights,
}

/// Write `hnn` and the config it was trained with to `path`, creating
/// parent directories as needed.
pub fn save_model(path: &Path, config: &RunConfig, hnn: &Hnn) -> ShnnResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let record = SavedModel {
        config: config.clone(),
        weights: hnn.mlp().weights().clone(),
    };
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, &record)?;
    writer.flush()?;
    tracing::debug!(path = %path.display(), "saved model");
    Ok(())
}

/// Load a saved network, refusing it when its config disagrees with
/// `requested` on anything that changes the model.
pub fn load_model(path: &Path, requested: &RunConfig) -> ShnnResult<(Hnn, RunConfig)> {
    let reader = BufReader::new(File::open(path)?);
    let record: SavedModel = serde_json::from_reader(reader)?;
    record
        .config
        .validate()
        .map_err(|e| ShnnError::Persistence(format!("{}: invalid saved config: {e}", path.display())))?;
    record.config.ensure_matches(requested)?;

    let mlp = Mlp::from_weights(record.weights, record.config.nonlinearity)?;
    let saved = &record.config;
    if mlp.input_dim() != saved.dim
        || mlp.hidden_dim() != saved.hidden_dim
        || mlp.hidden_layers() != saved.hidden_layers
    {
        return Err(ShnnError::Persistence(format!(
            "{}: weights are {}→{}×{}, config says {}→{}×{}",
            path.display(),
            mlp.input_dim(),
            mlp.hidden_dim(),
            mlp.hidden_layers(),
            saved.dim,
            saved.hidden_dim,
            saved.hidden_layers
        )));
    }
    let hnn = Hnn::from_mlp(mlp)?;
    tracing::debug!(path = %path.display(), "loaded model");
    Ok((hnn, record.config))
}
