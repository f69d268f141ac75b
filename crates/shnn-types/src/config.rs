// ─────────────────────────────────────────────────────────────────────
// Symplectic HNN — Config
// © 2021–2026 Symplectic HNN contributors.
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
use crate::error::{ShnnError, ShnnResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Dataset / physical system a run is trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Problem {
    Spring,
    Pendulum,
    DoublePendulum,
}

impl Problem {
    pub const ALL: [Problem; 3] = [Problem::Pendulum, Problem::DoublePendulum, Problem::Spring];

    /// Phase-space dimension (momenta followed by positions).
    pub fn dim(self) -> usize {
        match self {
            Problem::Spring | Problem::Pendulum => 2,
            Problem::DoublePendulum => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Problem::Spring => "spring",
            Problem::Pendulum => "pendulum",
            Problem::DoublePendulum => "double-pendulum",
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Problem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spring" => Ok(Problem::Spring),
            "pendulum" => Ok(Problem::Pendulum),
            "double-pendulum" | "double_pendulum" => Ok(Problem::DoublePendulum),
            other => Err(format!(
                "unknown problem '{other}', expected spring | pendulum | double-pendulum"
            )),
        }
    }
}

/// Integration scheme used both as training loss and as roll-out integrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemeKind {
    #[serde(rename = "euler-forw")]
    EulerForward,
    #[serde(rename = "euler-symp")]
    EulerSymplectic,
    #[serde(rename = "midpoint")]
    Midpoint,
}

impl SchemeKind {
    pub const ALL: [SchemeKind; 3] = [
        SchemeKind::EulerForward,
        SchemeKind::EulerSymplectic,
        SchemeKind::Midpoint,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SchemeKind::EulerForward => "euler-forw",
            SchemeKind::EulerSymplectic => "euler-symp",
            SchemeKind::Midpoint => "midpoint",
        }
    }
}

impl fmt::Display for SchemeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "euler-forw" => Ok(SchemeKind::EulerForward),
            "euler-symp" => Ok(SchemeKind::EulerSymplectic),
            "midpoint" => Ok(SchemeKind::Midpoint),
            other => Err(format!(
                "unknown loss type '{other}', expected euler-forw | euler-symp | midpoint"
            )),
        }
    }
}

/// Hidden-layer activation of the Hamiltonian MLP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Nonlinearity {
    Tanh,
    Softplus,
}

impl fmt::Display for Nonlinearity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Nonlinearity::Tanh => f.write_str("tanh"),
            Nonlinearity::Softplus => f.write_str("softplus"),
        }
    }
}

impl FromStr for Nonlinearity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tanh" => Ok(Nonlinearity::Tanh),
            "softplus" => Ok(Nonlinearity::Softplus),
            other => Err(format!(
                "unknown nonlinearity '{other}', expected tanh | softplus"
            )),
        }
    }
}

/// Fixed-point update rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FixedPointMethod {
    /// Steffensen acceleration with Aitken's Δ².
    Del2,
    /// Plain successive substitution.
    Iteration,
}

/// What the integrator does when an implicit step fails to converge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConvergencePolicy {
    /// Abort the integration call with `NonConvergence`.
    Fail,
    /// Keep the last iterate and log a warning.
    AcceptLastIterate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Absolute max-norm tolerance between successive iterates (default: 1e-4).
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Iteration cap (default: 500).
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_method")]
    pub method: FixedPointMethod,
    #[serde(default = "default_policy")]
    pub on_non_convergence: ConvergencePolicy,
}

fn default_tolerance() -> f64 {
    1e-4
}
fn default_max_iterations() -> usize {
    500
}
fn default_method() -> FixedPointMethod {
    FixedPointMethod::Del2
}
fn default_policy() -> ConvergencePolicy {
    ConvergencePolicy::Fail
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            tolerance: default_tolerance(),
            max_iterations: default_max_iterations(),
            method: default_method(),
            on_non_convergence: default_policy(),
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> ShnnResult<()> {
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(ShnnError::ConfigError(format!(
                "solver tolerance must be finite and > 0, got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(ShnnError::ConfigError(
                "solver max_iterations must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything that identifies and reproduces one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub problem: Problem,
    pub dim: usize,
    pub loss_type: SchemeKind,
    pub h: f64,
    #[serde(default)]
    pub noise: f64,
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_hidden_dim")]
    pub hidden_dim: usize,
    #[serde(default = "default_hidden_layers")]
    pub hidden_layers: usize,
    #[serde(default = "default_nonlinearity")]
    pub nonlinearity: Nonlinearity,
    #[serde(default = "default_learn_rate")]
    pub learn_rate: f64,
    #[serde(default = "default_weight_decay")]
    pub weight_decay: f64,
    #[serde(default = "default_total_steps")]
    pub total_steps: usize,
    #[serde(default = "default_print_every")]
    pub print_every: usize,
    #[serde(default = "default_samples")]
    pub samples: usize,
    #[serde(default = "default_test_split")]
    pub test_split: f64,
    #[serde(default = "default_save_dir")]
    pub save_dir: PathBuf,
    #[serde(default)]
    pub solver: SolverConfig,
}

fn default_hidden_dim() -> usize {
    200
}
fn default_hidden_layers() -> usize {
    2
}
fn default_nonlinearity() -> Nonlinearity {
    Nonlinearity::Tanh
}
fn default_learn_rate() -> f64 {
    1e-3
}
fn default_weight_decay() -> f64 {
    1e-4
}
fn default_total_steps() -> usize {
    2000
}
fn default_print_every() -> usize {
    200
}
fn default_samples() -> usize {
    3000
}
fn default_test_split() -> f64 {
    0.05
}
fn default_save_dir() -> PathBuf {
    PathBuf::from("experiments")
}

impl RunConfig {
    /// Config with defaults for everything but the problem, scheme and step size.
    pub fn new(problem: Problem, loss_type: SchemeKind, h: f64) -> Self {
        RunConfig {
            problem,
            dim: problem.dim(),
            loss_type,
            h,
            noise: 0.0,
            seed: 0,
            hidden_dim: default_hidden_dim(),
            hidden_layers: default_hidden_layers(),
            nonlinearity: default_nonlinearity(),
            learn_rate: default_learn_rate(),
            weight_decay: default_weight_decay(),
            total_steps: default_total_steps(),
            print_every: default_print_every(),
            samples: default_samples(),
            test_split: default_test_split(),
            save_dir: default_save_dir(),
            solver: SolverConfig::default(),
        }
    }

    /// Load from a JSON file and validate.
    pub fn from_file(path: &str) -> ShnnResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ShnnResult<()> {
        if self.dim != self.problem.dim() {
            return Err(ShnnError::ConfigError(format!(
                "problem '{}' has dimension {}, config says {}",
                self.problem,
                self.problem.dim(),
                self.dim
            )));
        }
        if !self.h.is_finite() || self.h <= 0.0 {
            return Err(ShnnError::ConfigError(format!(
                "step size h must be finite and > 0, got {}",
                self.h
            )));
        }
        if !self.noise.is_finite() || self.noise < 0.0 {
            return Err(ShnnError::ConfigError(format!(
                "noise must be finite and >= 0, got {}",
                self.noise
            )));
        }
        if self.hidden_dim == 0 || self.hidden_layers == 0 {
            return Err(ShnnError::ConfigError(
                "hidden_dim and hidden_layers must be > 0".to_string(),
            ));
        }
        if !self.learn_rate.is_finite() || self.learn_rate <= 0.0 {
            return Err(ShnnError::ConfigError(format!(
                "learn_rate must be finite and > 0, got {}",
                self.learn_rate
            )));
        }
        if !(self.test_split > 0.0 && self.test_split < 1.0) {
            return Err(ShnnError::ConfigError(format!(
                "test_split must be in (0, 1), got {}",
                self.test_split
            )));
        }
        if self.samples < 2 {
            return Err(ShnnError::ConfigError(
                "samples must be >= 2".to_string(),
            ));
        }
        self.solver.validate()
    }

    /// Run label `<problem>-<loss_type>-h<h>[-n<noise>]`.
    pub fn label(&self) -> String {
        let mut label = format!("{}-{}-h{}", self.problem, self.loss_type, self.h);
        if self.noise > 0.0 {
            label.push_str(&format!("-n{}", self.noise));
        }
        label
    }

    pub fn experiment_dir(&self) -> PathBuf {
        self.save_dir.join(format!("experiment-{}", self.problem))
    }

    pub fn model_path(&self) -> PathBuf {
        self.experiment_dir().join(format!("{}.json", self.label()))
    }

    pub fn plot_path(&self) -> PathBuf {
        self.experiment_dir().join(format!("{}.npz", self.label()))
    }

    /// Compare a saved config against the one requested for this run.
    /// Training-only knobs (steps, learning rate, seed, paths) may differ.
    pub fn ensure_matches(&self, requested: &RunConfig) -> ShnnResult<()> {
        fn check<T: PartialEq + fmt::Display>(field: &str, saved: T, requested: T) -> ShnnResult<()> {
            if saved != requested {
                return Err(ShnnError::ConfigMismatch {
                    field: field.to_string(),
                    saved: saved.to_string(),
                    requested: requested.to_string(),
                });
            }
            Ok(())
        }
        fn check_f64(field: &str, saved: f64, requested: f64) -> ShnnResult<()> {
            let scale = saved.abs().max(requested.abs()).max(1.0);
            if (saved - requested).abs() > 1e-12 * scale {
                return Err(ShnnError::ConfigMismatch {
                    field: field.to_string(),
                    saved: saved.to_string(),
                    requested: requested.to_string(),
                });
            }
            Ok(())
        }

        check("problem", self.problem, requested.problem)?;
        check("dim", self.dim, requested.dim)?;
        check("loss_type", self.loss_type, requested.loss_type)?;
        check_f64("h", self.h, requested.h)?;
        check_f64("noise", self.noise, requested.noise)?;
        check("hidden_dim", self.hidden_dim, requested.hidden_dim)?;
        check("hidden_layers", self.hidden_layers, requested.hidden_layers)?;
        check("nonlinearity", self.nonlinearity, requested.nonlinearity)?;
        Ok(())
    }
}
