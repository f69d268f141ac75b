// ─────────────────────────────────────────────────────────────────────
// Symplectic HNN — Command Line
// © 2021–2026 Symplectic HNN contributors.
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Argument definitions and their mapping onto [`RunConfig`].

use clap::{Args, Parser, Subcommand};
use shnn_types::config::{Nonlinearity, Problem, RunConfig, SchemeKind};
use shnn_types::error::ShnnResult;
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "shnn")]
#[command(about = "Symplectic Hamiltonian neural networks", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (trace, debug, info, warn, error)
    #[arg(long = "log_level", global = true, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sample a dataset and train a network on it
    Train(TrainArgs),

    /// Load a trained network and export trajectory/field data
    Plot(PlotArgs),

    /// Train every problem × scheme × step size combination
    Sweep(SweepArgs),
}

/// Everything that identifies a trained model.
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// spring, pendulum or double-pendulum
    pub problem: Problem,

    /// Scheme used as training loss: euler-forw, euler-symp or midpoint
    #[arg(long = "loss_type")]
    pub loss_type: SchemeKind,

    /// Step size of the scheme
    #[arg(long, allow_negative_numbers = true)]
    pub h: f64,

    /// Std of the observation noise
    #[arg(long)]
    pub noise: Option<f64>,

    #[arg(long = "hidden_dim")]
    pub hidden_dim: Option<usize>,

    #[arg(long = "hidden_layers")]
    pub hidden_layers: Option<usize>,

    /// tanh or softplus
    #[arg(long)]
    pub nonlinearity: Option<Nonlinearity>,

    #[arg(long = "save_dir")]
    pub save_dir: Option<PathBuf>,

    /// JSON run config; command-line values take precedence
    #[arg(long)]
    pub config: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long = "total_steps")]
    pub total_steps: Option<usize>,

    #[arg(long = "learn_rate")]
    pub learn_rate: Option<f64>,

    #[arg(long = "weight_decay")]
    pub weight_decay: Option<f64>,

    #[arg(long = "print_every")]
    pub print_every: Option<usize>,

    #[arg(long)]
    pub samples: Option<usize>,

    #[arg(long = "test_split")]
    pub test_split: Option<f64>,
}

#[derive(Args, Debug, Clone)]
pub struct PlotArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// End of the integration span starting at 0
    #[arg(long = "t_final", default_value = "300")]
    pub t_final: f64,
}

#[derive(Args, Debug, Clone)]
pub struct SweepArgs {
    /// Problems to sweep (default: pendulum, double-pendulum, spring)
    #[arg(long, value_delimiter = ',')]
    pub problems: Vec<Problem>,

    /// Step sizes to sweep (default: 0.1, 0.2, 0.4, 0.05, 0.8)
    #[arg(long, value_delimiter = ',')]
    pub h: Vec<f64>,

    /// Forwarded to every training run
    #[arg(long = "save_dir")]
    pub save_dir: Option<PathBuf>,

    /// Only log the commands
    #[arg(long = "dry_run")]
    pub dry_run: bool,
}

impl ModelArgs {
    pub fn to_config(&self) -> ShnnResult<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_file(path)?,
            None => RunConfig::new(self.problem, self.loss_type, self.h),
        };
        config.problem = self.problem;
        config.dim = self.problem.dim();
        config.loss_type = self.loss_type;
        config.h = self.h;
        if let Some(noise) = self.noise {
            config.noise = noise;
        }
        if let Some(hidden_dim) = self.hidden_dim {
            config.hidden_dim = hidden_dim;
        }
        if let Some(hidden_layers) = self.hidden_layers {
            config.hidden_layers = hidden_layers;
        }
        if let Some(nonlinearity) = self.nonlinearity {
            config.nonlinearity = nonlinearity;
        }
        if let Some(save_dir) = &self.save_dir {
            config.save_dir = save_dir.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

impl TrainArgs {
    pub fn to_config(&self) -> ShnnResult<RunConfig> {
        let mut config = self.model.to_config()?;
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(total_steps) = self.total_steps {
            config.total_steps = total_steps;
        }
        if let Some(learn_rate) = self.learn_rate {
            config.learn_rate = learn_rate;
        }
        if let Some(weight_decay) = self.weight_decay {
            config.weight_decay = weight_decay;
        }
        if let Some(print_every) = self.print_every {
            config.print_every = print_every;
        }
        if let Some(samples) = self.samples {
            config.samples = samples;
        }
        if let Some(test_split) = self.test_split {
            config.test_split = test_split;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Unknown names fall back to `info`.
pub fn parse_log_level(name: &str) -> Level {
    match name {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}
