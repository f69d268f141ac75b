// ─────────────────────────────────────────────────────────────────────
// Symplectic HNN — Experiment Sweep
// © 2021–2026 Symplectic HNN contributors.
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Runs `train` for every problem × step size × scheme, each in its own
//! process so one failing run cannot take the others down.

use shnn_types::config::{Problem, SchemeKind};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const DEFAULT_STEP_SIZES: [f64; 5] = [0.1, 0.2, 0.4, 0.05, 0.8];

#[derive(Debug, Clone, PartialEq)]
pub struct SweepCommand {
    pub problem: Problem,
    pub loss_type: SchemeKind,
    pub h: f64,
    pub save_dir: Option<PathBuf>,
}

impl SweepCommand {
    /// Arguments for the `train` subcommand.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "train".to_string(),
            self.problem.to_string(),
            "--loss_type".to_string(),
            self.loss_type.to_string(),
            "--h".to_string(),
            self.h.to_string(),
        ];
        if let Some(dir) = &self.save_dir {
            args.push("--save_dir".to_string());
            args.push(dir.display().to_string());
        }
        args
    }
}

impl fmt::Display for SweepCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shnn {}", self.args().join(" "))
    }
}

/// Commands in run order: per problem, per step size, every scheme.
/// Empty inputs select the defaults.
pub fn sweep_grid(problems: &[Problem], step_sizes: &[f64], save_dir: Option<&Path>) -> Vec<SweepCommand> {
    let problems = if problems.is_empty() { &Problem::ALL[..] } else { problems };
    let step_sizes = if step_sizes.is_empty() { &DEFAULT_STEP_SIZES[..] } else { step_sizes };

    let mut commands = Vec::with_capacity(problems.len() * step_sizes.len() * SchemeKind::ALL.len());
    for &problem in problems {
        for &h in step_sizes {
            for loss_type in SchemeKind::ALL {
                commands.push(SweepCommand {
                    problem,
                    loss_type,
                    h,
                    save_dir: save_dir.map(Path::to_path_buf),
                });
            }
        }
    }
    commands
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct SweepSummary {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: Vec<String>,
}

/// Run every command as a child of `executable`. Failures are logged and
/// collected; the sweep always runs to the end.
pub fn run_sweep(executable: &Path, commands: &[SweepCommand], dry_run: bool) -> SweepSummary {
    let mut summary = SweepSummary::default();
    for cmd in commands {
        tracing::info!("Running command: {cmd}");
        if dry_run {
            summary.skipped += 1;
            continue;
        }
        match Command::new(executable).args(cmd.args()).status() {
            Ok(status) if status.success() => {
                tracing::info!("Command succeeded: {cmd}");
                summary.succeeded += 1;
            }
            Ok(status) => {
                tracing::warn!("Command failed ({status}): {cmd}");
                summary.failed.push(cmd.to_string());
            }
            Err(e) => {
                tracing::warn!("Command failed to start ({e}): {cmd}");
                summary.failed.push(cmd.to_string());
            }
        }
    }
    tracing::info!(
        succeeded = summary.succeeded,
        failed = summary.failed.len(),
        skipped = summary.skipped,
        "sweep finished"
    );
    summary
}
