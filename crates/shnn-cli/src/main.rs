//! `shnn`: train, plot and sweep Symplectic HNN experiments.

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use shnn_cli::cli::{parse_log_level, Cli, Commands, PlotArgs, SweepArgs, TrainArgs};
use shnn_cli::{plot, sweep};
use shnn_ml::persistence::{load_model, save_model};
use shnn_ml::train::train;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_log_level(&cli.log_level))
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Train(args) => run_train(&args),
        Commands::Plot(args) => run_plot(&args),
        Commands::Sweep(args) => run_sweep(&args),
    }
}

fn run_train(args: &TrainArgs) -> Result<()> {
    let config = args.to_config()?;
    info!(
        "Training {} for {} steps ({} samples, hidden {}x{})",
        config.label(),
        config.total_steps,
        config.samples,
        config.hidden_dim,
        config.hidden_layers
    );
    let (hnn, _) = train(&config)?;
    let path = config.model_path();
    save_model(&path, &config, &hnn).with_context(|| format!("saving {}", path.display()))?;
    info!("Saved model to {}", path.display());
    Ok(())
}

fn run_plot(args: &PlotArgs) -> Result<()> {
    if !args.t_final.is_finite() || args.t_final <= 0.0 {
        bail!("--t_final must be finite and > 0, got {}", args.t_final);
    }
    let requested = args.model.to_config()?;
    let path = requested.model_path();
    let (hnn, saved) = load_model(&path, &requested).with_context(|| format!("loading {}", path.display()))?;
    let config = plot::plot_config(saved, &requested);
    info!("Integrating {} up to t = {}", config.label(), args.t_final);
    let data = plot::plot_data(&config, &hnn, args.t_final)?;
    plot::write_npz(&config.plot_path(), &data)
}

fn run_sweep(args: &SweepArgs) -> Result<()> {
    let exe = std::env::current_exe().context("locating the shnn executable")?;
    let commands = sweep::sweep_grid(&args.problems, &args.h, args.save_dir.as_deref());
    let summary = sweep::run_sweep(&exe, &commands, args.dry_run);
    for cmd in &summary.failed {
        tracing::warn!("failed: {cmd}");
    }
    Ok(())
}
