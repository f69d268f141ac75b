// ─────────────────────────────────────────────────────────────────────
// Symplectic HNN — Training Loop
// © 2021–2026 Symplectic HNN contributors.
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Full-batch Adam training of an [`Hnn`] against the scheme loss.

use crate::hnn::Hnn;
use crate::loss::{scheme_loss, scheme_loss_and_gradient};
use crate::optim::Adam;
use rand::rngs::StdRng;
use rand::SeedableRng;
use shnn_core::scheme::Scheme;
use shnn_data::loader::{DataLoader, Dataset};
use shnn_types::config::RunConfig;
use shnn_types::error::{ensure_dim, ShnnError, ShnnResult};

/// Loss history and final statistics of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingStats {
    /// Training loss before each update.
    pub train_loss: Vec<f64>,
    /// Held-out loss after each update.
    pub test_loss: Vec<f64>,
    /// Final train distances as (mean, standard error).
    pub final_train: (f64, f64),
    pub final_test: (f64, f64),
}

/// Sample the run's dataset and train a fresh network on it.
pub fn train(config: &RunConfig) -> ShnnResult<(Hnn, TrainingStats)> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let hnn = Hnn::new(config, &mut rng)?;

    let loader = DataLoader::new(config.problem, config.h, config.noise)?;
    let dataset = loader.get_dataset(config.seed, config.samples, config.test_split)?;
    train_on(config, hnn, &dataset)
}

/// Train `hnn` on an existing dataset with the run's scheme and optimizer
/// settings.
pub fn train_on(config: &RunConfig, mut hnn: Hnn, dataset: &Dataset) -> ShnnResult<(Hnn, TrainingStats)> {
    ensure_dim("training network dimension", config.dim, hnn.mlp().input_dim())?;
    let train_pairs = dataset.train_pairs();
    let test_pairs = dataset.test_pairs();
    let scheme = Scheme::new(config.loss_type, config.h, config.dim)?;
    let mut adam = Adam::new(config.learn_rate, config.weight_decay)?;
    let mut params = hnn.mlp().weights().to_flat();

    let mut train_loss = Vec::with_capacity(config.total_steps + 1);
    let mut test_loss = Vec::with_capacity(config.total_steps + 1);

    for step in 0..=config.total_steps {
        let (eval, grads) = scheme_loss_and_gradient(&hnn, &scheme, &train_pairs)?;
        if !eval.loss.is_finite() {
            return Err(ShnnError::ConfigError(format!(
                "training loss became non-finite at step {step}"
            )));
        }
        adam.step(&mut params, &grads.to_flat())?;
        hnn.mlp_mut().weights_mut().assign_flat(params.view())?;

        let test = scheme_loss(&hnn, &scheme, &test_pairs)?;
        train_loss.push(eval.loss);
        test_loss.push(test.loss);

        if config.print_every > 0 && step % config.print_every == 0 {
            tracing::info!(
                step,
                train_loss = eval.loss,
                test_loss = test.loss,
                "training"
            );
        }
    }

    let final_train = scheme_loss(&hnn, &scheme, &train_pairs)?.mean_and_stderr();
    let final_test = scheme_loss(&hnn, &scheme, &test_pairs)?.mean_and_stderr();
    tracing::info!(
        run = %config.label(),
        "final train loss {:.4e} +/- {:.4e}, final test loss {:.4e} +/- {:.4e}",
        final_train.0,
        final_train.1,
        final_test.0,
        final_test.1
    );

    Ok((
        hnn,
        TrainingStats {
            train_loss,
            test_loss,
            final_train,
            final_test,
        },
    ))
}
