//! Adam with L2 weight decay folded into the gradient.

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use shnn_types::error::{ensure_dim, ShnnError, ShnnResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    pub weight_decay: f64,
    #[serde(skip)]
    t: usize,
    #[serde(skip)]
    m: Option<Array1<f64>>,
    #[serde(skip)]
    v: Option<Array1<f64>>,
}

impl Adam {
    pub fn new(learning_rate: f64, weight_decay: f64) -> ShnnResult<Self> {
        if !learning_rate.is_finite() || learning_rate <= 0.0 {
            return Err(ShnnError::ConfigError(format!(
                "learning rate must be finite and > 0, got {learning_rate}"
            )));
        }
        if !weight_decay.is_finite() || weight_decay < 0.0 {
            return Err(ShnnError::ConfigError(format!(
                "weight decay must be finite and >= 0, got {weight_decay}"
            )));
        }
        Ok(Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            weight_decay,
            t: 0,
            m: None,
            v: None,
        })
    }

    /// Number of updates applied so far.
    pub fn steps(&self) -> usize {
        self.t
    }

    /// One update of `params` in place.
    pub fn step(&mut self, params: &mut Array1<f64>, gradient: &Array1<f64>) -> ShnnResult<()> {
        ensure_dim("optimizer gradient", params.len(), gradient.len())?;
        self.t += 1;

        let g = if self.weight_decay > 0.0 {
            gradient + &(&*params * self.weight_decay)
        } else {
            gradient.clone()
        };

        let m = self.m.get_or_insert_with(|| Array1::zeros(params.len()));
        let v = self.v.get_or_insert_with(|| Array1::zeros(params.len()));
        ensure_dim("optimizer state", m.len(), params.len())?;

        *m = &*m * self.beta1 + &g * (1.0 - self.beta1);
        *v = &*v * self.beta2 + &(&g * &g) * (1.0 - self.beta2);

        let bias1 = 1.0 - self.beta1.powi(self.t as i32);
        let bias2 = 1.0 - self.beta2.powi(self.t as i32);
        let lr = self.learning_rate;
        let eps = self.epsilon;
        ndarray::Zip::from(params)
            .and(&*m)
            .and(&*v)
            .for_each(|p, &m, &v| {
                let m_hat = m / bias1;
                let v_hat = v / bias2;
                *p -= lr * m_hat / (v_hat.sqrt() + eps);
            });
        Ok(())
    }

    pub fn reset(&mut self) {
        self.t = 0;
        self.m = None;
        self.v = None;
    }
}
