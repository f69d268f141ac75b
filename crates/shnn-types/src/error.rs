use ndarray::Array1;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShnnError {
    #[error(
        "Fixed-point solve did not converge after {iterations} iterations (residual {residual:.3e})"
    )]
    NonConvergence {
        iterations: usize,
        residual: f64,
        last_iterate: Array1<f64>,
    },

    #[error("Shape mismatch in {context}: expected {expected}, found {found}")]
    Shape {
        context: String,
        expected: usize,
        found: usize,
    },

    #[error("Saved config disagrees on '{field}': saved={saved}, requested={requested}")]
    ConfigMismatch {
        field: String,
        saved: String,
        requested: String,
    },

    #[error("Reference solver failed: {0}")]
    ExternalSolver(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ShnnError {
    pub fn shape(context: impl Into<String>, expected: usize, found: usize) -> Self {
        ShnnError::Shape {
            context: context.into(),
            expected,
            found,
        }
    }
}

pub type ShnnResult<T> = Result<T, ShnnError>;

/// Fail with [`ShnnError::Shape`] unless `found == expected`.
pub fn ensure_dim(context: &str, expected: usize, found: usize) -> ShnnResult<()> {
    if expected != found {
        return Err(ShnnError::shape(context, expected, found));
    }
    Ok(())
}
