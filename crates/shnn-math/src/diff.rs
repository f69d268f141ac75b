//! Central finite differences for scalar fields and their gradients.

use ndarray::Array1;
use shnn_types::error::{ensure_dim, ShnnResult};

/// Default step for central differences. Balances O(ε²) truncation
/// against cancellation for O(1) inputs.
pub const DEFAULT_STEP: f64 = 1e-5;

/// Central-difference gradient of a scalar function.
pub fn central_gradient<F>(mut f: F, x: &Array1<f64>, step: f64) -> ShnnResult<Array1<f64>>
where
    F: FnMut(&Array1<f64>) -> ShnnResult<f64>,
{
    let mut grad = Array1::zeros(x.len());
    let mut probe = x.clone();
    for i in 0..x.len() {
        let xi = x[i];
        probe[i] = xi + step;
        let fp = f(&probe)?;
        probe[i] = xi - step;
        let fm = f(&probe)?;
        probe[i] = xi;
        grad[i] = (fp - fm) / (2.0 * step);
    }
    Ok(grad)
}

/// Hessian-vector product `∇²f(x) · v` from two gradient evaluations:
/// `(∇f(x + εv) − ∇f(x − εv)) / 2ε`, with ε scaled so that the
/// perturbation has max-norm `step`.
pub fn hessian_vector_product<G>(
    mut gradient: G,
    x: &Array1<f64>,
    v: &Array1<f64>,
    step: f64,
) -> ShnnResult<Array1<f64>>
where
    G: FnMut(&Array1<f64>) -> ShnnResult<Array1<f64>>,
{
    ensure_dim("hessian-vector direction", x.len(), v.len())?;
    let v_norm = v.iter().fold(0.0_f64, |m, a| m.max(a.abs()));
    if v_norm == 0.0 {
        return Ok(Array1::zeros(x.len()));
    }
    let eps = step / v_norm;

    let mut forward = x.clone();
    forward.scaled_add(eps, v);
    let mut backward = x.clone();
    backward.scaled_add(-eps, v);

    let gp = gradient(&forward)?;
    ensure_dim("hessian-vector gradient", x.len(), gp.len())?;
    let gm = gradient(&backward)?;
    ensure_dim("hessian-vector gradient", x.len(), gm.len())?;
    Ok((gp - gm) / (2.0 * eps))
}
