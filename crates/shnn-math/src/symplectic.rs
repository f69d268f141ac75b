//! Canonical symplectic form for Hamiltonian vector fields.
//!
//! States are laid out as `(p, q)`: the first half holds momenta, the second
//! half positions. With `J = [[0, I], [-I, 0]]` the Hamiltonian vector field is
//! `Jᵀ ∇H = (-∂H/∂q, ∂H/∂p)`.

use ndarray::{s, Array1, Array2, ArrayView1};
use shnn_types::error::{ensure_dim, ShnnError, ShnnResult};

/// Antisymmetric orthogonal matrix `J` with `Jᵀ = -J = J⁻¹`.
///
/// Built once per dimension and only ever read afterwards, so a single
/// instance can be shared between threads.
#[derive(Debug, Clone, PartialEq)]
pub struct SymplecticForm {
    dim: usize,
    matrix: Array2<f64>,
}

impl SymplecticForm {
    pub fn new(dim: usize) -> ShnnResult<Self> {
        if dim == 0 || dim % 2 != 0 {
            let nearest_even = if dim == 0 { 2 } else { dim + 1 };
            return Err(ShnnError::shape(
                "symplectic form (dimension must be even and > 0)",
                nearest_even,
                dim,
            ));
        }
        let n = dim / 2;
        let mut matrix = Array2::zeros((dim, dim));
        for i in 0..n {
            matrix[[i, n + i]] = 1.0;
            matrix[[n + i, i]] = -1.0;
        }
        Ok(SymplecticForm { dim, matrix })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    /// `Jᵀ ∇H` for a single gradient.
    pub fn vector_field(&self, gradient: ArrayView1<'_, f64>) -> ShnnResult<Array1<f64>> {
        ensure_dim("symplectic gradient", self.dim, gradient.len())?;
        Ok(self.matrix.t().dot(&gradient))
    }

    /// Row-wise `Jᵀ ∇H` for a batch of gradients `[n, dim]`.
    pub fn vector_field_rows(&self, gradients: &Array2<f64>) -> ShnnResult<Array2<f64>> {
        ensure_dim("symplectic gradient batch", self.dim, gradients.ncols())?;
        // (Jᵀ g)ᵀ = gᵀ J
        Ok(gradients.dot(&self.matrix))
    }
}

/// Momentum block `p` of a `(p, q)` state.
pub fn momenta(state: ArrayView1<'_, f64>) -> ArrayView1<'_, f64> {
    let n = state.len() / 2;
    state.slice_move(s![..n])
}

/// Position block `q` of a `(p, q)` state.
pub fn positions(state: ArrayView1<'_, f64>) -> ArrayView1<'_, f64> {
    let n = state.len() / 2;
    state.slice_move(s![n..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn max_abs(a: &Array2<f64>) -> f64 {
        a.iter().fold(0.0_f64, |m, v| m.max(v.abs()))
    }

    #[test]
    fn test_form_is_antisymmetric_and_orthogonal() {
        for dim in [2, 4, 6, 10] {
            let j = SymplecticForm::new(dim).unwrap();
            let m = j.matrix();
            let eye = Array2::<f64>::eye(dim);
            assert!(max_abs(&(&m.t() + m)) < 1e-15, "Jᵀ != -J for dim {dim}");
            assert!(max_abs(&(&m.dot(&m.t()) - &eye)) < 1e-15, "J Jᵀ != I for dim {dim}");
            assert!(max_abs(&(&m.dot(m) + &eye)) < 1e-15, "J² != -I for dim {dim}");
        }
    }

    #[test]
    fn test_odd_dimension_is_shape_error() {
        assert!(matches!(SymplecticForm::new(3), Err(ShnnError::Shape { .. })));
        assert!(matches!(SymplecticForm::new(0), Err(ShnnError::Shape { .. })));
    }

    #[test]
    fn test_vector_field_gives_hamilton_equations() {
        // H = ½(p² + q²), ∇H = (p, q) → (ṗ, q̇) = (-q, p)
        let j = SymplecticForm::new(2).unwrap();
        let grad = array![0.3, -1.2];
        let f = j.vector_field(grad.view()).unwrap();
        assert_eq!(f, array![1.2, 0.3]);
    }

    #[test]
    fn test_vector_field_rows_matches_single() {
        let j = SymplecticForm::new(4).unwrap();
        let grads = array![[1.0, 2.0, 3.0, 4.0], [-0.5, 0.1, 0.7, -2.0]];
        let rows = j.vector_field_rows(&grads).unwrap();
        for (i, g) in grads.outer_iter().enumerate() {
            assert_eq!(rows.row(i), j.vector_field(g).unwrap().view());
        }
    }

    #[test]
    fn test_vector_field_checks_dimension() {
        let j = SymplecticForm::new(2).unwrap();
        let grad = array![1.0, 2.0, 3.0];
        assert!(matches!(
            j.vector_field(grad.view()),
            Err(ShnnError::Shape { expected: 2, found: 3, .. })
        ));
    }

    #[test]
    fn test_blocks() {
        let x = array![1.0, 2.0, 3.0, 4.0];
        assert_eq!(momenta(x.view()), array![1.0, 2.0].view());
        assert_eq!(positions(x.view()), array![3.0, 4.0].view());
    }
}
