//! Numerical primitives for Symplectic HNN.

pub mod diff;
pub mod fixed_point;
pub mod symplectic;
