//! Dataset problems and pair sampling for Symplectic HNN.

pub mod loader;
pub mod systems;
