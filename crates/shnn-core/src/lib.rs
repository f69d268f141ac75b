//! Hamiltonian vector fields, integration schemes and integrators.
//!
//! - [`vector_field`]: model capability and analytic linear systems
//! - [`scheme`]: euler-forw / euler-symp / midpoint evaluation points
//! - [`integrator`]: fixed-step custom integrator (fixed-point solve per step)
//! - [`reference`]: adaptive RK45 reference trajectories

pub mod integrator;
pub mod reference;
pub mod scheme;
pub mod vector_field;
