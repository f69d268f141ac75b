// ─────────────────────────────────────────────────────────────────────
// Symplectic HNN — Learning
// © 2021–2026 Symplectic HNN contributors.
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Hamiltonian neural networks trained through an integration scheme.
//!
//! An MLP learns a scalar `H_θ`; the scheme loss asks one step of the
//! chosen scheme to reproduce observed state pairs. Trained networks are
//! stored as JSON next to the config that produced them.

pub mod hnn;
pub mod loss;
pub mod mlp;
pub mod optim;
pub mod persistence;
pub mod train;
