// ─────────────────────────────────────────────────────────────────────
// Symplectic HNN — Types
// © 2021–2026 Symplectic HNN contributors.
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
pub mod config;
pub mod error;
pub mod state;
