//! Library half of the `shnn` binary: argument types, plot data export
//! and the experiment sweep.

pub mod cli;
pub mod plot;
pub mod sweep;
