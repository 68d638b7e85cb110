//! `nowcast-chart` library crate.
//!
//! The binary (`nowcast`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the pipeline is shared by the CLI, the TUI and exports
//! - code stays easy to navigate as the project grows
//!
//! Data flows one way: `data` -> `normalize` -> `aggregate` / `horizon` ->
//! `merge`, orchestrated by `app::pipeline`.

pub mod aggregate;
pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod horizon;
pub mod io;
pub mod merge;
pub mod normalize;
pub mod plot;
pub mod report;
pub mod tui;
