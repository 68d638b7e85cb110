//! Input/output helpers.
//!
//! - chart exports (JSON/CSV) (`export`)

pub mod export;

pub use export::*;
