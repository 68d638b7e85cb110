//! Unit and date normalization.
//!
//! Pure functions, no state:
//!
//! - linear magnitude rescaling between fixed units (`units`)
//! - upstream date strings to timezone-naive calendar dates (`dates`)
//! - short display labels for chart points (`labels`)

pub mod dates;
pub mod labels;
pub mod units;

pub use dates::*;
pub use labels::*;
pub use units::*;
