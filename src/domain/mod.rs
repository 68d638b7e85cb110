//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - raw inputs (`RawObservation`, `PredictionRecord`)
//! - intermediate buckets (`AggregatedPoint`)
//! - the chart-ready output record (`ChartPoint`)
//! - configuration enums (`Unit`, `BucketPolicy`, `Granularity`)

pub mod types;

pub use types::*;
