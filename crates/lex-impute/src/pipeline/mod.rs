//! Pipeline module.
//!
//! This module provides the imputation pipeline and the missingness indicator
//! builder it drives.

mod builder;
pub mod indicators;

pub use builder::{ImputationPipeline, ImputationPipelineBuilder, impute};
pub use indicators::IndicatorBuilder;
