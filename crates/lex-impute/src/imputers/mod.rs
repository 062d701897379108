//! Imputation module for handling missing values.
//!
//! This module provides two structurally different strategies:
//! - Statistical imputation (median for numeric/boolean, mode for categorical)
//! - Joint imputation behind the [`JointImputer`] trait, with KNN as the default

mod knn;
mod statistical;

use crate::config::ImputeConfig;
use crate::error::Result;
use polars::prelude::*;
use std::fmt::Debug;

pub use knn::{KNNImputer, KnnModel};
pub use statistical::StatisticalImputer;

/// A multivariate imputer that fits on one table and can replay the fitted
/// transform on another.
///
/// Implementations fill missing cells using information from all columns at
/// once. They may standardize numeric columns; callers are told that scale is
/// not preserved. Columns an implementation does not handle must be returned
/// unchanged, and the row count must never change.
///
/// # Example
///
/// ```rust,ignore
/// use lex_impute::imputers::{JointImputer, KNNImputer};
///
/// let imputer = KNNImputer::new(5);
/// let (train_imputed, model) = imputer.fit(&train)?;
/// let test_imputed = imputer.apply(&model, &test)?;
/// ```
pub trait JointImputer {
    /// Fitted state, stored verbatim in the imputation plan.
    type Fitted: Clone + Debug;

    /// Construct the imputer from engine configuration, used when the
    /// pipeline builder is not given an explicit instance.
    fn from_config(config: &ImputeConfig) -> Self
    where
        Self: Sized;

    /// Short identifier used in log messages.
    fn name(&self) -> &'static str;

    /// Fit on `df` and return the imputed table with the fitted state.
    fn fit(&self, df: &DataFrame) -> Result<(DataFrame, Self::Fitted)>;

    /// Transform `df` with previously fitted state.
    fn apply(&self, fitted: &Self::Fitted, df: &DataFrame) -> Result<DataFrame>;
}
