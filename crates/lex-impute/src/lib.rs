//! Missing-Value Imputation Library
//!
//! A missing-value imputation engine for tabular data built with Rust and Polars.
//!
//! # Overview
//!
//! Given a [`DataFrame`](polars::prelude::DataFrame) that contains missing cells, the
//! engine produces:
//!
//! - **An imputed table**: every missing cell filled, column order and row count kept
//! - **Missingness indicators**: one 0/1 column per originally-missing column, with
//!   constant and duplicate indicators removed
//! - **A reusable plan**: the fill values (or fitted joint-imputer state) so the exact
//!   same transformation can be replayed on new data
//!
//! Two strategies are available:
//!
//! - **Standard**: median for numeric and boolean columns, mode for categorical columns
//! - **KNN**: joint imputation over the numeric columns behind the
//!   [`JointImputer`](imputers::JointImputer) trait
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_impute::{ImputationPipeline, ImputeConfig};
//! use polars::prelude::*;
//!
//! let train = CsvReadOptions::default()
//!     .try_into_reader_with_file_path(Some("train.csv".into()))?
//!     .finish()?;
//!
//! let pipeline = ImputationPipeline::builder()
//!     .config(ImputeConfig::builder().skip_var("id").build()?)
//!     .build()?;
//!
//! let outcome = pipeline.process(train)?;
//! println!("Indicators: {:?}", outcome.indicator_names());
//!
//! // Persist the plan and replay it on held-out data
//! outcome.plan.save_json("plan.json")?;
//! let replayed = pipeline.replay(&outcome.plan, test)?;
//! ```
//!
//! # Configuration
//!
//! Use [`ImputeConfig`] to customize imputation behavior:
//!
//! ```rust,ignore
//! use lex_impute::{FillValue, ImputationType, ImputeConfig};
//!
//! let config = ImputeConfig::builder()
//!     .imputation_type(ImputationType::Knn)
//!     .knn_neighbors(3)
//!     .prefix("was_na_")
//!     .remove_collinear(false)
//!     .value("age", FillValue::Numeric(40.0))
//!     .build()?;
//! ```
//!
//! # Custom joint imputers
//!
//! Any type implementing [`JointImputer`](imputers::JointImputer) can replace the
//! default KNN imputer:
//!
//! ```rust,ignore
//! let pipeline = ImputationPipeline::builder()
//!     .config(config)
//!     .joint_imputer(MyImputer::default())
//!     .build()?;
//! ```

pub mod config;
pub mod error;
pub mod imputers;
pub mod pipeline;
pub mod profiler;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use config::{
    ConfigValidationError, DEFAULT_KNN_NEIGHBORS, DEFAULT_PREFIX, ImputationType, ImputeConfig,
    ImputeConfigBuilder,
};
pub use error::{ImputeError, Result as ImputeResult, ResultExt};
pub use imputers::{JointImputer, KNNImputer, KnnModel, StatisticalImputer};
pub use pipeline::{ImputationPipeline, ImputationPipelineBuilder, IndicatorBuilder, impute};
pub use profiler::ColumnProfiler;
pub use types::{
    ColumnKind, ColumnSpec, FillValue, ImputationPlan, ImputeOutcome, ImputeWarning,
    OutcomeSummary,
};
pub use utils::{fill_numeric_nulls, fill_string_nulls, is_numeric_dtype};
