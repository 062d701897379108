//! Configuration types for the imputation engine.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic engine setup.

use crate::types::FillValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Default prefix prepended to missingness indicator column names.
pub const DEFAULT_PREFIX: &str = "miss_";

/// Default number of neighbors for joint KNN imputation.
pub const DEFAULT_KNN_NEIGHBORS: usize = 5;

/// How missing values are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImputationType {
    /// Per-column statistic: mode for categorical, median for numeric/boolean.
    #[default]
    Standard,
    /// Joint nearest-neighbor imputation over all numeric columns.
    /// Numeric columns come back centered and scaled.
    Knn,
}

impl ImputationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Knn => "knn",
        }
    }
}

impl fmt::Display for ImputationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImputationType {
    type Err = ConfigValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "knn" => Ok(Self::Knn),
            _ => Err(ConfigValidationError::UnknownImputationType(s.to_string())),
        }
    }
}

/// Configuration for the imputation engine.
///
/// Use [`ImputeConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use lex_impute::config::{ImputeConfig, ImputationType};
///
/// let config = ImputeConfig::builder()
///     .imputation_type(ImputationType::Standard)
///     .prefix("na_")
///     .skip_var("id")
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImputeConfig {
    /// Imputation strategy.
    /// Default: Standard
    #[serde(rename = "type")]
    pub imputation_type: ImputationType,

    /// Whether to append missingness indicator columns.
    /// Default: true
    pub add_indicators: bool,

    /// Prefix prepended to the original column name for each indicator.
    /// Default: "miss_"
    pub prefix: String,

    /// Columns that are never inspected for missingness and never imputed.
    /// They remain in the output untouched.
    /// Default: empty
    pub skip_vars: Vec<String>,

    /// Compute a fill value for every non-skipped column, even those without
    /// missing data. Does not change which indicators are built.
    /// Default: false
    pub all_vars: bool,

    /// Drop indicator columns that are all-0 or all-1.
    /// Default: true
    pub remove_constant: bool,

    /// Drop indicator columns identical to an earlier retained indicator.
    /// Default: true
    pub remove_collinear: bool,

    /// Precomputed fill values, used verbatim instead of mode/median.
    /// Default: empty
    pub values: BTreeMap<String, FillValue>,

    /// Emit progress messages at info level. No behavioral effect.
    /// Default: false
    pub verbose: bool,

    /// Number of neighbors for KNN imputation.
    /// Default: 5
    pub knn_neighbors: usize,
}

impl Default for ImputeConfig {
    fn default() -> Self {
        Self {
            imputation_type: ImputationType::default(),
            add_indicators: true,
            prefix: DEFAULT_PREFIX.to_string(),
            skip_vars: Vec::new(),
            all_vars: false,
            remove_constant: true,
            remove_collinear: true,
            values: BTreeMap::new(),
            verbose: false,
            knn_neighbors: DEFAULT_KNN_NEIGHBORS,
        }
    }
}

impl ImputeConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ImputeConfigBuilder {
        ImputeConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.prefix.is_empty() {
            return Err(ConfigValidationError::EmptyPrefix);
        }

        if self.knn_neighbors == 0 {
            return Err(ConfigValidationError::InvalidKnnNeighbors(
                self.knn_neighbors,
            ));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Unknown imputation type '{0}' (expected 'standard' or 'knn')")]
    UnknownImputationType(String),

    #[error("Indicator prefix must not be empty")]
    EmptyPrefix,

    #[error("Invalid KNN neighbors: {0} (must be at least 1)")]
    InvalidKnnNeighbors(usize),
}

/// Builder for [`ImputeConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct ImputeConfigBuilder {
    imputation_type: Option<ImputationType>,
    add_indicators: Option<bool>,
    prefix: Option<String>,
    skip_vars: Vec<String>,
    all_vars: Option<bool>,
    remove_constant: Option<bool>,
    remove_collinear: Option<bool>,
    values: BTreeMap<String, FillValue>,
    verbose: Option<bool>,
    knn_neighbors: Option<usize>,
}

impl ImputeConfigBuilder {
    /// Set the imputation strategy.
    pub fn imputation_type(mut self, imputation_type: ImputationType) -> Self {
        self.imputation_type = Some(imputation_type);
        self
    }

    /// Enable or disable missingness indicator columns.
    pub fn add_indicators(mut self, add: bool) -> Self {
        self.add_indicators = Some(add);
        self
    }

    /// Set the indicator column prefix.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Add a single column to the skip list.
    pub fn skip_var(mut self, column: impl Into<String>) -> Self {
        self.skip_vars.push(column.into());
        self
    }

    /// Add several columns to the skip list.
    pub fn skip_vars<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_vars.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Compute fill values for every non-skipped column.
    pub fn all_vars(mut self, all: bool) -> Self {
        self.all_vars = Some(all);
        self
    }

    /// Enable or disable constant indicator removal.
    pub fn remove_constant(mut self, remove: bool) -> Self {
        self.remove_constant = Some(remove);
        self
    }

    /// Enable or disable duplicate indicator removal.
    pub fn remove_collinear(mut self, remove: bool) -> Self {
        self.remove_collinear = Some(remove);
        self
    }

    /// Supply a precomputed fill value for a column.
    pub fn value(mut self, column: impl Into<String>, value: FillValue) -> Self {
        self.values.insert(column.into(), value);
        self
    }

    /// Supply several precomputed fill values.
    pub fn values(mut self, values: BTreeMap<String, FillValue>) -> Self {
        self.values.extend(values);
        self
    }

    /// Enable or disable verbose progress messages.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    /// Set the number of neighbors for KNN imputation.
    pub fn knn_neighbors(mut self, k: usize) -> Self {
        self.knn_neighbors = Some(k);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `ImputeConfig` or an error if validation fails.
    pub fn build(self) -> Result<ImputeConfig, ConfigValidationError> {
        let config = ImputeConfig {
            imputation_type: self.imputation_type.unwrap_or_default(),
            add_indicators: self.add_indicators.unwrap_or(true),
            prefix: self.prefix.unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            skip_vars: self.skip_vars,
            all_vars: self.all_vars.unwrap_or(false),
            remove_constant: self.remove_constant.unwrap_or(true),
            remove_collinear: self.remove_collinear.unwrap_or(true),
            values: self.values,
            verbose: self.verbose.unwrap_or(false),
            knn_neighbors: self.knn_neighbors.unwrap_or(DEFAULT_KNN_NEIGHBORS),
        };

        config.validate()?;
        Ok(config)
    }
}
