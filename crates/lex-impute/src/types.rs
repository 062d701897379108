use crate::config::{ImputationType, ImputeConfig};
use crate::error::Result;
use crate::imputers::KnnModel;
use crate::profiler::statistics;
use crate::utils::{is_categorical_dtype, is_numeric_dtype};
use polars::prelude::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

// ============================================================================
// Column classification
// ============================================================================

/// How a column is treated for imputation, derived from its dtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Integer or floating point numbers. Filled with the median.
    Numeric,
    /// Boolean values. Filled with the median of the 0/1 encoding.
    Boolean,
    /// String, categorical and enum values. Filled with the first mode.
    Categorical,
    /// Anything else (dates, lists, structs, ...). Never imputed.
    Unsupported,
}

impl ColumnKind {
    pub fn from_dtype(dtype: &DataType) -> Self {
        if is_numeric_dtype(dtype) {
            Self::Numeric
        } else if matches!(dtype, DataType::Boolean) {
            Self::Boolean
        } else if is_categorical_dtype(dtype) {
            Self::Categorical
        } else {
            Self::Unsupported
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Boolean => "boolean",
            Self::Categorical => "categorical",
            Self::Unsupported => "unsupported",
        }
    }

    /// Compute this kind's fill value from the non-missing cells of `series`.
    ///
    /// Returns `None` when the column has no observed values or the kind is
    /// [`ColumnKind::Unsupported`].
    pub fn compute_fill(&self, series: &Series) -> Result<Option<FillValue>> {
        let value = match self {
            Self::Numeric => statistics::median(series)?.map(FillValue::Numeric),
            Self::Boolean => {
                statistics::median(series)?.map(|m| FillValue::Boolean(m >= 0.5))
            }
            Self::Categorical => statistics::modes(series)?
                .into_iter()
                .next()
                .map(FillValue::Categorical),
            Self::Unsupported => None,
        };
        Ok(value)
    }

    /// Check whether `value` can be written into a column of this kind.
    pub fn accepts(&self, value: &FillValue) -> bool {
        matches!(
            (self, value),
            (Self::Numeric, FillValue::Numeric(_))
                | (Self::Boolean, FillValue::Boolean(_))
                | (Self::Categorical, FillValue::Categorical(_))
        )
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-column facts derived fresh on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub dtype: String,
    pub kind: ColumnKind,
    /// Always 0 for excluded columns, which are never inspected.
    pub missing_count: usize,
    pub excluded: bool,
}

impl ColumnSpec {
    pub fn has_missing(&self) -> bool {
        !self.excluded && self.missing_count > 0
    }
}

// ============================================================================
// Fill values and plans
// ============================================================================

/// A scalar fill value, typed to match the column it fills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillValue {
    Numeric(f64),
    Boolean(bool),
    Categorical(String),
}

impl FillValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Numeric(_) => "numeric",
            Self::Boolean(_) => "boolean",
            Self::Categorical(_) => "categorical",
        }
    }
}

impl fmt::Display for FillValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(v) => write!(f, "{}", v),
            Self::Boolean(v) => write!(f, "{}", v),
            Self::Categorical(v) => write!(f, "'{}'", v),
        }
    }
}

/// The reusable artifact that lets an imputation be replayed on new data.
///
/// A standard plan carries one fill value per column. A knn plan carries the
/// fitted state of the joint imputer (by default a [`KnnModel`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ImputationPlan<S = KnnModel> {
    Standard { values: BTreeMap<String, FillValue> },
    Knn { model: S },
}

impl<S> ImputationPlan<S> {
    pub fn imputation_type(&self) -> ImputationType {
        match self {
            Self::Standard { .. } => ImputationType::Standard,
            Self::Knn { .. } => ImputationType::Knn,
        }
    }

    pub fn fill_values(&self) -> Option<&BTreeMap<String, FillValue>> {
        match self {
            Self::Standard { values } => Some(values),
            Self::Knn { .. } => None,
        }
    }

    pub fn fill_value(&self, column: &str) -> Option<&FillValue> {
        self.fill_values().and_then(|values| values.get(column))
    }
}

impl<S: Serialize + DeserializeOwned> ImputationPlan<S> {
    /// Write the plan as pretty-printed JSON.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Read a plan previously written by [`save_json`](Self::save_json).
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

// ============================================================================
// Warnings and outcome
// ============================================================================

/// A per-column problem that was recovered locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImputeWarning {
    /// Column dtype has no fill rule; its missing values stay missing.
    UnsupportedType { column: String, dtype: String },
    /// Every cell is missing, so nothing was applied.
    EntirelyMissing {
        column: String,
        fill_value: Option<FillValue>,
    },
    /// The joint imputer left this column's missing values in place.
    NotImputed { column: String, dtype: String },
    /// Joint imputation returned these columns centered and scaled.
    ScaleNotPreserved { columns: Vec<String> },
}

impl ImputeWarning {
    pub fn column(&self) -> Option<&str> {
        match self {
            Self::UnsupportedType { column, .. }
            | Self::EntirelyMissing { column, .. }
            | Self::NotImputed { column, .. } => Some(column),
            Self::ScaleNotPreserved { .. } => None,
        }
    }
}

impl fmt::Display for ImputeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedType { column, dtype } => write!(
                f,
                "Column '{}' has dtype {} which cannot be imputed; missing values left in place",
                column, dtype
            ),
            Self::EntirelyMissing { column, fill_value } => match fill_value {
                Some(value) => write!(
                    f,
                    "Column '{}' is entirely missing; fill value {} recorded but not applied",
                    column, value
                ),
                None => write!(
                    f,
                    "Column '{}' is entirely missing; no fill value could be computed",
                    column
                ),
            },
            Self::NotImputed { column, dtype } => write!(
                f,
                "Column '{}' ({}) was skipped by the joint imputer; missing values left in place",
                column, dtype
            ),
            Self::ScaleNotPreserved { columns } => write!(
                f,
                "Joint imputation centered and scaled {} numeric column(s): {}",
                columns.len(),
                columns.join(", ")
            ),
        }
    }
}

/// Everything a call to the engine produces.
#[derive(Debug, Clone)]
pub struct ImputeOutcome<S = KnnModel> {
    /// Input columns with missing cells filled.
    pub imputed: DataFrame,
    /// Surviving indicator columns, possibly zero columns wide.
    pub indicators: DataFrame,
    /// `imputed` with `indicators` appended column-wise.
    pub combined: DataFrame,
    pub plan: ImputationPlan<S>,
    /// Configuration the call ran with.
    pub config: ImputeConfig,
    /// Non-skipped columns that had at least one missing value.
    pub missing_columns: Vec<String>,
    pub warnings: Vec<ImputeWarning>,
    pub processing_steps: Vec<String>,
}

impl<S> ImputeOutcome<S> {
    pub fn indicator_names(&self) -> Vec<String> {
        self.indicators
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Serializable digest of the outcome, without the tables.
    pub fn summary(&self) -> OutcomeSummary {
        OutcomeSummary {
            imputation_type: self.plan.imputation_type(),
            rows: self.combined.height(),
            columns: self.combined.width(),
            missing_columns: self.missing_columns.clone(),
            indicator_columns: self.indicator_names(),
            fill_values: self.plan.fill_values().cloned(),
            remaining_missing: self
                .imputed
                .get_columns()
                .iter()
                .map(|col| col.null_count())
                .sum(),
            warnings: self.warnings.clone(),
            processing_steps: self.processing_steps.clone(),
        }
    }
}

/// JSON-friendly summary of an [`ImputeOutcome`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeSummary {
    pub imputation_type: ImputationType,
    pub rows: usize,
    pub columns: usize,
    pub missing_columns: Vec<String>,
    pub indicator_columns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_values: Option<BTreeMap<String, FillValue>>,
    pub remaining_missing: usize,
    pub warnings: Vec<ImputeWarning>,
    pub processing_steps: Vec<String>,
}
