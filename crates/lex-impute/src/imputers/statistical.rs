//! Per-column statistical imputation.
//!
//! Resolves one fill value per candidate column (supplied value, else mode for
//! categorical columns, else median for numeric and boolean columns) and writes
//! it into that column's missing cells.

use crate::error::{ImputeError, Result, ResultExt};
use crate::types::{ColumnKind, ColumnSpec, FillValue, ImputeWarning};
use crate::utils::{
    fill_boolean_nulls, fill_numeric_nulls, fill_string_nulls, fits_integer_dtype,
    is_integer_dtype, log_step,
};
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::warn;

/// Standard-mode imputer: one statistic per column.
#[derive(Debug, Clone, Default)]
pub struct StatisticalImputer {
    all_vars: bool,
    verbose: bool,
}

impl StatisticalImputer {
    pub fn new(all_vars: bool) -> Self {
        Self {
            all_vars,
            verbose: false,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Impute every candidate column of `df` in place and return the resolved
    /// fill values.
    ///
    /// Candidates are the non-excluded columns with missing values, or every
    /// non-excluded column when `all_vars` is set. Supplied values for columns
    /// that are not candidates are ignored.
    pub fn impute(
        &self,
        df: &mut DataFrame,
        specs: &[ColumnSpec],
        supplied: &BTreeMap<String, FillValue>,
        warnings: &mut Vec<ImputeWarning>,
        processing_steps: &mut Vec<String>,
    ) -> Result<BTreeMap<String, FillValue>> {
        let height = df.height();
        let mut values = BTreeMap::new();

        for spec in specs.iter().filter(|s| self.is_candidate(s)) {
            let col = &spec.name;

            if spec.kind == ColumnKind::Unsupported {
                if spec.missing_count > 0 {
                    let warning = ImputeWarning::UnsupportedType {
                        column: col.clone(),
                        dtype: spec.dtype.clone(),
                    };
                    warn!("{}", warning);
                    warnings.push(warning);
                } else {
                    log_step(
                        self.verbose,
                        &format!("Skipping '{}': dtype {} has no fill rule", col, spec.dtype),
                    );
                }
                continue;
            }

            let Some(value) = self.resolve_fill_value(df, spec, supplied)? else {
                if spec.missing_count == height && height > 0 {
                    let warning = ImputeWarning::EntirelyMissing {
                        column: col.clone(),
                        fill_value: None,
                    };
                    warn!("{}", warning);
                    warnings.push(warning);
                }
                continue;
            };

            if spec.missing_count == height && height > 0 {
                let warning = ImputeWarning::EntirelyMissing {
                    column: col.clone(),
                    fill_value: Some(value.clone()),
                };
                warn!("{}", warning);
                warnings.push(warning);
            } else if spec.missing_count > 0 {
                Self::apply_fill(df, col, spec.kind, &value)
                    .context(format!("Filling column '{}'", col))?;
                let step = format!(
                    "Filled {} missing value(s) in '{}' with {}",
                    spec.missing_count, col, value
                );
                log_step(self.verbose, &step);
                processing_steps.push(step);
            } else {
                log_step(
                    self.verbose,
                    &format!("Recorded fill value {} for complete column '{}'", value, col),
                );
            }

            values.insert(col.clone(), value);
        }

        Ok(values)
    }

    fn is_candidate(&self, spec: &ColumnSpec) -> bool {
        !spec.excluded && (self.all_vars || spec.missing_count > 0)
    }

    /// Supplied value first, used verbatim; otherwise the column kind's statistic.
    fn resolve_fill_value(
        &self,
        df: &DataFrame,
        spec: &ColumnSpec,
        supplied: &BTreeMap<String, FillValue>,
    ) -> Result<Option<FillValue>> {
        if let Some(value) = supplied.get(&spec.name) {
            if !spec.kind.accepts(value) {
                return Err(ImputeError::FillValueMismatch {
                    column: spec.name.clone(),
                    expected: spec.kind.to_string(),
                    found: value.kind_name().to_string(),
                });
            }
            return Ok(Some(value.clone()));
        }

        let series = df
            .column(&spec.name)
            .map_err(|_| ImputeError::ColumnNotFound(spec.name.clone()))?
            .as_materialized_series();
        spec.kind.compute_fill(series)
    }

    /// Write `value` into the missing cells of `col_name`.
    pub fn apply_fill(
        df: &mut DataFrame,
        col_name: &str,
        kind: ColumnKind,
        value: &FillValue,
    ) -> Result<()> {
        let series = df
            .column(col_name)
            .map_err(|_| ImputeError::ColumnNotFound(col_name.to_string()))?
            .as_materialized_series();

        let filled = match (kind, value) {
            (ColumnKind::Numeric, FillValue::Numeric(v))
                if is_integer_dtype(series.dtype())
                    && v.fract() == 0.0
                    && !fits_integer_dtype(series.dtype(), *v) =>
            {
                return Err(ImputeError::FillValueMismatch {
                    column: col_name.to_string(),
                    expected: format!("a value within the range of {}", series.dtype()),
                    found: value.to_string(),
                });
            }
            (ColumnKind::Numeric, FillValue::Numeric(v)) => fill_numeric_nulls(series, *v)?,
            (ColumnKind::Boolean, FillValue::Boolean(b)) => fill_boolean_nulls(series, *b)?,
            (ColumnKind::Categorical, FillValue::Categorical(s)) => fill_string_nulls(series, s)?,
            _ => {
                return Err(ImputeError::FillValueMismatch {
                    column: col_name.to_string(),
                    expected: kind.to_string(),
                    found: value.kind_name().to_string(),
                });
            }
        };

        df.replace(col_name, filled)?;
        Ok(())
    }
}
