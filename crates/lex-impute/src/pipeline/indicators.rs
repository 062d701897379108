//! Missingness indicator construction.
//!
//! Builds one 0/1 column per originally-missing column, then drops indicators
//! that carry no information (constant) or repeat an earlier one (collinear).

use crate::config::ImputeConfig;
use crate::error::{ImputeError, Result};
use crate::utils::null_mask;
use polars::prelude::*;
use tracing::debug;

/// Builds missingness indicator columns from the original table.
#[derive(Debug, Clone)]
pub struct IndicatorBuilder {
    prefix: String,
    remove_constant: bool,
    remove_collinear: bool,
}

impl IndicatorBuilder {
    /// Create a builder with both filters enabled.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            remove_constant: true,
            remove_collinear: true,
        }
    }

    pub fn from_config(config: &ImputeConfig) -> Self {
        Self::new(config.prefix.clone())
            .remove_constant(config.remove_constant)
            .remove_collinear(config.remove_collinear)
    }

    pub fn remove_constant(mut self, remove: bool) -> Self {
        self.remove_constant = remove;
        self
    }

    pub fn remove_collinear(mut self, remove: bool) -> Self {
        self.remove_collinear = remove;
        self
    }

    /// Name of the indicator column for `column`.
    pub fn indicator_name(&self, column: &str) -> String {
        format!("{}{}", self.prefix, column)
    }

    /// Build indicators for `columns` of `df`, in the given order.
    ///
    /// The result has one `Int32` column per surviving indicator and is zero
    /// columns wide when nothing survives. `df` is never modified.
    pub fn build(
        &self,
        df: &DataFrame,
        columns: &[String],
        processing_steps: &mut Vec<String>,
    ) -> Result<DataFrame> {
        let mut patterns: Vec<(String, Vec<bool>)> = Vec::with_capacity(columns.len());
        for col_name in columns {
            let series = df
                .column(col_name)
                .map_err(|_| ImputeError::ColumnNotFound(col_name.clone()))?
                .as_materialized_series();
            patterns.push((col_name.clone(), null_mask(series)));
        }

        if self.remove_constant {
            let before = patterns.len();
            patterns.retain(|(col_name, mask)| {
                let constant = Self::is_constant(mask);
                if constant {
                    debug!("Dropping constant indicator for '{}'", col_name);
                }
                !constant
            });
            let dropped = before - patterns.len();
            if dropped > 0 {
                processing_steps.push(format!("Removed {} constant indicator(s)", dropped));
            }
        }

        if self.remove_collinear {
            let mut retained: Vec<(String, Vec<bool>)> = Vec::with_capacity(patterns.len());
            for (col_name, mask) in patterns {
                match retained.iter().find(|(_, kept)| *kept == mask) {
                    Some((kept_name, _)) => {
                        debug!(
                            "Dropping indicator for '{}': identical to '{}'",
                            col_name, kept_name
                        );
                        processing_steps.push(format!(
                            "Removed indicator for '{}' (collinear with '{}')",
                            col_name, kept_name
                        ));
                    }
                    None => retained.push((col_name, mask)),
                }
            }
            patterns = retained;
        }

        let indicator_columns: Vec<Column> = patterns
            .into_iter()
            .map(|(col_name, mask)| {
                let values: Vec<i32> = mask.into_iter().map(i32::from).collect();
                Column::from(Series::new(self.indicator_name(&col_name).into(), values))
            })
            .collect();

        if !indicator_columns.is_empty() {
            processing_steps.push(format!(
                "Added {} missingness indicator(s)",
                indicator_columns.len()
            ));
        }

        Ok(DataFrame::new(indicator_columns)?)
    }

    /// All-0 or all-1. An empty mask counts as constant.
    fn is_constant(mask: &[bool]) -> bool {
        mask.windows(2).all(|w| w[0] == w[1])
    }
}
