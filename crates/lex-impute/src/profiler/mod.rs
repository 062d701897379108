//! Column profiling for missingness.
//!
//! This module derives the per-call [`ColumnSpec`]s:
//! - Column kind classification (numeric, boolean, categorical, unsupported)
//! - Missing-value counts for non-excluded columns
//! - The post-skip missing-column set that drives indicator construction

pub mod statistics;

use crate::types::{ColumnKind, ColumnSpec};
use crate::utils::dtype_name;
use polars::prelude::*;

/// Derives column specs from a table and a skip list.
pub struct ColumnProfiler;

impl ColumnProfiler {
    /// Profile every column of `df`, in column order.
    ///
    /// Columns named in `skip_vars` are marked excluded and never inspected.
    /// Skip-list entries that name no column are ignored.
    pub fn profile(df: &DataFrame, skip_vars: &[String]) -> Vec<ColumnSpec> {
        df.get_columns()
            .iter()
            .map(|col| {
                let name = col.name().to_string();
                let excluded = skip_vars.iter().any(|s| *s == name);
                ColumnSpec {
                    dtype: dtype_name(col.dtype()),
                    kind: ColumnKind::from_dtype(col.dtype()),
                    missing_count: if excluded { 0 } else { col.null_count() },
                    excluded,
                    name,
                }
            })
            .collect()
    }

    /// Names of non-excluded columns with at least one missing value.
    pub fn missing_columns(specs: &[ColumnSpec]) -> Vec<String> {
        specs
            .iter()
            .filter(|spec| spec.has_missing())
            .map(|spec| spec.name.clone())
            .collect()
    }
}
