//! Descriptive statistics used to resolve fill values.
//!
//! Both functions ignore missing cells.

use crate::error::Result;
use polars::prelude::*;
use std::collections::HashMap;

/// Values tied for the highest frequency, in order of first appearance.
///
/// Every dtype is compared through its string form, so this works for
/// strings, categoricals, enums and any other castable column. Returns an
/// empty vector when the column has no observed values.
pub fn modes(series: &Series) -> Result<Vec<String>> {
    let non_null = series.drop_nulls();
    if non_null.is_empty() {
        return Ok(Vec::new());
    }

    let strings = non_null.cast(&DataType::String)?;
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for val in strings.str()?.into_iter().flatten() {
        let count = counts.entry(val).or_insert_with(|| {
            order.push(val);
            0
        });
        *count += 1;
    }

    let max_count = counts.values().copied().max().unwrap_or(0);
    Ok(order
        .into_iter()
        .filter(|val| counts.get(val) == Some(&max_count))
        .map(str::to_string)
        .collect())
}

/// Median of the observed values, cast to Float64.
///
/// NaN is an observed value but has no magnitude, so it is left out together
/// with nulls. Boolean columns are counted as 0/1. Returns `None` when nothing
/// is left.
pub fn median(series: &Series) -> Result<Option<f64>> {
    let floats = series.cast(&DataType::Float64)?;
    let ca = floats.f64()?;
    let observed = ca.filter(&ca.is_not_nan())?;
    Ok(observed.median())
}
