//! Shared utilities for the imputation engine.
//!
//! Dtype checks and null-filling helpers used by the planner, the joint
//! imputer and the indicator builder.

use polars::prelude::*;
use tracing::{debug, info};

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is an integer type.
#[inline]
pub fn is_integer_dtype(dtype: &DataType) -> bool {
    is_numeric_dtype(dtype) && !matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Check if a DataType holds labels (string, categorical or enum).
#[inline]
pub fn is_categorical_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::String | DataType::Categorical(_, _) | DataType::Enum(_, _)
    )
}

/// Short, stable display name for a dtype.
pub fn dtype_name(dtype: &DataType) -> String {
    format!("{}", dtype)
}

// =============================================================================
// Null Mask Utilities
// =============================================================================

/// Row-wise missingness of a Series.
pub fn null_mask(series: &Series) -> Vec<bool> {
    series
        .is_null()
        .into_iter()
        .map(|v| v.unwrap_or(false))
        .collect()
}

// =============================================================================
// Series Transformation Utilities
// =============================================================================

/// Fill the nulls of a typed ChunkedArray and return it as a Series.
macro_rules! fill_native {
    ($ca:expr, $value:expr) => {
        $ca.fill_null_with_values($value)?.into_series()
    };
}

/// Whether `value` is integral and representable in the integer `dtype`.
pub fn fits_integer_dtype(dtype: &DataType, value: f64) -> bool {
    if !value.is_finite() || value.fract() != 0.0 {
        return false;
    }
    // saturates far outside every integer range, which try_from then rejects
    let v = value as i128;
    match dtype {
        DataType::Int8 => i8::try_from(v).is_ok(),
        DataType::Int16 => i16::try_from(v).is_ok(),
        DataType::Int32 => i32::try_from(v).is_ok(),
        DataType::Int64 => i64::try_from(v).is_ok(),
        DataType::UInt8 => u8::try_from(v).is_ok(),
        DataType::UInt16 => u16::try_from(v).is_ok(),
        DataType::UInt32 => u32::try_from(v).is_ok(),
        DataType::UInt64 => u64::try_from(v).is_ok(),
        _ => false,
    }
}

/// Fill null values in a numeric Series with a specific value.
///
/// Only null cells are written. Integer columns are filled in their own dtype
/// when `fill_value` is integral and widened to Float64 otherwise; an integral
/// value outside the dtype's range is an error.
pub fn fill_numeric_nulls(series: &Series, fill_value: f64) -> PolarsResult<Series> {
    let dtype = series.dtype();

    if is_integer_dtype(dtype) && fill_value.fract() == 0.0 {
        polars_ensure!(
            fits_integer_dtype(dtype, fill_value),
            ComputeError: "fill value {} is out of range for {} column '{}'",
            fill_value, dtype, series.name()
        );
        let v = fill_value as i128;
        let filled = match dtype {
            DataType::Int8 => fill_native!(series.i8()?, v as i8),
            DataType::Int16 => fill_native!(series.i16()?, v as i16),
            DataType::Int32 => fill_native!(series.i32()?, v as i32),
            DataType::Int64 => fill_native!(series.i64()?, v as i64),
            DataType::UInt8 => fill_native!(series.u8()?, v as u8),
            DataType::UInt16 => fill_native!(series.u16()?, v as u16),
            DataType::UInt32 => fill_native!(series.u32()?, v as u32),
            _ => fill_native!(series.u64()?, v as u64),
        };
        return Ok(filled);
    }

    if matches!(dtype, DataType::Float32) {
        return Ok(fill_native!(series.f32()?, fill_value as f32));
    }
    let floats = series.cast(&DataType::Float64)?;
    Ok(fill_native!(floats.f64()?, fill_value))
}

/// Fill null values in a label Series with a specific value.
///
/// Categorical and enum columns are cast back to their original dtype.
pub fn fill_string_nulls(series: &Series, fill_value: &str) -> PolarsResult<Series> {
    let strings = series.cast(&DataType::String)?;
    let values: Vec<Option<String>> = strings
        .str()?
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value).to_string()))
        .collect();
    let filled = Series::new(series.name().clone(), values);

    match series.dtype() {
        DataType::String => Ok(filled),
        dtype => filled.cast(dtype),
    }
}

/// Fill null values in a boolean Series with a specific value.
pub fn fill_boolean_nulls(series: &Series, fill_value: bool) -> PolarsResult<Series> {
    let values: Vec<Option<bool>> = series
        .bool()?
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value)))
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

// =============================================================================
// Logging Utilities
// =============================================================================

/// Log a progress message at info level when `verbose`, debug level otherwise.
pub fn log_step(verbose: bool, message: &str) {
    if verbose {
        info!("{}", message);
    } else {
        debug!("{}", message);
    }
}

// =============================================================================
// Tests
// =============================================================================
