use super::JointImputer;
use crate::config::{DEFAULT_KNN_NEIGHBORS, ImputeConfig};
use crate::error::{ImputeError, Result};
use crate::utils::is_numeric_dtype;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fitted state of a [`KNNImputer`].
///
/// Holds the standardization parameters and the standardized reference rows,
/// which is everything needed to transform a new table consistently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnModel {
    pub columns: Vec<String>,
    pub centers: Vec<f64>,
    pub scales: Vec<f64>,
    pub n_neighbors: usize,
    /// Standardized training rows, missing cells kept as `None`.
    pub reference: Vec<Vec<Option<f64>>>,
}

impl KnnModel {
    /// Check that the fitted vectors agree with `columns`.
    ///
    /// Models read back from disk are not trusted to be well formed.
    fn validate(&self) -> Result<()> {
        let n_cols = self.columns.len();
        if self.centers.len() != n_cols || self.scales.len() != n_cols {
            return Err(ImputeError::ImputerFailed(format!(
                "KNN model has {} columns but {} centers and {} scales",
                n_cols,
                self.centers.len(),
                self.scales.len()
            )));
        }
        if let Some(row_idx) = self.reference.iter().position(|row| row.len() != n_cols) {
            return Err(ImputeError::ImputerFailed(format!(
                "KNN model reference row {} has {} values, expected {}",
                row_idx,
                self.reference[row_idx].len(),
                n_cols
            )));
        }
        Ok(())
    }

    fn standardize(&self, matrix: &mut [Vec<Option<f64>>]) {
        for row in matrix.iter_mut() {
            for (col_idx, cell) in row.iter_mut().enumerate() {
                if let Some(v) = cell {
                    *v = (*v - self.centers[col_idx]) / self.scales[col_idx];
                }
            }
        }
    }
}

/// Joint nearest-neighbor imputer over all numeric columns.
///
/// Numeric columns are centered and scaled, then each missing cell is filled
/// with an inverse-distance weighted average of its `k` nearest reference rows.
/// Non-numeric columns pass through untouched.
#[derive(Debug, Clone)]
pub struct KNNImputer {
    n_neighbors: usize,
}

impl Default for KNNImputer {
    fn default() -> Self {
        Self::new(DEFAULT_KNN_NEIGHBORS)
    }
}

impl KNNImputer {
    /// Create a new KNN imputer with specified number of neighbors
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors: n_neighbors.max(1), // Ensure at least 1 neighbor
        }
    }

    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    fn numeric_columns(df: &DataFrame) -> Vec<String> {
        df.get_columns()
            .iter()
            .filter(|col| is_numeric_dtype(col.dtype()))
            .map(|col| col.name().to_string())
            .collect()
    }

    /// Create a data matrix from the dataframe for distance calculations.
    ///
    /// NaN cells carry no magnitude and enter the matrix as `None`, like nulls.
    /// [`write_back`](Self::write_back) restores them afterwards.
    fn create_data_matrix(df: &DataFrame, columns: &[String]) -> Result<Vec<Vec<Option<f64>>>> {
        let n_rows = df.height();
        let n_cols = columns.len();
        let mut matrix = vec![vec![None; n_cols]; n_rows];

        for (col_idx, col_name) in columns.iter().enumerate() {
            let series = df.column(col_name)?;
            let float_series = series.cast(&DataType::Float64)?;
            let f64_series = float_series.f64()?;

            for (row_idx, row) in matrix.iter_mut().enumerate().take(n_rows) {
                row[col_idx] = f64_series.get(row_idx).filter(|v| !v.is_nan());
            }
        }

        Ok(matrix)
    }

    /// Mean and sample standard deviation per column. An undefined or zero
    /// scale becomes 1.0 so the column is only centered.
    fn center_and_scale(matrix: &[Vec<Option<f64>>], n_cols: usize) -> (Vec<f64>, Vec<f64>) {
        let mut centers = Vec::with_capacity(n_cols);
        let mut scales = Vec::with_capacity(n_cols);

        for col_idx in 0..n_cols {
            let observed: Vec<f64> = matrix.iter().filter_map(|row| row[col_idx]).collect();
            let n = observed.len();
            let mean = if n > 0 {
                observed.iter().sum::<f64>() / n as f64
            } else {
                0.0
            };
            let std = if n > 1 {
                let variance =
                    observed.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
                variance.sqrt()
            } else {
                0.0
            };

            centers.push(mean);
            scales.push(if std.is_finite() && std > 0.0 { std } else { 1.0 });
        }

        (centers, scales)
    }

    /// Fill every missing cell of `matrix` using neighbors from `reference`.
    fn impute_matrix(
        &self,
        matrix: &[Vec<Option<f64>>],
        reference: &[Vec<Option<f64>>],
    ) -> Vec<Vec<f64>> {
        let n_cols = matrix.first().map_or(0, Vec::len);
        let column_means: Vec<f64> = (0..n_cols)
            .map(|col_idx| {
                let observed: Vec<f64> =
                    reference.iter().filter_map(|row| row[col_idx]).collect();
                if observed.is_empty() {
                    0.0
                } else {
                    observed.iter().sum::<f64>() / observed.len() as f64
                }
            })
            .collect();

        matrix
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(col_idx, cell)| match cell {
                        Some(v) => *v,
                        None => self
                            .impute_value(row, col_idx, reference, n_cols)
                            .unwrap_or(column_means[col_idx]),
                    })
                    .collect()
            })
            .collect()
    }

    /// Impute a single missing value using KNN.
    ///
    /// Returns `None` when no reference row can contribute a finite weight.
    fn impute_value(
        &self,
        target_row: &[Option<f64>],
        target_col: usize,
        reference: &[Vec<Option<f64>>],
        n_cols: usize,
    ) -> Option<f64> {
        // Calculate distances to all reference rows with a value in the target column
        let mut distances: Vec<(f64, f64)> = reference
            .iter()
            .filter_map(|candidate| {
                candidate[target_col].map(|value| {
                    let distance =
                        Self::calculate_distance(target_row, candidate, target_col, n_cols);
                    (distance, value)
                })
            })
            .collect();

        if distances.is_empty() {
            return None;
        }

        // Sort by distance (ascending)
        distances.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        // Take K nearest neighbors
        let k = self.n_neighbors.min(distances.len());

        // Calculate weighted average based on distances
        let mut weighted_sum = 0.0;
        let mut weight_sum = 0.0;

        for &(distance, value) in distances.iter().take(k) {
            // Use inverse distance as weight (avoiding division by zero)
            let weight = if distance < 1e-10 {
                1e10 // Very close neighbor gets very high weight
            } else {
                1.0 / distance
            };

            weighted_sum += value * weight;
            weight_sum += weight;
        }

        if weight_sum > 0.0 {
            Some(weighted_sum / weight_sum)
        } else {
            None
        }
    }

    /// Calculate Euclidean distance between two rows, ignoring the target column and null values
    fn calculate_distance(
        row1: &[Option<f64>],
        row2: &[Option<f64>],
        skip_col: usize,
        n_cols: usize,
    ) -> f64 {
        let mut sum_squared_diff = 0.0;
        let mut count = 0;

        for col_idx in 0..n_cols {
            if col_idx == skip_col {
                continue; // Skip the column we're imputing
            }

            if let (Some(val1), Some(val2)) = (row1[col_idx], row2[col_idx]) {
                let diff = val1 - val2;
                sum_squared_diff += diff * diff;
                count += 1;
            }
        }

        if count > 0 {
            (sum_squared_diff / count as f64).sqrt() // Normalized Euclidean distance
        } else {
            f64::INFINITY // No common non-null features
        }
    }

    /// Write the imputed standardized matrix back over the numeric columns.
    ///
    /// Cells that were NaN in `df` stay NaN: only nulls are imputed.
    fn write_back(df: &DataFrame, columns: &[String], imputed: &[Vec<f64>]) -> Result<DataFrame> {
        let mut result_df = df.clone();
        for (col_idx, col_name) in columns.iter().enumerate() {
            let original = df.column(col_name)?.cast(&DataType::Float64)?;
            let values: Vec<f64> = original
                .f64()?
                .into_iter()
                .zip(imputed)
                .map(|(cell, row)| match cell {
                    Some(v) if v.is_nan() => v,
                    _ => row[col_idx],
                })
                .collect();
            let imputed_series = Series::new(col_name.as_str().into(), values);
            result_df.replace(col_name, imputed_series)?;
        }
        Ok(result_df)
    }
}

impl JointImputer for KNNImputer {
    type Fitted = KnnModel;

    fn from_config(config: &ImputeConfig) -> Self {
        Self::new(config.knn_neighbors)
    }

    fn name(&self) -> &'static str {
        "knn"
    }

    fn fit(&self, df: &DataFrame) -> Result<(DataFrame, KnnModel)> {
        let columns = Self::numeric_columns(df);
        debug!("KNN fitting on {} numeric columns", columns.len());

        let mut matrix = Self::create_data_matrix(df, &columns)?;
        let (centers, scales) = Self::center_and_scale(&matrix, columns.len());

        let model = KnnModel {
            columns,
            centers,
            scales,
            n_neighbors: self.n_neighbors,
            reference: Vec::new(),
        };
        model.standardize(&mut matrix);

        let imputed = self.impute_matrix(&matrix, &matrix);
        let result_df = Self::write_back(df, &model.columns, &imputed)?;

        Ok((
            result_df,
            KnnModel {
                reference: matrix,
                ..model
            },
        ))
    }

    fn apply(&self, model: &KnnModel, df: &DataFrame) -> Result<DataFrame> {
        for col_name in &model.columns {
            let col = df.column(col_name).map_err(|_| ImputeError::SchemaMismatch {
                column: col_name.clone(),
                reason: "column is missing from the table".to_string(),
            })?;
            if !is_numeric_dtype(col.dtype()) {
                return Err(ImputeError::SchemaMismatch {
                    column: col_name.clone(),
                    reason: format!("expected a numeric column, found {}", col.dtype()),
                });
            }
        }

        model.validate()?;

        debug!("KNN applying fitted model to {} rows", df.height());
        if model.n_neighbors != self.n_neighbors() {
            debug!(
                "Using fitted k={} instead of configured k={}",
                model.n_neighbors,
                self.n_neighbors()
            );
        }

        let mut matrix = Self::create_data_matrix(df, &model.columns)?;
        model.standardize(&mut matrix);

        // a fitted model keeps its own neighbor count
        let imputer = KNNImputer::new(model.n_neighbors);
        let imputed = imputer.impute_matrix(&matrix, &model.reference);
        Self::write_back(df, &model.columns, &imputed)
    }
}
