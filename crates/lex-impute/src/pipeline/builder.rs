//! Main imputation pipeline module.
//!
//! This module provides the core `ImputationPipeline` struct and builder for
//! orchestrating profiling, imputation and indicator construction.

use crate::config::{ImputationType, ImputeConfig};
use crate::error::{ImputeError, Result, ResultExt};
use crate::imputers::{JointImputer, KNNImputer, StatisticalImputer};
use crate::pipeline::IndicatorBuilder;
use crate::profiler::ColumnProfiler;
use crate::types::{
    ColumnKind, ColumnSpec, FillValue, ImputationPlan, ImputeOutcome, ImputeWarning,
};
use crate::utils::log_step;
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::{error, warn};

/// The main imputation pipeline.
///
/// Use [`ImputationPipeline::builder()`] to create a new pipeline with custom
/// configuration. The pipeline holds no state between calls: the
/// [`ImputationPlan`] returned in each outcome is what carries a fit over to
/// new data, via [`replay`](Self::replay).
///
/// # Example
///
/// ```rust,ignore
/// use lex_impute::{ImputationPipeline, ImputeConfig};
///
/// let pipeline = ImputationPipeline::builder()
///     .config(ImputeConfig::builder().skip_var("id").build()?)
///     .build()?;
///
/// let train = pipeline.process(train_df)?;
/// let test = pipeline.replay(&train.plan, test_df)?;
/// ```
pub struct ImputationPipeline<J: JointImputer = KNNImputer> {
    config: ImputeConfig,
    joint_imputer: J,
}

// Ensure the default pipeline can be moved to another thread
static_assertions::assert_impl_all!(ImputationPipeline: Send, Sync);

impl ImputationPipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> ImputationPipelineBuilder {
        ImputationPipelineBuilder::default()
    }
}

impl<J: JointImputer> ImputationPipeline<J> {
    pub fn config(&self) -> &ImputeConfig {
        &self.config
    }

    /// Impute `df` from scratch and build a fresh plan.
    ///
    /// # Errors
    ///
    /// Fails on structural problems only: a supplied fill value of the wrong
    /// type, a failing joint imputer, or an indicator name that collides with
    /// an existing column.
    pub fn process(&self, df: DataFrame) -> Result<ImputeOutcome<J::Fitted>> {
        self.run(df, None).inspect_err(|e| error!("Imputation error: {}", e))
    }

    /// Impute `df` using a plan produced by an earlier call.
    ///
    /// A standard plan's values are used verbatim; a knn plan is applied with
    /// the joint imputer's fitted state, without refitting.
    pub fn replay(
        &self,
        plan: &ImputationPlan<J::Fitted>,
        df: DataFrame,
    ) -> Result<ImputeOutcome<J::Fitted>> {
        self.run(df, Some(plan))
            .context("Replaying imputation plan")
            .inspect_err(|e| error!("Imputation error: {}", e))
    }

    fn run(
        &self,
        df: DataFrame,
        plan: Option<&ImputationPlan<J::Fitted>>,
    ) -> Result<ImputeOutcome<J::Fitted>> {
        let verbose = self.config.verbose;
        let imputation_type = plan.map_or(self.config.imputation_type, |p| p.imputation_type());

        log_step(
            verbose,
            &format!(
                "Starting {} imputation on {} rows x {} columns",
                imputation_type,
                df.height(),
                df.width()
            ),
        );

        let mut warnings = Vec::new();
        let mut processing_steps = Vec::new();

        // Step 1: profile once; the missing-column set drives indicators in every mode
        let specs = ColumnProfiler::profile(&df, &self.config.skip_vars);
        let missing_columns = ColumnProfiler::missing_columns(&specs);
        log_step(
            verbose,
            &format!(
                "Found {} column(s) with missing values: {:?}",
                missing_columns.len(),
                missing_columns
            ),
        );

        // Step 2: impute
        let (imputed, plan) = match plan {
            None if imputation_type == ImputationType::Standard => self.impute_standard(
                &df,
                &specs,
                &self.config.values,
                &mut warnings,
                &mut processing_steps,
            )?,
            None => {
                self.impute_joint(&df, &specs, None, &mut warnings, &mut processing_steps)?
            }
            Some(ImputationPlan::Standard { values }) => {
                let mut supplied = self.config.values.clone();
                supplied.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
                self.impute_standard(&df, &specs, &supplied, &mut warnings, &mut processing_steps)?
            }
            Some(ImputationPlan::Knn { model }) => self.impute_joint(
                &df,
                &specs,
                Some(model),
                &mut warnings,
                &mut processing_steps,
            )?,
        };

        // Step 3: indicators come from the original table, never the imputed one
        let indicators = if self.config.add_indicators && !missing_columns.is_empty() {
            IndicatorBuilder::from_config(&self.config).build(
                &df,
                &missing_columns,
                &mut processing_steps,
            )?
        } else {
            DataFrame::empty()
        };

        // Step 4: concatenate by column
        let combined = if indicators.width() > 0 {
            imputed
                .hstack(indicators.get_columns())
                .context("Appending indicator columns")?
        } else {
            imputed.clone()
        };

        log_step(
            verbose,
            &format!(
                "Imputation complete: {} column(s) out, {} indicator(s), {} warning(s)",
                combined.width(),
                indicators.width(),
                warnings.len()
            ),
        );

        let mut config = self.config.clone();
        config.imputation_type = imputation_type;

        Ok(ImputeOutcome {
            imputed,
            indicators,
            combined,
            plan,
            config,
            missing_columns,
            warnings,
            processing_steps,
        })
    }

    fn impute_standard(
        &self,
        df: &DataFrame,
        specs: &[ColumnSpec],
        supplied: &BTreeMap<String, FillValue>,
        warnings: &mut Vec<ImputeWarning>,
        processing_steps: &mut Vec<String>,
    ) -> Result<(DataFrame, ImputationPlan<J::Fitted>)> {
        let mut imputed = df.clone();
        let values = StatisticalImputer::new(self.config.all_vars)
            .verbose(self.config.verbose)
            .impute(&mut imputed, specs, supplied, warnings, processing_steps)?;
        Ok((imputed, ImputationPlan::Standard { values }))
    }

    /// Hand every non-skipped column to the joint imputer, then reassemble the
    /// table in its original column order with skipped columns untouched.
    fn impute_joint(
        &self,
        df: &DataFrame,
        specs: &[ColumnSpec],
        fitted: Option<&J::Fitted>,
        warnings: &mut Vec<ImputeWarning>,
        processing_steps: &mut Vec<String>,
    ) -> Result<(DataFrame, ImputationPlan<J::Fitted>)> {
        let active: Vec<String> = specs
            .iter()
            .filter(|spec| !spec.excluded)
            .map(|spec| spec.name.clone())
            .collect();
        let input = df.select(active.clone())?;

        let name = self.joint_imputer.name();
        let (output, model) = match fitted {
            None => self.joint_imputer.fit(&input),
            Some(model) => self
                .joint_imputer
                .apply(model, &input)
                .map(|output| (output, model.clone())),
        }
        .context(format!("Running {} imputer", name))?;

        if output.width() > 0 && output.height() != df.height() {
            return Err(ImputeError::ImputerFailed(format!(
                "{} imputer returned {} rows, expected {}",
                name,
                output.height(),
                df.height()
            )));
        }

        let mut columns = Vec::with_capacity(specs.len());
        for spec in specs {
            let column = if spec.excluded {
                df.column(&spec.name)?.clone()
            } else {
                output
                    .column(&spec.name)
                    .map_err(|_| {
                        ImputeError::ImputerFailed(format!(
                            "{} imputer dropped column '{}'",
                            name, spec.name
                        ))
                    })?
                    .clone()
            };
            columns.push(column);
        }
        let imputed = DataFrame::new(columns)?;

        let scaled: Vec<String> = specs
            .iter()
            .filter(|spec| !spec.excluded && spec.kind == ColumnKind::Numeric)
            .map(|spec| spec.name.clone())
            .collect();
        if !scaled.is_empty() {
            let warning = ImputeWarning::ScaleNotPreserved { columns: scaled };
            warn!("{}", warning);
            warnings.push(warning);
        }

        for spec in specs.iter().filter(|spec| spec.has_missing()) {
            let remaining = imputed.column(&spec.name)?.null_count();
            if remaining > 0 {
                let warning = ImputeWarning::NotImputed {
                    column: spec.name.clone(),
                    dtype: spec.dtype.clone(),
                };
                warn!("{}", warning);
                warnings.push(warning);
            } else {
                processing_steps.push(format!(
                    "{} imputed {} missing value(s) in '{}'",
                    name, spec.missing_count, spec.name
                ));
            }
        }

        Ok((imputed, ImputationPlan::Knn { model }))
    }
}

/// Builder for [`ImputationPipeline`].
pub struct ImputationPipelineBuilder<J: JointImputer = KNNImputer> {
    config: Option<ImputeConfig>,
    joint_imputer: Option<J>,
}

static_assertions::assert_impl_all!(ImputationPipelineBuilder: Send);

impl Default for ImputationPipelineBuilder {
    fn default() -> Self {
        Self {
            config: None,
            joint_imputer: None,
        }
    }
}

impl<J: JointImputer> ImputationPipelineBuilder<J> {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: ImputeConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use a specific joint imputer for knn mode.
    ///
    /// If not provided, the imputer is constructed from the configuration
    /// via [`JointImputer::from_config`].
    pub fn joint_imputer<K: JointImputer>(self, imputer: K) -> ImputationPipelineBuilder<K> {
        ImputationPipelineBuilder {
            config: self.config,
            joint_imputer: Some(imputer),
        }
    }

    /// Build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`ImputeError::InvalidConfig`] if the configuration does not
    /// validate.
    pub fn build(self) -> Result<ImputationPipeline<J>> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let joint_imputer = self
            .joint_imputer
            .unwrap_or_else(|| J::from_config(&config));

        Ok(ImputationPipeline {
            config,
            joint_imputer,
        })
    }
}

/// Impute `df` with `config` in one call, using the default KNN joint imputer.
pub fn impute(df: DataFrame, config: ImputeConfig) -> Result<ImputeOutcome> {
    ImputationPipeline::builder().config(config).build()?.process(df)
}
