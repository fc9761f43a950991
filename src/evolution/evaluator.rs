use crate::config::Config;
use crate::data::{DataInput, DataRow};
use crate::model::{Model, RankedModel};
use crate::statistics::Statistics;
use thiserror::Error;

/// Smallest scale a row's error is measured against.
const MINIMUM_VALUE: f64 = 1e-100;
const NO_CORRELATION: f64 = 0.0;
/// Stand-in prediction for rows a model cannot evaluate.
const FAILED_PREDICTION: f64 = i64::MAX as f64;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluatorError {
    #[error("Model size importance must be within [0, 1], got {0}")]
    ModelSizeImportance(f64),
}

/// Scores models against a dataset.
///
/// Fitness is `correlation * (1 - w) + size_reward * w` where `correlation` is the mean of
/// `exp(-|y - prediction| / scale)` over the rows, `size_reward` is
/// `(max_nodes - size) / max_nodes` and `w` is the configured model size importance.
/// Models larger than `max_nodes` score zero.
#[derive(Debug, Clone)]
pub struct Evaluator<'a> {
    max_nodes: usize,
    rows: &'a [DataRow],
    /// Per-row error scale: `|y|`, or the spread of `y` for rows where `y` is about zero
    row_scales: Vec<f64>,
    correlation_ratio: f64,
    model_size_ratio: f64,
}

impl<'a> Evaluator<'a> {
    /// Prepares the per-row scales of a dataset.
    ///
    /// # Arguments
    /// * `config` - Provides `max_nodes` and `model_size_importance`
    /// * `input` - The dataset every model is scored against
    ///
    /// # Returns
    /// * `Result<Self, EvaluatorError>` - Fails when the size importance lies outside `[0, 1]`
    pub fn new(config: &Config, input: &'a DataInput) -> Result<Self, EvaluatorError> {
        let importance = config.model_size_importance;
        if !(0.0..=1.0).contains(&importance) {
            return Err(EvaluatorError::ModelSizeImportance(importance));
        }

        let statistics = Statistics::new(input.rows().iter().map(|row| row.y).collect());
        let spread = statistics.min_max_distance().max(MINIMUM_VALUE);
        let row_scales = statistics
            .values()
            .iter()
            .map(|y| if y.abs() < MINIMUM_VALUE { spread } else { y.abs() })
            .collect();

        Ok(Self {
            max_nodes: config.max_nodes,
            rows: input.rows(),
            row_scales,
            correlation_ratio: 1.0 - importance,
            model_size_ratio: importance,
        })
    }

    pub fn fitness(&self, model: &Model) -> f64 {
        if model.size() > self.max_nodes {
            return NO_CORRELATION;
        }

        let similarity_sum: f64 = self
            .rows
            .iter()
            .zip(&self.row_scales)
            .map(|(row, scale)| {
                let predicted = match model.evaluate(row) {
                    Ok(value) if value.is_finite() => value,
                    _ => FAILED_PREDICTION,
                };
                (-(row.y - predicted).abs() / scale).exp()
            })
            .sum();

        let mut correlation = similarity_sum / self.rows.len() as f64;
        if !correlation.is_finite() {
            correlation = NO_CORRELATION;
        }
        let size_reward =
            (self.max_nodes as f64 - model.size() as f64) / self.max_nodes as f64;

        correlation * self.correlation_ratio + size_reward * self.model_size_ratio
    }

    pub fn evaluate(&self, model: &Model) -> RankedModel {
        RankedModel::new(model.clone(), self.fitness(model))
    }
}
