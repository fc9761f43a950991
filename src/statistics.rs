/// Descriptive statistics over a numeric sample.
///
/// The standard deviation is the population one (divides by `n`).
#[derive(Debug, Clone)]
pub struct Statistics {
    values: Vec<f64>,
    mean: f64,
    standard_deviation: f64,
    min: f64,
    max: f64,
}

impl Statistics {
    /// Computes the statistics of `values`.
    ///
    /// An empty sample yields zero mean, deviation and distance.
    pub fn new(values: Vec<f64>) -> Self {
        if values.is_empty() {
            return Self {
                values,
                mean: 0.0,
                standard_deviation: 0.0,
                min: 0.0,
                max: 0.0,
            };
        }

        let count = values.len() as f64;
        let mean = values.iter().sum::<f64>() / count;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Self {
            values,
            mean,
            standard_deviation: variance.sqrt(),
            min,
            max,
        }
    }

    pub fn count(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn standard_deviation(&self) -> f64 {
        self.standard_deviation
    }

    /// Distance between the largest and the smallest value.
    pub fn min_max_distance(&self) -> f64 {
        self.max - self.min
    }
}
