use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    FileReadError(#[from] std::io::Error),
    #[error("Cannot load configuration: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Run parameters of a symbolic regression search.
///
/// Every field has a default, so a configuration file only needs to name the values it
/// overrides. Unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Wall-clock budget of one evolution run
    pub max_duration_in_sec: u64,
    /// Generation limit of one evolution run
    pub max_iterations: u64,
    /// Lower node budget when iterating over node budgets
    pub min_nodes: usize,
    /// Models with more nodes than this score zero
    pub max_nodes: usize,
    /// Generations without improvement of the best fitness before giving up
    pub max_same_loops: u64,
    /// Interval between progress records of the best model
    pub progress_update_in_sec: u64,
    /// Enables group constant leaves
    pub group_allowed: bool,
    pub population_size: usize,
    /// Mutation tasks per generation
    pub mutation_size: usize,
    /// Crossover tasks per generation
    pub crossover_size: usize,
    /// Individuals carried over by random draw instead of by rank
    pub survival_size: usize,
    /// Fresh random individuals injected every generation
    pub replaceable_size: usize,
    /// Run once per node budget in `min_nodes..=max_nodes` instead of only for `max_nodes`
    pub iterate_max_nodes: bool,
    /// Runs per node budget when `iterate_max_nodes` is set
    pub results_in_iteration: usize,
    /// Result files are written next to this prefix, nothing is written when absent
    pub result_output_prefix: Option<String>,
    /// Worker threads, 0 uses the available parallelism
    pub thread_count: usize,
    /// Weight of the size reward against prediction accuracy, in `[0, 1]`
    pub model_size_importance: f64,
    /// Seed for reproducible runs
    pub random_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_duration_in_sec: 60,
            max_iterations: i32::MAX as u64,
            min_nodes: 1,
            max_nodes: 20,
            max_same_loops: 1000,
            progress_update_in_sec: 5,
            group_allowed: false,
            population_size: 10_000,
            mutation_size: 2_000,
            crossover_size: 4_000,
            survival_size: 1_000,
            replaceable_size: 1_000,
            iterate_max_nodes: false,
            results_in_iteration: 5,
            result_output_prefix: None,
            thread_count: 0,
            model_size_importance: 1e-3,
            random_seed: None,
        }
    }
}

impl Config {
    /// Loads a configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to a flat TOML table of parameters
    ///
    /// # Returns
    /// * `Result<Self, ConfigError>` - The configuration with defaults for every absent key
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Checks the parameter combinations a run cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.model_size_importance.is_finite()
            || !(0.0..=1.0).contains(&self.model_size_importance)
        {
            return Err(ConfigError::ValidationError(format!(
                "model_size_importance must be within [0, 1], got {}",
                self.model_size_importance
            )));
        }
        if self.max_nodes == 0 {
            return Err(ConfigError::ValidationError(
                "max_nodes must be positive".to_string(),
            ));
        }
        if self.population_size == 0 {
            return Err(ConfigError::ValidationError(
                "population_size must be positive".to_string(),
            ));
        }
        if self.mutation_size > self.population_size {
            return Err(ConfigError::ValidationError(format!(
                "mutation_size ({}) cannot exceed population_size ({})",
                self.mutation_size, self.population_size
            )));
        }
        if self.crossover_size > self.population_size {
            return Err(ConfigError::ValidationError(format!(
                "crossover_size ({}) cannot exceed population_size ({})",
                self.crossover_size, self.population_size
            )));
        }
        if self.survival_size + self.replaceable_size > self.population_size {
            return Err(ConfigError::ValidationError(format!(
                "survival_size + replaceable_size ({}) cannot exceed population_size ({})",
                self.survival_size + self.replaceable_size,
                self.population_size
            )));
        }
        if self.iterate_max_nodes && (self.min_nodes == 0 || self.min_nodes > self.max_nodes) {
            return Err(ConfigError::ValidationError(format!(
                "min_nodes ({}) must be within [1, max_nodes ({})]",
                self.min_nodes, self.max_nodes
            )));
        }
        Ok(())
    }

    /// Copy of this configuration with a different node budget.
    pub fn with_max_nodes(&self, max_nodes: usize) -> Self {
        Self {
            max_nodes,
            ..self.clone()
        }
    }

    /// Node budgets of the successive runs.
    ///
    /// Without `iterate_max_nodes` this is a single run at `max_nodes`, otherwise every budget
    /// in `min_nodes..=max_nodes` is repeated `results_in_iteration` times.
    pub fn iteration_plan(&self) -> Vec<usize> {
        if !self.iterate_max_nodes {
            return vec![self.max_nodes];
        }
        (self.min_nodes..=self.max_nodes)
            .flat_map(|n| std::iter::repeat(n).take(self.results_in_iteration))
            .collect()
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Configuration{{max_duration_in_sec={}, max_iterations={}, min_nodes={}, max_nodes={}, \
             max_same_loops={}, progress_update_in_sec={}, group_allowed={}, population_size={}, \
             mutation_size={}, crossover_size={}, survival_size={}, replaceable_size={}, \
             iterate_max_nodes={}, results_in_iteration={}, result_output_prefix={}, \
             thread_count={}, model_size_importance={}, random_seed={}}}",
            self.max_duration_in_sec,
            self.max_iterations,
            self.min_nodes,
            self.max_nodes,
            self.max_same_loops,
            self.progress_update_in_sec,
            self.group_allowed,
            self.population_size,
            self.mutation_size,
            self.crossover_size,
            self.survival_size,
            self.replaceable_size,
            self.iterate_max_nodes,
            self.results_in_iteration,
            self.result_output_prefix.as_deref().unwrap_or("none"),
            self.thread_count,
            self.model_size_importance,
            self.random_seed
                .map(|seed| seed.to_string())
                .unwrap_or_else(|| "none".to_string()),
        )
    }
}
