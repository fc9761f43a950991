use crate::config::{Config, ConfigError};
use crate::data::DataInput;
use crate::evolution::{EvolutionEngine, EvolutionError};
use crate::export::{self, ExportError, ResultWriter};
use crate::model::RankedModel;
use log::{info, warn};
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] ThreadPoolBuildError),
    #[error(transparent)]
    Evolution(#[from] EvolutionError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Builds the worker pool shared by every iteration; zero threads picks rayon's default.
pub fn build_pool(thread_count: usize) -> Result<ThreadPool, ThreadPoolBuildError> {
    ThreadPoolBuilder::new()
        .num_threads(thread_count)
        .thread_name(|index| format!("evoreg-worker-{}", index))
        .build()
}

/// Runs every iteration of the plan and writes the best model of each to the result files
/// named by `result_output_prefix`.
///
/// # Returns
/// * `Result<Vec<RankedModel>, RunnerError>` - The best model of every iteration, in order
pub fn run(config: &Config, input: &DataInput) -> Result<Vec<RankedModel>, RunnerError> {
    config.validate()?;
    let mut writer = export::create_writer(config.result_output_prefix.as_deref())?;
    run_with_writer(config, input, writer.as_mut())
}

/// Runs every iteration of the plan, handing the best model of each to `writer`.
pub fn run_with_writer(
    config: &Config,
    input: &DataInput,
    writer: &mut dyn ResultWriter,
) -> Result<Vec<RankedModel>, RunnerError> {
    config.validate()?;
    info!("{}", config);
    let started = Instant::now();
    let pool = build_pool(config.thread_count)?;
    info!("Worker pool ready with {} threads", pool.current_num_threads());

    let plan = config.iteration_plan();
    let mut results = Vec::with_capacity(plan.len());
    for (iteration, max_nodes) in plan.into_iter().enumerate() {
        let iteration_config = Config {
            random_seed: config
                .random_seed
                .map(|seed| seed.wrapping_add(iteration as u64)),
            ..config.with_max_nodes(max_nodes)
        };
        info!("Iteration {} with max_nodes={}", iteration + 1, max_nodes);

        let mut engine = EvolutionEngine::new(&iteration_config, input, &pool)?;
        let population = engine.evolve()?;
        match population.into_iter().next() {
            Some(best) => {
                writer.write(max_nodes, &best)?;
                info!("{}", best.to_report());
                results.push(best);
            }
            None => warn!("Iteration {} produced no model", iteration + 1),
        }
    }

    info!("Took {} ms", started.elapsed().as_millis());
    Ok(results)
}
