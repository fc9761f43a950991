pub mod evaluator;
pub mod population;

use crate::config::{Config, ConfigError};
use crate::data::DataInput;
use crate::evolution::evaluator::{Evaluator, EvaluatorError};
use crate::evolution::population::Evolution;
use crate::expression::factory::NodeFactory;
use crate::expression::mutation::MutationContext;
use crate::expression::{tree, ReplaceError};
use crate::model::{sort_by_fitness, Model, RankedModel};
use log::{debug, info};
use rand::seq::SliceRandom;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use rayon::ThreadPool;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvolutionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Cannot build evaluator: {0}")]
    Evaluator(#[from] EvaluatorError),
    #[error("Tree rewrite failed: {0}")]
    Rewrite(#[from] ReplaceError),
}

/// Offspring counts of one generation, reported at debug level.
#[derive(Debug, Copy, Clone)]
struct GenerationReport {
    offspring: usize,
    duplicates: usize,
}

/// Runs one symbolic regression search over a dataset.
///
/// Every generation derives mutants and crossover children from the current population on
/// the worker pool, drops children whose expression was already produced, then keeps the
/// best models, a random draw of survivors and a handful of fresh random leaves.
pub struct EvolutionEngine<'a> {
    /// Parameters of this run
    config: &'a Config,
    /// Scores every model against the dataset
    evaluator: Evaluator<'a>,
    factory: NodeFactory,
    /// Master random source; concurrent tasks receive forks of it
    ctx: MutationContext,
    /// Shared worker pool, built once per process
    pool: &'a ThreadPool,
    /// Generations installed by the last `evolve` call, the initial one included
    generations: u64,
}

impl<'a> EvolutionEngine<'a> {
    /// Creates a new EvolutionEngine instance
    ///
    /// # Arguments
    /// * `config` - Run parameters; `random_seed` makes the run reproducible
    /// * `input` - The dataset models are fitted to
    /// * `pool` - Worker pool running mutation and crossover tasks
    ///
    /// # Returns
    /// * `Result<Self, EvolutionError>` - Fails on a configuration the loop cannot run with
    pub fn new(
        config: &'a Config,
        input: &'a DataInput,
        pool: &'a ThreadPool,
    ) -> Result<Self, EvolutionError> {
        config.validate()?;
        let evaluator = Evaluator::new(config, input)?;
        let factory = NodeFactory::new(config.group_allowed, input.x_length(), input.groups());
        let ctx = MutationContext::new(
            input.x_length(),
            Arc::clone(input.groups()),
            config.random_seed,
        );
        Ok(Self {
            config,
            evaluator,
            factory,
            ctx,
            pool,
            generations: 0,
        })
    }

    /// Runs the generational loop until the deadline, stagnation, or the generation limit.
    ///
    /// # Returns
    /// * `Result<Vec<RankedModel>, EvolutionError>` - The final population, best first
    pub fn evolve(&mut self) -> Result<Vec<RankedModel>, EvolutionError> {
        let start = Instant::now();
        let deadline = start + Duration::from_secs(self.config.max_duration_in_sec);
        let progress_interval = Duration::from_secs(self.config.progress_update_in_sec);

        let first = self.random_ranked_model();
        info!("Initial fitness: {:.6}", first.fitness);

        let mut evolution = Evolution::new(self.config.population_size);
        let initial = (0..self.config.population_size)
            .map(|_| self.random_ranked_model())
            .collect();
        evolution.set_population(initial);

        let mut best_fitness = evolution.best_fitness();
        let mut same_loops: u64 = 0;
        let mut last_progress = start;

        while Instant::now() < deadline {
            evolution.shuffle_indices(self.ctx.rng());

            let mut offspring = self.mutate_population(&evolution)?;
            offspring.extend(self.crossover_population(&evolution)?);
            let produced = offspring.len();
            let offspring = deduplicate(offspring);
            let report = GenerationReport {
                offspring: offspring.len(),
                duplicates: produced - offspring.len(),
            };

            let next = self.next_population(evolution.population(), offspring);
            evolution.set_population(next);

            let fitness = evolution.best_fitness();
            debug!(
                "Gen {}: Best Fitness={:.6} | Offspring={} | Duplicates={}",
                evolution.generation(),
                fitness,
                report.offspring,
                report.duplicates
            );
            if fitness > best_fitness {
                best_fitness = fitness;
                same_loops = 0;
            } else {
                same_loops += 1;
            }

            if same_loops > self.config.max_same_loops
                || evolution.generation() > self.config.max_iterations
            {
                break;
            }

            let now = Instant::now();
            if now.duration_since(last_progress) > progress_interval {
                if let Some(best) = evolution.best_model() {
                    info!("Best {}", best.to_report());
                }
                last_progress = now;
            }
        }

        self.generations = evolution.generation();
        info!("Total loops: {}", self.generations);
        Ok(evolution.into_population())
    }

    /// Generations installed by the last run, the initial random one included.
    pub fn generations(&self) -> u64 {
        self.generations
    }

    /// A random single-leaf model with its fitness.
    fn random_ranked_model(&mut self) -> RankedModel {
        let leaf = self.factory.create_leaf(&mut self.ctx);
        self.evaluator.evaluate(&Model::from_node(leaf))
    }

    /// Mutates `mutation_size` models drawn through the mutation order.
    fn mutate_population(
        &mut self,
        evolution: &Evolution,
    ) -> Result<Vec<RankedModel>, EvolutionError> {
        let tasks: Vec<(Model, MutationContext)> = (0..self.config.mutation_size)
            .map(|i| (evolution.random_model(i).model.clone(), self.ctx.fork()))
            .collect();

        let factory = &self.factory;
        let evaluator = &self.evaluator;
        self.pool.install(|| {
            tasks
                .into_par_iter()
                .map(|(model, mut ctx)| -> Result<RankedModel, EvolutionError> {
                    let mutant = mutate_model(factory, &model, &mut ctx)?;
                    Ok(evaluator.evaluate(&mutant))
                })
                .collect()
        })
    }

    /// Crosses `crossover_size` pairs: one model drawn backwards through the mutation order,
    /// its partner through the crossover order.
    fn crossover_population(
        &mut self,
        evolution: &Evolution,
    ) -> Result<Vec<RankedModel>, EvolutionError> {
        let last = self.config.population_size - 1;
        let tasks: Vec<(Model, Model, MutationContext)> = (0..self.config.crossover_size)
            .map(|i| {
                (
                    evolution.random_model(last - i).model.clone(),
                    evolution.random_crossover_model(i).model.clone(),
                    self.ctx.fork(),
                )
            })
            .collect();

        let factory = &self.factory;
        let evaluator = &self.evaluator;
        self.pool.install(|| {
            tasks
                .into_par_iter()
                .map(|(model, partner, mut ctx)| -> Result<RankedModel, EvolutionError> {
                    let child = crossover_models(factory, &model, &partner, &mut ctx)?;
                    Ok(evaluator.evaluate(&child))
                })
                .collect()
        })
    }

    /// Builds the next generation from the current one and the new offspring.
    ///
    /// The best `population_size - survival_size - replaceable_size` models of the union
    /// are kept by rank, `survival_size` more are drawn at random from the union, and
    /// `replaceable_size` fresh random leaves fill the rest.
    fn next_population(
        &mut self,
        current: &[RankedModel],
        offspring: Vec<RankedModel>,
    ) -> Vec<RankedModel> {
        let mut merged: Vec<RankedModel> = current.iter().cloned().chain(offspring).collect();
        sort_by_fitness(&mut merged);

        let elite = self
            .config
            .population_size
            .saturating_sub(self.config.replaceable_size + self.config.survival_size);
        let mut next: Vec<RankedModel> = Vec::with_capacity(self.config.population_size);
        next.extend(merged.iter().take(elite).cloned());

        merged.shuffle(self.ctx.rng());
        next.extend(merged.into_iter().take(self.config.survival_size));

        for _ in 0..self.config.replaceable_size {
            let fresh = self.random_ranked_model();
            next.push(fresh);
        }
        next
    }
}

/// Either wraps a random node in a random unary operator or mutates it in place.
fn mutate_model(
    factory: &NodeFactory,
    model: &Model,
    ctx: &mut MutationContext,
) -> Result<Model, ReplaceError> {
    let position = ctx.index_below(model.size());
    let root = if ctx.coin_flip() {
        tree::replace_node(model.root(), position, |node| {
            factory.create_unary(ctx, Arc::clone(node))
        })?
    } else {
        tree::mutate_node(model.root(), position, ctx)?
    };
    Ok(Model::new(root))
}

/// Splices a random subtree of `partner` into a random position of `model`.
///
/// The node at that position becomes a random binary combination of itself and the
/// donated subtree.
fn crossover_models(
    factory: &NodeFactory,
    model: &Model,
    partner: &Model,
    ctx: &mut MutationContext,
) -> Result<Model, ReplaceError> {
    let position = ctx.index_below(model.size());
    let donor_position = ctx.index_below(partner.size());
    let donor = tree::extract_node(partner.root(), donor_position);
    let root = tree::replace_node(model.root(), position, |node| {
        factory.create_binary(ctx, Arc::clone(node), donor)
    })?;
    Ok(Model::new(root))
}

/// Drops models whose expression already appeared, keeping the first occurrence.
fn deduplicate(models: Vec<RankedModel>) -> Vec<RankedModel> {
    let mut seen: HashSet<Arc<str>> = HashSet::with_capacity(models.len());
    models
        .into_iter()
        .filter(|ranked| seen.insert(Arc::clone(ranked.model.expression())))
        .collect()
}
