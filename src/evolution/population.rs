use crate::model::{sort_by_fitness, RankedModel};
use rand::seq::SliceRandom;
use rand::Rng;

/// The current generation, best first, plus two shuffled orders used to pick parents.
///
/// Mutation parents are drawn through one order and crossover partners through the other,
/// so a generation's tasks each see a distinct model per order.
#[derive(Debug, Clone)]
pub struct Evolution {
    models: Vec<RankedModel>,
    mutation_order: Vec<usize>,
    crossover_order: Vec<usize>,
    generation: u64,
}

impl Evolution {
    pub fn new(population_size: usize) -> Self {
        Self {
            models: Vec::with_capacity(population_size),
            mutation_order: (0..population_size).collect(),
            crossover_order: (0..population_size).collect(),
            generation: 0,
        }
    }

    /// Installs the next generation, sorted best first, and advances the generation counter.
    pub fn set_population(&mut self, mut models: Vec<RankedModel>) {
        sort_by_fitness(&mut models);
        self.models = models;
        self.generation += 1;
    }

    pub fn population(&self) -> &[RankedModel] {
        &self.models
    }

    pub fn into_population(self) -> Vec<RankedModel> {
        self.models
    }

    /// Number of generations installed so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn best_model(&self) -> Option<&RankedModel> {
        self.models.first()
    }

    /// Fitness of the best model, zero for an empty population.
    pub fn best_fitness(&self) -> f64 {
        self.best_model().map_or(0.0, |best| best.fitness)
    }

    pub fn shuffle_indices<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.mutation_order.shuffle(rng);
        self.crossover_order.shuffle(rng);
    }

    /// Model at position `index` of the mutation order.
    pub fn random_model(&self, index: usize) -> &RankedModel {
        &self.models[self.mutation_order[index]]
    }

    /// Model at position `index` of the crossover order.
    pub fn random_crossover_model(&self, index: usize) -> &RankedModel {
        &self.models[self.crossover_order[index]]
    }
}
