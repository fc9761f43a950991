use rand::prelude::*;
use rand::rngs::StdRng;
use std::sync::Arc;

/// Everything a random node construction or mutation needs to know about the dataset,
/// plus the random source to draw from.
///
/// A context is owned by one task at a time. Concurrent tasks receive their own context
/// through [`MutationContext::fork`].
#[derive(Debug, Clone)]
pub struct MutationContext {
    rng: StdRng,
    x_length: usize,
    groups: Arc<[String]>,
}

impl MutationContext {
    /// Creates a context, seeded from the operating system unless a seed is given.
    pub fn new(x_length: usize, groups: Arc<[String]>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        Self {
            rng,
            x_length,
            groups,
        }
    }

    /// Child context with an independent random stream derived from this one.
    pub fn fork(&mut self) -> Self {
        Self {
            rng: StdRng::seed_from_u64(self.rng.random()),
            x_length: self.x_length,
            groups: Arc::clone(&self.groups),
        }
    }

    pub fn x_length(&self) -> usize {
        self.x_length
    }

    pub fn groups(&self) -> &Arc<[String]> {
        &self.groups
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Uniform integer in `[from, to]`, both ends included.
    pub fn int_between(&mut self, from: i32, to: i32) -> i32 {
        self.rng.random_range(from..=to)
    }

    /// Uniform index in `[0, len)`. `len` must be positive.
    pub fn index_below(&mut self, len: usize) -> usize {
        self.rng.random_range(0..len)
    }

    pub fn coin_flip(&mut self) -> bool {
        self.rng.random()
    }

    /// Index of a random input variable, if the dataset has any.
    pub fn variable_index(&mut self) -> Option<usize> {
        (self.x_length > 0).then(|| self.index_below(self.x_length))
    }
}

/// Perturbation applied to a floating point leaf value.
///
/// The variants mix local moves with jumps across many orders of magnitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DoubleMutation {
    /// `v + f * v`, `f` in `[-1, 1)`
    Scale(f64),
    /// `v + 10^k`
    Add(i32),
    /// `v - 10^k`
    Subtract(i32),
    /// Nearest integer, halves rounded up
    Round,
    /// `v * 10^k`
    Multiply(i32),
}

impl DoubleMutation {
    /// Draws one of the five variants with equal probability.
    pub fn draw(ctx: &mut MutationContext) -> Self {
        match ctx.int_between(0, 4) {
            0 => DoubleMutation::Scale(ctx.rng().random_range(-1.0..1.0)),
            1 => DoubleMutation::Add(ctx.int_between(-100, 100)),
            2 => DoubleMutation::Subtract(ctx.int_between(-100, 100)),
            3 => DoubleMutation::Round,
            _ => DoubleMutation::Multiply(ctx.int_between(-100, 100)),
        }
    }

    pub fn apply(self, value: f64) -> f64 {
        match self {
            DoubleMutation::Scale(factor) => value + factor * value,
            DoubleMutation::Add(exponent) => value + 10f64.powi(exponent),
            DoubleMutation::Subtract(exponent) => value - 10f64.powi(exponent),
            DoubleMutation::Round => (value + 0.5).floor(),
            DoubleMutation::Multiply(exponent) => value * 10f64.powi(exponent),
        }
    }
}

/// Initial value of a fresh floating point leaf: an integer in `[-1000, 1000]`.
pub fn create_double(ctx: &mut MutationContext) -> f64 {
    f64::from(ctx.int_between(-1000, 1000))
}

pub fn mutate_double(ctx: &mut MutationContext, value: f64) -> f64 {
    DoubleMutation::draw(ctx).apply(value)
}

/// Perturbation applied to an integer leaf value. Overflow wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntMutation {
    /// `v * (10^k as i32)`, negative exponents truncate the factor to zero
    Scale(i32),
    /// `v + d`
    Shift(i32),
}

impl IntMutation {
    pub fn draw(ctx: &mut MutationContext) -> Self {
        if ctx.coin_flip() {
            IntMutation::Scale(ctx.int_between(-20, 20))
        } else {
            IntMutation::Shift(ctx.int_between(-10_000, 10_000))
        }
    }

    pub fn apply(self, value: i32) -> i32 {
        match self {
            IntMutation::Scale(exponent) => value.wrapping_mul(10f64.powi(exponent) as i32),
            IntMutation::Shift(delta) => value.wrapping_add(delta),
        }
    }
}
