//! Symbolic regression by genetic programming.
//!
//! A dataset of `(y, group, x⃗)` rows is searched for a closed-form expression tree
//! predicting `y`, trading prediction accuracy against tree size.

pub mod config;
pub mod data;
pub mod evolution;
pub mod export;
pub mod expression;
pub mod model;
pub mod runner;
pub mod serialization;
pub mod statistics;
