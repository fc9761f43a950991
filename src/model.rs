use crate::data::DataRow;
use crate::expression::tree;
use crate::expression::{EvalError, Node, NodeRef};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A candidate formula: a tree root with its node count and display form computed once.
///
/// Equality and hashing go through the display form.
#[derive(Debug, Clone)]
pub struct Model {
    root: NodeRef,
    size: usize,
    expression: Arc<str>,
}

impl Model {
    pub fn new(root: NodeRef) -> Self {
        let size = tree::size(&root);
        let expression = root.to_string().into();
        Self {
            root,
            size,
            expression,
        }
    }

    pub fn from_node(node: Node) -> Self {
        Self::new(Arc::new(node))
    }

    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn expression(&self) -> &Arc<str> {
        &self.expression
    }

    pub fn evaluate(&self, row: &DataRow) -> Result<f64, EvalError> {
        self.root.evaluate(row)
    }

    /// Display form after folding every constant, including the named ones.
    ///
    /// Falls back to the plain display form when folding runs out of range.
    pub fn simplified_expression(&self) -> String {
        match self.root.simplify(true) {
            Ok(simplified) => simplified.node.to_string(),
            Err(_) => self.expression.to_string(),
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        self.expression == other.expression
    }
}

impl Eq for Model {}

impl Hash for Model {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.expression.hash(state);
    }
}

/// A model with its fitness. Populations order these by fitness, best first.
#[derive(Debug, Clone)]
pub struct RankedModel {
    pub model: Model,
    pub fitness: f64,
}

impl RankedModel {
    pub fn new(model: Model, fitness: f64) -> Self {
        Self { model, fitness }
    }

    /// Human readable report: fitness, display form and folded form on three lines.
    pub fn to_report(&self) -> String {
        format!(
            "Model\t{:.6}\nDefault\t{}\nSimplified\t{}",
            self.fitness,
            self.model,
            self.model.simplified_expression()
        )
    }

    /// Fitness, display form and folded form separated by tabs.
    pub fn to_tsv(&self) -> String {
        format!(
            "{:.6}\t{}\t{}",
            self.fitness,
            self.model,
            self.model.simplified_expression()
        )
    }
}

impl fmt::Display for RankedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{:.6}, {}}}", self.fitness, self.model)
    }
}

/// Sorts by fitness, best first. Ties keep their relative order.
pub fn sort_by_fitness(models: &mut [RankedModel]) {
    models.sort_by(|a, b| {
        b.fitness
            .partial_cmp(&a.fitness)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
