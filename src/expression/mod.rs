//! Immutable expression trees.
//!
//! A [`Node`] is never changed in place: mutation, replacement and constant folding all
//! return new nodes that share untouched subtrees through [`NodeRef`].

pub mod constants;
pub mod factory;
pub mod mutation;
pub mod ops;
pub mod tree;

use crate::data::DataRow;
use constants::{GroupConstant, SpecialConstant, SPECIAL_CONSTANTS};
use mutation::{create_double, mutate_double, IntMutation, MutationContext};
use ops::{BinaryOp, UnaryOp};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use thiserror::Error;

pub type NodeRef = Arc<Node>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalError {
    #[error("Value out of range")]
    OutOfRange,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceError {
    #[error("Leaf node has no children to replace")]
    LeafNode,
    #[error("Node index must be below {arity}, got {index}")]
    InvalidChildIndex { index: usize, arity: usize },
}

/// An operator tree node.
///
/// The display form is canonical: it is used as the equality and hash key, so two trees
/// that print the same are the same individual.
#[derive(Debug, Clone)]
pub enum Node {
    Constant(f64),
    IntConstant(i32),
    Special(SpecialConstant),
    /// Zero based index into the row inputs
    Variable(usize),
    Group(GroupConstant),
    Unary(UnaryOp, NodeRef),
    Binary(BinaryOp, [NodeRef; 2]),
}

/// Result of constant folding.
#[derive(Debug, Clone)]
pub struct Simplified {
    pub node: Node,
    /// Whether `node` no longer depends on the row
    pub constant: bool,
}

impl Simplified {
    fn constant(value: f64) -> Self {
        Self {
            node: Node::Constant(value),
            constant: true,
        }
    }

    fn variable(node: Node) -> Self {
        Self {
            node,
            constant: false,
        }
    }
}

impl Node {
    pub fn unary(op: UnaryOp, child: NodeRef) -> Self {
        Node::Unary(op, child)
    }

    /// Builds a binary node. Commutative operators put a leaf operand first when only the
    /// right operand is a leaf, so `x + f(x)` and `f(x) + x` print the same.
    pub fn binary(op: BinaryOp, left: NodeRef, right: NodeRef) -> Self {
        if op.is_commutative() && !left.is_leaf() && right.is_leaf() {
            Node::Binary(op, [right, left])
        } else {
            Node::Binary(op, [left, right])
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children().is_empty()
    }

    /// Positional children: none for leaves, one for unary and two for binary nodes.
    pub fn children(&self) -> &[NodeRef] {
        match self {
            Node::Unary(_, child) => std::slice::from_ref(child),
            Node::Binary(_, children) => children,
            _ => &[],
        }
    }

    /// Computes the value of the tree for one row.
    ///
    /// # Errors
    /// `EvalError::OutOfRange` when an operator result is not finite, a variable index is
    /// outside the row or a group constant has no value for the row's group.
    pub fn evaluate(&self, row: &DataRow) -> Result<f64, EvalError> {
        match self {
            Node::Constant(value) => Ok(*value),
            Node::IntConstant(value) => Ok(f64::from(*value)),
            Node::Special(constant) => Ok(constant.value()),
            Node::Variable(index) => row.x.get(*index).copied().ok_or(EvalError::OutOfRange),
            Node::Group(constant) => row
                .group
                .as_deref()
                .and_then(|group| constant.value_for(group))
                .ok_or(EvalError::OutOfRange),
            Node::Unary(op, child) => finite(op.calculate(child.evaluate(row)?)),
            Node::Binary(op, [left, right]) => {
                finite(op.calculate(left.evaluate(row)?, right.evaluate(row)?))
            }
        }
    }

    /// Derives a random variation of this node.
    ///
    /// Leaves draw a new value of their own kind. Unary nodes collapse into their child and
    /// binary nodes into one of their children, which is how trees shrink.
    pub fn mutate(&self, ctx: &mut MutationContext) -> NodeRef {
        match self {
            Node::Constant(value) => Arc::new(Node::Constant(mutate_double(ctx, *value))),
            Node::IntConstant(value) => {
                Arc::new(Node::IntConstant(IntMutation::draw(ctx).apply(*value)))
            }
            Node::Special(_) => Arc::new(Node::random_special(ctx)),
            Node::Variable(index) => {
                Arc::new(Node::Variable(ctx.variable_index().unwrap_or(*index)))
            }
            Node::Group(constant) => {
                if constant.is_empty() {
                    return Arc::new(self.clone());
                }
                let index = ctx.index_below(constant.len());
                let value = mutate_double(ctx, constant.value_at(index));
                Arc::new(Node::Group(constant.with_value(index, value)))
            }
            Node::Unary(_, child) => Arc::clone(child),
            Node::Binary(_, [left, right]) => {
                if ctx.coin_flip() {
                    Arc::clone(left)
                } else {
                    Arc::clone(right)
                }
            }
        }
    }

    /// Copy of this node with the child at `index` swapped for `replacement`.
    pub fn replace(&self, index: usize, replacement: NodeRef) -> Result<Node, ReplaceError> {
        match self {
            Node::Unary(op, _) if index == 0 => Ok(Node::unary(*op, replacement)),
            Node::Binary(op, [left, right]) if index < 2 => Ok(if index == 0 {
                Node::binary(*op, replacement, Arc::clone(right))
            } else {
                Node::binary(*op, Arc::clone(left), replacement)
            }),
            Node::Unary(..) => Err(ReplaceError::InvalidChildIndex { index, arity: 1 }),
            Node::Binary(..) => Err(ReplaceError::InvalidChildIndex { index, arity: 2 }),
            _ => Err(ReplaceError::LeafNode),
        }
    }

    /// Bottom-up constant folding.
    ///
    /// With `all_constants` set, named special constants fold too. Folding evaluates the
    /// operator once, so it fails like [`Node::evaluate`] does on out of range values.
    pub fn simplify(&self, all_constants: bool) -> Result<Simplified, EvalError> {
        match self {
            Node::Constant(value) => Ok(Simplified::constant(*value)),
            Node::IntConstant(value) => Ok(Simplified::constant(f64::from(*value))),
            Node::Special(constant) if all_constants => Ok(Simplified::constant(constant.value())),
            Node::Special(_) | Node::Variable(_) => Ok(Simplified::variable(self.clone())),
            Node::Group(constant) => Ok(match constant.uniform_value() {
                Some(value) => Simplified::constant(value),
                None => Simplified::variable(self.clone()),
            }),
            Node::Unary(op, child) => {
                let child = child.simplify(all_constants)?;
                if child.constant {
                    let value = child.node.evaluate(&EMPTY_ROW)?;
                    Ok(Simplified::constant(finite(op.calculate(value))?))
                } else {
                    Ok(Simplified::variable(Node::unary(*op, Arc::new(child.node))))
                }
            }
            Node::Binary(op, [left, right]) => {
                let left = left.simplify(all_constants)?;
                let right = right.simplify(all_constants)?;
                if left.constant && right.constant {
                    let a = left.node.evaluate(&EMPTY_ROW)?;
                    let b = right.node.evaluate(&EMPTY_ROW)?;
                    Ok(Simplified::constant(finite(op.calculate(a, b))?))
                } else {
                    Ok(Simplified::variable(Node::binary(
                        *op,
                        Arc::new(left.node),
                        Arc::new(right.node),
                    )))
                }
            }
        }
    }

    pub fn random_special(ctx: &mut MutationContext) -> Node {
        Node::Special(SPECIAL_CONSTANTS[ctx.index_below(SPECIAL_CONSTANTS.len())])
    }

    pub fn random_constant(ctx: &mut MutationContext) -> Node {
        Node::Constant(create_double(ctx))
    }

    pub fn random_int_constant(ctx: &mut MutationContext) -> Node {
        Node::IntConstant(ctx.int_between(-10_000, 10_000))
    }

    /// A group constant over the context's groups, all holding one fresh value.
    pub fn random_group(ctx: &mut MutationContext) -> Node {
        let value = create_double(ctx);
        Node::Group(GroupConstant::uniform(Arc::clone(ctx.groups()), value))
    }
}

static EMPTY_ROW: DataRow = DataRow {
    y: 0.0,
    group: None,
    x: Vec::new(),
};

fn finite(value: f64) -> Result<f64, EvalError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EvalError::OutOfRange)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Constant(value) => write!(f, "{:?}", value),
            Node::IntConstant(value) => write!(f, "{:?}", f64::from(*value)),
            Node::Special(constant) => f.write_str(constant.name()),
            Node::Variable(index) => write!(f, "x{}", index + 1),
            Node::Group(constant) => {
                f.write_str("group(")?;
                for (i, (group, value)) in constant.entries().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}={:?}", group, value)?;
                }
                f.write_str(")")
            }
            Node::Unary(op, child) => match op.function_name() {
                Some(name) => write!(f, "{}({})", name, child),
                None => write!(f, "-{}", child),
            },
            Node::Binary(op, [left, right]) => write!(f, "({}{}{})", left, op.symbol(), right),
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn constant(value: f64) -> NodeRef {
        Arc::new(Node::Constant(value))
    }

    fn special(name: &str) -> NodeRef {
        Arc::new(Node::Special(SpecialConstant::by_name(name).unwrap()))
    }

    fn context() -> MutationContext {
        MutationContext::new(3, vec!["abc".to_string(), "def".to_string()].into(), Some(11))
    }

    fn row() -> DataRow {
        DataRow::new(0.0, vec![])
    }

    #[test]
    fn test_binary_evaluate() {
        let node = Node::binary(BinaryOp::Multiply, constant(3.0), constant(2.0));
        assert_abs_diff_eq!(node.evaluate(&row()).unwrap(), 6.0, epsilon = 1e-9);
    }

    #[test]
    fn test_binary_evaluate_out_of_range() {
        let node = Node::binary(BinaryOp::Multiply, constant(f64::MAX), constant(f64::MAX));
        assert_eq!(node.evaluate(&row()), Err(EvalError::OutOfRange));

        let node = Node::unary(UnaryOp::Log, constant(-1.0));
        assert_eq!(node.evaluate(&row()), Err(EvalError::OutOfRange));
    }

    #[test]
    fn test_commutative_operands_put_leaf_first() {
        let node = Node::binary(
            BinaryOp::Plus,
            Arc::new(Node::unary(UnaryOp::Sqrt, constant(1.0))),
            constant(2.0),
        );
        assert_eq!(node.to_string(), "(2.0+sqrt(1.0))");

        let node = Node::binary(
            BinaryOp::Minus,
            Arc::new(Node::unary(UnaryOp::Sqrt, constant(1.0))),
            constant(2.0),
        );
        assert_eq!(node.to_string(), "(sqrt(1.0)-2.0)");

        let node = Node::binary(BinaryOp::Multiply, special("e"), special("t0"));
        assert_eq!(node.to_string(), "(e*t0)");
    }

    #[test]
    fn test_binary_replace() {
        let node = Node::binary(BinaryOp::Multiply, special("e"), special("t0"));
        let result = node.replace(0, special("t0")).unwrap();
        assert_eq!(result.to_string(), "(t0*t0)");
        assert_eq!(
            node.replace(2, special("t0")).unwrap_err(),
            ReplaceError::InvalidChildIndex { index: 2, arity: 2 }
        );
    }

    #[test]
    fn test_leaf_replace_fails() {
        let node = Node::Constant(1.0);
        assert_eq!(node.replace(0, constant(2.0)).unwrap_err(), ReplaceError::LeafNode);
    }

    #[test]
    fn test_negative_node() {
        let node = Node::unary(UnaryOp::Negative, constant(4.0));
        assert_abs_diff_eq!(node.evaluate(&row()).unwrap(), -4.0, epsilon = 1e-9);
        assert_eq!(node.mutate(&mut context()).to_string(), "4.0");
        assert_eq!(node.replace(0, constant(6.0)).unwrap().to_string(), "-6.0");
        assert!(node.replace(1, constant(6.0)).is_err());

        let simplified = node.simplify(true).unwrap();
        assert_eq!(simplified.node.to_string(), "-4.0");
        assert!(simplified.constant);

        let node = Node::unary(UnaryOp::Negative, Arc::new(Node::Variable(2)));
        let simplified = node.simplify(true).unwrap();
        assert_eq!(simplified.node.to_string(), "-x3");
        assert!(!simplified.constant);
    }

    #[test]
    fn test_function_display() {
        assert_eq!(Node::unary(UnaryOp::Tanh, special("t0")).to_string(), "tanh(t0)");
        assert_eq!(Node::unary(UnaryOp::Cosh, special("e")).to_string(), "cosh(e)");
        assert_eq!(Node::unary(UnaryOp::ArcSinh, special("e")).to_string(), "asinh(e)");
        assert_eq!(Node::unary(UnaryOp::Sqrt, constant(4.0)).to_string(), "sqrt(4.0)");
        assert_eq!(
            Node::binary(BinaryOp::Power, special("_2"), constant(0.5)).to_string(),
            "(_2^0.5)"
        );
    }

    #[test]
    fn test_special_constant_folds_only_when_asked() {
        let node = Node::unary(UnaryOp::Tanh, special("t0"));
        let kept = node.simplify(false).unwrap();
        assert_eq!(kept.node.to_string(), "tanh(t0)");
        assert!(!kept.constant);

        let folded = node.simplify(true).unwrap();
        assert!(folded.constant);
        assert_eq!(folded.node.to_string(), format!("{:?}", (-273.15f64).tanh()));
    }

    #[test]
    fn test_simplify_out_of_range_fails() {
        let node = Node::unary(UnaryOp::Log, constant(0.0));
        assert_eq!(node.simplify(false).unwrap_err(), EvalError::OutOfRange);
    }

    #[test]
    fn test_int_constant_display() {
        let node = Node::IntConstant(10);
        assert_eq!(node.to_string(), "10.0");
        assert_eq!(node.evaluate(&row()), Ok(10.0));
    }

    #[test]
    fn test_variable_node() {
        let node = Node::Variable(1);
        assert_eq!(node.to_string(), "x2");
        assert_eq!(node.evaluate(&DataRow::new(0.0, vec![3.0, 5.0])), Ok(5.0));
        assert_eq!(node.evaluate(&DataRow::new(0.0, vec![3.0])), Err(EvalError::OutOfRange));
        assert!(!node.simplify(true).unwrap().constant);

        let mut ctx = context();
        for _ in 0..50 {
            match *node.mutate(&mut ctx) {
                Node::Variable(index) => assert!(index < 3),
                ref other => panic!("unexpected {}", other),
            }
        }
    }

    #[test]
    fn test_group_constant() {
        let groups: Arc<[String]> = vec!["abc".to_string(), "def".to_string()].into();
        let node = Node::Group(GroupConstant::uniform(groups, 0.0));
        assert_eq!(node.to_string(), "group(abc=0.0,def=0.0)");

        assert_eq!(node.evaluate(&DataRow::with_group(0.0, "abc", vec![0.0])), Ok(0.0));
        assert_eq!(node.evaluate(&row()), Err(EvalError::OutOfRange));
        assert_eq!(
            node.evaluate(&DataRow::with_group(0.0, "b", vec![0.0])),
            Err(EvalError::OutOfRange)
        );

        let simplified = node.simplify(false).unwrap();
        assert!(simplified.constant);
        assert_eq!(simplified.node, Node::Constant(0.0));
    }

    #[test]
    fn test_group_constant_mutation_touches_one_group() {
        let mut ctx = context();
        let node = Node::random_group(&mut ctx);
        let mutated = node.mutate(&mut ctx);
        match (&node, &*mutated) {
            (Node::Group(before), Node::Group(after)) => {
                let changed = before
                    .entries()
                    .zip(after.entries())
                    .filter(|(a, b)| a.1 != b.1)
                    .count();
                assert!(changed <= 1);
                if changed == 0 {
                    assert_eq!(node, *mutated);
                } else {
                    assert!(!mutated.simplify(false).unwrap().constant);
                }
            }
            _ => panic!("group constant mutated into another kind"),
        }
    }

    #[test]
    fn test_binary_mutation_returns_a_child() {
        let node = Node::binary(BinaryOp::Minus, constant(1.0), constant(2.0));
        let mut ctx = context();
        for _ in 0..20 {
            let result = node.mutate(&mut ctx).to_string();
            assert!(result == "1.0" || result == "2.0");
        }
    }

    #[test]
    fn test_equality_follows_display() {
        assert_eq!(Node::IntConstant(3), Node::Constant(3.0));
        assert_ne!(Node::Constant(3.0), Node::Constant(3.5));
    }
}
