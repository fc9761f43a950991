use super::mutation::MutationContext;
use super::ops::{BinaryOp, UnaryOp};
use super::{Node, NodeRef};
use log::{info, warn};
use std::sync::Arc;

/// Leaf kinds the factory may draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    Constant,
    Variable,
    Special,
    IntConstant,
    Group,
}

impl LeafKind {
    fn create(self, ctx: &mut MutationContext) -> Node {
        match self {
            LeafKind::Constant => Node::random_constant(ctx),
            LeafKind::Variable => match ctx.variable_index() {
                Some(index) => Node::Variable(index),
                None => Node::random_constant(ctx),
            },
            LeafKind::Special => Node::random_special(ctx),
            LeafKind::IntConstant => Node::random_int_constant(ctx),
            LeafKind::Group => Node::random_group(ctx),
        }
    }
}

/// Random construction of leaf, unary and binary nodes with uniform weights.
#[derive(Debug, Clone)]
pub struct NodeFactory {
    leaf_kinds: Vec<LeafKind>,
}

impl NodeFactory {
    /// Creates a factory for a dataset shape.
    ///
    /// # Arguments
    /// * `group_allowed` - Whether group constants may be drawn
    /// * `x_length` - Number of inputs per row; variables are left out without inputs
    /// * `groups` - Group labels of the dataset; group constants need at least one
    pub fn new(group_allowed: bool, x_length: usize, groups: &[String]) -> Self {
        let mut leaf_kinds = vec![LeafKind::Constant];
        if x_length > 0 {
            leaf_kinds.push(LeafKind::Variable);
        } else {
            warn!("Dataset has no inputs, variable nodes disabled");
        }
        leaf_kinds.push(LeafKind::Special);
        leaf_kinds.push(LeafKind::IntConstant);

        if !group_allowed {
            info!("Group node disabled");
        } else if groups.is_empty() {
            warn!("Group node requested but the dataset has no groups, group node disabled");
        } else {
            info!("Group node enabled");
            leaf_kinds.push(LeafKind::Group);
        }

        Self { leaf_kinds }
    }

    pub fn leaf_kinds(&self) -> &[LeafKind] {
        &self.leaf_kinds
    }

    pub fn create_leaf(&self, ctx: &mut MutationContext) -> Node {
        let kind = self.leaf_kinds[ctx.index_below(self.leaf_kinds.len())];
        kind.create(ctx)
    }

    /// Wraps `child` in a random unary operator.
    ///
    /// Two extra outcomes besides the operators: fold the child's constants, or hand the
    /// child back untouched. A fold that runs out of range also hands the child back.
    pub fn create_unary(&self, ctx: &mut MutationContext, child: NodeRef) -> NodeRef {
        let selection = ctx.index_below(UnaryOp::ALL.len() + 2);
        match UnaryOp::ALL.get(selection) {
            Some(op) => Arc::new(Node::unary(*op, child)),
            None if selection == UnaryOp::ALL.len() => match child.simplify(false) {
                Ok(simplified) => Arc::new(simplified.node),
                Err(_) => child,
            },
            None => child,
        }
    }

    /// Combines two subtrees with a random binary operator, or passes one of them through.
    pub fn create_binary(
        &self,
        ctx: &mut MutationContext,
        left: NodeRef,
        right: NodeRef,
    ) -> NodeRef {
        let selection = ctx.index_below(BinaryOp::ALL.len() + 2);
        match BinaryOp::ALL.get(selection) {
            Some(op) => Arc::new(Node::binary(*op, left, right)),
            None if selection == BinaryOp::ALL.len() => left,
            None => right,
        }
    }
}
