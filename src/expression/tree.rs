//! Breadth-first positions within a tree.
//!
//! The root is position 0, followed by its children left to right, then their children and
//! so on. Positions past the end of the tree address the root unchanged.

use super::mutation::MutationContext;
use super::{Node, NodeRef, ReplaceError};
use std::collections::VecDeque;
use std::sync::Arc;

/// Total node count.
pub fn size(root: &Node) -> usize {
    let mut open = VecDeque::from([root]);
    let mut total = 0;
    while let Some(node) = open.pop_front() {
        total += 1;
        open.extend(node.children().iter().map(|child| child.as_ref()));
    }
    total
}

/// Node at breadth-first position `index`, or `root` if the tree is smaller.
pub fn extract_node(root: &NodeRef, index: usize) -> NodeRef {
    let mut open = VecDeque::from([root]);
    let mut position = 0;
    while let Some(node) = open.pop_front() {
        if position == index {
            return Arc::clone(node);
        }
        position += 1;
        open.extend(node.children());
    }
    Arc::clone(root)
}

/// A visited node with the position of its parent in the visit list and its slot there.
struct Visit {
    node: NodeRef,
    parent: Option<(usize, usize)>,
}

/// Rewrites the node at breadth-first position `index`.
///
/// `operation` receives the current node and returns its replacement. Every ancestor on
/// the path to the root is rebuilt with just that one child swapped; all other subtrees
/// are shared with the input tree.
///
/// # Returns
/// * `Ok(NodeRef)` - The new root, or `root` itself if `index` is past the end of the tree
/// * `Err(ReplaceError)` - If an ancestor refused the replacement child
pub fn replace_node<F>(root: &NodeRef, index: usize, operation: F) -> Result<NodeRef, ReplaceError>
where
    F: FnOnce(&NodeRef) -> NodeRef,
{
    let mut visits = vec![Visit {
        node: Arc::clone(root),
        parent: None,
    }];
    let mut cursor = 0;
    while cursor < index && cursor < visits.len() {
        let node = Arc::clone(&visits[cursor].node);
        for (slot, child) in node.children().iter().enumerate() {
            visits.push(Visit {
                node: Arc::clone(child),
                parent: Some((cursor, slot)),
            });
        }
        cursor += 1;
    }
    if cursor >= visits.len() {
        return Ok(Arc::clone(root));
    }

    let mut current = operation(&visits[cursor].node);
    let mut at = cursor;
    while let Some((parent, slot)) = visits[at].parent {
        current = Arc::new(visits[parent].node.replace(slot, current)?);
        at = parent;
    }
    Ok(current)
}

/// Mutates the node at breadth-first position `index`, see [`Node::mutate`].
pub fn mutate_node(
    root: &NodeRef,
    index: usize,
    ctx: &mut MutationContext,
) -> Result<NodeRef, ReplaceError> {
    replace_node(root, index, |node| node.mutate(ctx))
}
