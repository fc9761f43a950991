//! Tree text format.
//!
//! One line per node, `y<index>=<Kind>(<payload>)`, with indices in breadth-first order.
//! Lines are written deepest first so every child is defined before the line that refers
//! to it; the last line is the root.
//!
//! ```text
//! y003=ConstantNode(1.0)
//! y002=SqrtNode(y003)
//! y001=ConstantNode(2.0)
//! y000=PlusNode(y001,y002)
//! ```

use crate::expression::constants::{GroupConstant, SpecialConstant};
use crate::expression::ops::{BinaryOp, UnaryOp};
use crate::expression::{Node, NodeRef};
use crate::model::Model;
use regex::Regex;
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

lazy_static::lazy_static! {
    static ref LINE_PATTERN: Regex =
        Regex::new(r"^(y[0-9]{3,})=([A-Z][A-Za-z0-9]+)\(([^)]+)\)$").unwrap();
    static ref NAMED_CONSTANT_PATTERN: Regex = Regex::new(r"^([^\]]+)\[([^\]]+)\]$").unwrap();
}

const CONSTANT_KIND: &str = "ConstantNode";
const INT_CONSTANT_KIND: &str = "IntConstantNode";
const SPECIAL_CONSTANT_KIND: &str = "SpecialConstantNode";
const VARIABLE_KIND: &str = "VariableNode";
const GROUP_CONSTANT_KIND: &str = "GroupConstantNode";

#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("Failed to read model file: {0}")]
    FileReadError(#[from] std::io::Error),
    #[error("No model parsed")]
    NoModel,
    #[error("Cannot parse line {line}: '{content}'")]
    InvalidLine { line: usize, content: String },
    #[error("Unknown node kind {kind} on index {index}")]
    UnknownNode { index: String, kind: String },
    #[error("Cannot find child node of index {child} for node on index {index}")]
    MissingChild { index: String, child: String },
    #[error("Node {kind} on index {index} with parameter {payload} cannot be created")]
    InvalidPayload {
        index: String,
        kind: String,
        payload: String,
    },
    #[error("Node {kind} on index {index} takes {expected} children, found {found}")]
    Arity {
        index: String,
        kind: String,
        expected: usize,
        found: usize,
    },
}

fn format_index(index: usize) -> String {
    format!("y{:03}", index)
}

fn kind_name(node: &Node) -> &'static str {
    match node {
        Node::Constant(_) => CONSTANT_KIND,
        Node::IntConstant(_) => INT_CONSTANT_KIND,
        Node::Special(_) => SPECIAL_CONSTANT_KIND,
        Node::Variable(_) => VARIABLE_KIND,
        Node::Group(_) => GROUP_CONSTANT_KIND,
        Node::Unary(op, _) => op.kind_name(),
        Node::Binary(op, _) => op.kind_name(),
    }
}

fn leaf_payload(node: &Node) -> String {
    match node {
        Node::Constant(value) => format!("{:?}", value),
        Node::IntConstant(value) => value.to_string(),
        Node::Special(constant) => format!("{}[{:?}]", constant.name(), constant.value()),
        Node::Variable(index) => index.to_string(),
        Node::Group(constant) => constant
            .entries()
            .map(|(group, value)| format!("{}[{:?}]", group, value))
            .collect::<Vec<_>>()
            .join(","),
        Node::Unary(..) | Node::Binary(..) => String::new(),
    }
}

/// Writes a model in the tree text format, root last.
pub fn serialize(model: &Model) -> String {
    let mut next_index = 0;
    let mut open = VecDeque::from([(next_index, model.root())]);
    next_index += 1;

    let mut lines = Vec::new();
    while let Some((index, node)) = open.pop_front() {
        let payload = if node.is_leaf() {
            leaf_payload(node)
        } else {
            let mut references = Vec::with_capacity(node.children().len());
            for child in node.children() {
                references.push(format_index(next_index));
                open.push_back((next_index, child));
                next_index += 1;
            }
            references.join(",")
        };
        lines.push(format!("{}={}({})", format_index(index), kind_name(node), payload));
    }

    lines.iter().rev().map(|line| format!("{}\n", line)).collect()
}

/// Parses the tree text format. The node of the last line becomes the root.
pub fn deserialize(input: &str) -> Result<Model, SerializationError> {
    let mut nodes: HashMap<String, NodeRef> = HashMap::new();
    let mut root = None;

    for (number, raw) in input.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let captures =
            LINE_PATTERN
                .captures(line)
                .ok_or_else(|| SerializationError::InvalidLine {
                    line: number + 1,
                    content: line.to_string(),
                })?;
        let index = &captures[1];
        let node = Arc::new(parse_node(&nodes, index, &captures[2], &captures[3])?);
        nodes.insert(index.to_string(), Arc::clone(&node));
        root = Some(node);
    }

    root.map(Model::new).ok_or(SerializationError::NoModel)
}

fn parse_node(
    nodes: &HashMap<String, NodeRef>,
    index: &str,
    kind: &str,
    payload: &str,
) -> Result<Node, SerializationError> {
    let invalid = || SerializationError::InvalidPayload {
        index: index.to_string(),
        kind: kind.to_string(),
        payload: payload.to_string(),
    };

    match kind {
        CONSTANT_KIND => payload.parse().map(Node::Constant).map_err(|_| invalid()),
        INT_CONSTANT_KIND => payload.parse().map(Node::IntConstant).map_err(|_| invalid()),
        VARIABLE_KIND => payload.parse().map(Node::Variable).map_err(|_| invalid()),
        SPECIAL_CONSTANT_KIND => {
            let captures = NAMED_CONSTANT_PATTERN.captures(payload).ok_or_else(invalid)?;
            SpecialConstant::by_name(&captures[1])
                .map(Node::Special)
                .ok_or_else(invalid)
        }
        GROUP_CONSTANT_KIND => {
            let pairs = payload
                .split(',')
                .map(|entry| {
                    let captures = NAMED_CONSTANT_PATTERN.captures(entry).ok_or_else(invalid)?;
                    let value: f64 = captures[2].parse().map_err(|_| invalid())?;
                    Ok((captures[1].to_string(), value))
                })
                .collect::<Result<Vec<_>, SerializationError>>()?;
            Ok(Node::Group(GroupConstant::from_pairs(pairs)))
        }
        _ => {
            let children = payload
                .split(',')
                .map(|child| {
                    nodes
                        .get(child)
                        .cloned()
                        .ok_or_else(|| SerializationError::MissingChild {
                            index: index.to_string(),
                            child: child.to_string(),
                        })
                })
                .collect::<Result<Vec<_>, SerializationError>>()?;
            parse_operator(index, kind, children)
        }
    }
}

fn parse_operator(
    index: &str,
    kind: &str,
    mut children: Vec<NodeRef>,
) -> Result<Node, SerializationError> {
    let arity_error = |expected: usize, found: usize| SerializationError::Arity {
        index: index.to_string(),
        kind: kind.to_string(),
        expected,
        found,
    };

    if let Some(op) = UnaryOp::from_kind_name(kind) {
        return match children.pop() {
            Some(child) if children.is_empty() => Ok(Node::unary(op, child)),
            _ => Err(arity_error(1, children.len() + 1)),
        };
    }
    if let Some(op) = BinaryOp::from_kind_name(kind) {
        if children.len() != 2 {
            return Err(arity_error(2, children.len()));
        }
        let right = children.remove(1);
        let left = children.remove(0);
        return Ok(Node::binary(op, left, right));
    }
    Err(SerializationError::UnknownNode {
        index: index.to_string(),
        kind: kind.to_string(),
    })
}

/// Reads a model file written by [`serialize`].
pub fn load_model(path: &Path) -> Result<Model, SerializationError> {
    let content = fs::read_to_string(path)?;
    deserialize(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    const SQRT_MODEL: &str = "y003=ConstantNode(1.0)\n\
                              y002=SqrtNode(y003)\n\
                              y001=ConstantNode(2.0)\n\
                              y000=PlusNode(y001,y002)\n";

    fn sqrt_model() -> Model {
        Model::from_node(Node::binary(
            BinaryOp::Plus,
            Arc::new(Node::unary(UnaryOp::Sqrt, Arc::new(Node::Constant(1.0)))),
            Arc::new(Node::Constant(2.0)),
        ))
    }

    fn random_tree(rng: &mut StdRng, depth: usize) -> NodeRef {
        let kind = if depth == 0 { rng.random_range(0..5) } else { rng.random_range(0..7) };
        let node = match kind {
            0 => Node::Constant(rng.random_range(-1e6..1e6)),
            1 => Node::IntConstant(rng.random()),
            2 => Node::Variable(rng.random_range(0..4)),
            3 => Node::Special(crate::expression::constants::SPECIAL_CONSTANTS[rng.random_range(0..17)]),
            4 => Node::Group(GroupConstant::from_pairs(vec![
                ("b".to_string(), rng.random_range(-5.0..5.0)),
                ("a".to_string(), rng.random_range(-5.0..5.0)),
            ])),
            5 => Node::unary(
                UnaryOp::ALL[rng.random_range(0..UnaryOp::ALL.len())],
                random_tree(rng, depth - 1),
            ),
            _ => {
                let left = random_tree(rng, depth - 1);
                let right = random_tree(rng, depth - 1);
                Node::binary(BinaryOp::ALL[rng.random_range(0..BinaryOp::ALL.len())], left, right)
            }
        };
        Arc::new(node)
    }

    #[test]
    fn test_serialize() {
        assert_eq!(serialize(&sqrt_model()), SQRT_MODEL);
    }

    #[test]
    fn test_deserialize() {
        let model = deserialize(SQRT_MODEL).unwrap();
        assert_eq!(model.to_string(), "(2.0+sqrt(1.0))");
        assert_eq!(model, sqrt_model());
    }

    #[test]
    fn test_leaf_payloads() {
        let model = Model::from_node(Node::Special(SpecialConstant::by_name("pi").unwrap()));
        assert_eq!(serialize(&model), "y000=SpecialConstantNode(pi[3.141592653589793])\n");

        let model = Model::from_node(Node::Group(GroupConstant::from_pairs(vec![
            ("abc".to_string(), 0.0),
            ("def".to_string(), 1.5),
        ])));
        assert_eq!(serialize(&model), "y000=GroupConstantNode(abc[0.0],def[1.5])\n");

        let model = Model::from_node(Node::IntConstant(10));
        assert_eq!(serialize(&model), "y000=IntConstantNode(10)\n");

        let model = Model::from_node(Node::Variable(2));
        assert_eq!(serialize(&model), "y000=VariableNode(2)\n");
    }

    #[test]
    fn test_deserialize_errors() {
        assert!(matches!(deserialize(""), Err(SerializationError::NoModel)));
        assert!(matches!(deserialize("\n \n"), Err(SerializationError::NoModel)));
        assert!(matches!(
            deserialize("y000=PlusNode(y001,y002)"),
            Err(SerializationError::MissingChild { .. })
        ));
        assert!(matches!(
            deserialize("y000=FooNode(1.0)"),
            Err(SerializationError::MissingChild { .. }) | Err(SerializationError::UnknownNode { .. })
        ));
        assert!(matches!(
            deserialize("y001=ConstantNode(1.0)\ny000=FooNode(y001)"),
            Err(SerializationError::UnknownNode { .. })
        ));
        assert!(matches!(
            deserialize("y001=ConstantNode(1.0)\ny000=SqrtNode(y001,y001)"),
            Err(SerializationError::Arity { expected: 1, found: 2, .. })
        ));
        assert!(matches!(
            deserialize("y000=SpecialConstantNode(tau[6.28])"),
            Err(SerializationError::InvalidPayload { .. })
        ));
        assert!(matches!(
            deserialize("y000=ConstantNode(one)"),
            Err(SerializationError::InvalidPayload { .. })
        ));
        assert!(matches!(
            deserialize("x000=ConstantNode(1.0)"),
            Err(SerializationError::InvalidLine { line: 1, .. })
        ));
    }

    #[test]
    fn test_dataset_group_labels_round_trip() {
        let rows = crate::data::parse_rows("1.0,site-a,2.0\n2.0,b_x,3.0\n3.0,inf,1.0").unwrap();
        let input = crate::data::DataInput::new(rows).unwrap();
        let mut ctx = crate::expression::mutation::MutationContext::new(
            input.x_length(),
            Arc::clone(input.groups()),
            Some(5),
        );
        let model = Model::from_node(Node::random_group(&mut ctx));
        let restored = deserialize(&serialize(&model)).unwrap();
        assert_eq!(restored.to_string(), model.to_string());
    }

    #[test]
    fn test_wide_indices_are_accepted() {
        let model = deserialize("y1000=ConstantNode(4.0)\ny0999=NegativeNode(y1000)").unwrap();
        assert_eq!(model.to_string(), "-4.0");
    }

    #[test]
    fn test_load_model_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("best.model");
        let mut file = File::create(&file_path).unwrap();
        write!(file, "{}", SQRT_MODEL).unwrap();

        let model = load_model(&file_path).unwrap();
        assert_eq!(model.size(), 4);
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 64, ..ProptestConfig::default() })]

        #[test]
        fn prop_round_trip_keeps_display_form(seed in any::<u64>(), depth in 0usize..5) {
            let mut rng = StdRng::seed_from_u64(seed);
            let model = Model::new(random_tree(&mut rng, depth));
            let text = serialize(&model);
            let parsed = deserialize(&text).unwrap();
            prop_assert_eq!(parsed.to_string(), model.to_string());
            prop_assert_eq!(parsed.size(), model.size());
            prop_assert_eq!(text.lines().count(), model.size());
        }
    }
}
