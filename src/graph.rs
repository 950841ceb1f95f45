use crate::node::FlowNode;
use ahash::AHashSet;
use indexmap::IndexMap;
use itertools::Itertools;
use std::collections::VecDeque;
use thiserror::Error;

/// Rejected graph edits.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphEditError {
    #[error("Node '{0}' does not exist")]
    UnknownNode(String),

    #[error("Node '{node_id}' has no output port '{port}'")]
    UnknownPort { node_id: String, port: String },
}

/// A directed graph of flow nodes with a start pointer.
///
/// The start pointer is not checked on construction; [`validate`](Self::validate)
/// reports a dangling one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlowGraph {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_node_id: Option<String>,
    nodes: IndexMap<String, FlowNode>,
}

impl FlowGraph {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// The display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn node(&self, id: &str) -> Option<&FlowNode> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut FlowNode> {
        self.nodes.get_mut(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &FlowNode> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn start_node(&self) -> Option<&FlowNode> {
        self.start_node_id.as_deref().and_then(|id| self.nodes.get(id))
    }

    /// Adds or replaces a node by id.
    pub fn add_node(&mut self, node: FlowNode) -> Option<FlowNode> {
        self.nodes.insert(node.id.clone(), node)
    }

    pub fn with_node(mut self, node: FlowNode) -> Self {
        self.add_node(node);
        self
    }

    pub fn with_start(mut self, id: impl Into<String>) -> Self {
        self.start_node_id = Some(id.into());
        self
    }

    /// Removes a node together with every connection pointing at it. Clears
    /// the start pointer if it referenced the node.
    pub fn remove_node(&mut self, id: &str) -> Option<FlowNode> {
        let removed = self.nodes.shift_remove(id)?;
        for node in self.nodes.values_mut() {
            node.connections.retain(|_, target| target != id);
        }
        if self.start_node_id.as_deref() == Some(id) {
            self.start_node_id = None;
        }
        Some(removed)
    }

    /// Connects `source`'s `port` to `target`, replacing any earlier connection.
    pub fn connect(&mut self, source: &str, port: &str, target: &str) -> Result<(), GraphEditError> {
        if !self.nodes.contains_key(target) {
            return Err(GraphEditError::UnknownNode(target.to_string()));
        }
        let node = self
            .nodes
            .get_mut(source)
            .ok_or_else(|| GraphEditError::UnknownNode(source.to_string()))?;
        if !node.has_port(port) {
            return Err(GraphEditError::UnknownPort {
                node_id: source.to_string(),
                port: port.to_string(),
            });
        }
        node.set_connection(port, Some(target.to_string()));
        Ok(())
    }

    pub fn disconnect(&mut self, source: &str, port: &str) -> Option<String> {
        self.nodes
            .get_mut(source)
            .and_then(|node| node.connections.shift_remove(port))
    }

    /// Ids of the nodes with a connection into `id`.
    pub fn incoming(&self, id: &str) -> Vec<&str> {
        self.nodes
            .values()
            .filter(|node| node.connections.values().any(|target| target == id))
            .map(|node| node.id.as_str())
            .collect()
    }

    /// Ids reachable from the start node, breadth first.
    pub fn reachable_from_start(&self) -> AHashSet<&str> {
        let mut seen = AHashSet::new();
        let Some(start) = self.start_node() else {
            return seen;
        };
        let mut queue = VecDeque::from([start]);
        seen.insert(start.id.as_str());
        while let Some(node) = queue.pop_front() {
            for target in node.connections.values() {
                if let Some(next) = self.nodes.get(target) {
                    if seen.insert(next.id.as_str()) {
                        queue.push_back(next);
                    }
                }
            }
        }
        seen
    }

    /// Lists every structural and per-node defect. Empty means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        match self.start_node_id.as_deref() {
            None => errors.push("Flow has no start node".to_string()),
            Some(id) if !self.nodes.contains_key(id) => {
                errors.push(format!("Start node '{}' does not exist", id));
            }
            Some(_) => {}
        }

        let reachable = self.reachable_from_start();
        for node in self.nodes.values() {
            let label = format!("{} ({})", node.display_name, node.id);
            for error in node.validate() {
                errors.push(format!("{}: {}", label, error));
            }
            for (port, target) in &node.connections {
                if !self.nodes.contains_key(target) {
                    errors.push(format!(
                        "{}: Output '{}' connects to missing node '{}'",
                        label, port, target
                    ));
                }
            }
            if self.start_node_id.is_some() && !reachable.contains(node.id.as_str()) {
                errors.push(format!("{}: Node is not reachable from start", label));
            }
        }
        errors
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// An independent copy; edits to it never affect `self`.
    pub fn deep_copy(&self) -> Self {
        self.clone()
    }

    /// `(node id, param, values)` for every deprecated per-node tier array,
    /// for one-time conversion into a template-level tier config.
    pub fn legacy_tier_values(&self) -> Vec<(&str, &str, &[f64])> {
        self.nodes
            .values()
            .flat_map(|node| {
                node.legacy_tier_values()
                    .iter()
                    .sorted_by(|a, b| a.0.cmp(b.0))
                    .map(move |(param, values)| (node.id.as_str(), param.as_str(), values.as_slice()))
            })
            .collect()
    }
}
