//! The closed set of flow node types.
//!
//! A [`FlowNode`] is plain data: identity, editor position, a parameter bag
//! and output-port connections. Its behavior is selected by [`NodeKind`] and
//! dispatched by pattern match in [`execute`](FlowNode::execute); there is no
//! open registration of new node types.

mod execute;
mod validate;

pub use execute::{NodeServices, Step};

use crate::value::ParamValue;
use ahash::AHashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminant of a node, as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Start,
    Effect,
    Condition,
    Delay,
    Loop,
    Random,
    Variable,
    Target,
    Math,
    SkipCooldown,
}

impl NodeType {
    pub const ALL: [NodeType; 10] = [
        NodeType::Start,
        NodeType::Effect,
        NodeType::Condition,
        NodeType::Delay,
        NodeType::Loop,
        NodeType::Random,
        NodeType::Variable,
        NodeType::Target,
        NodeType::Math,
        NodeType::SkipCooldown,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NodeType::Start => "START",
            NodeType::Effect => "EFFECT",
            NodeType::Condition => "CONDITION",
            NodeType::Delay => "DELAY",
            NodeType::Loop => "LOOP",
            NodeType::Random => "RANDOM",
            NodeType::Variable => "VARIABLE",
            NodeType::Target => "TARGET",
            NodeType::Math => "MATH",
            NodeType::SkipCooldown => "SKIP_COOLDOWN",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            NodeType::Start => "Start",
            NodeType::Effect => "Effect",
            NodeType::Condition => "Condition",
            NodeType::Delay => "Delay",
            NodeType::Loop => "Loop",
            NodeType::Random => "Random",
            NodeType::Variable => "Variable",
            NodeType::Target => "Target",
            NodeType::Math => "Math",
            NodeType::SkipCooldown => "Skip Cooldown",
        }
    }

    /// Deprecated types still load and run, but editors no longer offer them.
    pub fn is_deprecated(self) -> bool {
        matches!(self, NodeType::Random | NodeType::Target | NodeType::Math)
    }

    /// Case-insensitive lookup; unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        Self::ALL.into_iter().find(|t| t.name() == upper)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Type-specific node data.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Start,
    Effect { effect: Option<String> },
    Condition { expression: Option<String> },
    Delay,
    Loop,
    Random,
    Variable,
    Target,
    Math,
    SkipCooldown,
}

impl NodeKind {
    pub fn new(node_type: NodeType) -> Self {
        match node_type {
            NodeType::Start => NodeKind::Start,
            NodeType::Effect => NodeKind::Effect { effect: None },
            NodeType::Condition => NodeKind::Condition { expression: None },
            NodeType::Delay => NodeKind::Delay,
            NodeType::Loop => NodeKind::Loop,
            NodeType::Random => NodeKind::Random,
            NodeType::Variable => NodeKind::Variable,
            NodeType::Target => NodeKind::Target,
            NodeType::Math => NodeKind::Math,
            NodeType::SkipCooldown => NodeKind::SkipCooldown,
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Start => NodeType::Start,
            NodeKind::Effect { .. } => NodeType::Effect,
            NodeKind::Condition { .. } => NodeType::Condition,
            NodeKind::Delay => NodeType::Delay,
            NodeKind::Loop => NodeType::Loop,
            NodeKind::Random => NodeType::Random,
            NodeKind::Variable => NodeType::Variable,
            NodeKind::Target => NodeType::Target,
            NodeKind::Math => NodeType::Math,
            NodeKind::SkipCooldown => NodeType::SkipCooldown,
        }
    }
}

/// A node in a flow graph.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowNode {
    pub id: String,
    pub display_name: String,
    pub x: i32,
    pub y: i32,
    pub kind: NodeKind,
    pub params: IndexMap<String, ParamValue>,
    /// Output port name to target node id.
    pub connections: IndexMap<String, String>,
    legacy_tier_values: AHashMap<String, Vec<f64>>,
}

impl FlowNode {
    pub fn new(id: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            display_name: node_type.display_name().to_string(),
            x: 0,
            y: 0,
            kind: NodeKind::new(node_type),
            params: IndexMap::new(),
            connections: IndexMap::new(),
            legacy_tier_values: AHashMap::new(),
        }
    }

    pub fn start(id: impl Into<String>) -> Self {
        Self::new(id, NodeType::Start)
    }

    pub fn effect(id: impl Into<String>, effect: impl Into<String>) -> Self {
        let mut node = Self::new(id, NodeType::Effect);
        node.set_effect(Some(effect.into()));
        node
    }

    pub fn condition(id: impl Into<String>, expression: impl Into<String>) -> Self {
        let mut node = Self::new(id, NodeType::Condition);
        node.kind = NodeKind::Condition {
            expression: Some(expression.into()),
        };
        node
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_position(mut self, x: i32, y: i32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_connection(mut self, port: impl Into<String>, target: impl Into<String>) -> Self {
        self.connections.insert(port.into(), target.into());
        self
    }

    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    /// The effect name of an EFFECT node.
    pub fn effect_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Effect { effect } => effect.as_deref().filter(|e| !e.is_empty()),
            _ => None,
        }
    }

    /// Sets the effect of an EFFECT node and renames it after the effect.
    /// No-op on other node types.
    pub fn set_effect(&mut self, new_effect: Option<String>) {
        if let NodeKind::Effect { effect } = &mut self.kind {
            if let Some(name) = new_effect.as_deref().filter(|e| !e.is_empty()) {
                self.display_name = name.to_string();
            }
            *effect = new_effect;
        }
    }

    /// The expression of a CONDITION node.
    pub fn condition_expression(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Condition { expression } => expression.as_deref().filter(|e| !e.is_empty()),
            _ => None,
        }
    }

    pub fn set_condition_expression(&mut self, new_expression: Option<String>) {
        if let NodeKind::Condition { expression } = &mut self.kind {
            *expression = new_expression;
        }
    }

    /// The name an editor shows when nothing custom was set.
    pub fn default_display_name(&self) -> String {
        self.effect_name()
            .map(str::to_string)
            .unwrap_or_else(|| self.node_type().display_name().to_string())
    }

    /// The fixed output ports of this node's type.
    pub fn output_ports(&self) -> Vec<String> {
        match self.kind {
            NodeKind::Condition { .. } => vec!["yes".into(), "no".into()],
            NodeKind::Loop => vec!["body".into(), "done".into()],
            NodeKind::Random => (1..=self.random_path_count())
                .map(|i| format!("path{}", i))
                .collect(),
            NodeKind::SkipCooldown => Vec::new(),
            _ => vec!["next".into()],
        }
    }

    pub fn has_port(&self, port: &str) -> bool {
        self.output_ports().iter().any(|p| p == port)
    }

    pub(crate) fn random_path_count(&self) -> usize {
        self.int_param("pathCount", 2).clamp(2, 4) as usize
    }

    pub fn connection(&self, port: &str) -> Option<&str> {
        self.connections.get(port).map(String::as_str)
    }

    pub fn set_connection(&mut self, port: impl Into<String>, target: Option<String>) {
        let port = port.into();
        match target {
            Some(target) => {
                self.connections.insert(port, target);
            }
            None => {
                self.connections.shift_remove(&port);
            }
        }
    }

    /// An independent copy with the same id, position, parameters and connections.
    pub fn deep_copy(&self) -> Self {
        self.clone()
    }

    // --- Parameters ---

    pub fn param(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.params.insert(key.into(), value.into());
    }

    pub fn string_param(&self, key: &str, default: &str) -> String {
        match self.params.get(key) {
            Some(ParamValue::Text(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => default.to_string(),
        }
    }

    /// Reads a number, parsing numeric strings. Placeholders yield `default`.
    pub fn float_param(&self, key: &str, default: f64) -> f64 {
        self.params
            .get(key)
            .and_then(ParamValue::as_f64)
            .unwrap_or(default)
    }

    pub fn int_param(&self, key: &str, default: i64) -> i64 {
        self.params
            .get(key)
            .and_then(ParamValue::as_f64)
            .map(|n| n as i64)
            .unwrap_or(default)
    }

    pub fn bool_param(&self, key: &str, default: bool) -> bool {
        self.params
            .get(key)
            .and_then(ParamValue::as_bool)
            .unwrap_or(default)
    }

    // --- Legacy per-node tier values ---

    /// Tier arrays stored on the node by old configurations.
    ///
    /// Read-only: these are superseded by the template-level tier config and
    /// are never written back out.
    pub fn legacy_tier_values(&self) -> &AHashMap<String, Vec<f64>> {
        &self.legacy_tier_values
    }

    pub(crate) fn load_legacy_tier_values(&mut self, param: String, values: Vec<f64>) {
        self.legacy_tier_values.insert(param, values);
    }

    /// A one-line summary used in traces and editor tooltips.
    pub fn describe(&self) -> String {
        match &self.kind {
            NodeKind::Effect { .. } => match self.effect_name() {
                Some(effect) => format!("Effect: {}", effect),
                None => "Effect: (none)".to_string(),
            },
            NodeKind::Condition { .. } => format!(
                "Condition: {}",
                self.condition_expression().unwrap_or("(none)")
            ),
            NodeKind::Delay => format!("Delay: {}s", self.string_param("duration", "1")),
            NodeKind::Loop => match self.string_param("type", "COUNT").to_ascii_uppercase().as_str() {
                "WHILE" => format!("Loop while: {}", self.string_param("condition", "")),
                _ => format!("Loop: {} times", self.string_param("count", "3")),
            },
            NodeKind::Variable => format!(
                "Variable: {} {} {}",
                self.string_param("name", "myVar"),
                self.string_param("operation", "SET"),
                self.string_param("value", "0")
            ),
            _ => self.display_name.clone(),
        }
    }
}
