use crate::error::SerializeError;
use crate::node::{FlowNode, NodeType};
use crate::value::ParamValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A node as written in the current schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct NodeRecord {
    pub id: String,
    #[serde(rename = "type", default = "default_node_type")]
    pub node_type: String,
    #[serde(default, alias = "display_name", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, alias = "gridX")]
    pub x: i32,
    #[serde(default, alias = "gridY")]
    pub y: i32,
    #[serde(default, alias = "effectType", skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub params: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub connections: IndexMap<String, Value>,
}

fn default_node_type() -> String {
    NodeType::Effect.name().to_string()
}

impl NodeRecord {
    /// Builds the node, or `None` when the type is not a known node type.
    ///
    /// `raw` is the map the record came from; declared ports written as
    /// top-level keys (`yes: other_node`) are picked up from it.
    pub fn into_node(self, raw: &Value) -> Option<FlowNode> {
        let Some(node_type) = NodeType::from_name(&self.node_type) else {
            tracing::debug!(node = %self.id, node_type = %self.node_type, "unknown node type, node dropped");
            return None;
        };

        let mut node = FlowNode::new(self.id, node_type).with_position(self.x, self.y);
        for (key, value) in &self.params {
            match ParamValue::from_json(value) {
                Some(param) => {
                    node.params.insert(key.clone(), param);
                }
                None => {
                    tracing::debug!(node = %node.id, param = %key, "parameter has no literal form, skipped");
                }
            }
        }
        node.set_effect(self.effect);
        node.set_condition_expression(self.condition);
        if let Some(name) = self.display_name.filter(|n| !n.is_empty()) {
            node.display_name = name;
        }

        if let Some(next) = self.next {
            node.set_connection("next", Some(next));
        }
        for (port, target) in self.connections {
            if let Value::String(target) = target {
                node.set_connection(port, Some(target));
            }
        }
        for port in node.output_ports() {
            if node.connection(&port).is_some() {
                continue;
            }
            if let Some(target) = raw.get(&port).and_then(Value::as_str) {
                node.set_connection(port, Some(target.to_string()));
            }
        }
        Some(node)
    }

    pub fn from_node(node: &FlowNode) -> Self {
        let (next, connections) = if node.connections.len() == 1 && node.connection("next").is_some() {
            (node.connection("next").map(str::to_string), IndexMap::new())
        } else {
            let map = node
                .connections
                .iter()
                .map(|(port, target)| (port.clone(), Value::String(target.clone())))
                .collect();
            (None, map)
        };
        let display_name = (node.display_name != node.default_display_name())
            .then(|| node.display_name.clone());

        Self {
            id: node.id.clone(),
            node_type: node.node_type().name().to_string(),
            display_name,
            x: node.x,
            y: node.y,
            effect: node.effect_name().map(str::to_string),
            condition: node.condition_expression().map(str::to_string),
            params: node
                .params
                .iter()
                .map(|(key, value)| (key.clone(), value.to_json()))
                .collect(),
            next,
            connections,
        }
    }

    pub fn to_value(&self) -> Result<Value, SerializeError> {
        serde_json::to_value(self).map_err(|e| SerializeError::EncodeError(e.to_string()))
    }
}
