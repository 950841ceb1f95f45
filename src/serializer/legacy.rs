//! The oldest schema: nodes keyed by id under one `nodes` map, with
//! optional per-node `tierValues` arrays. Read-only; graphs are always
//! written back in the current schema.

use super::record::NodeRecord;
use crate::graph::FlowGraph;
use crate::node::FlowNode;
use crate::tier::parameter::parse_lenient;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyNodeRecord {
    #[serde(rename = "type", default)]
    node_type: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default, alias = "x")]
    grid_x: i32,
    #[serde(default, alias = "y")]
    grid_y: i32,
    #[serde(default, alias = "effect")]
    effect_type: Option<String>,
    #[serde(default)]
    condition: Option<String>,
    #[serde(default)]
    params: IndexMap<String, Value>,
    #[serde(default)]
    connections: IndexMap<String, Value>,
    #[serde(default)]
    tier_values: IndexMap<String, Value>,
}

/// Reads a legacy `nodes` map into `graph`, skipping entries that are not
/// maps, fail to decode, or have an unknown type.
pub(super) fn read_nodes(nodes: &Map<String, Value>, graph: &mut FlowGraph) {
    for (id, raw) in nodes {
        if !raw.is_object() {
            tracing::warn!(node = %id, "legacy node entry is not a map, skipped");
            continue;
        }
        let record: LegacyNodeRecord = match serde_json::from_value(raw.clone()) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(node = %id, error = %e, "malformed legacy node, skipped");
                continue;
            }
        };
        if let Some(node) = into_node(id, record, raw) {
            graph.add_node(node);
        }
    }
}

fn into_node(id: &str, record: LegacyNodeRecord, raw: &Value) -> Option<FlowNode> {
    let tier_values = record.tier_values;
    let current = NodeRecord {
        id: id.to_string(),
        node_type: record.node_type.unwrap_or_else(|| "EFFECT".to_string()),
        display_name: record.display_name,
        x: record.grid_x,
        y: record.grid_y,
        effect: record.effect_type,
        condition: record.condition,
        params: record.params,
        next: None,
        connections: record.connections,
    };
    let mut node = current.into_node(raw)?;

    for (param, values) in tier_values {
        match values {
            Value::Array(items) => {
                node.load_legacy_tier_values(param, items.iter().map(parse_lenient).collect());
            }
            _ => {
                tracing::debug!(node = %id, param = %param, "legacy tier values are not a list, skipped");
            }
        }
    }
    Some(node)
}
