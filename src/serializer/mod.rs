//! Reading and writing flows as configuration trees.
//!
//! Three schema generations are understood:
//!
//! - **legacy**: a graph section whose `nodes` is a map keyed by node id,
//!   nodes may carry deprecated `tierValues` arrays;
//! - **current**: `nodes` is a list of node maps (`id`, `type`, `x`, `y`,
//!   `params`, and either `next` or `connections`), one `flow` per template;
//! - **current-multi**: a template with a `flows` list of current-schema flows.
//!
//! Reading is tolerant: a node or flow that cannot be read is skipped and
//! logged, and loading carries on with the rest. Writing always produces
//! the current schema.

mod legacy;
mod record;

use crate::error::SerializeError;
use crate::flow::{AbilityTemplate, ConditionLogic, FlowConfig, FlowSet, FlowType};
use crate::graph::FlowGraph;
use crate::tier::TierScalingConfig;
use crate::tier::parameter::{number_to_value, parse_lenient};
use record::NodeRecord;
use serde_json::{Map, Value};
use std::sync::Arc;

/// The schema generation of a configuration section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaVersion {
    Legacy,
    Current,
    CurrentMulti,
}

/// Converts between the flow model and `serde_json::Value` trees.
pub struct FlowSerializer;

impl FlowSerializer {
    /// Identifies the schema of a template or flow section.
    pub fn detect_schema(section: &Value) -> Option<SchemaVersion> {
        if section
            .get("flows")
            .and_then(Value::as_array)
            .is_some_and(|flows| !flows.is_empty())
        {
            return Some(SchemaVersion::CurrentMulti);
        }
        let flow = section.get("flow").unwrap_or(section);
        match flow.get("nodes") {
            Some(Value::Object(_)) => Some(SchemaVersion::Legacy),
            Some(Value::Array(_)) => Some(SchemaVersion::Current),
            _ => None,
        }
    }

    // --- Reading ---

    /// Reads a graph section in either the legacy or the current schema.
    pub fn graph_from_value(section: &Value, default_id: &str) -> Result<FlowGraph, SerializeError> {
        let map = section.as_object().ok_or_else(|| SerializeError::MalformedSection {
            section: default_id.to_string(),
            expected: "map".to_string(),
        })?;

        let id = str_field(map, "id").unwrap_or(default_id).to_string();
        let mut graph = FlowGraph::new(id);
        graph.name = str_field(map, "name").map(str::to_string);
        graph.description = str_field(map, "description").map(str::to_string);
        graph.start_node_id = str_field(map, "startNodeId")
            .or_else(|| str_field(map, "start_node_id"))
            .map(str::to_string);

        match map.get("nodes") {
            Some(Value::Array(nodes)) => read_current_nodes(nodes, &mut graph),
            Some(Value::Object(nodes)) => legacy::read_nodes(nodes, &mut graph),
            Some(Value::Null) | None => {}
            Some(_) => {
                return Err(SerializeError::MalformedSection {
                    section: format!("{}.nodes", graph.id),
                    expected: "list or map".to_string(),
                });
            }
        }
        Ok(graph)
    }

    /// Reads one flow: its activation metadata plus its graph.
    pub fn flow_config_from_value(section: &Value, default_id: &str) -> Result<FlowConfig, SerializeError> {
        let graph = Self::graph_from_value(section, default_id)?;
        let mut flow = FlowConfig::new(graph);

        if let Some(raw) = section.get("type").and_then(Value::as_str) {
            flow.flow_type = raw.parse().unwrap_or_else(|e: String| {
                tracing::warn!(flow = %flow.id(), "{}, using SIGNAL", e);
                FlowType::Signal
            });
        }
        flow.trigger = section
            .get("trigger")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        if let Some(cooldown) = section.get("cooldown") {
            flow.cooldown = parse_lenient(cooldown);
        }
        if let Some(chance) = section.get("chance") {
            flow.chance = parse_lenient(chance);
        }
        if let Some(priority) = section.get("priority") {
            flow.priority = parse_lenient(priority) as i32;
        }
        read_conditions(section.get("conditions"), &mut flow);
        Ok(flow)
    }

    /// Reads a list of flows, skipping entries that are not readable maps.
    pub fn flow_configs_from_value(list: &Value, id_prefix: &str) -> Vec<FlowConfig> {
        let Some(items) = list.as_array() else {
            tracing::warn!(section = id_prefix, "flows section is not a list");
            return Vec::new();
        };
        items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| {
                let default_id = format!("{}_{}", id_prefix, i + 1);
                match Self::flow_config_from_value(item, &default_id) {
                    Ok(flow) => Some(flow),
                    Err(e) => {
                        tracing::warn!(flow = %default_id, error = %e, "unreadable flow skipped");
                        None
                    }
                }
            })
            .collect()
    }

    /// Reads an ability template. A non-empty `flows` list wins over a
    /// single `flow` section; a root that itself has `nodes` is read as a
    /// single flow.
    pub fn template_from_value(section: &Value, default_id: &str) -> Result<AbilityTemplate, SerializeError> {
        let map = section.as_object().ok_or_else(|| SerializeError::MalformedSection {
            section: default_id.to_string(),
            expected: "map".to_string(),
        })?;
        let id = str_field(map, "id").unwrap_or(default_id).to_string();

        let flows = match Self::detect_schema(section) {
            Some(SchemaVersion::CurrentMulti) => {
                let flows = Self::flow_configs_from_value(&map["flows"], &id);
                if flows.is_empty() {
                    tracing::warn!(template = %id, "no readable flows in 'flows'");
                }
                FlowSet::Multi(flows)
            }
            Some(_) => {
                let flow_section = map.get("flow").unwrap_or(section);
                FlowSet::Single(Self::flow_config_from_value(flow_section, &id)?)
            }
            None => return Err(SerializeError::NoFlows(id)),
        };

        let tier_scaling = map.get("tier").map(TierScalingConfig::from_value);
        let defined_tiers = tier_scaling
            .as_ref()
            .map(|config| config.params.defined_tiers())
            .unwrap_or(0);
        let max_tier = map
            .get("maxTier")
            .or_else(|| map.get("max_tier"))
            .map(|v| parse_lenient(v) as i32)
            .unwrap_or(defined_tiers as i32)
            .max(1);

        Ok(AbilityTemplate {
            id,
            max_tier,
            tier_scaling: tier_scaling.map(Arc::new),
            flows,
        })
    }

    pub fn template_from_json(json: &str, default_id: &str) -> Result<AbilityTemplate, SerializeError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| SerializeError::JsonParseError(e.to_string()))?;
        Self::template_from_value(&value, default_id)
    }

    // --- Writing ---

    /// Writes a graph in the current schema.
    pub fn graph_to_value(graph: &FlowGraph) -> Result<Value, SerializeError> {
        let mut map = Map::new();
        write_graph(graph, &mut map)?;
        Ok(Value::Object(map))
    }

    pub fn flow_config_to_value(flow: &FlowConfig) -> Result<Value, SerializeError> {
        let mut map = Map::new();
        map.insert("type".to_string(), Value::from(flow.flow_type.name()));
        if let Some(trigger) = &flow.trigger {
            map.insert("trigger".to_string(), Value::from(trigger.as_str()));
        }
        if flow.cooldown > 0.0 {
            map.insert("cooldown".to_string(), number_to_value(flow.cooldown));
        }
        if flow.chance < 100.0 {
            map.insert("chance".to_string(), number_to_value(flow.chance));
        }
        if flow.priority != 1 {
            map.insert("priority".to_string(), Value::from(flow.priority));
        }
        if !flow.conditions.is_empty() {
            let list = Value::from(flow.conditions.clone());
            let conditions = match flow.condition_logic {
                ConditionLogic::And => list,
                ConditionLogic::Or => {
                    let mut section = Map::new();
                    section.insert("list".to_string(), list);
                    section.insert("logic".to_string(), Value::from(ConditionLogic::Or.name()));
                    Value::Object(section)
                }
            };
            map.insert("conditions".to_string(), conditions);
        }
        write_graph(&flow.graph, &mut map)?;
        Ok(Value::Object(map))
    }

    pub fn flow_configs_to_value(flows: &[FlowConfig]) -> Result<Value, SerializeError> {
        flows
            .iter()
            .map(Self::flow_config_to_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    pub fn template_to_value(template: &AbilityTemplate) -> Result<Value, SerializeError> {
        let mut map = Map::new();
        map.insert("id".to_string(), Value::from(template.id.as_str()));
        if template.max_tier > 1 {
            map.insert("maxTier".to_string(), Value::from(template.max_tier));
        }
        if let Some(config) = &template.tier_scaling {
            map.insert("tier".to_string(), config.to_value());
        }
        match &template.flows {
            FlowSet::Single(flow) => {
                map.insert("flow".to_string(), Self::flow_config_to_value(flow)?);
            }
            FlowSet::Multi(flows) => {
                map.insert("flows".to_string(), Self::flow_configs_to_value(flows)?);
            }
        }
        Ok(Value::Object(map))
    }

    pub fn template_to_json_pretty(template: &AbilityTemplate) -> Result<String, SerializeError> {
        let value = Self::template_to_value(template)?;
        serde_json::to_string_pretty(&value).map_err(|e| SerializeError::EncodeError(e.to_string()))
    }
}

fn str_field<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn read_current_nodes(nodes: &[Value], graph: &mut FlowGraph) {
    for (i, raw) in nodes.iter().enumerate() {
        if !raw.is_object() {
            tracing::warn!(graph = %graph.id, index = i, "node entry is not a map, skipped");
            continue;
        }
        match serde_json::from_value::<NodeRecord>(raw.clone()) {
            Ok(record) => {
                if let Some(node) = record.into_node(raw) {
                    graph.add_node(node);
                }
            }
            Err(e) => {
                tracing::warn!(graph = %graph.id, index = i, error = %e, "malformed node skipped");
            }
        }
    }
}

fn read_conditions(section: Option<&Value>, flow: &mut FlowConfig) {
    let (list, logic) = match section {
        Some(Value::Array(list)) => (Some(list), None),
        Some(Value::Object(map)) => (
            map.get("list").and_then(Value::as_array),
            map.get("logic").and_then(Value::as_str),
        ),
        _ => (None, None),
    };
    if let Some(list) = list {
        flow.conditions = list
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
    }
    if let Some(logic) = logic {
        flow.condition_logic = logic.parse().unwrap_or_else(|e: String| {
            tracing::warn!(flow = %flow.id(), "{}, using AND", e);
            ConditionLogic::And
        });
    }
}

fn write_graph(graph: &FlowGraph, map: &mut Map<String, Value>) -> Result<(), SerializeError> {
    map.insert("id".to_string(), Value::from(graph.id.as_str()));
    if let Some(name) = &graph.name {
        map.insert("name".to_string(), Value::from(name.as_str()));
    }
    if let Some(description) = &graph.description {
        map.insert("description".to_string(), Value::from(description.as_str()));
    }
    if let Some(start) = &graph.start_node_id {
        map.insert("startNodeId".to_string(), Value::from(start.as_str()));
    }
    let nodes = graph
        .nodes()
        .map(|node| NodeRecord::from_node(node).to_value())
        .collect::<Result<Vec<_>, _>>()?;
    if !nodes.is_empty() {
        map.insert("nodes".to_string(), Value::Array(nodes));
    }
    Ok(())
}
