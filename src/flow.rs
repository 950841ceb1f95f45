use crate::context::{FlowContext, TriggerMetadata};
use crate::graph::FlowGraph;
use crate::host::ConditionEvaluator;
use crate::node::NodeType;
use crate::tier::{ActivationScaling, ActivationTrigger, ResolvedActivation, TierScalingConfig};
use crate::value::ParamValue;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// How a flow is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowType {
    /// Runs when its trigger signal fires.
    #[default]
    Signal,
    /// Runs when invoked directly.
    Ability,
}

impl FlowType {
    pub fn name(self) -> &'static str {
        match self {
            FlowType::Signal => "SIGNAL",
            FlowType::Ability => "ABILITY",
        }
    }
}

impl FromStr for FlowType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SIGNAL" => Ok(FlowType::Signal),
            "ABILITY" => Ok(FlowType::Ability),
            other => Err(format!("unknown flow type '{}'", other)),
        }
    }
}

impl fmt::Display for FlowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a flow's gating conditions combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionLogic {
    #[default]
    And,
    Or,
}

impl ConditionLogic {
    pub fn name(self) -> &'static str {
        match self {
            ConditionLogic::And => "AND",
            ConditionLogic::Or => "OR",
        }
    }
}

impl FromStr for ConditionLogic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(ConditionLogic::And),
            "OR" => Ok(ConditionLogic::Or),
            other => Err(format!("unknown condition logic '{}'", other)),
        }
    }
}

/// A graph plus the metadata deciding when it runs.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowConfig {
    pub flow_type: FlowType,
    pub trigger: Option<String>,
    /// Seconds.
    pub cooldown: f64,
    /// Percent.
    pub chance: f64,
    pub priority: i32,
    pub conditions: Vec<String>,
    pub condition_logic: ConditionLogic,
    pub graph: Arc<FlowGraph>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            flow_type: FlowType::Signal,
            trigger: None,
            cooldown: 0.0,
            chance: 100.0,
            priority: 1,
            conditions: Vec::new(),
            condition_logic: ConditionLogic::And,
            graph: Arc::new(FlowGraph::default()),
        }
    }
}

impl FlowConfig {
    pub fn new(graph: FlowGraph) -> Self {
        Self {
            graph: Arc::new(graph),
            ..Self::default()
        }
    }

    pub fn signal(trigger: impl Into<String>, graph: FlowGraph) -> Self {
        Self {
            trigger: Some(trigger.into()),
            ..Self::new(graph)
        }
    }

    pub fn ability(graph: FlowGraph) -> Self {
        Self {
            flow_type: FlowType::Ability,
            ..Self::new(graph)
        }
    }

    pub fn is_signal(&self) -> bool {
        self.flow_type == FlowType::Signal
    }

    pub fn is_ability(&self) -> bool {
        self.flow_type == FlowType::Ability
    }

    pub fn id(&self) -> &str {
        &self.graph.id
    }

    pub fn has_nodes(&self) -> bool {
        self.graph.node_count() > 0
    }

    /// Mutable access to the graph, copying it first if it is shared.
    pub fn graph_mut(&mut self) -> &mut FlowGraph {
        Arc::make_mut(&mut self.graph)
    }

    /// A copy that shares nothing with `self`.
    pub fn deep_copy(&self) -> Self {
        Self {
            graph: Arc::new(self.graph.deep_copy()),
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.is_signal() && self.trigger.as_deref().is_none_or(str::is_empty) {
            errors.push("Signal flow must have a trigger".to_string());
        }
        errors.extend(self.graph.validate());
        errors
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Evaluates the gating conditions. An empty list passes; a condition
    /// that cannot be evaluated counts as failed.
    pub fn conditions_pass(&self, evaluator: &dyn ConditionEvaluator, ctx: &FlowContext) -> bool {
        let mut results = self.conditions.iter().map(|condition| {
            evaluator.evaluate(condition, ctx).unwrap_or_else(|e| {
                tracing::warn!(flow = %self.id(), condition = %condition, error = %e, "flow condition failed to evaluate");
                false
            })
        });
        match self.condition_logic {
            ConditionLogic::And => results.all(|passed| passed),
            ConditionLogic::Or => self.conditions.is_empty() || results.any(|passed| passed),
        }
    }

    /// Copies the activation settings into the START node's params so the
    /// editor shows them on the node.
    pub fn sync_start_node(&mut self) {
        let cooldown = self.cooldown;
        let chance = self.chance;
        let trigger = self.trigger.clone();
        let flow_type = self.flow_type;
        let graph = self.graph_mut();
        let Some(start_id) = graph.start_node_id.clone() else {
            return;
        };
        let Some(start) = graph.node_mut(&start_id) else {
            return;
        };
        start.set_param("cooldown", cooldown);
        start.set_param("chance", chance);
        if let Some(trigger) = trigger {
            start.set_param("signal_type", trigger);
        }
        start.set_param("flow_type", flow_type.name());
    }

    /// Whether this flow is gated by a cooldown or by a chance roll.
    pub fn activation_trigger(&self) -> ActivationTrigger {
        if self.is_ability() || (self.cooldown > 0.0 && self.chance >= 100.0) {
            ActivationTrigger::Cooldown
        } else {
            ActivationTrigger::Chance
        }
    }

    /// Chance and cooldown before tier policy: START node params win over
    /// the flow fields, and may be `{placeholder}` text.
    pub fn base_activation(&self, ctx: &FlowContext) -> ResolvedActivation {
        let start = self
            .graph
            .start_node()
            .filter(|node| node.node_type() == NodeType::Start);
        let read = |key: &str, fallback: f64| match start.and_then(|node| node.param(key)) {
            Some(ParamValue::Text(text)) => {
                let resolved = ctx.resolve_activation(text);
                resolved.trim().parse().unwrap_or_else(|_| {
                    tracing::warn!(flow = %self.id(), param = key, value = %text, "unresolved activation placeholder");
                    fallback
                })
            }
            Some(value) => value.as_f64().unwrap_or(fallback),
            None => fallback,
        };
        ResolvedActivation {
            chance: read("chance", self.chance),
            cooldown: read("cooldown", self.cooldown),
        }
    }
}

/// The flows owned by one ability template.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowSet {
    Single(FlowConfig),
    Multi(Vec<FlowConfig>),
}

impl FlowSet {
    pub fn iter(&self) -> std::slice::Iter<'_, FlowConfig> {
        match self {
            FlowSet::Single(flow) => std::slice::from_ref(flow).iter(),
            FlowSet::Multi(flows) => flows.iter(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FlowSet::Single(_) => 1,
            FlowSet::Multi(flows) => flows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An item-bound ability definition.
#[derive(Debug, Clone, PartialEq)]
pub struct AbilityTemplate {
    pub id: String,
    pub max_tier: i32,
    pub tier_scaling: Option<Arc<TierScalingConfig>>,
    pub flows: FlowSet,
}

impl AbilityTemplate {
    pub fn single(id: impl Into<String>, flow: FlowConfig) -> Self {
        Self {
            id: id.into(),
            max_tier: 1,
            tier_scaling: None,
            flows: FlowSet::Single(flow),
        }
    }

    pub fn multi(id: impl Into<String>, flows: Vec<FlowConfig>) -> Self {
        Self {
            id: id.into(),
            max_tier: 1,
            tier_scaling: None,
            flows: FlowSet::Multi(flows),
        }
    }

    pub fn with_tier_scaling(mut self, config: TierScalingConfig) -> Self {
        self.tier_scaling = Some(Arc::new(config));
        self
    }

    pub fn with_max_tier(mut self, max_tier: i32) -> Self {
        self.max_tier = max_tier.max(1);
        self
    }

    pub fn flows(&self) -> impl Iterator<Item = &FlowConfig> {
        self.flows.iter()
    }

    /// Signal flows listening for `trigger`, highest priority first.
    pub fn flows_for_trigger(&self, trigger: &str) -> Vec<&FlowConfig> {
        self.flows
            .iter()
            .filter(|flow| {
                flow.is_signal()
                    && flow
                        .trigger
                        .as_deref()
                        .is_some_and(|t| t.eq_ignore_ascii_case(trigger))
            })
            .sorted_by(|a, b| b.priority.cmp(&a.priority))
            .collect()
    }

    /// The first manually-invoked flow.
    pub fn ability_flow(&self) -> Option<&FlowConfig> {
        self.flows.iter().find(|flow| flow.is_ability())
    }

    /// Trigger metadata for running one of this template's flows at `tier`.
    pub fn metadata_for(&self, tier: i32) -> TriggerMetadata {
        let mut metadata = TriggerMetadata::new(tier).with_ability(self.id.clone());
        metadata.tier_scaling = self.tier_scaling.clone();
        metadata
    }

    /// Final chance and cooldown of `flow` for the context's tier.
    ///
    /// START node params and placeholders are resolved first. When the
    /// template scales activation, the trigger-mode policy is applied on
    /// top of those base values.
    pub fn resolve_activation(&self, flow: &FlowConfig, ctx: &FlowContext) -> ResolvedActivation {
        let base = flow.base_activation(ctx);
        let scales = self
            .tier_scaling
            .as_deref()
            .is_some_and(TierScalingConfig::should_activation_scale);
        if !scales {
            return base;
        }
        ActivationScaling::resolve(
            flow.activation_trigger(),
            base.chance,
            base.cooldown,
            ctx.tier(),
            self.max_tier,
        )
    }

    /// Every validation defect, prefixed with the flow it belongs to.
    pub fn validate(&self) -> Vec<String> {
        self.flows
            .iter()
            .flat_map(|flow| {
                flow.validate()
                    .into_iter()
                    .map(move |e| format!("[{}] {}", flow.id(), e))
            })
            .collect()
    }
}
