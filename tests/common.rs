//! Common test utilities for building flows, hosts and templates.
use parking_lot::Mutex;
use sigilflow::prelude::*;
use std::sync::Arc;

/// One recorded effect invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectCall {
    pub effect: String,
    pub params: EffectParams,
}

/// An effect library that records every call.
///
/// `FAIL` returns an error, `CANCEL` cancels the context, `NOOP` reports
/// that it did not fire, and every other name fires.
#[derive(Default)]
pub struct RecordingEffects {
    calls: Mutex<Vec<EffectCall>>,
}

#[allow(dead_code)]
impl RecordingEffects {
    pub fn calls(&self) -> Vec<EffectCall> {
        self.calls.lock().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.effect.clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl EffectLibrary for RecordingEffects {
    fn execute(
        &self,
        effect: &str,
        params: &EffectParams,
        ctx: &mut FlowContext,
    ) -> std::result::Result<bool, HostError> {
        self.calls.lock().push(EffectCall {
            effect: effect.to_string(),
            params: params.clone(),
        });
        match effect {
            "FAIL" => Err("effect blew up".into()),
            "CANCEL" => {
                ctx.cancel();
                Ok(true)
            }
            "NOOP" => Ok(false),
            _ => Ok(true),
        }
    }

    fn has_effect(&self, effect: &str) -> bool {
        effect != "UNKNOWN"
    }
}

/// An actor that collects the diagnostics shown to it.
#[derive(Default)]
pub struct RecordingActor {
    pub offline: bool,
    messages: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl RecordingActor {
    /// An actor that has left; diagnostics must not reach it.
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

impl Actor for RecordingActor {
    fn name(&self) -> &str {
        "tester"
    }

    fn is_online(&self) -> bool {
        !self.offline
    }

    fn send_diagnostic(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}

/// An executor wired to recording collaborators and a manual tick queue.
pub struct Harness {
    pub executor: FlowExecutor,
    pub queue: Arc<TickQueue>,
    pub effects: Arc<RecordingEffects>,
    pub actor: Arc<RecordingActor>,
}

#[allow(dead_code)]
impl Harness {
    pub fn new() -> Self {
        Self::with_limits(Limits::default())
    }

    pub fn with_limits(limits: Limits) -> Self {
        let queue = Arc::new(TickQueue::new());
        let effects = Arc::new(RecordingEffects::default());
        let executor = FlowExecutor::builder(effects.clone(), queue.clone())
            .with_limits(limits)
            .build();
        Self {
            executor,
            queue,
            effects,
            actor: Arc::new(RecordingActor::default()),
        }
    }

    /// A fresh tier-1 context with the recording actor attached.
    pub fn context(&self) -> FlowContext {
        self.context_with(TriggerMetadata::default())
    }

    pub fn context_with(&self, metadata: TriggerMetadata) -> FlowContext {
        FlowContext::new(metadata).with_actor(self.actor.clone())
    }
}

/// `START -> e1 -> e2 -> ...`, one EFFECT node per name.
#[allow(dead_code)]
pub fn linear_graph(effects: &[&str]) -> FlowGraph {
    let mut graph = FlowGraph::new("linear").with_start("start");
    let mut previous = FlowNode::start("start");
    for (i, effect) in effects.iter().enumerate() {
        let id = format!("e{}", i + 1);
        graph.add_node(previous.with_connection("next", id.clone()));
        previous = FlowNode::effect(id, *effect);
    }
    graph.add_node(previous);
    graph
}

/// `START -> A -> B -> A`, both EFFECT nodes, no delay.
#[allow(dead_code)]
pub fn cycle_graph() -> FlowGraph {
    FlowGraph::new("cycle")
        .with_start("start")
        .with_node(FlowNode::start("start").with_connection("next", "a"))
        .with_node(FlowNode::effect("a", "PING").with_connection("next", "b"))
        .with_node(FlowNode::effect("b", "PONG").with_connection("next", "a"))
}

/// `START -> DELAY(seconds) -> EFFECT(DAMAGE)`.
#[allow(dead_code)]
pub fn delay_graph(seconds: f64) -> FlowGraph {
    FlowGraph::new("delayed")
        .with_start("start")
        .with_node(FlowNode::start("start").with_connection("next", "wait"))
        .with_node(
            FlowNode::new("wait", NodeType::Delay)
                .with_param("duration", seconds)
                .with_connection("next", "hit"),
        )
        .with_node(FlowNode::effect("hit", "DAMAGE"))
}

#[allow(dead_code)]
pub fn shared(graph: FlowGraph) -> Arc<FlowGraph> {
    Arc::new(graph)
}

/// A current-schema flow with five nodes, one of an unknown type.
#[allow(dead_code)]
pub const FIVE_NODE_FLOW_JSON: &str = r#"{
    "id": "five",
    "type": "SIGNAL",
    "trigger": "ATTACK",
    "startNodeId": "start",
    "nodes": [
        { "id": "start", "type": "START", "x": 0, "y": 0, "next": "check" },
        { "id": "check", "type": "CONDITION", "x": 1, "y": 0,
          "condition": "{damage} > 5",
          "connections": { "yes": "hit", "no": "mystery" } },
        { "id": "hit", "type": "EFFECT", "x": 2, "y": 0, "effect": "DAMAGE",
          "params": { "amount": 10.0, "target": "@Victim", "crit": false } },
        { "id": "mystery", "type": "TELEPORT_TO_MOON", "x": 2, "y": 1 },
        { "id": "stop", "type": "SKIP_COOLDOWN", "x": 3, "y": 0 }
    ]
}"#;

/// A legacy graph section: nodes keyed by id, per-node tier arrays.
#[allow(dead_code)]
pub const LEGACY_GRAPH_JSON: &str = r#"{
    "id": "old_flow",
    "name": "Old Flow",
    "startNodeId": "start",
    "nodes": {
        "start": { "type": "START", "gridX": 0, "gridY": 0,
                   "connections": { "next": "burn" } },
        "burn": { "type": "EFFECT", "effectType": "IGNITE", "gridX": 1, "gridY": 0,
                  "params": { "duration": 3 },
                  "tierValues": { "duration": [3, 4, "bogus", 6] } },
        "broken": "not a map"
    }
}"#;

/// A multi-flow template with a tier section.
#[allow(dead_code)]
pub const MULTI_TEMPLATE_JSON: &str = r#"{
    "id": "storm",
    "tier": {
        "mode": "BOTH",
        "params": { "damage": [5, 7.5, 10], "base_chance": [20, 20, 20] }
    },
    "flow": { "startNodeId": "ignored", "nodes": [] },
    "flows": [
        {
            "id": "on_hit",
            "trigger": "ATTACK",
            "chance": 20,
            "priority": 5,
            "conditions": { "list": ["{damage} > 1", "false"], "logic": "OR" },
            "startNodeId": "start",
            "nodes": [
                { "id": "start", "type": "START", "next": "zap",
                  "params": { "chance": "{base_chance}" } },
                { "id": "zap", "type": "EFFECT", "effect": "LIGHTNING",
                  "params": { "damage": "{damage}" } }
            ]
        },
        {
            "id": "cast",
            "type": "ABILITY",
            "cooldown": 10,
            "startNodeId": "start",
            "nodes": [
                { "id": "start", "type": "START", "next": "boom" },
                { "id": "boom", "type": "EFFECT", "effect": "EXPLODE" }
            ]
        },
        "not a flow",
        {
            "id": "low_priority",
            "trigger": "attack",
            "startNodeId": "start",
            "nodes": [ { "id": "start", "type": "START" } ]
        }
    ]
}"#;
