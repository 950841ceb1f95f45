//! # Sigilflow - Ability Flow Engine
//!
//! **Sigilflow** runs item abilities described as directed graphs of typed
//! nodes (effects, conditions, delays, loops, variables). It is a small
//! interpreter with explicit safety ceilings, a tier system that scales
//! ability numbers by power level, and a serializer that reads every
//! historical on-disk shape of those graphs.
//!
//! ## Core Workflow
//!
//! 1.  **Load**: read a template tree with [`FlowSerializer`](serializer::FlowSerializer).
//!     Unknown node types and malformed entries are skipped, not fatal.
//! 2.  **Wire the host**: implement [`EffectLibrary`](host::EffectLibrary) and
//!     [`TickScheduler`](host::TickScheduler) (or use the in-memory
//!     [`EffectRegistry`](host::EffectRegistry) and [`TickQueue`](host::TickQueue)).
//! 3.  **Execute**: build a [`FlowExecutor`](executor::FlowExecutor) and run a
//!     flow's graph with a fresh [`FlowContext`](context::FlowContext) per trigger.
//!
//! ## Quick Start
//!
//! ```rust
//! use sigilflow::prelude::*;
//! use std::sync::Arc;
//!
//! let json = r#"{
//!     "id": "ember",
//!     "tier": { "mode": "PARAMETER", "params": { "damage": [4, 6, 8] } },
//!     "flow": {
//!         "trigger": "ATTACK",
//!         "startNodeId": "start",
//!         "nodes": [
//!             { "id": "start", "type": "START", "next": "burn" },
//!             { "id": "burn", "type": "EFFECT", "effect": "DAMAGE",
//!               "params": { "amount": "{damage}" } }
//!         ]
//!     }
//! }"#;
//! let template = FlowSerializer::template_from_json(json, "ember").unwrap();
//!
//! let effects = EffectRegistry::new().with_effect("DAMAGE", |params, _ctx| {
//!     assert_eq!(params["amount"], ParamValue::Int(6));
//!     Ok(true)
//! });
//! let queue = Arc::new(TickQueue::new());
//! let executor = FlowExecutor::new(Arc::new(effects), queue.clone());
//!
//! let flow = template.flows_for_trigger("ATTACK")[0];
//! let ctx = FlowContext::new(template.metadata_for(2));
//! let ctx = executor.execute_with_context(&flow.graph, ctx).unwrap();
//! assert_eq!(ctx.effects_executed(), 1);
//! ```

pub mod condition;
pub mod context;
pub mod error;
pub mod executor;
pub mod flow;
pub mod graph;
pub mod host;
pub mod node;
pub mod prelude;
pub mod serializer;
pub mod tier;
pub mod trace;
pub mod value;
