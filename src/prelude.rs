//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from the
//! sigilflow crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use sigilflow::prelude::*;
//! use std::sync::Arc;
//!
//! # fn run_example() -> Result<()> {
//! let json = std::fs::read_to_string("path/to/template.json")?;
//! let template = FlowSerializer::template_from_json(&json, "template")?;
//!
//! let executor = FlowExecutor::new(Arc::new(EffectRegistry::new()), Arc::new(TickQueue::new()));
//! for flow in template.flows() {
//!     println!("{}: valid = {}", flow.id(), executor.validate(&flow.graph));
//! }
//! # Ok(())
//! # }
//! ```

// Model
pub use crate::flow::{AbilityTemplate, ConditionLogic, FlowConfig, FlowSet, FlowType};
pub use crate::graph::FlowGraph;
pub use crate::node::{FlowNode, NodeKind, NodeType, Step};
pub use crate::value::ParamValue;

// Execution
pub use crate::condition::ExpressionEvaluator;
pub use crate::context::{Actor, CancelHandle, FlowContext, TriggerMetadata};
pub use crate::executor::{FlowExecutor, Limits};
pub use crate::host::{
    ConditionEvaluator, EffectLibrary, EffectParams, EffectRegistry, TickQueue, TickScheduler,
};

// Tiers
pub use crate::tier::{
    ActivationScaling, ActivationTrigger, ResolvedActivation, ScalingMode, TierParameterConfig,
    TierScalingConfig,
};

// Persistence
pub use crate::serializer::{FlowSerializer, SchemaVersion};

// Error types
pub use crate::error::{ConditionError, FlowError, HostError, NodeError, SerializeError};

// Trace formatting
pub use crate::trace::TraceFormatter;

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
