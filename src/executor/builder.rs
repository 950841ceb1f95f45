use super::{ExecutorInner, FlowExecutor, Limits};
use crate::condition::ExpressionEvaluator;
use crate::host::{ConditionEvaluator, EffectLibrary, TickScheduler};
use std::sync::Arc;

/// Builder for a [`FlowExecutor`].
pub struct FlowExecutorBuilder {
    effects: Arc<dyn EffectLibrary>,
    scheduler: Arc<dyn TickScheduler>,
    conditions: Option<Arc<dyn ConditionEvaluator>>,
    limits: Limits,
}

impl FlowExecutorBuilder {
    pub(super) fn new(effects: Arc<dyn EffectLibrary>, scheduler: Arc<dyn TickScheduler>) -> Self {
        Self {
            effects,
            scheduler,
            conditions: None,
            limits: Limits::default(),
        }
    }

    /// Replaces the built-in [`ExpressionEvaluator`].
    pub fn with_conditions(mut self, conditions: Arc<dyn ConditionEvaluator>) -> Self {
        self.conditions = Some(conditions);
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.limits.max_nodes = max_nodes;
        self
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.limits.max_depth = max_depth;
        self
    }

    pub fn build(self) -> FlowExecutor {
        let conditions = self
            .conditions
            .unwrap_or_else(|| Arc::new(ExpressionEvaluator::new()));
        FlowExecutor::from_inner(ExecutorInner {
            effects: self.effects,
            conditions,
            scheduler: self.scheduler,
            limits: self.limits,
        })
    }
}
