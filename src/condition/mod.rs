//! The built-in condition language used by CONDITION and LOOP nodes and by
//! flow gating conditions.
//!
//! Expressions combine comparisons with `AND`/`OR`/`NOT` (or `&&`, `||`,
//! `!`), for example `{damage} >= 10 AND random(25%)`. Placeholders are
//! resolved against the context before parsing. Words that are not numbers
//! or booleans are host predicates and go to the fallback evaluator.

mod engine;
pub mod expression;
mod parser;

pub use engine::EPSILON;
pub use expression::{Condition, Operand};
pub use parser::{MAX_NESTING, MAX_OPERATORS, parse};

use crate::context::FlowContext;
use crate::error::ConditionError;
use crate::host::ConditionEvaluator;
use engine::ConditionEngine;
use std::sync::Arc;

/// The default [`ConditionEvaluator`].
#[derive(Clone, Default)]
pub struct ExpressionEvaluator {
    fallback: Option<Arc<dyn ConditionEvaluator>>,
}

impl ExpressionEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delegates host predicates (e.g. `HAS_MARK:burn`) to `fallback`.
    pub fn with_fallback(mut self, fallback: Arc<dyn ConditionEvaluator>) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

impl ConditionEvaluator for ExpressionEvaluator {
    fn evaluate(&self, expression: &str, ctx: &FlowContext) -> Result<bool, ConditionError> {
        let resolved = ctx.resolve_placeholders(expression);
        let condition = parse(&resolved)?;
        let result = ConditionEngine::new(ctx, self.fallback.as_deref()).evaluate(&condition);
        tracing::trace!(expression, resolved = %resolved, ?result, "condition evaluated");
        result
    }
}
