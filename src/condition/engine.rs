use super::expression::{Condition, Operand};
use crate::context::FlowContext;
use crate::error::ConditionError;
use crate::host::ConditionEvaluator;
use rand::Rng;

/// Tolerance for numeric equality.
pub const EPSILON: f64 = 0.0001;

// This macro generates a match arm for an ordering comparison.
macro_rules! cmp_op {
    ($self:ident, $l:ident, $r:ident, $op_fn:expr) => {
        Ok(match ($self.number($l), $self.number($r)) {
            (Some(a), Some(b)) => $op_fn(a, b),
            // Text has no ordering.
            _ => false,
        })
    };
}

/// Evaluates one parsed condition against a context.
pub(super) struct ConditionEngine<'a> {
    ctx: &'a FlowContext,
    fallback: Option<&'a dyn ConditionEvaluator>,
}

impl<'a> ConditionEngine<'a> {
    pub(super) fn new(ctx: &'a FlowContext, fallback: Option<&'a dyn ConditionEvaluator>) -> Self {
        Self { ctx, fallback }
    }

    pub(super) fn evaluate(&self, condition: &Condition) -> Result<bool, ConditionError> {
        match condition {
            // --- Logical Operations ---
            Condition::Not(c) => Ok(!self.evaluate(c)?),
            Condition::And(l, r) => Ok(self.evaluate(l)? && self.evaluate(r)?),
            Condition::Or(l, r) => Ok(self.evaluate(l)? || self.evaluate(r)?),

            // --- Equality ---
            Condition::Equal(l, r) => Ok(self.equals(l, r)),
            Condition::NotEqual(l, r) => Ok(!self.equals(l, r)),

            // --- Ordering ---
            Condition::GreaterThan(l, r) => cmp_op!(self, l, r, |a: f64, b: f64| a > b),
            Condition::GreaterThanOrEqual(l, r) => cmp_op!(self, l, r, |a: f64, b: f64| a >= b),
            Condition::SmallerThan(l, r) => cmp_op!(self, l, r, |a: f64, b: f64| a < b),
            Condition::SmallerThanOrEqual(l, r) => cmp_op!(self, l, r, |a: f64, b: f64| a <= b),

            // --- Leaves ---
            Condition::Literal(b) => Ok(*b),
            Condition::Chance(percent) => Ok(rand::rng().random_range(0.0..100.0) < *percent),
            Condition::Predicate(predicate) => match self.fallback {
                Some(fallback) => fallback.evaluate(predicate, self.ctx),
                None => Err(ConditionError::UnresolvedPredicate(predicate.clone())),
            },
        }
    }

    fn text(&self, operand: &Operand) -> String {
        match operand {
            Operand::Number(n) => n.to_string(),
            Operand::Text(s) => s.clone(),
            Operand::Variable(name) => self
                .ctx
                .variable(name)
                .map(|v| v.to_string())
                .unwrap_or_default(),
        }
    }

    fn number(&self, operand: &Operand) -> Option<f64> {
        match operand {
            Operand::Number(n) => Some(*n),
            Operand::Text(s) => s.trim().parse().ok(),
            Operand::Variable(name) => self.ctx.variable(name).and_then(|v| v.as_f64()),
        }
    }

    fn equals(&self, l: &Operand, r: &Operand) -> bool {
        match (self.number(l), self.number(r)) {
            (Some(a), Some(b)) => (a - b).abs() < EPSILON,
            _ => self.text(l) == self.text(r),
        }
    }
}
