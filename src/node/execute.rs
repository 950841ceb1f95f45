use super::{FlowNode, NodeKind};
use crate::context::FlowContext;
use crate::error::NodeError;
use crate::host::{ConditionEvaluator, EffectLibrary, EffectParams};
use crate::value::ParamValue;
use rand::Rng;

/// Game ticks per second of delay.
pub const TICKS_PER_SECOND: f64 = 20.0;

/// Params consumed by the EFFECT node itself, not passed to the effect.
const EFFECT_RESERVED_PARAMS: [&str; 3] = ["storeAs", "effectType", "chance"];

const LOOP_COUNTER_PREFIX: &str = "_loop_iteration_";

/// What the executor does after a node ran.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Follow the connection on this port.
    Continue(String),
    /// Follow the connection on this port after `ticks` ticks.
    Suspend { port: String, ticks: u64 },
    /// End the current branch.
    End,
}

impl Step {
    pub fn port(&self) -> Option<&str> {
        match self {
            Step::Continue(port) | Step::Suspend { port, .. } => Some(port),
            Step::End => None,
        }
    }

    fn next() -> Self {
        Step::Continue("next".to_string())
    }
}

/// Collaborators available to a node while it runs.
#[derive(Clone, Copy)]
pub struct NodeServices<'a> {
    pub effects: &'a dyn EffectLibrary,
    pub conditions: &'a dyn ConditionEvaluator,
}

impl FlowNode {
    /// Runs this node against `ctx` and selects the next step.
    pub fn execute(&self, ctx: &mut FlowContext, services: NodeServices<'_>) -> Result<Step, NodeError> {
        match &self.kind {
            NodeKind::Start => Ok(Step::next()),
            NodeKind::Effect { .. } => self.run_effect(ctx, services.effects),
            NodeKind::Condition { .. } => self.run_condition(ctx, services.conditions),
            NodeKind::Delay => Ok(self.run_delay(ctx)),
            NodeKind::Loop => self.run_loop(ctx, services.conditions),
            NodeKind::Variable => Ok(self.run_variable(ctx)),
            NodeKind::SkipCooldown => {
                ctx.set_skip_cooldown(true);
                Ok(Step::End)
            }
            NodeKind::Random => Ok(self.run_random()),
            NodeKind::Target => Ok(self.run_target(ctx)),
            NodeKind::Math => Ok(self.run_math(ctx)),
        }
    }

    fn run_effect(&self, ctx: &mut FlowContext, effects: &dyn EffectLibrary) -> Result<Step, NodeError> {
        let Some(effect) = self.effect_name() else {
            tracing::debug!(node = %self.id, "effect node has no effect configured");
            return Ok(Step::next());
        };

        if let Some(chance) = self.params.get("chance") {
            let chance = match chance {
                ParamValue::Text(text) => ctx.resolve_numeric(text, 100.0),
                other => other.as_f64().unwrap_or(100.0),
            };
            let chance = if chance.is_finite() {
                chance
            } else {
                tracing::debug!(node = %self.id, effect, "effect chance is not a finite number, treated as unset");
                100.0
            };
            if chance < 100.0 && rand::rng().random_range(0.0..100.0) >= chance {
                tracing::debug!(node = %self.id, effect, chance, "effect chance roll failed");
                return Ok(Step::next());
            }
        }

        let params: EffectParams = self
            .params
            .iter()
            .filter(|(key, _)| !EFFECT_RESERVED_PARAMS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), ctx.resolve_param(value)))
            .collect();

        let fired = effects
            .execute(effect, &params, ctx)
            .map_err(|e| NodeError::Effect {
                effect: effect.to_string(),
                message: e.to_string(),
            })?;
        if fired {
            ctx.record_effect();
        }
        if let Some(ParamValue::Text(name)) = self.params.get("storeAs") {
            if !name.is_empty() {
                ctx.set_variable(name.clone(), fired);
            }
        }
        Ok(Step::next())
    }

    fn run_condition(
        &self,
        ctx: &mut FlowContext,
        conditions: &dyn ConditionEvaluator,
    ) -> Result<Step, NodeError> {
        let Some(expression) = self.condition_expression() else {
            return Ok(Step::Continue("yes".to_string()));
        };
        if ctx.is_test_mode() {
            tracing::debug!(node = %self.id, expression, "test mode takes the 'yes' branch");
            return Ok(Step::Continue("yes".to_string()));
        }
        let passed = conditions
            .evaluate(expression, ctx)
            .map_err(|source| NodeError::Condition {
                expression: expression.to_string(),
                source,
            })?;
        Ok(Step::Continue(if passed { "yes" } else { "no" }.to_string()))
    }

    /// Delay in ticks for the configured `duration` (seconds).
    pub fn delay_ticks(&self, ctx: &FlowContext) -> u64 {
        let seconds = match self.params.get("duration") {
            Some(ParamValue::Text(text)) => ctx.resolve_numeric(text, 1.0),
            Some(other) => other.as_f64().unwrap_or(1.0),
            None => 1.0,
        };
        (seconds.max(0.0) * TICKS_PER_SECOND) as u64
    }

    fn run_delay(&self, ctx: &FlowContext) -> Step {
        Step::Suspend {
            port: "next".to_string(),
            ticks: self.delay_ticks(ctx),
        }
    }

    fn run_loop(
        &self,
        ctx: &mut FlowContext,
        conditions: &dyn ConditionEvaluator,
    ) -> Result<Step, NodeError> {
        let counter_key = format!("{}{}", LOOP_COUNTER_PREFIX, self.id);
        let iteration = ctx.variable_f64(&counter_key, 0.0) as i64;

        let should_loop = if self.string_param("type", "COUNT").eq_ignore_ascii_case("WHILE") {
            let condition = self.string_param("condition", "");
            conditions
                .evaluate(&condition, ctx)
                .map_err(|source| NodeError::Condition {
                    expression: condition.clone(),
                    source,
                })?
        } else {
            let count = match self.params.get("count") {
                Some(ParamValue::Text(text)) => ctx.resolve_numeric(text, 3.0) as i64,
                _ => self.int_param("count", 3),
            };
            iteration < count
        };

        if should_loop {
            ctx.set_variable(counter_key, iteration + 1);
            ctx.set_variable("iteration", iteration + 1);
            Ok(Step::Continue("body".to_string()))
        } else {
            ctx.set_variable(counter_key, 0);
            Ok(Step::Continue("done".to_string()))
        }
    }

    fn run_variable(&self, ctx: &mut FlowContext) -> Step {
        let name = self.string_param("name", "myVar");
        let scope = self.string_param("scope", "FLOW");
        if !scope.eq_ignore_ascii_case("FLOW") {
            tracing::debug!(node = %self.id, scope = %scope, "variable scope is stored per traversal");
        }

        let value = match self.params.get("value") {
            Some(ParamValue::Text(text)) => ctx.resolve_numeric(text, 0.0),
            Some(other) => other.as_f64().unwrap_or(0.0),
            None => 0.0,
        };
        let current = ctx.variable_f64(&name, 0.0);
        let result = match self.string_param("operation", "SET").to_ascii_uppercase().as_str() {
            "ADD" => current + value,
            "SUBTRACT" => current - value,
            "MULTIPLY" => current * value,
            "DIVIDE" if value != 0.0 => current / value,
            "DIVIDE" => current,
            _ => value,
        };
        ctx.set_variable(name, result);
        Step::next()
    }

    fn run_random(&self) -> Step {
        let paths = self.random_path_count();
        let weights: Vec<f64> = (1..=paths)
            .map(|i| self.float_param(&format!("weight{}", i), 1.0))
            .map(|w| if w.is_finite() { w.max(0.0) } else { 0.0 })
            .collect();
        let total: f64 = weights.iter().sum();
        if !total.is_finite() || total <= 0.0 {
            return Step::Continue("path1".to_string());
        }
        let mut roll = rand::rng().random_range(0.0..total);
        for (i, weight) in weights.iter().enumerate() {
            if roll < *weight {
                return Step::Continue(format!("path{}", i + 1));
            }
            roll -= weight;
        }
        Step::Continue(format!("path{}", paths))
    }

    fn run_target(&self, ctx: &mut FlowContext) -> Step {
        let target_type = self.string_param("targetType", "SELF").to_ascii_uppercase();
        match target_type.as_str() {
            "SELF" => {
                let actor = ctx.actor().cloned();
                ctx.set_target(actor);
            }
            "VICTIM" => {
                let victim = ctx.victim().cloned();
                ctx.set_target(victim);
            }
            other => {
                tracing::debug!(node = %self.id, target_type = other, "target type needs a world query, target unchanged");
            }
        }
        Step::next()
    }

    fn run_math(&self, ctx: &mut FlowContext) -> Step {
        let operand = |key: &str| match self.params.get(key) {
            Some(ParamValue::Text(text)) => ctx.resolve_numeric(text, 0.0),
            Some(other) => other.as_f64().unwrap_or(0.0),
            None => 0.0,
        };
        let left = operand("left");
        let right = operand("right");
        let operation = self.string_param("operation", "ADD").to_ascii_uppercase();
        let result = math_op(&operation, left, right);
        let target = self.string_param("result", "result");
        ctx.set_variable(target, result);
        Step::next()
    }
}

fn math_op(operation: &str, left: f64, right: f64) -> f64 {
    match operation {
        "SUBTRACT" => left - right,
        "MULTIPLY" => left * right,
        "DIVIDE" if right != 0.0 => left / right,
        "MODULO" if right != 0.0 => left % right,
        "DIVIDE" | "MODULO" => 0.0,
        "MIN" => left.min(right),
        "MAX" => left.max(right),
        "ABS" => left.abs(),
        "ROUND" => left.round(),
        "FLOOR" => left.floor(),
        "CEIL" => left.ceil(),
        "RANDOM" if !(right - left).is_finite() => {
            if left.is_finite() { left } else { 0.0 }
        }
        "RANDOM" => {
            let (low, high) = if left <= right { (left, right) } else { (right, left) };
            if low == high {
                low
            } else {
                rand::rng().random_range(low..high)
            }
        }
        "POWER" => left.powf(right),
        "SQRT" if left >= 0.0 => left.sqrt(),
        "SQRT" => 0.0,
        _ => left + right,
    }
}

#[cfg(test)]
mod tests {
    use super::math_op;

    #[test]
    fn test_math_division_by_zero_yields_zero() {
        assert_eq!(math_op("DIVIDE", 5.0, 0.0), 0.0);
        assert_eq!(math_op("MODULO", 5.0, 0.0), 0.0);
        assert_eq!(math_op("DIVIDE", 9.0, 3.0), 3.0);
    }

    #[test]
    fn test_math_unknown_operation_adds() {
        assert_eq!(math_op("BOGUS", 2.0, 3.0), 5.0);
    }

    #[test]
    fn test_math_random_stays_in_range() {
        for _ in 0..50 {
            let v = math_op("RANDOM", 10.0, 2.0);
            assert!((2.0..10.0).contains(&v));
        }
    }

    #[test]
    fn test_math_random_with_unbounded_range() {
        assert_eq!(math_op("RANDOM", 4.0, f64::INFINITY), 4.0);
        assert_eq!(math_op("RANDOM", f64::NAN, 5.0), 0.0);
        assert_eq!(math_op("RANDOM", f64::MAX, f64::MIN), f64::MAX);
    }
}
