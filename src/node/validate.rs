use super::{FlowNode, NodeKind};
use crate::value::ParamValue;
use regex::Regex;
use std::sync::LazyLock;

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("valid identifier regex"));

impl FlowNode {
    /// Lists configuration defects of this node. An empty list means valid.
    ///
    /// Besides type-specific checks, every declared output port without a
    /// connection is reported.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        match &self.kind {
            NodeKind::Effect { .. } => {
                if self.effect_name().is_none() {
                    errors.push("Effect type not configured".to_string());
                }
            }
            NodeKind::Condition { .. } => {
                if self.condition_expression().is_none() {
                    errors.push("Condition expression not configured".to_string());
                }
            }
            NodeKind::Delay => {
                let literal = self.params.get("duration").filter(|v| !v.has_placeholder());
                if let Some(value) = literal {
                    if value.as_f64().is_none_or(|d| d <= 0.0) {
                        errors.push("Duration must be greater than 0".to_string());
                    }
                }
            }
            NodeKind::Loop => self.validate_loop(&mut errors),
            NodeKind::Variable => {
                if self.string_param("name", "myVar").trim().is_empty() {
                    errors.push("Variable name not configured".to_string());
                }
            }
            NodeKind::Random => self.validate_random(&mut errors),
            NodeKind::Math => {
                let result = self.string_param("result", "result");
                if !IDENTIFIER_RE.is_match(&result) {
                    errors.push("Result variable name must be a valid identifier".to_string());
                }
            }
            NodeKind::Target => {
                let target_type = self.string_param("targetType", "SELF").to_ascii_uppercase();
                if target_type == "MARKED" && self.string_param("markName", "").is_empty() {
                    errors.push("Marked target requires a mark name".to_string());
                }
            }
            NodeKind::Start | NodeKind::SkipCooldown => {}
        }

        for port in self.output_ports() {
            if self.connection(&port).is_none() {
                errors.push(format!("Output '{}' is not connected", port));
            }
        }

        errors
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    fn validate_loop(&self, errors: &mut Vec<String>) {
        if self.string_param("type", "COUNT").eq_ignore_ascii_case("WHILE") {
            if self.string_param("condition", "").trim().is_empty() {
                errors.push("While loop requires a condition".to_string());
            }
            return;
        }
        match self.params.get("count") {
            Some(value) if value.has_placeholder() => {}
            Some(value) if value.as_f64().is_none_or(|c| c < 1.0) => {
                errors.push("Loop count must be at least 1".to_string());
            }
            _ => {}
        }
    }

    fn validate_random(&self, errors: &mut Vec<String>) {
        if let Some(ParamValue::Int(count)) = self.params.get("pathCount") {
            if !(2..=4).contains(count) {
                errors.push("Path count must be between 2 and 4".to_string());
            }
        }
        let paths = self.random_path_count();
        let weights: Vec<f64> = (1..=paths)
            .map(|i| self.float_param(&format!("weight{}", i), 1.0))
            .collect();
        let total: f64 = weights.iter().sum();
        if !total.is_finite() {
            errors.push("Path weights must be finite".to_string());
        }
        if weights.iter().any(|w| *w < 0.0) {
            errors.push("Path weights cannot be negative".to_string());
        }
        if total <= 0.0 {
            errors.push("Total path weight must be greater than 0".to_string());
        }
    }
}
