use super::parameter::TierParameterConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Which numbers a template's tier scales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScalingMode {
    /// Effect parameter placeholders only.
    #[default]
    Parameter,
    /// Activation chance and cooldown only.
    ActivationOnly,
    Both,
}

impl ScalingMode {
    pub fn name(self) -> &'static str {
        match self {
            ScalingMode::Parameter => "PARAMETER",
            ScalingMode::ActivationOnly => "ACTIVATION_ONLY",
            ScalingMode::Both => "BOTH",
        }
    }
}

impl FromStr for ScalingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PARAMETER" => Ok(ScalingMode::Parameter),
            "ACTIVATION_ONLY" => Ok(ScalingMode::ActivationOnly),
            "BOTH" => Ok(ScalingMode::Both),
            other => Err(format!("unknown scaling mode '{}'", other)),
        }
    }
}

impl fmt::Display for ScalingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The template-level tier configuration: a scaling mode plus the
/// parameter table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TierScalingConfig {
    pub mode: ScalingMode,
    pub params: TierParameterConfig,
}

impl TierScalingConfig {
    pub fn new(mode: ScalingMode) -> Self {
        Self {
            mode,
            params: TierParameterConfig::new(),
        }
    }

    pub fn should_params_scale(&self) -> bool {
        matches!(self.mode, ScalingMode::Parameter | ScalingMode::Both)
    }

    pub fn should_activation_scale(&self) -> bool {
        matches!(self.mode, ScalingMode::ActivationOnly | ScalingMode::Both)
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.params.has_parameter(name)
    }

    pub fn param_value(&self, name: &str, tier: i32) -> f64 {
        self.params.get_value(name, tier)
    }

    pub fn add_scaled_param(&mut self, name: &str, max_tier: usize, base: f64) {
        self.params.add_parameter_with_scaling(name, max_tier, base);
    }

    /// Reads a `{mode, params}` section. An unknown mode falls back to
    /// [`ScalingMode::Parameter`].
    pub fn from_value(section: &Value) -> Self {
        let mode = match section.get("mode").and_then(Value::as_str) {
            Some(raw) => raw.parse().unwrap_or_else(|e: String| {
                tracing::warn!("{}, falling back to PARAMETER", e);
                ScalingMode::Parameter
            }),
            None => ScalingMode::Parameter,
        };
        let params = section
            .get("params")
            .map(TierParameterConfig::from_value)
            .unwrap_or_default();
        Self { mode, params }
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("mode".to_string(), Value::from(self.mode.name()));
        if !self.params.is_empty() {
            map.insert("params".to_string(), self.params.to_value());
        }
        Value::Object(map)
    }
}
