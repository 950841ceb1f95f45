use crate::value::format_number;
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Per-parameter value lists indexed by tier.
///
/// Index 0 holds the tier 1 value. Parameter names are stored lowercased so
/// lookups from placeholders are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TierParameterConfig {
    parameters: IndexMap<String, Vec<f64>>,
}

impl TierParameterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value for `tier`, clamping to the defined range.
    ///
    /// Tiers below 1 read the first value and tiers beyond the list read the
    /// last one. Undefined or empty parameters yield `0.0`.
    pub fn get_value(&self, name: &str, tier: i32) -> f64 {
        let Some(values) = self.parameters.get(&name.to_lowercase()) else {
            return 0.0;
        };
        if values.is_empty() {
            return 0.0;
        }
        let index = (tier as i64 - 1).clamp(0, values.len() as i64 - 1) as usize;
        values[index]
    }

    /// Like [`get_value`](Self::get_value), formatted for substitution.
    pub fn get_value_as_string(&self, name: &str, tier: i32) -> String {
        format_number(self.get_value(name, tier))
    }

    pub fn values(&self, name: &str) -> Option<&[f64]> {
        self.parameters
            .get(&name.to_lowercase())
            .map(|values| values.as_slice())
    }

    /// Sets the value for one tier, padding missing lower tiers with `0.0`.
    pub fn set_value(&mut self, name: &str, tier: i32, value: f64) {
        if tier < 1 {
            return;
        }
        let values = self.parameters.entry(name.to_lowercase()).or_default();
        let index = (tier - 1) as usize;
        if values.len() <= index {
            values.resize(index + 1, 0.0);
        }
        values[index] = value;
    }

    pub fn set_values(&mut self, name: &str, values: Vec<f64>) {
        self.parameters.insert(name.to_lowercase(), values);
    }

    /// Adds a parameter with the same value at every tier.
    pub fn add_parameter(&mut self, name: &str, max_tier: usize, value: f64) {
        self.parameters
            .insert(name.to_lowercase(), vec![value; max_tier.max(1)]);
    }

    /// Adds a parameter that grows linearly from `base` at tier 1 to
    /// `2 * base` at `max_tier`, rounded to two decimals.
    pub fn add_parameter_with_scaling(&mut self, name: &str, max_tier: usize, base: f64) {
        let values = if max_tier <= 1 {
            vec![base]
        } else {
            (0..max_tier)
                .map(|i| {
                    let progress = i as f64 / (max_tier - 1) as f64;
                    round2(base + base * progress)
                })
                .collect()
        };
        self.parameters.insert(name.to_lowercase(), values);
    }

    pub fn remove_parameter(&mut self, name: &str) -> Option<Vec<f64>> {
        self.parameters.shift_remove(&name.to_lowercase())
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.contains_key(&name.to_lowercase())
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameters.keys().map(|k| k.as_str())
    }

    /// Number of tiers covered by the longest parameter list.
    pub fn defined_tiers(&self) -> usize {
        self.parameters.values().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Reads a `name -> [values]` section. Entries that are not lists are
    /// skipped; list items that are not numbers become `0.0`.
    pub fn from_value(section: &Value) -> Self {
        let mut config = Self::new();
        let Some(map) = section.as_object() else {
            return config;
        };
        for (name, raw) in map {
            match raw {
                Value::Array(items) => {
                    config.set_values(name, items.iter().map(parse_lenient).collect());
                }
                other => {
                    tracing::debug!(param = %name, value = %other, "tier parameter is not a list, skipped");
                }
            }
        }
        config
    }

    /// Writes the section back out, emitting whole numbers as integers.
    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .parameters
            .iter()
            .map(|(name, values)| {
                let list = values.iter().map(|v| number_to_value(*v)).collect();
                (name.clone(), Value::Array(list))
            })
            .collect();
        Value::Object(map)
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub(crate) fn parse_lenient(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(value = %s, "malformed tier value, using 0.0");
            0.0
        }),
        _ => 0.0,
    }
}

pub(crate) fn number_to_value(v: f64) -> Value {
    if v.fract() == 0.0 && v.is_finite() && v.abs() < i64::MAX as f64 {
        Value::from(v as i64)
    } else {
        serde_json::Number::from_f64(v)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}
