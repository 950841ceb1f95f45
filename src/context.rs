use crate::tier::TierScalingConfig;
use crate::trace::TraceEntry;
use crate::value::{ParamValue, format_number};
use ahash::AHashMap;
use rand::Rng;
use regex::{Captures, Regex};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([a-zA-Z_.][a-zA-Z0-9_.]*)\}").expect("valid placeholder regex")
});

/// A participant of a traversal: the entity that triggered it, or its victim.
pub trait Actor: Send + Sync {
    fn name(&self) -> &str;

    /// Diagnostics are only delivered to actors that are still present.
    fn is_online(&self) -> bool {
        true
    }

    /// Shows a brief failure message to the actor.
    fn send_diagnostic(&self, message: &str);
}

/// Shared cancellation flag of one traversal.
///
/// Every copy of a context made for a delay continuation shares the same
/// flag, so the host can cancel a traversal that is waiting on the scheduler.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What caused a traversal: the signal, the ability it belongs to and the
/// tier it runs at.
#[derive(Debug, Clone)]
pub struct TriggerMetadata {
    pub signal: Option<String>,
    pub ability_id: Option<String>,
    pub tier: i32,
    pub tier_scaling: Option<Arc<TierScalingConfig>>,
    /// Event values exposed to placeholders, e.g. `damage`.
    pub event: AHashMap<String, ParamValue>,
}

impl Default for TriggerMetadata {
    fn default() -> Self {
        Self {
            signal: None,
            ability_id: None,
            tier: 1,
            tier_scaling: None,
            event: AHashMap::new(),
        }
    }
}

impl TriggerMetadata {
    pub fn new(tier: i32) -> Self {
        Self {
            tier,
            ..Self::default()
        }
    }

    pub fn with_signal(mut self, signal: impl Into<String>) -> Self {
        self.signal = Some(signal.into());
        self
    }

    pub fn with_ability(mut self, ability_id: impl Into<String>) -> Self {
        self.ability_id = Some(ability_id.into());
        self
    }

    pub fn with_tier_scaling(mut self, config: Arc<TierScalingConfig>) -> Self {
        self.tier_scaling = Some(config);
        self
    }

    pub fn with_event(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.event.insert(key.into(), value.into());
        self
    }
}

/// Per-traversal execution state.
///
/// A context is created for one invocation of the executor and dropped when
/// the traversal ends. Nodes never store state on themselves; everything a
/// run mutates lives here.
#[derive(Clone)]
pub struct FlowContext {
    metadata: TriggerMetadata,
    actor: Option<Arc<dyn Actor>>,
    victim: Option<Arc<dyn Actor>>,
    target: Option<Arc<dyn Actor>>,
    variables: AHashMap<String, ParamValue>,
    cancel: CancelHandle,
    error: Option<String>,
    error_reported: bool,
    effects_executed: u32,
    skip_cooldown: bool,
    test_mode: bool,
    trace: Vec<TraceEntry>,
}

impl FlowContext {
    pub fn new(metadata: TriggerMetadata) -> Self {
        Self {
            metadata,
            actor: None,
            victim: None,
            target: None,
            variables: AHashMap::new(),
            cancel: CancelHandle::default(),
            error: None,
            error_reported: false,
            effects_executed: 0,
            skip_cooldown: false,
            test_mode: false,
            trace: Vec::new(),
        }
    }

    pub fn with_actor(mut self, actor: Arc<dyn Actor>) -> Self {
        self.target = Some(actor.clone());
        self.actor = Some(actor);
        self
    }

    pub fn with_victim(mut self, victim: Arc<dyn Actor>) -> Self {
        self.victim = Some(victim);
        self
    }

    /// Test mode runs delays synchronously and records a trace.
    pub fn with_test_mode(mut self) -> Self {
        self.test_mode = true;
        self
    }

    pub fn metadata(&self) -> &TriggerMetadata {
        &self.metadata
    }

    pub fn tier(&self) -> i32 {
        self.metadata.tier
    }

    pub fn tier_scaling(&self) -> Option<&TierScalingConfig> {
        self.metadata.tier_scaling.as_deref()
    }

    pub fn actor(&self) -> Option<&Arc<dyn Actor>> {
        self.actor.as_ref()
    }

    pub fn victim(&self) -> Option<&Arc<dyn Actor>> {
        self.victim.as_ref()
    }

    pub fn target(&self) -> Option<&Arc<dyn Actor>> {
        self.target.as_ref()
    }

    pub fn set_target(&mut self, target: Option<Arc<dyn Actor>>) {
        self.target = target;
    }

    // --- Cancellation & errors ---

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Records an error and cancels the traversal.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.error_reported = false;
        self.cancel();
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub(crate) fn error_reported(&self) -> bool {
        self.error_reported
    }

    pub(crate) fn mark_error_reported(&mut self) {
        self.error_reported = true;
    }

    // --- Outcome ---

    pub fn effects_executed(&self) -> u32 {
        self.effects_executed
    }

    pub(crate) fn record_effect(&mut self) {
        self.effects_executed += 1;
    }

    pub fn skip_cooldown(&self) -> bool {
        self.skip_cooldown
    }

    pub fn set_skip_cooldown(&mut self, skip: bool) {
        self.skip_cooldown = skip;
    }

    pub fn is_test_mode(&self) -> bool {
        self.test_mode
    }

    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    pub(crate) fn record_trace(&mut self, entry: TraceEntry) {
        if self.test_mode {
            self.trace.push(entry);
        }
    }

    // --- Variables ---

    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.variables.insert(name.into(), value.into());
    }

    pub fn variable(&self, name: &str) -> Option<&ParamValue> {
        self.variables.get(name)
    }

    pub fn variable_f64(&self, name: &str, default: f64) -> f64 {
        self.variables
            .get(name)
            .and_then(ParamValue::as_f64)
            .unwrap_or(default)
    }

    pub fn variables(&self) -> &AHashMap<String, ParamValue> {
        &self.variables
    }

    // --- Placeholder resolution ---

    /// Resolves a `$variable` reference or every `{placeholder}` in `text`.
    ///
    /// Placeholders that resolve to nothing are left in place.
    pub fn resolve_value(&self, text: &str) -> String {
        if let Some(name) = text.strip_prefix('$') {
            return self
                .variables
                .get(name)
                .map(|v| v.to_string())
                .unwrap_or_else(|| text.to_string());
        }
        self.resolve_with(text, self.scales_params())
    }

    /// Resolves every `{placeholder}` in `text`, leaving `$` references alone.
    pub fn resolve_placeholders(&self, text: &str) -> String {
        self.resolve_with(text, self.scales_params())
    }

    /// Resolves placeholders in a START node's `chance`/`cooldown` text.
    /// Tier parameters apply only when the template scales activation.
    pub fn resolve_activation(&self, text: &str) -> String {
        let scales = self
            .tier_scaling()
            .is_some_and(TierScalingConfig::should_activation_scale);
        self.resolve_with(text, scales)
    }

    /// Parses `text` as a number, resolving placeholders first if needed.
    pub fn resolve_numeric(&self, text: &str, default: f64) -> f64 {
        if let Ok(n) = text.trim().parse::<f64>() {
            return n;
        }
        self.resolve_value(text).trim().parse().unwrap_or(default)
    }

    /// Resolves a parameter value; only text can carry placeholders.
    pub fn resolve_param(&self, value: &ParamValue) -> ParamValue {
        match value {
            ParamValue::Text(text) if text.starts_with('$') || value.has_placeholder() => {
                ParamValue::parse_resolved(&self.resolve_value(text))
            }
            other => other.clone(),
        }
    }

    fn scales_params(&self) -> bool {
        self.tier_scaling()
            .is_some_and(TierScalingConfig::should_params_scale)
    }

    fn resolve_with(&self, text: &str, use_tier_params: bool) -> String {
        if !text.contains('{') {
            return text.to_string();
        }
        PLACEHOLDER_RE
            .replace_all(text, |caps: &Captures| {
                self.placeholder(&caps[1], use_tier_params)
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    fn placeholder(&self, key: &str, use_tier_params: bool) -> Option<String> {
        if use_tier_params {
            if let Some(config) = self.tier_scaling().filter(|c| c.has_param(key)) {
                return Some(config.params.get_value_as_string(key, self.tier()));
            }
        }
        match key {
            "tier" => return Some(self.tier().to_string()),
            "random" => return Some(format_number(rand::rng().random_range(0.0..100.0))),
            _ => {}
        }
        let event = &self.metadata.event;
        if let Some(value) = event
            .get(key)
            .or_else(|| event.get(&key.to_ascii_lowercase()))
        {
            return Some(value.to_string());
        }
        self.variables.get(key).map(|v| v.to_string())
    }
}

impl fmt::Debug for FlowContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowContext")
            .field("metadata", &self.metadata)
            .field("actor", &self.actor.as_ref().map(|a| a.name().to_string()))
            .field("victim", &self.victim.as_ref().map(|a| a.name().to_string()))
            .field("variables", &self.variables)
            .field("cancelled", &self.is_cancelled())
            .field("error", &self.error)
            .field("effects_executed", &self.effects_executed)
            .field("skip_cooldown", &self.skip_cooldown)
            .field("test_mode", &self.test_mode)
            .finish()
    }
}
