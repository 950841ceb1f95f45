//! Collaborators the engine calls out to, plus small in-memory
//! implementations used by the CLI and tests.

use crate::context::FlowContext;
use crate::error::{ConditionError, HostError};
use crate::value::ParamValue;
use ahash::AHashMap;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::Arc;

/// Resolved parameters handed to an effect.
pub type EffectParams = IndexMap<String, ParamValue>;

/// A unit of work posted to the scheduler.
pub type ScheduledTask = Box<dyn FnOnce() + Send + 'static>;

/// The registry of named leaf actions EFFECT nodes delegate to.
pub trait EffectLibrary: Send + Sync {
    /// Runs `effect`; `Ok(true)` means it fired.
    fn execute(
        &self,
        effect: &str,
        params: &EffectParams,
        ctx: &mut FlowContext,
    ) -> Result<bool, HostError>;

    /// Whether `effect` names a registered action. Used by pre-flight validation.
    fn has_effect(&self, effect: &str) -> bool;
}

/// Evaluates CONDITION expressions and flow gating conditions.
pub trait ConditionEvaluator: Send + Sync {
    fn evaluate(&self, expression: &str, ctx: &FlowContext) -> Result<bool, ConditionError>;
}

/// The host's tick timer.
pub trait TickScheduler: Send + Sync {
    /// Runs `task` after `delay_ticks` ticks. Tasks due on the same tick run
    /// in the order they were scheduled.
    fn schedule(&self, task: ScheduledTask, delay_ticks: u64);
}

type EffectFn = dyn Fn(&EffectParams, &mut FlowContext) -> Result<bool, HostError> + Send + Sync;

/// An [`EffectLibrary`] backed by a map of closures. Names are case-insensitive.
#[derive(Default, Clone)]
pub struct EffectRegistry {
    effects: AHashMap<String, Arc<EffectFn>>,
}

impl EffectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: &str, effect: F)
    where
        F: Fn(&EffectParams, &mut FlowContext) -> Result<bool, HostError> + Send + Sync + 'static,
    {
        self.effects
            .insert(name.to_ascii_uppercase(), Arc::new(effect));
    }

    pub fn with_effect<F>(mut self, name: &str, effect: F) -> Self
    where
        F: Fn(&EffectParams, &mut FlowContext) -> Result<bool, HostError> + Send + Sync + 'static,
    {
        self.register(name, effect);
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.effects.keys().map(String::as_str)
    }
}

impl EffectLibrary for EffectRegistry {
    fn execute(
        &self,
        effect: &str,
        params: &EffectParams,
        ctx: &mut FlowContext,
    ) -> Result<bool, HostError> {
        match self.effects.get(&effect.to_ascii_uppercase()) {
            Some(run) => run(params, ctx),
            None => Err(format!("unknown effect '{}'", effect).into()),
        }
    }

    fn has_effect(&self, effect: &str) -> bool {
        self.effects.contains_key(&effect.to_ascii_uppercase())
    }
}

struct PendingTask {
    due: u64,
    seq: u64,
    task: ScheduledTask,
}

#[derive(Default)]
struct QueueState {
    now: u64,
    seq: u64,
    pending: Vec<PendingTask>,
}

/// A manually advanced [`TickScheduler`].
///
/// Nothing runs until [`advance`](TickQueue::advance) is called, which makes
/// delayed continuations observable step by step.
#[derive(Default)]
pub struct TickQueue {
    state: Mutex<QueueState>,
}

impl TickQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_tick(&self) -> u64 {
        self.state.lock().now
    }

    pub fn pending(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn is_idle(&self) -> bool {
        self.state.lock().pending.is_empty()
    }

    /// Moves time forward by `ticks`, running every task that falls due,
    /// including tasks scheduled by tasks run here. Returns how many ran.
    pub fn advance(&self, ticks: u64) -> usize {
        let target = self.state.lock().now.saturating_add(ticks);
        let mut ran = 0;
        loop {
            // The lock is released before running so a task can schedule more work.
            let next = {
                let mut state = self.state.lock();
                let due = state
                    .pending
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.due <= target)
                    .min_by_key(|(_, p)| (p.due, p.seq))
                    .map(|(i, _)| i);
                match due {
                    Some(i) => {
                        let pending = state.pending.swap_remove(i);
                        state.now = state.now.max(pending.due);
                        Some(pending.task)
                    }
                    None => {
                        state.now = target;
                        None
                    }
                }
            };
            match next {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    /// Advances until nothing is pending or `max_ticks` have passed.
    pub fn run_until_idle(&self, max_ticks: u64) -> usize {
        let start = self.current_tick();
        let mut ran = 0;
        while !self.is_idle() && self.current_tick() - start < max_ticks {
            ran += self.advance(1);
        }
        ran
    }
}

impl TickScheduler for TickQueue {
    fn schedule(&self, task: ScheduledTask, delay_ticks: u64) {
        let mut state = self.state.lock();
        let due = state.now.saturating_add(delay_ticks);
        let seq = state.seq;
        state.seq += 1;
        state.pending.push(PendingTask { due, seq, task });
    }
}
