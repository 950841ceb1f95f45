//! The flow interpreter.
//!
//! A traversal runs synchronously from the start node until it completes,
//! is cancelled, hits a safety ceiling, or reaches a DELAY node. A DELAY
//! hands a [`Continuation`] to the host's [`TickScheduler`] and the current
//! call returns; when the scheduler fires it, the same loop resumes one
//! level deeper. Failures never escape: they are recorded on the context,
//! shown to a live actor and logged.

mod builder;

pub use builder::FlowExecutorBuilder;

use crate::context::FlowContext;
use crate::error::FlowError;
use crate::graph::FlowGraph;
use crate::host::{ConditionEvaluator, EffectLibrary, TickScheduler};
use crate::node::{FlowNode, NodeKind, NodeServices, Step};
use crate::trace::TraceEntry;
use ahash::{AHashMap, AHashSet};
use std::sync::Arc;

/// Default ceiling on nodes executed in one synchronous segment.
pub const MAX_NODES: usize = 1000;
/// Default ceiling on chained delay continuations.
pub const MAX_DEPTH: u32 = 50;

/// Prefix of diagnostics shown to actors.
pub const DIAGNOSTIC_PREFIX: &str = "[Flow] ";

/// Safety ceilings for runaway graphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_nodes: usize,
    pub max_depth: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_nodes: MAX_NODES,
            max_depth: MAX_DEPTH,
        }
    }
}

/// A suspended traversal waiting on the scheduler.
pub struct Continuation {
    pub graph: Arc<FlowGraph>,
    pub node_id: String,
    pub context: FlowContext,
    pub depth: u32,
}

pub(crate) struct ExecutorInner {
    pub(crate) effects: Arc<dyn EffectLibrary>,
    pub(crate) conditions: Arc<dyn ConditionEvaluator>,
    pub(crate) scheduler: Arc<dyn TickScheduler>,
    pub(crate) limits: Limits,
}

/// Executes flow graphs. Cheap to clone; clones share collaborators.
#[derive(Clone)]
pub struct FlowExecutor {
    inner: Arc<ExecutorInner>,
}

/// Why a synchronous segment stopped.
enum SegmentEnd {
    Completed,
    Suspended,
    Cancelled,
    Failed(FlowError),
}

impl FlowExecutor {
    pub fn builder(
        effects: Arc<dyn EffectLibrary>,
        scheduler: Arc<dyn TickScheduler>,
    ) -> FlowExecutorBuilder {
        FlowExecutorBuilder::new(effects, scheduler)
    }

    /// An executor with the default condition evaluator and limits.
    pub fn new(effects: Arc<dyn EffectLibrary>, scheduler: Arc<dyn TickScheduler>) -> Self {
        Self::builder(effects, scheduler).build()
    }

    pub(crate) fn from_inner(inner: ExecutorInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn limits(&self) -> Limits {
        self.inner.limits
    }

    pub fn conditions(&self) -> &dyn ConditionEvaluator {
        self.inner.conditions.as_ref()
    }

    pub fn effects(&self) -> &dyn EffectLibrary {
        self.inner.effects.as_ref()
    }

    /// Runs `graph` from its start node.
    ///
    /// Returns `true` iff the synchronous part of the traversal finished
    /// without cancellation. A traversal suspended on a delay counts as
    /// finished.
    pub fn execute(&self, graph: &Arc<FlowGraph>, ctx: FlowContext) -> bool {
        let result = self
            .execute_with_context(graph, ctx)
            .is_some_and(|ctx| !ctx.is_cancelled());
        tracing::debug!(graph = %graph.id, result, "flow execution returned");
        result
    }

    /// Like [`execute`](Self::execute), but hands back the context so the
    /// caller can inspect it (e.g. whether any effect fired).
    ///
    /// Returns `None` when the graph has no resolvable start node. If the
    /// traversal suspended on a delay, the context reflects the state at the
    /// suspension point; the continuation keeps its own copy.
    pub fn execute_with_context(&self, graph: &Arc<FlowGraph>, mut ctx: FlowContext) -> Option<FlowContext> {
        let Some(start) = graph.start_node() else {
            tracing::debug!(graph = %graph.id, "flow has no start node, nothing to execute");
            return None;
        };
        let start_id = start.id.clone();
        self.run_from(graph, &start_id, &mut ctx, 0);
        Some(ctx)
    }

    /// Resumes a suspended traversal. Called by scheduled continuations.
    pub fn resume(&self, continuation: Continuation) -> bool {
        let Continuation {
            graph,
            node_id,
            mut context,
            depth,
        } = continuation;
        tracing::trace!(graph = %graph.id, node = %node_id, depth, "resuming flow after delay");
        self.run_from(&graph, &node_id, &mut context, depth)
    }

    /// Pre-flight check: graph structure plus effect names known to the
    /// effect library.
    pub fn validate(&self, graph: &FlowGraph) -> bool {
        self.validation_errors(graph).is_empty()
    }

    pub fn validation_errors(&self, graph: &FlowGraph) -> Vec<String> {
        let mut errors = graph.validate();
        for node in graph.nodes() {
            if let Some(effect) = node.effect_name() {
                if !self.inner.effects.has_effect(effect) {
                    errors.push(format!(
                        "{} ({}): Unknown effect type: {}",
                        node.display_name, node.id, effect
                    ));
                }
            }
        }
        errors
    }

    fn run_from(&self, graph: &Arc<FlowGraph>, node_id: &str, ctx: &mut FlowContext, depth: u32) -> bool {
        let end = if depth > self.inner.limits.max_depth {
            SegmentEnd::Failed(FlowError::DepthExceeded {
                limit: self.inner.limits.max_depth,
            })
        } else {
            self.run_segment(graph, node_id, ctx, depth)
        };

        match end {
            SegmentEnd::Completed | SegmentEnd::Suspended => {}
            SegmentEnd::Cancelled => {
                tracing::debug!(graph = %graph.id, "flow cancelled");
            }
            SegmentEnd::Failed(error) => self.report(ctx, error),
        }

        // Errors raised by nodes through the context are shown once as well.
        if ctx.is_cancelled() && ctx.error().is_some() && !ctx.error_reported() {
            self.notify_actor(ctx);
        }
        !ctx.is_cancelled()
    }

    /// Runs one synchronous segment, up to completion or the next delay.
    fn run_segment(
        &self,
        graph: &Arc<FlowGraph>,
        node_id: &str,
        ctx: &mut FlowContext,
        mut depth: u32,
    ) -> SegmentEnd {
        let services = NodeServices {
            effects: self.inner.effects.as_ref(),
            conditions: self.inner.conditions.as_ref(),
        };
        let mut current = graph.node(node_id);
        let mut executed = 0usize;
        let mut visited: AHashSet<&str> = AHashSet::new();
        // Visited set as of each loop's first entry; every iteration restarts from it.
        let mut loop_scopes: AHashMap<&str, AHashSet<&str>> = AHashMap::new();

        while let Some(node) = current {
            if ctx.is_cancelled() {
                return SegmentEnd::Cancelled;
            }

            executed += 1;
            if executed > self.inner.limits.max_nodes {
                return SegmentEnd::Failed(FlowError::StepLimitExceeded {
                    limit: self.inner.limits.max_nodes,
                });
            }

            match node.kind {
                NodeKind::Delay => {}
                NodeKind::Loop => match loop_scopes.get(node.id.as_str()) {
                    Some(scope) => visited = scope.clone(),
                    None => {
                        loop_scopes.insert(node.id.as_str(), visited.clone());
                    }
                },
                _ => {
                    if !visited.insert(node.id.as_str()) {
                        return SegmentEnd::Failed(FlowError::CycleDetected {
                            node_id: node.display_name.clone(),
                        });
                    }
                }
            }

            tracing::trace!(graph = %graph.id, node = %node.id, kind = %node.node_type(), "executing node");
            let step = match node.execute(ctx, services) {
                Ok(step) => step,
                Err(source) => {
                    tracing::warn!(graph = %graph.id, node = %node.id, error = %source, "node execution failed");
                    return SegmentEnd::Failed(FlowError::NodeFailed {
                        node_id: node.display_name.clone(),
                        source,
                    });
                }
            };

            ctx.record_trace(TraceEntry {
                node_id: node.id.clone(),
                description: node.describe(),
                port: step.port().map(str::to_string),
                depth,
            });

            if ctx.is_cancelled() {
                tracing::debug!(node = %node.id, "flow cancelled by node");
                return SegmentEnd::Cancelled;
            }

            current = match step {
                Step::End => {
                    tracing::debug!(node = %node.id, "node ended the branch");
                    None
                }
                Step::Continue(port) => match self.follow(graph, node, &port) {
                    Ok(next) => next,
                    Err(error) => return SegmentEnd::Failed(error),
                },
                Step::Suspend { port, ticks } => {
                    let next = match self.follow(graph, node, &port) {
                        Ok(next) => next,
                        Err(error) => return SegmentEnd::Failed(error),
                    };
                    if ctx.is_test_mode() {
                        // Delays are instant in test mode; only the trace shows them.
                        depth += 1;
                        next
                    } else {
                        if let Some(next) = next {
                            self.schedule(graph, next, ctx, depth + 1, ticks);
                        }
                        return SegmentEnd::Suspended;
                    }
                }
            };
        }
        SegmentEnd::Completed
    }

    /// Resolves the connection on `port`. An unconnected port ends the
    /// branch; a connection to a missing node is an error.
    fn follow<'g>(
        &self,
        graph: &'g FlowGraph,
        node: &FlowNode,
        port: &str,
    ) -> Result<Option<&'g FlowNode>, FlowError> {
        let Some(target) = node.connection(port) else {
            tracing::debug!(node = %node.id, port, "port not connected, branch ends");
            return Ok(None);
        };
        graph
            .node(target)
            .map(Some)
            .ok_or_else(|| FlowError::MissingTarget {
                source_node_id: node.id.clone(),
                port: port.to_string(),
                target_node_id: target.to_string(),
            })
    }

    fn schedule(&self, graph: &Arc<FlowGraph>, next: &FlowNode, ctx: &FlowContext, depth: u32, ticks: u64) {
        let continuation = Continuation {
            graph: Arc::clone(graph),
            node_id: next.id.clone(),
            context: ctx.clone(),
            depth,
        };
        let executor = self.clone();
        tracing::debug!(graph = %graph.id, node = %next.id, ticks, depth, "flow suspended on delay");
        self.inner.scheduler.schedule(
            Box::new(move || {
                executor.resume(continuation);
            }),
            ticks,
        );
    }

    /// Records `error` on the context, shows it to a live actor and logs it.
    fn report(&self, ctx: &mut FlowContext, error: FlowError) {
        tracing::warn!(error = %error, "flow aborted");
        ctx.fail(error.to_string());
        self.notify_actor(ctx);
    }

    fn notify_actor(&self, ctx: &mut FlowContext) {
        if let (Some(actor), Some(message)) = (ctx.actor(), ctx.error()) {
            if actor.is_online() {
                actor.send_diagnostic(&format!("{}{}", DIAGNOSTIC_PREFIX, message));
            }
        }
        ctx.mark_error_reported();
    }
}
