use thiserror::Error;

/// Opaque error returned by host collaborators (effect library, condition
/// predicates, schedulers).
pub type HostError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that abort a traversal branch. These are reported on the context
/// and to the live actor, never returned to the caller of the executor.
#[derive(Error, Debug, Clone)]
pub enum FlowError {
    #[error("Maximum flow depth exceeded (possible infinite recursion)")]
    DepthExceeded { limit: u32 },

    #[error("Maximum node execution limit reached (possible infinite loop)")]
    StepLimitExceeded { limit: usize },

    #[error("Cycle detected at node: {node_id}")]
    CycleDetected { node_id: String },

    #[error("Node '{source_node_id}' port '{port}' connects to missing node '{target_node_id}'")]
    MissingTarget {
        source_node_id: String,
        port: String,
        target_node_id: String,
    },

    #[error("Error in node '{node_id}': {source}")]
    NodeFailed { node_id: String, source: NodeError },
}

/// Errors raised while executing a single node.
#[derive(Error, Debug, Clone)]
pub enum NodeError {
    #[error("effect '{effect}' failed: {message}")]
    Effect { effect: String, message: String },

    #[error("condition '{expression}' could not be evaluated: {source}")]
    Condition {
        expression: String,
        source: ConditionError,
    },
}

/// Errors produced by the built-in condition expression evaluator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConditionError {
    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),

    #[error("unbalanced parentheses")]
    UnbalancedParentheses,

    #[error("expression nests deeper than {0} levels")]
    TooDeep(usize),

    #[error("expression chains more than {0} AND/OR operators")]
    TooManyOperators(usize),

    #[error("no evaluator available for predicate '{0}'")]
    UnresolvedPredicate(String),

    #[error("predicate '{predicate}' failed: {message}")]
    Predicate { predicate: String, message: String },
}

/// Errors for configuration trees that cannot be read at all. Malformed
/// individual nodes and flows are skipped instead.
#[derive(Error, Debug, Clone)]
pub enum SerializeError {
    #[error("Failed to parse configuration JSON: {0}")]
    JsonParseError(String),

    #[error("Failed to encode configuration: {0}")]
    EncodeError(String),

    #[error("Section '{section}' must be a {expected}")]
    MalformedSection { section: String, expected: String },

    #[error("Template '{0}' defines no readable flows")]
    NoFlows(String),
}
