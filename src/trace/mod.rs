//! Test-mode traversal traces.

mod formatter;

pub use formatter::TraceFormatter;

/// One recorded step of a test-mode traversal.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEntry {
    pub node_id: String,
    pub description: String,
    /// Port taken after the node, if any.
    pub port: Option<String>,
    /// Synchronous segment the step ran in; increases after every delay.
    pub depth: u32,
}
