use super::TraceEntry;

/// Formats test-mode traversal traces into human-readable listings.
pub struct TraceFormatter;

impl TraceFormatter {
    /// One line per step, indented by delay depth:
    ///
    /// ```text
    /// ✓ Start -> next
    /// ✓ Delay: 1s -> next
    ///   ✓ Effect: DAMAGE -> next
    /// ```
    pub fn format_trace(entries: &[TraceEntry]) -> String {
        entries
            .iter()
            .map(Self::format_entry)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn format_entry(entry: &TraceEntry) -> String {
        let indent = "  ".repeat(entry.depth as usize);
        match &entry.port {
            Some(port) => format!("{}✓ {} -> {}", indent, entry.description, port),
            None => format!("{}✓ {} (end)", indent, entry.description),
        }
    }

    /// The node ids visited, in order. Handy in assertions.
    pub fn path(entries: &[TraceEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.node_id.as_str()).collect()
    }
}
