//! Logging helpers shared across the pipeline stages. The crate never
//! installs a logger itself (spec ambient notes, SPEC_FULL.md §7) — it only
//! emits `log` facade calls and leaves the backend to the host.

/// Truncates `s` to at most `max_chars` characters for use in a trace/debug
/// log line, appending an ellipsis marker when truncated. Character-based
/// (not byte-based) so a multi-byte UTF-8 sequence is never cut in half.
pub fn safe_preview(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let truncated: String = s.chars().take(max_chars).collect();
    format!("{truncated}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_strings_pass_through() {
        assert_eq!(safe_preview("hello", 10), "hello");
    }

    #[test]
    fn long_strings_truncate_on_char_boundaries() {
        let s = "héllo wörld".repeat(10);
        let preview = safe_preview(&s, 5);
        assert_eq!(preview.chars().count(), 6);
    }
}
