use strsim::normalized_levenshtein;

/// Closest line in a buffer to an anchor that failed to resolve.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// 1-based line number in the searched buffer.
    pub line: usize,
    /// The candidate line, trimmed.
    pub text: String,
    /// Normalized Levenshtein similarity in [0, 1].
    pub score: f64,
}

/// Matches below this similarity are noise, not drift.
const SIMILARITY_FLOOR: f64 = 0.6;

/// Find the buffer line most similar to a missed anchor.
///
/// Multi-line anchors are compared by their first line; that is the line an
/// operator greps for when repairing drift. Returns `None` when nothing
/// clears the similarity floor, so an anchor that simply belongs to a
/// different file produces no suggestion at all.
pub fn nearest_line(anchor: &str, haystack: &str) -> Option<Candidate> {
    let needle = anchor.lines().next().unwrap_or("").trim();
    if needle.is_empty() {
        return None;
    }

    let mut best: Option<Candidate> = None;
    for (idx, raw) in haystack.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let score = normalized_levenshtein(needle, line);
        if score >= SIMILARITY_FLOOR && best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(Candidate {
                line: idx + 1,
                text: line.to_string(),
                score,
            });
        }
    }
    best
}

/// First line of an anchor, truncated for diagnostics.
pub fn snippet(text: &str, max_chars: usize) -> String {
    let first = text.lines().next().unwrap_or("").trim();
    if first.chars().count() <= max_chars {
        first.to_string()
    } else {
        let head: String = first.chars().take(max_chars).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_drifted_anchor() {
        let source = "using System;\n\npublic AttachmentsViewModel(ISqliteUnitOfWorkFactory factory)\n{\n}\n";
        let anchor = "public AttachmentsViewModel(ISqliteUnitOfWorkFactory uowFactory)";

        let hit = nearest_line(anchor, source).unwrap();
        assert_eq!(hit.line, 3);
        assert!(hit.text.contains("AttachmentsViewModel"));
        assert!(hit.score > 0.8);
    }

    #[test]
    fn test_unrelated_buffer_yields_nothing() {
        let source = "SELECT id FROM batches WHERE state = 1;\n";
        assert!(nearest_line("private readonly INavigationService _navigation;", source).is_none());
    }

    #[test]
    fn test_multiline_anchor_uses_first_line() {
        let source = "one\nprivate void OnShowAttachments(BatchRow row)\nthree\n";
        let anchor = "private void OnShowAttachments(BatchRow batch)\n{\n    var x = 1;\n}";

        let hit = nearest_line(anchor, source).unwrap();
        assert_eq!(hit.line, 2);
    }

    #[test]
    fn test_snippet_truncates_on_char_boundary() {
        assert_eq!(snippet("short line", 60), "short line");
        assert_eq!(snippet("first\nsecond", 60), "first");

        let long = "x".repeat(80);
        let cut = snippet(&long, 60);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), 63);
    }
}
