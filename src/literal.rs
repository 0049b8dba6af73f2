use crate::buffer::SourceBuffer;

/// The fundamental literal edit: exact find/replace over a whole buffer.
///
/// All matching is literal substring comparison. No regular expressions, no
/// metacharacters, no normalization; what you write is byte-for-byte what is
/// searched for. Intelligence lives in anchor selection, not matching.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "LiteralEdit does nothing until apply() is called"]
pub struct LiteralEdit {
    /// Exact text to locate.
    pub find: String,
    /// Text that replaces every (or the first) occurrence of `find`.
    pub replace: String,
    /// Occurrence selection. `All` is the default: repeated identical anchors
    /// are rewritten consistently, which keeps re-runs convergent.
    pub mode: MatchMode,
}

/// Which occurrences of `find` an edit rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    #[default]
    All,
    First,
}

/// Result of applying one literal edit.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "EditOutcome should be checked; Skipped may indicate anchor drift"]
pub enum EditOutcome {
    /// `find` was located and rewritten.
    Replaced { occurrences: usize },
    /// The replacement text is already present; nothing to do.
    AlreadyApplied,
    /// `find` is absent from the buffer; treated as success so the same edit
    /// list can be re-run safely.
    Skipped,
}

impl EditOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, EditOutcome::Replaced { .. })
    }
}

impl std::fmt::Display for EditOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditOutcome::Replaced { occurrences: 1 } => write!(f, "replaced 1 occurrence"),
            EditOutcome::Replaced { occurrences } => {
                write!(f, "replaced {occurrences} occurrences")
            }
            EditOutcome::AlreadyApplied => write!(f, "already applied"),
            EditOutcome::Skipped => write!(f, "anchor not found, skipped"),
        }
    }
}

impl LiteralEdit {
    pub fn new(find: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            find: find.into(),
            replace: replace.into(),
            mode: MatchMode::All,
        }
    }

    /// Restrict the edit to the first occurrence of `find`.
    pub fn first_occurrence(mut self) -> Self {
        self.mode = MatchMode::First;
        self
    }

    /// Apply this edit, producing the next buffer and an outcome.
    ///
    /// Infallible by construction: an absent anchor is a `Skipped` outcome,
    /// not an error.
    ///
    /// The already-applied check runs before the anchor search. Insertion
    /// edits keep `find` intact inside `replace` (a field declaration grows a
    /// sibling line, a parameter list grows a parameter), so searching for
    /// `find` first would match the patched text and splice the insertion in
    /// again on every run. Callers choose replacement text that cannot occur
    /// in an unpatched file. Empty replacements skip the check: a pure
    /// deletion is convergent on its own.
    pub fn apply(&self, input: SourceBuffer) -> (SourceBuffer, EditOutcome) {
        if !self.replace.is_empty() && input.contains(&self.replace) {
            return (input, EditOutcome::AlreadyApplied);
        }

        if self.find.is_empty() || !input.contains(&self.find) {
            return (input, EditOutcome::Skipped);
        }

        let (next, occurrences) = match self.mode {
            MatchMode::All => {
                let occurrences = input.as_str().match_indices(&self.find).count();
                (input.as_str().replace(&self.find, &self.replace), occurrences)
            }
            MatchMode::First => (input.as_str().replacen(&self.find, &self.replace, 1), 1),
        };

        (SourceBuffer::new(next), EditOutcome::Replaced { occurrences })
    }
}

/// Apply an edit sequence in strict declaration order.
///
/// Each edit sees the buffer produced by the previous one, so an edit may
/// target text introduced by an earlier edit. Overlap between edits has no
/// special handling beyond this ordering.
pub fn apply_all(edits: &[LiteralEdit], input: SourceBuffer) -> (SourceBuffer, Vec<EditOutcome>) {
    let mut buffer = input;
    let mut outcomes = Vec::with_capacity(edits.len());

    for edit in edits {
        let (next, outcome) = edit.apply(buffer);
        buffer = next;
        outcomes.push(outcome);
    }

    (buffer, outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_all_occurrences() {
        let buf = SourceBuffer::new("foo bar foo baz foo");
        let edit = LiteralEdit::new("foo", "qux");

        let (next, outcome) = edit.apply(buf);
        assert_eq!(outcome, EditOutcome::Replaced { occurrences: 3 });
        assert_eq!(next.as_str(), "qux bar qux baz qux");
    }

    #[test]
    fn test_first_occurrence_mode() {
        let buf = SourceBuffer::new("foo bar foo");
        let edit = LiteralEdit::new("foo", "qux").first_occurrence();

        let (next, outcome) = edit.apply(buf);
        assert_eq!(outcome, EditOutcome::Replaced { occurrences: 1 });
        assert_eq!(next.as_str(), "qux bar foo");
    }

    #[test]
    fn test_absent_anchor_is_noop() {
        let buf = SourceBuffer::new("unrelated content");
        let edit = LiteralEdit::new("missing anchor", "replacement");

        let (next, outcome) = edit.apply(buf.clone());
        assert_eq!(outcome, EditOutcome::Skipped);
        assert_eq!(next, buf);
    }

    #[test]
    fn test_insertion_edit_converges() {
        // find is a prefix of replace, the pattern every dependency-injection
        // patch uses. A second run must not duplicate the inserted line.
        let edit = LiteralEdit::new(
            "private readonly Foo _foo;",
            "private readonly Foo _foo;\n    private readonly Bar _bar;",
        );

        let buf = SourceBuffer::new("class C {\n    private readonly Foo _foo;\n}\n");
        let (once, first) = edit.apply(buf);
        assert_eq!(first, EditOutcome::Replaced { occurrences: 1 });
        assert!(once.contains("private readonly Bar _bar;"));

        let (twice, second) = edit.apply(once.clone());
        assert_eq!(second, EditOutcome::AlreadyApplied);
        assert_eq!(twice, once);
    }

    #[test]
    fn test_deletion_edit_converges() {
        let edit = LiteralEdit::new("obsolete line\n", "");

        let buf = SourceBuffer::new("keep\nobsolete line\nkeep\n");
        let (once, first) = edit.apply(buf);
        assert_eq!(first, EditOutcome::Replaced { occurrences: 1 });
        assert_eq!(once.as_str(), "keep\nkeep\n");

        let (_, second) = edit.apply(once);
        assert_eq!(second, EditOutcome::Skipped);
    }

    #[test]
    fn test_empty_find_is_skipped() {
        let edit = LiteralEdit::new("", "anything");
        let (next, outcome) = edit.apply(SourceBuffer::new("text"));
        assert_eq!(outcome, EditOutcome::Skipped);
        assert_eq!(next.as_str(), "text");
    }

    #[test]
    fn test_sequence_is_ordered() {
        // The second edit targets text produced by the first.
        let edits = vec![
            LiteralEdit::new("alpha", "beta"),
            LiteralEdit::new("beta()", "beta(ctx)"),
        ];

        let (next, outcomes) = apply_all(&edits, SourceBuffer::new("call alpha();"));
        assert_eq!(next.as_str(), "call beta(ctx);");
        assert!(outcomes.iter().all(EditOutcome::changed));
    }

    #[test]
    fn test_sequence_reruns_clean() {
        let edits = vec![
            LiteralEdit::new("using App.Persistence;", "using App.Persistence;\nusing App.Navigation;"),
            LiteralEdit::new("Setup(uow)", "Setup(uow, nav)"),
        ];

        let start = SourceBuffer::new("using App.Persistence;\nSetup(uow)\n");
        let (once, _) = apply_all(&edits, start);
        let (twice, outcomes) = apply_all(&edits, once.clone());

        assert_eq!(twice, once);
        assert!(outcomes.iter().all(|o| !o.changed()));
    }
}
