use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

use crate::buffer::SourceBuffer;
use crate::suggest::snippet;

/// A span bounded by two literal anchors, replaced as a unit.
///
/// The start anchor locates the construct being rewritten (typically a method
/// signature); the end anchor is the start of the next known construct. The
/// span `[start, end)` is spliced out and the end anchor survives untouched,
/// so braces, strings, and comments inside the span never need to be parsed.
///
/// Anchor choice carries the correctness burden: the start anchor must be
/// unique in the file (enforced) and the end anchor must not recur inside the
/// span (documented precondition; the first occurrence after the start wins).
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "RegionSpec does nothing until apply() is called"]
pub struct RegionSpec {
    /// Literal text opening the region. Must occur at most once.
    pub start: String,
    /// Literal text terminating the region; not part of the replaced span.
    pub end: String,
    /// Text that replaces the whole `[start, end)` span.
    pub replacement: String,
    /// Optional verification of the span about to be replaced.
    pub expected: Option<SpanExpectation>,
}

/// Expected content of the span a region replacement rewrites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanExpectation {
    /// Exact text match required.
    Text(String),
    /// xxh3 hash of the expected span (cheaper to carry for large spans).
    Hash(u64),
}

impl SpanExpectation {
    /// Check whether a span satisfies the expectation.
    pub fn matches(&self, span: &str) -> bool {
        match self {
            SpanExpectation::Text(expected) => span == expected,
            SpanExpectation::Hash(expected) => xxh3_64(span.as_bytes()) == *expected,
        }
    }

    /// Build an expectation from known text, hashing anything over 1KB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            SpanExpectation::Hash(xxh3_64(text.as_bytes()))
        } else {
            SpanExpectation::Text(text.to_string())
        }
    }
}

/// Result of applying one region replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "RegionOutcome should be checked; Skipped may indicate anchor drift"]
pub enum RegionOutcome {
    /// The span was located and rewritten.
    Replaced,
    /// The span already equals the replacement; nothing to do.
    AlreadyApplied,
    /// The start anchor is absent; treated as success for safe re-runs.
    Skipped,
}

impl RegionOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, RegionOutcome::Replaced)
    }
}

impl std::fmt::Display for RegionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegionOutcome::Replaced => write!(f, "region replaced"),
            RegionOutcome::AlreadyApplied => write!(f, "already applied"),
            RegionOutcome::Skipped => write!(f, "start anchor not found, skipped"),
        }
    }
}

/// Fatal region failures. Each aborts the job before anything is written.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegionError {
    /// The start anchor cannot identify one region. Patching on a guess is
    /// never acceptable; the job author must tighten the anchor.
    #[error("start anchor `{anchor}` matched {count} locations, need exactly one")]
    AmbiguousStart { anchor: String, count: usize },

    /// The start anchor matched but the end anchor never occurs after it.
    #[error("end anchor `{anchor}` not found after the start anchor")]
    UnterminatedRegion { anchor: String },

    /// The span exists but is not the text this replacement was written for.
    #[error("span between anchors does not match expected content (found `{found}`)")]
    SpanMismatch { found: String },
}

/// Anchor length shown in diagnostics before truncation.
const ANCHOR_SNIPPET_CHARS: usize = 60;

impl RegionSpec {
    pub fn new(
        start: impl Into<String>,
        end: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            replacement: replacement.into(),
            expected: None,
        }
    }

    /// Attach a span verification.
    pub fn with_expected(mut self, expected: SpanExpectation) -> Self {
        self.expected = Some(expected);
        self
    }

    /// Apply this replacement, producing the next buffer and an outcome.
    ///
    /// Resolution order: the start anchor is counted first (absent is a
    /// no-op, more than one is fatal), then the end anchor is searched from
    /// just past the start anchor text. The outcome is `AlreadyApplied` when
    /// the span already equals the replacement, which makes rewrites whose
    /// replacement re-states the start anchor converge on the second run.
    pub fn apply(&self, input: SourceBuffer) -> Result<(SourceBuffer, RegionOutcome), RegionError> {
        let text = input.as_str();

        let mut starts = text.match_indices(self.start.as_str());
        let Some((start_at, _)) = starts.next() else {
            return Ok((input, RegionOutcome::Skipped));
        };
        let extra = starts.count();
        if extra > 0 {
            return Err(RegionError::AmbiguousStart {
                anchor: snippet(&self.start, ANCHOR_SNIPPET_CHARS),
                count: extra + 1,
            });
        }

        let search_from = start_at + self.start.len();
        let Some(end_rel) = text[search_from..].find(self.end.as_str()) else {
            return Err(RegionError::UnterminatedRegion {
                anchor: snippet(&self.end, ANCHOR_SNIPPET_CHARS),
            });
        };
        let end_at = search_from + end_rel;

        let span = &text[start_at..end_at];
        if span == self.replacement {
            return Ok((input, RegionOutcome::AlreadyApplied));
        }

        if let Some(expected) = &self.expected {
            if !expected.matches(span) {
                return Err(RegionError::SpanMismatch {
                    found: snippet(span, ANCHOR_SNIPPET_CHARS),
                });
            }
        }

        let mut next = String::with_capacity(text.len() - span.len() + self.replacement.len());
        next.push_str(&text[..start_at]);
        next.push_str(&self.replacement);
        next.push_str(&text[end_at..]);

        Ok((SourceBuffer::new(next), RegionOutcome::Replaced))
    }
}
