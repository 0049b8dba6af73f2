use std::fmt;

/// Full text of one source file at one stage of the patch pipeline.
///
/// Buffers are immutable values: every transform consumes a buffer and
/// produces a fresh one, so an aborted pipeline can never leave a
/// half-rewritten string behind. File I/O lives in the job layer, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBuffer {
    text: String,
}

impl SourceBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Borrow the underlying text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Literal substring test, the primitive every anchor lookup reduces to.
    pub fn contains(&self, needle: &str) -> bool {
        self.text.contains(needle)
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Unwrap the buffer for the final write.
    pub fn into_string(self) -> String {
        self.text
    }
}

impl From<String> for SourceBuffer {
    fn from(text: String) -> Self {
        Self { text }
    }
}

impl From<&str> for SourceBuffer {
    fn from(text: &str) -> Self {
        Self { text: text.to_string() }
    }
}

impl AsRef<str> for SourceBuffer {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for SourceBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
