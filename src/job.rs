use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::buffer::SourceBuffer;
use crate::literal::{self, EditOutcome, LiteralEdit};
use crate::region::{RegionError, RegionOutcome, RegionSpec};
use crate::suggest::{self, Candidate};

/// One file's worth of patching: ordered literal edits, then at most one
/// region replacement, then a single write.
///
/// Every transform failure surfaces before the write step, so a job either
/// rewrites its file completely or leaves it byte-identical. There is no
/// partial application to roll back.
#[derive(Debug, Clone)]
#[must_use = "PatchJob does nothing until run() or check() is called"]
pub struct PatchJob {
    /// Operator-facing identifier, unique within a job set.
    pub id: String,
    /// Absolute path of the file to patch.
    pub file: PathBuf,
    /// Literal edits, applied in declaration order.
    pub edits: Vec<LiteralEdit>,
    /// At most one region replacement, applied after the edits.
    pub region: Option<RegionSpec>,
}

/// What one job did (or, in check mode, would do).
#[derive(Debug, Clone)]
pub struct JobReport {
    pub file: PathBuf,
    /// One outcome per literal edit, in declaration order.
    pub edits: Vec<EditOutcome>,
    pub region: Option<RegionOutcome>,
    /// Nearest-line hints for anchors that did not resolve.
    pub hints: Vec<AnchorHint>,
    /// Before/after text, present only when the pipeline changed the buffer.
    pub change: Option<TextChange>,
    /// True when the change was written back; always false in check mode.
    pub wrote: bool,
}

impl JobReport {
    pub fn changed(&self) -> bool {
        self.change.is_some()
    }
}

/// Retained buffer states for diff rendering.
#[derive(Debug, Clone)]
pub struct TextChange {
    pub before: String,
    pub after: String,
}

/// Diagnostic for one anchor that failed to resolve.
#[derive(Debug, Clone)]
pub struct AnchorHint {
    /// Which stage missed, e.g. `edit #2` or `region start`.
    pub label: String,
    /// First line of the missed anchor, truncated.
    pub anchor: String,
    /// Closest line in the pre-patch file, if any clears the similarity floor.
    pub nearest: Option<Candidate>,
}

#[derive(Error, Debug)]
pub enum JobError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("region replacement failed in {path}: {source}")]
    Region { path: PathBuf, source: RegionError },
}

/// Anchor length shown in hint labels before truncation.
const HINT_SNIPPET_CHARS: usize = 60;

impl PatchJob {
    pub fn new(id: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            file: file.into(),
            edits: Vec::new(),
            region: None,
        }
    }

    /// Apply the job and write the result back atomically.
    ///
    /// The write happens only when the pipeline actually changed the buffer;
    /// a fully converged job touches nothing (and preserves the mtime).
    pub fn run(&self) -> Result<JobReport, JobError> {
        let original = self.read()?;
        let (buffer, edits, region) = self.transform(&original)?;

        let changed = buffer.as_str() != original;
        if changed {
            atomic_write(&self.file, buffer.as_str()).map_err(|source| JobError::Write {
                path: self.file.clone(),
                source,
            })?;

            // Refresh mtime so incremental build systems pick up the change.
            let now = filetime::FileTime::now();
            filetime::set_file_mtime(&self.file, now).map_err(|source| JobError::Write {
                path: self.file.clone(),
                source,
            })?;
        }

        Ok(self.build_report(original, buffer, edits, region, changed))
    }

    /// Run the full transform pipeline without writing anything.
    ///
    /// This is the same code path as [`run`](Self::run) minus the write, so a
    /// dry run reports exactly what an apply would do.
    pub fn check(&self) -> Result<JobReport, JobError> {
        let original = self.read()?;
        let (buffer, edits, region) = self.transform(&original)?;
        Ok(self.build_report(original, buffer, edits, region, false))
    }

    fn read(&self) -> Result<String, JobError> {
        fs::read_to_string(&self.file).map_err(|source| JobError::Read {
            path: self.file.clone(),
            source,
        })
    }

    fn transform(
        &self,
        original: &str,
    ) -> Result<(SourceBuffer, Vec<EditOutcome>, Option<RegionOutcome>), JobError> {
        let (mut buffer, edit_outcomes) =
            literal::apply_all(&self.edits, SourceBuffer::new(original));

        let mut region_outcome = None;
        if let Some(region) = &self.region {
            let (next, outcome) = region.apply(buffer).map_err(|source| JobError::Region {
                path: self.file.clone(),
                source,
            })?;
            buffer = next;
            region_outcome = Some(outcome);
        }

        Ok((buffer, edit_outcomes, region_outcome))
    }

    fn build_report(
        &self,
        original: String,
        buffer: SourceBuffer,
        edits: Vec<EditOutcome>,
        region: Option<RegionOutcome>,
        wrote: bool,
    ) -> JobReport {
        let hints = self.collect_hints(&original, &edits, region.as_ref());
        let after = buffer.into_string();
        let change = (after != original).then_some(TextChange {
            before: original,
            after,
        });

        JobReport {
            file: self.file.clone(),
            edits,
            region,
            hints,
            change,
            wrote,
        }
    }

    /// Hints are computed against the pre-patch text: that is the file the
    /// operator will open to repair a drifted anchor.
    fn collect_hints(
        &self,
        original: &str,
        edits: &[EditOutcome],
        region: Option<&RegionOutcome>,
    ) -> Vec<AnchorHint> {
        let mut hints = Vec::new();

        for (idx, outcome) in edits.iter().enumerate() {
            if matches!(outcome, EditOutcome::Skipped) {
                let spec = &self.edits[idx];
                hints.push(AnchorHint {
                    label: format!("edit #{}", idx + 1),
                    anchor: suggest::snippet(&spec.find, HINT_SNIPPET_CHARS),
                    nearest: suggest::nearest_line(&spec.find, original),
                });
            }
        }

        if let (Some(RegionOutcome::Skipped), Some(spec)) = (region, self.region.as_ref()) {
            hints.push(AnchorHint {
                label: "region start".to_string(),
                anchor: suggest::snippet(&spec.start, HINT_SNIPPET_CHARS),
                nearest: suggest::nearest_line(&spec.start, original),
            });
        }

        hints
    }
}

/// Atomic file write: tempfile in the target directory + fsync + rename.
///
/// Either the full write lands or the original file survives untouched.
fn atomic_write(path: &Path, content: &str) -> std::io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "path has no parent directory",
        )
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
