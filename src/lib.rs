//! Anchor Patch: idempotent anchor-based source patching
//!
//! A targeted patching system for source files: locate syntactic anchors
//! (a field declaration, a constructor signature, a method body) by literal
//! text and rewrite them, safely re-runnable on an already-patched tree.
//!
//! # Architecture
//!
//! Two engine components, both pure `SourceBuffer -> SourceBuffer`
//! transforms:
//!
//! - [`LiteralEdit`]: ordered exact find/replace, where an absent anchor is a
//!   no-op and an already-present replacement is detected and skipped
//! - [`RegionSpec`]: replacement of a whole span bounded by a start anchor
//!   and an end anchor, with no brace counting or grammar awareness
//!
//! [`PatchJob`] wraps them in file I/O: read, transform, and one atomic
//! write. Every failure is raised before the write, so a file is either fully
//! patched or untouched.
//!
//! # Safety
//!
//! - Ambiguous start anchors abort instead of guessing
//! - Atomic file writes (tempfile + fsync + rename)
//! - Patch-root boundary enforcement
//! - Optional span verification before region rewrites
//!
//! # Example
//!
//! ```no_run
//! use anchor_patch::{LiteralEdit, PatchJob, RegionSpec};
//!
//! let mut job = PatchJob::new("inject-navigation", "App/ViewModels/AttachmentsViewModel.cs");
//! job.edits.push(LiteralEdit::new(
//!     "private readonly ISqliteUnitOfWorkFactory _uowFactory;",
//!     "private readonly ISqliteUnitOfWorkFactory _uowFactory;\n    private readonly INavigationService _navigation;",
//! ));
//! job.region = Some(RegionSpec::new(
//!     "private void OnShowAttachments(BatchRow batch)",
//!     "private async Task OnUploadAttachmentsAsync()",
//!     "private void OnShowAttachments(BatchRow batch)\n    {\n        _navigation.Push(new AttachmentsPage(batch.Id));\n    }\n\n    ",
//! ));
//!
//! match job.run() {
//!     Ok(report) => println!("{}: wrote={}", report.file.display(), report.wrote),
//!     Err(e) => eprintln!("patch failed: {}", e),
//! }
//! ```

pub mod buffer;
pub mod config;
pub mod guard;
pub mod job;
pub mod literal;
pub mod region;
pub mod suggest;

// Re-exports
pub use buffer::SourceBuffer;
pub use config::{
    apply_jobs, check_jobs, load_from_path, load_from_str, ConfigError, JobSet, JobStatus,
    RunError,
};
pub use guard::{GuardError, RootGuard};
pub use job::{AnchorHint, JobError, JobReport, PatchJob, TextChange};
pub use literal::{EditOutcome, LiteralEdit, MatchMode};
pub use region::{RegionError, RegionOutcome, RegionSpec, SpanExpectation};
pub use suggest::{nearest_line, Candidate};
