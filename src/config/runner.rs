//! Job-set runner: version gate, path resolution, per-job results.
//!
//! The runner is the bridge between TOML job files and the engine. It
//! evaluates the set's version requirement once, resolves every job's file
//! through the root guard, and runs the jobs in declaration order, returning
//! one result per job so the caller can report them individually.

use crate::config::gate::{self, Gate, GateError};
use crate::config::schema::{EditDefinition, JobDefinition, JobSet};
use crate::guard::{GuardError, RootGuard};
use crate::job::{JobError, JobReport, PatchJob};
use std::fmt;

/// Result of one job within a set.
#[derive(Debug, Clone)]
#[must_use = "JobStatus should be checked for skipped anchors"]
pub enum JobStatus {
    /// The file changed. Written back unless this was a check run.
    Patched { report: JobReport },
    /// Every stage was already in place; the file was not touched.
    UpToDate { report: JobReport },
    /// The set's version requirement was not satisfied.
    SkippedGate { reason: String },
}

impl JobStatus {
    pub fn report(&self) -> Option<&JobReport> {
        match self {
            JobStatus::Patched { report } | JobStatus::UpToDate { report } => Some(report),
            JobStatus::SkippedGate { .. } => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Patched { report } if report.wrote => {
                write!(f, "patched {}", report.file.display())
            }
            JobStatus::Patched { report } => {
                write!(f, "would patch {}", report.file.display())
            }
            JobStatus::UpToDate { report } => {
                write!(f, "up to date: {}", report.file.display())
            }
            JobStatus::SkippedGate { reason } => {
                write!(f, "skipped (version): {}", reason)
            }
        }
    }
}

/// Errors while running one job.
#[derive(Debug)]
pub enum RunError {
    /// Gate evaluation failed (bad version or requirement string)
    Gate(GateError),
    /// The job's file is outside the patch root or otherwise off-limits
    Guard(GuardError),
    /// The job itself failed (I/O or a fatal region error)
    Job(JobError),
    /// An expectation spec that slipped past validation
    InvalidExpect { job_id: String, message: String },
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Gate(e) => write!(f, "version gate error: {}", e),
            RunError::Guard(e) => write!(f, "path rejected: {}", e),
            RunError::Job(e) => write!(f, "{}", e),
            RunError::InvalidExpect { job_id, message } => {
                write!(f, "job '{}' has an invalid expectation: {}", job_id, message)
            }
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Gate(e) => Some(e),
            RunError::Guard(e) => Some(e),
            RunError::Job(e) => Some(e),
            RunError::InvalidExpect { .. } => None,
        }
    }
}

impl From<GateError> for RunError {
    fn from(e: GateError) -> Self {
        RunError::Gate(e)
    }
}

impl From<GuardError> for RunError {
    fn from(e: GuardError) -> Self {
        RunError::Guard(e)
    }
}

impl From<JobError> for RunError {
    fn from(e: JobError) -> Self {
        RunError::Job(e)
    }
}

/// Apply every job in the set, writing changed files back.
pub fn apply_jobs(
    set: &JobSet,
    guard: &RootGuard,
    source_version: Option<&str>,
) -> Vec<(String, Result<JobStatus, RunError>)> {
    run_jobs(set, guard, source_version, true)
}

/// Evaluate every job in the set without writing anything.
///
/// Statuses mirror `apply_jobs`: a `Patched` status here means the job would
/// change the file, with the proposed text in `report.change`.
pub fn check_jobs(
    set: &JobSet,
    guard: &RootGuard,
    source_version: Option<&str>,
) -> Vec<(String, Result<JobStatus, RunError>)> {
    run_jobs(set, guard, source_version, false)
}

fn run_jobs(
    set: &JobSet,
    guard: &RootGuard,
    source_version: Option<&str>,
    commit: bool,
) -> Vec<(String, Result<JobStatus, RunError>)> {
    match gate::evaluate(source_version, set.meta.requires.as_deref()) {
        Ok(Gate::Applies) => {}
        Ok(Gate::Skipped { reason }) => {
            return set
                .jobs
                .iter()
                .map(|job| {
                    (
                        job.id.clone(),
                        Ok(JobStatus::SkippedGate {
                            reason: reason.clone(),
                        }),
                    )
                })
                .collect();
        }
        Err(e) => {
            return set
                .jobs
                .iter()
                .map(|job| (job.id.clone(), Err(RunError::Gate(e.clone()))))
                .collect();
        }
    }

    set.jobs
        .iter()
        .map(|def| (def.id.clone(), run_one(def, guard, commit)))
        .collect()
}

/// Jobs run in declaration order and re-read their file, so a later job
/// targeting the same file sees what an earlier job wrote.
fn run_one(def: &JobDefinition, guard: &RootGuard, commit: bool) -> Result<JobStatus, RunError> {
    let file = guard.resolve(&def.file)?;

    let mut job = PatchJob::new(&def.id, file);
    job.edits = def.edits.iter().map(EditDefinition::to_edit).collect();
    if let Some(region_def) = &def.region {
        job.region = Some(
            region_def
                .to_region()
                .map_err(|message| RunError::InvalidExpect {
                    job_id: def.id.clone(),
                    message,
                })?,
        );
    }

    let report = if commit { job.run()? } else { job.check()? };

    Ok(if report.changed() {
        JobStatus::Patched { report }
    } else {
        JobStatus::UpToDate { report }
    })
}
