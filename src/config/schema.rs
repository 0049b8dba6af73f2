use serde::Deserialize;
use std::fmt;

use crate::literal::{LiteralEdit, MatchMode};
use crate::region::{RegionSpec, SpanExpectation};

/// One TOML job file: shared metadata plus an ordered list of jobs.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct JobSet {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub jobs: Vec<JobDefinition>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Semver requirement the source tree must satisfy, e.g. ">=2.1, <3".
    #[serde(default)]
    pub requires: Option<String>,
}

/// One file's patch plan as written in TOML.
///
/// `[[jobs.edit]]` tables become ordered literal edits; an optional
/// `[jobs.region]` table becomes the region replacement. Paths resolve
/// against the patch root.
#[derive(Debug, Deserialize, Clone)]
pub struct JobDefinition {
    pub id: String,
    pub file: String,
    #[serde(default, rename = "edit")]
    pub edits: Vec<EditDefinition>,
    #[serde(default)]
    pub region: Option<RegionDefinition>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EditDefinition {
    pub find: String,
    pub replace: String,
    #[serde(default)]
    pub mode: EditMode,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EditMode {
    #[default]
    All,
    First,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RegionDefinition {
    pub start: String,
    pub end: String,
    pub replacement: String,
    #[serde(default)]
    pub expect: Option<Expect>,
}

/// Optional verification of the span a region replacement rewrites.
#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Expect {
    Exact { text: String },
    Hash { value: String },
}

impl JobSet {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.jobs.is_empty() {
            issues.push(ValidationIssue::EmptyJobList);
        }

        for job in &self.jobs {
            if job.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    job_id: None,
                    field: "id",
                });
            }
            if job.file.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    job_id: Some(job.id.clone()),
                    field: "file",
                });
            }
            if job.edits.is_empty() && job.region.is_none() {
                issues.push(ValidationIssue::InvalidCombo {
                    job_id: Some(job.id.clone()),
                    message: "job has neither edits nor a region".to_string(),
                });
            }

            for (idx, edit) in job.edits.iter().enumerate() {
                if edit.find.is_empty() {
                    issues.push(ValidationIssue::InvalidCombo {
                        job_id: Some(job.id.clone()),
                        message: format!("edit #{} has an empty find anchor", idx + 1),
                    });
                }
            }

            if let Some(region) = &job.region {
                if region.start.is_empty() {
                    issues.push(ValidationIssue::InvalidCombo {
                        job_id: Some(job.id.clone()),
                        message: "region start anchor is empty".to_string(),
                    });
                }
                if region.end.is_empty() {
                    issues.push(ValidationIssue::InvalidCombo {
                        job_id: Some(job.id.clone()),
                        message: "region end anchor is empty".to_string(),
                    });
                }
                if let Some(expect) = &region.expect {
                    if let Err(message) = expect.to_expectation() {
                        issues.push(ValidationIssue::InvalidCombo {
                            job_id: Some(job.id.clone()),
                            message,
                        });
                    }
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

impl EditDefinition {
    pub fn to_edit(&self) -> LiteralEdit {
        let mut edit = LiteralEdit::new(&self.find, &self.replace);
        if self.mode == EditMode::First {
            edit.mode = MatchMode::First;
        }
        edit
    }
}

impl RegionDefinition {
    pub fn to_region(&self) -> Result<RegionSpec, String> {
        let mut spec = RegionSpec::new(&self.start, &self.end, &self.replacement);
        if let Some(expect) = &self.expect {
            spec = spec.with_expected(expect.to_expectation()?);
        }
        Ok(spec)
    }
}

impl Expect {
    pub fn to_expectation(&self) -> Result<SpanExpectation, String> {
        match self {
            Expect::Exact { text } => Ok(SpanExpectation::from_text(text)),
            Expect::Hash { value } => {
                let hash = u64::from_str_radix(value.trim_start_matches("0x"), 16)
                    .map_err(|_| format!("invalid hash value: {value}"))?;
                Ok(SpanExpectation::Hash(hash))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    EmptyJobList,
    MissingField {
        job_id: Option<String>,
        field: &'static str,
    },
    InvalidCombo {
        job_id: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyJobList => write!(f, "job file contains no jobs"),
            ValidationIssue::MissingField { job_id, field } => match job_id {
                Some(id) => write!(f, "job '{id}' missing required field '{field}'"),
                None => write!(f, "job missing required field '{field}'"),
            },
            ValidationIssue::InvalidCombo { job_id, message } => match job_id {
                Some(id) => write!(f, "job '{id}' has invalid configuration: {message}"),
                None => write!(f, "invalid job configuration: {message}"),
            },
        }
    }
}
