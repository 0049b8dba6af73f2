//! Version gating for job sets using semver requirements.
//!
//! A job set can declare the source revisions its anchors were written
//! against, e.g. `requires = ">=2.1, <3"`, and is skipped wholesale when the
//! tree being patched does not satisfy it.

use semver::{Version, VersionReq};
use std::fmt;

/// Outcome of evaluating a job set's version requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    /// The set applies to this source tree.
    Applies,
    /// The set must not run; the reason is operator-facing.
    Skipped { reason: String },
}

/// Errors during gate evaluation.
#[derive(Debug, Clone)]
pub enum GateError {
    /// Invalid version string (e.g., "not-a-version")
    InvalidVersion { value: String, source: String },
    /// Invalid version requirement (e.g., ">=bad")
    InvalidRequirement { value: String, source: String },
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateError::InvalidVersion { value, source } => {
                write!(f, "invalid source version '{}': {}", value, source)
            }
            GateError::InvalidRequirement { value, source } => {
                write!(f, "invalid version requirement '{}': {}", value, source)
            }
        }
    }
}

impl std::error::Error for GateError {}

/// Evaluate a requirement against the operator-supplied source version.
///
/// No requirement (or a blank one) means the set applies everywhere. A
/// requirement with no version supplied skips the set: guessing a version for
/// a tool that rewrites files is worse than asking the operator for one.
///
/// # Examples
///
/// ```
/// use anchor_patch::config::gate::{evaluate, Gate};
///
/// assert_eq!(evaluate(Some("2.1.0"), Some(">=2.1")).unwrap(), Gate::Applies);
/// assert_eq!(evaluate(Some("2.1.0"), None).unwrap(), Gate::Applies);
///
/// assert!(matches!(
///     evaluate(Some("1.9.0"), Some(">=2.1")).unwrap(),
///     Gate::Skipped { .. }
/// ));
/// assert!(matches!(
///     evaluate(None, Some(">=2.1")).unwrap(),
///     Gate::Skipped { .. }
/// ));
/// ```
pub fn evaluate(
    source_version: Option<&str>,
    requirement: Option<&str>,
) -> Result<Gate, GateError> {
    let Some(req_str) = requirement.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(Gate::Applies);
    };

    let Some(version_str) = source_version.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(Gate::Skipped {
            reason: format!("set requires version '{req_str}' but no source version was supplied"),
        });
    };

    let version = Version::parse(version_str).map_err(|e| GateError::InvalidVersion {
        value: version_str.to_string(),
        source: e.to_string(),
    })?;

    let req = VersionReq::parse(req_str).map_err(|e| GateError::InvalidRequirement {
        value: req_str.to_string(),
        source: e.to_string(),
    })?;

    if req.matches(&version) {
        Ok(Gate::Applies)
    } else {
        Ok(Gate::Skipped {
            reason: format!("source version {version} does not satisfy requirement '{req_str}'"),
        })
    }
}
