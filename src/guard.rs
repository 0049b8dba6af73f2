use std::path::{Path, PathBuf};
use thiserror::Error;

/// Boundary checks keeping every write inside the target tree.
///
/// Patch jobs name files relative to a root chosen by the operator. The guard
/// canonicalizes that root once and then refuses any job path that resolves
/// outside it, including symlink escapes, plus a short list of directories
/// that are never legitimate patch targets.
#[derive(Debug, Clone)]
pub struct RootGuard {
    /// Canonical root of the tree being patched.
    root: PathBuf,
    /// Canonical paths that must never be written to.
    forbidden: Vec<PathBuf>,
}

#[derive(Error, Debug)]
pub enum GuardError {
    #[error("path is outside the patch root: {path} (root: {root})")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("path is in a forbidden directory: {path} (forbidden: {forbidden})")]
    ForbiddenPath { path: PathBuf, forbidden: PathBuf },

    #[error("failed to canonicalize path: {0}")]
    Canonicalize(#[from] std::io::Error),
}

impl RootGuard {
    /// Create a guard for the given root.
    ///
    /// The root is canonicalized so symlinked checkouts compare correctly.
    /// Version-control internals and package caches are forbidden outright;
    /// restoring a mangled dependency cache is far more painful than a failed
    /// patch.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, GuardError> {
        let root = root.as_ref().canonicalize()?;

        let mut forbidden = Vec::new();

        if let Ok(git_dir) = root.join(".git").canonicalize() {
            forbidden.push(git_dir);
        }

        if let Some(home) = home::home_dir() {
            if let Ok(nuget_cache) = home.join(".nuget/packages").canonicalize() {
                forbidden.push(nuget_cache);
            }
            if let Ok(cargo_registry) = home.join(".cargo/registry").canonicalize() {
                forbidden.push(cargo_registry);
            }
        }

        Ok(Self { root, forbidden })
    }

    /// Check that a job's file is safe to patch.
    ///
    /// Relative paths resolve against the root. Returns the canonical
    /// absolute path on success; the file must already exist (this tool
    /// rewrites files, it does not create them).
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<PathBuf, GuardError> {
        let path = path.as_ref();

        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };

        let canonical = absolute.canonicalize()?;

        if !canonical.starts_with(&self.root) {
            return Err(GuardError::OutsideRoot {
                path: canonical,
                root: self.root.clone(),
            });
        }

        for forbidden in &self.forbidden {
            if canonical.starts_with(forbidden) {
                return Err(GuardError::ForbiddenPath {
                    path: canonical,
                    forbidden: forbidden.clone(),
                });
            }
        }

        Ok(canonical)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a guard with custom forbidden paths (for testing).
    #[cfg(test)]
    pub fn with_forbidden(
        root: impl AsRef<Path>,
        forbidden: Vec<PathBuf>,
    ) -> Result<Self, GuardError> {
        let root = root.as_ref().canonicalize()?;
        Ok(Self { root, forbidden })
    }
}
