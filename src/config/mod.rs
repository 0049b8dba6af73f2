pub mod gate;
pub mod loader;
pub mod runner;
pub mod schema;

pub use gate::{Gate, GateError};
pub use loader::{load_from_path, load_from_str, ConfigError};
pub use runner::{apply_jobs, check_jobs, JobStatus, RunError};
pub use schema::{
    EditDefinition, EditMode, Expect, JobDefinition, JobSet, Metadata, RegionDefinition,
    ValidationError, ValidationIssue,
};
