use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;
use walkdir::WalkDir;

use anchor_patch::config::{apply_jobs, check_jobs, load_from_path, JobStatus, RunError};
use anchor_patch::guard::RootGuard;
use anchor_patch::job::{JobError, JobReport};
use anchor_patch::region::RegionError;
use anchor_patch::suggest;

#[derive(Parser)]
#[command(name = "anchor-patch")]
#[command(about = "Idempotent anchor-based source patching", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply job files to a source tree
    Apply {
        /// Path to the patch root (detected via git if not specified)
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// Specific job file to apply (otherwise applies all in patches/)
        #[arg(short, long)]
        jobs: Option<PathBuf>,

        /// Version of the source tree, checked against each set's `requires`
        #[arg(long)]
        source_version: Option<String>,

        /// Dry run - report what would change without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Report job status without applying
    Check {
        /// Path to the patch root (detected via git if not specified)
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// Specific job file to check (otherwise checks all in patches/)
        #[arg(short, long)]
        jobs: Option<PathBuf>,

        /// Version of the source tree, checked against each set's `requires`
        #[arg(long)]
        source_version: Option<String>,

        /// Emit a machine-readable JSON report
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Apply {
            root,
            jobs,
            source_version,
            dry_run,
            diff,
        } => cmd_apply(root, jobs, source_version, dry_run, diff),

        Commands::Check {
            root,
            jobs,
            source_version,
            json,
        } => cmd_check(root, jobs, source_version, json),
    }
}

/// Helper: Discover all .toml job files in a patches/ directory.
///
/// Discovery order:
/// 1. `<root>/patches` (job files kept alongside the target tree).
/// 2. `./patches` relative to the current working directory (typical when
///    running from the repo that owns the job files).
fn discover_job_files(root: &Path) -> Result<Vec<PathBuf>> {
    let cwd_patches_dir = env::current_dir().ok().map(|cwd| cwd.join("patches"));
    let root_patches_dir = root.join("patches");

    let candidate_dirs: Vec<PathBuf> = std::iter::once(root_patches_dir)
        .chain(cwd_patches_dir)
        .collect();

    for patches_dir in candidate_dirs {
        if !patches_dir.exists() {
            continue;
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&patches_dir).max_depth(1) {
            let entry = entry?;
            if entry.file_type().is_file()
                && entry.path().extension().and_then(|s| s.to_str()) == Some("toml")
            {
                files.push(entry.path().to_path_buf());
            }
        }

        files.sort();

        if !files.is_empty() {
            return Ok(files);
        }
    }

    anyhow::bail!(
        "No .toml job files found in either ./patches or {}/patches",
        root.display()
    )
}

/// Resolve the patch root.
///
/// Priority order:
/// 1. Explicit --root flag
/// 2. ANCHOR_PATCH_ROOT environment variable
/// 3. Enclosing git worktree
fn resolve_root(cli_root: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = cli_root {
        return Ok(path.canonicalize()?);
    }

    if let Ok(env_path) = env::var("ANCHOR_PATCH_ROOT") {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Ok(path.canonicalize()?);
        }
        eprintln!(
            "{}",
            format!(
                "Warning: ANCHOR_PATCH_ROOT is set but path doesn't exist: {}",
                env_path
            )
            .yellow()
        );
    }

    if let Some(path) = find_root_via_git() {
        println!(
            "{}",
            format!("Using enclosing git worktree: {}", path.display()).dimmed()
        );
        return Ok(path);
    }

    anyhow::bail!(
        "{}\n{}\n  {}\n  {}\n  {}",
        "Could not determine the patch root.".red(),
        "Try one of:".bold(),
        "1. Run from inside the target checkout: cd /path/to/tree && anchor-patch apply",
        "2. Specify explicitly: anchor-patch apply --root /path/to/tree",
        "3. Set environment variable: export ANCHOR_PATCH_ROOT=/path/to/tree"
    )
}

/// Use the enclosing git worktree as the root when running from inside the
/// target checkout.
fn find_root_via_git() -> Option<PathBuf> {
    let output = Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if root.is_empty() {
        return None;
    }

    let path = PathBuf::from(root);
    if path.exists() {
        Some(path)
    } else {
        None
    }
}

/// Helper: Show unified diff between original and patched content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

/// Dimmed follow-up lines for anchors that did not resolve.
fn print_hints(report: &JobReport) {
    for hint in &report.hints {
        let line = match &hint.nearest {
            Some(candidate) => format!(
                "{}: anchor `{}` not found; closest is line {}: `{}` ({:.0}% similar)",
                hint.label,
                hint.anchor,
                candidate.line,
                suggest::snippet(&candidate.text, 60),
                candidate.score * 100.0
            ),
            None => format!("{}: anchor `{}` not found", hint.label, hint.anchor),
        };
        println!("  {}", line.dimmed());
    }
}

/// Conflict diagnostics for fatal region failures.
fn explain_failure(error: &RunError) {
    if let RunError::Job(JobError::Region { source, .. }) = error {
        match source {
            RegionError::AmbiguousStart { anchor, count } => {
                eprintln!(
                    "  {}",
                    format!("CONFLICT: start anchor matched {count} locations (expected 1)").red()
                );
                eprintln!("  Anchor: `{}`", anchor);
                eprintln!("  Action: extend the start anchor until it is unique in the file");
            }
            RegionError::UnterminatedRegion { anchor } => {
                eprintln!(
                    "  {}",
                    "CONFLICT: end anchor not found after the start anchor".red()
                );
                eprintln!("  Anchor: `{}`", anchor);
                eprintln!("  Possible causes:");
                eprintln!("    - The construct after the region was renamed or removed");
                eprintln!("    - The region was partially rewritten by hand");
            }
            RegionError::SpanMismatch { found } => {
                eprintln!(
                    "  {}",
                    "CONFLICT: span between anchors does not match expected content".red()
                );
                eprintln!("  Found: `{}`", found);
                eprintln!("  Action: review the current span, then update the replacement and expect");
            }
        }
    }
}

fn cmd_apply(
    root: Option<PathBuf>,
    jobs: Option<PathBuf>,
    source_version: Option<String>,
    dry_run: bool,
    show_diff: bool,
) -> Result<()> {
    let root = resolve_root(root)?;
    let guard = RootGuard::new(&root)?;

    let job_files = if let Some(path) = jobs {
        vec![path]
    } else {
        discover_job_files(&root)?
    };

    println!("Root: {}", root.display());
    if let Some(version) = &source_version {
        println!("Source version: {}", version);
    }
    println!();

    let mut total_patched = 0;
    let mut total_up_to_date = 0;
    let mut total_skipped = 0;
    let mut total_failed = 0;

    for job_file in job_files {
        println!("Loading jobs from {}...", job_file.display());

        let set = load_from_path(&job_file)?;

        let results = if dry_run {
            println!("{}", "  [DRY RUN - no files will be modified]".cyan());
            check_jobs(&set, &guard, source_version.as_deref())
        } else {
            apply_jobs(&set, &guard, source_version.as_deref())
        };

        for (job_id, result) in results {
            match result {
                Ok(JobStatus::Patched { report }) => {
                    if dry_run {
                        println!(
                            "{} {}: Would patch {}",
                            "✓".green(),
                            job_id,
                            report.file.display()
                        );
                    } else {
                        println!(
                            "{} {}: Patched {}",
                            "✓".green(),
                            job_id,
                            report.file.display()
                        );
                    }
                    total_patched += 1;
                    print_hints(&report);

                    if show_diff {
                        if let Some(change) = &report.change {
                            display_diff(&report.file, &change.before, &change.after);
                        }
                    }
                }
                Ok(JobStatus::UpToDate { report }) => {
                    println!(
                        "{} {}: Up to date ({})",
                        "⊙".yellow(),
                        job_id,
                        report.file.display()
                    );
                    total_up_to_date += 1;
                    print_hints(&report);
                }
                Ok(JobStatus::SkippedGate { reason }) => {
                    println!("{} {}: Skipped ({})", "⊘".cyan(), job_id, reason);
                    total_skipped += 1;
                }
                Err(e) => {
                    eprintln!("{} {}: Failed - {}", "✗".red(), job_id, e);
                    explain_failure(&e);
                    total_failed += 1;
                }
            }
        }

        println!();
    }

    println!("{}", "Summary:".bold());
    println!("  {} patched", format!("{}", total_patched).green());
    println!(
        "  {} up to date",
        format!("{}", total_up_to_date).yellow()
    );
    println!("  {} skipped", format!("{}", total_skipped).cyan());
    println!("  {} failed", format!("{}", total_failed).red());

    if total_failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

struct CheckEntry {
    set: String,
    id: String,
    result: Result<JobStatus, RunError>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    root: String,
    source_version: Option<&'a str>,
    jobs: Vec<JsonJob<'a>>,
}

#[derive(Serialize)]
struct JsonJob<'a> {
    set: &'a str,
    id: &'a str,
    status: &'static str,
    file: Option<String>,
    detail: Option<String>,
    edits: Vec<String>,
    region: Option<String>,
    hints: Vec<String>,
}

fn cmd_check(
    root: Option<PathBuf>,
    jobs: Option<PathBuf>,
    source_version: Option<String>,
    json: bool,
) -> Result<()> {
    let root = resolve_root(root)?;
    let guard = RootGuard::new(&root)?;

    let job_files = if let Some(path) = jobs {
        vec![path]
    } else {
        discover_job_files(&root)?
    };

    let mut entries = Vec::new();
    for job_file in &job_files {
        let set = load_from_path(job_file)?;
        let set_name = if set.meta.name.trim().is_empty() {
            job_file
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("unnamed")
                .to_string()
        } else {
            set.meta.name.clone()
        };

        for (job_id, result) in check_jobs(&set, &guard, source_version.as_deref()) {
            entries.push(CheckEntry {
                set: set_name.clone(),
                id: job_id,
                result,
            });
        }
    }

    let any_failed = entries.iter().any(|e| e.result.is_err());

    if json {
        let report = JsonReport {
            root: root.display().to_string(),
            source_version: source_version.as_deref(),
            jobs: entries.iter().map(json_job).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_check_report(&root, source_version.as_deref(), &entries);
    }

    if any_failed {
        std::process::exit(1);
    }

    Ok(())
}

fn json_job(entry: &CheckEntry) -> JsonJob<'_> {
    let (status, file, detail, edits, region, hints) = match &entry.result {
        Ok(JobStatus::Patched { report }) => (
            "would-patch",
            Some(report.file.display().to_string()),
            None,
            report.edits.iter().map(|o| o.to_string()).collect(),
            report.region.as_ref().map(|o| o.to_string()),
            hint_lines(report),
        ),
        Ok(JobStatus::UpToDate { report }) => (
            "up-to-date",
            Some(report.file.display().to_string()),
            None,
            report.edits.iter().map(|o| o.to_string()).collect(),
            report.region.as_ref().map(|o| o.to_string()),
            hint_lines(report),
        ),
        Ok(JobStatus::SkippedGate { reason }) => (
            "skipped-version",
            None,
            Some(reason.clone()),
            Vec::new(),
            None,
            Vec::new(),
        ),
        Err(e) => (
            "failed",
            None,
            Some(e.to_string()),
            Vec::new(),
            None,
            Vec::new(),
        ),
    };

    JsonJob {
        set: &entry.set,
        id: &entry.id,
        status,
        file,
        detail,
        edits,
        region,
        hints,
    }
}

fn hint_lines(report: &JobReport) -> Vec<String> {
    report
        .hints
        .iter()
        .map(|hint| match &hint.nearest {
            Some(candidate) => format!(
                "{}: anchor `{}` not found; closest is line {}",
                hint.label, hint.anchor, candidate.line
            ),
            None => format!("{}: anchor `{}` not found", hint.label, hint.anchor),
        })
        .collect()
}

fn print_check_report(root: &Path, source_version: Option<&str>, entries: &[CheckEntry]) {
    println!("{}", "Job Status Report".bold());
    println!("Root: {}", root.display());
    if let Some(version) = source_version {
        println!("Source version: {}", version);
    }
    println!();

    let mut pending = Vec::new();
    let mut up_to_date = Vec::new();
    let mut skipped = Vec::new();
    let mut failed = Vec::new();

    for entry in entries {
        let label = format!("{}/{}", entry.set, entry.id);
        match &entry.result {
            Ok(JobStatus::Patched { report }) => {
                pending.push((label, report.file.display().to_string()));
            }
            Ok(JobStatus::UpToDate { report }) => {
                let note = if report.hints.is_empty() {
                    None
                } else {
                    Some(format!("{} anchors unmatched", report.hints.len()))
                };
                up_to_date.push((label, note));
            }
            Ok(JobStatus::SkippedGate { reason }) => {
                skipped.push((label, reason.clone()));
            }
            Err(e) => {
                failed.push((label, e.to_string()));
            }
        }
    }

    if !pending.is_empty() {
        println!(
            "{} {} ({} jobs)",
            "⊙".yellow(),
            "PENDING".yellow().bold(),
            pending.len()
        );
        for (label, file) in &pending {
            println!("  - {}: would patch {}", label, file);
        }
        println!();
    }

    if !up_to_date.is_empty() {
        println!(
            "{} {} ({} jobs)",
            "✓".green(),
            "UP TO DATE".green().bold(),
            up_to_date.len()
        );
        for (label, note) in &up_to_date {
            match note {
                Some(note) => println!("  - {} ({})", label, note.dimmed()),
                None => println!("  - {}", label),
            }
        }
        println!();
    }

    if !skipped.is_empty() {
        println!(
            "{} {} ({} jobs)",
            "⊘".cyan(),
            "SKIPPED".cyan().bold(),
            skipped.len()
        );
        for (label, reason) in &skipped {
            println!("  - {} ({})", label, reason.dimmed());
        }
        println!();
    }

    if !failed.is_empty() {
        println!(
            "{} {} ({} jobs)",
            "✗".red(),
            "FAILED".red().bold(),
            failed.len()
        );
        for (label, reason) in &failed {
            println!("  - {} ({})", label, reason);
        }
        println!();
    }
}
