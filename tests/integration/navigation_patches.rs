//! Integration tests for the shipped viewmodel-navigation job set.
//!
//! Runs the real patches/viewmodel-navigation.toml file against a mock
//! WPF view-model tree: constructor injection via ordered literal edits,
//! method replacement via anchored region, and idempotent re-runs.

use anchor_patch::config::{apply_jobs, check_jobs, load_from_path, JobStatus};
use anchor_patch::RootGuard;
use std::fs;
use tempfile::TempDir;

const ATTACHMENTS_VM: &str = "src/DHSIntegrationAgent.App/UI/ViewModels/AttachmentsViewModel.cs";
const BATCHES_VM: &str = "src/DHSIntegrationAgent.App/UI/ViewModels/BatchesViewModel.cs";

fn setup_mock_app_tree() -> TempDir {
    let dir = TempDir::new().unwrap();

    fs::create_dir_all(dir.path().join("src/DHSIntegrationAgent.App/UI/ViewModels")).unwrap();

    // AttachmentsViewModel.cs resolves navigation from the service host at
    // call time, the pattern the job set replaces with injection.
    fs::write(
        dir.path().join(ATTACHMENTS_VM),
        r#"using System;
using System.Threading.Tasks;
using DHSIntegrationAgent.Application.Persistence;

namespace DHSIntegrationAgent.App.UI.ViewModels;

public class AttachmentsViewModel : ViewModelBase
{
    private readonly ISqliteUnitOfWorkFactory _uowFactory;

    public AttachmentsViewModel(ISqliteUnitOfWorkFactory uowFactory)
    {
        _uowFactory = uowFactory;

        GoBackCommand = new RelayCommand(() =>
        {
            var nav = Microsoft.Extensions.DependencyInjection.ServiceProviderServiceExtensions.GetRequiredService<DHSIntegrationAgent.App.UI.Navigation.INavigationService>(
                ((App)System.Windows.Application.Current).ServiceHost?.Services);
            nav.NavigateTo<BatchesViewModel>();
        });
    }

    public RelayCommand GoBackCommand { get; }

    public Task InitializeAsync(long batchId, string title) => Task.CompletedTask;
}
"#,
    )
    .unwrap();

    // BatchesViewModel.cs opens attachments in a modal window instead of
    // navigating; OnShowAttachments is rebuilt wholesale by the region job.
    fs::write(
        dir.path().join(BATCHES_VM),
        r#"using System;
using System.Threading.Tasks;
using System.Windows;
using DHSIntegrationAgent.Application.Persistence;
using DHSIntegrationAgent.App.UI.Navigation;

namespace DHSIntegrationAgent.App.UI.ViewModels;

public class BatchesViewModel : ViewModelBase
{
    private readonly ISqliteUnitOfWorkFactory _unitOfWorkFactory;
    private readonly INavigationService _navigation;

    private void OnShowAttachments(BatchRow batch)
    {
        if (batch == null) return;

        var window = new AttachmentsWindow(batch.BcrId);
        window.Owner = System.Windows.Application.Current.MainWindow;
        window.ShowDialog();
    }

    private async Task OnUploadAttachmentsAsync()
    {
        await Task.CompletedTask;
    }
}
"#,
    )
    .unwrap();

    dir
}

fn job_file() -> std::path::PathBuf {
    std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("patches/viewmodel-navigation.toml")
}

#[test]
fn test_navigation_jobs_apply() {
    let tree = setup_mock_app_tree();
    let set = load_from_path(&job_file()).expect("Failed to load viewmodel-navigation.toml");
    let guard = RootGuard::new(tree.path()).unwrap();

    for (job_id, result) in apply_jobs(&set, &guard, None) {
        match result {
            Ok(JobStatus::Patched { .. }) => {}
            Ok(other) => panic!("{}: expected a patch, got {}", job_id, other),
            Err(e) => panic!("{}: {}", job_id, e),
        }
    }

    let attachments = fs::read_to_string(tree.path().join(ATTACHMENTS_VM)).unwrap();
    assert!(
        attachments.contains("using DHSIntegrationAgent.App.UI.Navigation;"),
        "Navigation using-directive should be added"
    );
    assert!(
        attachments.contains("private readonly INavigationService _navigation;"),
        "Navigation field should be declared"
    );
    assert!(
        attachments
            .contains("AttachmentsViewModel(ISqliteUnitOfWorkFactory uowFactory, INavigationService navigation)"),
        "Constructor should take the navigation service"
    );
    assert!(
        attachments.contains("_navigation = navigation;"),
        "Constructor should store the navigation service"
    );
    assert!(
        attachments.contains("_navigation.NavigateTo<BatchesViewModel>();"),
        "GoBackCommand should use the injected service"
    );
    assert!(
        !attachments.contains("var nav = "),
        "Service-locator lookup should be gone"
    );

    let batches = fs::read_to_string(tree.path().join(BATCHES_VM)).unwrap();
    assert!(
        batches.contains("_navigation.NavigateTo(attachmentsVm);"),
        "OnShowAttachments should navigate to the attachments view-model"
    );
    assert!(
        !batches.contains("new AttachmentsWindow"),
        "Modal window construction should be gone"
    );
    assert!(
        batches.contains("private async Task OnUploadAttachmentsAsync()"),
        "The method after the region must survive untouched"
    );
}

#[test]
fn test_navigation_jobs_idempotent() {
    let tree = setup_mock_app_tree();
    let set = load_from_path(&job_file()).expect("Failed to load viewmodel-navigation.toml");
    let guard = RootGuard::new(tree.path()).unwrap();

    for (job_id, result) in apply_jobs(&set, &guard, None) {
        assert!(
            matches!(result, Ok(JobStatus::Patched { .. })),
            "{}: first run should patch",
            job_id
        );
    }

    let attachments_once = fs::read_to_string(tree.path().join(ATTACHMENTS_VM)).unwrap();
    let batches_once = fs::read_to_string(tree.path().join(BATCHES_VM)).unwrap();

    for (job_id, result) in apply_jobs(&set, &guard, None) {
        assert!(
            matches!(result, Ok(JobStatus::UpToDate { .. })),
            "{}: second run should be a no-op",
            job_id
        );
    }

    let attachments_twice = fs::read_to_string(tree.path().join(ATTACHMENTS_VM)).unwrap();
    let batches_twice = fs::read_to_string(tree.path().join(BATCHES_VM)).unwrap();

    assert_eq!(attachments_once, attachments_twice);
    assert_eq!(batches_once, batches_twice);
}

#[test]
fn test_region_rebuilds_hand_edited_method() {
    let tree = setup_mock_app_tree();

    // Someone tweaked the old body by hand; the anchors still hold, so the
    // region job replaces the whole method regardless.
    let path = tree.path().join(BATCHES_VM);
    let drifted = fs::read_to_string(&path)
        .unwrap()
        .replace("var window", "var dialog")
        .replace("window.Owner", "dialog.Owner")
        .replace("window.ShowDialog", "dialog.ShowDialog");
    fs::write(&path, drifted).unwrap();

    let set = load_from_path(&job_file()).unwrap();
    let guard = RootGuard::new(tree.path()).unwrap();

    let results = apply_jobs(&set, &guard, None);
    let batches_result = results
        .iter()
        .find(|(id, _)| id == "batches-vm-open-attachments")
        .unwrap();
    assert!(matches!(
        batches_result.1,
        Ok(JobStatus::Patched { .. })
    ));

    let batches = fs::read_to_string(&path).unwrap();
    assert!(batches.contains("_navigation.NavigateTo(attachmentsVm);"));
    assert!(!batches.contains("dialog.ShowDialog"));
}

#[test]
fn test_check_reports_pending_without_writing() {
    let tree = setup_mock_app_tree();
    let set = load_from_path(&job_file()).unwrap();
    let guard = RootGuard::new(tree.path()).unwrap();

    let before_attachments = fs::read_to_string(tree.path().join(ATTACHMENTS_VM)).unwrap();
    let before_batches = fs::read_to_string(tree.path().join(BATCHES_VM)).unwrap();

    for (job_id, result) in check_jobs(&set, &guard, None) {
        match result {
            Ok(JobStatus::Patched { report }) => {
                assert!(!report.wrote, "{}: check must not write", job_id);
                assert!(report.change.is_some(), "{}: check should carry the proposed change", job_id);
            }
            other => panic!("{}: expected a pending patch, got {:?}", job_id, other),
        }
    }

    assert_eq!(
        before_attachments,
        fs::read_to_string(tree.path().join(ATTACHMENTS_VM)).unwrap()
    );
    assert_eq!(
        before_batches,
        fs::read_to_string(tree.path().join(BATCHES_VM)).unwrap()
    );
}
