use seclog_audit_tools::audit::error::SetupError;
use seclog_audit_tools::audit::types::AuditMode;
use seclog_audit_tools::commands::audit_run::{execute, RunOptions, SourceSelection};
use seclog_audit_tools::commands::{auth_audit, lifecycle_audit};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn live_log(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("Security.jsonl");
    fs::write(
        &path,
        "{\"EventID\":4768,\"TimeCreated\":\"2025-10-02T08:00:00Z\",\"EventData\":{\"TargetUserName\":\"alice\"}}\n",
    )
    .unwrap();
    path
}

fn options(dir: &TempDir) -> RunOptions {
    RunOptions {
        start: "2025-10-01".to_string(),
        end: "2025-10-31".to_string(),
        live: Some(live_log(dir.path())),
        output_dir: dir.path().join("out"),
        ..RunOptions::default()
    }
}

fn setup_error(result: anyhow::Result<impl std::fmt::Debug>) -> SetupError {
    result
        .unwrap_err()
        .downcast::<SetupError>()
        .expect("expected a setup error")
}

#[test]
fn test_reversed_range_fails_before_any_output() {
    let dir = TempDir::new().unwrap();
    let opts = RunOptions {
        start: "2025-11-01".to_string(),
        end: "2025-10-01".to_string(),
        ..options(&dir)
    };

    let err = setup_error(execute(AuditMode::Authentication, &opts));
    assert!(matches!(err, SetupError::InvalidRange { .. }));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_same_day_range_is_valid() {
    let dir = TempDir::new().unwrap();
    let opts = RunOptions {
        start: "2025-10-02".to_string(),
        end: "2025-10-02".to_string(),
        ..options(&dir)
    };

    let report = execute(AuditMode::Authentication, &opts).unwrap();
    assert_eq!(report.total_rows(), 1);
}

#[test]
fn test_malformed_date() {
    let dir = TempDir::new().unwrap();
    let opts = RunOptions {
        start: "10/01/2025".to_string(),
        ..options(&dir)
    };

    let err = setup_error(execute(AuditMode::Authentication, &opts));
    assert!(matches!(err, SetupError::InvalidDate { .. }));
}

#[test]
fn test_unreadable_account_file() {
    let dir = TempDir::new().unwrap();
    let opts = RunOptions {
        accounts_file: Some(dir.path().join("missing.txt")),
        ..options(&dir)
    };

    let err = setup_error(execute(AuditMode::Authentication, &opts));
    assert!(matches!(err, SetupError::AccountListUnreadable { .. }));
}

#[test]
fn test_blank_account_list() {
    let dir = TempDir::new().unwrap();
    let opts = RunOptions {
        accounts: vec![String::new(), "  ".to_string()],
        ..options(&dir)
    };

    let err = setup_error(execute(AuditMode::Authentication, &opts));
    assert!(matches!(err, SetupError::EmptyAccountList));
}

#[test]
fn test_lifecycle_kind_in_auth_mode() {
    let dir = TempDir::new().unwrap();
    let opts = RunOptions {
        kinds: vec![4768, 4726],
        ..options(&dir)
    };

    let err = setup_error(execute(AuditMode::Authentication, &opts));
    assert!(matches!(err, SetupError::KindModeMismatch { id: 4726, .. }));
}

#[test]
fn test_missing_live_file() {
    let dir = TempDir::new().unwrap();
    let opts = RunOptions {
        live: Some(dir.path().join("nope.jsonl")),
        sources: SourceSelection::Live,
        ..options(&dir)
    };

    let err = setup_error(execute(AuditMode::Lifecycle, &opts));
    assert!(matches!(err, SetupError::LiveSourceMissing { .. }));
}

#[test]
fn test_missing_archive_dir() {
    let dir = TempDir::new().unwrap();
    let opts = RunOptions {
        archive_dir: Some(dir.path().join("archives")),
        ..options(&dir)
    };

    let err = setup_error(execute(AuditMode::Authentication, &opts));
    assert!(matches!(err, SetupError::ArchiveDirMissing { .. }));
}

#[test]
fn test_archives_selected_without_directory() {
    let dir = TempDir::new().unwrap();
    let opts = RunOptions {
        sources: SourceSelection::Archives,
        ..options(&dir)
    };

    let err = setup_error(execute(AuditMode::Authentication, &opts));
    assert!(matches!(err, SetupError::NoSourceSelected { .. }));
}

#[test]
fn test_commands_run_end_to_end() {
    let dir = TempDir::new().unwrap();
    let opts = RunOptions {
        summary: true,
        consolidated: true,
        ..options(&dir)
    };

    assert!(auth_audit::run(&opts).is_ok());
    assert!(lifecycle_audit::run(&opts).is_ok());

    let names: Vec<String> = fs::read_dir(dir.path().join("out"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert!(names.iter().any(|n| n.starts_with("auth_Live_")));
    assert!(names.iter().any(|n| n.starts_with("auth_summary_")));
    assert!(names.iter().any(|n| n.starts_with("lifecycle_consolidated_")));
    assert!(!names.iter().any(|n| n.starts_with("lifecycle_summary_")));
}
