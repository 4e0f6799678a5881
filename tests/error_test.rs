//! Error cases at the crate boundary

use awning_estimator::config::Settings;
use awning_estimator::error::EstimatorError;
use awning_estimator::import::{collect_workbooks, import_workbook};
use estimator_common::{Capability, Role};
use std::path::Path;
use tempfile::tempdir;

#[test]
fn test_import_nonexistent_file() {
    let result = import_workbook(Path::new("/nonexistent/path/job.xlsx"));
    assert!(matches!(result, Err(EstimatorError::FileNotFound(_))));
}

#[test]
fn test_import_folder_not_found() {
    let result = collect_workbooks(Path::new("/nonexistent/path/12345"));
    assert!(matches!(result, Err(EstimatorError::FileNotFound(_))));
}

#[test]
fn test_malformed_settings_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "{ broken").unwrap();
    assert!(matches!(Settings::load_from(&path), Err(EstimatorError::JsonParse(_))));
}

#[test]
fn test_permission_denied_message() {
    let err: EstimatorError = Role::Viewer.require(Capability::CreateSheets).unwrap_err().into();
    assert_eq!(err.to_string(), "Permission denied: role 'viewer' may not create sheets");
}

#[test]
fn test_finalized_message_tells_how_to_reopen() {
    let msg = EstimatorError::SheetFinalized(12).to_string();
    assert!(msg.contains("#12"));
    assert!(msg.contains("--reopen"));
}

#[test]
fn test_missing_api_key_message() {
    let msg = EstimatorError::MissingApiKey("HubSpot access token", "hubspotAccessToken", "HUBSPOT_ACCESS_TOKEN")
        .to_string();
    assert!(msg.contains("hubspotAccessToken"));
    assert!(msg.contains("HUBSPOT_ACCESS_TOKEN"));
}
