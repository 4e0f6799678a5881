use estimator_common::PermissionDenied;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EstimatorError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Cost sheet not found: #{0}")]
    SheetNotFound(u64),

    #[error("Cost sheet #{0} is FINAL; reopen it with `estimator finalize {0} --reopen` before editing")]
    SheetFinalized(u64),

    #[error("Permission denied: {0}")]
    PermissionDenied(#[from] PermissionDenied),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Store file is unreadable ({path}): {reason}")]
    StoreCorrupt { path: String, reason: String },

    #[error("Excel import error: {0}")]
    ExcelImport(String),

    #[error("Excel export error: {0}")]
    ExcelExport(String),

    #[error("No workbooks to import in: {0}")]
    NothingToImport(String),

    #[error("{0} is not configured. Set it with `estimator config --set {1}=...` or the {2} environment variable")]
    MissingApiKey(&'static str, &'static str, &'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} API error: {reason}")]
    Api { service: &'static str, reason: String },

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] estimator_common::Error),
}

pub type Result<T> = std::result::Result<T, EstimatorError>;
