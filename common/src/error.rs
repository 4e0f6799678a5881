//! Error types

use thiserror::Error;

/// Common error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid transition: cannot {action} a sheet that is {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("Negative input rejected: {field} = {value}")]
    NegativeInput { field: String, value: f64 },

    #[cfg(feature = "excel")]
    #[error("Excel error: {0}")]
    Excel(#[from] rust_xlsxwriter::XlsxError),
}

/// Result alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_io() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error = Error::Io(io_error);
        let display = format!("{}", error);
        assert!(display.contains("IO error"));
        assert!(display.contains("file not found"));
    }

    #[test]
    fn test_error_display_json() {
        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let error = Error::Json(json_error);
        assert!(format!("{}", error).contains("JSON error"));
    }

    #[test]
    fn test_error_display_transition() {
        let error = Error::InvalidTransition {
            action: "restore",
            state: "active",
        };
        assert_eq!(
            format!("{}", error),
            "Invalid transition: cannot restore a sheet that is active"
        );
    }

    #[test]
    fn test_error_display_negative_input() {
        let error = Error::NegativeInput {
            field: "materials[0].quantity".to_string(),
            value: -2.0,
        };
        let display = format!("{}", error);
        assert!(display.contains("materials[0].quantity"));
        assert!(display.contains("-2"));
    }

    #[test]
    fn test_error_from_io() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let error: Error = io_error.into();
        assert!(matches!(error, Error::Io(_)));
    }

    #[test]
    fn test_error_debug() {
        let error = Error::Parse("bad outcome".to_string());
        let debug = format!("{:?}", error);
        assert!(debug.contains("Parse"));
        assert!(debug.contains("bad outcome"));
    }
}
