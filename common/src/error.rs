//! Error types shared by the domain layer

use thiserror::Error;

/// Common error type
#[derive(Error, Debug)]
pub enum Error {
    /// Required draft fields are missing or invalid. Nothing was mutated.
    #[error("Compila i campi obbligatori: {}", missing.join(", "))]
    Validation { missing: Vec<String> },

    /// An operation referenced a record id that is not in the session.
    #[error("Record non trovato: {0}")]
    NotFound(u64),

    #[error("Nessun backup disponibile")]
    NoBackup,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Export error: {0}")]
    Export(String),
}

impl Error {
    pub fn validation<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Error::Validation {
            missing: fields.into_iter().map(Into::into).collect(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_lists_fields() {
        let error = Error::validation(["storeChain", "itemName"]);
        let display = format!("{}", error);
        assert!(display.contains("storeChain"));
        assert!(display.contains("itemName"));
        assert!(matches!(error, Error::Validation { ref missing } if missing.len() == 2));
    }

    #[test]
    fn test_not_found_display() {
        let error = Error::NotFound(1700000000000);
        assert_eq!(format!("{}", error), "Record non trovato: 1700000000000");
    }

    #[test]
    fn test_error_from_io() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let error: Error = io_error.into();
        assert!(matches!(error, Error::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: Error = json_error.into();
        assert!(matches!(error, Error::Json(_)));
    }
}
