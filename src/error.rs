use std::{fmt, io, path::StripPrefixError};

use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;
use url::ParseError as UrlParseError;
use zip::result::ZipError;

use crate::validation::ValidationResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum IcddError {
    #[error("Archive error: {0}")]
    Archive(String),
    #[error("Container is invalid: {} failed criteria", .0.len())]
    InvalidContainer(Vec<ValidationResult>),
    #[error("External tool unavailable: {0}")]
    ExternalToolUnavailable(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("Resource is locked: {0}")]
    Locked(String),
    #[error("Malformed graph: {0}")]
    MalformedGraph(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("You do not have permission to access this resource")]
    PermissionDenied,
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
}

impl IcddError {
    /// Failures that indicate a caller bug rather than bad data on disk.
    pub fn is_programmer_error(&self) -> bool {
        matches!(
            self,
            IcddError::InvalidArgument(_) | IcddError::InvalidIdentifier(_)
        )
    }
}

impl From<StripPrefixError> for IcddError {
    fn from(src: StripPrefixError) -> IcddError {
        IcddError::NotFound(format!("Strip prefix failed for path. Error: {src}"))
    }
}

impl From<toml::de::Error> for IcddError {
    fn from(src: toml::de::Error) -> IcddError {
        IcddError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for IcddError {
    fn from(src: toml::ser::Error) -> IcddError {
        IcddError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<toml_edit::TomlError> for IcddError {
    fn from(src: toml_edit::TomlError) -> IcddError {
        IcddError::Serialization(format!("Toml document error: {src}"))
    }
}

impl From<JsonError> for IcddError {
    fn from(src: JsonError) -> IcddError {
        IcddError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<uuid::Error> for IcddError {
    fn from(src: uuid::Error) -> IcddError {
        IcddError::Serialization(format!("UUID conversion failed: {src}"))
    }
}

impl From<UrlParseError> for IcddError {
    fn from(src: UrlParseError) -> IcddError {
        IcddError::InvalidIdentifier(format!("Invalid URL: {src}"))
    }
}

impl From<ZipError> for IcddError {
    fn from(src: ZipError) -> IcddError {
        match src {
            ZipError::Io(err) => IcddError::from(err),
            ZipError::FileNotFound => IcddError::NotFound("file not found in archive".to_string()),
            other => IcddError::Archive(format!("{other}")),
        }
    }
}

impl From<walkdir::Error> for IcddError {
    fn from(src: walkdir::Error) -> IcddError {
        match src.into_io_error() {
            Some(err) => IcddError::from(err),
            None => IcddError::Io("directory walk hit a filesystem loop".to_string()),
        }
    }
}

impl From<io::Error> for IcddError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => IcddError::NotFound(format!("{x}")),
            io::ErrorKind::PermissionDenied => IcddError::PermissionDenied,
            _ => IcddError::Io(format!("IOError: {}: {x}", x.kind())),
        }
    }
}

impl From<fmt::Error> for IcddError {
    fn from(x: fmt::Error) -> Self {
        IcddError::Serialization(format!("{x}"))
    }
}
