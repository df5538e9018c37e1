//! Error handling for rqurl.

use thiserror::Error;

/// Coarse classification of an [`Error`], used by callers that only care
/// about what kind of failure happened (exit codes, reporting).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Duplicate command keyword or flag label at startup.
    RegistrationConflict,
    /// Unknown flag, missing flag value or unknown command keyword.
    ParseError,
    /// Missing mandatory flag, malformed `key=value`, unexpected flag key.
    ValidationError,
    NotFound,
    AlreadyExists,
    ProtectedResource,
    UnknownVariable,
    TransportError,
    Storage,
    Config,
}

/// The main error type for rqurl operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("the command keyword '{keyword}' has already been registered by another command")]
    DuplicateCommand { keyword: String },

    #[error("flag '{label}' is ill formatted, all flags must start with a dash '-'")]
    MalformedFlag { label: String },

    #[error(
        "a flag with the label '{label}' already exists and means '{existing}', not '{requested}'"
    )]
    ConflictingFlagMeaning {
        label: String,
        existing: String,
        requested: String,
    },

    #[error("the flag {0} has not been registered by any command")]
    UnknownFlag(String),

    #[error("the flag {0} has no value, all flags must be provided a value")]
    MissingFlagValue(String),

    #[error("no registered command answers to '{0}', use `rqurl help` to list the commands")]
    UnknownCommand(String),

    #[error("{0}")]
    Validation(String),

    #[error("the query does not have a name")]
    MissingName,

    #[error("no {entity} named {name} exists")]
    NotFound { entity: &'static str, name: String },

    #[error("a {entity} named {name} already exists")]
    AlreadyExists { entity: &'static str, name: String },

    #[error("the {0} environment cannot be deleted")]
    ProtectedEnvironment(String),

    #[error("unknown variable {0}")]
    UnknownVariable(String),

    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a [`Error::Validation`] built from anything printable.
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DuplicateCommand { .. }
            | Error::MalformedFlag { .. }
            | Error::ConflictingFlagMeaning { .. } => ErrorKind::RegistrationConflict,
            Error::UnknownFlag(_) | Error::MissingFlagValue(_) | Error::UnknownCommand(_) => {
                ErrorKind::ParseError
            }
            Error::Validation(_) | Error::MissingName | Error::InvalidUrl { .. } => {
                ErrorKind::ValidationError
            }
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Error::ProtectedEnvironment(_) => ErrorKind::ProtectedResource,
            Error::UnknownVariable(_) => ErrorKind::UnknownVariable,
            Error::Transport { .. } => ErrorKind::TransportError,
            Error::Storage(_) | Error::Json(_) | Error::Io(_) => ErrorKind::Storage,
            Error::Config(_) => ErrorKind::Config,
        }
    }
}

/// A Result type alias for rqurl operations.
pub type Result<T> = std::result::Result<T, Error>;
