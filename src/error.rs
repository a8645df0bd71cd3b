use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum FolioError {
    #[error("catalog store unavailable: {0}")]
    #[diagnostic(help("check the network connection and try again"))]
    StoreUnavailable(String),

    #[error("project not found: {0}")]
    NotFound(String),

    #[error("invalid project input: {0}")]
    Validation(String),

    #[error("malformed project document {id}: {message}")]
    MalformedDocument { id: String, message: String },

    #[error("invalid project id: {0}")]
    InvalidProjectId(String),

    #[error("invalid category filter: {0}")]
    InvalidFilter(String),

    #[error("sign-in failed: {0}")]
    AuthFailed(String),

    #[error("not signed in")]
    #[diagnostic(help("run `folio admin login --email <EMAIL>` first"))]
    NotSignedIn,

    #[error("missing config file folio.json (looked in the current directory and the user config directory)")]
    #[diagnostic(help("pass --config <PATH> or create folio.json"))]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("contact relay request failed: {0}")]
    ContactRelay(String),

    #[error("contact message rejected: {0}")]
    ContactRejected(String),
}
