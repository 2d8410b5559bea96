/*!
 * Error types for the bookwai application.
 *
 * Each failure class of the translation engine gets its own enum so callers
 * can decide whether a failure is local to one paragraph (generation), should
 * silently degrade (storage), or must abort before any work starts (selector,
 * backup format).
 */

use thiserror::Error;

/// Errors that can occur when talking to the remote generation service
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The service answered but produced no usable text
    #[error("Empty response from model {0}")]
    EmptyResponse(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Map a reqwest failure to the closest provider error
    pub fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors raised by the persistent translation store
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing database could not be reached or a statement failed
    #[error("Translation store unavailable: {0}")]
    Unavailable(String),

    /// A backup row is malformed; nothing has been written
    #[error("Invalid backup row {row}: {message}")]
    ImportFormat {
        /// 1-based data row number (header excluded)
        row: usize,
        /// What was wrong with the row
        message: String,
    },

    /// Reading or writing a backup file failed
    #[error("Backup file error: {0}")]
    Backup(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Unavailable(error.to_string())
    }
}

impl From<anyhow::Error> for StoreError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unavailable(format!("{:#}", error))
    }
}

/// Errors raised while parsing a chapter selector
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SelectorError {
    /// A token is neither an integer nor an inclusive `A-B` range
    #[error("Invalid chapter selector token '{token}': {reason}")]
    Parse {
        /// The offending token
        token: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Errors that can occur during translation of a paragraph
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The model answered with something that cannot stand in for the source
    #[error("Rejected translation: {0}")]
    Rejected(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the translation store
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Error from a chapter selector
    #[error("Selector error: {0}")]
    Selector(#[from] SelectorError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Error from configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
