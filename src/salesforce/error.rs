//! Transport errors

use thiserror::Error;

/// Errors that can occur when talking to Salesforce
#[derive(Error, Debug)]
pub enum SalesforceError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Salesforce credentials not configured: {0}")]
    NotConfigured(String),
}

pub type SalesforceResult<T> = Result<T, SalesforceError>;
