// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client error taxonomy shared across the session and service layers.

/// Error type for every operation the client core performs.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A protected operation was attempted with no stored credential.
    /// Terminal for that operation: the caller must prompt a re-login,
    /// never retry.
    #[error("No stored credential; login required")]
    NoToken,

    /// An authenticated call came back 401/403. The token store has
    /// already been cleared by the time this surfaces.
    #[error("Session expired or revoked; login required")]
    AuthExpired,

    /// Any other non-success response. Not retried automatically.
    /// `status` is absent when the failure happened below HTTP
    /// (connection refused, DNS, ...).
    #[error("Request failed{}: {message}", fmt_status(.status))]
    RequestFailed { status: Option<u16>, message: String },

    /// Client-side input rejected before any network call.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Durable token storage could not be read or written.
    #[error("Token storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {})", code),
        None => String::new(),
    }
}

impl ApiError {
    /// True when the error means the stored session is gone and the user
    /// has to authenticate again.
    pub fn requires_login(&self) -> bool {
        matches!(self, ApiError::NoToken | ApiError::AuthExpired)
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ApiError>;
