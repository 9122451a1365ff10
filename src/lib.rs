// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fortune K.I client core: session lifecycle, entitlement accounting and
//! fortune-result normalization for the consumer app.
//!
//! This crate is the canonical implementation of the logic the UI shells
//! share: credential login against the REST backend, durable bearer-token
//! storage, the per-service daily free-usage ledger, and conversion of the
//! four backend fortune payload shapes into one display representation.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{ApiError, Result};
pub use services::session::{ServiceOutcome, SessionController, SessionState};
pub use store::{TokenPair, TokenStore};
