// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod admin;
pub mod aggregator;
pub mod backend;
pub mod entitlement;
pub mod image;
pub mod session;

pub use admin::AdminClient;
pub use aggregator::{merge_history, normalize, FortunePayload};
pub use backend::FortuneClient;
pub use entitlement::{can_use_free, record_usage, UsageGrant};
pub use image::ImageKind;
pub use session::{
    AppStats, Credentials, ServiceOutcome, ServiceRequest, SessionController, SessionState,
    SignupForm,
};
