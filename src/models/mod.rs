//! Data models for the session core.

pub mod result;
pub mod user;

pub use result::{FortuneResult, ServiceKind};
pub use user::{BirthProfile, DailyFreeLedger, LoginProvider, UsageCounts, User};
