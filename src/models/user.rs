//! Session user model: identity, birth profile and usage accounting.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::models::result::{FortuneResult, ServiceKind};

/// Identity provider used at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginProvider {
    Email,
    Kakao,
    Google,
}

/// Birth date/time used as input to fortune computations.
///
/// A user who does not know their birth time gets the noon sentinel; the
/// field is never left blank once a profile is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BirthProfile {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl BirthProfile {
    /// Build a profile, normalizing an unknown time to 12:00.
    pub fn new(date: NaiveDate, time: Option<NaiveTime>) -> Self {
        Self {
            date,
            time: time.unwrap_or_else(|| NaiveTime::from_hms_opt(12, 0, 0).unwrap()),
        }
    }
}

/// Lifetime usage counters, one per service. Monotonically non-decreasing;
/// incremented exactly once per completed invocation, free or paid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounts {
    pub face_reading: u32,
    pub life_fortune: u32,
    pub daily_fortune: u32,
    pub dream: u32,
}

impl UsageCounts {
    pub fn get(&self, kind: ServiceKind) -> u32 {
        match kind {
            ServiceKind::FaceReading => self.face_reading,
            ServiceKind::LifeFortune => self.life_fortune,
            ServiceKind::DailyFortune => self.daily_fortune,
            ServiceKind::Dream => self.dream,
        }
    }

    pub fn increment(&mut self, kind: ServiceKind) {
        match kind {
            ServiceKind::FaceReading => self.face_reading += 1,
            ServiceKind::LifeFortune => self.life_fortune += 1,
            ServiceKind::DailyFortune => self.daily_fortune += 1,
            ServiceKind::Dream => self.dream += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.face_reading + self.life_fortune + self.daily_fortune + self.dream
    }
}

/// Per-day free-tier ledger: one flag per service, scoped to `date`.
///
/// A ledger whose date is not today counts as all-unused; the rollover is
/// persisted the next time usage is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyFreeLedger {
    pub date: NaiveDate,
    pub face_reading: bool,
    pub life_fortune: bool,
    pub daily_fortune: bool,
    pub dream: bool,
}

impl DailyFreeLedger {
    /// All-unused ledger for `date`.
    pub fn fresh(date: NaiveDate) -> Self {
        Self {
            date,
            face_reading: false,
            life_fortune: false,
            daily_fortune: false,
            dream: false,
        }
    }

    pub fn used(&self, kind: ServiceKind) -> bool {
        match kind {
            ServiceKind::FaceReading => self.face_reading,
            ServiceKind::LifeFortune => self.life_fortune,
            ServiceKind::DailyFortune => self.daily_fortune,
            ServiceKind::Dream => self.dream,
        }
    }

    pub fn mark_used(&mut self, kind: ServiceKind) {
        match kind {
            ServiceKind::FaceReading => self.face_reading = true,
            ServiceKind::LifeFortune => self.life_fortune = true,
            ServiceKind::DailyFortune => self.daily_fortune = true,
            ServiceKind::Dream => self.dream = true,
        }
    }

    /// Free slots still available on `today`.
    pub fn remaining(&self, today: NaiveDate) -> u32 {
        if self.date != today {
            return ServiceKind::ALL.len() as u32;
        }
        ServiceKind::ALL
            .iter()
            .filter(|kind| !self.used(**kind))
            .count() as u32
    }
}

/// The authenticated user owned by the current session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    /// Resolved display name; never the raw email local-part
    pub display_name: String,
    pub email: String,
    pub provider: LoginProvider,
    pub birth: Option<BirthProfile>,
    pub is_premium: bool,
    pub premium_expiry: Option<String>,
    pub usage: UsageCounts,
    pub daily_free: DailyFreeLedger,
    /// Session-local result history, append-only; hydrated history merges in
    pub results: Vec<FortuneResult>,
}

impl User {
    pub fn new(
        id: String,
        display_name: String,
        email: String,
        provider: LoginProvider,
        birth: Option<BirthProfile>,
        today: NaiveDate,
    ) -> Self {
        Self {
            id,
            display_name,
            email,
            provider,
            birth,
            is_premium: false,
            premium_expiry: None,
            usage: UsageCounts::default(),
            daily_free: DailyFreeLedger::fresh(today),
            results: Vec::new(),
        }
    }
}
