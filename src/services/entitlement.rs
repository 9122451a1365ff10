// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-service, per-day free-usage accounting.
//!
//! Every completed invocation is either free or paid, never both. A service
//! is free at most once per calendar day; the second invocation of the same
//! service on the same day always routes to the paid path. Callers must
//! invoke [`record_usage`] from a single mutation point (the session
//! controller holds its lock across the call) so two racing invocations
//! cannot both observe an unused flag.

use chrono::NaiveDate;

use crate::models::{DailyFreeLedger, ServiceKind, User};

/// Routing decision for a completed service invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageGrant {
    /// Today's free allowance for this service was available and is now spent.
    Free,
    /// Allowance already spent today; the result must go through payment.
    Paid,
}

/// Whether `kind` can still be used for free on `today`.
///
/// A ledger dated before `today` counts as all-unused for this check; the
/// persisted rollover happens in [`record_usage`].
pub fn can_use_free(user: &User, kind: ServiceKind, today: NaiveDate) -> bool {
    if user.daily_free.date != today {
        return true;
    }
    !user.daily_free.used(kind)
}

/// Record a completed invocation of `kind` on `today`.
///
/// Always increments the lifetime usage counter. Rolls the ledger over when
/// its stored date is stale, then grants the free path iff the flag for
/// `kind` was still unset.
pub fn record_usage(user: &mut User, kind: ServiceKind, today: NaiveDate) -> UsageGrant {
    user.usage.increment(kind);

    if user.daily_free.date != today {
        user.daily_free = DailyFreeLedger::fresh(today);
    }

    if user.daily_free.used(kind) {
        UsageGrant::Paid
    } else {
        user.daily_free.mark_used(kind);
        UsageGrant::Free
    }
}
