// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daily token quota for the cloud tier.
//!
//! The tracker keeps an in-memory running total of input plus output tokens
//! for the current UTC day. It emits a `tracing::warn` at 80% of the quota
//! and refuses further calls once the quota is reached. Totals reset when the
//! UTC day changes and do not survive a restart.

use chrono::{Datelike, Utc};
use hachi_core::{HachiError, ProcessingTier};
use tracing::warn;

/// In-memory token usage tracker with an optional daily cap.
#[derive(Debug)]
pub struct UsageQuota {
    /// Tokens used today.
    used_today: u64,
    /// Daily cap (None = unlimited).
    daily_cap: Option<u64>,
    /// Day-of-year for reset detection.
    current_day: u32,
}

impl UsageQuota {
    pub fn new(daily_cap: Option<u64>) -> Self {
        Self {
            used_today: 0,
            daily_cap,
            current_day: Utc::now().ordinal(),
        }
    }

    /// Check whether another call is allowed.
    ///
    /// Returns `HachiError::TierProcessing` once today's usage reached the cap.
    pub fn check(&mut self) -> Result<(), HachiError> {
        self.maybe_reset_daily();

        let Some(cap) = self.daily_cap else {
            return Ok(());
        };
        if self.used_today >= cap {
            return Err(HachiError::processing(
                ProcessingTier::Tier3,
                format!("daily token quota of {cap} reached; resumes at midnight UTC"),
            ));
        }
        if self.used_today.saturating_mul(5) >= cap.saturating_mul(4) {
            warn!(
                used_today = self.used_today,
                daily_cap = cap,
                "approaching daily token quota (80%+)"
            );
        }
        Ok(())
    }

    /// Record tokens consumed by a completed call.
    pub fn record(&mut self, tokens: u64) {
        self.maybe_reset_daily();
        self.used_today = self.used_today.saturating_add(tokens);
    }

    fn maybe_reset_daily(&mut self) {
        let today = Utc::now().ordinal();
        if today != self.current_day {
            self.used_today = 0;
            self.current_day = today;
        }
    }

    /// Tokens used today (for testing/reporting).
    pub fn used_today(&self) -> u64 {
        self.used_today
    }
}
