//! Per-caller usage quota ledger.
//!
//! The ledger is an explicitly injected store, never process-wide mutable
//! state. Counters roll over when the caller's date advances past the
//! last reset: daily on a date change, monthly on a month change.
//!
//! ## Reservation protocol
//!
//! The check-then-increment sequence must be atomic per caller, or two
//! concurrent requests can both pass a check that only one unit of quota
//! permits. The ledger therefore exposes a three-step protocol:
//!
//! 1. [`QuotaLedger::check_and_reserve`]: atomically take one unit if
//!    the caller has headroom in both periods
//! 2. [`QuotaLedger::commit`]: convert the reservation into used quota
//!    after a completed analysis
//! 3. [`QuotaLedger::release`]: return the reservation when the
//!    analysis fails (failed requests consume no quota)
//!
//! Contention is scoped to one caller: each caller's counter sits behind
//! its own lock, so concurrent requests from different callers never
//! serialize against each other.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Subscription plan determining usage limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Pro,
    Enterprise,
}

impl Plan {
    /// Per-period limits for this plan. `None` means unlimited.
    pub fn limits(&self) -> PlanLimits {
        match self {
            Plan::Free => PlanLimits {
                daily: Some(10),
                monthly: Some(300),
            },
            Plan::Pro => PlanLimits {
                daily: Some(1000),
                monthly: Some(30_000),
            },
            Plan::Enterprise => PlanLimits {
                daily: None,
                monthly: None,
            },
        }
    }
}

impl Default for Plan {
    fn default() -> Self {
        Plan::Free
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plan::Free => f.write_str("free"),
            Plan::Pro => f.write_str("pro"),
            Plan::Enterprise => f.write_str("enterprise"),
        }
    }
}

/// Usage limits for one plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub daily: Option<u32>,
    pub monthly: Option<u32>,
}

/// Which quota period was exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaScope {
    Daily,
    Monthly,
}

impl fmt::Display for QuotaScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotaScope::Daily => f.write_str("daily"),
            QuotaScope::Monthly => f.write_str("monthly"),
        }
    }
}

/// Errors from the quota ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuotaError {
    /// The caller has no remaining allowance for the period.
    ///
    /// Non-retryable until the period rolls over; callers should be
    /// directed to upgrade rather than retry.
    #[error("{scope} quota exceeded on {plan} plan")]
    Exceeded { plan: Plan, scope: QuotaScope },
}

/// Usage for one period, as exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodUsage {
    pub used: u32,
    pub limit: Option<u32>,
}

/// A caller's current usage surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub daily: PeriodUsage,
    pub monthly: PeriodUsage,
    pub plan: Plan,
}

/// Per-caller counter state. Guarded by the caller's own lock.
#[derive(Debug)]
struct CounterState {
    plan: Plan,
    daily_used: u32,
    monthly_used: u32,
    daily_reserved: u32,
    monthly_reserved: u32,
    last_reset: NaiveDate,
}

impl CounterState {
    fn new(plan: Plan, today: NaiveDate) -> Self {
        Self {
            plan,
            daily_used: 0,
            monthly_used: 0,
            daily_reserved: 0,
            monthly_reserved: 0,
            last_reset: today,
        }
    }

    /// Apply period rollovers. In-flight reservations survive a rollover.
    fn roll_over(&mut self, today: NaiveDate) {
        if today == self.last_reset {
            return;
        }
        self.daily_used = 0;
        if (today.year(), today.month()) != (self.last_reset.year(), self.last_reset.month()) {
            self.monthly_used = 0;
        }
        self.last_reset = today;
    }
}

/// Atomic per-caller usage ledger with plan-based limits.
pub struct QuotaLedger {
    default_plan: Plan,
    // Outer lock covers only entry lookup/insert; each caller's counter
    // has its own lock so contention stays scoped to that caller.
    entries: Mutex<HashMap<String, Arc<Mutex<CounterState>>>>,
}

impl QuotaLedger {
    /// Create a ledger assigning `default_plan` to unknown callers.
    pub fn new(default_plan: Plan) -> Self {
        Self {
            default_plan,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Assign a plan to a caller, keeping any accumulated usage.
    pub fn set_plan(&self, caller: &str, plan: Plan) {
        let entry = self.entry(caller);
        entry.lock().plan = plan;
    }

    /// Atomically reserve one unit of quota for a caller.
    pub fn check_and_reserve(&self, caller: &str) -> Result<(), QuotaError> {
        self.check_and_reserve_on(caller, today())
    }

    /// Convert a reservation into used quota.
    pub fn commit(&self, caller: &str) {
        self.commit_on(caller, today());
    }

    /// Return a reservation without consuming quota.
    pub fn release(&self, caller: &str) {
        let entry = self.entry(caller);
        let mut state = entry.lock();
        state.daily_reserved = state.daily_reserved.saturating_sub(1);
        state.monthly_reserved = state.monthly_reserved.saturating_sub(1);
    }

    /// Current usage surface for a caller.
    pub fn usage(&self, caller: &str) -> UsageSummary {
        self.usage_on(caller, today())
    }

    fn entry(&self, caller: &str) -> Arc<Mutex<CounterState>> {
        let mut entries = self.entries.lock();
        Arc::clone(entries.entry(caller.to_string()).or_insert_with(|| {
            Arc::new(Mutex::new(CounterState::new(self.default_plan, today())))
        }))
    }

    fn check_and_reserve_on(&self, caller: &str, today: NaiveDate) -> Result<(), QuotaError> {
        let entry = self.entry(caller);
        let mut state = entry.lock();
        state.roll_over(today);

        let limits = state.plan.limits();

        if let Some(limit) = limits.daily {
            if state.daily_used + state.daily_reserved >= limit {
                return Err(QuotaError::Exceeded {
                    plan: state.plan,
                    scope: QuotaScope::Daily,
                });
            }
        }
        if let Some(limit) = limits.monthly {
            if state.monthly_used + state.monthly_reserved >= limit {
                return Err(QuotaError::Exceeded {
                    plan: state.plan,
                    scope: QuotaScope::Monthly,
                });
            }
        }

        state.daily_reserved += 1;
        state.monthly_reserved += 1;
        Ok(())
    }

    fn commit_on(&self, caller: &str, today: NaiveDate) {
        let entry = self.entry(caller);
        let mut state = entry.lock();
        state.roll_over(today);
        state.daily_reserved = state.daily_reserved.saturating_sub(1);
        state.monthly_reserved = state.monthly_reserved.saturating_sub(1);
        state.daily_used += 1;
        state.monthly_used += 1;
    }

    fn usage_on(&self, caller: &str, today: NaiveDate) -> UsageSummary {
        let entry = self.entry(caller);
        let mut state = entry.lock();
        state.roll_over(today);

        let limits = state.plan.limits();
        UsageSummary {
            daily: PeriodUsage {
                used: state.daily_used,
                limit: limits.daily,
            },
            monthly: PeriodUsage {
                used: state.monthly_used,
                limit: limits.monthly,
            },
            plan: state.plan,
        }
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}
