//! Grant-Window Policy
//!
//! The one piece of arithmetic this system owns: how long an entitlement
//! grant lasts for a given purchase. All durations live in a single policy
//! table so the grant, renewal, and conversion flows cannot drift apart.
//!
//! - Monthly subscriptions and multi-pay installments: 30 days + 5 grace.
//! - Annual subscriptions: 365 days + 5 grace.
//! - One-time purchases: 100 years, the lifetime-access convention.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{BillingPeriod, PurchaseKind};

/// Days granted per monthly billing cycle (30 + 5-day grace)
pub const MONTHLY_GRANT_DAYS: i64 = 35;

/// Days granted per annual billing cycle (365 + 5-day grace)
pub const ANNUAL_GRANT_DAYS: i64 = 370;

/// Days granted for lifetime access (100 years)
pub const LIFETIME_GRANT_DAYS: i64 = 36_500;

/// A half-open validity window `[start, end)` for an entitlement grant
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl GrantWindow {
    pub fn from_start(start: DateTime<Utc>, days: i64) -> Self {
        Self {
            start,
            end: start + Duration::days(days),
        }
    }

    /// Start as Unix milliseconds, the entitlement backend's wire format
    pub fn start_ms(&self) -> i64 {
        self.start.timestamp_millis()
    }

    /// End as Unix milliseconds
    pub fn end_ms(&self) -> i64 {
        self.end.timestamp_millis()
    }
}

fn period_days(period: BillingPeriod) -> i64 {
    match period {
        BillingPeriod::Monthly => MONTHLY_GRANT_DAYS,
        BillingPeriod::Annual => ANNUAL_GRANT_DAYS,
    }
}

/// Days granted for an initial purchase of the given kind
fn grant_days(kind: PurchaseKind, period: BillingPeriod) -> i64 {
    match kind {
        PurchaseKind::OneTime => LIFETIME_GRANT_DAYS,
        // Each installment buys one monthly cycle; the renewal workflow
        // issues the next grant on each successful charge.
        PurchaseKind::MultiPay => MONTHLY_GRANT_DAYS,
        PurchaseKind::Subscription => period_days(period),
    }
}

/// Window for an initial grant starting at `now`
pub fn grant_window(kind: PurchaseKind, period: BillingPeriod, now: DateTime<Utc>) -> GrantWindow {
    GrantWindow::from_start(now, grant_days(kind, period))
}

/// Where a renewal window starts.
///
/// Extends from the previous expiry when it is still in the future, so
/// consecutive grants stay contiguous without double-counting an active
/// grace period. An expired or absent entitlement starts from `now`.
pub fn renewal_start(now: DateTime<Utc>, previous_expiry: Option<DateTime<Utc>>) -> DateTime<Utc> {
    match previous_expiry {
        Some(expiry) if expiry > now => expiry,
        _ => now,
    }
}

/// Window for a renewal grant
pub fn renewal_window(
    period: BillingPeriod,
    now: DateTime<Utc>,
    previous_expiry: Option<DateTime<Utc>>,
) -> GrantWindow {
    GrantWindow::from_start(renewal_start(now, previous_expiry), period_days(period))
}

/// Window for a multi-pay-to-lifetime conversion starting at `now`
pub fn lifetime_window(now: DateTime<Utc>) -> GrantWindow {
    GrantWindow::from_start(now, LIFETIME_GRANT_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn test_monthly_window_is_35_days() {
        let now = at("2026-01-01T00:00:00Z");
        let w = grant_window(PurchaseKind::Subscription, BillingPeriod::Monthly, now);
        assert_eq!(w.start, now);
        assert_eq!(w.end - w.start, Duration::days(35));
    }

    #[test]
    fn test_annual_window_is_370_days() {
        let now = at("2026-01-01T00:00:00Z");
        let w = grant_window(PurchaseKind::Subscription, BillingPeriod::Annual, now);
        assert_eq!(w.end - w.start, Duration::days(370));
    }

    #[test]
    fn test_one_time_window_is_100_years() {
        let now = at("2026-01-01T00:00:00Z");
        let w = grant_window(PurchaseKind::OneTime, BillingPeriod::Monthly, now);
        assert_eq!(w.end - w.start, Duration::days(36_500));
    }

    #[test]
    fn test_multi_pay_installment_gets_monthly_window() {
        let now = at("2026-01-01T00:00:00Z");
        // Period on the payload is ignored for installments
        let w = grant_window(PurchaseKind::MultiPay, BillingPeriod::Annual, now);
        assert_eq!(w.end - w.start, Duration::days(35));
    }

    #[test]
    fn test_renewal_extends_from_unexpired_expiry() {
        let now = at("2026-01-01T00:00:00Z");
        let expiry = at("2026-01-10T00:00:00Z");
        let w = renewal_window(BillingPeriod::Monthly, now, Some(expiry));
        assert_eq!(w.start, expiry);
        assert_eq!(w.end, expiry + Duration::days(35));
    }

    #[test]
    fn test_renewal_from_now_when_expired() {
        let now = at("2026-01-01T00:00:00Z");
        let expiry = at("2025-12-01T00:00:00Z");
        assert_eq!(renewal_start(now, Some(expiry)), now);
    }

    #[test]
    fn test_renewal_from_now_when_absent() {
        let now = at("2026-01-01T00:00:00Z");
        assert_eq!(renewal_start(now, None), now);
    }

    #[test]
    fn test_window_millis() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let w = GrantWindow::from_start(now, 35);
        assert_eq!(w.end_ms() - w.start_ms(), 35 * 24 * 60 * 60 * 1000);
    }
}
