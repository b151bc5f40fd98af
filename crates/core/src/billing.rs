//! Billing calendar rules.

use chrono::{FixedOffset, Months, NaiveDate, Utc};

use crate::catalog::BillingFrequency;

/// Date of the next payment for a subscription starting on `start`.
///
/// One month later for monthly plans, twelve for annual plans. Month
/// arithmetic clamps to the end of shorter months (Jan 31 → Feb 28).
/// Returns `None` only when the result would overflow the calendar.
#[must_use]
pub fn next_payment_due_date(start: NaiveDate, frequency: BillingFrequency) -> Option<NaiveDate> {
    start.checked_add_months(Months::new(frequency.months()))
}

/// Today's date as seen from a UTC offset.
#[must_use]
pub fn today_at(offset: FixedOffset) -> NaiveDate {
    Utc::now().with_timezone(&offset).date_naive()
}

/// Build a fixed offset from whole minutes east of UTC.
///
/// Returns `None` for offsets outside ±24h.
#[must_use]
pub fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    FixedOffset::east_opt(minutes.checked_mul(60)?)
}
