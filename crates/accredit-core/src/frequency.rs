//! Attestation expiry by frequency.
//!
//! Offsets are fixed day counts rather than calendar arithmetic: a monthly
//! attestation is valid for 30 days, a quarterly one for 90, an annual one
//! for 365. The drift against the calendar is accepted.

use chrono::{Days, NaiveDate};

use accredit_contracts::indicator::Frequency;

/// Validity period in days, or `None` for attestations that never expire.
pub fn offset_days(frequency: Frequency) -> Option<u64> {
    match frequency {
        Frequency::OneTime => None,
        Frequency::Daily => Some(1),
        Frequency::Weekly => Some(7),
        Frequency::Monthly => Some(30),
        Frequency::Quarterly => Some(90),
        Frequency::Annually => Some(365),
    }
}

/// The date an attestation made on `compliant_on` stops being valid.
pub fn expiry(frequency: Frequency, compliant_on: NaiveDate) -> Option<NaiveDate> {
    let days = offset_days(frequency)?;
    // Saturate at the calendar limit instead of failing.
    Some(
        compliant_on
            .checked_add_days(Days::new(days))
            .unwrap_or(NaiveDate::MAX),
    )
}
