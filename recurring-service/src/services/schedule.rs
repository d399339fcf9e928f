//! Date arithmetic for recurring invoices.
//!
//! Month-based steps clamp to the last day of the target month, so a
//! template scheduled on the 31st moves to the 28th/29th in February and
//! continues from that day afterwards.

use crate::models::{Frequency, PaymentTerms};
use chrono::{Days, Months, NaiveDate};

/// Due date for an invoice issued on `anchor` under `terms`.
pub fn due_date(terms: PaymentTerms, anchor: NaiveDate) -> Option<NaiveDate> {
    anchor.checked_add_days(Days::new(terms.days()))
}

/// Next scheduled date after `anchor`.
///
/// `anchor` must be the template's previous scheduled date, not the run date;
/// anchoring on the run date would let a late run shift every later cycle.
pub fn next_occurrence(frequency: Frequency, anchor: NaiveDate) -> Option<NaiveDate> {
    match frequency {
        Frequency::Weekly => anchor.checked_add_days(Days::new(7)),
        Frequency::Monthly => anchor.checked_add_months(Months::new(1)),
        Frequency::Quarterly => anchor.checked_add_months(Months::new(3)),
        Frequency::Yearly => anchor.checked_add_months(Months::new(12)),
    }
}
