use chrono::{Months, NaiveDate};

/// Run-start date minus the retention window. Computed once per run and
/// threaded through classification so a long run never shifts its own cutoff.
pub fn cutoff_date(today: NaiveDate, retention_months: u32) -> Option<NaiveDate> {
    today.checked_sub_months(Months::new(retention_months))
}

/// Eligible iff the resolved date falls strictly before the cutoff. A file
/// dated exactly at the cutoff is kept.
pub fn is_eligible(resolved: NaiveDate, cutoff: NaiveDate) -> bool {
    resolved < cutoff
}
