//! Grace window arithmetic.

use chrono::{DateTime, Duration, TimeZone, Utc};

/// The sweep's view of "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepWindow {
    /// Local midnight, in UTC.
    pub today_start: DateTime<Utc>,
    /// End of the grace window; sweeps before this do nothing.
    pub window_end: DateTime<Utc>,
    /// Whether the grace window has passed.
    pub open: bool,
}

/// Compute the sweep window for a wall-clock time in the deployment's
/// timezone. A check-in counts for today when it is at or after local
/// midnight; nobody is considered missing before
/// `midnight + grace_hours`.
pub fn sweep_window<Tz: TimeZone>(now: DateTime<Tz>, grace_hours: i64) -> SweepWindow {
    let midnight_naive = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time");

    // On DST transitions where midnight is ambiguous or skipped, take
    // the earliest valid instant of the day.
    let today_start = match now.timezone().from_local_datetime(&midnight_naive) {
        chrono::LocalResult::Single(dt) => dt,
        chrono::LocalResult::Ambiguous(earliest, _) => earliest,
        chrono::LocalResult::None => now
            .timezone()
            .from_utc_datetime(&midnight_naive),
    }
    .with_timezone(&Utc);

    let window_end = today_start + Duration::hours(grace_hours);
    let open = now.with_timezone(&Utc) >= window_end;

    SweepWindow {
        today_start,
        window_end,
        open,
    }
}
