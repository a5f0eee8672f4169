//! Deadline arithmetic shared by the two periodic tasks.

use embassy_time::{Duration, Instant};

/// Advance a task deadline by one period.
///
/// If the caller has fallen more than two periods behind, the schedule is
/// reset to `now` instead of bursting to catch up. Returns the new deadline
/// and how long to wait for it (zero if still behind).
pub(crate) fn advance_deadline(
    deadline: &mut Instant,
    period: Duration,
    now: Instant,
) -> (Instant, Duration) {
    let max_drift_ms = period.as_millis() * 2;
    if now.as_millis() > deadline.as_millis() + max_drift_ms {
        *deadline = now;
    }
    *deadline += period;

    let sleep_duration = if deadline.as_millis() > now.as_millis() {
        Duration::from_millis(deadline.as_millis() - now.as_millis())
    } else {
        Duration::from_millis(0)
    };

    (*deadline, sleep_duration)
}
