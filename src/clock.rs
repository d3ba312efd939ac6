//! The wall-clock seam the expiry task depends on. Abstracted so that the
//! session-end computation can be driven deterministically in tests instead
//! of waiting on real hours to pass.

use chrono::{DateTime, Duration, Local, NaiveTime, TimeZone};
use std::sync::Mutex;

/// Source of local wall-clock time, with second resolution, sufficient to
/// compute "next occurrence of hour H, local time".
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// Production clock: the actual system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Deterministic test clock. Reports a fixed instant until advanced, so
/// expiry-task tests don't need to sleep through real hours.
#[derive(Debug)]
pub struct FixedClock {
    current: Mutex<DateTime<Local>>,
}

impl FixedClock {
    pub fn new(at: DateTime<Local>) -> Self {
        FixedClock {
            current: Mutex::new(at),
        }
    }

    pub fn advance(&self, delta: Duration) {
        let mut guard = self.current.lock().unwrap();
        *guard += delta;
    }

    pub fn set(&self, at: DateTime<Local>) {
        *self.current.lock().unwrap() = at;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        *self.current.lock().unwrap()
    }
}

/// The small slack added past the exact session-end instant, so that
/// clock-skew-sensitive callers never observe the deadline firing a moment
/// early.
pub const SESSION_END_SLACK_MS: i64 = 100;

/// Next local instant at which the hour component equals `session_end_hour`
/// (minute/second zero), strictly after `now`, plus [`SESSION_END_SLACK_MS`].
/// If `now` is already past that hour today, the instant is tomorrow.
pub fn next_session_end(now: DateTime<Local>, session_end_hour: u32) -> DateTime<Local> {
    let boundary_time = NaiveTime::from_hms_opt(session_end_hour, 0, 0)
        .expect("session_end_hour must be 0..=23");
    let today_boundary = now
        .date_naive()
        .and_time(boundary_time)
        .and_local_timezone(now.timezone())
        .single()
        .unwrap_or(now);
    let boundary = if today_boundary > now {
        today_boundary
    } else {
        let tomorrow = now.date_naive() + Duration::days(1);
        tomorrow
            .and_time(boundary_time)
            .and_local_timezone(now.timezone())
            .single()
            .unwrap_or(today_boundary + Duration::days(1))
    };
    boundary + Duration::milliseconds(SESSION_END_SLACK_MS)
}
