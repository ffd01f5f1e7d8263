//! Recurring cadence for unattended runs.
//!
//! The cadence math is pure (instant in, next-due instant out) so it is
//! testable without a clock; only [`run_on_cadence`] touches wall time. The
//! waiting loop polls a stop flag once per second, which is the single
//! interruptible point of a scheduled process.

use chrono::{Datelike, Duration, Local, NaiveDateTime, NaiveTime, Weekday};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// When recurring runs fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Daily { at: NaiveTime },
    Weekly { weekday: Weekday, at: NaiveTime },
}

impl Cadence {
    /// Parse operator input: `every` is `daily` or a weekday name, `at` is
    /// `HH:MM`.
    pub fn parse(every: &str, at: &str) -> Result<Self, String> {
        let at = NaiveTime::parse_from_str(at, "%H:%M")
            .map_err(|_| format!("invalid time '{at}', expected HH:MM"))?;
        let every = every.trim().to_lowercase();
        if every == "daily" {
            return Ok(Self::Daily { at });
        }
        match every.parse::<Weekday>() {
            Ok(weekday) => Ok(Self::Weekly { weekday, at }),
            Err(_) => Err(format!(
                "invalid cadence '{every}', expected 'daily' or a weekday name"
            )),
        }
    }

    fn time(&self) -> NaiveTime {
        match self {
            Self::Daily { at } | Self::Weekly { at, .. } => *at,
        }
    }

    /// First matching instant strictly after `now`.
    pub fn next_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        for days in 0..=14 {
            let date = now.date() + Duration::days(days);
            let candidate = date.and_time(self.time());
            if candidate <= now {
                continue;
            }
            match self {
                Self::Daily { .. } => return candidate,
                Self::Weekly { weekday, .. } => {
                    if date.weekday() == *weekday {
                        return candidate;
                    }
                }
            }
        }
        // a weekly cadence matches within eight days
        now + Duration::days(1)
    }
}

impl std::fmt::Display for Cadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Daily { at } => write!(f, "daily at {}", at.format("%H:%M")),
            Self::Weekly { weekday, at } => {
                write!(f, "every {weekday} at {}", at.format("%H:%M"))
            }
        }
    }
}

/// A cadence plus the instant it next fires.
#[derive(Debug, Clone)]
pub struct Recurrence {
    cadence: Cadence,
    next_due: NaiveDateTime,
}

impl Recurrence {
    pub fn starting(cadence: Cadence, now: NaiveDateTime) -> Self {
        let next_due = cadence.next_after(now);
        Self { cadence, next_due }
    }

    pub fn next_due(&self) -> NaiveDateTime {
        self.next_due
    }

    /// True once `now` reaches the due instant; advances to the following one.
    pub fn due(&mut self, now: NaiveDateTime) -> bool {
        if now >= self.next_due {
            self.next_due = self.cadence.next_after(now);
            true
        } else {
            false
        }
    }
}

/// Run `job` whenever the cadence comes due, until `stop` is set.
///
/// The clock is checked about once per minute. A long job simply delays the
/// next check; overlapping runs cannot start from this loop.
pub fn run_on_cadence<F>(cadence: Cadence, stop: &AtomicBool, mut job: F)
where
    F: FnMut(),
{
    let mut recurrence = Recurrence::starting(cadence, Local::now().naive_local());
    loop {
        if stop.load(Ordering::Relaxed) {
            return;
        }
        if recurrence.due(Local::now().naive_local()) {
            job();
        }
        for _ in 0..60 {
            if stop.load(Ordering::Relaxed) {
                return;
            }
            thread::sleep(std::time::Duration::from_secs(1));
        }
    }
}
