//! Wall-clock timing of a run and of each table

use std::time::{Duration, Instant};

const ONE_MINUTE: u64 = 60;
const ONE_HOUR: u64 = ONE_MINUTE * 60;
const ONE_DAY: u64 = ONE_HOUR * 24;

/// Measures a whole run, with a "lap" per table
#[derive(Debug)]
pub struct RunTimer {
    start: Instant,
    lap_start: Option<Instant>,
}

impl RunTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            lap_start: None,
        }
    }

    pub fn start_lap(&mut self) {
        self.lap_start = Some(Instant::now());
    }

    /// Time since the last `start_lap`, or since the run started
    pub fn end_lap(&mut self) -> Duration {
        self.lap_start.take().unwrap_or(self.start).elapsed()
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Render a duration like "1 hour(s), 2 minute(s), and 3 second(s)"
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs_f64().round() as u64;
    let days = total / ONE_DAY;
    let hours = (total % ONE_DAY) / ONE_HOUR;
    let minutes = (total % ONE_HOUR) / ONE_MINUTE;
    let seconds = total % ONE_MINUTE;

    if days > 0 {
        format!(
            "{} day(s), {} hour(s), {} minute(s), and {} second(s)",
            days, hours, minutes, seconds
        )
    } else if hours > 0 {
        format!("{} hour(s), {} minute(s), and {} second(s)", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{} minute(s) and {} second(s)", minutes, seconds)
    } else {
        format!("{} second(s)", seconds)
    }
}
