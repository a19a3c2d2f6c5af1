use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanDuration(pub Duration);

impl FromStr for HumanDuration {
    type Err = String;

    /// Accepts `30s`, `1m`, `1h15m30s`, `1d`; a bare number is seconds.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut current_number = String::new();
        let mut has_unit = false;

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
            } else if let Ok(num) = current_number.parse::<u64>() {
                total_seconds += match c {
                    's' => num,
                    'm' => num * 60,
                    'h' => num * 3600,
                    'd' => num * 86400,
                    _ => return Err(format!("Invalid duration unit: {}", c)),
                };
                current_number.clear();
                has_unit = true;
            } else if !c.is_whitespace() {
                return Err(format!("Invalid character in duration: {}", c));
            }
        }

        if !current_number.is_empty() {
            total_seconds += current_number
                .parse::<u64>()
                .map_err(|_| "Invalid number in duration".to_string())?;
            has_unit = true;
        }

        if !has_unit {
            return Err("Duration must include a number".to_string());
        }
        if total_seconds == 0 {
            return Err("Duration must be greater than zero".to_string());
        }

        Ok(HumanDuration(Duration::from_secs(total_seconds)))
    }
}

pub fn parse_time_of_day(s: &str) -> std::result::Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|e| format!("Expected HH:MM, got {}: {}", s, e))
}

/// Fires at most once per calendar day, at or after `at`.
///
/// A day only counts as done once a run succeeds, so a failed run is
/// attempted again on every poll until one goes through.
#[derive(Debug, Clone)]
pub struct DailySchedule {
    at: NaiveTime,
    last_run: Option<NaiveDate>,
}

impl DailySchedule {
    pub fn new(at: NaiveTime) -> Self {
        Self { at, last_run: None }
    }

    pub fn at(&self) -> NaiveTime {
        self.at
    }

    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        now.time() >= self.at && self.last_run != Some(now.date())
    }

    pub fn mark_done(&mut self, now: NaiveDateTime) {
        self.last_run = Some(now.date());
    }

    /// Records a run made outside the schedule (the one at startup). It only
    /// stands in for today's slot when the slot has already passed.
    pub fn record_startup_run(&mut self, now: NaiveDateTime) {
        if now.time() >= self.at {
            self.mark_done(now);
        }
    }

    pub fn next_run(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date().and_time(self.at);
        if self.is_due(now) {
            now
        } else if now.time() < self.at {
            today
        } else {
            today + chrono::Duration::days(1)
        }
    }
}
