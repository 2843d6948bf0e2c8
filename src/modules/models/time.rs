use log::{debug, trace};
use serde::{Deserialize, Serialize};

/// Source of wall-clock time in epoch seconds.
///
/// The controller reads the time once per handler invocation and passes it
/// down, which keeps every clock operation deterministic under test.
pub trait TimeSource {
    fn now(&self) -> f64;
}

pub struct SystemTimeSource {}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> f64 {
        chrono::Utc::now().timestamp_millis() as f64 / 1000.0
    }
}

/// Offset/anchor representation of the run time.
///
/// running <=> `time_started_timestamp` is set
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeState {
    pub time_offset: f64,
    pub time_started_timestamp: Option<f64>,
    pub timestamp_run_start: Option<f64>,
    pub timestamp_run_end: Option<f64>,
}

impl Default for TimeState {
    fn default() -> Self {
        TimeState {
            time_offset: 0.0,
            time_started_timestamp: None,
            timestamp_run_start: None,
            timestamp_run_end: None,
        }
    }
}

impl TimeState {
    pub fn is_running(&self) -> bool {
        self.time_started_timestamp.is_some()
    }

    /// # start the clock
    /// no-op when the clock is already running.
    /// the run start timestamp is only set the first time the clock starts
    ///
    /// ## Arguments
    /// * `now` - The current epoch time in seconds
    ///
    /// ## Returns
    /// * `bool` - true if the clock was started by this call
    pub fn start(&mut self, now: f64) -> bool {
        if self.is_running() {
            return false;
        }

        self.time_started_timestamp = Some(now);
        if self.timestamp_run_start.is_none() {
            self.timestamp_run_start = Some(now);
        }
        self.timestamp_run_end = None;

        debug!(target: "models/time:start", "clock started at {} (offset: {})", now, self.time_offset);
        true
    }

    /// # pause the clock
    /// no-op when the clock is already paused.
    /// folds the running interval into the offset and stamps the run end
    ///
    /// ## Arguments
    /// * `now` - The current epoch time in seconds
    ///
    /// ## Returns
    /// * `bool` - true if the clock was paused by this call
    pub fn pause(&mut self, now: f64) -> bool {
        let started = match self.time_started_timestamp {
            Some(started) => started,
            None => return false,
        };

        self.time_offset += now - started;
        self.time_started_timestamp = None;
        self.timestamp_run_end = Some(now);

        debug!(target: "models/time:pause", "clock paused at {} (offset: {})", now, self.time_offset);
        true
    }

    /// # elapsed run time
    ///
    /// ## Arguments
    /// * `now` - The current epoch time in seconds
    ///
    /// ## Returns
    /// * `f64` - The elapsed run time in seconds
    pub fn elapsed(&self, now: f64) -> f64 {
        match self.time_started_timestamp {
            Some(started) => self.time_offset + (now - started),
            None => self.time_offset,
        }
    }

    /// zeroes the offset and forgets both run timestamps
    pub fn reset(&mut self) {
        self.time_offset = 0.0;
        self.time_started_timestamp = None;
        self.timestamp_run_start = None;
        self.timestamp_run_end = None;
    }

    /// # set the elapsed time
    /// shift the offset so that `elapsed(now)` equals `seconds`.
    /// the run timestamps are left untouched
    ///
    /// ## Arguments
    /// * `seconds` - The new elapsed time
    /// * `now` - The current epoch time in seconds
    pub fn set_absolute(&mut self, seconds: f64, now: f64) {
        let delta = seconds - self.elapsed(now);
        trace!(target: "models/time:set_absolute", "adjusting offset by {}", delta);
        self.time_offset += delta;
    }
}

pub struct MaxTime {}

impl MaxTime {
    /// # max time of a round
    /// video rounds last 4 minutes, live rounds 5 and everything else 8
    ///
    /// ## Arguments
    /// * `round` - The name of the round
    ///
    /// ## Returns
    /// * `f64` - The maximum run time in seconds
    pub fn for_round(round: &str) -> f64 {
        if round.contains("Video") {
            4.0 * 60.0
        } else if round.contains("Live") {
            5.0 * 60.0
        } else {
            8.0 * 60.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: f64 = 1_650_000_000.0;

    #[test]
    fn pause_resume_accumulates_offset() {
        let mut time = TimeState::default();
        assert!(time.start(T0));
        assert!(time.pause(T0 + 125.4));
        assert_eq!(time.timestamp_run_end, Some(T0 + 125.4));

        assert!(time.start(T0 + 200.0));
        assert_eq!(time.timestamp_run_end, None);
        assert!(time.pause(T0 + 210.0));

        assert!((time.time_offset - 135.4).abs() < 1e-6);
        assert_eq!(time.timestamp_run_start, Some(T0));
        assert_eq!(time.timestamp_run_end, Some(T0 + 210.0));
    }

    #[test]
    fn start_and_pause_are_idempotent() {
        let mut time = TimeState::default();
        assert!(!time.pause(T0));
        assert!(time.start(T0));
        assert!(!time.start(T0 + 5.0));
        assert_eq!(time.time_started_timestamp, Some(T0));
        assert!((time.elapsed(T0 + 7.0) - 7.0).abs() < 1e-9);
    }

    #[test]
    fn set_absolute_keeps_timestamps() {
        let mut time = TimeState::default();
        time.start(T0);
        time.set_absolute(60.0, T0 + 10.0);
        assert!((time.elapsed(T0 + 10.0) - 60.0).abs() < 1e-9);
        assert!((time.elapsed(T0 + 11.0) - 61.0).abs() < 1e-9);
        assert_eq!(time.timestamp_run_start, Some(T0));
        assert_eq!(time.time_started_timestamp, Some(T0));
    }

    #[test]
    fn reset_clears_everything() {
        let mut time = TimeState::default();
        time.start(T0);
        time.pause(T0 + 3.0);
        time.reset();
        assert_eq!(time, TimeState::default());
    }

    #[test]
    fn max_time_from_round_name() {
        assert_eq!(MaxTime::for_round("Video Victims 1"), 240.0);
        assert_eq!(MaxTime::for_round("Live Round 2"), 300.0);
        assert_eq!(MaxTime::for_round("Round 1"), 480.0);
    }
}
