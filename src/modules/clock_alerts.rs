use std::time::Duration;

use log::{debug, info, trace, warn};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const TICK_INTERVAL: Duration = Duration::from_millis(20);

/// Offsets relative to the max time and the cue they trigger.
const ALERT_OFFSETS: [(f64, AlertCue); 6] = [
    (-5.0, AlertCue::Short),
    (-4.0, AlertCue::Short),
    (-3.0, AlertCue::Short),
    (-2.0, AlertCue::Short),
    (-1.0, AlertCue::Short),
    (0.0, AlertCue::Long),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertCue {
    Short,
    Long,
}

#[derive(Debug, Clone, PartialEq)]
struct Alert {
    offset: f64,
    cue: AlertCue,
    fired: bool,
}

/// Countdown alerts of the current run, each fires at most once until reset.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertSchedule {
    alerts: Vec<Alert>,
}

impl Default for AlertSchedule {
    fn default() -> Self {
        AlertSchedule {
            alerts: ALERT_OFFSETS
                .iter()
                .map(|(offset, cue)| Alert {
                    offset: *offset,
                    cue: *cue,
                    fired: false,
                })
                .collect(),
        }
    }
}

impl AlertSchedule {
    /// # due alerts
    /// mark and return the alerts whose threshold was crossed less than a
    /// second ago. a clock that is far past a threshold does not fire it
    ///
    /// ## Arguments
    /// * `elapsed` - The current run time
    /// * `max_time` - The max time of the run
    ///
    /// ## Returns
    /// * `Vec<AlertCue>` - The cues to play, in threshold order
    pub fn due(&mut self, elapsed: f64, max_time: f64) -> Vec<AlertCue> {
        let mut cues = Vec::new();
        for alert in self.alerts.iter_mut() {
            let diff = elapsed - (max_time + alert.offset);
            if diff > 0.0 && diff < 1.0 && !alert.fired {
                alert.fired = true;
                cues.push(alert.cue);
            }
        }
        cues
    }

    pub fn reset(&mut self) {
        for alert in self.alerts.iter_mut() {
            alert.fired = false;
        }
    }

    pub fn fired_count(&self) -> usize {
        self.alerts.iter().filter(|a| a.fired).count()
    }
}

/// Plays alert cues. Dispatch is fire-and-forget.
pub trait AlertSink: Send + Sync {
    fn cue(&self, cue: AlertCue);
}

pub struct LogAlertSink {}

impl AlertSink for LogAlertSink {
    fn cue(&self, cue: AlertCue) {
        match cue {
            AlertCue::Short => info!(target: "clock_alerts:cue", "beep"),
            AlertCue::Long => info!(target: "clock_alerts:cue", "beeeeeep"),
        }
    }
}

/// Repeating tick source for refreshing the run time while the clock runs.
///
/// At most one timer exists, starting a new one cancels the previous one.
#[derive(Default)]
pub struct Ticker {
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    /// # start ticking
    /// send a tick every 20 ms until cancelled
    ///
    /// ## Arguments
    /// * `sender` - The channel the ticks are sent on
    ///
    /// ## Returns
    /// * `bool` - false if there is no tokio runtime to run the timer on
    pub fn start(&mut self, sender: UnboundedSender<()>) -> bool {
        self.cancel();

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!(target: "clock_alerts:start", "no runtime available, time will not auto update");
                return false;
            }
        };

        self.handle = Some(runtime.spawn(async move {
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if sender.send(()).is_err() {
                    trace!(target: "clock_alerts:tick", "receiver gone, stopping");
                    break;
                }
            }
        }));
        debug!(target: "clock_alerts:start", "ticker started");
        true
    }

    /// # cancel the timer
    ///
    /// ## Returns
    /// * `bool` - true if a running timer was cancelled by this call
    pub fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                debug!(target: "clock_alerts:cancel", "ticker cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn alerts_fire_once_inside_their_window() {
        let mut schedule = AlertSchedule::default();
        assert!(schedule.due(474.0, 480.0).is_empty());
        assert_eq!(schedule.due(475.5, 480.0), vec![AlertCue::Short]);
        assert!(schedule.due(475.6, 480.0).is_empty());
        assert_eq!(schedule.due(480.2, 480.0), vec![AlertCue::Long]);
        assert_eq!(schedule.fired_count(), 2);

        schedule.reset();
        assert_eq!(schedule.fired_count(), 0);
        assert_eq!(schedule.due(480.2, 480.0), vec![AlertCue::Long]);
    }

    #[test]
    fn stale_thresholds_do_not_replay() {
        let mut schedule = AlertSchedule::default();
        assert!(schedule.due(600.0, 480.0).is_empty());
        assert_eq!(schedule.fired_count(), 0);
    }

    #[test]
    fn ticker_needs_a_runtime() {
        let (sender, _receiver) = mpsc::unbounded_channel();
        let mut ticker = Ticker::default();
        assert!(!ticker.start(sender));
        assert!(!ticker.is_active());
        assert!(!ticker.cancel());
    }

    #[tokio::test]
    async fn ticker_ticks_until_cancelled() {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let mut ticker = Ticker::default();
        assert!(ticker.start(sender.clone()));

        // restarting replaces the timer instead of adding one
        assert!(ticker.start(sender));
        assert!(receiver.recv().await.is_some());
        assert!(receiver.recv().await.is_some());

        assert!(ticker.cancel());
        assert!(!ticker.cancel());

        // every sender lives in the aborted task, so the channel closes
        let drained = tokio::time::timeout(Duration::from_secs(1), async {
            while receiver.recv().await.is_some() {}
        })
        .await;
        assert!(drained.is_ok());
    }
}
