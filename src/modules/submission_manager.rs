use std::collections::HashSet;
use std::sync::Arc;

use log::{error, info, warn};
use tokio::task::{JoinHandle, JoinSet};

use crate::modules::models::submission::{LastSubmitStatus, RunHistory, SubmissionRecord, SubmitStatus};
use crate::modules::submit_api::{submit_run, Transport};

/// Result of one network attempt, not yet written to the history.
///
/// Only produced by an attempt and consumed when it is recorded.
#[derive(Debug, PartialEq)]
pub struct SubmissionOutcome {
    pub(crate) run_id: String,
    pub(crate) status: SubmitStatus,
    pub(crate) response: String,
}

impl SubmissionOutcome {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn status(&self) -> SubmitStatus {
        self.status
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    fn failed(run_id: &str, response: &str) -> SubmissionOutcome {
        SubmissionOutcome {
            run_id: run_id.to_string(),
            status: SubmitStatus::Failed,
            response: response.to_string(),
        }
    }
}

/// An attempt running in the background.
///
/// It is never cancelled, awaiting it yields exactly one outcome.
#[must_use = "the attempt is only recorded once it is completed"]
pub struct PendingSubmission {
    run_id: String,
    handle: Option<JoinHandle<SubmissionOutcome>>,
}

impl PendingSubmission {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub async fn outcome(self) -> SubmissionOutcome {
        let handle = match self.handle {
            Some(handle) => handle,
            None => return SubmissionOutcome::failed(&self.run_id, "no async runtime available"),
        };

        match handle.await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(target: "submission_manager:outcome", "attempt for {} did not finish: (error: {})", self.run_id, err);
                SubmissionOutcome::failed(&self.run_id, &err.to_string())
            }
        }
    }
}

/// Summary of a bulk retry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RetryReport {
    pub attempted: usize,
    pub successful: usize,
    pub failed: usize,
}

pub struct SubmissionManager {
    transport: Arc<dyn Transport>,
}

impl SubmissionManager {
    pub fn new(transport: Arc<dyn Transport>) -> SubmissionManager {
        SubmissionManager { transport }
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    async fn attempt(transport: Arc<dyn Transport>, url: String, run_id: String, record: SubmissionRecord) -> SubmissionOutcome {
        info!(target: "submission_manager:attempt", "submitting {} to {}", run_id, url);
        let (status, response) = submit_run(transport.as_ref(), &url, &record).await;
        match status {
            SubmitStatus::Successful => info!(target: "submission_manager:attempt", "{} submitted", run_id),
            SubmitStatus::Failed => warn!(target: "submission_manager:attempt", "{} failed: {}", run_id, response),
        }
        SubmissionOutcome { run_id, status, response }
    }

    /// # dispatch a submission
    /// start the network attempt in the background and return right away
    ///
    /// ## Arguments
    /// * `url` - host + path of the submit endpoint
    /// * `run_id` - The history key of the record
    /// * `record` - The record to send
    pub fn dispatch(&self, url: &str, run_id: &str, record: SubmissionRecord) -> PendingSubmission {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => Some(runtime.spawn(SubmissionManager::attempt(
                Arc::clone(&self.transport),
                url.to_string(),
                run_id.to_string(),
                record,
            ))),
            Err(_) => {
                error!(target: "submission_manager:dispatch", "no runtime, can't submit {}", run_id);
                None
            }
        };

        PendingSubmission {
            run_id: run_id.to_string(),
            handle,
        }
    }

    /// # send many records at once
    /// every record gets exactly one outcome, also when its task dies
    pub async fn dispatch_all(&self, url: &str, records: Vec<(String, SubmissionRecord)>) -> Vec<SubmissionOutcome> {
        let mut waiting: HashSet<String> = records.iter().map(|(id, _)| id.clone()).collect();
        let mut tasks = JoinSet::new();

        for (run_id, record) in records {
            tasks.spawn(SubmissionManager::attempt(
                Arc::clone(&self.transport),
                url.to_string(),
                run_id,
                record,
            ));
        }

        let mut outcomes = Vec::new();
        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(outcome) => {
                    waiting.remove(&outcome.run_id);
                    outcomes.push(outcome);
                }
                Err(err) => {
                    error!(target: "submission_manager:dispatch_all", "retry task failed: (error: {})", err);
                }
            }
        }

        let mut lost: Vec<String> = waiting.into_iter().collect();
        lost.sort();
        for run_id in lost {
            outcomes.push(SubmissionOutcome::failed(&run_id, "attempt did not finish"));
        }
        outcomes
    }

    /// # record the outcome of an attempt
    /// append the attempt to the history entry and update the last submit
    /// status. an entry purged in the meantime only updates the status
    ///
    /// ## Arguments
    /// * `history` - The run history
    /// * `last` - The last submit status of the application data
    /// * `outcome` - The finished attempt, consumed so it is recorded once
    /// * `time` - The epoch time the attempt finished
    pub(crate) fn apply(history: &mut RunHistory, last: &mut LastSubmitStatus, outcome: SubmissionOutcome, time: f64) {
        match history.get_mut(&outcome.run_id) {
            Some(record) => record.record_attempt(time, outcome.status, &outcome.response),
            None => {
                warn!(target: "submission_manager:apply", "run {} is no longer in the run history", outcome.run_id)
            }
        }

        *last = LastSubmitStatus {
            status: Some(outcome.status),
            response: Some(outcome.response),
            run_info: Some(outcome.run_id),
        };
    }

    /// ids of the history entries without a successful attempt
    pub fn failed_ids(history: &RunHistory) -> Vec<String> {
        history
            .iter()
            .filter(|(_, record)| !record.has_been_submitted_successfully())
            .map(|(id, _)| id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::models::run::{Competition, EvacuationPoint, Referee, Run};

    fn record(teamname: &str) -> SubmissionRecord {
        let run = Run::new(Referee::default(), Competition::Line, "A", "Round 1", teamname, EvacuationPoint::Low);
        SubmissionRecord::build(&run, "ev")
    }

    fn history() -> RunHistory {
        let mut history = RunHistory::new();
        for team in ["Bots", "Robots"] {
            let mut record = record(team);
            history.insert(record.identifier(), record);
        }
        history
    }

    #[test]
    fn apply_appends_attempt_and_updates_status() {
        let mut history = history();
        let mut last = LastSubmitStatus::default();
        let run_id = history.keys().next().unwrap().clone();

        let outcome = SubmissionOutcome {
            run_id: run_id.clone(),
            status: SubmitStatus::Successful,
            response: "created".to_string(),
        };
        SubmissionManager::apply(&mut history, &mut last, outcome, 12.5);

        assert_eq!(history[&run_id].submits.len(), 1);
        assert_eq!(history[&run_id].submits[0].time, 12.5);
        assert_eq!(last.status, Some(SubmitStatus::Successful));
        assert_eq!(last.run_info.as_deref(), Some(run_id.as_str()));
        assert_eq!(SubmissionManager::failed_ids(&history).len(), 1);
    }

    #[test]
    fn apply_after_purge_only_updates_status() {
        let mut history = RunHistory::new();
        let mut last = LastSubmitStatus::default();
        let outcome = SubmissionOutcome::failed("gone", "timeout");
        SubmissionManager::apply(&mut history, &mut last, outcome, 1.0);

        assert!(history.is_empty());
        assert_eq!(last.status, Some(SubmitStatus::Failed));
        assert_eq!(last.response.as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn pending_without_runtime_fails_once() {
        let pending = PendingSubmission {
            run_id: "x".to_string(),
            handle: None,
        };
        let outcome = pending.outcome().await;
        assert_eq!(outcome.status, SubmitStatus::Failed);
        assert_eq!(outcome.run_id, "x");
    }
}
