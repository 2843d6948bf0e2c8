use std::collections::BTreeMap;

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::modules::helpers::math::Math;
use crate::modules::helpers::time_format::TimeFormat;
use crate::modules::models::log::LogEntry;
use crate::modules::models::run::{EvacuationPoint, OriginalValues, Referee, Run, Victims};
use crate::modules::models::score::{ScoreCalculator, Scoring};
use crate::modules::models::section::Section;

const ID_SUFFIX_LENGTH: usize = 11;
const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubmitStatus {
    Successful,
    Failed,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionAttempt {
    pub time: f64,
    pub submit_status: SubmitStatus,
    pub response: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoringRecord {
    pub team_started: bool,
    pub evacuation_point: EvacuationPoint,
    pub sections: Vec<Section>,
    pub victims: Victims,
    pub left_evacuation_zone: bool,
    #[serde(flatten)]
    pub scoring: Scoring,
}

/// What is sent to the scoring server and kept in the run history.
///
/// Everything except `submits` is frozen once the record is built.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub referee: Referee,
    pub competition: String,
    pub arena: String,
    pub round: Option<u32>,
    pub teamname: String,
    #[serde(rename = "time_duration")]
    pub time_duration: u64,
    #[serde(rename = "time_start")]
    pub time_start: i64,
    #[serde(rename = "time_end")]
    pub time_end: i64,
    pub scoring: ScoringRecord,
    pub comments: String,
    pub confirmed: bool,
    pub complaints: String,
    pub logs: Vec<LogEntry>,
    pub logs_undone: Vec<LogEntry>,
    pub original_values: OriginalValues,
    #[serde(default)]
    pub submits: Vec<SubmissionAttempt>,
}

impl SubmissionRecord {
    /// # build a submission record
    /// snapshot the run and score it
    ///
    /// ## Arguments
    /// * `run` - The reviewed run
    /// * `event` - The event prefix, the wire competition is `<event>-<competition>`
    ///
    /// ## Returns
    /// * `SubmissionRecord` - The record, without id and without submits
    pub fn build(run: &Run, event: &str) -> SubmissionRecord {
        let scoring = ScoreCalculator::score(run);
        let time_duration = run.time.time_offset.min(run.max_time()).max(0.0).round() as u64;

        SubmissionRecord {
            id: None,
            referee: run.referee.clone(),
            competition: format!("{}-{}", event, run.competition.id()),
            arena: run.arena.clone(),
            round: Math::first_digit(&run.round),
            teamname: run.teamname.clone(),
            time_duration,
            time_start: SubmissionRecord::to_millis(run.time.timestamp_run_start),
            time_end: SubmissionRecord::to_millis(run.time.timestamp_run_end),
            scoring: ScoringRecord {
                team_started: run.team_started,
                evacuation_point: run.evacuation_point,
                sections: run.sections.as_slice().to_vec(),
                victims: run.victims.clone(),
                left_evacuation_zone: run.left_evacuation_zone,
                scoring,
            },
            comments: run.comments.clone(),
            confirmed: run.confirmed_by_team_captain,
            complaints: run.complaints.clone(),
            logs: run.event_log.logs.clone(),
            logs_undone: run.event_log.logs_undone.clone(),
            original_values: run.original_values.clone(),
            submits: Vec::new(),
        }
    }

    fn to_millis(timestamp: Option<f64>) -> i64 {
        (timestamp.unwrap_or(0.0) * 1000.0).round() as i64
    }

    /// # run identifier
    /// `competition-round-arena-teamname-<random>`, generated on first use and
    /// kept on the record afterwards
    pub fn identifier(&mut self) -> String {
        if let Some(id) = &self.id {
            return id.clone();
        }

        let round = self.round.map(|r| r.to_string()).unwrap_or_else(|| "null".to_string());
        let id = format!(
            "{}-{}-{}-{}-{}",
            self.competition,
            round,
            self.arena,
            self.teamname,
            SubmissionRecord::random_suffix()
        );
        debug!(target: "models/submission:identifier", "new run id {}", id);
        self.id = Some(id.clone());
        id
    }

    fn random_suffix() -> String {
        let mut rng = rand::thread_rng();
        (0..ID_SUFFIX_LENGTH)
            .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
            .collect()
    }

    pub fn has_been_submitted_successfully(&self) -> bool {
        self.submits
            .iter()
            .any(|s| s.submit_status == SubmitStatus::Successful)
    }

    pub fn record_attempt(&mut self, time: f64, submit_status: SubmitStatus, response: &str) {
        self.submits.push(SubmissionAttempt {
            time,
            submit_status,
            response: response.to_string(),
        });
    }

    /// one line overview used by the run history listing
    pub fn summary(&self) -> HistorySummary {
        HistorySummary {
            id: self.id.clone().unwrap_or_default(),
            successful: self.has_been_submitted_successfully(),
            score: self.scoring.scoring.score,
            multipliers: self.scoring.scoring.multipliers.clone(),
            multiplier: self.scoring.scoring.multiplier,
            duration: TimeFormat::seconds_as_time_string(self.time_duration as f64),
        }
    }

    pub fn score_export(&self) -> ScoreExport {
        let last = self.scoring.sections.last();
        ScoreExport {
            referee_name: self.referee.name.clone(),
            competition: self.competition.clone(),
            arena: self.arena.clone(),
            round: self.round,
            teamname: self.teamname.clone(),
            time_duration: self.time_duration,
            score: self.scoring.scoring.score,
            multipliers: self.scoring.scoring.multipliers.clone(),
            multiplier: self.scoring.scoring.multiplier,
            last_section_lops: last.map(|s| s.lops),
            last_section_alc: last.map(|s| s.is_after_last_checkpoint),
            comments: self.comments.clone(),
            confirmed: self.confirmed,
            complaints: self.complaints.clone(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct HistorySummary {
    pub id: String,
    pub successful: bool,
    pub score: u32,
    pub multipliers: Vec<f64>,
    pub multiplier: f64,
    pub duration: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreExport {
    pub referee_name: String,
    pub competition: String,
    pub arena: String,
    pub round: Option<u32>,
    pub teamname: String,
    #[serde(rename = "time_duration")]
    pub time_duration: u64,
    pub score: u32,
    pub multipliers: Vec<f64>,
    pub multiplier: f64,
    pub last_section_lops: Option<u32>,
    pub last_section_alc: Option<bool>,
    pub comments: String,
    pub confirmed: bool,
    pub complaints: String,
}

/// Run history keyed by run identifier.
pub type RunHistory = BTreeMap<String, SubmissionRecord>;

/// Outcome of the most recent submission attempt.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct LastSubmitStatus {
    pub status: Option<SubmitStatus>,
    pub response: Option<String>,
    pub run_info: Option<String>,
}

pub struct SubmissionGate {}

impl SubmissionGate {
    /// # can the run be submitted
    /// every review value must reach its minimum and the team captain must
    /// either have confirmed the run or filed complaints
    pub fn can_submit(run: &Run) -> bool {
        let values_ok = run.review_values().iter().all(|v| v.value >= v.min);
        values_ok && run.is_confirmation_settled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::models::log::LogAction;
    use crate::modules::models::run::Competition;

    fn reviewed_run() -> Run {
        let mut run = Run::new(
            Referee { name: "ref".to_string(), auth: "pw".to_string() },
            Competition::Entry,
            "Arena 1",
            "Round 2",
            "Bots",
            EvacuationPoint::Low,
        );
        run.time.start(1000.0);
        run.time.pause(1100.4);
        run.sections.current_mut().tiles = Some(5);
        run.sections.complete_section().unwrap();
        run.victims.living_victims = 2;
        run.victims.dead_victims_after_all_living_victims = 1;
        run.event_log.logs.push(LogEntry { time: 12.0, log: LogAction::SectionComplete, time_undone: None });
        run.set_confirmed(true).unwrap();
        run
    }

    #[test]
    fn build_matches_wire_shape() {
        let record = SubmissionRecord::build(&reviewed_run(), "2022-berlin");
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["competition"], "2022-berlin-entry");
        assert_eq!(json["round"], 2);
        assert_eq!(json["time_duration"], 100);
        assert_eq!(json["time_start"], 1_000_000);
        assert_eq!(json["time_end"], 1_100_400);
        assert_eq!(json["scoring"]["score"], 25);
        assert_eq!(json["scoring"]["multiplier"], 2.352);
        assert_eq!(json["scoring"]["teamStarted"], true);
        assert_eq!(json["scoring"]["sections"].as_array().unwrap().len(), 2);
        assert_eq!(json["logs"][0]["log"], "SECTION COMPLETE");
        assert_eq!(json["confirmed"], true);
        assert!(json["submits"].as_array().unwrap().is_empty());
        assert!(json.get("id").is_none());
    }

    #[test]
    fn duration_is_capped_at_max_time() {
        let mut run = reviewed_run();
        run.time.time_offset = 612.6;
        let record = SubmissionRecord::build(&run, "ev");
        assert_eq!(record.time_duration, 480);
    }

    #[test]
    fn identifier_is_memoized() {
        let mut record = SubmissionRecord::build(&reviewed_run(), "ev");
        let id = record.identifier();
        assert!(id.starts_with("ev-entry-2-Arena 1-Bots-"));
        assert_eq!(id.len(), "ev-entry-2-Arena 1-Bots-".len() + ID_SUFFIX_LENGTH);
        assert_eq!(record.identifier(), id);
        assert_eq!(serde_json::to_value(&record).unwrap()["id"], id.as_str());
    }

    #[test]
    fn gate_requires_settled_confirmation() {
        let mut run = reviewed_run();
        assert!(SubmissionGate::can_submit(&run));

        run.set_confirmed(false).unwrap();
        assert!(!SubmissionGate::can_submit(&run));

        run.set_complaints("the arena was wet");
        assert!(SubmissionGate::can_submit(&run));
    }

    #[test]
    fn success_flag_and_summary() {
        let mut record = SubmissionRecord::build(&reviewed_run(), "ev");
        record.identifier();
        record.record_attempt(1.0, SubmitStatus::Failed, "502");
        assert!(!record.has_been_submitted_successfully());
        record.record_attempt(2.0, SubmitStatus::Successful, "ok");
        assert!(record.has_been_submitted_successfully());

        let summary = record.summary();
        assert!(summary.successful);
        assert_eq!(summary.duration, "1:40");

        let json = serde_json::to_value(&record.submits[0]).unwrap();
        assert_eq!(json, serde_json::json!({"time": 1.0, "submitStatus": "FAILED", "response": "502"}));
    }

    #[test]
    fn export_reads_last_section() {
        let export = SubmissionRecord::build(&reviewed_run(), "ev").score_export();
        assert_eq!(export.last_section_lops, Some(0));
        assert_eq!(export.last_section_alc, Some(false));
        assert_eq!(export.score, 25);
    }
}
