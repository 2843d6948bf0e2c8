use std::collections::BTreeMap;
use std::fmt;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::errors::{CustomResult, Error};
use crate::modules::helpers::time_format::TimeFormat;
use crate::modules::models::log::EventLog;
use crate::modules::models::section::{ElementKind, SectionList};
use crate::modules::models::time::{MaxTime, TimeState};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Referee {
    pub name: String,
    pub auth: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Competition {
    Line,
    Entry,
}

impl Competition {
    pub fn id(&self) -> &'static str {
        match self {
            Competition::Line => "line",
            Competition::Entry => "entry",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Competition::Line => "Rescue Line",
            Competition::Entry => "Rescue Line Entry",
        }
    }
}

impl fmt::Display for Competition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvacuationPoint {
    #[serde(rename = "low")]
    Low,
    #[serde(rename = "high")]
    High,
    #[default]
    #[serde(rename = "")]
    Unset,
}

impl EvacuationPoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvacuationPoint::Low => "low",
            EvacuationPoint::High => "high",
            EvacuationPoint::Unset => "",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Victims {
    pub dead_victims_before_all_living_victims: u32,
    pub living_victims: u32,
    pub dead_victims_after_all_living_victims: u32,
}

impl Victims {
    pub fn total_dead(&self) -> u32 {
        self.dead_victims_before_all_living_victims
            .saturating_add(self.dead_victims_after_all_living_victims)
    }
}

/// A numeric field of the review table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewField {
    Lops,
    Element(ElementKind),
}

impl ReviewField {
    pub fn name(&self) -> &'static str {
        match self {
            ReviewField::Lops => "lops",
            ReviewField::Element(kind) => kind.field_name(),
        }
    }
}

/// One input of the review table with the minimum it accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewValue {
    pub section_id: u32,
    pub field: ReviewField,
    pub value: i64,
    pub min: i64,
}

/// Audit trail of the values a referee changed after the run.
///
/// Serialized flat: `{"time": 492.3, "teamname": "Bots", "section2": {"gaps": 1}}`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct OriginalValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teamname: Option<String>,
    #[serde(flatten)]
    pub sections: BTreeMap<String, BTreeMap<String, u32>>,
}

impl OriginalValues {
    fn section_key(section_id: u32) -> String {
        format!("section{}", section_id)
    }

    pub fn section_value(&self, section_id: u32, field: &str) -> Option<u32> {
        self.sections
            .get(&OriginalValues::section_key(section_id))
            .and_then(|fields| fields.get(field).copied())
    }

    fn set_section_value(&mut self, section_id: u32, field: &str, value: u32) {
        self.sections
            .entry(OriginalValues::section_key(section_id))
            .or_default()
            .insert(field.to_string(), value);
    }

    fn remove_section_value(&mut self, section_id: u32, field: &str) {
        let key = OriginalValues::section_key(section_id);
        if let Some(fields) = self.sections.get_mut(&key) {
            fields.remove(field);
            if fields.is_empty() {
                self.sections.remove(&key);
            }
        }
    }

    /// edited sections ordered by section id
    pub fn edited_sections(&self) -> Vec<(u32, &BTreeMap<String, u32>)> {
        let mut edited: Vec<(u32, &BTreeMap<String, u32>)> = self
            .sections
            .iter()
            .filter_map(|(key, fields)| {
                let id = key.strip_prefix("section")?.parse::<u32>().ok()?;
                Some((id, fields))
            })
            .collect();
        edited.sort_by_key(|(id, _)| *id);
        edited
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub referee: Referee,
    pub competition: Competition,
    pub arena: String,
    pub round: String,
    pub teamname: String,
    pub evacuation_point: EvacuationPoint,
    pub time: TimeState,
    pub team_started: bool,
    pub sections: SectionList,
    pub victims: Victims,
    pub left_evacuation_zone: bool,
    pub comments: String,
    pub confirmed_by_team_captain: bool,
    pub complaints: String,
    #[serde(flatten)]
    pub event_log: EventLog,
    #[serde(default)]
    pub original_values: OriginalValues,
}

impl Run {
    /// # create a run
    /// a fresh run with one section, a stopped clock and the team marked as started
    ///
    /// ## Arguments
    /// * `referee` - The referee scoring the run
    /// * `competition` - The competition the team competes in
    /// * `arena` - The arena the run takes place in
    /// * `round` - The name of the round
    /// * `teamname` - The name of the team
    /// * `evacuation_point` - The chosen evacuation point
    pub fn new(
        referee: Referee,
        competition: Competition,
        arena: &str,
        round: &str,
        teamname: &str,
        evacuation_point: EvacuationPoint,
    ) -> Run {
        Run {
            referee,
            competition,
            arena: arena.to_string(),
            round: round.to_string(),
            teamname: teamname.to_string(),
            evacuation_point,
            time: TimeState::default(),
            team_started: true,
            sections: SectionList::default(),
            victims: Victims::default(),
            left_evacuation_zone: false,
            comments: String::new(),
            confirmed_by_team_captain: false,
            complaints: String::new(),
            event_log: EventLog::default(),
            original_values: OriginalValues::default(),
        }
    }

    pub fn max_time(&self) -> f64 {
        MaxTime::for_round(&self.round)
    }

    /************ TIME EDITS ************/

    /// # set the run time manually
    /// the first manual change stores the elapsed time before the edit so it
    /// can be restored during review
    ///
    /// ## Arguments
    /// * `seconds` - The new elapsed time
    /// * `now` - The current epoch time in seconds
    pub fn set_time(&mut self, seconds: f64, now: f64) {
        if self.original_values.time.is_none() {
            self.original_values.time = Some(self.time.elapsed(now));
        }
        self.time.set_absolute(seconds.max(0.0), now);
        info!(target: "models/run:set_time", "time of {} set to {}", self.teamname, seconds);
    }

    /// # finalize the time for review
    /// pauses a running clock and cuts an overrun down to the max time
    pub fn finalize_time_for_review(&mut self, now: f64) {
        self.time.pause(now);

        let max_time = self.max_time();
        let elapsed = self.time.elapsed(now);
        if elapsed > max_time {
            if self.original_values.time.is_none() {
                self.original_values.time = Some(elapsed);
            }
            self.time.time_offset = max_time;
            info!(target: "models/run:finalize_time_for_review", "cut run time from {:.2} to {}", elapsed, max_time);
        }
    }

    /// # restore the original time
    /// only possible once the time was edited or cut
    ///
    /// ## Returns
    /// * `bool` - true if there was an original time to restore
    pub fn restore_original_time(&mut self) -> bool {
        match self.original_values.time {
            Some(original) => {
                self.time.time_offset = original;
                true
            }
            None => false,
        }
    }

    /************ REVIEW EDITS ************/

    /// # review table values
    /// all numeric inputs of the review table.
    /// for sections before the last checkpoint the lops are shown as tries
    pub fn review_values(&self) -> Vec<ReviewValue> {
        let mut values = Vec::new();
        for section in self.sections.iter() {
            if section.is_after_last_checkpoint {
                values.push(ReviewValue {
                    section_id: section.section_id,
                    field: ReviewField::Lops,
                    value: section.lops as i64,
                    min: 0,
                });
            } else {
                values.push(ReviewValue {
                    section_id: section.section_id,
                    field: ReviewField::Lops,
                    value: section.lops as i64 + 1,
                    min: 1,
                });
            }

            for kind in ElementKind::ALL {
                values.push(ReviewValue {
                    section_id: section.section_id,
                    field: ReviewField::Element(kind),
                    value: section.count(kind) as i64,
                    min: 0,
                });
            }
        }
        values
    }

    /// # edit a section value
    /// change a value of the review table. the value before the first edit is
    /// kept in the original values, editing back to it drops the entry again
    ///
    /// ## Arguments
    /// * `section_id` - The section to edit
    /// * `field` - The field to edit
    /// * `input` - The value as entered, tries instead of lops before the last checkpoint
    pub fn edit_section_value(&mut self, section_id: u32, field: ReviewField, input: i64) -> CustomResult<()> {
        let section = match self.sections.get_mut(section_id) {
            Some(section) => section,
            None => {
                return Err(Error::InvalidReviewValueError {
                    field: format!("section{}", section_id),
                })
            }
        };

        let value = match field {
            ReviewField::Lops if !section.is_after_last_checkpoint => input - 1,
            _ => input,
        };
        if value < 0 {
            warn!(target: "models/run:edit_section_value", "refused {} for {} of section {}", input, field.name(), section_id);
            return Err(Error::InvalidReviewValueError {
                field: field.name().to_string(),
            });
        }
        let value = u32::try_from(value).map_err(|_| {
            warn!(target: "models/run:edit_section_value", "refused {} for {} of section {}", input, field.name(), section_id);
            Error::InvalidReviewValueError {
                field: field.name().to_string(),
            }
        })?;

        let slot = match field {
            ReviewField::Lops => &mut section.lops,
            ReviewField::Element(kind) => section.count_mut(kind),
        };
        let current = *slot;
        let original = self.original_values.section_value(section_id, field.name());

        if Some(value) == original {
            *slot = value;
            self.original_values.remove_section_value(section_id, field.name());
        } else if value != current {
            *slot = value;
            if original.is_none() {
                self.original_values.set_section_value(section_id, field.name(), current);
            }
        }

        Ok(())
    }

    pub fn edit_teamname(&mut self, teamname: &str) {
        let current = std::mem::replace(&mut self.teamname, teamname.to_string());
        match &self.original_values.teamname {
            Some(original) if original == teamname => {
                self.original_values.teamname = None;
            }
            Some(_) => {}
            None => {
                if current != teamname {
                    self.original_values.teamname = Some(current);
                }
            }
        }
    }

    /// # summary of changes
    /// human readable list of everything edited during review
    ///
    /// ## Arguments
    /// * `team_exists` - Whether the new teamname is on the roster, none if unknown
    /// * `now` - The current epoch time in seconds
    pub fn summary_of_changes(&self, team_exists: Option<bool>, now: f64) -> Vec<String> {
        let mut changes = Vec::new();

        if let Some(original) = &self.original_values.teamname {
            let note = match team_exists {
                Some(true) => "team already exists",
                Some(false) => "team doesn't exist",
                None => "couldn't load list of teams to check whether team exists or not",
            };
            changes.push(format!("Teamname: {} → {} ({})", original, self.teamname, note));
        }

        if let Some(original) = self.original_values.time {
            let before = TimeFormat::seconds_as_time_string(original);
            let after = TimeFormat::seconds_as_time_string(self.time.elapsed(now));
            if before != after {
                changes.push(format!("Time: {} → {}", before, after));
            }
        }

        for (section_id, fields) in self.original_values.edited_sections() {
            let section = match self.sections.get(section_id) {
                Some(section) => section,
                None => continue,
            };
            let alc = if section.is_after_last_checkpoint { " / ALC" } else { "" };
            for (field, original) in fields {
                let current = match field.as_str() {
                    "lops" => section.lops,
                    other => match other.trim_end_matches('s').parse::<ElementKind>() {
                        Ok(kind) => section.count(kind),
                        Err(_) => continue,
                    },
                };
                let mut label = field.clone();
                if let Some(first) = label.get_mut(0..1) {
                    first.make_ascii_uppercase();
                }
                changes.push(format!(
                    "Section {}{}: {}: {} → {}",
                    section_id, alc, label, original, current
                ));
            }
        }

        changes
    }

    /************ REVIEW INPUTS ************/

    /// # set the victims
    /// negative counts are floored at 0, counts that don't fit are refused
    /// and leave the victims unchanged
    pub fn set_victims(&mut self, dead_before: i64, living: i64, dead_after: i64) -> CustomResult<()> {
        let count = |value: i64, field: &str| {
            u32::try_from(value.max(0)).map_err(|_| Error::InvalidReviewValueError {
                field: field.to_string(),
            })
        };
        self.victims = Victims {
            dead_victims_before_all_living_victims: count(dead_before, "deadVictimsBeforeAllLivingVictims")?,
            living_victims: count(living, "livingVictims")?,
            dead_victims_after_all_living_victims: count(dead_after, "deadVictimsAfterAllLivingVictims")?,
        };
        Ok(())
    }

    pub fn set_complaints(&mut self, complaints: &str) {
        self.complaints = complaints.to_string();
        if !self.complaints.is_empty() {
            self.confirmed_by_team_captain = false;
        }
    }

    /// # confirm by team captain
    /// refused while complaints are pending
    pub fn set_confirmed(&mut self, confirmed: bool) -> CustomResult<()> {
        if confirmed && !self.complaints.is_empty() {
            self.confirmed_by_team_captain = false;
            return Err(Error::PendingComplaintsError);
        }
        self.confirmed_by_team_captain = confirmed;
        Ok(())
    }

    /// exactly one of: confirmed without complaints, or complaints without confirmation
    pub fn is_confirmation_settled(&self) -> bool {
        (self.confirmed_by_team_captain && self.complaints.is_empty())
            || (!self.complaints.is_empty() && !self.confirmed_by_team_captain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run() -> Run {
        Run::new(
            Referee { name: "ref".to_string(), auth: "secret".to_string() },
            Competition::Line,
            "Arena A",
            "Round 1",
            "Bots",
            EvacuationPoint::Low,
        )
    }

    #[test]
    fn serializes_flat_like_the_wire_format() {
        let json = serde_json::to_value(run()).unwrap();
        assert_eq!(json["competition"], "line");
        assert_eq!(json["evacuationPoint"], "low");
        assert_eq!(json["teamStarted"], true);
        assert!(json["logs"].as_array().unwrap().is_empty());
        assert!(json["logsUndone"].as_array().unwrap().is_empty());
        assert_eq!(json["originalValues"], serde_json::json!({}));

        let back: Run = serde_json::from_value(json).unwrap();
        assert_eq!(back, run());
    }

    #[test]
    fn unset_evacuation_point_is_empty_string() {
        let json = serde_json::to_value(EvacuationPoint::Unset).unwrap();
        assert_eq!(json, "");
    }

    #[test]
    fn first_time_edit_keeps_original() {
        let mut run = run();
        run.time.start(100.0);
        run.set_time(30.0, 110.0);
        run.set_time(40.0, 111.0);
        assert_eq!(run.original_values.time, Some(10.0));
        assert!((run.time.elapsed(111.0) - 40.0).abs() < 1e-9);

        run.time.pause(111.0);
        assert!(run.restore_original_time());
        assert_eq!(run.time.time_offset, 10.0);
    }

    #[test]
    fn review_cuts_overrun() {
        let mut run = run();
        run.time.start(0.0);
        run.finalize_time_for_review(500.0);
        assert!(!run.time.is_running());
        assert_eq!(run.time.time_offset, 480.0);
        assert_eq!(run.original_values.time, Some(500.0));
    }

    #[test]
    fn review_edits_track_original_values() {
        let mut run = run();
        run.sections.add_element(ElementKind::Gap);

        run.edit_section_value(1, ReviewField::Element(ElementKind::Gap), 3).unwrap();
        run.edit_section_value(1, ReviewField::Element(ElementKind::Gap), 2).unwrap();
        assert_eq!(run.sections.current().gaps, 2);
        assert_eq!(run.original_values.section_value(1, "gaps"), Some(1));

        run.edit_section_value(1, ReviewField::Element(ElementKind::Gap), 1).unwrap();
        assert_eq!(run.original_values, OriginalValues::default());
    }

    #[test]
    fn lops_are_entered_as_tries() {
        let mut run = run();
        run.edit_section_value(1, ReviewField::Lops, 3).unwrap();
        assert_eq!(run.sections.current().lops, 2);
        assert!(run.edit_section_value(1, ReviewField::Lops, 0).is_err());
        assert!(run.edit_section_value(7, ReviewField::Lops, 1).is_err());

        run.sections.toggle_last_checkpoint();
        run.edit_section_value(1, ReviewField::Lops, 0).unwrap();
        assert_eq!(run.sections.current().lops, 0);
    }

    #[test]
    fn teamname_edit_reverts() {
        let mut run = run();
        run.edit_teamname("Robots");
        run.edit_teamname("Robots 2");
        assert_eq!(run.original_values.teamname.as_deref(), Some("Bots"));
        run.edit_teamname("Bots");
        assert_eq!(run.original_values.teamname, None);
    }

    #[test]
    fn summary_lists_changes() {
        let mut run = run();
        run.edit_teamname("Robots");
        run.edit_section_value(1, ReviewField::Element(ElementKind::Obstacle), 2).unwrap();
        let summary = run.summary_of_changes(Some(false), 0.0);
        assert_eq!(
            summary,
            vec![
                "Teamname: Bots → Robots (team doesn't exist)".to_string(),
                "Section 1: Obstacles: 0 → 2".to_string(),
            ]
        );
    }

    #[test]
    fn complaints_force_unconfirmed() {
        let mut run = run();
        assert!(!run.is_confirmation_settled());
        run.set_confirmed(true).unwrap();
        assert!(run.is_confirmation_settled());

        run.set_complaints("robot was moved");
        assert!(!run.confirmed_by_team_captain);
        assert!(matches!(run.set_confirmed(true), Err(Error::PendingComplaintsError)));
        assert!(run.is_confirmation_settled());
    }

    #[test]
    fn victims_floor_at_zero() {
        let mut run = run();
        run.set_victims(-1, 2, 1).unwrap();
        assert_eq!(run.victims.dead_victims_before_all_living_victims, 0);
        assert_eq!(run.victims.total_dead(), 1);
    }

    #[test]
    fn oversized_review_values_are_refused() {
        let mut run = run();
        run.set_victims(0, 2, 1).unwrap();
        let refused = run.set_victims(0, 4_294_967_296, 0);
        assert!(matches!(refused, Err(Error::InvalidReviewValueError { .. })));
        assert_eq!(run.victims.living_victims, 2);

        run.sections.add_element(ElementKind::Gap);
        let refused = run.edit_section_value(1, ReviewField::Element(ElementKind::Gap), 4_294_967_296);
        assert!(matches!(refused, Err(Error::InvalidReviewValueError { .. })));
        assert_eq!(run.sections.current().gaps, 1);
        assert_eq!(run.original_values, OriginalValues::default());

        run.edit_section_value(1, ReviewField::Element(ElementKind::Gap), u32::MAX as i64).unwrap();
        assert_eq!(run.sections.current().gaps, u32::MAX);
    }
}
