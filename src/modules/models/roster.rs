use std::collections::HashMap;
use std::fs;

use log::{error, info};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::errors::{CustomResult, SerializationSnafu, StorageSnafu};
use crate::modules::models::run::Competition;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct CompetitionInfo {
    #[serde(default)]
    pub arenas: Vec<String>,
    #[serde(default)]
    pub rounds: Vec<String>,
    #[serde(default)]
    pub teams: Vec<String>,
}

/// Arenas, rounds and teams per competition.
///
/// Loaded once and only read afterwards.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct Roster {
    competitions: HashMap<Competition, CompetitionInfo>,
}

impl Roster {
    pub fn new(competitions: HashMap<Competition, CompetitionInfo>) -> Roster {
        Roster { competitions }
    }

    /// # load roster from json
    ///
    /// ## Arguments
    /// * `json` - `{ "line": {"arenas": [], "rounds": [], "teams": []}, ... }`
    pub fn from_json(json: &str) -> CustomResult<Roster> {
        serde_json::from_str(json).context(SerializationSnafu { what: "roster" })
    }

    /// # load roster from file
    ///
    /// ## Arguments
    /// * `path` - The path to the competitions file
    pub fn from_file(path: &str) -> CustomResult<Roster> {
        let json = match fs::read_to_string(path).context(StorageSnafu { key: path }) {
            Ok(json) => json,
            Err(error) => {
                error!(target: "models/roster:from_file", "Error reading roster: (error: {})", error);
                return Err(error);
            }
        };

        let roster = Roster::from_json(&json)?;
        info!(target: "models/roster:from_file", "loaded roster for {} competitions", roster.competitions.len());
        Ok(roster)
    }

    pub fn info(&self, competition: Competition) -> Option<&CompetitionInfo> {
        self.competitions.get(&competition)
    }

    /// # sorted options
    /// the options of a list, sorted case insensitive like the selection inputs show them
    pub fn sorted(options: &[String]) -> Vec<String> {
        let mut options = options.to_vec();
        options.sort_by_key(|o| o.to_lowercase());
        options
    }

    pub fn has_arena(&self, competition: Competition, arena: &str) -> bool {
        self.info(competition).map_or(false, |i| i.arenas.iter().any(|a| a == arena))
    }

    pub fn has_round(&self, competition: Competition, round: &str) -> bool {
        self.info(competition).map_or(false, |i| i.rounds.iter().any(|r| r == round))
    }

    /// none when the roster has no team list for the competition
    pub fn has_team(&self, competition: Competition, team: &str) -> Option<bool> {
        self.info(competition).map(|i| i.teams.iter().any(|t| t == team))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROSTER: &str = r#"{
        "line": {"arenas": ["Arena B", "Arena a"], "rounds": ["Round 1"], "teams": ["Bots"]},
        "entry": {"arenas": ["Arena E"], "rounds": ["Video Victims 1"], "teams": []}
    }"#;

    #[test]
    fn parses_and_answers_membership() {
        let roster = Roster::from_json(ROSTER).unwrap();
        assert!(roster.has_arena(Competition::Line, "Arena B"));
        assert!(!roster.has_arena(Competition::Entry, "Arena B"));
        assert!(roster.has_round(Competition::Entry, "Video Victims 1"));
        assert_eq!(roster.has_team(Competition::Line, "Bots"), Some(true));
        assert_eq!(roster.has_team(Competition::Entry, "Bots"), Some(false));
        assert_eq!(Roster::default().has_team(Competition::Line, "Bots"), None);
    }

    #[test]
    fn options_sort_case_insensitive() {
        let roster = Roster::from_json(ROSTER).unwrap();
        let arenas = Roster::sorted(&roster.info(Competition::Line).unwrap().arenas);
        assert_eq!(arenas, vec!["Arena a".to_string(), "Arena B".to_string()]);
    }

    #[test]
    fn broken_json_is_an_error() {
        assert!(Roster::from_json("{\"line\": 3}").is_err());
    }
}
