use std::fmt;
use std::str::FromStr;

use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::errors::{CustomResult, Error};
use crate::modules::models::section::{ElementKind, SectionList};

const LOG_SECTION_COMPLETE: &str = "SECTION COMPLETE";
const LOG_LOP: &str = "LACK OF PROGRESS";
const LOG_SKIP_SECTION: &str = "SKIP SECTION";
const LOG_ADD_PREFIX: &str = "ADD";
const LOG_DEL_PREFIX: &str = "DEL";
const LOG_LAST_CHECKPOINT: &str = "LAST CHECKPOINT";

/// Every action that mutates the sections during a run.
///
/// On the wire an action is a single token (`"ADD GAP"`, `"SKIP SECTION"`),
/// internally it is always this enum.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(into = "String", try_from = "String")]
pub enum LogAction {
    SectionComplete,
    LackOfProgress,
    SkipSection,
    AddElement(ElementKind),
    RemoveElement(ElementKind),
    ToggleLastCheckpoint,
}

impl fmt::Display for LogAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LogAction::SectionComplete => write!(f, "{}", LOG_SECTION_COMPLETE),
            LogAction::LackOfProgress => write!(f, "{}", LOG_LOP),
            LogAction::SkipSection => write!(f, "{}", LOG_SKIP_SECTION),
            LogAction::AddElement(kind) => {
                write!(f, "{} {}", LOG_ADD_PREFIX, kind.name().to_uppercase())
            }
            LogAction::RemoveElement(kind) => {
                write!(f, "{} {}", LOG_DEL_PREFIX, kind.name().to_uppercase())
            }
            LogAction::ToggleLastCheckpoint => write!(f, "{}", LOG_LAST_CHECKPOINT),
        }
    }
}

impl FromStr for LogAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            LOG_SECTION_COMPLETE => return Ok(LogAction::SectionComplete),
            LOG_LOP => return Ok(LogAction::LackOfProgress),
            LOG_SKIP_SECTION => return Ok(LogAction::SkipSection),
            LOG_LAST_CHECKPOINT => return Ok(LogAction::ToggleLastCheckpoint),
            _ => {}
        }

        match s.split_once(' ') {
            Some((LOG_ADD_PREFIX, kind)) => Ok(LogAction::AddElement(kind.parse()?)),
            Some((LOG_DEL_PREFIX, kind)) => Ok(LogAction::RemoveElement(kind.parse()?)),
            _ => Err(format!("unknown log action: {}", s)),
        }
    }
}

impl From<LogAction> for String {
    fn from(action: LogAction) -> Self {
        action.to_string()
    }
}

impl TryFrom<String> for LogAction {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub time: f64,
    pub log: LogAction,
    #[serde(rename = "timeUndone", default, skip_serializing_if = "Option::is_none")]
    pub time_undone: Option<f64>,
}

/// Non-blocking notice raised when an action is logged at an odd moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    TimeNotRunning,
    TimeOver,
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Advisory::TimeNotRunning => write!(f, "WARNING: Time is not running!"),
            Advisory::TimeOver => write!(f, "WARNING: Time is over!"),
        }
    }
}

/// Clock state at the moment an action is performed.
#[derive(Debug, Clone, Copy)]
pub struct ActionContext {
    pub elapsed: f64,
    pub running: bool,
    pub max_time: f64,
}

impl ActionContext {
    fn advisories(&self) -> Vec<Advisory> {
        let mut advisories = Vec::new();
        if !self.running {
            advisories.push(Advisory::TimeNotRunning);
        }
        if self.elapsed > self.max_time {
            advisories.push(Advisory::TimeOver);
        }
        advisories
    }
}

/// Append-only action log with single-level LIFO undo.
///
/// Undone entries move to an archive, there is no redo.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct EventLog {
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    #[serde(default)]
    pub logs_undone: Vec<LogEntry>,
}

impl EventLog {
    /// # perform an action
    /// apply the action to the sections and log it.
    /// a refused action leaves the sections and the log untouched
    ///
    /// ## Arguments
    /// * `sections` - The sections of the active run
    /// * `action` - The action to perform
    /// * `ctx` - The clock state used for the timestamp and the advisories
    ///
    /// ## Returns
    /// * `Vec<Advisory>` - Warnings to show, the action was performed regardless
    pub fn perform(
        &mut self,
        sections: &mut SectionList,
        action: LogAction,
        ctx: ActionContext,
    ) -> CustomResult<Vec<Advisory>> {
        match action {
            LogAction::SectionComplete => {
                sections.complete_section()?;
            }
            LogAction::LackOfProgress => {
                sections.lack_of_progress();
            }
            LogAction::SkipSection => {
                sections.skip_section()?;
            }
            LogAction::AddElement(kind) => {
                sections.add_element(kind);
            }
            LogAction::RemoveElement(kind) => {
                sections.remove_element(kind)?;
            }
            LogAction::ToggleLastCheckpoint => {
                sections.toggle_last_checkpoint();
            }
        }

        self.logs.push(LogEntry {
            time: ctx.elapsed,
            log: action,
            time_undone: None,
        });
        info!(target: "models/log:perform", "{} at {:.2}s", action, ctx.elapsed);

        let advisories = ctx.advisories();
        for advisory in &advisories {
            warn!(target: "models/log:perform", "{}", advisory);
        }
        Ok(advisories)
    }

    pub fn is_undo_possible(&self) -> bool {
        !self.logs.is_empty()
    }

    /// # undo the last action
    /// revert the most recent logged action and archive its entry
    ///
    /// ## Arguments
    /// * `sections` - The sections of the active run
    /// * `elapsed` - The current run time, stored as `timeUndone`
    ///
    /// ## Returns
    /// * `LogAction` - The action that was reverted
    pub fn undo(&mut self, sections: &mut SectionList, elapsed: f64) -> CustomResult<LogAction> {
        let action = match self.logs.last() {
            Some(entry) => entry.log,
            None => return Err(Error::NothingToUndoError),
        };

        let reverted = match action {
            LogAction::SectionComplete => sections.undo_complete_section(),
            LogAction::LackOfProgress => sections.undo_lack_of_progress(),
            LogAction::SkipSection => sections.undo_skip_section(),
            LogAction::AddElement(kind) => sections.undo_add_element(kind),
            LogAction::RemoveElement(kind) => sections.undo_remove_element(kind),
            LogAction::ToggleLastCheckpoint => {
                sections.toggle_last_checkpoint();
                true
            }
        };

        if !reverted {
            error!(target: "models/log:undo", "sections don't match the log, can't revert {}", action);
            return Err(Error::NothingToUndoError);
        }

        if let Some(mut entry) = self.logs.pop() {
            entry.time_undone = Some(elapsed);
            self.logs_undone.push(entry);
        }
        info!(target: "models/log:undo", "undid {} at {:.2}s", action, elapsed);
        Ok(action)
    }

    /// # net element count
    /// adds minus removes of a kind over the live (not undone) entries
    pub fn net_count(&self, kind: ElementKind) -> i64 {
        self.logs
            .iter()
            .map(|entry| match entry.log {
                LogAction::AddElement(k) if k == kind => 1,
                LogAction::RemoveElement(k) if k == kind => -1,
                _ => 0,
            })
            .sum()
    }
}
