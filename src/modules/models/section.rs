use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::errors::{CustomResult, Error};

/// The scoring elements a robot can pass inside a section.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Gap,
    Obstacle,
    Speedbump,
    Ramp,
    Intersection,
}

impl ElementKind {
    pub const ALL: [ElementKind; 5] = [
        ElementKind::Gap,
        ElementKind::Obstacle,
        ElementKind::Speedbump,
        ElementKind::Ramp,
        ElementKind::Intersection,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Gap => "gap",
            ElementKind::Obstacle => "obstacle",
            ElementKind::Speedbump => "speedbump",
            ElementKind::Ramp => "ramp",
            ElementKind::Intersection => "intersection",
        }
    }

    /// name of the matching counter on a section (`gaps`, `obstacles`, ...)
    pub fn field_name(&self) -> &'static str {
        match self {
            ElementKind::Gap => "gaps",
            ElementKind::Obstacle => "obstacles",
            ElementKind::Speedbump => "speedbumps",
            ElementKind::Ramp => "ramps",
            ElementKind::Intersection => "intersections",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ElementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ElementKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown scoring element: {}", s))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub section_id: u32,
    pub completed_section: bool,
    pub skipped_section: bool,
    pub lops: u32,
    pub is_after_last_checkpoint: bool,
    pub gaps: u32,
    pub obstacles: u32,
    pub speedbumps: u32,
    pub ramps: u32,
    pub intersections: u32,
    pub tiles: Option<u32>,
}

impl Section {
    pub fn new(section_id: u32) -> Section {
        Section {
            section_id,
            completed_section: false,
            skipped_section: false,
            lops: 0,
            is_after_last_checkpoint: false,
            gaps: 0,
            obstacles: 0,
            speedbumps: 0,
            ramps: 0,
            intersections: 0,
            tiles: None,
        }
    }

    pub fn count(&self, kind: ElementKind) -> u32 {
        match kind {
            ElementKind::Gap => self.gaps,
            ElementKind::Obstacle => self.obstacles,
            ElementKind::Speedbump => self.speedbumps,
            ElementKind::Ramp => self.ramps,
            ElementKind::Intersection => self.intersections,
        }
    }

    pub fn count_mut(&mut self, kind: ElementKind) -> &mut u32 {
        match kind {
            ElementKind::Gap => &mut self.gaps,
            ElementKind::Obstacle => &mut self.obstacles,
            ElementKind::Speedbump => &mut self.speedbumps,
            ElementKind::Ramp => &mut self.ramps,
            ElementKind::Intersection => &mut self.intersections,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        !self.completed_section && !self.skipped_section
    }
}

/// Ordered, never empty list of sections.
///
/// The last element is the current section. Only completing or skipping a
/// section moves the cursor, by appending a fresh section.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(try_from = "Vec<Section>", into = "Vec<Section>")]
pub struct SectionList {
    sections: Vec<Section>,
}

impl Default for SectionList {
    fn default() -> Self {
        SectionList {
            sections: vec![Section::new(1)],
        }
    }
}

impl TryFrom<Vec<Section>> for SectionList {
    type Error = String;

    fn try_from(sections: Vec<Section>) -> Result<Self, Self::Error> {
        if sections.is_empty() {
            return Err("a run needs at least one section".to_string());
        }
        Ok(SectionList { sections })
    }
}

impl From<SectionList> for Vec<Section> {
    fn from(list: SectionList) -> Self {
        list.sections
    }
}

impl SectionList {
    pub fn as_slice(&self) -> &[Section] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn current(&self) -> &Section {
        // the list is never empty, see TryFrom and the undo guards
        &self.sections[self.sections.len() - 1]
    }

    pub fn current_mut(&mut self) -> &mut Section {
        let last = self.sections.len() - 1;
        &mut self.sections[last]
    }

    pub fn get(&self, section_id: u32) -> Option<&Section> {
        self.sections.iter().find(|s| s.section_id == section_id)
    }

    pub fn get_mut(&mut self, section_id: u32) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.section_id == section_id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Section> {
        self.sections.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Section> {
        self.sections.iter_mut()
    }

    /// total of one element kind over all sections
    pub fn total(&self, kind: ElementKind) -> u32 {
        self.sections.iter().map(|s| s.count(kind)).sum()
    }

    fn append_section(&mut self) {
        let next_id = self.sections.iter().map(|s| s.section_id).max().unwrap_or(0) + 1;
        self.sections.push(Section::new(next_id));
    }

    /// drops the last section, never the only one
    fn pop_section(&mut self) -> bool {
        if self.sections.len() < 2 {
            return false;
        }
        self.sections.pop();
        true
    }

    /************ ACTIONS ************/

    /// # complete the current section
    /// refused after the last checkpoint
    ///
    /// ## Returns
    /// * `u32` - The id of the section that became current
    pub fn complete_section(&mut self) -> CustomResult<u32> {
        if self.current().is_after_last_checkpoint {
            warn!(target: "models/section:complete", "refused: section {} is after last checkpoint", self.current().section_id);
            return Err(Error::AfterLastCheckpointError);
        }

        self.current_mut().completed_section = true;
        self.append_section();
        Ok(self.current().section_id)
    }

    pub fn lack_of_progress(&mut self) -> u32 {
        let current = self.current_mut();
        current.lops = current.lops.saturating_add(1);
        current.lops
    }

    /// # skip the current section
    /// only allowed once the third try has started (2 lops) and never after
    /// the last checkpoint. the skip itself counts as one more lop
    ///
    /// ## Returns
    /// * `u32` - The id of the section that became current
    pub fn skip_section(&mut self) -> CustomResult<u32> {
        let current = self.current();
        if current.is_after_last_checkpoint {
            warn!(target: "models/section:skip", "refused: section {} is after last checkpoint", current.section_id);
            return Err(Error::AfterLastCheckpointError);
        }
        if current.lops < 2 {
            warn!(target: "models/section:skip", "refused: section {} has only {} lops", current.section_id, current.lops);
            return Err(Error::SkipNotAllowedError { lops: current.lops });
        }

        let current = self.current_mut();
        current.lops = current.lops.saturating_add(1);
        current.skipped_section = true;
        self.append_section();
        Ok(self.current().section_id)
    }

    pub fn toggle_last_checkpoint(&mut self) -> bool {
        let current = self.current_mut();
        current.is_after_last_checkpoint = !current.is_after_last_checkpoint;
        current.is_after_last_checkpoint
    }

    pub fn add_element(&mut self, kind: ElementKind) -> u32 {
        let count = self.current_mut().count_mut(kind);
        *count = count.saturating_add(1);
        *count
    }

    /// # remove an element
    /// the counter never goes below zero, removing from an empty counter is refused
    pub fn remove_element(&mut self, kind: ElementKind) -> CustomResult<u32> {
        let count = self.current_mut().count_mut(kind);
        if *count == 0 {
            debug!(target: "models/section:remove_element", "no {} to remove", kind);
            return Err(Error::NothingToRemoveError { kind });
        }
        *count -= 1;
        Ok(*count)
    }

    /************ INVERSES ************/

    pub(crate) fn undo_complete_section(&mut self) -> bool {
        if !self.pop_section() {
            return false;
        }
        self.current_mut().completed_section = false;
        true
    }

    pub(crate) fn undo_lack_of_progress(&mut self) -> bool {
        let current = self.current_mut();
        if current.lops == 0 {
            return false;
        }
        current.lops -= 1;
        true
    }

    pub(crate) fn undo_skip_section(&mut self) -> bool {
        if !self.pop_section() {
            return false;
        }
        let current = self.current_mut();
        current.skipped_section = false;
        current.lops = current.lops.saturating_sub(1);
        true
    }

    pub(crate) fn undo_add_element(&mut self, kind: ElementKind) -> bool {
        let count = self.current_mut().count_mut(kind);
        if *count == 0 {
            return false;
        }
        *count -= 1;
        true
    }

    pub(crate) fn undo_remove_element(&mut self, kind: ElementKind) -> bool {
        let count = self.current_mut().count_mut(kind);
        *count = count.saturating_add(1);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_appends_next_section() {
        let mut sections = SectionList::default();
        assert_eq!(sections.complete_section().unwrap(), 2);
        assert!(sections.as_slice()[0].completed_section);
        assert!(sections.current().is_in_progress());
        assert_eq!(sections.len(), 2);
    }

    #[test]
    fn complete_refused_after_last_checkpoint() {
        let mut sections = SectionList::default();
        sections.toggle_last_checkpoint();
        let before = sections.clone();
        assert!(matches!(sections.complete_section(), Err(Error::AfterLastCheckpointError)));
        assert_eq!(sections, before);
    }

    #[test]
    fn skip_needs_two_lops() {
        let mut sections = SectionList::default();
        sections.lack_of_progress();
        let before = sections.clone();
        assert!(matches!(sections.skip_section(), Err(Error::SkipNotAllowedError { lops: 1 })));
        assert_eq!(sections, before);

        sections.lack_of_progress();
        assert_eq!(sections.skip_section().unwrap(), 2);
        let skipped = &sections.as_slice()[0];
        assert!(skipped.skipped_section);
        assert_eq!(skipped.lops, 3);
    }

    #[test]
    fn toggle_twice_is_identity() {
        let mut sections = SectionList::default();
        assert!(sections.toggle_last_checkpoint());
        assert!(!sections.toggle_last_checkpoint());
        assert_eq!(sections, SectionList::default());
    }

    #[test]
    fn remove_element_floors_at_zero() {
        let mut sections = SectionList::default();
        assert!(sections.remove_element(ElementKind::Gap).is_err());
        sections.add_element(ElementKind::Gap);
        assert_eq!(sections.remove_element(ElementKind::Gap).unwrap(), 0);
        assert_eq!(sections.current().gaps, 0);
    }

    #[test]
    fn section_ids_keep_increasing() {
        let mut sections = SectionList::default();
        sections.complete_section().unwrap();
        sections.complete_section().unwrap();
        let ids: Vec<u32> = sections.iter().map(|s| s.section_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn never_pops_the_only_section() {
        let mut sections = SectionList::default();
        assert!(!sections.undo_complete_section());
        assert!(!sections.undo_skip_section());
        assert_eq!(sections.len(), 1);
    }

    #[test]
    fn empty_list_does_not_deserialize() {
        let parsed: Result<SectionList, _> = serde_json::from_str("[]");
        assert!(parsed.is_err());
    }

    #[test]
    fn serializes_with_wire_names() {
        let json = serde_json::to_value(Section::new(1)).unwrap();
        assert_eq!(json["sectionId"], 1);
        assert_eq!(json["isAfterLastCheckpoint"], false);
        assert!(json["tiles"].is_null());
    }
}
