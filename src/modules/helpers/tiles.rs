use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::errors::{CustomResult, Error};
use crate::modules::models::section::{Section, SectionList};

/// id of the start tile
pub const TILE_ID_OFFSET: i64 = 1;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TileInputMode {
    /// the number of tiles is entered per section
    TilesPerSection,
    /// the id of the last tile of every section is entered
    TileIds,
}

/// Non-blocking warning about a suspicious tile count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileWarning {
    pub section_id: u32,
    pub mode: TileInputMode,
}

impl fmt::Display for TileWarning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.mode {
            TileInputMode::TilesPerSection => {
                write!(f, "Number of tiles in section {} too low.", self.section_id)
            }
            TileInputMode::TileIds => write!(
                f,
                "Tile Id in section {} must be larger than in previous section.",
                self.section_id
            ),
        }
    }
}

pub struct TileAccounting {}

impl TileAccounting {
    /// # apply tile input
    /// compute the tile count of every section that is not after the last checkpoint.
    /// counts are floored at 0, a count below 1 produces a warning but is still stored.
    /// a count that doesn't fit a tile counter refuses the whole input
    ///
    /// ## Arguments
    /// * `sections` - The sections of the run
    /// * `mode` - How the values were entered
    /// * `values` - One value per section before the last checkpoint, in order
    ///
    /// ## Returns
    /// * `Vec<TileWarning>` - The warnings to show, empty when everything looks fine
    pub fn apply(sections: &mut SectionList, mode: TileInputMode, values: &[i64]) -> CustomResult<Vec<TileWarning>> {
        let mut previous = TILE_ID_OFFSET;
        let mut counts = Vec::with_capacity(values.len());
        for value in values.iter().copied() {
            let tiles = match mode {
                TileInputMode::TilesPerSection => value,
                TileInputMode::TileIds => value.saturating_sub(previous),
            };
            previous = value;

            let stored = u32::try_from(tiles.max(0)).map_err(|_| {
                warn!(target: "helpers/tiles:apply", "refused {} tiles", tiles);
                Error::InvalidReviewValueError {
                    field: "tiles".to_string(),
                }
            })?;
            counts.push((tiles, stored));
        }

        let mut warnings = Vec::new();
        let counted = sections.iter_mut().filter(|s| !s.is_after_last_checkpoint);
        for (section, (tiles, stored)) in counted.zip(counts) {
            section.tiles = Some(stored);
            if tiles < 1 {
                warn!(target: "helpers/tiles:apply", "section {} has {} tiles", section.section_id, tiles);
                warnings.push(TileWarning { section_id: section.section_id, mode });
            }
        }

        Ok(warnings)
    }

    /// # prefilled input values
    /// the values to show in the tile inputs for the given mode.
    /// tile ids are the running sum of tiles starting at the start tile
    pub fn input_values(sections: &SectionList, mode: TileInputMode) -> Vec<(u32, i64)> {
        let mut tile_sum = TILE_ID_OFFSET;
        sections
            .iter()
            .filter(|s| !s.is_after_last_checkpoint)
            .map(|s| {
                let tiles = s.tiles.unwrap_or(0) as i64;
                tile_sum += tiles;
                match mode {
                    TileInputMode::TilesPerSection => (s.section_id, tiles),
                    TileInputMode::TileIds => (s.section_id, tile_sum),
                }
            })
            .collect()
    }

    /// # try label
    /// describe how a section ended, `1st try`, `skipped`, `aborted` ...
    pub fn try_label(section: &Section) -> String {
        if section.completed_section {
            let tries = section.lops.saturating_add(1);
            let suffix = match tries {
                1 => "st",
                2 => "nd",
                3 => "rd",
                _ => "th",
            };
            format!("{}{} try", tries, suffix)
        } else if section.skipped_section {
            "skipped".to_string()
        } else {
            "aborted".to_string()
        }
    }

    /// sum of tiles over the counted sections
    pub fn total_tiles(sections: &SectionList) -> u32 {
        sections
            .iter()
            .filter(|s| !s.is_after_last_checkpoint)
            .fold(0u32, |total, s| total.saturating_add(s.tiles.unwrap_or(0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_sections() -> SectionList {
        let mut sections = SectionList::default();
        sections.complete_section().unwrap();
        sections.complete_section().unwrap();
        sections
    }

    #[test]
    fn tiles_per_section_floor_and_warn() {
        let mut sections = three_sections();
        let warnings = TileAccounting::apply(&mut sections, TileInputMode::TilesPerSection, &[4, 0, -2]).unwrap();
        let tiles: Vec<Option<u32>> = sections.iter().map(|s| s.tiles).collect();
        assert_eq!(tiles, vec![Some(4), Some(0), Some(0)]);
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].section_id, 2);
    }

    #[test]
    fn tile_ids_are_cumulative() {
        let mut sections = three_sections();
        let warnings = TileAccounting::apply(&mut sections, TileInputMode::TileIds, &[6, 10, 9]).unwrap();
        let tiles: Vec<Option<u32>> = sections.iter().map(|s| s.tiles).collect();
        assert_eq!(tiles, vec![Some(5), Some(4), Some(0)]);
        assert_eq!(
            warnings,
            vec![TileWarning { section_id: 3, mode: TileInputMode::TileIds }]
        );
        assert_eq!(
            warnings[0].to_string(),
            "Tile Id in section 3 must be larger than in previous section."
        );
    }

    #[test]
    fn after_last_checkpoint_is_excluded() {
        let mut sections = three_sections();
        sections.toggle_last_checkpoint();
        let warnings = TileAccounting::apply(&mut sections, TileInputMode::TilesPerSection, &[3, 2, 7]).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(sections.current().tiles, None);
        assert_eq!(TileAccounting::total_tiles(&sections), 5);
    }

    #[test]
    fn input_values_round_trip_tile_ids() {
        let mut sections = three_sections();
        TileAccounting::apply(&mut sections, TileInputMode::TilesPerSection, &[3, 2, 7]).unwrap();
        let ids = TileAccounting::input_values(&sections, TileInputMode::TileIds);
        assert_eq!(ids, vec![(1, 4), (2, 6), (3, 13)]);
    }

    #[test]
    fn oversized_counts_are_refused() {
        let mut sections = three_sections();
        let result = TileAccounting::apply(&mut sections, TileInputMode::TilesPerSection, &[3, 4_294_967_296, 1]);
        assert!(matches!(result, Err(Error::InvalidReviewValueError { .. })));
        assert!(sections.iter().all(|s| s.tiles.is_none()));

        let result = TileAccounting::apply(&mut sections, TileInputMode::TileIds, &[i64::MIN, i64::MAX]);
        assert!(result.is_err());

        let warnings = TileAccounting::apply(&mut sections, TileInputMode::TilesPerSection, &[u32::MAX as i64]).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(sections.iter().next().and_then(|s| s.tiles), Some(u32::MAX));
    }

    #[test]
    fn try_labels() {
        let mut section = Section::new(1);
        assert_eq!(TileAccounting::try_label(&section), "aborted");
        section.completed_section = true;
        section.lops = 1;
        assert_eq!(TileAccounting::try_label(&section), "2nd try");
        section.completed_section = false;
        section.skipped_section = true;
        assert_eq!(TileAccounting::try_label(&section), "skipped");
    }
}
