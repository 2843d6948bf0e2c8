use serde::{Deserialize, Serialize};

use crate::modules::helpers::math::Math;
use crate::modules::models::run::{Competition, EvacuationPoint, Run};
use crate::modules::models::section::Section;

const POINTS_TILE_FIRST_TRY: u32 = 5;
const POINTS_TILE_SECOND_TRY: u32 = 3;
const POINTS_TILE_THIRD_TRY: u32 = 1;
const POINTS_GAP: u32 = 10;
const POINTS_OBSTACLE: u32 = 15;
const POINTS_SPEEDBUMP: u32 = 5;
const POINTS_RAMP: u32 = 0;
const POINTS_INTERSECTION: u32 = 10;

const MULTIPLIER_PRECISION: i32 = 10;

/// Raw score and multipliers of a run. The weighted total is computed by the
/// receiving side.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Scoring {
    pub score: u32,
    pub multipliers: Vec<f64>,
    pub multiplier: f64,
}

impl Scoring {
    pub fn zero() -> Scoring {
        Scoring {
            score: 0,
            multipliers: Vec::new(),
            multiplier: 1.0,
        }
    }
}

pub struct ScoreCalculator {}

impl ScoreCalculator {
    /// # score a run
    /// compute the raw score and the multipliers of a finished run.
    /// a team that did not start scores zero without any multiplier
    ///
    /// ## Arguments
    /// * `run` - The run to score
    ///
    /// ## Returns
    /// * `Scoring` - The score, the multiplier terms and their product
    pub fn score(run: &Run) -> Scoring {
        if !run.team_started {
            return Scoring::zero();
        }

        let score = run
            .sections
            .iter()
            .map(ScoreCalculator::section_points)
            .fold(0u32, u32::saturating_add);

        let last = run.sections.current();
        let lops_after_last_checkpoint = if last.is_after_last_checkpoint { last.lops } else { 0 };

        let living = run.victims.living_victims;
        let dead = run.victims.total_dead();
        let mut multipliers = Vec::new();

        match run.competition {
            Competition::Entry => {
                let deduction = 0.05 * lops_after_last_checkpoint as f64;
                multipliers.push(ScoreCalculator::multiplier_term(1.4, living, deduction));
                if dead > 0 {
                    let base = if living == 0 { 1.2 } else { 1.4 };
                    multipliers.push(ScoreCalculator::multiplier_term(base, dead, deduction));
                }
            }
            Competition::Line => {
                let low = run.evacuation_point == EvacuationPoint::Low;
                let deduction = (if low { 0.025 } else { 0.05 }) * lops_after_last_checkpoint as f64;
                let base = if low { 1.2 } else { 1.4 };
                multipliers.push(ScoreCalculator::multiplier_term(base, living, deduction));
                // dead victims only count once both living victims are rescued
                if living == 2 {
                    multipliers.push(ScoreCalculator::multiplier_term(base, dead, deduction));
                }
            }
        }

        let multiplier = Math::round_float_to_n_decimals(Math::product(&multipliers), MULTIPLIER_PRECISION);
        Scoring {
            score,
            multipliers,
            multiplier,
        }
    }

    /// # points of a section
    /// tiles only count for completed sections, scoring elements always count.
    /// saturates at `u32::MAX`
    pub fn section_points(section: &Section) -> u32 {
        let tiles = if section.completed_section { section.tiles.unwrap_or(0) } else { 0 };
        [
            (tiles, ScoreCalculator::points_per_tile(section.lops)),
            (section.gaps, POINTS_GAP),
            (section.obstacles, POINTS_OBSTACLE),
            (section.speedbumps, POINTS_SPEEDBUMP),
            (section.ramps, POINTS_RAMP),
            (section.intersections, POINTS_INTERSECTION),
        ]
        .iter()
        .fold(0u32, |points, (count, per_item)| points.saturating_add(count.saturating_mul(*per_item)))
    }

    pub fn points_per_tile(lops: u32) -> u32 {
        match lops {
            0 => POINTS_TILE_FIRST_TRY,
            1 => POINTS_TILE_SECOND_TRY,
            2 => POINTS_TILE_THIRD_TRY,
            _ => 0,
        }
    }

    /// `max(1, max(1, base - deduction) ^ count)` rounded to 10 digits
    pub fn multiplier_term(base: f64, count: u32, deduction: f64) -> f64 {
        let exponent = i32::try_from(count).unwrap_or(i32::MAX);
        let term = (base - deduction).max(1.0).powi(exponent).max(1.0);
        Math::round_float_to_n_decimals(term, MULTIPLIER_PRECISION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::models::run::{Referee, Victims};
    use crate::modules::models::section::ElementKind;

    fn run(competition: Competition, evacuation_point: EvacuationPoint) -> Run {
        Run::new(Referee::default(), competition, "A", "Round 1", "Bots", evacuation_point)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn not_started_scores_zero() {
        let mut run = run(Competition::Entry, EvacuationPoint::Low);
        run.sections.add_element(ElementKind::Obstacle);
        run.victims.living_victims = 3;
        run.team_started = false;
        assert_eq!(ScoreCalculator::score(&run), Scoring::zero());
    }

    #[test]
    fn entry_scenario() {
        let mut run = run(Competition::Entry, EvacuationPoint::Low);
        run.sections.current_mut().tiles = Some(5);
        run.sections.complete_section().unwrap();
        run.victims = Victims {
            dead_victims_before_all_living_victims: 0,
            living_victims: 2,
            dead_victims_after_all_living_victims: 1,
        };

        let scoring = ScoreCalculator::score(&run);
        assert_eq!(scoring.score, 25);
        assert_eq!(scoring.multipliers, vec![1.96, 1.2]);
        assert!(close(scoring.multiplier, 2.352));
    }

    #[test]
    fn entry_dead_without_living_uses_lower_base() {
        let mut run = run(Competition::Entry, EvacuationPoint::Low);
        run.victims.dead_victims_before_all_living_victims = 2;
        let scoring = ScoreCalculator::score(&run);
        assert_eq!(scoring.multipliers, vec![1.0, 1.44]);
        assert!(close(scoring.multiplier, 1.44));
    }

    #[test]
    fn line_low_scenario() {
        let mut run = run(Competition::Line, EvacuationPoint::Low);
        run.sections.toggle_last_checkpoint();
        run.sections.lack_of_progress();
        run.victims = Victims {
            dead_victims_before_all_living_victims: 1,
            living_victims: 2,
            dead_victims_after_all_living_victims: 1,
        };

        let scoring = ScoreCalculator::score(&run);
        assert_eq!(scoring.score, 0);
        assert_eq!(scoring.multipliers, vec![1.380625, 1.380625]);
        assert!(close(scoring.multiplier, 1.9061253906));
    }

    #[test]
    fn line_dead_only_count_with_two_living() {
        let mut run = run(Competition::Line, EvacuationPoint::High);
        run.victims.living_victims = 1;
        run.victims.dead_victims_after_all_living_victims = 3;
        let scoring = ScoreCalculator::score(&run);
        assert_eq!(scoring.multipliers, vec![1.4]);
        assert!(close(scoring.multiplier, 1.4));
    }

    #[test]
    fn deduction_never_drops_below_one() {
        assert_eq!(ScoreCalculator::multiplier_term(1.2, 3, 0.5), 1.0);
        assert_eq!(ScoreCalculator::multiplier_term(1.4, 0, 0.0), 1.0);
    }

    #[test]
    fn huge_counts_saturate() {
        let mut run = run(Competition::Line, EvacuationPoint::Low);
        run.sections.current_mut().tiles = Some(1_000_000_000);
        run.sections.complete_section().unwrap();
        run.sections.current_mut().gaps = u32::MAX;
        assert_eq!(ScoreCalculator::score(&run).score, u32::MAX);

        let term = ScoreCalculator::multiplier_term(1.2, u32::MAX, 0.0);
        assert!(term >= 1.0);
        assert_eq!(ScoreCalculator::multiplier_term(1.2, u32::MAX, 0.5), 1.0);
    }

    #[test]
    fn points_per_try_and_elements() {
        let mut run = run(Competition::Line, EvacuationPoint::Low);
        run.sections.current_mut().tiles = Some(4);
        run.sections.lack_of_progress();
        run.sections.add_element(ElementKind::Gap);
        run.sections.add_element(ElementKind::Speedbump);
        run.sections.add_element(ElementKind::Ramp);
        run.sections.complete_section().unwrap();

        // section 2 aborted: elements count, tiles don't
        run.sections.current_mut().tiles = Some(10);
        run.sections.add_element(ElementKind::Intersection);

        // 4 tiles at the second try + gap + speedbump + ramp + intersection
        assert_eq!(ScoreCalculator::score(&run).score, 12 + 10 + 5 + 0 + 10);
        assert_eq!(ScoreCalculator::points_per_tile(3), 0);
    }
}
