use serde::{Deserialize, Serialize};

use crate::geo::Degrees;

/// How close the heading must be to the target bearing to count as aligned
pub const DEFAULT_ALIGNMENT_THRESHOLD: Degrees = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, specta::Type)]
/// Which way the user should turn to face the target
pub enum TurnDirection {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, specta::Type)]
/// Result of comparing the device heading against the bearing to the target.
///
/// `turn_direction` is [Option::None] exactly when `is_aligned` is true.
pub struct AlignmentState {
    /// Heading is within the threshold of the target bearing
    pub is_aligned: bool,
    /// Direction to turn, absent when aligned
    pub turn_direction: Option<TurnDirection>,
    /// Angle to turn through in the given direction, 0 to 180
    pub turn_angle_degrees: Degrees,
}

impl AlignmentState {
    /// Compare `heading` against `target_bearing` (both in `[0, 360)`), counting anything
    /// within `threshold` degrees either way as aligned. The boundary is inclusive.
    pub fn evaluate(heading: Degrees, target_bearing: Degrees, threshold: Degrees) -> Self {
        let diff = (heading - target_bearing).abs();
        let circular_diff = diff.min(360.0 - diff);
        let is_aligned = circular_diff <= threshold;

        // Signed turn normalized into (-180, 180], positive means clockwise
        let mut signed = target_bearing - heading;
        if signed > 180.0 {
            signed -= 360.0;
        } else if signed <= -180.0 {
            signed += 360.0;
        }

        let turn_direction = if is_aligned {
            None
        } else if signed > 0.0 {
            Some(TurnDirection::Right)
        } else {
            Some(TurnDirection::Left)
        };

        Self {
            is_aligned,
            turn_direction,
            turn_angle_degrees: signed.abs(),
        }
    }

    /// [AlignmentState::evaluate] with [DEFAULT_ALIGNMENT_THRESHOLD]
    pub fn evaluate_default(heading: Degrees, target_bearing: Degrees) -> Self {
        Self::evaluate(heading, target_bearing, DEFAULT_ALIGNMENT_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headings() -> impl Iterator<Item = Degrees> {
        (0..72).map(|i| i as f64 * 5.0 + 0.5)
    }

    #[test]
    fn test_same_heading_always_aligned() {
        for heading in headings() {
            for threshold in [0.0, 1.0, 20.0, 179.0] {
                let state = AlignmentState::evaluate(heading, heading, threshold);
                assert!(state.is_aligned, "{heading} vs itself not aligned at {threshold}");
                assert_eq!(state.turn_direction, None);
            }
        }
    }

    #[test]
    fn test_opposite_heading_never_aligned() {
        for heading in headings() {
            let opposite = (heading + 180.0) % 360.0;
            for threshold in [0.0, 20.0, 90.0, 179.9] {
                let state = AlignmentState::evaluate(heading, opposite, threshold);
                assert!(
                    !state.is_aligned,
                    "{heading} vs {opposite} aligned at {threshold}"
                );
            }
        }
    }

    #[test]
    fn test_direction_iff_not_aligned() {
        for heading in headings() {
            for bearing in headings() {
                let state = AlignmentState::evaluate_default(heading, bearing);
                assert_eq!(
                    state.turn_direction.is_none(),
                    state.is_aligned,
                    "heading {heading}, bearing {bearing}: {state:?}"
                );
                assert!((0.0..=180.0).contains(&state.turn_angle_degrees));

                if !state.is_aligned {
                    assert!(state.turn_angle_degrees > 0.0);
                    let clockwise = (bearing - heading).rem_euclid(360.0);
                    let expected = if clockwise > 0.0 && clockwise <= 180.0 {
                        TurnDirection::Right
                    } else {
                        TurnDirection::Left
                    };
                    assert_eq!(
                        state.turn_direction,
                        Some(expected),
                        "heading {heading}, bearing {bearing}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_small_offset_aligned() {
        let state = AlignmentState::evaluate(0.0, 10.0, 20.0);
        assert!(state.is_aligned);
        assert_eq!(state.turn_direction, None);
    }

    #[test]
    fn test_quarter_turn_right() {
        let state = AlignmentState::evaluate(0.0, 90.0, 20.0);
        assert!(!state.is_aligned);
        assert_eq!(state.turn_direction, Some(TurnDirection::Right));
        assert_eq!(state.turn_angle_degrees, 90.0);
    }

    #[test]
    fn test_quarter_turn_left() {
        let state = AlignmentState::evaluate(90.0, 0.0, 20.0);
        assert_eq!(state.turn_direction, Some(TurnDirection::Left));
        assert_eq!(state.turn_angle_degrees, 90.0);
    }

    #[test]
    fn test_boundary_across_north_inclusive() {
        let state = AlignmentState::evaluate(350.0, 10.0, 20.0);
        assert!(state.is_aligned);
        assert_eq!(state.turn_direction, None);
        assert_eq!(state.turn_angle_degrees, 20.0);
    }

    #[test]
    fn test_shortest_turn_wraps_north() {
        let state = AlignmentState::evaluate(10.0, 300.0, 20.0);
        assert_eq!(state.turn_direction, Some(TurnDirection::Left));
        assert_eq!(state.turn_angle_degrees, 70.0);

        let state = AlignmentState::evaluate(300.0, 10.0, 20.0);
        assert_eq!(state.turn_direction, Some(TurnDirection::Right));
        assert_eq!(state.turn_angle_degrees, 70.0);
    }

    #[test]
    fn test_half_turn_goes_right() {
        // -180 normalizes to +180
        let state = AlignmentState::evaluate(180.0, 0.0, 20.0);
        assert_eq!(state.turn_direction, Some(TurnDirection::Right));
        assert_eq!(state.turn_angle_degrees, 180.0);
    }
}
