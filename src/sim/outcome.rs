//! Outcome extraction
//!
//! Maps the resting orientation of a body to a discrete label. The label is
//! read from geometry only; no random number is involved here.

use std::fmt;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::body::RigidBody;
use crate::WORLD_UP;

/// A discrete toss result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Outcome {
    /// Die face value, 1-6
    Face(u8),
    Heads,
    Tails,
}

impl Outcome {
    /// Numeric value for summing dice
    pub fn value(&self) -> Option<u32> {
        match self {
            Outcome::Face(v) => Some(*v as u32),
            Outcome::Heads | Outcome::Tails => None,
        }
    }

    /// Stable label used as tally key
    pub fn label(&self) -> String {
        match self {
            Outcome::Face(v) => v.to_string(),
            Outcome::Heads => "heads".to_string(),
            Outcome::Tails => "tails".to_string(),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// One die face: outward normal in body space and the value printed on it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DieFace {
    pub normal: Vec3,
    pub value: u8,
}

/// Fixed table converting body geometry into labels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FaceMapping {
    Die { faces: [DieFace; 6] },
    /// Coin: world-up dot with `heads_axis` >= 0 is heads
    Coin { heads_axis: Vec3 },
}

/// Standard die: opposite faces sum to 7, local +Y shows 3
pub const DIE_MAPPING: FaceMapping = FaceMapping::Die {
    faces: [
        DieFace { normal: Vec3::X, value: 1 },
        DieFace { normal: Vec3::NEG_X, value: 6 },
        DieFace { normal: Vec3::Y, value: 3 },
        DieFace { normal: Vec3::NEG_Y, value: 4 },
        DieFace { normal: Vec3::Z, value: 2 },
        DieFace { normal: Vec3::NEG_Z, value: 5 },
    ],
};

/// Coin: heads on local +Y
pub const COIN_MAPPING: FaceMapping = FaceMapping::Coin { heads_axis: Vec3::Y };

/// Index and world-up alignment of the most upward face.
/// Ties resolve to the first maximal entry.
pub fn upward_face(orientation: Quat, faces: &[DieFace; 6]) -> (usize, f32) {
    let mut best = 0;
    let mut best_dot = f32::NEG_INFINITY;
    for (i, face) in faces.iter().enumerate() {
        let d = (orientation * face.normal).dot(WORLD_UP);
        if d > best_dot {
            best_dot = d;
            best = i;
        }
    }
    (best, best_dot)
}

/// Label for a given orientation. Always returns exactly one label.
pub fn outcome_for_orientation(orientation: Quat, mapping: &FaceMapping) -> Outcome {
    match mapping {
        FaceMapping::Die { faces } => {
            let (i, _) = upward_face(orientation, faces);
            Outcome::Face(faces[i].value)
        }
        FaceMapping::Coin { heads_axis } => {
            if (orientation * *heads_axis).dot(WORLD_UP) >= 0.0 {
                Outcome::Heads
            } else {
                Outcome::Tails
            }
        }
    }
}

/// Label for a settled body
#[inline]
pub fn extract_outcome(body: &RigidBody, mapping: &FaceMapping) -> Outcome {
    outcome_for_orientation(body.orientation, mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn die_faces() -> [DieFace; 6] {
        match DIE_MAPPING {
            FaceMapping::Die { faces } => faces,
            FaceMapping::Coin { .. } => unreachable!(),
        }
    }

    #[test]
    fn test_identity_shows_three() {
        assert_eq!(outcome_for_orientation(Quat::IDENTITY, &DIE_MAPPING), Outcome::Face(3));
    }

    #[test]
    fn test_rotations_select_face() {
        // +X rotated onto +Y
        let q = Quat::from_rotation_z(FRAC_PI_2);
        assert_eq!(outcome_for_orientation(q, &DIE_MAPPING), Outcome::Face(1));
        // -Z rotated onto +Y
        let q = Quat::from_rotation_x(FRAC_PI_2);
        assert_eq!(outcome_for_orientation(q, &DIE_MAPPING), Outcome::Face(5));
        // upside down
        let q = Quat::from_rotation_x(PI);
        assert_eq!(outcome_for_orientation(q, &DIE_MAPPING), Outcome::Face(4));
    }

    #[test]
    fn test_opposite_faces_sum_to_seven() {
        let faces = die_faces();
        for a in &faces {
            let opposite = faces
                .iter()
                .find(|b| (a.normal + b.normal).length() < 1e-6)
                .expect("every face has an opposite");
            assert_eq!(a.value + opposite.value, 7);
        }
    }

    #[test]
    fn test_die_values_are_one_to_six() {
        let mut values: Vec<u8> = die_faces().iter().map(|f| f.value).collect();
        values.sort();
        assert_eq!(values, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_coin_up_axis_down_is_tails() {
        // body-up axis equal to world (0,-1,0)
        let q = Quat::from_rotation_x(PI);
        assert!(((q * Vec3::Y) - Vec3::NEG_Y).length() < 1e-5);
        assert_eq!(outcome_for_orientation(q, &COIN_MAPPING), Outcome::Tails);
        assert_eq!(outcome_for_orientation(Quat::IDENTITY, &COIN_MAPPING), Outcome::Heads);
    }

    #[test]
    fn test_coin_on_edge_is_heads() {
        // dot is exactly zero when standing on edge
        let q = Quat::from_rotation_z(FRAC_PI_2);
        assert_eq!(outcome_for_orientation(q, &COIN_MAPPING), Outcome::Heads);
    }

    #[test]
    fn test_tie_resolves_to_first_maximal_face() {
        // two faces share the up normal exactly
        let mut faces = die_faces();
        faces[0].normal = Vec3::Y;
        faces[2].normal = Vec3::Y;
        let (i, dot) = upward_face(Quat::IDENTITY, &faces);
        assert_eq!(i, 0);
        assert_eq!(dot, 1.0);

        // same tie with the entries swapped keeps the lower index
        faces.swap(0, 2);
        let (i, _) = upward_face(Quat::IDENTITY, &faces);
        assert_eq!(i, 0);
        assert_eq!(faces[i].value, 3);
    }

    #[test]
    fn test_non_finite_orientation_still_labels() {
        let q = Quat::from_xyzw(f32::NAN, 0.0, 0.0, 1.0);
        let label = outcome_for_orientation(q, &DIE_MAPPING);
        assert!(matches!(label, Outcome::Face(1..=6)));
        let label = outcome_for_orientation(q, &COIN_MAPPING);
        assert!(matches!(label, Outcome::Heads | Outcome::Tails));
    }

    fn arb_quat() -> impl Strategy<Value = Quat> {
        (-1.0f32..1.0, -1.0f32..1.0, -1.0f32..1.0, -1.0f32..1.0)
            .prop_filter("non-degenerate", |(x, y, z, w)| {
                x * x + y * y + z * z + w * w > 1e-3
            })
            .prop_map(|(x, y, z, w)| Quat::from_xyzw(x, y, z, w).normalize())
    }

    proptest! {
        #[test]
        fn prop_extraction_is_pure(q in arb_quat()) {
            prop_assert_eq!(
                outcome_for_orientation(q, &DIE_MAPPING),
                outcome_for_orientation(q, &DIE_MAPPING)
            );
            prop_assert_eq!(
                outcome_for_orientation(q, &COIN_MAPPING),
                outcome_for_orientation(q, &COIN_MAPPING)
            );
        }

        #[test]
        fn prop_top_and_bottom_sum_to_seven(q in arb_quat()) {
            let top = outcome_for_orientation(q, &DIE_MAPPING).value().unwrap();
            // face resting on the floor
            let faces = die_faces();
            let mut worst = 0;
            let mut worst_dot = f32::INFINITY;
            for (i, f) in faces.iter().enumerate() {
                let d = (q * f.normal).dot(WORLD_UP);
                if d < worst_dot {
                    worst_dot = d;
                    worst = i;
                }
            }
            prop_assert_eq!(top + faces[worst].value as u32, 7);
        }

        #[test]
        fn prop_coin_follows_axis_sign(q in arb_quat()) {
            let d = (q * Vec3::Y).dot(WORLD_UP);
            let expected = if d >= 0.0 { Outcome::Heads } else { Outcome::Tails };
            prop_assert_eq!(outcome_for_orientation(q, &COIN_MAPPING), expected);
        }
    }
}
