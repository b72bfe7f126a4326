//! Fair Toss - physics-driven dice roll and coin flip
//!
//! Core modules:
//! - `sim`: Rigid-body simulation, toss lifecycle and outcome extraction
//! - `renderer`: Render surface seam and WebGPU SDF pipeline
//! - `history`: Bounded roll history with per-label tallies
//! - `settings`: Engine tunables and user preferences

pub mod history;
pub mod renderer;
pub mod settings;
pub mod sim;

pub use history::HistoryLedger;
pub use settings::{EngineConfig, QualityPreset, Settings};
pub use sim::{
    LaunchOutcome, ObjectKind, Outcome, RollAck, RollRecord, SessionError, SessionEvent,
    SimulationSession,
};

use glam::{Quat, Vec3};
use rand::Rng;

/// Engine configuration constants
pub mod consts {
    /// Fixed simulation timestep, one step per display frame
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Solver iterations per step
    pub const SOLVER_ITERATIONS: u32 = 10;
    /// Gravity along world Y (units/s²)
    pub const GRAVITY_Y: f32 = -20.81;

    /// Maximum bodies in one toss (renderer uniform array size)
    pub const MAX_BODIES: usize = 8;

    /// Arena half-width on X and Z
    pub const ARENA_HALF_SIZE: f32 = 6.0;
    /// Boundary wall height
    pub const WALL_HEIGHT: f32 = 12.0;
    /// Boundary wall thickness
    pub const WALL_THICKNESS: f32 = 1.0;

    /// Die half extent (die is a cube of side 1)
    pub const DIE_HALF_EXTENT: f32 = 0.5;
    pub const DIE_MASS: f32 = 1.0;
    /// Coin dimensions
    pub const COIN_RADIUS: f32 = 0.9;
    pub const COIN_HEIGHT: f32 = 0.16;
    pub const COIN_MASS: f32 = 0.4;

    /// Bodies below this height have tunneled through the floor
    pub const SANITY_FLOOR: f32 = -10.0;
    /// Where a tunneled body is put back
    pub const RESPAWN_POINT: [f32; 3] = [0.0, 5.0, 0.0];
    /// Height of the first row of freshly created bodies
    pub const SPAWN_HEIGHT: f32 = 2.0;

    /// Rest poll period (ms), coarser than a display frame
    pub const REST_POLL_MS: f64 = 150.0;
    /// Upper bound on a toss before a best-effort settle is forced (ms)
    pub const SETTLE_TIMEOUT_MS: f64 = 8000.0;
    /// Linear speed below which a body may count as settled
    pub const REST_LINEAR_EPS: f32 = 0.05;
    /// Angular speed below which a body may count as settled
    pub const REST_ANGULAR_EPS: f32 = 0.1;
    /// Allowed height above a body's flat resting height
    pub const REST_HEIGHT_MARGIN: f32 = 0.25;
    /// A die whose best face is less aligned than this is cocked
    pub const COCKED_DOT: f32 = 0.9;
    /// Cocked-die nudges per toss before the best face is accepted
    pub const MAX_NUDGES: u32 = 3;

    /// Entries kept in the roll history
    pub const HISTORY_CAPACITY: usize = 10;
}

/// World up axis
pub const WORLD_UP: Vec3 = Vec3::Y;

/// Uniformly distributed random orientation (Shoemake's method)
pub fn random_orientation<R: Rng + ?Sized>(rng: &mut R) -> Quat {
    use std::f32::consts::TAU;
    let u1: f32 = rng.random();
    let u2: f32 = rng.random();
    let u3: f32 = rng.random();
    let a = (1.0 - u1).sqrt();
    let b = u1.sqrt();
    let (s2, c2) = (TAU * u2).sin_cos();
    let (s3, c3) = (TAU * u3).sin_cos();
    Quat::from_xyzw(a * s2, a * c2, b * s3, b * c3).normalize()
}

/// Random unit vector, uniform over the sphere
pub fn random_unit_vector<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    use std::f32::consts::TAU;
    let z: f32 = rng.random_range(-1.0..=1.0);
    let theta: f32 = rng.random_range(0.0..TAU);
    let r = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(r * theta.cos(), r * theta.sin(), z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_random_orientation_is_unit() {
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..100 {
            let q = random_orientation(&mut rng);
            assert!((q.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_random_unit_vector_is_unit() {
        let mut rng = Pcg32::seed_from_u64(11);
        for _ in 0..100 {
            assert!((random_unit_vector(&mut rng).length() - 1.0).abs() < 1e-4);
        }
    }
}
