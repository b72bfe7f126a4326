//! Simulation module
//!
//! Physics, body ownership and the toss lifecycle. Deterministic for a given
//! seed and sequence of host calls:
//! - Fixed timestep only, one step per display frame
//! - Seeded RNG only
//! - Stable iteration order (body order within a set)
//! - No GPU or platform dependencies; drawing goes through `RenderSurface`

pub mod arena;
pub mod body;
pub mod launcher;
pub mod material;
pub mod outcome;
pub mod rest;
pub mod schedule;
pub mod sdf;
pub mod session;
pub mod stepper;
pub mod visual;
pub mod world;

pub use arena::{ArenaBuilder, Pose, StaticCollider, StaticShape};
pub use body::{BodyPair, BodyShape, ObjectKind, RigidBody, RigidBodyFactory};
pub use launcher::{LaunchOutcome, TossImpulse, TossLauncher};
pub use material::PhysicsMaterial;
pub use outcome::{
    COIN_MAPPING, DIE_MAPPING, DieFace, FaceMapping, Outcome, extract_outcome,
    outcome_for_orientation, upward_face,
};
pub use rest::RestDetector;
pub use schedule::{CancelToken, FrameScheduler, PeriodicTask};
pub use sdf::{SdfContact, check_point, sd_box, sd_cylinder, sd_plane, sdf_gradient};
pub use session::{
    AnomalyKind, RollAck, RollRecord, RollSession, SessionError, SessionEvent, SessionPhase,
    SimulationSession,
};
pub use stepper::FrameStepper;
pub use visual::VisualHandle;
pub use world::{PhysicsWorld, StepReport};
