//! Simulation session: the single owner of world, bodies, visuals and surface
//!
//! Lifecycle: `Pending` until a non-zero `init`, then `Live` until `dispose`.
//! Every public call on a disposed session is a silent no-op.

use glam::Vec3;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::arena::ArenaBuilder;
use super::body::{BodyPair, ObjectKind, RigidBody, RigidBodyFactory};
use super::launcher::{LaunchOutcome, TossLauncher};
use super::outcome::{Outcome, extract_outcome};
use super::rest::RestDetector;
use super::schedule::{CancelToken, FrameScheduler, PeriodicTask};
use super::stepper::FrameStepper;
use super::visual::VisualHandle;
use super::world::PhysicsWorld;
use crate::consts::MAX_BODIES;
use crate::renderer::{Projection, RenderSurface};
use crate::settings::{EngineConfig, Settings};

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for a non-zero surface
    Pending,
    /// Frame loop running
    Live,
    /// Torn down; further calls do nothing
    Disposed,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Surface has a zero dimension; retry on the next layout/resize
    #[error("render surface not ready ({width}x{height})")]
    NotReady { width: u32, height: u32 },
}

/// Synchronous answer to `roll`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollAck {
    Accepted,
    RejectedInFlight,
    /// Session not live (pending or disposed)
    Inactive,
}

/// Recovered simulation glitches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnomalyKind {
    /// Fell through the floor
    Tunneled,
    /// Left the arena bounds
    Escaped,
    /// Die came to rest on an edge and was nudged
    Cocked,
}

/// Notifications for the host UI
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Launched { kind: ObjectKind, count: usize },
    Settled(RollRecord),
    Anomaly { body_id: u32, kind: AnomalyKind },
}

/// Result of one toss, produced once on full settle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollRecord {
    pub kind: ObjectKind,
    /// One label per body, in body order
    pub outcomes: Vec<Outcome>,
    /// Sum of die faces; None for coins
    pub total: Option<u32>,
    /// Host clock at settle (ms)
    pub timestamp: f64,
    /// Settled by timeout rather than by coming to rest
    #[serde(default)]
    pub forced: bool,
}

impl RollRecord {
    pub fn new(kind: ObjectKind, outcomes: Vec<Outcome>, timestamp: f64, forced: bool) -> Self {
        let total = match kind {
            ObjectKind::Die => Some(outcomes.iter().filter_map(Outcome::value).sum()),
            ObjectKind::Coin => None,
        };
        Self {
            kind,
            outcomes,
            total,
            timestamp,
            forced,
        }
    }
}

/// Bodies of the current object set plus toss state.
/// Rebuilt whole whenever kind or count changes.
#[derive(Debug)]
pub struct RollSession {
    pub(crate) kind: ObjectKind,
    pub(crate) pairs: Vec<BodyPair>,
    pub(crate) in_flight: bool,
    pub(crate) settle_clock: PeriodicTask,
    pub(crate) nudges: u32,
}

impl RollSession {
    fn new(kind: ObjectKind, pairs: Vec<BodyPair>, poll_ms: f64) -> Self {
        Self {
            kind,
            pairs,
            in_flight: false,
            settle_clock: PeriodicTask::new(poll_ms),
            nudges: 0,
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }
}

pub struct SimulationSession<S: RenderSurface> {
    pub(crate) phase: SessionPhase,
    pub(crate) config: EngineConfig,
    pub(crate) world: PhysicsWorld,
    factory: RigidBodyFactory,
    pub(crate) surface: S,
    pub(crate) projection: Option<Projection>,
    pub(crate) frames: FrameScheduler,
    pub(crate) roll: Option<RollSession>,
    pub(crate) rng: Pcg32,
    events: Vec<SessionEvent>,
    next_body_id: u32,
    pub(crate) camera_shake: f32,
    pub(crate) shake_enabled: bool,
    pub(crate) now_ms: f64,
}

impl<S: RenderSurface> SimulationSession<S> {
    /// Create a pending session; nothing runs until `init`
    pub fn new(surface: S, config: EngineConfig, seed: u64) -> Self {
        let world = PhysicsWorld::new(&config);
        let factory = RigidBodyFactory::new(&config);
        Self {
            phase: SessionPhase::Pending,
            config,
            world,
            factory,
            surface,
            projection: None,
            frames: FrameScheduler::new(),
            roll: None,
            rng: Pcg32::seed_from_u64(seed),
            events: Vec::new(),
            next_body_id: 1,
            camera_shake: 0.0,
            shake_enabled: true,
            now_ms: 0.0,
        }
    }

    /// Apply user preferences that affect the simulation side
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.shake_enabled = settings.effective_camera_shake();
        if !self.shake_enabled {
            self.camera_shake = 0.0;
        }
    }

    /// Size the surface, build the arena once and start the frame loop
    pub fn init(&mut self, width: u32, height: u32) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::Disposed => return Ok(()),
            SessionPhase::Live => return self.resize(width, height),
            SessionPhase::Pending => {}
        }
        if width == 0 || height == 0 {
            log::debug!("init deferred: surface is {}x{}", width, height);
            return Err(SessionError::NotReady { width, height });
        }

        self.apply_size(width, height);
        if !self.world.has_statics() {
            let arena = ArenaBuilder::new(&self.config.arena).build();
            self.world.set_statics(arena);
        }
        self.frames.start();
        self.phase = SessionPhase::Live;
        log::info!("Simulation session live at {}x{}", width, height);
        Ok(())
    }

    /// Update surface size and projection; in-flight physics is untouched
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), SessionError> {
        if self.phase == SessionPhase::Disposed {
            return Ok(());
        }
        if width == 0 || height == 0 {
            return Err(SessionError::NotReady { width, height });
        }
        self.apply_size(width, height);
        Ok(())
    }

    fn apply_size(&mut self, width: u32, height: u32) {
        if self.surface.size() != (width, height) {
            self.surface.resize(width, height);
        }
        self.projection = Some(Projection::new(width, height));
    }

    /// Replace the object set with `count` fresh bodies of `kind`.
    /// An in-flight toss is abandoned first.
    pub fn create_objects(&mut self, count: usize, kind: ObjectKind) {
        if self.phase == SessionPhase::Disposed {
            return;
        }
        if let Some(mut old) = self.roll.take() {
            if old.in_flight {
                old.settle_clock.cancel();
                log::info!("In-flight toss discarded: object set changed");
            }
        }

        let count = count.clamp(1, MAX_BODIES);
        let mut pairs = Vec::with_capacity(count);
        for index in 0..count {
            let id = self.next_body_id;
            self.next_body_id += 1;
            pairs.push(self.factory.create(id, kind, index, count));
        }
        log::debug!("Created {} {} bodies", count, kind.as_str());
        self.roll = Some(RollSession::new(kind, pairs, self.config.rest.poll_ms));
    }

    /// Start a toss of `count` objects of `kind`
    pub fn roll(&mut self, kind: ObjectKind, count: usize) -> RollAck {
        if self.phase != SessionPhase::Live {
            return RollAck::Inactive;
        }
        if self.is_in_flight() {
            log::debug!("roll rejected: toss in flight");
            return RollAck::RejectedInFlight;
        }

        let count = count.clamp(1, MAX_BODIES);
        let rebuild = self
            .roll
            .as_ref()
            .is_none_or(|r| r.kind != kind || r.pairs.len() != count);
        if rebuild {
            self.create_objects(count, kind);
        }

        match TossLauncher::launch(self) {
            LaunchOutcome::Launched => RollAck::Accepted,
            LaunchOutcome::Rejected => RollAck::RejectedInFlight,
        }
    }

    /// Host display-frame callback: step, then check for rest when the
    /// settle clock is due or a body has just fallen asleep
    pub fn on_frame(&mut self, now_ms: f64) {
        if self.phase != SessionPhase::Live || !self.frames.begin_tick() {
            return;
        }
        self.now_ms = now_ms;
        let report = FrameStepper::tick(self);

        let due = self.roll.as_mut().is_some_and(|r| {
            r.in_flight && (r.settle_clock.poll(now_ms) || report.fell_asleep > 0)
        });
        if due {
            RestDetector::tick(self);
        }
    }

    /// Stop both loops and release the surface; safe to call repeatedly
    pub fn dispose(&mut self) {
        if self.phase == SessionPhase::Disposed {
            return;
        }
        self.frames.cancel();
        if let Some(mut roll) = self.roll.take() {
            roll.settle_clock.cancel();
            roll.in_flight = false;
        }
        self.surface.release();
        self.events.clear();
        self.phase = SessionPhase::Disposed;
        log::info!("Simulation session disposed");
    }

    /// Take all pending notifications
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn emit(&mut self, event: SessionEvent) {
        if self.phase != SessionPhase::Disposed {
            self.events.push(event);
        }
    }

    /// Labels the bodies would show right now; only while in flight.
    /// Cosmetic, for the rolling display.
    pub fn preview(&self) -> Option<Vec<Outcome>> {
        let roll = self.roll.as_ref().filter(|r| r.in_flight)?;
        let mapping = roll.kind.mapping();
        Some(
            roll.pairs
                .iter()
                .map(|p| extract_outcome(&p.body, mapping))
                .collect(),
        )
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_live(&self) -> bool {
        self.phase == SessionPhase::Live
    }

    pub fn is_in_flight(&self) -> bool {
        self.roll.as_ref().is_some_and(|r| r.in_flight)
    }

    pub fn roll_session(&self) -> Option<&RollSession> {
        self.roll.as_ref()
    }

    pub fn bodies(&self) -> impl Iterator<Item = &RigidBody> {
        self.roll.iter().flat_map(|r| r.pairs.iter().map(|p| &p.body))
    }

    pub fn visuals(&self) -> impl Iterator<Item = &VisualHandle> {
        self.roll.iter().flat_map(|r| r.pairs.iter().map(|p| &p.visual))
    }

    pub fn body_count(&self) -> usize {
        self.roll.as_ref().map_or(0, RollSession::len)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn projection(&self) -> Option<Projection> {
        self.projection
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Token queued host callbacks check before running
    pub fn frame_token(&self) -> Option<CancelToken> {
        self.frames.token()
    }

    pub fn frame_ticks(&self) -> u64 {
        self.frames.ticks()
    }

    pub fn camera_shake(&self) -> f32 {
        self.camera_shake
    }

    /// Put the bodies into a given state; test and demo support
    pub fn place_body(&mut self, index: usize, position: Vec3, linear_velocity: Vec3) {
        if let Some(pair) = self.roll.as_mut().and_then(|r| r.pairs.get_mut(index)) {
            pair.body.position = position;
            pair.body.linear_velocity = linear_velocity;
            pair.body.wake();
        }
    }
}
