//! Rest detection, run when the settle clock is due or a body falls asleep
//!
//! A toss completes when every body is settled at the same poll. Bodies that
//! escaped the arena are put back, dice stuck on an edge and coins left on
//! their rim are nudged, and a toss that never settles is closed out by
//! timeout with its best reading.

use glam::Vec3;

use super::arena::ArenaBuilder;
use super::body::RigidBody;
use super::outcome::{FaceMapping, extract_outcome, upward_face};
use super::session::{AnomalyKind, RollRecord, SessionEvent, SimulationSession};
use crate::{WORLD_UP, random_unit_vector};
use crate::renderer::RenderSurface;
use crate::settings::RestConfig;

/// Bodies farther than this outside the walls count as escaped
const ESCAPE_MARGIN: f32 = 1.0;
/// Upward kick and spin given to a stuck body
const NUDGE_SPEED: f32 = 3.0;
const NUDGE_SPIN: f32 = 4.0;

pub struct RestDetector;

impl RestDetector {
    /// Slow, low and not spinning
    pub fn is_settled(body: &RigidBody, rest: &RestConfig) -> bool {
        body.linear_velocity.length() < rest.linear_eps
            && body.angular_velocity.length() < rest.angular_eps
            && body.position.y < body.rest_height(rest.height_margin)
    }

    /// Motionless but not settled: propped on an edge or another body
    fn is_stuck(body: &RigidBody, rest: &RestConfig) -> bool {
        body.linear_velocity.length() < rest.linear_eps
            && body.angular_velocity.length() < rest.angular_eps
            && !Self::is_settled(body, rest)
    }

    /// No face clearly pointing up: a die on an edge, a coin tilted
    /// against a wall or another coin
    fn is_cocked(body: &RigidBody, rest: &RestConfig) -> bool {
        match body.kind.mapping() {
            FaceMapping::Die { faces } => upward_face(body.orientation, faces).1 < rest.cocked_dot,
            FaceMapping::Coin { heads_axis } => {
                (body.orientation * *heads_axis).dot(WORLD_UP).abs() < rest.cocked_dot
            }
        }
    }

    /// One poll. Returns the record when this poll completes the toss.
    pub fn tick<S: RenderSurface>(session: &mut SimulationSession<S>) -> Option<RollRecord> {
        let now = session.now_ms;
        let rest = &session.config.rest;
        let arena = &session.config.arena;
        let respawn = Vec3::from_array(session.config.respawn_point);
        let roll = session.roll.as_mut().filter(|r| r.in_flight)?;

        let mut anomalies = Vec::new();
        for pair in &mut roll.pairs {
            if !ArenaBuilder::contains(arena, pair.body.position, ESCAPE_MARGIN) {
                pair.body.teleport(respawn);
                pair.body.wake();
                anomalies.push((pair.body.id, AnomalyKind::Escaped));
            }
        }

        let all_settled = anomalies.is_empty()
            && roll.pairs.iter().all(|p| Self::is_settled(&p.body, rest));
        let timed_out = roll.settle_clock.elapsed(now) >= rest.settle_timeout_ms;
        let may_nudge = roll.nudges < rest.max_nudges;

        let mut nudged = false;
        if !timed_out && may_nudge {
            for pair in &mut roll.pairs {
                let body = &mut pair.body;
                let settled = Self::is_settled(body, rest);
                if Self::is_stuck(body, rest) || (settled && Self::is_cocked(body, rest)) {
                    body.linear_velocity += Vec3::Y * NUDGE_SPEED;
                    body.angular_velocity += random_unit_vector(&mut session.rng) * NUDGE_SPIN;
                    body.wake();
                    anomalies.push((body.id, AnomalyKind::Cocked));
                    nudged = true;
                }
            }
            if nudged {
                roll.nudges += 1;
            }
        }

        let mut record = None;
        if timed_out || (all_settled && !nudged) {
            let forced = !all_settled;
            let mapping = roll.kind.mapping();
            let outcomes = roll
                .pairs
                .iter()
                .map(|p| extract_outcome(&p.body, mapping))
                .collect();
            roll.settle_clock.cancel();
            roll.in_flight = false;
            record = Some(RollRecord::new(roll.kind, outcomes, now, forced));
        }

        for (body_id, kind) in anomalies {
            log::warn!("Body {} recovered: {:?}", body_id, kind);
            session.emit(SessionEvent::Anomaly { body_id, kind });
        }

        if let Some(record) = &record {
            if record.forced {
                log::warn!("Toss forced to settle after {} ms", session.config.rest.settle_timeout_ms);
            }
            log::info!(
                "Toss settled: {}",
                record
                    .outcomes
                    .iter()
                    .map(|o| o.label())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            session.emit(SessionEvent::Settled(record.clone()));
        }
        record
    }
}
