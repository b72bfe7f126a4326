//! Per-frame work: one physics step, glitch recovery, visual sync, draw

use glam::{Quat, Vec3};

use super::body::RigidBody;
use super::session::{AnomalyKind, SessionEvent, SimulationSession};
use super::visual::VisualHandle;
use super::world::StepReport;
use crate::renderer::{FrameView, RenderError, RenderSurface};

/// Camera shake left after each frame
const SHAKE_DECAY: f32 = 0.9;

pub struct FrameStepper;

impl VisualHandle {
    /// Copy the body transform
    fn sync(&mut self, body: &RigidBody) {
        self.position = body.position;
        self.orientation = body.orientation;
    }
}

impl FrameStepper {
    /// Advance exactly one fixed timestep regardless of elapsed host time
    pub fn tick<S: RenderSurface>(session: &mut SimulationSession<S>) -> StepReport {
        let mut report = StepReport::default();
        let mut recovered = Vec::new();

        if let Some(roll) = session.roll.as_mut() {
            report = session.world.step(&mut roll.pairs);

            let floor = session.config.sanity_floor;
            let respawn = Vec3::from_array(session.config.respawn_point);
            for pair in &mut roll.pairs {
                let body = &mut pair.body;
                let lost = !body.position.is_finite() || !body.orientation.is_finite();
                if lost || body.position.y < floor {
                    body.teleport(respawn);
                    if lost {
                        body.orientation = Quat::IDENTITY;
                    }
                    body.wake();
                    recovered.push(body.id);
                }
                pair.visual.sync(body);
            }
        }

        for body_id in recovered {
            log::warn!("Body {} fell out of the world, respawned", body_id);
            session.emit(SessionEvent::Anomaly {
                body_id,
                kind: AnomalyKind::Tunneled,
            });
        }

        session.camera_shake *= SHAKE_DECAY;
        if session.camera_shake < 1e-3 {
            session.camera_shake = 0.0;
        }

        Self::draw(session);
        report
    }

    fn draw<S: RenderSurface>(session: &mut SimulationSession<S>) {
        let Some(projection) = session.projection else {
            return;
        };
        let pairs = session.roll.as_ref().map_or(&[][..], |r| r.pairs.as_slice());
        let view = FrameView::new(
            pairs,
            session.now_ms,
            session.camera_shake,
            session.config.arena.half_size,
            session.config.arena.wall_height,
            projection,
        );

        match session.surface.render(&view) {
            Ok(()) => {}
            Err(RenderError::Lost | RenderError::Outdated) => {
                log::debug!("Surface lost, reconfiguring");
                session.surface.resize(projection.width, projection.height);
            }
            Err(RenderError::OutOfMemory) => {
                log::error!("Out of GPU memory");
            }
            Err(e) => {
                log::warn!("Render error: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::HeadlessSurface;
    use crate::settings::EngineConfig;
    use crate::sim::ObjectKind;

    fn session() -> SimulationSession<HeadlessSurface> {
        let mut s = SimulationSession::new(HeadlessSurface::new(), EngineConfig::default(), 17);
        s.init(400, 300).unwrap();
        s.create_objects(2, ObjectKind::Die);
        s
    }

    #[test]
    fn test_tick_syncs_every_visual() {
        let mut s = session();
        let report = FrameStepper::tick(&mut s);
        assert_eq!(report.bodies_stepped, 2);
        for (body, visual) in s.bodies().zip(s.visuals()) {
            assert_eq!(body.position, visual.position());
            assert_eq!(body.orientation, visual.orientation());
        }
        let drawn = s.surface().last_frame();
        assert_eq!(drawn.len(), 2);
        assert_eq!(s.surface().frames(), 1);
    }

    #[test]
    fn test_tick_without_bodies_still_draws() {
        let mut s = SimulationSession::new(HeadlessSurface::new(), EngineConfig::default(), 1);
        s.init(400, 300).unwrap();
        let report = FrameStepper::tick(&mut s);
        assert_eq!(report, StepReport::default());
        assert_eq!(s.surface().frames(), 1);
        assert!(s.surface().last_frame().is_empty());
    }

    #[test]
    fn test_non_finite_body_is_recovered() {
        let mut s = session();
        s.place_body(1, Vec3::new(f32::NAN, 1.0, 0.0), Vec3::ZERO);
        FrameStepper::tick(&mut s);
        let body = s.bodies().nth(1).unwrap();
        assert!(body.position.is_finite());
        assert_eq!(body.position, Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(s.drain_events().len(), 1);
    }

    #[test]
    fn test_camera_shake_decays_to_zero() {
        let mut s = session();
        s.camera_shake = 1.0;
        FrameStepper::tick(&mut s);
        assert!((s.surface().last_shake() - 0.9).abs() < 1e-6);
        for _ in 0..200 {
            FrameStepper::tick(&mut s);
        }
        assert_eq!(s.camera_shake(), 0.0);
    }
}
