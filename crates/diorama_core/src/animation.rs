//! Looping four-phase transform animation for ambient props.
//!
//! Each cycle is a small state machine: move-out, rotate-out, move-back,
//! rotate-back, then around again. The engine accumulates frame time into the
//! active phase and steps to the next stage when the phase's progress reaches
//! 1.0. Leftover time carries into the following phase.

use crate::scene::{EntityId, Scene};
use glam::Vec3;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnimationError {
    #[error("cycle phases have zero total duration")]
    DegenerateCycle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    Linear,
    #[default]
    QuadraticInOut,
}

impl Easing {
    /// Maps linear progress in [0, 1] onto the curve.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::QuadraticInOut => {
                let t = t * 2.0;
                if t < 1.0 {
                    0.5 * t * t
                } else {
                    let t = t - 1.0;
                    -0.5 * (t * (t - 2.0) - 1.0)
                }
            }
        }
    }
}

/// Which transform component a phase drives, and between which values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhaseTarget {
    Position { from: Vec3, to: Vec3 },
    /// Euler angles in radians.
    Rotation { from: Vec3, to: Vec3 },
}

impl PhaseTarget {
    fn sample(&self, eased: f32) -> Vec3 {
        match *self {
            PhaseTarget::Position { from, to } | PhaseTarget::Rotation { from, to } => {
                from.lerp(to, eased)
            }
        }
    }

    fn end(&self) -> Vec3 {
        match *self {
            PhaseTarget::Position { to, .. } | PhaseTarget::Rotation { to, .. } => to,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Phase {
    pub target: PhaseTarget,
    pub duration: Duration,
    pub easing: Easing,
}

impl Phase {
    pub fn position(from: Vec3, to: Vec3, duration: Duration) -> Self {
        Self {
            target: PhaseTarget::Position { from, to },
            duration,
            easing: Easing::QuadraticInOut,
        }
    }

    pub fn rotation(from: Vec3, to: Vec3, duration: Duration) -> Self {
        Self {
            target: PhaseTarget::Rotation { from, to },
            duration,
            easing: Easing::QuadraticInOut,
        }
    }

    /// Yaw-only rotation, angles in degrees.
    pub fn yaw_degrees(from: f32, to: f32, duration: Duration) -> Self {
        Self::rotation(
            Vec3::new(0.0, from.to_radians(), 0.0),
            Vec3::new(0.0, to.to_radians(), 0.0),
            duration,
        )
    }
}

/// The four stages of every cycle, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    MoveOut,
    RotateOut,
    MoveBack,
    RotateBack,
}

impl Stage {
    pub fn index(self) -> usize {
        match self {
            Stage::MoveOut => 0,
            Stage::RotateOut => 1,
            Stage::MoveBack => 2,
            Stage::RotateBack => 3,
        }
    }

    /// Transition table; `RotateBack` wraps to `MoveOut`.
    pub fn next(self) -> Self {
        match self {
            Stage::MoveOut => Stage::RotateOut,
            Stage::RotateOut => Stage::MoveBack,
            Stage::MoveBack => Stage::RotateBack,
            Stage::RotateBack => Stage::MoveOut,
        }
    }
}

/// Phase descriptors for a drive-out-and-back loop that always closes on its start.
pub fn round_trip(
    origin: Vec3,
    destination: Vec3,
    yaw_out_degrees: (f32, f32),
    durations: [Duration; 4],
) -> [Phase; 4] {
    let (yaw_start, yaw_turned) = yaw_out_degrees;
    [
        Phase::position(origin, destination, durations[0]),
        Phase::yaw_degrees(yaw_start, yaw_turned, durations[1]),
        Phase::position(destination, origin, durations[2]),
        Phase::yaw_degrees(yaw_turned, yaw_start, durations[3]),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CycleId(u32);

/// Observable interpolation state of one cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleState {
    pub entity: EntityId,
    pub stage: Stage,
    /// Time spent in the current stage.
    pub elapsed: Duration,
    /// Number of times the rotate-back stage has completed.
    pub completed: u64,
}

#[derive(Debug)]
struct ActiveCycle {
    phases: [Phase; 4],
    period: Duration,
    state: CycleState,
}

impl ActiveCycle {
    fn advance(&mut self, dt: Duration, scene: &mut Scene) {
        let mut remaining = dt;

        // The cycle is periodic, so whole periods can be skipped outright.
        let whole = remaining.as_nanos() / self.period.as_nanos();
        if whole > 0 {
            self.state.completed += whole as u64;
            let skipped = self.period.as_nanos() * whole;
            remaining = Duration::from_nanos((remaining.as_nanos() - skipped) as u64);

            // Settle both components on where the last full lap left them.
            let mut stage = self.state.stage.next();
            while stage != self.state.stage {
                let phase = &self.phases[stage.index()];
                apply(scene, self.state.entity, &phase.target, phase.target.end());
                stage = stage.next();
            }
        }

        loop {
            let phase = self.phases[self.state.stage.index()];
            let left = phase.duration.saturating_sub(self.state.elapsed);

            if remaining < left {
                self.state.elapsed += remaining;
                let t = self.state.elapsed.as_secs_f32() / phase.duration.as_secs_f32();
                apply(scene, self.state.entity, &phase.target, phase.target.sample(phase.easing.apply(t)));
                return;
            }

            remaining -= left;
            apply(scene, self.state.entity, &phase.target, phase.target.end());
            self.state.elapsed = Duration::ZERO;
            self.state.stage = self.state.stage.next();
            if self.state.stage == Stage::MoveOut {
                self.state.completed += 1;
            }

            if remaining.is_zero() {
                return;
            }
        }
    }
}

/// Writes one interpolation step; a missing entity skips the write only.
fn apply(scene: &mut Scene, entity: EntityId, target: &PhaseTarget, value: Vec3) {
    let Some(entity) = scene.get_mut(entity) else {
        log::trace!("Animated entity {:?} not in scene; step skipped", entity);
        return;
    };
    match target {
        PhaseTarget::Position { .. } => entity.transform.position = value,
        PhaseTarget::Rotation { .. } => entity.transform.rotation = value,
    }
}

/// Owns every running cycle. Cycles run until the engine is dropped.
#[derive(Debug, Default)]
pub struct AnimationEngine {
    cycles: Vec<ActiveCycle>,
}

impl AnimationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts an endless cycle for `entity` at the beginning of `phases[0]`.
    pub fn start_cycle(
        &mut self,
        entity: EntityId,
        phases: [Phase; 4],
    ) -> Result<CycleId, AnimationError> {
        let period: Duration = phases.iter().map(|p| p.duration).sum();
        if period.is_zero() {
            return Err(AnimationError::DegenerateCycle);
        }

        let id = CycleId(self.cycles.len() as u32);
        self.cycles.push(ActiveCycle {
            phases,
            period,
            state: CycleState {
                entity,
                stage: Stage::MoveOut,
                elapsed: Duration::ZERO,
                completed: 0,
            },
        });
        log::debug!("Started animation cycle {:?} for {:?} (period {:?})", id, entity, period);
        Ok(id)
    }

    /// Advances every cycle by `dt` and writes the results into `scene`.
    pub fn advance(&mut self, dt: Duration, scene: &mut Scene) {
        for cycle in &mut self.cycles {
            cycle.advance(dt, scene);
        }
    }

    pub fn state(&self, id: CycleId) -> Option<CycleState> {
        self.cycles.get(id.0 as usize).map(|c| c.state)
    }

    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }
}
