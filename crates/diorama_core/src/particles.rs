//! Falling snow: a fixed buffer of particles drifting downward in a repeating band.

use glam::Vec3;
use rand::{rngs::StdRng, Rng, SeedableRng};

pub const SNOW_PARTICLE_COUNT: usize = 70_000;

/// A particle at or below this height wraps to [`CEILING_Y`].
pub const FLOOR_Y: f32 = -50.0;
pub const CEILING_Y: f32 = 50.0;

/// Spawn volume: x and z in [-100, 200), y in (-50, 150].
const SPAWN_MIN_XZ: f32 = -100.0;
const SPAWN_SPAN_XZ: f32 = 300.0;
const SPAWN_TOP_Y: f32 = 150.0;
const SPAWN_SPAN_Y: f32 = 200.0;
const MAX_FALL_SPEED: f32 = 0.5;

/// How the field is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointStyle {
    pub color: [f32; 3],
    pub size: f32,
    pub opacity: f32,
}

impl Default for PointStyle {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            size: 0.2,
            opacity: 0.7,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParticleField {
    positions: Vec<Vec3>,
    velocities: Vec<Vec3>,
    pub style: PointStyle,
}

impl ParticleField {
    /// Spawns `count` particles with purely downward velocities in (-0.5, 0].
    pub fn initialize<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Self {
        let mut positions = Vec::with_capacity(count);
        let mut velocities = Vec::with_capacity(count);

        for _ in 0..count {
            let x = rng.gen::<f32>() * SPAWN_SPAN_XZ + SPAWN_MIN_XZ;
            let y = SPAWN_TOP_Y - rng.gen::<f32>() * SPAWN_SPAN_Y;
            let z = rng.gen::<f32>() * SPAWN_SPAN_XZ + SPAWN_MIN_XZ;
            positions.push(Vec3::new(x, y, z));
            velocities.push(Vec3::new(0.0, -rng.gen::<f32>() * MAX_FALL_SPEED, 0.0));
        }

        Self {
            positions,
            velocities,
            style: PointStyle::default(),
        }
    }

    /// Snow field seeded from `seed`, or from OS entropy when `None`.
    pub fn snow(count: usize, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::initialize(count, &mut rng)
    }

    /// One fixed step per frame; speed follows the display refresh rate.
    pub fn advance(&mut self) {
        for (p, v) in self.positions.iter_mut().zip(&self.velocities) {
            *p += *v;
            if p.y <= FLOOR_Y {
                p.y = CEILING_Y;
            }
        }
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn velocities(&self) -> &[Vec3] {
        &self.velocities
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
