//! The shared scene: lights, background, placed entities and the snow field.

use crate::particles::ParticleField;
use glam::{EulerRot, Mat4, Quat, Vec3};
use objmtl::{MaterialLibrary, ObjModel};
use std::sync::Arc;

/// RGB colour as authored (sRGB), components in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    /// From a packed `0xRRGGBB` value.
    pub fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as f32 / 255.0,
            g: ((hex >> 8) & 0xff) as f32 / 255.0,
            b: (hex & 0xff) as f32 / 255.0,
        }
    }

    /// From hue, saturation and lightness, each in [0, 1].
    pub fn from_hsl(h: f32, s: f32, l: f32) -> Self {
        let h = h.rem_euclid(1.0);
        let s = s.clamp(0.0, 1.0);
        let l = l.clamp(0.0, 1.0);

        if s == 0.0 {
            return Self { r: l, g: l, b: l };
        }

        let p = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let q = 2.0 * l - p;

        fn hue_to_rgb(p: f32, q: f32, mut t: f32) -> f32 {
            if t < 0.0 {
                t += 1.0;
            }
            if t > 1.0 {
                t -= 1.0;
            }
            if t < 1.0 / 6.0 {
                q + (p - q) * 6.0 * t
            } else if t < 0.5 {
                p
            } else if t < 2.0 / 3.0 {
                q + (p - q) * 6.0 * (2.0 / 3.0 - t)
            } else {
                q
            }
        }

        Self {
            r: hue_to_rgb(p, q, h + 1.0 / 3.0),
            g: hue_to_rgb(p, q, h),
            b: hue_to_rgb(p, q, h - 1.0 / 3.0),
        }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowSettings {
    pub map_size: u32,
    /// Half-extent of the orthographic shadow frustum.
    pub extent: f32,
    pub far: f32,
    pub bias: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Light {
    Ambient {
        color: Color,
        intensity: f32,
    },
    Hemisphere {
        sky: Color,
        ground: Color,
        intensity: f32,
        position: Vec3,
    },
    Directional {
        color: Color,
        intensity: f32,
        position: Vec3,
        shadow: Option<ShadowSettings>,
    },
}

/// Position, Euler rotation (radians, XYZ order) and scale of an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn matrix(&self) -> Mat4 {
        let r = self.rotation;
        Mat4::from_scale_rotation_translation(
            self.scale,
            Quat::from_euler(EulerRot::XYZ, r.x, r.y, r.z),
            self.position,
        )
    }
}

/// Geometry and materials of one loaded asset, shared by every clone of it.
#[derive(Debug)]
pub struct Model {
    pub name: String,
    pub materials: MaterialLibrary,
    pub geometry: ObjModel,
}

impl Model {
    /// Diffuse colour of the first bound material, white when none is bound.
    pub fn base_color(&self) -> [f32; 3] {
        self.geometry
            .meshes
            .iter()
            .find_map(|mesh| mesh.material)
            .and_then(|index| self.materials.materials.get(index))
            .map_or([1.0; 3], |m| m.diffuse)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u32);

impl EntityId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A placed clone of a model.
#[derive(Debug, Clone)]
pub struct Entity {
    pub name: String,
    pub transform: Transform,
    pub model: Arc<Model>,
}

/// Everything that gets drawn. Entities are only ever appended.
#[derive(Debug)]
pub struct Scene {
    pub background: Color,
    pub lights: Vec<Light>,
    pub particles: Option<ParticleField>,
    entities: Vec<Entity>,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            background: Color::from_hex(0x87CEEB),
            lights: Vec::new(),
            particles: None,
            entities: Vec::new(),
        }
    }
}

impl Scene {
    /// Sky background with the ambient, hemisphere and shadow-casting sun lights.
    pub fn with_default_lighting() -> Self {
        let mut scene = Self::default();

        scene.lights.push(Light::Ambient {
            color: Color::WHITE,
            intensity: 3.0,
        });
        scene.lights.push(Light::Hemisphere {
            sky: Color::from_hsl(0.6, 1.0, 0.6),
            ground: Color::from_hsl(0.095, 1.0, 0.75),
            intensity: 5.0,
            position: Vec3::new(0.0, 50.0, 0.0),
        });
        scene.lights.push(Light::Directional {
            color: Color::from_hsl(0.1, 1.0, 0.95),
            intensity: 4.5,
            position: Vec3::new(1.0, 1.2, -1.0) * 500.0,
            shadow: Some(ShadowSettings {
                map_size: 2048,
                extent: 150.0,
                far: 3500.0,
                bias: -0.00001,
            }),
        });

        scene
    }

    /// Links a fully built entity into the scene.
    pub fn add(&mut self, entity: Entity) -> EntityId {
        let id = EntityId(self.entities.len() as u32);
        self.entities.push(entity);
        id
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.index())
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id.index())
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
