use crate::scene::{Entity, EntityId, Model, Scene, Transform};
use glam::Vec3;
use objmtl::Aabb;
use std::sync::Arc;

/// One placement of a cloned asset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceSpec {
    pub position: Vec3,
    /// Euler angles in radians.
    pub rotation: Vec3,
}

impl InstanceSpec {
    pub fn new(position: Vec3, rotation: Vec3) -> Self {
        Self { position, rotation }
    }
}

/// Everything needed to load one material + geometry pair and place its clones.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetPlacementSpec {
    pub name: String,
    pub material_path: String,
    pub geometry_path: String,
    /// Target for the largest bounding dimension of every clone.
    pub desired_size: f32,
    pub instances: Vec<InstanceSpec>,
}

impl AssetPlacementSpec {
    /// `<base><name>.mtl` and `<base><name>.obj`, the way the manifest names files.
    pub fn from_base(base: &str, name: &str, desired_size: f32, instances: Vec<InstanceSpec>) -> Self {
        Self {
            name: name.to_owned(),
            material_path: format!("{base}{name}.mtl"),
            geometry_path: format!("{base}{name}.obj"),
            desired_size,
            instances,
        }
    }
}

/// Uniform factor that brings the largest extent of `bounds` to `desired_size`.
/// `None` for flat-to-nothing bounds or a non-finite result.
pub fn uniform_scale(bounds: &Aabb, desired_size: f32) -> Option<f32> {
    let max = bounds.max_extent();
    if max <= 0.0 || !max.is_finite() {
        return None;
    }
    let scale = desired_size / max;
    scale.is_finite().then_some(scale)
}

/// A loaded model with its scale already worked out; ready to be cloned.
#[derive(Debug, Clone)]
pub struct PreparedAsset {
    pub model: Arc<Model>,
    pub scale: f32,
}

/// Clones `prepared` once per instance and links every clone into `scene`.
pub fn place_instances(
    scene: &mut Scene,
    prepared: &PreparedAsset,
    instances: &[InstanceSpec],
) -> Vec<EntityId> {
    instances
        .iter()
        .map(|spec| {
            scene.add(Entity {
                name: prepared.model.name.clone(),
                transform: Transform {
                    position: spec.position,
                    rotation: spec.rotation,
                    scale: Vec3::splat(prepared.scale),
                },
                model: prepared.model.clone(),
            })
        })
        .collect()
}
