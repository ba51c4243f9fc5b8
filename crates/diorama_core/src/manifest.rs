//! The decoration manifest: static props placed once at startup.
//!
//! ```json
//! { "decors": [
//!     { "path": "assets/decorations/tree/", "name": "pine", "desize": 6,
//!       "instance_spec": [ { "initPosition": [10, 0, 4], "initAngle": [0, 1.57, 0] } ] }
//! ] }
//! ```
//!
//! A file that is not JSON, or has no `decors` list, is rejected as a whole.
//! Individual entries that are incomplete are skipped with a warning so the
//! rest of the scenery still loads.

use crate::assets::{AssetPlacementSpec, InstanceSpec};
use glam::Vec3;
use serde::Deserialize;
use std::{fs, path::Path};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("manifest is not valid: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why one entry was left out.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EntryError {
    #[error("entry does not match the expected shape: {0}")]
    Shape(String),
    #[error("missing or empty '{0}'")]
    Missing(&'static str),
    #[error("size {0} is not a positive number")]
    BadSize(f32),
    #[error("instance {index}: '{field}' needs 3 numbers, got {len}")]
    Arity {
        index: usize,
        field: &'static str,
        len: usize,
    },
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    decors: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawDecor {
    path: Option<String>,
    name: Option<String>,
    desize: Option<f32>,
    #[serde(default)]
    instance_spec: Vec<RawInstance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInstance {
    init_position: Option<Vec<f32>>,
    init_angle: Option<Vec<f32>>,
}

/// A parsed manifest: the valid placements, plus what was skipped and why.
#[derive(Debug, Default)]
pub struct DecorationManifest {
    pub placements: Vec<AssetPlacementSpec>,
    pub skipped: Vec<(usize, EntryError)>,
}

impl DecorationManifest {
    pub fn parse(json: &str) -> Result<Self, ManifestError> {
        let raw: RawManifest = serde_json::from_str(json)?;
        let mut manifest = Self::default();

        for (index, value) in raw.decors.into_iter().enumerate() {
            match validate(value) {
                Ok(spec) => manifest.placements.push(spec),
                Err(e) => {
                    log::warn!("Skipping decoration entry {}: {}", index, e);
                    manifest.skipped.push((index, e));
                }
            }
        }

        log::debug!(
            "Decoration manifest: {} entries usable, {} skipped",
            manifest.placements.len(),
            manifest.skipped.len()
        );
        Ok(manifest)
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let json = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&json)
    }
}

fn validate(value: serde_json::Value) -> Result<AssetPlacementSpec, EntryError> {
    let raw: RawDecor = serde_json::from_value(value).map_err(|e| EntryError::Shape(e.to_string()))?;

    let path = raw.path.filter(|p| !p.is_empty()).ok_or(EntryError::Missing("path"))?;
    let name = raw.name.filter(|n| !n.is_empty()).ok_or(EntryError::Missing("name"))?;
    let size = raw.desize.ok_or(EntryError::Missing("desize"))?;
    if !(size > 0.0 && size.is_finite()) {
        return Err(EntryError::BadSize(size));
    }
    if raw.instance_spec.is_empty() {
        return Err(EntryError::Missing("instance_spec"));
    }

    let instances = raw
        .instance_spec
        .into_iter()
        .enumerate()
        .map(|(index, instance)| {
            Ok(InstanceSpec::new(
                vec3(index, "initPosition", instance.init_position)?,
                vec3(index, "initAngle", instance.init_angle)?,
            ))
        })
        .collect::<Result<Vec<_>, EntryError>>()?;

    Ok(AssetPlacementSpec::from_base(&path, &name, size, instances))
}

fn vec3(index: usize, field: &'static str, values: Option<Vec<f32>>) -> Result<Vec3, EntryError> {
    match values.as_deref() {
        Some([x, y, z]) => Ok(Vec3::new(*x, *y, *z)),
        Some(other) => Err(EntryError::Arity {
            index,
            field,
            len: other.len(),
        }),
        None => Err(EntryError::Arity { index, field, len: 0 }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_PROPS: &str = r#"{
        "decors": [
            { "path": "assets/decorations/tree/", "name": "pine", "desize": 6,
              "instance_spec": [
                { "initPosition": [10, 0, 4], "initAngle": [0, 1.5, 0] },
                { "initPosition": [-2, 0, 30], "initAngle": [0, 0, 0] }
              ] },
            { "path": "assets/decorations/bench/", "name": "bench", "desize": 1.5,
              "instance_spec": [ { "initPosition": [0, 0, 0], "initAngle": [0, 3.14, 0] } ] }
        ]
    }"#;

    #[test]
    fn entries_become_placements_in_order() {
        let manifest = DecorationManifest::parse(TWO_PROPS).unwrap();

        assert!(manifest.skipped.is_empty());
        assert_eq!(manifest.placements.len(), 2);

        let pine = &manifest.placements[0];
        assert_eq!(pine.name, "pine");
        assert_eq!(pine.material_path, "assets/decorations/tree/pine.mtl");
        assert_eq!(pine.geometry_path, "assets/decorations/tree/pine.obj");
        assert_eq!(pine.desired_size, 6.0);
        assert_eq!(pine.instances.len(), 2);
        assert_eq!(pine.instances[0].position, Vec3::new(10.0, 0.0, 4.0));
        assert_eq!(pine.instances[0].rotation, Vec3::new(0.0, 1.5, 0.0));

        assert_eq!(manifest.placements[1].name, "bench");
    }

    #[test]
    fn malformed_entries_are_skipped_and_the_rest_load() {
        let json = r#"{
            "decors": [
                { "name": "nopath", "desize": 1, "instance_spec": [ { "initPosition": [0,0,0], "initAngle": [0,0,0] } ] },
                { "path": "a/", "name": "empty", "desize": 1, "instance_spec": [] },
                { "path": "a/", "name": "flat", "desize": 0, "instance_spec": [ { "initPosition": [0,0,0], "initAngle": [0,0,0] } ] },
                { "path": "a/", "name": "short", "desize": 1, "instance_spec": [ { "initPosition": [0,0], "initAngle": [0,0,0] } ] },
                { "path": "a/", "name": "typed", "desize": "big", "instance_spec": [] },
                { "path": "a/", "name": "good", "desize": 2, "instance_spec": [ { "initPosition": [1,2,3], "initAngle": [0,0,0] } ] }
            ]
        }"#;

        let manifest = DecorationManifest::parse(json).unwrap();

        assert_eq!(manifest.placements.len(), 1);
        assert_eq!(manifest.placements[0].name, "good");

        let reasons: Vec<_> = manifest.skipped.iter().map(|(i, e)| (*i, e.clone())).collect();
        assert_eq!(reasons[0], (0, EntryError::Missing("path")));
        assert_eq!(reasons[1], (1, EntryError::Missing("instance_spec")));
        assert_eq!(reasons[2], (2, EntryError::BadSize(0.0)));
        assert_eq!(
            reasons[3],
            (
                3,
                EntryError::Arity {
                    index: 0,
                    field: "initPosition",
                    len: 2
                }
            )
        );
        assert!(matches!(reasons[4], (4, EntryError::Shape(_))));
    }

    #[test]
    fn a_file_that_is_not_a_manifest_is_rejected() {
        assert!(matches!(DecorationManifest::parse("not json"), Err(ManifestError::Json(_))));
        assert!(matches!(DecorationManifest::parse(r#"{"props": []}"#), Err(ManifestError::Json(_))));
    }

    #[test]
    fn loads_from_disk() {
        let dir = std::env::temp_dir().join(format!("diorama-manifest-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("decors.json");
        fs::write(&path, TWO_PROPS).unwrap();

        let manifest = DecorationManifest::load(&path).unwrap();
        assert_eq!(manifest.placements.len(), 2);

        fs::remove_dir_all(&dir).unwrap();
        assert!(matches!(DecorationManifest::load(&path), Err(ManifestError::Io { .. })));
    }
}
