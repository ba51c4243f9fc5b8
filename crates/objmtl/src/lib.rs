//! OBJMTL: reader for Wavefront geometry (`.obj`) and material libraries (`.mtl`).
//!
//! Only the subset needed to place and draw decorative props is understood:
//!
//! MTL records:
//!   newmtl <name>        starts a material
//!   Ka/Kd/Ks r [g b]     ambient / diffuse / specular colour (a single value means grey)
//!   Ns <f>               specular exponent
//!   d <f> | Tr <f>       opacity (Tr is 1 - d)
//!   map_Kd <path>        diffuse texture, kept as the raw relative path
//!
//! OBJ records:
//!   v x y z [w]          position (w ignored)
//!   f a b c ...          polygon, triangulated as a fan; `i`, `i/t`, `i//n`, `i/t/n`
//!                        and negative (relative) indices are accepted
//!   o <name> | g <name>  starts a new mesh
//!   usemtl <name>        binds a material to the following faces
//!   mtllib <file>        recorded, never followed
//!
//! Everything else (normals, texture coordinates, smoothing groups, lines) is skipped.

use std::io::{self, BufRead, BufReader, Read};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
}

#[cold]
fn syntax(line: usize, message: impl Into<String>) -> ParseError {
    ParseError::Syntax {
        line,
        message: message.into(),
    }
}

#[inline(always)]
fn parse_f32(token: Option<&str>, line: usize, what: &str) -> Result<f32, ParseError> {
    let token = token.ok_or_else(|| syntax(line, format!("missing {what}")))?;
    let value: f32 = token
        .parse()
        .map_err(|_| syntax(line, format!("invalid {what} '{token}'")))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(syntax(line, format!("non-finite {what}")))
    }
}

/// Reads an `r g b` triple; a lone value is replicated to all channels.
fn parse_rgb<'a>(mut parts: impl Iterator<Item = &'a str>, line: usize) -> Result<[f32; 3], ParseError> {
    let r = parse_f32(parts.next(), line, "red component")?;
    match parts.next() {
        None => Ok([r, r, r]),
        Some(g) => {
            let g = parse_f32(Some(g), line, "green component")?;
            let b = parse_f32(parts.next(), line, "blue component")?;
            Ok([r, g, b])
        }
    }
}

/// Rest of the line after the keyword, for names that may contain spaces.
fn rest_of<'a>(trimmed: &'a str, keyword: &str) -> &'a str {
    trimmed[keyword.len()..].trim()
}

// ===============
// === Material ===
// ===============

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub shininess: f32,
    pub opacity: f32,
    pub diffuse_map: Option<String>,
}

impl Material {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ambient: [0.0; 3],
            diffuse: [1.0; 3],
            specular: [0.0; 3],
            shininess: 0.0,
            opacity: 1.0,
            diffuse_map: None,
        }
    }
}

/// Materials in declaration order. Lookup is by exact name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialLibrary {
    pub materials: Vec<Material>,
}

impl MaterialLibrary {
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.materials.iter().position(|m| m.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&Material> {
        self.index_of(name).map(|i| &self.materials[i])
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

/// Parse an MTL library from any `Read` source.
pub fn parse_mtl<R: Read>(reader: R) -> Result<MaterialLibrary, ParseError> {
    let mut library = MaterialLibrary::default();

    for (index, line_result) in BufReader::new(reader).lines().enumerate() {
        let line = line_result?;
        let line_no = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let Some(keyword) = parts.next() else {
            continue;
        };

        if keyword == "newmtl" {
            let name = rest_of(trimmed, keyword);
            if name.is_empty() {
                return Err(syntax(line_no, "newmtl without a name"));
            }
            library.materials.push(Material::named(name));
            continue;
        }

        // Any other record needs an open material.
        let Some(current) = library.materials.last_mut() else {
            if matches!(keyword, "Ka" | "Kd" | "Ks" | "Ns" | "d" | "Tr" | "map_Kd") {
                return Err(syntax(line_no, format!("'{keyword}' before any newmtl")));
            }
            continue;
        };

        match keyword {
            "Ka" => current.ambient = parse_rgb(parts, line_no)?,
            "Kd" => current.diffuse = parse_rgb(parts, line_no)?,
            "Ks" => current.specular = parse_rgb(parts, line_no)?,
            "Ns" => current.shininess = parse_f32(parts.next(), line_no, "specular exponent")?,
            "d" => current.opacity = parse_f32(parts.next(), line_no, "opacity")?.clamp(0.0, 1.0),
            "Tr" => {
                current.opacity =
                    (1.0 - parse_f32(parts.next(), line_no, "transparency")?).clamp(0.0, 1.0)
            }
            "map_Kd" => {
                // Options such as `-s 1 1 1` precede the path; the path is the last token.
                let path = trimmed.split_whitespace().last().unwrap_or_default();
                if path == keyword {
                    return Err(syntax(line_no, "map_Kd without a path"));
                }
                current.diffuse_map = Some(path.to_owned());
            }
            _ => {}
        }
    }

    Ok(library)
}

// ===============
// === Geometry ===
// ===============

/// A run of triangles sharing one material.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub name: String,
    /// Index into the `MaterialLibrary` passed to `parse_obj`; `None` means default material.
    pub material: Option<usize>,
    /// Triangle list indices into `ObjModel::positions`.
    pub indices: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjModel {
    pub positions: Vec<[f32; 3]>,
    pub meshes: Vec<Mesh>,
    pub material_libs: Vec<String>,
}

impl ObjModel {
    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.indices.len() / 3).sum()
    }

    /// Bounds of every position referenced by a face. `None` when there are no faces.
    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(
            self.meshes
                .iter()
                .flat_map(|m| m.indices.iter())
                .map(|&i| self.positions[i as usize]),
        )
    }
}

fn resolve_index(token: &str, vertex_count: usize, line: usize) -> Result<u32, ParseError> {
    let head = token.split('/').next().unwrap_or_default();
    let raw: i64 = head
        .parse()
        .map_err(|_| syntax(line, format!("invalid face index '{token}'")))?;

    let resolved = match raw {
        0 => return Err(syntax(line, "face index 0 is not valid")),
        n if n > 0 => n - 1,
        n => vertex_count as i64 + n,
    };

    if resolved < 0 || resolved as usize >= vertex_count {
        return Err(syntax(
            line,
            format!("face index {raw} out of range ({vertex_count} positions)"),
        ));
    }
    Ok(resolved as u32)
}

/// Parse OBJ geometry, binding `usemtl` names against `materials`.
///
/// Unknown material names bind to the default material rather than failing,
/// matching how props exported with stray material names still render.
pub fn parse_obj<R: Read>(reader: R, materials: &MaterialLibrary) -> Result<ObjModel, ParseError> {
    let mut model = ObjModel::default();
    let mut current = Mesh {
        name: String::new(),
        material: None,
        indices: Vec::new(),
    };
    let mut polygon: Vec<u32> = Vec::with_capacity(8);

    for (index, line_result) in BufReader::new(reader).lines().enumerate() {
        let line = line_result?;
        let line_no = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let Some(keyword) = parts.next() else {
            continue;
        };

        match keyword {
            "v" => {
                let x = parse_f32(parts.next(), line_no, "x coordinate")?;
                let y = parse_f32(parts.next(), line_no, "y coordinate")?;
                let z = parse_f32(parts.next(), line_no, "z coordinate")?;
                model.positions.push([x, y, z]);
            }
            "f" => {
                polygon.clear();
                for token in parts {
                    polygon.push(resolve_index(token, model.positions.len(), line_no)?);
                }
                if polygon.len() < 3 {
                    return Err(syntax(line_no, "face needs at least three vertices"));
                }
                for i in 1..polygon.len() - 1 {
                    current
                        .indices
                        .extend_from_slice(&[polygon[0], polygon[i], polygon[i + 1]]);
                }
            }
            "o" | "g" => {
                let name = rest_of(trimmed, keyword).to_owned();
                if current.indices.is_empty() {
                    current.name = name;
                } else {
                    let material = current.material;
                    let finished = std::mem::replace(
                        &mut current,
                        Mesh {
                            name,
                            material,
                            indices: Vec::new(),
                        },
                    );
                    model.meshes.push(finished);
                }
            }
            "usemtl" => {
                let material = materials.index_of(rest_of(trimmed, keyword));
                if current.indices.is_empty() {
                    current.material = material;
                } else {
                    let name = current.name.clone();
                    let finished = std::mem::replace(
                        &mut current,
                        Mesh {
                            name,
                            material,
                            indices: Vec::new(),
                        },
                    );
                    model.meshes.push(finished);
                }
            }
            "mtllib" => model.material_libs.push(rest_of(trimmed, keyword).to_owned()),
            _ => {}
        }
    }

    if !current.indices.is_empty() {
        model.meshes.push(current);
    }

    Ok(model)
}

// ==========
// === AABB ===
// ==========

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Aabb {
    pub fn from_points<I: IntoIterator<Item = [f32; 3]>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut aabb = Self {
            min: first,
            max: first,
        };
        for p in iter {
            aabb.include(p);
        }
        Some(aabb)
    }

    #[inline]
    pub fn include(&mut self, p: [f32; 3]) {
        for axis in 0..3 {
            self.min[axis] = self.min[axis].min(p[axis]);
            self.max[axis] = self.max[axis].max(p[axis]);
        }
    }

    #[inline]
    pub fn size(&self) -> [f32; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    /// Largest of the three extents.
    #[inline]
    pub fn max_extent(&self) -> f32 {
        let [x, y, z] = self.size();
        x.max(y).max(z)
    }

    #[inline]
    pub fn center(&self) -> [f32; 3] {
        [
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        ]
    }
}
