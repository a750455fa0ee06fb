use std::{collections::BTreeMap, path::Path};

use glam::{Vec2, Vec3};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MeshError {
    #[error("could not access mesh file")]
    Io(#[from] std::io::Error),
    #[error("unsupported mesh: {0}")]
    Format(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapeGeometry {
    pub verts: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
}

/// The geometry a build touches, keyed by shape name. Everything else in the
/// mesh file belongs to the `MeshIo` implementation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub shapes: BTreeMap<String, ShapeGeometry>,
}

/// Reads and writes game meshes. Shared between all outfit builds of a batch.
pub trait MeshIo: Sync {
    fn load(&self, path: &Path) -> Result<Mesh, MeshError>;

    fn save(&self, path: &Path, mesh: &Mesh) -> Result<(), MeshError>;

    fn extension(&self) -> &str {
        "nif"
    }
}
