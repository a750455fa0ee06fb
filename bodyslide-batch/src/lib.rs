pub mod build;
pub mod config;
pub mod mesh;

pub use build::{build_outfit, build_outfits, preview_outfit, BatchReport, BuildError, BuiltOutfit};
pub use config::{BuildConfig, ConfigError, PresetValue};
pub use mesh::{Mesh, MeshError, MeshIo, ShapeGeometry};
