use std::{
    collections::BTreeMap,
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};

use bodyslide_rs::{
    compose::{compose_shape, preview_shape, remove_zapped, ComposedShape},
    DiffDataSets, SliderData, SliderSet, SliderSetError, SliderSetFile, SliderValue,
};
use rayon::prelude::*;
use thiserror::Error;

use crate::{
    config::BuildConfig,
    mesh::{Mesh, MeshError, MeshIo, ShapeGeometry},
};

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("No recorded outfit name source")]
    NoSource,
    #[error("Unable to open slider set file: {}", path.display())]
    OpenSet {
        path: PathBuf,
        #[source]
        source: SliderSetError,
    },
    #[error("Unable to get slider set from file: {}", path.display())]
    GetSet {
        path: PathBuf,
        #[source]
        source: SliderSetError,
    },
    #[error("Unable to load input mesh: {}", path.display())]
    LoadMesh {
        path: PathBuf,
        #[source]
        source: MeshError,
    },
    #[error("Unable to create destination directory: {}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unable to save mesh file: {}", path.display())]
    SaveMesh {
        path: PathBuf,
        #[source]
        source: MeshError,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuiltOutfit {
    pub name: String,
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub built: Vec<BuiltOutfit>,
    pub failed: BTreeMap<String, String>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Builds every outfit in parallel. A failing outfit is recorded in the
/// report and never stops the others.
pub fn build_outfits(config: &BuildConfig, io: &dyn MeshIo, outfits: &[String]) -> BatchReport {
    log::info!(
        "Started batch build of {} outfits to {}",
        outfits.len(),
        config.output_data_path.display()
    );

    let count = AtomicUsize::new(0);
    let results: Vec<(&String, Result<BuiltOutfit, BuildError>)> = outfits
        .par_iter()
        .map(|outfit| {
            let n = count.fetch_add(1, Ordering::Relaxed) + 1;
            log::info!("Processing '{}' ({} of {})...", outfit, n, outfits.len());
            (outfit, build_outfit(config, io, outfit))
        })
        .collect();

    let mut report = BatchReport::default();
    for (outfit, result) in results {
        match result {
            Ok(built) => report.built.push(built),
            Err(err) => {
                log::error!("Failed to build '{}': {}", outfit, err);
                report.failed.insert(outfit.clone(), err.to_string());
            }
        }
    }

    report
}

pub fn build_outfit(
    config: &BuildConfig,
    io: &dyn MeshIo,
    outfit: &str,
) -> Result<BuiltOutfit, BuildError> {
    let (set, store, mesh) = prepare(config, io, outfit)?;

    let high = compose_mesh(&set, &store, &mesh, &slider_values(&set, config, true));

    let mut outputs = Vec::new();
    if set.gen_weights() {
        let low = compose_mesh(&set, &store, &mesh, &slider_values(&set, config, false));
        outputs.push(("_0", finish_mesh(&mesh, &low, &high)));
        outputs.push(("_1", finish_mesh(&mesh, &high, &high)));
    } else {
        outputs.push(("", finish_mesh(&mesh, &high, &high)));
    }

    let dir = config.output_data_path.join(&set.output_path);
    fs::create_dir_all(&dir).map_err(|source| BuildError::CreateDir {
        path: dir.clone(),
        source,
    })?;

    let base = config.output_data_path.join(set.output_file_path());
    let mut files = Vec::new();
    for (suffix, built) in outputs {
        let path = output_file(&base, suffix, io.extension());
        io.save(&path, &built).map_err(|source| BuildError::SaveMesh {
            path: path.clone(),
            source,
        })?;
        files.push(path);
    }

    Ok(BuiltOutfit {
        name: outfit.to_owned(),
        files,
    })
}

/// Composes the outfit at the configured weight without writing anything.
pub fn preview_outfit(
    config: &BuildConfig,
    io: &dyn MeshIo,
    outfit: &str,
) -> Result<Mesh, BuildError> {
    let (set, store, mut mesh) = prepare(config, io, outfit)?;

    let high = compose_mesh(&set, &store, &mesh, &slider_values(&set, config, true));
    let low = if set.gen_weights() {
        compose_mesh(&set, &store, &mesh, &slider_values(&set, config, false))
    } else {
        high.clone()
    };

    for (shape, high) in &high {
        let Some(low) = low.get(shape) else {
            continue;
        };

        let blended = preview_shape(low, high, config.weight);
        mesh.shapes.insert(
            shape.clone(),
            ShapeGeometry {
                verts: blended.verts,
                uvs: blended.uvs,
            },
        );
    }

    Ok(mesh)
}

fn prepare(
    config: &BuildConfig,
    io: &dyn MeshIo,
    outfit: &str,
) -> Result<(SliderSet, DiffDataSets, Mesh), BuildError> {
    let source = config
        .outfit_sources
        .get(outfit)
        .ok_or(BuildError::NoSource)?;

    let file = SliderSetFile::open(source).map_err(|err| BuildError::OpenSet {
        path: source.clone(),
        source: err,
    })?;

    let mut set = file.get_set(outfit).map_err(|err| BuildError::GetSet {
        path: source.clone(),
        source: err,
    })?;
    set.set_base_data_path(config.base_data_path());

    let input = set.input_file_name();
    let mesh = io.load(&input).map_err(|err| BuildError::LoadMesh {
        path: input.clone(),
        source: err,
    })?;

    let mut store = DiffDataSets::new();
    set.load_set_diff_data(&mut store, None);

    apply_zap_toggles(&mut set, config);
    Ok((set, store, mesh))
}

// Hidden zaps always follow the preset, visible ones the stored choice.
fn zap_value(set: &SliderSet, slider: &SliderData, config: &BuildConfig) -> f32 {
    let value = config.big_value(&slider.name, slider.default_value(true));
    if slider.flags.hidden() {
        return value;
    }

    match config.zap_choice(&set.name, &slider.name) {
        Some(true) => 1.0,
        Some(false) => 0.0,
        None => value,
    }
}

fn is_mesh_zap(slider: &SliderData) -> bool {
    slider.flags.zap() && !slider.flags.uv()
}

fn apply_zap_toggles(set: &mut SliderSet, config: &BuildConfig) {
    for index in 0..set.len() {
        let slider = &set[index];
        if slider.flags.clamp() || !is_mesh_zap(slider) {
            continue;
        }

        if zap_value(set, slider, config) != slider.default_value(true) {
            let name = slider.name.clone();
            set.toggle_zap_defaults(&name);
        }
    }
}

fn slider_values(set: &SliderSet, config: &BuildConfig, big: bool) -> Vec<SliderValue> {
    set.sliders
        .iter()
        .map(|slider| {
            let value = if slider.flags.clamp() {
                slider.default_value(big)
            } else if is_mesh_zap(slider) {
                zap_value(set, slider, config)
            } else if big {
                config.big_value(&slider.name, slider.default_value(true))
            } else {
                config.small_value(&slider.name, slider.default_value(false))
            };
            SliderValue::from_slider(slider, value)
        })
        .collect()
}

fn compose_mesh(
    set: &SliderSet,
    store: &DiffDataSets,
    mesh: &Mesh,
    values: &[SliderValue],
) -> BTreeMap<String, ComposedShape> {
    set.shapes()
        .filter_map(|(shape, _)| {
            let geometry = mesh.shapes.get(shape)?;
            let target = set.shape_to_target(shape).unwrap_or(shape);
            let composed = compose_shape(store, target, values, &geometry.verts, &geometry.uvs);
            Some((shape.to_owned(), composed))
        })
        .collect()
}

// Both weights drop the vertices zapped at the high weight. A shape that
// loses every vertex is removed from the mesh.
fn finish_mesh(
    base: &Mesh,
    composed: &BTreeMap<String, ComposedShape>,
    zaps: &BTreeMap<String, ComposedShape>,
) -> Mesh {
    let mut mesh = base.clone();

    for (shape, result) in composed {
        let zapped = zaps
            .get(shape)
            .map(|z| z.zapped.as_slice())
            .unwrap_or_default();

        let mut geometry = ShapeGeometry {
            verts: result.verts.clone(),
            uvs: result.uvs.clone(),
        };
        remove_zapped(&mut geometry.verts, zapped);
        remove_zapped(&mut geometry.uvs, zapped);

        if !zapped.is_empty() && geometry.verts.is_empty() {
            mesh.shapes.remove(shape);
        } else {
            mesh.shapes.insert(shape.clone(), geometry);
        }
    }

    mesh
}

fn output_file(base: &Path, suffix: &str, extension: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(suffix);
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}
