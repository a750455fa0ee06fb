use bytemuck::{cast_slice, cast_slice_mut, Pod};
use glam::{Vec2, Vec3};

use crate::{
    diff::DiffDataSets,
    math::{invert, weight_blend},
    slider::SliderData,
};

/// A slider as seen by the composer: its live value plus the flags and diff
/// names that decide how that value is applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SliderValue {
    pub name: String,
    pub value: f32,
    pub zap: bool,
    pub uv: bool,
    pub invert: bool,
    pub clamp: bool,
    pub linked_data_sets: Vec<String>,
}

impl SliderValue {
    pub fn from_slider(slider: &SliderData, value: f32) -> Self {
        SliderValue {
            name: slider.name.clone(),
            value,
            zap: slider.flags.zap(),
            uv: slider.flags.uv(),
            invert: slider.flags.invert(),
            clamp: slider.flags.clamp(),
            linked_data_sets: slider
                .data_files
                .iter()
                .map(|df| df.data_name.clone())
                .collect(),
        }
    }
}

/// Applies every slider to the buffers of `target`.
///
/// Clamps run after all other sliders so they always see the fully displaced
/// positions. Zaps don't move anything, they add the indices they cover to
/// `zap_out` for removal later.
pub fn apply_sliders(
    store: &DiffDataSets,
    target: &str,
    sliders: &[SliderValue],
    verts: &mut [Vec3],
    zap_out: &mut Vec<u16>,
    mut uvs: Option<&mut [Vec2]>,
) {
    for slider in sliders.iter().filter(|s| !s.clamp) {
        if slider.zap && !slider.uv {
            if slider.value > 0.0 {
                for set in &slider.linked_data_sets {
                    store.get_diff_indices(set, target, zap_out);
                }
            }
            continue;
        }

        let value = if slider.invert {
            invert(slider.value)
        } else {
            slider.value
        };

        for set in &slider.linked_data_sets {
            if slider.uv {
                if let Some(uvs) = uvs.as_deref_mut() {
                    store.apply_uv_diff(set, target, value, uvs);
                }
            } else {
                store.apply_diff(set, target, value, verts);
            }
        }
    }

    for slider in sliders.iter().filter(|s| s.clamp && s.value > 0.0) {
        for set in &slider.linked_data_sets {
            store.apply_clamp(set, target, verts);
        }
    }
}

/// One shape after composition at a single weight.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComposedShape {
    pub verts: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub zapped: Vec<u16>,
}

pub fn compose_shape(
    store: &DiffDataSets,
    target: &str,
    sliders: &[SliderValue],
    base_verts: &[Vec3],
    base_uvs: &[Vec2],
) -> ComposedShape {
    let mut shape = ComposedShape {
        verts: base_verts.to_vec(),
        uvs: base_uvs.to_vec(),
        zapped: Vec::new(),
    };

    apply_sliders(
        store,
        target,
        sliders,
        &mut shape.verts,
        &mut shape.zapped,
        Some(shape.uvs.as_mut_slice()),
    );
    shape
}

mod sealed {
    pub trait Sealed {}

    impl Sealed for glam::Vec2 {}
    impl Sealed for glam::Vec3 {}
}

/// Vectors made of nothing but `f32` components. Implemented for `Vec2` and
/// `Vec3`.
pub trait FloatVector: Pod + sealed::Sealed {}

impl FloatVector for Vec2 {}
impl FloatVector for Vec3 {}

/// Blends two buffers of float vectors component-wise at `weight` percent
/// towards `high`. Only the common length is written.
pub fn blend_weights<T: FloatVector>(low: &[T], high: &[T], weight: f32, out: &mut [T]) {
    let low: &[f32] = cast_slice(low);
    let high: &[f32] = cast_slice(high);
    let out: &mut [f32] = cast_slice_mut(out);

    for ((out, low), high) in out.iter_mut().zip(low).zip(high) {
        *out = weight_blend(*low, *high, weight);
    }
}

/// Removes the zapped indices from `buffer`, highest first so the indices
/// still to be removed stay valid. Out of range indices are ignored.
pub fn remove_zapped<T>(buffer: &mut Vec<T>, zapped: &[u16]) {
    let mut indices = zapped.to_vec();
    indices.sort_unstable_by(|a, b| b.cmp(a));
    indices.dedup();

    for index in indices {
        let index = index as usize;
        if index < buffer.len() {
            buffer.remove(index);
        }
    }
}

/// Mixes the low and high compositions of a shape at `weight` and drops the
/// vertices either of them zapped.
pub fn preview_shape(low: &ComposedShape, high: &ComposedShape, weight: f32) -> ComposedShape {
    let mut verts = low.verts.clone();
    blend_weights(&low.verts, &high.verts, weight, &mut verts);

    let mut uvs = low.uvs.clone();
    blend_weights(&low.uvs, &high.uvs, weight, &mut uvs);

    let mut zapped: Vec<u16> = low.zapped.iter().chain(&high.zapped).copied().collect();
    zapped.sort_unstable();
    zapped.dedup();

    remove_zapped(&mut verts, &zapped);
    remove_zapped(&mut uvs, &zapped);

    ComposedShape { verts, uvs, zapped }
}
