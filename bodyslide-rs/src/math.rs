/// Mixes the low and high weight variants of a value, `weight` being a
/// percentage towards `high`.
pub fn weight_blend(low: f32, high: f32, weight: f32) -> f32 {
    low * (100.0 - weight) / 100.0 + high * weight / 100.0
}

/// Effective value of a slider whose diffs are authored back to front.
pub fn invert(value: f32) -> f32 {
    1.0 - value
}
