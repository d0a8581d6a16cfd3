pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Deterministic unit direction for index pairs that end up on top of each
/// other, so coincident nodes separate the same way every run.
pub fn separation_dir(a: usize, b: usize) -> (f32, f32) {
    let angle = ((a as f32) * 0.618_034 + (b as f32) * 0.414_214) * std::f32::consts::TAU;
    (angle.cos(), angle.sin())
}
