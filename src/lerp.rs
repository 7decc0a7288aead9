use std::f32::consts::{PI, TAU};

pub trait Lerp {
    fn lerp(&self, other: &Self, factor: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp(&self, other: &Self, factor: f32) -> Self {
        *self + (*other - *self) * factor
    }
}

/// Wraps an angle in radians into `(-PI, PI]`.
///
/// `((a + PI) mod 2PI + 2PI) mod 2PI - PI` lands in `[-PI, PI)`, the lower bound is then
/// moved to the upper end so that a half turn is always reported as `+PI`.
#[inline]
pub fn wrap_angle(a: f32) -> f32 {
    let wrapped = ((a + PI) % TAU + TAU) % TAU - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Signed shortest rotation that takes `current` to `target`, in `(-PI, PI]`.
#[inline]
pub fn shortest_angle_delta(target: f32, current: f32) -> f32 {
    wrap_angle(target - current)
}

/// Moves `current` towards `target` along the shortest arc by `factor` of the remaining delta.
///
/// `factor` is clamped to `[0, 1]`, a factor of one lands exactly on the target direction.
#[inline]
pub fn approach_angle(current: f32, target: f32, factor: f32) -> f32 {
    current + shortest_angle_delta(target, current) * factor.clamp(0.0, 1.0)
}
