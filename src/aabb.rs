use glam::{Affine3A, Vec3};

/// Axis aligned box in world or model space.
///
/// An `Aabb` with `min > max` on any axis is empty. [`Aabb::EMPTY`] is the identity for
/// [`Aabb::union`] and [`Aabb::expand_to`].
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Aabb::EMPTY
    }
}

impl Aabb {
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size * 0.5;
        Aabb {
            min: center - half,
            max: center + half,
        }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut aabb = Aabb::EMPTY;
        for p in points {
            aabb.expand_to(p);
        }
        aabb
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y || self.max.z < self.min.z
    }

    /// Non-empty and every coordinate finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        !self.is_empty() && self.min.is_finite() && self.max.is_finite()
    }

    #[inline]
    pub fn expand_to(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Box around all eight corners after applying `affine`.
    pub fn transformed(&self, affine: &Affine3A) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        let mut out = Aabb::EMPTY;
        for i in 0..8u8 {
            let corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            out.expand_to(affine.transform_point3(corner));
        }
        out
    }

    /// Zero for an empty box.
    #[inline]
    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            return Vec3::ZERO;
        }
        self.max - self.min
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        if self.is_empty() {
            return Vec3::ZERO;
        }
        (self.max + self.min) / 2.0
    }

    /// Largest extent along any of the three axes.
    #[inline]
    pub fn max_extent(&self) -> f32 {
        self.size().max_element()
    }
}

#[cfg(test)]
mod tests {
    use glam::{vec3, Affine3A, Quat};

    use super::Aabb;

    #[test]
    fn empty_box_has_no_size() {
        assert!(Aabb::EMPTY.is_empty());
        assert_eq!(Aabb::EMPTY.size(), glam::Vec3::ZERO);
        assert_eq!(Aabb::from_points(std::iter::empty()), Aabb::EMPTY);
    }

    #[test]
    fn points_extend_box() {
        let aabb = Aabb::from_points([vec3(-5.0, -2.0, 1.0), vec3(5.0, 2.0, -9.0)]);
        assert_eq!(aabb.center(), vec3(0.0, 0.0, -4.0));
        assert_eq!(aabb.size(), vec3(10.0, 4.0, 10.0));
        assert_eq!(aabb.max_extent(), 10.0);
    }

    #[test]
    fn flip_about_x_mirrors_y_and_z() {
        let aabb = Aabb::new(vec3(0.0, 1.0, 2.0), vec3(1.0, 3.0, 4.0));
        let flipped = aabb.transformed(&Affine3A::from_quat(Quat::from_xyzw(1.0, 0.0, 0.0, 0.0)));
        assert!((flipped.min - vec3(0.0, -3.0, -4.0)).length() < 1e-5);
        assert!((flipped.max - vec3(1.0, -1.0, -2.0)).length() < 1e-5);
    }
}
