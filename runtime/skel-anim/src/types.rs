//! Common value types shared by the blending code

use glam::{Quat, Vec3};

#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

/// Local transform of a single joint relative to its parent
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde-support", serde(default))]
pub struct JointPose {
    pub rotation: Quat,
    pub translation: Vec3,
    pub scale: Vec3,
}

impl JointPose {
    pub const IDENTITY: Self = Self {
        rotation: Quat::IDENTITY,
        translation: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    pub const fn new(rotation: Quat, translation: Vec3, scale: Vec3) -> Self {
        Self {
            rotation,
            translation,
            scale,
        }
    }

    pub const fn from_translation(translation: Vec3) -> Self {
        Self {
            rotation: Quat::IDENTITY,
            translation,
            scale: Vec3::ONE,
        }
    }
}

impl Default for JointPose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Axis aligned bounding box
///
/// A cleared box has `min > max` on every axis, so the first point or box
/// added to it replaces it entirely.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub const fn cleared() -> Self {
        Self {
            min: Vec3::splat(f32::MAX),
            max: Vec3::splat(-f32::MAX),
        }
    }

    pub fn is_cleared(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn clear(&mut self) {
        *self = Self::cleared();
    }

    pub fn add_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Grow this box to also enclose `other`. Cleared boxes are ignored.
    pub fn add_aabb(&mut self, other: &Self) {
        if other.is_cleared() {
            return;
        }
        self.add_point(other.min);
        self.add_point(other.max);
    }

    pub fn translate(&mut self, offset: Vec3) {
        if self.is_cleared() {
            return;
        }
        self.min += offset;
        self.max += offset;
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::cleared()
    }
}

/// Trait for values that can be linearly interpolated
pub trait Lerp: Clone {
    /// Interpolate from `self` towards `other`, `t = 0` being `self`
    fn lerp(&self, other: &Self, t: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl Lerp for Vec3 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Self::lerp(*self, *other, t)
    }
}

impl Lerp for Quat {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        // glam picks the shorter arc
        self.slerp(*other, t)
    }
}

/// Running weighted average
///
/// Contributions are folded one at a time. The first contributor is taken
/// as is; each later one is blended in by `weight / total_weight_so_far`,
/// which yields the normalized weighted average independent of visiting
/// order. Non-positive weights are ignored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedBlend<T> {
    value: Option<T>,
    weight: f32,
}

impl<T: Lerp> WeightedBlend<T> {
    pub const fn new() -> Self {
        Self {
            value: None,
            weight: 0.0,
        }
    }

    /// Fold one contribution in. Returns `false` if it was ignored.
    pub fn add(&mut self, weight: f32, value: T) -> bool {
        if weight <= 0.0 {
            return false;
        }
        self.weight += weight;
        self.value = Some(match self.value.take() {
            None => value,
            Some(current) => current.lerp(&value, weight / self.weight),
        });
        true
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    /// Accumulated weight
    pub fn weight(&self) -> f32 {
        self.weight
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn into_value(self) -> Option<T> {
        self.value
    }
}

impl<T: Lerp> Default for WeightedBlend<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Blend fraction for folding `weight` into a running total
///
/// Returns `None` for the first contributor (assign directly) and updates
/// `total` in place. Used where the accumulator is a whole joint buffer.
pub(crate) fn fold_fraction(total: &mut f32, weight: f32) -> Option<f32> {
    let first = *total <= 0.0;
    *total += weight;
    if first { None } else { Some(weight / *total) }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn test_weighted_blend_is_order_independent() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 2.0, 4.0);

        let mut ab = WeightedBlend::new();
        ab.add(0.3, a);
        ab.add(0.7, b);

        let mut ba = WeightedBlend::new();
        ba.add(0.7, b);
        ba.add(0.3, a);

        let ab = ab.into_value().unwrap_or(Vec3::ZERO);
        let ba = ba.into_value().unwrap_or(Vec3::ZERO);
        assert!((ab - ba).length() < EPS);
        assert!((ab - (a * 0.3 + b * 0.7)).length() < EPS);
    }

    #[test]
    fn test_weighted_blend_ignores_zero_weight() {
        let mut blend = WeightedBlend::new();
        assert!(!blend.add(0.0, 5.0_f32));
        assert!(blend.is_empty());
        assert!(blend.add(0.25, 2.0));
        assert_eq!(blend.value(), Some(&2.0));
        assert!((blend.weight() - 0.25).abs() < EPS);
    }

    #[test]
    fn test_weighted_blend_quaternions_stay_normalized() {
        let mut blend = WeightedBlend::new();
        blend.add(0.5, Quat::IDENTITY);
        blend.add(0.5, Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        let q = blend.into_value().unwrap_or_default();
        assert!((q.length() - 1.0).abs() < EPS);
        let expected = Quat::from_rotation_y(std::f32::consts::FRAC_PI_4);
        assert!(q.angle_between(expected) < 1e-3);
    }

    #[test]
    fn test_fold_fraction() {
        let mut total = 0.0;
        assert_eq!(fold_fraction(&mut total, 0.4), None);
        let f = fold_fraction(&mut total, 0.6).unwrap_or_default();
        assert!((f - 0.6).abs() < EPS);
        assert!((total - 1.0).abs() < EPS);
    }

    #[test]
    fn test_aabb_union_and_translate() {
        let mut aabb = Aabb::cleared();
        assert!(aabb.is_cleared());
        aabb.add_aabb(&Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0)));
        aabb.add_aabb(&Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(3.0, 0.5, 0.5)));
        aabb.add_aabb(&Aabb::cleared());
        assert_eq!(aabb.min, Vec3::splat(-1.0));
        assert_eq!(aabb.max, Vec3::new(3.0, 1.0, 1.0));

        aabb.translate(Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(aabb.min, Vec3::new(-1.0, 1.0, -1.0));
        assert_eq!(aabb.max, Vec3::new(3.0, 3.0, 1.0));
    }
}
