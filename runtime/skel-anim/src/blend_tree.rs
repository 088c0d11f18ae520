//! Parametric blend trees
//!
//! A blend tree positions its children in a 1D, 2D or 3D blend space and
//! weights them by how close the live parameter point is to each of them.
//! Weight vectors are always non-negative and sum to 1 (or are all zero for
//! a tree without children).
//!
//! | Blend type           | Parameters | Weighting                                     |
//! |----------------------|------------|-----------------------------------------------|
//! | `Angle`              | 1          | nearest child on each side, wrap-aware        |
//! | `Blend1D`            | 1          | bracketing pair along the sorted axis         |
//! | `Blend2DDirectional` | 2          | bracketing pair by direction, faded to origin |
//! | `Blend2DBarycentric` | 2          | triangle of the three nearest children        |
//! | `Blend3DBarycentric` | 3          | inverse square distance                       |

use std::cmp::Ordering;

use glam::{Quat, Vec2, Vec3};

#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

use crate::layer::NodeRef;
use crate::pose::blend_joints;
use crate::types::{Aabb, JointPose, WeightedBlend, fold_fraction};
use crate::view::LayerView;

const EPSILON: f32 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum BlendType {
    Angle,
    #[default]
    Blend1D,
    Blend2DDirectional,
    Blend2DBarycentric,
    Blend3DBarycentric,
}

impl BlendType {
    /// Number of parameters consumed
    pub const fn dimensions(self) -> usize {
        match self {
            Self::Angle | Self::Blend1D => 1,
            Self::Blend2DDirectional | Self::Blend2DBarycentric => 2,
            Self::Blend3DBarycentric => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimBlendTree {
    name: String,
    blend_type: BlendType,
    parameter_indices: [Option<usize>; 3],
    children: Vec<NodeRef>,
}

impl AnimBlendTree {
    pub fn new(name: impl Into<String>, blend_type: BlendType) -> Self {
        Self {
            name: name.into(),
            blend_type,
            parameter_indices: [None; 3],
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn blend_type(&self) -> BlendType {
        self.blend_type
    }

    pub fn set_blend_type(&mut self, blend_type: BlendType) {
        self.blend_type = blend_type;
    }

    /// Parameter driving blend space axis `axis`
    pub fn parameter_index(&self, axis: usize) -> Option<usize> {
        self.parameter_indices.get(axis).copied().flatten()
    }

    pub fn set_parameter_index(&mut self, axis: usize, index: Option<usize>) {
        if let Some(slot) = self.parameter_indices.get_mut(axis) {
            *slot = index;
        } else {
            log::warn!("Blend tree '{}': axis {} out of range", self.name, axis);
        }
    }

    pub fn children(&self) -> &[NodeRef] {
        &self.children
    }

    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<NodeRef> {
        &mut self.children
    }

    fn blend_point(&self, view: &LayerView) -> Vec3 {
        let dimensions = self.blend_type.dimensions();
        let mut point = Vec3::ZERO;
        for axis in 0..dimensions {
            point[axis] = view.parameter(self.parameter_indices[axis]);
        }
        point
    }

    fn child_positions(&self, view: &LayerView) -> Vec<Vec3> {
        self.children
            .iter()
            .map(|&child| {
                view.layer()
                    .node_blend_space_vector(child)
                    .unwrap_or(Vec3::ZERO)
            })
            .collect()
    }

    /// One weight per child for the current parameter values
    pub fn compute_children_weights(&self, view: &LayerView) -> Vec<f32> {
        let point = self.blend_point(view);
        let positions = self.child_positions(view);

        match self.blend_type {
            BlendType::Angle => {
                let angles: Vec<f32> = positions.iter().map(|p| p.x).collect();
                angle_weights(&angles, point.x)
            }
            BlendType::Blend1D => {
                let xs: Vec<f32> = positions.iter().map(|p| p.x).collect();
                linear_weights(&xs, point.x)
            }
            BlendType::Blend2DDirectional => {
                let points: Vec<Vec2> = positions.iter().map(|p| p.truncate()).collect();
                directional_weights(&points, point.truncate())
            }
            BlendType::Blend2DBarycentric => {
                let points: Vec<Vec2> = positions.iter().map(|p| p.truncate()).collect();
                barycentric_2d_weights(&points, point.truncate())
            }
            BlendType::Blend3DBarycentric => inverse_distance_weights(&positions, point),
        }
    }

    fn weighted_children(&self, view: &LayerView) -> impl Iterator<Item = (NodeRef, f32)> {
        let weights = self.compute_children_weights(view);
        self.children
            .clone()
            .into_iter()
            .zip(weights)
            .filter(|&(_, weight)| weight > 0.0)
    }

    /// Representative duration in milliseconds
    pub fn duration(&self, view: &LayerView) -> f32 {
        if let [child] = self.children.as_slice() {
            return view.node_duration(*child);
        }
        let mut blend = WeightedBlend::new();
        for (child, weight) in self.weighted_children(view) {
            blend.add(weight, view.node_duration(child));
        }
        blend.into_value().unwrap_or(0.0)
    }

    pub fn frame(&self, view: &LayerView, normalized_time: f32, out: &mut [JointPose]) {
        if let [child] = self.children.as_slice() {
            view.node_frame(*child, normalized_time, out);
            return;
        }

        let mut scratch: Option<Vec<JointPose>> = None;
        let mut total = 0.0;
        for (child, weight) in self.weighted_children(view) {
            match fold_fraction(&mut total, weight) {
                None => view.node_frame(child, normalized_time, out),
                Some(fraction) => {
                    let buffer = scratch.get_or_insert_with(|| out.to_vec());
                    view.node_frame(child, normalized_time, buffer);
                    blend_joints(out, buffer, fraction, view.mask_joints());
                }
            }
        }
    }

    pub fn translation(&self, view: &LayerView, normalized_time: f32) -> Vec3 {
        if let [child] = self.children.as_slice() {
            return view.node_translation(*child, normalized_time);
        }
        let mut blend = WeightedBlend::new();
        for (child, weight) in self.weighted_children(view) {
            blend.add(weight, view.node_translation(child, normalized_time));
        }
        blend.into_value().unwrap_or(Vec3::ZERO)
    }

    pub fn rotation(&self, view: &LayerView, normalized_time: f32) -> Quat {
        if let [child] = self.children.as_slice() {
            return view.node_rotation(*child, normalized_time);
        }
        let mut blend = WeightedBlend::new();
        for (child, weight) in self.weighted_children(view) {
            blend.add(weight, view.node_rotation(child, normalized_time));
        }
        blend.into_value().unwrap_or(Quat::IDENTITY)
    }

    pub fn aabb(&self, view: &LayerView, normalized_time: f32) -> Aabb {
        let mut aabb = Aabb::cleared();
        for (child, _) in self.weighted_children(view) {
            aabb.add_aabb(&view.node_aabb(child, normalized_time));
        }
        aabb
    }
}

/// Clamp negatives away and scale to a unit sum
fn normalize(weights: &mut [f32]) {
    for weight in weights.iter_mut() {
        *weight = weight.max(0.0);
    }
    let sum: f32 = weights.iter().sum();
    if sum > 0.0 {
        for weight in weights.iter_mut() {
            *weight /= sum;
        }
    }
}

fn single(len: usize, index: usize) -> Vec<f32> {
    let mut weights = vec![0.0; len];
    weights[index] = 1.0;
    weights
}

fn nearest(distances: &[f32]) -> Option<usize> {
    distances
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(Ordering::Equal))
        .map(|(index, _)| index)
}

/// Weights for children placed at `angles` (degrees) given `current` (degrees)
///
/// The nearest child counter-clockwise and the nearest child clockwise of
/// `current` share the weight in inverse proportion to their distance.
pub fn angle_weights(angles: &[f32], current: f32) -> Vec<f32> {
    match angles.len() {
        0 => return Vec::new(),
        1 => return vec![1.0],
        _ => {}
    }

    let offsets: Vec<f32> = angles
        .iter()
        .map(|&angle| (angle - current).rem_euclid(360.0))
        .collect();

    if let Some(hit) = offsets
        .iter()
        .position(|&offset| offset < EPSILON || 360.0 - offset < EPSILON)
    {
        return single(angles.len(), hit);
    }

    let mut upper = 0;
    let mut lower = 0;
    for (index, &offset) in offsets.iter().enumerate() {
        if offset < offsets[upper] {
            upper = index;
        }
        if offset > offsets[lower] {
            lower = index;
        }
    }

    let mut weights = vec![0.0; angles.len()];
    if upper == lower {
        weights[upper] = 1.0;
        return weights;
    }
    let to_upper = offsets[upper];
    let to_lower = 360.0 - offsets[lower];
    weights[upper] = to_lower / (to_lower + to_upper);
    weights[lower] = to_upper / (to_lower + to_upper);
    weights
}

/// Weights for children placed along one axis
///
/// Outside the covered range the end child takes everything.
pub fn linear_weights(positions: &[f32], x: f32) -> Vec<f32> {
    if positions.is_empty() {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..positions.len()).collect();
    order.sort_by(|&a, &b| {
        positions[a]
            .partial_cmp(&positions[b])
            .unwrap_or(Ordering::Equal)
    });

    let first = order[0];
    let last = order[order.len() - 1];
    if x <= positions[first] {
        return single(positions.len(), first);
    }
    if x >= positions[last] {
        return single(positions.len(), last);
    }

    let mut weights = vec![0.0; positions.len()];
    for pair in order.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if x >= positions[a] && x < positions[b] {
            let span = positions[b] - positions[a];
            if span <= EPSILON {
                weights[b] = 1.0;
            } else {
                let t = (x - positions[a]) / span;
                weights[a] = 1.0 - t;
                weights[b] = t;
            }
            break;
        }
    }
    normalize(&mut weights);
    weights
}

/// Weights for children placed by direction around an optional origin child
///
/// The two children bracketing the direction of `point` are weighted by
/// angle. If a child sits at the origin, the result is faded towards it by
/// `|point|` relative to the interpolated radius of the bracketing pair.
pub fn directional_weights(points: &[Vec2], point: Vec2) -> Vec<f32> {
    let count = points.len();
    if count == 0 {
        return Vec::new();
    }

    let origin = points.iter().position(|p| p.length() < EPSILON);
    let ring: Vec<usize> = (0..count).filter(|&index| Some(index) != origin).collect();

    if let Some(origin) = origin
        && (ring.is_empty() || point.length() < EPSILON)
    {
        return single(count, origin);
    }

    let current = point.y.atan2(point.x).to_degrees();
    let angles: Vec<f32> = ring
        .iter()
        .map(|&index| points[index].y.atan2(points[index].x).to_degrees())
        .collect();
    let ring_weights = angle_weights(&angles, current);

    let mut weights = vec![0.0; count];
    match origin {
        Some(origin) => {
            let radius: f32 = ring
                .iter()
                .zip(&ring_weights)
                .map(|(&index, &weight)| points[index].length() * weight)
                .sum();
            let t = if radius > EPSILON {
                (point.length() / radius).clamp(0.0, 1.0)
            } else {
                1.0
            };
            for (&index, &weight) in ring.iter().zip(&ring_weights) {
                weights[index] = weight * t;
            }
            weights[origin] = 1.0 - t;
        }
        None => {
            for (&index, &weight) in ring.iter().zip(&ring_weights) {
                weights[index] = weight;
            }
        }
    }
    normalize(&mut weights);
    weights
}

/// Barycentric weights over the triangle of the three nearest children
pub fn barycentric_2d_weights(points: &[Vec2], point: Vec2) -> Vec<f32> {
    let count = points.len();
    let distances: Vec<f32> = points.iter().map(|p| p.distance_squared(point)).collect();
    let Some(closest) = nearest(&distances) else {
        return Vec::new();
    };
    if count == 1 || distances[closest] < EPSILON {
        return single(count, closest);
    }
    if count == 2 {
        let axis = (points[1] - points[0]).normalize_or_zero();
        let xs: Vec<f32> = points.iter().map(|p| p.dot(axis)).collect();
        return linear_weights(&xs, point.dot(axis));
    }

    let mut order: Vec<usize> = (0..count).collect();
    order.sort_by(|&a, &b| distances[a].partial_cmp(&distances[b]).unwrap_or(Ordering::Equal));
    let (ia, ib, ic) = (order[0], order[1], order[2]);
    let (a, b, c) = (points[ia], points[ib], points[ic]);

    let v0 = b - a;
    let v1 = c - a;
    let v2 = point - a;
    let d00 = v0.dot(v0);
    let d01 = v0.dot(v1);
    let d11 = v1.dot(v1);
    let d20 = v2.dot(v0);
    let d21 = v2.dot(v1);
    let denom = d00 * d11 - d01 * d01;
    if denom.abs() < EPSILON {
        return single(count, closest);
    }
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    let u = 1.0 - v - w;

    let mut weights = vec![0.0; count];
    weights[ia] = u;
    weights[ib] = v;
    weights[ic] = w;
    normalize(&mut weights);
    if weights.iter().all(|&weight| weight == 0.0) {
        return single(count, closest);
    }
    weights
}

/// Inverse square distance weights in 3D blend space
pub fn inverse_distance_weights(positions: &[Vec3], point: Vec3) -> Vec<f32> {
    let distances: Vec<f32> = positions.iter().map(|p| p.distance_squared(point)).collect();
    let Some(closest) = nearest(&distances) else {
        return Vec::new();
    };
    if distances[closest] < EPSILON {
        return single(positions.len(), closest);
    }
    let mut weights: Vec<f32> = distances.iter().map(|d| 1.0 / d).collect();
    normalize(&mut weights);
    weights
}
