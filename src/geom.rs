// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Directed arcs, helices and their parametric samplers.
//!
//! Arcs are constructed in a 2-D working plane; `DirectedArc3` and `Helix`
//! carry the 4x4 transform that places the plane in machine space.  All
//! samplers map the parameter range `0..=1` onto the full primitive.

use glam::{DMat3, DMat4, DVec2, DVec3};

/// Traversal direction of an arc in its plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcDirection {
    /// Clockwise.
    Clw,
    /// Counter-clockwise.
    Cclw,
}

/// A directed circular arc in the plane, from `point1` to `point2` around
/// `center`.
#[derive(Debug, Clone, Copy)]
pub struct DirectedArc2 {
    pub center: DVec2,
    pub point1: DVec2,
    pub point2: DVec2,
    pub dir: ArcDirection,
}

/// A directed arc positioned in space: the 2-D arc in the `z` plane of the
/// local frame, mapped out by `transform`.
#[derive(Debug, Clone, Copy)]
pub struct DirectedArc3 {
    pub arc2: DirectedArc2,
    pub transform: DMat4,
    pub z: f64,
}

/// A helix: `turn` full revolutions of `arc2` plus its final sweep, with the
/// local z coordinate moving linearly from `z_start` to `z_end`.
#[derive(Debug, Clone, Copy)]
pub struct Helix {
    pub arc2: DirectedArc2,
    pub transform: DMat4,
    pub z_start: f64,
    pub z_end: f64,
    pub turn: u32,
}

fn midpoint(p1: DVec2, p2: DVec2) -> DVec2 {
    (p1 + p2) * 0.5
}

/// Unit normal of the segment `p1 -> p2`, rotated 90 degrees clockwise when
/// `right` is set, counter-clockwise otherwise.
fn normal(p1: DVec2, p2: DVec2, right: bool) -> DVec2 {
    let n = (p2 - p1).normalize();
    if right {
        DVec2::new(n.y, -n.x)
    } else {
        DVec2::new(-n.y, n.x)
    }
}

/// Intersection of the lines `p1 p2` and `p3 p4`.
fn intersect(p1: DVec2, p2: DVec2, p3: DVec2, p4: DVec2) -> DVec2 {
    let d = (p1.x - p2.x) * (p3.y - p4.y) - (p1.y - p2.y) * (p3.x - p4.x);
    DVec2::new(
        ((p1.x * p2.y - p1.y * p2.x) * (p3.x - p4.x) - (p1.x - p2.x) * (p3.x * p4.y - p3.y * p4.x)) / d,
        ((p1.x * p2.y - p1.y * p2.x) * (p3.y - p4.y) - (p1.y - p2.y) * (p3.x * p4.y - p3.y * p4.x)) / d,
    )
}

/// Signed angle from `v1` to `v2`, counter-clockwise positive.
fn oriented_angle(v1: DVec2, v2: DVec2) -> f64 {
    v1.perp_dot(v2).atan2(v1.dot(v2))
}

fn rotate(v: DVec2, angle: f64) -> DVec2 {
    DVec2::from_angle(angle).rotate(v)
}

impl DirectedArc2 {
    /// Construct from a center and both end points.  The center must be
    /// equidistant from the end points within `tolerance`; the stored center
    /// is recomputed from the averaged radius.  Coincident end points give a
    /// degenerate full-circle arc.
    pub fn from_center(
        center: DVec2,
        point1: DVec2,
        point2: DVec2,
        dir: ArcDirection,
        tolerance: f64,
    ) -> Option<Self> {
        if (point1 - point2).abs().max_element() < 1e-12 {
            return Some(DirectedArc2 { center, point1: point2, point2, dir });
        }

        let dist1 = center.distance(point1);
        let dist2 = center.distance(point2);
        if (dist1 - dist2).abs() > tolerance {
            return None;
        }
        let radius = (dist1 + dist2) * 0.5;

        // Pick the radius solution whose center is nearest the given one.
        let eps = 1e-14;
        let arc1 = Self::from_radius(point1, point2, radius, dir, eps);
        let arc2 = Self::from_radius(point1, point2, -radius, dir, eps);
        match (arc1, arc2) {
            (Some(a1), Some(a2)) => {
                if center.distance(a1.center) < center.distance(a2.center) {
                    Some(a1)
                } else {
                    Some(a2)
                }
            }
            _ => None,
        }
    }

    /// Construct from both end points and a signed radius.  A negative
    /// radius selects the longer of the two possible arcs.  If the end
    /// points are farther apart than the diameter, the chord midpoint is
    /// used as center when within `tolerance`.
    pub fn from_radius(
        point1: DVec2,
        point2: DVec2,
        radius: f64,
        dir: ArcDirection,
        tolerance: f64,
    ) -> Option<Self> {
        if radius == 0.0 {
            return None;
        }

        let pmid = midpoint(point1, point2);
        let dist = point1.distance(point2);

        let diameter = 2.0 * radius.abs();
        let center = if diameter < dist {
            if dist - diameter > tolerance {
                return None;
            }
            pmid
        } else {
            let chord_dir = (point2 - point1) / dist;
            let normal = if (radius > 0.0) ^ (dir == ArcDirection::Clw) {
                DVec2::new(-chord_dir.y, chord_dir.x) // rotate 90 degrees cclw
            } else {
                DVec2::new(chord_dir.y, -chord_dir.x) // rotate 90 degrees clw
            };
            pmid + normal * (radius * radius - dist * dist * 0.25).sqrt()
        };

        Some(DirectedArc2 { center, point1, point2, dir })
    }

    /// Construct through three points: the center is the intersection of the
    /// perpendicular bisectors, the direction follows the orientation of the
    /// triangle.
    pub fn from_three_points(
        point1: DVec2,
        point2: DVec2,
        point3: DVec2,
        _tolerance: f64,
    ) -> Option<Self> {
        let n1 = normal(point1, point2, false);
        let n2 = normal(point2, point3, false);
        let m1 = midpoint(point1, point2);
        let m2 = midpoint(point2, point3);

        let center = intersect(m1, m1 + n1, m2, m2 + n2);
        if !center.is_finite() {
            return None;
        }

        let angle = oriented_angle((point3 - point1).normalize(), (point2 - point1).normalize());
        let dir = if angle < 0.0 { ArcDirection::Cclw } else { ArcDirection::Clw };

        Some(DirectedArc2 { center, point1, point2: point3, dir })
    }
}

impl DirectedArc3 {
    /// Construct an arc through three points in space.  The arc plane is the
    /// triangle plane; the transform maps plane coordinates back to space.
    pub fn from_three_points(
        point1: DVec3,
        point2: DVec3,
        point3: DVec3,
        tolerance: f64,
    ) -> Option<Self> {
        let z = (point1 - point2).cross(point1 - point3).normalize();
        let x = (point3 - point1).normalize();
        let y = z.cross(x);

        let rot = DMat3::from_cols(x, y, z);
        let transform = DMat4::from_translation(point1) * DMat4::from_mat3(rot);
        let inv = transform.inverse();
        let p1 = inv.transform_point3(point1).truncate();
        let p2 = inv.transform_point3(point2).truncate();
        let p3 = inv.transform_point3(point3).truncate();

        let arc2 = DirectedArc2::from_three_points(p1, p2, p3, tolerance)?;
        Some(DirectedArc3 { arc2, transform, z: 0.0 })
    }
}

/// Sampler over a [`DirectedArc2`], precomputing the total sweep angle.
#[derive(Debug, Clone, Copy)]
pub struct DirectedArc2Sampler {
    center: DVec2,
    center_to_point1: DVec2,
    angle: f64,
}

impl DirectedArc2Sampler {
    const EPS: f64 = 1e-10;

    pub fn new(arc2: &DirectedArc2) -> Self {
        let center_to_point1 = arc2.point1 - arc2.center;
        let angle = Self::sweep_angle(center_to_point1, arc2.point2 - arc2.center, arc2.dir);
        DirectedArc2Sampler { center: arc2.center, center_to_point1, angle }
    }

    /// Total sweep angle, signed by direction.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Point at parameter `t` in `0..=1`.
    pub fn sample(&self, param: f64) -> DVec2 {
        self.center + rotate(self.center_to_point1, self.angle * param)
    }

    /// A vanishing sweep means a full revolution, otherwise the oriented
    /// angle is normalized into the direction's sign.
    fn sweep_angle(v1: DVec2, v2: DVec2, dir: ArcDirection) -> f64 {
        let a = oriented_angle(v1.normalize(), v2.normalize());
        if a.abs() <= Self::EPS {
            match dir {
                ArcDirection::Cclw => std::f64::consts::TAU,
                ArcDirection::Clw => -std::f64::consts::TAU,
            }
        } else {
            match dir {
                ArcDirection::Cclw if a < 0.0 => a + std::f64::consts::TAU,
                ArcDirection::Clw if a > 0.0 => a - std::f64::consts::TAU,
                _ => a,
            }
        }
    }
}

/// Sampler over a [`DirectedArc3`].
#[derive(Debug, Clone, Copy)]
pub struct DirectedArc3Sampler {
    transform: DMat4,
    z: f64,
    arc2_sampler: DirectedArc2Sampler,
}

impl DirectedArc3Sampler {
    pub fn new(arc3: &DirectedArc3) -> Self {
        DirectedArc3Sampler {
            transform: arc3.transform,
            z: arc3.z,
            arc2_sampler: DirectedArc2Sampler::new(&arc3.arc2),
        }
    }

    pub fn sample(&self, param: f64) -> DVec3 {
        let v = self.arc2_sampler.sample(param);
        self.transform.transform_point3(DVec3::new(v.x, v.y, self.z))
    }
}

/// Sampler over a [`Helix`].
#[derive(Debug, Clone, Copy)]
pub struct HelixSampler {
    transform: DMat4,
    z_start: f64,
    z_end: f64,
    turn: u32,
    arc2_sampler: DirectedArc2Sampler,
}

impl HelixSampler {
    pub fn new(helix: &Helix) -> Self {
        HelixSampler {
            transform: helix.transform,
            z_start: helix.z_start,
            z_end: helix.z_end,
            turn: helix.turn,
            arc2_sampler: DirectedArc2Sampler::new(&helix.arc2),
        }
    }

    pub fn sample(&self, param: f64) -> DVec3 {
        let z = self.z_start + (self.z_end - self.z_start) * param;
        let arc_angle = self.arc2_sampler.angle();
        let sample_param = if self.turn > 0 {
            // The full revolutions are traced first; the arc's own sweep is
            // the last partial turn of the parameter range.
            let turn_angle = (self.turn as f64 * std::f64::consts::TAU).copysign(arc_angle);
            let total_angle = turn_angle + arc_angle;
            let last_arc_start = 1.0 - arc_angle / total_angle;
            if param > last_arc_start {
                (param - last_arc_start) / (1.0 - last_arc_start)
            } else {
                param / last_arc_start * (std::f64::consts::TAU / arc_angle.abs()) * self.turn as f64
            }
        } else {
            param
        };

        let v = self.arc2_sampler.sample(sample_param);
        self.transform.transform_point3(DVec3::new(v.x, v.y, z))
    }
}

/// Axis-aligned bounding box of a point set.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundingBox {
    defined: bool,
    lower: DVec3,
    upper: DVec3,
}

impl BoundingBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(&mut self, point: DVec3) {
        if self.defined {
            self.lower = self.lower.min(point);
            self.upper = self.upper.max(point);
        } else {
            self.lower = point;
            self.upper = point;
            self.defined = true;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_defined(&self) -> bool {
        self.defined
    }

    pub fn lower(&self) -> DVec3 {
        self.lower
    }

    pub fn upper(&self) -> DVec3 {
        self.upper
    }

    pub fn center(&self) -> DVec3 {
        (self.lower + self.upper) * 0.5
    }
}
