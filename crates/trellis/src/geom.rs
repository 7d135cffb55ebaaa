//! Shared geometry: bounds, frame transforms, obstacle tests and easing curves.

use serde::{Deserialize, Serialize};
use trellis_graph::Vec3;

/// Lengths below this are treated as zero.
pub const EPSILON: f64 = 1e-9;

/// Smallest half-size a bounds axis may have before frame transforms treat it as degenerate.
pub const MIN_HALF_SIZE: f64 = 1e-6;

const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

/// Unit direction derived from an integer seed.
///
/// Used wherever two points coincide and a separation direction is still required; the result
/// only depends on `seed`, so repeated runs separate the same pair the same way.
pub fn fallback_direction(seed: usize) -> Vec3 {
    let theta = seed as f64 * GOLDEN_ANGLE;
    let z = 0.5 * ((seed % 7) as f64 / 7.0 - 0.5);
    let r = (1.0 - z * z).sqrt();
    Vec3::new(r * theta.cos(), r * theta.sin(), z)
}

/// `v / |v|`, or `None` for (near) zero vectors.
pub fn try_normalize(v: Vec3) -> Option<Vec3> {
    let len = v.norm();
    if len.is_finite() && len > EPSILON {
        Some(v / len)
    } else {
        None
    }
}

/// Any unit vector perpendicular to `v`.
pub fn perpendicular(v: Vec3) -> Vec3 {
    let helper = if v.z.abs() < 0.9 * v.norm() {
        Vec3::z()
    } else {
        Vec3::x()
    };
    try_normalize(v.cross(&helper)).unwrap_or_else(Vec3::y)
}

/// Axis-aligned bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.inf(&max),
            max: min.sup(&max),
        }
    }

    pub fn from_center(center: Vec3, half_size: Vec3) -> Self {
        let h = half_size.map(f64::abs);
        Self::new(center - h, center + h)
    }

    /// Bounds enclosing spheres `(center, radius)`.
    pub fn around_spheres(spheres: impl IntoIterator<Item = (Vec3, f64)>) -> Option<Self> {
        let mut out: Option<Bounds> = None;
        for (c, r) in spheres {
            let b = Bounds::from_center(c, Vec3::repeat(r.max(0.0)));
            out = Some(match out {
                Some(acc) => acc.union(&b),
                None => b,
            });
        }
        out
    }

    pub fn union(&self, other: &Bounds) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) / 2.0
    }

    pub fn half_size(&self) -> Vec3 {
        (self.max - self.min) / 2.0
    }

    pub fn volume(&self) -> f64 {
        let s = self.max - self.min;
        s.x * s.y * s.z
    }

    pub fn expand(&self, pad: f64) -> Self {
        Self::new(self.min - Vec3::repeat(pad), self.max + Vec3::repeat(pad))
    }

    /// Shrinks every axis by `pad`, never below [`MIN_HALF_SIZE`].
    pub fn shrink(&self, pad: f64) -> Self {
        let half = self.half_size().map(|h| (h - pad).max(MIN_HALF_SIZE));
        Self::from_center(self.center(), half)
    }

    pub fn contains(&self, p: &Vec3) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }

    /// Half-size with degenerate axes replaced by [`MIN_HALF_SIZE`], so the frame transforms
    /// stay invertible.
    fn safe_half_size(&self) -> Vec3 {
        self.half_size().map(|h| {
            if h.is_finite() && h > MIN_HALF_SIZE {
                h
            } else {
                MIN_HALF_SIZE
            }
        })
    }

    /// World position to the local `[-1, 1]` frame: `(p - center) / half_size`.
    pub fn normalize(&self, p: &Vec3) -> Vec3 {
        (p - self.center()).component_div(&self.safe_half_size())
    }

    /// Local `[-1, 1]` frame to world position: `p * half_size + center`.
    pub fn denormalize(&self, p: &Vec3) -> Vec3 {
        p.component_mul(&self.safe_half_size()) + self.center()
    }

    /// The six face centers followed by the eight corners.
    pub fn connection_points(&self) -> Vec<Vec3> {
        let c = self.center();
        let h = self.half_size();
        let mut out = Vec::with_capacity(14);
        for axis in 0..3 {
            for sign in [-1.0, 1.0] {
                let mut p = c;
                p[axis] += sign * h[axis];
                out.push(p);
            }
        }
        for sx in [-1.0, 1.0] {
            for sy in [-1.0, 1.0] {
                for sz in [-1.0, 1.0] {
                    out.push(c + Vec3::new(sx * h.x, sy * h.y, sz * h.z));
                }
            }
        }
        out
    }

    /// Center of the face whose outward normal best matches `direction`.
    pub fn face_toward(&self, direction: &Vec3) -> Vec3 {
        let axis = dominant_axis(direction);
        let mut p = self.center();
        let sign = if direction[axis] < 0.0 { -1.0 } else { 1.0 };
        p[axis] += sign * self.half_size()[axis];
        p
    }
}

/// Index of the component with the largest magnitude (x on ties).
pub fn dominant_axis(v: &Vec3) -> usize {
    let a = v.map(f64::abs);
    if a.x >= a.y && a.x >= a.z {
        0
    } else if a.y >= a.z {
        1
    } else {
        2
    }
}

/// Distance from `p` to the segment `a`-`b`.
pub fn point_segment_distance(p: &Vec3, a: &Vec3, b: &Vec3) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq <= EPSILON {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

/// A spherical obstacle (a circle in the plane of any route through it).
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    pub center: Vec3,
    pub radius: f64,
    /// Node the obstacle was derived from.
    pub owner: String,
}

impl Obstacle {
    pub fn blocks(&self, a: &Vec3, b: &Vec3) -> bool {
        point_segment_distance(&self.center, a, b) < self.radius
    }
}

/// Whether any polyline segment passes through an obstacle.
pub fn polyline_blocked<'a>(
    points: &[Vec3],
    obstacles: impl IntoIterator<Item = &'a Obstacle> + Clone,
) -> bool {
    points
        .windows(2)
        .any(|w| obstacles.clone().into_iter().any(|o| o.blocks(&w[0], &w[1])))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Easing {
    Linear,
    EaseIn,
    EaseOut,
    #[default]
    EaseInOut,
}

impl Easing {
    /// Maps progress `t` (clamped to `[0, 1]`) through the curve.
    pub fn apply(self, t: f64) -> f64 {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 1.0 };
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t * t,
            Easing::EaseOut => {
                let u = 1.0 - t;
                1.0 - u * u * u
            }
            Easing::EaseInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = -2.0 * t + 2.0;
                    1.0 - u * u * u / 2.0
                }
            }
        }
    }
}

pub fn lerp(a: &Vec3, b: &Vec3, t: f64) -> Vec3 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_and_denormalize_are_inverse() {
        let bounds = Bounds::from_center(Vec3::new(40.0, -12.5, 3.0), Vec3::new(25.0, 8.0, 0.5));
        for p in [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(65.0, -4.5, 3.5),
            Vec3::new(-1e4, 3.25e3, 17.0),
            Vec3::new(40.0, -12.5, 3.0),
        ] {
            let round_trip = bounds.denormalize(&bounds.normalize(&p));
            assert!((round_trip - p).norm() < 1e-9 * (1.0 + p.norm()), "{p:?} -> {round_trip:?}");
        }
    }

    #[test]
    fn bounds_corners_map_to_unit_frame() {
        let bounds = Bounds::new(Vec3::new(-10.0, 0.0, 5.0), Vec3::new(10.0, 40.0, 15.0));
        assert_eq!(bounds.normalize(&bounds.max), Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(bounds.normalize(&bounds.min), Vec3::new(-1.0, -1.0, -1.0));
    }

    #[test]
    fn flat_bounds_stay_invertible() {
        let bounds = Bounds::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(10.0, 10.0, 0.0));
        let p = Vec3::new(3.0, 4.0, 0.0);
        let n = bounds.normalize(&p);
        assert!(n.iter().all(|v| v.is_finite()));
        assert!((bounds.denormalize(&n) - p).norm() < 1e-9);
    }

    #[test]
    fn easing_curves_hit_endpoints() {
        for e in [Easing::Linear, Easing::EaseIn, Easing::EaseOut, Easing::EaseInOut] {
            assert_eq!(e.apply(0.0), 0.0);
            assert_eq!(e.apply(1.0), 1.0);
            assert_eq!(e.apply(2.0), 1.0);
        }
        assert!((Easing::EaseInOut.apply(0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn obstacle_blocks_only_segments_passing_through() {
        let o = Obstacle {
            center: Vec3::new(50.0, 0.0, 0.0),
            radius: 10.0,
            owner: "n".to_string(),
        };
        assert!(o.blocks(&Vec3::zeros(), &Vec3::new(100.0, 0.0, 0.0)));
        assert!(!o.blocks(&Vec3::zeros(), &Vec3::new(100.0, 30.0, 0.0)));
        assert!(!o.blocks(&Vec3::zeros(), &Vec3::new(30.0, 0.0, 0.0)));
    }

    #[test]
    fn fallback_directions_are_unit_length() {
        for seed in 0..32 {
            assert!((fallback_direction(seed).norm() - 1.0).abs() < 1e-12);
        }
    }
}
