#![warn(missing_docs)]

//! Math types for the polybool mesh-boolean kernel.
//!
//! Thin wrappers around nalgebra plus the small set of planar geometry
//! primitives the cutting pipeline relies on: the Newell normal, an
//! orthonormal in-plane basis for 2-D projection, a point-in-polygon test,
//! and the signed angle about an axis used by the dihedral classifier.

use nalgebra::{Vector2, Vector3};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A point in 2D (in-plane) space.
pub type Point2 = nalgebra::Point2<f64>;

/// A vector in 2D space.
pub type Vec2 = Vector2<f64>;

/// Linear tolerance used throughout the pipeline (distances, captures,
/// coordinate identity).
pub const TOL: f64 = 1e-5;

/// Check whether two points are coincident within [`TOL`].
pub fn points_equal(a: &Point3, b: &Point3) -> bool {
    (a - b).norm() < TOL
}

/// Componentwise coordinate identity at [`TOL`], as used for ring
/// deduplication and polygon-membership tests.
pub fn coords_equal(a: &Point3, b: &Point3) -> bool {
    (a.x - b.x).abs() < TOL && (a.y - b.y).abs() < TOL && (a.z - b.z).abs() < TOL
}

/// A point quantised to the pipeline tolerance, usable as an ordered map key.
///
/// Two points within [`TOL`] of each other quantise to the same key (up to
/// the usual boundary cases of rounding), which is how coordinate-identity
/// sets and maps are built without a spatial index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PointKey {
    x: i64,
    y: i64,
    z: i64,
}

impl PointKey {
    /// Quantise a point at 1e-5 resolution.
    pub fn from_point(p: &Point3) -> Self {
        let scale = 1e5;
        Self {
            x: (p.x * scale).round() as i64,
            y: (p.y * scale).round() as i64,
            z: (p.z * scale).round() as i64,
        }
    }
}

/// Compute the normalized Newell normal of a polygon ring.
///
/// Returns the zero vector for degenerate rings (collinear or fewer than
/// three distinct points).
pub fn newell_normal(ring: &[Point3]) -> Vec3 {
    let mut n = Vec3::zeros();

    let len = ring.len();
    for i in 0..len {
        let a = &ring[i];
        let b = &ring[(i + 1) % len];

        n.x += (a.y - b.y) * (a.z + b.z);
        n.y += (a.z - b.z) * (a.x + b.x);
        n.z += (a.x - b.x) * (a.y + b.y);
    }

    let norm = n.norm();
    if norm > 1e-12 {
        n / norm
    } else {
        Vec3::zeros()
    }
}

/// An orthonormal in-plane basis for a polygon.
///
/// `ei` points along the ring's first edge, `ej = n × ei`. Projection drops
/// the normal component; coordinates are relative to the world origin, which
/// is sufficient for the in-plane containment and crossing tests that only
/// compare projected points against each other.
#[derive(Debug, Clone)]
pub struct Base {
    /// Outward (Newell) normal of the ring.
    pub n: Vec3,
    /// First in-plane axis.
    pub ei: Vec3,
    /// Second in-plane axis.
    pub ej: Vec3,
}

impl Base {
    /// Build the basis from a polygon ring. The ring must have at least two
    /// distinct leading points.
    pub fn new(ring: &[Point3]) -> Self {
        let n = newell_normal(ring);

        let mut ei = ring[1] - ring[0];
        let norm = ei.norm();
        if norm > 1e-12 {
            ei /= norm;
        }

        let ej = n.cross(&ei);

        Self { n, ei, ej }
    }

    /// Project a point into the basis plane.
    pub fn project(&self, p: &Point3) -> Point2 {
        Point2::new(p.coords.dot(&self.ei), p.coords.dot(&self.ej))
    }
}

/// Point-in-polygon test in 2D by ray crossing.
pub fn point_in_poly(poly: &[Point2], p: &Point2) -> bool {
    let mut inside = false;

    let len = poly.len();
    let mut j = len - 1;

    for i in 0..len {
        let a = &poly[i];
        let b = &poly[j];

        if (a.y > p.y) != (b.y > p.y) {
            let x = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x {
                inside = !inside;
            }
        }

        j = i;
    }

    inside
}

/// Signed angle from `va` to `vb` about `axis`, in `[0, 2π)`.
///
/// Both vectors are expected to be (roughly) perpendicular to `axis`; this is
/// how the dihedral classifier orders polygons around a shared edge.
pub fn angle_about(va: &Vec3, vb: &Vec3, axis: &Vec3) -> f64 {
    let perp = axis.cross(va);

    let ang = perp.dot(vb).atan2(va.dot(vb));

    if ang < 0.0 {
        ang + 2.0 * std::f64::consts::PI
    } else {
        ang
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn square() -> Vec<Point3> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn test_newell_normal_ccw_square() {
        let n = newell_normal(&square());
        assert!((n - Vec3::z()).norm() < 1e-12);
    }

    #[test]
    fn test_newell_normal_cw_square() {
        let mut ring = square();
        ring.reverse();
        let n = newell_normal(&ring);
        assert!((n + Vec3::z()).norm() < 1e-12);
    }

    #[test]
    fn test_newell_normal_degenerate() {
        let ring = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        assert_eq!(newell_normal(&ring), Vec3::zeros());
    }

    #[test]
    fn test_base_projection_preserves_distances() {
        let ring = square();
        let base = Base::new(&ring);

        let a = base.project(&ring[0]);
        let b = base.project(&ring[2]);

        assert!(((b - a).norm() - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_point_in_poly() {
        let base = Base::new(&square());
        let poly: Vec<Point2> = square().iter().map(|p| base.project(p)).collect();

        assert!(point_in_poly(&poly, &Point2::new(0.5, 0.5)));
        assert!(!point_in_poly(&poly, &Point2::new(1.5, 0.5)));
        assert!(!point_in_poly(&poly, &Point2::new(-0.5, 0.5)));
    }

    #[test]
    fn test_angle_about_quadrants() {
        let axis = Vec3::z();
        let va = Vec3::x();

        assert!(angle_about(&va, &Vec3::x(), &axis).abs() < 1e-12);
        assert!((angle_about(&va, &Vec3::y(), &axis) - PI / 2.0).abs() < 1e-12);
        assert!((angle_about(&va, &(-Vec3::x()), &axis) - PI).abs() < 1e-12);
        assert!((angle_about(&va, &(-Vec3::y()), &axis) - 3.0 * PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_point_key_tolerance() {
        let a = Point3::new(1.0, 2.0, 3.0);
        let b = Point3::new(1.0 + 1e-7, 2.0, 3.0);
        let c = Point3::new(1.001, 2.0, 3.0);

        assert_eq!(PointKey::from_point(&a), PointKey::from_point(&b));
        assert_ne!(PointKey::from_point(&a), PointKey::from_point(&c));
    }
}
