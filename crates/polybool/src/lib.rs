#![warn(missing_docs)]

//! polybool — boolean operations on closed polygonal surface meshes.
//!
//! Cuts two closed meshes along their precomputed contact curve and
//! recombines the surface regions into the union, intersection or either
//! difference of the enclosed solids.
//!
//! # Example
//!
//! ```rust,no_run
//! use polybool::{make_box, BooleanFilter, ContactCurve, OperMode, Point3};
//!
//! let a = make_box(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
//! let b = make_box(Point3::new(0.5, 0.5, 0.5), Point3::new(1.5, 1.5, 1.5));
//!
//! // the contact curve comes from an external provider
//! let contact = ContactCurve::new();
//!
//! let filter = BooleanFilter::new(OperMode::Union);
//! let output = filter.execute(&a, &b, &contact).unwrap();
//! println!("{} result polygons", output.merged.num_live_cells());
//! ```

pub use polybool_booleans::{BooleanError, BooleanFilter, BooleanOutput, OperMode, Result};
pub use polybool_contact::{ContactCurve, ContactLine};
pub use polybool_math::{Point3, Vec3};
pub use polybool_mesh::PolyMesh;

/// Build an axis-aligned box as six outward-facing quads with original cell
/// ids `0..6` in the order bottom, top, front, back, left, right.
pub fn make_box(min: Point3, max: Point3) -> PolyMesh {
    let mut mesh = PolyMesh::new();

    let p = [
        mesh.add_point(Point3::new(min.x, min.y, min.z)),
        mesh.add_point(Point3::new(max.x, min.y, min.z)),
        mesh.add_point(Point3::new(max.x, max.y, min.z)),
        mesh.add_point(Point3::new(min.x, max.y, min.z)),
        mesh.add_point(Point3::new(min.x, min.y, max.z)),
        mesh.add_point(Point3::new(max.x, min.y, max.z)),
        mesh.add_point(Point3::new(max.x, max.y, max.z)),
        mesh.add_point(Point3::new(min.x, max.y, max.z)),
    ];

    mesh.add_cell(vec![p[0], p[3], p[2], p[1]], 0); // bottom, -z
    mesh.add_cell(vec![p[4], p[5], p[6], p[7]], 1); // top, +z
    mesh.add_cell(vec![p[0], p[1], p[5], p[4]], 2); // front, -y
    mesh.add_cell(vec![p[3], p[7], p[6], p[2]], 3); // back, +y
    mesh.add_cell(vec![p[0], p[4], p[7], p[3]], 4); // left, -x
    mesh.add_cell(vec![p[1], p[2], p[6], p[5]], 5); // right, +x

    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Signed volume by the fan/tetrahedron method; positive for a closed
    /// mesh with outward normals.
    fn volume(mesh: &PolyMesh) -> f64 {
        let mut v = 0.0;

        for cell in mesh.live_cells() {
            let pts = mesh.cell_points(cell);
            for i in 1..pts.len() - 1 {
                v += pts[0].coords.dot(&pts[i].coords.cross(&pts[i + 1].coords));
            }
        }

        v / 6.0
    }

    fn surface_area(mesh: &PolyMesh) -> f64 {
        let mut a = 0.0;

        for cell in mesh.live_cells() {
            let pts = mesh.cell_points(cell);
            let mut s = Vec3::zeros();
            for i in 0..pts.len() {
                s += pts[i].coords.cross(&pts[(i + 1) % pts.len()].coords);
            }
            a += s.norm() * 0.5;
        }

        a
    }

    /// Contact curve of the unit cube A with B = A translated by
    /// (0.5, 0.5, 0.5): a closed hexagon around the shared corner volume.
    ///
    /// Face ids per [`make_box`]: bottom 0, top 1, front 2, back 3, left 4,
    /// right 5.
    fn offset_cubes() -> (PolyMesh, PolyMesh, ContactCurve) {
        let a = make_box(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let b = make_box(Point3::new(0.5, 0.5, 0.5), Point3::new(1.5, 1.5, 1.5));

        let mut curve = ContactCurve::new();
        let p0 = curve.add_point(Point3::new(1.0, 0.5, 0.5));
        let p1 = curve.add_point(Point3::new(1.0, 0.5, 1.0));
        let p2 = curve.add_point(Point3::new(1.0, 1.0, 0.5));
        let p3 = curve.add_point(Point3::new(0.5, 1.0, 0.5));
        let p4 = curve.add_point(Point3::new(0.5, 1.0, 1.0));
        let p5 = curve.add_point(Point3::new(0.5, 0.5, 1.0));

        curve.add_line(ContactLine::new([p0, p1], 5, 2));
        curve.add_line(ContactLine::new([p0, p2], 5, 0));
        curve.add_line(ContactLine::new([p2, p3], 3, 0));
        curve.add_line(ContactLine::new([p3, p4], 3, 4));
        curve.add_line(ContactLine::new([p4, p5], 1, 4));
        curve.add_line(ContactLine::new([p5, p1], 1, 2));

        (a, b, curve)
    }

    /// Identical unit cubes: the contact curve is the full edge skeleton,
    /// every line listed once per coincident face pair.
    fn identical_cubes() -> (PolyMesh, PolyMesh, ContactCurve) {
        let a = make_box(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let b = a.clone();

        // cube edges with the two faces sharing each
        let edges: [(usize, usize, usize, usize); 12] = [
            (0, 1, 0, 2),
            (1, 2, 0, 5),
            (2, 3, 0, 3),
            (3, 0, 0, 4),
            (4, 5, 1, 2),
            (5, 6, 1, 5),
            (6, 7, 1, 3),
            (7, 4, 1, 4),
            (0, 4, 2, 4),
            (1, 5, 2, 5),
            (2, 6, 3, 5),
            (3, 7, 3, 4),
        ];

        let mut curve = ContactCurve::new();
        for v in 0..8 {
            curve.add_point(a.point(v));
        }

        for &(u, v, f1, f2) in &edges {
            for &face in &[f1, f2] {
                curve.add_line(
                    ContactLine::new([u, v], face, face)
                        .with_src_a([Some(u), Some(v)])
                        .with_src_b([Some(u), Some(v)]),
                );
            }
        }

        (a, b, curve)
    }

    #[test]
    fn test_union_offset_cubes() {
        let (a, b, curve) = offset_cubes();

        let out = BooleanFilter::new(OperMode::Union)
            .execute(&a, &b, &curve)
            .unwrap();

        assert!((volume(&out.merged) - 1.875).abs() < 1e-9);

        // every result polygon descends from exactly one input polygon
        assert_eq!(out.orig_cell_ids_a.len(), out.merged.num_live_cells());
        for (ia, ib) in out.orig_cell_ids_a.iter().zip(&out.orig_cell_ids_b) {
            assert!((*ia >= 0) ^ (*ib >= 0));
            assert!(*ia < 6 && *ib < 6);
        }

        assert!(out.merged.attr("RegionId").is_some());
        assert_eq!(out.contact.lines.len(), 6);
        assert_eq!(out.aux.num_live_cells(), 0);
    }

    #[test]
    fn test_intersection_offset_cubes() {
        let (a, b, curve) = offset_cubes();

        let out = BooleanFilter::new(OperMode::Intersection)
            .execute(&a, &b, &curve)
            .unwrap();

        assert!((volume(&out.merged) - 0.125).abs() < 1e-9);
        assert!((surface_area(&out.merged) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_difference_offset_cubes() {
        let (a, b, curve) = offset_cubes();

        let out = BooleanFilter::new(OperMode::Difference)
            .execute(&a, &b, &curve)
            .unwrap();

        assert!((volume(&out.merged) - 0.875).abs() < 1e-9);
    }

    #[test]
    fn test_difference2_offset_cubes() {
        let (a, b, curve) = offset_cubes();

        let out = BooleanFilter::new(OperMode::Difference2)
            .execute(&a, &b, &curve)
            .unwrap();

        assert!((volume(&out.merged) - 0.875).abs() < 1e-9);
    }

    #[test]
    fn test_pieces_partition_the_union() {
        let (a, b, curve) = offset_cubes();

        let union = BooleanFilter::new(OperMode::Union)
            .execute(&a, &b, &curve)
            .unwrap();
        let inter = BooleanFilter::new(OperMode::Intersection)
            .execute(&a, &b, &curve)
            .unwrap();
        let diff = BooleanFilter::new(OperMode::Difference)
            .execute(&a, &b, &curve)
            .unwrap();
        let diff2 = BooleanFilter::new(OperMode::Difference2)
            .execute(&a, &b, &curve)
            .unwrap();

        // the three pieces tile the union
        let parts = volume(&inter.merged) + volume(&diff.merged) + volume(&diff2.merged);
        assert!((parts - volume(&union.merged)).abs() < 1e-9);

        // every input face area is accounted for: the union keeps the outside
        // parts, each difference re-uses one cut interface the intersection
        // also carries
        let outside = surface_area(&union.merged);
        let interface = surface_area(&inter.merged);
        assert!((outside + interface - surface_area(&a) - surface_area(&b)).abs() < 1e-9);
    }

    #[test]
    fn test_none_mode_returns_cut_meshes() {
        let (a, b, curve) = offset_cubes();

        let out = BooleanFilter::new(OperMode::None)
            .execute(&a, &b, &curve)
            .unwrap();

        // both sides come back cut but unselected
        assert!(out.merged.num_live_cells() > 6);
        assert!(out.aux.num_live_cells() > 6);
        assert!(out.merged.attr("RegionId").is_some());
        assert!(out.aux.attr("RegionId").is_some());
        assert!(out.orig_cell_ids_a.is_empty());
    }

    /// Two unit cubes sharing the face x=1: the contact curve is the shared
    /// square, fully captured on source vertices of both meshes.
    fn touching_cubes() -> (PolyMesh, PolyMesh, ContactCurve) {
        let a = make_box(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let b = make_box(Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));

        let mut curve = ContactCurve::new();
        let c0 = curve.add_point(Point3::new(1.0, 0.0, 0.0));
        let c1 = curve.add_point(Point3::new(1.0, 1.0, 0.0));
        let c2 = curve.add_point(Point3::new(1.0, 1.0, 1.0));
        let c3 = curve.add_point(Point3::new(1.0, 0.0, 1.0));

        // A's right face is ring [1, 2, 6, 5]; B's left face is [0, 4, 7, 3]
        let lines = [
            ([c0, c1], [1, 2], [0, 3]),
            ([c1, c2], [2, 6], [3, 7]),
            ([c2, c3], [6, 5], [7, 4]),
            ([c3, c0], [5, 1], [4, 0]),
        ];

        for &(ends, src_a, src_b) in &lines {
            curve.add_line(
                ContactLine::new(ends, 5, 4)
                    .with_src_a([Some(src_a[0]), Some(src_a[1])])
                    .with_src_b([Some(src_b[0]), Some(src_b[1])]),
            );
        }

        (a, b, curve)
    }

    #[test]
    fn test_touching_cubes_union_is_a_bar() {
        let (a, b, curve) = touching_cubes();

        let out = BooleanFilter::new(OperMode::Union)
            .execute(&a, &b, &curve)
            .unwrap();

        // the shared wall cancels, leaving a closed 2x1x1 bar
        assert!((volume(&out.merged) - 2.0).abs() < 1e-9);
        assert!((surface_area(&out.merged) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_touching_cubes_intersection_is_empty() {
        let (a, b, curve) = touching_cubes();

        let out = BooleanFilter::new(OperMode::Intersection)
            .execute(&a, &b, &curve)
            .unwrap();

        assert_eq!(out.merged.num_live_cells(), 0);
    }

    #[test]
    fn test_identical_cubes_union_is_a() {
        let (a, b, curve) = identical_cubes();

        let out = BooleanFilter::new(OperMode::Union)
            .execute(&a, &b, &curve)
            .unwrap();

        assert!((volume(&out.merged) - 1.0).abs() < 1e-9);
        assert!((surface_area(&out.merged) - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_identical_cubes_intersection_is_a() {
        let (a, b, curve) = identical_cubes();

        let out = BooleanFilter::new(OperMode::Intersection)
            .execute(&a, &b, &curve)
            .unwrap();

        assert!((volume(&out.merged) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_identical_cubes_difference_is_empty() {
        let (a, b, curve) = identical_cubes();

        let out = BooleanFilter::new(OperMode::Difference)
            .execute(&a, &b, &curve)
            .unwrap();

        assert_eq!(out.merged.num_live_cells(), 0);
    }

    #[test]
    fn test_no_contact_aborts() {
        let a = make_box(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let b = make_box(Point3::new(5.0, 5.0, 5.0), Point3::new(6.0, 6.0, 6.0));
        let curve = ContactCurve::new();

        let result = BooleanFilter::new(OperMode::Union).execute(&a, &b, &curve);

        assert!(matches!(result, Err(BooleanError::NoContact)));
        assert_eq!(
            result.unwrap_err().to_string(),
            "There is no contact"
        );
    }

    #[test]
    fn test_dangling_contact_aborts() {
        let (a, b, mut curve) = offset_cubes();
        curve.lines.pop();

        let result = BooleanFilter::new(OperMode::Union).execute(&a, &b, &curve);
        assert!(matches!(result, Err(BooleanError::InputTopology)));
    }

    #[test]
    fn test_attributes_pass_through() {
        let (mut a, b, curve) = offset_cubes();
        a.set_attr("material", vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);

        let out = BooleanFilter::new(OperMode::Union)
            .execute(&a, &b, &curve)
            .unwrap();

        let col = out.merged.attr("material").unwrap();

        for (row, &orig) in out.orig_cell_ids_a.iter().enumerate() {
            if orig >= 0 {
                assert_eq!(col[row], 10.0 + orig as f64);
            } else {
                assert!(col[row].is_nan());
            }
        }
    }

    #[test]
    fn test_orig_ids_respect_caller_numbering() {
        let (mut a, b, curve) = offset_cubes();

        // the caller's ids need not be 0..n
        let custom: Vec<i64> = (0..6).map(|i| 100 + i).collect();
        for (cell, &id) in a.live_cells().collect::<Vec<_>>().iter().zip(&custom) {
            a.set_orig_cell_id(*cell, id);
        }

        let out = BooleanFilter::new(OperMode::Union)
            .execute(&a, &b, &curve)
            .unwrap();

        for &ia in &out.orig_cell_ids_a {
            assert!(ia == -1 || (100..106).contains(&ia));
        }
    }
}
