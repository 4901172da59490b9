#![warn(missing_docs)]

//! Stage-scoped spatial indices for the polybool kernel.
//!
//! Two accelerators, each built at the start of the pipeline stage that needs
//! it and dropped on exit: a k-d tree point locator for coordinate-identity
//! lookups at the pipeline tolerance, and a 2-D BSP tree over line segments
//! backing the strip self-intersection guard.

use polybool_math::{Point2, Point3, TOL};

const LEAF_SIZE: usize = 8;

/// A k-d tree node — either a leaf holding point ids or a split plane.
#[derive(Debug)]
enum KdNode {
    Leaf {
        ids: Vec<usize>,
    },
    Split {
        axis: usize,
        value: f64,
        left: Box<KdNode>,
        right: Box<KdNode>,
    },
}

/// K-d tree point locator over a snapshot of mesh points.
#[derive(Debug)]
pub struct PointLocator {
    root: Option<KdNode>,
    points: Vec<Point3>,
}

impl PointLocator {
    /// Build a locator from a point array.
    pub fn build(points: &[Point3]) -> Self {
        let points = points.to_vec();
        let mut ids: Vec<usize> = (0..points.len()).collect();

        let root = if ids.is_empty() {
            None
        } else {
            Some(build_kd_node(&points, &mut ids, 0))
        };

        Self { root, points }
    }

    /// Ids of all points within [`TOL`] of `p`, ascending.
    pub fn find_points(&self, p: &Point3) -> Vec<usize> {
        self.find_within(p, TOL)
    }

    /// Ids of all points within `radius` of `p`, ascending.
    pub fn find_within(&self, p: &Point3, radius: f64) -> Vec<usize> {
        let mut out = Vec::new();
        if let Some(ref root) = self.root {
            self.search(root, p, radius, &mut out);
        }
        out.sort_unstable();
        out
    }

    fn search(&self, node: &KdNode, p: &Point3, radius: f64, out: &mut Vec<usize>) {
        match node {
            KdNode::Leaf { ids } => {
                for &id in ids {
                    if (self.points[id] - p).norm() < radius {
                        out.push(id);
                    }
                }
            }
            KdNode::Split {
                axis,
                value,
                left,
                right,
            } => {
                let c = p.coords[*axis];
                if c - radius < *value {
                    self.search(left, p, radius, out);
                }
                if c + radius >= *value {
                    self.search(right, p, radius, out);
                }
            }
        }
    }
}

fn build_kd_node(points: &[Point3], ids: &mut [usize], depth: usize) -> KdNode {
    if ids.len() <= LEAF_SIZE {
        return KdNode::Leaf { ids: ids.to_vec() };
    }

    let axis = depth % 3;
    ids.sort_unstable_by(|&a, &b| {
        points[a].coords[axis]
            .partial_cmp(&points[b].coords[axis])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mid = ids.len() / 2;
    let value = points[ids[mid]].coords[axis];

    let (lo, hi) = ids.split_at_mut(mid);

    KdNode::Split {
        axis,
        value,
        left: Box::new(build_kd_node(points, lo, depth + 1)),
        right: Box::new(build_kd_node(points, hi, depth + 1)),
    }
}

/// A 2-D BSP node over line segments.
#[derive(Debug)]
enum BspNode {
    Leaf {
        ids: Vec<usize>,
    },
    Split {
        /// Splitting line through `origin` with direction `dir`.
        origin: Point2,
        dir: (f64, f64),
        left: Box<BspNode>,
        right: Box<BspNode>,
    },
}

/// 2-D BSP tree over line segments, indexed by segment id.
///
/// Segments reference endpoints by index into a shared point array so that
/// callers can distinguish "shares an endpoint" from "crosses".
#[derive(Debug)]
pub struct SegmentTree {
    points: Vec<Point2>,
    segments: Vec<(usize, usize)>,
    root: Option<BspNode>,
}

impl SegmentTree {
    /// Build a tree over `segments`, each a pair of indices into `points`.
    pub fn build(points: &[Point2], segments: &[(usize, usize)]) -> Self {
        let points = points.to_vec();
        let segments = segments.to_vec();
        let ids: Vec<usize> = (0..segments.len()).collect();

        let root = if ids.is_empty() {
            None
        } else {
            Some(build_bsp_node(&points, &segments, ids, 0))
        };

        Self {
            points,
            segments,
            root,
        }
    }

    /// Ids of segments whose BSP regions a query segment touches.
    pub fn candidates(&self, a: &Point2, b: &Point2) -> Vec<usize> {
        let mut out = Vec::new();
        if let Some(ref root) = self.root {
            collect_candidates(root, a, b, &mut out);
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Whether any two segments that share no endpoint index come within
    /// [`TOL`] of each other.
    pub fn has_strict_crossing(&self) -> bool {
        for (id, &(a, b)) in self.segments.iter().enumerate() {
            let pa = self.points[a];
            let pb = self.points[b];

            for cand in self.candidates(&pa, &pb) {
                if cand == id {
                    continue;
                }

                let (c, d) = self.segments[cand];
                if c == a || c == b || d == a || d == b {
                    continue;
                }

                if segments_touch(&pa, &pb, &self.points[c], &self.points[d], TOL) {
                    return true;
                }
            }
        }

        false
    }
}

fn build_bsp_node(
    points: &[Point2],
    segments: &[(usize, usize)],
    ids: Vec<usize>,
    depth: usize,
) -> BspNode {
    if ids.len() <= LEAF_SIZE || depth > 24 {
        return BspNode::Leaf { ids };
    }

    // The first segment's supporting line is the splitting plane.
    let (sa, sb) = segments[ids[0]];
    let origin = points[sa];
    let dir = (points[sb].x - origin.x, points[sb].y - origin.y);

    let mut left = Vec::new();
    let mut right = Vec::new();

    for &id in &ids {
        let (a, b) = segments[id];
        let da = side_of(&origin, dir, &points[a]);
        let db = side_of(&origin, dir, &points[b]);

        if da <= TOL && db <= TOL {
            left.push(id);
        } else if da >= -TOL && db >= -TOL {
            right.push(id);
        } else {
            // spanning segment lands on both sides
            left.push(id);
            right.push(id);
        }
    }

    // Degenerate split: all segments land on one side, stop here.
    if left.len() == ids.len() || right.len() == ids.len() {
        return BspNode::Leaf { ids };
    }

    BspNode::Split {
        origin,
        dir,
        left: Box::new(build_bsp_node(points, segments, left, depth + 1)),
        right: Box::new(build_bsp_node(points, segments, right, depth + 1)),
    }
}

fn collect_candidates(node: &BspNode, a: &Point2, b: &Point2, out: &mut Vec<usize>) {
    match node {
        BspNode::Leaf { ids } => out.extend_from_slice(ids),
        BspNode::Split {
            origin,
            dir,
            left,
            right,
        } => {
            let da = side_of(origin, *dir, a);
            let db = side_of(origin, *dir, b);

            if da <= TOL || db <= TOL {
                collect_candidates(left, a, b, out);
            }
            if da >= -TOL || db >= -TOL {
                collect_candidates(right, a, b, out);
            }
        }
    }
}

/// Signed distance-like side value of `p` relative to the line through
/// `origin` with direction `dir` (positive on the left of `dir`).
fn side_of(origin: &Point2, dir: (f64, f64), p: &Point2) -> f64 {
    let len = (dir.0 * dir.0 + dir.1 * dir.1).sqrt();
    if len < 1e-12 {
        return 0.0;
    }
    (dir.0 * (p.y - origin.y) - dir.1 * (p.x - origin.x)) / len
}

/// Whether two 2-D segments come within `tol` of each other (proper crossing
/// or near-touch anywhere along either segment).
pub fn segments_touch(a1: &Point2, a2: &Point2, b1: &Point2, b2: &Point2, tol: f64) -> bool {
    let d1 = cross2(b1, b2, a1);
    let d2 = cross2(b1, b2, a2);
    let d3 = cross2(a1, a2, b1);
    let d4 = cross2(a1, a2, b2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    point_segment_dist(a1, b1, b2) < tol
        || point_segment_dist(a2, b1, b2) < tol
        || point_segment_dist(b1, a1, a2) < tol
        || point_segment_dist(b2, a1, a2) < tol
}

fn cross2(o: &Point2, a: &Point2, b: &Point2) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn point_segment_dist(p: &Point2, a: &Point2, b: &Point2) -> f64 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 < 1e-24 {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_finds_coincident() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0 + 1e-7, 0.0, 0.0),
            Point3::new(5.0, 5.0, 5.0),
        ];

        let loc = PointLocator::build(&points);
        assert_eq!(loc.find_points(&Point3::new(1.0, 0.0, 0.0)), vec![1, 2]);
        assert_eq!(loc.find_points(&Point3::new(9.0, 0.0, 0.0)), Vec::<usize>::new());
    }

    #[test]
    fn test_locator_many_points() {
        let mut points = Vec::new();
        for i in 0..50 {
            for j in 0..50 {
                points.push(Point3::new(i as f64, j as f64, 0.0));
            }
        }

        let loc = PointLocator::build(&points);
        let hits = loc.find_points(&Point3::new(17.0, 33.0, 0.0));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0], 17 * 50 + 33);
    }

    #[test]
    fn test_crossing_detected() {
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
            Point2::new(1.0, 0.0),
        ];
        let segments = vec![(0, 1), (2, 3)];

        let tree = SegmentTree::build(&points, &segments);
        assert!(tree.has_strict_crossing());
    }

    #[test]
    fn test_shared_endpoint_not_a_crossing() {
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
        ];
        let segments = vec![(0, 1), (1, 2)];

        let tree = SegmentTree::build(&points, &segments);
        assert!(!tree.has_strict_crossing());
    }

    #[test]
    fn test_disjoint_segments() {
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
            Point2::new(1.0, 1.0),
        ];
        let segments = vec![(0, 1), (2, 3)];

        let tree = SegmentTree::build(&points, &segments);
        assert!(!tree.has_strict_crossing());
    }

    #[test]
    fn test_t_junction_counts_as_touch() {
        let a1 = Point2::new(0.0, 0.0);
        let a2 = Point2::new(2.0, 0.0);
        let b1 = Point2::new(1.0, 0.0);
        let b2 = Point2::new(1.0, 1.0);

        assert!(segments_touch(&a1, &a2, &b1, &b2, TOL));
    }
}
