//! Topological separation and re-merging around strip endpoints.
//!
//! At every source-vertex capture the shared point is duplicated per
//! incident cell, so that cells meeting only there come apart. The point
//! merger then rebuilds the minimal set of coincidences that must survive
//! for the mesh to stay manifold along the strips: (cell, point) pairs whose
//! non-strip ring neighbours coincide are collapsed back onto one index.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use polybool_contact::ContactCurve;
use polybool_math::{Point3, PointKey};
use polybool_mesh::PolyMesh;
use polybool_spatial::PointLocator;

use crate::strips::{Capt, PolyStripsMap};

/// Duplicate every mesh point at a source-vertex capture per incident cell.
pub fn disjoin_polys(mesh: &mut PolyMesh, poly_strips: &PolyStripsMap) {
    mesh.build_links();

    let loc = PointLocator::build(mesh.points());

    // unique capture coordinates by curve point index
    let mut ends: BTreeMap<usize, Point3> = BTreeMap::new();

    for p_strips in poly_strips.values() {
        for sp in p_strips.pts.values() {
            if sp.capt == Capt::A {
                ends.entry(sp.ind).or_insert(sp.pt);
            }
        }
    }

    for pt in ends.values() {
        for p in loc.find_points(pt) {
            let cells: Vec<usize> = mesh
                .point_cells(p)
                .iter()
                .copied()
                .filter(|&c| !mesh.is_deleted(c))
                .collect();

            if cells.len() > 1 {
                for cell in cells {
                    let fresh = mesh.add_point(*pt);
                    mesh.replace_cell_point(cell, p, fresh);
                }
            }
        }
    }
}

/// Collapse colocated duplicates that must stay coincident after
/// disjoining.
pub fn merge_points(mesh: &mut PolyMesh, curve: &mut ContactCurve, poly_strips: &PolyStripsMap) {
    mesh.build_links();
    curve.build_links();

    let loc = PointLocator::build(mesh.points());

    // strip endpoint -> mesh points sitting at the endpoint's inner
    // neighbour along the strip
    let mut neigh_pts: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();

    for p_strips in poly_strips.values() {
        for strip in &p_strips.strips {
            if strip.len() < 2 {
                continue;
            }

            let first = strip[0].ind;
            let last = strip[strip.len() - 1].ind;

            let before_first = &p_strips.pts[&strip[1].ind];
            let before_last = &p_strips.pts[&strip[strip.len() - 2].ind];

            for p in loc.find_points(&before_first.pt) {
                neigh_pts.entry(first).or_default().insert(p);
            }

            for p in loc.find_points(&before_last.pt) {
                neigh_pts.entry(last).or_default().insert(p);
            }
        }
    }

    for (&ind, inner) in &neigh_pts {
        // group (cell, point) pairs by the coordinate of their non-strip
        // ring neighbour
        let mut pairs: BTreeMap<PointKey, Vec<(usize, usize)>> = BTreeMap::new();

        let pt = curve.point(ind);

        for p in loc.find_points(&pt) {
            let cells = mesh.point_cells(p);

            let Some(&cell) = cells.first() else { continue };

            let ring = mesh.cell_ring(cell);
            let Some(pos) = ring.iter().position(|&q| q == p) else {
                continue;
            };

            let before = ring[(pos + ring.len() - 1) % ring.len()];
            let after = ring[(pos + 1) % ring.len()];

            if !inner.contains(&before) {
                let key = PointKey::from_point(&mesh.point(before));
                pairs.entry(key).or_default().push((cell, p));
            }

            if !inner.contains(&after) {
                let key = PointKey::from_point(&mesh.point(after));
                pairs.entry(key).or_default().push((cell, p));
            }
        }

        // connections between pairs that share a neighbour coordinate
        let mut queue: VecDeque<VecDeque<(usize, usize)>> = pairs
            .values()
            .filter(|v| v.len() == 2)
            .map(|v| VecDeque::from([v[0], v[1]]))
            .collect();

        // chain connections into components, collapse each onto its head
        while let Some(mut group) = queue.pop_front() {
            loop {
                let mut merged = false;
                let mut i = 0;

                while i < queue.len() {
                    let next = &queue[i];

                    let front = *next.front().unwrap_or(&(usize::MAX, usize::MAX));
                    let back = *next.back().unwrap_or(&(usize::MAX, usize::MAX));

                    if Some(&front) == group.front() {
                        group.push_front(back);
                    } else if Some(&front) == group.back() {
                        group.push_back(back);
                    } else if Some(&back) == group.front() {
                        group.push_front(front);
                    } else if Some(&back) == group.back() {
                        group.push_back(front);
                    } else {
                        i += 1;
                        continue;
                    }

                    queue.remove(i);
                    merged = true;
                    i = 0;
                }

                if !merged {
                    break;
                }
            }

            if let Some(&(_, rep)) = group.front() {
                for &(cell, point) in group.iter().skip(1) {
                    mesh.replace_cell_point(cell, point, rep);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strips::{PolyStrips, StripPt};
    use polybool_math::Base;

    fn vertex_capture(ind: usize, pt: Point3, poly_id: usize) -> StripPt {
        StripPt {
            ind,
            pt,
            capt_pt: pt,
            cut_pt: pt,
            edge: Some([0, 1]),
            t: 0.0,
            capt: Capt::A,
            poly_id,
            catched: true,
        }
    }

    #[test]
    fn test_disjoin_duplicates_shared_vertex() {
        let mut mesh = PolyMesh::new();

        let shared = mesh.add_point(Point3::new(0.0, 0.0, 0.0));
        let ring_a = vec![
            shared,
            mesh.add_point(Point3::new(1.0, 0.0, 0.0)),
            mesh.add_point(Point3::new(1.0, 1.0, 0.0)),
        ];
        let ring_b = vec![
            shared,
            mesh.add_point(Point3::new(-1.0, 0.0, 0.0)),
            mesh.add_point(Point3::new(-1.0, -1.0, 0.0)),
        ];
        let cell_a = mesh.add_cell(ring_a, 0);
        let cell_b = mesh.add_cell(ring_b, 1);

        // a capture right on the shared vertex
        let mut p_strips = PolyStrips {
            poly_id: cell_a,
            poly: mesh.cell_ring(cell_a).to_vec(),
            base: Base::new(&mesh.cell_points(cell_a)),
            pts: BTreeMap::new(),
            strips: Vec::new(),
        };
        p_strips
            .pts
            .insert(0, vertex_capture(0, Point3::new(0.0, 0.0, 0.0), cell_a));

        let mut strips: PolyStripsMap = BTreeMap::new();
        strips.insert(cell_a, p_strips);

        disjoin_polys(&mut mesh, &strips);

        // both cells now use fresh points; nothing is shared any more
        let ra = mesh.cell_ring(cell_a);
        let rb = mesh.cell_ring(cell_b);
        assert_ne!(ra[0], shared);
        assert_ne!(rb[0], shared);
        assert_ne!(ra[0], rb[0]);
        assert!((mesh.point(ra[0]) - mesh.point(rb[0])).norm() < 1e-12);
    }
}
