//! Hole merger: absorbs purely-interior strips into the sub-polygon that
//! encloses them.
//!
//! Every hole is joined to the enclosing ring through a bridge edge chosen
//! by shortest Euclidean length over a weighted graph whose nodes are the
//! outer piece and the holes. Bridges are selected as a minimal spanning
//! structure (nearest component first), so holes may chain through each
//! other before reaching the outer ring. Each accepted bridge cuts the ring
//! open and splices the hole in through duplicated bridge vertices, leaving
//! a single simple polygon.

use std::collections::BTreeMap;

use polybool_math::{newell_normal, Base, Point3};
use polybool_mesh::PolyMesh;

use crate::error::{BooleanError, Result};
use crate::strips::{Strip, StripPt};

/// Bridge candidates of one graph node: (ring vertex, hole vertex) → length.
type Bridges = BTreeMap<(usize, usize), f64>;

/// Cheapest bridge between two coordinate rings.
fn best_bridge(ring: &[Point3], hole: &[Point3]) -> ((usize, usize), f64) {
    let mut bridges: Bridges = BTreeMap::new();

    for (i, a) in ring.iter().enumerate() {
        for (j, b) in hole.iter().enumerate() {
            bridges.insert((i, j), (a - b).norm());
        }
    }

    let mut best = ((0, 0), f64::INFINITY);

    for (&pair, &d) in &bridges {
        if d < best.1 {
            best = (pair, d);
        }
    }

    best
}

/// Weave the holes of one cut polygon into its sub-polygons.
///
/// `outer_cells` are the cells the cutter just emitted for this polygon;
/// each hole is spliced into the one that contains it. Fails with
/// [`BooleanError::CutFailed`] when a hole has no enclosing piece or a
/// degenerate ring.
pub fn merge_holes(
    mesh: &mut PolyMesh,
    base: &Base,
    pts: &BTreeMap<usize, StripPt>,
    holes: &[Strip],
    outer_cells: &[usize],
    orig_id: i64,
) -> Result<()> {
    // hole rings as coordinates; closed traces carry their start twice
    let mut hole_rings: Vec<Vec<Point3>> = Vec::with_capacity(holes.len());

    for hole in holes {
        let mut inds: Vec<usize> = hole.iter().map(|p| p.ind).collect();

        if inds.len() > 1 && inds[0] == inds[inds.len() - 1] {
            inds.pop();
        }

        if inds.len() < 3 {
            return Err(BooleanError::CutFailed);
        }

        let mut ring: Vec<Point3> = inds
            .iter()
            .map(|i| pts.get(i).map(|sp| sp.cut_pt).ok_or(BooleanError::CutFailed))
            .collect::<Result<_>>()?;

        // a hole winds against the outer ring
        if base.n.dot(&newell_normal(&ring)) > 0.0 {
            ring.reverse();
        }

        hole_rings.push(ring);
    }

    // assign each hole to the piece that contains it
    let mut by_host: BTreeMap<usize, Vec<usize>> = BTreeMap::new();

    for (hi, ring) in hole_rings.iter().enumerate() {
        let probe = base.project(&ring[0]);

        let host = outer_cells
            .iter()
            .copied()
            .find(|&cell| {
                !mesh.is_deleted(cell) && {
                    let proj: Vec<_> = mesh
                        .cell_points(cell)
                        .iter()
                        .map(|p| base.project(p))
                        .collect();
                    polybool_math::point_in_poly(&proj, &probe)
                }
            })
            .ok_or(BooleanError::CutFailed)?;

        by_host.entry(host).or_default().push(hi);
    }

    for (host, hole_ids) in by_host {
        let mut ring_ids: Vec<usize> = mesh.cell_ring(host).to_vec();
        let mut remaining: Vec<usize> = hole_ids;

        // nearest component first
        while !remaining.is_empty() {
            let ring_coords: Vec<Point3> = ring_ids.iter().map(|&id| mesh.point(id)).collect();

            let mut pick = 0;
            let mut pick_bridge = ((0, 0), f64::INFINITY);

            for (slot, &hi) in remaining.iter().enumerate() {
                let bridge = best_bridge(&ring_coords, &hole_rings[hi]);

                if bridge.1 < pick_bridge.1 {
                    pick = slot;
                    pick_bridge = bridge;
                }
            }

            let hi = remaining.remove(pick);
            let ((ri, hj), _) = pick_bridge;

            let hole = &hole_rings[hi];

            // splice: ..., u, w, hole…, w', u', ...
            let mut spliced: Vec<usize> = Vec::with_capacity(ring_ids.len() + hole.len() + 2);
            spliced.extend_from_slice(&ring_ids[..=ri]);

            for k in 0..hole.len() {
                spliced.push(mesh.add_point(hole[(hj + k) % hole.len()]));
            }

            spliced.push(mesh.add_point(hole[hj]));
            spliced.push(mesh.add_point(mesh.point(ring_ids[ri])));

            spliced.extend_from_slice(&ring_ids[ri + 1..]);

            ring_ids = spliced;
        }

        mesh.delete_cell(host);
        mesh.add_cell(ring_ids, orig_id);
    }

    Ok(())
}
