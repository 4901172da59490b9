//! Adjacent-point insertion: subdivides polygon edges so that interior
//! edge-capture points of the cut polygons become real vertices in the
//! neighbouring polygons sharing those edges.
//!
//! Runs are walked per captured edge in descending parameter order with the
//! edge's own vertices as sentinels; a run extends while the interior point
//! touches only one polygon of this side in the contact graph. For each run
//! the unique neighbouring cell whose directed ring edge matches the run's
//! ends is rebuilt with the interior coordinates inserted in order.

use std::collections::{BTreeMap, BTreeSet};

use polybool_contact::ContactCurve;
use polybool_math::Point3;
use polybool_mesh::PolyMesh;
use polybool_spatial::PointLocator;

use crate::strips::{Capt, MeshSide, PolyStripsMap};

/// One stop on a captured edge: an interior capture or an edge-end sentinel.
struct EdgeStop {
    ind: Option<usize>,
    pt: Point3,
    t: f64,
}

/// Subdivide neighbouring polygons along captured edges of one mesh.
pub fn add_adjacent_points(
    mesh: &mut PolyMesh,
    curve: &mut ContactCurve,
    side: MeshSide,
    poly_strips: &PolyStripsMap,
) {
    mesh.build_links();
    curve.build_links();

    let loc = PointLocator::build(mesh.points());

    for p_strips in poly_strips.values() {
        let mut edge_pts: BTreeMap<(usize, usize), Vec<EdgeStop>> = BTreeMap::new();

        for sp in p_strips.pts.values() {
            if sp.capt == Capt::Edge {
                if let Some(edge) = sp.edge {
                    edge_pts.entry((edge[0], edge[1])).or_default().push(EdgeStop {
                        ind: Some(sp.ind),
                        pt: sp.pt,
                        t: sp.t,
                    });
                }
            }
        }

        for ((edge_a, edge_b), mut stops) in edge_pts {
            stops.push(EdgeStop {
                ind: None,
                pt: mesh.point(edge_a),
                t: 0.0,
            });
            stops.push(EdgeStop {
                ind: None,
                pt: mesh.point(edge_b),
                t: 1.0,
            });

            // descending t, duplicates at one parameter collapse
            stops.sort_by(|a, b| b.t.partial_cmp(&a.t).unwrap_or(std::cmp::Ordering::Equal));
            stops.dedup_by(|a, b| (a.t - b.t).abs() < f64::EPSILON);

            let last = stops.len() - 1;
            let mut ia = 0;

            while ia < last {
                let mut ib = ia + 1;

                while ib < last {
                    let Some(ind) = stops[ib].ind else { break };

                    // degree of this capture in the contact graph of this side
                    let mut involved: BTreeSet<usize> = BTreeSet::new();
                    for &line in curve.point_lines(ind) {
                        involved.insert(side.poly(&curve.lines[line]));
                    }

                    if involved.len() > 1 {
                        break;
                    }

                    ib += 1;
                }

                if ia + 1 != ib {
                    insert_run(mesh, &loc, &stops[ia..=ib]);
                }

                ia = ib;
            }
        }
    }

    mesh.remove_deleted_cells();
}

/// Rebuild the cell whose directed ring edge runs from the first to the last
/// stop, inserting the interior coordinates.
fn insert_run(mesh: &mut PolyMesh, loc: &PointLocator, run: &[EdgeStop]) {
    let pts_a = loc.find_points(&run[0].pt);
    let pts_b = loc.find_points(&run[run.len() - 1].pt);

    let mut cands_a: Vec<(usize, usize)> = Vec::new();
    for &p in &pts_a {
        for &c in mesh.point_cells(p) {
            cands_a.push((c, p));
        }
    }

    let mut cands_b: Vec<(usize, usize)> = Vec::new();
    for &p in &pts_b {
        for &c in mesh.point_cells(p) {
            cands_b.push((c, p));
        }
    }

    for &(cell_a, point_a) in &cands_a {
        for &(cell_b, point_b) in &cands_b {
            if cell_a != cell_b || mesh.is_deleted(cell_a) {
                continue;
            }

            let ring = mesh.cell_ring(cell_a).to_vec();
            let mut new_ring: Vec<usize> = Vec::with_capacity(ring.len() + run.len());

            for i in 0..ring.len() {
                new_ring.push(ring[i]);

                let id_a = ring[i];
                let id_b = ring[(i + 1) % ring.len()];

                if point_a == id_a && point_b == id_b {
                    for stop in &run[1..run.len() - 1] {
                        new_ring.push(mesh.add_point(stop.pt));
                    }
                }
            }

            let orig = mesh.orig_cell_id(cell_a);
            mesh.delete_cell(cell_a);
            mesh.add_cell(new_ring, orig);
            mesh.build_links();

            break;
        }
    }
}
