//! Point restoration and T-junction resolution after cutting.
//!
//! Cutting works on snapped coordinates; restoration moves every duplicate
//! minted at a captured coordinate back to the original contact-curve
//! position. The overlap resolver then fixes the T-junctions left where two
//! strips in adjacent polygons touch one shared edge-capture point.

use std::collections::BTreeMap;

use polybool_contact::ContactCurve;
use polybool_math::{coords_equal, Point3};
use polybool_mesh::PolyMesh;
use polybool_spatial::PointLocator;

use crate::strips::{Capt, PolyStripsMap};

/// Snap all mesh points at a captured cut coordinate back to the original
/// contact-curve coordinate.
pub fn restore_orig_points(mesh: &mut PolyMesh, poly_strips: &PolyStripsMap) {
    mesh.build_links();

    let loc = PointLocator::build(mesh.points());

    for p_strips in poly_strips.values() {
        for sp in p_strips.pts.values() {
            if sp.capt.is_boundary() {
                for id in loc.find_points(&sp.cut_pt) {
                    mesh.set_point(id, sp.pt);
                }
            }
        }
    }
}

/// Fix T-junctions where two strips share an edge-capture point.
///
/// Fires only when exactly two StripPoints share the capture point, with
/// compatible directed edges `(a, b)` and `(b, c)`, `a ≠ c`. The shared
/// vertex is duplicated: one incident cell keeps the original index, the
/// cell whose ring carries both derived neighbour coordinates is re-pointed
/// to a fresh point at the contact-curve coordinate.
pub fn resolve_overlaps(
    mesh: &mut PolyMesh,
    curve: &ContactCurve,
    poly_strips: &PolyStripsMap,
) {
    mesh.build_links();

    // ind -> host polygons with an edge capture there
    let mut by_ind: BTreeMap<usize, Vec<usize>> = BTreeMap::new();

    for (&poly_id, p_strips) in poly_strips {
        for sp in p_strips.pts.values() {
            if sp.capt == Capt::Edge {
                by_ind.entry(sp.ind).or_default().push(poly_id);
            }
        }
    }

    for (&ind, hosts) in &by_ind {
        if hosts.len() != 2 {
            continue;
        }

        let (mut host_a, mut host_b) = (hosts[0], hosts[1]);

        let edge_of = |host: usize| poly_strips[&host].pts[&ind].edge;

        let (Some(mut edge_a), Some(mut edge_b)) = (edge_of(host_a), edge_of(host_b)) else {
            continue;
        };

        if edge_a[1] != edge_b[0] {
            std::mem::swap(&mut host_a, &mut host_b);
            std::mem::swap(&mut edge_a, &mut edge_b);
        }

        if edge_a[1] != edge_b[0] || edge_a[0] == edge_b[1] {
            continue;
        }

        // all captures on each of the two edges, ordered along the edge
        let captures_on = |host: usize, edge: [usize; 2]| -> Vec<(f64, Point3)> {
            let mut on_edge: Vec<(f64, Point3)> = poly_strips[&host]
                .pts
                .values()
                .filter(|sp| sp.edge == Some(edge))
                .map(|sp| (sp.t, sp.pt))
                .collect();

            on_edge.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
            on_edge
        };

        let mut on_a = captures_on(host_a, edge_a);
        let mut on_b = captures_on(host_b, edge_b);

        let t_junction = poly_strips[&host_a].pts[&ind].pt;

        // the shared point sits at the end of edge a and the start of edge b
        let last_a = on_a.pop();
        if last_a.map_or(true, |(_, p)| !coords_equal(&p, &t_junction)) {
            continue;
        }

        if on_b.is_empty() || !coords_equal(&on_b[0].1, &t_junction) {
            continue;
        }
        on_b.remove(0);

        let prev = on_a
            .last()
            .map(|&(_, p)| p)
            .unwrap_or_else(|| mesh.point(edge_a[0]));
        let next = on_b
            .first()
            .map(|&(_, p)| p)
            .unwrap_or_else(|| mesh.point(edge_b[1]));

        let shared = edge_a[1];
        let cells: Vec<usize> = mesh.point_cells(shared).to_vec();

        for cell in cells {
            if mesh.is_deleted(cell) {
                continue;
            }

            let ring = mesh.cell_points(cell);

            let has_prev = ring.iter().any(|p| coords_equal(p, &prev));
            let has_next = ring.iter().any(|p| coords_equal(p, &next));

            if has_prev && has_next {
                let fresh = mesh.add_point(curve.point(ind));
                mesh.replace_cell_point(cell, shared, fresh);
                break;
            }
        }
    }
}
