//! Region combination: flood-filled surface regions are classified against
//! the opposite mesh at the contact edges, selected per the requested
//! operator, winding-fixed and appended into the result.
//!
//! Classification is purely local dihedral geometry: at a surviving contact
//! line the two polygons of each mesh sharing the directed edge form a
//! crease; a polygon of the other mesh is inside or outside depending on
//! which side of the crease its in-plane direction falls, with coplanar
//! (congruent) pairs resolved by the operator-specific rules.

use std::collections::{BTreeMap, BTreeSet};

use polybool_contact::ContactCurve;
use polybool_math::{angle_about, Vec3};
use polybool_mesh::PolyMesh;
use polybool_spatial::PointLocator;

use crate::api::{BooleanOutput, OperMode};
use crate::debug_bool;
use crate::error::{BooleanError, Result};

/// Congruence eps, about 0.008 degrees.
const CONG_EPS: f64 = 0.99999999;

/// Location of a surface region relative to the other mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loc {
    /// Not determined.
    None,
    /// Inside the other mesh.
    Inside,
    /// Outside the other mesh.
    Outside,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Congruence {
    Equal,
    Opposite,
    Not,
}

/// One polygon at a directed contact edge.
#[derive(Debug, Clone)]
pub(crate) struct PolyAtEdge {
    pub cell: usize,
    pub pt_a: usize,
    pub pt_b: usize,
    pub n: Vec3,
    pub e: Vec3,
    pub r: Vec3,
    pub loc: Loc,
}

impl PolyAtEdge {
    fn new(mesh: &PolyMesh, cell: usize, pt_a: usize, pt_b: usize) -> Self {
        let a = mesh.point(pt_a);
        let b = mesh.point(pt_b);

        let mut e = b - a;
        let norm = e.norm();
        if norm > 1e-12 {
            e /= norm;
        }

        let n = mesh.cell_normal(cell);
        let r = e.cross(&n);

        Self {
            cell,
            pt_a,
            pt_b,
            n,
            e,
            r,
            loc: Loc::None,
        }
    }

    fn congruence(&self, other: &PolyAtEdge) -> Congruence {
        let cong = self.n.dot(&other.n);

        if (cong > CONG_EPS || cong < -CONG_EPS) && self.r.dot(&other.r) > CONG_EPS {
            if cong > CONG_EPS {
                Congruence::Equal
            } else {
                Congruence::Opposite
            }
        } else {
            Congruence::Not
        }
    }
}

/// The two polygons of one mesh sharing a contact edge.
#[derive(Debug, Clone)]
pub(crate) struct PolyPair {
    pub a: PolyAtEdge,
    pub b: PolyAtEdge,
}

impl PolyPair {
    /// Classify `target` (a polygon of the other mesh) against this crease.
    pub(crate) fn locate(&mut self, target: &mut PolyAtEdge, mode: OperMode) {
        let c_a = self.a.congruence(target);
        let c_b = self.b.congruence(target);

        if c_a != Congruence::Not {
            if c_a == Congruence::Opposite {
                if mode == OperMode::Intersection {
                    self.a.loc = Loc::Outside;
                    target.loc = Loc::Outside;
                } else {
                    self.a.loc = Loc::Inside;
                    target.loc = Loc::Inside;
                }
            } else if mode == OperMode::Union || mode == OperMode::Intersection {
                self.a.loc = Loc::Inside;
                target.loc = Loc::Outside;
            }
        } else if c_b != Congruence::Not {
            if c_b == Congruence::Opposite {
                if mode == OperMode::Intersection {
                    self.b.loc = Loc::Outside;
                    target.loc = Loc::Outside;
                } else {
                    self.b.loc = Loc::Inside;
                    target.loc = Loc::Inside;
                }
            } else if mode == OperMode::Union || mode == OperMode::Intersection {
                self.b.loc = Loc::Inside;
                target.loc = Loc::Outside;
            }
        } else {
            let alpha = angle_about(&self.a.r, &self.b.r, &self.a.e);
            let beta = angle_about(&self.a.r, &target.r, &self.a.e);

            target.loc = if beta > alpha { Loc::Inside } else { Loc::Outside };
        }
    }
}

/// Find the two polygons of one mesh sharing the directed contact edge whose
/// endpoints sit at the given point sets.
fn edge_polys(mesh: &PolyMesh, pts_a: &[usize], pts_b: &[usize]) -> Option<PolyPair> {
    let mut cell_pts: BTreeMap<usize, Vec<usize>> = BTreeMap::new();

    for &p in pts_a.iter().chain(pts_b.iter()) {
        for &c in mesh.point_cells(p) {
            cell_pts.entry(c).or_default().push(p);
        }
    }

    let mut found: Vec<PolyAtEdge> = Vec::new();

    for (&cell, plist) in &cell_pts {
        if plist.len() < 2 || mesh.is_deleted(cell) {
            continue;
        }

        let ring = mesh.cell_ring(cell);

        for i in 0..ring.len() {
            let a = ring[i];
            let b = ring[(i + 1) % ring.len()];

            if plist.contains(&a) && plist.contains(&b) {
                found.push(PolyAtEdge::new(mesh, cell, a, b));
            }
        }
    }

    if found.len() == 2 {
        let b = found.pop()?;
        let a = found.pop()?;
        Some(PolyPair { a, b })
    } else {
        None
    }
}

/// Region ids per point, derived from the per-cell colouring.
fn point_regions(mesh: &PolyMesh, regions: &[Option<usize>]) -> Vec<Option<usize>> {
    let mut out = vec![None; mesh.num_points()];

    for cell in mesh.live_cells() {
        if let Some(r) = regions[cell] {
            for &p in mesh.cell_ring(cell) {
                out[p] = Some(r);
            }
        }
    }

    out
}

/// Classify, select, orient and append the surface regions of both cut
/// meshes per the requested operator.
#[allow(clippy::too_many_arguments)]
pub fn combine_regions(
    mode: OperMode,
    mod_a: &PolyMesh,
    mod_b: &PolyMesh,
    curve: &ContactCurve,
    saved_a: &[i64],
    saved_b: &[i64],
    input_a: &PolyMesh,
    input_b: &PolyMesh,
) -> Result<BooleanOutput> {
    let mut mesh_a = mod_a.clone();
    let mut mesh_b = mod_b.clone();

    mesh_a.compact_points();
    mesh_b.compact_points();

    let (regions_a, num_a) = mesh_a.color_regions();
    let (regions_b, num_b) = mesh_b.color_regions();

    let mut contact = curve.clone();
    contact.remove_deleted_lines();

    let region_attr = |regions: &[Option<usize>]| -> Vec<f64> {
        regions
            .iter()
            .map(|r| r.map(|v| v as f64).unwrap_or(-1.0))
            .collect()
    };

    if mode == OperMode::None {
        mesh_a.set_attr("RegionId", region_attr(&regions_a));
        mesh_b.set_attr("RegionId", region_attr(&regions_b));

        return Ok(BooleanOutput {
            merged: mesh_a,
            orig_cell_ids_a: Vec::new(),
            orig_cell_ids_b: Vec::new(),
            aux: mesh_b,
            contact,
        });
    }

    mesh_a.build_links();
    mesh_b.build_links();

    let pr_a = point_regions(&mesh_a, &regions_a);
    let pr_b = point_regions(&mesh_b, &regions_b);

    let loc_a = PointLocator::build(mesh_a.points());
    let loc_b = PointLocator::build(mesh_b.points());

    let mut locs_a: BTreeMap<usize, Loc> = BTreeMap::new();
    let mut locs_b: BTreeMap<usize, Loc> = BTreeMap::new();

    let mut failed = false;

    for line_id in curve.live_lines() {
        let [e0, e1] = curve.lines[line_id].ends;

        let pt_first = curve.point(e0);
        let pt_last = curve.point(e1);

        let fpts_a = loc_a.find_points(&pt_first);
        let fpts_b = loc_b.find_points(&pt_first);

        // regions already labelled on both sides are not examined again
        let mut not_located = 0;
        for &p in &fpts_a {
            if let Some(r) = pr_a[p] {
                if !locs_a.contains_key(&r) {
                    not_located += 1;
                }
            }
        }
        for &p in &fpts_b {
            if let Some(r) = pr_b[p] {
                if !locs_b.contains_key(&r) {
                    not_located += 1;
                }
            }
        }
        if not_located == 0 {
            continue;
        }

        let lpts_a = loc_a.find_points(&pt_last);
        let lpts_b = loc_b.find_points(&pt_last);

        let pp_a = edge_polys(&mesh_a, &fpts_a, &lpts_a);
        let pp_b = edge_polys(&mesh_b, &fpts_b, &lpts_b);

        match (pp_a, pp_b) {
            (Some(mut pair_a), Some(mut pair_b)) => {
                pair_b.locate(&mut pair_a.a, mode);
                pair_b.locate(&mut pair_a.b, mode);

                pair_a.locate(&mut pair_b.a, mode);
                pair_a.locate(&mut pair_b.b, mode);

                // the first label wins; a diverging later observation is a
                // diagnostic only
                if let Some(r) = pr_a[pair_a.a.pt_a] {
                    if let Some(&prev) = locs_a.get(&r) {
                        if prev != pair_a.a.loc {
                            debug_bool!("sA {}: {:?} -> {:?}", r, prev, pair_a.a.loc);
                        }
                    }
                    locs_a.entry(r).or_insert(pair_a.a.loc);
                }
                if let Some(r) = pr_a[pair_a.b.pt_a] {
                    if let Some(&prev) = locs_a.get(&r) {
                        if prev != pair_a.b.loc {
                            debug_bool!("sA {}: {:?} -> {:?}", r, prev, pair_a.b.loc);
                        }
                    }
                    locs_a.entry(r).or_insert(pair_a.b.loc);
                }
                if let Some(r) = pr_b[pair_b.a.pt_a] {
                    if let Some(&prev) = locs_b.get(&r) {
                        if prev != pair_b.a.loc {
                            debug_bool!("sB {}: {:?} -> {:?}", r, prev, pair_b.a.loc);
                        }
                    }
                    locs_b.entry(r).or_insert(pair_b.a.loc);
                }
                if let Some(r) = pr_b[pair_b.b.pt_a] {
                    if let Some(&prev) = locs_b.get(&r) {
                        if prev != pair_b.b.loc {
                            debug_bool!("sB {}: {:?} -> {:?}", r, prev, pair_b.b.loc);
                        }
                    }
                    locs_b.entry(r).or_insert(pair_b.b.loc);
                }
            }
            _ => failed = true,
        }
    }

    if failed {
        return Err(BooleanError::Unresolved);
    }

    let (target_a, target_b) = mode.region_targets();

    let mut sel_a: BTreeSet<usize> = locs_a
        .iter()
        .filter(|(_, &l)| l == target_a)
        .map(|(&r, _)| r)
        .collect();

    let mut sel_b: BTreeSet<usize> = locs_b
        .iter()
        .filter(|(_, &l)| l == target_b)
        .map(|(&r, _)| r)
        .collect();

    // regions never seen by any contact edge
    if matches!(mode, OperMode::Union | OperMode::Difference) {
        for r in 0..num_a {
            if !locs_a.contains_key(&r) {
                sel_a.insert(r);
            }
        }
    }

    if matches!(mode, OperMode::Union | OperMode::Difference2) {
        for r in 0..num_b {
            if !locs_b.contains_key(&r) {
                sel_b.insert(r);
            }
        }
    }

    let cells_a: Vec<usize> = mesh_a
        .live_cells()
        .filter(|&c| regions_a[c].map_or(false, |r| sel_a.contains(&r)))
        .collect();

    let cells_b: Vec<usize> = mesh_b
        .live_cells()
        .filter(|&c| regions_b[c].map_or(false, |r| sel_b.contains(&r)))
        .collect();

    let mut regs_a = mesh_a.extract(&cells_a);
    let mut regs_b = mesh_b.extract(&cells_b);

    // regions kept as Inside face the wrong way for the composite
    if mode != OperMode::Intersection {
        if target_a == Loc::Inside {
            for (new_id, &old_id) in cells_a.iter().enumerate() {
                if regions_a[old_id].map_or(false, |r| locs_a.contains_key(&r)) {
                    regs_a.reverse_cell(new_id);
                }
            }
        }

        if target_b == Loc::Inside {
            for (new_id, &old_id) in cells_b.iter().enumerate() {
                if regions_b[old_id].map_or(false, |r| locs_b.contains_key(&r)) {
                    regs_b.reverse_cell(new_id);
                }
            }
        }
    }

    // attribute every result polygon to its input polygon
    let work_a: Vec<usize> = cells_a
        .iter()
        .map(|&c| mesh_a.orig_cell_id(c) as usize)
        .collect();
    let work_b: Vec<usize> = cells_b
        .iter()
        .map(|&c| mesh_b.orig_cell_id(c) as usize)
        .collect();

    let mut orig_cell_ids_a: Vec<i64> = Vec::with_capacity(work_a.len() + work_b.len());
    let mut orig_cell_ids_b: Vec<i64> = Vec::with_capacity(work_a.len() + work_b.len());

    for &w in &work_a {
        orig_cell_ids_a.push(saved_a[w]);
        orig_cell_ids_b.push(-1);
    }
    for &w in &work_b {
        orig_cell_ids_a.push(-1);
        orig_cell_ids_b.push(saved_b[w]);
    }

    let mut merged = regs_a;
    merged.append(&regs_b);

    let (merged_regions, _) = merged.color_regions();
    merged.set_attr("RegionId", region_attr(&merged_regions));

    // pass caller attributes through by input polygon
    let names: BTreeSet<String> = input_a
        .attr_names()
        .chain(input_b.attr_names())
        .map(str::to_string)
        .collect();

    for name in names {
        let mut col = vec![f64::NAN; merged.num_cells()];

        if let Some(src) = input_a.attr(&name) {
            for (row, &w) in work_a.iter().enumerate() {
                if let Some(&v) = src.get(w) {
                    col[row] = v;
                }
            }
        }

        if let Some(src) = input_b.attr(&name) {
            for (row, &w) in work_b.iter().enumerate() {
                if let Some(&v) = src.get(w) {
                    col[work_a.len() + row] = v;
                }
            }
        }

        merged.set_attr(&name, col);
    }

    Ok(BooleanOutput {
        merged,
        orig_cell_ids_a,
        orig_cell_ids_b,
        aux: PolyMesh::new(),
        contact,
    })
}
