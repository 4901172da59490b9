//! The cutter: replaces each contacted polygon with the arrangement formed
//! by its ring and its strips.
//!
//! Strips meeting at a branched point are consumed first through the
//! sand-glass decomposition; the remaining strips are woven into whichever
//! piece currently holds their anchor vertex, splitting it in two. After
//! every emitted piece the anchors of not-yet-placed strips are re-targeted
//! to the freshly minted duplicate points, which is what keeps edge captures
//! and overlapping cuts mutually consistent.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use polybool_math::{coords_equal, newell_normal, Point2, Point3, PointKey, Vec3};
use polybool_mesh::PolyMesh;

use crate::error::{BooleanError, Result};
use crate::merger;
use crate::strips::{has_area, Capt, PolyStripsMap, Side, Strip, StripPt, StripPtR};

const ALIGNED: f64 = 1.0 - 1e-6;

/// Newell normal over the cut coordinates of a sequence of contact points.
fn refs_normal(pts: &BTreeMap<usize, StripPt>, inds: &[usize]) -> Vec3 {
    let ring: Vec<Point3> = inds.iter().map(|i| pts[i].cut_pt).collect();
    newell_normal(&ring)
}

/// Drop ring entries that coincide with their successor.
fn clean_poly(mesh: &PolyMesh, poly: &mut Vec<usize>) {
    let n = poly.len();
    if n == 0 {
        return;
    }

    let mut keep = Vec::with_capacity(n);
    for i in 0..n {
        let a = mesh.point(poly[i]);
        let b = mesh.point(poly[(i + 1) % n]);

        if !coords_equal(&a, &b) {
            keep.push(poly[i]);
        }
    }

    *poly = keep;
}

/// A strip end inside an edge bundle: strip index plus which end.
type EdgeRef = (usize, bool);

fn end_of<'a>(strips: &'a [Strip], (si, front): EdgeRef) -> &'a StripPtR {
    let strip = &strips[si];
    if front {
        &strip[0]
    } else {
        &strip[strip.len() - 1]
    }
}

fn set_anchor(strips: &mut [Strip], (si, front): EdgeRef, anchor: usize) {
    let len = strips[si].len();
    let el = if front {
        &mut strips[si][0]
    } else {
        &mut strips[si][len - 1]
    };
    el.anchor = Some(anchor);
}

/// Split every contacted polygon of one mesh along its strips.
pub fn cut_cells(mesh: &mut PolyMesh, poly_strips: &mut PolyStripsMap) -> Result<()> {
    let poly_inds: Vec<usize> = poly_strips.keys().copied().collect();

    for poly_ind in poly_inds {
        cut_one_cell(mesh, poly_strips, poly_ind)?;
    }

    mesh.remove_deleted_cells();
    mesh.build_links();

    Ok(())
}

fn cut_one_cell(mesh: &mut PolyMesh, poly_strips: &mut PolyStripsMap, poly_ind: usize) -> Result<()> {
    let orig_id = mesh.orig_cell_id(poly_ind);

    let p_strips = poly_strips
        .get_mut(&poly_ind)
        .ok_or(BooleanError::CutFailed)?;

    let poly = p_strips.poly.clone();
    let base = p_strips.base.clone();

    // Coincident boundary: the strip set retraces the polygon itself.
    if !p_strips.pts.is_empty() && p_strips.pts.values().all(|sp| sp.capt == Capt::A) {
        let ring_pts: Vec<Point3> = poly.iter().map(|&id| mesh.point(id)).collect();

        let set_ring: BTreeSet<PointKey> = ring_pts.iter().map(PointKey::from_point).collect();
        let set_cuts: BTreeSet<PointKey> = p_strips
            .pts
            .values()
            .map(|sp| PointKey::from_point(&sp.cut_pt))
            .collect();

        if set_ring == set_cuts {
            let ring: Vec<usize> = ring_pts.iter().map(|&p| mesh.add_point(p)).collect();
            mesh.add_cell(ring, orig_id);
            mesh.delete_cell(poly_ind);
            return Ok(());
        }
    }

    let mut absolute_t: BTreeMap<usize, f64> = BTreeMap::new();
    let mut total_t = 0.0;
    for &id in &poly {
        absolute_t.insert(id, total_t);
        total_t += 1.0;
    }

    // a strip may not be branched at both ends
    {
        let pts = &p_strips.pts;
        if p_strips.strips.iter().any(|s| {
            pts[&s[0].ind].capt == Capt::Branched && pts[&s[s.len() - 1].ind].capt == Capt::Branched
        }) {
            return Err(BooleanError::CutFailed);
        }
    }

    // set purely-interior strips aside for the hole merger
    let mut holes: Vec<Strip> = Vec::new();
    {
        let pts = &p_strips.pts;
        let mut kept = Vec::with_capacity(p_strips.strips.len());

        for strip in p_strips.strips.drain(..) {
            if pts[&strip[0].ind].capt == Capt::None
                && pts[&strip[strip.len() - 1].ind].capt == Capt::None
            {
                holes.push(strip);
            } else {
                kept.push(strip);
            }
        }

        p_strips.strips = kept;
    }

    let pts = &p_strips.pts;
    let strips = &mut p_strips.strips;

    // init: orient, mark ends, mint the left/right duplicates
    for strip in strips.iter_mut() {
        let front = &pts[&strip[0].ind];
        let back = &pts[&strip[strip.len() - 1].ind];

        // both ends on the same edge, against the edge direction
        if let (Some(ef), Some(eb)) = (front.edge, back.edge) {
            if ef[0] == eb[0] && front.ind != back.ind && front.t > back.t {
                strip.reverse();
            }
        }

        let front = &pts[&strip[0].ind];
        let back = &pts[&strip[strip.len() - 1].ind];

        // a branched end goes last
        if front.capt == Capt::Branched && back.capt.is_boundary() {
            strip.reverse();
        }

        let start = pts[&strip[0].ind].clone();
        let end = pts[&strip[strip.len() - 1].ind].clone();

        strip[0].side = Side::Start;
        strip[0].anchor = start.edge.map(|e| e[0]);

        if end.capt.is_boundary() {
            let len = strip.len();
            strip[len - 1].side = Side::End;
            strip[len - 1].anchor = end.edge.map(|e| e[0]);
        }

        for p in strip.iter_mut() {
            let cut = pts[&p.ind].cut_pt;
            p.desc = [mesh.add_point(cut), mesh.add_point(cut)];
        }
    }

    let mut polys: Vec<Vec<usize>> = vec![poly.clone()];

    // group strips by their branched endpoint
    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (si, strip) in strips.iter().enumerate() {
        if pts[&strip[strip.len() - 1].ind].capt == Capt::Branched {
            groups
                .entry(strip[strip.len() - 1].ind)
                .or_default()
                .push(si);
        }
    }

    let mut assembled: Vec<usize> = Vec::new();

    for group in groups.values() {
        let mut order = group.clone();

        let less = |a: usize, b: usize| -> bool {
            let sa = &strips[a];
            let sb = &strips[b];

            if sa[0].ind == sb[0].ind {
                let mut ring: Vec<usize> = sb.iter().map(|p| p.ind).collect();
                ring.extend(sa.iter().rev().map(|p| p.ind));

                base.n.dot(&refs_normal(pts, &ring)) > ALIGNED
            } else {
                let pa = &pts[&sa[0].ind];
                let pb = &pts[&sb[0].ind];

                let ta = pa.edge.map_or(0.0, |e| absolute_t[&e[0]]) + pa.t;
                let tb = pb.edge.map_or(0.0, |e| absolute_t[&e[0]]) + pb.t;

                ta < tb
            }
        };

        order.sort_by(|&a, &b| {
            if less(a, b) {
                std::cmp::Ordering::Less
            } else if less(b, a) {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        });

        let first_anchor = strips[order[0]][0].anchor.ok_or(BooleanError::CutFailed)?;

        let next_idx = polys
            .iter()
            .position(|p| p.contains(&first_anchor))
            .ok_or(BooleanError::CutFailed)?;

        for &si in &order {
            assembled.push(strips[si][0].strip);
        }

        let mut new_polys: Vec<Vec<usize>> = Vec::with_capacity(order.len() + 1);

        for ai in 0..order.len() {
            let a_idx = order[ai];
            let b_idx = order[(ai + 1) % order.len()];

            let mut new_poly: Vec<usize> = strips[b_idx].iter().map(|p| p.desc[0]).collect();
            new_poly.extend(strips[a_idx].iter().rev().skip(1).map(|p| p.desc[1]));

            let ref_a = strips[a_idx][0].anchor.ok_or(BooleanError::CutFailed)?;
            let ref_b = strips[b_idx][0].anchor.ok_or(BooleanError::CutFailed)?;

            // polygon vertices between the two consumed anchors
            if ref_a != ref_b {
                let ring = &polys[next_idx];
                let pos_a = ring
                    .iter()
                    .position(|&v| v == ref_a)
                    .ok_or(BooleanError::CutFailed)?;
                let pos_b = ring
                    .iter()
                    .position(|&v| v == ref_b)
                    .ok_or(BooleanError::CutFailed)?;

                let mut pos = pos_a;
                loop {
                    pos = (pos + 1) % ring.len();
                    new_poly.push(ring[pos]);
                    if pos == pos_b {
                        break;
                    }
                }
            }

            clean_poly(mesh, &mut new_poly);

            let proj: Vec<Point2> = new_poly
                .iter()
                .map(|&id| base.project(&mesh.point(id)))
                .collect();

            // re-target the anchors of strips that are not placed yet
            let p_a = pts[&strips[a_idx][0].ind].clone();
            let p_b = pts[&strips[b_idx][0].ind].clone();

            let a_desc1 = strips[a_idx][0].desc[1];
            let b_desc0 = strips[b_idx][0].desc[0];

            for si in 0..strips.len() {
                if assembled.contains(&strips[si][0].strip) {
                    continue;
                }

                let end_a = pts[&strips[si][0].ind].clone();
                let end_b = pts[&strips[si][strips[si].len() - 1].ind].clone();
                let last = strips[si].len() - 1;

                if let (Some(pa_edge), Some(ea_edge)) = (p_a.edge, end_a.edge) {
                    if end_a.capt.is_boundary()
                        && pa_edge[0] == ea_edge[0]
                        && end_a.t > p_a.t
                        && (Some(pa_edge[0]) != p_b.edge.map(|e| e[0]) || end_a.t < p_b.t)
                    {
                        strips[si][0].anchor = Some(a_desc1);

                        if end_b.ind == p_a.ind {
                            strips[si][last].anchor = Some(a_desc1);
                        } else if end_b.ind == p_b.ind {
                            strips[si][last].anchor = Some(b_desc0);
                        }
                    }
                }

                if let (Some(pa_edge), Some(eb_edge)) = (p_a.edge, end_b.edge) {
                    if end_b.capt.is_boundary()
                        && pa_edge[0] == eb_edge[0]
                        && end_b.t > p_a.t
                        && (Some(pa_edge[0]) != p_b.edge.map(|e| e[0]) || end_b.t < p_b.t)
                    {
                        strips[si][last].anchor = Some(a_desc1);

                        if end_a.ind == p_a.ind {
                            strips[si][0].anchor = Some(a_desc1);
                        } else if end_a.ind == p_b.ind {
                            strips[si][0].anchor = Some(b_desc0);
                        }
                    }
                }

                if end_a.ind == p_a.ind && end_b.ind == p_b.ind {
                    strips[si][0].anchor = Some(a_desc1);
                    strips[si][last].anchor = Some(b_desc0);
                } else if end_b.ind == p_a.ind && end_a.ind == p_b.ind {
                    strips[si][last].anchor = Some(a_desc1);
                    strips[si][0].anchor = Some(b_desc0);
                }

                if end_b.capt == Capt::Branched {
                    let pp = base.project(&end_b.pt);

                    if polybool_math::point_in_poly(&proj, &pp) {
                        if end_a.ind == p_a.ind {
                            strips[si][0].anchor = Some(a_desc1);
                        } else if end_a.ind == p_b.ind {
                            strips[si][0].anchor = Some(b_desc0);
                        }
                    }
                }
            }

            new_polys.push(new_poly);
        }

        polys.remove(next_idx);
        polys.extend(new_polys);
    }

    // weave the remaining strips into the piece holding their anchor
    let mut final_polys: Vec<Vec<usize>> = Vec::new();

    for next in polys {
        let cand: Vec<usize> = (0..strips.len())
            .filter(|&si| {
                pts[&strips[si][strips[si].len() - 1].ind].capt != Capt::Branched
                    && strips[si][0].anchor.map_or(false, |a| next.contains(&a))
            })
            .collect();

        if cand.is_empty() {
            final_polys.push(next);
            continue;
        }

        let mut local_polys: VecDeque<Vec<usize>> = VecDeque::new();
        local_polys.push_back(next);

        // bundle strip ends per host edge
        let mut edges: BTreeMap<usize, Vec<EdgeRef>> = BTreeMap::new();

        for &si in &cand {
            let a = &pts[&strips[si][0].ind];
            let b = &pts[&strips[si][strips[si].len() - 1].ind];

            if let Some(edge) = a.edge {
                edges.entry(edge[0]).or_default().push((si, true));
            }
            if let Some(edge) = b.edge {
                edges.entry(edge[0]).or_default().push((si, false));
            }
        }

        // orient closed loops anchored at a single boundary point
        for bundle in edges.values() {
            let mut seen: BTreeSet<usize> = BTreeSet::new();

            for &(si, _) in bundle {
                if !seen.insert(si) {
                    let strip = &strips[si];

                    if strip[0].ind == strip[strip.len() - 1].ind && has_area(strip) {
                        let ring: Vec<usize> =
                            strip[..strip.len() - 1].iter().map(|p| p.ind).collect();

                        if base.n.dot(&refs_normal(pts, &ring)) > ALIGNED {
                            strips[si].reverse();
                        }
                    }
                }
            }
        }

        // order the strip ends along each edge
        for (&edge_id, bundle) in edges.iter_mut() {
            let strips_ref: &[Strip] = strips;

            let less = |x: EdgeRef, y: EdgeRef| -> bool {
                let ex = end_of(strips_ref, x);
                let ey = end_of(strips_ref, y);

                let px = &pts[&ex.ind];
                let py = &pts[&ey.ind];

                if px.ind == py.ind {
                    if ex.strip != ey.strip {
                        let sx = &strips_ref[x.0];
                        let sy = &strips_ref[y.0];

                        let ox = if ex.ind == sx[0].ind {
                            sx[sx.len() - 1].ind
                        } else {
                            sx[0].ind
                        };
                        let oy = if ey.ind == sy[0].ind {
                            sy[sy.len() - 1].ind
                        } else {
                            sy[0].ind
                        };

                        let pox = &pts[&ox];
                        let poy = &pts[&oy];

                        if pox.ind != poy.ind {
                            let r = absolute_t[&edge_id] + px.t;

                            let abs = |p: &StripPt| -> f64 {
                                p.edge.map_or(0.0, |e| absolute_t[&e[0]]) + p.t
                            };

                            let mut ra = abs(pox);
                            let mut rb = abs(poy);

                            ra = if ra > r { ra - r } else { ra + total_t - r };
                            rb = if rb > r { rb - r } else { rb + total_t - r };

                            rb < ra
                        } else {
                            // two strips spanning the same endpoints: the
                            // arrangement facing the polygon normal first
                            let mut ring: Vec<usize> = if ex.side == Side::Start {
                                sx.iter().map(|p| p.ind).collect()
                            } else {
                                sx.iter().rev().map(|p| p.ind).collect()
                            };

                            if ey.side == Side::Start {
                                ring.extend(
                                    sy[1..sy.len() - 1].iter().rev().map(|p| p.ind),
                                );
                            } else {
                                ring.extend(sy[1..sy.len() - 1].iter().map(|p| p.ind));
                            }

                            base.n.dot(&refs_normal(pts, &ring)) < ALIGNED
                        }
                    } else {
                        // the two ends of one strip stay in insertion order
                        false
                    }
                } else {
                    px.t < py.t
                }
            };

            bundle.sort_by(|&x, &y| {
                if less(x, y) {
                    std::cmp::Ordering::Less
                } else if less(y, x) {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            });
        }

        // insert the strips one by one, splitting the host piece
        for &si in &cand {
            let start_anchor = strips[si][0].anchor;
            let end_anchor = strips[si][strips[si].len() - 1].anchor;
            let start_id = strips[si][0].strip;

            let descs0: Vec<usize> = strips[si].iter().map(|p| p.desc[0]).collect();
            let descs1_rev: Vec<usize> = strips[si].iter().rev().map(|p| p.desc[1]).collect();

            let mut cycle = 0;

            while cycle < local_polys.len() {
                let next_ring = match local_polys.pop_front() {
                    Some(r) => r,
                    None => break,
                };

                let mut split0: Vec<usize> = Vec::new();
                let mut split1: Vec<usize> = Vec::new();

                if start_anchor.map_or(false, |a| next_ring.contains(&a)) {
                    if start_anchor == end_anchor {
                        for &v in &next_ring {
                            split0.push(v);

                            if Some(v) == start_anchor {
                                split0.extend_from_slice(&descs0);
                            }
                        }

                        // the strip itself closes into a polygon
                        split1.extend_from_slice(&descs1_rev);
                    } else {
                        let mut curr = 0;

                        for &v in &next_ring {
                            let target = if curr == 0 { &mut split0 } else { &mut split1 };
                            target.push(v);

                            if Some(v) == start_anchor {
                                target.extend_from_slice(&descs0);
                                curr ^= 1;
                            } else if Some(v) == end_anchor {
                                target.extend_from_slice(&descs1_rev);
                                curr ^= 1;
                            }
                        }
                    }
                }

                if !split1.is_empty() {
                    rewrite_anchors(strips, &edges, pts, start_id);

                    clean_poly(mesh, &mut split0);
                    clean_poly(mesh, &mut split1);

                    if split0.len() > 2 {
                        local_polys.push_back(split0);
                    }

                    if has_area(&strips[si]) && split1.len() > 2 {
                        local_polys.push_back(split1);
                    }

                    break;
                } else {
                    local_polys.push_back(next_ring);
                    cycle += 1;
                }
            }
        }

        final_polys.extend(local_polys);
    }

    // emit the pieces, retire the original
    let mut desc_ids: Vec<usize> = Vec::with_capacity(final_polys.len());

    for p in final_polys {
        desc_ids.push(mesh.add_cell(p, orig_id));
    }

    mesh.delete_cell(poly_ind);

    if !holes.is_empty() {
        merger::merge_holes(mesh, &base, pts, &holes, &desc_ids, orig_id)?;
    }

    Ok(())
}

/// Re-target anchors of strips later than the just-placed one by scanning
/// each edge bundle. A later strip end re-anchors to the nearest earlier
/// strip's duplicate on the correct side.
fn rewrite_anchors(
    strips: &mut [Strip],
    edges: &BTreeMap<usize, Vec<EdgeRef>>,
    pts: &BTreeMap<usize, StripPt>,
    start_id: usize,
) {
    for bundle in edges.values() {
        for pos in 1..bundle.len() {
            let here = bundle[pos];
            let here_ind = end_of(strips, here).ind;
            let here_strip = end_of(strips, here).strip;

            if here_strip <= start_id {
                continue;
            }

            // nearest predecessor on the edge that is already placed
            let mut marker: Option<(usize, usize)> = None;
            let mut new_anchor: Option<usize> = None;

            for prev_pos in (0..pos).rev() {
                let prev = end_of(strips, bundle[prev_pos]);

                if prev.strip != here_strip {
                    if prev.strip <= start_id {
                        new_anchor = Some(if prev.side == Side::End {
                            prev.desc[0]
                        } else {
                            prev.desc[1]
                        });

                        marker = Some((prev.ind, prev.strip));
                        break;
                    }
                } else {
                    new_anchor = prev.anchor;
                    break;
                }
            }

            if let Some(anchor) = new_anchor {
                set_anchor(strips, here, anchor);
            }

            // a placed successor at the very same point wins
            let mut forward_anchor: Option<usize> = None;

            for &next_ref in &bundle[pos + 1..] {
                let next = end_of(strips, next_ref);

                if next.ind != here_ind {
                    break;
                }

                if next.strip <= start_id {
                    if let Some((m_ind, m_strip)) = marker {
                        if next.ind == m_ind && next.strip < m_strip {
                            break;
                        }
                    }

                    forward_anchor = Some(if next.side == Side::Start {
                        next.desc[0]
                    } else {
                        next.desc[1]
                    });

                    break;
                }
            }

            if let Some(anchor) = forward_anchor {
                set_anchor(strips, here, anchor);
            }
        }

        // head of the edge: a source-vertex capture follows the strip that
        // just consumed it
        if bundle.len() > 1 {
            let a = end_of(strips, bundle[0]);
            let b = end_of(strips, bundle[1]);

            if a.ind == b.ind && b.strip == start_id && pts[&a.ind].capt == Capt::A {
                let anchor = if b.side == Side::Start {
                    b.desc[0]
                } else {
                    b.desc[1]
                };

                let target = bundle[0];
                set_anchor(strips, target, anchor);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strips::{build_poly_strips, MeshSide};
    use polybool_contact::{ContactCurve, ContactLine};

    fn square_mesh() -> PolyMesh {
        let mut mesh = PolyMesh::new();
        let ring = vec![
            mesh.add_point(Point3::new(0.0, 0.0, 0.0)),
            mesh.add_point(Point3::new(1.0, 0.0, 0.0)),
            mesh.add_point(Point3::new(1.0, 1.0, 0.0)),
            mesh.add_point(Point3::new(0.0, 1.0, 0.0)),
        ];
        mesh.add_cell(ring, 5);
        mesh
    }

    fn cell_area(mesh: &PolyMesh, id: usize) -> f64 {
        let pts = mesh.cell_points(id);
        let mut s = Vec3::zeros();
        for i in 0..pts.len() {
            let a = pts[i].coords;
            let b = pts[(i + 1) % pts.len()].coords;
            s += a.cross(&b);
        }
        s.norm() * 0.5
    }

    fn total_area(mesh: &PolyMesh) -> f64 {
        mesh.live_cells().map(|id| cell_area(mesh, id)).sum()
    }

    #[test]
    fn test_single_cut_splits_in_two() {
        let mesh = &mut square_mesh();

        let mut curve = ContactCurve::new();
        let a = curve.add_point(Point3::new(0.3, 0.0, 0.0));
        let m = curve.add_point(Point3::new(0.4, 0.5, 0.0));
        let b = curve.add_point(Point3::new(0.5, 1.0, 0.0));
        curve.add_line(ContactLine::new([a, m], 0, 0));
        curve.add_line(ContactLine::new([m, b], 0, 0));

        let mut strips = build_poly_strips(mesh, &curve, MeshSide::A).unwrap();
        cut_cells(mesh, &mut strips).unwrap();

        assert_eq!(mesh.num_live_cells(), 2);
        assert!((total_area(mesh) - 1.0).abs() < 1e-9);

        for id in mesh.live_cells() {
            assert_eq!(mesh.orig_cell_id(id), 5);
        }
    }

    #[test]
    fn test_two_parallel_cuts_make_three_pieces() {
        let mesh = &mut square_mesh();

        let mut curve = ContactCurve::new();
        let a0 = curve.add_point(Point3::new(0.3, 0.0, 0.0));
        let a1 = curve.add_point(Point3::new(0.3, 1.0, 0.0));
        let b0 = curve.add_point(Point3::new(0.6, 0.0, 0.0));
        let b1 = curve.add_point(Point3::new(0.6, 1.0, 0.0));
        curve.add_line(ContactLine::new([a0, a1], 0, 0));
        curve.add_line(ContactLine::new([b0, b1], 0, 1));

        let mut strips = build_poly_strips(mesh, &curve, MeshSide::A).unwrap();
        cut_cells(mesh, &mut strips).unwrap();

        assert_eq!(mesh.num_live_cells(), 3);
        assert!((total_area(mesh) - 1.0).abs() < 1e-9);

        // the middle piece spans the band between the cuts
        let areas: Vec<f64> = mesh.live_cells().map(|id| cell_area(mesh, id)).collect();
        assert!(areas.iter().any(|&a| (a - 0.3).abs() < 1e-9));
        assert!(areas.iter().filter(|&&a| (a - 0.3).abs() < 1e-9).count() >= 2);
        assert!(areas.iter().any(|&a| (a - 0.4).abs() < 1e-9));
    }

    #[test]
    fn test_branched_sand_glass() {
        let mesh = &mut square_mesh();

        let mut curve = ContactCurve::new();
        let hub = curve.add_point(Point3::new(0.5, 0.5, 0.0));
        let e1 = curve.add_point(Point3::new(0.5, 0.0, 0.0));
        let e2 = curve.add_point(Point3::new(1.0, 0.5, 0.0));
        let e3 = curve.add_point(Point3::new(0.5, 1.0, 0.0));
        curve.add_line(ContactLine::new([e1, hub], 0, 0));
        curve.add_line(ContactLine::new([e2, hub], 0, 1));
        curve.add_line(ContactLine::new([e3, hub], 0, 2));

        let mut strips = build_poly_strips(mesh, &curve, MeshSide::A).unwrap();
        cut_cells(mesh, &mut strips).unwrap();

        assert_eq!(mesh.num_live_cells(), 3);
        assert!((total_area(mesh) - 1.0).abs() < 1e-9);

        let areas: Vec<f64> = mesh.live_cells().map(|id| cell_area(mesh, id)).collect();
        assert!(areas.iter().any(|&a| (a - 0.5).abs() < 1e-9));
        assert_eq!(
            areas.iter().filter(|&&a| (a - 0.25).abs() < 1e-9).count(),
            2
        );
    }

    #[test]
    fn test_coincident_boundary_shortcut() {
        let mesh = &mut square_mesh();

        let mut curve = ContactCurve::new();
        let c0 = curve.add_point(Point3::new(0.0, 0.0, 0.0));
        let c1 = curve.add_point(Point3::new(1.0, 0.0, 0.0));
        let c2 = curve.add_point(Point3::new(1.0, 1.0, 0.0));
        let c3 = curve.add_point(Point3::new(0.0, 1.0, 0.0));

        curve.add_line(ContactLine::new([c0, c1], 0, 0).with_src_a([Some(0), Some(1)]));
        curve.add_line(ContactLine::new([c1, c2], 0, 1).with_src_a([Some(1), Some(2)]));
        curve.add_line(ContactLine::new([c2, c3], 0, 2).with_src_a([Some(2), Some(3)]));
        curve.add_line(ContactLine::new([c3, c0], 0, 3).with_src_a([Some(3), Some(0)]));

        let mut strips = build_poly_strips(mesh, &curve, MeshSide::A).unwrap();
        cut_cells(mesh, &mut strips).unwrap();

        // exactly one polygon with the same ring, on fresh points
        assert_eq!(mesh.num_live_cells(), 1);
        let id = mesh.live_cells().next().unwrap();
        assert_eq!(mesh.cell_ring(id).len(), 4);
        assert!((cell_area(mesh, id) - 1.0).abs() < 1e-9);
        assert_eq!(mesh.orig_cell_id(id), 5);
    }

    #[test]
    fn test_both_branched_strip_fails() {
        let mesh = &mut square_mesh();

        // two hubs joined by one line, each hub fed by three more lines
        let mut curve = ContactCurve::new();
        let h1 = curve.add_point(Point3::new(0.4, 0.5, 0.0));
        let h2 = curve.add_point(Point3::new(0.6, 0.5, 0.0));
        let p1 = curve.add_point(Point3::new(0.4, 0.0, 0.0));
        let p2 = curve.add_point(Point3::new(0.4, 1.0, 0.0));
        let p3 = curve.add_point(Point3::new(0.6, 0.0, 0.0));
        let p4 = curve.add_point(Point3::new(0.6, 1.0, 0.0));

        curve.add_line(ContactLine::new([h1, h2], 0, 0));
        curve.add_line(ContactLine::new([p1, h1], 0, 0));
        curve.add_line(ContactLine::new([p2, h1], 0, 1));
        curve.add_line(ContactLine::new([p3, h2], 0, 0));
        curve.add_line(ContactLine::new([p4, h2], 0, 1));

        let mut strips = build_poly_strips(mesh, &curve, MeshSide::A).unwrap();
        let result = cut_cells(mesh, &mut strips);
        assert!(matches!(result, Err(BooleanError::CutFailed)));
    }
}
