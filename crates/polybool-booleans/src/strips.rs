//! Strip construction: localising contact points against their host
//! polygons and chaining contact lines into maximal non-branching strips.
//!
//! A strip is the unit the cutter works with: an ordered chain of contact
//! points inside one polygon, each point captured on a source vertex, on an
//! edge, on a branch node, or free in the interior. Strip construction ends
//! with two validity gates, the collapsed-capture guard and the planar
//! self-intersection guard; both abort the operation as `StripsInvalid`.

use std::collections::{BTreeMap, BTreeSet};

use polybool_contact::{ContactCurve, ContactLine};
use polybool_math::{Base, Point2, Point3, PointKey, TOL};
use polybool_mesh::PolyMesh;
use polybool_spatial::SegmentTree;

use crate::error::{BooleanError, Result};

/// Which input mesh a pipeline stage is working on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshSide {
    /// First input.
    A,
    /// Second input.
    B,
}

impl MeshSide {
    /// The polygon a contact line traverses on this side.
    pub fn poly(&self, line: &ContactLine) -> usize {
        match self {
            MeshSide::A => line.poly_a,
            MeshSide::B => line.poly_b,
        }
    }

    /// The per-endpoint source vertex tags on this side.
    pub fn src(&self, line: &ContactLine) -> [Option<usize>; 2] {
        match self {
            MeshSide::A => line.src_a,
            MeshSide::B => line.src_b,
        }
    }
}

/// Capture class of a contact point against its host polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capt {
    /// Free in the polygon interior, degree 2.
    None,
    /// Coincides with the start vertex of its host edge.
    A,
    /// Coincides with the end vertex of its host edge; normalised to
    /// [`Capt::A`] on the following edge before cutting.
    B,
    /// Strictly interior to an edge.
    Edge,
    /// Interior to the polygon but shared by three or more contact lines.
    Branched,
}

impl Capt {
    /// Whether the point is captured on the polygon boundary.
    pub fn is_boundary(&self) -> bool {
        matches!(self, Capt::A | Capt::B | Capt::Edge)
    }
}

/// Which end of a strip an element is, once the cutter has oriented it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Not an oriented end.
    None,
    /// First element of the strip.
    Start,
    /// Last element of the strip.
    End,
}

/// A contact point localised against one polygon.
#[derive(Debug, Clone)]
pub struct StripPt {
    /// Index into the contact curve's point array.
    pub ind: usize,
    /// Raw coordinate on the contact curve.
    pub pt: Point3,
    /// Coordinate snapped to the host vertex/edge when captured.
    pub capt_pt: Point3,
    /// Coordinate actually used for cutting: `capt_pt` for boundary
    /// captures, `pt` otherwise.
    pub cut_pt: Point3,
    /// Directed host edge, set iff captured on an edge or source vertex.
    pub edge: Option<[usize; 2]>,
    /// Parameter along the host edge, clamped to `[0, 1]`.
    pub t: f64,
    /// Capture class.
    pub capt: Capt,
    /// Host polygon.
    pub poly_id: usize,
    /// Whether a declared source vertex was matched to an incident edge.
    pub catched: bool,
}

impl StripPt {
    fn new(ind: usize, pt: Point3) -> Self {
        Self {
            ind,
            pt,
            capt_pt: pt,
            cut_pt: pt,
            edge: None,
            t: 0.0,
            capt: Capt::None,
            poly_id: 0,
            catched: true,
        }
    }
}

/// One element of a strip: a reference to a [`StripPt`] plus the cutter's
/// per-element state.
#[derive(Debug, Clone)]
pub struct StripPtR {
    /// Index into the contact curve's point array.
    pub ind: usize,
    /// Id of the strip this element belongs to (stable per polygon).
    pub strip: usize,
    /// Oriented end marker.
    pub side: Side,
    /// The polygon vertex currently adjacent to this strip end on the
    /// correct side; rewritten as the cutter emits pieces.
    pub anchor: Option<usize>,
    /// Left/right duplicate point ids minted when the strip is woven in.
    pub desc: [usize; 2],
}

impl StripPtR {
    fn new(ind: usize, strip: usize) -> Self {
        Self {
            ind,
            strip,
            side: Side::None,
            anchor: None,
            desc: [usize::MAX; 2],
        }
    }
}

/// A maximal non-branching chain of contact points.
pub type Strip = Vec<StripPtR>;

/// Everything the cutter needs about one contacted polygon.
#[derive(Debug)]
pub struct PolyStrips {
    /// Host polygon index in the mesh.
    pub poly_id: usize,
    /// Snapshot of the polygon's ring.
    pub poly: Vec<usize>,
    /// Planar basis (with the outward normal) for in-plane tests.
    pub base: Base,
    /// Localised contact points by curve point index.
    pub pts: BTreeMap<usize, StripPt>,
    /// The polygon's strips.
    pub strips: Vec<Strip>,
}

impl PolyStrips {
    fn new(mesh: &PolyMesh, poly_id: usize) -> Self {
        let poly = mesh.cell_ring(poly_id).to_vec();
        let base = Base::new(&mesh.cell_points(poly_id));

        Self {
            poly_id,
            poly,
            base,
            pts: BTreeMap::new(),
            strips: Vec::new(),
        }
    }
}

/// Strip bundles for all contacted polygons of one mesh, by polygon index.
pub type PolyStripsMap = BTreeMap<usize, PolyStrips>;

/// The vertex following `v` in a ring, if `v` is present.
fn ring_next(ring: &[usize], v: usize) -> Option<usize> {
    let pos = ring.iter().position(|&p| p == v)?;
    Some(ring[(pos + 1) % ring.len()])
}

/// Localise every unique endpoint of `lines` against the bundle's polygon.
fn get_strip_points(
    mesh: &PolyMesh,
    curve: &ContactCurve,
    side: MeshSide,
    p_strips: &mut PolyStrips,
    lines: &[usize],
) {
    let poly = p_strips.poly.clone();

    // ind -> declared source vertex (first line wins), and line degree per ind
    let mut all_pts: BTreeMap<usize, Option<usize>> = BTreeMap::new();
    let mut degree: BTreeMap<usize, usize> = BTreeMap::new();

    for &line_id in lines {
        let line = &curve.lines[line_id];
        let src = side.src(line);

        for end in 0..2 {
            let ind = line.ends[end];
            all_pts.entry(ind).or_insert(src[end]);
            *degree.entry(ind).or_insert(0) += 1;
        }
    }

    for (&ind, &src) in &all_pts {
        let mut sp = StripPt::new(ind, curve.point(ind));

        let len = poly.len();
        for i in 0..len {
            let a_id = poly[i];
            let b_id = poly[(i + 1) % len];

            if let Some(s) = src {
                if a_id != s {
                    continue;
                }
            }

            let a = mesh.point(a_id);
            let b = mesh.point(b_id);

            let u = b - a;
            let v = sp.pt - a;

            let t = v.dot(&u) / u.norm_squared();
            let d = v.cross(&u).norm() / u.norm();

            if d < TOL && t > -TOL && t < 1.0 + TOL {
                sp.edge = Some([a_id, b_id]);
                sp.t = t.clamp(0.0, 1.0);

                if (a - sp.pt).norm() < TOL {
                    sp.capt_pt = a;
                    sp.capt = Capt::A;
                } else if (b - sp.pt).norm() < TOL {
                    sp.capt_pt = b;
                    sp.capt = Capt::B;
                } else {
                    // u is unnormalised on purpose
                    sp.capt_pt = a + u * t;
                    sp.capt = Capt::Edge;
                }
            }
        }

        if src.is_some() && sp.edge.is_none() {
            sp.catched = false;
        }

        if sp.capt == Capt::None && degree.get(&ind).copied().unwrap_or(0) > 2 {
            sp.capt = Capt::Branched;
        }

        p_strips.pts.insert(ind, sp);
    }

    // Normalise B captures to A on the following edge; pick the cut
    // coordinate.
    for sp in p_strips.pts.values_mut() {
        if sp.capt.is_boundary() {
            if sp.capt == Capt::B {
                sp.t = 0.0;

                if let Some(edge) = sp.edge {
                    let start = edge[1];
                    if let Some(next) = ring_next(&poly, start) {
                        sp.edge = Some([start, next]);
                    }
                }

                sp.capt = Capt::A;
            }

            sp.cut_pt = sp.capt_pt;
        } else {
            sp.cut_pt = sp.pt;
        }
    }
}

/// Assemble the polygon's contact lines into strips.
fn assemble_strips(curve: &ContactCurve, p_strips: &mut PolyStrips, lines: &[usize]) {
    let mut queue: Vec<(usize, usize)> = lines
        .iter()
        .map(|&id| (curve.lines[id].ends[0], curve.lines[id].ends[1]))
        .collect();

    let pts = &p_strips.pts;
    let mut strips: Vec<Strip> = Vec::new();
    let mut strip_id = 0;

    while let Some((f, g)) = queue.pop() {
        let mut strip: Strip = vec![StripPtR::new(f, strip_id), StripPtR::new(g, strip_id)];

        // extend right: only interior points may grow further
        loop {
            let right = strip[strip.len() - 1].ind;
            if pts[&right].capt != Capt::None {
                break;
            }

            match queue.iter().position(|&(a, b)| a == right || b == right) {
                Some(pos) => {
                    let (a, b) = queue.remove(pos);
                    strip.push(StripPtR::new(if a == right { b } else { a }, strip_id));
                }
                None => break,
            }
        }

        // extend left
        loop {
            let left = strip[0].ind;
            if pts[&left].capt != Capt::None {
                break;
            }

            match queue.iter().position(|&(a, b)| a == left || b == left) {
                Some(pos) => {
                    let (a, b) = queue.remove(pos);
                    strip.insert(0, StripPtR::new(if a == left { b } else { a }, strip_id));
                }
                None => break,
            }
        }

        strips.push(strip);
        strip_id += 1;
    }

    p_strips.strips = strips;

    complete_strips(p_strips);
}

/// Close open traces: a strip with a free interior end is doubled with a
/// reversed copy so that cutting sees a closed trace.
fn complete_strips(p_strips: &mut PolyStrips) {
    for strip in &mut p_strips.strips {
        let start = &p_strips.pts[&strip[0].ind];
        let end = &p_strips.pts[&strip[strip.len() - 1].ind];

        if start.ind != end.ind {
            if start.capt == Capt::None {
                let prefix: Vec<StripPtR> = strip[1..].iter().rev().cloned().collect();
                strip.splice(0..0, prefix);
            } else if end.capt == Capt::None {
                let suffix: Vec<StripPtR> =
                    strip[..strip.len() - 1].iter().rev().cloned().collect();
                strip.extend(suffix);
            }
        }
    }
}

/// Whether a strip encloses area. An odd-length strip is flat iff its index
/// sequence is a palindrome (a degenerate doubled chain).
pub fn has_area(strip: &Strip) -> bool {
    let n = strip.len();

    if n % 2 == 1 {
        !(0..(n - 1) / 2).all(|i| strip[i].ind == strip[n - i - 1].ind)
    } else {
        true
    }
}

/// Build the strip bundles for every contacted polygon of one mesh.
///
/// Fails with [`BooleanError::StripsInvalid`] on an uncatchable source-vertex
/// reference, collapsed boundary captures, or a self-intersecting strip
/// arrangement.
pub fn build_poly_strips(
    mesh: &PolyMesh,
    curve: &ContactCurve,
    side: MeshSide,
) -> Result<PolyStripsMap> {
    let mut poly_lines: BTreeMap<usize, Vec<usize>> = BTreeMap::new();

    for id in curve.live_lines() {
        poly_lines
            .entry(side.poly(&curve.lines[id]))
            .or_default()
            .push(id);
    }

    let mut poly_strips: PolyStripsMap = BTreeMap::new();
    let mut not_catched: Vec<(usize, usize)> = Vec::new();

    for (&poly_id, lines) in &mut poly_lines {
        *lines = curve.dedupe_lines(lines);

        let mut p_strips = PolyStrips::new(mesh, poly_id);
        get_strip_points(mesh, curve, side, &mut p_strips, lines);

        for sp in p_strips.pts.values_mut() {
            sp.poly_id = poly_id;

            if !sp.catched {
                not_catched.push((sp.ind, poly_id));
            }
        }

        poly_strips.insert(poly_id, p_strips);
    }

    // Source-vertex fallback: a point that failed to catch locally may be
    // captured as a vertex in a sibling polygon sharing the same mesh point.
    for &(ind, poly_id) in &not_catched {
        let mut correction: Option<(usize, Point3)> = None;

        for (&other_id, other) in &poly_strips {
            if other_id == poly_id {
                continue;
            }

            if let Some(corr) = other.pts.get(&ind) {
                if corr.capt == Capt::A {
                    if let Some(edge) = corr.edge {
                        correction = Some((edge[0], corr.capt_pt));
                    }
                }
            }
        }

        if let Some((vertex, capt_pt)) = correction {
            let ring = poly_strips[&poly_id].poly.clone();

            if let Some(next) = ring_next(&ring, vertex) {
                let p_strips = poly_strips.get_mut(&poly_id).ok_or(BooleanError::StripsInvalid)?;
                let sp = p_strips.pts.get_mut(&ind).ok_or(BooleanError::StripsInvalid)?;

                sp.capt = Capt::A;
                sp.edge = Some([vertex, next]);
                sp.t = 0.0;
                sp.capt_pt = capt_pt;
                sp.cut_pt = capt_pt;
                sp.catched = true;
            }
        }
    }

    if poly_strips
        .values()
        .any(|ps| ps.pts.values().any(|sp| !sp.catched))
    {
        return Err(BooleanError::StripsInvalid);
    }

    // Collapsed captures: within one polygon, no two boundary-captured
    // points may share their snapped coordinate.
    for p_strips in poly_strips.values() {
        let mut collapsed: BTreeMap<PointKey, BTreeSet<usize>> = BTreeMap::new();

        for sp in p_strips.pts.values() {
            if sp.capt.is_boundary() {
                let inds = collapsed.entry(PointKey::from_point(&sp.cut_pt)).or_default();
                inds.insert(sp.ind);

                if inds.len() > 1 {
                    return Err(BooleanError::StripsInvalid);
                }
            }
        }
    }

    for (poly_id, lines) in &poly_lines {
        let p_strips = poly_strips.get_mut(poly_id).ok_or(BooleanError::StripsInvalid)?;
        assemble_strips(curve, p_strips, lines);
    }

    // Self-intersection guard in the planar basis.
    for p_strips in poly_strips.values() {
        let mut pt_ids: BTreeMap<usize, usize> = BTreeMap::new();
        let mut pts2: Vec<Point2> = Vec::new();

        for (&ind, sp) in &p_strips.pts {
            pt_ids.insert(ind, pts2.len());
            pts2.push(p_strips.base.project(&sp.pt));
        }

        let mut segments: Vec<(usize, usize)> = Vec::new();

        for strip in &p_strips.strips {
            for pair in strip.windows(2) {
                segments.push((pt_ids[&pair[0].ind], pt_ids[&pair[1].ind]));
            }
        }

        let tree = SegmentTree::build(&pts2, &segments);
        if tree.has_strict_crossing() {
            return Err(BooleanError::StripsInvalid);
        }
    }

    Ok(poly_strips)
}

/// Drop zero-area internal strips and everything they touch.
///
/// A strip is a hole candidate when both endpoints are free interior points;
/// a flat one (no area) is removed together with every strip, on either
/// mesh, that shares any of its points. The corresponding contact lines are
/// marked deleted. Fails with [`BooleanError::NoContact`] when nothing
/// survives.
pub fn clean_strips(
    strips_a: &mut PolyStripsMap,
    strips_b: &mut PolyStripsMap,
    curve: &mut ContactCurve,
) -> Result<()> {
    let mut dropped: BTreeSet<usize> = BTreeSet::new();

    let mut find_holes = |poly_strips: &mut PolyStripsMap| {
        for p_strips in poly_strips.values_mut() {
            let pts = &p_strips.pts;

            p_strips.strips.retain(|strip| {
                let flat = pts[&strip[0].ind].capt == Capt::None
                    && pts[&strip[strip.len() - 1].ind].capt == Capt::None
                    && !has_area(strip);

                if flat {
                    for p in strip {
                        dropped.insert(p.ind);
                    }
                }

                !flat
            });
        }
    };

    find_holes(strips_a);
    find_holes(strips_b);

    let clean_other = |poly_strips: &mut PolyStripsMap| {
        for p_strips in poly_strips.values_mut() {
            p_strips
                .strips
                .retain(|strip| !strip.iter().any(|p| dropped.contains(&p.ind)));
        }
    };

    clean_other(strips_a);
    clean_other(strips_b);

    for &ind in &dropped {
        curve.delete_point_lines(ind);
    }

    if curve.num_live_lines() == 0 {
        return Err(BooleanError::NoContact);
    }

    Ok(())
}
