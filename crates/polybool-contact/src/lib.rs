#![warn(missing_docs)]

//! Contact-curve adapter for the polybool kernel.
//!
//! The contact curve is the one-dimensional intersection of the two input
//! surfaces, supplied precomputed by an external provider as a polyline
//! graph: a point array plus undirected line segments, each tagged with the
//! polygon it traverses in mesh A and in mesh B and, per endpoint, the source
//! polygon vertex it coincides with (if any).
//!
//! The pipeline marks lines deleted while cleaning strips and compacts the
//! curve for the third output channel.

use serde::{Deserialize, Serialize};

use polybool_math::Point3;

/// One undirected contact segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactLine {
    /// Endpoint indices into the curve's point array.
    pub ends: [usize; 2],
    /// Index of the traversed polygon in mesh A.
    pub poly_a: usize,
    /// Index of the traversed polygon in mesh B.
    pub poly_b: usize,
    /// Per endpoint: source vertex index in mesh A's polygon, if the endpoint
    /// coincides with one.
    pub src_a: [Option<usize>; 2],
    /// Per endpoint: source vertex index in mesh B's polygon, if the endpoint
    /// coincides with one.
    pub src_b: [Option<usize>; 2],
    /// Deletion mark; cleared out by [`ContactCurve::remove_deleted_lines`].
    pub deleted: bool,
}

impl ContactLine {
    /// Create a live line with no source tags.
    pub fn new(ends: [usize; 2], poly_a: usize, poly_b: usize) -> Self {
        Self {
            ends,
            poly_a,
            poly_b,
            src_a: [None, None],
            src_b: [None, None],
            deleted: false,
        }
    }

    /// Set the per-endpoint source tags for mesh A.
    pub fn with_src_a(mut self, src: [Option<usize>; 2]) -> Self {
        self.src_a = src;
        self
    }

    /// Set the per-endpoint source tags for mesh B.
    pub fn with_src_b(mut self, src: [Option<usize>; 2]) -> Self {
        self.src_b = src;
        self
    }
}

/// The precomputed contact curve between two meshes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactCurve {
    /// Curve point coordinates.
    pub points: Vec<Point3>,
    /// Contact segments.
    pub lines: Vec<ContactLine>,
    #[serde(skip)]
    links: Vec<Vec<usize>>,
}

impl ContactCurve {
    /// Create an empty curve.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a curve point, returning its index.
    pub fn add_point(&mut self, p: Point3) -> usize {
        self.points.push(p);
        self.points.len() - 1
    }

    /// Append a line, returning its index.
    pub fn add_line(&mut self, line: ContactLine) -> usize {
        self.lines.push(line);
        self.lines.len() - 1
    }

    /// A curve point's coordinate.
    pub fn point(&self, id: usize) -> Point3 {
        self.points[id]
    }

    /// Number of lines not marked deleted.
    pub fn num_live_lines(&self) -> usize {
        self.lines.iter().filter(|l| !l.deleted).count()
    }

    /// Indices of live lines.
    pub fn live_lines(&self) -> impl Iterator<Item = usize> + '_ {
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, l)| !l.deleted)
            .map(|(i, _)| i)
    }

    /// Rebuild the point→line links over the live lines.
    pub fn build_links(&mut self) {
        let mut links = vec![Vec::new(); self.points.len()];

        for (id, line) in self.lines.iter().enumerate() {
            if line.deleted {
                continue;
            }
            for &p in &line.ends {
                if !links[p].contains(&id) {
                    links[p].push(id);
                }
            }
        }

        self.links = links;
    }

    /// Lines using a point, per the last [`ContactCurve::build_links`].
    pub fn point_lines(&self, point: usize) -> &[usize] {
        self.links.get(point).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether every used point has degree ≥ 2 in the live-line graph.
    ///
    /// A dangling endpoint means the provider handed over an open curve,
    /// which the pipeline rejects up front.
    pub fn endpoint_degrees_ok(&self) -> bool {
        let mut degree = vec![0usize; self.points.len()];

        for line in self.lines.iter().filter(|l| !l.deleted) {
            degree[line.ends[0]] += 1;
            degree[line.ends[1]] += 1;
        }

        degree.iter().all(|&d| d != 1)
    }

    /// Deduplicate a polygon's line list: two lines with the same unordered
    /// endpoint pair count once. Keeps first occurrences, preserving order.
    pub fn dedupe_lines(&self, line_ids: &[usize]) -> Vec<usize> {
        let mut seen: Vec<(usize, usize)> = Vec::with_capacity(line_ids.len());
        let mut out = Vec::with_capacity(line_ids.len());

        for &id in line_ids {
            let [a, b] = self.lines[id].ends;
            let key = if a <= b { (a, b) } else { (b, a) };

            if !seen.contains(&key) {
                seen.push(key);
                out.push(id);
            }
        }

        out
    }

    /// Mark deleted every line incident to `point`.
    pub fn delete_point_lines(&mut self, point: usize) {
        for line in &mut self.lines {
            if line.ends[0] == point || line.ends[1] == point {
                line.deleted = true;
            }
        }
    }

    /// Compact away deletion-marked lines. Invalidates links.
    pub fn remove_deleted_lines(&mut self) {
        self.lines.retain(|l| !l.deleted);
        self.links.clear();
    }
}
