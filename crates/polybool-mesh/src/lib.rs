#![warn(missing_docs)]

//! Editable indexed polygon soup for the polybool kernel.
//!
//! A [`PolyMesh`] is a point array plus an array of polygon rings, each ring
//! an ordered list of point indices whose winding defines the outward normal
//! via the Newell formula. Cells carry an integer original-cell id preserved
//! through the cutting pipeline, and optional named per-cell attribute
//! columns that are passed through to the result.
//!
//! Deletion is a two-phase affair: [`PolyMesh::delete_cell`] only marks a
//! cell, [`PolyMesh::remove_deleted_cells`] compacts. Point→cell links are
//! rebuilt explicitly at the start of each pipeline stage that needs them;
//! mutations leave them stale on purpose, matching how the stages snapshot
//! their targets up front.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use polybool_math::{newell_normal, Point3, Vec3};

/// One polygon of the soup: an ordered ring of point indices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    /// Ordered ring of point indices.
    pub ring: Vec<usize>,
    /// Deletion mark; cleared out by [`PolyMesh::remove_deleted_cells`].
    pub deleted: bool,
}

/// An editable indexed polygon mesh.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolyMesh {
    points: Vec<Point3>,
    cells: Vec<Cell>,
    orig_cell_ids: Vec<i64>,
    attrs: BTreeMap<String, Vec<f64>>,
    #[serde(skip)]
    links: Vec<Vec<usize>>,
}

impl PolyMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of points.
    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    /// Number of cells, including deletion-marked ones.
    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// Number of cells not marked deleted.
    pub fn num_live_cells(&self) -> usize {
        self.cells.iter().filter(|c| !c.deleted).count()
    }

    /// Get a point by index.
    pub fn point(&self, id: usize) -> Point3 {
        self.points[id]
    }

    /// Overwrite a point's coordinate.
    pub fn set_point(&mut self, id: usize, p: Point3) {
        self.points[id] = p;
    }

    /// All point coordinates.
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    /// Append a point, returning its index.
    pub fn add_point(&mut self, p: Point3) -> usize {
        self.points.push(p);
        self.points.len() - 1
    }

    /// Append a cell with its original-cell id, returning the cell index.
    ///
    /// Attribute columns are padded with NaN to stay parallel; the pipeline
    /// fills real values only when assembling the output.
    pub fn add_cell(&mut self, ring: Vec<usize>, orig_id: i64) -> usize {
        self.cells.push(Cell {
            ring,
            deleted: false,
        });
        self.orig_cell_ids.push(orig_id);

        for col in self.attrs.values_mut() {
            col.push(f64::NAN);
        }

        self.cells.len() - 1
    }

    /// The ring of a cell.
    pub fn cell_ring(&self, id: usize) -> &[usize] {
        &self.cells[id].ring
    }

    /// Whether a cell is marked deleted.
    pub fn is_deleted(&self, id: usize) -> bool {
        self.cells[id].deleted
    }

    /// Mark a cell deleted. The cell stays addressable until
    /// [`PolyMesh::remove_deleted_cells`].
    pub fn delete_cell(&mut self, id: usize) {
        self.cells[id].deleted = true;
    }

    /// Original-cell id of a cell.
    pub fn orig_cell_id(&self, id: usize) -> i64 {
        self.orig_cell_ids[id]
    }

    /// Overwrite a cell's original-cell id.
    pub fn set_orig_cell_id(&mut self, id: usize, orig: i64) {
        self.orig_cell_ids[id] = orig;
    }

    /// Renumber all original-cell ids to the identity, returning the previous
    /// values. The pipeline does this once up front so intermediate stages
    /// track descendants, translating back when emitting outputs.
    pub fn take_orig_cell_ids(&mut self) -> Vec<i64> {
        let saved = self.orig_cell_ids.clone();
        for (i, id) in self.orig_cell_ids.iter_mut().enumerate() {
            *id = i as i64;
        }
        saved
    }

    /// Indices of live (not deletion-marked) cells.
    pub fn live_cells(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.deleted)
            .map(|(i, _)| i)
    }

    /// Coordinates of a cell's ring.
    pub fn cell_points(&self, id: usize) -> Vec<Point3> {
        self.cells[id].ring.iter().map(|&p| self.points[p]).collect()
    }

    /// Newell normal of a cell.
    pub fn cell_normal(&self, id: usize) -> Vec3 {
        newell_normal(&self.cell_points(id))
    }

    /// Reverse a cell's winding.
    pub fn reverse_cell(&mut self, id: usize) {
        self.cells[id].ring.reverse();
    }

    /// Replace every occurrence of `old` in a cell's ring by `new`.
    ///
    /// Links are not updated; stages rebuild them at their boundaries.
    pub fn replace_cell_point(&mut self, cell: usize, old: usize, new: usize) {
        for p in &mut self.cells[cell].ring {
            if *p == old {
                *p = new;
            }
        }
    }

    /// Rebuild the point→cell links from the live cells.
    pub fn build_links(&mut self) {
        let mut links = vec![Vec::new(); self.points.len()];

        for (id, cell) in self.cells.iter().enumerate() {
            if cell.deleted {
                continue;
            }
            for &p in &cell.ring {
                if !links[p].contains(&id) {
                    links[p].push(id);
                }
            }
        }

        self.links = links;
    }

    /// Cells using a point, per the last [`PolyMesh::build_links`].
    pub fn point_cells(&self, point: usize) -> &[usize] {
        self.links.get(point).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Compact away deletion-marked cells. Invalidates links.
    pub fn remove_deleted_cells(&mut self) {
        let mut cells = Vec::with_capacity(self.cells.len());
        let mut orig = Vec::with_capacity(self.orig_cell_ids.len());
        let mut keep = Vec::new();

        for (i, cell) in self.cells.drain(..).enumerate() {
            if !cell.deleted {
                cells.push(cell);
                orig.push(self.orig_cell_ids[i]);
                keep.push(i);
            }
        }

        self.cells = cells;
        self.orig_cell_ids = orig;

        for col in self.attrs.values_mut() {
            let kept: Vec<f64> = keep.iter().map(|&i| col[i]).collect();
            *col = kept;
        }

        self.links.clear();
    }

    /// Drop points not referenced by any live cell, remapping rings.
    /// Invalidates links.
    pub fn compact_points(&mut self) {
        let mut used = vec![false; self.points.len()];
        for cell in self.cells.iter().filter(|c| !c.deleted) {
            for &p in &cell.ring {
                used[p] = true;
            }
        }

        let mut remap = vec![usize::MAX; self.points.len()];
        let mut points = Vec::new();

        for (i, &u) in used.iter().enumerate() {
            if u {
                remap[i] = points.len();
                points.push(self.points[i]);
            }
        }

        for cell in &mut self.cells {
            for p in &mut cell.ring {
                *p = remap[*p];
            }
        }

        self.points = points;
        self.links.clear();
    }

    /// Copy the listed cells (with their points and orig ids) into a new
    /// mesh, remapping point indices.
    pub fn extract(&self, cells: &[usize]) -> PolyMesh {
        let mut out = PolyMesh::new();
        let mut remap: BTreeMap<usize, usize> = BTreeMap::new();

        for &c in cells {
            let ring = self.cells[c]
                .ring
                .iter()
                .map(|&p| *remap.entry(p).or_insert_with(|| out.add_point(self.points[p])))
                .collect();
            out.add_cell(ring, self.orig_cell_ids[c]);
        }

        out
    }

    /// Append another mesh's live cells, offsetting point indices.
    pub fn append(&mut self, other: &PolyMesh) {
        let offset = self.points.len();
        self.points.extend_from_slice(&other.points);

        for id in other.live_cells() {
            let ring = other.cells[id].ring.iter().map(|&p| p + offset).collect();
            self.add_cell(ring, other.orig_cell_ids[id]);
        }

        self.links.clear();
    }

    /// Set a named per-cell attribute column. The column must be parallel to
    /// the cell array.
    pub fn set_attr(&mut self, name: &str, values: Vec<f64>) {
        self.attrs.insert(name.to_string(), values);
    }

    /// A named attribute column, if present.
    pub fn attr(&self, name: &str) -> Option<&[f64]> {
        self.attrs.get(name).map(Vec::as_slice)
    }

    /// Names of all attribute columns.
    pub fn attr_names(&self) -> impl Iterator<Item = &str> {
        self.attrs.keys().map(String::as_str)
    }

    /// Colour connected components of live cells (connected via shared
    /// points). Returns per-cell region ids (`None` for deleted cells) and
    /// the region count.
    pub fn color_regions(&self) -> (Vec<Option<usize>>, usize) {
        let mut point_cells: Vec<Vec<usize>> = vec![Vec::new(); self.points.len()];
        for (id, cell) in self.cells.iter().enumerate() {
            if cell.deleted {
                continue;
            }
            for &p in &cell.ring {
                point_cells[p].push(id);
            }
        }

        let mut regions: Vec<Option<usize>> = vec![None; self.cells.len()];
        let mut count = 0;

        for seed in 0..self.cells.len() {
            if self.cells[seed].deleted || regions[seed].is_some() {
                continue;
            }

            let mut stack = vec![seed];
            regions[seed] = Some(count);

            while let Some(cell) = stack.pop() {
                for &p in &self.cells[cell].ring {
                    for &other in &point_cells[p] {
                        if regions[other].is_none() {
                            regions[other] = Some(count);
                            stack.push(other);
                        }
                    }
                }
            }

            count += 1;
        }

        (regions, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(mesh: &mut PolyMesh, z: f64, orig: i64) -> usize {
        let ring = vec![
            mesh.add_point(Point3::new(0.0, 0.0, z)),
            mesh.add_point(Point3::new(1.0, 0.0, z)),
            mesh.add_point(Point3::new(1.0, 1.0, z)),
            mesh.add_point(Point3::new(0.0, 1.0, z)),
        ];
        mesh.add_cell(ring, orig)
    }

    #[test]
    fn test_cell_normal() {
        let mut mesh = PolyMesh::new();
        let c = quad(&mut mesh, 0.0, 0);
        let n = mesh.cell_normal(c);
        assert!((n - Vec3::z()).norm() < 1e-12);

        mesh.reverse_cell(c);
        let n = mesh.cell_normal(c);
        assert!((n + Vec3::z()).norm() < 1e-12);
    }

    #[test]
    fn test_delete_and_compact() {
        let mut mesh = PolyMesh::new();
        let a = quad(&mut mesh, 0.0, 7);
        let b = quad(&mut mesh, 1.0, 8);

        mesh.delete_cell(a);
        assert_eq!(mesh.num_live_cells(), 1);
        assert_eq!(mesh.num_cells(), 2);

        mesh.remove_deleted_cells();
        assert_eq!(mesh.num_cells(), 1);
        assert_eq!(mesh.orig_cell_id(0), 8);
        assert_eq!(mesh.cell_ring(0), mesh.cells[0].ring.as_slice());
        let _ = b;
    }

    #[test]
    fn test_compact_points_remaps() {
        let mut mesh = PolyMesh::new();
        let orphan = mesh.add_point(Point3::new(9.0, 9.0, 9.0));
        let c = quad(&mut mesh, 0.0, 0);

        mesh.compact_points();
        assert_eq!(mesh.num_points(), 4);
        assert!((mesh.cell_points(c)[0] - Point3::new(0.0, 0.0, 0.0)).norm() < 1e-12);
        let _ = orphan;
    }

    #[test]
    fn test_links_skip_deleted() {
        let mut mesh = PolyMesh::new();
        let a = quad(&mut mesh, 0.0, 0);
        let shared = mesh.cell_ring(a)[1];
        let ring = vec![
            shared,
            mesh.add_point(Point3::new(2.0, 0.0, 0.0)),
            mesh.add_point(Point3::new(2.0, 1.0, 0.0)),
        ];
        let b = mesh.add_cell(ring, 1);

        mesh.build_links();
        assert_eq!(mesh.point_cells(shared), &[a, b]);

        mesh.delete_cell(a);
        mesh.build_links();
        assert_eq!(mesh.point_cells(shared), &[b]);
    }

    #[test]
    fn test_color_regions() {
        let mut mesh = PolyMesh::new();
        quad(&mut mesh, 0.0, 0);
        quad(&mut mesh, 5.0, 1);

        let (regions, count) = mesh.color_regions();
        assert_eq!(count, 2);
        assert_ne!(regions[0], regions[1]);
    }

    #[test]
    fn test_extract_and_append() {
        let mut mesh = PolyMesh::new();
        let a = quad(&mut mesh, 0.0, 3);
        quad(&mut mesh, 1.0, 4);

        let sub = mesh.extract(&[a]);
        assert_eq!(sub.num_cells(), 1);
        assert_eq!(sub.num_points(), 4);
        assert_eq!(sub.orig_cell_id(0), 3);

        let mut combined = sub.clone();
        combined.append(&sub);
        assert_eq!(combined.num_cells(), 2);
        assert_eq!(combined.num_points(), 8);
    }

    #[test]
    fn test_replace_cell_point() {
        let mut mesh = PolyMesh::new();
        let c = quad(&mut mesh, 0.0, 0);
        let old = mesh.cell_ring(c)[0];
        let new = mesh.add_point(Point3::new(0.0, 0.0, 2.0));

        mesh.replace_cell_point(c, old, new);
        assert_eq!(mesh.cell_ring(c)[0], new);
    }
}
