//! Public API types and entry point for mesh boolean operations.

use polybool_contact::ContactCurve;
use polybool_mesh::PolyMesh;

use crate::error::Result;
use crate::pipeline;
use crate::region::Loc;

/// Boolean set operation between the two input surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperMode {
    /// A ∪ B.
    Union,
    /// A ∩ B.
    Intersection,
    /// A ∖ B.
    Difference,
    /// B ∖ A.
    Difference2,
    /// No combination: the two cut, region-coloured meshes are returned
    /// unselected on channels 1 and 2, with the contact curve on channel 3.
    /// What callers do with them is their own affair.
    None,
}

impl OperMode {
    /// Region labels to keep, per mesh side.
    pub(crate) fn region_targets(self) -> (Loc, Loc) {
        match self {
            OperMode::Intersection => (Loc::Inside, Loc::Inside),
            OperMode::Difference => (Loc::Outside, Loc::Inside),
            OperMode::Difference2 => (Loc::Inside, Loc::Outside),
            OperMode::Union | OperMode::None => (Loc::Outside, Loc::Outside),
        }
    }
}

/// Result of a boolean operation.
#[derive(Debug, Clone)]
pub struct BooleanOutput {
    /// The combined result mesh. Carries a `RegionId` cell attribute and the
    /// copied-through caller attributes.
    pub merged: PolyMesh,
    /// Per result polygon: the originating polygon id in mesh A, or −1 if it
    /// descends from mesh B. Empty under [`OperMode::None`].
    pub orig_cell_ids_a: Vec<i64>,
    /// Per result polygon: the originating polygon id in mesh B, or −1.
    pub orig_cell_ids_b: Vec<i64>,
    /// Always empty after combination, except under [`OperMode::None`] where
    /// it carries the cut mesh B.
    pub aux: PolyMesh,
    /// The contact curve with deleted lines removed.
    pub contact: ContactCurve,
}

/// The boolean filter: cuts both meshes along their contact curve and
/// recombines the surface regions per the configured operator.
#[derive(Debug, Clone)]
pub struct BooleanFilter {
    /// The operation to perform.
    pub oper_mode: OperMode,
}

impl BooleanFilter {
    /// Create a filter for the given operation.
    pub fn new(oper_mode: OperMode) -> Self {
        Self { oper_mode }
    }

    /// Run the pipeline on two closed meshes and their precomputed contact
    /// curve.
    ///
    /// The contact provider must supply, for every line, the traversed
    /// polygon in each mesh and per-endpoint source vertex tags, and must
    /// guarantee that no two capture points of one polygon collapse onto
    /// the same coordinate.
    pub fn execute(
        &self,
        mesh_a: &PolyMesh,
        mesh_b: &PolyMesh,
        contact: &ContactCurve,
    ) -> Result<BooleanOutput> {
        pipeline::execute(self.oper_mode, mesh_a, mesh_b, contact)
    }
}

impl Default for BooleanFilter {
    fn default() -> Self {
        Self::new(OperMode::Union)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_targets() {
        assert_eq!(OperMode::Union.region_targets(), (Loc::Outside, Loc::Outside));
        assert_eq!(
            OperMode::Intersection.region_targets(),
            (Loc::Inside, Loc::Inside)
        );
        assert_eq!(
            OperMode::Difference.region_targets(),
            (Loc::Outside, Loc::Inside)
        );
        assert_eq!(
            OperMode::Difference2.region_targets(),
            (Loc::Inside, Loc::Outside)
        );
    }
}
