//! The sequential pipeline driver.
//!
//! Stages run strictly in order, each on the mesh state left by the previous
//! one: strip construction, cleaning, cutting (with hole merging), point
//! restoration, overlap resolution, adjacent-point insertion, disjoining,
//! point merging, region combination. Every stage owns its spatial indices;
//! point→cell links are rebuilt at stage boundaries.

use polybool_contact::ContactCurve;
use polybool_mesh::PolyMesh;

use crate::adjacency::add_adjacent_points;
use crate::api::{BooleanOutput, OperMode};
use crate::cut::cut_cells;
use crate::debug_bool;
use crate::disjoin::{disjoin_polys, merge_points};
use crate::error::{BooleanError, Result};
use crate::region::combine_regions;
use crate::snap::{resolve_overlaps, restore_orig_points};
use crate::strips::{build_poly_strips, clean_strips, MeshSide};

/// Run the full pipeline.
pub(crate) fn execute(
    mode: OperMode,
    input_a: &PolyMesh,
    input_b: &PolyMesh,
    contact: &ContactCurve,
) -> Result<BooleanOutput> {
    if contact.num_live_lines() == 0 {
        return Err(BooleanError::NoContact);
    }

    if !contact.endpoint_degrees_ok() {
        return Err(BooleanError::InputTopology);
    }

    let mut mod_a = input_a.clone();
    let mut mod_b = input_b.clone();
    let mut curve = contact.clone();

    // intermediate stages track descendants by input cell position; the
    // caller's ids come back in at the very end
    let saved_a = mod_a.take_orig_cell_ids();
    let saved_b = mod_b.take_orig_cell_ids();

    debug_bool!("build_poly_strips: {} contact lines", curve.num_live_lines());

    let mut strips_a = build_poly_strips(&mod_a, &curve, MeshSide::A)?;
    let mut strips_b = build_poly_strips(&mod_b, &curve, MeshSide::B)?;

    clean_strips(&mut strips_a, &mut strips_b, &mut curve)?;

    debug_bool!(
        "cut_cells: {} polygons in A, {} in B",
        strips_a.len(),
        strips_b.len()
    );

    cut_cells(&mut mod_a, &mut strips_a)?;
    cut_cells(&mut mod_b, &mut strips_b)?;

    restore_orig_points(&mut mod_a, &strips_a);
    restore_orig_points(&mut mod_b, &strips_b);

    resolve_overlaps(&mut mod_a, &curve, &strips_a);
    resolve_overlaps(&mut mod_b, &curve, &strips_b);

    add_adjacent_points(&mut mod_a, &mut curve, MeshSide::A, &strips_a);
    add_adjacent_points(&mut mod_b, &mut curve, MeshSide::B, &strips_b);

    disjoin_polys(&mut mod_a, &strips_a);
    disjoin_polys(&mut mod_b, &strips_b);

    merge_points(&mut mod_a, &mut curve, &strips_a);
    merge_points(&mut mod_b, &mut curve, &strips_b);

    debug_bool!(
        "combine_regions: {} cells in A, {} in B",
        mod_a.num_live_cells(),
        mod_b.num_live_cells()
    );

    combine_regions(
        mode, &mod_a, &mod_b, &curve, &saved_a, &saved_b, input_a, input_b,
    )
}
