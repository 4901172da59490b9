#![warn(missing_docs)]

//! Boolean set operations on closed polygonal surface meshes.
//!
//! Computes union, intersection and both differences of two closed meshes
//! given their precomputed contact curve. The pipeline has 9 stages:
//! 1. **Strip builder** — localise contact points, chain lines into strips
//! 2. **Strip cleaner** — drop zero-area internal strips
//! 3. **Cutter** — split contacted polygons along their strips (branched
//!    groups via the sand-glass decomposition, holes via the merger)
//! 4. **Restorer** — snap captured duplicates back to the curve coordinates
//! 5. **Overlap resolver** — fix T-junctions at shared edge captures
//! 6. **Adjacency thickener** — subdivide neighbouring polygon edges
//! 7. **Disjoiner / point merger** — separate cells at vertex captures,
//!    re-collapse the coincidences that must survive
//! 8. **Region combiner** — classify flood-filled regions by dihedral
//!    geometry at the contact edges, select and orient per the operator
//!
//! Computing the contact curve itself is the job of an external provider;
//! the pipeline consumes it as an opaque [`polybool_contact::ContactCurve`].

/// Debug logging macro - only prints when the debug-boolean feature is
/// enabled.
#[cfg(feature = "debug-boolean")]
macro_rules! debug_bool {
    ($($arg:tt)*) => {
        eprintln!($($arg)*)
    };
}

/// No-op version when the debug-boolean feature is disabled.
#[cfg(not(feature = "debug-boolean"))]
macro_rules! debug_bool {
    ($($arg:tt)*) => {};
}

pub(crate) use debug_bool;

mod adjacency;
mod api;
mod cut;
mod disjoin;
mod error;
mod merger;
mod pipeline;
mod region;
mod snap;
mod strips;

pub use api::{BooleanFilter, BooleanOutput, OperMode};
pub use error::{BooleanError, Result};
pub use region::Loc;
pub use strips::{Capt, MeshSide, PolyStrips, PolyStripsMap, Side, Strip, StripPt, StripPtR};
