//! Error types for the boolean pipeline.

use thiserror::Error;

/// Errors surfaced at the pipeline boundary.
///
/// Every kind is fatal: the invocation returns failure and the output meshes
/// must be discarded. The display strings are stable prefixes that callers
/// may match on.
#[derive(Error, Debug)]
pub enum BooleanError {
    /// The input sanitizer could not separate two capture points.
    #[error("Cannot prevent equal capture points")]
    EqualCapturePoints,

    /// The external contact provider failed.
    #[error("Contact failed with {0:?}")]
    Contact(String),

    /// The contact curve is empty, or cleaning dropped every contact line.
    #[error("There is no contact")]
    NoContact,

    /// The contact curve has a dangling endpoint.
    #[error("At least one line-end has only one neighbor")]
    InputTopology,

    /// Self-intersecting strip arrangement, collapsed boundary captures, or
    /// an uncatchable source-vertex reference.
    #[error("Strips are invalid")]
    StripsInvalid,

    /// The cutter or the hole merger could not produce valid sub-polygons.
    #[error("CutCells failed")]
    CutFailed,

    /// At least one contact line could not have its adjacent polygons
    /// classified.
    #[error("Boolean operation failed")]
    Unresolved,
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, BooleanError>;
