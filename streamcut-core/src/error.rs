//! Error taxonomy for digitizing edits
//!
//! Every failure aborts the current finish gesture and clears the drawn
//! line; none are fatal to the tool itself.

use std::error::Error;
use std::fmt;

/// Errors surfaced by the finish-gesture pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum EditError {
    /// The drawn line has too few vertices for the active mode
    InsufficientVertices { required: usize, actual: usize },
    /// The closed drawn ring encloses no area
    DegenerateRing,
    /// Reshape mode requires exactly one selected feature
    NoSelection { selected: usize },
    /// No unique part to carve the drawn hole into
    AmbiguousPart { candidates: usize },
    /// The drawn line does not produce a usable boundary reshape
    ReshapeNotApplicable,
    /// The edited geometry stayed invalid after the repair chain
    UnrepairableGeometry,
    /// The edit would remove every part of the feature
    FeatureEmptied,
    /// The feature store rejected the write
    StoreWriteFailed(String),
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditError::InsufficientVertices { required, actual } => {
                write!(
                    f,
                    "draw a line with at least {} points ({} captured)",
                    required, actual
                )
            }
            EditError::DegenerateRing => write!(f, "drawn ring encloses no area"),
            EditError::NoSelection { selected } => {
                write!(f, "select exactly one polygon feature ({} selected)", selected)
            }
            EditError::AmbiguousPart { candidates } => {
                write!(
                    f,
                    "no unique part to carve the hole into ({} candidates)",
                    candidates
                )
            }
            EditError::ReshapeNotApplicable => {
                write!(f, "reshape failed; ensure the line crosses the polygon boundary")
            }
            EditError::UnrepairableGeometry => {
                write!(f, "edited geometry is invalid and could not be repaired")
            }
            EditError::FeatureEmptied => {
                write!(f, "edit would remove every part of the feature")
            }
            EditError::StoreWriteFailed(message) => {
                write!(f, "feature store rejected the write: {}", message)
            }
        }
    }
}

impl Error for EditError {}
