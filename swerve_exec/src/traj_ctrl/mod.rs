//! # Trajectory control module
//!
//! Trajectories, their sources, and the controllers which keep the platform on them.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod controllers;
mod params;
pub mod profile;
mod source;
mod trajectory;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use controllers::*;
pub use params::*;
pub use source::*;
pub use trajectory::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors that can occur while building or fetching a trajectory.
#[derive(Debug, thiserror::Error)]
pub enum TrajError {
    #[error("A trajectory needs at least 2 waypoints, got {0}")]
    TooFewWaypoints(usize),

    #[error("The trajectory has no length and no rotation")]
    Degenerate,

    #[error("The trajectory contains non-finite values")]
    NonFinite,

    #[error("Invalid trajectory constraints: {0:?}")]
    InvalidConstraints(TrajConstraints),

    #[error("No path named {0}")]
    UnknownPath(String),

    #[error("Could not build path {0}: {1}")]
    InvalidPath(String, Box<TrajError>),
}
