//! # Absolute pose sources
//!
//! Sources such as a vision system which periodically observe the platform's absolute pose.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An observation of the platform pose in the field frame.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseObservation {
    /// Position in the field frame.
    ///
    /// Units: meters
    pub position_m: [f64; 2],

    /// Heading in the field frame.
    ///
    /// Units: radians
    pub heading_rad: f64,

    /// Confidence in the observation between 0 (ignore) and 1 (fully trusted).
    pub confidence: f64,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A source of absolute pose observations.
pub trait PoseSource {
    /// Return a new observation if one has arrived since the last call.
    fn latest(&mut self) -> Option<PoseObservation>;
}
