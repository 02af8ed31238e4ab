//! # Trajectory sources
//!
//! Named trajectories are built once from their parameter description and shared from then on.
//! Trajectories between arbitrary poses are generated on request.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{collections::BTreeMap, rc::Rc};

use log::{debug, info};
use nalgebra::Vector2;
use serde::Deserialize;

use super::{EndState, TrajConstraints, TrajError, Trajectory};
use crate::loc::Pose;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Provides trajectories to the path follower.
pub trait TrajectorySource {
    /// Get a pre-built trajectory by name.
    fn get(&self, name: &str) -> Result<Rc<Trajectory>, TrajError>;

    /// Generate a trajectory from `start` to `goal`.
    fn generate(
        &self,
        start: &Pose,
        goal: &Pose,
        constraints: TrajConstraints,
    ) -> Result<Trajectory, TrajError> {
        Trajectory::generate(start, goal, constraints)
    }
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Description of a named path in the parameter files.
#[derive(Debug, Clone, Deserialize)]
pub struct PathParams {
    /// Field frame waypoints, `[x, y]`.
    ///
    /// Units: meters
    pub waypoints_m: Vec<[f64; 2]>,

    /// Holonomic heading at the start.
    ///
    /// Units: radians
    pub start_heading_rad: f64,

    /// Holonomic heading at the end.
    ///
    /// Units: radians
    pub end_heading_rad: f64,

    /// Speed at the end of the path.
    ///
    /// Units: meters/second
    #[serde(default)]
    pub end_velocity_ms: f64,

    pub constraints: TrajConstraints,
}

/// A library of named trajectories built at startup.
#[derive(Debug, Default)]
pub struct PathLibrary {
    paths: BTreeMap<String, Rc<Trajectory>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PathParams {
    pub fn build(&self) -> Result<Trajectory, TrajError> {
        Trajectory::new(
            self.waypoints_m.iter().map(|w| Vector2::new(w[0], w[1])).collect(),
            self.start_heading_rad,
            EndState {
                velocity_ms: self.end_velocity_ms,
                heading_rad: self.end_heading_rad,
            },
            self.constraints,
        )
    }
}

impl PathLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every described path. Fails on the first path that cannot be built.
    pub fn from_params(params: &BTreeMap<String, PathParams>) -> Result<Self, TrajError> {
        let mut lib = Self::new();

        for (name, path) in params.iter() {
            let traj = path
                .build()
                .map_err(|e| TrajError::InvalidPath(name.clone(), Box::new(e)))?;

            debug!(
                "Built path {}: {:.2} m in {:.2} s",
                name,
                traj.length_m(),
                traj.duration_s()
            );

            lib.insert(name, traj);
        }

        info!("Path library holds {} paths", lib.paths.len());

        Ok(lib)
    }

    pub fn insert(&mut self, name: &str, traj: Trajectory) {
        self.paths.insert(name.to_string(), Rc::new(traj));
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.paths.keys()
    }
}

impl TrajectorySource for PathLibrary {
    fn get(&self, name: &str) -> Result<Rc<Trajectory>, TrajError> {
        self.paths
            .get(name)
            .cloned()
            .ok_or_else(|| TrajError::UnknownPath(name.to_string()))
    }
}
