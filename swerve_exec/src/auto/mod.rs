//! # Autonomous module
//!
//! Named autonomous routines and the operator's choice between them. Routines are built once at
//! startup and never change, the selection is read once when autonomous mode starts.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod routines;

pub use params::*;
pub use routines::*;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::info;

use crate::{cmd::{Cmd, CmdError}, traj_ctrl::TrajError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Routines in registration order.
#[derive(Default)]
pub struct RoutineRegistry {
    routines: Vec<(String, Cmd)>,
}

/// The operator's choice of routine.
pub struct RoutineSelector {
    names: Vec<String>,
    default: String,
    selected: String,
    listeners: Vec<Box<dyn FnMut(&str)>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum AutoError {
    #[error("No routine is named {0}")]
    UnknownRoutine(String),

    #[error("A routine named {0} is already registered")]
    DuplicateRoutine(String),

    #[error("Could not build the path for a routine: {0}")]
    PathError(#[from] TrajError),

    #[error("Could not compose a routine: {0}")]
    ComposeError(#[from] CmdError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RoutineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, routine: Cmd) -> Result<(), AutoError> {
        if self.get(name).is_some() {
            return Err(AutoError::DuplicateRoutine(name.to_string()));
        }

        self.routines.push((name.to_string(), routine.named(name)));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Cmd> {
        self.routines.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    pub fn names(&self) -> Vec<String> {
        self.routines.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.routines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routines.is_empty()
    }
}

impl RoutineSelector {
    /// Offer every routine in `registry`, starting on `default`.
    pub fn new(registry: &RoutineRegistry, default: &str) -> Result<Self, AutoError> {
        if registry.get(default).is_none() {
            return Err(AutoError::UnknownRoutine(default.to_string()));
        }

        Ok(Self {
            names: registry.names(),
            default: default.to_string(),
            selected: default.to_string(),
            listeners: Vec::new(),
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn default_routine(&self) -> &str {
        &self.default
    }

    pub fn selected(&self) -> &str {
        &self.selected
    }

    /// Change the selection. Listeners are told only if the selection actually changes.
    pub fn select(&mut self, name: &str) -> Result<(), AutoError> {
        if !self.names.iter().any(|n| n == name) {
            return Err(AutoError::UnknownRoutine(name.to_string()));
        }

        if self.selected != name {
            info!("Autonomous routine selected: {}", name);
            self.selected = name.to_string();
            for l in self.listeners.iter_mut() {
                l(name);
            }
        }

        Ok(())
    }

    /// Call `listener` with the new name whenever the selection changes.
    pub fn on_change<F>(&mut self, listener: F)
    where
        F: FnMut(&str) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }
}
