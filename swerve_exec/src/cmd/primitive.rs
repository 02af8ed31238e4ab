//! # Primitive actions
//!
//! The leaves of a command tree. Each tick a running primitive gets one call to `periodic`,
//! after which `is_finished` is checked and, if true, `finish` is called. An action cut short by
//! a combinator or by preemption gets exactly one call to `cancel` instead.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{fmt, rc::Rc};

use log::info;
use util::time::seconds_to_ticks;

use super::Resource;
use crate::data_store::DataStore;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A leaf action.
pub trait Primitive: PrimitiveClone {
    /// Name used in logs.
    fn name(&self) -> String;

    /// Resources this action commands while it runs.
    fn requirements(&self) -> Vec<Resource> {
        Vec::new()
    }

    /// Called once when the action starts, before its first `periodic`.
    fn start(&mut self, _ds: &mut DataStore) {}

    /// Called once per tick while running.
    fn periodic(&mut self, _ds: &mut DataStore) {}

    /// Checked after every `periodic`.
    fn is_finished(&mut self, ds: &mut DataStore) -> bool;

    /// Called once when the action finishes by itself.
    fn finish(&mut self, _ds: &mut DataStore) {}

    /// Called once when the action is interrupted. Must leave any required resource safe.
    fn cancel(&mut self, ds: &mut DataStore) {
        self.finish(ds)
    }
}

/// Allows boxed primitives to be cloned when a command is instantiated.
pub trait PrimitiveClone {
    fn clone_box(&self) -> Box<dyn Primitive>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Does nothing until a number of ticks has elapsed.
#[derive(Debug, Clone)]
pub struct Wait {
    duration_s: f64,
    ticks: u64,
    elapsed: u64,
}

/// Runs a closure once and finishes in the same tick.
#[derive(Clone)]
pub struct Instant {
    name: String,
    requirements: Vec<Resource>,
    func: Rc<dyn Fn(&mut DataStore)>,
}

/// Logs a message.
#[derive(Debug, Clone)]
pub struct Print {
    message: String,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<T> PrimitiveClone for T
where
    T: 'static + Primitive + Clone,
{
    fn clone_box(&self) -> Box<dyn Primitive> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Primitive> {
    fn clone(&self) -> Box<dyn Primitive> {
        self.clone_box()
    }
}

impl fmt::Debug for dyn Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Wait {
    pub fn new(duration_s: f64) -> Self {
        Self {
            duration_s,
            ticks: 0,
            elapsed: 0,
        }
    }
}

impl Primitive for Wait {
    fn name(&self) -> String {
        format!("Wait({} s)", self.duration_s)
    }

    fn start(&mut self, ds: &mut DataStore) {
        self.ticks = seconds_to_ticks(self.duration_s, ds.tick_period_s);
        self.elapsed = 0;
    }

    fn periodic(&mut self, _ds: &mut DataStore) {
        self.elapsed += 1;
    }

    fn is_finished(&mut self, _ds: &mut DataStore) -> bool {
        self.elapsed >= self.ticks
    }
}

impl Instant {
    pub fn new<F>(name: &str, requirements: &[Resource], func: F) -> Self
    where
        F: Fn(&mut DataStore) + 'static,
    {
        Self {
            name: name.to_string(),
            requirements: requirements.to_vec(),
            func: Rc::new(func),
        }
    }
}

impl Primitive for Instant {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn requirements(&self) -> Vec<Resource> {
        self.requirements.clone()
    }

    fn start(&mut self, ds: &mut DataStore) {
        (self.func)(ds)
    }

    fn is_finished(&mut self, _ds: &mut DataStore) -> bool {
        true
    }
}

impl Print {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl Primitive for Print {
    fn name(&self) -> String {
        format!("Print({})", self.message)
    }

    fn start(&mut self, _ds: &mut DataStore) {
        info!("{}", self.message);
    }

    fn is_finished(&mut self, _ds: &mut DataStore) -> bool {
        true
    }
}
