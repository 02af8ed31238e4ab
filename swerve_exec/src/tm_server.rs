//! # TM Server
//!
//! Owns the single telemetry sink of a run and hands named values to it. Failures to publish are
//! logged and the value is dropped, the control loop never sees them.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use comms_if::tm::{TelemetrySink, TmError, TmValue};
use log::warn;
use util::{
    archive::Archiver,
    session::{self, Session},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telemetry server
pub struct TmServer {
    sink: Box<dyn TelemetrySink>,
    num_dropped: u64,
}

/// Writes every value as a row of `tm.csv` in the session archive.
pub struct ArchiveSink {
    archiver: Archiver,
}

/// Discards every value.
#[derive(Default)]
pub struct NullSink;

/// Keeps every value in memory. Clones share the same storage.
#[derive(Default, Clone)]
pub struct MemorySink {
    values: Rc<RefCell<BTreeMap<String, Vec<TmValue>>>>,
    num_ticks: Rc<RefCell<u64>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TmServer {
    pub fn new(sink: Box<dyn TelemetrySink>) -> Self {
        Self {
            sink,
            num_dropped: 0,
        }
    }

    /// Publish a value, logging and dropping it if the sink rejects it.
    pub fn send(&mut self, name: &str, value: TmValue) {
        if let Err(e) = self.sink.publish(name, value) {
            warn!("Dropped telemetry value {}: {}", name, e);
            self.num_dropped += 1;
        }
    }

    pub fn send_scalar(&mut self, name: &str, value: f64) {
        self.send(name, TmValue::Scalar(value))
    }

    pub fn send_flag(&mut self, name: &str, value: bool) {
        self.send(name, TmValue::Flag(value))
    }

    pub fn send_array(&mut self, name: &str, value: &[f64]) {
        self.send(name, TmValue::Array(value.to_vec()))
    }

    pub fn send_pose(&mut self, name: &str, value: [f64; 3]) {
        self.send(name, TmValue::Pose(value))
    }

    pub fn send_text(&mut self, name: &str, value: &str) {
        self.send(name, TmValue::Text(value.to_string()))
    }

    /// Signal the end of the tick to the sink.
    pub fn end_tick(&mut self) {
        if let Err(e) = self.sink.end_tick() {
            warn!("Telemetry sink failed to end the tick: {}", e);
        }
    }

    /// Number of values dropped since the server was created.
    pub fn num_dropped(&self) -> u64 {
        self.num_dropped
    }
}

impl Default for TmServer {
    fn default() -> Self {
        Self::new(Box::new(NullSink))
    }
}

impl ArchiveSink {
    pub fn new(session: &Session) -> Result<Self, TmError> {
        let archiver = Archiver::from_path(session, "tm.csv")
            .map_err(|e| TmError::Unavailable(e.to_string()))?;

        Ok(Self { archiver })
    }
}

impl TelemetrySink for ArchiveSink {
    fn publish(&mut self, name: &str, value: TmValue) -> Result<(), TmError> {
        let time_s = session::get_elapsed_seconds();

        let res = match value {
            TmValue::Text(ref t) => self.archiver.serialise(time_s, name, t.as_str()),
            v => self.archiver.serialise(time_s, name, v.to_vec().as_slice()),
        };

        res.map_err(|e| TmError::WriteFailed(name.to_string(), e.to_string()))
    }

    fn end_tick(&mut self) -> Result<(), TmError> {
        self.archiver
            .flush()
            .map_err(|e| TmError::Unavailable(e.to_string()))
    }
}

impl TelemetrySink for NullSink {
    fn publish(&mut self, _name: &str, _value: TmValue) -> Result<(), TmError> {
        Ok(())
    }
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent value published under `name`.
    pub fn latest(&self, name: &str) -> Option<TmValue> {
        self.values
            .borrow()
            .get(name)
            .and_then(|v| v.last().cloned())
    }

    /// Every value published under `name`, oldest first.
    pub fn history(&self, name: &str) -> Vec<TmValue> {
        self.values
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    pub fn num_ticks(&self) -> u64 {
        *self.num_ticks.borrow()
    }
}

impl TelemetrySink for MemorySink {
    fn publish(&mut self, name: &str, value: TmValue) -> Result<(), TmError> {
        self.values
            .borrow_mut()
            .entry(name.to_string())
            .or_default()
            .push(value);
        Ok(())
    }

    fn end_tick(&mut self) -> Result<(), TmError> {
        *self.num_ticks.borrow_mut() += 1;
        Ok(())
    }
}
