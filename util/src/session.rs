//! # Session
//!
//! A session is one run of an executable. It fixes the epoch that log lines and telemetry are
//! timed against, and owns a timestamped directory:
//!
//! ```text
//! {sessions_dir}/{exec_name}_{timestamp}/
//!     {exec_name}.log
//!     arch/
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use chrono::{DateTime, Utc};
use conquer_once::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal imports
use crate::time;

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

static SESSION_EPOCH: OnceCell<DateTime<Utc>> = OnceCell::uninit();

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Format of the timestamp in the session directory name, see `chrono::format::strftime`.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Name of the archive directory within the session directory.
const ARCH_DIR: &str = "arch";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Directories and files belonging to the current session.
#[derive(Clone, Debug)]
pub struct Session {
    pub exec_name: String,

    /// The root directory for this session
    pub session_root: PathBuf,

    /// Directory holding the telemetry archive
    pub arch_root: PathBuf,

    pub log_file_path: PathBuf,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors associated with the session module.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Cannot determine the software root directory: {0}")]
    SwRootNotFound(std::io::Error),

    #[error("Cannot create session directory {0:?}: {1}")]
    CannotCreateDir(PathBuf, std::io::Error),

    #[error("A session has already been started by this process")]
    AlreadyStarted,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Session {
    /// Start the session in `sessions_dir` under the software root.
    pub fn new(exec_name: &str, sessions_dir: &str) -> Result<Self, SessionError> {
        let root = crate::host::get_sw_root().map_err(SessionError::SwRootNotFound)?;

        Self::new_in(exec_name, root.join(sessions_dir))
    }

    /// Start the session in the given directory.
    ///
    /// Only one session may be started per process.
    pub fn new_in<P: AsRef<Path>>(exec_name: &str, sessions_dir: P) -> Result<Self, SessionError> {
        SESSION_EPOCH
            .try_init_once(Utc::now)
            .map_err(|_| SessionError::AlreadyStarted)?;
        let epoch = get_epoch().ok_or(SessionError::AlreadyStarted)?;

        let session_root = sessions_dir
            .as_ref()
            .join(format!("{}_{}", exec_name, epoch.format(TIMESTAMP_FORMAT)));
        let arch_root = session_root.join(ARCH_DIR);

        fs::create_dir_all(&arch_root)
            .map_err(|e| SessionError::CannotCreateDir(arch_root.clone(), e))?;

        Ok(Session {
            exec_name: exec_name.to_string(),
            log_file_path: session_root.join(format!("{}.log", exec_name)),
            session_root,
            arch_root,
        })
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Seconds elapsed since the session epoch.
///
/// Zero before a session has been started, as in unit tests.
pub fn get_elapsed_seconds() -> f64 {
    match SESSION_EPOCH.get() {
        Some(e) => time::duration_to_seconds(Utc::now() - *e).unwrap_or(std::f64::NAN),
        None => 0.0,
    }
}

/// The session epoch, if a session has been started.
pub fn get_epoch() -> Option<&'static DateTime<Utc>> {
    SESSION_EPOCH.get()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_session_layout() {
        let dir = std::env::temp_dir().join("swerve_session_test");
        let session = Session::new_in("swerve_exec", &dir).unwrap();

        assert!(session.session_root.starts_with(&dir));
        assert!(session.arch_root.is_dir());
        assert_eq!(
            session.log_file_path.file_name().and_then(|n| n.to_str()),
            Some("swerve_exec.log")
        );
        assert!(get_epoch().is_some());
        assert!(get_elapsed_seconds() >= 0.0);

        // The epoch is fixed for the life of the process
        assert!(matches!(
            Session::new_in("swerve_exec", &dir),
            Err(SessionError::AlreadyStarted)
        ));

        fs::remove_dir_all(&session.session_root).unwrap();
    }
}
