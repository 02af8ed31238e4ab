//! # Command module
//!
//! Actions are described with [`Cmd`], an immutable tree of primitive actions joined by
//! combinators. A `Cmd` does nothing by itself: the [`Scheduler`] instantiates it into an arena of
//! running nodes, so the same `Cmd` can be scheduled any number of times.
//!
//! Combinators:
//!
//! - `sequence` - run each child to completion in turn.
//! - `race` - run all children, the first to finish cancels the rest.
//! - `parallel` - run all children until every one has finished.
//! - `with_timeout` - cancel the child after a fixed time.
//! - `until` - cancel the child the first tick a predicate holds.
//! - `defer` - build the child from live data when the node starts.
//!
//! Every physical resource (the drivetrain, each mechanism) has at most one owning action.
//! Scheduling an action cancels whatever currently owns any resource it requires.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod arena;
pub mod drive;
pub mod mech;
mod primitive;
mod scheduler;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{collections::BTreeSet, fmt, rc::Rc};

use comms_if::eqpt::mech::MechId;

use crate::data_store::DataStore;

pub use arena::ActionId;
pub use primitive::*;
pub use scheduler::Scheduler;

// ---------------------------------------------------------------------------
// TYPES
// ---------------------------------------------------------------------------

/// Condition evaluated against live data.
pub type Predicate = Rc<dyn Fn(&DataStore) -> bool>;

/// Builds a command from live data when a deferred node starts.
pub type Factory = Rc<dyn Fn(&DataStore) -> Cmd>;

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// A physical resource which only one action may command at a time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Resource {
    Drivetrain,
    Mech(MechId),
}

/// Errors raised while composing commands.
#[derive(Debug, thiserror::Error)]
pub enum CmdError {
    #[error("{0:?} is required by both {1} and {2}, which cannot run at the same time")]
    ResourceConflict(Resource, String, String),
}

#[derive(Clone)]
enum CmdKind {
    Primitive(Box<dyn Primitive>),
    Sequence(Vec<Cmd>),
    Race(Vec<Cmd>),
    Parallel(Vec<Cmd>),
    Timeout(Box<Cmd>, f64),
    Until(Box<Cmd>, Predicate),
    Deferred(Factory, BTreeSet<Resource>),
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An immutable description of an action.
#[derive(Clone)]
pub struct Cmd {
    name: Option<String>,
    kind: CmdKind,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Cmd {
    /// Wrap a primitive action.
    pub fn primitive<P: Primitive + 'static>(p: P) -> Self {
        Self {
            name: None,
            kind: CmdKind::Primitive(Box::new(p)),
        }
    }

    /// Give this command a name used in logs.
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn name(&self) -> String {
        if let Some(ref n) = self.name {
            return n.clone();
        }

        match &self.kind {
            CmdKind::Primitive(p) => p.name(),
            CmdKind::Sequence(c) => format!("Sequence({})", c.len()),
            CmdKind::Race(c) => format!("Race({})", c.len()),
            CmdKind::Parallel(c) => format!("Parallel({})", c.len()),
            CmdKind::Timeout(c, t) => format!("{} with timeout {} s", c.name(), t),
            CmdKind::Until(c, _) => format!("{} until", c.name()),
            CmdKind::Deferred(..) => "Deferred".to_string(),
        }
    }

    /// Every resource this command may use while it runs.
    pub fn requirements(&self) -> BTreeSet<Resource> {
        match &self.kind {
            CmdKind::Primitive(p) => p.requirements().into_iter().collect(),
            CmdKind::Sequence(c) | CmdKind::Race(c) | CmdKind::Parallel(c) => c
                .iter()
                .flat_map(|c| c.requirements())
                .collect(),
            CmdKind::Timeout(c, _) | CmdKind::Until(c, _) => c.requirements(),
            CmdKind::Deferred(_, r) => r.clone(),
        }
    }

    /// Run `next` after this command finishes.
    pub fn and_then(self, next: Cmd) -> Cmd {
        match self.kind {
            CmdKind::Sequence(mut c) if self.name.is_none() => {
                c.push(next);
                sequence(c)
            }
            kind => sequence(vec![Cmd { name: self.name, kind }, next]),
        }
    }

    /// Run alongside `other`, finishing when either finishes.
    pub fn race_with(self, other: Cmd) -> Result<Cmd, CmdError> {
        race(vec![self, other])
    }

    /// Run alongside `other`, finishing when both have finished.
    pub fn along_with(self, other: Cmd) -> Result<Cmd, CmdError> {
        parallel(vec![self, other])
    }

    /// Cancel this command if it has not finished after `duration_s`.
    pub fn with_timeout(self, duration_s: f64) -> Cmd {
        Cmd {
            name: None,
            kind: CmdKind::Timeout(Box::new(self), duration_s),
        }
    }

    /// Cancel this command the first tick `pred` holds.
    pub fn until<F>(self, pred: F) -> Cmd
    where
        F: Fn(&DataStore) -> bool + 'static,
    {
        Cmd {
            name: None,
            kind: CmdKind::Until(Box::new(self), Rc::new(pred)),
        }
    }
}

impl fmt::Debug for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cmd({})", self.name())
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Run each command in turn.
pub fn sequence(cmds: Vec<Cmd>) -> Cmd {
    Cmd {
        name: None,
        kind: CmdKind::Sequence(cmds),
    }
}

/// Run every command at once until the first finishes.
pub fn race(cmds: Vec<Cmd>) -> Result<Cmd, CmdError> {
    check_disjoint(&cmds)?;
    Ok(Cmd {
        name: None,
        kind: CmdKind::Race(cmds),
    })
}

/// Run every command at once until all have finished.
pub fn parallel(cmds: Vec<Cmd>) -> Result<Cmd, CmdError> {
    check_disjoint(&cmds)?;
    Ok(Cmd {
        name: None,
        kind: CmdKind::Parallel(cmds),
    })
}

/// Build the command from live data at the moment it starts.
///
/// `requirements` must cover everything the built command can require.
pub fn defer<F>(requirements: &[Resource], factory: F) -> Cmd
where
    F: Fn(&DataStore) -> Cmd + 'static,
{
    Cmd {
        name: None,
        kind: CmdKind::Deferred(Rc::new(factory), requirements.iter().copied().collect()),
    }
}

/// Do nothing for the given time.
pub fn wait(duration_s: f64) -> Cmd {
    Cmd::primitive(Wait::new(duration_s))
}

/// Finish immediately.
pub fn none() -> Cmd {
    Cmd::primitive(Instant::new("None", &[], |_| ()))
}

/// Log a message at info level and finish.
pub fn print(message: &str) -> Cmd {
    Cmd::primitive(Print::new(message))
}

fn check_disjoint(cmds: &[Cmd]) -> Result<(), CmdError> {
    for (i, a) in cmds.iter().enumerate() {
        let reqs_a = a.requirements();

        for b in cmds.iter().skip(i + 1) {
            if let Some(r) = reqs_a.intersection(&b.requirements()).next() {
                return Err(CmdError::ResourceConflict(*r, a.name(), b.name()));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_and_then_flattens() {
        let cmd = wait(1.0).and_then(wait(2.0)).and_then(print("done"));

        match cmd.kind {
            CmdKind::Sequence(ref c) => assert_eq!(c.len(), 3),
            _ => panic!("expected a sequence"),
        }
    }

    #[test]
    fn test_requirements_union() {
        let a = Cmd::primitive(Instant::new("a", &[Resource::Drivetrain], |_| ()));
        let b = Cmd::primitive(Instant::new("b", &[Resource::Mech(MechId::Flywheels)], |_| ()));

        let reqs = a.and_then(b).with_timeout(1.0).requirements();
        assert!(reqs.contains(&Resource::Drivetrain));
        assert!(reqs.contains(&Resource::Mech(MechId::Flywheels)));
        assert_eq!(reqs.len(), 2);
    }

    #[test]
    fn test_conflict_rejected() {
        let a = Cmd::primitive(Instant::new("a", &[Resource::Drivetrain], |_| ()));
        let b = Cmd::primitive(Instant::new("b", &[Resource::Drivetrain], |_| ()));

        assert!(matches!(
            a.clone().race_with(b.clone()),
            Err(CmdError::ResourceConflict(Resource::Drivetrain, _, _))
        ));
        assert!(a.clone().along_with(wait(1.0)).is_ok());
        assert!(parallel(vec![wait(1.0), a, b]).is_err());
    }

    #[test]
    fn test_deferred_declares_requirements() {
        let cmd = defer(&[Resource::Drivetrain], |_| none());
        assert!(cmd.requirements().contains(&Resource::Drivetrain));
    }
}
