//! # Scheduler
//!
//! Runs instantiated commands once per tick and enforces single ownership of each resource.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, error, info, warn};
use util::time::seconds_to_ticks;

use super::{
    arena::{Arena, Node, NodeKind, NodeState},
    ActionId, Cmd, CmdKind, Resource,
};
use crate::data_store::DataStore;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Cooperative single-threaded command scheduler.
#[derive(Default)]
pub struct Scheduler {
    arena: Arena,

    /// Top level commands in the order they were scheduled.
    roots: Vec<Root>,

    /// Current owner of each claimed resource.
    owners: BTreeMap<Resource, ActionId>,

    /// Commands scheduled whenever their resource is free.
    defaults: BTreeMap<Resource, Cmd>,
}

struct Root {
    id: ActionId,
    name: String,
    requirements: BTreeSet<Resource>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a new instance of `cmd`.
    ///
    /// Whatever currently owns one of the command's resources is cancelled first. The command
    /// itself starts on the next tick.
    pub fn schedule(&mut self, cmd: &Cmd, ds: &mut DataStore) -> ActionId {
        let requirements = cmd.requirements();

        let preempted: BTreeSet<ActionId> = requirements
            .iter()
            .filter_map(|r| self.owners.get(r).copied())
            .collect();
        for id in preempted {
            self.cancel(id, ds);
        }

        let id = self.instantiate(cmd);
        for r in requirements.iter() {
            self.owners.insert(*r, id);
        }

        let name = cmd.name();
        info!("Scheduled {} (requires {:?})", name, requirements);
        self.roots.push(Root {
            id,
            name,
            requirements,
        });

        id
    }

    /// Cancel a scheduled command. Does nothing if it is no longer running.
    pub fn cancel(&mut self, id: ActionId, ds: &mut DataStore) {
        if let Some(idx) = self.roots.iter().position(|r| r.id == id) {
            info!("Cancelling {}", self.roots[idx].name);
            self.cancel_node(id, ds);
            self.release(idx);
        }
    }

    /// Cancel every scheduled command.
    pub fn cancel_all(&mut self, ds: &mut DataStore) {
        let ids: Vec<ActionId> = self.roots.iter().map(|r| r.id).collect();
        for id in ids {
            self.cancel(id, ds);
        }
    }

    /// Set the command scheduled whenever `resource` has no owner.
    pub fn set_default(&mut self, resource: Resource, cmd: Cmd) {
        if !cmd.requirements().contains(&resource) {
            warn!(
                "Default command {} does not require {:?}, it may run more than once",
                cmd.name(),
                resource
            );
        }
        self.defaults.insert(resource, cmd);
    }

    pub fn clear_default(&mut self, resource: Resource) {
        self.defaults.remove(&resource);
    }

    pub fn is_running(&self, id: ActionId) -> bool {
        self.roots.iter().any(|r| r.id == id)
    }

    /// The command currently owning `resource`.
    pub fn owner(&self, resource: Resource) -> Option<ActionId> {
        self.owners.get(&resource).copied()
    }

    /// Names of the running top level commands, in scheduling order.
    pub fn running(&self) -> Vec<String> {
        self.roots.iter().map(|r| r.name.clone()).collect()
    }

    /// Number of live action nodes, including nested ones.
    pub fn num_nodes(&self) -> usize {
        self.arena.len()
    }

    /// Run one tick.
    ///
    /// Default commands are scheduled for free resources, then every root gets one tick in the
    /// order it was scheduled. Roots that finish release their resources.
    pub fn tick(&mut self, ds: &mut DataStore) {
        let idle_defaults: Vec<Cmd> = self
            .defaults
            .iter()
            .filter(|(r, _)| !self.owners.contains_key(r))
            .map(|(_, c)| c.clone())
            .collect();
        for cmd in idle_defaults.iter() {
            self.schedule(cmd, ds);
        }

        let ids: Vec<ActionId> = self.roots.iter().map(|r| r.id).collect();
        for id in ids {
            if self.tick_node(id, ds) {
                if let Some(idx) = self.roots.iter().position(|r| r.id == id) {
                    info!("{} finished", self.roots[idx].name);
                    self.release(idx);
                }
            }
        }
    }

    fn release(&mut self, root_idx: usize) {
        let root = self.roots.remove(root_idx);
        for r in root.requirements.iter() {
            if self.owners.get(r) == Some(&root.id) {
                self.owners.remove(r);
            }
        }
        self.arena.remove(root.id);
    }

    fn instantiate(&mut self, cmd: &Cmd) -> ActionId {
        let kind = match &cmd.kind {
            CmdKind::Primitive(p) => NodeKind::Primitive(p.clone()),
            CmdKind::Sequence(c) => NodeKind::Sequence {
                children: c.iter().map(|c| self.instantiate(c)).collect(),
                current: 0,
            },
            CmdKind::Race(c) => NodeKind::Race(c.iter().map(|c| self.instantiate(c)).collect()),
            CmdKind::Parallel(c) => {
                NodeKind::Parallel(c.iter().map(|c| self.instantiate(c)).collect())
            }
            CmdKind::Timeout(c, duration_s) => NodeKind::Timeout {
                child: self.instantiate(c),
                duration_s: *duration_s,
                ticks: 0,
                elapsed: 0,
            },
            CmdKind::Until(c, pred) => NodeKind::Until {
                child: self.instantiate(c),
                pred: pred.clone(),
            },
            CmdKind::Deferred(factory, requirements) => NodeKind::Deferred {
                factory: factory.clone(),
                requirements: requirements.clone(),
                child: None,
            },
        };

        self.arena.insert(Node::new(cmd.name(), kind))
    }

    fn start_node(&mut self, node: &mut Node, ds: &mut DataStore) {
        debug!("Starting {}", node.name);

        match &mut node.kind {
            NodeKind::Primitive(p) => p.start(ds),
            NodeKind::Sequence { current, .. } => *current = 0,
            NodeKind::Timeout {
                duration_s,
                ticks,
                elapsed,
                ..
            } => {
                *ticks = seconds_to_ticks(*duration_s, ds.tick_period_s);
                *elapsed = 0;
            }
            NodeKind::Deferred {
                factory,
                requirements,
                child,
            } => {
                if let Some(old) = child.take() {
                    self.arena.remove(old);
                }

                // Only the declared resources are owned, anything else may belong to another root
                let mut cmd = (**factory)(&*ds);
                if !cmd.requirements().is_subset(requirements) {
                    error!(
                        "Deferred command {} requires {:?} but only {:?} were declared, \
                        running nothing instead",
                        cmd.name(),
                        cmd.requirements(),
                        requirements
                    );
                    cmd = super::none();
                }
                debug!("Deferred command built as {}", cmd.name());
                *child = Some(self.instantiate(&cmd));
            }
            NodeKind::Race(_) | NodeKind::Parallel(_) | NodeKind::Until { .. } => (),
        }
    }

    /// Tick a node, returning true once it has finished.
    fn tick_node(&mut self, id: ActionId, ds: &mut DataStore) -> bool {
        let mut node = match self.arena.take(id) {
            Some(n) => n,
            None => return true,
        };

        if node.state == NodeState::Finished {
            self.arena.restore(id, node);
            return true;
        }

        if node.state == NodeState::Idle {
            self.start_node(&mut node, ds);
            node.state = NodeState::Running;
        }

        let done = match &mut node.kind {
            NodeKind::Primitive(p) => {
                p.periodic(ds);
                if p.is_finished(ds) {
                    p.finish(ds);
                    true
                } else {
                    false
                }
            }
            NodeKind::Sequence { children, current } => loop {
                match children.get(*current) {
                    None => break true,
                    Some(&c) => {
                        if self.tick_node(c, ds) {
                            *current += 1;
                        } else {
                            break false;
                        }
                    }
                }
            },
            NodeKind::Race(children) => {
                // The first child to finish ends the race, later ones are not ticked
                let mut any_done = false;
                for &c in children.iter() {
                    if self.tick_node(c, ds) {
                        any_done = true;
                        break;
                    }
                }
                if any_done {
                    for &c in children.iter() {
                        self.cancel_node(c, ds);
                    }
                }
                any_done
            }
            NodeKind::Parallel(children) => {
                let mut all_done = true;
                for &c in children.iter() {
                    all_done &= self.tick_node(c, ds);
                }
                all_done
            }
            NodeKind::Timeout {
                child,
                ticks,
                elapsed,
                ..
            } => {
                let child_done = self.tick_node(*child, ds);
                *elapsed += 1;

                if child_done {
                    true
                } else if *elapsed >= *ticks {
                    debug!("{} timed out", node.name);
                    self.cancel_node(*child, ds);
                    true
                } else {
                    false
                }
            }
            NodeKind::Until { child, pred } => {
                if (**pred)(&*ds) {
                    self.cancel_node(*child, ds);
                    true
                } else {
                    self.tick_node(*child, ds)
                }
            }
            NodeKind::Deferred { child, .. } => match child {
                Some(c) => self.tick_node(*c, ds),
                None => true,
            },
        };

        if done {
            node.state = NodeState::Finished;
        }
        self.arena.restore(id, node);

        done
    }

    /// Cancel a node and everything running beneath it.
    ///
    /// Nodes which never started, or have already finished, receive no callback.
    fn cancel_node(&mut self, id: ActionId, ds: &mut DataStore) {
        let mut node = match self.arena.take(id) {
            Some(n) => n,
            None => return,
        };

        if node.state == NodeState::Running {
            debug!("Cancelled {}", node.name);
            let children = node.children();
            if let NodeKind::Primitive(p) = &mut node.kind {
                p.cancel(ds);
            }
            for c in children {
                self.cancel_node(c, ds);
            }
        }

        node.state = NodeState::Finished;
        self.arena.restore(id, node);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        cmd::{self, Instant, Primitive},
        sim_client::SimWorld,
    };
    use std::{cell::RefCell, rc::Rc};

    /// Records every callback it receives, finishing after a fixed number of ticks.
    #[derive(Clone)]
    struct Recorder {
        name: &'static str,
        finish_after: Option<u64>,
        requirements: Vec<Resource>,
        ticks: u64,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Recorder {
        fn new(
            name: &'static str,
            finish_after: Option<u64>,
            requirements: &[Resource],
            log: &Rc<RefCell<Vec<String>>>,
        ) -> Cmd {
            Cmd::primitive(Recorder {
                name,
                finish_after,
                requirements: requirements.to_vec(),
                ticks: 0,
                log: log.clone(),
            })
        }

        fn record(&self, event: &str) {
            self.log
                .borrow_mut()
                .push(format!("{} {} {}", self.name, event, self.ticks));
        }
    }

    impl Primitive for Recorder {
        fn name(&self) -> String {
            self.name.to_string()
        }

        fn requirements(&self) -> Vec<Resource> {
            self.requirements.clone()
        }

        fn start(&mut self, _ds: &mut DataStore) {
            self.record("start");
        }

        fn periodic(&mut self, _ds: &mut DataStore) {
            self.ticks += 1;
        }

        fn is_finished(&mut self, _ds: &mut DataStore) -> bool {
            self.finish_after.map_or(false, |n| self.ticks >= n)
        }

        fn finish(&mut self, _ds: &mut DataStore) {
            self.record("finish");
        }

        fn cancel(&mut self, _ds: &mut DataStore) {
            self.record("cancel");
        }
    }

    fn setup() -> (Scheduler, DataStore, Rc<RefCell<Vec<String>>>) {
        let world = SimWorld::new(crate::loco_ctrl::Params::default().module_pos_m_rb, 0.02);
        (
            Scheduler::new(),
            DataStore::sim(&world),
            Rc::new(RefCell::new(Vec::new())),
        )
    }

    fn events(log: &Rc<RefCell<Vec<String>>>) -> Vec<String> {
        log.borrow().clone()
    }

    #[test]
    fn test_race_cancels_loser() {
        let (mut sched, mut ds, log) = setup();

        let a = Recorder::new("a", Some(3), &[], &log);
        let b = Recorder::new("b", Some(10), &[], &log);
        let id = sched.schedule(&cmd::race(vec![a, b]).unwrap(), &mut ds);

        for _ in 0..2 {
            sched.tick(&mut ds);
        }
        assert!(sched.is_running(id));

        sched.tick(&mut ds);
        assert!(!sched.is_running(id));
        assert_eq!(
            events(&log),
            vec!["a start 0", "b start 0", "a finish 3", "b cancel 2"]
        );

        // Nothing left behind
        for _ in 0..10 {
            sched.tick(&mut ds);
        }
        assert_eq!(events(&log).len(), 4);
        assert_eq!(sched.num_nodes(), 0);
    }

    #[test]
    fn test_sequence_and_parallel() {
        let (mut sched, mut ds, log) = setup();

        let par = cmd::parallel(vec![
            Recorder::new("b", Some(1), &[], &log),
            Recorder::new("c", Some(2), &[], &log),
        ])
        .unwrap();
        let seq = Recorder::new("a", Some(2), &[], &log).and_then(par);
        let id = sched.schedule(&seq, &mut ds);

        // a runs ticks 1-2, b and c start in tick 2 once a is done
        sched.tick(&mut ds);
        sched.tick(&mut ds);
        assert_eq!(
            events(&log),
            vec!["a start 0", "a finish 2", "b start 0", "b finish 1", "c start 0"]
        );
        assert!(sched.is_running(id));

        sched.tick(&mut ds);
        assert!(events(&log).contains(&"c finish 2".to_string()));
        assert!(!sched.is_running(id));
    }

    #[test]
    fn test_timeout() {
        let (mut sched, mut ds, log) = setup();

        // 0.1 s at 0.02 s per tick
        let id = sched.schedule(&Recorder::new("a", None, &[], &log).with_timeout(0.1), &mut ds);
        for _ in 0..4 {
            sched.tick(&mut ds);
        }
        assert!(sched.is_running(id));

        sched.tick(&mut ds);
        assert!(!sched.is_running(id));
        assert_eq!(events(&log), vec!["a start 0", "a cancel 5"]);
    }

    #[test]
    fn test_until_checked_before_child() {
        let (mut sched, mut ds, log) = setup();

        let cmd = Recorder::new("a", None, &[], &log).until(|ds| ds.input.buttons.b);
        let id = sched.schedule(&cmd, &mut ds);

        sched.tick(&mut ds);
        sched.tick(&mut ds);
        ds.input.buttons.b = true;
        sched.tick(&mut ds);

        assert!(!sched.is_running(id));
        assert_eq!(events(&log), vec!["a start 0", "a cancel 2"]);

        // A predicate which already holds means the child never starts
        log.borrow_mut().clear();
        let id = sched.schedule(&cmd, &mut ds);
        sched.tick(&mut ds);
        assert!(!sched.is_running(id));
        assert!(events(&log).is_empty());
    }

    #[test]
    fn test_deferred_built_at_start() {
        let (mut sched, mut ds, _) = setup();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_in = seen.clone();
        let deferred = cmd::defer(&[], move |ds| {
            let cycles = ds.num_cycles;
            let seen = seen_in.clone();
            Cmd::primitive(Instant::new("record", &[], move |_| {
                seen.borrow_mut().push(cycles)
            }))
        });

        // Scheduled at cycle 0 but started at cycle 5
        let id = sched.schedule(&cmd::wait(0.1).and_then(deferred), &mut ds);
        while sched.is_running(id) {
            ds.num_cycles += 1;
            sched.tick(&mut ds);
        }
        assert_eq!(*seen.borrow(), vec![5]);
    }

    #[test]
    fn test_deferred_undeclared_requirements_run_nothing() {
        use comms_if::eqpt::mech::MechId;

        let world = SimWorld::new(crate::loco_ctrl::Params::default().module_pos_m_rb, 0.02);
        let mut ds = DataStore::sim(&world);
        let mut sched = Scheduler::new();

        // Builds a flywheel command without declaring the flywheels
        let undeclared = sched.schedule(
            &cmd::defer(&[], |_| cmd::mech::run(MechId::Flywheels, 5.0)),
            &mut ds,
        );
        for _ in 0..3 {
            sched.tick(&mut ds);
        }
        assert!(!sched.is_running(undeclared));
        assert_eq!(world.mech_demand(MechId::Flywheels), 0.0);

        let owner = sched.schedule(&cmd::mech::run(MechId::Flywheels, 9.0), &mut ds);
        sched.tick(&mut ds);
        assert_eq!(sched.owner(Resource::Mech(MechId::Flywheels)), Some(owner));
        assert_eq!(world.mech_demand(MechId::Flywheels), 9.0);
        assert_eq!(sched.num_nodes(), 1);
    }

    #[test]
    fn test_deferred_declared_requirements_run() {
        use comms_if::eqpt::mech::MechId;

        let world = SimWorld::new(crate::loco_ctrl::Params::default().module_pos_m_rb, 0.02);
        let mut ds = DataStore::sim(&world);
        let mut sched = Scheduler::new();

        let id = sched.schedule(
            &cmd::defer(&[Resource::Mech(MechId::Flywheels)], |_| {
                cmd::mech::run(MechId::Flywheels, 5.0)
            }),
            &mut ds,
        );
        sched.tick(&mut ds);
        assert!(sched.is_running(id));
        assert_eq!(world.mech_demand(MechId::Flywheels), 5.0);
    }

    #[test]
    fn test_race_stops_at_first_finisher() {
        let (mut sched, mut ds, log) = setup();

        // Both would finish on the same tick, only the first listed gets to
        let a = Recorder::new("a", Some(2), &[], &log);
        let b = Recorder::new("b", Some(2), &[], &log);
        let id = sched.schedule(&cmd::race(vec![a, b]).unwrap(), &mut ds);

        sched.tick(&mut ds);
        sched.tick(&mut ds);
        assert!(!sched.is_running(id));
        assert_eq!(
            events(&log),
            vec!["a start 0", "b start 0", "a finish 2", "b cancel 1"]
        );
    }

    #[test]
    fn test_preemption() {
        let (mut sched, mut ds, log) = setup();

        let first = sched.schedule(
            &Recorder::new("a", None, &[Resource::Drivetrain], &log),
            &mut ds,
        );
        let other = sched.schedule(
            &Recorder::new("m", None, &[Resource::Mech(comms_if::eqpt::mech::MechId::Flywheels)], &log),
            &mut ds,
        );
        sched.tick(&mut ds);
        sched.tick(&mut ds);

        let second = sched.schedule(
            &Recorder::new("b", None, &[Resource::Drivetrain], &log),
            &mut ds,
        );

        // The old owner is cancelled before the new one starts, the mechanism is untouched
        assert!(!sched.is_running(first));
        assert!(sched.is_running(other));
        assert_eq!(sched.owner(Resource::Drivetrain), Some(second));
        assert_eq!(events(&log).last().map(|s| s.as_str()), Some("a cancel 2"));

        sched.tick(&mut ds);
        assert_eq!(events(&log).last().map(|s| s.as_str()), Some("b start 0"));
    }

    #[test]
    fn test_default_fills_free_resource() {
        let (mut sched, mut ds, log) = setup();

        sched.set_default(
            Resource::Drivetrain,
            Recorder::new("default", None, &[Resource::Drivetrain], &log),
        );
        sched.tick(&mut ds);
        let default_id = sched.owner(Resource::Drivetrain);
        assert!(default_id.is_some());

        let id = sched.schedule(
            &Recorder::new("a", Some(2), &[Resource::Drivetrain], &log),
            &mut ds,
        );
        sched.tick(&mut ds);
        sched.tick(&mut ds);
        assert!(!sched.is_running(id));

        // Default is back on the next tick
        sched.tick(&mut ds);
        assert_eq!(
            events(&log),
            vec![
                "default start 0",
                "default cancel 1",
                "a start 0",
                "a finish 2",
                "default start 0"
            ]
        );
    }

    #[test]
    fn test_cancel_all() {
        let (mut sched, mut ds, log) = setup();

        sched.schedule(&Recorder::new("a", None, &[], &log), &mut ds);
        sched.schedule(&cmd::wait(5.0).and_then(Recorder::new("b", None, &[], &log)), &mut ds);
        sched.tick(&mut ds);
        sched.cancel_all(&mut ds);

        assert!(sched.running().is_empty());
        assert_eq!(sched.num_nodes(), 0);
        assert_eq!(events(&log), vec!["a start 0", "a cancel 1"]);
    }
}
