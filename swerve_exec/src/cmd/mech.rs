//! # Mechanism actions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::mech::MechId;

use super::{Cmd, Instant, Primitive, Resource};
use crate::data_store::DataStore;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Holds a mechanism at a demand until cancelled, then zeroes it.
#[derive(Debug, Clone)]
pub struct RunMech {
    id: MechId,
    demand: f64,
}

/// Sets a demand and finishes once the mechanism reports it has reached it.
#[derive(Debug, Clone)]
pub struct MoveMech {
    id: MechId,
    demand: f64,
}

/// Waits for a mechanism to reach its current demand without commanding it.
#[derive(Debug, Clone)]
pub struct WaitMechAtTarget {
    id: MechId,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Primitive for RunMech {
    fn name(&self) -> String {
        format!("Run {:?} at {}", self.id, self.demand)
    }

    fn requirements(&self) -> Vec<Resource> {
        vec![Resource::Mech(self.id)]
    }

    fn start(&mut self, ds: &mut DataStore) {
        ds.set_mech_demand(self.id, self.demand);
    }

    fn is_finished(&mut self, _ds: &mut DataStore) -> bool {
        false
    }

    fn cancel(&mut self, ds: &mut DataStore) {
        ds.set_mech_demand(self.id, 0.0);
    }
}

impl Primitive for MoveMech {
    fn name(&self) -> String {
        format!("Move {:?} to {}", self.id, self.demand)
    }

    fn requirements(&self) -> Vec<Resource> {
        vec![Resource::Mech(self.id)]
    }

    fn start(&mut self, ds: &mut DataStore) {
        ds.set_mech_demand(self.id, self.demand);
    }

    fn is_finished(&mut self, ds: &mut DataStore) -> bool {
        ds.mech_at_target(self.id)
    }

    // Interrupted moves keep their demand
    fn cancel(&mut self, _ds: &mut DataStore) {}
}

impl Primitive for WaitMechAtTarget {
    fn name(&self) -> String {
        format!("Wait for {:?}", self.id)
    }

    fn is_finished(&mut self, ds: &mut DataStore) -> bool {
        ds.mech_at_target(self.id)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

pub fn run(id: MechId, demand: f64) -> Cmd {
    Cmd::primitive(RunMech { id, demand })
}

pub fn run_once(id: MechId, demand: f64) -> Cmd {
    Cmd::primitive(Instant::new(
        &format!("Set {:?} to {}", id, demand),
        &[Resource::Mech(id)],
        move |ds| ds.set_mech_demand(id, demand),
    ))
}

pub fn move_to(id: MechId, demand: f64) -> Cmd {
    Cmd::primitive(MoveMech { id, demand })
}

pub fn wait_at_target(id: MechId) -> Cmd {
    Cmd::primitive(WaitMechAtTarget { id })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{cmd::Scheduler, sim_client::SimWorld};

    #[test]
    fn test_run_zeroes_on_cancel() {
        let world = SimWorld::new(crate::loco_ctrl::Params::default().module_pos_m_rb, 0.02);
        let mut ds = DataStore::sim(&world);
        let mut sched = Scheduler::new();

        let id = sched.schedule(&run(MechId::IntakeRollers, 5.0), &mut ds);
        sched.tick(&mut ds);
        assert_eq!(world.mech_demand(MechId::IntakeRollers), 5.0);

        sched.cancel(id, &mut ds);
        assert_eq!(world.mech_demand(MechId::IntakeRollers), 0.0);
    }

    #[test]
    fn test_move_waits_for_target() {
        let world = SimWorld::new(crate::loco_ctrl::Params::default().module_pos_m_rb, 0.02);
        let mut ds = DataStore::sim(&world);
        let mut sched = Scheduler::new();

        let id = sched.schedule(&move_to(MechId::Flywheels, 10.0), &mut ds);
        let waiter = sched.schedule(&wait_at_target(MechId::Flywheels), &mut ds);

        let mut ticks = 0;
        while sched.is_running(id) {
            sched.tick(&mut ds);
            world.step();
            ticks += 1;
            assert!(ticks < 100);
        }

        // Slews at 200 per second so takes more than one tick
        assert!(ticks > 1);
        assert_eq!(world.mech_demand(MechId::Flywheels), 10.0);

        sched.tick(&mut ds);
        assert!(!sched.is_running(waiter));
    }

    #[test]
    fn test_run_once_keeps_demand() {
        let world = SimWorld::new(crate::loco_ctrl::Params::default().module_pos_m_rb, 0.02);
        let mut ds = DataStore::sim(&world);
        let mut sched = Scheduler::new();

        let id = sched.schedule(&run_once(MechId::IntakePivot, 3.0), &mut ds);
        sched.tick(&mut ds);

        assert!(!sched.is_running(id));
        assert_eq!(world.mech_demand(MechId::IntakePivot), 3.0);
    }
}
