//! # Operator input snapshot

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The state of the operator's controller at one instant.
///
/// Axes are in the range [-1, 1] with the controller's native sign convention (stick forward is
/// negative Y, stick right is positive X).
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorInput {
    pub left_x: f64,
    pub left_y: f64,
    pub right_x: f64,
    pub right_y: f64,

    pub buttons: Buttons,

    /// D-pad direction in degrees clockwise from up, or `None` if not pressed.
    pub pov_deg: Option<u16>,
}

/// Digital buttons of the operator's controller.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Buttons {
    pub a: bool,
    pub b: bool,
    pub x: bool,
    pub y: bool,
    pub left_bumper: bool,
    pub right_bumper: bool,
    pub start: bool,
    pub back: bool,
    pub left_stick: bool,
    pub right_stick: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A digital trigger source on the controller.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Trigger {
    A,
    B,
    X,
    Y,
    LeftBumper,
    RightBumper,
    Start,
    Back,
    LeftStick,
    RightStick,
    /// The D-pad pressed in exactly this direction (degrees clockwise from up).
    Pov(u16),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl OperatorInput {
    /// Returns true if the given trigger is currently active.
    pub fn is_active(&self, trigger: Trigger) -> bool {
        let b = &self.buttons;
        match trigger {
            Trigger::A => b.a,
            Trigger::B => b.b,
            Trigger::X => b.x,
            Trigger::Y => b.y,
            Trigger::LeftBumper => b.left_bumper,
            Trigger::RightBumper => b.right_bumper,
            Trigger::Start => b.start,
            Trigger::Back => b.back,
            Trigger::LeftStick => b.left_stick,
            Trigger::RightStick => b.right_stick,
            Trigger::Pov(d) => self.pov_deg == Some(d),
        }
    }

    /// Returns true if the trigger is active now but was not in `previous`.
    pub fn rising_edge(&self, previous: &OperatorInput, trigger: Trigger) -> bool {
        self.is_active(trigger) && !previous.is_active(trigger)
    }
}
