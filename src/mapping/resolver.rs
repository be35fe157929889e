//! Digital Input Resolver
//!
//! Decides, for one tick, which logical buttons are held, the value of both
//! triggers, the d-pad direction and the digital left-stick vector.
//!
//! Failures never abort resolution: a missing binding or a failing query makes
//! that single action inactive and is recorded as a [`ResolveFault`] for the
//! caller to log.

use super::input_id::{InputId, InputKind};
use super::StickVector;
use crate::controller::virtual_pad::{DpadDirection, PadButton, SpecialButton, Trigger};
use crate::input::{InputError, InputSource};
use crate::persistence::{Binding, Keybinds, MovementBinds};

/// Button-table fallback for the d-pad, in priority order.
const DPAD_BUTTON_ACTIONS: [(&str, DpadDirection); 4] = [
    ("dpad_up", DpadDirection::North),
    ("dpad_down", DpadDirection::South),
    ("dpad_left", DpadDirection::West),
    ("dpad_right", DpadDirection::East),
];

/// `isPressed(InputId)` as an explicit result.
pub trait PressQuery {
    fn is_pressed(&mut self, id: &InputId) -> Result<bool, InputError>;
}

impl<T: InputSource + ?Sized> PressQuery for T {
    fn is_pressed(&mut self, id: &InputId) -> Result<bool, InputError> {
        match id.kind() {
            InputKind::Unbound | InputKind::UnknownPointer(_) => Ok(false),
            InputKind::Key(key) => self.is_key_pressed(key),
            InputKind::Pointer(button) => self.is_pointer_pressed(button),
        }
    }
}

/// What a button-table action name drives on the pad.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionTarget {
    Button(PadButton),
    Special(SpecialButton),
    Trigger(Trigger),
    Dpad(DpadDirection),
    Unmapped,
}

impl ActionTarget {
    pub fn from_name(name: &str) -> Self {
        match name {
            "cross" => ActionTarget::Button(PadButton::Cross),
            "circle" => ActionTarget::Button(PadButton::Circle),
            "square" => ActionTarget::Button(PadButton::Square),
            "triangle" => ActionTarget::Button(PadButton::Triangle),
            "l1" => ActionTarget::Button(PadButton::ShoulderLeft),
            "r1" => ActionTarget::Button(PadButton::ShoulderRight),
            "l3" => ActionTarget::Button(PadButton::ThumbLeft),
            "r3" => ActionTarget::Button(PadButton::ThumbRight),
            "share" => ActionTarget::Button(PadButton::Share),
            "options" => ActionTarget::Button(PadButton::Options),
            "touchpad" => ActionTarget::Special(SpecialButton::Touchpad),
            "ps" => ActionTarget::Special(SpecialButton::Ps),
            "l2" => ActionTarget::Trigger(Trigger::Left),
            "r2" => ActionTarget::Trigger(Trigger::Right),
            _ => DPAD_BUTTON_ACTIONS
                .iter()
                .find(|(action, _)| *action == name)
                .map(|(_, direction)| ActionTarget::Dpad(*direction))
                .unwrap_or(ActionTarget::Unmapped),
        }
    }
}

/// One update for the virtual controller, in binding-table order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ButtonCommand {
    Button(PadButton, bool),
    Special(SpecialButton, bool),
    Trigger(Trigger, f32),
}

#[derive(Debug)]
pub enum ResolveFault {
    MissingBinding(String),
    Query { input: InputId, error: InputError },
}

pub struct DigitalResolver<'a, Q: PressQuery + ?Sized> {
    query: &'a mut Q,
    faults: Vec<ResolveFault>,
}

impl<'a, Q: PressQuery + ?Sized> DigitalResolver<'a, Q> {
    pub fn new(query: &'a mut Q) -> Self {
        Self {
            query,
            faults: Vec::new(),
        }
    }

    pub fn faults(&self) -> &[ResolveFault] {
        &self.faults
    }

    pub fn into_faults(self) -> Vec<ResolveFault> {
        self.faults
    }

    /// A failing query resolves to "not pressed".
    pub fn pressed(&mut self, id: &InputId) -> bool {
        match self.query.is_pressed(id) {
            Ok(pressed) => pressed,
            Err(error) => {
                self.faults.push(ResolveFault::Query {
                    input: id.clone(),
                    error,
                });
                false
            }
        }
    }

    /// Logical OR over every input of the binding.
    pub fn any_pressed(&mut self, binding: &Binding) -> bool {
        binding.inputs().iter().any(|id| self.pressed(id))
    }

    fn movement_pressed(&mut self, action: &str, id: Option<&InputId>) -> bool {
        match id {
            Some(id) => self.pressed(id),
            None => {
                self.faults
                    .push(ResolveFault::MissingBinding(format!("movement.{action}")));
                false
            }
        }
    }

    /// Digital left stick: forward beats backward, left beats right.
    pub fn movement(&mut self, binds: &MovementBinds) -> StickVector {
        let y = if self.movement_pressed("forward", binds.forward.as_ref()) {
            -1.0
        } else if self.movement_pressed("backward", binds.backward.as_ref()) {
            1.0
        } else {
            0.0
        };

        let x = if self.movement_pressed("left", binds.left.as_ref()) {
            -1.0
        } else if self.movement_pressed("right", binds.right.as_ref()) {
            1.0
        } else {
            0.0
        };

        StickVector { x, y }
    }

    /// Explicit d-pad block first, `dpad_*` button actions only when none of it is active.
    pub fn dpad(&mut self, keybinds: &Keybinds) -> DpadDirection {
        if let Some(dpad) = &keybinds.dpad {
            let directions = [
                DpadDirection::North,
                DpadDirection::South,
                DpadDirection::West,
                DpadDirection::East,
            ];
            for ((_, id), direction) in dpad.entries().into_iter().zip(directions) {
                if let Some(id) = id {
                    if self.pressed(id) {
                        return direction;
                    }
                }
            }
        }

        for (action, direction) in DPAD_BUTTON_ACTIONS {
            if let Some(binding) = keybinds.buttons.get(action) {
                if self.any_pressed(binding) {
                    return direction;
                }
            }
        }

        DpadDirection::None
    }

    /// Every bound button and trigger, re-evaluated each call.
    pub fn buttons(&mut self, keybinds: &Keybinds) -> Vec<ButtonCommand> {
        let mut commands = Vec::with_capacity(keybinds.buttons.len());
        for (action, binding) in &keybinds.buttons {
            let command = match ActionTarget::from_name(action) {
                ActionTarget::Button(button) => {
                    ButtonCommand::Button(button, self.any_pressed(binding))
                }
                ActionTarget::Special(button) => {
                    ButtonCommand::Special(button, self.any_pressed(binding))
                }
                ActionTarget::Trigger(trigger) => {
                    let value = if self.any_pressed(binding) { 1.0 } else { 0.0 };
                    ButtonCommand::Trigger(trigger, value)
                }
                ActionTarget::Dpad(_) | ActionTarget::Unmapped => continue,
            };
            commands.push(command);
        }
        commands
    }
}
