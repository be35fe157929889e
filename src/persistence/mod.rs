//! # Persistence Module
//!
//! Data model of the user-editable configuration document plus its storage
//! ([`config_store`]) and the shared holder that publishes snapshots to the
//! sampling loop ([`config_portal`]).
//!
//! The document has two sections:
//!
//! ```toml
//! [keybinds.movement]
//! forward = "w"
//!
//! [keybinds.buttons]
//! cross = "space"
//! r2 = ["e", "pointer:right"]
//!
//! [keybinds.dpad]
//! up = "up"
//!
//! [settings]
//! mouse_sensitivity = 0.05
//! ```
//!
//! Partial documents still load. Missing settings take their defaults, but
//! missing bindings are never filled in: movement entries stay `None` and are
//! reported by [`Keybinds::validate`], and a missing `[keybinds.dpad]` stays
//! absent so the d-pad follows the `dpad_*` buttons.

pub mod config_portal;
pub mod config_store;

use crate::mapping::input_id::{InputId, InputKind};
use crate::mapping::resolver::ActionTarget;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Complete configuration document.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct MapperConfig {
    pub keybinds: Keybinds,
    pub settings: Settings,
}

/// The binding table. [`Keybinds::default`] is the first-run document; a loaded
/// document only gets empty sections for what it leaves out.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Keybinds {
    #[serde(default)]
    pub movement: MovementBinds,
    /// Logical action name to one or more physical inputs
    #[serde(default)]
    pub buttons: BTreeMap<String, Binding>,
    /// Dedicated d-pad block; may be absent entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpad: Option<DpadBinds>,
}

/// Left-stick movement keys.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct MovementBinds {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward: Option<InputId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backward: Option<InputId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<InputId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<InputId>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct DpadBinds {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub up: Option<InputId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub down: Option<InputId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<InputId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<InputId>,
}

/// One action may be satisfied by several physical inputs (logical OR).
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum Binding {
    Single(InputId),
    Any(Vec<InputId>),
}

/// The only emulated controller profile.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ControllerProfile {
    #[default]
    DualShock4,
}

/// Pointer and loop tuning. Out-of-range values are accepted as-is.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub mouse_sensitivity: f64,
    pub deadzone_threshold: f64,
    pub controller_type: ControllerProfile,
    pub relative_mouse_mode: bool,
    pub hide_cursor: bool,
    /// Power-law exponent of the pointer response curve, 1.0 is linear
    pub response_exponent: f64,
    pub poll_interval_us: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mouse_sensitivity: 0.05,
            deadzone_threshold: 0.01,
            controller_type: ControllerProfile::DualShock4,
            relative_mouse_mode: false,
            hide_cursor: false,
            response_exponent: 1.0,
            poll_interval_us: 1000,
        }
    }
}

impl Default for Keybinds {
    fn default() -> Self {
        let buttons = [
            ("cross", "space"),
            ("circle", "c"),
            ("square", "x"),
            ("triangle", "y"),
            ("l1", "r"),
            ("r1", "t"),
            ("l2", "q"),
            ("r2", "e"),
            ("l3", "f"),
            ("r3", "g"),
            ("share", "backspace"),
            ("options", "enter"),
            ("touchpad", "tab"),
            ("ps", "home"),
            ("dpad_up", "i"),
            ("dpad_down", "k"),
            ("dpad_left", "j"),
            ("dpad_right", "l"),
            ("example_mouse_bind", "pointer:left"),
        ]
        .into_iter()
        .map(|(action, key)| (action.to_string(), Binding::Single(InputId::parse(key))))
        .collect();

        Self {
            movement: MovementBinds {
                forward: Some("w".into()),
                backward: Some("s".into()),
                left: Some("a".into()),
                right: Some("d".into()),
            },
            buttons,
            dpad: Some(DpadBinds {
                up: Some("up".into()),
                down: Some("down".into()),
                left: Some("left".into()),
                right: Some("right".into()),
            }),
        }
    }
}

impl Binding {
    /// Parses user input; commas separate alternative inputs.
    pub fn parse(raw: &str) -> Self {
        let mut ids: Vec<InputId> = raw
            .split(',')
            .map(InputId::parse)
            .filter(|id| !id.as_str().is_empty())
            .collect();
        match ids.len() {
            0 => Binding::Single(InputId::parse("")),
            1 => Binding::Single(ids.remove(0)),
            _ => Binding::Any(ids),
        }
    }

    pub fn inputs(&self) -> &[InputId] {
        match self {
            Binding::Single(id) => std::slice::from_ref(id),
            Binding::Any(ids) => ids,
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.inputs().iter().map(InputId::as_str).collect();
        f.write_str(&joined.join(", "))
    }
}

impl MovementBinds {
    pub fn entries(&self) -> [(&'static str, Option<&InputId>); 4] {
        [
            ("forward", self.forward.as_ref()),
            ("backward", self.backward.as_ref()),
            ("left", self.left.as_ref()),
            ("right", self.right.as_ref()),
        ]
    }

    pub fn slot_mut(&mut self, action: &str) -> Option<&mut Option<InputId>> {
        match action {
            "forward" => Some(&mut self.forward),
            "backward" => Some(&mut self.backward),
            "left" => Some(&mut self.left),
            "right" => Some(&mut self.right),
            _ => None,
        }
    }
}

impl DpadBinds {
    /// Entries in resolution priority order.
    pub fn entries(&self) -> [(&'static str, Option<&InputId>); 4] {
        [
            ("up", self.up.as_ref()),
            ("down", self.down.as_ref()),
            ("left", self.left.as_ref()),
            ("right", self.right.as_ref()),
        ]
    }

    pub fn slot_mut(&mut self, action: &str) -> Option<&mut Option<InputId>> {
        match action {
            "up" => Some(&mut self.up),
            "down" => Some(&mut self.down),
            "left" => Some(&mut self.left),
            "right" => Some(&mut self.right),
            _ => None,
        }
    }
}

/// A problem found in the binding table. Never fatal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindingIssue {
    MissingMovement(&'static str),
    EmptyBinding(String),
    UnknownAction(String),
    UnknownInput { action: String, input: String },
}

impl fmt::Display for BindingIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingIssue::MissingMovement(action) => {
                write!(f, "movement.{action} is not bound and will never be pressed")
            }
            BindingIssue::EmptyBinding(action) => write!(f, "{action} has an empty binding"),
            BindingIssue::UnknownAction(action) => {
                write!(f, "{action} is not a controller action and will be ignored")
            }
            BindingIssue::UnknownInput { action, input } => {
                write!(f, "{action} is bound to unknown input '{input}'")
            }
        }
    }
}

impl Keybinds {
    /// Collects every problem in the table without rejecting it.
    pub fn validate(&self) -> Vec<BindingIssue> {
        let mut issues = Vec::new();

        for (action, id) in self.movement.entries() {
            match id {
                None => issues.push(BindingIssue::MissingMovement(action)),
                Some(id) => check_input(&format!("movement.{action}"), id, &mut issues),
            }
        }

        for (action, binding) in &self.buttons {
            if matches!(ActionTarget::from_name(action), ActionTarget::Unmapped) {
                issues.push(BindingIssue::UnknownAction(action.clone()));
            }
            if binding.inputs().is_empty() {
                issues.push(BindingIssue::EmptyBinding(action.clone()));
            }
            for id in binding.inputs() {
                check_input(action, id, &mut issues);
            }
        }

        if let Some(dpad) = &self.dpad {
            for (direction, id) in dpad.entries() {
                if let Some(id) = id {
                    check_input(&format!("dpad.{direction}"), id, &mut issues);
                }
            }
        }

        issues
    }
}

fn check_input(action: &str, id: &InputId, issues: &mut Vec<BindingIssue>) {
    if matches!(id.kind(), InputKind::Unbound) {
        issues.push(BindingIssue::EmptyBinding(action.to_string()));
    } else if !id.is_known() {
        issues.push(BindingIssue::UnknownInput {
            action: action.to_string(),
            input: id.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_clean() {
        let binds = Keybinds::default();
        let issues = binds.validate();
        // The sample pointer binding is not a controller action
        assert_eq!(
            issues,
            vec![BindingIssue::UnknownAction("example_mouse_bind".into())]
        );
    }

    #[test]
    fn partial_document_keeps_missing_movement_unset() {
        let doc = r#"
            [keybinds.movement]
            forward = "w"

            [keybinds.buttons]
            cross = ["space", "Mouse:Left"]

            [settings]
            mouse_sensitivity = 0.2
        "#;
        let config: MapperConfig = toml::from_str(doc).unwrap();

        assert_eq!(config.keybinds.movement.forward, Some("w".into()));
        assert_eq!(config.keybinds.movement.backward, None);
        assert!(config.keybinds.dpad.is_none());
        assert_eq!(
            config.keybinds.buttons["cross"],
            Binding::Any(vec!["space".into(), "pointer:left".into()])
        );
        assert_eq!(config.settings.mouse_sensitivity, 0.2);
        assert_eq!(config.settings.deadzone_threshold, 0.01);
        assert_eq!(config.settings.response_exponent, 1.0);

        let issues = config.keybinds.validate();
        assert!(issues.contains(&BindingIssue::MissingMovement("backward")));
        assert!(issues.contains(&BindingIssue::MissingMovement("left")));
        assert!(issues.contains(&BindingIssue::MissingMovement("right")));
    }

    #[test]
    fn absent_sections_are_not_filled_from_defaults() {
        let doc = r#"
            [keybinds.buttons]
            dpad_down = "k"
        "#;
        let config: MapperConfig = toml::from_str(doc).unwrap();

        assert!(config.keybinds.dpad.is_none());
        assert_eq!(config.keybinds.movement, MovementBinds::default());
        assert_eq!(config.keybinds.buttons.len(), 1);

        let issues = config.keybinds.validate();
        assert!(issues.contains(&BindingIssue::MissingMovement("forward")));
    }

    #[test]
    fn saved_document_without_dpad_block_reloads_without_one() {
        let mut config = MapperConfig::default();
        config.keybinds.dpad = None;

        let text = toml::to_string_pretty(&config).unwrap();
        let reloaded: MapperConfig = toml::from_str(&text).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn validate_flags_unknown_inputs_and_empty_bindings() {
        let mut binds = Keybinds::default();
        binds.buttons.clear();
        binds
            .buttons
            .insert("cross".into(), Binding::Single("pointer:wheel".into()));
        binds.buttons.insert("circle".into(), Binding::Any(vec![]));
        binds.buttons.insert("triangle".into(), Binding::Single("".into()));

        let issues = binds.validate();
        assert!(issues.contains(&BindingIssue::UnknownInput {
            action: "cross".into(),
            input: "pointer:wheel".into()
        }));
        assert!(issues.contains(&BindingIssue::EmptyBinding("circle".into())));
        assert!(issues.contains(&BindingIssue::EmptyBinding("triangle".into())));
    }

    #[test]
    fn binding_parse_splits_on_commas() {
        assert_eq!(Binding::parse("Q"), Binding::Single("q".into()));
        assert_eq!(
            Binding::parse("q, pointer:right"),
            Binding::Any(vec!["q".into(), "pointer:right".into()])
        );
        assert_eq!(Binding::parse(" , "), Binding::Single("".into()));
        assert_eq!(Binding::parse("q, pointer:right").to_string(), "q, pointer:right");
    }

    #[test]
    fn controller_profile_serialises_lowercase() {
        let text = toml::to_string(&Settings::default()).unwrap();
        assert!(text.contains("controller_type = \"dualshock4\""));
    }
}
