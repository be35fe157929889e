//! Configuration menu: rebinding and settings edits through the portal.

use super::common::{Console, MenuChoice};
use crate::persistence::config_portal::{BindCategory, ConfigPortal, SettingChange};
use crate::persistence::{Binding, MapperConfig};
use std::io::{self, BufRead, Write};
use tracing::error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingsChoice {
    MovementKeys,
    ButtonKeys,
    DpadKeys,
    MouseSensitivity,
    DeadzoneThreshold,
    RelativeMouseMode,
    CursorVisibility,
    ShowConfig,
    Back,
}

impl MenuChoice for SettingsChoice {
    const ALL: &'static [Self] = &[
        SettingsChoice::MovementKeys,
        SettingsChoice::ButtonKeys,
        SettingsChoice::DpadKeys,
        SettingsChoice::MouseSensitivity,
        SettingsChoice::DeadzoneThreshold,
        SettingsChoice::RelativeMouseMode,
        SettingsChoice::CursorVisibility,
        SettingsChoice::ShowConfig,
        SettingsChoice::Back,
    ];

    fn label(self) -> &'static str {
        match self {
            SettingsChoice::MovementKeys => "Change movement keys",
            SettingsChoice::ButtonKeys => "Change button keys",
            SettingsChoice::DpadKeys => "Change d-pad keys",
            SettingsChoice::MouseSensitivity => "Change mouse sensitivity",
            SettingsChoice::DeadzoneThreshold => "Change deadzone threshold",
            SettingsChoice::RelativeMouseMode => "Toggle relative mouse mode",
            SettingsChoice::CursorVisibility => "Toggle cursor visibility",
            SettingsChoice::ShowConfig => "Show current config",
            SettingsChoice::Back => "Back to main menu",
        }
    }
}

/// Runs until "Back" or end of input.
pub fn run_settings_menu<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    portal: &ConfigPortal,
) -> io::Result<()> {
    while let Some(choice) = console.choose::<SettingsChoice>("=== Configuration Menu ===")? {
        let finished = match choice {
            SettingsChoice::MovementKeys => {
                let snapshot = portal.snapshot();
                let entries: Vec<(&str, String)> = snapshot
                    .keybinds
                    .movement
                    .entries()
                    .iter()
                    .map(|(action, id)| (*action, describe(id.map(|id| id.as_str()))))
                    .collect();
                rebind(console, portal, BindCategory::Movement, &entries)?
            }
            SettingsChoice::ButtonKeys => {
                let snapshot = portal.snapshot();
                let entries: Vec<(&str, String)> = snapshot
                    .keybinds
                    .buttons
                    .iter()
                    .map(|(action, binding)| (action.as_str(), Binding::to_string(binding)))
                    .collect();
                rebind(console, portal, BindCategory::Buttons, &entries)?
            }
            SettingsChoice::DpadKeys => {
                let snapshot = portal.snapshot();
                match &snapshot.keybinds.dpad {
                    Some(dpad) => {
                        let entries: Vec<(&str, String)> = dpad
                            .entries()
                            .iter()
                            .map(|(direction, id)| {
                                (*direction, describe(id.map(|id| id.as_str())))
                            })
                            .collect();
                        rebind(console, portal, BindCategory::Dpad, &entries)?
                    }
                    None => {
                        console.say("No d-pad block configured, d-pad follows the dpad_* buttons")?;
                        false
                    }
                }
            }
            SettingsChoice::MouseSensitivity => {
                let current = portal.snapshot().settings.mouse_sensitivity;
                let prompt = format!("Current sensitivity: {current}\nNew sensitivity: ");
                change_number(console, portal, &prompt, SettingChange::MouseSensitivity)?
            }
            SettingsChoice::DeadzoneThreshold => {
                let current = portal.snapshot().settings.deadzone_threshold;
                let prompt = format!("Current threshold: {current}\nNew threshold: ");
                change_number(console, portal, &prompt, SettingChange::DeadzoneThreshold)?
            }
            SettingsChoice::RelativeMouseMode => {
                let enabled = !portal.snapshot().settings.relative_mouse_mode;
                apply(console, portal, SettingChange::RelativeMouseMode(enabled))?;
                console.say(&format!("Relative mouse mode: {}", on_off(enabled)))?;
                false
            }
            SettingsChoice::CursorVisibility => {
                let hidden = !portal.snapshot().settings.hide_cursor;
                apply(console, portal, SettingChange::HideCursor(hidden))?;
                console.say(&format!("Hide cursor while mapping: {}", on_off(hidden)))?;
                false
            }
            SettingsChoice::ShowConfig => {
                show_config(console, &portal.snapshot())?;
                false
            }
            SettingsChoice::Back => true,
        };

        if finished {
            break;
        }
    }
    Ok(())
}

fn describe(input: Option<&str>) -> String {
    input.unwrap_or("unbound").to_string()
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

/// Asks for each entry in turn; an empty answer keeps the current binding.
/// Returns `true` when input ended.
fn rebind<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    portal: &ConfigPortal,
    category: BindCategory,
    entries: &[(&str, String)],
) -> io::Result<bool> {
    for (action, current) in entries {
        let Some(answer) = console.prompt(&format!("Change {action} (current: {current}): "))?
        else {
            return Ok(true);
        };
        if answer.is_empty() {
            continue;
        }
        if let Err(e) = portal.change_keybind(category, action, &answer) {
            error!("Failed to change {} binding {}: {}", category, action, e);
            console.say(&e.to_string())?;
        }
    }
    Ok(false)
}

fn change_number<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    portal: &ConfigPortal,
    prompt: &str,
    change: fn(f64) -> SettingChange,
) -> io::Result<bool> {
    let Some(answer) = console.prompt(prompt)? else {
        return Ok(true);
    };
    match answer.parse::<f64>() {
        Ok(value) if value.is_finite() => apply(console, portal, change(value))?,
        _ => console.say("Invalid number")?,
    }
    Ok(false)
}

fn apply<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    portal: &ConfigPortal,
    change: SettingChange,
) -> io::Result<()> {
    if let Err(e) = portal.change_setting(change) {
        error!("Failed to apply {:?}: {}", change, e);
        console.say(&e.to_string())?;
    }
    Ok(())
}

fn show_config<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    config: &MapperConfig,
) -> io::Result<()> {
    match toml::to_string_pretty(config) {
        Ok(text) => console.say(&text),
        Err(e) => {
            error!("Failed to render configuration: {}", e);
            Ok(())
        }
    }
}
