//! # Configuration Portal
//!
//! Single owner of the live configuration. Readers never see a table that is
//! half edited: every change builds a new [`MapperConfig`], swaps it in as an
//! `Arc` snapshot on a `watch` channel and then persists it. The sampling loop
//! holds a receiver and clones the current `Arc` once per tick.
//!
//! ```text
//! menu ──change_*──► ConfigPortal ──watch──► sampling loop
//!                         │
//!                         └──save──► ConfigStore
//! ```

use super::config_store::ConfigStore;
use super::{Binding, Keybinds, MapperConfig};
use crate::mapping::input_id::InputId;
use crate::mapping::MapperError;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Section of the binding table a change targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindCategory {
    Movement,
    Buttons,
    Dpad,
}

impl fmt::Display for BindCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindCategory::Movement => f.write_str("movement"),
            BindCategory::Buttons => f.write_str("buttons"),
            BindCategory::Dpad => f.write_str("dpad"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SettingChange {
    MouseSensitivity(f64),
    DeadzoneThreshold(f64),
    RelativeMouseMode(bool),
    HideCursor(bool),
}

pub struct ConfigPortal {
    store: ConfigStore,
    sender: watch::Sender<Arc<MapperConfig>>,
}

impl ConfigPortal {
    /// Loads the document from `store` and logs any binding issues.
    pub fn open(store: ConfigStore) -> Self {
        let config = store.load();
        log_binding_issues(&config.keybinds);
        Self::with_config(store, config)
    }

    pub fn with_config(store: ConfigStore, config: MapperConfig) -> Self {
        let (sender, _) = watch::channel(Arc::new(config));
        Self { store, sender }
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<MapperConfig>> {
        self.sender.subscribe()
    }

    pub fn snapshot(&self) -> Arc<MapperConfig> {
        self.sender.borrow().clone()
    }

    /// Rebinds an existing action. A comma separated value becomes a
    /// multi-input binding, which only the button table accepts.
    pub fn change_keybind(
        &self,
        category: BindCategory,
        action: &str,
        raw: &str,
    ) -> Result<(), MapperError> {
        let action = action.trim().to_lowercase();
        let binding = Binding::parse(raw);

        let mut outcome = Ok(());
        self.sender.send_if_modified(|current| {
            let mut next = (**current).clone();
            outcome = apply_keybind(&mut next.keybinds, category, &action, binding);
            if outcome.is_ok() {
                *current = Arc::new(next);
                true
            } else {
                false
            }
        });
        outcome?;

        info!("Rebound {}.{} to '{}'", category, action, raw.trim());
        log_binding_issues(&self.snapshot().keybinds);
        self.persist()
    }

    pub fn change_setting(&self, change: SettingChange) -> Result<(), MapperError> {
        self.sender.send_modify(|current| {
            let mut next = (**current).clone();
            let settings = &mut next.settings;
            match change {
                SettingChange::MouseSensitivity(value) => settings.mouse_sensitivity = value,
                SettingChange::DeadzoneThreshold(value) => settings.deadzone_threshold = value,
                SettingChange::RelativeMouseMode(on) => settings.relative_mouse_mode = on,
                SettingChange::HideCursor(on) => settings.hide_cursor = on,
            }
            *current = Arc::new(next);
        });

        info!("Setting changed: {:?}", change);
        self.persist()
    }

    fn persist(&self) -> Result<(), MapperError> {
        let snapshot = self.snapshot();
        let path = self
            .store
            .save(&snapshot)
            .map_err(|e| MapperError::Persistence(e.to_string()))?;
        debug!("Configuration persisted to {}", path.display());
        Ok(())
    }
}

fn apply_keybind(
    keybinds: &mut Keybinds,
    category: BindCategory,
    action: &str,
    binding: Binding,
) -> Result<(), MapperError> {
    let unknown = || MapperError::Configuration(format!("Unknown {category} action '{action}'"));

    match category {
        BindCategory::Buttons => {
            let slot = keybinds.buttons.get_mut(action).ok_or_else(unknown)?;
            *slot = binding;
        }
        BindCategory::Movement => {
            let id = single_input(category, binding)?;
            let slot = keybinds.movement.slot_mut(action).ok_or_else(unknown)?;
            *slot = Some(id);
        }
        BindCategory::Dpad => {
            let id = single_input(category, binding)?;
            let slot = keybinds
                .dpad
                .as_mut()
                .and_then(|dpad| dpad.slot_mut(action))
                .ok_or_else(unknown)?;
            *slot = Some(id);
        }
    }
    Ok(())
}

fn single_input(category: BindCategory, binding: Binding) -> Result<InputId, MapperError> {
    match binding {
        Binding::Single(id) => Ok(id),
        Binding::Any(_) => Err(MapperError::Configuration(format!(
            "{category} bindings take a single input"
        ))),
    }
}

pub fn log_binding_issues(keybinds: &Keybinds) {
    for issue in keybinds.validate() {
        warn!("Binding issue: {}", issue);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn portal_in(dir: &std::path::Path) -> ConfigPortal {
        ConfigPortal::open(ConfigStore::with_paths(dir.join("config.toml"), None))
    }

    #[test]
    fn sensitivity_change_survives_reload() {
        let dir = tempdir().unwrap();
        let portal = portal_in(dir.path());

        portal
            .change_setting(SettingChange::MouseSensitivity(0.125))
            .unwrap();
        assert_eq!(portal.snapshot().settings.mouse_sensitivity, 0.125);

        let reloaded = portal_in(dir.path());
        assert_eq!(reloaded.snapshot().settings.mouse_sensitivity, 0.125);
    }

    #[test]
    fn subscribers_see_new_snapshot() {
        let dir = tempdir().unwrap();
        let portal = portal_in(dir.path());
        let mut rx = portal.subscribe();
        let before = rx.borrow_and_update().clone();

        portal
            .change_setting(SettingChange::RelativeMouseMode(true))
            .unwrap();

        assert!(rx.has_changed().unwrap());
        let after = rx.borrow_and_update().clone();
        assert!(!before.settings.relative_mouse_mode);
        assert!(after.settings.relative_mouse_mode);
    }

    #[test]
    fn button_rebind_accepts_multiple_inputs() {
        let dir = tempdir().unwrap();
        let portal = portal_in(dir.path());

        portal
            .change_keybind(BindCategory::Buttons, "R2", "e, Mouse:Right")
            .unwrap();
        assert_eq!(
            portal.snapshot().keybinds.buttons["r2"],
            Binding::Any(vec!["e".into(), "pointer:right".into()])
        );
    }

    #[test]
    fn unknown_action_is_rejected_without_change() {
        let dir = tempdir().unwrap();
        let portal = portal_in(dir.path());
        let mut rx = portal.subscribe();
        rx.borrow_and_update();

        let err = portal
            .change_keybind(BindCategory::Buttons, "jump", "space")
            .unwrap_err();
        assert!(matches!(err, MapperError::Configuration(_)));
        assert!(!rx.has_changed().unwrap());
        assert!(!portal.snapshot().keybinds.buttons.contains_key("jump"));
    }

    #[test]
    fn movement_and_dpad_take_single_inputs() {
        let dir = tempdir().unwrap();
        let portal = portal_in(dir.path());

        portal
            .change_keybind(BindCategory::Movement, "forward", "Up")
            .unwrap();
        assert_eq!(
            portal.snapshot().keybinds.movement.forward,
            Some("up".into())
        );

        assert!(portal
            .change_keybind(BindCategory::Movement, "forward", "w, up")
            .is_err());
        assert!(portal
            .change_keybind(BindCategory::Movement, "jump", "w")
            .is_err());

        portal
            .change_keybind(BindCategory::Dpad, "left", "Return")
            .unwrap();
        let dpad = portal.snapshot().keybinds.dpad.clone().unwrap();
        assert_eq!(dpad.left, Some("enter".into()));
    }

    #[test]
    fn dpad_change_requires_block() {
        let dir = tempdir().unwrap();
        let mut config = MapperConfig::default();
        config.keybinds.dpad = None;
        let portal = ConfigPortal::with_config(
            ConfigStore::with_paths(dir.path().join("config.toml"), None),
            config,
        );

        assert!(portal
            .change_keybind(BindCategory::Dpad, "up", "w")
            .is_err());
    }

    #[test]
    fn save_failure_is_reported_but_change_stays() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::with_paths(dir.path().join("gone").join("config.toml"), None);
        let portal = ConfigPortal::with_config(store, MapperConfig::default());

        let err = portal
            .change_setting(SettingChange::DeadzoneThreshold(0.2))
            .unwrap_err();
        assert!(matches!(err, MapperError::Persistence(_)));
        assert_eq!(portal.snapshot().settings.deadzone_threshold, 0.2);
    }
}
