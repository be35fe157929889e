//! # User Interface Module
//!
//! Text front end of the mapper. The main menu drives the [`MapperHandle`]
//! lifecycle and the demo; the configuration menu edits bindings and settings
//! through the [`ConfigPortal`].
//!
//! ```text
//! MapperUi ──► main menu ──► MapperHandle (start / stop / reset)
//!                  │    └──► demo sequence
//!                  └──► configuration menu ──► ConfigPortal
//! ```

pub mod common;
pub mod main_menu;
pub mod settings_menu;

use crate::controller::demo::{run_demo, DemoTimings};
use crate::controller::mapper_handle::MapperHandle;
use crate::persistence::config_portal::ConfigPortal;
use common::{print_controls, Console};
use main_menu::MainChoice;
use settings_menu::run_settings_menu;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing::{error, info};

pub const TITLE: &str = "PS4 Controller Emulator";

pub struct MapperUi {
    portal: Arc<ConfigPortal>,
    handle: MapperHandle,
    demo_timings: DemoTimings,
}

impl MapperUi {
    pub fn new(portal: Arc<ConfigPortal>, handle: MapperHandle) -> Self {
        Self {
            portal,
            handle,
            demo_timings: DemoTimings::default(),
        }
    }

    pub fn with_demo_timings(mut self, timings: DemoTimings) -> Self {
        self.demo_timings = timings;
        self
    }

    /// Main menu loop. Leaving it, by choice or end of input, stops the mapping.
    pub fn run<R: BufRead, W: Write>(&mut self, console: &mut Console<R, W>) -> io::Result<()> {
        console.say(TITLE)?;
        console.say("===============================================")?;

        while let Some(choice) = console.choose::<MainChoice>("Options:")? {
            match choice {
                MainChoice::StartMapping => self.start_mapping(console)?,
                MainChoice::RunDemo => {
                    if run_demo(self.handle.pad(), &self.demo_timings).is_err() {
                        console.say("Demo sequence failed, see log for details")?;
                    }
                }
                MainChoice::ResetController => {
                    if let Err(e) = self.handle.reset() {
                        error!("Failed to reset controller: {}", e);
                        console.say(&e.to_string())?;
                    }
                }
                MainChoice::Configuration => run_settings_menu(console, &self.portal)?,
                MainChoice::Exit => {
                    console.say("Exiting...")?;
                    break;
                }
            }
        }

        self.shutdown();
        Ok(())
    }

    fn start_mapping<R: BufRead, W: Write>(&mut self, console: &mut Console<R, W>) -> io::Result<()> {
        if !self.handle.is_running() {
            print_controls(console.output(), &self.portal.snapshot().keybinds)?;
        }
        if let Err(e) = self.handle.start() {
            error!("Could not start mapping: {}", e);
            console.say(&format!("Could not start mapping: {e}"))?;
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        if let Err(e) = self.handle.stop() {
            error!("Failed to stop mapping: {}", e);
        }
        info!("Menu closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::virtual_pad::share;
    use crate::controller::virtual_pad::testing::{PadCall, RecordingPad};
    use crate::controller::virtual_pad::Trigger;
    use crate::persistence::config_store::ConfigStore;
    use std::io::Cursor;
    use std::time::Duration;
    use tempfile::TempDir;

    fn ui() -> (TempDir, RecordingPad, MapperUi) {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::with_paths(dir.path().join("config.toml"), None);
        let portal = Arc::new(ConfigPortal::open(store));
        let pad = RecordingPad::new();
        let handle = MapperHandle::new(portal.clone(), share(Box::new(pad.clone())), None);
        let timings = DemoTimings {
            button_hold: Duration::ZERO,
            sweep_step: Duration::ZERO,
            trigger_hold: Duration::ZERO,
        };
        (dir, pad, MapperUi::new(portal, handle).with_demo_timings(timings))
    }

    fn run(ui: &mut MapperUi, input: &str) -> String {
        let mut console = Console::new(Cursor::new(input.as_bytes().to_vec()), Vec::new());
        ui.run(&mut console).unwrap();
        String::from_utf8(console.output().clone()).unwrap()
    }

    #[test]
    fn reset_and_exit() {
        let (_dir, pad, mut ui) = ui();
        let text = run(&mut ui, "3\n5\n");

        assert!(text.contains("1. Start keyboard and mouse mapping"));
        assert!(text.contains("Exiting..."));
        assert_eq!(pad.calls(), vec![PadCall::Reset, PadCall::Commit]);
    }

    #[test]
    fn demo_runs_from_menu() {
        let (_dir, pad, mut ui) = ui();
        run(&mut ui, "2\n5\n");
        assert!(pad.calls().contains(&PadCall::Trigger(Trigger::Right, 1.0)));
        assert!(pad.state().is_neutral());
    }

    #[test]
    fn start_without_backend_prints_controls_and_error() {
        let (_dir, _pad, mut ui) = ui();
        let text = run(&mut ui, "1\n5\n");

        assert!(text.contains("Controls:"));
        assert!(text.contains("Could not start mapping"));
    }

    #[test]
    fn end_of_input_exits_cleanly() {
        let (_dir, _pad, mut ui) = ui();
        let text = run(&mut ui, "4\n");
        assert!(text.contains("=== Configuration Menu ==="));
    }
}
