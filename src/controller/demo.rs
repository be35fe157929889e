//! Scripted sequence that exercises the virtual pad without any physical input.

use super::virtual_pad::{lock, PadButton, PadError, SharedPad, Trigger, VirtualController};
use std::time::Duration;
use tracing::{error, info};

/// Left stick sweep: right, down, left, up.
const SWEEP: [(f32, f32); 4] = [(1.0, 0.0), (0.0, 1.0), (-1.0, 0.0), (0.0, -1.0)];

#[derive(Clone, Debug)]
pub struct DemoTimings {
    pub button_hold: Duration,
    pub sweep_step: Duration,
    pub trigger_hold: Duration,
}

impl Default for DemoTimings {
    fn default() -> Self {
        Self {
            button_hold: Duration::from_millis(500),
            sweep_step: Duration::from_secs(1),
            trigger_hold: Duration::from_millis(500),
        }
    }
}

fn step<F>(pad: &SharedPad, update: F, hold: Duration) -> Result<(), PadError>
where
    F: FnOnce(&mut dyn VirtualController) -> Result<(), PadError>,
{
    {
        let mut pad = lock(pad)?;
        update(&mut **pad)?;
        pad.commit()?;
    }
    std::thread::sleep(hold);
    Ok(())
}

fn sequence(pad: &SharedPad, timings: &DemoTimings) -> Result<(), PadError> {
    step(pad, |p| p.set_button(PadButton::Cross, true), timings.button_hold)?;
    step(pad, |p| p.set_button(PadButton::Cross, false), Duration::ZERO)?;

    info!("Moving left joystick...");
    for (x, y) in SWEEP {
        step(pad, |p| p.set_left_stick(x, y), timings.sweep_step)?;
    }

    info!("Testing triggers...");
    step(pad, |p| p.set_trigger(Trigger::Left, 1.0), timings.trigger_hold)?;
    step(pad, |p| p.set_trigger(Trigger::Right, 1.0), timings.trigger_hold)?;

    step(pad, |p| p.reset(), Duration::ZERO)
}

pub fn run_demo(pad: &SharedPad, timings: &DemoTimings) -> Result<(), PadError> {
    info!("Running demo sequence...");
    match sequence(pad, timings) {
        Ok(()) => {
            info!("Demo sequence completed!");
            Ok(())
        }
        Err(e) => {
            error!("Demo sequence failed: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::virtual_pad::share;
    use crate::controller::virtual_pad::testing::{PadCall, RecordingPad};

    fn instant() -> DemoTimings {
        DemoTimings {
            button_hold: Duration::ZERO,
            sweep_step: Duration::ZERO,
            trigger_hold: Duration::ZERO,
        }
    }

    #[test]
    fn demo_plays_full_sequence_and_ends_neutral() {
        let recording = RecordingPad::new();
        let pad = share(Box::new(recording.clone()));

        run_demo(&pad, &instant()).unwrap();

        let updates: Vec<PadCall> = recording
            .calls()
            .into_iter()
            .filter(|c| *c != PadCall::Commit)
            .collect();
        assert_eq!(
            updates,
            vec![
                PadCall::Button(PadButton::Cross, true),
                PadCall::Button(PadButton::Cross, false),
                PadCall::LeftStick(1.0, 0.0),
                PadCall::LeftStick(0.0, 1.0),
                PadCall::LeftStick(-1.0, 0.0),
                PadCall::LeftStick(0.0, -1.0),
                PadCall::Trigger(Trigger::Left, 1.0),
                PadCall::Trigger(Trigger::Right, 1.0),
                PadCall::Reset,
            ]
        );
        assert!(recording.state().is_neutral());
    }

    #[test]
    fn demo_stops_at_first_failure() {
        let recording = RecordingPad::new();
        recording.set_failing(true);
        let pad = share(Box::new(recording.clone()));

        assert!(run_demo(&pad, &instant()).is_err());
        assert!(recording.calls().is_empty());
    }
}
