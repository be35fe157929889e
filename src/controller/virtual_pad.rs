//! Virtual Controller Adapter
//!
//! The emulated device is an opaque actuator behind [`VirtualController`]. The
//! core only ever writes to it: every update call is followed by an explicit
//! [`VirtualController::commit`] that pushes the composed state to the device.
//!
//! Backends:
//! - [`TracingPad`]: dry-run pad that logs every committed state change
//! - `UinputPad` (Linux, feature `uinput`): DualShock 4 layout on `/dev/uinput`

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum PadError {
    #[error("Virtual controller unavailable: {0}")]
    Unavailable(String),

    #[error("Virtual controller I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Virtual controller lock poisoned")]
    Poisoned,
}

/// Regular digital buttons of the DualShock 4 profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PadButton {
    Cross,
    Circle,
    Square,
    Triangle,
    ShoulderLeft,
    ShoulderRight,
    ThumbLeft,
    ThumbRight,
    Share,
    Options,
}

/// Buttons that take a separate call path on the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpecialButton {
    Touchpad,
    Ps,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Trigger {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DpadDirection {
    #[default]
    None,
    North,
    South,
    East,
    West,
}

pub trait VirtualController: Send {
    fn set_button(&mut self, button: PadButton, pressed: bool) -> Result<(), PadError>;

    fn set_special_button(&mut self, button: SpecialButton, pressed: bool)
        -> Result<(), PadError>;

    /// Both axes in `[-1, 1]`
    fn set_left_stick(&mut self, x: f32, y: f32) -> Result<(), PadError>;

    /// Both axes in `[-1, 1]`
    fn set_right_stick(&mut self, x: f32, y: f32) -> Result<(), PadError>;

    /// Value in `[0, 1]`
    fn set_trigger(&mut self, trigger: Trigger, value: f32) -> Result<(), PadError>;

    fn set_dpad(&mut self, direction: DpadDirection) -> Result<(), PadError>;

    /// Neutral sticks, released buttons and triggers, centered d-pad.
    fn reset(&mut self) -> Result<(), PadError>;

    fn commit(&mut self) -> Result<(), PadError>;
}

/// Pad shared between the menu thread and the sampling thread.
pub type SharedPad = Arc<Mutex<Box<dyn VirtualController>>>;

pub fn share(pad: Box<dyn VirtualController>) -> SharedPad {
    Arc::new(Mutex::new(pad))
}

pub fn lock(pad: &SharedPad) -> Result<MutexGuard<'_, Box<dyn VirtualController>>, PadError> {
    pad.lock().map_err(|_| PadError::Poisoned)
}

/// Composed device state as last written.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PadState {
    pub buttons: BTreeSet<PadButton>,
    pub specials: BTreeSet<SpecialButton>,
    pub left_stick: (f32, f32),
    pub right_stick: (f32, f32),
    pub left_trigger: f32,
    pub right_trigger: f32,
    pub dpad: DpadDirection,
}

impl PadState {
    pub fn set_button(&mut self, button: PadButton, pressed: bool) {
        if pressed {
            self.buttons.insert(button);
        } else {
            self.buttons.remove(&button);
        }
    }

    pub fn set_special_button(&mut self, button: SpecialButton, pressed: bool) {
        if pressed {
            self.specials.insert(button);
        } else {
            self.specials.remove(&button);
        }
    }

    pub fn set_trigger(&mut self, trigger: Trigger, value: f32) {
        let value = value.clamp(0.0, 1.0);
        match trigger {
            Trigger::Left => self.left_trigger = value,
            Trigger::Right => self.right_trigger = value,
        }
    }

    pub fn is_neutral(&self) -> bool {
        *self == PadState::default()
    }
}

/// Dry-run backend: keeps the composed state and logs it on every change.
#[derive(Debug, Default)]
pub struct TracingPad {
    pending: PadState,
    committed: PadState,
}

impl TracingPad {
    pub fn new() -> Self {
        info!("Using dry-run virtual controller, committed states are logged at debug level");
        Self::default()
    }

    pub fn committed(&self) -> &PadState {
        &self.committed
    }
}

impl VirtualController for TracingPad {
    fn set_button(&mut self, button: PadButton, pressed: bool) -> Result<(), PadError> {
        self.pending.set_button(button, pressed);
        Ok(())
    }

    fn set_special_button(
        &mut self,
        button: SpecialButton,
        pressed: bool,
    ) -> Result<(), PadError> {
        self.pending.set_special_button(button, pressed);
        Ok(())
    }

    fn set_left_stick(&mut self, x: f32, y: f32) -> Result<(), PadError> {
        self.pending.left_stick = (x.clamp(-1.0, 1.0), y.clamp(-1.0, 1.0));
        Ok(())
    }

    fn set_right_stick(&mut self, x: f32, y: f32) -> Result<(), PadError> {
        self.pending.right_stick = (x.clamp(-1.0, 1.0), y.clamp(-1.0, 1.0));
        Ok(())
    }

    fn set_trigger(&mut self, trigger: Trigger, value: f32) -> Result<(), PadError> {
        self.pending.set_trigger(trigger, value);
        Ok(())
    }

    fn set_dpad(&mut self, direction: DpadDirection) -> Result<(), PadError> {
        self.pending.dpad = direction;
        Ok(())
    }

    fn reset(&mut self) -> Result<(), PadError> {
        self.pending = PadState::default();
        Ok(())
    }

    fn commit(&mut self) -> Result<(), PadError> {
        if self.pending != self.committed {
            debug!("Virtual controller state: {:?}", self.pending);
            self.committed = self.pending.clone();
        }
        Ok(())
    }
}

/// Creates the virtual device. Failure here is the one unrecoverable error.
pub fn open_virtual_pad() -> Result<Box<dyn VirtualController>, PadError> {
    #[cfg(all(target_os = "linux", feature = "uinput"))]
    {
        let pad = super::uinput_pad::UinputPad::create()?;
        info!("DualShock 4 controller emulated successfully!");
        Ok(Box::new(pad))
    }
    #[cfg(not(all(target_os = "linux", feature = "uinput")))]
    {
        Ok(Box::new(TracingPad::new()))
    }
}

#[cfg(test)]
pub mod testing {
    //! Recording pad for assertions on the exact call sequence.

    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    pub enum PadCall {
        Button(PadButton, bool),
        Special(SpecialButton, bool),
        LeftStick(f32, f32),
        RightStick(f32, f32),
        Trigger(Trigger, f32),
        Dpad(DpadDirection),
        Reset,
        Commit,
    }

    #[derive(Debug, Default)]
    pub struct Recording {
        pub calls: Vec<PadCall>,
        pub state: PadState,
        pub fail_all: bool,
    }

    #[derive(Clone, Default)]
    pub struct RecordingPad {
        pub recording: Arc<Mutex<Recording>>,
    }

    impl RecordingPad {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<PadCall> {
            self.recording.lock().unwrap().calls.clone()
        }

        pub fn state(&self) -> PadState {
            self.recording.lock().unwrap().state.clone()
        }

        pub fn clear(&self) {
            self.recording.lock().unwrap().calls.clear();
        }

        pub fn set_failing(&self, fail: bool) {
            self.recording.lock().unwrap().fail_all = fail;
        }

        fn record(&self, call: PadCall) -> Result<(), PadError> {
            let mut recording = self.recording.lock().unwrap();
            if recording.fail_all {
                return Err(PadError::Unavailable("recording pad set to fail".into()));
            }
            match &call {
                PadCall::Button(b, p) => recording.state.set_button(*b, *p),
                PadCall::Special(b, p) => recording.state.set_special_button(*b, *p),
                PadCall::LeftStick(x, y) => recording.state.left_stick = (*x, *y),
                PadCall::RightStick(x, y) => recording.state.right_stick = (*x, *y),
                PadCall::Trigger(t, v) => recording.state.set_trigger(*t, *v),
                PadCall::Dpad(d) => recording.state.dpad = *d,
                PadCall::Reset => recording.state = PadState::default(),
                PadCall::Commit => {}
            }
            recording.calls.push(call);
            Ok(())
        }
    }

    impl VirtualController for RecordingPad {
        fn set_button(&mut self, button: PadButton, pressed: bool) -> Result<(), PadError> {
            self.record(PadCall::Button(button, pressed))
        }

        fn set_special_button(
            &mut self,
            button: SpecialButton,
            pressed: bool,
        ) -> Result<(), PadError> {
            self.record(PadCall::Special(button, pressed))
        }

        fn set_left_stick(&mut self, x: f32, y: f32) -> Result<(), PadError> {
            self.record(PadCall::LeftStick(x, y))
        }

        fn set_right_stick(&mut self, x: f32, y: f32) -> Result<(), PadError> {
            self.record(PadCall::RightStick(x, y))
        }

        fn set_trigger(&mut self, trigger: Trigger, value: f32) -> Result<(), PadError> {
            self.record(PadCall::Trigger(trigger, value))
        }

        fn set_dpad(&mut self, direction: DpadDirection) -> Result<(), PadError> {
            self.record(PadCall::Dpad(direction))
        }

        fn reset(&mut self) -> Result<(), PadError> {
            self.record(PadCall::Reset)
        }

        fn commit(&mut self) -> Result<(), PadError> {
            self.record(PadCall::Commit)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracing_pad_commits_composed_state() {
        let mut pad = TracingPad::default();
        pad.set_button(PadButton::Cross, true).unwrap();
        pad.set_trigger(Trigger::Right, 3.0).unwrap();
        pad.set_dpad(DpadDirection::West).unwrap();
        assert!(pad.committed().is_neutral());

        pad.commit().unwrap();
        let state = pad.committed();
        assert!(state.buttons.contains(&PadButton::Cross));
        assert_eq!(state.right_trigger, 1.0);
        assert_eq!(state.dpad, DpadDirection::West);

        pad.reset().unwrap();
        pad.commit().unwrap();
        assert!(pad.committed().is_neutral());
    }

    #[test]
    fn shared_pad_lock_works_across_clones() {
        let pad = share(Box::new(TracingPad::default()));
        let other = pad.clone();
        lock(&pad).unwrap().set_left_stick(0.5, -0.5).unwrap();
        lock(&other).unwrap().commit().unwrap();
    }
}
