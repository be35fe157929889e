//! DualShock 4 shaped virtual device on Linux `/dev/uinput`.
//!
//! Update calls only queue events; [`VirtualController::commit`] emits them in
//! one batch terminated by a `SYN_REPORT`.

use super::virtual_pad::{
    DpadDirection, PadButton, PadError, PadState, SpecialButton, Trigger, VirtualController,
};
use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AbsInfo, AbsoluteAxisType, AttributeSet, EventType, InputEvent, Key, UinputAbsSetup};
use tracing::{debug, info};

const DEVICE_NAME: &str = "kbmpad virtual DualShock 4";
const STICK_MIN: i32 = 0;
const STICK_MAX: i32 = 255;
const TRIGGER_MAX: i32 = 255;

pub struct UinputPad {
    device: VirtualDevice,
    pending: Vec<InputEvent>,
    state: PadState,
}

impl UinputPad {
    pub fn create() -> Result<Self, PadError> {
        let mut keys = AttributeSet::<Key>::new();
        for key in [
            Key::BTN_SOUTH,
            Key::BTN_EAST,
            Key::BTN_WEST,
            Key::BTN_NORTH,
            Key::BTN_TL,
            Key::BTN_TR,
            Key::BTN_TL2,
            Key::BTN_TR2,
            Key::BTN_THUMBL,
            Key::BTN_THUMBR,
            Key::BTN_SELECT,
            Key::BTN_START,
            Key::BTN_MODE,
            Key::BTN_TOUCH,
        ] {
            keys.insert(key);
        }

        let stick = AbsInfo::new(128, STICK_MIN, STICK_MAX, 0, 0, 0);
        let trigger = AbsInfo::new(0, 0, TRIGGER_MAX, 0, 0, 0);
        let hat = AbsInfo::new(0, -1, 1, 0, 0, 0);

        let device = VirtualDeviceBuilder::new()
            .map_err(|e| PadError::Unavailable(format!("cannot open /dev/uinput: {e}")))?
            .name(DEVICE_NAME)
            .with_keys(&keys)?
            .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisType::ABS_X, stick))?
            .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisType::ABS_Y, stick))?
            .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisType::ABS_RX, stick))?
            .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisType::ABS_RY, stick))?
            .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisType::ABS_Z, trigger))?
            .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisType::ABS_RZ, trigger))?
            .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisType::ABS_HAT0X, hat))?
            .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisType::ABS_HAT0Y, hat))?
            .build()?;

        info!("Created uinput device '{}'", DEVICE_NAME);
        Ok(Self {
            device,
            pending: Vec::new(),
            state: PadState::default(),
        })
    }

    fn key(&mut self, key: Key, pressed: bool) {
        self.pending
            .push(InputEvent::new(EventType::KEY, key.code(), i32::from(pressed)));
    }

    fn abs(&mut self, axis: AbsoluteAxisType, value: i32) {
        self.pending
            .push(InputEvent::new(EventType::ABSOLUTE, axis.0, value));
    }
}

fn button_key(button: PadButton) -> Key {
    match button {
        PadButton::Cross => Key::BTN_SOUTH,
        PadButton::Circle => Key::BTN_EAST,
        PadButton::Square => Key::BTN_WEST,
        PadButton::Triangle => Key::BTN_NORTH,
        PadButton::ShoulderLeft => Key::BTN_TL,
        PadButton::ShoulderRight => Key::BTN_TR,
        PadButton::ThumbLeft => Key::BTN_THUMBL,
        PadButton::ThumbRight => Key::BTN_THUMBR,
        PadButton::Share => Key::BTN_SELECT,
        PadButton::Options => Key::BTN_START,
    }
}

fn special_key(button: SpecialButton) -> Key {
    match button {
        SpecialButton::Touchpad => Key::BTN_TOUCH,
        SpecialButton::Ps => Key::BTN_MODE,
    }
}

/// `[-1, 1]` to the 0..=255 DualShock axis range, 128 is center.
fn stick_axis(value: f32) -> i32 {
    let scaled = (value.clamp(-1.0, 1.0) + 1.0) * 0.5 * STICK_MAX as f32;
    scaled.round() as i32
}

fn trigger_axis(value: f32) -> i32 {
    (value.clamp(0.0, 1.0) * TRIGGER_MAX as f32).round() as i32
}

fn hat_axes(direction: DpadDirection) -> (i32, i32) {
    match direction {
        DpadDirection::None => (0, 0),
        DpadDirection::North => (0, -1),
        DpadDirection::South => (0, 1),
        DpadDirection::East => (1, 0),
        DpadDirection::West => (-1, 0),
    }
}

impl VirtualController for UinputPad {
    fn set_button(&mut self, button: PadButton, pressed: bool) -> Result<(), PadError> {
        self.state.set_button(button, pressed);
        self.key(button_key(button), pressed);
        Ok(())
    }

    fn set_special_button(
        &mut self,
        button: SpecialButton,
        pressed: bool,
    ) -> Result<(), PadError> {
        self.state.set_special_button(button, pressed);
        self.key(special_key(button), pressed);
        Ok(())
    }

    fn set_left_stick(&mut self, x: f32, y: f32) -> Result<(), PadError> {
        self.state.left_stick = (x, y);
        self.abs(AbsoluteAxisType::ABS_X, stick_axis(x));
        self.abs(AbsoluteAxisType::ABS_Y, stick_axis(y));
        Ok(())
    }

    fn set_right_stick(&mut self, x: f32, y: f32) -> Result<(), PadError> {
        self.state.right_stick = (x, y);
        self.abs(AbsoluteAxisType::ABS_RX, stick_axis(x));
        self.abs(AbsoluteAxisType::ABS_RY, stick_axis(y));
        Ok(())
    }

    fn set_trigger(&mut self, trigger: Trigger, value: f32) -> Result<(), PadError> {
        self.state.set_trigger(trigger, value);
        let (axis, key) = match trigger {
            Trigger::Left => (AbsoluteAxisType::ABS_Z, Key::BTN_TL2),
            Trigger::Right => (AbsoluteAxisType::ABS_RZ, Key::BTN_TR2),
        };
        self.abs(axis, trigger_axis(value));
        self.key(key, value > 0.0);
        Ok(())
    }

    fn set_dpad(&mut self, direction: DpadDirection) -> Result<(), PadError> {
        self.state.dpad = direction;
        let (x, y) = hat_axes(direction);
        self.abs(AbsoluteAxisType::ABS_HAT0X, x);
        self.abs(AbsoluteAxisType::ABS_HAT0Y, y);
        Ok(())
    }

    fn reset(&mut self) -> Result<(), PadError> {
        let previous = std::mem::take(&mut self.state);
        for button in previous.buttons {
            self.key(button_key(button), false);
        }
        for button in previous.specials {
            self.key(special_key(button), false);
        }
        self.set_left_stick(0.0, 0.0)?;
        self.set_right_stick(0.0, 0.0)?;
        self.set_trigger(Trigger::Left, 0.0)?;
        self.set_trigger(Trigger::Right, 0.0)?;
        self.set_dpad(DpadDirection::None)
    }

    fn commit(&mut self) -> Result<(), PadError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let events = std::mem::take(&mut self.pending);
        debug!("Emitting {} uinput events", events.len());
        self.device.emit(&events)?;
        Ok(())
    }
}
