//! Sampling loop with statum state machine
//!
//! One tick runs, in fixed order:
//!
//! ```text
//! movement ──► left stick
//! pointer  ──► [motion filter] ──► right stick ──► (recenter)
//! d-pad    ──► only sent when the direction changed
//! buttons  ──► every button and trigger, every tick
//! exit key ──► stop
//! ```
//!
//! # State Machine
//!
//! ```text
//! Idle ──activate──► Running ──run_until_stopped──► Stopping ──shutdown──► Idle
//! ```
//!
//! The loop owns its [`RuntimeState`]; the only ways in from outside are the
//! `running` flag, the reset request flag and configuration snapshots.

use super::virtual_pad::{lock, DpadDirection, PadError, SharedPad, VirtualController};
use crate::input::InputSource;
use crate::mapping::motion_filter::{filter_motion, FilterParams, MotionState};
use crate::mapping::resolver::{ButtonCommand, DigitalResolver, ResolveFault};
use crate::mapping::{InputId, RateLimiter};
use crate::persistence::MapperConfig;
use statum::{machine, state};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Hard-wired key that ends the mapping from the keyboard.
pub const EXIT_KEY: &str = "'";

const STATS_INTERVAL: Duration = Duration::from_secs(10);
const LOG_INTERVAL_MS: u64 = 5000;

#[state]
#[derive(Debug, Clone)]
pub enum LoopState {
    Idle,
    Running,
    Stopping,
}

/// Flags shared with the controlling thread.
#[derive(Clone, Debug, Default)]
pub struct LoopSignals {
    pub running: Arc<AtomicBool>,
    pub reset_requested: Arc<AtomicBool>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RuntimeState {
    pub motion: MotionState,
    /// Last direction sent to the pad
    pub current_dpad: DpadDirection,
}

impl RuntimeState {
    pub fn reset(&mut self) {
        self.motion.reset();
        self.current_dpad = DpadDirection::None;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    ExitRequested,
}

pub struct LogLimits {
    binding: RateLimiter,
    input: RateLimiter,
    pad: RateLimiter,
    recenter: RateLimiter,
}

impl Default for LogLimits {
    fn default() -> Self {
        Self {
            binding: RateLimiter::new(LOG_INTERVAL_MS),
            input: RateLimiter::new(LOG_INTERVAL_MS),
            pad: RateLimiter::new(LOG_INTERVAL_MS),
            recenter: RateLimiter::new(LOG_INTERVAL_MS),
        }
    }
}

fn suppressed_note(suppressed: u64) -> String {
    if suppressed > 0 {
        format!(" ({suppressed} similar messages suppressed)")
    } else {
        String::new()
    }
}

#[machine]
pub struct SamplingLoop<S: LoopState> {
    config: watch::Receiver<Arc<MapperConfig>>,
    pad: SharedPad,
    input: Box<dyn InputSource>,
    signals: LoopSignals,
    runtime: RuntimeState,
    cursor_hidden: bool,
    limits: LogLimits,
    ticks: u64,
}

impl<S: LoopState> SamplingLoop<S> {
    pub fn runtime(&self) -> &RuntimeState {
        &self.runtime
    }

    fn pad_call<F>(&mut self, what: &str, call: F) -> bool
    where
        F: FnOnce(&mut dyn VirtualController) -> Result<(), PadError>,
    {
        let result = lock(&self.pad).and_then(|mut pad| {
            call(&mut **pad)?;
            pad.commit()
        });
        match result {
            Ok(()) => true,
            Err(e) => {
                if let Some(suppressed) = self.limits.pad.should_log(Instant::now()) {
                    error!(
                        "Virtual controller {} failed: {}{}",
                        what,
                        e,
                        suppressed_note(suppressed)
                    );
                }
                false
            }
        }
    }

    fn report_faults(&mut self, faults: Vec<ResolveFault>) {
        for fault in faults {
            match fault {
                ResolveFault::MissingBinding(action) => {
                    if let Some(suppressed) = self.limits.binding.should_log(Instant::now()) {
                        warn!(
                            "{} is not bound, treating as not pressed{}",
                            action,
                            suppressed_note(suppressed)
                        );
                    }
                }
                ResolveFault::Query { input, error } => {
                    if let Some(suppressed) = self.limits.input.should_log(Instant::now()) {
                        warn!(
                            "Input query for '{}' failed, treating as not pressed: {}{}",
                            input,
                            error,
                            suppressed_note(suppressed)
                        );
                    }
                }
            }
        }
    }

    /// Moves the pointer to the screen midpoint and latches it.
    fn recenter(&mut self) -> bool {
        let result = self
            .input
            .screen_center()
            .and_then(|center| self.input.set_pointer_position(center).map(|_| center));
        match result {
            Ok(center) => {
                self.runtime.motion.latch(center);
                true
            }
            Err(e) => {
                if let Some(suppressed) = self.limits.recenter.should_log(Instant::now()) {
                    warn!(
                        "Pointer recentering unavailable, using absolute motion: {}{}",
                        e,
                        suppressed_note(suppressed)
                    );
                }
                false
            }
        }
    }
}

impl SamplingLoop<Idle> {
    pub fn create(
        config: watch::Receiver<Arc<MapperConfig>>,
        pad: SharedPad,
        input: Box<dyn InputSource>,
        signals: LoopSignals,
    ) -> Self {
        debug!("Creating sampling loop");
        Self::new(
            config,
            pad,
            input,
            signals,
            RuntimeState::default(), // runtime
            false,                   // cursor_hidden
            LogLimits::default(),    // limits
            0,                       // ticks
        )
    }

    /// Centres the pointer (in either mouse mode), latches the starting
    /// position and hides the cursor if asked to.
    pub fn activate(mut self) -> SamplingLoop<Running> {
        let config = self.config.borrow_and_update().clone();
        self.runtime = RuntimeState::default();

        if let Err(e) = self.input.refresh() {
            warn!("Initial input refresh failed: {}", e);
        }

        if !self.recenter() {
            match self.input.pointer_position() {
                Ok(position) => self.runtime.motion.latch(position),
                Err(e) => warn!("Could not read pointer position: {}", e),
            }
        }

        if config.settings.hide_cursor {
            match self.input.set_cursor_visible(false) {
                Ok(()) => self.cursor_hidden = true,
                Err(e) => warn!("Could not hide cursor: {}", e),
            }
        }

        info!(
            "Sampling loop active (poll interval {} us, relative mouse {})",
            config.settings.poll_interval_us, config.settings.relative_mouse_mode
        );
        self.transition()
    }
}

impl SamplingLoop<Running> {
    /// One pass over every input. Never fails: each problem disables only the
    /// affected action for this tick.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        self.ticks += 1;
        let config = self.config.borrow_and_update().clone();

        if self.signals.reset_requested.swap(false, Ordering::AcqRel) {
            debug!("Reset requested, clearing runtime state");
            self.runtime.reset();
        }

        if let Err(e) = self.input.refresh() {
            if let Some(suppressed) = self.limits.input.should_log(now) {
                warn!("Input refresh failed: {}{}", e, suppressed_note(suppressed));
            }
        }

        let keybinds = &config.keybinds;

        // Left stick from movement keys
        let (left, faults) = {
            let mut resolver = DigitalResolver::new(self.input.as_mut());
            let left = resolver.movement(&keybinds.movement);
            (left, resolver.into_faults())
        };
        self.report_faults(faults);
        self.pad_call("left stick update", |pad| pad.set_left_stick(left.x, left.y));

        // Right stick from pointer motion
        match self.input.pointer_position() {
            Ok(pointer) => {
                let params = FilterParams::from_settings(&config.settings);
                let (right, motion) = filter_motion(pointer, self.runtime.motion, &params, now);
                self.runtime.motion = motion;
                self.pad_call("right stick update", |pad| pad.set_right_stick(right.x, right.y));

                if config.settings.relative_mouse_mode {
                    self.recenter();
                }
            }
            Err(e) => {
                if let Some(suppressed) = self.limits.input.should_log(now) {
                    warn!("Pointer position unavailable: {}{}", e, suppressed_note(suppressed));
                }
            }
        }

        // D-pad, on change only
        let (direction, faults) = {
            let mut resolver = DigitalResolver::new(self.input.as_mut());
            let direction = resolver.dpad(keybinds);
            (direction, resolver.into_faults())
        };
        self.report_faults(faults);
        if direction != self.runtime.current_dpad
            && self.pad_call("d-pad update", |pad| pad.set_dpad(direction))
        {
            self.runtime.current_dpad = direction;
        }

        // Buttons and triggers, every tick
        let (commands, faults) = {
            let mut resolver = DigitalResolver::new(self.input.as_mut());
            let commands = resolver.buttons(keybinds);
            (commands, resolver.into_faults())
        };
        self.report_faults(faults);
        for command in commands {
            match command {
                ButtonCommand::Button(button, pressed) => {
                    self.pad_call("button update", |pad| pad.set_button(button, pressed))
                }
                ButtonCommand::Special(button, pressed) => self
                    .pad_call("special button update", |pad| {
                        pad.set_special_button(button, pressed)
                    }),
                ButtonCommand::Trigger(trigger, value) => {
                    self.pad_call("trigger update", |pad| pad.set_trigger(trigger, value))
                }
            };
        }

        let exit_pressed = {
            let mut resolver = DigitalResolver::new(self.input.as_mut());
            resolver.pressed(&InputId::parse(EXIT_KEY))
        };
        if exit_pressed {
            TickOutcome::ExitRequested
        } else {
            TickOutcome::Continue
        }
    }

    /// Ticks until the `running` flag is cleared or the exit key is pressed.
    pub fn run_until_stopped(mut self) -> SamplingLoop<Stopping> {
        info!("Starting sampling loop");
        let mut window_start = Instant::now();
        let mut window_ticks = self.ticks;

        while self.signals.running.load(Ordering::Acquire) {
            let now = Instant::now();
            if self.tick(now) == TickOutcome::ExitRequested {
                info!("Exit key pressed, stopping mapping");
                self.signals.running.store(false, Ordering::Release);
                break;
            }

            let elapsed = now.saturating_duration_since(window_start);
            if elapsed >= STATS_INTERVAL {
                info!(
                    "Sampling loop: {} ticks in the last {:.1}s",
                    self.ticks - window_ticks,
                    elapsed.as_secs_f64()
                );
                window_start = now;
                window_ticks = self.ticks;
            }

            let interval = self.config.borrow().settings.poll_interval_us;
            std::thread::sleep(Duration::from_micros(interval));
        }

        info!("Sampling loop stopped after {} ticks", self.ticks);
        self.transition()
    }
}

impl SamplingLoop<Stopping> {
    /// Restores the cursor, clears runtime state and leaves the pad neutral.
    pub fn shutdown(mut self) -> SamplingLoop<Idle> {
        if self.cursor_hidden {
            match self.input.set_cursor_visible(true) {
                Ok(()) => self.cursor_hidden = false,
                Err(e) => warn!("Could not restore cursor: {}", e),
            }
        }

        self.runtime.reset();
        self.pad_call("reset", |pad| pad.reset());

        debug!("Sampling loop shut down");
        self.transition()
    }
}
