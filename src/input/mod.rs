//! Physical input query capability.
//!
//! Backends are best-effort: a failing query surfaces as an [`InputError`] and
//! the resolver maps it to "not pressed" for that one action. A backend is
//! opened on the sampling thread itself through an [`InputBackend`], so the
//! source does not need to be `Send`.

#[cfg(feature = "desktop")]
pub mod desktop;
#[cfg(all(target_os = "linux", feature = "desktop"))]
pub mod x11_cursor;

use crate::mapping::input_id::PointerButton;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("Operation not supported by this input backend: {0}")]
    Unsupported(&'static str),

    #[error("Unknown key name: {0}")]
    UnknownKey(String),

    #[error("Input backend failure: {0}")]
    Backend(String),
}

/// Keyboard and pointer state as seen by one sampling thread.
pub trait InputSource {
    /// Samples the device once; called at the start of every tick.
    fn refresh(&mut self) -> Result<(), InputError> {
        Ok(())
    }

    fn is_key_pressed(&mut self, key: &str) -> Result<bool, InputError>;

    fn is_pointer_pressed(&mut self, button: PointerButton) -> Result<bool, InputError>;

    fn pointer_position(&mut self) -> Result<(i32, i32), InputError>;

    fn screen_center(&mut self) -> Result<(i32, i32), InputError>;

    fn set_pointer_position(&mut self, position: (i32, i32)) -> Result<(), InputError>;

    fn set_cursor_visible(&mut self, visible: bool) -> Result<(), InputError>;
}

/// Opens an [`InputSource`] on the calling thread.
pub trait InputBackend: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn open(&self) -> Result<Box<dyn InputSource>, InputError>;
}

/// Backend selected at compile time, if any.
pub fn default_backend() -> Option<Box<dyn InputBackend>> {
    #[cfg(feature = "desktop")]
    {
        Some(Box::new(desktop::DesktopBackend))
    }
    #[cfg(not(feature = "desktop"))]
    {
        None
    }
}
