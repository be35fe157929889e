//! Error taxonomy of the translation engine.
//!
//! None of these is fatal to the process: configuration problems degrade the
//! affected action to "inactive", actuator failures skip one update and
//! lifecycle misuse is a logged no-op.

use crate::controller::virtual_pad::PadError;
use crate::input::InputError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapperError {
    /// Missing or invalid binding / setting
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Virtual controller call failed
    #[error("Actuator error: {0}")]
    Actuator(#[from] PadError),

    /// Double start, stop while idle, start while a previous loop is still draining
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    /// Physical input backend failed
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// Configuration document could not be written anywhere
    #[error("Persistence error: {0}")]
    Persistence(String),
}
