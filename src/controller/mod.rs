//! Virtual controller side of the mapper
//!
//! 1. [`virtual_pad`] - actuator trait, pad enums and the dry-run pad
//! 2. [`sampling_loop`] - fixed-order tick driving the pad
//! 3. [`mapper_handle`] - start/stop of the background sampling thread
//! 4. [`demo`] - scripted pad exercise
//!
//! # Architecture
//!
//! ```text
//! InputSource ──► SamplingLoop ──► VirtualController ──► emulated DualShock 4
//!                     ▲
//!            MapperHandle (menu thread)
//! ```

pub mod demo;
pub mod mapper_handle;
pub mod sampling_loop;
#[cfg(all(target_os = "linux", feature = "uinput"))]
pub mod uinput_pad;
pub mod virtual_pad;
