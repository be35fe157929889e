//! Mapper Handle - lifecycle of the background sampling thread
//!
//! At most one sampling thread exists at a time. Liveness is the `running`
//! flag combined with [`JoinHandle::is_finished`]: the thread clears the flag
//! through a drop guard on every exit path, including a panic.

use super::sampling_loop::{LoopSignals, SamplingLoop};
use super::virtual_pad::{lock, SharedPad};
use crate::input::{InputBackend, InputError};
use crate::mapping::MapperError;
use crate::persistence::config_portal::ConfigPortal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Bounded wait for the sampling thread in [`MapperHandle::stop`].
pub const JOIN_TIMEOUT: Duration = Duration::from_secs(1);

const JOIN_POLL: Duration = Duration::from_millis(5);

struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct MapperHandle {
    portal: Arc<ConfigPortal>,
    pad: SharedPad,
    backend: Option<Arc<dyn InputBackend>>,
    signals: LoopSignals,
    thread: Option<JoinHandle<()>>,
    join_timeout: Duration,
}

impl MapperHandle {
    pub fn new(
        portal: Arc<ConfigPortal>,
        pad: SharedPad,
        backend: Option<Arc<dyn InputBackend>>,
    ) -> Self {
        match &backend {
            Some(backend) => info!("Using input backend: {}", backend.name()),
            None => warn!("No input backend available, keyboard and mouse mapping is disabled"),
        }
        Self {
            portal,
            pad,
            backend,
            signals: LoopSignals::default(),
            thread: None,
            join_timeout: JOIN_TIMEOUT,
        }
    }

    pub fn pad(&self) -> &SharedPad {
        &self.pad
    }

    pub fn is_running(&self) -> bool {
        self.signals.running.load(Ordering::Acquire)
            && self
                .thread
                .as_ref()
                .is_some_and(|thread| !thread.is_finished())
    }

    /// Spawns the sampling thread. Starting twice is a logged no-op.
    pub fn start(&mut self) -> Result<(), MapperError> {
        if self.is_running() {
            warn!("Mapping is already running");
            return Ok(());
        }

        if let Some(thread) = self.thread.take() {
            if !thread.is_finished() {
                self.thread = Some(thread);
                return Err(MapperError::Lifecycle(
                    "previous sampling thread is still shutting down".to_string(),
                ));
            }
            if thread.join().is_err() {
                error!("Previous sampling thread panicked");
            }
        }

        let backend = self
            .backend
            .clone()
            .ok_or(MapperError::Input(InputError::Unsupported(
                "no input backend compiled in, enable the `desktop` feature",
            )))?;

        self.signals.running.store(true, Ordering::Release);
        self.signals.reset_requested.store(false, Ordering::Release);

        let config = self.portal.subscribe();
        let pad = self.pad.clone();
        let signals = self.signals.clone();

        let spawned = std::thread::Builder::new()
            .name("sampling-loop".to_string())
            .spawn(move || {
                let _guard = RunningGuard(signals.running.clone());

                let input = match backend.open() {
                    Ok(input) => input,
                    Err(e) => {
                        error!("Failed to open input backend {}: {}", backend.name(), e);
                        return;
                    }
                };

                let _ = SamplingLoop::create(config, pad, input, signals)
                    .activate()
                    .run_until_stopped()
                    .shutdown();
            });

        match spawned {
            Ok(thread) => {
                debug!("Spawned sampling thread {:?}", thread.thread().id());
                self.thread = Some(thread);
                info!("Keyboard and mouse mapping started");
                Ok(())
            }
            Err(e) => {
                self.signals.running.store(false, Ordering::Release);
                Err(MapperError::Lifecycle(format!(
                    "failed to spawn sampling thread: {e}"
                )))
            }
        }
    }

    /// Stops the sampling thread and leaves the pad neutral. Stopping an idle
    /// mapper is a no-op.
    pub fn stop(&mut self) -> Result<(), MapperError> {
        let Some(thread) = self.thread.take() else {
            debug!("Stop requested but mapping is not running");
            return Ok(());
        };

        self.signals.running.store(false, Ordering::Release);

        let deadline = Instant::now() + self.join_timeout;
        while !thread.is_finished() && Instant::now() < deadline {
            std::thread::sleep(JOIN_POLL);
        }

        if thread.is_finished() {
            if thread.join().is_err() {
                error!("Sampling thread panicked");
            }
        } else {
            warn!(
                "Sampling thread did not stop within {:?}, continuing without it",
                self.join_timeout
            );
            self.thread = Some(thread);
        }

        let mut pad = lock(&self.pad)?;
        pad.reset()?;
        pad.commit()?;

        info!("Keyboard and mouse mapping stopped");
        Ok(())
    }

    /// Neutral pad now; a running loop also clears its own runtime state.
    pub fn reset(&self) -> Result<(), MapperError> {
        if self.is_running() {
            self.signals.reset_requested.store(true, Ordering::Release);
        }
        let mut pad = lock(&self.pad)?;
        pad.reset()?;
        pad.commit()?;
        info!("Controller reset");
        Ok(())
    }
}

impl Drop for MapperHandle {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("Failed to stop mapping on shutdown: {}", e);
        }
    }
}
