pub mod controller;
pub mod input;
pub mod mapping;
pub mod persistence;
pub mod ui;

use crate::controller::mapper_handle::MapperHandle;
use crate::controller::virtual_pad::{open_virtual_pad, share};
use crate::input::{default_backend, InputBackend};
use crate::persistence::config_portal::ConfigPortal;
use crate::persistence::config_store::ConfigStore;
use crate::ui::common::Console;
use crate::ui::MapperUi;
use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    setup()?;

    let store = ConfigStore::locate();
    let portal = Arc::new(ConfigPortal::open(store));

    // The only fatal error: without a virtual device there is nothing to drive
    let pad = open_virtual_pad().map_err(|e| {
        eyre!(
            "Failed to create virtual controller: {}. Make sure the virtual gamepad driver is available.",
            e
        )
    })?;
    let pad = share(pad);

    let backend: Option<Arc<dyn InputBackend>> = default_backend().map(Arc::from);
    let handle = MapperHandle::new(portal.clone(), pad, backend);

    let stdin = std::io::stdin();
    let mut console = Console::new(stdin.lock(), std::io::stdout());
    MapperUi::new(portal, handle).run(&mut console)?;

    info!("Shutting down");
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    // Menus own stdout
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}
