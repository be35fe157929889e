//! Pointer warping and cursor visibility on X11.
//!
//! `device_query` only reads state, so the desktop backend keeps a second
//! connection for the writes: `WarpPointer` on the root window, screen size
//! from the connection setup, and XFixes to hide the cursor. XFixes hiding is
//! tied to this connection, so dropping it brings the cursor back.

use super::InputError;
use tracing::{debug, warn};
use x11rb::connection::Connection;
use x11rb::protocol::xfixes::ConnectionExt as _;
use x11rb::protocol::xproto::{ConnectionExt as _, Window};
use x11rb::rust_connection::RustConnection;

pub struct X11Cursor {
    conn: RustConnection,
    root: Window,
    width: u16,
    height: u16,
    xfixes: bool,
    hidden: bool,
}

impl X11Cursor {
    pub fn connect() -> Result<Self, InputError> {
        let (conn, screen_num) = x11rb::connect(None).map_err(backend_error)?;
        let screen = conn
            .setup()
            .roots
            .get(screen_num)
            .ok_or_else(|| InputError::Backend(format!("X11 screen {screen_num} not found")))?;
        let (root, width, height) = (screen.root, screen.width_in_pixels, screen.height_in_pixels);

        // Hide/show need the extension negotiated at version 4 or later
        let xfixes = match conn.xfixes_query_version(4, 0) {
            Ok(cookie) => match cookie.reply() {
                Ok(reply) => reply.major_version >= 4,
                Err(e) => {
                    warn!("XFixes unavailable, cursor hiding disabled: {}", e);
                    false
                }
            },
            Err(e) => {
                warn!("XFixes unavailable, cursor hiding disabled: {}", e);
                false
            }
        };

        debug!("X11 cursor control on {}x{} screen (xfixes {})", width, height, xfixes);
        Ok(Self {
            conn,
            root,
            width,
            height,
            xfixes,
            hidden: false,
        })
    }

    pub fn screen_center(&self) -> (i32, i32) {
        center_of(self.width, self.height)
    }

    pub fn warp(&self, position: (i32, i32)) -> Result<(), InputError> {
        let (x, y) = to_root_coords(position);
        self.conn
            .warp_pointer(x11rb::NONE, self.root, 0, 0, 0, 0, x, y)
            .map_err(backend_error)?;
        self.conn.flush().map_err(backend_error)
    }

    pub fn set_visible(&mut self, visible: bool) -> Result<(), InputError> {
        if !self.xfixes {
            return Err(InputError::Unsupported("cursor visibility without XFixes"));
        }
        if visible == !self.hidden {
            return Ok(());
        }

        if visible {
            self.conn.xfixes_show_cursor(self.root).map_err(backend_error)?;
        } else {
            self.conn.xfixes_hide_cursor(self.root).map_err(backend_error)?;
        }
        self.conn.flush().map_err(backend_error)?;
        self.hidden = !visible;
        Ok(())
    }
}

impl Drop for X11Cursor {
    fn drop(&mut self) {
        if self.hidden {
            if let Err(e) = self.set_visible(true) {
                warn!("Could not restore cursor on disconnect: {}", e);
            }
        }
    }
}

fn backend_error(e: impl std::fmt::Display) -> InputError {
    InputError::Backend(format!("X11: {e}"))
}

fn center_of(width: u16, height: u16) -> (i32, i32) {
    (i32::from(width) / 2, i32::from(height) / 2)
}

fn to_root_coords((x, y): (i32, i32)) -> (i16, i16) {
    let clamp = |v: i32| v.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;
    (clamp(x), clamp(y))
}
