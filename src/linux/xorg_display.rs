use crate::{Atom, TopMenuError, TopMenuResult, TrackedWindow, WindowSystem, backend::Watch};
use std::rc::Rc;
use tracing::debug;
use x11rb::{
    connection::Connection,
    protocol::xproto::{AtomEnum, ChangeWindowAttributesAux, ConnectionExt, EventMask},
    rust_connection::RustConnection,
};

/// Connection to the X server shared by the X11 capability implementations.
pub type SharedConnection = Rc<RustConnection>;

/// `WindowSystem` over an x11rb connection.
#[derive(Debug, Clone)]
pub struct XorgDisplay {
    conn: SharedConnection,
}

impl XorgDisplay {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

impl WindowSystem for XorgDisplay {
    fn intern_atom(&self, name: &str) -> TopMenuResult<Atom> {
        get_atom(&*self.conn, name.as_bytes())
    }

    fn select_changes(&self, window: TrackedWindow) -> TopMenuResult<Watch> {
        let conn = &*self.conn;
        let attrs = conn
            .get_window_attributes(window.id())
            .map_err(|e| TopMenuError::Platform(e.to_string()))?
            .reply()
            .map_err(|_| TopMenuError::WindowGone(window))?;

        let prior = attrs.your_event_mask;
        let mask = prior | EventMask::STRUCTURE_NOTIFY | EventMask::PROPERTY_CHANGE;
        if mask != prior {
            // Checked so that a window destroyed since the attribute query is
            // reported here rather than as a stray error event.
            conn.change_window_attributes(
                window.id(),
                &ChangeWindowAttributesAux::new().event_mask(mask),
            )
            .map_err(|e| TopMenuError::Platform(e.to_string()))?
            .check()
            .map_err(|_| TopMenuError::WindowGone(window))?;
        }

        Ok(Watch::new(u32::from(prior)))
    }

    fn restore_changes(&self, window: TrackedWindow, watch: Watch) {
        let result = self.conn.change_window_attributes(
            window.id(),
            &ChangeWindowAttributesAux::new().event_mask(EventMask::from(watch.prior_mask())),
        );
        if let Err(e) = result {
            debug!("Failed to stop watching window {}: {}", window, e);
        }
    }

    fn read_window_property(
        &self,
        window: TrackedWindow,
        property: Atom,
    ) -> Option<TrackedWindow> {
        read_window_property(&*self.conn, window.id(), property).unwrap_or_else(|e| {
            debug!("Failed to read property {} of window {}: {}", property, window, e);
            None
        })
    }
}

/// Connect to X11 server with proper error handling.
pub fn connect_to_x11() -> TopMenuResult<(RustConnection, usize)> {
    RustConnection::connect(None).map_err(|e| {
        let error_str = e.to_string();
        // Check if this is a "no display" error
        if error_str.contains("DISPLAY")
            || error_str.contains("display")
            || error_str.contains("No such file or directory")
        {
            TopMenuError::NoDisplay
        } else {
            TopMenuError::Platform(error_str)
        }
    })
}

/// Get an X11 atom by name.
pub fn get_atom<C: Connection>(conn: &C, name: &[u8]) -> TopMenuResult<Atom> {
    let cookie = conn
        .intern_atom(false, name)
        .map_err(|e| TopMenuError::Platform(e.to_string()))?;

    let reply = cookie
        .reply()
        .map_err(|e| TopMenuError::Platform(e.to_string()))?;

    Ok(reply.atom)
}

/// Read a single `WINDOW`-typed property value.
pub fn read_window_property<C: Connection>(
    conn: &C,
    window: u32,
    property: Atom,
) -> TopMenuResult<Option<TrackedWindow>> {
    let reply = conn
        .get_property(false, window, property, AtomEnum::WINDOW, 0, 1)
        .map_err(|e| TopMenuError::Platform(format!("Failed to get property: {e}")))?
        .reply()
        .map_err(|e| TopMenuError::Platform(format!("Failed to get property: {e}")))?;

    if reply.type_ != u32::from(AtomEnum::WINDOW) {
        return Ok(None);
    }

    Ok(reply
        .value32()
        .and_then(|mut v| v.next())
        .and_then(TrackedWindow::from_raw))
}

/// Read every value of a `WINDOW`-typed list property.
pub fn read_window_list_property<C: Connection>(
    conn: &C,
    window: u32,
    property: Atom,
) -> TopMenuResult<Vec<TrackedWindow>> {
    let reply = conn
        .get_property(false, window, property, AtomEnum::WINDOW, 0, u32::MAX / 4)
        .map_err(|e| TopMenuError::Platform(format!("Failed to get window list: {e}")))?
        .reply()
        .map_err(|e| TopMenuError::Platform(format!("Failed to get window list: {e}")))?;

    Ok(reply
        .value32()
        .map(|values| values.filter_map(TrackedWindow::from_raw).collect())
        .unwrap_or_default())
}

/// Flush the X11 connection.
pub fn flush_connection<C: Connection>(conn: &C) -> TopMenuResult<()> {
    conn.flush()
        .map_err(|e| TopMenuError::Platform(format!("Failed to flush connection: {e}")))
}
