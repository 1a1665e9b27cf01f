use super::xorg_display::{SharedConnection, get_atom};
use crate::{EmbedSurface, SocketConfig, TopMenuError, TopMenuResult, TrackedWindow};
use tracing::debug;
use x11rb::{
    COPY_DEPTH_FROM_PARENT, CURRENT_TIME, NONE,
    connection::Connection,
    errors::ReplyError,
    protocol::xproto::{
        AtomEnum, ChangeWindowAttributesAux, ClientMessageEvent, ConfigureWindowAux,
        ConnectionExt, CreateWindowAux, EventMask, PropMode, Screen, WindowClass,
    },
    wrapper::ConnectionExt as _,
};

const XEMBED_EMBEDDED_NOTIFY: u32 = 0;
const XEMBED_VERSION: u32 = 0;

/// Socket window that menu bar windows are reparented into.
#[derive(Debug)]
pub struct XEmbedSocket {
    conn: SharedConnection,
    root: u32,
    socket: u32,
    host: Option<u32>,
    host_toplevel: u32,
    plug: Option<u32>,
    width: u16,
    height: u16,
    xembed: u32,
}

impl XEmbedSocket {
    /// Create and map the socket window.
    ///
    /// With a `host_window` the socket becomes its child, and the client
    /// toplevel containing the host is excluded from following. Host resizes
    /// are reported as `ConfigureNotify` and should be passed to [`resize`].
    /// Otherwise the socket is a standalone dock window and is its own
    /// toplevel.
    ///
    /// [`resize`]: XEmbedSocket::resize
    pub fn create(
        conn: SharedConnection,
        screen: &Screen,
        host_window: Option<u32>,
        config: &SocketConfig,
    ) -> TopMenuResult<Self> {
        let root = screen.root;
        let xembed = get_atom(&*conn, b"_XEMBED")?;
        let socket = conn
            .generate_id()
            .map_err(|e| TopMenuError::Platform(format!("Failed to allocate window id: {e}")))?;

        conn.create_window(
            COPY_DEPTH_FROM_PARENT,
            socket,
            host_window.unwrap_or(root),
            0,
            0,
            config.width,
            config.height,
            0,
            WindowClass::INPUT_OUTPUT,
            screen.root_visual,
            &CreateWindowAux::new()
                .background_pixel(screen.black_pixel)
                .event_mask(EventMask::STRUCTURE_NOTIFY | EventMask::SUBSTRUCTURE_NOTIFY),
        )
        .map_err(|e| TopMenuError::Platform(e.to_string()))?
        .check()
        .map_err(|e| TopMenuError::Platform(format!("Failed to create socket window: {e}")))?;

        let host_toplevel = match host_window {
            Some(host) => {
                conn.change_window_attributes(
                    host,
                    &ChangeWindowAttributesAux::new().event_mask(EventMask::STRUCTURE_NOTIFY),
                )
                .map_err(|e| TopMenuError::Platform(e.to_string()))?;
                find_toplevel(&*conn, root, host)?
            }
            None => {
                mark_as_dock(&*conn, socket)?;
                socket
            }
        };
        debug!("Socket {:#x} lives in toplevel {:#x}", socket, host_toplevel);

        conn.map_window(socket)
            .map_err(|e| TopMenuError::Platform(e.to_string()))?;
        conn.flush()
            .map_err(|e| TopMenuError::Platform(e.to_string()))?;

        Ok(Self {
            conn,
            root,
            socket,
            host: host_window,
            host_toplevel,
            plug: None,
            width: config.width,
            height: config.height,
            xembed,
        })
    }

    pub fn socket_window(&self) -> u32 {
        self.socket
    }

    /// Window the socket was created in, if any.
    pub fn host_window(&self) -> Option<u32> {
        self.host
    }

    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    /// Resize the socket and the embedded window, if any.
    pub fn resize(&mut self, width: u16, height: u16) -> TopMenuResult<()> {
        if (width, height) == (self.width, self.height) {
            return Ok(());
        }
        debug!("Resizing socket to {}x{}", width, height);
        self.width = width;
        self.height = height;

        let size = ConfigureWindowAux::new()
            .width(u32::from(width))
            .height(u32::from(height));
        self.conn
            .configure_window(self.socket, &size)
            .map_err(|e| TopMenuError::Platform(e.to_string()))?;
        // A plug destroyed behind our back only produces an error event
        if let Some(plug) = self.plug {
            self.conn
                .configure_window(plug, &size)
                .map_err(|e| TopMenuError::Platform(e.to_string()))?;
        }
        Ok(())
    }

    /// Destroy the socket window. Any embedded window must be detached first.
    pub fn destroy(self) -> TopMenuResult<()> {
        self.conn
            .destroy_window(self.socket)
            .map_err(|e| TopMenuError::Platform(e.to_string()))?;
        self.conn
            .flush()
            .map_err(|e| TopMenuError::Platform(e.to_string()))
    }

    fn try_attach(&self, plug: u32) -> Result<(), ReplyError> {
        let conn = &*self.conn;
        conn.reparent_window(plug, self.socket, 0, 0)?.check()?;
        conn.configure_window(
            plug,
            &ConfigureWindowAux::new()
                .width(u32::from(self.width))
                .height(u32::from(self.height)),
        )?;

        let notify = ClientMessageEvent::new(
            32,
            plug,
            self.xembed,
            [
                CURRENT_TIME,
                XEMBED_EMBEDDED_NOTIFY,
                0,
                self.socket,
                XEMBED_VERSION,
            ],
        );
        conn.send_event(false, plug, EventMask::NO_EVENT, notify)?;
        conn.map_window(plug)?.check()?;
        Ok(())
    }

    fn try_detach(&self, plug: u32) -> Result<(), ReplyError> {
        let conn = &*self.conn;
        conn.unmap_window(plug)?.check()?;
        // Reparent back to root window to end embedding
        conn.reparent_window(plug, self.root, 0, 0)?.check()?;
        Ok(())
    }
}

impl EmbedSurface for XEmbedSocket {
    fn attach(&mut self, window: TrackedWindow) -> TopMenuResult<()> {
        self.try_attach(window.id())
            .map_err(|_| TopMenuError::WindowGone(window))?;
        self.plug = Some(window.id());
        Ok(())
    }

    fn detach(&mut self, window: TrackedWindow) -> TopMenuResult<()> {
        self.plug = None;
        self.try_detach(window.id())
            .map_err(|_| TopMenuError::WindowGone(window))
    }

    fn host_toplevel(&self) -> Option<TrackedWindow> {
        TrackedWindow::from_raw(self.host_toplevel)
    }
}

/// Client toplevel containing `window`: the nearest ancestor (or `window`
/// itself) carrying `WM_STATE`, else the child of the root on the way up.
fn find_toplevel<C: Connection>(conn: &C, root: u32, window: u32) -> TopMenuResult<u32> {
    let wm_state = get_atom(conn, b"WM_STATE")?;
    let mut current = window;
    let mut toplevel = window;

    while current != root && current != NONE {
        let state = conn
            .get_property(false, current, wm_state, AtomEnum::ANY, 0, 0)
            .map_err(|e| TopMenuError::Platform(e.to_string()))?
            .reply()
            .map_err(|e| TopMenuError::Platform(format!("Failed to get WM_STATE: {e}")))?;
        if state.type_ != NONE {
            return Ok(current);
        }

        toplevel = current;
        current = conn
            .query_tree(current)
            .map_err(|e| TopMenuError::Platform(e.to_string()))?
            .reply()
            .map_err(|e| TopMenuError::Platform(format!("Failed to query window tree: {e}")))?
            .parent;
    }

    Ok(toplevel)
}

/// Name the standalone socket and ask the window manager to treat it as a
/// panel, so it never becomes the active window itself.
fn mark_as_dock<C: Connection>(conn: &C, window: u32) -> TopMenuResult<()> {
    let net_wm_window_type = get_atom(conn, b"_NET_WM_WINDOW_TYPE")?;
    let dock = get_atom(conn, b"_NET_WM_WINDOW_TYPE_DOCK")?;

    conn.change_property8(
        PropMode::REPLACE,
        window,
        AtomEnum::WM_NAME,
        AtomEnum::STRING,
        b"topmenu",
    )
    .map_err(|e| TopMenuError::Platform(e.to_string()))?;
    conn.change_property32(
        PropMode::REPLACE,
        window,
        net_wm_window_type,
        AtomEnum::ATOM,
        &[dock],
    )
    .map_err(|e| TopMenuError::Platform(e.to_string()))?;

    Ok(())
}
