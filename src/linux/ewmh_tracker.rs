use super::xorg_display::{
    SharedConnection, get_atom, read_window_list_property, read_window_property,
};
use crate::{Atom, TopMenuError, TopMenuResult, TrackedWindow, WindowTracker};
use tracing::debug;
use x11rb::{
    connection::Connection,
    protocol::xproto::{AtomEnum, ChangeWindowAttributesAux, ConnectionExt, EventMask},
};

/// `WM_HINTS` flag marking `window_group` as set.
const WINDOW_GROUP_HINT: u32 = 1 << 6;

/// Index of `window_group` in the `WM_HINTS` property.
const WINDOW_GROUP_FIELD: usize = 8;

#[derive(Debug, Clone)]
struct EwmhAtoms {
    net_active_window: Atom,
    net_client_list_stacking: Atom,
    wm_client_leader: Atom,
}

/// `WindowTracker` backed by the EWMH root window properties.
#[derive(Debug, Clone)]
pub struct EwmhTracker {
    conn: SharedConnection,
    root: u32,
    atoms: EwmhAtoms,
}

impl EwmhTracker {
    pub fn new(conn: SharedConnection, root: u32) -> TopMenuResult<Self> {
        let atoms = EwmhAtoms {
            net_active_window: get_atom(&*conn, b"_NET_ACTIVE_WINDOW")?,
            net_client_list_stacking: get_atom(&*conn, b"_NET_CLIENT_LIST_STACKING")?,
            wm_client_leader: get_atom(&*conn, b"WM_CLIENT_LEADER")?,
        };
        Ok(Self { conn, root, atoms })
    }

    /// Select property changes on the root window so active window changes
    /// are delivered.
    pub fn watch_root(&self) -> TopMenuResult<()> {
        self.conn
            .change_window_attributes(
                self.root,
                &ChangeWindowAttributesAux::new().event_mask(EventMask::PROPERTY_CHANGE),
            )
            .map_err(|e| TopMenuError::Platform(e.to_string()))?;

        self.conn
            .flush()
            .map_err(|e| TopMenuError::Platform(e.to_string()))?;

        Ok(())
    }

    fn window_group(&self, window: TrackedWindow) -> TopMenuResult<Option<TrackedWindow>> {
        let reply = self
            .conn
            .get_property(
                false,
                window.id(),
                AtomEnum::WM_HINTS,
                AtomEnum::WM_HINTS,
                0,
                9,
            )
            .map_err(|e| TopMenuError::Platform(format!("Failed to get WM_HINTS: {e}")))?
            .reply()
            .map_err(|e| TopMenuError::Platform(format!("Failed to get WM_HINTS: {e}")))?;

        let Some(values) = reply.value32() else {
            return Ok(None);
        };
        let values: Vec<u32> = values.collect();
        if values.len() <= WINDOW_GROUP_FIELD || values[0] & WINDOW_GROUP_HINT == 0 {
            return Ok(None);
        }

        Ok(TrackedWindow::from_raw(values[WINDOW_GROUP_FIELD]))
    }

    /// Client windows in stacking order, bottommost first.
    fn stacked_windows(&self) -> Vec<TrackedWindow> {
        match read_window_list_property(
            &*self.conn,
            self.root,
            self.atoms.net_client_list_stacking,
        ) {
            Ok(windows) if !windows.is_empty() => return windows,
            Ok(_) => debug!("No _NET_CLIENT_LIST_STACKING; falling back to QueryTree"),
            Err(e) => debug!("Failed to read client stacking list: {}", e),
        }

        match self.conn.query_tree(self.root).map(|cookie| cookie.reply()) {
            Ok(Ok(tree)) => tree
                .children
                .into_iter()
                .filter_map(TrackedWindow::from_raw)
                .collect(),
            Ok(Err(e)) => {
                debug!("Failed to query root window tree: {}", e);
                Vec::new()
            }
            Err(e) => {
                debug!("Failed to query root window tree: {}", e);
                Vec::new()
            }
        }
    }

    /// Links to the root window mean "the whole group", never a real window.
    fn is_root(&self, window: TrackedWindow) -> bool {
        window.id() == self.root
    }

    /// Identity of the application a window belongs to.
    fn application_of(&self, window: TrackedWindow) -> TrackedWindow {
        self.group_leader(window).unwrap_or(window)
    }
}

impl WindowTracker for EwmhTracker {
    fn active_window(&self) -> Option<TrackedWindow> {
        read_window_property(&*self.conn, self.root, self.atoms.net_active_window)
            .unwrap_or_else(|e| {
                debug!("Failed to get active window: {}", e);
                None
            })
    }

    fn transient_for(&self, window: TrackedWindow) -> Option<TrackedWindow> {
        read_window_property(&*self.conn, window.id(), AtomEnum::WM_TRANSIENT_FOR.into())
            .unwrap_or_else(|e| {
                debug!("Failed to get transient for window {}: {}", window, e);
                None
            })
            .filter(|&transient| !self.is_root(transient))
    }

    fn group_leader(&self, window: TrackedWindow) -> Option<TrackedWindow> {
        let leader = match self.window_group(window) {
            Ok(Some(leader)) => Some(leader),
            Ok(None) => read_window_property(&*self.conn, window.id(), self.atoms.wm_client_leader)
                .unwrap_or_else(|e| {
                    debug!("Failed to get client leader for window {}: {}", window, e);
                    None
                }),
            Err(e) => {
                debug!("Failed to get group leader for window {}: {}", window, e);
                None
            }
        };
        leader.filter(|&leader| !self.is_root(leader))
    }

    fn application_windows(&self, window: TrackedWindow) -> Vec<TrackedWindow> {
        let application = self.application_of(window);
        self.stacked_windows()
            .into_iter()
            .rev()
            .filter(|&candidate| self.application_of(candidate) == application)
            .collect()
    }

    fn is_active_window_change(&self, window: TrackedWindow, property: Atom) -> bool {
        window.id() == self.root && property == self.atoms.net_active_window
    }
}
