//! Capabilities the follower needs from the windowing system.
//!
//! The follower itself never talks to a display server. It is handed one
//! implementation of each trait when it is assembled; the X11 runtime uses
//! `XorgDisplay`, `EwmhTracker` and `XEmbedSocket`.

use crate::{Atom, TopMenuResult, TrackedWindow};

/// Event selection a window had before the follower started watching it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watch {
    prior_mask: u32,
}

impl Watch {
    pub fn new(prior_mask: u32) -> Self {
        Self { prior_mask }
    }

    pub fn prior_mask(&self) -> u32 {
        self.prior_mask
    }
}

/// Low-level window queries.
///
/// All queries are best-effort: a window that disappeared mid-query is
/// reported as absent, never as a hard error.
pub trait WindowSystem {
    fn intern_atom(&self, name: &str) -> TopMenuResult<Atom>;

    /// Add structure and property-change notifications to `window`, keeping
    /// whatever this client already selected on it.
    ///
    /// Fails with `TopMenuError::WindowGone` when the window no longer exists.
    fn select_changes(&self, window: TrackedWindow) -> TopMenuResult<Watch>;

    /// Put back the selection recorded in `watch`.
    fn restore_changes(&self, window: TrackedWindow, watch: Watch);

    /// Read a window-typed property.
    fn read_window_property(&self, window: TrackedWindow, property: Atom)
    -> Option<TrackedWindow>;
}

/// Window-manager level view of the desktop.
pub trait WindowTracker {
    fn active_window(&self) -> Option<TrackedWindow>;

    fn transient_for(&self, window: TrackedWindow) -> Option<TrackedWindow>;

    fn group_leader(&self, window: TrackedWindow) -> Option<TrackedWindow>;

    /// Windows of the same application as `window`, topmost first.
    fn application_windows(&self, window: TrackedWindow) -> Vec<TrackedWindow>;

    /// Whether a property change on `window` means the active window changed.
    fn is_active_window_change(&self, window: TrackedWindow, property: Atom) -> bool;
}

/// Surface that hosts at most one foreign menu window.
pub trait EmbedSurface {
    fn attach(&mut self, window: TrackedWindow) -> TopMenuResult<()>;

    /// Hide `window` and hand it back to the root window.
    fn detach(&mut self, window: TrackedWindow) -> TopMenuResult<()>;

    /// Toplevel window the surface lives in. Never followed.
    fn host_toplevel(&self) -> Option<TrackedWindow>;
}
