//! Shared types for the menu follower crate.
use core::fmt;
use std::num::NonZeroU32;

/// Numeric identifier of an interned X11 atom.
pub type Atom = u32;

/// Handle of a window on the display.
///
/// The null window id is never a valid handle; code that may or may not have a
/// window uses `Option<TrackedWindow>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackedWindow(NonZeroU32);

impl TrackedWindow {
    /// Wrap a raw window id, mapping the null id to `None`.
    pub fn from_raw(id: u32) -> Option<Self> {
        NonZeroU32::new(id).map(Self)
    }

    /// The raw window id.
    pub fn id(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for TrackedWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.id())
    }
}

/// Atoms the follower reacts to on followed windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WellKnownAtoms {
    /// Property holding the id of a window's menu bar window.
    pub menu_window: Atom,
    /// `WM_TRANSIENT_FOR`.
    pub transient_for: Atom,
}

impl WellKnownAtoms {
    pub fn contains(&self, atom: Atom) -> bool {
        atom == self.menu_window || atom == self.transient_for
    }
}

/// Snapshot reported to callers whenever the embedded menu changes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MenuState {
    /// Menu bar window currently embedded, if any.
    pub menu_window: Option<TrackedWindow>,
    /// Window the current search started from.
    pub active_window: Option<TrackedWindow>,
    /// Windows being followed, most recently discovered first.
    pub followed: Vec<TrackedWindow>,
}
