mod backend;
mod config;
mod error;
mod follower;
mod menu_follower;
mod window;

#[cfg(target_os = "linux")]
#[path = "linux/mod.rs"]
pub mod platform;

#[cfg(not(target_os = "linux"))]
#[path = "unsupported.rs"]
pub mod platform;

pub use backend::{EmbedSurface, Watch, WindowSystem, WindowTracker};
pub use config::{
    DEFAULT_MENU_WINDOW_ATOM, DEFAULT_SERVER_SELECTION_ATOM, FollowerConfig, SocketConfig,
};
pub use error::{TopMenuError, TopMenuResult};
pub use follower::{FollowReason, FollowSet, WindowFollower};
pub use menu_follower::MenuFollower;
pub use window::{Atom, MenuState, TrackedWindow, WellKnownAtoms};

/// Follow the active window with the default configuration
///
/// # Arguments
/// * `on_change` - Callback invoked with the initial state and whenever the
///   embedded menu window changes
///
/// # Returns
/// Result indicating why following stopped
pub fn follow_menus<F>(on_change: F) -> TopMenuResult<()>
where
    F: FnMut(MenuState) -> TopMenuResult<()>,
{
    MenuFollower::new().follow_menus(on_change)
}

/// Follow the active window on a background thread with the default
/// configuration and receive menu changes via a channel
pub fn subscribe_menu_changes() -> TopMenuResult<std::sync::mpsc::Receiver<MenuState>> {
    MenuFollower::new().subscribe_menu_changes()
}
