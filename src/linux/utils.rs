use std::env;

/// Whether the session is Wayland-only, with no X server to follow windows on.
pub fn wayland_detect() -> bool {
    let wayland = env::var_os("WAYLAND_DISPLAY").is_some_and(|v| !v.is_empty());
    let x11 = env::var_os("DISPLAY").is_some_and(|v| !v.is_empty());
    wayland && !x11
}
