use super::{utils::wayland_detect, xorg_follow_loop};
use crate::{FollowerConfig, MenuState, TopMenuError, TopMenuResult};
use std::sync::atomic::AtomicBool;

#[cfg(feature = "async")]
use std::future::Future;

#[derive(Debug, Clone)]
pub(crate) struct ImplMenuFollower {}

impl ImplMenuFollower {
    pub(crate) fn new() -> Self {
        Self {}
    }
}

impl ImplMenuFollower {
    pub fn follow_menus<F>(&self, on_change: F, config: &FollowerConfig) -> TopMenuResult<()>
    where
        F: FnMut(MenuState) -> TopMenuResult<()>,
    {
        ensure_x11()?;
        xorg_follow_loop::follow_menus(on_change, config)
    }

    pub fn follow_menus_with_stop<F>(
        &self,
        on_change: F,
        stop_signal: &AtomicBool,
        config: &FollowerConfig,
    ) -> TopMenuResult<()>
    where
        F: FnMut(MenuState) -> TopMenuResult<()>,
    {
        ensure_x11()?;
        xorg_follow_loop::follow_menus_with_stop(on_change, stop_signal, config)
    }

    #[cfg(feature = "async")]
    pub async fn follow_menus_async<F, Fut>(
        &self,
        on_change: F,
        config: &FollowerConfig,
    ) -> TopMenuResult<()>
    where
        F: FnMut(MenuState) -> Fut,
        Fut: Future<Output = TopMenuResult<()>>,
    {
        ensure_x11()?;
        xorg_follow_loop::follow_menus_async(on_change, config).await
    }

    #[cfg(feature = "async")]
    pub async fn follow_menus_async_with_stop<F, Fut>(
        &self,
        on_change: F,
        stop_signal: &AtomicBool,
        config: &FollowerConfig,
    ) -> TopMenuResult<()>
    where
        F: FnMut(MenuState) -> Fut,
        Fut: Future<Output = TopMenuResult<()>>,
    {
        ensure_x11()?;
        xorg_follow_loop::follow_menus_async_with_stop(on_change, stop_signal, config).await
    }
}

/// Menu windows are X11 windows; a session without an X server has none.
fn ensure_x11() -> TopMenuResult<()> {
    if wayland_detect() {
        return Err(TopMenuError::Unsupported);
    }
    Ok(())
}
