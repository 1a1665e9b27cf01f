//! Fallback for platforms without an X11 window tree.

pub(crate) mod impl_menu_follower {
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

        pub fn follow_menus<F>(&self, _on_change: F, _config: &FollowerConfig) -> TopMenuResult<()>
        where
            F: FnMut(MenuState) -> TopMenuResult<()>,
        {
            Err(TopMenuError::Unsupported)
        }

        pub fn follow_menus_with_stop<F>(
            &self,
            _on_change: F,
            _stop_signal: &AtomicBool,
            _config: &FollowerConfig,
        ) -> TopMenuResult<()>
        where
            F: FnMut(MenuState) -> TopMenuResult<()>,
        {
            Err(TopMenuError::Unsupported)
        }

        #[cfg(feature = "async")]
        pub async fn follow_menus_async<F, Fut>(
            &self,
            _on_change: F,
            _config: &FollowerConfig,
        ) -> TopMenuResult<()>
        where
            F: FnMut(MenuState) -> Fut,
            Fut: Future<Output = TopMenuResult<()>>,
        {
            Err(TopMenuError::Unsupported)
        }

        #[cfg(feature = "async")]
        pub async fn follow_menus_async_with_stop<F, Fut>(
            &self,
            _on_change: F,
            _stop_signal: &AtomicBool,
            _config: &FollowerConfig,
        ) -> TopMenuResult<()>
        where
            F: FnMut(MenuState) -> Fut,
            Fut: Future<Output = TopMenuResult<()>>,
        {
            Err(TopMenuError::Unsupported)
        }
    }
}
