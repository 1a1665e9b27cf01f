use crate::{
    FollowerConfig, MenuState, TopMenuError, TopMenuResult,
    platform::impl_menu_follower::ImplMenuFollower,
};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
    mpsc,
};
use tracing::info;

#[cfg(feature = "async")]
use std::future::Future;

/// Follows the active window and embeds its menu bar window.
#[derive(Debug, Clone)]
pub struct MenuFollower {
    impl_menu_follower: ImplMenuFollower,
    config: FollowerConfig,
}

impl MenuFollower {
    pub fn new() -> Self {
        Self::with_config(FollowerConfig::default())
    }

    pub fn with_config(config: FollowerConfig) -> Self {
        Self {
            impl_menu_follower: ImplMenuFollower::new(),
            config,
        }
    }

    pub fn config(&self) -> &FollowerConfig {
        &self.config
    }
}

impl Default for MenuFollower {
    fn default() -> Self {
        Self::new()
    }
}

impl MenuFollower {
    /// Run the event loop on the current thread until the connection fails.
    ///
    /// `on_change` receives the initial state and every change of the
    /// embedded menu window.
    pub fn follow_menus<F>(&self, on_change: F) -> TopMenuResult<()>
    where
        F: FnMut(MenuState) -> TopMenuResult<()>,
    {
        self.impl_menu_follower.follow_menus(on_change, &self.config)
    }

    pub fn follow_menus_with_stop<F>(
        &self,
        on_change: F,
        stop_signal: &AtomicBool,
    ) -> TopMenuResult<()>
    where
        F: FnMut(MenuState) -> TopMenuResult<()>,
    {
        self.impl_menu_follower
            .follow_menus_with_stop(on_change, stop_signal, &self.config)
    }

    /// Async version of follow_menus - requires the "async" feature
    #[cfg(feature = "async")]
    pub async fn follow_menus_async<F, Fut>(&self, on_change: F) -> TopMenuResult<()>
    where
        F: FnMut(MenuState) -> Fut,
        Fut: Future<Output = TopMenuResult<()>>,
    {
        self.impl_menu_follower
            .follow_menus_async(on_change, &self.config)
            .await
    }

    /// Async version of follow_menus_with_stop - requires the "async" feature
    #[cfg(feature = "async")]
    pub async fn follow_menus_async_with_stop<F, Fut>(
        &self,
        on_change: F,
        stop_signal: &AtomicBool,
    ) -> TopMenuResult<()>
    where
        F: FnMut(MenuState) -> Fut,
        Fut: Future<Output = TopMenuResult<()>>,
    {
        self.impl_menu_follower
            .follow_menus_async_with_stop(on_change, stop_signal, &self.config)
            .await
    }

    /// Follow menus on a background thread and receive changes via a channel.
    ///
    /// The thread stops once the receiver is dropped and the next change is
    /// reported.
    pub fn subscribe_menu_changes(&self) -> TopMenuResult<mpsc::Receiver<MenuState>> {
        let (sender, receiver) = mpsc::channel();
        let stop_signal = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop_signal);

        let follower = self.clone();

        std::thread::spawn(move || {
            let result = follower.follow_menus_with_stop(
                move |state: MenuState| -> TopMenuResult<()> {
                    if sender.send(state).is_err() {
                        thread_stop.store(true, Ordering::Release);
                        return Err(TopMenuError::Error("Receiver dropped".to_string()));
                    }
                    Ok(())
                },
                &stop_signal,
            );
            if let Err(e) = result {
                info!("Menu following stopped: {}", e);
            }
        });

        Ok(receiver)
    }
}
