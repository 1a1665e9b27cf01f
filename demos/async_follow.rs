//! Follow menus from an async context for thirty seconds
//!
//! Usage: cargo run --example async_follow --features async

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;
use topmenu_follower::{MenuFollower, MenuState, TopMenuResult};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let stop = Arc::new(AtomicBool::new(false));
    let timer_stop = Arc::clone(&stop);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(30)).await;
        timer_stop.store(true, Ordering::Release);
    });

    let follower = MenuFollower::new();
    follower
        .follow_menus_async_with_stop(
            |state: MenuState| async move {
                println!(
                    "menu window: {:?}",
                    state.menu_window.map(|w| w.to_string())
                );
                TopMenuResult::Ok(())
            },
            &stop,
        )
        .await?;

    println!("Done after 30 seconds");
    Ok(())
}
