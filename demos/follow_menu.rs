//! Follow the active window in a standalone menu strip
//!
//! Opens a dock window and embeds the menu bar of whichever application is
//! active, printing every change.
//!
//! Usage: cargo run --example follow_menu

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use topmenu_follower::{MenuFollower, MenuState, TopMenuResult};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("Following the active window. Press Ctrl+C to exit.");

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        handler_stop.store(true, Ordering::Release);
    })?;

    let follower = MenuFollower::new();
    follower.follow_menus_with_stop(
        |state: MenuState| -> TopMenuResult<()> {
            match state.menu_window {
                Some(menu) => println!(
                    "Embedded menu {} (active window {:?}, following {} windows)",
                    menu,
                    state.active_window.map(|w| w.to_string()),
                    state.followed.len()
                ),
                None => println!("No menu for the active window"),
            }
            Ok(())
        },
        &stop,
    )?;

    println!("Stopped");
    Ok(())
}
