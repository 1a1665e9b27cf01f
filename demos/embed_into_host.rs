//! Embed menus into an existing window
//!
//! Usage: cargo run --example embed_into_host -- <window-id> [menu-atom]
//!
//! The window id may be given in decimal or as 0x-prefixed hex, e.g. the
//! output of `xwininfo`.

use std::env;
use topmenu_follower::{FollowerConfig, MenuFollower};

fn parse_window_id(arg: &str) -> Result<u32, std::num::ParseIntError> {
    match arg.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => arg.parse(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args = env::args().skip(1);
    let Some(host) = args.next() else {
        eprintln!("usage: embed_into_host <window-id> [menu-atom]");
        std::process::exit(2);
    };

    let mut config = FollowerConfig::new()
        .with_host_window(parse_window_id(&host)?)
        .with_socket_size(800, 26);
    if let Some(atom) = args.next() {
        config = config.with_menu_window_atom(atom);
    }

    let receiver = MenuFollower::with_config(config).subscribe_menu_changes()?;
    for state in receiver {
        println!("{:?}", state);
    }

    Ok(())
}
