pub mod ewmh_tracker;
pub(crate) mod impl_menu_follower;
pub mod server_selection;
pub mod utils;
pub mod xembed_socket;
pub mod xorg_display;
pub mod xorg_follow_loop;

pub use ewmh_tracker::EwmhTracker;
pub use server_selection::ServerSelection;
pub use xembed_socket::XEmbedSocket;
pub use xorg_display::XorgDisplay;
pub use xorg_follow_loop::XorgFollower;
