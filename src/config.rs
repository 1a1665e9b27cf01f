use std::time::Duration;

/// Default name of the property that points a window at its menu bar window.
pub const DEFAULT_MENU_WINDOW_ATOM: &str = "_TOPMENU_WINDOW";

/// Default name of the selection owned by the active menu server.
pub const DEFAULT_SERVER_SELECTION_ATOM: &str = "_TOPMENU_SERVER";

/// Configuration for the socket window menus are embedded into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketConfig {
    /// Width of the socket window in pixels
    /// Default: 640
    pub width: u16,
    /// Height of the socket window in pixels
    /// Default: 24
    pub height: u16,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 24,
        }
    }
}

impl SocketConfig {
    /// Create a new socket configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the socket size
    ///
    /// # Panics
    /// Panics if either dimension is zero or greater than 4096
    pub fn with_size(mut self, width: u16, height: u16) -> Self {
        validate_dimension("width", width);
        validate_dimension("height", height);
        self.width = width;
        self.height = height;
        self
    }
}

fn validate_dimension(name: &str, value: u16) {
    if value == 0 {
        panic!("Socket {name} cannot be zero");
    }
    if value > 4096 {
        panic!("Socket {name} cannot be greater than 4096 pixels");
    }
}

/// Configuration for menu following behavior
#[derive(Debug, Clone)]
pub struct FollowerConfig {
    /// Polling interval used when the event loop must also watch a stop signal
    /// Default: 100ms
    pub poll_interval: Duration,
    /// Name of the menu window marker property
    /// Default: `_TOPMENU_WINDOW`
    pub menu_window_atom: String,
    /// Name of the selection that marks the current menu server
    /// Default: `_TOPMENU_SERVER`
    pub server_selection_atom: String,
    /// Whether to own the server selection while following
    /// Default: true
    pub register_server: bool,
    /// Existing window to place the socket in. When unset the socket is a
    /// standalone dock window.
    /// Default: None
    pub host_window: Option<u32>,
    /// Socket window configuration
    /// Default: SocketConfig::default()
    pub socket: SocketConfig,
}

impl Default for FollowerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            menu_window_atom: DEFAULT_MENU_WINDOW_ATOM.to_string(),
            server_selection_atom: DEFAULT_SERVER_SELECTION_ATOM.to_string(),
            register_server: true,
            host_window: None,
            socket: SocketConfig::default(),
        }
    }
}

impl FollowerConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the socket configuration
    pub fn with_socket_config(mut self, socket: SocketConfig) -> Self {
        self.socket = socket;
        self
    }

    /// Set the socket size (convenience method)
    ///
    /// # Panics
    /// Panics if either dimension is zero or greater than 4096
    pub fn with_socket_size(mut self, width: u16, height: u16) -> Self {
        self.socket = self.socket.with_size(width, height);
        self
    }

    /// Embed menus inside an existing window instead of a standalone one
    ///
    /// # Panics
    /// Panics if the window id is zero
    pub fn with_host_window(mut self, window: u32) -> Self {
        if window == 0 {
            panic!("Host window cannot be the null window");
        }
        self.host_window = Some(window);
        self
    }

    /// Set the name of the menu window marker property
    ///
    /// # Panics
    /// Panics if the name is empty
    pub fn with_menu_window_atom(mut self, name: impl Into<String>) -> Self {
        self.menu_window_atom = validate_atom_name(name.into());
        self
    }

    /// Set the name of the server selection
    ///
    /// # Panics
    /// Panics if the name is empty
    pub fn with_server_selection_atom(mut self, name: impl Into<String>) -> Self {
        self.server_selection_atom = validate_atom_name(name.into());
        self
    }

    /// Enable or disable server selection ownership
    pub fn with_server_registration(mut self, register: bool) -> Self {
        self.register_server = register;
        self
    }

    /// Set the polling interval used with a stop signal
    ///
    /// # Panics
    /// Panics if the interval is zero or too large (> 10 seconds)
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.validate_poll_interval(interval);
        self.poll_interval = interval;
        self
    }

    /// Set the polling interval in milliseconds
    ///
    /// # Panics
    /// Panics if the interval is zero or too large (> 10000ms)
    pub fn with_poll_interval_ms(self, ms: u64) -> Self {
        self.with_poll_interval(Duration::from_millis(ms))
    }

    fn validate_poll_interval(&self, interval: Duration) {
        if interval.is_zero() {
            panic!("Poll interval cannot be zero");
        }
        if interval > Duration::from_secs(10) {
            panic!("Poll interval cannot be greater than 10 seconds");
        }
    }
}

fn validate_atom_name(name: String) -> String {
    if name.is_empty() {
        panic!("Atom name cannot be empty");
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FollowerConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.menu_window_atom, "_TOPMENU_WINDOW");
        assert_eq!(config.server_selection_atom, "_TOPMENU_SERVER");
        assert!(config.register_server);
        assert_eq!(config.host_window, None);
    }

    #[test]
    fn test_default_socket_config() {
        let config = FollowerConfig::default();
        assert_eq!(config.socket, SocketConfig { width: 640, height: 24 });
    }

    #[test]
    fn test_builder_pattern() {
        let config = FollowerConfig::new()
            .with_poll_interval_ms(250)
            .with_host_window(0x3e00004)
            .with_server_registration(false);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.host_window, Some(0x3e00004));
        assert!(!config.register_server);
    }

    #[test]
    fn test_custom_atom_names() {
        let config = FollowerConfig::new()
            .with_menu_window_atom("_KDE_NET_WM_APPMENU_WINDOW")
            .with_server_selection_atom("_APPMENU_SERVER");
        assert_eq!(config.menu_window_atom, "_KDE_NET_WM_APPMENU_WINDOW");
        assert_eq!(config.server_selection_atom, "_APPMENU_SERVER");
    }

    #[test]
    fn test_socket_size_builder() {
        let config = FollowerConfig::new().with_socket_size(1024, 28);
        assert_eq!(config.socket.width, 1024);
        assert_eq!(config.socket.height, 28);
    }

    #[test]
    #[should_panic(expected = "Socket height cannot be zero")]
    fn test_zero_socket_height_panics() {
        SocketConfig::new().with_size(100, 0);
    }

    #[test]
    #[should_panic(expected = "Socket width cannot be greater than 4096 pixels")]
    fn test_large_socket_width_panics() {
        SocketConfig::new().with_size(5000, 24);
    }

    #[test]
    #[should_panic(expected = "Host window cannot be the null window")]
    fn test_null_host_window_panics() {
        FollowerConfig::new().with_host_window(0);
    }

    #[test]
    #[should_panic(expected = "Atom name cannot be empty")]
    fn test_empty_atom_name_panics() {
        FollowerConfig::new().with_menu_window_atom("");
    }

    #[test]
    #[should_panic(expected = "Poll interval cannot be zero")]
    fn test_zero_interval_panics() {
        FollowerConfig::new().with_poll_interval(Duration::from_millis(0));
    }

    #[test]
    #[should_panic(expected = "Poll interval cannot be greater than 10 seconds")]
    fn test_large_interval_panics() {
        FollowerConfig::new().with_poll_interval(Duration::from_secs(11));
    }
}
