use super::{
    EwmhTracker, ServerSelection, XEmbedSocket, XorgDisplay,
    xorg_display::{SharedConnection, connect_to_x11, flush_connection},
};
use crate::{FollowerConfig, MenuState, TopMenuError, TopMenuResult, TrackedWindow, WindowFollower};
use crate::backend::WindowTracker;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

#[cfg(feature = "async")]
use std::future::Future;
use x11rb::{
    connection::Connection,
    protocol::{
        Event,
        xproto::{
            ConfigureNotifyEvent, DestroyNotifyEvent, PropertyNotifyEvent, SelectionClearEvent,
        },
    },
};

/// Follower wired to the X11 implementations of its capabilities.
pub type XorgFollower = WindowFollower<XorgDisplay, EwmhTracker, XEmbedSocket>;

pub fn follow_menus<F>(on_change: F, config: &FollowerConfig) -> TopMenuResult<()>
where
    F: FnMut(MenuState) -> TopMenuResult<()>,
{
    run(on_change, None, config)
}

pub fn follow_menus_with_stop<F>(
    on_change: F,
    stop_signal: &AtomicBool,
    config: &FollowerConfig,
) -> TopMenuResult<()>
where
    F: FnMut(MenuState) -> TopMenuResult<()>,
{
    run(on_change, Some(stop_signal), config)
}

#[cfg(feature = "async")]
pub async fn follow_menus_async<F, Fut>(on_change: F, config: &FollowerConfig) -> TopMenuResult<()>
where
    F: FnMut(MenuState) -> Fut,
    Fut: Future<Output = TopMenuResult<()>>,
{
    run_async(on_change, None, config).await
}

#[cfg(feature = "async")]
pub async fn follow_menus_async_with_stop<F, Fut>(
    on_change: F,
    stop_signal: &AtomicBool,
    config: &FollowerConfig,
) -> TopMenuResult<()>
where
    F: FnMut(MenuState) -> Fut,
    Fut: Future<Output = TopMenuResult<()>>,
{
    run_async(on_change, Some(stop_signal), config).await
}

#[cfg(feature = "async")]
async fn run_async<F, Fut>(
    mut on_change: F,
    stop_signal: Option<&AtomicBool>,
    config: &FollowerConfig,
) -> TopMenuResult<()>
where
    F: FnMut(MenuState) -> Fut,
    Fut: Future<Output = TopMenuResult<()>>,
{
    use std::sync::Arc;
    use tokio::sync::mpsc;

    let (tx, mut rx) = mpsc::unbounded_channel::<MenuState>();
    let config_clone = config.clone();

    let internal_stop = Arc::new(AtomicBool::new(false));
    let thread_stop = Arc::clone(&internal_stop);
    let cleanup_stop = Arc::clone(&internal_stop);

    // The X11 connection is blocking and single-threaded, so the whole loop
    // lives on one blocking thread.
    let blocking_handle = tokio::task::spawn_blocking(move || -> TopMenuResult<()> {
        let send_stop = Arc::clone(&thread_stop);
        run(
            move |state| {
                if tx.send(state).is_err() {
                    info!("Async task dropped, stopping X11 event loop");
                    send_stop.store(true, Ordering::Release);
                }
                Ok(())
            },
            Some(thread_stop.as_ref()),
            &config_clone,
        )
    });

    let result = async {
        loop {
            if let Some(external_stop) = stop_signal
                && external_stop.load(Ordering::Acquire)
            {
                info!("External stop signal detected");
                break;
            }

            // Wake periodically to check the stop signal
            match tokio::time::timeout(std::time::Duration::from_millis(50), rx.recv()).await {
                Ok(Some(state)) => {
                    if let Err(e) = on_change(state).await {
                        info!("Menu change handler failed: {}", e);
                    }
                }
                Ok(None) => break,
                Err(_) => continue,
            }
        }
        Ok::<(), TopMenuError>(())
    }
    .await;

    info!("Async task ending, signaling X11 thread to stop");
    cleanup_stop.store(true, Ordering::Release);
    drop(rx);

    match blocking_handle.await {
        Ok(Ok(())) => {
            info!("X11 event loop completed successfully");
            result
        }
        Ok(Err(e)) => {
            info!("X11 event loop error: {}", e);
            Err(e)
        }
        Err(e) => {
            let err_msg = format!("X11 blocking task failed: {}", e);
            info!("{}", err_msg);
            Err(TopMenuError::Platform(err_msg))
        }
    }
}

fn run<F>(
    mut on_change: F,
    stop_signal: Option<&AtomicBool>,
    config: &FollowerConfig,
) -> TopMenuResult<()>
where
    F: FnMut(MenuState) -> TopMenuResult<()>,
{
    let mut session = XorgSession::open(config)?;
    session.start();

    if let Err(e) = on_change(session.follower.menu_state()) {
        info!("Initial menu handler failed: {}", e);
    }

    while let Some(event) = get_next_event(&*session.conn, stop_signal, config)? {
        if session.handle_event(event)
            && let Err(e) = on_change(session.follower.menu_state())
        {
            info!("Menu change handler failed: {}", e);
        }

        flush_connection(&*session.conn)?;
    }

    session.close()
}

/* ------------------------------------------------------------ */
/* Helper structs and functions                                  */
/* ------------------------------------------------------------ */

struct XorgSession {
    conn: SharedConnection,
    follower: XorgFollower,
    selection: Option<ServerSelection>,
}

impl XorgSession {
    fn open(config: &FollowerConfig) -> TopMenuResult<Self> {
        let (conn, screen_num) = connect_to_x11()?;
        let conn = Rc::new(conn);
        let screen = conn
            .setup()
            .roots
            .get(screen_num)
            .cloned()
            .ok_or_else(|| TopMenuError::Platform(format!("No screen {screen_num}")))?;

        let tracker = EwmhTracker::new(Rc::clone(&conn), screen.root)?;
        tracker.watch_root()?;

        let socket = XEmbedSocket::create(
            Rc::clone(&conn),
            &screen,
            config.host_window,
            &config.socket,
        )?;

        let selection = if config.register_server {
            Some(ServerSelection::new(
                Rc::clone(&conn),
                socket.socket_window(),
                &config.server_selection_atom,
            )?)
        } else {
            None
        };

        let follower = WindowFollower::new(
            XorgDisplay::new(Rc::clone(&conn)),
            tracker,
            socket,
            config.menu_window_atom.clone(),
        );

        Ok(Self {
            conn,
            follower,
            selection,
        })
    }

    fn start(&mut self) {
        if let Some(selection) = self.selection.as_mut()
            && let Err(e) = selection.register()
        {
            info!("Failed to register menu server: {}", e);
        }
        self.follower.show();
        if let Err(e) = flush_connection(&*self.conn) {
            info!("{}", e);
        }
    }

    /// Feed one event to the follower. Returns whether the embedded menu
    /// changed.
    fn handle_event(&mut self, event: Event) -> bool {
        let before = self.follower.embedded();

        match event {
            Event::PropertyNotify(PropertyNotifyEvent { window, atom, .. }) => {
                let Some(window) = TrackedWindow::from_raw(window) else {
                    return false;
                };
                if self.follower.tracker().is_active_window_change(window, atom) {
                    let active = self.follower.tracker().active_window();
                    self.follower.on_active_window_changed(active);
                } else {
                    self.follower.on_window_property_changed(window, atom);
                }
            }
            Event::DestroyNotify(DestroyNotifyEvent { window, .. }) => {
                if let Some(window) = TrackedWindow::from_raw(window) {
                    self.follower.on_window_destroyed(window);
                }
            }
            Event::ConfigureNotify(ConfigureNotifyEvent {
                window,
                width,
                height,
                ..
            }) => {
                if self.follower.surface().host_window() == Some(window)
                    && let Err(e) = self.follower.surface_mut().resize(width, height)
                {
                    debug!("Failed to follow host resize: {}", e);
                }
            }
            Event::SelectionClear(SelectionClearEvent { selection, .. }) => {
                if let Some(server) = self.selection.as_mut()
                    && server.selection() == selection
                {
                    server.lost();
                }
            }
            Event::Error(e) => debug!("X11 error event: {:?}", e),
            _ => {}
        }

        self.follower.embedded() != before
    }

    fn close(self) -> TopMenuResult<()> {
        let XorgSession {
            conn,
            mut follower,
            mut selection,
        } = self;

        follower.hide();
        if let Some(selection) = selection.as_mut()
            && let Err(e) = selection.unregister()
        {
            info!("Failed to unregister menu server: {}", e);
        }
        follower.teardown();

        let (_, _, socket) = follower.into_parts();
        socket.destroy()?;
        flush_connection(&*conn)
    }
}

/// Check if the stop signal is set.
fn should_stop(stop_signal: Option<&AtomicBool>) -> bool {
    stop_signal.is_some_and(|stop| stop.load(Ordering::Acquire))
}

/// Get the next X11 event, or `None` once the stop signal is set.
fn get_next_event<C: Connection>(
    conn: &C,
    stop_signal: Option<&AtomicBool>,
    config: &FollowerConfig,
) -> TopMenuResult<Option<Event>> {
    match stop_signal {
        Some(_) => {
            // Poll so the stop signal is noticed without an incoming event
            loop {
                if should_stop(stop_signal) {
                    return Ok(None);
                }
                match conn.poll_for_event() {
                    Ok(Some(e)) => return Ok(Some(e)),
                    Ok(None) => std::thread::sleep(config.poll_interval),
                    Err(e) => {
                        return Err(TopMenuError::Platform(format!(
                            "X11 connection failed: {e}"
                        )));
                    }
                }
            }
        }
        None => conn
            .wait_for_event()
            .map(Some)
            .map_err(|e| TopMenuError::Platform(format!("X11 connection failed: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::time::{Duration, Instant};
    use x11rb::{
        COPY_DEPTH_FROM_PARENT, CURRENT_TIME,
        protocol::xproto::{
            AtomEnum, ConfigureWindowAux, ConnectionExt as _, CreateWindowAux, PropMode,
            WindowClass,
        },
        rust_connection::RustConnection,
        wrapper::ConnectionExt as _,
    };

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn integration_enabled() -> bool {
        std::env::var("INTEGRATION_TEST").is_ok_and(|v| v == "1")
    }

    /// A second X11 client playing the part of applications and the WM.
    struct Client {
        conn: RustConnection,
        root: u32,
        visual: u32,
    }

    impl Client {
        fn connect() -> Result<Self, Box<dyn std::error::Error>> {
            let (conn, screen_num) = RustConnection::connect(None)?;
            let screen = &conn.setup().roots[screen_num];
            let (root, visual) = (screen.root, screen.root_visual);
            Ok(Self { conn, root, visual })
        }

        fn create_window(&self) -> Result<u32, Box<dyn std::error::Error>> {
            let window = self.conn.generate_id()?;
            self.conn
                .create_window(
                    COPY_DEPTH_FROM_PARENT,
                    window,
                    self.root,
                    0,
                    0,
                    100,
                    20,
                    0,
                    WindowClass::INPUT_OUTPUT,
                    self.visual,
                    &CreateWindowAux::new(),
                )?
                .check()?;
            Ok(window)
        }

        fn atom(&self, name: &str) -> Result<u32, Box<dyn std::error::Error>> {
            Ok(self.conn.intern_atom(false, name.as_bytes())?.reply()?.atom)
        }

        fn set_window(&self, window: u32, property: u32, value: u32) -> TestResult {
            self.conn
                .change_property32(PropMode::REPLACE, window, property, AtomEnum::WINDOW, &[value])?
                .check()?;
            Ok(())
        }

        fn set_active(&self, window: u32) -> TestResult {
            let active = self.atom("_NET_ACTIVE_WINDOW")?;
            self.set_window(self.root, active, window)
        }

        fn size_of(&self, window: u32) -> Option<(u16, u16)> {
            let geometry = self.conn.get_geometry(window).ok()?.reply().ok()?;
            Some((geometry.width, geometry.height))
        }
    }

    /// Feed session events to the follower until `done` holds or two seconds
    /// pass.
    fn pump_until(
        session: &mut XorgSession,
        mut done: impl FnMut(&XorgSession) -> bool,
    ) -> TopMenuResult<bool> {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if done(session) {
                return Ok(true);
            }
            match session.conn.poll_for_event() {
                Ok(Some(event)) => {
                    session.handle_event(event);
                    flush_connection(&*session.conn)?;
                }
                Ok(None) => std::thread::sleep(Duration::from_millis(10)),
                Err(e) => return Err(TopMenuError::Platform(e.to_string())),
            }
        }
        Ok(done(session))
    }

    fn embedded_is(menu: u32) -> impl FnMut(&XorgSession) -> bool {
        move |session| session.follower.embedded() == TrackedWindow::from_raw(menu)
    }

    #[test]
    #[serial]
    fn events_drive_the_follower() -> TestResult {
        if !integration_enabled() {
            return Ok(());
        }

        let client = Client::connect()?;
        let menu_atom = client.atom(crate::DEFAULT_MENU_WINDOW_ATOM)?;
        let app = client.create_window()?;
        let first = client.create_window()?;
        let second = client.create_window()?;

        let config = FollowerConfig::default().with_server_registration(false);
        let mut session = XorgSession::open(&config)?;
        session.start();

        // Root _NET_ACTIVE_WINDOW change
        client.set_window(app, menu_atom, first)?;
        client.set_active(app)?;
        assert!(pump_until(&mut session, embedded_is(first))?);

        // Menu property change on a followed window
        client.set_window(app, menu_atom, second)?;
        assert!(pump_until(&mut session, embedded_is(second))?);
        assert_eq!(session.follower.follow_set().root(), TrackedWindow::from_raw(app));

        // Embedded window destroyed by its owner
        client.conn.destroy_window(second)?.check()?;
        assert!(pump_until(&mut session, |s| s.follower.embedded().is_none())?);

        session.close()?;
        Ok(())
    }

    #[test]
    #[serial]
    fn host_resize_reaches_socket_and_menu() -> TestResult {
        if !integration_enabled() {
            return Ok(());
        }

        let client = Client::connect()?;
        let menu_atom = client.atom(crate::DEFAULT_MENU_WINDOW_ATOM)?;
        let host = client.create_window()?;
        let app = client.create_window()?;
        let menu = client.create_window()?;

        let config = FollowerConfig::default()
            .with_server_registration(false)
            .with_host_window(host);
        let mut session = XorgSession::open(&config)?;
        session.start();

        client.set_window(app, menu_atom, menu)?;
        client.set_active(app)?;
        assert!(pump_until(&mut session, embedded_is(menu))?);

        client
            .conn
            .configure_window(host, &ConfigureWindowAux::new().width(400).height(30))?
            .check()?;
        let socket = session.follower.surface().socket_window();
        assert!(pump_until(&mut session, |_| client.size_of(socket) == Some((400, 30)))?);
        assert_eq!(client.size_of(menu), Some((400, 30)));
        assert_eq!(session.follower.surface().size(), (400, 30));

        session.close()?;
        Ok(())
    }

    #[test]
    #[serial]
    fn losing_the_selection_is_noticed() -> TestResult {
        if !integration_enabled() {
            return Ok(());
        }

        let client = Client::connect()?;
        let config = FollowerConfig::default();
        let mut session = XorgSession::open(&config)?;
        session.start();

        let registered =
            |s: &XorgSession| s.selection.as_ref().is_some_and(|sel| sel.is_registered());
        assert!(registered(&session));

        let rival = client.create_window()?;
        let selection = client.atom(crate::DEFAULT_SERVER_SELECTION_ATOM)?;
        client
            .conn
            .set_selection_owner(rival, selection, CURRENT_TIME)?
            .check()?;

        assert!(pump_until(&mut session, |s| !registered(s))?);

        session.close()?;
        Ok(())
    }
}
