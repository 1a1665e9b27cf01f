//! Common test utilities for topmenu-follower integration tests
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::env;
use std::rc::Rc;

use topmenu_follower::{
    Atom, EmbedSurface, TopMenuError, TopMenuResult, TrackedWindow, Watch, WindowFollower,
    WindowSystem, WindowTracker,
};

pub const ROOT: u32 = 0x1;
pub const MENU_ATOM: Atom = 500;
pub const TRANSIENT_ATOM: Atom = 68;
pub const ACTIVE_ATOM: Atom = 350;
pub const WM_NAME_ATOM: Atom = 39;

/// Bits the follower selects on followed windows.
pub const FOLLOW_MASK: u32 = 0x0002_0000 | 0x0040_0000;

/// Build a window handle from a non-null id
pub fn win(id: u32) -> TrackedWindow {
    TrackedWindow::from_raw(id).expect("test window ids are non-zero")
}

/// Embedding commands issued to the fake surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Attach(TrackedWindow),
    Detach(TrackedWindow),
}

/// Event selection changes made through the fake window system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Selected(TrackedWindow),
    Restored(TrackedWindow),
}

#[derive(Debug, Clone, Default)]
pub struct FakeWindow {
    pub application: u32,
    pub menu: Option<TrackedWindow>,
    pub transient_for: Option<TrackedWindow>,
    pub leader: Option<TrackedWindow>,
}

#[derive(Debug, Default)]
pub struct DesktopState {
    pub windows: HashMap<TrackedWindow, FakeWindow>,
    /// Bottommost first
    pub stacking: Vec<TrackedWindow>,
    pub active: Option<TrackedWindow>,
    pub host: Option<TrackedWindow>,
    pub masks: HashMap<TrackedWindow, u32>,
    pub commands: Vec<Command>,
    pub selections: Vec<Selection>,
    pub fail_intern: bool,
    pub fail_attach: HashSet<TrackedWindow>,
    /// Windows destroyed right after their events are selected
    pub vanish_after_watch: HashSet<TrackedWindow>,
}

/// In-memory desktop implementing every capability the follower needs
#[derive(Debug, Clone, Default)]
pub struct FakeDesktop(Rc<RefCell<DesktopState>>);

pub type FakeFollower = WindowFollower<FakeDesktop, FakeDesktop, FakeDesktop>;

impl FakeDesktop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn follower(&self) -> FakeFollower {
        WindowFollower::new(self.clone(), self.clone(), self.clone(), "_TOPMENU_WINDOW")
    }

    /// Add a window on top of the stack
    pub fn add_window(&self, id: u32, application: u32) -> TrackedWindow {
        let window = win(id);
        let mut state = self.0.borrow_mut();
        state.windows.insert(
            window,
            FakeWindow {
                application,
                ..FakeWindow::default()
            },
        );
        state.stacking.push(window);
        window
    }

    pub fn set_menu(&self, id: u32, menu: u32) {
        self.with_window(id, |w| w.menu = TrackedWindow::from_raw(menu));
    }

    pub fn set_transient_for(&self, id: u32, target: u32) {
        self.with_window(id, |w| w.transient_for = TrackedWindow::from_raw(target));
    }

    pub fn set_leader(&self, id: u32, leader: u32) {
        self.with_window(id, |w| w.leader = TrackedWindow::from_raw(leader));
    }

    pub fn set_active(&self, id: u32) {
        self.0.borrow_mut().active = TrackedWindow::from_raw(id);
    }

    pub fn set_host(&self, id: u32) {
        self.0.borrow_mut().host = TrackedWindow::from_raw(id);
    }

    pub fn set_mask(&self, id: u32, mask: u32) {
        self.0.borrow_mut().masks.insert(win(id), mask);
    }

    pub fn destroy(&self, id: u32) {
        let mut state = self.0.borrow_mut();
        state.windows.remove(&win(id));
        state.stacking.retain(|&w| w != win(id));
    }

    pub fn vanish_after_watch(&self, id: u32) {
        self.0.borrow_mut().vanish_after_watch.insert(win(id));
    }

    pub fn fail_attach(&self, id: u32) {
        self.0.borrow_mut().fail_attach.insert(win(id));
    }

    pub fn set_fail_intern(&self, fail: bool) {
        self.0.borrow_mut().fail_intern = fail;
    }

    pub fn mask(&self, id: u32) -> u32 {
        self.0.borrow().masks.get(&win(id)).copied().unwrap_or(0)
    }

    pub fn commands(&self) -> Vec<Command> {
        self.0.borrow().commands.clone()
    }

    pub fn selections(&self) -> Vec<Selection> {
        self.0.borrow().selections.clone()
    }

    pub fn clear_logs(&self) {
        let mut state = self.0.borrow_mut();
        state.commands.clear();
        state.selections.clear();
    }

    fn with_window(&self, id: u32, f: impl FnOnce(&mut FakeWindow)) {
        let mut state = self.0.borrow_mut();
        let window = state
            .windows
            .get_mut(&win(id))
            .expect("window must be added before it is configured");
        f(window);
    }

    fn window(&self, window: TrackedWindow) -> Option<FakeWindow> {
        self.0.borrow().windows.get(&window).cloned()
    }
}

impl WindowSystem for FakeDesktop {
    fn intern_atom(&self, name: &str) -> TopMenuResult<Atom> {
        if self.0.borrow().fail_intern {
            return Err(TopMenuError::Platform("intern failed".to_string()));
        }
        match name {
            "_TOPMENU_WINDOW" => Ok(MENU_ATOM),
            "WM_TRANSIENT_FOR" => Ok(TRANSIENT_ATOM),
            other => Err(TopMenuError::new(format!("unexpected atom {other}"))),
        }
    }

    fn select_changes(&self, window: TrackedWindow) -> TopMenuResult<Watch> {
        let mut state = self.0.borrow_mut();
        if !state.windows.contains_key(&window) {
            return Err(TopMenuError::WindowGone(window));
        }

        let prior = state.masks.get(&window).copied().unwrap_or(0);
        state.masks.insert(window, prior | FOLLOW_MASK);
        state.selections.push(Selection::Selected(window));

        if state.vanish_after_watch.contains(&window) {
            state.windows.remove(&window);
        }

        Ok(Watch::new(prior))
    }

    fn restore_changes(&self, window: TrackedWindow, watch: Watch) {
        let mut state = self.0.borrow_mut();
        state.masks.insert(window, watch.prior_mask());
        state.selections.push(Selection::Restored(window));
    }

    fn read_window_property(
        &self,
        window: TrackedWindow,
        property: Atom,
    ) -> Option<TrackedWindow> {
        let window = self.window(window)?;
        match property {
            MENU_ATOM => window.menu,
            TRANSIENT_ATOM => window.transient_for,
            _ => None,
        }
    }
}

impl WindowTracker for FakeDesktop {
    fn active_window(&self) -> Option<TrackedWindow> {
        self.0.borrow().active
    }

    fn transient_for(&self, window: TrackedWindow) -> Option<TrackedWindow> {
        self.window(window)?.transient_for
    }

    fn group_leader(&self, window: TrackedWindow) -> Option<TrackedWindow> {
        self.window(window)?.leader
    }

    fn application_windows(&self, window: TrackedWindow) -> Vec<TrackedWindow> {
        let Some(application) = self.window(window).map(|w| w.application) else {
            return Vec::new();
        };
        let state = self.0.borrow();
        state
            .stacking
            .iter()
            .rev()
            .copied()
            .filter(|w| {
                state
                    .windows
                    .get(w)
                    .is_some_and(|fake| fake.application == application)
            })
            .collect()
    }

    fn is_active_window_change(&self, window: TrackedWindow, property: Atom) -> bool {
        window.id() == ROOT && property == ACTIVE_ATOM
    }
}

impl EmbedSurface for FakeDesktop {
    fn attach(&mut self, window: TrackedWindow) -> TopMenuResult<()> {
        let mut state = self.0.borrow_mut();
        if state.fail_attach.contains(&window) {
            return Err(TopMenuError::WindowGone(window));
        }
        state.commands.push(Command::Attach(window));
        Ok(())
    }

    fn detach(&mut self, window: TrackedWindow) -> TopMenuResult<()> {
        self.0.borrow_mut().commands.push(Command::Detach(window));
        Ok(())
    }

    fn host_toplevel(&self) -> Option<TrackedWindow> {
        self.0.borrow().host
    }
}

/// Check if integration tests should run
///
/// Tests will only run if INTEGRATION_TEST=1 environment variable is set
pub fn should_run_integration_tests() -> bool {
    env::var("INTEGRATION_TEST")
        .map(|v| v == "1")
        .unwrap_or(false)
}

/// Check if we should use X11 backend
///
/// Returns true if X11=1 environment variable is set
pub fn should_use_x11() -> bool {
    env::var("X11").map(|v| v == "1").unwrap_or(false)
}

/// Setup test environment based on flags
pub fn setup_test_environment() -> Result<(), Box<dyn std::error::Error>> {
    if !should_run_integration_tests() {
        return Err("Integration tests disabled. Set INTEGRATION_TEST=1 to enable.".into());
    }

    if should_use_x11() {
        unsafe {
            env::set_var("DISPLAY", ":99");
        }
        println!("Using X11 backend for tests");
    }

    Ok(())
}
