//! Active-window following.
//!
//! Starting from the active window, the follower walks transient-for links,
//! group leaders and same-application windows until it finds a window that
//! advertises a menu bar window, then embeds that menu. Every window visited
//! on the way is watched so that a later change to any link of the chain
//! restarts the search from the active window.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, warn};

use crate::{
    Atom, EmbedSurface, MenuState, TrackedWindow, WellKnownAtoms, WindowSystem, WindowTracker,
    backend::Watch,
};

/// Name of the ICCCM transient-for property.
const WM_TRANSIENT_FOR: &str = "WM_TRANSIENT_FOR";

/// Why a window is being followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowReason {
    Active,
    TransientFor,
    GroupLeader,
    SiblingWithMenu,
}

#[derive(Debug, Clone, Copy)]
struct Subscription {
    reason: FollowReason,
    watch: Watch,
}

/// Windows visited by the current search, most recently discovered first.
#[derive(Debug, Clone, Default)]
pub struct FollowSet {
    windows: VecDeque<TrackedWindow>,
}

impl FollowSet {
    fn push(&mut self, window: TrackedWindow) {
        self.windows.push_front(window);
    }

    fn clear(&mut self) {
        self.windows.clear();
    }

    pub fn contains(&self, window: TrackedWindow) -> bool {
        self.windows.contains(&window)
    }

    /// The window the search started from.
    pub fn root(&self) -> Option<TrackedWindow> {
        self.windows.back().copied()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = TrackedWindow> + '_ {
        self.windows.iter().copied()
    }
}

pub struct WindowFollower<S, T, E> {
    system: S,
    tracker: T,
    surface: E,
    menu_atom_name: String,
    atoms: Option<WellKnownAtoms>,
    follow_set: FollowSet,
    subscriptions: HashMap<TrackedWindow, Subscription>,
    embedded: Option<TrackedWindow>,
    visible: bool,
}

impl<S, T, E> WindowFollower<S, T, E>
where
    S: WindowSystem,
    T: WindowTracker,
    E: EmbedSurface,
{
    pub fn new(system: S, tracker: T, surface: E, menu_atom_name: impl Into<String>) -> Self {
        Self {
            system,
            tracker,
            surface,
            menu_atom_name: menu_atom_name.into(),
            atoms: None,
            follow_set: FollowSet::default(),
            subscriptions: HashMap::new(),
            embedded: None,
            visible: false,
        }
    }

    /// Give the capability implementations back, e.g. to destroy the surface.
    pub fn into_parts(self) -> (S, T, E) {
        (self.system, self.tracker, self.surface)
    }

    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    pub fn surface(&self) -> &E {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut E {
        &mut self.surface
    }

    pub fn follow_set(&self) -> &FollowSet {
        &self.follow_set
    }

    pub fn embedded(&self) -> Option<TrackedWindow> {
        self.embedded
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Why `window` is followed, if it is.
    pub fn follow_reason(&self, window: TrackedWindow) -> Option<FollowReason> {
        self.subscriptions.get(&window).map(|sub| sub.reason)
    }

    pub fn menu_state(&self) -> MenuState {
        MenuState {
            menu_window: self.embedded,
            active_window: self.follow_set.root(),
            followed: self.follow_set.iter().collect(),
        }
    }

    /// Start following the currently active window.
    pub fn show(&mut self) {
        self.visible = true;
        let active = self.tracker.active_window();
        self.set_active_window(active);
    }

    /// Stop following and drop any embedded menu.
    pub fn hide(&mut self) {
        self.set_active_window(None);
        self.visible = false;
    }

    /// Release every watch without touching the embedded window.
    pub fn teardown(&mut self) {
        self.release_subscriptions();
        self.follow_set.clear();
        self.visible = false;
    }

    pub fn on_active_window_changed(&mut self, window: Option<TrackedWindow>) {
        if !self.visible {
            return;
        }
        match window {
            Some(window) => self.set_active_window(Some(window)),
            None => debug!("No active window; keeping current menu"),
        }
    }

    pub fn on_window_property_changed(&mut self, window: TrackedWindow, property: Atom) {
        let Some(atoms) = self.atoms else {
            return;
        };
        if !atoms.contains(property) || !self.subscriptions.contains_key(&window) {
            return;
        }

        debug!("Followed window {} changed", window);
        let root = self.follow_set.root();
        self.set_active_window(root);
    }

    pub fn on_window_destroyed(&mut self, window: TrackedWindow) {
        if self.subscriptions.remove(&window).is_some() {
            debug!("Followed window {} was destroyed", window);
        }
        if self.embedded == Some(window) {
            debug!("Embedded window {} was destroyed", window);
            self.embedded = None;
        }
    }

    /// Begin a new search generation from `window`.
    pub fn set_active_window(&mut self, window: Option<TrackedWindow>) {
        match window {
            Some(window) => debug!("Setting active window to {}", window),
            None => debug!("Clearing active window"),
        }

        self.release_subscriptions();
        self.follow_set.clear();

        let Some(window) = window else {
            self.embed_window(None);
            return;
        };

        let Some(atoms) = self.well_known_atoms() else {
            self.embed_window(None);
            return;
        };

        let mut visited = HashSet::new();
        if self.follow_from(window, FollowReason::Active, &atoms, &mut visited) {
            debug!("Also following {} windows", self.follow_set.len());
            return;
        }

        debug!(
            "Active window has no menu bar; following {} windows",
            self.follow_set.len()
        );
        self.embed_window(None);
    }

    /// Search for a menu starting at `window` as part of the current
    /// generation, recording `reason` as why it is followed.
    pub fn follow(&mut self, window: TrackedWindow, reason: FollowReason) -> bool {
        let Some(atoms) = self.well_known_atoms() else {
            return false;
        };
        let mut visited: HashSet<TrackedWindow> = self.follow_set.iter().collect();
        self.follow_from(window, reason, &atoms, &mut visited)
    }

    pub fn embed_window(&mut self, target: Option<TrackedWindow>) {
        if self.embedded == target {
            return;
        }

        if let Some(current) = self.embedded.take() {
            debug!("Disembedding window {}", current);
            if let Err(e) = self.surface.detach(current) {
                debug!("Error while disembedding window {}: {}", current, e);
            }
        }

        if let Some(target) = target {
            debug!("Embedding window {}", target);
            match self.surface.attach(target) {
                Ok(()) => self.embedded = Some(target),
                Err(e) => debug!("Failed to embed window {}: {}", target, e),
            }
        }
    }

    fn follow_from(
        &mut self,
        window: TrackedWindow,
        reason: FollowReason,
        atoms: &WellKnownAtoms,
        visited: &mut HashSet<TrackedWindow>,
    ) -> bool {
        if Some(window) == self.surface.host_toplevel() {
            return false;
        }
        if !visited.insert(window) {
            debug!("Window {} already visited in this search", window);
            return false;
        }

        match self.system.select_changes(window) {
            Ok(watch) => {
                self.subscriptions
                    .insert(window, Subscription { reason, watch });
            }
            Err(e) => {
                debug!("Got error while trying to follow window {}: {}", window, e);
                return false;
            }
        }
        self.follow_set.push(window);

        if let Some(menu_window) = self.system.read_window_property(window, atoms.menu_window) {
            self.embed_window(Some(menu_window));
            return true;
        }

        if let Some(transient_for) = self.tracker.transient_for(window)
            && transient_for != window
            && self.follow_from(transient_for, FollowReason::TransientFor, atoms, visited)
        {
            return true;
        }

        if let Some(leader) = self.tracker.group_leader(window)
            && leader != window
            && self.follow_from(leader, FollowReason::GroupLeader, atoms, visited)
        {
            return true;
        }

        if let Some(other) = self.find_application_window_with_menu(window, atoms)
            && self.follow_from(other, FollowReason::SiblingWithMenu, atoms, visited)
        {
            return true;
        }

        false
    }

    fn find_application_window_with_menu(
        &self,
        window: TrackedWindow,
        atoms: &WellKnownAtoms,
    ) -> Option<TrackedWindow> {
        self.tracker
            .application_windows(window)
            .into_iter()
            .filter(|&candidate| candidate != window)
            .find(|&candidate| {
                self.system
                    .read_window_property(candidate, atoms.menu_window)
                    .is_some()
            })
    }

    fn well_known_atoms(&mut self) -> Option<WellKnownAtoms> {
        if self.atoms.is_none() {
            let resolved = self
                .system
                .intern_atom(&self.menu_atom_name)
                .and_then(|menu_window| {
                    let transient_for = self.system.intern_atom(WM_TRANSIENT_FOR)?;
                    Ok(WellKnownAtoms {
                        menu_window,
                        transient_for,
                    })
                });
            match resolved {
                Ok(atoms) => self.atoms = Some(atoms),
                Err(e) => warn!("Failed to resolve menu atoms: {}", e),
            }
        }
        self.atoms
    }

    fn release_subscriptions(&mut self) {
        for (window, sub) in self.subscriptions.drain() {
            self.system.restore_changes(window, sub.watch);
        }
    }
}
