//! Per-view show/hide state machine.
//!
//! The machine never changes on-screen visibility itself. It debounces the
//! requests coming from pointer, drag and window-overlap triggers through
//! two single-shot timers and emits [`VisibilityEvent::MustBeShown`] /
//! [`VisibilityEvent::MustBeHidden`]; the owning view answers by calling
//! [`VisibilityStateMachine::set_is_hidden`].

use std::time::Duration;

use ratatui::layout::Rect;

use super::ViewEvent;
use super::mode::VisibilityMode;
use super::sentinel::EdgeSentinel;
use super::window_tracker::{TrackerSignal, TrackerSignals};
use crate::config::{ConfigGroup, keys};
use crate::constants::{
    DEFAULT_TIMER_HIDE, DEFAULT_TIMER_SHOW, RAISE_TEMPORARILY_MAX, RAISE_TEMPORARILY_MIN,
    STARTUP_MODE_DELAY, STARTUP_MODE_DELAY_CONFIGURING,
};
use crate::edge::Edge;
use crate::error::VisibilityError;
use crate::registry::PanelId;
use crate::scheduler::{Scheduler, SharedClock, SingleShot, TimerToken};
use crate::window_system::{SharedWindowSystem, WindowRef};

/// Collaborators handed to a machine at construction.
#[derive(Clone)]
pub struct VisibilityDeps {
    pub view: PanelId,
    pub wm: SharedWindowSystem,
    pub config: ConfigGroup,
    pub clock: SharedClock,
    /// Whether the owning layout is the active one.
    pub layout_active: bool,
    /// Create the view window outside window-manager control.
    pub by_pass_wm: bool,
}

/// Where the view sits: its own rectangle, the edge it hugs and the
/// geometry of its screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewRegion {
    pub edge: Edge,
    pub geometry: Rect,
    pub screen: Rect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityEvent {
    MustBeShown,
    MustBeHidden,
    ModeChanged(VisibilityMode),
    IsHiddenChanged(bool),
    BlockHidingChanged(bool),
    ContainsMouseChanged(bool),
    SupportsEdgesChanged(bool),
    /// Usable screen area may have changed (struts come and go with modes).
    AvailableScreenRectChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    Show,
    Hide,
    RaiseExpired,
    StartupMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reaction {
    RaiseOnPointer,
    DodgeActive,
    DodgeMaximized,
    DodgeAllWindows,
}

/// Mode-specific wiring, rebuilt on every mode change.
#[derive(Debug, Default)]
struct Subscriptions {
    desktop_and_activity: bool,
    pointer: Option<Reaction>,
    tracker: Vec<(TrackerSignal, Reaction)>,
}

pub struct VisibilityStateMachine {
    view: PanelId,
    wm: SharedWindowSystem,
    config: ConfigGroup,
    clock: SharedClock,

    mode: Option<VisibilityMode>,
    is_hidden: bool,
    contains_mouse: bool,
    drag_enter: bool,
    block_hiding: bool,
    raise_temporarily: bool,
    hide_now: bool,
    raise_on_desktop: bool,
    raise_on_activity: bool,
    enable_edges: bool,
    layout_active: bool,
    by_pass_wm: bool,

    region: ViewRegion,
    tracker: TrackerSignals,
    subscriptions: Subscriptions,
    sentinel: Option<EdgeSentinel>,

    scheduler: Scheduler<Task>,
    timer_show: SingleShot,
    timer_hide: SingleShot,
    timer_raise: SingleShot,
    timer_startup: SingleShot,

    events: Vec<VisibilityEvent>,
}

impl std::fmt::Debug for VisibilityStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisibilityStateMachine")
            .field("view", &self.view)
            .field("mode", &self.mode)
            .field("is_hidden", &self.is_hidden)
            .field("contains_mouse", &self.contains_mouse)
            .field("drag_enter", &self.drag_enter)
            .field("block_hiding", &self.block_hiding)
            .field("raise_temporarily", &self.raise_temporarily)
            .finish_non_exhaustive()
    }
}

impl VisibilityStateMachine {
    pub fn new(deps: VisibilityDeps, region: ViewRegion) -> Self {
        let VisibilityDeps {
            view,
            wm,
            config,
            clock,
            layout_active,
            by_pass_wm,
        } = deps;
        tracing::debug!(panel = %view, "visibility machine created");
        let mut machine = Self {
            view,
            wm,
            config,
            clock,
            mode: None,
            is_hidden: false,
            contains_mouse: false,
            drag_enter: false,
            block_hiding: false,
            raise_temporarily: false,
            hide_now: false,
            raise_on_desktop: false,
            raise_on_activity: false,
            enable_edges: true,
            layout_active,
            by_pass_wm,
            region,
            tracker: TrackerSignals::default(),
            subscriptions: Subscriptions::default(),
            sentinel: None,
            scheduler: Scheduler::new(),
            timer_show: SingleShot::new(DEFAULT_TIMER_SHOW),
            timer_hide: SingleShot::new(DEFAULT_TIMER_HIDE),
            timer_raise: SingleShot::new(RAISE_TEMPORARILY_MIN),
            timer_startup: SingleShot::new(STARTUP_MODE_DELAY),
            events: Vec::new(),
        };
        let window = WindowRef::View(view);
        machine.wm.set_view_extra_flags(window, by_pass_wm);
        machine.wm.add_window(window);
        machine.restore_config();
        machine
    }

    pub fn view(&self) -> PanelId {
        self.view
    }

    pub fn by_pass_wm(&self) -> bool {
        self.by_pass_wm
    }

    /// Re-applies the view window flags when the bypass request changes.
    pub fn set_by_pass_wm(&mut self, by_pass_wm: bool) {
        if self.by_pass_wm == by_pass_wm {
            return;
        }
        self.by_pass_wm = by_pass_wm;
        tracing::debug!(panel = %self.view, by_pass_wm, "window manager bypass changed");
        self.wm.set_view_extra_flags(WindowRef::View(self.view), by_pass_wm);
    }

    /// `None` until the stored mode has been applied.
    pub fn mode(&self) -> Option<VisibilityMode> {
        self.mode
    }

    pub fn is_hidden(&self) -> bool {
        self.is_hidden
    }

    pub fn contains_mouse(&self) -> bool {
        self.contains_mouse
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_enter
    }

    pub fn block_hiding(&self) -> bool {
        self.block_hiding
    }

    pub fn is_raised_temporarily(&self) -> bool {
        self.raise_temporarily
    }

    pub fn tracker(&self) -> TrackerSignals {
        self.tracker
    }

    pub fn region(&self) -> ViewRegion {
        self.region
    }

    pub fn sentinel(&self) -> Option<&EdgeSentinel> {
        self.sentinel.as_ref()
    }

    pub fn supports_edges(&self) -> bool {
        self.sentinel.is_some()
    }

    pub fn is_layout_active(&self) -> bool {
        self.layout_active
    }

    pub fn set_mode(&mut self, mode: VisibilityMode) {
        if self.mode == Some(mode) {
            return;
        }
        self.subscriptions = Subscriptions::default();
        if self.mode == Some(VisibilityMode::AlwaysVisible) {
            self.wm.remove_view_struts(self.view);
        }
        self.timer_show.stop(&mut self.scheduler);
        self.timer_hide.stop(&mut self.scheduler);
        tracing::debug!(panel = %self.view, from = ?self.mode, to = ?mode, "visibility mode");
        self.mode = Some(mode);
        self.subscriptions.desktop_and_activity = mode.can_hide();

        match mode {
            VisibilityMode::AlwaysVisible => {
                self.update_struts();
                self.raise_view(true);
            }
            VisibilityMode::AutoHide => {
                self.subscriptions.pointer = Some(Reaction::RaiseOnPointer);
                self.auto_hide();
            }
            VisibilityMode::DodgeActive => {
                self.subscriptions.pointer = Some(Reaction::DodgeActive);
                self.subscriptions.tracker =
                    vec![(TrackerSignal::ActiveWindowTouching, Reaction::DodgeActive)];
                self.dodge_active();
            }
            VisibilityMode::DodgeMaximized => {
                self.subscriptions.pointer = Some(Reaction::DodgeMaximized);
                self.subscriptions.tracker =
                    vec![(TrackerSignal::ActiveWindowMaximized, Reaction::DodgeMaximized)];
                self.dodge_maximized();
            }
            VisibilityMode::DodgeAllWindows => {
                self.subscriptions.pointer = Some(Reaction::DodgeAllWindows);
                self.subscriptions.tracker = vec![
                    (TrackerSignal::ActiveWindowTouching, Reaction::DodgeAllWindows),
                    (TrackerSignal::ExistsWindowTouching, Reaction::DodgeAllWindows),
                ];
                self.dodge_all_windows();
            }
            VisibilityMode::WindowsGoBelow => self.raise_view(true),
        }

        self.config.write_entry(keys::VISIBILITY, mode.to_setting());
        self.update_edges_support();
        self.events.push(VisibilityEvent::ModeChanged(mode));
        self.events.push(VisibilityEvent::AvailableScreenRectChanged);
    }

    /// Called by the view once it has actually shown or hidden itself.
    pub fn set_is_hidden(&mut self, hidden: bool) -> Result<(), VisibilityError> {
        if self.is_hidden == hidden {
            return Ok(());
        }
        if self.block_hiding && hidden {
            tracing::warn!(panel = %self.view, "isHidden property is blocked, ignoring update");
            return Err(VisibilityError::HidingBlocked);
        }
        self.is_hidden = hidden;
        self.update_sentinel_state();
        self.events.push(VisibilityEvent::IsHiddenChanged(hidden));
        Ok(())
    }

    pub fn set_block_hiding(&mut self, block: bool) {
        if self.block_hiding == block {
            return;
        }
        self.block_hiding = block;
        if block {
            self.timer_hide.stop(&mut self.scheduler);
            if self.is_hidden {
                self.must_be_shown();
            }
        } else {
            self.update_hidden_state();
        }
        self.events.push(VisibilityEvent::BlockHidingChanged(block));
    }

    pub fn timer_show(&self) -> Duration {
        self.timer_show.interval()
    }

    pub fn set_timer_show(&mut self, interval: Duration) {
        self.timer_show.set_interval(interval);
    }

    pub fn timer_hide(&self) -> Duration {
        self.timer_hide.interval()
    }

    pub fn set_timer_hide(&mut self, interval: Duration) {
        self.timer_hide.set_interval(interval);
    }

    pub fn raise_on_desktop(&self) -> bool {
        self.raise_on_desktop
    }

    pub fn set_raise_on_desktop(&mut self, enable: bool) {
        self.raise_on_desktop = enable;
    }

    pub fn raise_on_activity(&self) -> bool {
        self.raise_on_activity
    }

    pub fn set_raise_on_activity(&mut self, enable: bool) {
        self.raise_on_activity = enable;
    }

    pub fn enable_edges(&self) -> bool {
        self.enable_edges
    }

    pub fn set_enable_edges(&mut self, enable: bool) {
        if self.enable_edges == enable {
            return;
        }
        self.enable_edges = enable;
        self.update_edges_support();
    }

    pub fn handle_view_event(&mut self, event: ViewEvent) {
        match event {
            ViewEvent::Enter => self.set_contains_mouse(true),
            ViewEvent::Leave => self.set_contains_mouse(false),
            ViewEvent::DragEnter => {
                self.drag_enter = true;
                if self.is_hidden {
                    self.must_be_shown();
                }
            }
            ViewEvent::DragLeave | ViewEvent::Drop => {
                self.drag_enter = false;
                self.update_hidden_state();
            }
            ViewEvent::Show => self
                .wm
                .set_view_extra_flags(WindowRef::View(self.view), self.by_pass_wm),
        }
    }

    /// Pointer entered or left the edge sentinel.
    pub fn sentinel_contains_mouse_changed(&mut self, contains: bool) {
        let Some(sentinel) = self.sentinel.as_mut() else {
            return;
        };
        if !sentinel.set_contains_mouse(contains) {
            return;
        }
        if contains {
            self.raise_view(true);
        } else {
            self.timer_show.stop(&mut self.scheduler);
            self.update_sentinel_state();
        }
    }

    pub fn set_tracker_signal(&mut self, signal: TrackerSignal, value: bool) {
        if self.tracker.get(signal) == value {
            return;
        }
        self.tracker.set(signal, value);
        let reactions: Vec<Reaction> = self
            .subscriptions
            .tracker
            .iter()
            .filter(|(subscribed, _)| *subscribed == signal)
            .map(|(_, reaction)| *reaction)
            .collect();
        for reaction in reactions {
            self.react(reaction);
        }
    }

    pub fn set_tracker_signals(&mut self, signals: TrackerSignals) {
        for (signal, value) in self.tracker.changes(&signals) {
            self.set_tracker_signal(signal, value);
        }
    }

    /// The user started moving the active window.
    pub fn active_window_dragging_started(&mut self) {
        self.set_contains_mouse(false);
        self.update_hidden_state();
    }

    /// Forces the panel visible for a bounded window regardless of mode
    /// triggers, then re-evaluates.
    pub fn raise_view_temporarily(&mut self) {
        if self.raise_temporarily {
            return;
        }
        self.raise_temporarily = true;
        self.timer_hide.stop(&mut self.scheduler);
        self.timer_show.stop(&mut self.scheduler);
        if self.is_hidden {
            self.must_be_shown();
        }
        let window = (self.timer_hide.interval() * 2).clamp(RAISE_TEMPORARILY_MIN, RAISE_TEMPORARILY_MAX);
        self.timer_raise.set_interval(window);
        let now = self.clock.now();
        self.timer_raise
            .start(&mut self.scheduler, now, Task::RaiseExpired);
    }

    pub fn on_current_desktop_changed(&mut self) {
        if self.subscriptions.desktop_and_activity && self.raise_on_desktop {
            self.raise_view_temporarily();
        }
    }

    pub fn on_current_activity_changed(&mut self) {
        if self.subscriptions.desktop_and_activity {
            if self.raise_on_activity {
                self.raise_view_temporarily();
            } else {
                self.update_hidden_state();
            }
        }
        if self.mode == Some(VisibilityMode::AlwaysVisible) {
            self.update_struts();
        }
        self.update_sentinel_state();
    }

    pub fn set_layout_active(&mut self, active: bool) {
        if self.layout_active == active {
            return;
        }
        self.layout_active = active;
        if self.mode == Some(VisibilityMode::AlwaysVisible) {
            self.update_struts();
        }
        self.update_sentinel_state();
    }

    /// The view moved or was resized.
    pub fn set_region(&mut self, region: ViewRegion) {
        if self.region == region {
            return;
        }
        self.region = region;
        if let Some(sentinel) = self.sentinel.as_mut() {
            sentinel.relocate(region.edge, region.screen);
        }
        if self.mode == Some(VisibilityMode::AlwaysVisible) {
            self.update_struts();
        }
    }

    pub fn apply_activities_to_hidden_windows(&self, activities: &[String]) {
        if let Some(sentinel) = &self.sentinel {
            self.wm.set_window_on_activities(sentinel.window(), activities);
        }
    }

    pub fn restore_config(&mut self) {
        let config = self.config.clone();
        self.timer_show.set_interval(read_interval(&config, keys::TIMER_SHOW, DEFAULT_TIMER_SHOW));
        self.timer_hide.set_interval(read_interval(&config, keys::TIMER_HIDE, DEFAULT_TIMER_HIDE));
        self.enable_edges = config.read_bool(keys::ENABLE_KWIN_EDGES, true);
        self.raise_on_desktop = config.read_bool(keys::RAISE_ON_DESKTOP_CHANGE, false);
        self.raise_on_activity = config.read_bool(keys::RAISE_ON_ACTIVITY_CHANGE, false);

        let stored = VisibilityMode::read_from(&config);
        if stored == VisibilityMode::AlwaysVisible {
            tracing::debug!(panel = %self.view, "loading always visible mode on startup");
            self.set_mode(stored);
        } else {
            let now = self.clock.now();
            self.timer_startup.set_interval(STARTUP_MODE_DELAY);
            self.timer_startup
                .start(&mut self.scheduler, now, Task::StartupMode);
        }
    }

    pub fn save_config(&self) {
        self.config.write_entry(keys::ENABLE_KWIN_EDGES, self.enable_edges);
        self.config
            .write_entry(keys::TIMER_SHOW, duration_setting(self.timer_show.interval()));
        self.config
            .write_entry(keys::TIMER_HIDE, duration_setting(self.timer_hide.interval()));
        self.config
            .write_entry(keys::RAISE_ON_DESKTOP_CHANGE, self.raise_on_desktop);
        self.config
            .write_entry(keys::RAISE_ON_ACTIVITY_CHANGE, self.raise_on_activity);
        self.config.sync();
    }

    /// The settings dialog of the panel opened or closed.
    pub fn user_configuring_changed(&mut self, configuring: bool) {
        if configuring {
            if self.timer_startup.is_active() {
                let now = self.clock.now();
                self.timer_startup
                    .set_interval(STARTUP_MODE_DELAY_CONFIGURING);
                self.timer_startup
                    .start(&mut self.scheduler, now, Task::StartupMode);
            }
        } else {
            self.save_config();
        }
    }

    /// Runs every timer that is due.
    pub fn poll(&mut self) {
        let now = self.clock.now();
        while let Some((token, task)) = self.scheduler.pop_due(now) {
            self.fire(token, task);
        }
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.scheduler.next_deadline()
    }

    pub fn take_events(&mut self) -> Vec<VisibilityEvent> {
        std::mem::take(&mut self.events)
    }

    fn fire(&mut self, token: TimerToken, task: Task) {
        match task {
            Task::Show => {
                if self.timer_show.take_fired(token) && self.is_hidden {
                    self.must_be_shown();
                }
            }
            Task::Hide => {
                if self.timer_hide.take_fired(token)
                    && !self.block_hiding
                    && !self.is_hidden
                    && !self.drag_enter
                {
                    self.must_be_hidden();
                }
            }
            Task::RaiseExpired => {
                if self.timer_raise.take_fired(token) {
                    self.raise_temporarily = false;
                    self.hide_now = true;
                    self.update_hidden_state();
                }
            }
            Task::StartupMode => {
                if self.timer_startup.take_fired(token) {
                    let mode = VisibilityMode::read_from(&self.config);
                    tracing::debug!(panel = %self.view, ?mode, "loading visibility mode on startup");
                    self.set_mode(mode);
                }
            }
        }
    }

    fn set_contains_mouse(&mut self, contains: bool) {
        if self.contains_mouse == contains {
            return;
        }
        self.contains_mouse = contains;
        self.events.push(VisibilityEvent::ContainsMouseChanged(contains));
        if let Some(reaction) = self.subscriptions.pointer {
            self.react(reaction);
        }
        if contains && self.mode != Some(VisibilityMode::AlwaysVisible) {
            self.raise_view(true);
        }
    }

    fn react(&mut self, reaction: Reaction) {
        match reaction {
            Reaction::RaiseOnPointer => self.auto_hide(),
            Reaction::DodgeActive => self.dodge_active(),
            Reaction::DodgeMaximized => self.dodge_maximized(),
            Reaction::DodgeAllWindows => self.dodge_all_windows(),
        }
    }

    fn raise_view(&mut self, raise: bool) {
        if self.block_hiding {
            return;
        }
        let now = self.clock.now();
        if raise {
            self.timer_hide.stop(&mut self.scheduler);
            if !self.timer_show.is_active() {
                self.timer_show.start(&mut self.scheduler, now, Task::Show);
            }
        } else if !self.drag_enter {
            self.timer_show.stop(&mut self.scheduler);
            if self.hide_now {
                self.hide_now = false;
                self.must_be_hidden();
            } else if !self.timer_hide.is_active() {
                self.timer_hide.start(&mut self.scheduler, now, Task::Hide);
            }
        }
    }

    fn update_hidden_state(&mut self) {
        if self.drag_enter {
            return;
        }
        match self.mode {
            Some(VisibilityMode::AutoHide) => self.auto_hide(),
            Some(VisibilityMode::DodgeActive) => self.dodge_active(),
            Some(VisibilityMode::DodgeMaximized) => self.dodge_maximized(),
            Some(VisibilityMode::DodgeAllWindows) => self.dodge_all_windows(),
            _ => {}
        }
    }

    fn auto_hide(&mut self) {
        if self.raise_temporarily {
            return;
        }
        self.raise_view(self.contains_mouse);
    }

    fn dodge_active(&mut self) {
        if self.raise_temporarily {
            return;
        }
        // never hide under the pointer
        if self.contains_mouse {
            self.raise_view(true);
            return;
        }
        self.raise_view(!self.tracker.active_window_touching);
    }

    fn dodge_maximized(&mut self) {
        if self.raise_temporarily {
            return;
        }
        if self.contains_mouse {
            self.raise_view(true);
            return;
        }
        self.raise_view(!self.tracker.active_window_maximized);
    }

    fn dodge_all_windows(&mut self) {
        if self.raise_temporarily {
            return;
        }
        if self.contains_mouse {
            self.raise_view(true);
            return;
        }
        let intersects =
            self.tracker.active_window_touching || self.tracker.exists_window_touching;
        self.raise_view(!intersects);
    }

    fn must_be_shown(&mut self) {
        self.events.retain(|e| *e != VisibilityEvent::MustBeHidden);
        self.events.push(VisibilityEvent::MustBeShown);
    }

    fn must_be_hidden(&mut self) {
        self.events.retain(|e| *e != VisibilityEvent::MustBeShown);
        self.events.push(VisibilityEvent::MustBeHidden);
    }

    fn update_struts(&self) {
        if self.layout_active {
            self.wm
                .set_view_struts(self.view, self.region.geometry, self.region.edge);
        } else {
            self.wm.remove_view_struts(self.view);
        }
    }

    fn update_edges_support(&mut self) {
        let Some(mode) = self.mode else {
            return;
        };
        if mode.can_hide() && self.enable_edges {
            self.create_sentinel();
        } else {
            self.delete_sentinel();
        }
    }

    fn create_sentinel(&mut self) {
        if self.sentinel.is_some() {
            return;
        }
        let sentinel = EdgeSentinel::new(self.view, self.region.edge, self.region.screen);
        let window = sentinel.window();
        self.wm.add_window(window);
        self.wm.set_view_extra_flags(window, false);
        self.sentinel = Some(sentinel);
        tracing::debug!(panel = %self.view, edge = %self.region.edge, "edge sentinel created");
        self.update_sentinel_state();
        self.events.push(VisibilityEvent::SupportsEdgesChanged(true));
    }

    fn delete_sentinel(&mut self) {
        if let Some(sentinel) = self.sentinel.take() {
            self.wm.remove_window(sentinel.window());
            tracing::debug!(panel = %self.view, "edge sentinel deleted");
            self.events.push(VisibilityEvent::SupportsEdgesChanged(false));
        }
    }

    fn update_sentinel_state(&mut self) {
        let active = self.layout_active && self.is_hidden;
        if let Some(sentinel) = self.sentinel.as_mut() {
            sentinel.set_active(active);
            self.wm.set_edge_state_for(sentinel.window(), active);
        }
    }
}

impl Drop for VisibilityStateMachine {
    fn drop(&mut self) {
        tracing::debug!(panel = %self.view, "visibility machine dropped");
        self.wm.remove_view_struts(self.view);
        if let Some(sentinel) = self.sentinel.take() {
            self.wm.remove_window(sentinel.window());
        }
        self.wm.remove_window(WindowRef::View(self.view));
    }
}

fn read_interval(config: &ConfigGroup, key: &str, default: Duration) -> Duration {
    let default_ms = i64::try_from(default.as_millis()).unwrap_or(i64::MAX);
    let ms = config.read_int(key, default_ms).max(0);
    Duration::from_millis(u64::try_from(ms).unwrap_or(0))
}

fn duration_setting(interval: Duration) -> i64 {
    i64::try_from(interval.as_millis()).unwrap_or(i64::MAX)
}
