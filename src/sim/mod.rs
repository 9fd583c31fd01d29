//! Terminal desktop simulator.
//!
//! The terminal is split into up to four side-by-side "screens". Panels are
//! drawn on their edges; the mouse is the pointer and the keyboard drives
//! topology changes and panel settings.

pub mod keymap;
pub mod render;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use ratatui::layout::Rect;

use crate::config::{ConfigGroup, MemoryConfig, keys};
use crate::edge::Edge;
use crate::layout::{LayoutDeps, ViewLifecycle};
use crate::registry::{PanelDefinition, PanelId, PanelRegistry, group_name};
use crate::scheduler::SharedClock;
use crate::screens::{ScreenDirectory, ScreenId};
use crate::view::{ViewEvent, VisibilityEvent, WindowInfo};
use crate::window_system::RecordingWindowSystem;

pub use keymap::{SimAction, action_for};

pub const CONNECTORS: [&str; 4] = ["eDP-1", "HDMI-1", "DP-1", "DP-2"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimOptions {
    pub screens: usize,
    pub panels: usize,
    pub timer_hide: Duration,
}

pub struct Simulator {
    layout: ViewLifecycle,
    wm: Rc<RecordingWindowSystem>,
    store: Rc<RefCell<MemoryConfig>>,
    desktop: Rect,
    timer_hide: Duration,
    selected: Option<PanelId>,
    active_window: bool,
    maximized: bool,
    other_window: bool,
    dragging: bool,
}

impl Simulator {
    pub fn new(options: SimOptions, desktop: Rect, clock: SharedClock) -> Self {
        let store = MemoryConfig::shared();
        let wm = RecordingWindowSystem::shared();
        let deps = LayoutDeps {
            screens: ScreenDirectory::shared(),
            wm: wm.clone(),
            clock,
        };
        let layout = ViewLifecycle::new(PanelRegistry::load(store.clone()), deps);
        let mut sim = Self {
            layout,
            wm,
            store,
            desktop,
            timer_hide: options.timer_hide,
            selected: None,
            active_window: false,
            maximized: false,
            other_window: false,
            dragging: false,
        };
        for slot in 0..options.screens.clamp(1, CONNECTORS.len()) {
            let geometry = sim.slot_geometry(slot);
            sim.layout.screen_connected(CONNECTORS[slot], geometry);
        }
        for _ in 0..options.panels {
            sim.add_primary_panel();
        }
        sim.selected = sim.layout.sorted_views().first().copied();
        sim
    }

    pub fn layout(&self) -> &ViewLifecycle {
        &self.layout
    }

    pub fn window_system(&self) -> &RecordingWindowSystem {
        &self.wm
    }

    pub fn desktop(&self) -> Rect {
        self.desktop
    }

    pub fn selected(&self) -> Option<PanelId> {
        self.selected
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn slot_geometry(&self, slot: usize) -> Rect {
        let slots = u16::try_from(CONNECTORS.len()).unwrap_or(1);
        let index = u16::try_from(slot).unwrap_or(0);
        let width = self.desktop.width / slots;
        Rect {
            x: self.desktop.x + width * index,
            y: self.desktop.y,
            width,
            height: self.desktop.height,
        }
    }

    pub fn resize(&mut self, desktop: Rect) {
        if self.desktop == desktop {
            return;
        }
        self.desktop = desktop;
        let screens = self.layout.screens().clone();
        for (slot, connector) in CONNECTORS.iter().enumerate() {
            let id = screens.borrow().id_for_connector(connector);
            if let Some(id) = id {
                let geometry = self.slot_geometry(slot);
                self.layout.screen_geometry_changed(id, geometry);
            }
        }
        self.push_windows();
    }

    /// Simulated application windows, all on the primary screen.
    pub fn windows(&self) -> Vec<WindowInfo> {
        let Some(screen) = self
            .layout
            .screens()
            .borrow()
            .primary()
            .map(|s| s.geometry())
        else {
            return Vec::new();
        };
        let mut windows = Vec::new();
        if self.active_window {
            let geometry = if self.maximized {
                screen
            } else {
                Rect {
                    x: screen.x + screen.width / 4,
                    y: screen.y + screen.height / 2,
                    width: screen.width / 2,
                    height: screen.height - screen.height / 2,
                }
            };
            windows.push(WindowInfo {
                id: 1,
                geometry,
                active: true,
                maximized: self.maximized,
                minimized: false,
            });
        }
        if self.other_window {
            windows.push(WindowInfo {
                id: 2,
                geometry: Rect {
                    x: screen.x,
                    y: screen.y + screen.height / 4,
                    width: screen.width / 3,
                    height: screen.height / 2,
                },
                active: false,
                maximized: false,
                minimized: false,
            });
        }
        windows
    }

    /// Returns false when the simulator should exit.
    pub fn apply(&mut self, action: SimAction) -> bool {
        match action {
            SimAction::Quit => return false,
            SimAction::ToggleScreen(slot) => self.toggle_screen(slot),
            SimAction::CyclePrimary => self.cycle_primary(),
            SimAction::AddPrimaryPanel => self.add_primary_panel(),
            SimAction::AddPinnedPanel => self.add_pinned_panel(),
            SimAction::RemovePanel => {
                if let Some(panel) = self.selected.take() {
                    self.layout.remove_definition(panel);
                    self.selected = self.layout.sorted_views().first().copied();
                }
            }
            SimAction::SelectNext => self.select_next(),
            SimAction::CycleMode => {
                if let Some(panel) = self.selected {
                    self.layout
                        .update_definition(panel, |d| d.visibility = d.visibility.next());
                }
            }
            SimAction::TogglePin => self.toggle_pin(),
            SimAction::RaiseTemporarily => {
                if let Some(view) = self.selected.and_then(|p| self.layout.view_mut(p)) {
                    view.machine_mut().raise_view_temporarily();
                }
            }
            SimAction::ToggleBlockHiding => {
                if let Some(view) = self.selected.and_then(|p| self.layout.view_mut(p)) {
                    let block = !view.machine().block_hiding();
                    view.machine_mut().set_block_hiding(block);
                }
            }
            SimAction::ToggleDrag => {
                self.dragging = !self.dragging;
                let event = if self.dragging {
                    ViewEvent::DragEnter
                } else {
                    ViewEvent::Drop
                };
                if let Some(view) = self.selected.and_then(|p| self.layout.view_mut(p)) {
                    view.machine_mut().handle_view_event(event);
                }
            }
            SimAction::ToggleEdges => {
                if let Some(view) = self.selected.and_then(|p| self.layout.view_mut(p)) {
                    let enable = !view.machine().enable_edges();
                    view.machine_mut().set_enable_edges(enable);
                    view.machine().save_config();
                }
            }
            SimAction::RecreateView => {
                if let Some(panel) = self.selected {
                    self.layout.recreate_view(panel);
                }
            }
            SimAction::ToggleActiveWindow => {
                self.active_window = !self.active_window;
                self.push_windows();
            }
            SimAction::ToggleMaximized => {
                let unmaximizing = self.maximized;
                self.maximized = !self.maximized;
                self.active_window |= self.maximized;
                if unmaximizing {
                    // the maximized window is dragged off its screen
                    for panel in self.layout.sorted_views() {
                        if let Some(view) = self.layout.view_mut(panel) {
                            view.machine_mut().active_window_dragging_started();
                        }
                    }
                }
                self.push_windows();
            }
            SimAction::ToggleOtherWindow => {
                self.other_window = !self.other_window;
                self.push_windows();
            }
            SimAction::DesktopChanged => self.layout.current_desktop_changed(),
            SimAction::ActivityChanged => {
                self.layout.current_activity_changed();
                self.layout.apply_activities(&["default".to_string()]);
            }
            SimAction::ToggleLayoutActive => {
                let active = !self.layout.is_active();
                self.layout.set_active(active);
            }
        }
        true
    }

    pub fn pointer_moved(&mut self, column: u16, row: u16) {
        self.layout.pointer_moved(column, row);
    }

    /// Runs due timers and logs show/hide decisions.
    pub fn tick(&mut self) {
        for (panel, event) in self.layout.poll() {
            match event {
                VisibilityEvent::MustBeShown => tracing::debug!(panel = %panel, "must be shown"),
                VisibilityEvent::MustBeHidden => tracing::debug!(panel = %panel, "must be hidden"),
                VisibilityEvent::ModeChanged(mode) => {
                    tracing::info!(panel = %panel, %mode, "visibility mode applied");
                }
                _ => {}
            }
        }
        for event in self.layout.take_events() {
            tracing::trace!(?event, "layout event");
        }
        if self
            .selected
            .is_none_or(|panel| !self.layout.registry().contains(panel))
        {
            self.selected = self.layout.sorted_views().first().copied();
        }
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.layout.next_deadline()
    }

    pub fn config_dirty(&self) -> bool {
        self.store.borrow().is_dirty()
    }

    fn push_windows(&mut self) {
        let windows = self.windows();
        self.layout.windows_changed(&windows);
    }

    fn toggle_screen(&mut self, slot: usize) {
        let Some(connector) = CONNECTORS.get(slot) else {
            return;
        };
        let connected = {
            let screens = self.layout.screens().borrow();
            screens
                .id_for_connector(connector)
                .is_some_and(|id| screens.screen_exists(id))
        };
        if connected {
            self.layout.screen_disconnected(connector);
        } else {
            let geometry = self.slot_geometry(slot);
            self.layout.screen_connected(connector, geometry);
        }
        self.push_windows();
    }

    fn cycle_primary(&mut self) {
        let next = {
            let screens = self.layout.screens().borrow();
            let connected: Vec<ScreenId> = screens.connected().map(|s| s.id()).collect();
            let current = screens
                .primary_id()
                .and_then(|id| connected.iter().position(|c| *c == id))
                .unwrap_or(0);
            connected.get((current + 1) % connected.len().max(1)).copied()
        };
        if let Some(next) = next {
            self.layout.primary_screen_changed(next);
            self.push_windows();
        }
    }

    fn new_definition(&mut self, edge: Edge) -> PanelDefinition {
        let id = self.layout.next_panel_id();
        let group = ConfigGroup::new(self.store.clone(), group_name(id));
        let timer_hide = i64::try_from(self.timer_hide.as_millis()).unwrap_or(i64::MAX);
        group.write_entry(keys::TIMER_HIDE, timer_hide);
        PanelDefinition::dock(id, edge)
    }

    fn add_primary_panel(&mut self) {
        let primary = self.layout.screens().borrow().primary_id();
        let Some(primary) = primary else {
            tracing::warn!("no primary screen, panel not added");
            return;
        };
        match self.layout.free_edges(primary).first().copied() {
            Some(edge) => {
                let definition = self.new_definition(edge);
                let id = self.layout.add_definition(definition);
                self.selected = Some(id);
            }
            None => tracing::warn!("primary screen has no free edge"),
        }
    }

    fn add_pinned_panel(&mut self) {
        let target = {
            let screens = self.layout.screens().borrow();
            screens
                .connected()
                .map(|s| s.id())
                .find(|id| !screens.is_primary(*id))
        };
        let Some(screen) = target else {
            tracing::warn!("connect a second screen to pin a panel");
            return;
        };
        let Some(edge) = self.layout.free_edges(screen).first().copied() else {
            tracing::warn!(screen = %screen, "screen has no free edge");
            return;
        };
        let definition = self.new_definition(edge).pinned(screen);
        let id = self.layout.add_definition(definition);
        self.selected = Some(id);
    }

    fn select_next(&mut self) {
        let order = self.layout.sorted_views();
        let next = match self
            .selected
            .and_then(|s| order.iter().position(|p| *p == s))
        {
            Some(pos) => order.get((pos + 1) % order.len()).copied(),
            None => order.first().copied(),
        };
        self.selected = next;
    }

    fn toggle_pin(&mut self) {
        let Some(panel) = self.selected else {
            return;
        };
        let current = self.layout.view(panel).map(|v| v.screen());
        self.layout.update_definition(panel, |d| {
            if d.on_primary {
                d.on_primary = false;
                d.screen = current.or(d.screen);
            } else {
                d.on_primary = true;
            }
        });
    }
}
