//! Live on-screen panel instances.

mod mode;
mod sentinel;
mod visibility;
mod window_tracker;

pub use mode::VisibilityMode;
pub use sentinel::EdgeSentinel;
pub use visibility::{VisibilityDeps, VisibilityEvent, VisibilityStateMachine, ViewRegion};
pub use window_tracker::{TrackerSignal, TrackerSignals, WindowInfo, signals_for};

use ratatui::layout::Rect;

use crate::edge::Edge;
use crate::geometry::rect_contains;
use crate::registry::{PanelDefinition, PanelId};
use crate::screens::{Screen, ScreenDirectory, ScreenId};

/// Window events delivered to a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewEvent {
    Enter,
    Leave,
    DragEnter,
    DragLeave,
    Drop,
    Show,
}

/// A panel bound to one screen edge. Owns its visibility machine and is the
/// only thing that flips actual visibility.
#[derive(Debug)]
pub struct View {
    panel: PanelId,
    screen: ScreenId,
    screen_geometry: Rect,
    edge: Edge,
    on_primary: bool,
    thickness: u16,
    geometry: Rect,
    visible: bool,
    machine: VisibilityStateMachine,
}

impl View {
    pub fn new(
        definition: &PanelDefinition,
        screen: &Screen,
        on_primary: bool,
        deps: VisibilityDeps,
    ) -> Self {
        let edge = definition.edge;
        let geometry = edge.panel_rect(screen.geometry(), definition.thickness);
        let region = ViewRegion {
            edge,
            geometry,
            screen: screen.geometry(),
        };
        Self {
            panel: definition.id,
            screen: screen.id(),
            screen_geometry: screen.geometry(),
            edge,
            on_primary,
            thickness: definition.thickness,
            geometry,
            visible: true,
            machine: VisibilityStateMachine::new(deps, region),
        }
    }

    pub fn panel(&self) -> PanelId {
        self.panel
    }

    pub fn screen(&self) -> ScreenId {
        self.screen
    }

    pub fn edge(&self) -> Edge {
        self.edge
    }

    pub fn on_primary(&self) -> bool {
        self.on_primary
    }

    pub fn geometry(&self) -> Rect {
        self.geometry
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn machine(&self) -> &VisibilityStateMachine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut VisibilityStateMachine {
        &mut self.machine
    }

    /// Rebinds the view to another screen slot.
    pub fn move_to(&mut self, screen: &Screen, edge: Edge, on_primary: bool) {
        tracing::debug!(
            panel = %self.panel,
            from = %self.screen,
            to = %screen.id(),
            edge = %edge,
            "view moved"
        );
        self.screen = screen.id();
        self.edge = edge;
        self.on_primary = on_primary;
        self.refresh_geometry(screen.geometry());
    }

    /// Re-reads the bound screen's geometry. Returns false when the screen
    /// is gone.
    pub fn reconsider_screen(&mut self, screens: &ScreenDirectory) -> bool {
        match screens.screen(self.screen) {
            Some(screen) => {
                self.refresh_geometry(screen.geometry());
                true
            }
            None => false,
        }
    }

    fn refresh_geometry(&mut self, screen_geometry: Rect) {
        self.screen_geometry = screen_geometry;
        self.geometry = self.edge.panel_rect(screen_geometry, self.thickness);
        self.machine.set_region(ViewRegion {
            edge: self.edge,
            geometry: self.geometry,
            screen: screen_geometry,
        });
    }

    pub fn set_thickness(&mut self, thickness: u16) {
        self.thickness = thickness.max(1);
        self.refresh_geometry(self.screen_geometry);
    }

    /// A hidden view receives no pointer events; only its sentinel does.
    pub fn pointer_moved(&mut self, column: u16, row: u16) {
        let inside = self.visible && rect_contains(self.geometry, column, row);
        if inside != self.machine.contains_mouse() {
            let event = if inside {
                ViewEvent::Enter
            } else {
                ViewEvent::Leave
            };
            self.machine.handle_view_event(event);
        }
        let on_sentinel = self
            .machine
            .sentinel()
            .is_some_and(|sentinel| sentinel.hit_test(column, row));
        self.machine.sentinel_contains_mouse_changed(on_sentinel);
    }

    /// Recomputes tracker signals from the windows on this view's screen.
    pub fn update_windows(&mut self, windows: &[WindowInfo]) {
        let signals = signals_for(self.geometry, self.screen_geometry, windows);
        self.machine.set_tracker_signals(signals);
    }

    /// Runs due timers and answers show/hide requests until the machine
    /// settles. Returns everything the machine emitted.
    pub fn process(&mut self) -> Vec<VisibilityEvent> {
        let mut emitted = Vec::new();
        loop {
            self.machine.poll();
            let events = self.machine.take_events();
            if events.is_empty() {
                break;
            }
            for event in &events {
                match event {
                    VisibilityEvent::MustBeShown => {
                        if !self.visible {
                            self.visible = true;
                            self.machine.handle_view_event(ViewEvent::Show);
                        }
                        let _ = self.machine.set_is_hidden(false);
                    }
                    VisibilityEvent::MustBeHidden => {
                        if self.machine.set_is_hidden(true).is_ok() {
                            self.visible = false;
                        }
                    }
                    _ => {}
                }
            }
            emitted.extend(events);
        }
        emitted
    }
}
