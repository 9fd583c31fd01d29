use std::collections::BTreeMap;
use std::time::Duration;

use ratatui::layout::Rect;

use super::priority::{ViewRank, sort_by_priority};
use crate::constants::{RECREATE_ADD_DELAY, RECREATE_REMOVE_DELAY};
use crate::edge::Edge;
use crate::error::PlacementError;
use crate::placement::{Occupant, Placement, PlacementEngine, PlacementRequest, ReconcilePlan};
use crate::registry::{PanelDefinition, PanelId, PanelKind, PanelRegistry};
use crate::scheduler::{Scheduler, SharedClock};
use crate::screens::{Screen, ScreenId, SharedScreens};
use crate::view::{View, VisibilityDeps, VisibilityEvent, WindowInfo};
use crate::window_system::SharedWindowSystem;

/// Shared collaborators of one layout.
#[derive(Clone)]
pub struct LayoutDeps {
    pub screens: SharedScreens,
    pub wm: SharedWindowSystem,
    pub clock: SharedClock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyReason {
    /// The definition or its view was removed.
    Removed,
    /// An on-primary view took the slot.
    Evicted,
    /// No slot is left for the panel on the current screens.
    Orphaned,
    /// Torn down to be rebuilt.
    Recreating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutEvent {
    ViewsCountChanged(usize),
    ViewCreated {
        panel: PanelId,
        screen: ScreenId,
        edge: Edge,
    },
    ViewDestroyed {
        panel: PanelId,
        reason: DestroyReason,
    },
    ViewMoved {
        panel: PanelId,
        screen: ScreenId,
        edge: Edge,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LifecycleTask {
    RecreateRemove(PanelId),
    RecreateAdd(PanelId),
}

/// Owns the live views of one layout and keeps them in line with the panel
/// definitions and the connected screens.
pub struct ViewLifecycle {
    screens: SharedScreens,
    wm: SharedWindowSystem,
    clock: SharedClock,
    registry: PanelRegistry,
    placement: PlacementEngine,
    views: BTreeMap<PanelId, View>,
    scheduler: Scheduler<LifecycleTask>,
    active: bool,
    block_automatic_view_creation: bool,
    events: Vec<LayoutEvent>,
}

impl std::fmt::Debug for ViewLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewLifecycle")
            .field("registry", &self.registry)
            .field("placement", &self.placement)
            .field("views", &self.views.keys().collect::<Vec<_>>())
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl ViewLifecycle {
    pub fn new(registry: PanelRegistry, deps: LayoutDeps) -> Self {
        Self {
            screens: deps.screens,
            wm: deps.wm,
            clock: deps.clock,
            registry,
            placement: PlacementEngine::new(),
            views: BTreeMap::new(),
            scheduler: Scheduler::new(),
            active: true,
            block_automatic_view_creation: false,
            events: Vec::new(),
        }
    }

    pub fn registry(&self) -> &PanelRegistry {
        &self.registry
    }

    pub fn placement(&self) -> &PlacementEngine {
        &self.placement
    }

    pub fn screens(&self) -> &SharedScreens {
        &self.screens
    }

    pub fn view(&self, panel: PanelId) -> Option<&View> {
        self.views.get(&panel)
    }

    pub fn view_mut(&mut self, panel: PanelId) -> Option<&mut View> {
        self.views.get_mut(&panel)
    }

    pub fn views(&self) -> impl Iterator<Item = &View> {
        self.views.values()
    }

    pub fn views_count(&self) -> usize {
        self.views.len()
    }

    pub fn views_count_on(&self, screen: ScreenId) -> usize {
        self.views.values().filter(|v| v.screen() == screen).count()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Activates or deactivates the layout. Struts and edge triggers of an
    /// inactive layout are withdrawn.
    pub fn set_active(&mut self, active: bool) {
        if self.active == active {
            return;
        }
        tracing::info!(active, "layout activation changed");
        self.active = active;
        for view in self.views.values_mut() {
            view.machine_mut().set_layout_active(active);
        }
    }

    pub fn next_panel_id(&mut self) -> PanelId {
        self.registry.next_id()
    }

    pub fn block_automatic_view_creation(&self) -> bool {
        self.block_automatic_view_creation
    }

    pub fn set_block_automatic_view_creation(&mut self, block: bool) {
        self.block_automatic_view_creation = block;
    }

    /// Registers a definition and, unless blocked, tries to give it a view.
    pub fn add_definition(&mut self, definition: PanelDefinition) -> PanelId {
        let id = self.registry.insert(definition);
        if !self.block_automatic_view_creation
            && self.registry.get(id).is_some_and(|d| d.kind.is_dock())
            && let Err(err) = self.add_view(id, false, None)
        {
            tracing::debug!(panel = %id, error = %err, "definition stays dormant");
        }
        id
    }

    /// Drops a definition, its sub-panels and their views.
    pub fn remove_definition(&mut self, panel: PanelId) -> Vec<PanelDefinition> {
        self.remove_view(panel);
        let removed = self.registry.remove(panel);
        for definition in &removed {
            self.destroy_view(definition.id, DestroyReason::Removed);
        }
        if !removed.is_empty() {
            tracing::info!(panel = %panel, count = removed.len(), "definition removed");
        }
        removed
    }

    /// Applies `f` to a definition. Changes to the on-primary flag or the
    /// pinned screen rebuild the view; anything else is reconciled in
    /// place.
    pub fn update_definition<F>(&mut self, panel: PanelId, f: F) -> bool
    where
        F: FnOnce(&mut PanelDefinition),
    {
        let Some(before) = self.registry.get(panel).cloned() else {
            return false;
        };
        self.registry.update(panel, f);
        let Some(after) = self.registry.get(panel).cloned() else {
            return false;
        };
        if before.on_primary != after.on_primary || before.screen != after.screen {
            self.destroy_view(panel, DestroyReason::Recreating);
        } else if let Some(view) = self.views.get_mut(&panel) {
            if before.thickness != after.thickness {
                view.set_thickness(after.thickness);
            }
            if before.visibility != after.visibility {
                view.machine_mut().set_mode(after.visibility);
            }
            view.machine_mut().set_by_pass_wm(after.effective_by_pass_wm());
        }
        self.sync_to_screens();
        true
    }

    pub fn add_view(
        &mut self,
        panel: PanelId,
        force_primary: bool,
        explicit_screen: Option<ScreenId>,
    ) -> Result<(), PlacementError> {
        let definition = self
            .registry
            .get(panel)
            .cloned()
            .ok_or(PlacementError::UnknownPanel(panel))?;
        match definition.kind {
            PanelKind::Dock => {}
            PanelKind::Missing => {
                tracing::warn!(panel = %panel, "the requested panel plugin can not be located or loaded");
                return Err(PlacementError::InvalidDefinition {
                    panel,
                    reason: "plugin package is missing".to_string(),
                });
            }
            PanelKind::Tray | PanelKind::Foreign => return Err(PlacementError::NotAPanel(panel)),
        }
        if self.views.contains_key(&panel) {
            return Err(PlacementError::DuplicateView(panel));
        }

        let request = PlacementRequest::for_definition(&definition, force_primary, explicit_screen);
        let screens = self.screens.clone();
        let placement = {
            let screens = screens.borrow();
            self.placement.resolve_target(&request, &screens)
        };
        let placement = placement.inspect_err(|err| {
            tracing::debug!(panel = %panel, error = %err, "placement rejected");
        })?;

        if let Some(evicted) = placement.evict {
            tracing::info!(
                panel = %evicted,
                winner = %panel,
                "removing explicit view to make room for an on-primary view"
            );
            self.destroy_view(evicted, DestroyReason::Evicted);
        }

        let screen = screens
            .borrow()
            .screen(placement.slot.screen)
            .cloned()
            .ok_or(PlacementError::ScreenUnavailable(placement.slot.screen))?;
        self.create_view(&definition, placement, &screen)
    }

    /// Destroys the view of `panel`, sub-panels first.
    pub fn remove_view(&mut self, panel: PanelId) {
        for child in self.registry.children_of(panel) {
            self.remove_view(child);
        }
        self.destroy_view(panel, DestroyReason::Removed);
    }

    /// Rebuilds the view of `panel` after the grace delays. The old view is
    /// gone before the new one is built.
    pub fn recreate_view(&mut self, panel: PanelId) {
        let now = self.clock.now();
        self.scheduler
            .schedule(now, RECREATE_REMOVE_DELAY, LifecycleTask::RecreateRemove(panel));
    }

    /// Full reconciliation; run on every screen topology change.
    pub fn sync_to_screens(&mut self) -> ReconcilePlan {
        let candidates = self.candidates();
        let screens = self.screens.clone();
        let screens = screens.borrow();
        let plan = self.placement.reconcile(&candidates, &screens);

        for panel in &plan.to_destroy {
            self.destroy_view(*panel, DestroyReason::Orphaned);
        }
        for placement in &plan.to_reposition {
            self.placement.release(placement.panel);
        }
        for placement in &plan.to_reposition {
            let Some(screen) = screens.screen(placement.slot.screen) else {
                continue;
            };
            if let Err(err) = self.placement.occupy(placement.slot, occupant(placement)) {
                tracing::warn!(panel = %placement.panel, error = %err, "reposition failed");
                self.destroy_view(placement.panel, DestroyReason::Orphaned);
                continue;
            }
            if let Some(view) = self.views.get_mut(&placement.panel) {
                view.move_to(screen, placement.slot.edge, placement.on_primary);
                self.events.push(LayoutEvent::ViewMoved {
                    panel: placement.panel,
                    screen: placement.slot.screen,
                    edge: placement.slot.edge,
                });
            }
        }
        for placement in &plan.to_create {
            let Some(definition) = self.registry.get(placement.panel).cloned() else {
                continue;
            };
            let Some(screen) = screens.screen(placement.slot.screen) else {
                continue;
            };
            if let Err(err) = self.create_view(&definition, *placement, screen) {
                tracing::warn!(panel = %placement.panel, error = %err, "view creation failed");
            }
        }
        for panel in &plan.kept {
            let still_there = self
                .views
                .get_mut(panel)
                .is_some_and(|view| view.reconsider_screen(&screens));
            if !still_there {
                self.destroy_view(*panel, DestroyReason::Orphaned);
            }
        }
        plan
    }

    /// Live views in shortcut priority order.
    pub fn sorted_views(&self) -> Vec<PanelId> {
        let ranks: Vec<ViewRank> = self
            .views
            .values()
            .map(|view| ViewRank {
                panel: view.panel(),
                screen: view.screen(),
                edge: view.edge(),
                preferred: self
                    .registry
                    .get(view.panel())
                    .is_some_and(|d| d.preferred_for_shortcuts),
            })
            .collect();
        sort_by_priority(&ranks, &self.screens.borrow())
    }

    pub fn highest_priority_view(&self) -> Option<PanelId> {
        self.sorted_views().first().copied()
    }

    /// At most one definition is preferred for shortcuts.
    pub fn set_preferred_for_shortcuts(&mut self, panel: PanelId, preferred: bool) -> bool {
        if !self.registry.contains(panel) {
            return false;
        }
        if preferred {
            let others: Vec<PanelId> = self
                .registry
                .iter()
                .filter(|d| d.preferred_for_shortcuts && d.id != panel)
                .map(|d| d.id)
                .collect();
            for other in others {
                self.registry
                    .update(other, |d| d.preferred_for_shortcuts = false);
            }
        }
        self.registry
            .update(panel, |d| d.preferred_for_shortcuts = preferred)
    }

    pub fn free_edges(&self, screen: ScreenId) -> Vec<Edge> {
        self.placement.free_edges(screen, None)
    }

    /// Edges `panel` could move to on `screen`, its own edge included.
    pub fn available_edges_for_view(&self, screen: ScreenId, panel: PanelId) -> Vec<Edge> {
        self.placement.free_edges(screen, Some(panel))
    }

    pub fn screen_connected(&mut self, connector: &str, geometry: Rect) -> ScreenId {
        let id = self.screens.borrow_mut().connect(connector, geometry);
        self.sync_to_screens();
        id
    }

    pub fn screen_disconnected(&mut self, connector: &str) -> Option<ScreenId> {
        let id = self.screens.borrow_mut().disconnect(connector);
        if id.is_some() {
            self.sync_to_screens();
        }
        id
    }

    pub fn primary_screen_changed(&mut self, screen: ScreenId) -> bool {
        let changed = self.screens.borrow_mut().set_primary(screen);
        if changed {
            self.sync_to_screens();
        }
        changed
    }

    pub fn screen_geometry_changed(&mut self, screen: ScreenId, geometry: Rect) -> bool {
        let changed = self.screens.borrow_mut().set_geometry(screen, geometry);
        if changed {
            self.sync_to_screens();
        }
        changed
    }

    pub fn current_desktop_changed(&mut self) {
        for view in self.views.values_mut() {
            view.machine_mut().on_current_desktop_changed();
        }
    }

    pub fn current_activity_changed(&mut self) {
        for view in self.views.values_mut() {
            view.machine_mut().on_current_activity_changed();
        }
    }

    pub fn apply_activities(&self, activities: &[String]) {
        for view in self.views.values() {
            view.machine().apply_activities_to_hidden_windows(activities);
        }
    }

    pub fn pointer_moved(&mut self, column: u16, row: u16) {
        for view in self.views.values_mut() {
            view.pointer_moved(column, row);
        }
    }

    pub fn windows_changed(&mut self, windows: &[WindowInfo]) {
        for view in self.views.values_mut() {
            view.update_windows(windows);
        }
    }

    /// Runs due lifecycle tasks and lets every view settle.
    pub fn poll(&mut self) -> Vec<(PanelId, VisibilityEvent)> {
        let now = self.clock.now();
        while let Some((_, task)) = self.scheduler.pop_due(now) {
            self.run_task(task);
        }
        let mut emitted = Vec::new();
        for (panel, view) in self.views.iter_mut() {
            emitted.extend(view.process().into_iter().map(|event| (*panel, event)));
        }
        emitted
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.views
            .values()
            .filter_map(|view| view.machine().next_deadline())
            .chain(self.scheduler.next_deadline())
            .min()
    }

    pub fn take_events(&mut self) -> Vec<LayoutEvent> {
        std::mem::take(&mut self.events)
    }

    fn run_task(&mut self, task: LifecycleTask) {
        match task {
            LifecycleTask::RecreateRemove(panel) => {
                if self.destroy_view(panel, DestroyReason::Recreating) {
                    tracing::debug!(panel = %panel, "recreate: view removed");
                    let now = self.clock.now();
                    self.scheduler
                        .schedule(now, RECREATE_ADD_DELAY, LifecycleTask::RecreateAdd(panel));
                }
            }
            LifecycleTask::RecreateAdd(panel) => {
                if self.views.contains_key(&panel) || !self.registry.contains(panel) {
                    return;
                }
                if !self.registry.reload(panel) {
                    tracing::warn!(panel = %panel, "recreate: stored settings missing, keeping the last known ones");
                }
                tracing::debug!(panel = %panel, "recreate: adding view");
                if let Err(err) = self.add_view(panel, false, None) {
                    tracing::debug!(panel = %panel, error = %err, "recreate: view not restored");
                }
            }
        }
    }

    /// Live-view state wins over stored settings, so a forced on-primary
    /// view stays where it is.
    fn candidates(&self) -> Vec<PlacementRequest> {
        self.registry
            .iter()
            .filter(|d| d.kind.is_dock())
            .map(|d| match self.views.get(&d.id) {
                Some(view) => PlacementRequest {
                    panel: d.id,
                    edge: d.edge,
                    on_primary: view.on_primary(),
                    screen: Some(view.screen()),
                },
                None => PlacementRequest::for_definition(d, false, None),
            })
            .collect()
    }

    fn create_view(
        &mut self,
        definition: &PanelDefinition,
        placement: Placement,
        screen: &Screen,
    ) -> Result<(), PlacementError> {
        let panel = definition.id;
        self.placement.occupy(placement.slot, occupant(&placement))?;
        // a forced on-primary view keeps its stored pin
        let forced = placement.on_primary && !definition.on_primary;
        if !forced && definition.screen != Some(placement.slot.screen) {
            self.registry
                .update(panel, |d| d.screen = Some(placement.slot.screen));
        }
        let deps = VisibilityDeps {
            view: panel,
            wm: self.wm.clone(),
            config: self.registry.group(panel),
            clock: self.clock.clone(),
            layout_active: self.active,
            by_pass_wm: definition.effective_by_pass_wm(),
        };
        let view = View::new(definition, screen, placement.on_primary, deps);
        tracing::info!(
            panel = %panel,
            screen = %screen.connector(),
            edge = %placement.slot.edge,
            on_primary = placement.on_primary,
            "view created"
        );
        self.views.insert(panel, view);
        self.events.push(LayoutEvent::ViewCreated {
            panel,
            screen: placement.slot.screen,
            edge: placement.slot.edge,
        });
        self.events
            .push(LayoutEvent::ViewsCountChanged(self.views.len()));
        Ok(())
    }

    fn destroy_view(&mut self, panel: PanelId, reason: DestroyReason) -> bool {
        let Some(view) = self.views.remove(&panel) else {
            return false;
        };
        self.placement.release(panel);
        tracing::info!(panel = %panel, screen = %view.screen(), ?reason, "view destroyed");
        drop(view);
        self.events
            .push(LayoutEvent::ViewDestroyed { panel, reason });
        self.events
            .push(LayoutEvent::ViewsCountChanged(self.views.len()));
        true
    }
}

fn occupant(placement: &Placement) -> Occupant {
    Occupant {
        panel: placement.panel,
        on_primary: placement.on_primary,
    }
}
