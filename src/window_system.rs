//! Window-manager adapter.
//!
//! The engines never talk to a compositor directly. Struts, edge triggers
//! and activity assignment go through [`WindowSystem`]; desktop and activity
//! change notifications flow the other way as plain method calls on the
//! layout (see `ViewLifecycle::current_desktop_changed`).

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use ratatui::layout::Rect;

use crate::edge::Edge;
use crate::registry::PanelId;

/// A top-level window owned by a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WindowRef {
    View(PanelId),
    /// The edge-reveal sentinel kept alongside a hidden view.
    Sentinel(PanelId),
}

pub trait WindowSystem {
    fn add_window(&self, window: WindowRef);
    fn remove_window(&self, window: WindowRef);
    /// Panel window flags (skip taskbar, keep above, ...). Re-applied
    /// whenever the window is shown again. `by_pass_wm` asks for an
    /// override-redirect window that the window manager does not decorate.
    fn set_view_extra_flags(&self, window: WindowRef, by_pass_wm: bool);
    fn set_view_struts(&self, view: PanelId, geometry: Rect, edge: Edge);
    fn remove_view_struts(&self, view: PanelId);
    /// Arms (`active = true`) or disarms the screen-edge trigger of a
    /// sentinel window.
    fn set_edge_state_for(&self, sentinel: WindowRef, active: bool);
    fn set_window_on_activities(&self, window: WindowRef, activities: &[String]);
}

pub type SharedWindowSystem = Rc<dyn WindowSystem>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WmCall {
    AddWindow(WindowRef),
    RemoveWindow(WindowRef),
    SetExtraFlags(WindowRef, bool),
    SetStruts(PanelId, Rect, Edge),
    RemoveStruts(PanelId),
    SetEdgeState(WindowRef, bool),
    SetActivities(WindowRef, Vec<String>),
}

/// In-process window system that remembers what it was asked to do.
#[derive(Debug, Default)]
pub struct RecordingWindowSystem {
    windows: RefCell<BTreeSet<WindowRef>>,
    by_pass_wm: RefCell<BTreeMap<WindowRef, bool>>,
    struts: RefCell<BTreeMap<PanelId, (Rect, Edge)>>,
    edge_states: RefCell<BTreeMap<WindowRef, bool>>,
    activities: RefCell<BTreeMap<WindowRef, Vec<String>>>,
    calls: RefCell<Vec<WmCall>>,
}

impl RecordingWindowSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Rc<RecordingWindowSystem> {
        Rc::new(Self::new())
    }

    pub fn has_window(&self, window: WindowRef) -> bool {
        self.windows.borrow().contains(&window)
    }

    /// Bypass flag from the last `set_view_extra_flags` on a live window.
    pub fn by_pass_wm_for(&self, window: WindowRef) -> Option<bool> {
        self.by_pass_wm.borrow().get(&window).copied()
    }

    pub fn struts_for(&self, view: PanelId) -> Option<(Rect, Edge)> {
        self.struts.borrow().get(&view).copied()
    }

    /// All reserved struts, used to shrink the usable screen area.
    pub fn struts(&self) -> Vec<(PanelId, Rect, Edge)> {
        self.struts
            .borrow()
            .iter()
            .map(|(view, (rect, edge))| (*view, *rect, *edge))
            .collect()
    }

    pub fn edge_state_for(&self, sentinel: WindowRef) -> Option<bool> {
        self.edge_states.borrow().get(&sentinel).copied()
    }

    pub fn activities_for(&self, window: WindowRef) -> Option<Vec<String>> {
        self.activities.borrow().get(&window).cloned()
    }

    pub fn calls(&self) -> Vec<WmCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    fn record(&self, call: WmCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl WindowSystem for RecordingWindowSystem {
    fn add_window(&self, window: WindowRef) {
        self.windows.borrow_mut().insert(window);
        self.record(WmCall::AddWindow(window));
    }

    fn remove_window(&self, window: WindowRef) {
        self.windows.borrow_mut().remove(&window);
        self.by_pass_wm.borrow_mut().remove(&window);
        self.edge_states.borrow_mut().remove(&window);
        self.activities.borrow_mut().remove(&window);
        self.record(WmCall::RemoveWindow(window));
    }

    fn set_view_extra_flags(&self, window: WindowRef, by_pass_wm: bool) {
        self.by_pass_wm.borrow_mut().insert(window, by_pass_wm);
        self.record(WmCall::SetExtraFlags(window, by_pass_wm));
    }

    fn set_view_struts(&self, view: PanelId, geometry: Rect, edge: Edge) {
        self.struts.borrow_mut().insert(view, (geometry, edge));
        self.record(WmCall::SetStruts(view, geometry, edge));
    }

    fn remove_view_struts(&self, view: PanelId) {
        if self.struts.borrow_mut().remove(&view).is_some() {
            self.record(WmCall::RemoveStruts(view));
        }
    }

    fn set_edge_state_for(&self, sentinel: WindowRef, active: bool) {
        self.edge_states.borrow_mut().insert(sentinel, active);
        self.record(WmCall::SetEdgeState(sentinel, active));
    }

    fn set_window_on_activities(&self, window: WindowRef, activities: &[String]) {
        self.activities
            .borrow_mut()
            .insert(window, activities.to_vec());
        self.record(WmCall::SetActivities(window, activities.to_vec()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removing_a_window_drops_its_edge_state() {
        let wm = RecordingWindowSystem::new();
        let sentinel = WindowRef::Sentinel(PanelId(1));
        wm.add_window(sentinel);
        wm.set_view_extra_flags(sentinel, false);
        wm.set_edge_state_for(sentinel, true);
        wm.set_window_on_activities(sentinel, &["a".to_string()]);
        assert_eq!(wm.edge_state_for(sentinel), Some(true));
        wm.remove_window(sentinel);
        assert!(!wm.has_window(sentinel));
        assert_eq!(wm.edge_state_for(sentinel), None);
        assert_eq!(wm.by_pass_wm_for(sentinel), None);
        assert_eq!(wm.activities_for(sentinel), None);
    }

    #[test]
    fn struts_removal_is_recorded_once() {
        let wm = RecordingWindowSystem::new();
        let rect = Rect {
            x: 0,
            y: 23,
            width: 80,
            height: 1,
        };
        wm.set_view_struts(PanelId(2), rect, Edge::Bottom);
        assert_eq!(wm.struts_for(PanelId(2)), Some((rect, Edge::Bottom)));
        wm.remove_view_struts(PanelId(2));
        wm.remove_view_struts(PanelId(2));
        assert_eq!(
            wm.calls(),
            vec![
                WmCall::SetStruts(PanelId(2), rect, Edge::Bottom),
                WmCall::RemoveStruts(PanelId(2)),
            ]
        );
    }
}
