use ratatui::layout::Rect;

use crate::edge::Edge;
use crate::geometry::rect_contains;
use crate::registry::PanelId;
use crate::window_system::WindowRef;

/// Thin always-present window along a screen edge that catches pointer
/// entry while its panel is fully hidden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeSentinel {
    owner: PanelId,
    edge: Edge,
    geometry: Rect,
    contains_mouse: bool,
    active: bool,
}

impl EdgeSentinel {
    pub fn new(owner: PanelId, edge: Edge, screen: Rect) -> Self {
        Self {
            owner,
            edge,
            geometry: edge.sentinel_rect(screen),
            contains_mouse: false,
            active: false,
        }
    }

    pub fn window(&self) -> WindowRef {
        WindowRef::Sentinel(self.owner)
    }

    pub fn edge(&self) -> Edge {
        self.edge
    }

    pub fn geometry(&self) -> Rect {
        self.geometry
    }

    pub fn relocate(&mut self, edge: Edge, screen: Rect) {
        self.edge = edge;
        self.geometry = edge.sentinel_rect(screen);
    }

    /// Whether the edge trigger is armed.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn contains_mouse(&self) -> bool {
        self.contains_mouse
    }

    /// Returns true when containment changed.
    pub(crate) fn set_contains_mouse(&mut self, contains: bool) -> bool {
        if self.contains_mouse == contains {
            return false;
        }
        self.contains_mouse = contains;
        true
    }

    /// An inactive sentinel does not react to the pointer.
    pub fn hit_test(&self, column: u16, row: u16) -> bool {
        self.active && rect_contains(self.geometry, column, row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_test_requires_an_armed_trigger() {
        let screen = Rect {
            x: 0,
            y: 0,
            width: 80,
            height: 24,
        };
        let mut sentinel = EdgeSentinel::new(PanelId(1), Edge::Bottom, screen);
        assert!(!sentinel.hit_test(5, 23));
        sentinel.set_active(true);
        assert!(sentinel.hit_test(5, 23));
        assert!(!sentinel.hit_test(5, 22));
        sentinel.relocate(Edge::Top, screen);
        assert!(sentinel.hit_test(5, 0));
    }
}
