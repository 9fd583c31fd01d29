//! Screen and edge assignment for panel definitions.
//!
//! The engine owns the edge-reservation map: which (screen, edge) slot is
//! held by which live view. Only [`PlacementEngine::occupy`] and
//! [`PlacementEngine::release`] mutate it; the layout calls them in the order
//! destroy, release, occupy, create so the map never holds two panels in one
//! slot.

use std::collections::{BTreeMap, BTreeSet};

use crate::edge::Edge;
use crate::error::PlacementError;
use crate::registry::{PanelDefinition, PanelId};
use crate::screens::{ScreenDirectory, ScreenId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot {
    pub screen: ScreenId,
    pub edge: Edge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupant {
    pub panel: PanelId,
    pub on_primary: bool,
}

/// What the engine needs to know about a panel to place it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementRequest {
    pub panel: PanelId,
    pub edge: Edge,
    pub on_primary: bool,
    pub screen: Option<ScreenId>,
}

impl PlacementRequest {
    pub fn for_definition(
        definition: &PanelDefinition,
        force_primary: bool,
        explicit_screen: Option<ScreenId>,
    ) -> Self {
        Self {
            panel: definition.id,
            edge: definition.edge,
            on_primary: definition.on_primary || force_primary,
            screen: explicit_screen.or(definition.screen),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub panel: PanelId,
    pub slot: Slot,
    pub on_primary: bool,
    /// Explicit view that must be destroyed before this one is registered.
    pub evict: Option<PanelId>,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub to_create: Vec<Placement>,
    pub to_destroy: Vec<PanelId>,
    pub to_reposition: Vec<Placement>,
    pub kept: Vec<PanelId>,
}

impl ReconcilePlan {
    pub fn is_noop(&self) -> bool {
        self.to_create.is_empty() && self.to_destroy.is_empty() && self.to_reposition.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct PlacementEngine {
    reservations: BTreeMap<Slot, Occupant>,
}

impl PlacementEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The four edges, in priority order, minus those held on `screen`.
    /// An `excluded` panel does not count as holding its edge.
    pub fn free_edges(&self, screen: ScreenId, excluded: Option<PanelId>) -> Vec<Edge> {
        Edge::ALL
            .into_iter()
            .filter(|edge| {
                match self.reservations.get(&Slot {
                    screen,
                    edge: *edge,
                }) {
                    Some(occupant) => Some(occupant.panel) == excluded,
                    None => true,
                }
            })
            .collect()
    }

    pub fn occupant(&self, slot: Slot) -> Option<Occupant> {
        self.reservations.get(&slot).copied()
    }

    pub fn slot_of(&self, panel: PanelId) -> Option<Slot> {
        self.reservations
            .iter()
            .find(|(_, occupant)| occupant.panel == panel)
            .map(|(slot, _)| *slot)
    }

    pub fn reservations(&self) -> impl Iterator<Item = (Slot, Occupant)> + '_ {
        self.reservations.iter().map(|(slot, occ)| (*slot, *occ))
    }

    /// The on-primary panel holding `edge` anywhere, ignoring `except`.
    pub fn on_primary_holder(&self, edge: Edge, except: PanelId) -> Option<PanelId> {
        self.reservations
            .iter()
            .find(|(slot, occ)| slot.edge == edge && occ.on_primary && occ.panel != except)
            .map(|(_, occ)| occ.panel)
    }

    /// Reserves `slot`, moving the panel out of any slot it held before.
    pub fn occupy(&mut self, slot: Slot, occupant: Occupant) -> Result<(), PlacementError> {
        if let Some(holder) = self.occupant(slot)
            && holder.panel != occupant.panel
        {
            return Err(PlacementError::EdgeOccupied {
                screen: slot.screen,
                edge: slot.edge,
                holder: holder.panel,
            });
        }
        self.release(occupant.panel);
        self.reservations.insert(slot, occupant);
        Ok(())
    }

    pub fn release(&mut self, panel: PanelId) -> Option<Slot> {
        let slot = self.slot_of(panel)?;
        self.reservations.remove(&slot);
        Some(slot)
    }

    pub fn clear(&mut self) {
        self.reservations.clear();
    }

    /// Decides where a single panel goes, against the current reservations.
    pub fn resolve_target(
        &self,
        request: &PlacementRequest,
        screens: &ScreenDirectory,
    ) -> Result<Placement, PlacementError> {
        let edge = request.edge;
        if request.on_primary {
            let primary = screens
                .primary_id()
                .ok_or(PlacementError::NoPrimaryScreen)?;
            if let Some(holder) = self.on_primary_holder(edge, request.panel) {
                return Err(PlacementError::EdgeHeldByPrimary { edge, holder });
            }
            let slot = Slot {
                screen: primary,
                edge,
            };
            let evict = self
                .occupant(slot)
                .filter(|occ| occ.panel != request.panel)
                .map(|occ| occ.panel);
            return Ok(Placement {
                panel: request.panel,
                slot,
                on_primary: true,
                evict,
            });
        }

        let screen = request
            .screen
            .ok_or(PlacementError::Unpinned(request.panel))?;
        if !screens.screen_exists(screen) {
            return Err(PlacementError::ScreenUnavailable(screen));
        }
        if screens.is_primary(screen)
            && let Some(holder) = self.on_primary_holder(edge, request.panel)
        {
            return Err(PlacementError::EdgeHeldByPrimary { edge, holder });
        }
        let slot = Slot { screen, edge };
        if let Some(holder) = self.occupant(slot)
            && holder.panel != request.panel
        {
            return Err(PlacementError::EdgeOccupied {
                screen,
                edge,
                holder: holder.panel,
            });
        }
        Ok(Placement {
            panel: request.panel,
            slot,
            on_primary: false,
            evict: None,
        })
    }

    /// Two-pass slot assignment over `candidates`, in definition order.
    ///
    /// Pass one gives on-primary panels the primary screen's edges; pass two
    /// gives pinned panels whatever is left on their own screen. Live panels
    /// that end up without a slot, or are not candidates at all, are
    /// destroyed.
    pub fn reconcile(
        &self,
        candidates: &[PlacementRequest],
        screens: &ScreenDirectory,
    ) -> ReconcilePlan {
        let mut reserved: BTreeSet<Slot> = BTreeSet::new();
        let mut targets: BTreeMap<PanelId, (Slot, bool)> = BTreeMap::new();

        if let Some(primary) = screens.primary_id() {
            for candidate in candidates.iter().filter(|c| c.on_primary) {
                let slot = Slot {
                    screen: primary,
                    edge: candidate.edge,
                };
                if reserved.insert(slot) {
                    targets.insert(candidate.panel, (slot, true));
                }
            }
        }

        for candidate in candidates.iter().filter(|c| !c.on_primary) {
            let Some(screen) = candidate.screen else {
                continue;
            };
            if !screens.screen_exists(screen) {
                continue;
            }
            let slot = Slot {
                screen,
                edge: candidate.edge,
            };
            if reserved.insert(slot) {
                targets.insert(candidate.panel, (slot, false));
            }
        }

        let mut plan = ReconcilePlan::default();
        for candidate in candidates {
            let current = self.slot_of(candidate.panel);
            match (targets.get(&candidate.panel), current) {
                (Some(&(slot, on_primary)), None) => plan.to_create.push(Placement {
                    panel: candidate.panel,
                    slot,
                    on_primary,
                    evict: None,
                }),
                (Some(&(slot, on_primary)), Some(current)) => {
                    let same_flag = self
                        .occupant(current)
                        .is_some_and(|occ| occ.on_primary == on_primary);
                    if current == slot && same_flag {
                        plan.kept.push(candidate.panel);
                    } else {
                        plan.to_reposition.push(Placement {
                            panel: candidate.panel,
                            slot,
                            on_primary,
                            evict: None,
                        });
                    }
                }
                (None, Some(_)) => plan.to_destroy.push(candidate.panel),
                (None, None) => {}
            }
        }

        for occupant in self.reservations.values() {
            if !candidates.iter().any(|c| c.panel == occupant.panel) {
                plan.to_destroy.push(occupant.panel);
            }
        }

        tracing::debug!(
            create = plan.to_create.len(),
            destroy = plan.to_destroy.len(),
            reposition = plan.to_reposition.len(),
            kept = plan.kept.len(),
            "reconcile plan"
        );
        plan
    }
}

#[cfg(test)]
mod tests {
    use ratatui::layout::Rect;

    use super::*;

    fn geom(x: u16) -> Rect {
        Rect {
            x,
            y: 0,
            width: 80,
            height: 24,
        }
    }

    fn primary(panel: u32, edge: Edge) -> PlacementRequest {
        PlacementRequest {
            panel: PanelId(panel),
            edge,
            on_primary: true,
            screen: None,
        }
    }

    fn pinned(panel: u32, edge: Edge, screen: ScreenId) -> PlacementRequest {
        PlacementRequest {
            panel: PanelId(panel),
            edge,
            on_primary: false,
            screen: Some(screen),
        }
    }

    fn place(engine: &mut PlacementEngine, placement: Placement) {
        if let Some(evicted) = placement.evict {
            engine.release(evicted);
        }
        engine
            .occupy(
                placement.slot,
                Occupant {
                    panel: placement.panel,
                    on_primary: placement.on_primary,
                },
            )
            .expect("free slot");
    }

    #[test]
    fn second_on_primary_panel_on_the_same_edge_is_rejected() {
        let mut screens = ScreenDirectory::new();
        screens.connect("eDP-1", geom(0));
        let mut engine = PlacementEngine::new();
        let first = engine
            .resolve_target(&primary(1, Edge::Bottom), &screens)
            .expect("first placement");
        place(&mut engine, first);
        assert_eq!(
            engine.resolve_target(&primary(2, Edge::Bottom), &screens),
            Err(PlacementError::EdgeHeldByPrimary {
                edge: Edge::Bottom,
                holder: PanelId(1),
            })
        );
    }

    #[test]
    fn explicit_panel_on_the_primary_screen_yields_to_on_primary() {
        let mut screens = ScreenDirectory::new();
        let a = screens.connect("eDP-1", geom(0));
        let mut engine = PlacementEngine::new();
        let placement = engine
            .resolve_target(&primary(1, Edge::Left), &screens)
            .expect("placed");
        place(&mut engine, placement);
        let err = engine
            .resolve_target(&pinned(2, Edge::Left, a), &screens)
            .expect_err("held");
        assert!(err.is_rejection());
    }

    #[test]
    fn on_primary_evicts_explicit_occupant() {
        let mut screens = ScreenDirectory::new();
        let a = screens.connect("eDP-1", geom(0));
        let mut engine = PlacementEngine::new();
        let placement = engine
            .resolve_target(&pinned(2, Edge::Top, a), &screens)
            .expect("placed");
        place(&mut engine, placement);
        let placement = engine
            .resolve_target(&primary(1, Edge::Top), &screens)
            .expect("wins");
        assert_eq!(placement.evict, Some(PanelId(2)));
    }

    #[test]
    fn pinned_panel_needs_its_screen() {
        let mut screens = ScreenDirectory::new();
        screens.connect("eDP-1", geom(0));
        let hdmi = screens.connect("HDMI-1", geom(80));
        screens.disconnect("HDMI-1");
        let engine = PlacementEngine::new();
        assert_eq!(
            engine.resolve_target(&pinned(3, Edge::Bottom, hdmi), &screens),
            Err(PlacementError::ScreenUnavailable(hdmi))
        );
        let mut unpinned = pinned(3, Edge::Bottom, hdmi);
        unpinned.screen = None;
        assert_eq!(
            engine.resolve_target(&unpinned, &screens),
            Err(PlacementError::Unpinned(PanelId(3)))
        );
    }

    #[test]
    fn free_edges_can_exclude_a_view() {
        let mut screens = ScreenDirectory::new();
        let a = screens.connect("eDP-1", geom(0));
        let mut engine = PlacementEngine::new();
        let placement = engine
            .resolve_target(&primary(1, Edge::Left), &screens)
            .expect("placed");
        place(&mut engine, placement);
        assert_eq!(
            engine.free_edges(a, None),
            vec![Edge::Bottom, Edge::Top, Edge::Right]
        );
        assert_eq!(engine.free_edges(a, Some(PanelId(1))), Edge::ALL.to_vec());
    }

    #[test]
    fn reconcile_runs_primary_pass_first() {
        let mut screens = ScreenDirectory::new();
        let a = screens.connect("eDP-1", geom(0));
        let b = screens.connect("HDMI-1", geom(80));
        let engine = PlacementEngine::new();
        // the pinned panel comes first but loses its slot to the on-primary one
        let candidates = [
            pinned(1, Edge::Bottom, a),
            primary(2, Edge::Bottom),
            pinned(3, Edge::Bottom, b),
        ];
        let plan = engine.reconcile(&candidates, &screens);
        let created: Vec<_> = plan.to_create.iter().map(|p| (p.panel, p.slot)).collect();
        assert_eq!(
            created,
            vec![
                (
                    PanelId(2),
                    Slot {
                        screen: a,
                        edge: Edge::Bottom
                    }
                ),
                (
                    PanelId(3),
                    Slot {
                        screen: b,
                        edge: Edge::Bottom
                    }
                ),
            ]
        );
    }

    #[test]
    fn reconcile_is_a_noop_once_applied() {
        let mut screens = ScreenDirectory::new();
        screens.connect("eDP-1", geom(0));
        let mut engine = PlacementEngine::new();
        let candidates = [primary(1, Edge::Bottom), primary(2, Edge::Top)];
        let plan = engine.reconcile(&candidates, &screens);
        for placement in plan.to_create {
            place(&mut engine, placement);
        }
        let again = engine.reconcile(&candidates, &screens);
        assert!(again.is_noop());
        assert_eq!(again.kept, vec![PanelId(1), PanelId(2)]);
    }

    #[test]
    fn reconcile_destroys_stale_reservations() {
        let mut screens = ScreenDirectory::new();
        screens.connect("eDP-1", geom(0));
        let mut engine = PlacementEngine::new();
        let placement = engine
            .resolve_target(&primary(9, Edge::Right), &screens)
            .expect("placed");
        place(&mut engine, placement);
        let plan = engine.reconcile(&[], &screens);
        assert_eq!(plan.to_destroy, vec![PanelId(9)]);
    }
}
