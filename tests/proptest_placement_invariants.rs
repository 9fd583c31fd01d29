//! Property-based invariant tests for panel placement.
//!
//! Random sequences of definition and screen-topology changes must keep:
//!
//! 1. At most one live view per (screen, edge).
//! 2. The reservation map in step with the live views.
//! 3. `free_edges` equal to the four edges minus the live ones on a screen.
//! 4. On-primary views on the current primary screen.
//! 5. `sync_to_screens` idempotent.

use std::rc::Rc;

use proptest::prelude::*;
use ratatui::layout::Rect;
use term_dock::config::MemoryConfig;
use term_dock::edge::Edge;
use term_dock::layout::{LayoutDeps, ViewLifecycle};
use term_dock::placement::Slot;
use term_dock::registry::{PanelDefinition, PanelRegistry};
use term_dock::scheduler::ManualClock;
use term_dock::screens::{ScreenDirectory, ScreenId};
use term_dock::window_system::RecordingWindowSystem;

const CONNECTORS: [&str; 4] = ["eDP-1", "HDMI-1", "DP-1", "DP-2"];

#[derive(Debug, Clone)]
enum Op {
    Connect(usize),
    Disconnect(usize),
    SetPrimary(usize),
    AddOnPrimary(Edge),
    AddPinned(usize, Edge),
    Remove(usize),
    Sync,
}

fn edge_strategy() -> impl Strategy<Value = Edge> {
    prop::sample::select(Edge::ALL.to_vec())
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..CONNECTORS.len()).prop_map(Op::Connect),
        (0..CONNECTORS.len()).prop_map(Op::Disconnect),
        (0..CONNECTORS.len()).prop_map(Op::SetPrimary),
        edge_strategy().prop_map(Op::AddOnPrimary),
        (0..CONNECTORS.len(), edge_strategy()).prop_map(|(slot, edge)| Op::AddPinned(slot, edge)),
        any::<usize>().prop_map(Op::Remove),
        Just(Op::Sync),
    ]
}

fn geometry(slot: usize) -> Rect {
    let x = u16::try_from(slot).unwrap_or(0) * 80;
    Rect::new(x, 0, 80, 24)
}

/// Two screens connected, two more known but unplugged.
fn setup() -> (ViewLifecycle, Vec<ScreenId>) {
    let deps = LayoutDeps {
        screens: ScreenDirectory::shared(),
        wm: RecordingWindowSystem::shared(),
        clock: Rc::new(ManualClock::new()),
    };
    let mut layout = ViewLifecycle::new(PanelRegistry::new(MemoryConfig::shared()), deps);
    let ids: Vec<ScreenId> = CONNECTORS
        .iter()
        .enumerate()
        .map(|(slot, connector)| layout.screen_connected(connector, geometry(slot)))
        .collect();
    layout.screen_disconnected(CONNECTORS[2]);
    layout.screen_disconnected(CONNECTORS[3]);
    (layout, ids)
}

fn apply(layout: &mut ViewLifecycle, ids: &[ScreenId], op: &Op) {
    match *op {
        Op::Connect(slot) => {
            layout.screen_connected(CONNECTORS[slot], geometry(slot));
        }
        Op::Disconnect(slot) => {
            layout.screen_disconnected(CONNECTORS[slot]);
        }
        Op::SetPrimary(slot) => {
            layout.primary_screen_changed(ids[slot]);
        }
        Op::AddOnPrimary(edge) => {
            let id = layout.next_panel_id();
            layout.add_definition(PanelDefinition::dock(id, edge));
        }
        Op::AddPinned(slot, edge) => {
            let id = layout.next_panel_id();
            layout.add_definition(PanelDefinition::dock(id, edge).pinned(ids[slot]));
        }
        Op::Remove(pick) => {
            let panels: Vec<_> = layout.registry().iter().map(|d| d.id).collect();
            if !panels.is_empty() {
                layout.remove_definition(panels[pick % panels.len()]);
            }
        }
        Op::Sync => {
            layout.sync_to_screens();
        }
    }
}

fn check_invariants(layout: &ViewLifecycle) -> Result<(), TestCaseError> {
    let screens = layout.screens().borrow();
    let mut slots = Vec::new();
    for view in layout.views() {
        let slot = Slot {
            screen: view.screen(),
            edge: view.edge(),
        };
        prop_assert!(!slots.contains(&slot), "slot {:?} held twice", slot);
        slots.push(slot);
        prop_assert!(screens.screen_exists(view.screen()));
        prop_assert_eq!(layout.placement().slot_of(view.panel()), Some(slot));
        if view.on_primary() {
            prop_assert_eq!(Some(view.screen()), screens.primary_id());
        }
    }
    prop_assert_eq!(layout.placement().reservations().count(), layout.views_count());

    for screen in screens.connected() {
        let expected: Vec<Edge> = Edge::ALL
            .into_iter()
            .filter(|edge| {
                !slots.contains(&Slot {
                    screen: screen.id(),
                    edge: *edge,
                })
            })
            .collect();
        prop_assert_eq!(layout.free_edges(screen.id()), expected);
    }
    Ok(())
}

proptest! {
    #[test]
    fn placement_invariants_hold(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let (mut layout, ids) = setup();
        for op in &ops {
            apply(&mut layout, &ids, op);
            check_invariants(&layout)?;
        }
        layout.sync_to_screens();
        check_invariants(&layout)?;
        let again = layout.sync_to_screens();
        prop_assert!(again.is_noop(), "second sync changed something: {:?}", again);
    }

    #[test]
    fn excluding_a_view_frees_its_edge(ops in prop::collection::vec(op_strategy(), 1..30)) {
        let (mut layout, ids) = setup();
        for op in &ops {
            apply(&mut layout, &ids, op);
        }
        let views: Vec<_> = layout.views().map(|v| (v.panel(), v.screen(), v.edge())).collect();
        for (panel, screen, edge) in views {
            prop_assert!(!layout.free_edges(screen).contains(&edge));
            prop_assert!(layout.available_edges_for_view(screen, panel).contains(&edge));
        }
    }
}
