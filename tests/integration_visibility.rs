use std::rc::Rc;
use std::time::Duration;

use ratatui::layout::Rect;
use term_dock::config::{ConfigGroup, MemoryConfig, keys};
use term_dock::edge::Edge;
use term_dock::error::VisibilityError;
use term_dock::registry::{PanelDefinition, PanelId, group_name};
use term_dock::scheduler::{Clock, ManualClock};
use term_dock::screens::ScreenDirectory;
use term_dock::view::{
    View, ViewEvent, VisibilityDeps, VisibilityEvent, VisibilityMode, WindowInfo,
};
use term_dock::window_system::{RecordingWindowSystem, WindowRef};

const PANEL: PanelId = PanelId(1);
const SCREEN: Rect = Rect {
    x: 0,
    y: 0,
    width: 80,
    height: 24,
};

struct Fixture {
    clock: Rc<ManualClock>,
    wm: Rc<RecordingWindowSystem>,
    group: ConfigGroup,
}

impl Fixture {
    fn new(mode: VisibilityMode) -> Self {
        let group = ConfigGroup::new(MemoryConfig::shared(), group_name(PANEL));
        group.write_entry(keys::VISIBILITY, mode.to_setting());
        Self {
            clock: Rc::new(ManualClock::new()),
            wm: RecordingWindowSystem::shared(),
            group,
        }
    }

    fn with(self, key: &str, value: i64) -> Self {
        self.group.write_entry(key, value);
        self
    }

    fn view(&self) -> View {
        let mut screens = ScreenDirectory::new();
        let id = screens.connect("eDP-1", SCREEN);
        let screen = screens.screen(id).cloned().expect("screen");
        let deps = VisibilityDeps {
            view: PANEL,
            wm: self.wm.clone(),
            config: self.group.clone(),
            clock: self.clock.clone(),
            layout_active: true,
            by_pass_wm: false,
        };
        View::new(&PanelDefinition::dock(PANEL, Edge::Bottom), &screen, true, deps)
    }

    /// A view whose stored mode has been applied by the startup timer.
    fn started_view(&self) -> View {
        let mut view = self.view();
        self.clock.advance_ms(5000);
        view.process();
        view
    }

    fn advance(&self, view: &mut View, ms: u64) -> Vec<VisibilityEvent> {
        self.clock.advance_ms(ms);
        view.process()
    }
}

fn active_window_over_bottom(maximized: bool) -> WindowInfo {
    WindowInfo {
        id: 7,
        geometry: if maximized {
            SCREEN
        } else {
            Rect::new(10, 12, 40, 12)
        },
        active: true,
        maximized,
        minimized: false,
    }
}

fn count(events: &[VisibilityEvent], wanted: VisibilityEvent) -> usize {
    events.iter().filter(|e| **e == wanted).count()
}

#[test]
fn dodge_active_hides_after_the_hide_timer() {
    let fx = Fixture::new(VisibilityMode::DodgeActive);
    let mut view = fx.started_view();
    assert_eq!(view.machine().mode(), Some(VisibilityMode::DodgeActive));

    view.update_windows(&[active_window_over_bottom(false)]);
    assert!(view.machine().tracker().active_window_touching);
    fx.advance(&mut view, 699);
    assert!(view.is_visible());
    fx.advance(&mut view, 1);
    assert!(!view.is_visible());
    assert!(view.machine().is_hidden());

    view.update_windows(&[]);
    view.process();
    assert!(view.is_visible());
}

#[test]
fn pointer_over_the_panel_keeps_a_dodging_panel_up() {
    let fx = Fixture::new(VisibilityMode::DodgeActive);
    let mut view = fx.started_view();
    view.pointer_moved(5, 23);
    view.update_windows(&[active_window_over_bottom(false)]);
    fx.advance(&mut view, 5000);
    assert!(view.is_visible());

    view.pointer_moved(5, 5);
    fx.advance(&mut view, 700);
    assert!(!view.is_visible());
}

#[test]
fn dodge_maximized_ignores_plain_overlap() {
    let fx = Fixture::new(VisibilityMode::DodgeMaximized);
    let mut view = fx.started_view();
    view.update_windows(&[active_window_over_bottom(false)]);
    fx.advance(&mut view, 1000);
    assert!(view.is_visible());

    view.update_windows(&[active_window_over_bottom(true)]);
    fx.advance(&mut view, 700);
    assert!(!view.is_visible());
}

#[test]
fn dodge_all_windows_reacts_to_inactive_windows() {
    let fx = Fixture::new(VisibilityMode::DodgeAllWindows);
    let mut view = fx.started_view();
    let inactive = WindowInfo {
        active: false,
        ..active_window_over_bottom(false)
    };
    view.update_windows(&[inactive]);
    fx.advance(&mut view, 700);
    assert!(!view.is_visible());
}

#[test]
fn temporary_raise_outlasts_the_dodge_and_then_hides() {
    let fx = Fixture::new(VisibilityMode::DodgeActive);
    let mut view = fx.started_view();
    view.update_windows(&[active_window_over_bottom(false)]);
    fx.advance(&mut view, 700);
    assert!(!view.is_visible());

    view.machine_mut().raise_view_temporarily();
    view.process();
    assert!(view.is_visible());
    assert!(view.machine().is_raised_temporarily());

    fx.advance(&mut view, 1799);
    assert!(view.is_visible());
    let events = fx.advance(&mut view, 1);
    assert!(!view.machine().is_raised_temporarily());
    assert!(!view.is_visible());
    assert_eq!(count(&events, VisibilityEvent::MustBeHidden), 1);
}

#[test]
fn temporary_raise_window_is_capped() {
    let fx = Fixture::new(VisibilityMode::AutoHide).with(keys::TIMER_HIDE, 2500);
    let mut view = fx.started_view();
    fx.advance(&mut view, 2500);
    assert!(!view.is_visible());

    view.machine_mut().raise_view_temporarily();
    fx.advance(&mut view, 2999);
    assert!(view.is_visible());
    fx.advance(&mut view, 1);
    assert!(!view.is_visible());
}

#[test]
fn desktop_switch_raises_when_enabled() {
    let fx = Fixture::new(VisibilityMode::AutoHide).with(keys::RAISE_ON_DESKTOP_CHANGE, 1);
    let mut view = fx.started_view();
    fx.advance(&mut view, 700);
    assert!(!view.is_visible());

    view.machine_mut().on_current_desktop_changed();
    view.process();
    assert!(view.is_visible());
}

#[test]
fn blocked_hiding_never_hides_until_released() {
    let fx = Fixture::new(VisibilityMode::AutoHide);
    let mut view = fx.started_view();
    view.machine_mut().set_block_hiding(true);
    fx.advance(&mut view, 2000);
    assert!(view.is_visible());
    assert_eq!(
        view.machine_mut().set_is_hidden(true),
        Err(VisibilityError::HidingBlocked)
    );
    assert!(!view.machine().is_hidden());

    view.machine_mut().set_block_hiding(false);
    fx.advance(&mut view, 700);
    assert!(!view.is_visible());
}

#[test]
fn hide_request_cancels_a_pending_show() {
    let fx = Fixture::new(VisibilityMode::AutoHide).with(keys::TIMER_SHOW, 200);
    let mut view = fx.started_view();
    fx.advance(&mut view, 700);
    assert!(view.machine().is_hidden());

    view.machine_mut().handle_view_event(ViewEvent::Enter);
    view.machine_mut().handle_view_event(ViewEvent::Leave);
    let now = fx.clock.now();
    assert_eq!(
        view.machine().next_deadline(),
        Some(now + Duration::from_millis(700))
    );
    let events = fx.advance(&mut view, 1000);
    assert_eq!(count(&events, VisibilityEvent::MustBeShown), 0);
    assert!(view.machine().is_hidden());
}

#[test]
fn show_request_flips_hidden_exactly_once() {
    let fx = Fixture::new(VisibilityMode::AutoHide).with(keys::TIMER_SHOW, 200);
    let mut view = fx.started_view();
    fx.advance(&mut view, 700);

    view.machine_mut().handle_view_event(ViewEvent::Enter);
    let mut events = fx.advance(&mut view, 199);
    assert!(view.machine().is_hidden());
    events.extend(fx.advance(&mut view, 1));
    events.extend(fx.advance(&mut view, 1000));
    assert!(!view.machine().is_hidden());
    assert_eq!(count(&events, VisibilityEvent::IsHiddenChanged(false)), 1);
}

#[test]
fn drag_forces_the_panel_up_until_drop() {
    let fx = Fixture::new(VisibilityMode::AutoHide);
    let mut view = fx.started_view();
    fx.advance(&mut view, 700);
    assert!(!view.is_visible());

    view.machine_mut().handle_view_event(ViewEvent::DragEnter);
    fx.advance(&mut view, 3000);
    assert!(view.is_visible());
    assert!(view.machine().is_dragging());

    view.machine_mut().handle_view_event(ViewEvent::Drop);
    fx.advance(&mut view, 700);
    assert!(!view.is_visible());
}

#[test]
fn always_visible_reserves_struts_while_the_layout_is_active() {
    let fx = Fixture::new(VisibilityMode::AlwaysVisible);
    let mut view = fx.view();
    assert_eq!(view.machine().mode(), Some(VisibilityMode::AlwaysVisible));
    assert_eq!(
        fx.wm.struts_for(PANEL),
        Some((Rect::new(0, 23, 80, 1), Edge::Bottom))
    );
    assert!(view.machine().sentinel().is_none());

    view.machine_mut().set_layout_active(false);
    assert_eq!(fx.wm.struts_for(PANEL), None);
    view.machine_mut().set_layout_active(true);
    assert!(fx.wm.struts_for(PANEL).is_some());

    view.machine_mut().set_mode(VisibilityMode::AutoHide);
    assert_eq!(fx.wm.struts_for(PANEL), None);

    view.machine_mut().set_mode(VisibilityMode::AlwaysVisible);
    drop(view);
    assert_eq!(fx.wm.struts_for(PANEL), None);
    assert!(!fx.wm.has_window(WindowRef::View(PANEL)));
}

#[test]
fn sentinel_follows_hidden_state_and_edge_setting() {
    let fx = Fixture::new(VisibilityMode::AutoHide);
    let mut view = fx.started_view();
    let sentinel = view.machine().sentinel().map(|s| s.window()).expect("sentinel");
    assert!(fx.wm.has_window(sentinel));
    assert_eq!(fx.wm.edge_state_for(sentinel), Some(false));

    fx.advance(&mut view, 700);
    assert_eq!(fx.wm.edge_state_for(sentinel), Some(true));

    view.machine_mut().set_layout_active(false);
    assert_eq!(fx.wm.edge_state_for(sentinel), Some(false));
    view.machine_mut().set_layout_active(true);

    view.machine_mut().set_enable_edges(false);
    assert!(view.machine().sentinel().is_none());
    assert!(!fx.wm.has_window(sentinel));
    assert!(!view.machine().supports_edges());
}

#[test]
fn startup_mode_is_rushed_while_configuring() {
    let fx = Fixture::new(VisibilityMode::AutoHide);
    let mut view = fx.view();
    fx.advance(&mut view, 1000);
    assert_eq!(view.machine().mode(), None);

    view.machine_mut().user_configuring_changed(true);
    fx.advance(&mut view, 100);
    assert_eq!(view.machine().mode(), Some(VisibilityMode::AutoHide));

    view.machine_mut().set_timer_hide(Duration::from_millis(1200));
    view.machine_mut().user_configuring_changed(false);
    assert_eq!(fx.group.read_int(keys::TIMER_HIDE, 0), 1200);
}
