//! Per-view window overlap signals.
//!
//! The compositor side reports three booleans. They can be fed in directly,
//! or derived here from a window list and the panel's region.

use ratatui::layout::Rect;

use crate::geometry::{rects_intersect, rects_touch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerSignal {
    ActiveWindowTouching,
    ActiveWindowMaximized,
    ExistsWindowTouching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackerSignals {
    pub active_window_touching: bool,
    pub active_window_maximized: bool,
    pub exists_window_touching: bool,
}

impl TrackerSignals {
    pub fn get(&self, signal: TrackerSignal) -> bool {
        match signal {
            TrackerSignal::ActiveWindowTouching => self.active_window_touching,
            TrackerSignal::ActiveWindowMaximized => self.active_window_maximized,
            TrackerSignal::ExistsWindowTouching => self.exists_window_touching,
        }
    }

    pub fn set(&mut self, signal: TrackerSignal, value: bool) {
        match signal {
            TrackerSignal::ActiveWindowTouching => self.active_window_touching = value,
            TrackerSignal::ActiveWindowMaximized => self.active_window_maximized = value,
            TrackerSignal::ExistsWindowTouching => self.exists_window_touching = value,
        }
    }

    /// Signals whose value differs in `next`, with their new value.
    pub fn changes(&self, next: &TrackerSignals) -> Vec<(TrackerSignal, bool)> {
        [
            TrackerSignal::ActiveWindowTouching,
            TrackerSignal::ActiveWindowMaximized,
            TrackerSignal::ExistsWindowTouching,
        ]
        .into_iter()
        .filter(|signal| self.get(*signal) != next.get(*signal))
        .map(|signal| (signal, next.get(signal)))
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    pub id: u64,
    pub geometry: Rect,
    pub active: bool,
    pub maximized: bool,
    pub minimized: bool,
}

/// Derives the tracker signals for a panel occupying `region` on a screen
/// with geometry `screen`.
pub fn signals_for(region: Rect, screen: Rect, windows: &[WindowInfo]) -> TrackerSignals {
    let mut signals = TrackerSignals::default();
    for window in windows.iter().filter(|w| !w.minimized) {
        let touching = rects_touch(window.geometry, region);
        if touching {
            signals.exists_window_touching = true;
        }
        if window.active {
            signals.active_window_touching = touching;
            signals.active_window_maximized =
                window.maximized && rects_intersect(window.geometry, screen);
        }
    }
    signals
}
