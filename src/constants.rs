//! Shared crate-wide constants.

use std::time::Duration;

/// Default delay before a requested "show" fires. Zero means the show is
/// delivered on the next scheduler poll rather than synchronously.
pub const DEFAULT_TIMER_SHOW: Duration = Duration::from_millis(0);

/// Default delay before a requested "hide" fires.
pub const DEFAULT_TIMER_HIDE: Duration = Duration::from_millis(700);

/// Delay before a stored non-AlwaysVisible mode is applied after the view is
/// created. Gives the surrounding shell time to settle its window list.
pub const STARTUP_MODE_DELAY: Duration = Duration::from_millis(5000);

/// Startup delay used instead of [`STARTUP_MODE_DELAY`] once the user begins
/// configuring the panel.
pub const STARTUP_MODE_DELAY_CONFIGURING: Duration = Duration::from_millis(100);

/// Lower bound of a temporary raise window.
pub const RAISE_TEMPORARILY_MIN: Duration = Duration::from_millis(1800);

/// Upper bound of a temporary raise window.
pub const RAISE_TEMPORARILY_MAX: Duration = Duration::from_millis(3000);

/// Grace period before a recreated view is torn down, so dependent UI such as
/// a settings window can close first.
pub const RECREATE_REMOVE_DELAY: Duration = Duration::from_millis(350);

/// Delay between the old view being destroyed and the new one being built.
pub const RECREATE_ADD_DELAY: Duration = Duration::from_millis(250);

/// Default panel thickness, in simulator cells.
pub const DEFAULT_PANEL_THICKNESS: u16 = 1;

/// Plugin identifier of a dock panel definition.
pub const PANEL_PLUGIN_ID: &str = "term-dock.panel";

/// Plugin identifier of a tray sub-panel that lives inside a dock panel.
pub const TRAY_PLUGIN_ID: &str = "term-dock.tray";
