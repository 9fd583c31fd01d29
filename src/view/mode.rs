use std::fmt;

use crate::config::{ConfigGroup, keys};

/// How a panel decides to show or hide itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisibilityMode {
    /// Reserves screen space and never hides.
    AlwaysVisible,
    /// Shown only while the pointer is inside the panel.
    AutoHide,
    /// Hides while the active window touches the panel.
    #[default]
    DodgeActive,
    /// Hides while the active window is maximized.
    DodgeMaximized,
    /// Hides while any window touches the panel.
    DodgeAllWindows,
    /// Stays above other windows and never hides.
    WindowsGoBelow,
}

impl VisibilityMode {
    pub const ALL: [VisibilityMode; 6] = [
        VisibilityMode::AlwaysVisible,
        VisibilityMode::AutoHide,
        VisibilityMode::DodgeActive,
        VisibilityMode::DodgeMaximized,
        VisibilityMode::DodgeAllWindows,
        VisibilityMode::WindowsGoBelow,
    ];

    /// Whether any trigger of this mode can hide the panel.
    pub fn can_hide(self) -> bool {
        !matches!(
            self,
            VisibilityMode::AlwaysVisible | VisibilityMode::WindowsGoBelow
        )
    }

    pub fn to_setting(self) -> i64 {
        match self {
            VisibilityMode::AlwaysVisible => 0,
            VisibilityMode::AutoHide => 1,
            VisibilityMode::DodgeActive => 2,
            VisibilityMode::DodgeMaximized => 3,
            VisibilityMode::DodgeAllWindows => 4,
            VisibilityMode::WindowsGoBelow => 5,
        }
    }

    pub fn from_setting(value: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.to_setting() == value)
    }

    /// Reads the `visibility` key, falling back to the default mode.
    pub fn read_from(group: &ConfigGroup) -> Self {
        let raw = group.read_int(keys::VISIBILITY, Self::default().to_setting());
        Self::from_setting(raw).unwrap_or_else(|| {
            tracing::warn!(group = %group.name(), value = raw, "unknown visibility mode");
            Self::default()
        })
    }

    /// Next mode in settings order, wrapping around.
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for VisibilityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VisibilityMode::AlwaysVisible => "Always visible",
            VisibilityMode::AutoHide => "Auto hide",
            VisibilityMode::DodgeActive => "Dodge active",
            VisibilityMode::DodgeMaximized => "Dodge maximized",
            VisibilityMode::DodgeAllWindows => "Dodge all windows",
            VisibilityMode::WindowsGoBelow => "Windows go below",
        };
        write!(f, "{}", s)
    }
}
