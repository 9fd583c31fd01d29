use std::fmt;

use ratatui::layout::Rect;

/// One of the four sides of a screen a panel can occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Edge {
    Bottom,
    Left,
    Top,
    Right,
}

impl Edge {
    /// All edges, highest shortcut priority first.
    pub const ALL: [Edge; 4] = [Edge::Bottom, Edge::Left, Edge::Top, Edge::Right];

    /// Priority rank used when ordering views on the same screen; lower wins.
    pub fn priority(self) -> usize {
        match self {
            Edge::Bottom => 0,
            Edge::Left => 1,
            Edge::Top => 2,
            Edge::Right => 3,
        }
    }

    /// Value stored under the `location` settings key.
    pub fn to_location(self) -> i64 {
        match self {
            Edge::Top => 3,
            Edge::Bottom => 4,
            Edge::Left => 5,
            Edge::Right => 6,
        }
    }

    pub fn from_location(value: i64) -> Option<Self> {
        match value {
            3 => Some(Edge::Top),
            4 => Some(Edge::Bottom),
            5 => Some(Edge::Left),
            6 => Some(Edge::Right),
            _ => None,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Edge::Top | Edge::Bottom)
    }

    /// Region a panel of `thickness` occupies along this edge of `screen`.
    pub fn panel_rect(self, screen: Rect, thickness: u16) -> Rect {
        let thickness = if self.is_horizontal() {
            thickness.min(screen.height)
        } else {
            thickness.min(screen.width)
        };
        match self {
            Edge::Top => Rect {
                height: thickness,
                ..screen
            },
            Edge::Bottom => Rect {
                y: screen.y + screen.height - thickness,
                height: thickness,
                ..screen
            },
            Edge::Left => Rect {
                width: thickness,
                ..screen
            },
            Edge::Right => Rect {
                x: screen.x + screen.width - thickness,
                width: thickness,
                ..screen
            },
        }
    }

    /// Strip of the screen border the edge-reveal sentinel listens on.
    pub fn sentinel_rect(self, screen: Rect) -> Rect {
        self.panel_rect(screen, 1)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Edge::Bottom => "bottom",
            Edge::Left => "left",
            Edge::Top => "top",
            Edge::Right => "right",
        };
        write!(f, "{s}")
    }
}
