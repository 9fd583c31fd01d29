//! Directory of physical screens.
//!
//! Identifiers are stable: a screen that disconnects and later reconnects
//! under the same connector name gets its old [`ScreenId`] back, so panels
//! pinned to it find it again.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ratatui::layout::Rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScreenId(pub u32);

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    id: ScreenId,
    connector: String,
    geometry: Rect,
    connected: bool,
}

impl Screen {
    pub fn id(&self) -> ScreenId {
        self.id
    }

    pub fn connector(&self) -> &str {
        &self.connector
    }

    pub fn geometry(&self) -> Rect {
        self.geometry
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

pub type SharedScreens = Rc<RefCell<ScreenDirectory>>;

#[derive(Debug, Default)]
pub struct ScreenDirectory {
    known: Vec<Screen>,
    // connected screens, in system enumeration order
    order: Vec<ScreenId>,
    primary: Option<ScreenId>,
    next_id: u32,
}

impl ScreenDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedScreens {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Registers a connected screen. The first connected screen becomes
    /// primary when none is.
    pub fn connect(&mut self, connector: &str, geometry: Rect) -> ScreenId {
        let id = match self.id_for_connector(connector) {
            Some(id) => id,
            None => {
                let id = ScreenId(self.next_id);
                self.next_id += 1;
                self.known.push(Screen {
                    id,
                    connector: connector.to_string(),
                    geometry,
                    connected: false,
                });
                id
            }
        };
        if let Some(screen) = self.known.iter_mut().find(|s| s.id == id) {
            screen.geometry = geometry;
            if !screen.connected {
                screen.connected = true;
                self.order.push(id);
                tracing::info!(screen = %connector, id = %id, "screen connected");
            }
        }
        if self.primary.is_none() {
            self.primary = Some(id);
        }
        id
    }

    /// Marks a screen disconnected. If it was primary, the next screen in
    /// enumeration order takes over.
    pub fn disconnect(&mut self, connector: &str) -> Option<ScreenId> {
        let screen = self
            .known
            .iter_mut()
            .find(|s| s.connected && s.connector == connector)?;
        screen.connected = false;
        let id = screen.id;
        self.order.retain(|other| *other != id);
        if self.primary == Some(id) {
            self.primary = self.order.first().copied();
        }
        tracing::info!(screen = %connector, id = %id, primary = ?self.primary, "screen disconnected");
        Some(id)
    }

    /// Returns whether the primary screen actually changed.
    pub fn set_primary(&mut self, id: ScreenId) -> bool {
        if !self.screen_exists(id) || self.primary == Some(id) {
            return false;
        }
        tracing::info!(id = %id, "primary screen changed");
        self.primary = Some(id);
        true
    }

    /// Returns whether a connected screen changed size or position. A
    /// disconnected screen keeps the new geometry for its next connection.
    pub fn set_geometry(&mut self, id: ScreenId, geometry: Rect) -> bool {
        match self.known.iter_mut().find(|s| s.id == id) {
            Some(screen) if screen.geometry != geometry => {
                screen.geometry = geometry;
                screen.connected
            }
            _ => false,
        }
    }

    pub fn primary_id(&self) -> Option<ScreenId> {
        self.primary
    }

    pub fn primary(&self) -> Option<&Screen> {
        self.primary.and_then(|id| self.screen(id))
    }

    pub fn is_primary(&self, id: ScreenId) -> bool {
        self.primary == Some(id)
    }

    /// A connected screen.
    pub fn screen(&self, id: ScreenId) -> Option<&Screen> {
        self.known.iter().find(|s| s.id == id && s.connected)
    }

    pub fn screen_exists(&self, id: ScreenId) -> bool {
        self.screen(id).is_some()
    }

    /// Connector name for any screen ever seen, connected or not.
    pub fn connector(&self, id: ScreenId) -> Option<&str> {
        self.known
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.connector.as_str())
    }

    pub fn id_for_connector(&self, connector: &str) -> Option<ScreenId> {
        self.known
            .iter()
            .find(|s| s.connector == connector)
            .map(|s| s.id)
    }

    /// Connected screens in enumeration order.
    pub fn connected(&self) -> impl Iterator<Item = &Screen> {
        self.order.iter().filter_map(|id| self.screen(*id))
    }

    pub fn enumeration_index(&self, id: ScreenId) -> Option<usize> {
        self.order.iter().position(|other| *other == id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
