//! Panel definitions owned by one layout.
//!
//! A definition outlives its on-screen view: it stays registered while its
//! screen is gone or its edge is taken, and is instantiated again by the next
//! reconciliation pass that finds it a slot.

use std::fmt;

use crate::config::{ConfigGroup, PANEL_GROUP_PREFIX, SharedConfig, keys};
use crate::constants::{DEFAULT_PANEL_THICKNESS, PANEL_PLUGIN_ID, TRAY_PLUGIN_ID};
use crate::edge::Edge;
use crate::screens::ScreenId;
use crate::view::VisibilityMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PanelId(pub u32);

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Capability tag decided once, when a definition is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelKind {
    /// Placeable on a screen edge.
    Dock,
    /// Lives inside a dock panel and has no edge of its own.
    Tray,
    /// Some other plugin; never placed by this engine.
    Foreign,
    /// The plugin package could not be resolved.
    Missing,
}

impl PanelKind {
    pub fn from_plugin(plugin: &str) -> Self {
        match plugin {
            "" => PanelKind::Missing,
            PANEL_PLUGIN_ID => PanelKind::Dock,
            TRAY_PLUGIN_ID => PanelKind::Tray,
            _ => PanelKind::Foreign,
        }
    }

    pub fn is_dock(self) -> bool {
        self == PanelKind::Dock
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelDefinition {
    pub id: PanelId,
    pub plugin: String,
    pub kind: PanelKind,
    pub edge: Edge,
    /// Follow whichever screen is primary instead of a fixed screen.
    pub on_primary: bool,
    /// Last screen the panel was pinned to.
    pub screen: Option<ScreenId>,
    pub visibility: VisibilityMode,
    pub by_pass_wm: bool,
    pub parent: Option<PanelId>,
    pub thickness: u16,
    pub preferred_for_shortcuts: bool,
}

impl PanelDefinition {
    pub fn dock(id: PanelId, edge: Edge) -> Self {
        Self {
            id,
            plugin: PANEL_PLUGIN_ID.to_string(),
            kind: PanelKind::Dock,
            edge,
            on_primary: true,
            screen: None,
            visibility: VisibilityMode::default(),
            by_pass_wm: false,
            parent: None,
            thickness: DEFAULT_PANEL_THICKNESS,
            preferred_for_shortcuts: false,
        }
    }

    pub fn pinned(mut self, screen: ScreenId) -> Self {
        self.on_primary = false;
        self.screen = Some(screen);
        self
    }

    pub fn tray(id: PanelId, parent: PanelId) -> Self {
        Self {
            plugin: TRAY_PLUGIN_ID.to_string(),
            kind: PanelKind::Tray,
            parent: Some(parent),
            ..Self::dock(id, Edge::Bottom)
        }
    }

    /// Window-manager bypass only applies to modes that can hide.
    pub fn effective_by_pass_wm(&self) -> bool {
        self.visibility.can_hide() && self.by_pass_wm
    }

    pub fn load(id: PanelId, group: &ConfigGroup) -> Self {
        let plugin = group.read_string(keys::PLUGIN, "");
        let kind = PanelKind::from_plugin(&plugin);
        let location = group.read_int(keys::LOCATION, Edge::Bottom.to_location());
        let edge = Edge::from_location(location).unwrap_or_else(|| {
            tracing::warn!(panel = %id, location, "unknown location, using bottom edge");
            Edge::Bottom
        });
        let screen = match group.read_int(keys::LAST_SCREEN, -1) {
            value if value < 0 => None,
            value => u32::try_from(value).ok().map(ScreenId),
        };
        let parent = match group.read_int(keys::PARENT, -1) {
            value if value < 0 => None,
            value => u32::try_from(value).ok().map(PanelId),
        };
        let thickness = group.read_int(keys::THICKNESS, i64::from(DEFAULT_PANEL_THICKNESS));
        Self {
            id,
            plugin,
            kind,
            edge,
            on_primary: group.read_bool(keys::ON_PRIMARY, true),
            screen,
            visibility: VisibilityMode::read_from(group),
            by_pass_wm: group.read_bool(keys::BY_PASS_WM, false),
            parent,
            thickness: u16::try_from(thickness.max(1)).unwrap_or(u16::MAX),
            preferred_for_shortcuts: group.read_bool(keys::PREFERRED_FOR_SHORTCUTS, false),
        }
    }

    pub fn save(&self, group: &ConfigGroup) {
        group.write_entry(keys::PLUGIN, self.plugin.as_str());
        group.write_entry(keys::LOCATION, self.edge.to_location());
        group.write_entry(keys::ON_PRIMARY, self.on_primary);
        group.write_entry(
            keys::LAST_SCREEN,
            self.screen.map_or(-1, |s| i64::from(s.0)),
        );
        group.write_entry(keys::VISIBILITY, self.visibility.to_setting());
        group.write_entry(keys::BY_PASS_WM, self.by_pass_wm);
        group.write_entry(keys::PARENT, self.parent.map_or(-1, |p| i64::from(p.0)));
        group.write_entry(keys::THICKNESS, i64::from(self.thickness));
        group.write_entry(keys::PREFERRED_FOR_SHORTCUTS, self.preferred_for_shortcuts);
    }
}

pub fn group_name(id: PanelId) -> String {
    format!("{PANEL_GROUP_PREFIX}{id}")
}

pub struct PanelRegistry {
    config: SharedConfig,
    definitions: Vec<PanelDefinition>,
    next_id: u32,
}

impl fmt::Debug for PanelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanelRegistry")
            .field("definitions", &self.definitions)
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

impl PanelRegistry {
    pub fn new(config: SharedConfig) -> Self {
        Self {
            config,
            definitions: Vec::new(),
            next_id: 1,
        }
    }

    /// Loads every panel group found in `config`, in identifier order.
    pub fn load(config: SharedConfig) -> Self {
        let mut registry = Self::new(config.clone());
        let groups = config.borrow().groups();
        let mut ids: Vec<PanelId> = groups
            .iter()
            .filter_map(|g| g.strip_prefix(PANEL_GROUP_PREFIX))
            .filter_map(|raw| raw.parse().ok().map(PanelId))
            .collect();
        ids.sort();
        for id in ids {
            let definition = PanelDefinition::load(id, &registry.group(id));
            registry.next_id = registry.next_id.max(id.0.saturating_add(1));
            registry.definitions.push(definition);
        }
        tracing::debug!(count = registry.definitions.len(), "loaded panel definitions");
        registry
    }

    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    pub fn group(&self, id: PanelId) -> ConfigGroup {
        ConfigGroup::new(self.config.clone(), group_name(id))
    }

    pub fn next_id(&mut self) -> PanelId {
        let id = PanelId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    /// Registers a definition and writes it to the store. An existing
    /// definition with the same id is replaced.
    pub fn insert(&mut self, definition: PanelDefinition) -> PanelId {
        let id = definition.id;
        self.next_id = self.next_id.max(id.0.saturating_add(1));
        definition.save(&self.group(id));
        match self.definitions.iter_mut().find(|d| d.id == id) {
            Some(slot) => *slot = definition,
            None => self.definitions.push(definition),
        }
        id
    }

    /// Replaces the in-memory definition with what the store holds. Returns
    /// false for unknown panels or when the stored group is gone.
    pub fn reload(&mut self, id: PanelId) -> bool {
        if !self.config.borrow().groups().contains(&group_name(id)) {
            return false;
        }
        let definition = PanelDefinition::load(id, &self.group(id));
        match self.definitions.iter_mut().find(|d| d.id == id) {
            Some(slot) => {
                *slot = definition;
                true
            }
            None => false,
        }
    }

    /// Removes a definition together with the sub-panels parented to it.
    /// Children come first in the returned list.
    pub fn remove(&mut self, id: PanelId) -> Vec<PanelDefinition> {
        let mut removed = Vec::new();
        for child in self.children_of(id) {
            removed.extend(self.remove(child));
        }
        if let Some(pos) = self.definitions.iter().position(|d| d.id == id) {
            removed.push(self.definitions.remove(pos));
            self.config.borrow_mut().delete_group(&group_name(id));
        }
        removed
    }

    /// Applies `f` and persists the result.
    pub fn update<F>(&mut self, id: PanelId, f: F) -> bool
    where
        F: FnOnce(&mut PanelDefinition),
    {
        let group = self.group(id);
        match self.definitions.iter_mut().find(|d| d.id == id) {
            Some(definition) => {
                f(definition);
                definition.id = id;
                definition.save(&group);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: PanelId) -> Option<&PanelDefinition> {
        self.definitions.iter().find(|d| d.id == id)
    }

    pub fn contains(&self, id: PanelId) -> bool {
        self.get(id).is_some()
    }

    pub fn children_of(&self, id: PanelId) -> Vec<PanelId> {
        self.definitions
            .iter()
            .filter(|d| d.parent == Some(id))
            .map(|d| d.id)
            .collect()
    }

    /// Definitions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &PanelDefinition> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigStore, MemoryConfig};

    #[test]
    fn kind_is_decided_by_plugin() {
        assert_eq!(PanelKind::from_plugin(PANEL_PLUGIN_ID), PanelKind::Dock);
        assert_eq!(PanelKind::from_plugin(TRAY_PLUGIN_ID), PanelKind::Tray);
        assert_eq!(PanelKind::from_plugin("org.example.clock"), PanelKind::Foreign);
        assert_eq!(PanelKind::from_plugin(""), PanelKind::Missing);
    }

    #[test]
    fn definitions_survive_a_reload() {
        let store = MemoryConfig::shared();
        let mut registry = PanelRegistry::new(store.clone());
        let mut pinned = PanelDefinition::dock(PanelId(4), Edge::Left).pinned(ScreenId(2));
        pinned.visibility = VisibilityMode::AutoHide;
        pinned.by_pass_wm = true;
        registry.insert(pinned.clone());
        registry.insert(PanelDefinition::dock(PanelId(2), Edge::Top));

        let reloaded = PanelRegistry::load(store);
        let ids: Vec<_> = reloaded.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![PanelId(2), PanelId(4)]);
        assert_eq!(reloaded.get(PanelId(4)), Some(&pinned));
        let mut reloaded = reloaded;
        assert_eq!(reloaded.next_id(), PanelId(5));
    }

    #[test]
    fn remove_takes_children_first() {
        let store = MemoryConfig::shared();
        let mut registry = PanelRegistry::new(store.clone());
        registry.insert(PanelDefinition::dock(PanelId(1), Edge::Bottom));
        registry.insert(PanelDefinition::tray(PanelId(2), PanelId(1)));
        registry.insert(PanelDefinition::dock(PanelId(3), Edge::Top));
        let removed: Vec<_> = registry.remove(PanelId(1)).iter().map(|d| d.id).collect();
        assert_eq!(removed, vec![PanelId(2), PanelId(1)]);
        assert_eq!(registry.len(), 1);
        assert_eq!(store.borrow().groups(), vec![group_name(PanelId(3))]);
    }

    #[test]
    fn bypass_only_applies_to_hiding_modes() {
        let mut def = PanelDefinition::dock(PanelId(1), Edge::Bottom);
        def.by_pass_wm = true;
        def.visibility = VisibilityMode::AlwaysVisible;
        assert!(!def.effective_by_pass_wm());
        def.visibility = VisibilityMode::DodgeActive;
        assert!(def.effective_by_pass_wm());
    }

    #[test]
    fn largest_stored_id_does_not_overflow() {
        let store = MemoryConfig::shared();
        let group = ConfigGroup::new(store.clone(), group_name(PanelId(u32::MAX)));
        group.write_entry(keys::PLUGIN, PANEL_PLUGIN_ID);
        let mut registry = PanelRegistry::load(store);
        assert!(registry.contains(PanelId(u32::MAX)));
        assert_eq!(registry.next_id(), PanelId(u32::MAX));
    }

    #[test]
    fn reload_picks_up_stored_edits() {
        let store = MemoryConfig::shared();
        let mut registry = PanelRegistry::new(store.clone());
        let id = registry.insert(PanelDefinition::dock(PanelId(1), Edge::Bottom));
        registry.group(id).write_entry(keys::LOCATION, Edge::Left.to_location());
        assert_eq!(registry.get(id).map(|d| d.edge), Some(Edge::Bottom));
        assert!(registry.reload(id));
        assert_eq!(registry.get(id).map(|d| d.edge), Some(Edge::Left));

        store.borrow_mut().delete_group(&group_name(id));
        assert!(!registry.reload(id));
        assert!(!registry.reload(PanelId(7)));
    }

    #[test]
    fn unknown_location_falls_back_to_bottom() {
        let store = MemoryConfig::shared();
        let group = ConfigGroup::new(store, group_name(PanelId(9)));
        group.write_entry(keys::PLUGIN, PANEL_PLUGIN_ID);
        group.write_entry(keys::LOCATION, 42i64);
        let def = PanelDefinition::load(PanelId(9), &group);
        assert_eq!(def.edge, Edge::Bottom);
        assert!(def.on_primary);
        assert_eq!(def.screen, None);
    }
}
