//! Settings access for panel definitions and their visibility state.
//!
//! Persistence lives outside this crate. The engines only see the narrow
//! [`ConfigStore`] contract; [`MemoryConfig`] is the in-process store used by
//! the simulator and the tests.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Setting keys understood by the engines.
pub mod keys {
    pub const VISIBILITY: &str = "visibility";
    pub const TIMER_SHOW: &str = "timerShow";
    pub const TIMER_HIDE: &str = "timerHide";
    pub const RAISE_ON_DESKTOP_CHANGE: &str = "raiseOnDesktopChange";
    pub const RAISE_ON_ACTIVITY_CHANGE: &str = "raiseOnActivityChange";
    pub const ENABLE_KWIN_EDGES: &str = "enableKWinEdges";
    pub const ON_PRIMARY: &str = "onPrimary";
    pub const LAST_SCREEN: &str = "lastScreen";
    pub const LOCATION: &str = "location";
    pub const BY_PASS_WM: &str = "byPassWM";
    pub const PLUGIN: &str = "plugin";
    pub const PARENT: &str = "parent";
    pub const THICKNESS: &str = "thickness";
    pub const PREFERRED_FOR_SHORTCUTS: &str = "preferredForShortcuts";
}

/// Prefix of every per-panel settings group.
pub const PANEL_GROUP_PREFIX: &str = "Containments][";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl ConfigValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(v) => Some(*v),
            ConfigValue::Int(v) => Some(*v != 0),
            ConfigValue::Str(s) => match s.as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(v) => Some(*v),
            ConfigValue::Bool(v) => Some(i64::from(*v)),
            ConfigValue::Str(s) => s.parse().ok(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Int(value)
    }
}

impl From<u32> for ConfigValue {
    fn from(value: u32) -> Self {
        ConfigValue::Int(i64::from(value))
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Str(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::Str(value)
    }
}

pub trait ConfigStore {
    fn read_entry(&self, group: &str, key: &str) -> Option<ConfigValue>;
    fn write_entry(&mut self, group: &str, key: &str, value: ConfigValue);
    fn delete_group(&mut self, group: &str);
    /// Group names in storage order.
    fn groups(&self) -> Vec<String>;
    fn sync(&mut self);
}

pub type SharedConfig = Rc<RefCell<dyn ConfigStore>>;

/// A named settings group inside a shared store.
#[derive(Clone)]
pub struct ConfigGroup {
    store: SharedConfig,
    name: String,
}

impl std::fmt::Debug for ConfigGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigGroup")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl ConfigGroup {
    pub fn new(store: SharedConfig, name: impl Into<String>) -> Self {
        Self {
            store,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &SharedConfig {
        &self.store
    }

    pub fn read_entry(&self, key: &str, default: impl Into<ConfigValue>) -> ConfigValue {
        self.store
            .borrow()
            .read_entry(&self.name, key)
            .unwrap_or_else(|| default.into())
    }

    pub fn read_bool(&self, key: &str, default: bool) -> bool {
        let value = self.read_entry(key, default);
        value.as_bool().unwrap_or_else(|| {
            tracing::warn!(group = %self.name, key, ?value, "expected a boolean setting");
            default
        })
    }

    pub fn read_int(&self, key: &str, default: i64) -> i64 {
        let value = self.read_entry(key, default);
        value.as_int().unwrap_or_else(|| {
            tracing::warn!(group = %self.name, key, ?value, "expected an integer setting");
            default
        })
    }

    pub fn read_string(&self, key: &str, default: &str) -> String {
        match self.read_entry(key, default) {
            ConfigValue::Str(s) => s,
            other => {
                tracing::warn!(group = %self.name, key, value = ?other, "expected a string setting");
                default.to_string()
            }
        }
    }

    pub fn write_entry(&self, key: &str, value: impl Into<ConfigValue>) {
        self.store
            .borrow_mut()
            .write_entry(&self.name, key, value.into());
    }

    pub fn sync(&self) {
        self.store.borrow_mut().sync();
    }
}

#[derive(Debug, Default)]
pub struct MemoryConfig {
    groups: BTreeMap<String, BTreeMap<String, ConfigValue>>,
    dirty: bool,
    syncs: usize,
}

impl MemoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Rc<RefCell<MemoryConfig>> {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn sync_count(&self) -> usize {
        self.syncs
    }
}

impl ConfigStore for MemoryConfig {
    fn read_entry(&self, group: &str, key: &str) -> Option<ConfigValue> {
        self.groups.get(group)?.get(key).cloned()
    }

    fn write_entry(&mut self, group: &str, key: &str, value: ConfigValue) {
        let entries = self.groups.entry(group.to_string()).or_default();
        if entries.get(key) != Some(&value) {
            entries.insert(key.to_string(), value);
            self.dirty = true;
        }
    }

    fn delete_group(&mut self, group: &str) {
        if self.groups.remove(group).is_some() {
            self.dirty = true;
        }
    }

    fn groups(&self) -> Vec<String> {
        self.groups.keys().cloned().collect()
    }

    fn sync(&mut self) {
        self.dirty = false;
        self.syncs += 1;
    }
}
