//! Static menu catalog.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::order::OrderError;

/// How one menu item is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuEntry {
    /// Packable immediately, without stock or kitchen involvement.
    pub instant_ready: bool,
    /// Time the kitchen needs for one batch of the item.
    pub preparation_duration: Duration,
}

impl MenuEntry {
    /// An item handed out straight away.
    pub fn instant() -> Self {
        Self {
            instant_ready: true,
            preparation_duration: Duration::ZERO,
        }
    }

    /// An item the kitchen prepares in `preparation_duration`.
    pub fn prepared(preparation_duration: Duration) -> Self {
        Self {
            instant_ready: false,
            preparation_duration,
        }
    }
}

/// Read-only mapping from item name to its [`MenuEntry`].
#[derive(Debug, Clone, Default)]
pub struct MenuCatalog {
    entries: BTreeMap<String, MenuEntry>,
}

impl MenuCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// The menu served by default.
    pub fn standard() -> Self {
        Self::new()
            .with_item("hamburger", MenuEntry::prepared(Duration::from_secs(4)))
            .with_item("cheeseburger", MenuEntry::prepared(Duration::from_secs(5)))
            .with_item("spicy-stripes", MenuEntry::prepared(Duration::from_secs(6)))
            .with_item("nuggets", MenuEntry::prepared(Duration::from_secs(4)))
            .with_item("fries", MenuEntry::prepared(Duration::from_secs(3)))
            .with_item("soda", MenuEntry::instant())
            .with_item("orange-juice", MenuEntry::instant())
            .with_item("water", MenuEntry::instant())
    }

    /// Adds or replaces an entry.
    pub fn with_item(mut self, name: impl Into<String>, entry: MenuEntry) -> Self {
        self.entries.insert(name.into(), entry);
        self
    }

    pub fn get(&self, name: &str) -> Option<&MenuEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Looks an item up, failing for names that are not on the menu.
    pub fn entry(&self, name: &str) -> Result<&MenuEntry, OrderError> {
        self.get(name).ok_or_else(|| OrderError::UnknownItem {
            item: name.to_string(),
        })
    }

    pub fn is_instant_ready(&self, name: &str) -> Result<bool, OrderError> {
        Ok(self.entry(name)?.instant_ready)
    }

    pub fn preparation_duration(&self, name: &str) -> Result<Duration, OrderError> {
        Ok(self.entry(name)?.preparation_duration)
    }

    /// Names of items that are kept in stock, i.e. the ledger's known keys.
    pub fn stocked_items(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.instant_ready)
            .map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
