//! Name-scoped symbol tables and the per-kind identifier allocators.

use std::collections::HashMap;
use std::fmt;
use std::ops::RangeInclusive;

use fuf_contract::ids;
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Sensor,
    State,
    Gait,
    Event,
}

impl SymbolKind {
    /// Identifier range reserved for this kind.
    pub fn range(self) -> RangeInclusive<u8> {
        match self {
            SymbolKind::Sensor => ids::SENSOR_FIRST..=ids::SENSOR_LAST,
            SymbolKind::State => ids::STATE_FIRST..=ids::STATE_LAST,
            SymbolKind::Gait => ids::GAIT_FIRST..=ids::GAIT_LAST,
            SymbolKind::Event => ids::EVENT_FIRST..=ids::EVENT_LAST,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Sensor => "sensor",
            SymbolKind::State => "state",
            SymbolKind::Gait => "gait",
            SymbolKind::Event => "event",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hands out sequential ids from one reserved range. Never rewinds.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    kind: SymbolKind,
    next: u16,
}

impl IdAllocator {
    pub fn new(kind: SymbolKind) -> Self {
        Self {
            kind,
            next: *kind.range().start() as u16,
        }
    }

    pub fn kind(&self) -> SymbolKind {
        self.kind
    }

    /// Next id, or `None` once the range is exhausted.
    pub fn allocate(&mut self) -> Option<u8> {
        if self.next > *self.kind.range().end() as u16 {
            return None;
        }
        let id = self.next as u8;
        self.next += 1;
        Some(id)
    }

    pub fn capacity(&self) -> usize {
        self.kind.range().len()
    }

    /// Human-readable range, e.g. `0x10..=0x1F`.
    pub fn describe(&self) -> String {
        let range = self.kind.range();
        format!("{:#04x}..={:#04x}", range.start(), range.end())
    }
}

/// Entry stored in a [`SymbolTable`].
pub trait Symbol {
    fn name(&self) -> &str;
    fn id(&self) -> u8;
}

/// Insertion-ordered table with unique names.
#[derive(Debug, Clone)]
pub struct SymbolTable<T> {
    entries: Vec<T>,
    by_name: HashMap<String, usize>,
}

impl<T> Default for SymbolTable<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            by_name: HashMap::new(),
        }
    }
}

impl<T: Symbol> SymbolTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `entry`, or returns the entry already holding its name.
    pub fn insert(&mut self, entry: T) -> Result<(), &T> {
        if let Some(&index) = self.by_name.get(entry.name()) {
            return Err(&self.entries[index]);
        }
        self.by_name
            .insert(entry.name().to_string(), self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.by_name.get(name).map(|&index| &self.entries[index])
    }

    pub fn id_of(&self, name: &str) -> Option<u8> {
        self.get(name).map(Symbol::id)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.entries.iter()
    }
}

impl<T: Serialize> Serialize for SymbolTable<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.iter())
    }
}
