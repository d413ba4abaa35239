use crate::errors::{ExplorationError, ExplorationResult};
use std::collections::BTreeMap;

/// FRU name under which main board buses are registered
pub const ROOT_FRU: &str = "";

/// Maps a bus name as declared inside a FRU to the bus the kernel assigned.
///
/// Keys are `(fru_name, fru_scoped_bus_name)`. A table is built from scratch
/// by each exploration pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamingTable {
    entries: BTreeMap<(String, String), String>,
}

impl NamingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, fru_name: &str, bus_name: &str, kernel_bus_name: &str) {
        self.entries.insert(
            (fru_name.to_string(), bus_name.to_string()),
            kernel_bus_name.to_string(),
        );
    }

    pub fn resolve(&self, fru_name: &str, bus_name: &str) -> ExplorationResult<&str> {
        self.get(fru_name, bus_name)
            .ok_or_else(|| ExplorationError::UnresolvedBus {
                fru: fru_name.to_string(),
                bus: bus_name.to_string(),
            })
    }

    pub fn get(&self, fru_name: &str, bus_name: &str) -> Option<&str> {
        // BTreeMap lookups need an owned tuple key
        self.entries
            .get(&(fru_name.to_string(), bus_name.to_string()))
            .map(String::as_str)
    }

    pub fn contains_fru(&self, fru_name: &str) -> bool {
        self.entries.keys().any(|(fru, _)| fru == fru_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Nested `{fru: {bus: kernel_bus}}` JSON, for debug logging
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut dump: BTreeMap<&str, BTreeMap<&str, &str>> = BTreeMap::new();
        for ((fru, bus), kernel) in &self.entries {
            dump.entry(fru.as_str())
                .or_default()
                .insert(bus.as_str(), kernel.as_str());
        }
        serde_json::to_string_pretty(&dump)
    }
}
