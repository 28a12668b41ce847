//! The strategy → accounts routing table (spec.md §3, §4.7).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::id::{AccountName, StrategyName, DEFAULT_STRATEGY};

/// One routing table entry: a named strategy mapped to an ordered subset
/// of the fleet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RoutingEntry {
    pub strategy_name: StrategyName,
    pub account_set: Vec<AccountName>,
}

/// The strategy → accounts routing table. Hot-reloadable per spec.md §6;
/// must always contain a `DEFAULT` entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct RoutingTable {
    entries: IndexMap<StrategyName, Vec<AccountName>>,
}

impl RoutingTable {
    pub fn new(entries: IndexMap<StrategyName, Vec<AccountName>>) -> Self {
        Self { entries }
    }

    /// Validates the presence of the mandatory `DEFAULT` entry. Called at
    /// startup and on every hot-reload.
    pub fn validate(&self) -> Result<(), String> {
        if !self.entries.contains_key(&StrategyName::from(DEFAULT_STRATEGY)) {
            return Err(format!("routing table is missing the mandatory '{DEFAULT_STRATEGY}' entry"));
        }
        Ok(())
    }

    /// Resolves a strategy name to its account set, falling back to
    /// `DEFAULT` when the strategy is unknown (spec.md §4.7).
    pub fn resolve(&self, strategy: &StrategyName) -> &[AccountName] {
        self.entries
            .get(strategy)
            .or_else(|| self.entries.get(&StrategyName::from(DEFAULT_STRATEGY)))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn insert(&mut self, strategy: StrategyName, accounts: Vec<AccountName>) {
        self.entries.insert(strategy, accounts);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StrategyName, &Vec<AccountName>)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RoutingTable {
        let mut entries = IndexMap::new();
        entries.insert(StrategyName::from(DEFAULT_STRATEGY), vec![AccountName::from("acc0"), AccountName::from("acc1")]);
        entries.insert(StrategyName::from("scalper"), vec![AccountName::from("acc2")]);
        RoutingTable::new(entries)
    }

    #[test]
    fn unknown_strategy_falls_back_to_default() {
        let table = table();
        let resolved = table.resolve(&StrategyName::from("UNKNOWN"));
        assert_eq!(resolved, &[AccountName::from("acc0"), AccountName::from("acc1")]);
    }

    #[test]
    fn known_strategy_resolves_directly() {
        let table = table();
        let resolved = table.resolve(&StrategyName::from("scalper"));
        assert_eq!(resolved, &[AccountName::from("acc2")]);
    }

    #[test]
    fn validate_rejects_missing_default() {
        let table = RoutingTable::new(IndexMap::new());
        assert!(table.validate().is_err());
    }
}
