//! Maps state-contract field names to their reducer strategy.

use rustc_hash::FxHashMap;
use serde_json::Value;

use super::{strategies, ReducerError};
use crate::ir::ReducerKind;

/// Built once per compiled graph from [`crate::ir::StateContract::reducers`].
/// Fields absent from that map default to [`ReducerKind::Replace`].
#[derive(Clone, Debug, Default)]
pub struct ReducerRegistry {
    by_field: FxHashMap<String, ReducerKind>,
}

impl ReducerRegistry {
    #[must_use]
    pub fn from_contract(reducers: &std::collections::BTreeMap<String, ReducerKind>) -> Self {
        Self {
            by_field: reducers.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }

    #[must_use]
    pub fn kind_for(&self, field: &str) -> ReducerKind {
        self.by_field
            .get(field)
            .cloned()
            .unwrap_or(ReducerKind::Replace)
    }

    /// Apply the reducer bound to `field`, returning the merged value.
    pub fn apply(&self, field: &str, current: Value, incoming: Value) -> Result<Value, ReducerError> {
        match self.kind_for(field) {
            ReducerKind::Replace => strategies::replace(field, current, incoming),
            ReducerKind::AddMessages => strategies::add_messages(field, current, incoming),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn unregistered_field_defaults_to_replace() {
        let registry = ReducerRegistry::default();
        assert_eq!(registry.kind_for("anything"), ReducerKind::Replace);
    }

    #[test]
    fn contract_binding_is_honored() {
        let mut reducers = BTreeMap::new();
        reducers.insert("log".to_string(), ReducerKind::AddMessages);
        let registry = ReducerRegistry::from_contract(&reducers);
        assert_eq!(registry.kind_for("log"), ReducerKind::AddMessages);
        assert_eq!(registry.kind_for("other"), ReducerKind::Replace);
    }
}
