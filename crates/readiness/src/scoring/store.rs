use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{ComponentId, EvaluationRecord};

/// Current evaluation per component. Overwrites replace the record in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationStore {
    records: BTreeMap<ComponentId, EvaluationRecord>,
}

impl EvaluationStore {
    pub fn get(&self, component_id: &ComponentId) -> Option<&EvaluationRecord> {
        self.records.get(component_id)
    }

    pub fn score_of(&self, component_id: &ComponentId) -> Option<f64> {
        self.records.get(component_id).map(|record| record.score)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EvaluationRecord> {
        self.records.values()
    }

    /// Stores the record and hands back the one it replaced.
    pub(crate) fn put(&mut self, record: EvaluationRecord) -> Option<EvaluationRecord> {
        self.records.insert(record.component_id.clone(), record)
    }

    pub(crate) fn remove(&mut self, component_id: &ComponentId) -> Option<EvaluationRecord> {
        self.records.remove(component_id)
    }
}
