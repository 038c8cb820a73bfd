use serde_json::Value;
use std::collections::BTreeMap;

use crate::model::{BlockState, SubBlockState, WorkflowState, WorkflowValues};

/// Field type assigned to values that have no matching field structure
const UNSTRUCTURED_FIELD_TYPE: &str = "short-input";

/// Live field values, keyed by workflow id then block id then field id
#[derive(Debug, Clone, Default)]
pub struct SubBlockStore {
    values: BTreeMap<String, WorkflowValues>,
}

impl SubBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_value(&self, workflow_id: &str, block_id: &str, field_id: &str) -> Option<&Value> {
        self.values
            .get(workflow_id)
            .and_then(|blocks| blocks.get(block_id))
            .and_then(|fields| fields.get(field_id))
    }

    pub fn set_value(&mut self, workflow_id: &str, block_id: &str, field_id: &str, value: Value) {
        self.values
            .entry(workflow_id.to_string())
            .or_default()
            .entry(block_id.to_string())
            .or_default()
            .insert(field_id.to_string(), value);
    }

    /// Replace every value of one workflow
    pub fn set_workflow_values(&mut self, workflow_id: &str, values: WorkflowValues) {
        self.values.insert(workflow_id.to_string(), values);
    }

    pub fn workflow_values(&self, workflow_id: &str) -> Option<&WorkflowValues> {
        self.values.get(workflow_id)
    }

    pub fn clear_workflow(&mut self, workflow_id: &str) {
        self.values.remove(workflow_id);
    }

    /// Overlay stored values onto block structures
    ///
    /// Values without a matching field are added as untyped fields so no
    /// user edit is lost when the topology lags behind.
    pub fn merge_subblock_state(
        &self,
        blocks: &BTreeMap<String, BlockState>,
        workflow_id: &str,
    ) -> BTreeMap<String, BlockState> {
        let stored = self.values.get(workflow_id);

        blocks
            .iter()
            .map(|(id, block)| {
                let mut merged = block.clone();
                if let Some(fields) = stored.and_then(|s| s.get(id)) {
                    for (field_id, value) in fields {
                        merged
                            .sub_blocks
                            .entry(field_id.clone())
                            .and_modify(|sub| sub.value = value.clone())
                            .or_insert_with(|| {
                                SubBlockState::new(
                                    field_id.clone(),
                                    UNSTRUCTURED_FIELD_TYPE,
                                    value.clone(),
                                )
                            });
                    }
                }
                (id.clone(), merged)
            })
            .collect()
    }
}

/// Extract the field values carried by a state's blocks
pub fn extract_values(state: &WorkflowState) -> WorkflowValues {
    state
        .blocks
        .iter()
        .map(|(block_id, block)| {
            let fields = block
                .sub_blocks
                .iter()
                .map(|(field_id, sub)| (field_id.clone(), sub.value.clone()))
                .collect();
            (block_id.clone(), fields)
        })
        .collect()
}
