use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::workflow::{LoopType, ParallelType};

/// Block type vocabulary
///
/// The well-known types get their own variant because the engine treats them
/// specially (containers, entry points). Everything else round-trips through
/// `Other` unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlockType {
    Starter,
    Trigger,
    Agent,
    Function,
    Api,
    Condition,
    Router,
    Evaluator,
    Response,
    Loop,
    Parallel,
    Other(String),
}

impl BlockType {
    /// Wire name of the type
    pub fn as_str(&self) -> &str {
        match self {
            BlockType::Starter => "starter",
            BlockType::Trigger => "trigger",
            BlockType::Agent => "agent",
            BlockType::Function => "function",
            BlockType::Api => "api",
            BlockType::Condition => "condition",
            BlockType::Router => "router",
            BlockType::Evaluator => "evaluator",
            BlockType::Response => "response",
            BlockType::Loop => "loop",
            BlockType::Parallel => "parallel",
            BlockType::Other(s) => s,
        }
    }

    /// Loop and parallel blocks own child blocks
    pub fn is_container(&self) -> bool {
        matches!(self, BlockType::Loop | BlockType::Parallel)
    }
}

impl From<String> for BlockType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "starter" => BlockType::Starter,
            "trigger" => BlockType::Trigger,
            "agent" => BlockType::Agent,
            "function" => BlockType::Function,
            "api" => BlockType::Api,
            "condition" => BlockType::Condition,
            "router" => BlockType::Router,
            "evaluator" => BlockType::Evaluator,
            "response" => BlockType::Response,
            "loop" => BlockType::Loop,
            "parallel" => BlockType::Parallel,
            _ => BlockType::Other(s),
        }
    }
}

impl From<&str> for BlockType {
    fn from(s: &str) -> Self {
        BlockType::from(s.to_string())
    }
}

impl From<BlockType> for String {
    fn from(t: BlockType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canvas coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Diff marker written onto blocks and subblocks of a candidate state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffStatus {
    New,
    Edited,
}

/// Changed/unchanged field ids of one edited block
///
/// Used both inside `DiffAnalysis` and as the `field_diffs` marker.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldDiff {
    pub changed_fields: Vec<String>,
    #[serde(default)]
    pub unchanged_fields: Vec<String>,
}

/// One field of a block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubBlockState {
    pub id: String,
    #[serde(rename = "type")]
    pub sub_block_type: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "is_diff")]
    pub is_diff: Option<DiffStatus>,
}

impl SubBlockState {
    pub fn new(id: impl Into<String>, sub_block_type: impl Into<String>, value: Value) -> Self {
        Self {
            id: id.into(),
            sub_block_type: sub_block_type.into(),
            value,
            is_diff: None,
        }
    }
}

/// Container membership and container configuration
///
/// Loop/parallel blocks keep their iteration settings here; children keep
/// `parent_id`. Unknown keys survive a round trip through `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loop_type: Option<LoopType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_type: Option<ParallelType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub while_condition: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn default_true() -> bool {
    true
}

/// One node of a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockState {
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub name: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub sub_blocks: BTreeMap<String, SubBlockState>,
    #[serde(default)]
    pub outputs: BTreeMap<String, Value>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub advanced_mode: bool,
    #[serde(default)]
    pub trigger_mode: bool,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<BlockData>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "is_diff")]
    pub is_diff: Option<DiffStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "field_diffs")]
    pub field_diffs: Option<FieldDiff>,
}

impl BlockState {
    /// Create an enabled block at the origin with no fields
    pub fn new(id: impl Into<String>, block_type: impl Into<BlockType>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            block_type: block_type.into(),
            name: name.into(),
            position: Position::default(),
            sub_blocks: BTreeMap::new(),
            outputs: BTreeMap::new(),
            enabled: true,
            advanced_mode: false,
            trigger_mode: false,
            height: 0.0,
            locked: false,
            data: None,
            is_diff: None,
            field_diffs: None,
        }
    }

    /// Builder: add or replace a field
    pub fn with_sub_block(
        mut self,
        id: impl Into<String>,
        sub_block_type: impl Into<String>,
        value: Value,
    ) -> Self {
        let sub = SubBlockState::new(id, sub_block_type, value);
        self.sub_blocks.insert(sub.id.clone(), sub);
        self
    }

    /// Builder: place the block inside a loop/parallel container
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        let data = self.data.get_or_insert_with(BlockData::default);
        data.parent_id = Some(parent_id.into());
        data.extent = Some("parent".to_string());
        self
    }

    /// Builder: set the canvas position
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Position::new(x, y);
        self
    }

    /// Parent container id, if the block lives inside one
    pub fn parent_id(&self) -> Option<&str> {
        self.data.as_ref().and_then(|d| d.parent_id.as_deref())
    }

    /// Set or clear the parent container
    pub fn set_parent_id(&mut self, parent_id: Option<String>) {
        match parent_id {
            Some(parent) => {
                let data = self.data.get_or_insert_with(BlockData::default);
                data.parent_id = Some(parent);
                data.extent = Some("parent".to_string());
            }
            None => {
                if let Some(data) = self.data.as_mut() {
                    data.parent_id = None;
                    data.extent = None;
                }
            }
        }
    }

    pub fn is_container(&self) -> bool {
        self.block_type.is_container()
    }

    /// Value of a field, if present
    pub fn sub_block_value(&self, field_id: &str) -> Option<&Value> {
        self.sub_blocks.get(field_id).map(|s| &s.value)
    }

    /// True when any diff marker is set on the block or one of its fields
    pub fn has_markers(&self) -> bool {
        self.is_diff.is_some()
            || self.field_diffs.is_some()
            || self.sub_blocks.values().any(|s| s.is_diff.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_block_type_round_trip_known_and_other() {
        let known: BlockType = serde_json::from_value(json!("loop")).unwrap();
        assert_eq!(known, BlockType::Loop);
        assert!(known.is_container());

        let other: BlockType = serde_json::from_value(json!("slack")).unwrap();
        assert_eq!(other, BlockType::Other("slack".to_string()));
        assert_eq!(serde_json::to_value(&other).unwrap(), json!("slack"));
    }

    #[test]
    fn test_block_wire_format_is_camel_case_with_snake_markers() {
        let mut block = BlockState::new("b1", "agent", "Agent 1")
            .with_sub_block("model", "dropdown", json!("gpt-4o"))
            .with_parent("loop-1");
        block.is_diff = Some(DiffStatus::Edited);

        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["type"], json!("agent"));
        assert_eq!(value["subBlocks"]["model"]["value"], json!("gpt-4o"));
        assert_eq!(value["data"]["parentId"], json!("loop-1"));
        assert_eq!(value["is_diff"], json!("edited"));
        assert!(value.get("field_diffs").is_none());
    }

    #[test]
    fn test_block_defaults_on_minimal_json() {
        let block: BlockState =
            serde_json::from_value(json!({"id": "b1", "type": "function", "name": "Fn"})).unwrap();

        assert!(block.enabled);
        assert!(!block.locked);
        assert!(block.sub_blocks.is_empty());
        assert!(block.parent_id().is_none());
        assert!(!block.has_markers());
    }

    #[test]
    fn test_block_data_keeps_unknown_keys() {
        let block: BlockState = serde_json::from_value(json!({
            "id": "l1", "type": "loop", "name": "Loop",
            "data": {"count": 3, "width": 500}
        }))
        .unwrap();

        let data = block.data.as_ref().unwrap();
        assert_eq!(data.count, Some(3));
        assert_eq!(data.extra.get("width"), Some(&json!(500)));
        assert_eq!(serde_json::to_value(&block).unwrap()["data"]["width"], json!(500));
    }

    #[test]
    fn test_clear_parent() {
        let mut block = BlockState::new("b1", "agent", "A").with_parent("p1");
        block.set_parent_id(None);
        assert!(block.parent_id().is_none());
    }
}
