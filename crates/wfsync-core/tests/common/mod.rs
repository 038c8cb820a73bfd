use serde_json::json;
use wfsync_core::model::{BlockState, Edge, WorkflowState};
use wfsync_core::ops::regenerate_containers;

/// Starter block with no fields
#[allow(dead_code)]
pub fn starter(id: &str) -> BlockState {
    BlockState::new(id, "starter", format!("Start {}", id))
}

/// Agent block with a prompt and a model field
#[allow(dead_code)]
pub fn agent(id: &str, prompt: &str) -> BlockState {
    BlockState::new(id, "agent", format!("Agent {}", id))
        .with_sub_block("prompt", "long-input", json!(prompt))
        .with_sub_block("model", "dropdown", json!("gpt-4o"))
}

/// `A -> B` with A a starter and B an agent
#[allow(dead_code)]
pub fn two_block_workflow() -> WorkflowState {
    WorkflowState::new()
        .with_block(starter("A"))
        .with_block(agent("B", "Summarize the input"))
        .with_edge(Edge::new("e-ab", "A", "B"))
}

/// Starter feeding a loop that contains two agents
#[allow(dead_code)]
pub fn loop_workflow() -> WorkflowState {
    let mut state = WorkflowState::new()
        .with_block(starter("S"))
        .with_block(BlockState::new("L", "loop", "Loop"))
        .with_block(agent("x", "first").with_parent("L"))
        .with_block(agent("y", "second").with_parent("L"))
        .with_edge(Edge::new("e-sl", "S", "L"))
        .with_edge(Edge::new("e-xy", "x", "y"));
    regenerate_containers(&mut state);
    state
}
