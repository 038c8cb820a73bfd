#![allow(dead_code, clippy::unwrap_used)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use wfsync_core::errors::{ExError, ExErrorKind};
use wfsync_core::model::{BlockState, Edge, WorkflowState};
use wfsync_core::Workspace;
use wfsync_engine::correlation::MessageCorrelation;
use wfsync_engine::gateway::{CollaborationBroadcast, PersistenceGateway, ReplaceWorkflowState};
use wfsync_engine::{DiffEvent, DiffStore, EngineConfig, UndoRecorder};

pub const WORKFLOW_ID: &str = "wf-main";

pub fn starter(id: &str) -> BlockState {
    BlockState::new(id, "starter", format!("Start {}", id))
}

pub fn agent(id: &str, prompt: &str) -> BlockState {
    BlockState::new(id, "agent", format!("Agent {}", id))
        .with_sub_block("prompt", "long-input", json!(prompt))
        .with_sub_block("model", "dropdown", json!("gpt-4o"))
}

/// `A` alone
pub fn single_block_workflow() -> WorkflowState {
    WorkflowState::new().with_block(starter("A"))
}

/// `A -> B`
pub fn two_block_workflow() -> WorkflowState {
    single_block_workflow()
        .with_block(agent("B", "Summarize the input"))
        .with_edge(Edge::new("e-ab", "A", "B"))
}

/// Records every broadcast replacement
#[derive(Default)]
pub struct RecordingBroadcast {
    pub sent: Mutex<Vec<ReplaceWorkflowState>>,
}

#[async_trait]
impl CollaborationBroadcast for RecordingBroadcast {
    async fn enqueue_replace_workflow_state(&self, op: ReplaceWorkflowState) -> Result<(), ExError> {
        self.sent.lock().unwrap().push(op);
        Ok(())
    }
}

/// Records every persisted state; fails on demand
#[derive(Default)]
pub struct RecordingPersistence {
    pub saved: Mutex<Vec<(String, WorkflowState)>>,
    pub fail: AtomicBool,
}

impl RecordingPersistence {
    pub fn failing() -> Self {
        let persistence = Self::default();
        persistence.fail.store(true, Ordering::SeqCst);
        persistence
    }
}

#[async_trait]
impl PersistenceGateway for RecordingPersistence {
    async fn put_workflow_state(&self, workflow_id: &str, state: &WorkflowState) -> Result<(), ExError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ExError::new(ExErrorKind::Persistence)
                .with_workflow_id(workflow_id)
                .with_message("persistence returned 503 Service Unavailable"));
        }
        self.saved
            .lock()
            .unwrap()
            .push((workflow_id.to_string(), state.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingUndo {
    pub events: Mutex<Vec<DiffEvent>>,
}

impl UndoRecorder for RecordingUndo {
    fn record(&self, event: DiffEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Always answers with the same message id
pub struct FixedCorrelation(pub &'static str);

#[async_trait]
impl MessageCorrelation for FixedCorrelation {
    async fn latest_user_message_id(&self, _workflow_id: &str) -> Result<Option<String>, ExError> {
        Ok(Some(self.0.to_string()))
    }
}

/// Store wired to recording doubles, with `initial` loaded as the active workflow
pub struct Harness {
    pub store: DiffStore,
    pub broadcast: Arc<RecordingBroadcast>,
    pub persistence: Arc<RecordingPersistence>,
    pub undo: Arc<RecordingUndo>,
}

impl Harness {
    pub fn new(initial: WorkflowState) -> Self {
        Self::with_persistence(initial, RecordingPersistence::default())
    }

    pub fn with_persistence(initial: WorkflowState, persistence: RecordingPersistence) -> Self {
        let mut workspace = Workspace::new();
        workspace.load_workflow(WORKFLOW_ID, initial).unwrap();

        let broadcast = Arc::new(RecordingBroadcast::default());
        let persistence = Arc::new(persistence);
        let undo = Arc::new(RecordingUndo::default());

        let store = DiffStore::new(Arc::new(Mutex::new(workspace)), EngineConfig::default())
            .with_broadcast(broadcast.clone())
            .with_persistence(persistence.clone())
            .with_recorder(undo.clone());

        Self {
            store,
            broadcast,
            persistence,
            undo,
        }
    }

    /// Live topology merged with live values
    pub fn live(&self) -> WorkflowState {
        self.store
            .workspace()
            .lock()
            .unwrap()
            .merged_state()
            .unwrap()
    }

    pub fn last_saved(&self) -> Option<DateTime<Utc>> {
        self.store
            .workspace()
            .lock()
            .unwrap()
            .workflow_store()
            .last_saved()
    }
}
