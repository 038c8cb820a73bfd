//! Diff Store
//!
//! Orchestrates one review session per workspace:
//!
//! - `set_proposed_changes` captures (or reuses) the baseline, computes the
//!   diff, validates the candidate and applies it optimistically
//! - `accept_changes` commits the candidate, `reject_changes` restores the
//!   baseline
//! - every applied state is broadcast and persisted in the background,
//!   always without markers
//!
//! ## Logging
//!
//! Public operations own their boundary events:
//! - `log_op_start!` at entry
//! - `log_op_end!` on success
//! - `log_op_error!` on failure

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use chrono::Utc;
use tokio::runtime::Handle;

use crate::config::EngineConfig;
use crate::correlation::{MessageCorrelation, NoCorrelation};
use crate::events::{DiffEvent, DiffEventKind, NoopRecorder, UndoRecorder};
use crate::gateway::{
    CollaborationBroadcast, NoopBroadcast, NoopPersistence, PersistenceGateway, ReplaceWorkflowState,
};
use crate::session::{DiffPhase, DiffSession};
use crate::tasks::BackgroundTasks;
use wfsync_core::diff::{apply_markers, create_diff, without_markers, DiffAnalysis, DiffMetadata};
use wfsync_core::errors::{ExError, ExErrorKind};
use wfsync_core::rules::validate_and_sanitize;
use wfsync_core::snapshot::round_trip_check;
use wfsync_core::{log_op_end, log_op_error, log_op_start};
use wfsync_core::{ReplaceOptions, WorkflowState, Workspace};
use wfsync_core_types::RequestContext;

const OP_SET_PROPOSED: &str = "set_proposed_changes";
const OP_CLEAR: &str = "clear_diff";
const OP_ACCEPT: &str = "accept_changes";
const OP_REJECT: &str = "reject_changes";
const OP_REAPPLY: &str = "reapply_diff_markers";
const OP_SWITCH: &str = "switch_workflow";
const OP_BACKGROUND_SYNC: &str = "background_sync";

/// Result of a successful `set_proposed_changes`
#[derive(Debug, Clone, PartialEq)]
pub enum ProposalOutcome {
    /// Candidate applied, session active
    Applied {
        analysis: DiffAnalysis,
        trigger_message_id: Option<String>,
    },
    /// Proposal matched the baseline; diff mode was not entered
    NoChanges,
}

#[derive(Debug, Clone)]
struct BackgroundWarning {
    workflow_id: String,
    message: String,
}

/// Review-session orchestrator over a shared [`Workspace`]
pub struct DiffStore {
    workspace: Arc<Mutex<Workspace>>,
    session: DiffSession,
    broadcast: Arc<dyn CollaborationBroadcast>,
    persistence: Arc<dyn PersistenceGateway>,
    recorder: Arc<dyn UndoRecorder>,
    correlation: Arc<dyn MessageCorrelation>,
    tasks: BackgroundTasks,
    config: EngineConfig,
    background_warning: Arc<Mutex<Option<BackgroundWarning>>>,
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

fn lock_workspace<'a>(workspace: &'a Mutex<Workspace>, op: &str) -> Result<MutexGuard<'a, Workspace>, ExError> {
    workspace.lock().map_err(|_| {
        ExError::new(ExErrorKind::Concurrency)
            .with_op(op)
            .with_message("workspace lock poisoned")
    })
}

fn active_workflow(ws: &Workspace, op: &str) -> Result<String, ExError> {
    ws.active_workflow_id()
        .map(str::to_string)
        .ok_or_else(|| {
            ExError::new(ExErrorKind::NoActiveWorkflow)
                .with_op(op)
                .with_message("no active workflow")
        })
}

fn merged(ws: &Workspace, op: &str) -> Result<WorkflowState, ExError> {
    ws.merged_state().ok_or_else(|| {
        ExError::new(ExErrorKind::NoActiveWorkflow)
            .with_op(op)
            .with_message("no active workflow")
    })
}

impl DiffStore {
    /// Store with no-op collaborators; attach real ones with the `with_*` builders
    pub fn new(workspace: Arc<Mutex<Workspace>>, config: EngineConfig) -> Self {
        Self {
            workspace,
            session: DiffSession::default(),
            broadcast: Arc::new(NoopBroadcast),
            persistence: Arc::new(NoopPersistence),
            recorder: Arc::new(NoopRecorder),
            correlation: Arc::new(NoCorrelation),
            tasks: BackgroundTasks::new(),
            config,
            background_warning: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_broadcast(mut self, broadcast: Arc<dyn CollaborationBroadcast>) -> Self {
        self.broadcast = broadcast;
        self
    }

    pub fn with_persistence(mut self, persistence: Arc<dyn PersistenceGateway>) -> Self {
        self.persistence = persistence;
        self
    }

    pub fn with_recorder(mut self, recorder: Arc<dyn UndoRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn with_correlation(mut self, correlation: Arc<dyn MessageCorrelation>) -> Self {
        self.correlation = correlation;
        self
    }

    pub fn workspace(&self) -> Arc<Mutex<Workspace>> {
        self.workspace.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn phase(&self) -> DiffPhase {
        self.session.phase()
    }

    pub fn has_active_diff(&self) -> bool {
        self.session.has_active_diff
    }

    pub fn is_showing_diff(&self) -> bool {
        self.session.is_showing_diff
    }

    pub fn is_diff_ready(&self) -> bool {
        self.session.is_diff_ready
    }

    pub fn diff_analysis(&self) -> Option<&DiffAnalysis> {
        self.session.diff_analysis.as_ref()
    }

    pub fn diff_metadata(&self) -> Option<&DiffMetadata> {
        self.session.diff_metadata.as_ref()
    }

    pub fn baseline(&self) -> Option<&WorkflowState> {
        self.session.baseline.as_ref()
    }

    pub fn trigger_message_id(&self) -> Option<&str> {
        self.session.trigger_message_id.as_deref()
    }

    /// Last synchronous failure, else the latest background warning for the
    /// active workflow
    pub fn diff_error(&self) -> Option<String> {
        if let Some(err) = &self.session.diff_error {
            return Some(err.clone());
        }
        let active = self
            .workspace
            .lock()
            .ok()
            .and_then(|ws| ws.active_workflow_id().map(str::to_string))?;
        let warning = self.background_warning.lock().ok()?;
        warning
            .as_ref()
            .filter(|w| w.workflow_id == active)
            .map(|w| w.message.clone())
    }

    // ------------------------------------------------------------------
    // Proposal
    // ------------------------------------------------------------------

    /// Diff `proposed` against the session baseline and apply it as the live state
    ///
    /// When `analysis` is supplied it is used instead of computing one.
    ///
    /// # Errors
    /// * `NoActiveWorkflow` - nothing is open
    /// * `DiffComputationFailed` - the proposal or supplied analysis is malformed
    /// * `ValidationFailed` - the candidate does not survive a serialization round
    ///   trip, breaks a structural invariant, or has empty or duplicate names or
    ///   mistyped field values
    /// * `Concurrency` - the workspace lock is poisoned
    ///
    /// Stores and session flags are unchanged on error.
    pub async fn set_proposed_changes(
        &mut self,
        proposed: WorkflowState,
        analysis: Option<DiffAnalysis>,
    ) -> Result<ProposalOutcome, ExError> {
        let ctx = RequestContext::new();
        log_op_start!(OP_SET_PROPOSED, request_id = %ctx.request_id);
        let start = Instant::now();

        let outcome = self
            .set_proposed_changes_impl(proposed, analysis, &ctx)
            .await
            .map_err(|e| {
                log_op_error!(
                    OP_SET_PROPOSED,
                    e.clone(),
                    duration_ms = elapsed_ms(start),
                    request_id = %ctx.request_id
                );
                e
            })?;

        match &outcome {
            ProposalOutcome::Applied { analysis, .. } => {
                log_op_end!(
                    OP_SET_PROPOSED,
                    duration_ms = elapsed_ms(start),
                    request_id = %ctx.request_id,
                    new_blocks = analysis.new_blocks.len(),
                    edited_blocks = analysis.edited_blocks.len(),
                    deleted_blocks = analysis.deleted_blocks.len()
                );
            }
            ProposalOutcome::NoChanges => {
                log_op_end!(
                    OP_SET_PROPOSED,
                    duration_ms = elapsed_ms(start),
                    request_id = %ctx.request_id,
                    no_changes = true
                );
            }
        }
        Ok(outcome)
    }

    async fn set_proposed_changes_impl(
        &mut self,
        proposed: WorkflowState,
        analysis: Option<DiffAnalysis>,
        ctx: &RequestContext,
    ) -> Result<ProposalOutcome, ExError> {
        // Baseline capture and apply happen under one lock with no await between
        let (workflow_id, baseline, first_capture, before, after, analysis, metadata, clean) = {
            let mut ws = lock_workspace(&self.workspace, OP_SET_PROPOSED)?;
            let workflow_id = active_workflow(&ws, OP_SET_PROPOSED)?;

            let reused = if self.session.owns_baseline_for(&workflow_id) {
                self.session.baseline.clone()
            } else {
                None
            };
            let first_capture = reused.is_none();
            let baseline = match reused {
                Some(baseline) => baseline,
                None => without_markers(&merged(&ws, OP_SET_PROPOSED)?),
            };

            let diff = match create_diff(&proposed, analysis, Some(&baseline), &self.config.source)
                .into_result()
            {
                Ok(diff) => diff,
                Err(e) => {
                    let e = e.with_workflow_id(&workflow_id);
                    self.session.diff_error = Some(e.to_string());
                    return Err(e);
                }
            };

            if diff.diff_analysis.is_empty() {
                tracing::debug!(workflow_id = %workflow_id, "proposal matches baseline");
                drop(ws);
                // The open candidate was already synced, so revert it everywhere
                if !first_capture {
                    self.reject_changes_impl(ctx)?;
                }
                return Ok(ProposalOutcome::NoChanges);
            }

            let clean = without_markers(&diff.proposed_state);
            if let Err(e) = round_trip_check(&clean) {
                let err = ExError::new(ExErrorKind::ValidationFailed)
                    .with_op(OP_SET_PROPOSED)
                    .with_workflow_id(&workflow_id)
                    .with_request_id(ctx.request_id.clone())
                    .with_message(format!("candidate state failed round-trip validation: {}", e))
                    .with_source(e.into());
                self.session.diff_error = Some(err.to_string());
                return Err(err);
            }

            // Same name and field checks as accept
            let report = validate_and_sanitize(&clean);
            if !report.is_valid() {
                let details: Vec<String> = report.errors.iter().map(ToString::to_string).collect();
                let err = ExError::new(ExErrorKind::ValidationFailed)
                    .with_op(OP_SET_PROPOSED)
                    .with_workflow_id(&workflow_id)
                    .with_request_id(ctx.request_id.clone())
                    .with_message(format!("candidate state has {} invalid field(s)", details.len()))
                    .with_details(details);
                self.session.diff_error = Some(err.to_string());
                return Err(err);
            }

            let before = merged(&ws, OP_SET_PROPOSED)?;
            if let Err(e) = ws.apply_state(diff.proposed_state.clone(), ReplaceOptions::default()) {
                let err = ExError::new(ExErrorKind::ValidationFailed)
                    .with_op(OP_SET_PROPOSED)
                    .with_workflow_id(&workflow_id)
                    .with_message(format!("candidate state rejected by the workflow store: {}", e))
                    .with_source(e.into());
                self.session.diff_error = Some(err.to_string());
                return Err(err);
            }
            let after = merged(&ws, OP_SET_PROPOSED)?;

            (
                workflow_id,
                baseline,
                first_capture,
                before,
                after,
                diff.diff_analysis,
                diff.metadata,
                clean,
            )
        };

        if first_capture {
            self.session.reset();
            self.session.baseline = Some(baseline.clone());
            self.session.baseline_workflow_id = Some(workflow_id.clone());
        }
        self.session.has_active_diff = true;
        self.session.is_showing_diff = true;
        self.session.is_diff_ready = true;
        self.session.diff_analysis = Some(analysis.clone());
        self.session.diff_metadata = Some(metadata);
        self.session.diff_error = None;

        self.spawn_sync(workflow_id.clone(), clean, ctx);

        self.recorder.record(DiffEvent {
            kind: DiffEventKind::ApplyDiff,
            workflow_id: workflow_id.clone(),
            before,
            after,
            diff_analysis: Some(analysis.clone()),
            baseline: Some(baseline),
            trigger_message_id: self.session.trigger_message_id.clone(),
        });

        if first_capture {
            self.session.trigger_message_id = self.resolve_trigger_message(&workflow_id).await;
        }

        Ok(ProposalOutcome::Applied {
            analysis,
            trigger_message_id: self.session.trigger_message_id.clone(),
        })
    }

    async fn resolve_trigger_message(&self, workflow_id: &str) -> Option<String> {
        let lookup = self.correlation.latest_user_message_id(workflow_id);
        let result = if Handle::try_current().is_ok() {
            match tokio::time::timeout(self.config.correlation_timeout(), lookup).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::debug!(workflow_id = %workflow_id, "trigger message lookup timed out");
                    return None;
                }
            }
        } else {
            lookup.await
        };

        match result {
            Ok(id) => id,
            Err(e) => {
                tracing::debug!(workflow_id = %workflow_id, err.code = e.code(), "trigger message lookup failed");
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Session control
    // ------------------------------------------------------------------

    /// End the session, restoring the baseline first if asked
    ///
    /// The baseline is only restored onto the workflow it was captured from;
    /// otherwise the session is dropped without touching the stores.
    pub fn clear_diff(&mut self, restore_baseline: bool) {
        log_op_start!(OP_CLEAR, restore_baseline = restore_baseline);
        let start = Instant::now();

        if restore_baseline {
            self.restore_baseline_for_clear();
        }
        self.session.reset();

        log_op_end!(OP_CLEAR, duration_ms = elapsed_ms(start));
    }

    fn restore_baseline_for_clear(&mut self) {
        let Some(baseline) = self.session.baseline.clone() else {
            return;
        };
        let mut ws = match lock_workspace(&self.workspace, OP_CLEAR) {
            Ok(ws) => ws,
            Err(e) => {
                tracing::warn!(err.code = e.code(), "cannot restore baseline: {}", e);
                return;
            }
        };
        let owns = ws
            .active_workflow_id()
            .map(|id| self.session.owns_baseline_for(id))
            .unwrap_or(false);
        if !owns {
            let err = ExError::new(ExErrorKind::BaselineMismatch)
                .with_op(OP_CLEAR)
                .with_message("baseline belongs to another workflow, clearing without restore");
            tracing::warn!(err.code = err.code(), "{}", err);
            return;
        }
        if let Err(e) = ws.apply_state(baseline, ReplaceOptions::default()) {
            tracing::warn!("baseline restore failed: {}", e);
        }
    }

    /// Flip between candidate and baseline view; returns the resulting visibility
    pub fn toggle_diff_view(&mut self) -> bool {
        if !(self.session.has_active_diff && self.session.is_diff_ready) {
            tracing::warn!(phase = ?self.session.phase(), "toggle_diff_view without a ready diff");
            return self.session.is_showing_diff;
        }
        self.session.is_showing_diff = !self.session.is_showing_diff;
        tracing::debug!(showing = self.session.is_showing_diff, "toggled diff view");
        self.session.is_showing_diff
    }

    /// Commit the live candidate: strip markers, validate, sanitize and save
    ///
    /// # Errors
    /// * `NoActiveDiff` - no session is open
    /// * `NoActiveWorkflow` - nothing is open
    /// * `ValidationFailed` - the candidate fails round-trip or field validation;
    ///   nothing is mutated and the session stays open
    pub fn accept_changes(&mut self) -> Result<(), ExError> {
        let ctx = RequestContext::new();
        log_op_start!(OP_ACCEPT, request_id = %ctx.request_id);
        let start = Instant::now();

        self.accept_changes_impl(&ctx).map_err(|e| {
            log_op_error!(
                OP_ACCEPT,
                e.clone(),
                duration_ms = elapsed_ms(start),
                request_id = %ctx.request_id
            );
            e
        })?;

        log_op_end!(OP_ACCEPT, duration_ms = elapsed_ms(start), request_id = %ctx.request_id);
        Ok(())
    }

    fn accept_changes_impl(&mut self, ctx: &RequestContext) -> Result<(), ExError> {
        if !self.session.has_active_diff {
            return Err(ExError::new(ExErrorKind::NoActiveDiff)
                .with_op(OP_ACCEPT)
                .with_message("no diff to accept"));
        }

        let (workflow_id, current, committed) = {
            let mut ws = lock_workspace(&self.workspace, OP_ACCEPT)?;
            let workflow_id = active_workflow(&ws, OP_ACCEPT)?;
            let current = merged(&ws, OP_ACCEPT)?;
            let clean = without_markers(&current);

            if let Err(e) = round_trip_check(&clean) {
                let err = ExError::new(ExErrorKind::ValidationFailed)
                    .with_op(OP_ACCEPT)
                    .with_workflow_id(&workflow_id)
                    .with_message(format!("accepted state failed round-trip validation: {}", e))
                    .with_source(e.into());
                self.session.diff_error = Some(err.to_string());
                return Err(err);
            }

            let report = validate_and_sanitize(&clean);
            if !report.is_valid() {
                let details: Vec<String> = report.errors.iter().map(ToString::to_string).collect();
                let err = ExError::new(ExErrorKind::ValidationFailed)
                    .with_op(OP_ACCEPT)
                    .with_workflow_id(&workflow_id)
                    .with_message(format!("accepted state has {} invalid field(s)", details.len()))
                    .with_details(details);
                self.session.diff_error = Some(err.to_string());
                return Err(err);
            }
            for warning in &report.warnings {
                tracing::debug!(workflow_id = %workflow_id, "sanitized: {}", warning);
            }

            if let Err(e) = ws.apply_state(report.sanitized.clone(), ReplaceOptions::saved()) {
                let err = ExError::new(ExErrorKind::ValidationFailed)
                    .with_op(OP_ACCEPT)
                    .with_workflow_id(&workflow_id)
                    .with_message(format!("sanitized state rejected by the workflow store: {}", e))
                    .with_source(e.into());
                self.session.diff_error = Some(err.to_string());
                return Err(err);
            }
            (workflow_id, current, report.sanitized)
        };

        let owns_baseline = self.session.owns_baseline_for(&workflow_id);
        let session = std::mem::take(&mut self.session);
        let before = match session.baseline {
            Some(baseline) if owns_baseline => baseline,
            _ => current,
        };

        self.recorder.record(DiffEvent {
            kind: DiffEventKind::AcceptDiff,
            workflow_id: workflow_id.clone(),
            before,
            after: committed.clone(),
            diff_analysis: session.diff_analysis,
            baseline: None,
            trigger_message_id: session.trigger_message_id,
        });

        self.spawn_sync(workflow_id, committed, ctx);
        Ok(())
    }

    /// Roll the live state back to the baseline
    ///
    /// Without a baseline for the active workflow this only clears the session.
    ///
    /// # Errors
    /// * `Concurrency` - the workspace lock is poisoned
    /// * Structural violations if the baseline can no longer be applied;
    ///   the session stays open
    pub fn reject_changes(&mut self) -> Result<(), ExError> {
        let ctx = RequestContext::new();
        log_op_start!(OP_REJECT, request_id = %ctx.request_id);
        let start = Instant::now();

        self.reject_changes_impl(&ctx).map_err(|e| {
            log_op_error!(
                OP_REJECT,
                e.clone(),
                duration_ms = elapsed_ms(start),
                request_id = %ctx.request_id
            );
            e
        })?;

        log_op_end!(OP_REJECT, duration_ms = elapsed_ms(start), request_id = %ctx.request_id);
        Ok(())
    }

    fn reject_changes_impl(&mut self, ctx: &RequestContext) -> Result<(), ExError> {
        let restored = {
            let mut ws = lock_workspace(&self.workspace, OP_REJECT)?;
            let active = ws.active_workflow_id().map(str::to_string);
            match (active, self.session.baseline.clone()) {
                (Some(workflow_id), Some(baseline)) if self.session.owns_baseline_for(&workflow_id) => {
                    let current = merged(&ws, OP_REJECT)?;
                    if let Err(e) = ws.apply_state(baseline.clone(), ReplaceOptions::default()) {
                        let err = ExError::from(e)
                            .with_op(OP_REJECT)
                            .with_workflow_id(&workflow_id);
                        self.session.diff_error = Some(err.to_string());
                        return Err(err);
                    }
                    Some((workflow_id, current, baseline))
                }
                _ => None,
            }
        };

        let Some((workflow_id, current, baseline)) = restored else {
            let err = ExError::new(ExErrorKind::BaselineMismatch)
                .with_op(OP_REJECT)
                .with_message("no baseline for the active workflow, clearing without restore");
            tracing::warn!(err.code = err.code(), "{}", err);
            self.clear_diff(false);
            return Ok(());
        };

        let session = std::mem::take(&mut self.session);
        self.recorder.record(DiffEvent {
            kind: DiffEventKind::RejectDiff,
            workflow_id: workflow_id.clone(),
            before: current,
            after: baseline.clone(),
            diff_analysis: session.diff_analysis,
            baseline: Some(baseline.clone()),
            trigger_message_id: session.trigger_message_id,
        });

        self.spawn_sync(workflow_id, baseline, ctx);
        Ok(())
    }

    /// Re-mark the live state from the session analysis
    ///
    /// Returns whether any marker had to be rewritten; a second call is a
    /// no-op returning `false`.
    ///
    /// # Errors
    /// `Concurrency` if the workspace lock is poisoned, or a structural
    /// violation from the workflow store.
    pub fn reapply_diff_markers(&mut self) -> Result<bool, ExError> {
        let Some(analysis) = self.session.diff_analysis.as_ref() else {
            return Ok(false);
        };
        if !self.session.has_active_diff {
            return Ok(false);
        }

        let mut ws = lock_workspace(&self.workspace, OP_REAPPLY)?;
        let owns = ws
            .active_workflow_id()
            .map(|id| self.session.owns_baseline_for(id))
            .unwrap_or(false);
        if !owns {
            return Ok(false);
        }

        let mut state = merged(&ws, OP_REAPPLY)?;
        if !apply_markers(&mut state, analysis) {
            return Ok(false);
        }
        ws.apply_state(state, ReplaceOptions::default())
            .map_err(|e| ExError::from(e).with_op(OP_REAPPLY))?;
        tracing::debug!("reapplied diff markers");
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Workspace lifecycle
    // ------------------------------------------------------------------

    /// Open `workflow_id`, orphaning background bookkeeping of the previous one
    ///
    /// An open session for the previous workflow is kept; rejecting or
    /// clearing it later will not touch the new workflow.
    ///
    /// # Errors
    /// Structural violations in `state`, or `Concurrency`.
    pub fn switch_workflow(&mut self, workflow_id: &str, state: WorkflowState) -> Result<(), ExError> {
        log_op_start!(OP_SWITCH, workflow_id = workflow_id);
        let start = Instant::now();

        let previous = self.switch_workflow_impl(workflow_id, state).map_err(|e| {
            log_op_error!(
                OP_SWITCH,
                e.clone(),
                duration_ms = elapsed_ms(start),
                workflow_id = workflow_id
            );
            e
        })?;

        if let Some(previous) = previous.filter(|p| p != workflow_id) {
            self.tasks.cancel(&previous);
        }

        log_op_end!(OP_SWITCH, duration_ms = elapsed_ms(start), workflow_id = workflow_id);
        Ok(())
    }

    fn switch_workflow_impl(&mut self, workflow_id: &str, state: WorkflowState) -> Result<Option<String>, ExError> {
        let mut ws = lock_workspace(&self.workspace, OP_SWITCH)?;
        let previous = ws.active_workflow_id().map(str::to_string);
        ws.load_workflow(workflow_id, state)
            .map_err(|e| ExError::from(e).with_op(OP_SWITCH).with_workflow_id(workflow_id))?;
        Ok(previous)
    }

    /// Await every broadcast/persist task spawned so far
    pub async fn wait_for_background(&mut self) {
        self.tasks.wait_all().await;
    }

    // ------------------------------------------------------------------
    // Background sync
    // ------------------------------------------------------------------

    fn spawn_sync(&mut self, workflow_id: String, state: WorkflowState, ctx: &RequestContext) {
        if let Ok(mut warning) = self.background_warning.lock() {
            if warning.as_ref().is_some_and(|w| w.workflow_id == workflow_id) {
                *warning = None;
            }
        }

        let token = self.tasks.token_for(&workflow_id);
        let broadcast = self.broadcast.clone();
        let persistence = self.persistence.clone();
        let workspace = self.workspace.clone();
        let warning_slot = self.background_warning.clone();
        let immediate = self.config.broadcast.immediate;
        let child = ctx.child();

        self.tasks.spawn(async move {
            let op = ReplaceWorkflowState {
                workflow_id: workflow_id.clone(),
                state: state.clone(),
                immediate,
            };
            if let Err(e) = broadcast.enqueue_replace_workflow_state(op).await {
                tracing::warn!(
                    workflow_id = %workflow_id,
                    request_id = %child.request_id,
                    err.code = e.code(),
                    "broadcast failed: {}",
                    e
                );
            }

            let persisted = persistence.put_workflow_state(&workflow_id, &state).await;
            if token.is_cancelled() {
                tracing::debug!(workflow_id = %workflow_id, "workflow switched, dropping sync result");
                return;
            }

            match persisted {
                Ok(()) => {
                    let saved = match workspace.lock() {
                        Ok(mut ws) => ws.mark_saved(&workflow_id, Utc::now()),
                        Err(_) => false,
                    };
                    tracing::debug!(workflow_id = %workflow_id, saved, "background sync complete");
                }
                Err(e) => {
                    let err = ExError::new(ExErrorKind::PersistenceFailed)
                        .with_op(OP_BACKGROUND_SYNC)
                        .with_workflow_id(&workflow_id)
                        .with_request_id(child.request_id.clone())
                        .with_trace_id(child.trace_id.clone())
                        .with_message(format!("failed to persist workflow state: {}", e.message()))
                        .with_source(e);
                    tracing::warn!(
                        workflow_id = %workflow_id,
                        request_id = %child.request_id,
                        err.code = err.code(),
                        "{}",
                        err
                    );
                    if let Ok(mut slot) = warning_slot.lock() {
                        *slot = Some(BackgroundWarning {
                            workflow_id,
                            message: err.to_string(),
                        });
                    }
                }
            }
        });
    }
}

impl std::fmt::Debug for DiffStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiffStore")
            .field("session", &self.session)
            .field("config", &self.config)
            .field("pending_tasks", &self.tasks.pending())
            .finish_non_exhaustive()
    }
}
