use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use advisor_wire::{AdvisorTransport, HistoryEntry, StreamRequest, SyncRequest, WireResult};
use futures::StreamExt;
use serde_json::{Map, Value};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::ids::{MessageId, SessionId};
use super::interpreter::{StreamSignal, interpret};
use super::message::{CONNECTIVITY_ERROR_REPLY, Content, Message};
use super::profile::{IntentProfile, ProfileHandle};
use super::reconciler::{Reconciled, TurnReconciler};
use super::state::ConversationState;

pub trait TurnCounter: Send + Sync {
    fn turn_started(&self);
}

#[derive(Debug, Default)]
pub struct AtomicTurnCounter {
    turns: AtomicU64,
}

impl AtomicTurnCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u64 {
        self.turns.load(Ordering::Relaxed)
    }
}

impl TurnCounter for AtomicTurnCounter {
    fn turn_started(&self) {
        self.turns.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Streamed,
    ServerError,
    Fallback,
    Failed,
}

/// Owns the conversation and runs one turn at a time.
///
/// State is published through a watch channel; `append` never reports
/// failures to its caller, they all end up as assistant content.
pub struct ConversationStore {
    state: Arc<watch::Sender<ConversationState>>,
    transport: Arc<dyn AdvisorTransport>,
    profile: ProfileHandle,
    turns: Arc<dyn TurnCounter>,
    extra_context: Map<String, Value>,
}

impl ConversationStore {
    pub fn new(transport: Arc<dyn AdvisorTransport>) -> Self {
        Self::with_session(transport, SessionId::new_v7())
    }

    pub fn with_session(transport: Arc<dyn AdvisorTransport>, session_id: SessionId) -> Self {
        let (state, _) = watch::channel(ConversationState::new(session_id));
        Self {
            state: Arc::new(state),
            transport,
            profile: ProfileHandle::new(),
            turns: Arc::new(AtomicTurnCounter::new()),
            extra_context: Map::new(),
        }
    }

    pub fn with_profile(mut self, profile: ProfileHandle) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_turn_counter(mut self, turns: Arc<dyn TurnCounter>) -> Self {
        self.turns = turns;
        self
    }

    pub fn with_extra_context(mut self, extra_context: Map<String, Value>) -> Self {
        self.extra_context = extra_context;
        self
    }

    pub fn session_id(&self) -> SessionId {
        self.state.borrow().session_id
    }

    pub fn profile(&self) -> &ProfileHandle {
        &self.profile
    }

    pub fn snapshot(&self) -> ConversationState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConversationState> {
        self.state.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.state.borrow().is_running
    }

    /// Starts a turn for `user_text` and returns without waiting for it.
    ///
    /// Returns `None`, leaving state untouched, when a turn is already running,
    /// the text is blank, or no Tokio runtime is available to drive the turn.
    pub fn append(&self, user_text: impl Into<String>) -> Option<JoinHandle<TurnOutcome>> {
        let user_text = user_text.into();
        if user_text.trim().is_empty() {
            return None;
        }

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(error) => {
                tracing::error!(error = %error, "cannot start a turn outside a tokio runtime");
                return None;
            }
        };

        let mut accepted = None;
        self.state.send_if_modified(|state| {
            if state.is_running {
                return false;
            }

            self.turns.turn_started();
            let history = state.history();
            let assistant = Message::assistant_placeholder();
            accepted = Some(Turn {
                session_id: state.session_id,
                assistant_id: assistant.id,
                user_text: user_text.clone(),
                history,
            });

            state.messages.push(Message::user(user_text.clone()));
            state.messages.push(assistant);
            state.is_running = true;
            true
        });

        let Some(turn) = accepted else {
            tracing::debug!(session_id = %self.session_id(), "ignoring append while a turn is running");
            return None;
        };

        let pipeline = TurnPipeline {
            state: Arc::clone(&self.state),
            transport: Arc::clone(&self.transport),
            profile: self.profile.clone(),
            extra_context: self.extra_context.clone(),
            turn,
        };
        Some(runtime.spawn(pipeline.run()))
    }
}

struct Turn {
    session_id: SessionId,
    assistant_id: MessageId,
    user_text: String,
    history: Vec<HistoryEntry>,
}

/// Clears the running flag however the turn ends, including task abort.
struct RunningGuard {
    state: Arc<watch::Sender<ConversationState>>,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.state.send_modify(|state| state.is_running = false);
    }
}

struct TurnPipeline {
    state: Arc<watch::Sender<ConversationState>>,
    transport: Arc<dyn AdvisorTransport>,
    profile: ProfileHandle,
    extra_context: Map<String, Value>,
    turn: Turn,
}

impl TurnPipeline {
    async fn run(self) -> TurnOutcome {
        let _running = RunningGuard {
            state: Arc::clone(&self.state),
        };

        let outcome = match self.stream().await {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::warn!(
                    session_id = %self.turn.session_id,
                    stage = error.stage(),
                    error = %error,
                    "stream failed; falling back to synchronous request"
                );
                self.fallback().await
            }
        };

        tracing::debug!(
            session_id = %self.turn.session_id,
            message_id = %self.turn.assistant_id,
            outcome = ?outcome,
            "turn finished"
        );
        outcome
    }

    async fn stream(&self) -> WireResult<TurnOutcome> {
        let request = StreamRequest::new(
            self.turn.user_text.clone(),
            self.turn.session_id.to_string(),
            self.turn.history.clone(),
        )
        .with_intent_profile(self.profile.current().map(|profile| profile.to_value()))
        .with_extra_context(self.extra_context.clone());

        let mut records = self.transport.open_stream(request).await?;
        let mut reconciler = TurnReconciler::new();

        while let Some(record) = records.next().await {
            for signal in interpret(&record?) {
                self.dispatch(&mut reconciler, signal);
            }
            if reconciler.is_closed() {
                return Ok(TurnOutcome::ServerError);
            }
        }

        self.dispatch(&mut reconciler, StreamSignal::Finish);
        Ok(TurnOutcome::Streamed)
    }

    fn dispatch(&self, reconciler: &mut TurnReconciler, signal: StreamSignal) {
        if let StreamSignal::ProfileUpdate(profile) = signal {
            if !reconciler.is_closed() {
                self.profile.replace(profile);
            }
            return;
        }

        self.state.send_if_modified(|state| {
            let Some(message) = state.message_mut(self.turn.assistant_id) else {
                return false;
            };
            reconciler.apply(&mut message.content, signal) != Reconciled::Unchanged
        });
    }

    async fn fallback(&self) -> TurnOutcome {
        let request = SyncRequest::new(
            self.turn.user_text.clone(),
            self.turn.session_id.to_string(),
            self.turn.history.clone(),
        );

        match self.transport.send_sync(request).await {
            Ok(response) => {
                if let Some(profile) = response
                    .intent_profile
                    .as_ref()
                    .and_then(IntentProfile::from_value)
                {
                    self.profile.replace(profile);
                }
                self.replace_content(Content::Text(response.response));
                tracing::info!(session_id = %self.turn.session_id, "fallback request answered the turn");
                TurnOutcome::Fallback
            }
            Err(error) => {
                tracing::error!(
                    session_id = %self.turn.session_id,
                    stage = error.stage(),
                    error = %error,
                    "fallback request failed"
                );
                self.replace_content(Content::Text(CONNECTIVITY_ERROR_REPLY.to_string()));
                TurnOutcome::Failed
            }
        }
    }

    fn replace_content(&self, content: Content) {
        self.state.send_modify(|state| {
            if let Some(message) = state.message_mut(self.turn.assistant_id) {
                message.content = content;
            }
        });
    }
}
