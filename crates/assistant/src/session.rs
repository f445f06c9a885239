use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use futures::FutureExt;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{ResetPolicy, SessionConfig};
use crate::conversation::{ConversationStore, HistoryEntry, Turn};
use crate::credentials::CredentialResolver;
use crate::grounding::GroundingContextProvider;
use crate::llm::{
    AssistantFailure, ErrorKind, GenerativeClient, ParsedReply, build_request, classify,
    parse_reply,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The service answered and the reply was appended.
    Replied,
    /// The failure was classified and appended as an error turn.
    Failed(ErrorKind),
    /// Nothing was appended and no request was made.
    Ignored(IgnoredReason),
    /// The session was closed while the request was in flight; the result
    /// was dropped.
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoredReason {
    Blank,
    Busy,
    Closed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("a request is in flight")]
    Busy,
    #[error("session is closed")]
    Closed,
}

/// Counters for product-level "has the visitor interacted" triggers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Interaction {
    pub sends: usize,
    pub replies: usize,
    pub failures: usize,
}

impl Interaction {
    pub const fn attempted(self) -> bool {
        self.sends > 0
    }

    pub const fn answered(self) -> bool {
        self.replies > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Sending,
}

#[derive(Debug)]
struct SessionState {
    store: ConversationStore,
    phase: Phase,
    closed: bool,
    interaction: Interaction,
}

/// One conversation with the remote model. At most one request is in flight;
/// every send that is not ignored appends a user turn and then exactly one
/// assistant turn.
pub struct AssistantSession {
    id: Uuid,
    config: SessionConfig,
    client: Arc<dyn GenerativeClient>,
    credentials: CredentialResolver,
    grounding: GroundingContextProvider,
    state: Mutex<SessionState>,
}

impl AssistantSession {
    pub fn new(config: SessionConfig, client: Arc<dyn GenerativeClient>) -> Self {
        let store = match config.greeting.as_deref() {
            Some(greeting) => ConversationStore::seeded(greeting),
            None => ConversationStore::new(),
        };

        Self {
            id: Uuid::new_v4(),
            config,
            client,
            credentials: CredentialResolver::default(),
            grounding: GroundingContextProvider::default(),
            state: Mutex::new(SessionState {
                store,
                phase: Phase::Idle,
                closed: false,
                interaction: Interaction::default(),
            }),
        }
    }

    pub fn with_credentials(mut self, credentials: CredentialResolver) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_grounding(mut self, grounding: GroundingContextProvider) -> Self {
        self.grounding = grounding;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn turns(&self) -> Vec<Turn> {
        self.lock_state().store.turns().to_vec()
    }

    pub fn is_sending(&self) -> bool {
        self.lock_state().phase == Phase::Sending
    }

    pub fn interaction(&self) -> Interaction {
        self.lock_state().interaction
    }

    pub async fn send(&self, text: &str) -> SendOutcome {
        let user_text = text.trim();
        if user_text.is_empty() {
            return SendOutcome::Ignored(IgnoredReason::Blank);
        }

        let history = {
            let mut state = self.lock_state();
            if state.closed {
                return SendOutcome::Ignored(IgnoredReason::Closed);
            }
            if state.phase == Phase::Sending {
                debug!(session_id = %self.id, "ignoring send while a request is in flight");
                return SendOutcome::Ignored(IgnoredReason::Busy);
            }
            state.phase = Phase::Sending;
            let history = state.store.history();
            state.store.append(Turn::user(user_text));
            state.interaction.sends += 1;
            history
        };
        let in_flight = InFlight {
            session: self,
            settled: false,
        };

        let started_at = Instant::now();
        let result = AssertUnwindSafe(self.exchange(&history, user_text))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(AssistantFailure::Unexpected(panic_message(&*payload))));
        let latency_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);

        let (turn, outcome) = match result {
            Ok(reply) => {
                info!(
                    session_id = %self.id,
                    latency_ms,
                    citations = reply.citations.len(),
                    "assistant reply received"
                );
                (
                    Turn::assistant(reply.text, reply.citations),
                    SendOutcome::Replied,
                )
            }
            Err(failure) => {
                let kind = classify(&failure);
                warn!(
                    session_id = %self.id,
                    latency_ms,
                    error_kind = kind.as_str(),
                    error = %failure,
                    "assistant send failed"
                );
                (Turn::assistant_error(kind), SendOutcome::Failed(kind))
            }
        };

        if in_flight.finish(turn) {
            outcome
        } else {
            info!(session_id = %self.id, "session closed mid-flight; reply discarded");
            SendOutcome::Discarded
        }
    }

    pub fn reset(&self) -> Result<(), SessionError> {
        let mut state = self.lock_state();
        if state.closed {
            return Err(SessionError::Closed);
        }
        if state.phase == Phase::Sending {
            return Err(SessionError::Busy);
        }

        let reseed = self.config.reset_policy == ResetPolicy::ReseedGreeting;
        state.store.reset(reseed);
        state.interaction = Interaction::default();
        debug!(session_id = %self.id, reseed, "conversation reset");
        Ok(())
    }

    /// Tears the session down. Later sends are ignored and a reply still in
    /// flight is dropped instead of appended.
    pub fn close(&self) {
        let mut state = self.lock_state();
        state.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.lock_state().closed
    }

    async fn exchange(
        &self,
        history: &[HistoryEntry],
        user_text: &str,
    ) -> Result<ParsedReply, AssistantFailure> {
        let credential = self
            .credentials
            .resolve()
            .ok_or(AssistantFailure::MissingCredential)?;

        let hint = if self.config.tools.any() {
            self.grounding.try_locate(self.config.locate_timeout).await
        } else {
            None
        };

        let request = build_request(&self.config, history, user_text, hint);
        let raw = self.client.generate(&credential, &request).await?;
        Ok(parse_reply(&raw)?)
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panic: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panic: {message}")
    } else {
        "panic".to_string()
    }
}

/// Returns the session to `Idle` however the send ends, including when the
/// send future is dropped before the service answers.
struct InFlight<'a> {
    session: &'a AssistantSession,
    settled: bool,
}

impl InFlight<'_> {
    /// Appends the assistant turn unless the session was closed meanwhile.
    fn finish(mut self, turn: Turn) -> bool {
        self.settled = true;
        let mut state = self.session.lock_state();
        if state.closed {
            return false;
        }

        if turn.is_error() {
            state.interaction.failures += 1;
        } else {
            state.interaction.replies += 1;
        }
        state.store.append(turn);
        true
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.session.lock_state();
        if !self.settled && !state.closed {
            // Abandoned by the caller: keep user/assistant pairs intact.
            warn!(session_id = %self.session.id, "send abandoned before completion");
            state.store.append(Turn::assistant_error(ErrorKind::NetworkFailure));
            state.interaction.failures += 1;
        }
        state.phase = Phase::Idle;
    }
}
