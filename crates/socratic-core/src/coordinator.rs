//! Request coordination for a single conversation
//!
//! The coordinator turns one line of user input into one outbound dialogue
//! request and reconciles the outcome back into the conversation store. It is
//! synchronous: `submit` hands back a [`Dispatch`] for the caller to send, and
//! `resolve` applies whatever came back. Only one dispatch may be in flight.
//!
//! Every dispatch carries a generation number. `reset` abandons the in-flight
//! request, so a reply that arrives afterwards no longer matches and is
//! dropped instead of leaking into the fresh conversation.

use tracing::{debug, info, warn};

use crate::dialogue::{DialogueBackend, DialogueError, DialogueReply, DialogueRequest};
use crate::state::{ChatMessage, ConversationStore};

pub type Generation = u64;

/// A request the caller must deliver to the dialogue endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub generation: Generation,
    pub request: DialogueRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Pending,
}

#[derive(Debug, Default)]
pub struct Coordinator {
    store: ConversationStore,
    last_error: Option<String>,
    in_flight: Option<Generation>,
    last_generation: Generation,
}

impl Coordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.store.messages()
    }

    pub fn total_tokens(&self) -> u64 {
        self.store.total_tokens()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn phase(&self) -> Phase {
        if self.is_pending() {
            Phase::Pending
        } else {
            Phase::Idle
        }
    }

    /// Whether `input` would be accepted by `submit` right now
    pub fn can_submit(&self, input: &str) -> bool {
        !self.is_pending() && !input.trim().is_empty()
    }

    /// Record the user's message and produce the request to send.
    ///
    /// Blank input or a submission while another request is pending is a
    /// no-op and returns `None`.
    pub fn submit(&mut self, input: &str) -> Option<Dispatch> {
        let text = input.trim();
        if text.is_empty() {
            return None;
        }
        if let Some(generation) = self.in_flight {
            debug!(generation, "ignoring submission while a request is pending");
            return None;
        }

        let conversation_history = self.store.history();
        self.store.append(ChatMessage::user(text));
        self.last_error = None;

        self.last_generation += 1;
        let generation = self.last_generation;
        self.in_flight = Some(generation);

        info!(
            generation,
            history_len = conversation_history.len(),
            "dispatching dialogue request"
        );

        Some(Dispatch {
            generation,
            request: DialogueRequest {
                user_input: text.to_string(),
                conversation_history,
            },
        })
    }

    /// Apply the outcome of the request tagged `generation`.
    ///
    /// Returns `false` when the outcome is stale (the conversation was reset
    /// after the request went out) and was discarded.
    pub fn resolve(
        &mut self,
        generation: Generation,
        outcome: Result<DialogueReply, DialogueError>,
    ) -> bool {
        if self.in_flight != Some(generation) {
            debug!(
                generation,
                current = ?self.in_flight,
                "discarding stale dialogue outcome"
            );
            return false;
        }
        self.in_flight = None;

        match outcome {
            Ok(reply) => {
                info!(generation, tokens_used = ?reply.tokens_used, "dialogue reply received");
                self.store.append(reply.into_message());
            }
            Err(err) => {
                warn!(generation, error = %err, "dialogue request failed");
                self.last_error = Some(err.user_message());
            }
        }
        true
    }

    /// Clear the conversation. Any request still in flight is abandoned.
    pub fn reset(&mut self) {
        if let Some(generation) = self.in_flight.take() {
            info!(generation, "abandoning in-flight request on reset");
        }
        self.store.reset();
        self.last_error = None;
    }

    /// Submit `input`, await the backend, and apply the outcome.
    ///
    /// Returns `false` if the submission was a no-op.
    pub async fn send<B>(&mut self, backend: &B, input: &str) -> bool
    where
        B: DialogueBackend + ?Sized,
    {
        let Some(dispatch) = self.submit(input) else {
            return false;
        };
        let outcome = backend.dialogue(&dispatch.request).await;
        self.resolve(dispatch.generation, outcome);
        true
    }
}
