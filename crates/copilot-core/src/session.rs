//! The chat session: transcript, pending input, and the busy gate.
//!
//! A session owns its transcript exclusively and mirrors it to a
//! [`TranscriptStore`] after every append. At most one request is ever
//! outstanding; the busy flag is the guard, not the UI.

use std::sync::Arc;

use crate::backend::{BackendError, ChatBackend, ChatRequest};
use crate::state::{ChatMessage, Transcript, CONNECTION_ERROR_MESSAGE};
use crate::storage::TranscriptStore;

pub struct ChatSession {
    transcript: Transcript,
    input: String,
    busy: bool,
    user_id: String,
    store: Box<dyn TranscriptStore>,
    backend: Arc<dyn ChatBackend>,
}

impl ChatSession {
    /// Build a session, adopting a stored transcript when one is readable.
    /// Never touches the network.
    pub fn initialize(
        store: Box<dyn TranscriptStore>,
        backend: Arc<dyn ChatBackend>,
        user_id: impl Into<String>,
    ) -> Self {
        let transcript = match store.load() {
            Ok(Some(turns)) => Transcript::from_turns(turns).unwrap_or_else(|| {
                tracing::debug!("stored transcript is empty, seeding greeting");
                Transcript::seeded()
            }),
            Ok(None) => Transcript::seeded(),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable stored transcript");
                Transcript::seeded()
            }
        };

        tracing::info!(turns = transcript.len(), "chat session initialized");

        Self {
            transcript,
            input: String::new(),
            busy: false,
            user_id: user_id.into(),
            store,
            backend,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.transcript.as_slice()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn backend(&self) -> Arc<dyn ChatBackend> {
        Arc::clone(&self.backend)
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    /// Whether the pending input could be submitted right now.
    pub fn can_submit(&self) -> bool {
        !self.busy && !self.input.trim().is_empty()
    }

    /// First half of a submission: append the user turn, clear the pending
    /// input, raise the busy flag, and return the request to send.
    ///
    /// Returns `None` without changing anything if `text` is blank or a
    /// request is already outstanding.
    pub fn begin_submit(&mut self, text: &str) -> Option<ChatRequest> {
        if self.busy {
            tracing::debug!("submission rejected: request already in flight");
            return None;
        }
        if text.trim().is_empty() {
            return None;
        }

        self.append(ChatMessage::user(text));
        self.input.clear();
        self.busy = true;

        Some(ChatRequest {
            user_id: self.user_id.clone(),
            message: text.to_string(),
        })
    }

    /// Second half of a submission: append exactly one assistant turn for
    /// `outcome` and release the busy flag.
    ///
    /// Ignored (returns `false`) when no submission is outstanding.
    pub fn finish_submit(&mut self, outcome: Result<String, BackendError>) -> bool {
        if !self.busy {
            tracing::debug!("dropping reply with no outstanding submission");
            return false;
        }

        let reply = match outcome {
            Ok(text) => ChatMessage::assistant(text),
            Err(e) => {
                tracing::warn!(error = %e, "chat request failed");
                ChatMessage::assistant(CONNECTION_ERROR_MESSAGE)
            }
        };

        self.append(reply);
        self.busy = false;
        true
    }

    /// Submit `text` and wait for the reply. Returns `false` if the
    /// submission was rejected (blank text or busy).
    pub async fn submit(&mut self, text: &str) -> bool {
        let Some(request) = self.begin_submit(text) else {
            return false;
        };

        let backend = self.backend();
        let outcome = backend.send(&request).await;
        self.finish_submit(outcome);
        true
    }

    /// Submit whatever is in the pending-input buffer.
    pub async fn submit_input(&mut self) -> bool {
        let text = self.input.clone();
        self.submit(&text).await
    }

    /// Reset to the seeded greeting and erase the durable copy.
    ///
    /// Rejected while a request is outstanding so its reply cannot land in
    /// the fresh transcript.
    pub fn clear(&mut self) -> bool {
        if self.busy {
            tracing::debug!("clear rejected: request in flight");
            return false;
        }

        self.transcript = Transcript::seeded();
        if let Err(e) = self.store.remove() {
            tracing::warn!(error = %e, "failed to erase stored transcript");
        }
        tracing::info!("chat cleared");
        true
    }

    fn append(&mut self, message: ChatMessage) {
        self.transcript.push(message);
        if let Err(e) = self.store.save(self.transcript.as_slice()) {
            tracing::warn!(error = %e, "failed to persist transcript");
        }
    }
}
