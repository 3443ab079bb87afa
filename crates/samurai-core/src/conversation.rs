//! Conversation sync
//!
//! The server owns the conversation. A send posts the current history plus
//! the new user text and takes back the full history; a refresh fetches the
//! full history for the current id. Local history is only ever replaced
//! wholesale by one of those responses.

use std::sync::{Mutex, MutexGuard};

use crate::context::{Applied, ClientContext};
use crate::error::{ClientError, ClientResult, PreconditionError};
use crate::gateway::SendChatRequest;
use crate::sequence::Sequencer;
use crate::state::{render_history, ChatMessage, RenderedMessage};

const SEND_TRANSPORT: &str = "Failed to send message. Please try again.";
const REFRESH_TRANSPORT: &str = "Failed to refresh conversation. Please try again.";

fn server_error(status: u16) -> String {
    format!("There was a server error: {}", status)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationState {
    pub conversation_id: String,
    pub history: Vec<ChatMessage>,
    /// The chat input buffer
    pub draft: String,
    pub status: String,
    pub sending: usize,
    pub refreshing: usize,
}

impl ConversationState {
    pub fn is_sending(&self) -> bool {
        self.sending > 0
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing > 0
    }
}

#[derive(Default)]
struct Inner {
    state: ConversationState,
    history_seq: Sequencer,
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Clone, Copy)]
enum Slot {
    Sending,
    Refreshing,
}

/// Counts one in-flight request against its slot until dropped.
struct InFlight<'a> {
    inner: &'a Mutex<Inner>,
    slot: Slot,
}

impl<'a> InFlight<'a> {
    fn begin(inner: &'a Mutex<Inner>, slot: Slot) -> Self {
        let mut guard = lock(inner);
        match slot {
            Slot::Sending => guard.state.sending += 1,
            Slot::Refreshing => guard.state.refreshing += 1,
        }
        Self { inner, slot }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut guard = lock(self.inner);
        match self.slot {
            Slot::Sending => guard.state.sending = guard.state.sending.saturating_sub(1),
            Slot::Refreshing => guard.state.refreshing = guard.state.refreshing.saturating_sub(1),
        }
    }
}

pub struct ConversationController {
    ctx: ClientContext,
    inner: Mutex<Inner>,
}

impl ConversationController {
    pub fn new(ctx: ClientContext) -> Self {
        Self {
            ctx,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn snapshot(&self) -> ConversationState {
        lock(&self.inner).state.clone()
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        lock(&self.inner).state.history.clone()
    }

    pub fn rendered_messages(&self) -> Vec<RenderedMessage> {
        render_history(&lock(&self.inner).state.history)
    }

    pub fn conversation_id(&self) -> String {
        lock(&self.inner).state.conversation_id.clone()
    }

    /// Resume a known conversation by id.
    pub fn set_conversation_id(&self, id: impl Into<String>) {
        lock(&self.inner).state.conversation_id = id.into();
    }

    pub fn draft(&self) -> String {
        lock(&self.inner).state.draft.clone()
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        lock(&self.inner).state.draft = text.into();
    }

    pub fn status(&self) -> String {
        lock(&self.inner).state.status.clone()
    }

    /// Forget the conversation entirely. Responses still in flight are
    /// discarded when they land.
    pub fn reset(&self) {
        let mut inner = lock(&self.inner);
        inner.history_seq.raise_floor();
        inner.state.conversation_id.clear();
        inner.state.history.clear();
        inner.state.draft.clear();
        inner.state.status.clear();
    }

    pub async fn send_draft(&self) -> ClientResult<Applied> {
        let draft = self.draft();
        self.send_message(&draft).await
    }

    /// Blank input is ignored without touching the network or the state.
    pub async fn send_message(&self, text: &str) -> ClientResult<Applied> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(PreconditionError::EmptyMessage.into());
        }

        let result = self.send_once(trimmed).await;
        if let Err(err) = &result {
            tracing::warn!(error = %err, "sending chat message failed");
            self.report(err, SEND_TRANSPORT);
        }
        result
    }

    async fn send_once(&self, text: &str) -> ClientResult<Applied> {
        let auth = self.ctx.authorize()?;
        let _busy = InFlight::begin(&self.inner, Slot::Sending);

        let (ticket, request) = {
            let mut inner = lock(&self.inner);
            let ticket = inner.history_seq.issue();
            let id = inner.state.conversation_id.trim();
            let request = SendChatRequest {
                user_message: text.to_string(),
                conversation_id: (!id.is_empty()).then(|| id.to_string()),
                message_history_array: inner.state.history.clone(),
            };
            (ticket, request)
        };

        let response = self
            .ctx
            .gateway
            .send_chat(&auth, &request)
            .await?
            .into_result(server_error)?;

        let mut inner = lock(&self.inner);
        if !inner.history_seq.try_apply(ticket) {
            tracing::debug!(ticket = ticket.value(), "discarding stale send response");
            return Ok(Applied::Stale);
        }

        tracing::info!(
            conversation_id = %response.conversation_id,
            messages = response.message_history_array.len(),
            "chat turn completed"
        );
        inner.state.history = response.message_history_array;
        inner.state.conversation_id = response.conversation_id;
        inner.state.status.clear();
        // Keep anything typed while the request was out.
        if inner.state.draft.trim() == text {
            inner.state.draft.clear();
        }
        Ok(Applied::Yes)
    }

    /// Reload the history for the current conversation id.
    pub async fn refresh_conversation(&self) -> ClientResult<Applied> {
        let id = self.conversation_id().trim().to_string();
        if id.is_empty() {
            let err = PreconditionError::MissingConversationId;
            self.ctx.alerts.error(err.to_string());
            return Err(err.into());
        }

        let result = self.refresh_once(&id).await;
        if let Err(err) = &result {
            tracing::warn!(conversation_id = %id, error = %err, "refreshing conversation failed");
            self.report(err, REFRESH_TRANSPORT);
        }
        result
    }

    async fn refresh_once(&self, id: &str) -> ClientResult<Applied> {
        let auth = self.ctx.authorize()?;
        let _busy = InFlight::begin(&self.inner, Slot::Refreshing);
        let ticket = lock(&self.inner).history_seq.issue();

        let response = self
            .ctx
            .gateway
            .fetch_conversation(&auth, id)
            .await?
            .into_result(server_error)?;

        let mut inner = lock(&self.inner);
        if !inner.history_seq.try_apply(ticket) {
            tracing::debug!(ticket = ticket.value(), "discarding stale conversation fetch");
            return Ok(Applied::Stale);
        }

        tracing::info!(
            conversation_id = id,
            messages = response.message_history_array.len(),
            "conversation refreshed"
        );
        inner.state.history = response.message_history_array;
        inner.state.status.clear();
        Ok(Applied::Yes)
    }

    fn report(&self, err: &ClientError, transport_message: &str) {
        let message = match err {
            ClientError::Unparseable { status } => server_error(*status),
            other => other.status_text(transport_message),
        };
        lock(&self.inner).state.status = message.clone();
        self.ctx.alerts.error(message);
    }
}
