//! One user's chat session: the conversation, the pending ticket photo and
//! the client that talks to the relay.

use crate::ai::{ChatClient, ChatResult};
use crate::capture::{CaptureError, TicketImageCapture};
use crate::conversation::ConversationStore;
use crate::rate_limit::Remaining;
use crate::types::{ChatMessage, Message, Origin};
use std::path::Path;
use tracing::debug;

pub const WELCOME_ID: &str = "welcome";

pub const WELCOME_MESSAGE: &str = "Hi there! I'm your parking ticket assistant. Tell me about your ticket situation, \
and I'll help you contest it. You can also upload a photo of your ticket for analysis.";

pub const UPLOAD_ANNOUNCEMENT: &str = "I've uploaded my ticket for analysis.";

pub const UPLOAD_ACKNOWLEDGEMENT: &str = "Thanks for uploading your ticket! I'll analyze it to help with your case. \
Could you tell me more about where and when you received this ticket, and why you believe it should be contested?";

/// Number of earlier messages sent along with the current one.
pub const CONTEXT_MESSAGES: usize = 4;

pub struct ChatSession {
    client: ChatClient,
    conversation: ConversationStore,
    capture: TicketImageCapture,
}

impl ChatSession {
    pub fn new(client: ChatClient) -> Self {
        let mut conversation = ConversationStore::new();
        conversation.append(Message::with_id(WELCOME_ID, Origin::Assistant, WELCOME_MESSAGE));
        Self {
            client,
            conversation,
            capture: TicketImageCapture::new(),
        }
    }

    pub fn history(&self) -> &[Message] {
        self.conversation.history()
    }

    pub fn pending_attachment(&self) -> Option<&str> {
        self.capture.pending()
    }

    pub fn remaining(&self) -> Remaining {
        self.client.remaining()
    }

    pub fn attach_ticket(&mut self, bytes: &[u8], mime_type: &str) -> Result<(), CaptureError> {
        self.capture.capture(bytes, mime_type)?;
        self.announce_upload();
        Ok(())
    }

    pub async fn attach_ticket_file(&mut self, path: impl AsRef<Path>) -> Result<(), CaptureError> {
        self.capture.capture_file(path).await?;
        self.announce_upload();
        Ok(())
    }

    pub fn clear_ticket(&mut self) {
        self.capture.clear();
    }

    fn announce_upload(&mut self) {
        self.conversation.append(Message::user(UPLOAD_ANNOUNCEMENT));
        self.conversation.append(Message::assistant(UPLOAD_ACKNOWLEDGEMENT));
    }

    /// Send `text` (and any pending ticket photo) and record the reply.
    ///
    /// Returns `Ok(None)` without doing anything when there is neither text
    /// nor a pending photo. On failure the user's message stays in the
    /// history, no reply is recorded and the photo stays pending.
    pub async fn send_message(&mut self, text: &str) -> ChatResult<Option<Message>> {
        if text.trim().is_empty() && !self.capture.has_pending() {
            return Ok(None);
        }

        let mut context = self.conversation.recent_context(CONTEXT_MESSAGES);
        context.push(ChatMessage::user(text));
        self.conversation.append(Message::user(text));

        let reply = match self.client.send(&context, self.capture.pending()).await {
            Ok(reply) => reply,
            Err(err) => {
                debug!(error = %err, "failed to generate a response");
                return Err(err);
            }
        };

        let message = Message::assistant(reply);
        self.conversation.append(message.clone());
        self.capture.clear();
        Ok(Some(message))
    }

    /// Ask the relay to read the pending ticket photo. Returns `Ok(None)`
    /// when no photo is attached.
    pub async fn analyze_ticket(&mut self, prompt: Option<&str>) -> ChatResult<Option<Message>> {
        let Some(image) = self.capture.pending() else {
            return Ok(None);
        };

        let analysis = self.client.analyze_ticket(image, prompt).await?;
        let message = Message::assistant(analysis);
        self.conversation.append(message.clone());
        Ok(Some(message))
    }
}
