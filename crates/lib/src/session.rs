//! Learner session: the state behind one chat window and the transitions the UI triggers.
//!
//! A session owns the conversation, the pending input, the attached file and the API key.
//! Hosts call the transition methods, then render [`LearnerSession::view`]. Submitting is
//! split in two ([`LearnerSession::begin_submit`] / [`LearnerSession::finish_submit`]) so a
//! host can run the completion call off its UI thread; [`LearnerSession::submit`] does both.

use crate::config::Config;
use crate::conversation::{Conversation, Role, Turn};
use crate::document::{self, Attachment, AttachmentSummary};
use crate::llm::{ChatBackend, ChatMessage};
use crate::shortcuts::Shortcut;
use std::fmt;

/// Unique session identifier (opaque string).
pub type SessionId = String;

/// Heading placed between the typed message and the attached file's text.
pub const ATTACHMENT_HEADING: &str = "\n\n📎 **Attached file content:**\n";

/// Bearer token entered by the user. Never printed by `Debug`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_present(&self) -> bool {
        !self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_present() {
            f.write_str("Credential(***)")
        } else {
            f.write_str("Credential(<empty>)")
        }
    }
}

/// A submitted user turn waiting for its reply: the transcript to send and the key to send it with.
#[derive(Debug, Clone)]
pub struct PendingTurn {
    messages: Vec<ChatMessage>,
    credential: Credential,
}

impl PendingTurn {
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Ask the backend for the reply. Failures come back as reply text.
    pub async fn run(&self, backend: &dyn ChatBackend) -> String {
        backend
            .complete(self.credential.expose(), &self.messages)
            .await
    }
}

/// Immutable snapshot of everything a host needs to draw the session.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub session_id: SessionId,
    pub turns: Vec<Turn>,
    pub input: String,
    pub attachment: Option<AttachmentSummary>,
    pub has_credential: bool,
    pub busy: bool,
}

#[derive(Debug)]
pub struct LearnerSession {
    id: SessionId,
    conversation: Conversation,
    input: String,
    attachment: Option<Attachment>,
    credential: Credential,
    max_attachment_chars: usize,
    busy: bool,
}

impl Default for LearnerSession {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAX_CHARS)
    }
}

impl LearnerSession {
    /// Empty session whose attachments are cut to `max_attachment_chars` characters.
    pub fn new(max_attachment_chars: usize) -> Self {
        let id = format!("sess-{}", uuid::Uuid::new_v4());
        log::debug!("session {} created", id);
        Self {
            id,
            conversation: Conversation::new(),
            input: String::new(),
            attachment: None,
            credential: Credential::default(),
            max_attachment_chars,
            busy: false,
        }
    }

    /// New session using the configured budget and, if any, the configured API key.
    pub fn from_config(config: &Config) -> Self {
        let mut session = Self::new(config.attachment.max_chars);
        if let Some(key) = crate::config::resolve_api_key(config) {
            session.set_credential(key);
        }
        session
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Direct edit of the input box.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Mutable access for hosts that bind the input box to the buffer in place.
    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    /// Replace the input with the shortcut's instruction followed by a space. Ignored while
    /// a reply is pending.
    pub fn press_shortcut(&mut self, shortcut: &Shortcut) {
        if self.busy {
            log::debug!("session {}: shortcut ignored while a reply is pending", self.id);
            return;
        }
        self.input = format!("{} ", shortcut.instruction);
    }

    pub fn clear_input(&mut self) {
        self.input.clear();
    }

    /// Drop every turn. Ignored while a reply is pending.
    pub fn clear_conversation(&mut self) {
        if self.busy {
            log::debug!("session {}: clear ignored while a reply is pending", self.id);
            return;
        }
        self.conversation.clear();
        log::info!("session {}: conversation cleared", self.id);
    }

    pub fn set_credential(&mut self, token: impl Into<String>) {
        self.credential = Credential::new(token);
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_present()
    }

    /// Attach a file; it is folded into every submission until detached or replaced.
    /// Returns false, leaving the current attachment, while a reply is pending.
    pub fn attach(&mut self, attachment: Attachment) -> bool {
        if self.busy {
            log::debug!("session {}: attach ignored while a reply is pending", self.id);
            return false;
        }
        log::info!(
            "session {}: attached {} ({} bytes)",
            self.id,
            attachment.name(),
            attachment.bytes().len()
        );
        self.attachment = Some(attachment);
        true
    }

    /// Remove the attachment. `None` when nothing is attached or a reply is pending.
    pub fn detach(&mut self) -> Option<Attachment> {
        if self.busy {
            return None;
        }
        self.attachment.take()
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Record the user turn and hand back what to send. `None` (and no turn recorded) when the
    /// input is blank or a reply is already pending.
    pub fn begin_submit(&mut self) -> Option<PendingTurn> {
        if self.busy || self.input.trim().is_empty() {
            return None;
        }
        let content = self.compose_user_content();
        self.conversation.append(Role::User, content);
        self.input.clear();
        self.busy = true;
        log::info!(
            "session {}: submitted turn #{}",
            self.id,
            self.conversation.len()
        );
        Some(PendingTurn {
            messages: self.conversation.to_messages(),
            credential: self.credential.clone(),
        })
    }

    /// Record the reply (or error text) for the pending turn. Returns false when nothing was pending.
    pub fn finish_submit(&mut self, reply: impl Into<String>) -> bool {
        if !self.busy {
            log::warn!("session {}: reply arrived with no pending turn", self.id);
            return false;
        }
        self.conversation.append(Role::Assistant, reply);
        self.busy = false;
        true
    }

    /// Submit the input and wait for the reply. Returns whether a turn was recorded.
    pub async fn submit(&mut self, backend: &dyn ChatBackend) -> bool {
        let Some(turn) = self.begin_submit() else {
            return false;
        };
        let reply = turn.run(backend).await;
        self.finish_submit(reply)
    }

    fn compose_user_content(&self) -> String {
        let mut content = self.input.clone();
        if let Some(attachment) = &self.attachment {
            let text = attachment.extract();
            content.push_str(ATTACHMENT_HEADING);
            content.push_str(&document::truncate_for_message(&text, self.max_attachment_chars));
        }
        content
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            session_id: self.id.clone(),
            turns: self.conversation.all(),
            input: self.input.clone(),
            attachment: self.attachment.as_ref().map(Attachment::summary),
            has_credential: self.has_credential(),
            busy: self.busy,
        }
    }
}
