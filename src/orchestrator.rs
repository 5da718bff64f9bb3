//! The conversation view's send pipeline.
//!
//! [`SendOrchestrator`] keeps at most one chat request in flight.  Text
//! submitted while a request is outstanding is appended to the thread at
//! once and queued; the queue drains in submission order as replies land.
//! A submission carrying a file is never queued: it is refused while a
//! request is in flight.
//!
//! Every conversation view has an epoch.  Switching sessions or starting a
//! new draft bumps it, and a reply that arrives for an older epoch is
//! dropped without touching the new view.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::attachment::{Attachment, Composer, validate_selection};
use crate::chat::ChatApi;
use crate::error::{Error, Result};
use crate::observability::{
    CHAT_MESSAGES_QUEUED, CHAT_MESSAGES_SENT, CHAT_SEND_ERRORS, CHAT_STALE_REPLIES,
};
use crate::sessions::SessionDirectory;
use crate::types::{Author, ChatRequest, ChatResponse, Message, MessageAttachment};

const BUSY_WITH_FILE: &str = "Wait for the current reply before sending a file.";
const SEND_ABANDONED: &str = "Message not sent: the request was cancelled. Try again.";

/// What happened to a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Sent, and every reply it waited for has been appended.
    Delivered,
    /// Another request was in flight; the text will be sent after it.
    Queued,
    /// The view changed while the request was in flight and the reply was
    /// dropped.
    Discarded,
}

/// A snapshot of the conversation view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationView {
    /// Server conversation id, absent until the first exchange.
    pub session_id: Option<i64>,
    /// The thread, oldest first.
    pub messages: Vec<Message>,
    /// A chat request is in flight.
    pub typing: bool,
    /// The request in flight carries a file.
    pub sending_file: bool,
    /// Texts waiting to be sent, oldest first.
    pub queued: Vec<String>,
    /// The last send error, for display.
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
struct Pending {
    local_id: i64,
    text: String,
}

#[derive(Debug)]
struct State {
    session_id: Option<i64>,
    messages: Vec<Message>,
    typing: bool,
    sending_file: bool,
    queue: VecDeque<Pending>,
    error: Option<String>,
    composer: Composer,
    epoch: u64,
    flight: u64,
    next_local_id: i64,
}

impl Default for State {
    fn default() -> Self {
        Self {
            session_id: None,
            messages: Vec::new(),
            typing: false,
            sending_file: false,
            queue: VecDeque::new(),
            error: None,
            composer: Composer::new(),
            epoch: 0,
            flight: 0,
            next_local_id: -1,
        }
    }
}

impl State {
    fn append_local(&mut self, text: &str, attachments: Vec<MessageAttachment>) -> i64 {
        let local_id = self.next_local_id;
        self.next_local_id -= 1;
        self.messages.push(Message {
            id: local_id,
            author: Author::User,
            content: text.to_string(),
            timestamp: now_rfc3339(),
            attachments,
        });
        local_id
    }

    /// Marks a request in flight and returns its flight number.
    fn begin_flight(&mut self) -> u64 {
        self.typing = true;
        self.error = None;
        self.flight += 1;
        self.flight
    }

    /// Confirms the local message and places the reply right after it.
    /// Returns true when the exchange started a conversation.
    fn apply_reply(&mut self, local_id: i64, sent_with: Option<i64>, res: &ChatResponse) -> bool {
        let was_new = sent_with.is_none() || res.new_session;
        if self.session_id.is_none() {
            self.session_id = Some(res.session_id);
        }
        let position = self.messages.iter().position(|m| m.id == local_id);
        match position {
            Some(index) => {
                self.messages[index].id = res.user_message_id;
                self.messages.insert(index + 1, res.assistant_message());
            }
            None => self.messages.push(res.assistant_message()),
        }
        was_new
    }

    fn reset_view(&mut self, session_id: Option<i64>) {
        self.epoch += 1;
        self.session_id = session_id;
        self.messages.clear();
        self.typing = false;
        self.sending_file = false;
        self.queue.clear();
        self.error = None;
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

fn send_failure(err: &Error) -> String {
    format!("Message not sent: {} Try again.", err.message())
}

fn lock_state(state: &Mutex<State>) -> MutexGuard<'_, State> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Releases the in-flight indicators if the future driving a flight is
/// dropped before it finishes.  A later flight is left alone.
struct FlightGuard<'a> {
    state: &'a Mutex<State>,
    flight: u64,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let mut state = lock_state(self.state);
        if state.typing && state.flight == self.flight {
            tracing::debug!(flight = self.flight, "send abandoned; releasing the view");
            state.typing = false;
            state.sending_file = false;
            state.error = Some(SEND_ABANDONED.to_string());
        }
    }
}

///////////////////////////////////////// SendOrchestrator /////////////////////////////////////////

/// Serializes chat requests for one conversation view.
pub struct SendOrchestrator {
    chat: ChatApi,
    directory: Option<Arc<SessionDirectory>>,
    state: Mutex<State>,
}

impl SendOrchestrator {
    /// Creates an empty draft view.
    pub fn new(chat: ChatApi) -> Self {
        Self {
            chat,
            directory: None,
            state: Mutex::new(State::default()),
        }
    }

    /// Refreshes `directory` whenever an exchange creates a conversation.
    pub fn with_directory(mut self, directory: Arc<SessionDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        lock_state(&self.state)
    }

    /// A snapshot of the view.
    pub fn view(&self) -> ConversationView {
        let state = self.lock();
        ConversationView {
            session_id: state.session_id,
            messages: state.messages.clone(),
            typing: state.typing,
            sending_file: state.sending_file,
            queued: state.queue.iter().map(|p| p.text.clone()).collect(),
            error: state.error.clone(),
        }
    }

    /// The current conversation id.
    pub fn session_id(&self) -> Option<i64> {
        self.lock().session_id
    }

    /// The thread, oldest first.
    pub fn messages(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }

    /// True while a chat request is in flight.
    pub fn is_typing(&self) -> bool {
        self.lock().typing
    }

    /// True while a file upload is in flight.
    pub fn is_sending_file(&self) -> bool {
        self.lock().sending_file
    }

    /// The last error shown to the user.
    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    /// A copy of the draft input.
    pub fn composer(&self) -> Composer {
        self.lock().composer.clone()
    }

    /// Replaces the draft text.
    pub fn set_draft(&self, text: &str) {
        self.lock().composer.set_text(text);
    }

    /// Stages files chosen through a picker.
    pub fn stage_files(&self, files: Vec<Attachment>) -> Result<()> {
        self.lock().composer.stage(files)
    }

    /// Stages files dropped onto the input.  Never sends.
    pub fn drop_files(&self, files: Vec<Attachment>) -> Result<()> {
        self.lock().composer.drop_files(files)
    }

    /// Removes the staged file.
    pub fn remove_attachment(&self) {
        self.lock().composer.remove_attachment();
    }

    /// Sends the draft: through the file endpoint when a file is staged,
    /// otherwise as text.
    pub async fn submit_draft(&self) -> Result<SubmitOutcome> {
        let (text, file) = {
            let state = self.lock();
            let composer = &state.composer;
            (composer.text().to_string(), composer.attachment().cloned())
        };
        match file {
            Some(file) => self.submit_with_file(&text, file).await,
            None => {
                let outcome = self.submit(&text).await;
                if !matches!(&outcome, Err(err) if err.is_validation()) {
                    self.lock().composer.set_text("");
                }
                outcome
            }
        }
    }

    /// Submits a text message.
    ///
    /// The message is appended to the thread immediately.  If a request is
    /// in flight it is queued and this returns [`SubmitOutcome::Queued`];
    /// otherwise this drives the queue until it is empty or a send fails.
    /// Dropping the returned future releases the view for the next
    /// submission; texts still queued are sent by it.
    pub async fn submit(&self, text: &str) -> Result<SubmitOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::validation(
                "message is empty",
                Some("message".to_string()),
            ));
        }
        let (epoch, flight) = {
            let mut state = self.lock();
            let local_id = state.append_local(text, Vec::new());
            state.queue.push_back(Pending {
                local_id,
                text: text.to_string(),
            });
            if state.typing {
                CHAT_MESSAGES_QUEUED.click();
                tracing::debug!(queued = state.queue.len(), "request in flight; message queued");
                return Ok(SubmitOutcome::Queued);
            }
            (state.epoch, state.begin_flight())
        };
        let _guard = FlightGuard {
            state: &self.state,
            flight,
        };
        self.drain(epoch).await
    }

    /// Submits a message with a file through the upload endpoint.
    ///
    /// Refused with [`Error::Busy`] before anything is appended when a
    /// request is already in flight.  On success the draft is cleared.
    pub async fn submit_with_file(&self, text: &str, file: Attachment) -> Result<SubmitOutcome> {
        let file = match validate_selection(vec![file])? {
            Some(file) => file,
            None => return Err(Error::attachment("no file selected")),
        };
        let text = text.trim().to_string();
        let (epoch, flight, local_id, sent_with) = {
            let mut state = self.lock();
            if state.typing {
                CHAT_SEND_ERRORS.click();
                state.error = Some(BUSY_WITH_FILE.to_string());
                return Err(Error::busy(BUSY_WITH_FILE));
            }
            let local_id = state.append_local(&text, vec![file.metadata()]);
            let flight = state.begin_flight();
            state.sending_file = true;
            (state.epoch, flight, local_id, state.session_id)
        };
        let _guard = FlightGuard {
            state: &self.state,
            flight,
        };

        let result = self
            .chat
            .chat_with_file(&text, sent_with, Some(&file))
            .await;

        let was_new = {
            let mut state = self.lock();
            if state.epoch != epoch {
                CHAT_STALE_REPLIES.click();
                tracing::debug!("dropping reply for an abandoned view");
                return Ok(SubmitOutcome::Discarded);
            }
            state.sending_file = false;
            match result {
                Ok(res) => {
                    CHAT_MESSAGES_SENT.click();
                    state.composer.clear();
                    state.apply_reply(local_id, sent_with, &res)
                }
                Err(err) => {
                    CHAT_SEND_ERRORS.click();
                    tracing::warn!(error = %err, file = %file.name, "file upload failed");
                    state.typing = false;
                    state.error = Some(send_failure(&err));
                    return Err(err);
                }
            }
        };
        if was_new {
            self.refresh_directory().await;
        }
        self.drain(epoch).await
    }

    /// Sends queued texts one at a time until the queue empties, a send
    /// fails, or the view changes.  The caller has set `typing`.
    async fn drain(&self, epoch: u64) -> Result<SubmitOutcome> {
        loop {
            let (pending, sent_with) = {
                let mut state = self.lock();
                if state.epoch != epoch {
                    return Ok(SubmitOutcome::Discarded);
                }
                match state.queue.pop_front() {
                    Some(pending) => (pending, state.session_id),
                    None => {
                        state.typing = false;
                        return Ok(SubmitOutcome::Delivered);
                    }
                }
            };

            let request = ChatRequest {
                session_id: sent_with,
                message: pending.text.clone(),
            };
            let result = self.chat.chat(&request).await;

            let was_new = {
                let mut state = self.lock();
                if state.epoch != epoch {
                    CHAT_STALE_REPLIES.click();
                    tracing::debug!("dropping reply for an abandoned view");
                    return Ok(SubmitOutcome::Discarded);
                }
                match result {
                    Ok(res) => {
                        CHAT_MESSAGES_SENT.click();
                        state.apply_reply(pending.local_id, sent_with, &res)
                    }
                    Err(err) => {
                        CHAT_SEND_ERRORS.click();
                        tracing::warn!(
                            error = %err,
                            queued = state.queue.len(),
                            "chat request failed"
                        );
                        state.typing = false;
                        state.error = Some(send_failure(&err));
                        return Err(err);
                    }
                }
            };
            if was_new {
                self.refresh_directory().await;
            }
        }
    }

    async fn refresh_directory(&self) {
        if let Some(directory) = &self.directory
            && let Err(err) = directory.refresh().await
        {
            tracing::debug!(error = %err, "session list refresh failed");
        }
    }

    /// Switches to an existing conversation and loads its history.
    pub async fn select_session(&self, session_id: i64) -> Result<()> {
        let epoch = {
            let mut state = self.lock();
            state.reset_view(Some(session_id));
            state.epoch
        };
        let result = self.chat.messages(session_id).await;
        let mut state = self.lock();
        if state.epoch != epoch {
            return Ok(());
        }
        match result {
            Ok(messages) => {
                state.messages = messages;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, session_id, "cannot load conversation");
                state.error = Some(format!("Could not load conversation: {}", err.message()));
                Err(err)
            }
        }
    }

    /// Starts an empty draft; the next send creates a conversation.
    pub fn new_draft(&self) {
        self.lock().reset_view(None);
    }
}
