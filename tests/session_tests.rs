//! End-to-end tests for the chat session against a scripted backend

use async_trait::async_trait;
use parking_assistant::ai::{
    AnalysisRequest, ChatClient, ChatError, ChatResult, CompletionBackend, CompletionRequest,
    DEFAULT_ANALYSIS_PROMPT, SYSTEM_PROMPT, UPLOAD_NOTE,
};
use parking_assistant::rate_limit::{Clock, ManualClock, RATE_LIMIT_WINDOW, RateLimiter};
use parking_assistant::session::{
    ChatSession, UPLOAD_ACKNOWLEDGEMENT, UPLOAD_ANNOUNCEMENT, WELCOME_ID, WELCOME_MESSAGE,
};
use parking_assistant::storage::MemoryStore;
use parking_assistant::types::{Origin, Role};
use parking_assistant::view;
use std::sync::{Arc, Mutex};

const LIMIT_TEXT: &str = "You've reached the limit of 10 messages per hour. Please try again later.";

#[derive(Default)]
struct ScriptedBackend {
    fail_with: Option<(u16, String)>,
    requests: Mutex<Vec<CompletionRequest>>,
    analyses: Mutex<Vec<AnalysisRequest>>,
}

impl ScriptedBackend {
    fn failing(status: u16, message: &str) -> Self {
        Self {
            fail_with: Some((status, message.to_string())),
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len() + self.analyses.lock().unwrap().len()
    }

    fn last_request(&self) -> CompletionRequest {
        self.requests.lock().unwrap().last().cloned().expect("a request was sent")
    }

    fn result(&self, ok: String) -> ChatResult<String> {
        match &self.fail_with {
            Some((status, message)) => Err(ChatError::Api {
                status: *status,
                message: message.clone(),
            }),
            None => Ok(ok),
        }
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, request: &CompletionRequest) -> ChatResult<String> {
        let mut requests = self.requests.lock().unwrap();
        requests.push(request.clone());
        let n = requests.len();
        drop(requests);
        self.result(format!("reply {n}"))
    }

    async fn analyze(&self, request: &AnalysisRequest) -> ChatResult<String> {
        self.analyses.lock().unwrap().push(request.clone());
        self.result("Ticket #123, $65 fine".to_string())
    }
}

fn session_with(backend: Arc<ScriptedBackend>) -> (ChatSession, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let limiter = RateLimiter::with_clock(Arc::new(MemoryStore::new()), clock.clone());
    let client = ChatClient::new(backend, Arc::new(limiter));
    (ChatSession::new(client), clock)
}

#[tokio::test]
async fn test_session_starts_with_welcome() {
    let (session, _clock) = session_with(Arc::new(ScriptedBackend::default()));
    let history = session.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id(), WELCOME_ID);
    assert_eq!(history[0].content(), WELCOME_MESSAGE);
    assert_eq!(history[0].origin(), Origin::Assistant);
}

#[tokio::test]
async fn test_send_appends_user_and_reply() {
    let backend = Arc::new(ScriptedBackend::default());
    let (mut session, _clock) = session_with(backend.clone());

    let reply = session.send_message("I got a ticket").await.unwrap().unwrap();
    assert_eq!(reply.content(), "reply 1");

    let contents: Vec<&str> = session.history().iter().map(|m| m.content()).collect();
    assert_eq!(contents, [WELCOME_MESSAGE, "I got a ticket", "reply 1"]);

    let request = backend.last_request();
    assert_eq!(request.messages[0].role, Role::System);
    assert_eq!(request.messages[0].content, SYSTEM_PROMPT);
    assert_eq!(request.messages[1].role, Role::Assistant);
    assert_eq!(request.messages[2].content, "I got a ticket");
    assert_eq!(request.ticket_image, None);
}

#[tokio::test]
async fn test_blank_input_without_attachment_is_ignored() {
    let backend = Arc::new(ScriptedBackend::default());
    let (mut session, _clock) = session_with(backend.clone());

    assert!(session.send_message("   ").await.unwrap().is_none());
    assert_eq!(session.history().len(), 1);
    assert_eq!(backend.calls(), 0);
    assert_eq!(session.remaining().count, 10);
}

#[tokio::test]
async fn test_context_is_last_four_plus_current() {
    let backend = Arc::new(ScriptedBackend::default());
    let (mut session, _clock) = session_with(backend.clone());

    for i in 0..3 {
        session.send_message(&format!("question {i}")).await.unwrap();
    }
    session.send_message("latest").await.unwrap();

    let request = backend.last_request();
    let sent: Vec<&str> = request.messages[1..].iter().map(|m| m.content.as_str()).collect();
    assert_eq!(sent, ["question 1", "reply 2", "question 2", "reply 3", "latest"]);
}

#[tokio::test]
async fn test_eleventh_message_gets_limit_text_without_network() {
    let backend = Arc::new(ScriptedBackend::default());
    let (mut session, clock) = session_with(backend.clone());

    for i in 0..10 {
        let reply = session.send_message(&format!("m{i}")).await.unwrap().unwrap();
        assert_eq!(reply.content(), format!("reply {}", i + 1));
    }
    assert_eq!(backend.calls(), 10);

    let reply = session.send_message("one more").await.unwrap().unwrap();
    assert_eq!(reply.content(), LIMIT_TEXT);
    assert_eq!(backend.calls(), 10);
    assert_eq!(session.remaining().count, 0);

    let notice = view::render_limit_notice(&session.remaining(), clock.now_ms()).unwrap();
    assert_eq!(notice, "Rate limit reached. You can send more messages in 60 minutes.");
}

#[tokio::test]
async fn test_quota_returns_after_window() {
    let backend = Arc::new(ScriptedBackend::default());
    let (mut session, clock) = session_with(backend.clone());

    for i in 0..11 {
        session.send_message(&format!("m{i}")).await.unwrap();
    }
    assert_eq!(backend.calls(), 10);

    clock.advance(RATE_LIMIT_WINDOW);
    assert_eq!(session.remaining().count, 10);
    let reply = session.send_message("back again").await.unwrap().unwrap();
    assert_eq!(reply.content(), "reply 11");
}

#[tokio::test]
async fn test_capture_then_send_carries_image_and_note() {
    let backend = Arc::new(ScriptedBackend::default());
    let (mut session, _clock) = session_with(backend.clone());

    session.attach_ticket(b"jpeg-bytes", "image/jpeg").unwrap();
    let contents: Vec<&str> = session.history().iter().map(|m| m.content()).collect();
    assert_eq!(contents, [WELCOME_MESSAGE, UPLOAD_ANNOUNCEMENT, UPLOAD_ACKNOWLEDGEMENT]);
    let image = session.pending_attachment().unwrap().to_string();
    assert!(image.starts_with("data:image/jpeg;base64,"));

    session.send_message("It was a loading zone").await.unwrap();

    let request = backend.last_request();
    assert_eq!(request.ticket_image.as_deref(), Some(image.as_str()));
    let last = request.messages.last().unwrap();
    assert_eq!(last.role, Role::User);
    assert_eq!(last.content, UPLOAD_NOTE);
    assert!(request.messages.iter().all(|m| !m.content.contains("base64")));
    assert_eq!(session.pending_attachment(), None);

    session.send_message("follow up").await.unwrap();
    assert_eq!(backend.last_request().ticket_image, None);
}

#[tokio::test]
async fn test_attachment_alone_can_be_sent() {
    let backend = Arc::new(ScriptedBackend::default());
    let (mut session, _clock) = session_with(backend.clone());

    session.attach_ticket(b"png", "image/png").unwrap();
    assert!(session.send_message("").await.unwrap().is_some());
    assert!(backend.last_request().ticket_image.is_some());
}

#[tokio::test]
async fn test_rejected_capture_keeps_previous_attachment() {
    let (mut session, _clock) = session_with(Arc::new(ScriptedBackend::default()));

    session.attach_ticket(b"first", "image/png").unwrap();
    let before = session.pending_attachment().unwrap().to_string();
    let history_len = session.history().len();

    assert!(session.attach_ticket(b"text", "text/plain").is_err());
    assert_eq!(session.pending_attachment(), Some(before.as_str()));
    assert_eq!(session.history().len(), history_len);
}

#[tokio::test]
async fn test_remote_failure_surfaces_transport_error() {
    let backend = Arc::new(ScriptedBackend::failing(500, "OpenAI API key not found"));
    let (mut session, _clock) = session_with(backend.clone());
    session.attach_ticket(b"img", "image/png").unwrap();
    let before = session.history().len();

    let err = session.send_message("help").await.unwrap_err();
    assert!(err.is_transport());
    assert!(err.to_string().contains("OpenAI API key not found"));

    let history = session.history();
    assert_eq!(history.len(), before + 1);
    assert_eq!(history.last().unwrap().content(), "help");
    assert_eq!(history.last().unwrap().origin(), Origin::User);
    assert!(session.pending_attachment().is_some());
}

#[tokio::test]
async fn test_analyze_requires_attachment() {
    let backend = Arc::new(ScriptedBackend::default());
    let (mut session, _clock) = session_with(backend.clone());

    assert!(session.analyze_ticket(None).await.unwrap().is_none());
    assert_eq!(backend.calls(), 0);

    session.attach_ticket(b"img", "image/png").unwrap();
    let message = session.analyze_ticket(None).await.unwrap().unwrap();
    assert_eq!(message.content(), "Ticket #123, $65 fine");

    let analyses = backend.analyses.lock().unwrap();
    assert_eq!(analyses[0].prompt, DEFAULT_ANALYSIS_PROMPT);
    assert!(analyses[0].image_base64.starts_with("data:image/png;base64,"));
}

#[tokio::test]
async fn test_analyze_counts_against_quota() {
    let backend = Arc::new(ScriptedBackend::default());
    let (mut session, _clock) = session_with(backend.clone());
    session.attach_ticket(b"img", "image/png").unwrap();

    session.analyze_ticket(Some("fine amount?")).await.unwrap();
    assert_eq!(session.remaining().count, 9);
    assert_eq!(backend.analyses.lock().unwrap()[0].prompt, "fine amount?");
}
