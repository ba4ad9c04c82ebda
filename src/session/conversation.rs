use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::app::ChatConfig;
use crate::backend::Gateway;
use crate::constants::{APOLOGY_MESSAGE, CLEARED_MESSAGE, WELCOME_MESSAGE};
use crate::models::{Analysis, ChatResponse, ConversationId, MentalHealthResource, Message};
use crate::utils::SolaceError;

/// Pacing and limits for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Pause between the user message and the bot reply appearing
    pub presentation_delay: Duration,
    /// Display-side cap on the draft length
    pub max_characters: usize,
    /// Load resources during `initialize`
    pub fetch_resources_on_start: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&ChatConfig::default())
    }
}

impl From<&ChatConfig> for SessionConfig {
    fn from(chat: &ChatConfig) -> Self {
        Self {
            presentation_delay: Duration::from_millis(chat.presentation_delay_ms),
            max_characters: chat.max_characters,
            fetch_resources_on_start: chat.fetch_resources_on_start,
        }
    }
}

/// What a call to [`ConversationSession::send`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input; nothing happened
    Ignored,
    /// Another send is still outstanding; nothing happened
    Busy,
    /// The backend answered; the bot reply is scheduled
    Delivered,
    /// The backend call failed; an apology was appended
    Failed,
}

/// Observable state of one conversation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationState {
    pub messages: Vec<Message>,
    pub conversation_id: Option<ConversationId>,
    pub is_loading: bool,
    pub is_typing: bool,
    pub last_analysis: Option<Analysis>,
    pub recommended_actions: Vec<String>,
    pub draft: String,
    pub character_count: usize,
    pub resources: Vec<MentalHealthResource>,
}

impl ConversationState {
    /// Whether the latest analysis flagged a possible crisis
    pub fn has_crisis(&self) -> bool {
        self.last_analysis
            .as_ref()
            .map(|a| a.crisis_detected)
            .unwrap_or(false)
    }

    /// Draft length capped at `max`
    pub fn displayed_character_count(&self, max: usize) -> usize {
        self.character_count.min(max)
    }
}

struct Inner {
    state: ConversationState,
    /// Bumped whenever the message log is replaced
    epoch: u64,
    /// Bumped whenever the conversation itself is replaced
    generation: u64,
    next_key: u64,
}

impl Inner {
    fn local_key(&mut self) -> u64 {
        self.next_key += 1;
        self.next_key
    }

    fn finish_send(&mut self) {
        self.state.is_loading = false;
        self.state.is_typing = false;
    }

    fn clear_draft(&mut self) {
        self.state.draft.clear();
        self.state.character_count = 0;
    }
}

/// The single active conversation and everything the UI shows about it
///
/// Cloning is cheap and clones share state, so a render loop and spawned
/// sends can hold the same session.
#[derive(Clone)]
pub struct ConversationSession {
    gateway: Arc<dyn Gateway>,
    inner: Arc<Mutex<Inner>>,
    pending: Arc<Mutex<Option<JoinHandle<()>>>>,
    current: Arc<watch::Sender<Option<ConversationId>>>,
    config: SessionConfig,
}

impl ConversationSession {
    /// Create an empty session; call [`initialize`](Self::initialize) before use
    pub fn new(gateway: Arc<dyn Gateway>, config: SessionConfig) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            gateway,
            inner: Arc::new(Mutex::new(Inner {
                state: ConversationState::default(),
                epoch: 0,
                generation: 0,
                next_key: 0,
            })),
            pending: Arc::new(Mutex::new(None)),
            current: Arc::new(current),
            config,
        }
    }

    /// Seed the welcome message and load the resource list
    pub async fn initialize(&self) {
        self.reset_log(WELCOME_MESSAGE, true);
        if self.config.fetch_resources_on_start {
            self.refresh_resources().await;
        }
    }

    /// Post `text` to the backend
    ///
    /// The user message is appended as soon as the backend answers; the bot
    /// reply follows after the presentation delay on a spawned task.
    pub async fn send(&self, text: &str) -> SendOutcome {
        let message = text.trim();
        if message.is_empty() {
            return SendOutcome::Ignored;
        }

        let (epoch, generation, conversation_id) = {
            let mut inner = self.inner.lock();
            if inner.state.is_loading {
                debug!("Send ignored: a message is already in flight");
                return SendOutcome::Busy;
            }
            inner.state.is_loading = true;
            inner.state.is_typing = true;
            (inner.epoch, inner.generation, inner.state.conversation_id)
        };

        match self.gateway.send_message(message, conversation_id).await {
            Ok(response) => {
                self.accept(response, epoch, generation);
                SendOutcome::Delivered
            }
            Err(err) => {
                if err.is_backend_response() {
                    error!("Backend rejected message: {}", err);
                } else {
                    error!("Error sending message: {}", err);
                }
                let mut inner = self.inner.lock();
                inner.finish_send();
                if inner.epoch == epoch {
                    let key = inner.local_key();
                    inner
                        .state
                        .messages
                        .push(Message::local_bot(key, APOLOGY_MESSAGE));
                } else {
                    debug!("Dropping apology for a log that was reset while in flight");
                }
                SendOutcome::Failed
            }
        }
    }

    /// Send whatever is currently in the draft
    pub async fn submit_draft(&self) -> SendOutcome {
        let draft = self.draft();
        self.send(&draft).await
    }

    /// Send a canned suggestion in place of the draft
    ///
    /// A failed send leaves the suggestion in the draft for a retry; a busy
    /// session keeps whatever the user had typed.
    pub async fn send_suggestion(&self, suggestion: &str) -> SendOutcome {
        let outcome = self.send(suggestion).await;
        if outcome == SendOutcome::Failed {
            self.set_draft(suggestion);
        }
        outcome
    }

    fn accept(&self, response: ChatResponse, epoch: u64, generation: u64) {
        let ChatResponse {
            conversation_id,
            user_message,
            bot_message,
            resources,
            analysis,
            recommended_actions,
        } = response;

        let mut adopted = false;
        let reply = {
            let mut inner = self.inner.lock();

            if let Some(resources) = resources {
                inner.state.resources = resources;
            }

            if inner.generation == generation
                && inner.state.conversation_id != Some(conversation_id)
            {
                inner.state.conversation_id = Some(conversation_id);
                adopted = true;
            }

            if inner.epoch != epoch {
                debug!("Dropping exchange for a log that was reset while in flight");
                inner.finish_send();
                None
            } else {
                let key = inner.local_key();
                inner
                    .state
                    .messages
                    .push(Message::from_record(user_message, key));
                if analysis.is_some() {
                    inner.state.last_analysis = analysis;
                }
                inner.state.recommended_actions = recommended_actions;
                inner.clear_draft();
                let key = inner.local_key();
                Some(Message::from_record(bot_message, key))
            }
        };

        if adopted {
            self.current.send_replace(Some(conversation_id));
        }
        if let Some(reply) = reply {
            self.schedule_reply(reply, epoch);
        }
    }

    fn schedule_reply(&self, reply: Message, epoch: u64) {
        let inner = Arc::clone(&self.inner);
        let delay = self.config.presentation_delay;

        let handle = tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let mut inner = inner.lock();
            if inner.epoch == epoch {
                inner.state.messages.push(reply);
            } else {
                debug!("Dropping bot reply: log was reset during the presentation delay");
            }
            inner.finish_send();
        });

        *self.pending.lock() = Some(handle);
    }

    /// Wait for a scheduled bot reply, if any, to land
    pub async fn settle(&self) {
        let handle = self.pending.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!("Presentation task failed: {}", err);
            }
        }
    }

    /// Replace the log with a single notice; returns the conversation generation
    fn reset_log(&self, notice: &str, forget_conversation: bool) -> u64 {
        let generation = {
            let mut inner = self.inner.lock();
            inner.epoch += 1;
            let key = inner.local_key();
            inner.state.messages = vec![Message::local_bot(key, notice)];
            inner.state.last_analysis = None;
            inner.state.recommended_actions.clear();
            inner.clear_draft();
            if forget_conversation {
                inner.generation += 1;
                inner.state.conversation_id = None;
            }
            inner.generation
        };

        if forget_conversation {
            self.current.send_replace(None);
        }
        generation
    }

    /// Start over with a fresh welcome and ask the backend for a new conversation
    ///
    /// The reset happens before the request, so the session is usable even when
    /// creation fails; the next send then creates the conversation implicitly.
    pub async fn start_new(&self) {
        let generation = self.reset_log(WELCOME_MESSAGE, true);

        match self.gateway.create_conversation(None).await {
            Ok(conversation) => {
                let adopted = {
                    let mut inner = self.inner.lock();
                    if inner.generation == generation && inner.state.conversation_id.is_none() {
                        inner.state.conversation_id = Some(conversation.id);
                        true
                    } else {
                        false
                    }
                };
                if adopted {
                    info!("New conversation created: {}", conversation.id);
                    self.current.send_replace(Some(conversation.id));
                }
            }
            Err(err) => error!("Error creating new conversation: {}", err),
        }
    }

    /// Replace the visible log with the "cleared" notice, keeping the conversation
    pub fn clear(&self) {
        self.reset_log(CLEARED_MESSAGE, false);
    }

    /// Load a stored conversation and make it the active one
    pub async fn resume(&self, id: ConversationId) -> Result<(), SolaceError> {
        let conversation = self.gateway.get_conversation(id).await?;

        {
            let mut inner = self.inner.lock();
            inner.epoch += 1;
            inner.generation += 1;

            let mut messages = Vec::with_capacity(conversation.messages.len().max(1));
            if conversation.messages.is_empty() {
                let key = inner.local_key();
                messages.push(Message::local_bot(key, WELCOME_MESSAGE));
            }
            for record in conversation.messages {
                let key = inner.local_key();
                let mut message = Message::from_record(record, key);
                message.conversation_id.get_or_insert(conversation.id);
                messages.push(message);
            }

            inner.state.messages = messages;
            inner.state.conversation_id = Some(conversation.id);
            inner.state.last_analysis = None;
            inner.state.recommended_actions.clear();
            inner.clear_draft();
        }

        info!("Resumed conversation {}", conversation.id);
        self.current.send_replace(Some(conversation.id));
        Ok(())
    }

    /// Refetch the resource list; failures keep the previous list
    pub async fn refresh_resources(&self) {
        match self.gateway.get_resources().await {
            Ok(resources) => {
                debug!("Loaded {} resources", resources.len());
                self.inner.lock().state.resources = resources;
            }
            Err(err) => error!("Error loading resources: {}", err),
        }
    }

    /// Replace the draft; the character count mirrors it
    pub fn set_draft(&self, text: impl Into<String>) {
        let text = text.into();
        let mut inner = self.inner.lock();
        inner.state.character_count = text.chars().count();
        inner.state.draft = text;
    }

    pub fn draft(&self) -> String {
        self.inner.lock().state.draft.clone()
    }

    pub fn character_count(&self) -> usize {
        self.inner.lock().state.character_count
    }

    pub fn max_characters(&self) -> usize {
        self.config.max_characters
    }

    /// Copy of the whole observable state
    pub fn snapshot(&self) -> ConversationState {
        self.inner.lock().state.clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.inner.lock().state.messages.clone()
    }

    pub fn conversation_id(&self) -> Option<ConversationId> {
        self.inner.lock().state.conversation_id
    }

    pub fn is_loading(&self) -> bool {
        self.inner.lock().state.is_loading
    }

    pub fn is_typing(&self) -> bool {
        self.inner.lock().state.is_typing
    }

    pub fn last_analysis(&self) -> Option<Analysis> {
        self.inner.lock().state.last_analysis.clone()
    }

    pub fn recommended_actions(&self) -> Vec<String> {
        self.inner.lock().state.recommended_actions.clone()
    }

    pub fn resources(&self) -> Vec<MentalHealthResource> {
        self.inner.lock().state.resources.clone()
    }

    /// Whether the latest analysis flagged a possible crisis
    pub fn has_crisis(&self) -> bool {
        self.inner.lock().state.has_crisis()
    }

    /// Watch the active conversation id
    pub fn subscribe(&self) -> watch::Receiver<Option<ConversationId>> {
        self.current.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockGateway;
    use crate::models::{
        Category, Conversation, HealthStatus, MessageId, MessageRecord, ResourceType,
        SentimentReport, Sender, Sentiment, SentimentLabel, Severity,
    };
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn record(id: i64, sender: Sender, content: &str) -> MessageRecord {
        MessageRecord {
            id: Some(id),
            sender,
            content: content.to_string(),
            timestamp: Some(Utc::now()),
            conversation_id: None,
            confidence_score: None,
            is_crisis_detected: false,
        }
    }

    fn resource(id: i64, title: &str, resource_type: ResourceType) -> MentalHealthResource {
        MentalHealthResource {
            id,
            title: title.to_string(),
            description: format!("About {}", title),
            resource_type,
            url: None,
            phone_number: None,
            is_crisis_resource: resource_type == ResourceType::Hotline,
        }
    }

    fn analysis(crisis: bool) -> Analysis {
        Analysis {
            sentiment: Sentiment {
                compound: -0.45,
                positive: 0.0,
                negative: 0.5,
                neutral: 0.5,
                label: SentimentLabel::Negative,
            },
            category: if crisis { Category::Crisis } else { Category::Anxiety },
            severity: if crisis { Severity::High } else { Severity::Medium },
            keywords: vec![],
            confidence: if crisis { 0.95 } else { 0.69 },
            crisis_detected: crisis,
        }
    }

    fn chat_response(conversation_id: ConversationId, text: &str) -> ChatResponse {
        ChatResponse {
            conversation_id,
            user_message: record(100, Sender::User, text),
            bot_message: record(101, Sender::Bot, "That sounds hard. Let's take a slow breath."),
            resources: Some(vec![resource(3, "Grounding exercise", ResourceType::Exercise)]),
            analysis: Some(analysis(false)),
            recommended_actions: vec!["breathing_exercise".to_string()],
        }
    }

    fn conversation(id: ConversationId, messages: Vec<MessageRecord>) -> Conversation {
        Conversation {
            id,
            title: "New Conversation".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            is_active: true,
            messages,
            message_count: None,
            last_message: None,
        }
    }

    fn backend_down() -> SolaceError {
        SolaceError::ApiError {
            status: 502,
            body: "Bad Gateway".to_string(),
        }
    }

    fn session_with(mock: MockGateway) -> ConversationSession {
        let config = SessionConfig {
            fetch_resources_on_start: false,
            ..SessionConfig::default()
        };
        ConversationSession::new(Arc::new(mock), config)
    }

    fn contents(session: &ConversationSession) -> Vec<String> {
        session.messages().into_iter().map(|m| m.content).collect()
    }

    #[tokio::test]
    async fn test_initialize_seeds_welcome_and_resources() {
        let mut mock = MockGateway::new();
        mock.expect_get_resources()
            .times(1)
            .returning(|| Ok(vec![resource(1, "988 Lifeline", ResourceType::Hotline)]));
        let session = ConversationSession::new(Arc::new(mock), SessionConfig::default());

        session.initialize().await;

        let messages = session.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, WELCOME_MESSAGE);
        assert_eq!(messages[0].sender, Sender::Bot);
        assert!(!messages[0].id.is_persisted());
        assert_eq!(session.conversation_id(), None);
        assert_eq!(session.resources().len(), 1);
    }

    #[tokio::test]
    async fn test_resource_failure_does_not_block_chat() {
        let mut mock = MockGateway::new();
        mock.expect_get_resources()
            .times(1)
            .returning(|| Err(backend_down()));
        let session = ConversationSession::new(Arc::new(mock), SessionConfig::default());

        session.initialize().await;

        assert_eq!(contents(&session), vec![WELCOME_MESSAGE.to_string()]);
        assert!(session.resources().is_empty());
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let mut mock = MockGateway::new();
        mock.expect_send_message().never();
        let session = session_with(mock);
        session.initialize().await;
        let before = session.snapshot();

        assert_eq!(session.send("").await, SendOutcome::Ignored);
        assert_eq!(session.send("   ").await, SendOutcome::Ignored);
        assert_eq!(session.send("\n\t").await, SendOutcome::Ignored);

        assert_eq!(session.snapshot(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_send_end_to_end() {
        let mut mock = MockGateway::new();
        mock.expect_send_message()
            .withf(|text, id| text.to_string() == "I'm feeling anxious" && id.is_none())
            .times(1)
            .returning(|text, _| Ok(chat_response(7, text)));
        let session = session_with(mock);
        session.initialize().await;
        session.set_draft("  I'm feeling anxious ");
        assert_eq!(session.character_count(), 22);

        assert_eq!(session.submit_draft().await, SendOutcome::Delivered);

        // User message lands at once, the reply waits for the delay
        assert_eq!(session.messages().len(), 2);
        assert!(session.is_loading());
        assert!(session.is_typing());
        assert_eq!(session.conversation_id(), Some(7));
        assert_eq!(session.draft(), "");
        assert_eq!(session.character_count(), 0);
        assert_eq!(session.resources()[0].title, "Grounding exercise");
        assert_eq!(session.last_analysis(), Some(analysis(false)));
        assert_eq!(session.recommended_actions(), vec!["breathing_exercise".to_string()]);

        session.settle().await;

        let messages = session.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, WELCOME_MESSAGE);
        assert_eq!(messages[1].sender, Sender::User);
        assert_eq!(messages[1].id, MessageId::Persisted(100));
        assert_eq!(messages[2].sender, Sender::Bot);
        assert_eq!(messages[2].id, MessageId::Persisted(101));
        assert!(!session.is_loading());
        assert!(!session.is_typing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_waits_for_presentation_delay() {
        let mut mock = MockGateway::new();
        mock.expect_send_message()
            .returning(|text, _| Ok(chat_response(7, text)));
        let session = session_with(mock);
        session.initialize().await;

        session.send("hello").await;
        tokio::time::sleep(Duration::from_millis(1400)).await;
        assert_eq!(session.messages().len(), 2);
        assert!(session.is_typing());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(session.messages().len(), 3);
        assert!(!session.is_typing());
    }

    #[tokio::test]
    async fn test_failed_send_appends_apology() {
        let mut mock = MockGateway::new();
        mock.expect_send_message()
            .times(1)
            .returning(|_, _| Err(backend_down()));
        let session = session_with(mock);
        session.initialize().await;
        session.set_draft("hello?");

        assert_eq!(session.submit_draft().await, SendOutcome::Failed);

        assert_eq!(
            contents(&session),
            vec![WELCOME_MESSAGE.to_string(), APOLOGY_MESSAGE.to_string()]
        );
        assert!(!session.is_loading());
        assert!(!session.is_typing());
        assert_eq!(session.conversation_id(), None);
        // The draft survives so the user can retry
        assert_eq!(session.draft(), "hello?");
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_while_outstanding_is_busy() {
        let mut mock = MockGateway::new();
        mock.expect_send_message()
            .times(1)
            .returning(|text, _| Ok(chat_response(7, text)));
        let session = session_with(mock);
        session.initialize().await;

        assert_eq!(session.send("first").await, SendOutcome::Delivered);
        assert_eq!(session.send("second").await, SendOutcome::Busy);

        session.settle().await;
        assert_eq!(session.messages().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_follow_up_reuses_conversation_id() {
        let mut mock = MockGateway::new();
        mock.expect_send_message()
            .withf(|_, id| id.is_none())
            .times(1)
            .returning(|text, _| Ok(chat_response(7, text)));
        mock.expect_send_message()
            .withf(|_, id| *id == Some(7))
            .times(1)
            .returning(|text, _| Ok(chat_response(7, text)));
        let session = session_with(mock);
        session.initialize().await;

        session.send("first").await;
        session.settle().await;
        session.send("second").await;
        session.settle().await;

        assert_eq!(session.messages().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_message_count_grows_two_per_success_one_per_failure() {
        let mut mock = MockGateway::new();
        let mut calls = 0;
        mock.expect_send_message().times(6).returning(move |text, _| {
            calls += 1;
            if calls % 3 == 0 {
                Err(backend_down())
            } else {
                Ok(chat_response(7, text))
            }
        });
        let session = session_with(mock);
        session.initialize().await;

        let mut expected = 1;
        for i in 0..6 {
            let outcome = session.send(&format!("message {}", i)).await;
            session.settle().await;
            expected += match outcome {
                SendOutcome::Delivered => 2,
                SendOutcome::Failed => 1,
                other => panic!("unexpected outcome {:?}", other),
            };
            assert_eq!(session.messages().len(), expected);
            assert!(!session.is_loading());
        }
        assert_eq!(expected, 1 + 4 * 2 + 2);
    }

    #[tokio::test]
    async fn test_start_new_adopts_created_conversation() {
        let mut mock = MockGateway::new();
        mock.expect_create_conversation()
            .withf(|title| title.is_none())
            .times(1)
            .returning(|_| Ok(conversation(12, vec![])));
        let session = session_with(mock);
        session.initialize().await;
        session.set_draft("half-typed");

        session.start_new().await;

        assert_eq!(contents(&session), vec![WELCOME_MESSAGE.to_string()]);
        assert_eq!(session.conversation_id(), Some(12));
        assert_eq!(session.draft(), "");
        assert_eq!(session.last_analysis(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_new_failure_leaves_session_usable() {
        let mut mock = MockGateway::new();
        mock.expect_send_message()
            .returning(|text, _| Ok(chat_response(7, text)));
        mock.expect_create_conversation()
            .times(1)
            .returning(|_| Err(backend_down()));
        let session = session_with(mock);
        session.initialize().await;
        session.send("hello").await;
        session.settle().await;
        assert_eq!(session.conversation_id(), Some(7));

        session.start_new().await;

        assert_eq!(contents(&session), vec![WELCOME_MESSAGE.to_string()]);
        assert_eq!(session.conversation_id(), None);
        assert_eq!(session.last_analysis(), None);
        assert!(!session.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_keeps_conversation() {
        let mut mock = MockGateway::new();
        mock.expect_send_message()
            .returning(|text, _| Ok(chat_response(7, text)));
        let session = session_with(mock);
        session.initialize().await;
        session.send("hello").await;
        session.settle().await;

        session.clear();

        assert_eq!(contents(&session), vec![CLEARED_MESSAGE.to_string()]);
        assert_eq!(session.conversation_id(), Some(7));
        assert_eq!(session.last_analysis(), None);
        assert_eq!(session.character_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_during_delay_drops_stale_reply() {
        let mut mock = MockGateway::new();
        mock.expect_send_message()
            .returning(|text, _| Ok(chat_response(7, text)));
        let session = session_with(mock);
        session.initialize().await;

        session.send("hello").await;
        session.clear();
        assert!(session.is_loading());

        session.settle().await;

        assert_eq!(contents(&session), vec![CLEARED_MESSAGE.to_string()]);
        assert!(!session.is_loading());
        assert!(!session.is_typing());
        assert_eq!(session.conversation_id(), Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_new_during_delay_keeps_new_conversation() {
        let mut mock = MockGateway::new();
        mock.expect_send_message()
            .returning(|text, _| Ok(chat_response(7, text)));
        mock.expect_create_conversation()
            .returning(|_| Ok(conversation(12, vec![])));
        let session = session_with(mock);
        session.initialize().await;

        session.send("hello").await;
        session.start_new().await;
        session.settle().await;

        assert_eq!(contents(&session), vec![WELCOME_MESSAGE.to_string()]);
        assert_eq!(session.conversation_id(), Some(12));
        assert!(!session.is_typing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_conversation_changes() {
        let mut mock = MockGateway::new();
        mock.expect_send_message()
            .returning(|text, _| Ok(chat_response(7, text)));
        mock.expect_create_conversation()
            .returning(|_| Ok(conversation(12, vec![])));
        let session = session_with(mock);
        let mut rx = session.subscribe();
        session.initialize().await;

        session.send("hello").await;
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), Some(7));

        session.start_new().await;
        assert_eq!(*rx.borrow_and_update(), Some(12));
        session.settle().await;
    }

    #[tokio::test]
    async fn test_crisis_flag_follows_last_analysis() {
        let mut mock = MockGateway::new();
        mock.expect_send_message().returning(|text, _| {
            let mut response = chat_response(7, text);
            response.analysis = Some(analysis(true));
            response.recommended_actions = vec![
                "contact_crisis_line".to_string(),
                "emergency_services".to_string(),
            ];
            Ok(response)
        });
        let session = ConversationSession::new(
            Arc::new(mock),
            SessionConfig {
                presentation_delay: Duration::ZERO,
                fetch_resources_on_start: false,
                ..SessionConfig::default()
            },
        );
        session.initialize().await;
        assert!(!session.has_crisis());

        session.send("I want to hurt myself").await;
        session.settle().await;

        assert!(session.has_crisis());
        assert_eq!(session.recommended_actions().len(), 2);
        session.clear();
        assert!(!session.has_crisis());
    }

    #[tokio::test]
    async fn test_response_without_resources_keeps_list() {
        let mut mock = MockGateway::new();
        mock.expect_get_resources()
            .returning(|| Ok(vec![resource(1, "988 Lifeline", ResourceType::Hotline)]));
        mock.expect_send_message().returning(|text, _| {
            let mut response = chat_response(7, text);
            response.resources = None;
            response.analysis = None;
            Ok(response)
        });
        let session = ConversationSession::new(
            Arc::new(mock),
            SessionConfig {
                presentation_delay: Duration::ZERO,
                ..SessionConfig::default()
            },
        );
        session.initialize().await;

        session.send("hello").await;
        session.settle().await;

        assert_eq!(session.resources()[0].title, "988 Lifeline");
        assert_eq!(session.last_analysis(), None);
    }

    #[tokio::test]
    async fn test_resume_replaces_log() {
        let mut mock = MockGateway::new();
        mock.expect_get_conversation()
            .withf(|id| *id == 5)
            .returning(|id| {
                Ok(conversation(
                    id,
                    vec![
                        record(1, Sender::User, "I can't sleep"),
                        record(2, Sender::Bot, "Let's talk about your evening routine."),
                    ],
                ))
            });
        mock.expect_get_conversation()
            .withf(|id| *id == 6)
            .returning(|id| Ok(conversation(id, vec![])));
        let session = session_with(mock);
        session.initialize().await;

        session.resume(5).await.unwrap();
        let messages = session.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].conversation_id, Some(5));
        assert_eq!(session.conversation_id(), Some(5));

        session.resume(6).await.unwrap();
        assert_eq!(contents(&session), vec![WELCOME_MESSAGE.to_string()]);
        assert_eq!(session.conversation_id(), Some(6));
    }

    #[tokio::test]
    async fn test_resume_failure_leaves_state_untouched() {
        let mut mock = MockGateway::new();
        mock.expect_get_conversation()
            .returning(|_| Err(SolaceError::ApiError { status: 404, body: "Not found.".to_string() }));
        let session = session_with(mock);
        session.initialize().await;
        let before = session.snapshot();

        assert!(session.resume(99).await.is_err());
        assert_eq!(session.snapshot(), before);
    }

    #[tokio::test]
    async fn test_displayed_count_is_capped() {
        let session = session_with(MockGateway::new());
        session.set_draft("x".repeat(520));
        assert_eq!(session.character_count(), 520);
        let state = session.snapshot();
        assert_eq!(state.displayed_character_count(session.max_characters()), 500);
    }

    /// Gateway whose chat and create calls wait until the test releases them
    struct GatedGateway {
        entered: tokio::sync::Notify,
        release: tokio::sync::Notify,
        fail: bool,
    }

    impl GatedGateway {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                entered: tokio::sync::Notify::new(),
                release: tokio::sync::Notify::new(),
                fail,
            })
        }

        async fn gate(&self) {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }

    #[async_trait::async_trait]
    impl Gateway for GatedGateway {
        async fn send_message(
            &self,
            text: &str,
            _conversation_id: Option<ConversationId>,
        ) -> Result<ChatResponse, SolaceError> {
            self.gate().await;
            if self.fail {
                Err(backend_down())
            } else {
                Ok(chat_response(7, text))
            }
        }

        async fn create_conversation(
            &self,
            _title: Option<String>,
        ) -> Result<Conversation, SolaceError> {
            self.gate().await;
            Ok(conversation(12, vec![]))
        }

        async fn get_conversation(&self, _id: ConversationId) -> Result<Conversation, SolaceError> {
            unreachable!("not used")
        }

        async fn get_conversations(&self) -> Result<Vec<Conversation>, SolaceError> {
            unreachable!("not used")
        }

        async fn get_resources(&self) -> Result<Vec<MentalHealthResource>, SolaceError> {
            unreachable!("not used")
        }

        async fn analyze_sentiment(&self, _text: &str) -> Result<SentimentReport, SolaceError> {
            unreachable!("not used")
        }

        async fn health_check(&self) -> Result<HealthStatus, SolaceError> {
            unreachable!("not used")
        }
    }

    fn gated_session(gateway: &Arc<GatedGateway>) -> ConversationSession {
        let gateway: Arc<dyn Gateway> = gateway.clone();
        ConversationSession::new(
            gateway,
            SessionConfig {
                presentation_delay: Duration::ZERO,
                fetch_resources_on_start: false,
                ..SessionConfig::default()
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_suggestion_while_busy_keeps_draft() {
        let mut mock = MockGateway::new();
        mock.expect_send_message()
            .times(1)
            .returning(|text, _| Ok(chat_response(7, text)));
        let session = session_with(mock);
        session.initialize().await;

        assert_eq!(session.send("first").await, SendOutcome::Delivered);
        session.set_draft("my half-typed follow up");

        assert_eq!(
            session.send_suggestion("I'm feeling anxious").await,
            SendOutcome::Busy
        );
        assert_eq!(session.draft(), "my half-typed follow up");
        assert_eq!(session.character_count(), 23);

        session.settle().await;
        assert_eq!(session.messages().len(), 3);
    }

    #[tokio::test]
    async fn test_failed_suggestion_stays_in_draft() {
        let mut mock = MockGateway::new();
        mock.expect_send_message()
            .withf(|text, _| text.to_string() == "I'm feeling anxious")
            .times(1)
            .returning(|_, _| Err(backend_down()));
        let session = session_with(mock);
        session.initialize().await;

        assert_eq!(
            session.send_suggestion("I'm feeling anxious").await,
            SendOutcome::Failed
        );
        assert_eq!(session.draft(), "I'm feeling anxious");
    }

    #[tokio::test]
    async fn test_flags_set_while_request_pending() {
        let gateway = GatedGateway::new(false);
        let session = gated_session(&gateway);
        session.initialize().await;

        let task = tokio::spawn({
            let session = session.clone();
            async move { session.send("hello").await }
        });
        gateway.entered.notified().await;

        assert!(session.is_loading());
        assert!(session.is_typing());
        assert_eq!(session.messages().len(), 1);

        gateway.release.notify_one();
        assert_eq!(task.await.unwrap(), SendOutcome::Delivered);
        session.settle().await;

        assert_eq!(session.messages().len(), 3);
        assert!(!session.is_loading());
        assert!(!session.is_typing());
    }

    #[tokio::test]
    async fn test_start_new_resets_before_creation_resolves() {
        let gateway = GatedGateway::new(false);
        let session = gated_session(&gateway);
        session.initialize().await;

        let task = tokio::spawn({
            let session = session.clone();
            async move { session.send("hello").await }
        });
        gateway.entered.notified().await;
        gateway.release.notify_one();
        task.await.unwrap();
        session.settle().await;
        assert_eq!(session.conversation_id(), Some(7));
        session.set_draft("half-typed");

        let task = tokio::spawn({
            let session = session.clone();
            async move { session.start_new().await }
        });
        gateway.entered.notified().await;

        assert_eq!(contents(&session), vec![WELCOME_MESSAGE.to_string()]);
        assert_eq!(session.conversation_id(), None);
        assert_eq!(session.draft(), "");
        assert_eq!(session.last_analysis(), None);

        gateway.release.notify_one();
        task.await.unwrap();
        assert_eq!(session.conversation_id(), Some(12));
    }

    #[tokio::test]
    async fn test_failure_after_clear_drops_apology() {
        let gateway = GatedGateway::new(true);
        let session = gated_session(&gateway);
        session.initialize().await;

        let task = tokio::spawn({
            let session = session.clone();
            async move { session.send("hello").await }
        });
        gateway.entered.notified().await;
        session.clear();

        gateway.release.notify_one();
        assert_eq!(task.await.unwrap(), SendOutcome::Failed);

        assert_eq!(contents(&session), vec![CLEARED_MESSAGE.to_string()]);
        assert!(!session.is_loading());
        assert!(!session.is_typing());
    }

    #[test]
    fn test_state_helpers() {
        let mut state = ConversationState::default();
        assert!(!state.has_crisis());
        state.last_analysis = Some(analysis(true));
        assert!(state.has_crisis());

        state.character_count = 520;
        assert_eq!(state.displayed_character_count(500), 500);
        state.character_count = 12;
        assert_eq!(state.displayed_character_count(500), 12);
    }
}
