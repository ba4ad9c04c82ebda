use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timestamp;

/// Backend identifier of a conversation
pub type ConversationId = i64;

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// Identity of a message in the session log
///
/// Synthetic entries (welcome, cleared notice, apology) never reach the
/// backend and carry a session-unique local key instead of a database id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum MessageId {
    Local(u64),
    Persisted(i64),
}

impl MessageId {
    pub fn is_persisted(&self) -> bool {
        matches!(self, MessageId::Persisted(_))
    }
}

/// One chat turn as held by the session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub id: MessageId,
    pub sender: Sender,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub conversation_id: Option<ConversationId>,
    pub confidence_score: Option<f64>,
    pub is_crisis_detected: bool,
}

impl Message {
    /// A bot message that exists only on this client
    pub fn local_bot(key: u64, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::Local(key),
            sender: Sender::Bot,
            content: content.into(),
            timestamp: Utc::now(),
            conversation_id: None,
            confidence_score: None,
            is_crisis_detected: false,
        }
    }

    /// Convert a wire record, assigning `local_key` when the backend sent no id
    pub fn from_record(record: MessageRecord, local_key: u64) -> Self {
        Self {
            id: record
                .id
                .map(MessageId::Persisted)
                .unwrap_or(MessageId::Local(local_key)),
            sender: record.sender,
            content: record.content,
            timestamp: record.timestamp.unwrap_or_else(Utc::now),
            conversation_id: record.conversation_id,
            confidence_score: record.confidence_score,
            is_crisis_detected: record.is_crisis_detected,
        }
    }
}

/// A message exactly as the backend serializes it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    #[serde(default)]
    pub id: Option<i64>,
    pub sender: Sender,
    pub content: String,
    #[serde(default, with = "timestamp::option")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub conversation_id: Option<ConversationId>,
    #[serde(default)]
    pub confidence_score: Option<f64>,
    #[serde(default)]
    pub is_crisis_detected: bool,
}

/// Kind of a mental-health resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Hotline,
    Therapy,
    Article,
    Exercise,
    #[serde(other)]
    Other,
}

impl ResourceType {
    pub fn label(&self) -> &'static str {
        match self {
            ResourceType::Hotline => "hotline",
            ResourceType::Therapy => "therapy",
            ResourceType::Article => "article",
            ResourceType::Exercise => "exercise",
            ResourceType::Other => "other",
        }
    }
}

/// Read-only reference data served by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentalHealthResource {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub resource_type: ResourceType,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub is_crisis_resource: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

/// Sentiment scores as computed by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub compound: f64,
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
    pub label: SentimentLabel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Anxiety,
    Depression,
    Crisis,
    Sleep,
    Anger,
    Positive,
    Support,
    General,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub keyword: String,
    pub category: Category,
}

/// Backend-computed metadata attached to a chat response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub sentiment: Sentiment,
    pub category: Category,
    pub severity: Severity,
    #[serde(default)]
    pub keywords: Vec<Keyword>,
    pub confidence: f64,
    #[serde(default)]
    pub crisis_detected: bool,
}

/// Response of `POST /chat/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub conversation_id: ConversationId,
    pub user_message: MessageRecord,
    pub bot_message: MessageRecord,
    #[serde(default)]
    pub resources: Option<Vec<MentalHealthResource>>,
    #[serde(default)]
    pub analysis: Option<Analysis>,
    #[serde(default)]
    pub recommended_actions: Vec<String>,
}

/// Short preview of the newest message in a conversation list entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastMessage {
    pub content: String,
    pub sender: Sender,
    #[serde(default, with = "timestamp::option")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A conversation as stored by the backend
///
/// The list endpoint fills `message_count`/`last_message`, the detail
/// endpoint fills `messages`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub messages: Vec<MessageRecord>,
    #[serde(default)]
    pub message_count: Option<u64>,
    #[serde(default)]
    pub last_message: Option<LastMessage>,
}

fn default_true() -> bool {
    true
}

impl Conversation {
    /// Get a summary for display
    pub fn summary(&self) -> String {
        let count = self
            .message_count
            .unwrap_or(self.messages.len() as u64);
        format!(
            "#{} | {} | {} messages | {}",
            self.id,
            self.updated_at.format("%Y-%m-%d %H:%M"),
            count,
            self.title
        )
    }
}

/// Response of `POST /analyze-sentiment/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentReport {
    pub message: String,
    pub sentiment: Sentiment,
    pub category: Category,
    pub severity: Severity,
    pub confidence: f64,
    #[serde(default)]
    pub crisis_detected: bool,
    #[serde(default)]
    pub keywords: Vec<Keyword>,
}

/// Response of `GET /health/`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub ai_service: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}
