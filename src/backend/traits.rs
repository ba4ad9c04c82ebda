use async_trait::async_trait;

use crate::models::{
    ChatResponse, Conversation, ConversationId, HealthStatus, MentalHealthResource,
    SentimentReport,
};
use crate::utils::SolaceError;

/// Core trait every backend client must implement
///
/// One logical request per call: no retry, pooling or backoff lives here.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Post a user message; the backend creates a conversation when `conversation_id` is `None`
    async fn send_message(
        &self,
        text: &str,
        conversation_id: Option<ConversationId>,
    ) -> Result<ChatResponse, SolaceError>;

    /// Create an empty conversation
    async fn create_conversation(&self, title: Option<String>)
        -> Result<Conversation, SolaceError>;

    /// Fetch one conversation including its messages
    async fn get_conversation(&self, id: ConversationId) -> Result<Conversation, SolaceError>;

    /// List conversations, newest first
    async fn get_conversations(&self) -> Result<Vec<Conversation>, SolaceError>;

    /// Fetch the full resource catalogue
    async fn get_resources(&self) -> Result<Vec<MentalHealthResource>, SolaceError>;

    /// Run the backend's sentiment analysis on a message without storing it
    async fn analyze_sentiment(&self, text: &str) -> Result<SentimentReport, SolaceError>;

    /// Probe the backend
    async fn health_check(&self) -> Result<HealthStatus, SolaceError>;
}
