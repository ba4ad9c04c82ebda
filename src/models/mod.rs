// Gateway module for models - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod timestamp;
mod types;

// Public re-exports - the ONLY way to access model functionality
pub use types::{
    Analysis, Category, ChatResponse, Conversation, ConversationId, HealthStatus, Keyword,
    LastMessage, MentalHealthResource, Message, MessageId, MessageRecord, ResourceType, Sender,
    Sentiment, SentimentLabel, SentimentReport, Severity,
};
