use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::traits::Gateway;
use crate::app::ApiConfig;
use crate::constants::HIGH_CONFIDENCE_THRESHOLD;
use crate::models::{
    ChatResponse, Conversation, ConversationId, HealthStatus, MentalHealthResource,
    SentimentReport,
};
use crate::utils::SolaceError;

/// Backend client speaking the chat API's HTTP+JSON contract
pub struct HttpGateway {
    client: Client,
    health_client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    conversation_id: Option<ConversationId>,
}

#[derive(Serialize)]
struct NewConversationRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
}

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    message: &'a str,
}

impl HttpGateway {
    /// Create a client for the given API configuration
    pub fn new(config: &ApiConfig) -> Result<Self, SolaceError> {
        if !(config.base_url.starts_with("http://") || config.base_url.starts_with("https://")) {
            return Err(SolaceError::ConfigError(format!(
                "API base URL must start with http:// or https://, got '{}'",
                config.base_url
            )));
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers.clone())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        // Shorter timeout so a dead backend doesn't stall status reports
        let health_client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.health_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            health_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a request and decode the JSON body, mapping non-2xx to `ApiError`
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, SolaceError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SolaceError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Log what the backend concluded about a message
fn log_analysis(response: &ChatResponse) {
    if let Some(analysis) = &response.analysis {
        debug!(
            "Sentiment: {:?} ({:.1}%) | Category: {:?} | Severity: {:?}",
            analysis.sentiment.label,
            analysis.sentiment.compound * 100.0,
            analysis.category,
            analysis.severity
        );

        if analysis.crisis_detected {
            warn!(conversation_id = response.conversation_id, "Crisis detected in message");
        }

        if analysis.confidence > HIGH_CONFIDENCE_THRESHOLD {
            debug!(confidence = analysis.confidence, "High confidence response");
        }

        if !analysis.keywords.is_empty() {
            let keywords: Vec<&str> = analysis.keywords.iter().map(|k| k.keyword.as_str()).collect();
            debug!("Keywords detected: {}", keywords.join(", "));
        }
    }

    if let Some(resources) = &response.resources {
        if !resources.is_empty() {
            info!("Resources provided: {}", resources.len());
        }
    }

    if !response.recommended_actions.is_empty() {
        info!("Recommended actions: {}", response.recommended_actions.join(", "));
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn send_message(
        &self,
        text: &str,
        conversation_id: Option<ConversationId>,
    ) -> Result<ChatResponse, SolaceError> {
        let body = ChatRequest {
            message: text,
            conversation_id,
        };
        let response: ChatResponse = self
            .execute(self.client.post(self.url("chat/")).json(&body))
            .await?;

        log_analysis(&response);
        Ok(response)
    }

    async fn create_conversation(
        &self,
        title: Option<String>,
    ) -> Result<Conversation, SolaceError> {
        let body = NewConversationRequest { title };
        self.execute(self.client.post(self.url("conversations/")).json(&body))
            .await
    }

    async fn get_conversation(&self, id: ConversationId) -> Result<Conversation, SolaceError> {
        self.execute(self.client.get(self.url(&format!("conversations/{}/", id))))
            .await
    }

    async fn get_conversations(&self) -> Result<Vec<Conversation>, SolaceError> {
        self.execute(self.client.get(self.url("conversations/")))
            .await
    }

    async fn get_resources(&self) -> Result<Vec<MentalHealthResource>, SolaceError> {
        self.execute(self.client.get(self.url("resources/"))).await
    }

    async fn analyze_sentiment(&self, text: &str) -> Result<SentimentReport, SolaceError> {
        let report: SentimentReport = self
            .execute(
                self.client
                    .post(self.url("analyze-sentiment/"))
                    .json(&AnalyzeRequest { message: text }),
            )
            .await?;
        debug!(category = ?report.category, severity = ?report.severity, "Standalone sentiment analysis");
        Ok(report)
    }

    async fn health_check(&self) -> Result<HealthStatus, SolaceError> {
        let status: HealthStatus = self
            .execute(self.health_client.get(self.url("health/")))
            .await?;
        debug!(status = %status.status, "Health check");
        Ok(status)
    }
}
