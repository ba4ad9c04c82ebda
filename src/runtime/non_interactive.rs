use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

use crate::{
    app::Config,
    backend::Gateway,
    cli::OutputFormat,
    constants::CRISIS_LINE_DISPLAY,
    models::{Analysis, ConversationId, MentalHealthResource, Sender},
    session::{ConversationSession, SendOutcome, SessionConfig},
};

/// Result of a non-interactive run
#[derive(Debug, Serialize, Deserialize)]
pub struct NonInteractiveResult {
    /// The prompt that was sent
    pub prompt: String,
    /// Conversation the exchange was stored in
    pub conversation_id: Option<ConversationId>,
    /// The bot's reply
    pub response: Option<String>,
    /// What the backend concluded about the prompt
    pub analysis: Option<Analysis>,
    pub recommended_actions: Vec<String>,
    pub resources: Vec<MentalHealthResource>,
    /// Any errors that occurred
    pub errors: Vec<String>,
    /// Metadata about the execution
    pub metadata: ExecutionMetadata,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExecutionMetadata {
    /// Backend the prompt was sent to
    pub api_url: String,
    /// Execution time in milliseconds
    pub duration_ms: u128,
}

impl NonInteractiveResult {
    pub fn crisis_detected(&self) -> bool {
        self.analysis
            .as_ref()
            .map(|a| a.crisis_detected)
            .unwrap_or(false)
    }
}

/// Non-interactive runner for sending a single prompt
pub struct NonInteractiveRunner {
    session: ConversationSession,
    api_url: String,
}

impl NonInteractiveRunner {
    /// Create a runner; replies are not paced since nothing is animated
    pub fn new(gateway: Arc<dyn Gateway>, config: &Config) -> Self {
        let session_config = SessionConfig {
            presentation_delay: Duration::ZERO,
            fetch_resources_on_start: false,
            ..SessionConfig::from(&config.chat)
        };
        Self {
            session: ConversationSession::new(gateway, session_config),
            api_url: config.api.base_url.clone(),
        }
    }

    /// Send the prompt and wait for the reply
    pub async fn execute(&self, prompt: String) -> Result<NonInteractiveResult> {
        let start_time = Instant::now();
        let mut errors = Vec::new();

        self.session.initialize().await;
        let outcome = self.session.send(&prompt).await;
        self.session.settle().await;

        let response = match outcome {
            SendOutcome::Delivered => self
                .session
                .messages()
                .into_iter()
                .rev()
                .find(|m| m.sender == Sender::Bot)
                .map(|m| m.content),
            SendOutcome::Failed => {
                errors.push(format!("Backend request to {} failed", self.api_url));
                None
            }
            SendOutcome::Ignored => {
                errors.push("Prompt is empty".to_string());
                None
            }
            SendOutcome::Busy => {
                errors.push("Another message is still in flight".to_string());
                None
            }
        };

        let state = self.session.snapshot();
        info!(
            outcome = ?outcome,
            conversation_id = ?state.conversation_id,
            "Non-interactive prompt finished"
        );

        Ok(NonInteractiveResult {
            prompt,
            conversation_id: state.conversation_id,
            response,
            analysis: state.last_analysis,
            recommended_actions: state.recommended_actions,
            resources: state.resources,
            errors,
            metadata: ExecutionMetadata {
                api_url: self.api_url.clone(),
                duration_ms: start_time.elapsed().as_millis(),
            },
        })
    }

    /// Format the result according to the output format
    pub fn format_result(&self, result: &NonInteractiveResult, format: OutputFormat) -> String {
        match format {
            OutputFormat::Json => serde_json::to_string_pretty(result).unwrap_or_else(|e| {
                format!("{{\"error\": \"Failed to serialize result: {}\"}}", e)
            }),
            OutputFormat::Text => format_text(result),
            OutputFormat::Markdown => format_markdown(result),
        }
    }
}

fn format_text(result: &NonInteractiveResult) -> String {
    let mut output = String::new();
    if let Some(response) = &result.response {
        output.push_str(response);
        output.push('\n');
    }

    if let Some(analysis) = &result.analysis {
        output.push_str(&format!(
            "\n--- Analysis ---\n{:?} | {:?} | severity {:?} | confidence {:.0}%\n",
            analysis.sentiment.label,
            analysis.category,
            analysis.severity,
            analysis.confidence * 100.0
        ));
    }

    if !result.recommended_actions.is_empty() {
        output.push_str("\n--- Recommended ---\n");
        for action in &result.recommended_actions {
            output.push_str(&format!("• {}\n", action.replace('_', " ")));
        }
    }

    if !result.resources.is_empty() {
        output.push_str("\n--- Resources ---\n");
        for resource in &result.resources {
            output.push_str(&format!(
                "• {} [{}]\n",
                resource.title,
                resource.resource_type.label()
            ));
        }
    }

    if result.crisis_detected() {
        output.push_str(&format!("\n{}\n", CRISIS_LINE_DISPLAY));
    }

    if !result.errors.is_empty() {
        output.push_str("\n--- Errors ---\n");
        for error in &result.errors {
            output.push_str(&format!("• {}\n", error));
        }
    }

    output
}

fn format_markdown(result: &NonInteractiveResult) -> String {
    let mut output = String::new();

    output.push_str("## Response\n\n");
    output.push_str(result.response.as_deref().unwrap_or("_No response_"));
    output.push_str("\n\n");

    if result.crisis_detected() {
        output.push_str(&format!("> **{}**\n\n", CRISIS_LINE_DISPLAY));
    }

    if let Some(analysis) = &result.analysis {
        output.push_str("## Analysis\n\n");
        output.push_str(&format!("- Sentiment: {:?}\n", analysis.sentiment.label));
        output.push_str(&format!("- Category: {:?}\n", analysis.category));
        output.push_str(&format!("- Severity: {:?}\n", analysis.severity));
        output.push_str(&format!(
            "- Confidence: {:.0}%\n\n",
            analysis.confidence * 100.0
        ));
    }

    if !result.recommended_actions.is_empty() {
        output.push_str("## Recommended Actions\n\n");
        for action in &result.recommended_actions {
            output.push_str(&format!("- `{}`\n", action));
        }
        output.push('\n');
    }

    if !result.resources.is_empty() {
        output.push_str("## Resources\n\n");
        for resource in &result.resources {
            match (&resource.url, &resource.phone_number) {
                (Some(url), _) => output.push_str(&format!("- [{}]({})\n", resource.title, url)),
                (None, Some(phone)) => {
                    output.push_str(&format!("- **{}**: {}\n", resource.title, phone))
                }
                (None, None) => output.push_str(&format!("- {}\n", resource.title)),
            }
        }
        output.push('\n');
    }

    if !result.errors.is_empty() {
        output.push_str("## Errors\n\n");
        for error in &result.errors {
            output.push_str(&format!("- {}\n", error));
        }
        output.push('\n');
    }

    output.push_str("---\n");
    output.push_str(&format!(
        "*Conversation: {} | Backend: {} | Duration: {}ms*\n",
        result
            .conversation_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "none".to_string()),
        result.metadata.api_url,
        result.metadata.duration_ms
    ));

    output
}
