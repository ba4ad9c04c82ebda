/// Constants module to avoid magic numbers in the codebase

// Network Configuration
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8001/api";

// Timeouts
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const HEALTH_CHECK_TIMEOUT_SECS: u64 = 3;

// Chat pacing
pub const PRESENTATION_DELAY_MS: u64 = 1500;
pub const MAX_DRAFT_CHARACTERS: usize = 500;

// Log file written in the data directory while the TUI owns the terminal
pub const LOG_FILE_NAME: &str = "solace.log";

// UI Configuration
pub const UI_REFRESH_INTERVAL_MS: u64 = 50;
pub const UI_SCROLL_LINES: u16 = 3;

// Fixed bot texts
pub const WELCOME_MESSAGE: &str =
    "Hello! I'm here to provide mental health support and resources. How are you feeling today?";
pub const CLEARED_MESSAGE: &str = "Chat cleared. How can I help you today?";
pub const APOLOGY_MESSAGE: &str = "I'm sorry, I encountered an error. Please try again.";

// Crisis line (client-side shortcut, never a backend call)
pub const CRISIS_LINE_URI: &str = "tel:988";
pub const CRISIS_LINE_DISPLAY: &str = "Call or text 988 (Suicide & Crisis Lifeline)";

// Analysis thresholds used for display and logging
pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.8;
pub const SENTIMENT_NEUTRAL_BAND: f64 = 0.1;

pub const QUICK_SUGGESTIONS: &[&str] = &[
    "I'm feeling anxious",
    "I need help with sleep",
    "I'm feeling down",
    "I need coping strategies",
];
