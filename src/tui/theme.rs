use ratatui::style::Color;

use crate::constants::SENTIMENT_NEUTRAL_BAND;
use crate::models::{ResourceType, Sender, Severity};

/// Colors used across the chat screen
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub header: Color,
    pub border: Color,
    pub border_focused: Color,

    pub user_message: Color,
    pub bot_message: Color,
    pub text_secondary: Color,

    pub crisis: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            header: Color::Cyan,
            border: Color::DarkGray,
            border_focused: Color::Cyan,
            user_message: Color::Blue,
            bot_message: Color::Green,
            text_secondary: Color::Gray,
            crisis: Color::Rgb(220, 50, 47),
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
        }
    }

    pub fn sender(&self, sender: Sender) -> Color {
        match sender {
            Sender::User => self.user_message,
            Sender::Bot => self.bot_message,
        }
    }

    pub fn resource_type(&self, resource_type: ResourceType) -> Color {
        match resource_type {
            ResourceType::Hotline => self.crisis,
            ResourceType::Therapy => Color::Magenta,
            ResourceType::Article => Color::Blue,
            ResourceType::Exercise => Color::Green,
            ResourceType::Other => self.text_secondary,
        }
    }

    pub fn severity(&self, severity: Severity) -> Color {
        match severity {
            Severity::High => self.error,
            Severity::Medium => self.warning,
            Severity::Low => self.success,
            Severity::Other => self.text_secondary,
        }
    }

    /// Color for a compound sentiment score in [-1, 1]
    pub fn sentiment(&self, compound: f64) -> Color {
        if compound > SENTIMENT_NEUTRAL_BAND {
            self.success
        } else if compound < -SENTIMENT_NEUTRAL_BAND {
            self.error
        } else {
            self.text_secondary
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentiment_bands() {
        let theme = Theme::dark();
        assert_eq!(theme.sentiment(0.6), theme.success);
        assert_eq!(theme.sentiment(0.05), theme.text_secondary);
        assert_eq!(theme.sentiment(-0.05), theme.text_secondary);
        assert_eq!(theme.sentiment(-0.4), theme.error);
    }

    #[test]
    fn test_hotlines_use_crisis_color() {
        let theme = Theme::dark();
        assert_eq!(theme.resource_type(ResourceType::Hotline), theme.crisis);
        assert_eq!(theme.severity(Severity::High), theme.error);
    }
}
