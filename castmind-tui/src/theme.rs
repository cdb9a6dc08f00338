//! SynthBrute theme and color utilities.

use castmind_client::health::HealthIndicator;
use castmind_client::types::FeedStatus;
use ratatui::style::Color;

#[derive(Debug, Clone)]
pub struct SynthBruteTheme {
    pub bg: Color,
    pub bg_highlight: Color,
    pub primary: Color,
    pub primary_dim: Color,
    pub secondary: Color,
    pub tertiary: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub text: Color,
    pub text_dim: Color,
    pub border: Color,
    pub border_focus: Color,
}

impl SynthBruteTheme {
    pub fn synthbrute() -> Self {
        Self {
            bg: Color::Rgb(10, 10, 10),
            bg_highlight: Color::Rgb(42, 42, 42),
            primary: Color::Rgb(0, 255, 255),
            primary_dim: Color::Rgb(0, 136, 136),
            secondary: Color::Rgb(255, 0, 255),
            tertiary: Color::Rgb(255, 255, 0),
            success: Color::Rgb(0, 255, 0),
            warning: Color::Rgb(255, 255, 0),
            error: Color::Rgb(255, 0, 0),
            info: Color::Rgb(0, 255, 255),
            text: Color::Rgb(255, 255, 255),
            text_dim: Color::Rgb(136, 136, 136),
            border: Color::Rgb(68, 68, 68),
            border_focus: Color::Rgb(0, 255, 255),
        }
    }
}

pub fn feed_status_color(status: FeedStatus, theme: &SynthBruteTheme) -> Color {
    match status {
        FeedStatus::Active => theme.success,
        FeedStatus::Paused => theme.warning,
        FeedStatus::Error => theme.error,
        FeedStatus::Unknown => theme.text_dim,
    }
}

pub fn health_color(indicator: HealthIndicator, theme: &SynthBruteTheme) -> Color {
    match indicator {
        HealthIndicator::Checking => theme.text_dim,
        HealthIndicator::Healthy => theme.success,
        HealthIndicator::Unhealthy => theme.error,
    }
}

pub fn log_level_color(level: &str, theme: &SynthBruteTheme) -> Color {
    match level.trim().to_ascii_uppercase().as_str() {
        "DEBUG" => theme.text_dim,
        "INFO" => theme.info,
        "WARNING" | "WARN" => theme.warning,
        "ERROR" | "CRITICAL" => theme.error,
        _ => theme.text,
    }
}

/// Green below 70%, yellow below 90%, red above.
pub fn utilization_color(percent: f64, theme: &SynthBruteTheme) -> Color {
    if percent < 70.0 {
        theme.success
    } else if percent < 90.0 {
        theme.warning
    } else {
        theme.error
    }
}
