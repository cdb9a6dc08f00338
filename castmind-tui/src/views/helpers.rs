//! Shared rendering helpers.

use crate::notifications::NotificationLevel;
use crate::theme::SynthBruteTheme;
use castmind_client::QuerySnapshot;
use chrono::{DateTime, Utc};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

pub fn level_color(level: NotificationLevel, theme: &SynthBruteTheme) -> Color {
    match level {
        NotificationLevel::Info => theme.info,
        NotificationLevel::Warning => theme.warning,
        NotificationLevel::Error => theme.error,
        NotificationLevel::Success => theme.success,
    }
}

pub fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "--".to_string())
}

/// Char-aware truncation with an ellipsis.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{cut}…")
}

/// Draws a placeholder and returns `false` when there is nothing to render
/// yet. Cached data is still shown while a refetch is running or after one
/// failed.
pub fn render_pending<T>(
    f: &mut Frame<'_>,
    area: Rect,
    title: &str,
    snapshot: &QuerySnapshot<T>,
    theme: &SynthBruteTheme,
) -> bool {
    if snapshot.data.is_some() {
        return true;
    }
    let (text, color) = match &snapshot.error {
        Some(err) => (format!("加载失败: {err}"), theme.error),
        None => ("加载中…".to_string(), theme.text_dim),
    };
    let widget = Paragraph::new(text)
        .style(Style::default().fg(color))
        .block(Block::default().title(title).borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    f.render_widget(widget, area);
    false
}

pub fn two_column(area: Rect, left_percent: u16) -> (Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(left_percent),
            Constraint::Percentage(100 - left_percent),
        ])
        .split(area);
    (chunks[0], chunks[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn truncate_counts_chars_not_bytes() {
        assert_eq!(truncate("播客处理系统", 10), "播客处理系统");
        assert_eq!(truncate("播客处理系统", 4), "播客处…");
        assert_eq!(truncate("abc", 3), "abc");
    }

    #[test]
    fn missing_time_renders_placeholder() {
        assert_eq!(format_time(None), "--");
        let t = Utc.with_ymd_and_hms(2024, 3, 9, 8, 5, 0).unwrap();
        assert_eq!(format_time(Some(t)), "2024-03-09 08:05");
    }
}
