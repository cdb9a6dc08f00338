//! Dashboard view.

use super::helpers::{format_time, render_pending, truncate, two_column};
use crate::state::App;
use crate::theme::feed_status_color;
use crate::widgets::DetailPanel;
use castmind_client::controllers::StatCard;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(0)])
        .split(area);

    let stats = app.dashboard.stats_snapshot();
    if render_pending(f, rows[0], "概览", &stats, &app.theme) {
        render_cards(f, app, &app.dashboard.cards(), rows[0]);
    }

    let (left, right) = two_column(rows[1], 60);
    render_recent_feeds(f, app, left);
    render_system_info(f, app, right);
}

fn render_cards(f: &mut Frame<'_>, app: &App, cards: &[StatCard], area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(area);
    for (card, column) in cards.iter().zip(columns.iter()) {
        let change_color = if card.change.starts_with('-') && card.change != "--" {
            app.theme.error
        } else {
            app.theme.success
        };
        let text = vec![
            Line::from(Span::styled(
                card.value.to_string(),
                Style::default().fg(app.theme.primary).add_modifier(Modifier::BOLD),
            )),
            Line::from(vec![
                Span::styled(card.change.clone(), Style::default().fg(change_color)),
                Span::styled(format!(" {}", card.description), Style::default().fg(app.theme.text_dim)),
            ]),
        ];
        let widget = Paragraph::new(text).block(Block::default().title(card.title).borders(Borders::ALL));
        f.render_widget(widget, *column);
    }
}

fn render_recent_feeds(f: &mut Frame<'_>, app: &App, area: Rect) {
    let feeds = app.dashboard.recent_feeds();
    let items: Vec<ListItem> = if feeds.is_empty() {
        vec![ListItem::new("暂无订阅源")]
    } else {
        feeds
            .iter()
            .map(|feed| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{:<8}", feed.status.as_str()),
                        Style::default().fg(feed_status_color(feed.status, &app.theme)),
                    ),
                    Span::raw(truncate(&feed.name, 30)),
                    Span::styled(
                        format!("  {} 篇 • {}", feed.article_count, format_time(feed.last_fetch)),
                        Style::default().fg(app.theme.text_dim),
                    ),
                ]))
            })
            .collect()
    };
    let list = List::new(items).block(Block::default().title("最近订阅源").borders(Borders::ALL));
    f.render_widget(list, area);
}

fn render_system_info(f: &mut Frame<'_>, app: &App, area: Rect) {
    let health = app.dashboard.health().data;
    let config = app.dashboard.config().data;
    let yes_no = |b: bool| (if b { "是" } else { "否" }).to_string();

    DetailPanel::new("系统信息", Style::default().fg(app.theme.secondary))
        .optional("应用", config.as_ref().map(|c| c.app_name.clone()))
        .optional("版本", health.as_ref().map(|h| h.version.clone()))
        .optional("数据库", health.as_ref().map(|h| h.database.clone()))
        .optional("AI 服务", health.as_ref().and_then(|h| h.ai_service.clone()))
        .optional(
            "调度器",
            health
                .as_ref()
                .map(|h| if h.scheduler_running() { "运行中" } else { "已停止" }),
        )
        .optional(
            "抓取间隔",
            config.as_ref().map(|c| format!("{} 分钟", c.fetch_interval_minutes)),
        )
        .optional("调试模式", config.as_ref().map(|c| yes_no(c.debug)))
        .render(f, area);
}
