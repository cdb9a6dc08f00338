//! Feed management view.

use super::helpers::{format_time, render_pending, truncate, two_column};
use crate::state::{App, FormField, InputMode};
use crate::theme::feed_status_color;
use crate::widgets::DetailPanel;
use castmind_client::controllers::FeedForm;
use castmind_client::MutationStatus;
use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    let (left, right) = two_column(area, 62);

    let snapshot = app.feeds.snapshot();
    let title = if app.feeds.is_busy() { "订阅源 (处理中…)" } else { "订阅源" };
    if render_pending(f, left, title, &snapshot, &app.theme) {
        render_table(f, app, title, left);
    }

    match (app.feeds.form(), &app.mode) {
        (Some(form), InputMode::Form(field)) => render_form(f, app, form, *field, right),
        _ => render_detail(f, app, right),
    }
}

fn render_table(f: &mut Frame<'_>, app: &App, title: &str, area: Rect) {
    let rows: Vec<Row> = app
        .feeds
        .rows()
        .into_iter()
        .map(|feed| {
            Row::new(vec![
                Cell::from(truncate(&feed.name, 24)),
                Cell::from(feed.category.clone().unwrap_or_default()),
                Cell::from(feed.status.as_str())
                    .style(Style::default().fg(feed_status_color(feed.status, &app.theme))),
                Cell::from(feed.article_count.to_string()),
                Cell::from(format_time(feed.last_fetch)),
            ])
        })
        .collect();

    let header = Row::new(vec!["名称", "分类", "状态", "文章", "最后抓取"])
        .style(Style::default().fg(app.theme.primary).add_modifier(Modifier::BOLD));
    let table = Table::new(
        rows,
        [
            Constraint::Percentage(34),
            Constraint::Percentage(12),
            Constraint::Percentage(12),
            Constraint::Percentage(10),
            Constraint::Percentage(32),
        ],
    )
    .header(header)
    .block(Block::default().title(title).borders(Borders::ALL))
    .highlight_style(Style::default().bg(app.theme.bg_highlight).fg(app.theme.primary));

    let mut state = TableState::default();
    state.select(app.feeds.current().map(|_| app.feeds.cursor()));
    f.render_stateful_widget(table, area, &mut state);
}

fn render_detail(f: &mut Frame<'_>, app: &App, area: Rect) {
    let Some(feed) = app.feeds.current() else {
        let empty = Paragraph::new("按 n 添加订阅源")
            .style(Style::default().fg(app.theme.text_dim))
            .block(Block::default().title("详情").borders(Borders::ALL));
        f.render_widget(empty, area);
        return;
    };
    DetailPanel::new("详情", Style::default().fg(app.theme.secondary))
        .field("ID", feed.id.to_string())
        .field("名称", feed.name.clone())
        .field("URL", feed.url.clone())
        .optional("分类", feed.category.clone())
        .field("状态", feed.status.to_string())
        .optional("抓取间隔", feed.interval.map(|s| format!("{s} 秒")))
        .optional("类型", feed.feed_type.clone())
        .field("文章数", feed.article_count.to_string())
        .field("最后抓取", format_time(feed.last_fetch))
        .render(f, area);
}

fn render_form(f: &mut Frame<'_>, app: &App, form: &FeedForm, focus: FormField, area: Rect) {
    let title = if form.editing.is_some() { "编辑订阅源" } else { "添加订阅源" };
    let mut fields = vec![
        (FormField::Name, "名称", form.name.clone()),
        (FormField::Url, "URL", form.url.clone()),
        (FormField::Category, "分类", format!("< {} >", form.category)),
        (FormField::Interval, "间隔(秒)", form.interval.to_string()),
    ];
    if form.editing.is_some() {
        fields.push((FormField::Status, "状态", format!("< {} >", form.status)));
    }

    let mut lines: Vec<Line> = fields
        .into_iter()
        .map(|(field, label, value)| {
            let style = if field == focus {
                Style::default().fg(app.theme.bg).bg(app.theme.primary)
            } else {
                Style::default().fg(app.theme.text)
            };
            Line::from(vec![
                Span::styled(format!("{label:<8}"), Style::default().fg(app.theme.secondary)),
                Span::styled(format!(" {value} "), style),
            ])
        })
        .collect();

    match app.feeds.form_status() {
        MutationStatus::Pending => lines.push(Line::from(Span::styled(
            "提交中…",
            Style::default().fg(app.theme.warning),
        ))),
        MutationStatus::Error(message) => lines.push(Line::from(Span::styled(
            message,
            Style::default().fg(app.theme.error),
        ))),
        MutationStatus::Idle | MutationStatus::Success => {}
    }

    let widget = Paragraph::new(lines).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(app.theme.border_focus)),
    );
    f.render_widget(widget, area);
}
