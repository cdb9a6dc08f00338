//! Article and excerpt list view. Both pages share one layout.

use super::helpers::{format_time, render_pending, truncate, two_column};
use crate::state::{App, InputMode};
use crate::widgets::{DetailPanel, FilterBar, FilterOption};
use castmind_client::controllers::ExcerptsController;
use castmind_client::types::Article;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, list: &ExcerptsController, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    render_status_tabs(f, app, list, rows[0]);
    render_search(f, app, list, rows[1]);

    let (left, right) = two_column(rows[2], 55);
    let snapshot = list.list_snapshot();
    if render_pending(f, left, "列表", &snapshot, &app.theme) {
        render_table(f, app, list, left);
    }
    render_preview(f, app, list, right);

    let mut pager = format!("第 {} 页 • {}", list.page(), list.range_label());
    if !list.selected().is_empty() {
        pager.push_str(&format!(" • 已选 {} 篇", list.selected().len()));
    }
    if snapshot.is_fetching {
        pager.push_str(" • 刷新中…");
    }
    if list.has_prev_page() {
        pager.push_str(" • [ 上一页");
    }
    if list.has_next_page() {
        pager.push_str(" • ] 下一页");
    }
    f.render_widget(
        Paragraph::new(pager).style(Style::default().fg(app.theme.text_dim)),
        rows[3],
    );
}

fn render_status_tabs(f: &mut Frame<'_>, app: &App, list: &ExcerptsController, area: Rect) {
    let options: Vec<FilterOption> = list
        .status_tabs()
        .iter()
        .map(|tab| FilterOption::new(format!("{} ({})", tab.label, tab.count), tab.filter == list.status()))
        .collect();
    FilterBar {
        title: "状态 [s]",
        filters: &options,
        active_style: Style::default()
            .fg(app.theme.bg)
            .bg(app.theme.secondary)
            .add_modifier(Modifier::BOLD),
        inactive_style: Style::default().fg(app.theme.text_dim),
    }
    .render(f, area);
}

fn render_search(f: &mut Frame<'_>, app: &App, list: &ExcerptsController, area: Rect) {
    let searching = app.mode == InputMode::Search;
    let cursor = if searching { "▏" } else { "" };
    let line = Line::from(vec![
        Span::styled("搜索: ", Style::default().fg(app.theme.secondary)),
        Span::raw(format!("{}{cursor}", list.search())),
        Span::styled(
            format!("   模板: {} [t]", list.active_template().name),
            Style::default().fg(app.theme.text_dim),
        ),
    ]);
    let border = if searching { app.theme.border_focus } else { app.theme.border };
    let widget = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border)),
    );
    f.render_widget(widget, area);
}

fn render_table(f: &mut Frame<'_>, app: &App, list: &ExcerptsController, area: Rect) {
    let visible = list.visible_rows();
    let rows: Vec<Row> = visible
        .iter()
        .map(|article| {
            let mark = if list.is_selected(article.id) { "[x]" } else { "[ ]" };
            let (state, color) = read_state(article, app);
            Row::new(vec![
                Cell::from(mark),
                Cell::from(truncate(&article.title, 40)),
                Cell::from(article.feed_name.clone().unwrap_or_default()),
                Cell::from(state).style(Style::default().fg(color)),
                Cell::from(format_time(article.published_at.or(Some(article.created_at)))),
            ])
        })
        .collect();

    let title = if list.search().trim().is_empty() {
        format!("{} 条", list.page_len())
    } else {
        format!("匹配 {} / {} 条", visible.len(), list.page_len())
    };
    let table = Table::new(
        rows,
        [
            Constraint::Length(3),
            Constraint::Percentage(45),
            Constraint::Percentage(20),
            Constraint::Length(6),
            Constraint::Percentage(25),
        ],
    )
    .header(
        Row::new(vec!["", "标题", "来源", "状态", "时间"])
            .style(Style::default().fg(app.theme.primary).add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().title(title).borders(Borders::ALL))
    .highlight_style(Style::default().bg(app.theme.bg_highlight).fg(app.theme.primary));

    let mut state = TableState::default();
    state.select(list.current_row().map(|_| list.cursor()));
    f.render_stateful_widget(table, area, &mut state);
}

fn read_state(article: &Article, app: &App) -> (&'static str, ratatui::style::Color) {
    if article.processed_status {
        ("已处理", app.theme.tertiary)
    } else if article.read_status {
        ("已读", app.theme.text_dim)
    } else {
        ("未读", app.theme.success)
    }
}

fn render_preview(f: &mut Frame<'_>, app: &App, list: &ExcerptsController, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(0)])
        .split(area);

    let Some(article) = list.current_row() else {
        let empty = Paragraph::new("没有文章")
            .style(Style::default().fg(app.theme.text_dim))
            .block(Block::default().title("详情").borders(Borders::ALL));
        f.render_widget(empty, area);
        return;
    };

    let tags = article.keyword_tags();
    DetailPanel::new("详情", Style::default().fg(app.theme.secondary))
        .field("ID", article.id.to_string())
        .field("URL", article.url.clone())
        .optional("情感", article.sentiment.clone())
        .optional("关键词", (!tags.is_empty()).then(|| tags.join(", ")))
        .render(f, chunks[0]);

    let (title, body, border) = match &app.mode {
        InputMode::Template(draft) => ("编辑模板 [Esc 保存]", draft.clone(), app.theme.border_focus),
        _ => {
            let body = list.render_current().map(|(_, doc)| doc).unwrap_or_default();
            ("文档预览 [c 导出 • e 编辑模板]", body, app.theme.border)
        }
    };
    let preview = Paragraph::new(body)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(preview, chunks[1]);
}
