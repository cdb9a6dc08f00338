//! View rendering dispatch.

pub mod dashboard;
pub mod excerpts;
pub mod feeds;
pub mod helpers;
pub mod system;

use crate::nav::View;
use crate::state::{App, InputMode};
use crate::theme::health_color;
use crate::widgets::{FilterBar, FilterOption};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Footer notifications older than this fall back to the key help.
const NOTICE_TTL_SECS: i64 = 8;

pub fn render_view(f: &mut Frame<'_>, app: &App) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.size());

    render_header(f, app, layout[0]);
    render_tabs(f, app, layout[1]);

    match app.active_view {
        View::Dashboard => dashboard::render(f, app, layout[2]),
        View::Feeds => feeds::render(f, app, layout[2]),
        View::Articles => excerpts::render(f, app, &app.articles, layout[2]),
        View::Excerpts => excerpts::render(f, app, &app.excerpts, layout[2]),
        View::System => system::render(f, app, layout[2]),
    }

    render_footer(f, app, layout[3]);
}

fn render_header(f: &mut Frame<'_>, app: &App, area: Rect) {
    let indicator = app.health.indicator();
    let version = app
        .health
        .snapshot()
        .data
        .map(|h| format!(" v{}", h.version))
        .unwrap_or_default();
    let line = Line::from(vec![
        Span::styled(
            "CastMind 控制台",
            Style::default().fg(app.theme.primary).add_modifier(Modifier::BOLD),
        ),
        Span::styled(version, Style::default().fg(app.theme.text_dim)),
        Span::raw("  |  "),
        Span::styled(
            format!("● {}", indicator.label()),
            Style::default().fg(health_color(indicator, &app.theme)),
        ),
    ]);
    let header = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(app.theme.border)),
    );
    f.render_widget(header, area);
}

fn render_tabs(f: &mut Frame<'_>, app: &App, area: Rect) {
    let options: Vec<FilterOption> = View::all()
        .iter()
        .enumerate()
        .map(|(i, view)| FilterOption::new(format!("{} {}", i + 1, view.title()), *view == app.active_view))
        .collect();
    FilterBar {
        title: "页面",
        filters: &options,
        active_style: Style::default()
            .fg(app.theme.bg)
            .bg(app.theme.primary)
            .add_modifier(Modifier::BOLD),
        inactive_style: Style::default().fg(app.theme.text_dim),
    }
    .render(f, area);
}

pub fn help_text(app: &App) -> &'static str {
    match &app.mode {
        InputMode::Search => "输入搜索关键词 • Enter 确定 • Esc 清除",
        InputMode::Form(_) => "Tab/↑↓ 切换字段 • ←→ 调整 • Enter 提交 • Esc 取消",
        InputMode::Template(_) => "编辑模板 • Enter 换行 • Esc 保存并返回",
        InputMode::ConfirmDelete { .. } => "y/Enter 确认删除 • 任意其他键取消",
        InputMode::Normal => match app.active_view {
            View::Dashboard => "Tab/1-5 切换页面 • Ctrl-R 刷新 • q 退出",
            View::Feeds => "j/k 移动 • n 新建 • e 编辑 • d 删除 • f 抓取 • F 全部抓取 • q 退出",
            View::Articles | View::Excerpts => {
                "j/k 移动 • [ ] 翻页 • s 状态 • / 搜索 • space 选择 • a 全选 • r/u 已读/未读 • t 模板 • e 编辑模板 • c 导出"
            }
            View::System => "o 切换标签 • S 启动 • X 停止 • P 批量处理 • Ctrl-R 刷新 • q 退出",
        },
    }
}

fn render_footer(f: &mut Frame<'_>, app: &App, area: Rect) {
    let now = chrono::Utc::now();
    let notice = app
        .notifications
        .last()
        .filter(|n| n.is_recent(now, chrono::Duration::seconds(NOTICE_TTL_SECS)));
    let (text, style) = match (notice, &app.mode) {
        (Some(note), InputMode::Normal | InputMode::ConfirmDelete { .. }) => {
            let color = helpers::level_color(note.level, &app.theme);
            (
                format!("{}: {}", note.level.label(), note.message),
                Style::default().fg(color),
            )
        }
        _ => (help_text(app).to_string(), Style::default().fg(app.theme.text_dim)),
    };
    let footer = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL))
        .style(style);
    f.render_widget(footer, area);
}
