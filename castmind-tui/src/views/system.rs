//! System page: overview, scheduler, config and logs tabs.

use super::helpers::{render_pending, two_column};
use crate::state::App;
use crate::theme::{log_level_color, utilization_color};
use crate::widgets::{DetailPanel, FilterBar, FilterOption, ProgressBar, StatusIndicator};
use castmind_client::controllers::SystemTab;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

const TABS: [SystemTab; 4] = [
    SystemTab::Overview,
    SystemTab::Scheduler,
    SystemTab::Config,
    SystemTab::Logs,
];

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let options: Vec<FilterOption> = TABS
        .iter()
        .map(|tab| FilterOption::new(tab.label(), *tab == app.system.tab()))
        .collect();
    FilterBar {
        title: "系统 [o]",
        filters: &options,
        active_style: Style::default()
            .fg(app.theme.bg)
            .bg(app.theme.tertiary)
            .add_modifier(Modifier::BOLD),
        inactive_style: Style::default().fg(app.theme.text_dim),
    }
    .render(f, rows[0]);

    match app.system.tab() {
        SystemTab::Overview => render_overview(f, app, rows[1]),
        SystemTab::Scheduler => render_scheduler(f, app, rows[1]),
        SystemTab::Config => render_config(f, app, rows[1]),
        SystemTab::Logs => render_logs(f, app, rows[1]),
    }
}

fn render_overview(f: &mut Frame<'_>, app: &App, area: Rect) {
    let (left, right) = two_column(area, 50);

    let health = app.system.health();
    if render_pending(f, left, "服务状态", &health, &app.theme) {
        if let Some(h) = health.data() {
            DetailPanel::new("服务状态", Style::default().fg(app.theme.secondary))
                .field("状态", h.status.clone())
                .optional("应用", h.app.clone())
                .field("版本", h.version.clone())
                .field("数据库", if h.database_connected() { "已连接" } else { "未连接" })
                .field("AI 服务", if h.ai_available() { "可用" } else { "不可用" })
                .field("检查时间", h.timestamp.format("%Y-%m-%d %H:%M:%S").to_string())
                .render(f, left);
        }
    }

    let stats = app.system.stats();
    if !render_pending(f, right, "资源使用", &stats, &app.theme) {
        return;
    }
    let Some(stats) = stats.data() else {
        return;
    };
    let gauges = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(right);
    let usage = &stats.system;
    for (i, (title, percent)) in [
        ("CPU", usage.cpu_percent),
        ("内存", usage.memory_percent),
        ("磁盘", usage.disk_usage),
    ]
    .into_iter()
    .enumerate()
    {
        ProgressBar {
            title,
            percent,
            style: Style::default().fg(utilization_color(percent, &app.theme)),
        }
        .render(f, gauges[i]);
    }
    DetailPanel::new("统计", Style::default().fg(app.theme.secondary))
        .field(
            "订阅源",
            format!(
                "{} (活跃 {} • 错误 {} • 暂停 {})",
                stats.feeds.total, stats.feeds.active, stats.feeds.error, stats.feeds.paused
            ),
        )
        .field(
            "文章",
            format!(
                "{} (未读 {} • 已处理 {})",
                stats.articles.total, stats.articles.unread, stats.articles.processed
            ),
        )
        .optional("平台", usage.platform.clone())
        .render(f, gauges[3]);
}

fn render_scheduler(f: &mut Frame<'_>, app: &App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let running = app.system.scheduler_running();
    StatusIndicator {
        title: "调度器",
        status: if running { "运行中" } else { "已停止" }.to_string(),
        style: Style::default().fg(if running { app.theme.success } else { app.theme.warning }),
    }
    .render(f, rows[0]);

    let enabled = Style::default().fg(app.theme.primary);
    let disabled = Style::default().fg(app.theme.text_dim);
    let actions = Line::from(vec![
        Span::styled(" [S] 启动 ", if app.system.can_start() { enabled } else { disabled }),
        Span::styled(" [X] 停止 ", if app.system.can_stop() { enabled } else { disabled }),
        Span::styled(
            if app.system.is_processing() { " [P] 处理中… " } else { " [P] 批量处理 " },
            if app.system.is_processing() { disabled } else { enabled },
        ),
    ]);
    f.render_widget(
        ratatui::widgets::Paragraph::new(actions)
            .block(Block::default().title("操作").borders(Borders::ALL)),
        rows[1],
    );

    if let Some(stats) = app.system.stats().data() {
        DetailPanel::new("任务", Style::default().fg(app.theme.secondary))
            .field("总数", stats.tasks.total.to_string())
            .field("运行中", stats.tasks.running.to_string())
            .field("成功率", format!("{:.1}%", stats.tasks.success_rate))
            .render(f, rows[2]);
    }
}

fn render_config(f: &mut Frame<'_>, app: &App, area: Rect) {
    let snapshot = app.system.config();
    if !render_pending(f, area, "配置", &snapshot, &app.theme) {
        return;
    }
    let Some(config) = snapshot.data() else {
        return;
    };
    let flag = |b: bool| (if b { "开启" } else { "关闭" }).to_string();
    DetailPanel::new("配置", Style::default().fg(app.theme.secondary))
        .field("应用名称", config.app_name.clone())
        .field("版本", config.app_version.clone())
        .field("地址", format!("{}:{}", config.host, config.port))
        .field("调试模式", flag(config.debug))
        .field("API 文档", flag(config.docs_enabled))
        .field("AI 服务", flag(config.ai_service_enabled))
        .field("调度器", flag(config.scheduler_enabled))
        .field("抓取间隔", format!("{} 分钟", config.fetch_interval_minutes))
        .field("清理周期", format!("{} 天", config.cleanup_days))
        .render(f, area);
}

fn render_logs(f: &mut Frame<'_>, app: &App, area: Rect) {
    let snapshot = app.system.logs();
    if !render_pending(f, area, "日志", &snapshot, &app.theme) {
        return;
    }
    let Some(logs) = snapshot.data() else {
        return;
    };
    let items: Vec<ListItem> = logs
        .logs
        .iter()
        .map(|line| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{} ", line.timestamp), Style::default().fg(app.theme.text_dim)),
                Span::styled(
                    format!("{:<8}", line.level),
                    Style::default().fg(log_level_color(&line.level, &app.theme)),
                ),
                Span::raw(line.message.clone()),
            ]))
        })
        .collect();
    let title = format!("日志 ({} 条)", logs.total);
    f.render_widget(
        List::new(items).block(Block::default().title(title).borders(Borders::ALL)),
        area,
    );
}
