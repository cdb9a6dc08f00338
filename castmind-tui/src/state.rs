//! Application state and input dispatch.

use crate::config::TuiConfig;
use crate::events::ActionOutcome;
use crate::export;
use crate::keys::{map_input_key, map_key, Action, InputAction};
use crate::nav::View;
use crate::notifications::{Notification, NotificationLevel, Notifications};
use crate::persistence::PersistedState;
use crate::theme::SynthBruteTheme;
use castmind_client::controllers::{
    DashboardController, ExcerptsController, FeedsController, PageController, SystemController,
};
use castmind_client::health::HealthMonitor;
use castmind_client::types::{FeedId, FeedStatus};
use castmind_client::{ClientContext, MutationStatus};
use crossterm::event::KeyEvent;
use futures_util::future::{BoxFuture, FutureExt};
use std::future::Future;

/// Field of the feed form that has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Url,
    Category,
    Interval,
    Status,
}

impl FormField {
    fn next(self, editing: bool) -> FormField {
        match self {
            FormField::Name => FormField::Url,
            FormField::Url => FormField::Category,
            FormField::Category => FormField::Interval,
            FormField::Interval if editing => FormField::Status,
            FormField::Interval | FormField::Status => FormField::Name,
        }
    }

    fn previous(self, editing: bool) -> FormField {
        match self {
            FormField::Name if editing => FormField::Status,
            FormField::Name => FormField::Interval,
            FormField::Url => FormField::Name,
            FormField::Category => FormField::Url,
            FormField::Interval => FormField::Category,
            FormField::Status => FormField::Interval,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
    Form(FormField),
    ConfirmDelete { id: FeedId, name: String },
    /// Editing the custom document template body.
    Template(String),
}

/// What the event loop should do after a key.
pub enum Effect {
    None,
    Quit,
    Spawn(BoxFuture<'static, ActionOutcome>),
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effect::None => f.write_str("None"),
            Effect::Quit => f.write_str("Quit"),
            Effect::Spawn(_) => f.write_str("Spawn(..)"),
        }
    }
}

fn spawn<T, E, F>(action: &'static str, fut: F, success: impl FnOnce(T) -> String + Send + 'static) -> Effect
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    Effect::Spawn(async move { ActionOutcome::from_result(action, fut.await, success) }.boxed())
}

pub struct App {
    pub config: TuiConfig,
    pub theme: SynthBruteTheme,
    pub ctx: ClientContext,
    pub health: HealthMonitor,
    pub active_view: View,
    pub dashboard: DashboardController,
    pub feeds: FeedsController,
    pub articles: ExcerptsController,
    pub excerpts: ExcerptsController,
    pub system: SystemController,
    pub notifications: Notifications,
    pub mode: InputMode,
}

impl App {
    /// Must be called inside a tokio runtime: mounting the first page starts
    /// its fetches.
    pub fn new(config: TuiConfig, ctx: ClientContext) -> Self {
        let page_size = config.page_size;
        let health = HealthMonitor::with_interval(&ctx, config.health_poll());
        let mut app = Self {
            theme: SynthBruteTheme::synthbrute(),
            health,
            active_view: View::Dashboard,
            dashboard: DashboardController::new(ctx.clone()),
            feeds: FeedsController::new(ctx.clone()),
            articles: ExcerptsController::articles(ctx.clone(), page_size),
            excerpts: ExcerptsController::excerpts(ctx.clone(), page_size),
            system: SystemController::with_health_poll(ctx.clone(), config.system_health_poll()),
            notifications: Notifications::default(),
            mode: InputMode::Normal,
            config,
            ctx,
        };
        app.page_mut(View::Dashboard).mount();
        app
    }

    pub fn restore(&mut self, state: &PersistedState) {
        if let Some(id) = state.template_id.as_deref() {
            self.excerpts.select_template(id);
            self.articles.select_template(id);
        }
        self.switch_view(state.active_view);
    }

    pub fn persisted(&self) -> PersistedState {
        PersistedState {
            active_view: self.active_view,
            template_id: Some(self.excerpts.active_template().id.to_string()),
        }
    }

    pub fn notify(&mut self, level: NotificationLevel, message: impl Into<String>) {
        self.notifications.push(Notification::new(level, message));
    }

    pub fn page(&self, view: View) -> &dyn PageController {
        match view {
            View::Dashboard => &self.dashboard,
            View::Feeds => &self.feeds,
            View::Articles => &self.articles,
            View::Excerpts => &self.excerpts,
            View::System => &self.system,
        }
    }

    fn page_mut(&mut self, view: View) -> &mut dyn PageController {
        match view {
            View::Dashboard => &mut self.dashboard,
            View::Feeds => &mut self.feeds,
            View::Articles => &mut self.articles,
            View::Excerpts => &mut self.excerpts,
            View::System => &mut self.system,
        }
    }

    /// Leaving a page releases its subscriptions; the cache keeps the data
    /// for the GC grace period.
    pub fn switch_view(&mut self, view: View) {
        if view == self.active_view && self.page(view).is_mounted() {
            return;
        }
        let previous = self.active_view;
        self.page_mut(previous).unmount();
        self.active_view = view;
        self.mode = InputMode::Normal;
        self.page_mut(view).mount();
        tracing::debug!(from = ?previous, to = ?view, "switched view");
    }

    /// The article list of the active page, if it has one.
    pub fn list(&self) -> Option<&ExcerptsController> {
        match self.active_view {
            View::Articles => Some(&self.articles),
            View::Excerpts => Some(&self.excerpts),
            _ => None,
        }
    }

    fn list_mut(&mut self) -> Option<&mut ExcerptsController> {
        match self.active_view {
            View::Articles => Some(&mut self.articles),
            View::Excerpts => Some(&mut self.excerpts),
            _ => None,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Effect {
        match self.mode {
            InputMode::Normal | InputMode::ConfirmDelete { .. } => match map_key(key) {
                Some(action) => self.handle_action(action),
                None => Effect::None,
            },
            InputMode::Search | InputMode::Form(_) | InputMode::Template(_) => {
                match map_input_key(key) {
                    Some(input) => self.handle_input(input),
                    None => Effect::None,
                }
            }
        }
    }

    pub fn handle_outcome(&mut self, outcome: ActionOutcome) {
        if let InputMode::Form(_) = self.mode {
            if self.feeds.form_status() == MutationStatus::Success {
                self.feeds.close_form();
                self.mode = InputMode::Normal;
            }
        }
        self.notify(outcome.level, outcome.message);
    }

    pub fn handle_action(&mut self, action: Action) -> Effect {
        if let InputMode::ConfirmDelete { id, name } = &self.mode {
            let (id, name) = (*id, name.clone());
            self.mode = InputMode::Normal;
            return match action {
                Action::Confirm => spawn("删除订阅源", self.feeds.delete(id), move |()| {
                    format!("已删除订阅源 {name}")
                }),
                Action::Quit => Effect::Quit,
                _ => Effect::None,
            };
        }

        match action {
            Action::Quit => return Effect::Quit,
            Action::NextView => self.switch_view(self.active_view.next()),
            Action::PrevView => self.switch_view(self.active_view.previous()),
            Action::SwitchView(index) => {
                if let Some(view) = View::from_index(index) {
                    self.switch_view(view);
                }
            }
            Action::Refresh => {
                let count = self.page(self.active_view).refresh();
                self.notify(NotificationLevel::Info, format!("刷新 {count} 个查询"));
            }
            _ => {
                return match self.active_view {
                    View::Dashboard => Effect::None,
                    View::Feeds => self.feeds_action(action),
                    View::Articles | View::Excerpts => self.list_action(action),
                    View::System => self.system_action(action),
                }
            }
        }
        Effect::None
    }

    fn feeds_action(&mut self, action: Action) -> Effect {
        match action {
            Action::MoveUp => self.feeds.move_cursor(-1),
            Action::MoveDown => self.feeds.move_cursor(1),
            Action::NewItem => {
                self.feeds.open_new_form();
                self.mode = InputMode::Form(FormField::Name);
            }
            Action::EditItem | Action::Confirm => {
                if let Some(feed) = self.feeds.current() {
                    self.feeds.open_edit_form(&feed);
                    self.mode = InputMode::Form(FormField::Name);
                }
            }
            Action::DeleteItem => {
                if let Some(feed) = self.feeds.current() {
                    self.notify(
                        NotificationLevel::Warning,
                        format!("确认删除订阅源 {}? (y/Enter 确认, Esc 取消)", feed.name),
                    );
                    self.mode = InputMode::ConfirmDelete {
                        id: feed.id,
                        name: feed.name,
                    };
                }
            }
            Action::FetchFeed => {
                if let Some(feed) = self.feeds.current() {
                    let name = feed.name.clone();
                    return spawn("抓取订阅源", self.feeds.fetch(feed.id), move |_| {
                        format!("已抓取 {name}")
                    });
                }
            }
            Action::FetchAll => {
                if self.feeds.is_fetching_all() {
                    self.notify(NotificationLevel::Info, "正在抓取全部订阅源");
                } else {
                    return spawn("抓取全部", self.feeds.fetch_all(), |ack| {
                        ack.message.unwrap_or_else(|| "已开始抓取全部订阅源".to_string())
                    });
                }
            }
            _ => {}
        }
        Effect::None
    }

    fn list_action(&mut self, action: Action) -> Effect {
        let export_dir = self.config.export_dir.clone();
        let Some(list) = self.list_mut() else {
            return Effect::None;
        };
        let mut notice = None;
        let effect = match action {
            Action::MoveUp => {
                list.move_cursor(-1);
                Effect::None
            }
            Action::MoveDown => {
                list.move_cursor(1);
                Effect::None
            }
            Action::NextPage => {
                list.next_page();
                Effect::None
            }
            Action::PrevPage => {
                list.prev_page();
                Effect::None
            }
            Action::Select => {
                if let Some(article) = list.current_row() {
                    list.toggle_selected(article.id);
                }
                Effect::None
            }
            Action::SelectAll => {
                list.toggle_select_all();
                Effect::None
            }
            Action::Cancel => {
                list.clear_selection();
                Effect::None
            }
            Action::CycleStatus => {
                list.cycle_status();
                Effect::None
            }
            Action::CycleTemplate => {
                list.cycle_template();
                notice = Some((
                    NotificationLevel::Info,
                    format!("模板: {}", list.active_template().name),
                ));
                Effect::None
            }
            Action::OpenSearch => {
                self.mode = InputMode::Search;
                return Effect::None;
            }
            Action::EditItem => {
                let body = list.template_body().to_string();
                self.mode = InputMode::Template(body);
                return Effect::None;
            }
            Action::MarkRead if !list.selected().is_empty() => {
                let fut = list.mark_selected_read();
                list.clear_selection();
                spawn("批量标记已读", fut, |count| format!("已标记 {count} 篇为已读"))
            }
            Action::MarkRead => match list.current_row() {
                Some(article) => spawn("标记已读", list.mark_read(article.id), |a| {
                    format!("已读: {}", a.title)
                }),
                None => Effect::None,
            },
            Action::MarkUnread => match list.current_row() {
                Some(article) => spawn("标记未读", list.mark_unread(article.id), |a| {
                    format!("未读: {}", a.title)
                }),
                None => Effect::None,
            },
            Action::Confirm => match list.current_row() {
                Some(article) => spawn("切换阅读状态", list.toggle_read(&article), |a| {
                    let state = if a.read_status { "已读" } else { "未读" };
                    format!("{state}: {}", a.title)
                }),
                None => Effect::None,
            },
            Action::ExportTemplate => {
                notice = Some(export_current(list, &export_dir));
                Effect::None
            }
            _ => Effect::None,
        };
        if let Some((level, message)) = notice {
            self.notify(level, message);
        }
        effect
    }

    fn system_action(&mut self, action: Action) -> Effect {
        match action {
            Action::NextTab => self.system.next_tab(),
            Action::StartScheduler if self.system.can_start() => {
                return spawn("启动调度器", self.system.start_scheduler(), |ack| {
                    ack.message.unwrap_or_else(|| "调度器已启动".to_string())
                });
            }
            Action::StopScheduler if self.system.can_stop() => {
                return spawn("停止调度器", self.system.stop_scheduler(), |ack| {
                    ack.message.unwrap_or_else(|| "调度器已停止".to_string())
                });
            }
            Action::StartScheduler | Action::StopScheduler => {
                self.notify(NotificationLevel::Info, "调度器当前状态不允许该操作");
            }
            Action::ProcessAll if !self.system.is_processing() => {
                return spawn("批量处理", self.system.process_all(), |ack| {
                    ack.message.unwrap_or_else(|| "已开始处理全部文章".to_string())
                });
            }
            _ => {}
        }
        Effect::None
    }

    fn handle_input(&mut self, input: InputAction) -> Effect {
        match self.mode.clone() {
            InputMode::Search => self.search_input(input),
            InputMode::Form(field) => return self.form_input(field, input),
            InputMode::Template(body) => self.template_input(body, input),
            InputMode::Normal | InputMode::ConfirmDelete { .. } => {}
        }
        Effect::None
    }

    fn search_input(&mut self, input: InputAction) {
        let Some(list) = self.list_mut() else {
            self.mode = InputMode::Normal;
            return;
        };
        let mut query = list.search().to_string();
        let mut done = false;
        match input {
            InputAction::Char(c) => query.push(c),
            InputAction::Backspace => {
                query.pop();
            }
            InputAction::Submit => done = true,
            InputAction::Cancel => {
                query.clear();
                done = true;
            }
            _ => {}
        }
        list.set_search(query);
        if done {
            self.mode = InputMode::Normal;
        }
    }

    fn form_input(&mut self, field: FormField, input: InputAction) -> Effect {
        let Some(form) = self.feeds.form_mut() else {
            self.mode = InputMode::Normal;
            return Effect::None;
        };
        let editing = form.editing.is_some();
        match input {
            InputAction::Char(c) => match field {
                FormField::Name => form.name.push(c),
                FormField::Url => form.url.push(c),
                FormField::Interval => {
                    if let Some(digit) = c.to_digit(10) {
                        form.interval = form
                            .interval
                            .saturating_mul(10)
                            .saturating_add(u64::from(digit));
                    }
                }
                FormField::Category | FormField::Status => {}
            },
            InputAction::Backspace => match field {
                FormField::Name => {
                    form.name.pop();
                }
                FormField::Url => {
                    form.url.pop();
                }
                FormField::Interval => form.interval /= 10,
                FormField::Category | FormField::Status => {}
            },
            InputAction::NextField => self.mode = InputMode::Form(field.next(editing)),
            InputAction::PrevField => self.mode = InputMode::Form(field.previous(editing)),
            InputAction::Adjust(up) => match field {
                FormField::Category => form.cycle_category(),
                FormField::Interval => form.step_interval(up),
                FormField::Status => {
                    form.status = match form.status {
                        FeedStatus::Active => FeedStatus::Paused,
                        _ => FeedStatus::Active,
                    };
                }
                FormField::Name | FormField::Url => {}
            },
            InputAction::Cancel => {
                self.feeds.close_form();
                self.mode = InputMode::Normal;
            }
            InputAction::Submit => {
                let action = if editing { "更新订阅源" } else { "添加订阅源" };
                return match self.feeds.submit_form() {
                    Ok(fut) => spawn(action, fut, move |feed| format!("{action}成功: {}", feed.name)),
                    Err(err) => {
                        self.notify(NotificationLevel::Error, err.to_string());
                        Effect::None
                    }
                };
            }
        }
        Effect::None
    }

    fn template_input(&mut self, mut body: String, input: InputAction) {
        match input {
            InputAction::Char(c) => body.push(c),
            InputAction::Backspace => {
                body.pop();
            }
            InputAction::Submit => body.push('\n'),
            InputAction::Cancel => {
                if let Some(list) = self.list_mut() {
                    list.set_custom_template(body);
                }
                self.mode = InputMode::Normal;
                self.notify(NotificationLevel::Info, "模板已更新");
                return;
            }
            _ => {}
        }
        self.mode = InputMode::Template(body);
    }
}

fn export_current(
    list: &ExcerptsController,
    dir: &std::path::Path,
) -> (NotificationLevel, String) {
    let Some((article, document)) = list.render_current() else {
        return (NotificationLevel::Warning, export::ExportError::NothingSelected.to_string());
    };
    let active = list.active_template();
    let template_id = if list.template_body() == active.body {
        active.id
    } else {
        "custom"
    };
    match export::write_document(dir, &article, template_id, &document) {
        Ok(path) => (
            NotificationLevel::Success,
            format!("已导出到 {}", path.display()),
        ),
        Err(err) => {
            tracing::warn!(error = %err, "export failed");
            (NotificationLevel::Error, format!("导出失败: {err}"))
        }
    }
}
