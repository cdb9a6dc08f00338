//! System page: health, resource usage, scheduler control, config and logs.

use super::PageController;
use crate::api_client::ApiClientError;
use crate::context::ClientContext;
use crate::mutation::Mutation;
use crate::queries;
use crate::query::{QueryKey, QuerySnapshot, Subscription};
use crate::types::{ActionAck, Health, SystemConfig, SystemLogs, SystemStats};
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SystemTab {
    #[default]
    Overview,
    Scheduler,
    Config,
    Logs,
}

impl SystemTab {
    pub const ALL: [SystemTab; 4] = [
        SystemTab::Overview,
        SystemTab::Scheduler,
        SystemTab::Config,
        SystemTab::Logs,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SystemTab::Overview => "概览",
            SystemTab::Scheduler => "调度器",
            SystemTab::Config => "配置",
            SystemTab::Logs => "日志",
        }
    }

    pub fn next(&self) -> SystemTab {
        let idx = Self::ALL.iter().position(|t| t == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

pub struct SystemController {
    ctx: ClientContext,
    health_poll: Duration,
    tab: SystemTab,
    health: Option<Subscription<Health>>,
    stats: Option<Subscription<SystemStats>>,
    config: Option<Subscription<SystemConfig>>,
    logs: Option<Subscription<SystemLogs>>,
    start: Mutation<(), ActionAck>,
    stop: Mutation<(), ActionAck>,
    process_all: Mutation<(), ActionAck>,
}

impl std::fmt::Debug for SystemController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemController")
            .field("tab", &self.tab)
            .field("health_poll", &self.health_poll)
            .field("mounted", &self.is_mounted())
            .finish()
    }
}

impl SystemController {
    pub fn new(ctx: ClientContext) -> Self {
        Self::with_health_poll(ctx, queries::SYSTEM_HEALTH_POLL)
    }

    pub fn with_health_poll(ctx: ClientContext, health_poll: Duration) -> Self {
        let api = ctx.api.clone();
        let start = Mutation::new("start_scheduler", {
            let api = api.clone();
            move |_: ()| {
                let api = api.clone();
                async move { api.start_scheduler().await }
            }
        })
        .invalidates(QueryKey::new(queries::HEALTH));
        let stop = Mutation::new("stop_scheduler", {
            let api = api.clone();
            move |_: ()| {
                let api = api.clone();
                async move { api.stop_scheduler().await }
            }
        })
        .invalidates(QueryKey::new(queries::HEALTH));
        let process_all = Mutation::new("process_all", move |_: ()| {
            let api = api.clone();
            async move { api.process_all().await }
        })
        .invalidates(QueryKey::new(queries::HEALTH))
        .invalidates(QueryKey::new(queries::EXCERPTS))
        .invalidates(QueryKey::new(queries::EXCERPT_STATS));

        Self {
            ctx,
            health_poll,
            tab: SystemTab::default(),
            health: None,
            stats: None,
            config: None,
            logs: None,
            start,
            stop,
            process_all,
        }
    }

    pub fn tab(&self) -> SystemTab {
        self.tab
    }

    pub fn set_tab(&mut self, tab: SystemTab) {
        self.tab = tab;
    }

    pub fn next_tab(&mut self) {
        self.tab = self.tab.next();
    }

    pub fn health(&self) -> QuerySnapshot<Health> {
        self.ctx.cache.snapshot(&QueryKey::new(queries::HEALTH))
    }

    pub fn stats(&self) -> QuerySnapshot<SystemStats> {
        self.ctx.cache.snapshot(&QueryKey::new(queries::STATS))
    }

    pub fn config(&self) -> QuerySnapshot<SystemConfig> {
        self.ctx.cache.snapshot(&QueryKey::new(queries::CONFIG))
    }

    pub fn logs(&self) -> QuerySnapshot<SystemLogs> {
        self.ctx.cache.snapshot(&QueryKey::new(queries::LOGS))
    }

    pub fn scheduler_running(&self) -> bool {
        self.health()
            .data
            .map(|h| h.scheduler_running())
            .unwrap_or(false)
    }

    fn scheduler_pending(&self) -> bool {
        self.start.is_pending() || self.stop.is_pending()
    }

    pub fn can_start(&self) -> bool {
        !self.scheduler_pending() && !self.scheduler_running()
    }

    pub fn can_stop(&self) -> bool {
        !self.scheduler_pending() && self.scheduler_running()
    }

    pub fn is_processing(&self) -> bool {
        self.process_all.is_pending()
    }

    pub fn start_scheduler(&self) -> impl Future<Output = Result<ActionAck, ApiClientError>> + Send + 'static {
        let coordinator = self.ctx.mutations.clone();
        let mutation = self.start.clone();
        async move { coordinator.run(&mutation, ()).await }
    }

    pub fn stop_scheduler(&self) -> impl Future<Output = Result<ActionAck, ApiClientError>> + Send + 'static {
        let coordinator = self.ctx.mutations.clone();
        let mutation = self.stop.clone();
        async move { coordinator.run(&mutation, ()).await }
    }

    pub fn process_all(&self) -> impl Future<Output = Result<ActionAck, ApiClientError>> + Send + 'static {
        let coordinator = self.ctx.mutations.clone();
        let mutation = self.process_all.clone();
        async move { coordinator.run(&mutation, ()).await }
    }

    pub fn health_subscription_mut(&mut self) -> Option<&mut Subscription<Health>> {
        self.health.as_mut()
    }
}

impl PageController for SystemController {
    fn mount(&mut self) {
        let cache = &self.ctx.cache;
        let api = &self.ctx.api;
        if self.health.is_none() {
            self.health = Some(cache.subscribe(&queries::health(api, self.health_poll)));
        }
        if self.stats.is_none() {
            self.stats = Some(cache.subscribe(&queries::stats(api)));
        }
        if self.config.is_none() {
            self.config = Some(cache.subscribe(&queries::config(api)));
        }
        if self.logs.is_none() {
            self.logs = Some(cache.subscribe(&queries::logs(api)));
        }
    }

    fn unmount(&mut self) {
        self.health = None;
        self.stats = None;
        self.config = None;
        self.logs = None;
    }

    fn is_mounted(&self) -> bool {
        self.health.is_some()
    }

    fn refresh(&self) -> usize {
        [queries::HEALTH, queries::STATS, queries::CONFIG, queries::LOGS]
            .into_iter()
            .map(|name| self.ctx.cache.invalidate(&QueryKey::new(name)))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tabs_cycle_in_order() {
        let mut tab = SystemTab::default();
        let labels: Vec<&str> = (0..4)
            .map(|_| {
                let label = tab.label();
                tab = tab.next();
                label
            })
            .collect();
        assert_eq!(labels, vec!["概览", "调度器", "配置", "日志"]);
        assert_eq!(tab, SystemTab::Overview);
    }
}
