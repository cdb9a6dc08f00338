//! Dashboard: stat cards, recent feeds and system info.

use super::PageController;
use crate::context::ClientContext;
use crate::queries;
use crate::query::{QueryKey, QuerySnapshot, Subscription};
use crate::types::{Feed, Health, SystemConfig, SystemStats, Trends};

pub const RECENT_FEEDS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatCard {
    pub title: &'static str,
    pub value: u64,
    pub change: String,
    pub description: &'static str,
}

/// `+N` for growth, `-N` for decline, `--` when unknown or zero.
pub fn change_label(change: Option<i64>) -> String {
    match change {
        Some(n) if n > 0 => format!("+{n}"),
        Some(n) if n < 0 => n.to_string(),
        _ => "--".to_string(),
    }
}

pub fn weekly_label(weekly: Option<i64>) -> String {
    match weekly {
        Some(n) if n != 0 => format!("+{n}"),
        _ => "--".to_string(),
    }
}

pub fn rate_label(rate: Option<f64>) -> String {
    format!("{:.1}%", rate.filter(|r| r.is_finite()).unwrap_or(0.0))
}

pub fn stat_cards(stats: &SystemStats, trends: &Trends) -> [StatCard; 4] {
    [
        StatCard {
            title: "订阅源",
            value: stats.feeds.total,
            change: change_label(trends.feeds.as_ref().and_then(|t| t.change)),
            description: "活跃订阅源",
        },
        StatCard {
            title: "文章总数",
            value: stats.articles.total,
            change: weekly_label(trends.articles.as_ref().and_then(|t| t.weekly)),
            description: "本周新增",
        },
        StatCard {
            title: "未读文章",
            value: stats.articles.unread,
            change: change_label(trends.unread_articles.as_ref().and_then(|t| t.change)),
            description: "比昨天变化",
        },
        StatCard {
            title: "任务执行",
            value: stats.tasks.total,
            change: rate_label(trends.tasks.as_ref().and_then(|t| t.success_rate)),
            description: "成功率",
        },
    ]
}

#[derive(Debug)]
pub struct DashboardController {
    ctx: ClientContext,
    stats: Option<Subscription<SystemStats>>,
    trends: Option<Subscription<Trends>>,
    feeds: Option<Subscription<Vec<Feed>>>,
    config: Option<Subscription<SystemConfig>>,
}

impl DashboardController {
    pub fn new(ctx: ClientContext) -> Self {
        Self {
            ctx,
            stats: None,
            trends: None,
            feeds: None,
            config: None,
        }
    }

    /// True until stats have loaded once.
    pub fn is_loading(&self) -> bool {
        self.stats_snapshot().data.is_none()
    }

    pub fn stats_snapshot(&self) -> QuerySnapshot<SystemStats> {
        self.ctx.cache.snapshot(&QueryKey::new(queries::STATS))
    }

    pub fn cards(&self) -> [StatCard; 4] {
        let stats = self.stats_snapshot().data.map(|s| (*s).clone()).unwrap_or_default();
        let trends = self
            .ctx
            .cache
            .snapshot::<Trends>(&QueryKey::new(queries::TRENDS))
            .data
            .map(|t| (*t).clone())
            .unwrap_or_default();
        stat_cards(&stats, &trends)
    }

    pub fn recent_feeds(&self) -> Vec<Feed> {
        self.ctx
            .cache
            .snapshot::<Vec<Feed>>(&QueryKey::new(queries::FEEDS))
            .data
            .map(|feeds| feeds.iter().take(RECENT_FEEDS).cloned().collect())
            .unwrap_or_default()
    }

    pub fn config(&self) -> QuerySnapshot<SystemConfig> {
        self.ctx.cache.snapshot(&QueryKey::new(queries::CONFIG))
    }

    /// Shared with the header indicator, which keeps it polled.
    pub fn health(&self) -> QuerySnapshot<Health> {
        self.ctx.cache.snapshot(&QueryKey::new(queries::HEALTH))
    }
}

impl PageController for DashboardController {
    fn mount(&mut self) {
        let cache = &self.ctx.cache;
        let api = &self.ctx.api;
        if self.stats.is_none() {
            self.stats = Some(cache.subscribe(&queries::stats(api)));
        }
        if self.trends.is_none() {
            self.trends = Some(cache.subscribe(&queries::trends(api)));
        }
        if self.feeds.is_none() {
            self.feeds = Some(cache.subscribe(&queries::feeds(api)));
        }
        if self.config.is_none() {
            self.config = Some(cache.subscribe(&queries::config(api)));
        }
    }

    fn unmount(&mut self) {
        self.stats = None;
        self.trends = None;
        self.feeds = None;
        self.config = None;
    }

    fn is_mounted(&self) -> bool {
        self.stats.is_some()
    }

    fn refresh(&self) -> usize {
        [queries::STATS, queries::TRENDS, queries::FEEDS, queries::CONFIG]
            .into_iter()
            .map(|name| self.ctx.cache.invalidate(&QueryKey::new(name)))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChangeTrend, RateTrend, WeeklyTrend};

    #[test]
    fn change_labels() {
        assert_eq!(change_label(Some(3)), "+3");
        assert_eq!(change_label(Some(-2)), "-2");
        assert_eq!(change_label(Some(0)), "--");
        assert_eq!(change_label(None), "--");
        assert_eq!(weekly_label(Some(12)), "+12");
        assert_eq!(weekly_label(None), "--");
    }

    #[test]
    fn rate_label_has_one_decimal() {
        assert_eq!(rate_label(Some(97.26)), "97.3%");
        assert_eq!(rate_label(None), "0.0%");
        assert_eq!(rate_label(Some(f64::NAN)), "0.0%");
    }

    #[test]
    fn cards_read_stats_and_trends() {
        let mut stats = SystemStats::default();
        stats.feeds.total = 8;
        stats.articles.total = 120;
        stats.articles.unread = 30;
        stats.tasks.total = 5;
        let trends = Trends {
            feeds: Some(ChangeTrend { change: Some(2) }),
            articles: Some(WeeklyTrend { weekly: Some(14) }),
            unread_articles: Some(ChangeTrend { change: Some(-4) }),
            tasks: Some(RateTrend {
                success_rate: Some(99.0),
            }),
        };

        let cards = stat_cards(&stats, &trends);
        let summary: Vec<(u64, &str)> = cards.iter().map(|c| (c.value, c.change.as_str())).collect();
        assert_eq!(
            summary,
            vec![(8, "+2"), (120, "+14"), (30, "-4"), (5, "99.0%")]
        );
    }
}
