//! Global service health indicator shown in the console header.

use crate::context::ClientContext;
use crate::queries;
use crate::query::{QuerySnapshot, QueryStatus, Subscription};
use crate::types::Health;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthIndicator {
    Checking,
    Healthy,
    Unhealthy,
}

impl HealthIndicator {
    pub fn label(&self) -> &'static str {
        match self {
            HealthIndicator::Checking => "检查服务状态",
            HealthIndicator::Healthy => "服务正常",
            HealthIndicator::Unhealthy => "服务异常",
        }
    }

    pub fn from_snapshot(snapshot: &QuerySnapshot<Health>) -> Self {
        match (snapshot.status, snapshot.data()) {
            (QueryStatus::Error, _) => HealthIndicator::Unhealthy,
            (_, Some(health)) if health.is_healthy() => HealthIndicator::Healthy,
            (_, Some(_)) => HealthIndicator::Unhealthy,
            (_, None) => HealthIndicator::Checking,
        }
    }
}

/// Keeps `["health"]` polled for as long as it is alive.
#[derive(Debug)]
pub struct HealthMonitor {
    subscription: Subscription<Health>,
}

impl HealthMonitor {
    pub fn start(ctx: &ClientContext) -> Self {
        Self::with_interval(ctx, queries::GLOBAL_HEALTH_POLL)
    }

    pub fn with_interval(ctx: &ClientContext, poll: Duration) -> Self {
        Self {
            subscription: ctx.cache.subscribe(&queries::health(&ctx.api, poll)),
        }
    }

    pub fn snapshot(&self) -> QuerySnapshot<Health> {
        self.subscription.snapshot()
    }

    pub fn indicator(&self) -> HealthIndicator {
        HealthIndicator::from_snapshot(&self.snapshot())
    }

    pub fn subscription_mut(&mut self) -> &mut Subscription<Health> {
        &mut self.subscription
    }
}
