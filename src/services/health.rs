//! Dependency probes behind `/health/` and `/health/detailed/`.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::cache::SimpleCache;
use crate::db::{DbPool, PoolStatus, check_database};
use crate::dto::health::{ComponentHealth, DetailedHealthReport, HealthReport};
use crate::repository::StatsReader;
use crate::services::now;
use crate::tasks::TaskQueue;

/// Scratch cache the health check writes its probe value into.
pub type HealthCache = SimpleCache<String>;

pub fn health_cache() -> HealthCache {
    SimpleCache::new("health_", Duration::from_secs(10))
}

/// The dependencies a health report looks at.
pub struct Probes<'a> {
    pub pool: &'a DbPool,
    pub cache: &'a HealthCache,
    pub queue: &'a dyn TaskQueue,
}

fn database_component(pool: &DbPool) -> ComponentHealth {
    match check_database(pool) {
        Ok(check) => ComponentHealth::up(Some(check.latency_ms)),
        Err(e) => {
            log::error!("Database health check failed: {e}");
            ComponentHealth::down(e.to_string())
        }
    }
}

fn cache_component(cache: &HealthCache) -> ComponentHealth {
    if cache.probe("ok".to_string()) {
        ComponentHealth::up(None)
    } else {
        log::error!("Cache health check failed");
        ComponentHealth::down("cache probe value did not round-trip")
    }
}

fn queue_component(queue: &dyn TaskQueue) -> ComponentHealth {
    if queue.is_healthy() {
        ComponentHealth::up(None)
    } else {
        log::warn!("Task queue health check failed");
        ComponentHealth::down("task queue socket unavailable")
    }
}

pub fn health_report(probes: &Probes<'_>, version: &str, uptime: Duration) -> HealthReport {
    let mut components = BTreeMap::new();
    components.insert("database", database_component(probes.pool));
    components.insert("cache", cache_component(probes.cache));
    components.insert("task_queue", queue_component(probes.queue));
    HealthReport::new(components, version.to_string(), uptime.as_secs(), now())
}

pub fn detailed_health_report<R>(
    repo: &R,
    probes: &Probes<'_>,
    version: &str,
    uptime: Duration,
) -> DetailedHealthReport
where
    R: StatsReader + ?Sized,
{
    let summary = health_report(probes, version, uptime);
    let business_metrics = match repo.crm_counts(summary.timestamp) {
        Ok(counts) => Some(counts),
        Err(e) => {
            log::warn!("Failed to collect business metrics: {e}");
            None
        }
    };
    DetailedHealthReport {
        summary,
        pool: PoolStatus::from_pool(probes.pool),
        business_metrics,
    }
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use super::*;
    use crate::tasks::MockTaskQueue;

    #[test]
    fn failing_queue_is_reported() {
        let mut queue = MockTaskQueue::new();
        queue.expect_is_healthy().times(1).returning(|| false);
        let component = queue_component(&queue);
        assert!(!component.healthy);
        assert_eq!(component.status, "error");
    }

    #[test]
    fn cache_probe_leaves_cache_empty() {
        let cache = health_cache();
        assert!(cache_component(&cache).healthy);
        assert!(cache.is_empty());
    }
}
