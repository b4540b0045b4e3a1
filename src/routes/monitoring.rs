use actix_web::http::StatusCode;
use actix_web::http::header;
use actix_web::{HttpResponse, HttpResponseBuilder, get, web};

use crate::db::{DbPool, PoolStatus};
use crate::models::config::ServerConfig;
use crate::monitoring::{RequestMetrics, render_prometheus};
use crate::repository::{DieselRepository, StatsReader};
use crate::services::health::{self as health_service, HealthCache, Probes};
use crate::services::now;
use crate::tasks::TaskQueue;

fn uncached(healthy: bool) -> HttpResponseBuilder {
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let mut builder = HttpResponse::build(status);
    builder
        .insert_header((header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"))
        .insert_header((header::PRAGMA, "no-cache"))
        .insert_header((header::EXPIRES, "0"));
    builder
}

#[get("/health/")]
pub async fn health(
    pool: web::Data<DbPool>,
    cache: web::Data<HealthCache>,
    queue: web::Data<dyn TaskQueue>,
    metrics: web::Data<RequestMetrics>,
    config: web::Data<ServerConfig>,
) -> HttpResponse {
    let probes = Probes {
        pool: pool.get_ref(),
        cache: cache.get_ref(),
        queue: queue.get_ref(),
    };
    let report = health_service::health_report(&probes, &config.app_version, metrics.uptime());
    uncached(report.is_healthy()).json(report)
}

#[get("/health/detailed/")]
pub async fn health_detailed(
    repo: web::Data<DieselRepository>,
    pool: web::Data<DbPool>,
    cache: web::Data<HealthCache>,
    queue: web::Data<dyn TaskQueue>,
    metrics: web::Data<RequestMetrics>,
    config: web::Data<ServerConfig>,
) -> HttpResponse {
    let probes = Probes {
        pool: pool.get_ref(),
        cache: cache.get_ref(),
        queue: queue.get_ref(),
    };
    let report = health_service::detailed_health_report(
        repo.get_ref(),
        &probes,
        &config.app_version,
        metrics.uptime(),
    );
    uncached(report.summary.is_healthy()).json(report)
}

#[get("/metrics/")]
pub async fn prometheus_metrics(
    repo: web::Data<DieselRepository>,
    pool: web::Data<DbPool>,
    metrics: web::Data<RequestMetrics>,
) -> HttpResponse {
    let counts = repo
        .crm_counts(now())
        .inspect_err(|e| log::warn!("Failed to collect business metrics: {e}"))
        .ok();
    let body = render_prometheus(
        &metrics.snapshot(),
        Some(PoolStatus::from_pool(pool.get_ref())),
        counts.as_ref(),
    );
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4; charset=utf-8")
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .body(body)
}
