//! Request counters, the `/metrics/` exposition and response hardening.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::middleware::{DefaultHeaders, Next};
use actix_web::{Error, web};

use crate::db::PoolStatus;
use crate::repository::CrmCounts;

const STATUS_CLASSES: [&str; 5] = ["1xx", "2xx", "3xx", "4xx", "5xx"];

/// Process-wide HTTP counters, shared through `web::Data`.
pub struct RequestMetrics {
    started_at: Instant,
    total: AtomicU64,
    in_flight: AtomicU64,
    by_class: [AtomicU64; 5],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub uptime: Duration,
    pub total: u64,
    pub in_flight: u64,
    pub by_class: [u64; 5],
}

impl Default for RequestMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestMetrics {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            total: AtomicU64::new(0),
            in_flight: AtomicU64::new(0),
            by_class: Default::default(),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn request_started(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_finished(&self, status: StatusCode) {
        let _ = self
            .in_flight
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
        let class = usize::from(status.as_u16() / 100).clamp(1, 5) - 1;
        self.by_class[class].fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime: self.uptime(),
            total: self.total.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
            by_class: std::array::from_fn(|i| self.by_class[i].load(Ordering::Relaxed)),
        }
    }
}

/// `from_fn` middleware feeding [`RequestMetrics`] registered as app data.
pub async fn track_requests(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let metrics = req.app_data::<web::Data<RequestMetrics>>().cloned();
    if let Some(metrics) = &metrics {
        metrics.request_started();
    }

    let result = next.call(req).await;

    if let Some(metrics) = metrics {
        let status = match &result {
            Ok(response) => response.status(),
            Err(e) => e.as_response_error().status_code(),
        };
        metrics.request_finished(status);
    }
    result
}

pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-Frame-Options", "DENY"))
        .add(("Referrer-Policy", "same-origin"))
}

fn metric(out: &mut String, name: &str, kind: &str, help: &str, value: impl std::fmt::Display) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} {kind}");
    let _ = writeln!(out, "{name} {value}");
}

/// Renders the Prometheus text exposition format.
pub fn render_prometheus(
    snapshot: &MetricsSnapshot,
    pool: Option<PoolStatus>,
    counts: Option<&CrmCounts>,
) -> String {
    let mut out = String::new();
    metric(
        &mut out,
        "crm_uptime_seconds",
        "gauge",
        "Seconds since the server started.",
        snapshot.uptime.as_secs(),
    );
    metric(
        &mut out,
        "crm_http_requests_total",
        "counter",
        "HTTP requests received.",
        snapshot.total,
    );
    metric(
        &mut out,
        "crm_http_requests_in_flight",
        "gauge",
        "HTTP requests currently being served.",
        snapshot.in_flight,
    );

    let _ = writeln!(out, "# HELP crm_http_responses_total HTTP responses by status class.");
    let _ = writeln!(out, "# TYPE crm_http_responses_total counter");
    for (class, value) in STATUS_CLASSES.iter().zip(snapshot.by_class) {
        let _ = writeln!(out, "crm_http_responses_total{{class=\"{class}\"}} {value}");
    }

    if let Some(pool) = pool {
        let _ = writeln!(out, "# HELP crm_db_pool_connections Database pool connections by state.");
        let _ = writeln!(out, "# TYPE crm_db_pool_connections gauge");
        let _ = writeln!(out, "crm_db_pool_connections{{state=\"idle\"}} {}", pool.idle);
        let _ = writeln!(out, "crm_db_pool_connections{{state=\"in_use\"}} {}", pool.in_use);
        metric(
            &mut out,
            "crm_db_pool_max_size",
            "gauge",
            "Maximum size of the database pool.",
            pool.max_size,
        );
    }

    if let Some(counts) = counts {
        metric(&mut out, "crm_users", "gauge", "Registered users.", counts.users);
        metric(&mut out, "crm_active_users", "gauge", "Active users.", counts.active_users);
        metric(&mut out, "crm_contacts", "gauge", "Contacts not deleted.", counts.contacts);
        metric(&mut out, "crm_open_deals", "gauge", "Deals in an open stage.", counts.open_deals);
        metric(
            &mut out,
            "crm_overdue_activities",
            "gauge",
            "Pending activities past their schedule.",
            counts.overdue_activities,
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_requests_by_status_class() {
        let metrics = RequestMetrics::new();
        metrics.request_started();
        metrics.request_started();
        metrics.request_finished(StatusCode::OK);
        metrics.request_finished(StatusCode::NOT_FOUND);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total, 2);
        assert_eq!(snapshot.in_flight, 0);
        assert_eq!(snapshot.by_class, [0, 1, 0, 1, 0]);
    }

    #[test]
    fn in_flight_never_underflows() {
        let metrics = RequestMetrics::new();
        metrics.request_finished(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(metrics.snapshot().in_flight, 0);
        assert_eq!(metrics.snapshot().by_class[4], 1);
    }

    #[test]
    fn renders_business_gauges() {
        let metrics = RequestMetrics::new();
        metrics.request_started();
        metrics.request_finished(StatusCode::CREATED);
        let counts = CrmCounts {
            users: 3,
            active_users: 2,
            contacts: 10,
            open_deals: 4,
            overdue_activities: 1,
        };

        let text = render_prometheus(&metrics.snapshot(), None, Some(&counts));
        assert!(text.contains("# TYPE crm_http_requests_total counter\ncrm_http_requests_total 1\n"));
        assert!(text.contains("crm_http_responses_total{class=\"2xx\"} 1"));
        assert!(text.contains("crm_open_deals 4"));
        assert!(!text.contains("crm_db_pool"));
    }
}
