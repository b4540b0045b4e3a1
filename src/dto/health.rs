use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::db::PoolStatus;
use crate::repository::CrmCounts;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// State of one dependency probed by the health check.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ComponentHealth {
    pub status: &'static str,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentHealth {
    pub fn up(response_time_ms: Option<f64>) -> Self {
        Self {
            status: "connected",
            healthy: true,
            response_time_ms,
            error: None,
        }
    }

    pub fn down(error: impl Into<String>) -> Self {
        Self {
            status: "error",
            healthy: false,
            response_time_ms: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: NaiveDateTime,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: BTreeMap<&'static str, ComponentHealth>,
}

impl HealthReport {
    pub fn new(
        components: BTreeMap<&'static str, ComponentHealth>,
        version: String,
        uptime_seconds: u64,
        timestamp: NaiveDateTime,
    ) -> Self {
        let status = if components.values().all(|c| c.healthy) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };
        Self {
            status,
            timestamp,
            version,
            uptime_seconds,
            components,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// `GET /health/detailed/` body.
#[derive(Debug, Clone, Serialize)]
pub struct DetailedHealthReport {
    #[serde(flatten)]
    pub summary: HealthReport,
    pub pool: PoolStatus,
    /// `None` when the counters could not be collected.
    pub business_metrics: Option<CrmCounts>,
}
