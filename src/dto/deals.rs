use chrono::{NaiveDateTime, Utc};
use serde::Serialize;

use crate::domain::deal::{Deal, StageSummary};
use crate::domain::types::Money;

#[derive(Debug, Clone, Serialize)]
pub struct DealResponse {
    #[serde(flatten)]
    pub deal: Deal,
    pub formatted_value: String,
    pub is_open: bool,
    pub pipeline_position: usize,
    pub days_in_pipeline: i64,
    pub days_to_close: Option<i64>,
}

impl DealResponse {
    pub fn at(deal: Deal, now: NaiveDateTime) -> Self {
        Self {
            formatted_value: deal.formatted_value(true),
            is_open: deal.is_open(),
            pipeline_position: deal.pipeline_position(),
            days_in_pipeline: deal.days_in_pipeline(now),
            days_to_close: deal.days_to_close(now.date()),
            deal,
        }
    }
}

impl From<Deal> for DealResponse {
    fn from(deal: Deal) -> Self {
        Self::at(deal, Utc::now().naive_utc())
    }
}

/// Per-stage counts plus totals over the open pipeline.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PipelineResponse {
    pub stages: Vec<StageSummary>,
    pub open_count: usize,
    pub open_value: Money,
}

impl From<Vec<StageSummary>> for PipelineResponse {
    fn from(stages: Vec<StageSummary>) -> Self {
        let open = stages.iter().filter(|summary| !summary.stage.is_closed());
        let open_count = open.clone().map(|summary| summary.count).sum();
        let open_value = open.fold(Money::ZERO, |acc, summary| {
            acc.checked_add(summary.total_value).unwrap_or(acc)
        });
        Self {
            stages,
            open_count,
            open_value,
        }
    }
}
