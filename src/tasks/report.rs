//! Pipeline report written as JSON next to the contact exports.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::domain::deal::{DealStage, StageSummary};
use crate::domain::types::{Money, UserId};
use crate::repository::{CrmCounts, DealReader, StatsReader};
use crate::tasks::TaskError;

#[derive(Debug, Serialize)]
pub struct PipelineReport {
    pub generated_at: NaiveDateTime,
    pub requested_by: UserId,
    pub stages: Vec<StageSummary>,
    pub open_deals: usize,
    pub open_value: Money,
    pub won_value: Money,
    pub lost_deals: usize,
    /// Won deals over all closed deals, in percent.
    pub win_rate: Option<f64>,
    pub counts: CrmCounts,
}

impl PipelineReport {
    pub fn build(
        stages: Vec<StageSummary>,
        counts: CrmCounts,
        requested_by: UserId,
        generated_at: NaiveDateTime,
    ) -> Self {
        let mut open_deals = 0;
        let mut open_value = Money::ZERO;
        let mut won = (0, Money::ZERO);
        let mut lost_deals = 0;
        for summary in &stages {
            match summary.stage {
                DealStage::ClosedWon => won = (summary.count, summary.total_value),
                DealStage::ClosedLost => lost_deals = summary.count,
                _ => {
                    open_deals += summary.count;
                    open_value = open_value
                        .checked_add(summary.total_value)
                        .unwrap_or(open_value);
                }
            }
        }
        let closed = won.0 + lost_deals;
        Self {
            generated_at,
            requested_by,
            stages,
            open_deals,
            open_value,
            won_value: won.1,
            lost_deals,
            win_rate: (closed > 0).then(|| won.0 as f64 * 100.0 / closed as f64),
            counts,
        }
    }
}

pub fn write_pipeline_report<R>(
    repo: &R,
    requested_by: UserId,
    dir: &Path,
    now: NaiveDateTime,
) -> Result<PathBuf, TaskError>
where
    R: DealReader + StatsReader + ?Sized,
{
    let report = PipelineReport::build(
        repo.pipeline_summary(None)?,
        repo.crm_counts(now)?,
        requested_by,
        now,
    );

    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!(
        "pipeline_report_{}.json",
        now.format("%Y%m%d_%H%M%S")
    ));
    let writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(writer, &report)?;

    log::info!(
        "Pipeline report for user {requested_by} written to {}",
        path.display()
    );
    Ok(path)
}


#[cfg(all(test, feature = "test-mocks"))]
mod mock_tests {
    use super::*;
    use crate::repository::mock::MockRepository;

    #[test]
    fn report_file_is_written() {
        let mut repo = MockRepository::new();
        repo.expect_pipeline_summary()
            .withf(|owner| owner.is_none())
            .returning(|_| Ok(vec![]));
        repo.expect_crm_counts().returning(|_| {
            Ok(CrmCounts {
                users: 4,
                ..Default::default()
            })
        });

        let dir = tempfile::tempdir().unwrap();
        let path = write_pipeline_report(
            &repo,
            UserId::new(2).unwrap(),
            dir.path(),
            chrono::Utc::now().naive_utc(),
        )
        .unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["counts"]["users"], 4);
        assert_eq!(json["requested_by"], 2);
        assert_eq!(json["open_value"], "0.00");
    }
}
