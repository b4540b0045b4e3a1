//! Repository implementation for deals and their stage history.

use diesel::prelude::*;

use crate::domain::deal::{Deal, DealStage, DealStageHistory, NewDeal, StageChange, StageSummary};
use crate::domain::types::{DealId, Money, UserId};
use crate::models::deal::{
    Deal as DbDeal, DealStageHistory as DbDealStageHistory, NewDeal as DbNewDeal,
    NewDealStageHistory as DbNewDealStageHistory, UpdateDeal as DbUpdateDeal,
};
use crate::repository::errors::{RepositoryError, RepositoryResult};
use crate::repository::{DealListQuery, DealReader, DealWriter, DieselRepository};

const CLOSED_STAGES: [&str; 2] = ["closed_won", "closed_lost"];

impl DealReader for DieselRepository {
    fn get_deal_by_id(&self, id: DealId) -> RepositoryResult<Option<Deal>> {
        use crate::schema::deals;

        let mut conn = self.conn()?;
        let db_deal = deals::table
            .find(id.get())
            .first::<DbDeal>(&mut conn)
            .optional()?;

        db_deal
            .map(Deal::try_from)
            .transpose()
            .map_err(RepositoryError::from)
    }

    fn list_deals(&self, query: DealListQuery) -> RepositoryResult<(usize, Vec<Deal>)> {
        use crate::schema::deals;

        let mut conn = self.conn()?;

        let query_builder = || {
            let mut items = deals::table.into_boxed::<diesel::sqlite::Sqlite>();

            if !query.include_archived {
                items = items.filter(deals::is_archived.eq(false));
            }
            if let Some(owner_id) = query.owner_id {
                items = items.filter(deals::owner_id.eq(owner_id.get()));
            }
            if let Some(contact_id) = query.contact_id {
                items = items.filter(deals::contact_id.eq(contact_id.get()));
            }
            if let Some(stage) = query.stage {
                items = items.filter(deals::stage.eq(stage.as_str()));
            }
            if query.open_only {
                items = items.filter(deals::stage.ne_all(CLOSED_STAGES));
            }
            if let Some((from, to)) = query.closing_between {
                items = items
                    .filter(deals::expected_close_date.ge(from))
                    .filter(deals::expected_close_date.le(to));
            }
            if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
                let pattern = format!("%{term}%");
                items = items.filter(
                    deals::title
                        .like(pattern.clone())
                        .or(deals::description.like(pattern)),
                );
            }
            items
        };

        let total = query_builder().count().get_result::<i64>(&mut conn)? as usize;

        let mut items = query_builder().order((deals::created_at.desc(), deals::id.desc()));
        if let Some(pagination) = &query.pagination {
            items = items.offset(pagination.offset()).limit(pagination.limit());
        }

        let deals = items
            .load::<DbDeal>(&mut conn)?
            .into_iter()
            .map(Deal::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((total, deals))
    }

    fn list_stage_history(&self, id: DealId) -> RepositoryResult<Vec<DealStageHistory>> {
        use crate::schema::deal_stage_history;

        let mut conn = self.conn()?;
        let entries = deal_stage_history::table
            .filter(deal_stage_history::deal_id.eq(id.get()))
            .order((
                deal_stage_history::changed_at.desc(),
                deal_stage_history::id.desc(),
            ))
            .load::<DbDealStageHistory>(&mut conn)?
            .into_iter()
            .map(DealStageHistory::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    fn pipeline_summary(&self, owner_id: Option<UserId>) -> RepositoryResult<Vec<StageSummary>> {
        use crate::schema::deals;

        let mut conn = self.conn()?;
        let mut query = deals::table
            .filter(deals::is_archived.eq(false))
            .select((deals::stage, deals::value_cents))
            .into_boxed::<diesel::sqlite::Sqlite>();
        if let Some(owner_id) = owner_id {
            query = query.filter(deals::owner_id.eq(owner_id.get()));
        }
        let rows = query.load::<(String, i64)>(&mut conn)?;

        let mut summary: Vec<StageSummary> = DealStage::ALL
            .into_iter()
            .map(|stage| StageSummary {
                stage,
                count: 0,
                total_value: Money::ZERO,
            })
            .collect();

        for (stage, cents) in rows {
            let stage: DealStage = stage.parse()?;
            let value = Money::from_cents(cents)?;
            if let Some(entry) = summary.iter_mut().find(|entry| entry.stage == stage) {
                entry.count += 1;
                entry.total_value = entry.total_value.checked_add(value).ok_or_else(|| {
                    RepositoryError::Unexpected("pipeline total overflow".to_string())
                })?;
            }
        }

        Ok(summary)
    }
}

impl DealWriter for DieselRepository {
    fn create_deal(&self, new_deal: &NewDeal) -> RepositoryResult<Deal> {
        use crate::schema::deals;

        let mut conn = self.conn()?;
        let db_new_deal: DbNewDeal = new_deal.into();

        let db_deal = diesel::insert_into(deals::table)
            .values(&db_new_deal)
            .get_result::<DbDeal>(&mut conn)?;

        Ok(Deal::try_from(db_deal)?)
    }

    fn update_deal(&self, deal: &Deal) -> RepositoryResult<Deal> {
        use crate::schema::deals;

        let mut conn = self.conn()?;
        let changes: DbUpdateDeal = deal.into();

        let db_deal = diesel::update(deals::table.find(deal.id.get()))
            .set(&changes)
            .get_result::<DbDeal>(&mut conn)?;

        Ok(Deal::try_from(db_deal)?)
    }

    fn record_stage_change(&self, deal: &Deal, change: &StageChange) -> RepositoryResult<Deal> {
        use crate::schema::{deal_stage_history, deals};

        let mut conn = self.conn()?;
        let changes: DbUpdateDeal = deal.into();
        let history: DbNewDealStageHistory = change.into();

        let db_deal = conn.transaction::<DbDeal, diesel::result::Error, _>(|conn| {
            let updated = diesel::update(deals::table.find(deal.id.get()))
                .set(&changes)
                .get_result::<DbDeal>(conn)?;

            diesel::insert_into(deal_stage_history::table)
                .values(&history)
                .execute(conn)?;

            Ok(updated)
        })?;

        Ok(Deal::try_from(db_deal)?)
    }
}
