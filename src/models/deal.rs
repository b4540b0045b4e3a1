use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;

use crate::domain::deal::{
    Deal as DomainDeal, DealStageHistory as DomainDealStageHistory, NewDeal as DomainNewDeal,
    StageChange,
};
use crate::domain::types::{
    ContactId, DealId, Money, Probability, PublicId, Title, TypeConstraintError, UserId,
};

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::deals)]
/// Diesel model for [`crate::domain::deal::Deal`].
pub struct Deal {
    pub id: i32,
    pub public_id: String,
    pub owner_id: i32,
    pub contact_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub value_cents: i64,
    pub currency: String,
    pub probability: i32,
    pub stage: String,
    pub expected_close_date: Option<NaiveDate>,
    pub loss_reason: Option<String>,
    pub closed_value_cents: Option<i64>,
    pub is_archived: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub closed_date: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::deals)]
pub struct NewDeal<'a> {
    pub public_id: String,
    pub owner_id: i32,
    pub contact_id: i32,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub value_cents: i64,
    pub currency: &'a str,
    pub probability: i32,
    pub stage: &'a str,
    pub expected_close_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(AsChangeset)]
#[diesel(table_name = crate::schema::deals)]
#[diesel(treat_none_as_null = true)]
pub struct UpdateDeal<'a> {
    pub contact_id: i32,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub value_cents: i64,
    pub currency: &'a str,
    pub probability: i32,
    pub stage: &'a str,
    pub expected_close_date: Option<NaiveDate>,
    pub loss_reason: Option<&'a str>,
    pub closed_value_cents: Option<i64>,
    pub is_archived: bool,
    pub updated_at: NaiveDateTime,
    pub closed_date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::deal_stage_history)]
pub struct DealStageHistory {
    pub id: i32,
    pub deal_id: i32,
    pub old_stage: String,
    pub new_stage: String,
    pub changed_by: Option<i32>,
    pub changed_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::deal_stage_history)]
pub struct NewDealStageHistory<'a> {
    pub deal_id: i32,
    pub old_stage: &'a str,
    pub new_stage: &'a str,
    pub changed_by: Option<i32>,
    pub changed_at: NaiveDateTime,
}

impl<'a> From<&'a DomainNewDeal> for NewDeal<'a> {
    fn from(deal: &'a DomainNewDeal) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            public_id: deal.public_id.to_string(),
            owner_id: deal.owner_id.get(),
            contact_id: deal.contact_id.get(),
            title: deal.title.as_str(),
            description: deal.description.as_deref(),
            value_cents: deal.value.cents(),
            currency: deal.currency.as_str(),
            probability: deal.probability.get(),
            stage: deal.stage.as_str(),
            expected_close_date: deal.expected_close_date,
            created_at: now,
            updated_at: now,
        }
    }
}

impl<'a> From<&'a DomainDeal> for UpdateDeal<'a> {
    fn from(deal: &'a DomainDeal) -> Self {
        Self {
            contact_id: deal.contact_id.get(),
            title: deal.title.as_str(),
            description: deal.description.as_deref(),
            value_cents: deal.value.cents(),
            currency: deal.currency.as_str(),
            probability: deal.probability.get(),
            stage: deal.stage.as_str(),
            expected_close_date: deal.expected_close_date,
            loss_reason: deal.loss_reason.as_deref(),
            closed_value_cents: deal.closed_value.map(Money::cents),
            is_archived: deal.is_archived,
            updated_at: deal.updated_at,
            closed_date: deal.closed_date,
        }
    }
}

impl<'a> From<&'a StageChange> for NewDealStageHistory<'a> {
    fn from(change: &'a StageChange) -> Self {
        Self {
            deal_id: change.deal_id.get(),
            old_stage: change.old_stage.as_str(),
            new_stage: change.new_stage.as_str(),
            changed_by: change.changed_by.map(UserId::get),
            changed_at: change.changed_at,
        }
    }
}

impl TryFrom<Deal> for DomainDeal {
    type Error = TypeConstraintError;

    fn try_from(deal: Deal) -> Result<Self, Self::Error> {
        Ok(Self {
            id: DealId::new(deal.id)?,
            public_id: deal.public_id.parse::<PublicId>()?,
            owner_id: UserId::new(deal.owner_id)?,
            contact_id: ContactId::new(deal.contact_id)?,
            title: Title::new(deal.title)?,
            description: deal.description,
            value: Money::from_cents(deal.value_cents)?,
            currency: deal.currency.parse()?,
            probability: Probability::new(deal.probability)?,
            stage: deal.stage.parse()?,
            expected_close_date: deal.expected_close_date,
            loss_reason: deal.loss_reason,
            closed_value: deal.closed_value_cents.map(Money::from_cents).transpose()?,
            is_archived: deal.is_archived,
            created_at: deal.created_at,
            updated_at: deal.updated_at,
            closed_date: deal.closed_date,
        })
    }
}

impl TryFrom<DealStageHistory> for DomainDealStageHistory {
    type Error = TypeConstraintError;

    fn try_from(entry: DealStageHistory) -> Result<Self, Self::Error> {
        Ok(Self {
            id: entry.id,
            deal_id: DealId::new(entry.deal_id)?,
            old_stage: entry.old_stage.parse()?,
            new_stage: entry.new_stage.parse()?,
            changed_by: entry.changed_by.map(UserId::new).transpose()?,
            changed_at: entry.changed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::deal::{Currency, DealStage};

    #[test]
    fn stored_amounts_become_money() {
        let now = chrono::Utc::now().naive_utc();
        let row = Deal {
            id: 1,
            public_id: PublicId::new().to_string(),
            owner_id: 1,
            contact_id: 1,
            title: "Upsell".to_string(),
            description: None,
            value_cents: 250_050,
            currency: "EUR".to_string(),
            probability: 75,
            stage: "negotiation".to_string(),
            expected_close_date: None,
            loss_reason: None,
            closed_value_cents: None,
            is_archived: false,
            created_at: now,
            updated_at: now,
            closed_date: None,
        };
        let deal = DomainDeal::try_from(row).unwrap();
        assert_eq!(deal.value.to_string(), "2500.50");
        assert_eq!(deal.currency, Currency::Eur);
        assert_eq!(deal.stage, DealStage::Negotiation);
    }

    #[test]
    fn stage_change_maps_to_history_row() {
        let change = StageChange {
            deal_id: DealId::new(9).unwrap(),
            old_stage: DealStage::Prospect,
            new_stage: DealStage::Qualified,
            changed_by: None,
            changed_at: chrono::Utc::now().naive_utc(),
        };
        let row: NewDealStageHistory = (&change).into();
        assert_eq!(row.deal_id, 9);
        assert_eq!(row.old_stage, "prospect");
        assert_eq!(row.new_stage, "qualified");
        assert_eq!(row.changed_by, None);
    }
}
