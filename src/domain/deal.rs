use std::fmt::Display;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::RuleViolation;
use crate::domain::types::{
    ContactId, DealId, Money, Probability, PublicId, Title, TypeConstraintError, UserId,
};

/// Position of a deal in the sales pipeline.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DealStage {
    #[default]
    Prospect,
    Qualified,
    Proposal,
    Negotiation,
    ClosedWon,
    ClosedLost,
}

impl DealStage {
    /// Pipeline order.
    pub const ALL: [DealStage; 6] = [
        DealStage::Prospect,
        DealStage::Qualified,
        DealStage::Proposal,
        DealStage::Negotiation,
        DealStage::ClosedWon,
        DealStage::ClosedLost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DealStage::Prospect => "prospect",
            DealStage::Qualified => "qualified",
            DealStage::Proposal => "proposal",
            DealStage::Negotiation => "negotiation",
            DealStage::ClosedWon => "closed_won",
            DealStage::ClosedLost => "closed_lost",
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, DealStage::ClosedWon | DealStage::ClosedLost)
    }

    /// Probability assigned when a deal enters this stage.
    pub fn default_probability(&self) -> Probability {
        let value = match self {
            DealStage::Prospect => 10,
            DealStage::Qualified => 25,
            DealStage::Proposal => 50,
            DealStage::Negotiation => 75,
            DealStage::ClosedWon => 100,
            DealStage::ClosedLost => 0,
        };
        Probability::saturating(value)
    }

    /// 1-based position in the pipeline.
    pub fn position(&self) -> usize {
        Self::ALL
            .iter()
            .position(|stage| stage == self)
            .map_or(0, |index| index + 1)
    }

    pub fn allowed_transitions(&self) -> &'static [DealStage] {
        match self {
            DealStage::Prospect => &[DealStage::Qualified, DealStage::ClosedLost],
            DealStage::Qualified => &[
                DealStage::Proposal,
                DealStage::Prospect,
                DealStage::ClosedLost,
            ],
            DealStage::Proposal => &[
                DealStage::Negotiation,
                DealStage::Qualified,
                DealStage::ClosedLost,
            ],
            DealStage::Negotiation => &[
                DealStage::ClosedWon,
                DealStage::Proposal,
                DealStage::ClosedLost,
            ],
            DealStage::ClosedWon | DealStage::ClosedLost => &[],
        }
    }

    pub fn can_transition_to(&self, next: DealStage) -> bool {
        self.allowed_transitions().contains(&next)
    }
}

impl Display for DealStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DealStage {
    type Err = TypeConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DealStage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s.trim())
            .ok_or_else(|| TypeConstraintError::InvalidValue(format!("unknown deal stage `{s}`")))
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Gbp,
    Cad,
    Aud,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Cad => "CAD",
            Currency::Aud => "AUD",
        }
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Currency {
    type Err = TypeConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "GBP" => Ok(Currency::Gbp),
            "CAD" => Ok(Currency::Cad),
            "AUD" => Ok(Currency::Aud),
            other => Err(TypeConstraintError::InvalidValue(format!(
                "unsupported currency `{other}`"
            ))),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Deal {
    pub id: DealId,
    pub public_id: PublicId,
    pub owner_id: UserId,
    pub contact_id: ContactId,
    pub title: Title,
    pub description: Option<String>,
    pub value: Money,
    pub currency: Currency,
    pub probability: Probability,
    pub stage: DealStage,
    pub expected_close_date: Option<NaiveDate>,
    pub loss_reason: Option<String>,
    pub closed_value: Option<Money>,
    pub is_archived: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub closed_date: Option<NaiveDateTime>,
}

/// Stage transition that must be recorded in the deal history.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageChange {
    pub deal_id: DealId,
    pub old_stage: DealStage,
    pub new_stage: DealStage,
    pub changed_by: Option<UserId>,
    pub changed_at: NaiveDateTime,
}

/// Persisted stage history entry.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DealStageHistory {
    pub id: i32,
    pub deal_id: DealId,
    pub old_stage: DealStage,
    pub new_stage: DealStage,
    pub changed_by: Option<UserId>,
    pub changed_at: NaiveDateTime,
}

fn check_value(value: Money) -> Result<(), RuleViolation> {
    if value.is_zero() {
        return Err(RuleViolation::NonPositiveDealValue);
    }
    Ok(())
}

fn check_close_date(
    stage: DealStage,
    expected_close_date: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(), RuleViolation> {
    match expected_close_date {
        Some(date) if date < today && !stage.is_closed() => Err(RuleViolation::CloseDateInPast),
        _ => Ok(()),
    }
}

impl Deal {
    pub fn is_won(&self) -> bool {
        self.stage == DealStage::ClosedWon
    }

    pub fn is_lost(&self) -> bool {
        self.stage == DealStage::ClosedLost
    }

    pub fn is_open(&self) -> bool {
        !self.stage.is_closed()
    }

    pub fn pipeline_position(&self) -> usize {
        self.stage.position()
    }

    pub fn days_in_pipeline(&self, now: NaiveDateTime) -> i64 {
        (now - self.created_at).num_days()
    }

    pub fn days_to_close(&self, today: NaiveDate) -> Option<i64> {
        self.expected_close_date.map(|date| (date - today).num_days())
    }

    /// `USD 1,234.50` style rendering of the deal value.
    pub fn formatted_value(&self, include_currency: bool) -> String {
        if include_currency {
            format!("{} {}", self.currency, self.value.format_grouped())
        } else {
            self.value.format_grouped()
        }
    }

    /// Checks value and close-date rules against the given day.
    pub fn validate(&self, today: NaiveDate) -> Result<(), RuleViolation> {
        check_value(self.value)?;
        check_close_date(self.stage, self.expected_close_date, today)
    }

    fn enter_stage(
        &mut self,
        stage: DealStage,
        changed_by: Option<UserId>,
        now: NaiveDateTime,
    ) -> StageChange {
        let change = StageChange {
            deal_id: self.id,
            old_stage: self.stage,
            new_stage: stage,
            changed_by,
            changed_at: now,
        };
        self.stage = stage;
        self.probability = stage.default_probability();
        if stage.is_closed() && self.closed_date.is_none() {
            self.closed_date = Some(now);
        }
        self.updated_at = now;
        change
    }

    /// Moves the deal along an allowed pipeline edge.
    pub fn change_stage(
        &mut self,
        stage: DealStage,
        changed_by: Option<UserId>,
        now: NaiveDateTime,
    ) -> Result<StageChange, RuleViolation> {
        if !self.stage.can_transition_to(stage) {
            return Err(RuleViolation::InvalidStageTransition {
                from: self.stage,
                to: stage,
            });
        }
        let change = self.enter_stage(stage, changed_by, now);
        if stage == DealStage::ClosedWon && self.closed_value.is_none() {
            self.closed_value = Some(self.value);
        }
        Ok(change)
    }

    /// Closes an open deal as won; `final_value` defaults to the deal value.
    pub fn close_as_won(
        &mut self,
        final_value: Option<Money>,
        changed_by: Option<UserId>,
        now: NaiveDateTime,
    ) -> Result<StageChange, RuleViolation> {
        if !self.is_open() {
            return Err(RuleViolation::DealAlreadyClosed);
        }
        let change = self.enter_stage(DealStage::ClosedWon, changed_by, now);
        self.closed_value = Some(final_value.unwrap_or(self.value));
        self.closed_date = Some(now);
        Ok(change)
    }

    /// Closes an open deal as lost with the given reason.
    pub fn close_as_lost(
        &mut self,
        reason: String,
        changed_by: Option<UserId>,
        now: NaiveDateTime,
    ) -> Result<StageChange, RuleViolation> {
        if !self.is_open() {
            return Err(RuleViolation::DealAlreadyClosed);
        }
        let change = self.enter_stage(DealStage::ClosedLost, changed_by, now);
        self.loss_reason = Some(reason);
        self.closed_date = Some(now);
        Ok(change)
    }

    pub fn archive(&mut self, now: NaiveDateTime) {
        self.is_archived = true;
        self.updated_at = now;
    }
}

#[derive(Clone, Debug)]
pub struct NewDeal {
    pub public_id: PublicId,
    pub owner_id: UserId,
    pub contact_id: ContactId,
    pub title: Title,
    pub description: Option<String>,
    pub value: Money,
    pub currency: Currency,
    pub probability: Probability,
    pub stage: DealStage,
    pub expected_close_date: Option<NaiveDate>,
}

impl NewDeal {
    /// Builds an open deal; probability defaults to the stage default.
    pub fn new(
        owner_id: UserId,
        contact_id: ContactId,
        title: Title,
        value: Money,
        stage: DealStage,
    ) -> Self {
        Self {
            public_id: PublicId::new(),
            owner_id,
            contact_id,
            title,
            description: None,
            value,
            currency: Currency::default(),
            probability: stage.default_probability(),
            stage,
            expected_close_date: None,
        }
    }

    pub fn validate(&self, today: NaiveDate) -> Result<(), RuleViolation> {
        if self.stage.is_closed() {
            return Err(RuleViolation::DealAlreadyClosed);
        }
        check_value(self.value)?;
        check_close_date(self.stage, self.expected_close_date, today)
    }
}

/// Partial update for deal attributes other than the stage.
#[derive(Clone, Debug, Default)]
pub struct DealPatch {
    pub title: Option<Title>,
    pub description: Option<Option<String>>,
    pub value: Option<Money>,
    pub currency: Option<Currency>,
    pub probability: Option<Probability>,
    pub expected_close_date: Option<Option<NaiveDate>>,
    pub contact_id: Option<ContactId>,
}

impl DealPatch {
    pub fn apply(self, mut deal: Deal, now: NaiveDateTime) -> Deal {
        if let Some(title) = self.title {
            deal.title = title;
        }
        if let Some(description) = self.description {
            deal.description = description;
        }
        if let Some(value) = self.value {
            deal.value = value;
        }
        if let Some(currency) = self.currency {
            deal.currency = currency;
        }
        if let Some(probability) = self.probability {
            deal.probability = probability;
        }
        if let Some(expected_close_date) = self.expected_close_date {
            deal.expected_close_date = expected_close_date;
        }
        if let Some(contact_id) = self.contact_id {
            deal.contact_id = contact_id;
        }
        deal.updated_at = now;
        deal
    }
}

/// Count and value of deals in one stage.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct StageSummary {
    pub stage: DealStage,
    pub count: usize,
    pub total_value: Money,
}
