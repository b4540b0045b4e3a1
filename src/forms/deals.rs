use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

use crate::domain::deal::{Currency, DealPatch, DealStage, NewDeal};
use crate::domain::types::{ContactId, Money, Probability, Title, UserId};
use crate::forms::{FormError, clean_text, double_option, parse_field, parse_optional};
use crate::pagination::PageParams;

#[derive(Debug, Default, Deserialize)]
pub struct DealListParams {
    pub stage: Option<String>,
    pub contact: Option<i32>,
    /// Only deals that are not closed.
    #[serde(default)]
    pub open: bool,
    /// Open deals expected to close within this many days.
    pub closing_within_days: Option<i64>,
    pub search: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl DealListParams {
    pub fn paging(&self) -> PageParams {
        PageParams {
            page: self.page,
            page_size: self.page_size,
        }
    }

    pub fn stage(&self) -> Result<Option<DealStage>, FormError> {
        parse_optional("stage", self.stage.clone(), |raw| raw.parse::<DealStage>())
    }

    pub fn contact(&self) -> Result<Option<ContactId>, FormError> {
        self.contact
            .map(|id| parse_field("contact", ContactId::new(id)))
            .transpose()
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDealForm {
    #[validate(length(min = 1, max = 200, message = "Title is required."))]
    pub title: String,
    pub contact_id: i32,
    pub value: Money,
    pub currency: Option<Currency>,
    pub stage: Option<DealStage>,
    pub probability: Option<Probability>,
    pub expected_close_date: Option<NaiveDate>,
    pub description: Option<String>,
}

impl CreateDealForm {
    pub fn into_new_deal(self, owner_id: UserId) -> Result<NewDeal, FormError> {
        self.validate()?;
        let mut deal = NewDeal::new(
            owner_id,
            parse_field("contact_id", ContactId::new(self.contact_id))?,
            parse_field("title", Title::new(self.title))?,
            self.value,
            self.stage.unwrap_or_default(),
        );
        if let Some(currency) = self.currency {
            deal.currency = currency;
        }
        if let Some(probability) = self.probability {
            deal.probability = probability;
        }
        deal.expected_close_date = self.expected_close_date;
        deal.description = clean_text(self.description);
        Ok(deal)
    }
}

/// PATCH payload; stage changes go through the dedicated endpoints.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateDealForm {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub value: Option<Money>,
    pub currency: Option<Currency>,
    pub probability: Option<Probability>,
    #[serde(default, deserialize_with = "double_option")]
    pub expected_close_date: Option<Option<NaiveDate>>,
    pub contact_id: Option<i32>,
    /// Rejected: present only to report a helpful error.
    pub stage: Option<DealStage>,
}

impl TryFrom<UpdateDealForm> for DealPatch {
    type Error = FormError;

    fn try_from(form: UpdateDealForm) -> Result<Self, Self::Error> {
        form.validate()?;
        if form.stage.is_some() {
            return Err(FormError::field(
                "stage",
                "Use the stage endpoints to move a deal through the pipeline.",
            ));
        }
        Ok(Self {
            title: form
                .title
                .map(|v| parse_field("title", Title::new(v)))
                .transpose()?,
            description: form.description.map(clean_text),
            value: form.value,
            currency: form.currency,
            probability: form.probability,
            expected_close_date: form.expected_close_date,
            contact_id: form
                .contact_id
                .map(|id| parse_field("contact_id", ContactId::new(id)))
                .transpose()?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct StageForm {
    pub stage: DealStage,
}

#[derive(Debug, Default, Deserialize)]
pub struct CloseWonForm {
    pub final_value: Option<Money>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CloseLostForm {
    #[validate(length(min = 1, max = 500, message = "A loss reason is required."))]
    pub reason: String,
}

impl CloseLostForm {
    pub fn reason(self) -> Result<String, FormError> {
        self.validate()?;
        clean_text(Some(self.reason))
            .ok_or_else(|| FormError::field("reason", "A loss reason is required."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_form_defaults_stage_and_probability() {
        let form: CreateDealForm = serde_json::from_str(
            r#"{"title": "Renewal", "contact_id": 3, "value": "1500.50"}"#,
        )
        .unwrap();
        let deal = form.into_new_deal(UserId::new(1).unwrap()).unwrap();
        assert_eq!(deal.stage, DealStage::Prospect);
        assert_eq!(deal.probability, DealStage::Prospect.default_probability());
        assert_eq!(deal.value.cents(), 150_050);
        assert_eq!(deal.currency, Currency::Usd);
    }

    #[test]
    fn update_form_rejects_stage() {
        let form: UpdateDealForm = serde_json::from_str(r#"{"stage": "negotiation"}"#).unwrap();
        let err = DealPatch::try_from(form).unwrap_err();
        assert_eq!(err.details()[0].field.as_deref(), Some("stage"));
    }

    #[test]
    fn update_form_clears_close_date() {
        let form: UpdateDealForm =
            serde_json::from_str(r#"{"expected_close_date": null, "value": 10}"#).unwrap();
        let patch = DealPatch::try_from(form).unwrap();
        assert_eq!(patch.expected_close_date, Some(None));
        assert_eq!(patch.value.map(Money::cents), Some(1000));
    }

    #[test]
    fn blank_loss_reason_is_rejected() {
        let form = CloseLostForm {
            reason: " ".into(),
        };
        assert!(form.reason().is_err());
    }
}
