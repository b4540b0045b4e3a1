use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::types::{
    ContactId, EmailAddress, Money, PersonName, PhoneNumber, PublicId, Tag, UserId, WebUrl,
};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Contact {
    pub id: ContactId,
    pub public_id: PublicId,
    pub owner_id: UserId,
    pub first_name: PersonName,
    pub last_name: PersonName,
    pub email: EmailAddress,
    pub phone: Option<PhoneNumber>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub website: Option<WebUrl>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub linkedin_url: Option<WebUrl>,
    pub twitter_url: Option<WebUrl>,
    pub tags: Vec<Tag>,
    pub lead_source: Option<String>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

impl Contact {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Name followed by the company, when one is known.
    pub fn display_name(&self) -> String {
        match &self.company {
            Some(company) => format!("{} - {company}", self.full_name()),
            None => self.full_name(),
        }
    }

    pub fn has_tag(&self, tag: &Tag) -> bool {
        self.tags.contains(tag)
    }

    /// Adds the tag unless already present. Returns whether the list changed.
    pub fn add_tag(&mut self, tag: Tag) -> bool {
        if self.has_tag(&tag) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    /// Removes the tag if present. Returns whether the list changed.
    pub fn remove_tag(&mut self, tag: &Tag) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        before != self.tags.len()
    }

    pub fn soft_delete(&mut self, now: NaiveDateTime) {
        self.is_deleted = true;
        self.deleted_at = Some(now);
        self.updated_at = now;
    }

    pub fn restore(&mut self, now: NaiveDateTime) {
        self.is_deleted = false;
        self.deleted_at = None;
        self.updated_at = now;
    }
}

#[derive(Clone, Debug)]
pub struct NewContact {
    pub public_id: PublicId,
    pub owner_id: UserId,
    pub first_name: PersonName,
    pub last_name: PersonName,
    pub email: EmailAddress,
    pub phone: Option<PhoneNumber>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub website: Option<WebUrl>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub linkedin_url: Option<WebUrl>,
    pub twitter_url: Option<WebUrl>,
    pub tags: Vec<Tag>,
    pub lead_source: Option<String>,
}

impl NewContact {
    /// Minimal contact with every optional attribute unset.
    #[must_use]
    pub fn new(
        owner_id: UserId,
        first_name: PersonName,
        last_name: PersonName,
        email: EmailAddress,
    ) -> Self {
        Self {
            public_id: PublicId::new(),
            owner_id,
            first_name,
            last_name,
            email,
            phone: None,
            company: None,
            title: None,
            website: None,
            address: None,
            city: None,
            state: None,
            country: None,
            postal_code: None,
            linkedin_url: None,
            twitter_url: None,
            tags: vec![],
            lead_source: None,
        }
    }
}

/// Partial update for a contact.
///
/// Outer `None` leaves a field untouched; `Some(None)` clears a nullable field.
#[derive(Clone, Debug, Default)]
pub struct ContactPatch {
    pub first_name: Option<PersonName>,
    pub last_name: Option<PersonName>,
    pub email: Option<EmailAddress>,
    pub phone: Option<Option<PhoneNumber>>,
    pub company: Option<Option<String>>,
    pub title: Option<Option<String>>,
    pub website: Option<Option<WebUrl>>,
    pub address: Option<Option<String>>,
    pub city: Option<Option<String>>,
    pub state: Option<Option<String>>,
    pub country: Option<Option<String>>,
    pub postal_code: Option<Option<String>>,
    pub linkedin_url: Option<Option<WebUrl>>,
    pub twitter_url: Option<Option<WebUrl>>,
    pub tags: Option<Vec<Tag>>,
    pub lead_source: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl ContactPatch {
    /// Returns the contact with the patch applied and `updated_at` bumped.
    pub fn apply(self, mut contact: Contact, now: NaiveDateTime) -> Contact {
        macro_rules! set {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = self.$field {
                    contact.$field = value;
                })*
            };
        }

        set!(
            first_name,
            last_name,
            email,
            phone,
            company,
            title,
            website,
            address,
            city,
            state,
            country,
            postal_code,
            linkedin_url,
            twitter_url,
            tags,
            lead_source,
            is_active,
        );
        contact.updated_at = now;
        contact
    }
}

/// Aggregated deal figures for a single contact.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ContactDealSummary {
    pub contact_id: ContactId,
    pub deals_count: usize,
    pub total_value: Money,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    pub(crate) fn sample_contact() -> Contact {
        let now = Utc::now().naive_utc();
        Contact {
            id: ContactId::new(1).unwrap(),
            public_id: PublicId::new(),
            owner_id: UserId::new(1).unwrap(),
            first_name: PersonName::new("Ada").unwrap(),
            last_name: PersonName::new("Lovelace").unwrap(),
            email: EmailAddress::new("ada@example.com").unwrap(),
            phone: None,
            company: Some("Analytical Engines".to_string()),
            title: None,
            website: None,
            address: None,
            city: None,
            state: None,
            country: None,
            postal_code: None,
            linkedin_url: None,
            twitter_url: None,
            tags: vec![],
            lead_source: None,
            is_active: true,
            is_deleted: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn display_name_includes_company() {
        let mut contact = sample_contact();
        assert_eq!(contact.display_name(), "Ada Lovelace - Analytical Engines");
        contact.company = None;
        assert_eq!(contact.display_name(), "Ada Lovelace");
    }

    #[test]
    fn tags_are_idempotent() {
        let mut contact = sample_contact();
        let vip = Tag::new("vip").unwrap();
        assert!(contact.add_tag(vip.clone()));
        assert!(!contact.add_tag(Tag::new("VIP").unwrap()));
        assert!(contact.has_tag(&vip));
        assert!(contact.remove_tag(&vip));
        assert!(!contact.remove_tag(&vip));
        assert!(contact.tags.is_empty());
    }

    #[test]
    fn soft_delete_and_restore() {
        let mut contact = sample_contact();
        let now = Utc::now().naive_utc();
        contact.soft_delete(now);
        assert!(contact.is_deleted);
        assert_eq!(contact.deleted_at, Some(now));
        contact.restore(now);
        assert!(!contact.is_deleted);
        assert_eq!(contact.deleted_at, None);
    }

    #[test]
    fn patch_clears_and_sets_fields() {
        let contact = sample_contact();
        let now = Utc::now().naive_utc();
        let patch = ContactPatch {
            company: Some(None),
            city: Some(Some("London".to_string())),
            ..ContactPatch::default()
        };
        let updated = patch.apply(contact, now);
        assert_eq!(updated.company, None);
        assert_eq!(updated.city.as_deref(), Some("London"));
        assert_eq!(updated.first_name.as_str(), "Ada");
        assert_eq!(updated.updated_at, now);
    }
}
