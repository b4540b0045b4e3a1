use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::contact::{Contact as DomainContact, NewContact as DomainNewContact};
use crate::domain::types::{
    ContactId, EmailAddress, PersonName, PhoneNumber, PublicId, Tag, TypeConstraintError, UserId,
    WebUrl,
};

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::contacts)]
/// Diesel model for [`crate::domain::contact::Contact`].
pub struct Contact {
    pub id: i32,
    pub public_id: String,
    pub owner_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub linkedin_url: Option<String>,
    pub twitter_url: Option<String>,
    pub tags: String,
    pub lead_source: Option<String>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::contacts)]
pub struct NewContact<'a> {
    pub public_id: String,
    pub owner_id: i32,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub phone: Option<&'a str>,
    pub company: Option<&'a str>,
    pub title: Option<&'a str>,
    pub website: Option<&'a str>,
    pub address: Option<&'a str>,
    pub city: Option<&'a str>,
    pub state: Option<&'a str>,
    pub country: Option<&'a str>,
    pub postal_code: Option<&'a str>,
    pub linkedin_url: Option<&'a str>,
    pub twitter_url: Option<&'a str>,
    pub tags: String,
    pub lead_source: Option<&'a str>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(AsChangeset)]
#[diesel(table_name = crate::schema::contacts)]
#[diesel(treat_none_as_null = true)]
/// Full row rewrite used after a domain-level patch was applied.
pub struct UpdateContact<'a> {
    pub owner_id: i32,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub phone: Option<&'a str>,
    pub company: Option<&'a str>,
    pub title: Option<&'a str>,
    pub website: Option<&'a str>,
    pub address: Option<&'a str>,
    pub city: Option<&'a str>,
    pub state: Option<&'a str>,
    pub country: Option<&'a str>,
    pub postal_code: Option<&'a str>,
    pub linkedin_url: Option<&'a str>,
    pub twitter_url: Option<&'a str>,
    pub tags: String,
    pub lead_source: Option<&'a str>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

/// Serializes tags into the JSON array stored in the `tags` column.
pub fn encode_tags(tags: &[Tag]) -> String {
    let raw: Vec<&str> = tags.iter().map(Tag::as_str).collect();
    serde_json::to_string(&raw).unwrap_or_else(|_| "[]".to_string())
}

/// Parses the `tags` column; malformed content yields an error.
pub fn decode_tags(raw: &str) -> Result<Vec<Tag>, TypeConstraintError> {
    let values: Vec<String> = serde_json::from_str(raw)
        .map_err(|e| TypeConstraintError::InvalidTag(format!("stored tags: {e}")))?;
    values.into_iter().map(Tag::new).collect()
}

impl<'a> From<&'a DomainNewContact> for NewContact<'a> {
    fn from(contact: &'a DomainNewContact) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            public_id: contact.public_id.to_string(),
            owner_id: contact.owner_id.get(),
            first_name: contact.first_name.as_str(),
            last_name: contact.last_name.as_str(),
            email: contact.email.as_str(),
            phone: contact.phone.as_ref().map(PhoneNumber::as_str),
            company: contact.company.as_deref(),
            title: contact.title.as_deref(),
            website: contact.website.as_ref().map(WebUrl::as_str),
            address: contact.address.as_deref(),
            city: contact.city.as_deref(),
            state: contact.state.as_deref(),
            country: contact.country.as_deref(),
            postal_code: contact.postal_code.as_deref(),
            linkedin_url: contact.linkedin_url.as_ref().map(WebUrl::as_str),
            twitter_url: contact.twitter_url.as_ref().map(WebUrl::as_str),
            tags: encode_tags(&contact.tags),
            lead_source: contact.lead_source.as_deref(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl<'a> From<&'a DomainContact> for UpdateContact<'a> {
    fn from(contact: &'a DomainContact) -> Self {
        Self {
            owner_id: contact.owner_id.get(),
            first_name: contact.first_name.as_str(),
            last_name: contact.last_name.as_str(),
            email: contact.email.as_str(),
            phone: contact.phone.as_ref().map(PhoneNumber::as_str),
            company: contact.company.as_deref(),
            title: contact.title.as_deref(),
            website: contact.website.as_ref().map(WebUrl::as_str),
            address: contact.address.as_deref(),
            city: contact.city.as_deref(),
            state: contact.state.as_deref(),
            country: contact.country.as_deref(),
            postal_code: contact.postal_code.as_deref(),
            linkedin_url: contact.linkedin_url.as_ref().map(WebUrl::as_str),
            twitter_url: contact.twitter_url.as_ref().map(WebUrl::as_str),
            tags: encode_tags(&contact.tags),
            lead_source: contact.lead_source.as_deref(),
            is_active: contact.is_active,
            is_deleted: contact.is_deleted,
            updated_at: contact.updated_at,
            deleted_at: contact.deleted_at,
        }
    }
}

impl TryFrom<Contact> for DomainContact {
    type Error = TypeConstraintError;

    fn try_from(contact: Contact) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ContactId::new(contact.id)?,
            public_id: contact.public_id.parse::<PublicId>()?,
            owner_id: UserId::new(contact.owner_id)?,
            first_name: PersonName::new(contact.first_name)?,
            last_name: PersonName::new(contact.last_name)?,
            email: EmailAddress::new(contact.email)?,
            phone: contact.phone.map(PhoneNumber::new).transpose()?,
            company: contact.company,
            title: contact.title,
            website: contact.website.map(WebUrl::new).transpose()?,
            address: contact.address,
            city: contact.city,
            state: contact.state,
            country: contact.country,
            postal_code: contact.postal_code,
            linkedin_url: contact.linkedin_url.map(WebUrl::new).transpose()?,
            twitter_url: contact.twitter_url.map(WebUrl::new).transpose()?,
            tags: decode_tags(&contact.tags)?,
            lead_source: contact.lead_source,
            is_active: contact.is_active,
            is_deleted: contact.is_deleted,
            created_at: contact.created_at,
            updated_at: contact.updated_at,
            deleted_at: contact.deleted_at,
        })
    }
}
