use serde::Deserialize;
use validator::Validate;

use crate::domain::contact::{ContactPatch, NewContact};
use crate::domain::types::{EmailAddress, PersonName, PhoneNumber, Tag, UserId, WebUrl};
use crate::forms::{
    FormError, clean_text, double_option, parse_field, parse_nullable, parse_optional,
};
use crate::pagination::PageParams;

#[derive(Debug, Default, Deserialize)]
pub struct ContactListParams {
    pub search: Option<String>,
    pub company: Option<String>,
    pub tag: Option<String>,
    pub is_active: Option<bool>,
    /// Admins may include soft-deleted contacts.
    #[serde(default)]
    pub include_deleted: bool,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl ContactListParams {
    pub fn paging(&self) -> PageParams {
        PageParams {
            page: self.page,
            page_size: self.page_size,
        }
    }

    pub fn tag(&self) -> Result<Option<Tag>, FormError> {
        parse_optional("tag", self.tag.clone(), Tag::new)
    }
}

fn parse_tags(tags: Vec<String>) -> Result<Vec<Tag>, FormError> {
    let mut parsed: Vec<Tag> = Vec::with_capacity(tags.len());
    for raw in tags {
        let tag = parse_field("tags", Tag::new(raw))?;
        if !parsed.contains(&tag) {
            parsed.push(tag);
        }
    }
    Ok(parsed)
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateContactForm {
    #[validate(length(min = 1, max = 100, message = "First name is required."))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name is required."))]
    pub last_name: String,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    pub phone: Option<String>,
    #[validate(length(max = 200))]
    pub company: Option<String>,
    #[validate(length(max = 100))]
    pub title: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub linkedin_url: Option<String>,
    pub twitter_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub lead_source: Option<String>,
}

impl CreateContactForm {
    pub fn into_new_contact(self, owner_id: UserId) -> Result<NewContact, FormError> {
        self.validate()?;
        let mut contact = NewContact::new(
            owner_id,
            parse_field("first_name", PersonName::new(self.first_name))?,
            parse_field("last_name", PersonName::new(self.last_name))?,
            parse_field("email", EmailAddress::new(self.email))?,
        );
        contact.phone = parse_optional("phone", self.phone, PhoneNumber::new)?;
        contact.company = clean_text(self.company);
        contact.title = clean_text(self.title);
        contact.website = parse_optional("website", self.website, WebUrl::new)?;
        contact.address = clean_text(self.address);
        contact.city = clean_text(self.city);
        contact.state = clean_text(self.state);
        contact.country = clean_text(self.country);
        contact.postal_code = clean_text(self.postal_code);
        contact.linkedin_url = parse_optional("linkedin_url", self.linkedin_url, WebUrl::new)?;
        contact.twitter_url = parse_optional("twitter_url", self.twitter_url, WebUrl::new)?;
        contact.tags = parse_tags(self.tags)?;
        contact.lead_source = clean_text(self.lead_source);
        Ok(contact)
    }
}

/// PATCH payload; `null` clears optional attributes.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateContactForm {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub company: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub website: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub city: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub state: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub country: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub postal_code: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub linkedin_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub twitter_url: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub lead_source: Option<Option<String>>,
    pub is_active: Option<bool>,
}

fn nullable_text(value: Option<Option<String>>) -> Option<Option<String>> {
    value.map(clean_text)
}

impl TryFrom<UpdateContactForm> for ContactPatch {
    type Error = FormError;

    fn try_from(form: UpdateContactForm) -> Result<Self, Self::Error> {
        form.validate()?;
        Ok(Self {
            first_name: form
                .first_name
                .map(|v| parse_field("first_name", PersonName::new(v)))
                .transpose()?,
            last_name: form
                .last_name
                .map(|v| parse_field("last_name", PersonName::new(v)))
                .transpose()?,
            email: form
                .email
                .map(|v| parse_field("email", EmailAddress::new(v)))
                .transpose()?,
            phone: parse_nullable("phone", form.phone, PhoneNumber::new)?,
            company: nullable_text(form.company),
            title: nullable_text(form.title),
            website: parse_nullable("website", form.website, WebUrl::new)?,
            address: nullable_text(form.address),
            city: nullable_text(form.city),
            state: nullable_text(form.state),
            country: nullable_text(form.country),
            postal_code: nullable_text(form.postal_code),
            linkedin_url: parse_nullable("linkedin_url", form.linkedin_url, WebUrl::new)?,
            twitter_url: parse_nullable("twitter_url", form.twitter_url, WebUrl::new)?,
            tags: form.tags.map(parse_tags).transpose()?,
            lead_source: nullable_text(form.lead_source),
            is_active: form.is_active,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct TagForm {
    pub tag: String,
}

impl TagForm {
    pub fn tag(self) -> Result<Tag, FormError> {
        parse_field("tag", Tag::new(self.tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> UserId {
        UserId::new(1).unwrap()
    }

    #[test]
    fn create_form_builds_contact() {
        let form: CreateContactForm = serde_json::from_str(
            r#"{
                "first_name": "Grace",
                "last_name": "Hopper",
                "email": "GRACE@navy.mil",
                "website": "https://navy.mil",
                "tags": ["VIP", "vip", "navy"]
            }"#,
        )
        .unwrap();
        let contact = form.into_new_contact(owner()).unwrap();
        assert_eq!(contact.email.as_str(), "grace@navy.mil");
        assert_eq!(contact.tags.len(), 2);
        assert_eq!(contact.owner_id, owner());
    }

    #[test]
    fn create_form_rejects_bad_url() {
        let form = CreateContactForm {
            first_name: "A".into(),
            last_name: "B".into(),
            email: "a@b.io".into(),
            website: Some("not a url".into()),
            ..Default::default()
        };
        let err = form.into_new_contact(owner()).unwrap_err();
        assert_eq!(err.details()[0].field.as_deref(), Some("website"));
    }

    #[test]
    fn patch_distinguishes_null() {
        let form: UpdateContactForm =
            serde_json::from_str(r#"{"company": null, "city": "Paris"}"#).unwrap();
        let patch = ContactPatch::try_from(form).unwrap();
        assert_eq!(patch.company, Some(None));
        assert_eq!(patch.city, Some(Some("Paris".to_string())));
        assert_eq!(patch.phone, None);
    }
}
