use serde::Serialize;

use crate::domain::contact::Contact;

#[derive(Debug, Clone, Serialize)]
pub struct ContactResponse {
    #[serde(flatten)]
    pub contact: Contact,
    pub full_name: String,
    pub display_name: String,
}

impl From<Contact> for ContactResponse {
    fn from(contact: Contact) -> Self {
        Self {
            full_name: contact.full_name(),
            display_name: contact.display_name(),
            contact,
        }
    }
}
