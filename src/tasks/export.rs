//! CSV export of contacts.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::domain::contact::Contact;
use crate::domain::types::UserId;
use crate::repository::{ContactListQuery, ContactReader};
use crate::tasks::TaskError;

const BATCH_SIZE: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactExport {
    pub path: PathBuf,
    pub rows: usize,
}

#[derive(Serialize)]
struct ContactRow<'a> {
    id: i32,
    public_id: String,
    first_name: &'a str,
    last_name: &'a str,
    email: &'a str,
    phone: Option<&'a str>,
    company: Option<&'a str>,
    title: Option<&'a str>,
    city: Option<&'a str>,
    country: Option<&'a str>,
    tags: String,
    lead_source: Option<&'a str>,
    is_active: bool,
    owner_id: i32,
    created_at: String,
}

impl<'a> From<&'a Contact> for ContactRow<'a> {
    fn from(contact: &'a Contact) -> Self {
        Self {
            id: contact.id.get(),
            public_id: contact.public_id.to_string(),
            first_name: contact.first_name.as_str(),
            last_name: contact.last_name.as_str(),
            email: contact.email.as_str(),
            phone: contact.phone.as_ref().map(|p| p.as_str()),
            company: contact.company.as_deref(),
            title: contact.title.as_deref(),
            city: contact.city.as_deref(),
            country: contact.country.as_deref(),
            tags: contact
                .tags
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(";"),
            lead_source: contact.lead_source.as_deref(),
            is_active: contact.is_active,
            owner_id: contact.owner_id.get(),
            created_at: contact.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Writes every non-deleted contact (of `owner_id`, when given) to
/// `contacts_<requested_by>_<timestamp>.csv` inside `dir`.
pub fn export_contacts<R>(
    repo: &R,
    requested_by: UserId,
    owner_id: Option<UserId>,
    dir: &Path,
    now: NaiveDateTime,
) -> Result<ContactExport, TaskError>
where
    R: ContactReader + ?Sized,
{
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!(
        "contacts_{requested_by}_{}.csv",
        now.format("%Y%m%d_%H%M%S")
    ));
    let mut writer = csv::Writer::from_path(&path)?;

    let mut rows = 0;
    let mut page = 1;
    loop {
        let mut query = ContactListQuery::new().paginate(page, BATCH_SIZE);
        if let Some(owner_id) = owner_id {
            query = query.owner(owner_id);
        }
        let (total, contacts) = repo.list_contacts(query)?;
        for contact in &contacts {
            writer.serialize(ContactRow::from(contact))?;
        }
        rows += contacts.len();
        if contacts.is_empty() || rows >= total {
            break;
        }
        page += 1;
    }
    writer.flush()?;

    log::info!("Exported {rows} contact(s) to {}", path.display());
    Ok(ContactExport { path, rows })
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use super::*;
    use crate::domain::types::Tag;
    use crate::fixtures;
    use crate::repository::mock::MockRepository;

    #[test]
    fn writes_header_and_rows() {
        let mut repo = MockRepository::new();
        repo.expect_list_contacts()
            .withf(|q| q.owner_id == UserId::new(7).ok() && !q.include_deleted)
            .times(1)
            .returning(|_| {
                let mut first = fixtures::contact(1, 7);
                first.tags = vec![Tag::new("vip").unwrap(), Tag::new("emea").unwrap()];
                Ok((2, vec![first, fixtures::contact(2, 7)]))
            });

        let dir = tempfile::tempdir().unwrap();
        let export = export_contacts(
            &repo,
            UserId::new(1).unwrap(),
            UserId::new(7).ok(),
            dir.path(),
            fixtures::now(),
        )
        .unwrap();

        assert_eq!(export.rows, 2);
        let content = std::fs::read_to_string(&export.path).unwrap();
        let mut lines = content.lines();
        assert!(lines.next().unwrap().starts_with("id,public_id,first_name"));
        assert!(content.contains("vip;emea"));
        assert!(content.contains("contact2@example.com"));
    }

    #[test]
    fn pages_through_large_listings() {
        let mut repo = MockRepository::new();
        repo.expect_list_contacts()
            .times(2)
            .returning(|q| {
                let page = q.pagination.map(|p| p.page).unwrap_or(1);
                let batch = if page == 1 { BATCH_SIZE } else { 1 };
                let contacts = (0..batch)
                    .map(|i| fixtures::contact(i as i32 + 1, 1))
                    .collect();
                Ok((BATCH_SIZE + 1, contacts))
            });

        let dir = tempfile::tempdir().unwrap();
        let export = export_contacts(
            &repo,
            UserId::new(1).unwrap(),
            None,
            dir.path(),
            fixtures::now(),
        )
        .unwrap();
        assert_eq!(export.rows, BATCH_SIZE + 1);
    }
}
