//! Repository implementation for contacts.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::contact::{Contact, ContactDealSummary, NewContact};
use crate::domain::types::{ContactId, EmailAddress, Money, Tag};
use crate::models::contact::{
    Contact as DbContact, NewContact as DbNewContact, UpdateContact as DbUpdateContact,
    encode_tags,
};
use crate::repository::errors::{RepositoryError, RepositoryResult};
use crate::repository::{ContactListQuery, ContactReader, ContactWriter, DieselRepository};

impl ContactReader for DieselRepository {
    fn get_contact_by_id(
        &self,
        id: ContactId,
        include_deleted: bool,
    ) -> RepositoryResult<Option<Contact>> {
        use crate::schema::contacts;

        let mut conn = self.conn()?;
        let mut query = contacts::table
            .filter(contacts::id.eq(id.get()))
            .into_boxed::<diesel::sqlite::Sqlite>();
        if !include_deleted {
            query = query.filter(contacts::is_deleted.eq(false));
        }
        let db_contact = query.first::<DbContact>(&mut conn).optional()?;

        db_contact
            .map(Contact::try_from)
            .transpose()
            .map_err(RepositoryError::from)
    }

    fn get_contact_by_email(&self, email: &EmailAddress) -> RepositoryResult<Option<Contact>> {
        use crate::schema::contacts;

        let mut conn = self.conn()?;
        let db_contact = contacts::table
            .filter(contacts::email.eq(email.as_str()))
            .filter(contacts::is_deleted.eq(false))
            .first::<DbContact>(&mut conn)
            .optional()?;

        db_contact
            .map(Contact::try_from)
            .transpose()
            .map_err(RepositoryError::from)
    }

    fn list_contacts(&self, query: ContactListQuery) -> RepositoryResult<(usize, Vec<Contact>)> {
        use crate::schema::contacts;

        let mut conn = self.conn()?;

        let query_builder = || {
            let mut items = contacts::table.into_boxed::<diesel::sqlite::Sqlite>();

            if !query.include_deleted {
                items = items.filter(contacts::is_deleted.eq(false));
            }
            if let Some(owner_id) = query.owner_id {
                items = items.filter(contacts::owner_id.eq(owner_id.get()));
            }
            if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
                let pattern = format!("%{term}%");
                items = items.filter(
                    contacts::first_name
                        .like(pattern.clone())
                        .or(contacts::last_name.like(pattern.clone()))
                        .or(contacts::email.like(pattern.clone()))
                        .or(contacts::company.like(pattern)),
                );
            }
            if let Some(company) = query.company.as_deref() {
                // SQLite LIKE without wildcards is a case-insensitive equality for ASCII.
                items = items.filter(contacts::company.like(company.trim().to_string()));
            }
            if let Some(tag) = &query.tag {
                let pattern = format!("%\"{}\"%", tag.as_str());
                items = items.filter(contacts::tags.like(pattern));
            }
            if let Some(is_active) = query.is_active {
                items = items.filter(contacts::is_active.eq(is_active));
            }
            items
        };

        let total = query_builder().count().get_result::<i64>(&mut conn)? as usize;

        let mut items = query_builder().order((
            contacts::last_name.asc(),
            contacts::first_name.asc(),
            contacts::id.asc(),
        ));
        if let Some(pagination) = &query.pagination {
            items = items.offset(pagination.offset()).limit(pagination.limit());
        }

        let contacts = items
            .load::<DbContact>(&mut conn)?
            .into_iter()
            .map(Contact::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((total, contacts))
    }

    fn contact_deal_summary(&self, id: ContactId) -> RepositoryResult<ContactDealSummary> {
        use crate::schema::deals;

        let mut conn = self.conn()?;
        let values = deals::table
            .filter(deals::contact_id.eq(id.get()))
            .filter(deals::is_archived.eq(false))
            .select(deals::value_cents)
            .load::<i64>(&mut conn)?;

        let total = values
            .iter()
            .try_fold(0i64, |acc, cents| acc.checked_add(*cents))
            .ok_or_else(|| RepositoryError::Unexpected("deal total overflow".to_string()))?;

        Ok(ContactDealSummary {
            contact_id: id,
            deals_count: values.len(),
            total_value: Money::from_cents(total)?,
        })
    }
}

impl ContactWriter for DieselRepository {
    fn create_contact(&self, new_contact: &NewContact) -> RepositoryResult<Contact> {
        use crate::schema::contacts;

        let mut conn = self.conn()?;
        let db_new_contact: DbNewContact = new_contact.into();

        let db_contact = diesel::insert_into(contacts::table)
            .values(&db_new_contact)
            .get_result::<DbContact>(&mut conn)?;

        Ok(Contact::try_from(db_contact)?)
    }

    fn update_contact(&self, contact: &Contact) -> RepositoryResult<Contact> {
        use crate::schema::contacts;

        let mut conn = self.conn()?;
        let changes: DbUpdateContact = contact.into();

        let db_contact = diesel::update(contacts::table.find(contact.id.get()))
            .set(&changes)
            .get_result::<DbContact>(&mut conn)?;

        Ok(Contact::try_from(db_contact)?)
    }

    fn set_contact_tags(&self, id: ContactId, tags: &[Tag]) -> RepositoryResult<Contact> {
        use crate::schema::contacts;

        let mut conn = self.conn()?;
        let db_contact = diesel::update(
            contacts::table
                .filter(contacts::id.eq(id.get()))
                .filter(contacts::is_deleted.eq(false)),
        )
        .set((
            contacts::tags.eq(encode_tags(tags)),
            contacts::updated_at.eq(chrono::Utc::now().naive_utc()),
        ))
        .get_result::<DbContact>(&mut conn)?;

        Ok(Contact::try_from(db_contact)?)
    }

    fn soft_delete_contact(&self, id: ContactId, at: NaiveDateTime) -> RepositoryResult<()> {
        use crate::schema::contacts;

        let mut conn = self.conn()?;
        let affected = diesel::update(
            contacts::table
                .filter(contacts::id.eq(id.get()))
                .filter(contacts::is_deleted.eq(false)),
        )
        .set((
            contacts::is_deleted.eq(true),
            contacts::deleted_at.eq(Some(at)),
            contacts::updated_at.eq(at),
        ))
        .execute(&mut conn)?;

        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    fn restore_contact(&self, id: ContactId, at: NaiveDateTime) -> RepositoryResult<Contact> {
        use crate::schema::contacts;

        let mut conn = self.conn()?;
        let db_contact = diesel::update(contacts::table.find(id.get()))
            .set((
                contacts::is_deleted.eq(false),
                contacts::deleted_at.eq(None::<NaiveDateTime>),
                contacts::updated_at.eq(at),
            ))
            .get_result::<DbContact>(&mut conn)?;

        Ok(Contact::try_from(db_contact)?)
    }
}
