//! Repository implementation for CRM user accounts.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::types::{EmailAddress, UserId};
use crate::domain::user::{NewUser, User, UserCredentials};
use crate::models::user::{
    NewUser as DbNewUser, UpdateUserProfile as DbUpdateUserProfile, User as DbUser,
};
use crate::repository::errors::{RepositoryError, RepositoryResult};
use crate::repository::{DieselRepository, UserListQuery, UserReader, UserWriter};

impl UserReader for DieselRepository {
    fn get_user_by_id(&self, id: UserId) -> RepositoryResult<Option<User>> {
        use crate::schema::users;

        let mut conn = self.conn()?;
        let db_user = users::table
            .find(id.get())
            .first::<DbUser>(&mut conn)
            .optional()?;

        db_user
            .map(User::try_from)
            .transpose()
            .map_err(RepositoryError::from)
    }

    fn get_user_by_email(&self, email: &EmailAddress) -> RepositoryResult<Option<User>> {
        Ok(self.get_credentials_by_email(email)?.map(|creds| creds.user))
    }

    fn get_credentials_by_email(
        &self,
        email: &EmailAddress,
    ) -> RepositoryResult<Option<UserCredentials>> {
        use crate::schema::users;

        let mut conn = self.conn()?;
        let db_user = users::table
            .filter(users::email.eq(email.as_str()))
            .first::<DbUser>(&mut conn)
            .optional()?;

        db_user
            .map(UserCredentials::try_from)
            .transpose()
            .map_err(RepositoryError::from)
    }

    fn get_credentials_by_id(&self, id: UserId) -> RepositoryResult<Option<UserCredentials>> {
        use crate::schema::users;

        let mut conn = self.conn()?;
        let db_user = users::table
            .find(id.get())
            .first::<DbUser>(&mut conn)
            .optional()?;

        db_user
            .map(UserCredentials::try_from)
            .transpose()
            .map_err(RepositoryError::from)
    }

    fn list_users(&self, query: UserListQuery) -> RepositoryResult<(usize, Vec<User>)> {
        use crate::schema::users;

        let mut conn = self.conn()?;

        let query_builder = || {
            let mut items = users::table.into_boxed::<diesel::sqlite::Sqlite>();

            if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
                let pattern = format!("%{term}%");
                items = items.filter(
                    users::email
                        .like(pattern.clone())
                        .or(users::first_name.like(pattern.clone()))
                        .or(users::last_name.like(pattern)),
                );
            }
            if let Some(role) = query.role {
                items = items.filter(users::role.eq(role.as_str()));
            }
            if let Some(is_active) = query.is_active {
                items = items.filter(users::is_active.eq(is_active));
            }
            items
        };

        let total = query_builder().count().get_result::<i64>(&mut conn)? as usize;

        let mut items = query_builder().order(users::email.asc());
        if let Some(pagination) = &query.pagination {
            items = items.offset(pagination.offset()).limit(pagination.limit());
        }

        let users = items
            .load::<DbUser>(&mut conn)?
            .into_iter()
            .map(User::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((total, users))
    }
}

impl UserWriter for DieselRepository {
    fn create_user(&self, new_user: &NewUser) -> RepositoryResult<User> {
        use crate::schema::users;

        let mut conn = self.conn()?;
        let db_new_user: DbNewUser = new_user.into();

        let db_user = diesel::insert_into(users::table)
            .values(&db_new_user)
            .get_result::<DbUser>(&mut conn)?;

        Ok(User::try_from(db_user)?)
    }

    fn update_user_profile(&self, user: &User) -> RepositoryResult<User> {
        use crate::schema::users;

        let mut conn = self.conn()?;
        let changes: DbUpdateUserProfile = user.into();

        let db_user = diesel::update(users::table.find(user.id.get()))
            .set(&changes)
            .get_result::<DbUser>(&mut conn)?;

        Ok(User::try_from(db_user)?)
    }

    fn set_user_password(&self, id: UserId, password_hash: &str) -> RepositoryResult<()> {
        use crate::schema::users;

        let mut conn = self.conn()?;
        let affected = diesel::update(users::table.find(id.get()))
            .set(users::password_hash.eq(password_hash))
            .execute(&mut conn)?;

        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    fn set_user_active(&self, id: UserId, is_active: bool) -> RepositoryResult<User> {
        use crate::schema::users;

        let mut conn = self.conn()?;
        let db_user = diesel::update(users::table.find(id.get()))
            .set(users::is_active.eq(is_active))
            .get_result::<DbUser>(&mut conn)?;

        Ok(User::try_from(db_user)?)
    }

    fn touch_last_login(&self, id: UserId, at: NaiveDateTime) -> RepositoryResult<()> {
        use crate::schema::users;

        let mut conn = self.conn()?;
        diesel::update(users::table.find(id.get()))
            .set(users::last_login.eq(Some(at)))
            .execute(&mut conn)?;
        Ok(())
    }
}
