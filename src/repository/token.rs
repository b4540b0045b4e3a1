use diesel::prelude::*;

use crate::domain::types::UserId;
use crate::repository::errors::RepositoryResult;
use crate::repository::{DieselRepository, TokenStore};

impl TokenStore for DieselRepository {
    fn revoke_token(&self, jti: &str, user_id: UserId) -> RepositoryResult<()> {
        use crate::schema::revoked_tokens;

        let mut conn = self.conn()?;
        diesel::insert_into(revoked_tokens::table)
            .values((
                revoked_tokens::jti.eq(jti),
                revoked_tokens::user_id.eq(user_id.get()),
                revoked_tokens::revoked_at.eq(chrono::Utc::now().naive_utc()),
            ))
            .on_conflict(revoked_tokens::jti)
            .do_nothing()
            .execute(&mut conn)?;
        Ok(())
    }

    fn is_token_revoked(&self, jti: &str) -> RepositoryResult<bool> {
        use crate::schema::revoked_tokens;

        let mut conn = self.conn()?;
        let found = diesel::select(diesel::dsl::exists(
            revoked_tokens::table.filter(revoked_tokens::jti.eq(jti)),
        ))
        .get_result::<bool>(&mut conn)?;
        Ok(found)
    }
}
