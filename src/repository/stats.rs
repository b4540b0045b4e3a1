use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::repository::errors::RepositoryResult;
use crate::repository::{CrmCounts, DieselRepository, StatsReader};

impl StatsReader for DieselRepository {
    fn crm_counts(&self, now: NaiveDateTime) -> RepositoryResult<CrmCounts> {
        use crate::schema::{activities, contacts, deals, users};

        let mut conn = self.conn()?;

        let users_total = users::table.count().get_result::<i64>(&mut conn)?;
        let active_users = users::table
            .filter(users::is_active.eq(true))
            .count()
            .get_result::<i64>(&mut conn)?;
        let contacts_total = contacts::table
            .filter(contacts::is_deleted.eq(false))
            .count()
            .get_result::<i64>(&mut conn)?;
        let open_deals = deals::table
            .filter(deals::is_archived.eq(false))
            .filter(deals::stage.ne_all(["closed_won", "closed_lost"]))
            .count()
            .get_result::<i64>(&mut conn)?;
        let overdue_activities = activities::table
            .filter(activities::is_completed.eq(false))
            .filter(activities::is_cancelled.eq(false))
            .filter(activities::scheduled_at.lt(now))
            .count()
            .get_result::<i64>(&mut conn)?;

        Ok(CrmCounts {
            users: users_total as usize,
            active_users: active_users as usize,
            contacts: contacts_total as usize,
            open_deals: open_deals as usize,
            overdue_activities: overdue_activities as usize,
        })
    }
}
