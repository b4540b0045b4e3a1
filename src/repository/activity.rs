//! Repository implementation for activities.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::activity::{Activity, NewActivity};
use crate::domain::types::ActivityId;
use crate::models::activity::{
    Activity as DbActivity, NewActivity as DbNewActivity, UpdateActivity as DbUpdateActivity,
};
use crate::repository::errors::{RepositoryError, RepositoryResult};
use crate::repository::{ActivityListQuery, ActivityReader, ActivityWriter, DieselRepository};

impl ActivityReader for DieselRepository {
    fn get_activity_by_id(&self, id: ActivityId) -> RepositoryResult<Option<Activity>> {
        use crate::schema::activities;

        let mut conn = self.conn()?;
        let db_activity = activities::table
            .find(id.get())
            .first::<DbActivity>(&mut conn)
            .optional()?;

        db_activity
            .map(Activity::try_from)
            .transpose()
            .map_err(RepositoryError::from)
    }

    fn list_activities(
        &self,
        query: ActivityListQuery,
    ) -> RepositoryResult<(usize, Vec<Activity>)> {
        use crate::schema::activities;

        let mut conn = self.conn()?;

        let query_builder = || {
            let mut items = activities::table.into_boxed::<diesel::sqlite::Sqlite>();

            if let Some(owner_id) = query.owner_id {
                items = items.filter(activities::owner_id.eq(owner_id.get()));
            }
            if let Some(contact_id) = query.contact_id {
                items = items.filter(activities::contact_id.eq(contact_id.get()));
            }
            if let Some(deal_id) = query.deal_id {
                items = items.filter(activities::deal_id.eq(deal_id.get()));
            }
            if let Some(activity_type) = query.activity_type {
                items = items.filter(activities::activity_type.eq(activity_type.as_str()));
            }
            if let Some(is_completed) = query.is_completed {
                items = items.filter(activities::is_completed.eq(is_completed));
            }
            if query.open_only {
                items = items
                    .filter(activities::is_completed.eq(false))
                    .filter(activities::is_cancelled.eq(false));
            }
            if let Some(from) = query.scheduled_from {
                items = items.filter(activities::scheduled_at.ge(from));
            }
            if let Some(to) = query.scheduled_to {
                items = items.filter(activities::scheduled_at.lt(to));
            }
            items
        };

        let total = query_builder().count().get_result::<i64>(&mut conn)? as usize;

        let mut items = if query.newest_first {
            query_builder().order((activities::scheduled_at.desc(), activities::id.desc()))
        } else {
            query_builder().order((activities::scheduled_at.asc(), activities::id.asc()))
        };
        if let Some(pagination) = &query.pagination {
            items = items.offset(pagination.offset()).limit(pagination.limit());
        }

        let activities = items
            .load::<DbActivity>(&mut conn)?
            .into_iter()
            .map(Activity::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((total, activities))
    }

    fn list_pending_reminders(&self, now: NaiveDateTime) -> RepositoryResult<Vec<Activity>> {
        use crate::schema::activities;

        let mut conn = self.conn()?;
        let activities = activities::table
            .filter(activities::reminder_sent.eq(false))
            .filter(activities::is_completed.eq(false))
            .filter(activities::is_cancelled.eq(false))
            .filter(activities::reminder_at.le(now))
            .order(activities::reminder_at.asc())
            .load::<DbActivity>(&mut conn)?
            .into_iter()
            .map(Activity::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(activities)
    }
}

impl ActivityWriter for DieselRepository {
    fn create_activity(&self, new_activity: &NewActivity) -> RepositoryResult<Activity> {
        use crate::schema::activities;

        let mut conn = self.conn()?;
        let db_new_activity: DbNewActivity = new_activity.into();

        let db_activity = diesel::insert_into(activities::table)
            .values(&db_new_activity)
            .get_result::<DbActivity>(&mut conn)?;

        Ok(Activity::try_from(db_activity)?)
    }

    fn update_activity(&self, activity: &Activity) -> RepositoryResult<Activity> {
        use crate::schema::activities;

        let mut conn = self.conn()?;
        let changes: DbUpdateActivity = activity.into();

        let db_activity = diesel::update(activities::table.find(activity.id.get()))
            .set(&changes)
            .get_result::<DbActivity>(&mut conn)?;

        Ok(Activity::try_from(db_activity)?)
    }

    fn delete_activity(&self, id: ActivityId) -> RepositoryResult<()> {
        use crate::schema::activities;

        let mut conn = self.conn()?;
        let affected = diesel::delete(activities::table.find(id.get())).execute(&mut conn)?;
        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    fn mark_reminder_sent(&self, id: ActivityId, at: NaiveDateTime) -> RepositoryResult<()> {
        use crate::schema::activities;

        let mut conn = self.conn()?;
        diesel::update(activities::table.find(id.get()))
            .set((
                activities::reminder_sent.eq(true),
                activities::updated_at.eq(at),
            ))
            .execute(&mut conn)?;
        Ok(())
    }
}
