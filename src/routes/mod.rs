//! HTTP handlers. Each handler extracts its inputs, calls the matching
//! service function and serializes the result; errors render through
//! [`ServiceError`](crate::services::ServiceError).

use actix_web::web;

pub mod activities;
pub mod auth;
pub mod contacts;
pub mod deals;
pub mod docs;
pub mod monitoring;
pub mod tasks;
pub mod users;

/// Registers every route. Literal segments (`me/`, `pipeline/`, `upcoming/`)
/// are registered before the `{id}` patterns they would otherwise collide with.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(auth::register)
            .service(auth::login)
            .service(auth::logout)
            .service(auth::refresh)
            .service(users::list_users)
            .service(users::show_me)
            .service(users::update_me)
            .service(users::show_user)
            .service(users::change_password)
            .service(users::deactivate_user)
            .service(users::activate_user)
            .service(users::user_permissions)
            .service(contacts::list_contacts)
            .service(contacts::create_contact)
            .service(contacts::show_contact)
            .service(contacts::update_contact)
            .service(contacts::delete_contact)
            .service(contacts::restore_contact)
            .service(contacts::add_tag)
            .service(contacts::remove_tag)
            .service(contacts::deals_summary)
            .service(deals::list_deals)
            .service(deals::create_deal)
            .service(deals::pipeline)
            .service(deals::show_deal)
            .service(deals::update_deal)
            .service(deals::delete_deal)
            .service(deals::change_stage)
            .service(deals::close_won)
            .service(deals::close_lost)
            .service(deals::stage_history)
            .service(activities::list_activities)
            .service(activities::create_activity)
            .service(activities::upcoming_activities)
            .service(activities::overdue_activities)
            .service(activities::show_activity)
            .service(activities::update_activity)
            .service(activities::delete_activity)
            .service(activities::complete_activity)
            .service(activities::cancel_activity)
            .service(activities::snooze_activity)
            .service(activities::reschedule_activity)
            .service(tasks::export_contacts)
            .service(tasks::pipeline_report)
            .service(tasks::activity_reminders),
    )
    .service(monitoring::health)
    .service(monitoring::health_detailed)
    .service(monitoring::prometheus_metrics)
    .service(docs::schema)
    .service(docs::swagger_ui);
}
