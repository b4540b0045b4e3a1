use actix_web::{HttpResponse, post, web};

use crate::auth::AuthenticatedUser;
use crate::forms::tasks::ExportContactsForm;
use crate::services::{ServiceError, tasks as tasks_service};
use crate::tasks::TaskQueue;

#[post("/tasks/export-contacts/")]
pub async fn export_contacts(
    user: AuthenticatedUser,
    queue: web::Data<dyn TaskQueue>,
    form: Option<web::Json<ExportContactsForm>>,
) -> Result<HttpResponse, ServiceError> {
    let form = form.map(web::Json::into_inner).unwrap_or_default();
    let accepted = tasks_service::enqueue_export_contacts(queue.get_ref(), &user, form)?;
    Ok(HttpResponse::Accepted().json(accepted))
}

#[post("/tasks/pipeline-report/")]
pub async fn pipeline_report(
    user: AuthenticatedUser,
    queue: web::Data<dyn TaskQueue>,
) -> Result<HttpResponse, ServiceError> {
    let accepted = tasks_service::enqueue_pipeline_report(queue.get_ref(), &user)?;
    Ok(HttpResponse::Accepted().json(accepted))
}

#[post("/tasks/activity-reminders/")]
pub async fn activity_reminders(
    user: AuthenticatedUser,
    queue: web::Data<dyn TaskQueue>,
) -> Result<HttpResponse, ServiceError> {
    let accepted = tasks_service::enqueue_activity_reminders(queue.get_ref(), &user)?;
    Ok(HttpResponse::Accepted().json(accepted))
}
