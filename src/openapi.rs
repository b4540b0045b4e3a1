//! OpenAPI 3 description of the REST surface, served at `/api/schema/`.

use serde_json::{Map, Value, json};

struct Operation {
    method: &'static str,
    path: &'static str,
    tag: &'static str,
    summary: &'static str,
    status: &'static str,
    body: Option<&'static str>,
    public: bool,
}

const fn op(
    method: &'static str,
    path: &'static str,
    tag: &'static str,
    summary: &'static str,
    status: &'static str,
    body: Option<&'static str>,
) -> Operation {
    Operation {
        method,
        path,
        tag,
        summary,
        status,
        body,
        public: false,
    }
}

const fn public(operation: Operation) -> Operation {
    Operation {
        public: true,
        ..operation
    }
}

const OPERATIONS: &[Operation] = &[
    public(op("post", "/api/v1/auth/register/", "auth", "Register a new user", "201", Some("RegisterRequest"))),
    public(op("post", "/api/v1/auth/login/", "auth", "Obtain an access/refresh token pair", "200", Some("LoginRequest"))),
    op("post", "/api/v1/auth/logout/", "auth", "Revoke a refresh token", "200", Some("RefreshRequest")),
    public(op("post", "/api/v1/auth/refresh/", "auth", "Exchange a refresh token for an access token", "200", Some("RefreshRequest"))),
    op("get", "/api/v1/auth/users/", "users", "List users", "200", None),
    op("get", "/api/v1/auth/users/me/", "users", "Current user profile", "200", None),
    op("patch", "/api/v1/auth/users/me/", "users", "Update the current user profile", "200", Some("ProfileUpdate")),
    op("get", "/api/v1/auth/users/{id}/", "users", "Retrieve a user", "200", None),
    op("post", "/api/v1/auth/users/{id}/change-password/", "users", "Change own password", "200", Some("ChangePasswordRequest")),
    op("post", "/api/v1/auth/users/{id}/deactivate/", "users", "Deactivate a user", "200", None),
    op("post", "/api/v1/auth/users/{id}/activate/", "users", "Activate a user", "200", None),
    op("get", "/api/v1/auth/users/{id}/permissions/", "users", "Role capabilities of a user", "200", None),
    op("get", "/api/v1/contacts/", "contacts", "List contacts", "200", None),
    op("post", "/api/v1/contacts/", "contacts", "Create a contact", "201", Some("ContactInput")),
    op("get", "/api/v1/contacts/{id}/", "contacts", "Retrieve a contact", "200", None),
    op("patch", "/api/v1/contacts/{id}/", "contacts", "Update a contact", "200", Some("ContactInput")),
    op("delete", "/api/v1/contacts/{id}/", "contacts", "Soft-delete a contact", "204", None),
    op("post", "/api/v1/contacts/{id}/restore/", "contacts", "Restore a deleted contact", "200", None),
    op("post", "/api/v1/contacts/{id}/tags/", "contacts", "Add a tag", "200", Some("TagRequest")),
    op("delete", "/api/v1/contacts/{id}/tags/{tag}/", "contacts", "Remove a tag", "200", None),
    op("get", "/api/v1/contacts/{id}/deals-summary/", "contacts", "Deal totals for a contact", "200", None),
    op("get", "/api/v1/deals/", "deals", "List deals", "200", None),
    op("post", "/api/v1/deals/", "deals", "Create a deal", "201", Some("DealInput")),
    op("get", "/api/v1/deals/pipeline/", "deals", "Pipeline summary by stage", "200", None),
    op("get", "/api/v1/deals/{id}/", "deals", "Retrieve a deal", "200", None),
    op("patch", "/api/v1/deals/{id}/", "deals", "Update a deal", "200", Some("DealInput")),
    op("delete", "/api/v1/deals/{id}/", "deals", "Archive a deal", "204", None),
    op("post", "/api/v1/deals/{id}/stage/", "deals", "Move a deal to another stage", "200", Some("StageRequest")),
    op("post", "/api/v1/deals/{id}/close-won/", "deals", "Close a deal as won", "200", Some("CloseWonRequest")),
    op("post", "/api/v1/deals/{id}/close-lost/", "deals", "Close a deal as lost", "200", Some("CloseLostRequest")),
    op("get", "/api/v1/deals/{id}/history/", "deals", "Stage change history", "200", None),
    op("get", "/api/v1/activities/", "activities", "List activities", "200", None),
    op("post", "/api/v1/activities/", "activities", "Create an activity", "201", Some("ActivityInput")),
    op("get", "/api/v1/activities/upcoming/", "activities", "Pending activities in the next 7 days", "200", None),
    op("get", "/api/v1/activities/overdue/", "activities", "Pending activities past their schedule", "200", None),
    op("get", "/api/v1/activities/{id}/", "activities", "Retrieve an activity", "200", None),
    op("patch", "/api/v1/activities/{id}/", "activities", "Update an activity", "200", Some("ActivityInput")),
    op("delete", "/api/v1/activities/{id}/", "activities", "Delete an activity", "204", None),
    op("post", "/api/v1/activities/{id}/complete/", "activities", "Mark an activity completed", "200", Some("CompleteRequest")),
    op("post", "/api/v1/activities/{id}/cancel/", "activities", "Cancel an activity", "200", None),
    op("post", "/api/v1/activities/{id}/snooze/", "activities", "Postpone an activity", "200", Some("SnoozeRequest")),
    op("post", "/api/v1/activities/{id}/reschedule/", "activities", "Move an activity to a new time", "200", Some("RescheduleRequest")),
    op("post", "/api/v1/tasks/export-contacts/", "tasks", "Queue a CSV export of contacts", "202", Some("ExportRequest")),
    op("post", "/api/v1/tasks/pipeline-report/", "tasks", "Queue a pipeline report", "202", None),
    op("post", "/api/v1/tasks/activity-reminders/", "tasks", "Queue a reminder sweep", "202", None),
    public(op("get", "/health/", "monitoring", "Dependency health", "200", None)),
    public(op("get", "/health/detailed/", "monitoring", "Health with pool and business metrics", "200", None)),
    public(op("get", "/metrics/", "monitoring", "Prometheus metrics", "200", None)),
    public(op("get", "/api/schema/", "docs", "This document", "200", None)),
    public(op("get", "/api/docs/", "docs", "Swagger UI", "200", None)),
];

fn path_parameters(path: &str) -> Vec<Value> {
    path.split('/')
        .filter_map(|segment| segment.strip_prefix('{')?.strip_suffix('}'))
        .map(|name| {
            let schema = if name == "id" {
                json!({"type": "integer", "minimum": 1})
            } else {
                json!({"type": "string"})
            };
            json!({"name": name, "in": "path", "required": true, "schema": schema})
        })
        .collect()
}

fn operation_object(operation: &Operation) -> Value {
    let mut responses = Map::new();
    responses.insert(
        operation.status.to_string(),
        json!({"description": operation.summary}),
    );
    for (code, description) in [
        ("400", "invalid input"),
        ("401", "missing or invalid credentials"),
        ("403", "insufficient permissions"),
        ("404", "not found"),
    ] {
        if operation.public && code != "400" {
            continue;
        }
        responses.insert(
            code.to_string(),
            json!({
                "description": description,
                "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Error"}}}
            }),
        );
    }
    if operation.path == "/api/v1/auth/login/" {
        responses.insert(
            "429".to_string(),
            json!({"description": "too many login attempts", "headers": {"Retry-After": {"schema": {"type": "integer"}}}}),
        );
    }

    let mut object = json!({
        "tags": [operation.tag],
        "summary": operation.summary,
        "responses": responses,
    });
    let parameters = path_parameters(operation.path);
    if !parameters.is_empty() {
        object["parameters"] = Value::Array(parameters);
    }
    if let Some(body) = operation.body {
        object["requestBody"] = json!({
            "required": true,
            "content": {"application/json": {"schema": {"$ref": format!("#/components/schemas/{body}")}}}
        });
    }
    if !operation.public {
        object["security"] = json!([{"bearerAuth": []}]);
    }
    object
}

fn schemas() -> Value {
    let string = json!({"type": "string"});
    json!({
        "Error": {
            "type": "object",
            "required": ["error", "message"],
            "properties": {
                "error": string,
                "message": string,
                "details": {"type": "array", "items": {"type": "object"}},
                "context": {"type": "object"}
            }
        },
        "RegisterRequest": {
            "type": "object",
            "required": ["email", "password", "password_confirm", "first_name", "last_name"],
            "properties": {
                "email": {"type": "string", "format": "email"},
                "password": string, "password_confirm": string,
                "first_name": string, "last_name": string,
                "role": {"type": "string", "enum": ["manager", "sales", "support"]},
                "phone": string, "department": string
            }
        },
        "LoginRequest": {
            "type": "object",
            "required": ["email", "password"],
            "properties": {"email": string, "password": string}
        },
        "RefreshRequest": {
            "type": "object",
            "required": ["refresh_token"],
            "properties": {"refresh_token": string}
        },
        "ProfileUpdate": {
            "type": "object",
            "properties": {"first_name": string, "last_name": string, "phone": string, "department": string}
        },
        "ChangePasswordRequest": {
            "type": "object",
            "required": ["old_password", "new_password", "new_password_confirm"],
            "properties": {"old_password": string, "new_password": string, "new_password_confirm": string}
        },
        "ContactInput": {
            "type": "object",
            "properties": {
                "first_name": string, "last_name": string,
                "email": {"type": "string", "format": "email"},
                "phone": string, "company": string, "title": string, "website": string,
                "address": string, "city": string, "state": string, "country": string,
                "postal_code": string, "linkedin_url": string, "twitter_url": string,
                "tags": {"type": "array", "items": string},
                "lead_source": string
            }
        },
        "TagRequest": {"type": "object", "required": ["tag"], "properties": {"tag": string}},
        "DealInput": {
            "type": "object",
            "properties": {
                "title": string,
                "contact_id": {"type": "integer"},
                "value": {"type": "string", "example": "1500.00"},
                "currency": {"type": "string", "enum": ["USD", "EUR", "GBP", "CAD", "AUD"]},
                "stage": {"type": "string", "enum": ["prospect", "qualified", "proposal", "negotiation", "closed_won", "closed_lost"]},
                "probability": {"type": "integer", "minimum": 0, "maximum": 100},
                "expected_close_date": {"type": "string", "format": "date"},
                "description": string
            }
        },
        "StageRequest": {"type": "object", "required": ["stage"], "properties": {"stage": string}},
        "CloseWonRequest": {"type": "object", "properties": {"final_value": {"type": "string"}}},
        "CloseLostRequest": {"type": "object", "required": ["reason"], "properties": {"reason": string}},
        "ActivityInput": {
            "type": "object",
            "properties": {
                "activity_type": {"type": "string", "enum": ["call", "email", "meeting", "demo", "followup", "task", "note", "lunch", "webinar"]},
                "title": string, "description": string,
                "scheduled_at": {"type": "string", "format": "date-time"},
                "duration_minutes": {"type": "integer"},
                "priority": {"type": "string", "enum": ["low", "medium", "high", "urgent"]},
                "contact_id": {"type": "integer"}, "deal_id": {"type": "integer"},
                "reminder_minutes": {"type": "integer"},
                "location": string, "video_conference_url": string
            }
        },
        "CompleteRequest": {"type": "object", "properties": {"notes": string}},
        "SnoozeRequest": {"type": "object", "required": ["minutes"], "properties": {"minutes": {"type": "integer", "minimum": 1, "maximum": 10080}}},
        "RescheduleRequest": {"type": "object", "required": ["scheduled_at"], "properties": {"scheduled_at": {"type": "string", "format": "date-time"}}},
        "ExportRequest": {"type": "object", "properties": {"owner_id": {"type": "integer"}}}
    })
}

#[must_use]
pub fn openapi_spec(version: &str) -> Value {
    let mut paths = Map::new();
    for operation in OPERATIONS {
        let entry = paths
            .entry(operation.path)
            .or_insert_with(|| Value::Object(Map::new()));
        entry[operation.method] = operation_object(operation);
    }
    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "CRM API",
            "version": version,
            "description": "Contacts, deals and activities for sales teams."
        },
        "paths": paths,
        "components": {
            "securitySchemes": {
                "bearerAuth": {"type": "http", "scheme": "bearer", "bearerFormat": "JWT"}
            },
            "schemas": schemas()
        }
    })
}
