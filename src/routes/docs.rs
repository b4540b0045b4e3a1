use actix_web::http::header::ContentType;
use actix_web::{HttpResponse, get, web};

use crate::models::config::ServerConfig;
use crate::openapi::openapi_spec;

const SWAGGER_UI: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>CRM API documentation</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    window.ui = SwaggerUIBundle({ url: "/api/schema/", dom_id: "#swagger-ui" });
  </script>
</body>
</html>
"##;

#[get("/api/schema/")]
pub async fn schema(config: web::Data<ServerConfig>) -> HttpResponse {
    HttpResponse::Ok().json(openapi_spec(&config.app_version))
}

#[get("/api/docs/")]
pub async fn swagger_ui() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(SWAGGER_UI)
}
