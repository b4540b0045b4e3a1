//! CRM backend: users, contacts, deals and activities behind a JSON API,
//! with a ZeroMQ task queue for exports, reports and reminders.

#[cfg(feature = "server")]
use std::sync::Arc;
#[cfg(feature = "server")]
use std::time::Duration;

#[cfg(feature = "server")]
use actix_cors::Cors;
#[cfg(feature = "server")]
use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};
#[cfg(feature = "server")]
use actix_web::http::header;
#[cfg(feature = "server")]
use actix_web::middleware::{Logger, from_fn};
#[cfg(feature = "server")]
use actix_web::{App, HttpRequest, HttpServer, web};

#[cfg(feature = "server")]
use crate::auth::TokenIssuer;
#[cfg(feature = "server")]
use crate::db::{DbPool, establish_connection_pool};
#[cfg(feature = "server")]
use crate::models::config::ServerConfig;
#[cfg(feature = "server")]
use crate::monitoring::{RequestMetrics, security_headers, track_requests};
#[cfg(feature = "server")]
use crate::rate_limit::RateLimiter;
#[cfg(feature = "server")]
use crate::repository::DieselRepository;
#[cfg(feature = "server")]
use crate::services::ServiceError;
#[cfg(feature = "server")]
use crate::services::contacts::{ContactCache, contact_cache};
#[cfg(feature = "server")]
use crate::services::deals::{DealCache, deal_cache};
#[cfg(feature = "server")]
use crate::services::health::{HealthCache, health_cache};
#[cfg(feature = "server")]
use crate::tasks::{TaskQueue, ZmqTaskSender};

#[cfg(feature = "server")]
pub mod auth;
#[cfg(feature = "server")]
pub mod cache;
pub mod db;
pub mod domain;
#[cfg(feature = "server")]
pub mod dto;
#[cfg(feature = "server")]
pub mod forms;
pub mod models;
#[cfg(feature = "server")]
pub mod monitoring;
#[cfg(feature = "server")]
pub mod openapi;
pub mod pagination;
#[cfg(feature = "server")]
pub mod rate_limit;
pub mod repository;
#[cfg(feature = "server")]
pub mod routes;
pub mod schema;
#[cfg(feature = "server")]
pub mod services;
#[cfg(feature = "server")]
pub mod tasks;

#[cfg(test)]
mod fixtures;

/// Shared application state, created once and cloned into every worker.
#[cfg(feature = "server")]
#[derive(Clone)]
pub struct AppState {
    pub config: web::Data<ServerConfig>,
    pub pool: web::Data<DbPool>,
    pub repo: web::Data<DieselRepository>,
    pub issuer: web::Data<TokenIssuer>,
    pub limiter: web::Data<RateLimiter>,
    pub contact_cache: web::Data<ContactCache>,
    pub deal_cache: web::Data<DealCache>,
    pub health_cache: web::Data<HealthCache>,
    pub queue: web::Data<dyn TaskQueue>,
    pub metrics: web::Data<RequestMetrics>,
}

#[cfg(feature = "server")]
impl AppState {
    pub fn new(config: ServerConfig, pool: DbPool, queue: Arc<dyn TaskQueue>) -> Self {
        let cache_ttl = Duration::from_secs(config.cache_ttl_seconds);
        Self {
            issuer: web::Data::new(TokenIssuer::from_config(&config)),
            limiter: web::Data::new(RateLimiter::from_config(&config.login_rate_limit)),
            contact_cache: web::Data::new(contact_cache(cache_ttl)),
            deal_cache: web::Data::new(deal_cache(cache_ttl)),
            health_cache: web::Data::new(health_cache()),
            repo: web::Data::new(DieselRepository::new(pool.clone())),
            pool: web::Data::new(pool),
            queue: web::Data::from(queue),
            metrics: web::Data::new(RequestMetrics::new()),
            config: web::Data::new(config),
        }
    }

    /// Registers the shared state, extractor error handlers and routes.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.config.clone())
            .app_data(self.pool.clone())
            .app_data(self.repo.clone())
            .app_data(self.issuer.clone())
            .app_data(self.limiter.clone())
            .app_data(self.contact_cache.clone())
            .app_data(self.deal_cache.clone())
            .app_data(self.health_cache.clone())
            .app_data(self.queue.clone())
            .app_data(self.metrics.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error))
            .app_data(web::QueryConfig::default().error_handler(query_error))
            .app_data(web::PathConfig::default().error_handler(path_error));
        routes::configure(cfg);
    }
}

#[cfg(feature = "server")]
fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ServiceError::Form(format!("Invalid JSON body: {err}")).into()
}

#[cfg(feature = "server")]
fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ServiceError::Form(format!("Invalid query string: {err}")).into()
}

#[cfg(feature = "server")]
fn path_error(_err: PathError, _req: &HttpRequest) -> actix_web::Error {
    ServiceError::NotFound("Not found.".into()).into()
}

#[cfg(feature = "server")]
fn cors(allowed_origins: &[String]) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ])
        .max_age(3600);
    allowed_origins
        .iter()
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
}

/// Builds and runs the Actix-Web HTTP server using the provided configuration.
#[cfg(feature = "server")]
pub async fn run(server_config: ServerConfig) -> std::io::Result<()> {
    // Establish Diesel connection pool for the SQLite database.
    let pool = establish_connection_pool(&server_config.database_url).map_err(|e| {
        std::io::Error::other(format!("Failed to establish database connection: {e}"))
    })?;

    // PUSH socket feeding the crm-worker process.
    let zmq_context = zmq::Context::new();
    let sender = ZmqTaskSender::connect(&zmq_context, &server_config.zmq_tasks_push)
        .map_err(|e| std::io::Error::other(format!("Failed to start ZMQ sender: {e}")))?;
    let queue: Arc<dyn TaskQueue> = Arc::new(sender);

    let bind_address = (server_config.address.clone(), server_config.port);
    let allowed_origins = server_config.allowed_origins.clone();
    let state = AppState::new(server_config, pool, queue);

    log::info!("Starting server on {}:{}", bind_address.0, bind_address.1);

    HttpServer::new(move || {
        App::new()
            .wrap(from_fn(track_requests))
            .wrap(security_headers())
            .wrap(cors(&allowed_origins))
            .wrap(Logger::default())
            .configure(|cfg| state.configure(cfg))
    })
    .bind(bind_address)?
    .run()
    .await
}
