//! Coupon API
//!
//! Coupon CRUD over HTTP, with a deferred re-validation that settles every
//! new coupon out of `pending`.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod clock;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod models;
pub mod openapi;
pub mod repositories;
pub mod scheduler;
pub mod services;
pub mod tracing;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::repositories::CouponStore;
use crate::services::CouponLifecycle;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub coupons: CouponLifecycle,
    pub store: Arc<dyn CouponStore>,
}

impl AppState {
    /// State running on the tokio timer and system clock, with the
    /// configured re-validation delay.
    pub fn new(config: AppConfig, store: Arc<dyn CouponStore>) -> Self {
        let coupons = CouponLifecycle::with_store(Arc::clone(&store), config.revalidation_delay());
        Self {
            config: Arc::new(config),
            coupons,
            store,
        }
    }
}

/// Application routes without the outer CORS and compression layers
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::health::service_info))
        .route("/health", get(handlers::health::health_check))
        .nest("/coupons", handlers::coupons::coupon_routes())
}

/// Full router: routes, request ids, HTTP tracing and swagger UI
pub fn build_router(state: AppState) -> Router {
    api_routes()
        .with_state(state)
        .merge(openapi::swagger_ui())
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
}

pub mod prelude {
    pub use crate::config::AppConfig;
    pub use crate::errors::{ErrorResponse, ServiceError};
    pub use crate::models::{Coupon, CouponFilter, CouponPatch, CouponStatus, NewCoupon};
    pub use crate::repositories::{CouponStore, InMemoryCouponStore, SeaOrmCouponStore};
    pub use crate::services::CouponLifecycle;
    pub use crate::{build_router, AppState};
}
