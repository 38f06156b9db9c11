use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use coupon_api::{
    config::AppConfig,
    db,
    repositories::{CouponStore, InMemoryCouponStore, SeaOrmCouponStore},
    AppState,
};
use serde_json::Value;
use tower::ServiceExt;

/// Helper harness wrapping the full router around a fresh coupon store.
pub struct TestApp {
    router: Router,
    #[allow(dead_code)]
    pub state: AppState,
    pub store: Arc<dyn CouponStore>,
}

impl TestApp {
    fn with_store(store: Arc<dyn CouponStore>, revalidation_delay: Duration) -> Self {
        let mut cfg = AppConfig::new(
            "memory://".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.cors_allow_any_origin = true;
        cfg.revalidation_delay_ms = revalidation_delay.as_millis() as u64;

        let state = AppState::new(cfg, Arc::clone(&store));
        let router = coupon_api::build_router(state.clone());

        Self {
            router,
            state,
            store,
        }
    }

    /// Application backed by the process-local store.
    #[allow(dead_code)]
    pub fn in_memory(revalidation_delay: Duration) -> Self {
        Self::with_store(Arc::new(InMemoryCouponStore::new()), revalidation_delay)
    }

    /// Application backed by a migrated in-memory SQLite database.
    #[allow(dead_code)]
    pub async fn sqlite(revalidation_delay: Duration) -> Self {
        let pool = db::sqlite_in_memory()
            .await
            .expect("failed to create test database");
        Self::with_store(
            Arc::new(SeaOrmCouponStore::new(Arc::new(pool))),
            revalidation_delay,
        )
    }

    /// Send a request against the router with an optional JSON body.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request_with_headers(method, uri, body, &[]).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Send a raw, possibly malformed, JSON body.
    #[allow(dead_code)]
    pub async fn request_raw(&self, method: Method, uri: &str, raw: &'static str) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(raw))
            .expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
