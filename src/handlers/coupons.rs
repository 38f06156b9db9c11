use crate::{
    errors::ServiceError,
    handlers::common::{created_response, json_body, query_params, success_response},
    models::{Coupon, CouponFilter, CouponPatch, CouponStatus, NewCoupon},
    AppState,
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    response::{Json, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};

pub const COUPON_DELETED_MESSAGE: &str = "Coupon deleted successfully";

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CouponListQuery {
    /// Exact coupon code
    pub code: Option<String>,
    /// Lifecycle status (pending, valid, invalid)
    pub status: Option<String>,
    /// Exact discount percentage
    pub discount_percent: Option<i32>,
}

impl CouponListQuery {
    fn into_filter(self) -> Result<CouponFilter, ServiceError> {
        let status = self
            .status
            .map(|raw| CouponStatus::from_str(&raw).map_err(|_| ServiceError::InvalidStatus(raw)))
            .transpose()?;

        Ok(CouponFilter {
            code: self.code,
            status,
            discount_percent: self.discount_percent,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "code": "SUMMER25",
    "discountPercent": 25,
    "expirationDate": "2027-12-06T19:42:00Z"
}))]
pub struct CreateCouponRequest {
    /// Unique coupon code, at least 3 characters
    #[schema(example = "SUMMER25")]
    pub code: String,
    /// Discount percentage, 1 to 100
    #[schema(example = 25)]
    pub discount_percent: i32,
    /// Must lie in the future
    pub expiration_date: DateTime<Utc>,
    /// Checked against the allowed values but never stored; new coupons are always pending
    #[schema(example = "pending")]
    pub status: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<CreateCouponRequest> for NewCoupon {
    fn from(request: CreateCouponRequest) -> Self {
        Self {
            code: request.code,
            discount_percent: request.discount_percent,
            expiration_date: request.expiration_date,
            status: request.status,
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "discountPercent": 30,
    "status": "valid"
}))]
pub struct UpdateCouponRequest {
    #[schema(example = 30)]
    pub discount_percent: Option<i32>,
    pub expiration_date: Option<DateTime<Utc>>,
    #[schema(example = "valid")]
    pub status: Option<String>,
}

impl From<UpdateCouponRequest> for CouponPatch {
    fn from(request: UpdateCouponRequest) -> Self {
        Self {
            discount_percent: request.discount_percent,
            expiration_date: request.expiration_date,
            status: request.status,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "message": "Coupon deleted successfully" }))]
pub struct DeleteCouponResponse {
    pub message: String,
}

/// Coupon CRUD routes, mounted under `/coupons`
pub fn coupon_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_coupons).post(create_coupon))
        .route(
            "/:code",
            get(get_coupon).put(update_coupon).delete(delete_coupon),
        )
}

#[utoipa::path(
    post,
    path = "/coupons",
    request_body = CreateCouponRequest,
    responses(
        (status = 201, description = "Coupon created in pending state", body = Coupon),
        (status = 400, description = "Invalid request or duplicate code", body = crate::errors::ErrorResponse),
        (status = 500, description = "Storage failure", body = crate::errors::ErrorResponse)
    ),
    tag = "coupons"
)]
pub async fn create_coupon(
    State(state): State<AppState>,
    payload: Result<Json<CreateCouponRequest>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let payload = json_body(payload)?;

    let created = state.coupons.create(payload.into()).await?;
    Ok(created_response(created))
}

#[utoipa::path(
    get,
    path = "/coupons",
    params(CouponListQuery),
    responses(
        (status = 200, description = "Coupons listed", body = [Coupon]),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse),
        (status = 500, description = "Storage failure", body = crate::errors::ErrorResponse)
    ),
    tag = "coupons"
)]
pub async fn list_coupons(
    State(state): State<AppState>,
    query: Result<Query<CouponListQuery>, QueryRejection>,
) -> Result<Json<Vec<Coupon>>, ServiceError> {
    let filter = query_params(query)?.into_filter()?;
    Ok(Json(state.coupons.list(filter).await?))
}

#[utoipa::path(
    get,
    path = "/coupons/{code}",
    params(
        ("code" = String, Path, description = "Coupon code")
    ),
    responses(
        (status = 200, description = "Coupon fetched", body = Coupon),
        (status = 404, description = "Coupon not found", body = crate::errors::ErrorResponse)
    ),
    tag = "coupons"
)]
pub async fn get_coupon(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Coupon>, ServiceError> {
    Ok(Json(state.coupons.get(&code).await?))
}

#[utoipa::path(
    put,
    path = "/coupons/{code}",
    request_body = UpdateCouponRequest,
    params(
        ("code" = String, Path, description = "Coupon code")
    ),
    responses(
        (status = 200, description = "Coupon updated", body = Coupon),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Coupon not found", body = crate::errors::ErrorResponse)
    ),
    tag = "coupons"
)]
pub async fn update_coupon(
    State(state): State<AppState>,
    Path(code): Path<String>,
    payload: Result<Json<UpdateCouponRequest>, JsonRejection>,
) -> Result<Json<Coupon>, ServiceError> {
    let payload = json_body(payload)?;

    Ok(Json(state.coupons.update(&code, payload.into()).await?))
}

#[utoipa::path(
    delete,
    path = "/coupons/{code}",
    params(
        ("code" = String, Path, description = "Coupon code")
    ),
    responses(
        (status = 200, description = "Coupon deleted", body = DeleteCouponResponse),
        (status = 404, description = "Coupon not found", body = crate::errors::ErrorResponse)
    ),
    tag = "coupons"
)]
pub async fn delete_coupon(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Response, ServiceError> {
    state.coupons.delete(&code).await?;
    Ok(success_response(DeleteCouponResponse {
        message: COUPON_DELETED_MESSAGE.to_string(),
    }))
}
