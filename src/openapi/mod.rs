use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Coupon API",
        version = "1.0.0",
        description = r#"
# Coupon API

Create, list, update and delete discount coupons.

New coupons are stored as `pending` and settled to `valid` or `invalid`
shortly afterwards: discounts above 50% are marked `invalid`.

## Error Handling

Failures share one JSON body:

```json
{
  "error": "Bad Request",
  "message": "The expiration date must be a future date",
  "request_id": "3c1f2a8e-0d4b-4f61-9d53-1b2f7e9a6c10",
  "timestamp": "2026-10-19T10:30:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "coupons", description = "Coupon management endpoints"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::coupons::create_coupon,
        crate::handlers::coupons::list_coupons,
        crate::handlers::coupons::get_coupon,
        crate::handlers::coupons::update_coupon,
        crate::handlers::coupons::delete_coupon,
        crate::handlers::health::service_info,
        crate::handlers::health::health_check,
    ),
    components(
        schemas(
            crate::models::Coupon,
            crate::models::CouponStatus,
            crate::handlers::coupons::CreateCouponRequest,
            crate::handlers::coupons::UpdateCouponRequest,
            crate::handlers::coupons::DeleteCouponResponse,
            crate::handlers::health::HealthResponse,
            crate::handlers::health::ServiceInfo,
            crate::handlers::health::ComponentStatus,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
