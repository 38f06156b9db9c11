use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Lifecycle state of a coupon.
///
/// Every coupon starts out `Pending`; the deferred re-validation settles it
/// into `Valid` or `Invalid`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CouponStatus {
    #[default]
    Pending,
    Valid,
    Invalid,
}

/// A persisted coupon record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "code": "SUMMER25",
    "discountPercent": 25,
    "expirationDate": "2027-12-06T19:42:00Z",
    "status": "pending",
    "createdAt": "2026-10-19T10:30:00Z",
    "updatedAt": "2026-10-19T10:30:00Z"
}))]
pub struct Coupon {
    /// Unique coupon code
    #[schema(example = "SUMMER25")]
    pub code: String,
    /// Discount applied by the coupon, 1 to 100
    #[schema(example = 25)]
    pub discount_percent: i32,
    /// Instant after which the coupon can no longer be used
    pub expiration_date: DateTime<Utc>,
    pub status: CouponStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Candidate fields for a new coupon.
///
/// `status` is kept as the raw caller value so it can be checked against the
/// allowed set; it never reaches the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCoupon {
    pub code: String,
    pub discount_percent: i32,
    pub expiration_date: DateTime<Utc>,
    pub status: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl NewCoupon {
    pub fn new(
        code: impl Into<String>,
        discount_percent: i32,
        expiration_date: DateTime<Utc>,
    ) -> Self {
        Self {
            code: code.into(),
            discount_percent,
            expiration_date,
            status: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}

/// Partial update of a coupon. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CouponPatch {
    pub discount_percent: Option<i32>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub status: Option<String>,
}

impl CouponPatch {
    pub fn is_empty(&self) -> bool {
        self.discount_percent.is_none() && self.expiration_date.is_none() && self.status.is_none()
    }
}

/// Equality filter for listing coupons; an empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CouponFilter {
    pub code: Option<String>,
    pub status: Option<CouponStatus>,
    pub discount_percent: Option<i32>,
}

impl CouponFilter {
    pub fn by_status(status: CouponStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_none() && self.status.is_none() && self.discount_percent.is_none()
    }

    pub fn matches(&self, coupon: &Coupon) -> bool {
        self.code.as_deref().map_or(true, |code| coupon.code == code)
            && self.status.map_or(true, |status| coupon.status == status)
            && self
                .discount_percent
                .map_or(true, |percent| coupon.discount_percent == percent)
    }
}
