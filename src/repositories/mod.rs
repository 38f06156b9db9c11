use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DbErr;

use crate::models::{Coupon, CouponFilter, CouponStatus};

pub mod coupon_repository;
pub mod in_memory;

pub use coupon_repository::SeaOrmCouponStore;
pub use in_memory::InMemoryCouponStore;

/// Failures reported by a coupon store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate key: a coupon with code {0} already exists")]
    DuplicateKey(String),

    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("corrupt record {code}: {reason}")]
    Corrupt { code: String, reason: String },
}

/// Typed change set applied by `CouponStore::update_by_code`.
///
/// `code` and `created_at` are deliberately absent: they never change after
/// creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CouponChanges {
    pub discount_percent: Option<i32>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub status: Option<CouponStatus>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CouponChanges {
    /// Status-only change, used by the deferred re-validation.
    pub fn status(status: CouponStatus, at: DateTime<Utc>) -> Self {
        Self {
            status: Some(status),
            updated_at: Some(at),
            ..Default::default()
        }
    }

    pub fn apply_to(&self, coupon: &mut Coupon) {
        if let Some(discount_percent) = self.discount_percent {
            coupon.discount_percent = discount_percent;
        }
        if let Some(expiration_date) = self.expiration_date {
            coupon.expiration_date = expiration_date;
        }
        if let Some(status) = self.status {
            coupon.status = status;
        }
        if let Some(updated_at) = self.updated_at {
            coupon.updated_at = updated_at;
        }
    }
}

/// Keyed storage for coupon records. `code` is the unique key.
///
/// Lookups that miss return `Ok(None)`; only backend failures and the
/// uniqueness conflict on `create` are errors.
#[async_trait]
pub trait CouponStore: Send + Sync {
    async fn create(&self, coupon: Coupon) -> Result<Coupon, StoreError>;

    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError>;

    async fn update_by_code(
        &self,
        code: &str,
        changes: CouponChanges,
    ) -> Result<Option<Coupon>, StoreError>;

    async fn delete_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError>;

    async fn list(&self, filter: &CouponFilter) -> Result<Vec<Coupon>, StoreError>;

    /// Reachability probe for health checks
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
