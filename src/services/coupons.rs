use chrono::{DateTime, Utc};
use metrics::counter;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, info_span, instrument, Instrument};

use crate::{
    clock::{Clock, SystemClock},
    errors::ServiceError,
    models::{Coupon, CouponFilter, CouponPatch, CouponStatus, NewCoupon},
    repositories::{CouponChanges, CouponStore, StoreError},
    scheduler::{Scheduler, TokioScheduler},
};

/// Default wait before a pending coupon is settled
pub const DEFAULT_REVALIDATION_DELAY: Duration = Duration::from_secs(3);

/// Discounts strictly above this are settled as `invalid`
pub const MAX_AUTO_APPROVED_DISCOUNT: i32 = 50;

pub const MIN_DISCOUNT_PERCENT: i32 = 1;
pub const MAX_DISCOUNT_PERCENT: i32 = 100;
pub const MIN_CODE_LENGTH: usize = 3;

const CREATE_CONTEXT: &str = "Error creating coupon";
const GET_CONTEXT: &str = "Error retrieving coupon";
const LIST_CONTEXT: &str = "Error listing coupons";
const UPDATE_CONTEXT: &str = "Error updating coupon";
const DELETE_CONTEXT: &str = "Error deleting coupon";

/// Final status for a coupon created with `discount_percent`.
///
/// Only the discount takes part in the decision; 50 itself is still valid.
pub fn settled_status(discount_percent: i32) -> CouponStatus {
    if discount_percent > MAX_AUTO_APPROVED_DISCOUNT {
        CouponStatus::Invalid
    } else {
        CouponStatus::Valid
    }
}

fn ensure_future_expiration(
    expiration_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    if expiration_date <= now {
        return Err(ServiceError::InvalidExpiration);
    }
    Ok(())
}

fn ensure_discount_in_range(discount_percent: i32) -> Result<(), ServiceError> {
    if !(MIN_DISCOUNT_PERCENT..=MAX_DISCOUNT_PERCENT).contains(&discount_percent) {
        return Err(ServiceError::InvalidDiscount(discount_percent));
    }
    Ok(())
}

fn parse_status(raw: &str) -> Result<CouponStatus, ServiceError> {
    CouponStatus::from_str(raw).map_err(|_| ServiceError::InvalidStatus(raw.to_string()))
}

fn ensure_code_length(code: &str) -> Result<(), ServiceError> {
    if code.chars().count() < MIN_CODE_LENGTH {
        return Err(ServiceError::InvalidCode(code.to_string()));
    }
    Ok(())
}

/// Validates and persists coupons, and settles every new coupon out of
/// `pending` through a deferred re-validation.
#[derive(Clone)]
pub struct CouponLifecycle {
    store: Arc<dyn CouponStore>,
    scheduler: Arc<dyn Scheduler>,
    clock: Arc<dyn Clock>,
    revalidation_delay: Duration,
}

impl CouponLifecycle {
    pub fn new(
        store: Arc<dyn CouponStore>,
        scheduler: Arc<dyn Scheduler>,
        clock: Arc<dyn Clock>,
        revalidation_delay: Duration,
    ) -> Self {
        Self {
            store,
            scheduler,
            clock,
            revalidation_delay,
        }
    }

    /// Lifecycle on the tokio timer and the system clock.
    pub fn with_store(store: Arc<dyn CouponStore>, revalidation_delay: Duration) -> Self {
        Self::new(
            store,
            Arc::new(TokioScheduler),
            Arc::new(SystemClock),
            revalidation_delay,
        )
    }

    pub fn revalidation_delay(&self) -> Duration {
        self.revalidation_delay
    }

    /// Creates a coupon in `pending` state and schedules its re-validation.
    ///
    /// Rules are checked in order, stopping at the first failure: unique code,
    /// future expiration, discount range, known status. Any caller-supplied
    /// status is only validated; the stored status is always `pending`.
    #[instrument(skip(self, data), fields(code = %data.code))]
    pub async fn create(&self, data: NewCoupon) -> Result<Coupon, ServiceError> {
        let existing = self
            .store
            .find_by_code(&data.code)
            .await
            .map_err(|e| ServiceError::store(CREATE_CONTEXT, e))?;
        if existing.is_some() {
            return Err(ServiceError::DuplicateCode(data.code));
        }

        let now = self.clock.now();
        ensure_future_expiration(data.expiration_date, now)?;
        ensure_discount_in_range(data.discount_percent)?;
        if let Some(raw) = data.status.as_deref() {
            parse_status(raw)?;
        }
        ensure_code_length(&data.code)?;

        let coupon = Coupon {
            code: data.code,
            discount_percent: data.discount_percent,
            expiration_date: data.expiration_date,
            status: CouponStatus::Pending,
            created_at: data.created_at.unwrap_or(now),
            updated_at: data.updated_at.unwrap_or(now),
        };

        let created = self.store.create(coupon).await.map_err(|e| match e {
            StoreError::DuplicateKey(code) => ServiceError::DuplicateCode(code),
            other => ServiceError::store(CREATE_CONTEXT, other),
        })?;

        counter!("coupons_created_total", 1);
        info!(
            discount_percent = created.discount_percent,
            "coupon created; re-validation scheduled"
        );
        self.schedule_revalidation(&created);

        Ok(created)
    }

    /// Fetches a coupon by code.
    #[instrument(skip(self))]
    pub async fn get(&self, code: &str) -> Result<Coupon, ServiceError> {
        self.store
            .find_by_code(code)
            .await
            .map_err(|e| ServiceError::store(GET_CONTEXT, e))?
            .ok_or_else(|| ServiceError::NotFound(code.to_string()))
    }

    /// Lists coupons matching `filter`; an empty result is not an error.
    #[instrument(skip(self))]
    pub async fn list(&self, filter: CouponFilter) -> Result<Vec<Coupon>, ServiceError> {
        self.store
            .list(&filter)
            .await
            .map_err(|e| ServiceError::store(LIST_CONTEXT, e))
    }

    /// Applies a partial update, re-checking only the fields in `patch`.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, code: &str, patch: CouponPatch) -> Result<Coupon, ServiceError> {
        let existing = self
            .store
            .find_by_code(code)
            .await
            .map_err(|e| ServiceError::store(UPDATE_CONTEXT, e))?;
        if existing.is_none() {
            return Err(ServiceError::NotFound(code.to_string()));
        }

        let now = self.clock.now();
        if let Some(expiration_date) = patch.expiration_date {
            ensure_future_expiration(expiration_date, now)?;
        }
        if let Some(discount_percent) = patch.discount_percent {
            ensure_discount_in_range(discount_percent)?;
        }
        let status = patch.status.as_deref().map(parse_status).transpose()?;

        let changes = CouponChanges {
            discount_percent: patch.discount_percent,
            expiration_date: patch.expiration_date,
            status,
            updated_at: Some(now),
        };

        self.store
            .update_by_code(code, changes)
            .await
            .map_err(|e| ServiceError::store(UPDATE_CONTEXT, e))?
            .ok_or_else(|| ServiceError::NotFound(code.to_string()))
    }

    /// Removes a coupon and returns its last stored state.
    #[instrument(skip(self))]
    pub async fn delete(&self, code: &str) -> Result<Coupon, ServiceError> {
        let existing = self
            .store
            .find_by_code(code)
            .await
            .map_err(|e| ServiceError::store(DELETE_CONTEXT, e))?;
        if existing.is_none() {
            return Err(ServiceError::NotFound(code.to_string()));
        }

        let deleted = self
            .store
            .delete_by_code(code)
            .await
            .map_err(|e| ServiceError::store(DELETE_CONTEXT, e))?
            .ok_or_else(|| ServiceError::NotFound(code.to_string()))?;

        info!("coupon deleted");
        Ok(deleted)
    }

    /// Hands the re-validation of `coupon` to the scheduler.
    ///
    /// The job only captures the creation snapshot, so an update made before
    /// it fires does not change its outcome and a manual status is overwritten.
    fn schedule_revalidation(&self, coupon: &Coupon) {
        let store = Arc::clone(&self.store);
        let clock = Arc::clone(&self.clock);
        let code = coupon.code.clone();
        let discount_percent = coupon.discount_percent;
        let span = info_span!("coupon_revalidation", code = %code);

        self.scheduler.schedule_once(
            self.revalidation_delay,
            Box::pin(
                async move {
                    revalidate(store.as_ref(), clock.as_ref(), &code, discount_percent).await;
                }
                .instrument(span),
            ),
        );
    }
}

/// Settles a coupon from its creation snapshot. Never fails: a missing coupon
/// is skipped and store errors are logged, since no caller is waiting.
async fn revalidate(store: &dyn CouponStore, clock: &dyn Clock, code: &str, discount_percent: i32) {
    let status = settled_status(discount_percent);

    match store
        .update_by_code(code, CouponChanges::status(status, clock.now()))
        .await
    {
        Ok(Some(_)) => {
            counter!("coupons_revalidated_total", 1, "status" => status.to_string());
            info!(%status, "coupon re-validated");
        }
        Ok(None) => {
            counter!("coupons_revalidation_skipped_total", 1);
            debug!("coupon no longer exists; re-validation skipped");
        }
        Err(e) => {
            error!(error = %e, "coupon re-validation failed");
        }
    }
}
