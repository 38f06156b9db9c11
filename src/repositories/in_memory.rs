use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::Arc;

use crate::models::{Coupon, CouponFilter};

use super::{CouponChanges, CouponStore, StoreError};

/// Process-local coupon store.
///
/// Uniqueness of `code` is enforced by the map entry API, so two racing
/// creates for the same code resolve to exactly one winner.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCouponStore {
    coupons: Arc<DashMap<String, Coupon>>,
}

impl InMemoryCouponStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.coupons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coupons.is_empty()
    }
}

#[async_trait]
impl CouponStore for InMemoryCouponStore {
    async fn create(&self, coupon: Coupon) -> Result<Coupon, StoreError> {
        match self.coupons.entry(coupon.code.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateKey(coupon.code)),
            Entry::Vacant(slot) => {
                slot.insert(coupon.clone());
                Ok(coupon)
            }
        }
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError> {
        Ok(self.coupons.get(code).map(|entry| entry.value().clone()))
    }

    async fn update_by_code(
        &self,
        code: &str,
        changes: CouponChanges,
    ) -> Result<Option<Coupon>, StoreError> {
        Ok(self.coupons.get_mut(code).map(|mut entry| {
            changes.apply_to(entry.value_mut());
            entry.value().clone()
        }))
    }

    async fn delete_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError> {
        Ok(self.coupons.remove(code).map(|(_, coupon)| coupon))
    }

    async fn list(&self, filter: &CouponFilter) -> Result<Vec<Coupon>, StoreError> {
        let mut coupons: Vec<Coupon> = self
            .coupons
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        coupons.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.code.cmp(&b.code))
        });
        Ok(coupons)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CouponStatus;
    use assert_matches::assert_matches;
    use chrono::{Duration, Utc};

    fn coupon(code: &str) -> Coupon {
        let now = Utc::now();
        Coupon {
            code: code.to_string(),
            discount_percent: 15,
            expiration_date: now + Duration::days(7),
            status: CouponStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn create_rejects_existing_code() {
        let store = InMemoryCouponStore::new();
        store.create(coupon("WELCOME")).await.unwrap();

        let err = store.create(coupon("WELCOME")).await.unwrap_err();
        assert_matches!(err, StoreError::DuplicateKey(_));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_creates_have_single_winner() {
        let store = InMemoryCouponStore::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.create(coupon("RACE")).await })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn update_and_delete_miss_quietly() {
        let store = InMemoryCouponStore::new();
        let changes = CouponChanges::status(CouponStatus::Valid, Utc::now());
        assert!(store.update_by_code("NOPE", changes).await.unwrap().is_none());
        assert!(store.delete_by_code("NOPE").await.unwrap().is_none());
        assert!(store.is_empty());
    }
}
