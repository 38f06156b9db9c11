use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set, SqlErr,
};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::entities::coupon::{
    ActiveModel as CouponActiveModel, Column, Entity as CouponEntity, Model as CouponModel,
};
use crate::models::{Coupon, CouponFilter, CouponStatus};

use super::{CouponChanges, CouponStore, StoreError};

/// Coupon store backed by the `coupons` table
#[derive(Debug, Clone)]
pub struct SeaOrmCouponStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmCouponStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }

    async fn find_model(&self, code: &str) -> Result<Option<CouponModel>, StoreError> {
        Ok(CouponEntity::find()
            .filter(Column::Code.eq(code))
            .one(self.get_db())
            .await?)
    }
}

impl TryFrom<CouponModel> for Coupon {
    type Error = StoreError;

    fn try_from(model: CouponModel) -> Result<Self, Self::Error> {
        let status = CouponStatus::from_str(&model.status).map_err(|_| StoreError::Corrupt {
            code: model.code.clone(),
            reason: format!("unknown status {:?}", model.status),
        })?;

        Ok(Self {
            code: model.code,
            discount_percent: model.discount_percent,
            expiration_date: model.expiration_date,
            status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[async_trait]
impl CouponStore for SeaOrmCouponStore {
    async fn create(&self, coupon: Coupon) -> Result<Coupon, StoreError> {
        let active = CouponActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(coupon.code.clone()),
            discount_percent: Set(coupon.discount_percent),
            expiration_date: Set(coupon.expiration_date),
            status: Set(coupon.status.to_string()),
            created_at: Set(coupon.created_at),
            updated_at: Set(coupon.updated_at),
        };

        match active.insert(self.get_db()).await {
            Ok(model) => Coupon::try_from(model),
            Err(err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    Err(StoreError::DuplicateKey(coupon.code))
                }
                _ => Err(StoreError::Database(err)),
            },
        }
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError> {
        self.find_model(code)
            .await?
            .map(Coupon::try_from)
            .transpose()
    }

    async fn update_by_code(
        &self,
        code: &str,
        changes: CouponChanges,
    ) -> Result<Option<Coupon>, StoreError> {
        let Some(existing) = self.find_model(code).await? else {
            return Ok(None);
        };

        let mut active_model = existing.into_active_model();

        if let Some(discount_percent) = changes.discount_percent {
            active_model.discount_percent = Set(discount_percent);
        }
        if let Some(expiration_date) = changes.expiration_date {
            active_model.expiration_date = Set(expiration_date);
        }
        if let Some(status) = changes.status {
            active_model.status = Set(status.to_string());
        }
        if let Some(updated_at) = changes.updated_at {
            active_model.updated_at = Set(updated_at);
        }

        match active_model.update(self.get_db()).await {
            Ok(model) => Coupon::try_from(model).map(Some),
            // The row vanished between the lookup and the write
            Err(sea_orm::DbErr::RecordNotUpdated) => {
                debug!(code, "coupon disappeared before update was applied");
                Ok(None)
            }
            Err(err) => Err(StoreError::Database(err)),
        }
    }

    async fn delete_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError> {
        let Some(existing) = self.find_model(code).await? else {
            return Ok(None);
        };

        let result = CouponEntity::delete_many()
            .filter(Column::Code.eq(code))
            .exec(self.get_db())
            .await?;

        if result.rows_affected == 0 {
            return Ok(None);
        }

        Coupon::try_from(existing).map(Some)
    }

    async fn list(&self, filter: &CouponFilter) -> Result<Vec<Coupon>, StoreError> {
        let mut condition = Condition::all();
        if let Some(code) = &filter.code {
            condition = condition.add(Column::Code.eq(code.as_str()));
        }
        if let Some(status) = filter.status {
            condition = condition.add(Column::Status.eq(status.to_string()));
        }
        if let Some(discount_percent) = filter.discount_percent {
            condition = condition.add(Column::DiscountPercent.eq(discount_percent));
        }

        CouponEntity::find()
            .filter(condition)
            .order_by_asc(Column::CreatedAt)
            .order_by_asc(Column::Code)
            .all(self.get_db())
            .await?
            .into_iter()
            .map(Coupon::try_from)
            .collect()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.get_db().ping().await.map_err(StoreError::Database)
    }
}
