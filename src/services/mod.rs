pub mod coupons;

pub use coupons::{settled_status, CouponLifecycle, DEFAULT_REVALIDATION_DELAY};
