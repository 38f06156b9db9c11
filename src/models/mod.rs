// Domain models
pub mod coupon;

pub use coupon::{Coupon, CouponFilter, CouponPatch, CouponStatus, NewCoupon};
