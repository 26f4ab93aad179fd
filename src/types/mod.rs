//! Type definitions for the demand predictor

pub mod category;
pub mod feature_row;
pub mod request;

pub use category::Category;
pub use feature_row::{FeatureRow, FEATURE_NAMES};
pub use request::RideRequest;
