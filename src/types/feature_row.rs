//! Model-ready representation of one ride request

use super::Category;
use serde::Serialize;

/// Feature names in the column order the model was trained with.
pub const FEATURE_NAMES: [&str; 4] = [
    "pickup_location",
    "pickup_community_area",
    "time_bin",
    "day_of_week",
];

/// Derived features for a single request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureRow {
    pub location_id: Category,
    pub area_id: Category,
    pub time_bin_id: Category,
    /// Monday = 0 ... Sunday = 6
    pub day_of_week: u8,
}

/// A single feature value handed to a model backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureValue<'a> {
    Category(&'a Category),
    Number(f64),
}

impl FeatureValue<'_> {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Category(c) => c.as_f64(),
            FeatureValue::Number(v) => Some(*v),
        }
    }
}

impl FeatureRow {
    /// Position of `name` in [`FEATURE_NAMES`].
    pub fn feature_index(name: &str) -> Option<usize> {
        FEATURE_NAMES.iter().position(|n| *n == name)
    }

    /// Value of the feature at `index` in [`FEATURE_NAMES`] order.
    pub fn value(&self, index: usize) -> Option<FeatureValue<'_>> {
        match index {
            0 => Some(FeatureValue::Category(&self.location_id)),
            1 => Some(FeatureValue::Category(&self.area_id)),
            2 => Some(FeatureValue::Category(&self.time_bin_id)),
            3 => Some(FeatureValue::Number(f64::from(self.day_of_week))),
            _ => None,
        }
    }

    /// Categorical identity of the feature at `index`; day of week counts as an integer category.
    pub fn category(&self, index: usize) -> Option<Category> {
        match self.value(index)? {
            FeatureValue::Category(c) => Some(c.clone()),
            FeatureValue::Number(_) => Some(Category::Int(i64::from(self.day_of_week))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> FeatureRow {
        FeatureRow {
            location_id: Category::from("loc7"),
            area_id: Category::Int(12),
            time_bin_id: Category::from("tb29"),
            day_of_week: 0,
        }
    }

    #[test]
    fn test_feature_order() {
        assert_eq!(FeatureRow::feature_index("pickup_location"), Some(0));
        assert_eq!(FeatureRow::feature_index("day_of_week"), Some(3));
        assert_eq!(FeatureRow::feature_index("hour"), None);
    }

    #[test]
    fn test_values() {
        let row = row();
        assert_eq!(row.value(1).and_then(|v| v.as_f64()), Some(12.0));
        assert_eq!(row.value(0).and_then(|v| v.as_f64()), None);
        assert_eq!(row.value(3).and_then(|v| v.as_f64()), Some(0.0));
        assert!(row.value(4).is_none());
        assert_eq!(row.category(3), Some(Category::Int(0)));
    }
}
