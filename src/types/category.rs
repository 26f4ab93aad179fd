//! Categorical identifiers as emitted by the offline training step

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A location, area or time-bin identifier.
///
/// Training exports identifiers either as integers or as strings. Integral
/// floats (`12.0`) are normalised to integers so that `12` and `12.0` name
/// the same category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum Category {
    Int(i64),
    Str(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCategory {
    Int(i64),
    Float(f64),
    Str(String),
}

impl TryFrom<RawCategory> for Category {
    type Error = String;

    fn try_from(raw: RawCategory) -> Result<Self, Self::Error> {
        match raw {
            RawCategory::Int(v) => Ok(Category::Int(v)),
            RawCategory::Str(s) => Ok(Category::Str(s)),
            RawCategory::Float(f)
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 =>
            {
                Ok(Category::Int(f as i64))
            }
            RawCategory::Float(f) => Err(format!("category {f} is not an integer or a string")),
        }
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawCategory::deserialize(deserializer)?;
        Category::try_from(raw).map_err(serde::de::Error::custom)
    }
}

impl Category {
    /// Numeric value for backends that only take numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Category::Int(v) => Some(*v as f64),
            Category::Str(_) => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Int(v) => write!(f, "{v}"),
            Category::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Category {
    fn from(v: i64) -> Self {
        Category::Int(v)
    }
}

impl From<&str> for Category {
    fn from(s: &str) -> Self {
        Category::Str(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integral_float_is_int() {
        let c: Category = serde_json::from_str("12.0").unwrap();
        assert_eq!(c, Category::Int(12));
        let c: Category = serde_json::from_str("12").unwrap();
        assert_eq!(c, Category::Int(12));
    }

    #[test]
    fn test_string_category() {
        let c: Category = serde_json::from_str("\"loc7\"").unwrap();
        assert_eq!(c, Category::from("loc7"));
        assert_eq!(c.to_string(), "loc7");
        assert_eq!(c.as_f64(), None);
    }

    #[test]
    fn test_fractional_float_is_rejected() {
        assert!(serde_json::from_str::<Category>("12.5").is_err());
        assert!(serde_json::from_str::<Category>("true").is_err());
    }

    #[test]
    fn test_serializes_untagged() {
        assert_eq!(serde_json::to_string(&Category::Int(3)).unwrap(), "3");
        assert_eq!(serde_json::to_string(&Category::from("tb29")).unwrap(), "\"tb29\"");
    }
}
