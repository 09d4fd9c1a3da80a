//! Rating value type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when a rating is outside the allowed range.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("rating must be between {min} and {max} (got {got})", min = RatingValue::MIN, max = RatingValue::MAX)]
pub struct RatingValueError {
    /// The out-of-range value.
    pub got: i32,
}

/// A star rating, constrained to 1-5.
///
/// ```
/// use storemark_core::RatingValue;
///
/// assert_eq!(RatingValue::new(4).unwrap().as_i32(), 4);
/// assert!(RatingValue::new(0).is_err());
/// assert!(RatingValue::new(6).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RatingValue(i32);

impl RatingValue {
    /// Lowest allowed rating.
    pub const MIN: i32 = 1;
    /// Highest allowed rating.
    pub const MAX: i32 = 5;

    /// Create a rating, rejecting values outside 1-5.
    ///
    /// # Errors
    ///
    /// Returns [`RatingValueError`] if `value` is not in `1..=5`.
    pub const fn new(value: i32) -> Result<Self, RatingValueError> {
        if value >= Self::MIN && value <= Self::MAX {
            Ok(Self(value))
        } else {
            Err(RatingValueError { got: value })
        }
    }

    /// Get the underlying integer value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

impl fmt::Display for RatingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i32> for RatingValue {
    type Error = RatingValueError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RatingValue> for i32 {
    fn from(value: RatingValue) -> Self {
        value.0
    }
}

// SQLx support (with postgres feature): stored as INTEGER.
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for RatingValue {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i32 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i32 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for RatingValue {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <i32 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(raw)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for RatingValue {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i32 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_full_range() {
        for value in 1..=5 {
            assert_eq!(RatingValue::new(value).map(RatingValue::as_i32), Ok(value));
        }
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(RatingValue::new(0).is_err());
        assert!(RatingValue::new(6).is_err());
        assert!(RatingValue::new(-3).is_err());
    }

    #[test]
    fn test_serde_transparent() {
        let rating = RatingValue::new(5).expect("valid");
        assert_eq!(serde_json::to_string(&rating).expect("serialize"), "5");

        let parsed: RatingValue = serde_json::from_str("3").expect("deserialize");
        assert_eq!(parsed.as_i32(), 3);
    }
}
