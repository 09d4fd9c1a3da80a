//! Store categories.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown category string.
#[derive(thiserror::Error, Debug, Clone)]
#[error("unknown store category {0:?}")]
pub struct CategoryError(pub String);

/// Fixed set of store categories.
///
/// Stored in the database as lowercase text with a CHECK constraint.
/// New stores default to [`StoreCategory::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreCategory {
    Food,
    Electronics,
    Groceries,
    Clothing,
    Health,
    Beauty,
    Sports,
    Books,
    Home,
    Automotive,
    #[default]
    Other,
}

impl StoreCategory {
    /// All categories, in display order.
    pub const ALL: [Self; 11] = [
        Self::Food,
        Self::Electronics,
        Self::Groceries,
        Self::Clothing,
        Self::Health,
        Self::Beauty,
        Self::Sports,
        Self::Books,
        Self::Home,
        Self::Automotive,
        Self::Other,
    ];

    /// Database/wire representation of the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Electronics => "electronics",
            Self::Groceries => "groceries",
            Self::Clothing => "clothing",
            Self::Health => "health",
            Self::Beauty => "beauty",
            Self::Sports => "sports",
            Self::Books => "books",
            Self::Home => "home",
            Self::Automotive => "automotive",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for StoreCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StoreCategory {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CategoryError(s.to_owned()))
    }
}

// SQLx support (with postgres feature): categories are TEXT columns.
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for StoreCategory {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for StoreCategory {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(s.parse::<Self>()?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for StoreCategory {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        for category in StoreCategory::ALL {
            assert_eq!(
                category.as_str().parse::<StoreCategory>().ok(),
                Some(category)
            );
        }
    }

    #[test]
    fn test_parse_unknown() {
        assert!("bakery".parse::<StoreCategory>().is_err());
    }

    #[test]
    fn test_default_is_other() {
        assert_eq!(StoreCategory::default(), StoreCategory::Other);
    }
}
