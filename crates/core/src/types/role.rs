//! User roles and role-based authorization levels.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown role string.
#[derive(thiserror::Error, Debug, Clone)]
#[error("role must be admin, user, or store_owner (got {0:?})")]
pub struct RoleError(pub String);

/// Account role controlling which endpoints a user may call.
///
/// Stored in the database as lowercase snake_case text (`admin`, `user`,
/// `store_owner`), matching the JSON wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access: user management, store management, all listings.
    Admin,
    /// Regular account: browse stores, submit and manage own ratings.
    #[default]
    User,
    /// Owns stores: everything a user can do, plus the "my stores" view.
    StoreOwner,
}

impl Role {
    /// Database/wire representation of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
            Self::StoreOwner => "store_owner",
        }
    }

    /// Whether this role grants administrative access.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Whether this role may use the store-owner endpoints.
    ///
    /// Admins are a superset of store owners.
    #[must_use]
    pub const fn is_store_owner(self) -> bool {
        matches!(self, Self::StoreOwner | Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            "store_owner" => Ok(Self::StoreOwner),
            other => Err(RoleError(other.to_owned())),
        }
    }
}

// SQLx support (with postgres feature): roles are plain TEXT columns with a
// CHECK constraint, so encoding delegates to String.
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(s.parse::<Self>()?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Role {
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
        for role in [Role::Admin, Role::User, Role::StoreOwner] {
            assert_eq!(role.as_str().parse::<Role>().ok(), Some(role));
        }
    }

    #[test]
    fn test_parse_unknown() {
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_admin_is_store_owner() {
        assert!(Role::Admin.is_store_owner());
        assert!(Role::StoreOwner.is_store_owner());
        assert!(!Role::User.is_store_owner());
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&Role::StoreOwner).expect("serialize");
        assert_eq!(json, "\"store_owner\"");
    }
}
